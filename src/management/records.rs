use std::{collections::HashSet, path::Path};

use serde_json::Value;

use crate::{
    Res,
    types::{Record, RequestKey},
};

pub const ERROR_COLUMN: &str = "error";

/// In-memory table of enrichment results, one row per request key.
///
/// Rows keep insertion order. A key can only appear once; a second record
/// for the same key is ignored.
#[derive(Debug, Clone)]
pub struct RecordTable {
    key_columns: &'static [&'static str],
    schema: Vec<String>,
    records: Vec<Record>,
    seen: HashSet<RequestKey>,
}

impl RecordTable {
    pub fn new(key_columns: &'static [&'static str], schema: &[&str]) -> Self {
        Self {
            key_columns,
            schema: schema.iter().map(|s| s.to_string()).collect(),
            records: Vec::new(),
            seen: HashSet::new(),
        }
    }

    /// Appends a record. Returns `false` when its key is already present.
    pub fn push(&mut self, record: Record) -> bool {
        if !self.seen.insert(record.key.clone()) {
            log::warn!("Ignoring second record for {}", record.key);
            return false;
        }
        self.records.push(record);
        true
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn error_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_error()).count()
    }

    /// Header row: key columns, schema fields, any extra fields in first-seen
    /// order, then the error column.
    pub fn columns(&self) -> Vec<String> {
        let mut columns: Vec<String> = self.key_columns.iter().map(|c| c.to_string()).collect();
        let mut fields = self.schema.clone();
        for record in &self.records {
            for name in record.fields.keys() {
                if !fields.contains(name) {
                    fields.push(name.clone());
                }
            }
        }
        columns.extend(fields);
        columns.push(ERROR_COLUMN.to_string());
        columns
    }

    pub fn to_csv(&self) -> Res<Vec<u8>> {
        let columns = self.columns();
        let field_columns = &columns[self.key_columns.len()..columns.len() - 1];

        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(&columns)?;

        for record in &self.records {
            let mut row: Vec<String> = record.key.values().iter().map(|v| v.to_string()).collect();
            row.resize(self.key_columns.len(), String::new());
            row.extend(
                field_columns
                    .iter()
                    .map(|name| record.fields.get(name).map(cell).unwrap_or_default()),
            );
            row.push(record.error.clone().unwrap_or_default());
            writer.write_record(&row)?;
        }

        writer
            .into_inner()
            .map_err(|e| crate::Error::Io(e.into_error()))
    }

    pub async fn persist_csv(&self, path: &Path) -> Res<()> {
        create_parent(path).await?;
        let bytes = self.to_csv()?;
        async_fs::write(path, bytes).await?;
        Ok(())
    }

    /// Writes every record as raw JSON, useful when the CSV step needs
    /// manual intervention.
    pub async fn persist_json(&self, path: &Path) -> Res<()> {
        create_parent(path).await?;
        let json = serde_json::to_string_pretty(&self.records)?;
        async_fs::write(path, json).await?;
        Ok(())
    }
}

async fn create_parent(path: &Path) -> Res<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            async_fs::create_dir_all(parent).await?;
        }
    }
    Ok(())
}

/// Renders a JSON value as a CSV cell; null is an empty cell, nested values
/// are written as JSON text.
pub fn cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::types::Fields;

    fn track(id: &str) -> RequestKey {
        RequestKey::TrackId { id: id.to_string() }
    }

    #[test]
    fn cell_rendering() {
        assert_eq!(cell(&Value::Null), "");
        assert_eq!(cell(&json!("x")), "x");
        assert_eq!(cell(&json!(0.5)), "0.5");
        assert_eq!(cell(&json!(["a", "b"])), r#"["a","b"]"#);
    }

    #[test]
    fn duplicate_keys_are_ignored() {
        let mut table = RecordTable::new(&["track_id"], &["id"]);
        assert!(table.push(Record::found(track("a"), Fields::new())));
        assert!(!table.push(Record::failed(track("a"), "boom".to_string())));
        assert_eq!(table.len(), 1);
        assert_eq!(table.error_count(), 0);
    }

    #[test]
    fn csv_keeps_one_row_per_key() {
        let mut table = RecordTable::new(&["track_id"], &["id", "tempo"]);
        let mut fields = Fields::new();
        fields.insert("id".to_string(), json!("a"));
        fields.insert("tempo".to_string(), json!(120.5));
        fields.insert("extra".to_string(), json!(true));
        table.push(Record::found(track("a"), fields));
        table.push(Record::failed(track("b"), "HTTP 500".to_string()));

        let csv = String::from_utf8(table.to_csv().unwrap()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "track_id,id,tempo,extra,error");
        assert_eq!(lines[1], "a,a,120.5,true,");
        assert_eq!(lines[2], "b,,,,HTTP 500");
        assert_eq!(lines.len(), 3);
    }
}
