use reqwest::StatusCode;
use thiserror::Error;

use crate::management::RecordTable;

/// Errors produced while loading history, talking to Spotify or exporting
/// records.
///
/// Only [`Error::ItemFailure`] is recoverable at the enrichment level: it is
/// written into the failing key's record and the run continues. Everything
/// else aborts the run.
#[derive(Debug, Error)]
pub enum Error {
    /// The client-credential exchange itself failed.
    ///
    /// Not retried, since it points at missing or wrong credentials.
    #[error("authentication failed{}: {message}", fmt_status(.status))]
    AuthFatal {
        status: Option<StatusCode>,
        message: String,
    },

    /// A batch larger than the endpoint allows was handed to the client.
    #[error("batch of {len} ids exceeds the {max} id limit of the {endpoint} endpoint")]
    OversizedBatch {
        endpoint: &'static str,
        len: usize,
        max: usize,
    },

    /// A single batch or key failed (network fault, unexpected status or
    /// payload shape).
    #[error("request failed{}: {detail}", fmt_status(.status))]
    ItemFailure {
        status: Option<StatusCode>,
        detail: String,
    },

    /// The streaming history export could not be located or understood.
    #[error("history error: {0}")]
    History(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("zip archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// A run-ending error hit after some records were already collected.
    ///
    /// `table` holds every record finished before `source` stopped the run.
    #[error("{source} ({} records collected before the run stopped)", .table.len())]
    Aborted {
        table: Box<RecordTable>,
        source: Box<Error>,
    },
}

impl Error {
    /// Returns `true` for failures scoped to one batch or key.
    pub fn is_item_level(&self) -> bool {
        matches!(self, Self::ItemFailure { .. })
    }

    /// HTTP status attached to the error, if any.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::AuthFatal { status, .. } | Self::ItemFailure { status, .. } => *status,
            Self::Aborted { source, .. } => source.status(),
            _ => None,
        }
    }
}

fn fmt_status(status: &Option<StatusCode>) -> String {
    match status {
        Some(s) => format!(" ({})", s.as_u16()),
        None => String::new(),
    }
}
