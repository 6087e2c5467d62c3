//! Streaming history loading.
//!
//! Reads the JSON files of a Spotify data export, either straight from the
//! downloaded zip archive or from a directory the files were collected in,
//! and turns them into one time-sorted list of plays with a catalog id.

use std::{
    collections::HashSet,
    io::{Cursor, Read},
    path::{Path, PathBuf},
    sync::LazyLock,
};

use chrono::{DateTime, NaiveDateTime, Utc};
use regex::Regex;

use crate::{Error, Res, types::PlayEvent};

const HISTORY_PREFIXES: &[&str] = &["Streaming", "endsong"];

// The pattern is a literal, so `expect` cannot fire.
static PERIOD_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^20[0-9]{2}_?[0-9]{1,2}\.json$").expect("valid period pattern"));

/// Returns `true` for file names that hold play records.
pub fn is_history_file(name: &str) -> bool {
    if !name.ends_with(".json") {
        return false;
    }
    HISTORY_PREFIXES.iter().any(|p| name.starts_with(p)) || PERIOD_PATTERN.is_match(name)
}

/// Catalog id from a `spotify:track:<id>` style URI.
///
/// Takes whatever follows the last `:`. URIs without a separator or with
/// nothing after it give `None`.
pub fn track_id_from_uri(uri: Option<&str>) -> Option<String> {
    let (_, id) = uri?.trim().rsplit_once(':')?;
    if id.is_empty() { None } else { Some(id.to_string()) }
}

/// Loads every history file under `source`, a `.zip` archive or a directory.
///
/// Plays without an artist or track name are dropped, the rest are sorted by
/// `endTime` and only the first play for each timestamp is kept.
///
/// # Errors
///
/// Fails when `source` does not exist, cannot be read, or a history file is
/// not a JSON list of plays.
pub async fn load_streaming_history(source: &Path) -> Res<Vec<PlayEvent>> {
    if !source.exists() {
        return Err(Error::History(format!("{} does not exist", source.display())));
    }

    let events = if source.is_dir() {
        read_directory(source).await?
    } else if source.extension().is_some_and(|e| e.eq_ignore_ascii_case("zip")) {
        read_archive(source).await?
    } else {
        return Err(Error::History(format!(
            "{} is neither a zip archive nor a directory",
            source.display()
        )));
    };

    Ok(normalize(events))
}

/// Finds the first `*my_spotify_data*.zip` in `dir`.
pub async fn find_export_archive(dir: &Path) -> Res<PathBuf> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut candidates = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().to_string();
        if name.contains("my_spotify_data") && name.ends_with(".zip") {
            candidates.push(entry.path());
        }
    }
    candidates.sort();
    candidates
        .into_iter()
        .next()
        .ok_or_else(|| Error::History(format!("could not find a my_spotify_data zip file in {}", dir.display())))
}

async fn read_directory(dir: &Path) -> Res<Vec<PlayEvent>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().to_string();
        if is_history_file(&name) && entry.path().is_file() {
            files.push(entry.path());
        }
    }
    files.sort();

    let mut events = Vec::new();
    for file in files {
        let content = async_fs::read(&file).await?;
        events.extend(parse_plays(&content, &file.display().to_string())?);
    }
    Ok(events)
}

async fn read_archive(path: &Path) -> Res<Vec<PlayEvent>> {
    let data = async_fs::read(path).await?;
    let mut archive = zip::ZipArchive::new(Cursor::new(data))?;

    let mut names: Vec<String> = archive
        .file_names()
        .filter(|name| {
            Path::new(name)
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(is_history_file)
        })
        .map(str::to_string)
        .collect();
    names.sort();

    let mut events = Vec::new();
    for name in names {
        let mut content = Vec::new();
        archive.by_name(&name)?.read_to_end(&mut content)?;
        events.extend(parse_plays(&content, &name)?);
    }
    Ok(events)
}

fn parse_plays(content: &[u8], origin: &str) -> Res<Vec<PlayEvent>> {
    serde_json::from_slice::<Vec<PlayEvent>>(content)
        .map_err(|e| Error::History(format!("cannot parse {}: {}", origin, e)))
}

fn normalize(mut events: Vec<PlayEvent>) -> Vec<PlayEvent> {
    events.retain(|e| e.artist_name.is_some() && e.track_name.is_some());
    events.sort_by(|a, b| a.end_time.cmp(&b.end_time));

    let before = events.len();
    let mut seen = HashSet::new();
    events.retain(|e| seen.insert(e.end_time.clone()));
    log::info!("Dropping {} duplicates by 'endTime' field...", before - events.len());

    for event in &mut events {
        event.track_id = track_id_from_uri(event.spotify_track_uri.as_deref());
    }
    events
}

/// Parses `endTime` in either export flavour (`2023-01-31 22:05` or
/// `2023-01-31T22:05:11Z`).
pub fn played_at(event: &PlayEvent) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(&event.end_time) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(&event.end_time, "%Y-%m-%d %H:%M")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Distinct track ids in first-seen order.
pub fn unique_track_ids(events: &[PlayEvent]) -> Vec<String> {
    let mut seen = HashSet::new();
    events
        .iter()
        .filter_map(|e| e.track_id.clone())
        .filter(|id| seen.insert(id.clone()))
        .collect()
}

/// Distinct artist names in first-seen order.
pub fn unique_artists(events: &[PlayEvent]) -> Vec<String> {
    let mut seen = HashSet::new();
    events
        .iter()
        .filter_map(|e| e.artist_name.clone())
        .filter(|a| seen.insert(a.clone()))
        .collect()
}

/// Distinct (artist, track) pairs in first-seen order.
pub fn unique_artist_track_pairs(events: &[PlayEvent]) -> Vec<(String, String)> {
    let mut seen = HashSet::new();
    events
        .iter()
        .filter_map(|e| Some((e.artist_name.clone()?, e.track_name.clone()?)))
        .filter(|pair| seen.insert(pair.clone()))
        .collect()
}
