use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tabled::Tabled;

#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(rename = "CLIENT_ID", default)]
    pub client_id: Option<String>,
    #[serde(rename = "CLIENT_SECRET", default)]
    pub client_secret: Option<String>,
}

/// Metadata mapping of a single record, in column order.
pub type Fields = Map<String, Value>;

/// The input a record was requested for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RequestKey {
    TrackId { id: String },
    ArtistId { id: String },
    Artist { artist: String },
    ArtistTrack { artist: String, track: String },
}

impl RequestKey {
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            RequestKey::TrackId { .. } => &["track_id"],
            RequestKey::ArtistId { .. } => &["artist_id"],
            RequestKey::Artist { .. } => &["artist"],
            RequestKey::ArtistTrack { .. } => &["artist", "track"],
        }
    }

    pub fn values(&self) -> Vec<&str> {
        match self {
            RequestKey::TrackId { id } | RequestKey::ArtistId { id } => vec![id],
            RequestKey::Artist { artist } => vec![artist],
            RequestKey::ArtistTrack { artist, track } => vec![artist, track],
        }
    }
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestKey::TrackId { id } | RequestKey::ArtistId { id } => write!(f, "{}", id),
            RequestKey::Artist { artist } => write!(f, "{}", artist),
            RequestKey::ArtistTrack { artist, track } => write!(f, "{} - {}", artist, track),
        }
    }
}

/// One output row: the metadata found for a key, or the error that stopped it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub key: RequestKey,
    pub fields: Fields,
    pub error: Option<String>,
}

impl Record {
    pub fn found(key: RequestKey, fields: Fields) -> Self {
        Self {
            key,
            fields,
            error: None,
        }
    }

    pub fn failed(key: RequestKey, error: String) -> Self {
        Self {
            key,
            fields: Fields::new(),
            error: Some(error),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    pub tracks: Option<SearchPage>,
    pub artists: Option<SearchPage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchPage {
    pub items: Vec<Value>,
}

/// A single play from the streaming history export.
///
/// Field names follow the account-data export; the extended history names
/// are accepted as aliases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayEvent {
    #[serde(rename = "endTime", alias = "ts")]
    pub end_time: String,
    #[serde(rename = "artistName", alias = "master_metadata_album_artist_name", default)]
    pub artist_name: Option<String>,
    #[serde(rename = "trackName", alias = "master_metadata_track_name", default)]
    pub track_name: Option<String>,
    #[serde(rename = "albumName", alias = "master_metadata_album_album_name", default)]
    pub album_name: Option<String>,
    #[serde(rename = "msPlayed", alias = "ms_played", default)]
    pub ms_played: Option<u64>,
    #[serde(default)]
    pub spotify_track_uri: Option<String>,
    #[serde(default)]
    pub conn_country: Option<String>,
    #[serde(default)]
    pub reason_start: Option<String>,
    #[serde(default)]
    pub reason_end: Option<String>,
    #[serde(default)]
    pub shuffle: Option<bool>,
    #[serde(default)]
    pub skipped: Option<bool>,
    #[serde(default, skip_deserializing)]
    pub track_id: Option<String>,
}

#[derive(Tabled)]
pub struct HistorySummaryRow {
    pub metric: String,
    pub value: String,
}
