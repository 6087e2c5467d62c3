use std::{fmt, sync::Arc};

use reqwest::{StatusCode, Url};
use serde_json::{Value, json};

use crate::{
    Error, Res,
    spotify::{
        ApiOutcome,
        auth::TokenManager,
        transport::{HttpResponse, HttpTransport},
    },
    types::{Fields, SearchPage, SearchResponse},
};

/// Column order of a track search record.
pub const TRACK_SEARCH_FIELDS: &[&str] = &["status_code", "nitems", "href", "id", "popularity"];

/// Column order of an artist search record.
pub const ARTIST_SEARCH_FIELDS: &[&str] = &[
    "status_code",
    "nitems",
    "href",
    "id",
    "name",
    "popularity",
    "followers",
    "genres",
];

const AUDIO_FEATURE_FIELDS: &[&str] = &[
    "danceability",
    "energy",
    "key",
    "loudness",
    "mode",
    "speechiness",
    "acousticness",
    "instrumentalness",
    "liveness",
    "valence",
    "tempo",
    "type",
    "id",
    "uri",
    "track_href",
    "analysis_url",
    "duration_ms",
    "time_signature",
];

const TRACK_FIELDS: &[&str] = &[
    "id",
    "name",
    "popularity",
    "duration_ms",
    "explicit",
    "disc_number",
    "track_number",
    "is_local",
    "href",
    "uri",
    "preview_url",
    "type",
    "album",
    "artists",
    "external_ids",
    "external_urls",
    "available_markets",
];

const ARTIST_FIELDS: &[&str] = &[
    "id",
    "name",
    "popularity",
    "followers",
    "genres",
    "href",
    "uri",
    "type",
    "images",
    "external_urls",
];

/// Several-items endpoints looked up by a comma separated id list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchEndpoint {
    Tracks,
    /// Artist lookup by catalog id. The history export carries no artist
    /// ids, so no command uses it; it is there for library callers that
    /// collected ids from track metadata.
    Artists,
    AudioFeatures,
}

impl BatchEndpoint {
    pub fn path(self) -> &'static str {
        match self {
            BatchEndpoint::Tracks => "tracks",
            BatchEndpoint::Artists => "artists",
            BatchEndpoint::AudioFeatures => "audio-features",
        }
    }

    /// Key of the list in the response object.
    pub fn response_key(self) -> &'static str {
        match self {
            BatchEndpoint::Tracks => "tracks",
            BatchEndpoint::Artists => "artists",
            BatchEndpoint::AudioFeatures => "audio_features",
        }
    }

    pub fn max_batch_size(self) -> usize {
        match self {
            BatchEndpoint::Tracks | BatchEndpoint::Artists => 50,
            BatchEndpoint::AudioFeatures => 100,
        }
    }

    pub fn schema(self) -> &'static [&'static str] {
        match self {
            BatchEndpoint::Tracks => TRACK_FIELDS,
            BatchEndpoint::Artists => ARTIST_FIELDS,
            BatchEndpoint::AudioFeatures => AUDIO_FEATURE_FIELDS,
        }
    }

    /// All-null record shaped like this endpoint's items.
    pub fn placeholder(self) -> Fields {
        null_fields(self.schema())
    }
}

impl fmt::Display for BatchEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Catalog lookups against the Spotify Web API.
///
/// Each call authenticates through the injected [`TokenManager`] and reports a
/// typed [`ApiOutcome`]. The outer `Result` is reserved for conditions that
/// must abort the run: a failed credential exchange or an oversized batch.
pub struct CatalogClient {
    transport: Arc<dyn HttpTransport>,
    base_url: String,
    tokens: Arc<TokenManager>,
}

impl CatalogClient {
    pub fn new(transport: Arc<dyn HttpTransport>, base_url: String, tokens: Arc<TokenManager>) -> Self {
        Self {
            transport,
            base_url: base_url.trim_end_matches('/').to_string(),
            tokens,
        }
    }

    pub fn tokens(&self) -> &TokenManager {
        &self.tokens
    }

    /// Fetches up to `endpoint.max_batch_size()` items by id.
    ///
    /// The returned slots line up with `ids`; `None` marks an id Spotify had
    /// no item for (a `null` entry) or a slot missing from a short response.
    ///
    /// # Errors
    ///
    /// [`Error::OversizedBatch`] before any request when `ids` is too long,
    /// [`Error::AuthFatal`] when no token can be obtained.
    pub async fn get_batch(
        &self,
        endpoint: BatchEndpoint,
        ids: &[String],
    ) -> Res<ApiOutcome<Vec<Option<Fields>>>> {
        if ids.len() > endpoint.max_batch_size() {
            return Err(Error::OversizedBatch {
                endpoint: endpoint.path(),
                len: ids.len(),
                max: endpoint.max_batch_size(),
            });
        }

        let url = match Url::parse_with_params(
            &format!("{}/{}", self.base_url, endpoint.path()),
            &[("ids", ids.join(","))],
        ) {
            Ok(url) => url,
            Err(e) => {
                return Ok(ApiOutcome::Failed {
                    status: None,
                    detail: format!("invalid batch url: {}", e),
                });
            }
        };

        let outcome = self.get(url.as_str()).await?;
        Ok(outcome.and_then(|body| {
            match body.get(endpoint.response_key()).and_then(Value::as_array) {
                Some(items) => {
                    let mut slots: Vec<Option<Fields>> = items
                        .iter()
                        .take(ids.len())
                        .map(|item| item.as_object().cloned())
                        .collect();
                    slots.resize(ids.len(), None);
                    ApiOutcome::Success(slots)
                }
                None => ApiOutcome::Failed {
                    status: Some(StatusCode::OK),
                    detail: format!("response has no `{}` list", endpoint.response_key()),
                },
            }
        }))
    }

    /// Searches for a track by artist and track name and keeps the first hit.
    pub async fn search_track(&self, artist: &str, track: &str) -> Res<ApiOutcome<Fields>> {
        let query = format!("artist:'{}' track:'{}'", artist, track);
        let outcome = self.search(&query, "track").await?;

        Ok(outcome.and_then(|response| match response.tracks {
            Some(page) => ApiOutcome::Success(track_search_fields(&page)),
            None => ApiOutcome::Failed {
                status: Some(StatusCode::OK),
                detail: "search response has no `tracks` page".to_string(),
            },
        }))
    }

    /// Searches for an artist by name and keeps the first hit.
    pub async fn search_artist(&self, artist: &str) -> Res<ApiOutcome<Fields>> {
        let query = format!("artist:'{}'", artist);
        let outcome = self.search(&query, "artist").await?;

        Ok(outcome.and_then(|response| match response.artists {
            Some(page) => ApiOutcome::Success(artist_search_fields(&page)),
            None => ApiOutcome::Failed {
                status: Some(StatusCode::OK),
                detail: "search response has no `artists` page".to_string(),
            },
        }))
    }

    async fn search(&self, query: &str, kind: &str) -> Res<ApiOutcome<SearchResponse>> {
        let url = match Url::parse_with_params(
            &format!("{}/search", self.base_url),
            &[("q", query), ("type", kind)],
        ) {
            Ok(url) => url,
            Err(e) => {
                return Ok(ApiOutcome::Failed {
                    status: None,
                    detail: format!("invalid search url: {}", e),
                });
            }
        };

        let outcome = self.get(url.as_str()).await?;
        Ok(outcome.and_then(|body| match serde_json::from_value::<SearchResponse>(body) {
            Ok(response) => ApiOutcome::Success(response),
            Err(e) => ApiOutcome::Failed {
                status: Some(StatusCode::OK),
                detail: format!("unexpected search payload: {}", e),
            },
        }))
    }

    async fn get(&self, url: &str) -> Res<ApiOutcome<Value>> {
        let token = self.tokens.acquire().await?;
        match self.transport.get(url, &token).await {
            Ok(response) => Ok(classify(response)),
            Err(e) => Ok(ApiOutcome::Failed {
                status: e.status(),
                detail: e.to_string(),
            }),
        }
    }
}

impl fmt::Debug for CatalogClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CatalogClient")
            .field("base_url", &self.base_url)
            .field("tokens", &self.tokens)
            .finish_non_exhaustive()
    }
}

fn classify(response: HttpResponse) -> ApiOutcome<Value> {
    match response.status {
        StatusCode::OK => match serde_json::from_str::<Value>(&response.body) {
            Ok(body) => ApiOutcome::Success(body),
            Err(e) => ApiOutcome::Failed {
                status: Some(response.status),
                detail: format!("response is not JSON: {}", e),
            },
        },
        StatusCode::TOO_MANY_REQUESTS => {
            log::warn!("GET request returned {} (rate limited)", response.status.as_u16());
            ApiOutcome::RateLimited {
                retry_after: response.retry_after,
            }
        }
        StatusCode::UNAUTHORIZED => {
            log::warn!("GET request returned {} (auth expired)", response.status.as_u16());
            ApiOutcome::AuthExpired
        }
        status => {
            log::warn!("GET request returned {}", status.as_u16());
            ApiOutcome::Failed {
                status: Some(status),
                detail: response.body,
            }
        }
    }
}

fn null_fields(names: &[&str]) -> Fields {
    names.iter().map(|name| (name.to_string(), Value::Null)).collect()
}

fn track_search_fields(page: &SearchPage) -> Fields {
    let mut fields = null_fields(TRACK_SEARCH_FIELDS);
    fields.insert("status_code".to_string(), json!(StatusCode::OK.as_u16()));
    fields.insert("nitems".to_string(), json!(page.items.len()));

    if let Some(item) = page.items.first() {
        for name in ["href", "id", "popularity"] {
            fields.insert(name.to_string(), item.get(name).cloned().unwrap_or(Value::Null));
        }
    }
    fields
}

fn artist_search_fields(page: &SearchPage) -> Fields {
    let mut fields = null_fields(ARTIST_SEARCH_FIELDS);
    fields.insert("status_code".to_string(), json!(StatusCode::OK.as_u16()));
    fields.insert("nitems".to_string(), json!(page.items.len()));

    if let Some(item) = page.items.first() {
        for name in ["href", "id", "name", "popularity", "genres"] {
            fields.insert(name.to_string(), item.get(name).cloned().unwrap_or(Value::Null));
        }
        let followers = item
            .get("followers")
            .and_then(|f| f.get("total"))
            .cloned()
            .unwrap_or(Value::Null);
        fields.insert("followers".to_string(), followers);
    }
    fields
}
