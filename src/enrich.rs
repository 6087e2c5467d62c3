//! Enrichment loops.
//!
//! Turns lists of history keys into [`RecordTable`]s: ids are grouped into
//! endpoint-sized batches, searches go one key at a time, and every request
//! runs through the [`RetryDriver`]. A failing batch or key is written down
//! as an error record and the loop moves on. A run-ending error comes back as
//! [`Error::Aborted`] carrying the records collected so far.

use std::sync::Arc;

use indicatif::ProgressBar;
use serde_json::json;

use crate::{
    Error, Res, config,
    management::{CredentialStore, RecordTable},
    spotify::{
        auth::TokenManager,
        client::{ARTIST_SEARCH_FIELDS, BatchEndpoint, CatalogClient, TRACK_SEARCH_FIELDS},
        retry::{RetryDriver, RetryPolicy, TokioCooldown},
        transport::{HttpTransport, ReqwestTransport},
    },
    types::{Fields, Record, RequestKey},
};

#[derive(Debug)]
pub struct Enricher {
    client: CatalogClient,
    driver: RetryDriver,
}

impl Enricher {
    pub fn new(client: CatalogClient, driver: RetryDriver) -> Self {
        Self { client, driver }
    }

    /// Wires the production stack: credential file, `reqwest` transport,
    /// Spotify endpoints and the retry policy from the environment.
    pub async fn from_config() -> Res<Self> {
        let credentials = CredentialStore::from_config().load().await?;
        let transport: Arc<dyn HttpTransport> = Arc::new(ReqwestTransport::new()?);
        let tokens = Arc::new(TokenManager::new(
            Arc::clone(&transport),
            config::spotify_apitoken_url(),
            credentials,
        ));
        let client = CatalogClient::new(transport, config::spotify_apiurl(), Arc::clone(&tokens));
        let driver = RetryDriver::new(tokens, RetryPolicy::from_env(), Box::new(TokioCooldown));
        Ok(Self::new(client, driver))
    }

    /// Obtains the first token so bad credentials fail before any work.
    pub async fn authenticate(&self) -> Res<()> {
        self.client.tokens().acquire().await.map(|_| ())
    }

    pub fn client(&self) -> &CatalogClient {
        &self.client
    }

    /// Looks up `ids` on a several-items endpoint, one record per distinct id.
    ///
    /// Ids Spotify returns `null` for get the endpoint's all-null
    /// placeholder; ids of a failed batch get an error record each.
    ///
    /// # Errors
    ///
    /// [`Error::Aborted`] wrapping the cause (usually [`Error::AuthFatal`])
    /// together with the batches finished before it.
    pub async fn fetch_by_id(
        &self,
        endpoint: BatchEndpoint,
        ids: &[String],
        progress: &ProgressBar,
    ) -> Res<RecordTable> {
        let ids = distinct(ids);
        let mut table = RecordTable::new(key_for(endpoint, "").columns(), endpoint.schema());
        let batches: Vec<&[String]> = ids.chunks(endpoint.max_batch_size()).collect();
        progress.set_length(batches.len() as u64);

        for (index, batch) in batches.into_iter().enumerate() {
            let label = format!("{} batch {}", endpoint, index + 1);
            progress.set_message(label.clone());

            match self
                .driver
                .run(&label, || self.client.get_batch(endpoint, batch))
                .await
            {
                Ok(slots) => {
                    for (id, slot) in batch.iter().zip(slots) {
                        let fields = slot.unwrap_or_else(|| endpoint.placeholder());
                        table.push(Record::found(key_for(endpoint, id), fields));
                    }
                }
                Err(e) if e.is_item_level() => {
                    log::warn!("Exception hit for {}: {}", label, e);
                    for id in batch {
                        table.push(Record::failed(key_for(endpoint, id), e.to_string()));
                    }
                }
                Err(e) => return Err(abort(table, e)),
            }
            progress.inc(1);
        }

        Ok(table)
    }

    /// Searches every distinct (artist, track) pair and keeps the first hit.
    pub async fn search_tracks(&self, pairs: &[(String, String)], progress: &ProgressBar) -> Res<RecordTable> {
        let pairs = distinct(pairs);
        let mut table = RecordTable::new(&["artist", "track"], TRACK_SEARCH_FIELDS);
        progress.set_length(pairs.len() as u64);

        for (artist, track) in &pairs {
            let key = RequestKey::ArtistTrack {
                artist: artist.clone(),
                track: track.clone(),
            };
            progress.set_message(key.to_string());

            let result = self
                .driver
                .run(&key.to_string(), || self.client.search_track(artist, track))
                .await;
            match search_record(key, result) {
                Ok(record) => table.push(record),
                Err(e) => return Err(abort(table, e)),
            };
            progress.inc(1);
        }

        Ok(table)
    }

    /// Searches every distinct artist name and keeps the first hit.
    pub async fn search_artists(&self, artists: &[String], progress: &ProgressBar) -> Res<RecordTable> {
        let artists = distinct(artists);
        let mut table = RecordTable::new(&["artist"], ARTIST_SEARCH_FIELDS);
        progress.set_length(artists.len() as u64);
        log::info!("Requesting artist data on {} artists.", artists.len());

        for artist in &artists {
            let key = RequestKey::Artist {
                artist: artist.clone(),
            };
            progress.set_message(key.to_string());

            let result = self
                .driver
                .run(&key.to_string(), || self.client.search_artist(artist))
                .await;
            match search_record(key, result) {
                Ok(record) => table.push(record),
                Err(e) => return Err(abort(table, e)),
            };
            progress.inc(1);
        }

        Ok(table)
    }
}

fn key_for(endpoint: BatchEndpoint, id: &str) -> RequestKey {
    match endpoint {
        BatchEndpoint::Artists => RequestKey::ArtistId { id: id.to_string() },
        BatchEndpoint::Tracks | BatchEndpoint::AudioFeatures => RequestKey::TrackId { id: id.to_string() },
    }
}

fn search_record(key: RequestKey, result: Res<Fields>) -> Res<Record> {
    match result {
        Ok(fields) => Ok(Record::found(key, fields)),
        Err(e) if e.is_item_level() => {
            log::warn!("Exception hit for {}: {}", key, e);
            Ok(failure_record(key, &e))
        }
        Err(e) => Err(e),
    }
}

fn abort(table: RecordTable, cause: Error) -> Error {
    log::warn!("Stopping after {} records: {}", table.len(), cause);
    Error::Aborted {
        table: Box::new(table),
        source: Box::new(cause),
    }
}

fn failure_record(key: RequestKey, err: &Error) -> Record {
    let mut record = Record::failed(key, err.to_string());
    if let Some(status) = err.status() {
        record
            .fields
            .insert("status_code".to_string(), json!(status.as_u16()));
    }
    record
}

fn distinct<T: Clone + Eq + std::hash::Hash>(items: &[T]) -> Vec<T> {
    let mut seen = std::collections::HashSet::new();
    items.iter().filter(|i| seen.insert(*i)).cloned().collect()
}
