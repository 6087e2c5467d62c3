use crate::{
    Error,
    enrich::Enricher,
    error, history, info,
    management::RecordTable,
    spotify::client::BatchEndpoint,
    success, warning,
};

use super::{RunOptions, load_plays, progress_bar};

pub async fn tracks(opts: RunOptions) {
    let plays = load_plays(opts.source.clone()).await;
    let ids = history::unique_track_ids(&plays);
    info!("Requesting track metadata on {} tracks", ids.len());

    let enricher = connect().await;
    let pb = progress_bar();
    let result = enricher.fetch_by_id(BatchEndpoint::Tracks, &ids, &pb).await;
    pb.finish_and_clear();

    finish(result, &opts, "track_metadata").await;
}

pub async fn audio_features(opts: RunOptions) {
    let plays = load_plays(opts.source.clone()).await;
    let ids = history::unique_track_ids(&plays);
    info!("Requesting audio features on {} tracks", ids.len());

    let enricher = connect().await;
    let pb = progress_bar();
    let result = enricher
        .fetch_by_id(BatchEndpoint::AudioFeatures, &ids, &pb)
        .await;
    pb.finish_and_clear();

    finish(result, &opts, "audio_features").await;
}

pub async fn artists(opts: RunOptions) {
    let plays = load_plays(opts.source.clone()).await;
    let names = history::unique_artists(&plays);
    info!("Searching metadata on {} artists", names.len());

    let enricher = connect().await;
    let pb = progress_bar();
    let result = enricher.search_artists(&names, &pb).await;
    pb.finish_and_clear();

    finish(result, &opts, "artist_metadata").await;
}

pub async fn track_search(opts: RunOptions) {
    let plays = load_plays(opts.source.clone()).await;
    let pairs = history::unique_artist_track_pairs(&plays);
    info!("Searching metadata on {} artist/track pairs", pairs.len());

    let enricher = connect().await;
    let pb = progress_bar();
    let result = enricher.search_tracks(&pairs, &pb).await;
    pb.finish_and_clear();

    finish(result, &opts, "track_metadata_from_search").await;
}

async fn connect() -> Enricher {
    let enricher = match Enricher::from_config().await {
        Ok(enricher) => enricher,
        Err(e) => error!("Cannot set up the Spotify client. Err: {}", e),
    };

    match enricher.authenticate().await {
        Ok(()) => enricher,
        Err(Error::AuthFatal { status, message }) => match status {
            Some(status) => error!("Authentication rejected ({}): {}", status, message),
            None => error!("Authentication failed: {}", message),
        },
        Err(e) => error!("Authentication failed: {}", e),
    }
}

async fn finish(result: crate::Res<RecordTable>, opts: &RunOptions, name: &str) {
    let (table, stopped_by) = match result {
        Ok(table) => (table, None),
        Err(Error::Aborted { table, source }) => (*table, Some(source)),
        Err(e) => error!("Enrichment stopped. Err: {}", e),
    };

    let output = opts.output_dir();
    let csv_path = output.join(format!("{}.csv", name));
    if let Err(e) = table.persist_csv(&csv_path).await {
        error!("Failed to write {}. Err: {}", csv_path.display(), e);
    }

    if opts.dump_raw_json {
        let json_path = output.join(format!("{}.json", name));
        match table.persist_json(&json_path).await {
            Ok(()) => info!("Raw records written to {}", json_path.display()),
            Err(e) => warning!("Failed to write {}. Err: {}", json_path.display(), e),
        }
    }

    if let Some(cause) = stopped_by {
        error!(
            "Enrichment stopped after {} records, partial results are in {}. Err: {}",
            table.len(),
            csv_path.display(),
            cause
        );
    }

    let failed = table.error_count();
    if failed > 0 {
        warning!(
            "{} of {} records finished with an error, see the 'error' column",
            failed,
            table.len()
        );
    }
    success!("Wrote {} records to {}", table.len(), csv_path.display());
}
