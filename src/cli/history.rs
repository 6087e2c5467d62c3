use std::path::PathBuf;

use tabled::Table;

use crate::{
    history::{self, played_at},
    types::{HistorySummaryRow, PlayEvent},
};

use super::load_plays;

/// Prints a summary of the history export without touching the network.
pub async fn history(source: Option<PathBuf>) {
    let plays = load_plays(source).await;
    let table = Table::new(summarize(&plays));
    println!("{}", table);
}

pub(crate) fn summarize(plays: &[PlayEvent]) -> Vec<HistorySummaryRow> {
    let mut times: Vec<_> = plays.iter().filter_map(played_at).collect();
    times.sort();

    let minutes = plays.iter().filter_map(|p| p.ms_played).sum::<u64>() / 60_000;
    let without_id = plays.iter().filter(|p| p.track_id.is_none()).count();

    let range = match (times.first(), times.last()) {
        (Some(first), Some(last)) => format!("{} - {}", first.format("%Y-%m-%d"), last.format("%Y-%m-%d")),
        _ => "-".to_string(),
    };

    vec![
        row("Plays", plays.len()),
        row("Distinct tracks", history::unique_artist_track_pairs(plays).len()),
        row("Distinct track ids", history::unique_track_ids(plays).len()),
        row("Plays without track id", without_id),
        row("Distinct artists", history::unique_artists(plays).len()),
        row("Minutes played", minutes),
        HistorySummaryRow {
            metric: "Period".to_string(),
            value: range,
        },
    ]
}

fn row(metric: &str, value: impl ToString) -> HistorySummaryRow {
    HistorySummaryRow {
        metric: metric.to_string(),
        value: value.to_string(),
    }
}
