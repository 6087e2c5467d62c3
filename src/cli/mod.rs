//! # CLI Module
//!
//! User-facing commands of spunwrap. Each command loads the streaming
//! history, runs one enrichment task against the Spotify Web API and writes
//! the resulting table to the output directory.
//!
//! ## Commands
//!
//! - [`tracks`] - Track metadata by catalog id
//! - [`audio_features`] - Audio features by catalog id
//! - [`artists`] - Artist search per unique artist name
//! - [`track_search`] - Track search per unique (artist, track) pair
//! - [`history`] - Summary of the loaded history, no network access
//!
//! ## Flow
//!
//! ```text
//! History Loader → Enricher → Retry Driver → Catalog Client
//!                     ↓
//!               Record Table → CSV / raw JSON
//! ```
//!
//! Fatal problems (missing history, rejected credentials, unwritable output)
//! are reported with the `error!` macro and end the process. Per-item
//! failures end up in the table's `error` column and are summarised with a
//! warning once the run is done.
//!
//! ## Usage
//!
//! ```bash
//! spunwrap history --source ~/Downloads/my_spotify_data.zip
//! spunwrap tracks --output ./out
//! spunwrap audio-features --dump-raw-json
//! ```

mod enrich;
mod history;

use std::{
    io::{self, Write},
    path::PathBuf,
    sync::LazyLock,
    time::Duration,
};

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

pub use enrich::{artists, audio_features, track_search, tracks};
pub use history::history;

use crate::{config, error, history as loader, info, types::PlayEvent};

/// Options shared by every command that reads the history.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Export archive or directory; defaults to the first
    /// `*my_spotify_data*.zip` in the data directory.
    pub source: Option<PathBuf>,
    /// Directory the tables are written to; defaults to the data directory.
    pub output: Option<PathBuf>,
    /// Also write every record as JSON next to the CSV.
    pub dump_raw_json: bool,
}

impl RunOptions {
    fn output_dir(&self) -> PathBuf {
        self.output.clone().unwrap_or_else(config::data_dir)
    }
}

async fn resolve_source(source: Option<PathBuf>) -> PathBuf {
    if let Some(source) = source {
        return source;
    }

    let data_dir = config::data_dir();
    match loader::find_export_archive(&data_dir).await {
        Ok(path) => path,
        Err(e) => error!("No history source given and none found. Err: {}", e),
    }
}

async fn load_plays(source: Option<PathBuf>) -> Vec<PlayEvent> {
    let source = resolve_source(source).await;
    info!("Loading streaming history from {}", source.display());

    match loader::load_streaming_history(&source).await {
        Ok(plays) => {
            info!("Loaded {} plays", plays.len());
            plays
        }
        Err(e) => error!("Failed to load streaming history. Err: {}", e),
    }
}

static PROGRESS: LazyLock<MultiProgress> = LazyLock::new(MultiProgress::new);

/// Log sink that hides the active progress bars while a line is written,
/// so log output lands above the bar instead of through it.
///
/// Meant as the `env_logger` pipe target.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProgressLogWriter;

impl Write for ProgressLogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        PROGRESS.suspend(|| io::stderr().write_all(buf))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()
    }
}

fn progress_bar() -> ProgressBar {
    let pb = PROGRESS.add(ProgressBar::new(0));
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_style(
        ProgressStyle::with_template("{spinner:.blue} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
            .progress_chars("=> "),
    );
    pb
}
