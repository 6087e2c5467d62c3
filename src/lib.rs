//! Spotify Streaming History Enrichment Library
//!
//! This library loads a personal Spotify streaming history export and enriches
//! it with track, artist and audio-feature metadata from the Spotify Web API.
//! Every lookup runs through a single retry driver that waits out rate limits,
//! refreshes expired client-credential tokens and records isolated failures
//! without aborting the run.
//!
//! # Modules
//!
//! - `cli` - Command-line interface implementations
//! - `config` - Configuration management and environment variables
//! - `enrich` - Batch and search enrichment loops over history keys
//! - `error` - Error type shared by the whole crate
//! - `history` - Streaming history loading and normalisation
//! - `management` - Credentials and record table persistence
//! - `spotify` - Spotify Web API client implementation
//! - `types` - Data structures and type definitions
//!
//! # Example
//!
//! ```
//! use indicatif::ProgressBar;
//! use spunwrap::{config, enrich::Enricher, history, spotify::client::BatchEndpoint};
//!
//! #[tokio::main]
//! async fn main() -> spunwrap::Res<()> {
//!     config::load_env().await?;
//!
//!     let plays = history::load_streaming_history("my_spotify_data.zip".as_ref()).await?;
//!     let enricher = Enricher::from_config().await?;
//!     enricher.authenticate().await?;
//!
//!     let ids = history::unique_track_ids(&plays);
//!     let table = enricher
//!         .fetch_by_id(BatchEndpoint::Tracks, &ids, &ProgressBar::hidden())
//!         .await?;
//!     table.persist_csv("track_metadata.csv".as_ref()).await?;
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod enrich;
pub mod error;
pub mod history;
pub mod management;
pub mod spotify;
pub mod types;

pub use error::Error;

/// A convenient Result type alias for operations that may fail.
///
/// Every fallible operation in the crate reports a [`Error`], so callers can
/// tell fatal authentication problems apart from per-item failures.
pub type Res<T> = std::result::Result<T, Error>;

/// Prints an informational message with a blue bullet point.
///
/// # Example
///
/// ```
/// info!("Loading streaming history...");
/// info!("Found {} plays", count);
/// ```
#[macro_export]
macro_rules! info {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "o".blue().bold(), std::format_args!($($arg)*));
  })
}

/// Prints a success message with a green checkmark.
///
/// # Example
///
/// ```
/// success!("Wrote {} records", count);
/// ```
#[macro_export]
macro_rules! success {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "✓".green().bold(), std::format_args!($($arg)*));
  })
}

/// Prints an error message with a red exclamation mark and exits the program.
///
/// This macro will cause the program to exit immediately after printing
/// the error message. It should only be used for fatal errors where
/// recovery is not possible.
///
/// # Example
///
/// ```
/// error!("Authentication failed: {}", e);
/// // Program exits here - code after this will not execute
/// ```
#[macro_export]
macro_rules! error {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "!".red().bold(), std::format_args!($($arg)*));
    std::process::exit(1);
  })
}

/// Prints a warning message with a yellow exclamation mark.
///
/// # Example
///
/// ```
/// warning!("{} keys finished with an error", failed);
/// ```
#[macro_export]
macro_rules! warning {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "!".yellow().bold(), std::format_args!($($arg)*));
  })
}
