//! Configuration management for the streaming history enricher.
//!
//! This module handles loading and accessing configuration values from environment
//! variables and `.env` files. It provides a centralized way to manage application
//! configuration including Spotify API endpoints, credential and data locations,
//! and the rate-limit cooldown policy.
//!
//! The configuration system follows a hierarchical approach:
//! 1. Environment variables (highest priority)
//! 2. `.env` file in the local data directory
//! 3. Application defaults

use std::{env, path::PathBuf, time::Duration};

use crate::Res;

pub const DEFAULT_SPOTIFY_API_URL: &str = "https://api.spotify.com/v1";
pub const DEFAULT_SPOTIFY_API_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
pub const DEFAULT_COOLDOWN_SECS: u64 = 30;

/// Loads environment variables from a `.env` file in the local data directory.
///
/// Looks for `spunwrap/.env` under the platform-specific local data directory:
/// - Linux: `~/.local/share/spunwrap/.env`
/// - macOS: `~/Library/Application Support/spunwrap/.env`
/// - Windows: `%LOCALAPPDATA%/spunwrap/.env`
///
/// A missing file is not an error; every setting has a default or can be
/// supplied through the environment directly. Variables that are already set
/// are never overridden by the file.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or an existing `.env`
/// file cannot be parsed.
pub async fn load_env() -> Res<()> {
    let path = app_dir().join(".env");
    if let Some(parent) = path.parent() {
        async_fs::create_dir_all(parent).await?;
    }

    if path.is_file() {
        dotenv::from_path(&path).map_err(|e| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("cannot load {}: {}", path.display(), e),
            )
        })?;
    }
    Ok(())
}

/// Returns the Spotify Web API base URL.
///
/// Reads `SPOTIFY_API_URL`, defaulting to `https://api.spotify.com/v1`.
/// A trailing slash is stripped so paths can be appended with `/`.
pub fn spotify_apiurl() -> String {
    env::var("SPOTIFY_API_URL")
        .unwrap_or_else(|_| DEFAULT_SPOTIFY_API_URL.to_string())
        .trim_end_matches('/')
        .to_string()
}

/// Returns the Spotify token exchange URL.
///
/// Reads `SPOTIFY_API_TOKEN_URL`, defaulting to
/// `https://accounts.spotify.com/api/token`.
pub fn spotify_apitoken_url() -> String {
    env::var("SPOTIFY_API_TOKEN_URL").unwrap_or_else(|_| DEFAULT_SPOTIFY_API_TOKEN_URL.to_string())
}

/// Client id used when the credential file does not provide one.
pub fn spotify_client_id() -> Option<String> {
    env::var("SPOTIFY_API_AUTH_CLIENT_ID").ok()
}

/// Client secret used when the credential file does not provide one.
///
/// The client secret should be kept confidential and never exposed in logs
/// or version control.
pub fn spotify_client_secret() -> Option<String> {
    env::var("SPOTIFY_API_AUTH_CLIENT_SECRET").ok()
}

/// Path of the JSON credential file holding `CLIENT_ID` and `CLIENT_SECRET`.
///
/// Reads `SPUNWRAP_CREDENTIALS_FILE`, defaulting to
/// `<local data dir>/spunwrap/credentials/client_credentials.json`.
pub fn credentials_path() -> PathBuf {
    match env::var("SPUNWRAP_CREDENTIALS_FILE") {
        Ok(path) => PathBuf::from(path),
        Err(_) => app_dir()
            .join("credentials")
            .join("client_credentials.json"),
    }
}

/// Directory holding the history export and receiving the output tables.
///
/// Reads `SPUNWRAP_DATA_DIR`, defaulting to `<local data dir>/spunwrap/data`.
pub fn data_dir() -> PathBuf {
    match env::var("SPUNWRAP_DATA_DIR") {
        Ok(path) => PathBuf::from(path),
        Err(_) => app_dir().join("data"),
    }
}

/// Fixed wait applied after every 429 response.
///
/// Reads `SPUNWRAP_COOLDOWN_SECS`, defaulting to 30 seconds.
pub fn cooldown() -> Duration {
    Duration::from_secs(parse_u64(env::var("SPUNWRAP_COOLDOWN_SECS").ok()).unwrap_or(DEFAULT_COOLDOWN_SECS))
}

/// Upper bound on rate-limit retries for a single request.
///
/// Reads `SPUNWRAP_MAX_RATE_LIMIT_RETRIES`; unset or unparseable means
/// unbounded.
pub fn max_rate_limit_retries() -> Option<u32> {
    parse_u64(env::var("SPUNWRAP_MAX_RATE_LIMIT_RETRIES").ok()).and_then(|n| u32::try_from(n).ok())
}

fn parse_u64(value: Option<String>) -> Option<u64> {
    value.and_then(|v| v.trim().parse::<u64>().ok())
}

fn app_dir() -> PathBuf {
    let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("spunwrap");
    path
}
