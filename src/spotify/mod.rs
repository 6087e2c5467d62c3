//! # Spotify Integration Module
//!
//! This module is the integration layer between the enrichment loops and the
//! Spotify Web API. It handles client-credential authentication, the catalog
//! lookups the enricher needs, and the retry driver that keeps a run of
//! thousands of requests alive through rate limits and token expiry.
//!
//! ## Architecture
//!
//! ```text
//! Enricher (batches of ids, search keys)
//!          ↓
//! Retry Driver ── cooldown on 429, refresh on 401
//!          ↓
//! Catalog Client ── typed outcome per call
//!          ↓
//! Token Manager ── bearer token, refreshed on demand
//!          ↓
//! HTTP Transport (reqwest)
//!          ↓
//! Spotify Web API
//! ```
//!
//! ## Core Modules
//!
//! - [`transport`] - the HTTP seam; production uses `reqwest`, tests script
//!   responses.
//! - [`auth`] - client-credential token exchange and reactive refresh.
//! - [`client`] - `GET /tracks`, `GET /artists`, `GET /audio-features` batch
//!   lookups and `GET /search` for tracks and artists.
//! - [`retry`] - one generic attempt-with-recovery wrapper for every call.
//!
//! ## Thread Safety
//!
//! Everything here runs sequentially on one task. The token slot sits behind
//! an async mutex only so the Token Manager can be shared by reference.

pub mod auth;
pub mod client;
pub mod retry;
pub mod transport;

use reqwest::StatusCode;

/// Result of one attempt against the catalog API.
///
/// The retry driver branches on this instead of inspecting a status code
/// left behind by the previous call.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiOutcome<T> {
    Success(T),
    RateLimited { retry_after: Option<u64> },
    AuthExpired,
    Failed {
        status: Option<StatusCode>,
        detail: String,
    },
}

impl<T> ApiOutcome<T> {
    /// Chains a step that only runs on success; the other variants carry over.
    pub fn and_then<U>(self, f: impl FnOnce(T) -> ApiOutcome<U>) -> ApiOutcome<U> {
        match self {
            ApiOutcome::Success(v) => f(v),
            ApiOutcome::RateLimited { retry_after } => ApiOutcome::RateLimited { retry_after },
            ApiOutcome::AuthExpired => ApiOutcome::AuthExpired,
            ApiOutcome::Failed { status, detail } => ApiOutcome::Failed { status, detail },
        }
    }
}
