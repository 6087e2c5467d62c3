use std::{future::Future, sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::StatusCode;

use crate::{Error, Res, config, spotify::ApiOutcome, spotify::auth::TokenManager};

/// Default number of back-to-back token refreshes tolerated for one request.
pub const DEFAULT_MAX_AUTH_REFRESHES: u32 = 3;

/// Wait applied between a 429 response and the next attempt.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Cooldown: Send + Sync {
    async fn wait(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioCooldown;

#[async_trait]
impl Cooldown for TokioCooldown {
    async fn wait(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// How the driver reacts to transient responses.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Fixed wait after every 429.
    pub cooldown: Duration,
    /// `None` keeps retrying rate-limited requests forever.
    pub max_rate_limit_retries: Option<u32>,
    /// Consecutive 401s answered with a refresh before the item is failed.
    pub max_auth_refreshes: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            cooldown: Duration::from_secs(config::DEFAULT_COOLDOWN_SECS),
            max_rate_limit_retries: None,
            max_auth_refreshes: DEFAULT_MAX_AUTH_REFRESHES,
        }
    }
}

impl RetryPolicy {
    pub fn from_env() -> Self {
        Self {
            cooldown: config::cooldown(),
            max_rate_limit_retries: config::max_rate_limit_retries(),
            ..Self::default()
        }
    }
}

/// Re-issues a catalog call until it succeeds or fails for good.
///
/// Rate limits are waited out with the configured cooldown, expired tokens
/// are refreshed and the same request is attempted again. Any other failure
/// comes back as [`Error::ItemFailure`] so the caller can record it against
/// the key and move on. [`Error::AuthFatal`] and [`Error::OversizedBatch`]
/// pass straight through.
pub struct RetryDriver {
    tokens: Arc<TokenManager>,
    policy: RetryPolicy,
    cooldown: Box<dyn Cooldown>,
}

impl RetryDriver {
    pub fn new(tokens: Arc<TokenManager>, policy: RetryPolicy, cooldown: Box<dyn Cooldown>) -> Self {
        Self {
            tokens,
            policy,
            cooldown,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub async fn run<T, F, Fut>(&self, label: &str, mut call: F) -> Res<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Res<ApiOutcome<T>>>,
    {
        let mut rate_limited: u32 = 0;
        let mut refreshes: u32 = 0;

        loop {
            match call().await? {
                ApiOutcome::Success(value) => return Ok(value),
                ApiOutcome::RateLimited { retry_after } => {
                    if let Some(max) = self.policy.max_rate_limit_retries {
                        if rate_limited >= max {
                            return Err(Error::ItemFailure {
                                status: Some(StatusCode::TOO_MANY_REQUESTS),
                                detail: format!("still rate limited after {} retries", max),
                            });
                        }
                    }
                    rate_limited += 1;

                    log::warn!(
                        "Rate limited on {} (Retry-After: {}). Sleeping for {}s",
                        label,
                        retry_after.map_or_else(|| "-".to_string(), |s| format!("{}s", s)),
                        self.policy.cooldown.as_secs()
                    );
                    self.cooldown.wait(self.policy.cooldown).await;
                }
                ApiOutcome::AuthExpired => {
                    if refreshes >= self.policy.max_auth_refreshes {
                        return Err(Error::ItemFailure {
                            status: Some(StatusCode::UNAUTHORIZED),
                            detail: format!("token rejected after {} refreshes", refreshes),
                        });
                    }
                    refreshes += 1;

                    log::warn!("Access token expired on {} - refreshing", label);
                    self.tokens.invalidate_and_refresh().await?;
                }
                ApiOutcome::Failed { status, detail } => {
                    log::warn!("Request for {} failed: {}", label, detail);
                    return Err(Error::ItemFailure { status, detail });
                }
            }
        }
    }
}

impl std::fmt::Debug for RetryDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryDriver")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}
