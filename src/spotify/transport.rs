use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, header::RETRY_AFTER};

use crate::{Error, Res};

/// Status, `Retry-After` header and raw body of an HTTP response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub retry_after: Option<u64>,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            retry_after: None,
            body: body.into(),
        }
    }
}

/// The two request shapes the Spotify client needs.
///
/// Network-level failures are reported as [`Error::ItemFailure`] without a
/// status; any response that arrived, whatever its status, is `Ok`.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn get(&self, url: &str, bearer: &str) -> Res<HttpResponse>;

    async fn post_form(&self, url: &str, form: &[(&str, &str)]) -> Res<HttpResponse>;
}

#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new() -> Res<Self> {
        let client = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(network_error)?;
        Ok(Self { client })
    }

    async fn read(response: reqwest::Response) -> Res<HttpResponse> {
        let status = response.status();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());
        let body = response.text().await.map_err(network_error)?;

        Ok(HttpResponse {
            status,
            retry_after,
            body,
        })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &str, bearer: &str) -> Res<HttpResponse> {
        log::debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .bearer_auth(bearer)
            .send()
            .await
            .map_err(network_error)?;
        Self::read(response).await
    }

    async fn post_form(&self, url: &str, form: &[(&str, &str)]) -> Res<HttpResponse> {
        log::debug!("POST {}", url);
        let response = self
            .client
            .post(url)
            .form(form)
            .send()
            .await
            .map_err(network_error)?;
        Self::read(response).await
    }
}

fn network_error(err: reqwest::Error) -> Error {
    Error::ItemFailure {
        status: err.status(),
        detail: err.to_string(),
    }
}
