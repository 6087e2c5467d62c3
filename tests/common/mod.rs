#![allow(dead_code)]

use std::{
    collections::VecDeque,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde_json::{Value, json};
use spunwrap::{
    Res,
    enrich::Enricher,
    spotify::{
        auth::TokenManager,
        client::CatalogClient,
        retry::{Cooldown, RetryDriver, RetryPolicy},
        transport::{HttpResponse, HttpTransport},
    },
    types::Credentials,
};

pub const API_URL: &str = "https://api.test/v1";
pub const TOKEN_URL: &str = "https://accounts.test/api/token";

type Responder = Box<dyn Fn(&str) -> HttpResponse + Send + Sync>;

/// Transport that answers GETs from a script and counts every call.
///
/// Scripted responses are used first, in order; after that the fallback
/// responder (or a 500) answers. Token requests return `token-<n>` where `n`
/// is the number of token requests so far, until `token_status` or
/// `fail_tokens_after` says otherwise.
pub struct FakeTransport {
    script: Mutex<VecDeque<HttpResponse>>,
    fallback: Option<Responder>,
    token_status: StatusCode,
    tokens_granted: Option<usize>,
    forms: Mutex<Vec<Vec<(String, String)>>>,
    urls: Mutex<Vec<String>>,
    bearers: Mutex<Vec<String>>,
    gets: AtomicUsize,
    posts: AtomicUsize,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: None,
            token_status: StatusCode::OK,
            tokens_granted: None,
            forms: Mutex::new(Vec::new()),
            urls: Mutex::new(Vec::new()),
            bearers: Mutex::new(Vec::new()),
            gets: AtomicUsize::new(0),
            posts: AtomicUsize::new(0),
        }
    }

    pub fn respond(self, status: StatusCode, body: impl Into<String>) -> Self {
        self.script
            .lock()
            .unwrap()
            .push_back(HttpResponse::new(status, body));
        self
    }

    pub fn fallback(mut self, responder: impl Fn(&str) -> HttpResponse + Send + Sync + 'static) -> Self {
        self.fallback = Some(Box::new(responder));
        self
    }

    pub fn token_status(mut self, status: StatusCode) -> Self {
        self.token_status = status;
        self
    }

    /// Grants the first `granted` token requests, then answers `status`.
    pub fn fail_tokens_after(mut self, granted: usize, status: StatusCode) -> Self {
        self.tokens_granted = Some(granted);
        self.token_status = status;
        self
    }

    pub fn get_calls(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn post_calls(&self) -> usize {
        self.posts.load(Ordering::SeqCst)
    }

    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }

    pub fn bearers(&self) -> Vec<String> {
        self.bearers.lock().unwrap().clone()
    }

    /// Form fields of every token request, in call order.
    pub fn forms(&self) -> Vec<Vec<(String, String)>> {
        self.forms.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpTransport for FakeTransport {
    async fn get(&self, url: &str, bearer: &str) -> Res<HttpResponse> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.urls.lock().unwrap().push(url.to_string());
        self.bearers.lock().unwrap().push(bearer.to_string());

        if let Some(response) = self.script.lock().unwrap().pop_front() {
            return Ok(response);
        }
        Ok(match &self.fallback {
            Some(responder) => responder(url),
            None => HttpResponse::new(StatusCode::INTERNAL_SERVER_ERROR, "no scripted response"),
        })
    }

    async fn post_form(&self, url: &str, form: &[(&str, &str)]) -> Res<HttpResponse> {
        assert_eq!(url, TOKEN_URL);
        self.forms.lock().unwrap().push(
            form.iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        );
        let n = self.posts.fetch_add(1, Ordering::SeqCst) + 1;
        let granted = self.tokens_granted.is_some_and(|limit| n <= limit);
        if self.token_status != StatusCode::OK && !granted {
            return Ok(HttpResponse::new(self.token_status, "down"));
        }
        let body = json!({
            "access_token": format!("token-{}", n),
            "token_type": "Bearer",
            "expires_in": 3600
        });
        Ok(HttpResponse::new(StatusCode::OK, body.to_string()))
    }
}

/// Cooldown that only counts how often it was asked to wait.
#[derive(Clone, Default)]
pub struct CountingCooldown {
    waits: Arc<AtomicUsize>,
}

impl CountingCooldown {
    pub fn waits(&self) -> usize {
        self.waits.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Cooldown for CountingCooldown {
    async fn wait(&self, _duration: Duration) {
        self.waits.fetch_add(1, Ordering::SeqCst);
    }
}

pub fn credentials() -> Credentials {
    Credentials {
        client_id: Some("id".to_string()),
        client_secret: Some("secret".to_string()),
    }
}

pub fn client_with(transport: Arc<FakeTransport>, credentials: Credentials) -> (CatalogClient, Arc<TokenManager>) {
    let tokens = Arc::new(TokenManager::new(
        transport.clone(),
        TOKEN_URL.to_string(),
        credentials,
    ));
    let client = CatalogClient::new(transport, API_URL.to_string(), Arc::clone(&tokens));
    (client, tokens)
}

pub fn client(transport: Arc<FakeTransport>) -> (CatalogClient, Arc<TokenManager>) {
    client_with(transport, credentials())
}

pub fn enricher_with(transport: Arc<FakeTransport>, policy: RetryPolicy) -> (Enricher, CountingCooldown) {
    let (client, tokens) = client(transport);
    let cooldown = CountingCooldown::default();
    let driver = RetryDriver::new(tokens, policy, Box::new(cooldown.clone()));
    (Enricher::new(client, driver), cooldown)
}

pub fn enricher(transport: Arc<FakeTransport>) -> (Enricher, CountingCooldown) {
    enricher_with(transport, RetryPolicy::default())
}

/// Decoded ids of a `?ids=a,b,c` batch url.
pub fn batch_ids(url: &str) -> Vec<String> {
    Url::parse(url)
        .unwrap()
        .query_pairs()
        .find(|(name, _)| name == "ids")
        .map(|(_, ids)| ids.split(',').map(str::to_string).collect())
        .unwrap_or_default()
}

/// Answers every batch request with one item per requested id under `key`.
pub fn echo_batch(key: &'static str) -> impl Fn(&str) -> HttpResponse + Send + Sync {
    move |url| {
        let items: Vec<Value> = batch_ids(url)
            .into_iter()
            .map(|id| json!({"id": id, "name": format!("name of {}", id)}))
            .collect();
        HttpResponse::new(StatusCode::OK, json!({ key: items }).to_string())
    }
}

/// Search response with the given items on the `tracks` or `artists` page.
pub fn search_page(page: &str, items: Value) -> String {
    json!({ page: { "items": items } }).to_string()
}

pub fn ok(body: impl Into<String>) -> HttpResponse {
    HttpResponse::new(StatusCode::OK, body)
}
