mod common;

use std::sync::Arc;

use reqwest::StatusCode;
use serde_json::{Value, json};
use spunwrap::{
    Error,
    spotify::{
        ApiOutcome,
        client::BatchEndpoint,
        retry::{RetryDriver, RetryPolicy},
    },
    types::Credentials,
};

use common::{CountingCooldown, FakeTransport, search_page};

fn ids(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("id{}", i)).collect()
}

#[tokio::test]
async fn oversized_batch_is_rejected_before_any_request() {
    let transport = Arc::new(FakeTransport::new());
    let (client, _) = common::client(transport.clone());

    let result = client.get_batch(BatchEndpoint::Tracks, &ids(51)).await;

    match result {
        Err(Error::OversizedBatch { endpoint, len, max }) => {
            assert_eq!(endpoint, "tracks");
            assert_eq!(len, 51);
            assert_eq!(max, 50);
        }
        other => panic!("expected OversizedBatch, got {:?}", other),
    }
    assert_eq!(transport.get_calls(), 0);
    assert_eq!(transport.post_calls(), 0);
}

#[tokio::test]
async fn audio_features_take_a_hundred_ids() {
    let transport = Arc::new(FakeTransport::new().fallback(common::echo_batch("audio_features")));
    let (client, _) = common::client(transport.clone());

    let outcome = client
        .get_batch(BatchEndpoint::AudioFeatures, &ids(100))
        .await
        .unwrap();

    match outcome {
        ApiOutcome::Success(slots) => assert_eq!(slots.len(), 100),
        other => panic!("expected success, got {:?}", other),
    }
    let url = &transport.urls()[0];
    assert!(url.starts_with("https://api.test/v1/audio-features?ids="));
    assert_eq!(common::batch_ids(url), ids(100));
}

#[tokio::test]
async fn batch_ids_are_percent_encoded() {
    let transport = Arc::new(FakeTransport::new().fallback(common::echo_batch("tracks")));
    let (client, _) = common::client(transport.clone());
    let batch = vec!["a&market=XX".to_string(), "b#c".to_string(), "d e".to_string()];

    let outcome = client.get_batch(BatchEndpoint::Tracks, &batch).await.unwrap();

    let ApiOutcome::Success(slots) = outcome else {
        panic!("expected success");
    };
    assert_eq!(slots.len(), 3);
    assert_eq!(slots[1].as_ref().unwrap()["id"], json!("b#c"));

    let url = &transport.urls()[0];
    assert!(!url.contains('#'));
    assert!(!url.contains("&market"));
    assert_eq!(common::batch_ids(url), batch);
}

#[tokio::test]
async fn null_and_missing_slots_are_none() {
    let transport = Arc::new(
        FakeTransport::new().respond(StatusCode::OK, r#"{"tracks": [{"id": "a"}, null]}"#),
    );
    let (client, _) = common::client(transport);
    let batch = vec!["a".to_string(), "b".to_string(), "c".to_string()];

    let outcome = client.get_batch(BatchEndpoint::Tracks, &batch).await.unwrap();

    let ApiOutcome::Success(slots) = outcome else {
        panic!("expected success");
    };
    assert_eq!(slots.len(), 3);
    assert_eq!(slots[0].as_ref().unwrap()["id"], json!("a"));
    assert!(slots[1].is_none());
    assert!(slots[2].is_none());
}

#[tokio::test]
async fn token_is_requested_once_and_reused() {
    let transport = Arc::new(FakeTransport::new().fallback(common::echo_batch("tracks")));
    let (client, tokens) = common::client(transport.clone());

    for _ in 0..3 {
        client.get_batch(BatchEndpoint::Tracks, &ids(2)).await.unwrap();
    }

    assert_eq!(transport.post_calls(), 1);
    assert_eq!(tokens.refresh_count(), 0);
    assert_eq!(transport.bearers(), vec!["token-1"; 3]);

    let form = &transport.forms()[0];
    let field = |name: &str| {
        form.iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    };
    assert_eq!(field("grant_type"), Some("client_credentials"));
    assert_eq!(field("client_id"), Some("id"));
    assert_eq!(field("client_secret"), Some("secret"));
    assert_eq!(form.len(), 3);
}

#[tokio::test]
async fn expired_token_is_refreshed_exactly_once() {
    let transport = Arc::new(
        FakeTransport::new()
            .respond(StatusCode::UNAUTHORIZED, r#"{"error":{"status":401}}"#)
            .respond(StatusCode::OK, r#"{"tracks": [{"id": "a"}]}"#),
    );
    let (client, tokens) = common::client(transport.clone());
    let cooldown = CountingCooldown::default();
    let driver = RetryDriver::new(tokens.clone(), RetryPolicy::default(), Box::new(cooldown.clone()));
    let batch = vec!["a".to_string()];

    let slots = driver
        .run("tracks batch 1", || client.get_batch(BatchEndpoint::Tracks, &batch))
        .await
        .unwrap();

    assert_eq!(slots.len(), 1);
    assert_eq!(tokens.refresh_count(), 1);
    assert_eq!(transport.post_calls(), 2);
    assert_eq!(transport.bearers(), vec!["token-1", "token-2"]);
    assert_eq!(transport.forms()[1], transport.forms()[0]);
    assert_eq!(cooldown.waits(), 0);
}

#[tokio::test]
async fn rejected_credentials_are_fatal() {
    let transport = Arc::new(FakeTransport::new().token_status(StatusCode::BAD_REQUEST));
    let (client, _) = common::client(transport.clone());

    let result = client.get_batch(BatchEndpoint::Tracks, &ids(1)).await;

    match result {
        Err(Error::AuthFatal { status, .. }) => assert_eq!(status, Some(StatusCode::BAD_REQUEST)),
        other => panic!("expected AuthFatal, got {:?}", other),
    }
    assert_eq!(transport.get_calls(), 0);
}

#[tokio::test]
async fn missing_credentials_are_fatal_without_a_request() {
    let transport = Arc::new(FakeTransport::new());
    let (client, tokens) = common::client_with(transport.clone(), Credentials::default());

    let err = tokens.acquire().await.unwrap_err();
    assert!(matches!(err, Error::AuthFatal { status: None, .. }));
    assert!(err.to_string().contains("CLIENT_ID"));

    assert!(client.search_artist("Björk").await.is_err());
    assert_eq!(transport.post_calls(), 0);
    assert_eq!(transport.get_calls(), 0);
}

#[tokio::test]
async fn empty_search_is_not_an_error() {
    let transport = Arc::new(FakeTransport::new().respond(StatusCode::OK, search_page("tracks", json!([]))));
    let (client, _) = common::client(transport);

    let outcome = client.search_track("Nobody", "Nothing").await.unwrap();

    let ApiOutcome::Success(fields) = outcome else {
        panic!("expected success");
    };
    assert_eq!(fields["nitems"], json!(0));
    assert_eq!(fields["status_code"], json!(200));
    assert_eq!(fields["id"], Value::Null);
    assert_eq!(fields["popularity"], Value::Null);
}

#[tokio::test]
async fn track_search_keeps_first_hit_and_encodes_query() {
    let items = json!([
        {"href": "https://api.spotify.com/v1/tracks/x", "id": "x", "popularity": 42},
        {"id": "y", "popularity": 1}
    ]);
    let transport = Arc::new(FakeTransport::new().respond(StatusCode::OK, search_page("tracks", items)));
    let (client, _) = common::client(transport.clone());

    let outcome = client.search_track("Sigur Rós", "Hoppípolla").await.unwrap();

    let ApiOutcome::Success(fields) = outcome else {
        panic!("expected success");
    };
    assert_eq!(fields["nitems"], json!(2));
    assert_eq!(fields["id"], json!("x"));
    assert_eq!(fields["popularity"], json!(42));

    let url = &transport.urls()[0];
    assert!(url.starts_with("https://api.test/v1/search?q="));
    assert!(url.contains("type=track"));
    assert!(!url.contains(' '));
}

#[tokio::test]
async fn unexpected_status_is_a_failed_outcome() {
    let transport = Arc::new(FakeTransport::new().respond(StatusCode::BAD_GATEWAY, "upstream"));
    let (client, _) = common::client(transport);

    let outcome = client.search_artist("Low").await.unwrap();

    assert_eq!(
        outcome,
        ApiOutcome::Failed {
            status: Some(StatusCode::BAD_GATEWAY),
            detail: "upstream".to_string()
        }
    );
}
