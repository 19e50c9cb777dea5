//! Integration tests for the background refresh scheduler

use bookswap_client::{ApiClient, AuthSession, RefreshConfig, RefreshScheduler};
use bookswap_core::{MemorySessionStore, Session, SessionStore};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn token_result(access: &str) -> serde_json::Value {
    json!({
        "code": 1000,
        "message": "success",
        "result": {
            "accessToken": access,
            "refreshToken": "refresh-2",
            "authenticated": true,
            "expiresIn": 3600
        }
    })
}

fn session_for(
    server: &MockServer,
    store: Arc<MemorySessionStore>,
    config: RefreshConfig,
) -> AuthSession {
    AuthSession::builder()
        .client(ApiClient::new(server.uri()).unwrap())
        .store(store)
        .config(config)
        .build()
        .unwrap()
}

async fn refresh_calls(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path() == "/auth/refresh")
        .count()
}

#[tokio::test]
async fn scheduler_refreshes_periodically() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_result("acc-2")))
        .mount(&server)
        .await;

    let store = Arc::new(MemorySessionStore::new());
    store
        .save(&Session::from_tokens("acc-1", "refresh-1", 3600, None))
        .await
        .unwrap();

    let config = RefreshConfig {
        cooldown: Duration::ZERO,
        tick_interval: Duration::from_millis(200),
        expiry_margin: Duration::from_secs(120),
    };
    let session = session_for(&server, store, config);
    let scheduler = RefreshScheduler::spawn(session);

    tokio::time::sleep(Duration::from_millis(700)).await;
    scheduler.shutdown();
    scheduler.join().await;

    assert!(refresh_calls(&server).await >= 1);
}

#[tokio::test]
async fn missed_deadline_coalesces_into_one_refresh() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_result("acc-2")))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemorySessionStore::new());
    // Stored token is already inside the expiring-soon margin, so the
    // scheduled refresh time is in the past at spawn.
    store
        .save(&Session::from_tokens("acc-1", "refresh-1", 60, None))
        .await
        .unwrap();

    let config = RefreshConfig {
        cooldown: Duration::from_secs(30),
        tick_interval: Duration::from_secs(60),
        expiry_margin: Duration::from_secs(120),
    };
    let session = session_for(&server, store, config);
    let scheduler = RefreshScheduler::spawn(session);

    tokio::time::sleep(Duration::from_millis(300)).await;

    // Repeated foreground wakes after the deadline must not add refreshes
    scheduler.wake();
    scheduler.wake();
    tokio::time::sleep(Duration::from_millis(300)).await;

    scheduler.shutdown();
    scheduler.join().await;
    server.verify().await;
}

#[tokio::test]
async fn scheduler_stops_on_logout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/logout"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"code": 1000})))
        .mount(&server)
        .await;

    let store = Arc::new(MemorySessionStore::new());
    store
        .save(&Session::from_tokens("acc-1", "refresh-1", 3600, None))
        .await
        .unwrap();

    let config = RefreshConfig {
        cooldown: Duration::from_secs(30),
        tick_interval: Duration::from_millis(200),
        expiry_margin: Duration::from_secs(120),
    };
    let session = session_for(&server, store, config);
    let scheduler = RefreshScheduler::spawn(session.clone());

    session.logout().await.unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert!(scheduler.is_finished(), "logout must stop the scheduler");
    assert_eq!(refresh_calls(&server).await, 0);
}

#[tokio::test]
async fn scheduler_makes_no_calls_without_session() {
    let server = MockServer::start().await;

    let config = RefreshConfig {
        cooldown: Duration::ZERO,
        tick_interval: Duration::from_millis(100),
        expiry_margin: Duration::from_secs(120),
    };
    let session = session_for(&server, Arc::new(MemorySessionStore::new()), config);
    let scheduler = RefreshScheduler::spawn(session);

    tokio::time::sleep(Duration::from_millis(350)).await;
    scheduler.shutdown();
    scheduler.join().await;

    assert!(server.received_requests().await.unwrap().is_empty());
}
