use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use atelier_core::service::credentials::{AccountCredential, OAuthSettings};
use atelier_core::service::integrations::{CalendarEvent, GmailClient, GoogleCalendarClient};
use atelier_core::{
    merge_accounts, CredentialManager, GoogleOAuthProvider, MemoryTokenStore, SortOrder,
    TokenStore,
};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use chrono::{DateTime, Duration, Utc};
use serde_json::{json, Value};
use std::collections::HashMap;
use tokio::net::TcpListener;
use tokio::sync::Mutex;

#[derive(Clone, Default)]
struct GoogleMock {
    token_calls: Arc<AtomicUsize>,
    calendar_queries: Arc<Mutex<Vec<HashMap<String, String>>>>,
    mail_queries: Arc<Mutex<Vec<HashMap<String, String>>>>,
}

fn bearer(headers: &HeaderMap) -> String {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .unwrap_or("")
        .to_string()
}

async fn token(
    State(mock): State<GoogleMock>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    mock.token_calls.fetch_add(1, Ordering::SeqCst);
    match form.get("refresh_token").map(String::as_str) {
        Some("rt-b") => (
            StatusCode::OK,
            Json(json!({ "access_token": "tok-b", "expires_in": 3599 })),
        )
            .into_response(),
        Some("rt-outage") => (
            StatusCode::SERVICE_UNAVAILABLE,
            "<html>Service Unavailable</html>",
        )
            .into_response(),
        Some("rt-forever") => (
            StatusCode::OK,
            Json(json!({ "access_token": "tok-forever", "expires_in": i64::MAX })),
        )
            .into_response(),
        _ => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "invalid_grant", "error_description": "Token has been revoked." })),
        )
            .into_response(),
    }
}

async fn events(
    State(mock): State<GoogleMock>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Json<Value> {
    mock.calendar_queries.lock().await.push(query);
    let items = match bearer(&headers).as_str() {
        "tok-a" => json!([
            { "id": "a1", "summary": "Standup", "start": { "dateTime": "2030-01-02T09:00:00Z" } },
            { "id": "a2", "summary": "Dentist", "start": { "dateTime": "2030-01-04T15:00:00+01:00" } }
        ]),
        "tok-b" => json!([
            { "id": "b1", "summary": "Offsite", "start": { "date": "2030-01-03" } }
        ]),
        _ => json!([]),
    };
    Json(json!({ "items": items }))
}

async fn message_list(
    State(mock): State<GoogleMock>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Json<Value> {
    mock.mail_queries.lock().await.push(query);
    let ids = match bearer(&headers).as_str() {
        "tok-a" => json!([{ "id": "a-old" }, { "id": "a-new" }]),
        "tok-b" => json!([{ "id": "b-mid" }]),
        _ => json!([]),
    };
    Json(json!({ "messages": ids }))
}

async fn message_detail(Path(id): Path<String>) -> Json<Value> {
    let millis = match id.as_str() {
        "a-old" => "1893456000000",
        "b-mid" => "1893542400000",
        _ => "1893628800000",
    };
    Json(json!({
        "id": id,
        "threadId": format!("t-{}", id),
        "snippet": "hello",
        "internalDate": millis,
        "labelIds": ["INBOX"],
        "payload": { "headers": [{ "name": "Subject", "value": id }] }
    }))
}

async fn spawn_google() -> (String, GoogleMock) {
    let mock = GoogleMock::default();
    let app = Router::new()
        .route("/token", post(token))
        .route("/calendar/v3/calendars/primary/events", get(events))
        .route("/gmail/v1/users/me/messages", get(message_list))
        .route("/gmail/v1/users/me/messages/:id", get(message_detail))
        .with_state(mock.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind google mock");
    let addr = listener.local_addr().expect("google mock addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve google mock");
    });
    (format!("http://{}", addr), mock)
}

fn record(refresh_token: &str, access_token: &str, expires_in_secs: i64) -> String {
    let now = Utc::now();
    serde_json::to_string(&AccountCredential {
        refresh_token: refresh_token.to_string(),
        access_token: Some(access_token.to_string()),
        expires_at: Some(now + Duration::seconds(expires_in_secs)),
        email: None,
        connected_at: now,
        scope: None,
    })
    .expect("serialize record")
}

fn manager_for(base: &str, store: Arc<MemoryTokenStore>, accounts: &[&str]) -> CredentialManager {
    let mut settings = OAuthSettings::google("client", "secret", "http://localhost/callback");
    settings.token_url = format!("{}/token", base);
    let provider = Arc::new(GoogleOAuthProvider::new(settings));
    CredentialManager::new(
        store,
        provider,
        accounts.iter().map(|a| a.to_string()).collect(),
    )
}

/// `a` has a live token, `b` needs a refresh, `c` was never linked, `d` has a revoked refresh token.
async fn setup() -> (String, GoogleMock, Arc<MemoryTokenStore>, CredentialManager) {
    let (base, mock) = spawn_google().await;
    let store = Arc::new(MemoryTokenStore::new());
    store.put("google:a", record("rt-a", "tok-a", 3600)).await.unwrap();
    store.put("google:b", record("rt-b", "stale-b", 60)).await.unwrap();
    store.put("google:d", record("rt-d", "stale-d", -60)).await.unwrap();

    let manager = manager_for(&base, store.clone(), &["a", "b", "c", "d"]);
    (base, mock, store, manager)
}

#[tokio::test]
async fn calendar_merge_spans_accounts_in_ascending_order() {
    let (base, mock, store, manager) = setup().await;
    let calendar = GoogleCalendarClient::new(base);

    let merged = merge_accounts(&manager, SortOrder::Ascending, |account, token| {
        let calendar = calendar.clone();
        async move { calendar.list_upcoming(&token, &account).await }
    })
    .await;

    let ids: Vec<(&str, &str)> = merged
        .items
        .iter()
        .map(|e: &CalendarEvent| (e.id.as_str(), e.account.as_str()))
        .collect();
    assert_eq!(ids, vec![("a1", "a"), ("b1", "b"), ("a2", "a")]);
    assert!(merged.items[1].all_day);

    let mut connected = merged.connected.clone();
    connected.sort();
    assert_eq!(connected, vec!["a", "b"]);

    // b refreshed, d rejected; a and c never hit the token endpoint
    assert_eq!(mock.token_calls.load(Ordering::SeqCst), 2);
    assert!(store.get("google:d").await.unwrap().is_none());
    let refreshed: AccountCredential =
        serde_json::from_str(&store.get("google:b").await.unwrap().unwrap()).unwrap();
    assert_eq!(refreshed.access_token.as_deref(), Some("tok-b"));
    assert_eq!(refreshed.refresh_token, "rt-b");
}

#[tokio::test]
async fn mail_merge_is_newest_first() {
    let (base, _, _, manager) = setup().await;
    let gmail = GmailClient::new(base);

    let merged = merge_accounts(&manager, SortOrder::Descending, |account, token| {
        let gmail = gmail.clone();
        async move { gmail.list_recent(&token, &account).await }
    })
    .await;

    let subjects: Vec<&str> = merged.items.iter().map(|m| m.subject.as_str()).collect();
    assert_eq!(subjects, vec!["a-new", "b-mid", "a-old"]);
    assert!(merged.items.iter().all(|m| !m.unread));
}

#[tokio::test]
async fn revoked_refresh_disconnects_account_in_status() {
    let (_, _, _, manager) = setup().await;

    assert!(manager.get_access_token("d").await.is_none());

    let status = manager.account_status().await;
    let d = status.iter().find(|s| s.account == "d").unwrap();
    assert!(!d.connected);
    let a = status.iter().find(|s| s.account == "a").unwrap();
    assert!(a.connected);
}

#[tokio::test]
async fn token_endpoint_outage_keeps_the_record() {
    let (base, mock) = spawn_google().await;
    let store = Arc::new(MemoryTokenStore::new());
    let stored = record("rt-outage", "stale", -60);
    store.put("google:work", stored.clone()).await.unwrap();
    let manager = manager_for(&base, store.clone(), &["work"]);

    assert!(manager.get_access_token("work").await.is_none());

    assert_eq!(mock.token_calls.load(Ordering::SeqCst), 1);
    assert_eq!(store.get("google:work").await.unwrap(), Some(stored));
    assert!(manager.account_status().await[0].connected);
}

#[tokio::test]
async fn unbounded_token_lifetime_is_stored_without_overflow() {
    let (base, mock) = spawn_google().await;
    let store = Arc::new(MemoryTokenStore::new());
    store.put("google:work", record("rt-forever", "stale", -60)).await.unwrap();
    let manager = manager_for(&base, store.clone(), &["work"]);

    assert_eq!(
        manager.get_access_token("work").await.as_deref(),
        Some("tok-forever")
    );
    // The capped expiry still round-trips through the store and needs no second refresh.
    assert_eq!(
        manager.get_access_token("work").await.as_deref(),
        Some("tok-forever")
    );

    assert_eq!(mock.token_calls.load(Ordering::SeqCst), 1);

    let saved: AccountCredential =
        serde_json::from_str(&store.get("google:work").await.unwrap().unwrap()).unwrap();
    assert_eq!(saved.refresh_token, "rt-forever");
    assert!(saved.expires_at.unwrap() > Utc::now() + Duration::days(365 * 50));
}

#[tokio::test]
async fn configured_window_and_query_reach_the_provider() {
    let (base, mock, _, manager) = setup().await;
    let calendar = GoogleCalendarClient::new(base.clone()).with_window_days(30);
    let gmail = GmailClient::new(base).with_query("label:travel");

    merge_accounts(&manager, SortOrder::Ascending, |account, token| {
        let calendar = calendar.clone();
        async move { calendar.list_upcoming(&token, &account).await }
    })
    .await;
    merge_accounts(&manager, SortOrder::Descending, |account, token| {
        let gmail = gmail.clone();
        async move { gmail.list_recent(&token, &account).await }
    })
    .await;

    let calendar_queries = mock.calendar_queries.lock().await;
    assert!(!calendar_queries.is_empty());
    for query in calendar_queries.iter() {
        let min = DateTime::parse_from_rfc3339(&query["timeMin"]).unwrap();
        let max = DateTime::parse_from_rfc3339(&query["timeMax"]).unwrap();
        assert_eq!(max - min, Duration::days(30));
        assert_eq!(query["singleEvents"], "true");
    }

    let mail_queries = mock.mail_queries.lock().await;
    assert!(!mail_queries.is_empty());
    assert!(mail_queries.iter().all(|query| query["q"] == "label:travel"));
}
