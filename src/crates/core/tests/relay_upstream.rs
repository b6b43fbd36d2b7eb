use std::sync::Arc;

use atelier_core::service::relay::{RelayEvent, RelaySettings, StreamRelay};
use atelier_core::{AnthropicClient, ConversationTurn};
use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use futures::StreamExt;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::Mutex;

#[derive(Clone)]
struct Upstream {
    status: StatusCode,
    feed: String,
    last_body: Arc<Mutex<Option<Value>>>,
    last_api_key: Arc<Mutex<Option<String>>>,
}

fn feed_event(data: Value) -> String {
    format!("event: {}\ndata: {}\n\n", data["type"].as_str().unwrap_or(""), data)
}

fn text_feed(chunks: &[&str]) -> String {
    let mut feed: String = chunks
        .iter()
        .map(|text| {
            feed_event(json!({
                "type": "content_block_delta", "index": 0,
                "delta": {"type": "text_delta", "text": text}
            }))
        })
        .collect();
    feed.push_str(&feed_event(json!({"type": "message_stop"})));
    feed
}

async fn messages(
    State(upstream): State<Upstream>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    *upstream.last_body.lock().await = Some(body);
    *upstream.last_api_key.lock().await = headers
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    (
        upstream.status,
        [(CONTENT_TYPE, "text/event-stream")],
        upstream.feed.clone(),
    )
}

async fn spawn_upstream(status: StatusCode, feed: String) -> (String, Upstream) {
    let upstream = Upstream {
        status,
        feed,
        last_body: Arc::new(Mutex::new(None)),
        last_api_key: Arc::new(Mutex::new(None)),
    };
    let app = Router::new()
        .route("/v1/messages", post(messages))
        .with_state(upstream.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind upstream");
    let addr = listener.local_addr().expect("upstream addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve upstream");
    });
    (format!("http://{}", addr), upstream)
}

async fn relay_events(base_url: String, turn: ConversationTurn) -> Vec<RelayEvent> {
    relay_events_with(base_url, RelaySettings::default(), turn).await
}

async fn relay_events_with(
    base_url: String,
    settings: RelaySettings,
    turn: ConversationTurn,
) -> Vec<RelayEvent> {
    let client = Arc::new(AnthropicClient::new(base_url, "sk-test"));
    let relay = StreamRelay::new(client, settings);
    relay.stream(turn).collect().await
}

#[tokio::test]
async fn text_feed_is_relayed_in_order() {
    let (base, upstream) = spawn_upstream(StatusCode::OK, text_feed(&["Hel", "lo ", "there"])).await;

    let events = relay_events(base, ConversationTurn::new("hi")).await;

    assert_eq!(
        events,
        vec![
            RelayEvent::text("Hel"),
            RelayEvent::text("lo "),
            RelayEvent::text("there"),
            RelayEvent::Done {
                message: "Hello there".into(),
                artifact: None
            },
        ]
    );

    let body = upstream.last_body.lock().await.clone().expect("request body");
    assert_eq!(body["stream"], true);
    assert_eq!(body["messages"][0]["role"], "user");
    assert_eq!(body["messages"][0]["content"], "hi");
    assert_eq!(body["tools"][0]["name"], "write_document");
    assert_eq!(upstream.last_api_key.lock().await.as_deref(), Some("sk-test"));
}

#[tokio::test]
async fn artifact_feed_yields_status_and_artifact() {
    let feed = [
        feed_event(json!({
            "type": "content_block_start", "index": 0,
            "content_block": {"type": "tool_use", "id": "toolu_1", "name": "write_document", "input": {}}
        })),
        feed_event(json!({
            "type": "content_block_delta", "index": 0,
            "delta": {"type": "input_json_delta", "partial_json": "{\"path\":\"/trips/\","}
        })),
        feed_event(json!({
            "type": "content_block_delta", "index": 0,
            "delta": {"type": "input_json_delta", "partial_json": "\"body\":\"<p>Lisbon</p>\"}"}
        })),
        feed_event(json!({"type": "message_stop"})),
    ]
    .concat();
    let (base, _) = spawn_upstream(StatusCode::OK, feed).await;

    let events = relay_events(base, ConversationTurn::new("plan my trip")).await;

    assert_eq!(events.first(), Some(&RelayEvent::status("Building document...")));
    match events.last() {
        Some(RelayEvent::Done { message, artifact }) => {
            let artifact = artifact.as_ref().expect("artifact");
            assert_eq!(artifact.path, "/trips/");
            assert_eq!(artifact.body, "<p>Lisbon</p>");
            assert_eq!(message, "I've built the document at /trips/.");
        }
        other => panic!("expected done, got {:?}", other),
    }
}

#[tokio::test]
async fn upstream_failure_status_becomes_single_error_event() {
    let (base, _) = spawn_upstream(
        StatusCode::INTERNAL_SERVER_ERROR,
        "{\"error\":\"boom\"}".to_string(),
    )
    .await;

    let events = relay_events(base, ConversationTurn::new("hi")).await;

    assert_eq!(events.len(), 1);
    match &events[0] {
        RelayEvent::Error { message } => assert!(message.contains("500")),
        other => panic!("expected error, got {:?}", other),
    }
}

#[tokio::test]
async fn provider_error_event_ends_the_turn() {
    let feed = [
        feed_event(json!({
            "type": "content_block_delta", "index": 0,
            "delta": {"type": "text_delta", "text": "partial"}
        })),
        feed_event(json!({
            "type": "error",
            "error": {"type": "overloaded_error", "message": "Overloaded"}
        })),
    ]
    .concat();
    let (base, _) = spawn_upstream(StatusCode::OK, feed).await;

    let events = relay_events(base, ConversationTurn::new("hi")).await;

    assert_eq!(events.first(), Some(&RelayEvent::text("partial")));
    assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
    assert!(matches!(events.last(), Some(RelayEvent::Error { .. })));
}

#[tokio::test]
async fn thinking_is_announced_once_and_kept_out_of_the_answer() {
    let feed = [
        feed_event(json!({"type": "message_start", "message": {"id": "msg_1"}})),
        feed_event(json!({
            "type": "content_block_start", "index": 0,
            "content_block": {"type": "thinking", "thinking": "", "signature": ""}
        })),
        feed_event(json!({
            "type": "content_block_delta", "index": 0,
            "delta": {"type": "thinking_delta", "thinking": "secret plan"}
        })),
        feed_event(json!({
            "type": "content_block_delta", "index": 0,
            "delta": {"type": "signature_delta", "signature": "EqQBCgIYAhIM"}
        })),
        feed_event(json!({"type": "content_block_stop", "index": 0})),
        feed_event(json!({
            "type": "content_block_start", "index": 1,
            "content_block": {"type": "redacted_thinking", "data": "opaque"}
        })),
        feed_event(json!({"type": "content_block_stop", "index": 1})),
        feed_event(json!({
            "type": "content_block_start", "index": 2,
            "content_block": {"type": "text", "text": ""}
        })),
        feed_event(json!({
            "type": "content_block_delta", "index": 2,
            "delta": {"type": "text_delta", "text": "Answer"}
        })),
        feed_event(json!({"type": "message_stop"})),
    ]
    .concat();
    let (base, upstream) = spawn_upstream(StatusCode::OK, feed).await;
    let settings = RelaySettings {
        thinking_budget: Some(2048),
        ..RelaySettings::default()
    };

    let events = relay_events_with(base, settings, ConversationTurn::new("think first")).await;

    assert_eq!(
        events,
        vec![
            RelayEvent::status("Thinking..."),
            RelayEvent::text("Answer"),
            RelayEvent::Done {
                message: "Answer".into(),
                artifact: None
            },
        ]
    );

    let body = upstream.last_body.lock().await.clone().expect("request body");
    assert_eq!(body["thinking"]["type"], "enabled");
    assert_eq!(body["thinking"]["budget_tokens"], 2048);
}
