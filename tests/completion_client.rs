//! Chat Completions client against a local stand-in for the API.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
};
use chatmaven::error::CompletionError;
use chatmaven::llm::{
    ApiKey, COMPLETION_TEMPERATURE, ChatCompletionsClient, CompletionClient, LlmSettings, Message,
    Provider,
};
use serde_json::{Value, json};

/// What the fake endpoint answers with.
#[derive(Clone)]
enum Canned {
    Reply(&'static str),
    Status(StatusCode, &'static str),
    Raw(&'static str),
    Slow(Duration),
}

#[derive(Clone)]
struct Fake {
    canned: Canned,
    seen: Arc<Mutex<Vec<(Option<String>, Value)>>>,
}

async fn completions(
    State(fake): State<Fake>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string);
    fake.seen.lock().unwrap().push((auth, body));

    match fake.canned {
        Canned::Reply(text) => Json(json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "choices": [{
                "index": 0,
                "message": { "role": "assistant", "content": text },
                "finish_reason": "stop"
            }]
        }))
        .into_response(),
        Canned::Status(status, body) => (status, body).into_response(),
        Canned::Raw(body) => (StatusCode::OK, body).into_response(),
        Canned::Slow(delay) => {
            tokio::time::sleep(delay).await;
            Json(json!({ "choices": [] })).into_response()
        }
    }
}

/// Serve the fake API on an ephemeral port and return a client for it.
async fn spawn_fake(
    canned: Canned,
    timeout: Duration,
) -> (ChatCompletionsClient, Arc<Mutex<Vec<(Option<String>, Value)>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let fake = Fake {
        canned,
        seen: Arc::clone(&seen),
    };
    let app = Router::new()
        .route("/v1/chat/completions", post(completions))
        .with_state(fake);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let settings = LlmSettings {
        base_url: format!("http://{addr}"),
        api_key: ApiKey::new("sk-test").unwrap(),
        model: "gpt-3.5-turbo".to_string(),
        provider: Provider::Generic,
        timeout,
    };
    (ChatCompletionsClient::new(settings).unwrap(), seen)
}

fn conversation() -> Vec<Message> {
    vec![
        Message::system("You are ChatMaven, an AI assistant that helps people find information."),
        Message::user("2+2?"),
    ]
}

#[tokio::test]
async fn test_reply_and_request_shape() {
    let (client, seen) = spawn_fake(Canned::Reply("4"), Duration::from_secs(5)).await;

    let reply = client
        .complete(&conversation(), COMPLETION_TEMPERATURE)
        .await
        .unwrap();
    assert_eq!(reply, "4");

    let seen = seen.lock().unwrap();
    let (auth, body) = &seen[0];
    assert_eq!(auth.as_deref(), Some("Bearer sk-test"));
    assert_eq!(body["model"], "gpt-3.5-turbo");
    assert_eq!(body["messages"][0]["role"], "system");
    assert_eq!(body["messages"][1], json!({ "role": "user", "content": "2+2?" }));
    assert!((body["temperature"].as_f64().unwrap() - 0.2).abs() < 1e-6);
}

#[tokio::test]
async fn test_unauthorized_maps_to_auth() {
    let (client, _) = spawn_fake(
        Canned::Status(StatusCode::UNAUTHORIZED, r#"{"error":"bad key"}"#),
        Duration::from_secs(5),
    )
    .await;

    let err = client.complete(&conversation(), 0.2).await.unwrap_err();
    assert_eq!(err, CompletionError::Auth { status: 401 });
}

#[tokio::test]
async fn test_rate_limit() {
    let (client, _) = spawn_fake(
        Canned::Status(StatusCode::TOO_MANY_REQUESTS, "slow down"),
        Duration::from_secs(5),
    )
    .await;

    let err = client.complete(&conversation(), 0.2).await.unwrap_err();
    assert_eq!(err, CompletionError::RateLimited);
}

#[tokio::test]
async fn test_server_error_keeps_body() {
    let (client, _) = spawn_fake(
        Canned::Status(StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded"),
        Duration::from_secs(5),
    )
    .await;

    let err = client.complete(&conversation(), 0.2).await.unwrap_err();
    assert_eq!(
        err,
        CompletionError::Status {
            status: 500,
            body: "upstream exploded".to_string(),
        }
    );
}

#[tokio::test]
async fn test_malformed_body() {
    let (client, _) = spawn_fake(Canned::Raw("not json"), Duration::from_secs(5)).await;

    let err = client.complete(&conversation(), 0.2).await.unwrap_err();
    assert!(matches!(err, CompletionError::MalformedResponse(_)));
}

#[tokio::test]
async fn test_timeout() {
    let (client, _) = spawn_fake(
        Canned::Slow(Duration::from_secs(5)),
        Duration::from_millis(100),
    )
    .await;

    let err = client.complete(&conversation(), 0.2).await.unwrap_err();
    assert_eq!(err, CompletionError::Timeout);
}

#[tokio::test]
async fn test_unreachable_host_is_network_error() {
    // Bind then drop to get a port nothing listens on.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = ChatCompletionsClient::new(LlmSettings {
        base_url: format!("http://{addr}"),
        api_key: ApiKey::new("sk-test").unwrap(),
        model: "gpt-3.5-turbo".to_string(),
        provider: Provider::Generic,
        timeout: Duration::from_secs(5),
    })
    .unwrap();

    let err = client.complete(&conversation(), 0.2).await.unwrap_err();
    assert!(matches!(err, CompletionError::Network(_)));
}
