// The reqwest-backed outbound client against a local axum server.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use cadence_core::{HttpMethod, TaskData};
use cadence_scheduler::{CallError, HttpOutboundClient, OutboundClient};
use serde_json::{json, Value};

#[derive(Debug, Clone)]
struct Captured {
    query: HashMap<String, String>,
    token: Option<String>,
    body: Value,
}

type Seen = Arc<Mutex<Vec<Captured>>>;

async fn hook(
    State(seen): State<Seen>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> StatusCode {
    let token = headers
        .get("x-token")
        .and_then(|v| v.to_str().ok())
        .map(String::from);
    seen.lock().unwrap().push(Captured { query, token, body });
    StatusCode::CREATED
}

async fn serve() -> (SocketAddr, Seen) {
    let seen: Seen = Arc::default();
    let app = Router::new()
        .route("/hook", post(hook))
        .route("/down", get(|| async { StatusCode::SERVICE_UNAVAILABLE }))
        .with_state(seen.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, seen)
}

fn data(method: HttpMethod, url: String) -> TaskData {
    TaskData {
        task_type: "webhook".into(),
        request_type: method,
        url,
        query_params: Default::default(),
        headers: Default::default(),
        request_body: None,
    }
}

#[tokio::test]
async fn sends_query_headers_and_json_body() {
    let (addr, seen) = serve().await;
    let client = HttpOutboundClient::new().unwrap();

    let mut d = data(HttpMethod::Post, format!("http://{addr}/hook"));
    d.query_params = json!({"page": 2, "q": "rust", "dry": false})
        .as_object()
        .cloned()
        .unwrap();
    d.headers.insert("x-token".into(), "s3cret".into());
    d.request_body = Some(json!({"event": "tick", "n": 1}));

    let resp = client.call(&d).await.unwrap();
    assert_eq!(resp.status, 201);
    assert_eq!(resp.status_text, "201 Created");
    assert!(resp.is_success());

    let captured = seen.lock().unwrap().clone();
    assert_eq!(captured.len(), 1);
    let c = &captured[0];
    assert_eq!(c.query.get("page").map(String::as_str), Some("2"));
    assert_eq!(c.query.get("q").map(String::as_str), Some("rust"));
    assert_eq!(c.query.get("dry").map(String::as_str), Some("false"));
    assert_eq!(c.token.as_deref(), Some("s3cret"));
    assert_eq!(c.body, json!({"event": "tick", "n": 1}));
}

#[tokio::test]
async fn non_success_status_is_a_response_not_an_error() {
    let (addr, _) = serve().await;
    let client = HttpOutboundClient::new().unwrap();

    let resp = client
        .call(&data(HttpMethod::Get, format!("http://{addr}/down")))
        .await
        .unwrap();
    assert_eq!(resp.status, 503);
    assert_eq!(resp.status_text, "503 Service Unavailable");
    assert!(!resp.is_success());
}

#[tokio::test]
async fn unreachable_host_is_a_send_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = HttpOutboundClient::new().unwrap();
    let err = client
        .call(&data(HttpMethod::Get, format!("http://{addr}/")))
        .await
        .unwrap_err();
    assert!(matches!(err, CallError::Send(_)));
    assert!(err.to_string().starts_with("failed to send request"));
}
