//! In-process stand-in for the chat-completion endpoint.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::routing::post;
use orb_config::OracleConfig;
use serde_json::Value;
use tokio::net::TcpListener;

/// Authorization header and JSON body of every request received.
pub type Seen = Arc<Mutex<Vec<(Option<String>, Value)>>>;

#[derive(Clone)]
pub struct MockOracle {
    status: StatusCode,
    body: String,
    delay: Duration,
    seen: Seen,
}

impl MockOracle {
    pub fn new(status: StatusCode, body: String) -> Self {
        Self {
            status,
            body,
            delay: Duration::ZERO,
            seen: Arc::default(),
        }
    }

    pub fn ok(body: String) -> Self {
        Self::new(StatusCode::OK, body)
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn seen(&self) -> Seen {
        Arc::clone(&self.seen)
    }

    /// Serve on an ephemeral port and return the endpoint URL.
    pub async fn spawn(self) -> String {
        let app = Router::new()
            .route("/v1/chat/completions", post(handle))
            .with_state(self);
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/v1/chat/completions")
    }
}

async fn handle(
    State(mock): State<MockOracle>,
    headers: HeaderMap,
    body: String,
) -> (StatusCode, String) {
    let auth = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let json = serde_json::from_str(&body).unwrap_or(Value::Null);
    mock.seen.lock().unwrap().push((auth, json));
    tokio::time::sleep(mock.delay).await;
    (mock.status, mock.body.clone())
}

/// Valid oracle settings pointed at `endpoint`.
pub fn oracle_config(endpoint: &str) -> OracleConfig {
    OracleConfig {
        endpoint: endpoint.to_string(),
        model: "test-model".to_string(),
        api_key: Some("test-key".to_string()),
        timeout_secs: 5,
        ..OracleConfig::default()
    }
}

/// JSON body of a successful completion whose content is `content`.
pub fn completion(content: &str) -> String {
    serde_json::json!({ "choices": [{ "message": { "role": "assistant", "content": content } }] })
        .to_string()
}
