//! HTTP client for the chat-completion oracle.
//!
//! `consult` is the single fallible, unbounded-latency operation in the
//! system. It never returns an error: every failure is folded into an
//! `OracleResult` here, so callers only ever deal with a value.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use anyhow::{Context, Result};
use orb_config::OracleConfig;
use orb_core::contract::{self, ChatRequest, OracleResult, Sampling};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use uuid::Uuid;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Anything that can answer a prompt. The session driver only needs this.
pub trait Oracle: Send + Sync + 'static {
    fn consult(&self, prompt: &str) -> impl Future<Output = OracleResult> + Send;
}

/// Why a request produced no payload.
#[derive(Debug)]
enum OracleError {
    Http(reqwest::Error),
    Status {
        status: StatusCode,
        message: Option<String>,
    },
    Body(serde_json::Error),
    Timeout(Duration),
}

impl fmt::Display for OracleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OracleError::Http(e) => write!(f, "transport error: {e}"),
            OracleError::Status {
                status,
                message: Some(m),
            } => write!(f, "HTTP {status}: {m}"),
            OracleError::Status {
                status,
                message: None,
            } => write!(f, "HTTP {status}"),
            OracleError::Body(e) => write!(f, "response body is not JSON: {e}"),
            OracleError::Timeout(d) => write!(f, "no response within {}s", d.as_secs_f64()),
        }
    }
}

impl std::error::Error for OracleError {}

impl From<reqwest::Error> for OracleError {
    fn from(e: reqwest::Error) -> Self {
        OracleError::Http(e)
    }
}

#[derive(Clone)]
pub struct OracleClient {
    http: Client,
    endpoint: String,
    model: String,
    api_key: String,
    sampling: Sampling,
    timeout: Duration,
}

impl OracleClient {
    /// Fails when no API key is configured or the HTTP client cannot be built.
    pub fn new(config: &OracleConfig) -> Result<Self> {
        let api_key = config.api_key()?.to_string();
        let timeout = config.timeout();
        let http = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT.min(timeout))
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            api_key,
            sampling: Sampling {
                max_tokens: config.max_tokens,
                temperature: config.temperature,
                frequency_penalty: config.frequency_penalty,
            },
            timeout,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send `prompt` and gate the reply through the output contract.
    pub async fn consult(&self, prompt: &str) -> OracleResult {
        let request_id = Uuid::new_v4();
        tracing::info!(%request_id, model = %self.model, "consulting oracle");

        let outcome = tokio::time::timeout(self.timeout, self.send(prompt))
            .await
            .unwrap_or(Err(OracleError::Timeout(self.timeout)));

        match outcome {
            Ok(payload) => match contract::parse_contract(&payload) {
                Ok(message) => {
                    tracing::debug!(%request_id, "oracle answered in character");
                    OracleResult::InCharacterMessage(message)
                }
                Err(violation) => {
                    tracing::warn!(%request_id, %violation, "oracle payload rejected");
                    OracleResult::refusal()
                }
            },
            Err(e) => {
                tracing::error!(%request_id, error = %e, "oracle request failed");
                OracleResult::transport_error(prompt)
            }
        }
    }

    /// One round trip. Returns the raw model payload, possibly empty.
    async fn send(&self, prompt: &str) -> std::result::Result<String, OracleError> {
        let body = ChatRequest::new(&self.model, prompt, self.sampling);
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<Value>(&text)
                .ok()
                .and_then(|v| contract::provider_error(&v).map(str::to_string));
            return Err(OracleError::Status { status, message });
        }

        let value: Value = serde_json::from_str(&text).map_err(OracleError::Body)?;
        Ok(contract::completion_text(&value).to_string())
    }
}

impl Oracle for OracleClient {
    fn consult(&self, prompt: &str) -> impl Future<Output = OracleResult> + Send {
        OracleClient::consult(self, prompt)
    }
}
