//! ChatApiClient - HTTP implementation of the engine's transport seam.
//!
//! Opens the turn channel with a streaming POST and hydrates sessions with
//! a GET. Configuration priority: explicit constructor arguments >
//! environment variables.

use std::env;
use std::time::Duration;

use async_trait::async_trait;
use colloquy_core::{EventStream, SessionSync, TransportError, TurnTransport};
use futures::StreamExt;
use reqwest::{Client, StatusCode, header::HeaderValue};
use serde::{Deserialize, Serialize};

use crate::error::ClientError;
use crate::sse::TurnEventStream;

const ENV_API_URL: &str = "COLLOQUY_API_URL";
const ENV_API_KEY: &str = "COLLOQUY_API_KEY";

/// Timeout for non-streaming requests. The turn channel itself carries no
/// overall timeout since a healthy stream can outlive any fixed budget.
const SYNC_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for the chat backend's session and turn-streaming API.
#[derive(Clone)]
pub struct ChatApiClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Serialize)]
struct SendTurnRequest<'a> {
    message: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

impl ChatApiClient {
    /// Creates a new client for the given backend base URL.
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client: Client::new(),
            base_url,
            api_key,
        }
    }

    /// Loads configuration from environment variables.
    ///
    /// `COLLOQUY_API_URL` is required; `COLLOQUY_API_KEY` is optional (some
    /// deployments sit behind a gateway that injects auth).
    pub fn try_from_env() -> Result<Self, ClientError> {
        Self::from_parts(env::var(ENV_API_URL).ok(), env::var(ENV_API_KEY).ok())
    }

    fn from_parts(base_url: Option<String>, api_key: Option<String>) -> Result<Self, ClientError> {
        let base_url = base_url
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| ClientError::MissingConfig(format!("{ENV_API_URL} not set")))?;
        Ok(Self::new(base_url, api_key))
    }

    /// Makes an authenticated request to the backend.
    fn auth_request(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(api_key) = &self.api_key {
            request.header("Authorization", format!("Bearer {}", api_key))
        } else {
            request
        }
    }

    fn turn_url(&self, session_id: &str) -> String {
        format!("{}/api/sessions/{}/turns", self.base_url, session_id)
    }

    fn session_url(&self, session_id: &str) -> String {
        format!("{}/api/sessions/{}", self.base_url, session_id)
    }
}

#[async_trait]
impl TurnTransport for ChatApiClient {
    async fn send_turn(
        &self,
        session_id: &str,
        text: &str,
    ) -> Result<EventStream, TransportError> {
        let request = self.auth_request(
            self.client
                .post(self.turn_url(session_id))
                .header("Accept", "text/event-stream")
                .json(&SendTurnRequest {
                    message: text,
                    stream: true,
                }),
        );

        let response = request.send().await.map_err(map_request_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let retry_after = parse_retry_after(response.headers().get("retry-after"));
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "failed to read error body".to_string());
            return Err(map_http_error(status, body, retry_after));
        }

        tracing::debug!("[ChatApiClient] Turn channel open for session {}", session_id);

        let bytes = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(map_request_error))
            .boxed();
        Ok(TurnEventStream::new(bytes).boxed())
    }

    async fn fetch_session(&self, session_id: &str) -> Result<SessionSync, TransportError> {
        let request = self.auth_request(
            self.client
                .get(self.session_url(session_id))
                .timeout(SYNC_TIMEOUT),
        );

        let response = request.send().await.map_err(map_request_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let retry_after = parse_retry_after(response.headers().get("retry-after"));
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "failed to read error body".to_string());
            return Err(map_http_error(status, body, retry_after));
        }

        response
            .json()
            .await
            .map_err(|err| TransportError::malformed(format!("failed to parse session sync: {err}")))
    }
}

fn map_request_error(err: reqwest::Error) -> TransportError {
    TransportError::connection(
        format!("request failed: {err}"),
        err.is_connect() || err.is_timeout(),
    )
}

fn map_http_error(status: StatusCode, body: String, retry_after: Option<Duration>) -> TransportError {
    let message = serde_json::from_str::<ErrorResponse>(&body)
        .map(|wrapper| wrapper.error.message)
        .unwrap_or_else(|_| body.clone());

    let is_retryable = matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    );

    TransportError::Status {
        status: status.as_u16(),
        message,
        is_retryable,
        retry_after,
    }
}

fn parse_retry_after(header: Option<&HeaderValue>) -> Option<Duration> {
    let value = header?.to_str().ok()?;
    if let Ok(seconds) = value.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }

    // Retry-After HTTP-date parsing is omitted for simplicity
    None
}
