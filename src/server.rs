//! HTTP binding for the orchestrator.
//!
//! | Route          | Handler                                   |
//! |----------------|-------------------------------------------|
//! | `GET /health`  | liveness and identity                     |
//! | `GET /info`    | self-description                          |
//! | `POST /execute`| one invocation, answered with its envelope|
//! | `POST /config` | replace the agent's configuration         |
//!
//! Body parsing happens here, so malformed bodies are rejected before the
//! lifecycle starts.

use crate::contract::{AgentInfo, HealthReport};
use crate::errors::{AgentError, ErrorKind};
use crate::lifecycle::{InvocationRequest, Orchestrator};
use crate::types::{Payload, Status};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Health endpoint path.
pub const HEALTH_PATH: &str = "/health";
/// Self-description endpoint path.
pub const INFO_PATH: &str = "/info";
/// Invocation endpoint path.
pub const EXECUTE_PATH: &str = "/execute";
/// Configuration endpoint path.
pub const CONFIG_PATH: &str = "/config";

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
}

impl AppState {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self { orchestrator }
    }
}

/// Where the server listens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

impl ServerSettings {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }
}

/// Errors answered outside the outcome envelope.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    MalformedRequest(String),

    #[error("{0}")]
    Configuration(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<AgentError> for ApiError {
    fn from(e: AgentError) -> Self {
        match e.kind {
            ErrorKind::MalformedRequest => ApiError::MalformedRequest(e.message),
            ErrorKind::Configuration => ApiError::Configuration(e.message),
            _ => ApiError::Internal(e.message),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (code, body) = match &self {
            ApiError::MalformedRequest(_) => (
                StatusCode::BAD_REQUEST,
                serde_json::json!({
                    "status": Status::Error,
                    "error": self.to_string(),
                    "error_kind": ErrorKind::MalformedRequest,
                }),
            ),
            ApiError::Configuration(_) | ApiError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                serde_json::json!({"status": Status::Error, "error": self.to_string()}),
            ),
        };
        (code, Json(body)).into_response()
    }
}

/// Build the router for one agent.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(HEALTH_PATH, get(health))
        .route(INFO_PATH, get(info))
        .route(EXECUTE_PATH, post(execute))
        .route(CONFIG_PATH, post(configure))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve until Ctrl-C.
pub async fn serve(settings: &ServerSettings, orchestrator: Arc<Orchestrator>) -> anyhow::Result<()> {
    let addr = settings.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    let descriptor = orchestrator.agent().descriptor().clone();
    info!("starting agent server: {}", descriptor);
    info!("  listening: http://{}", addr);
    info!("  health:    http://{}{}", addr, HEALTH_PATH);
    info!("  info:      http://{}{}", addr, INFO_PATH);
    info!("  execute:   http://{}{}", addr, EXECUTE_PATH);

    axum::serve(listener, router(AppState::new(orchestrator)))
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down");
        })
        .await?;
    Ok(())
}

async fn health(State(st): State<AppState>) -> Json<HealthReport> {
    Json(st.orchestrator.health())
}

async fn info(State(st): State<AppState>) -> Json<AgentInfo> {
    Json(st.orchestrator.describe())
}

async fn execute(State(st): State<AppState>, body: Bytes) -> Result<Response, ApiError> {
    let request = parse_invocation(&body)?;

    let orchestrator = st.orchestrator.clone();
    let outcome = tokio::task::spawn_blocking(move || orchestrator.invoke(request))
        .await
        .map_err(|e| ApiError::Internal(format!("invocation task failed: {}", e)))?;

    let code = match outcome.error_kind() {
        None => StatusCode::OK,
        Some(kind) => {
            StatusCode::from_u16(kind.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
        }
    };
    let envelope = outcome.into_envelope(st.orchestrator.agent_code());
    Ok((code, Json(envelope)).into_response())
}

async fn configure(State(st): State<AppState>, body: Bytes) -> Result<Response, ApiError> {
    let config = parse_object(&body, "configuration")?;
    st.orchestrator.apply_configuration(config)?;
    let body = serde_json::json!({
        "status": Status::Success,
        "message": "configuration updated",
    });
    Ok(Json(body).into_response())
}

/// Parse an `/execute` body.
///
/// Empty bodies, invalid JSON, non-objects and `{}` are malformed.
pub fn parse_invocation(body: &[u8]) -> Result<InvocationRequest, AgentError> {
    let object = parse_object(body, "request body")?;
    if object.is_empty() {
        return Err(AgentError::malformed_request("request body must not be empty"));
    }
    serde_json::from_value(serde_json::Value::Object(object))
        .map_err(|e| AgentError::malformed_request(format!("invalid request body: {}", e)))
}

fn parse_object(body: &[u8], what: &str) -> Result<Payload, AgentError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(AgentError::malformed_request(format!(
            "{} must not be empty",
            what
        )));
    }
    match serde_json::from_slice(body) {
        Ok(serde_json::Value::Object(map)) => Ok(map),
        Ok(_) => Err(AgentError::malformed_request(format!(
            "{} must be a JSON object",
            what
        ))),
        Err(e) => Err(AgentError::malformed_request(format!(
            "{} is not valid JSON: {}",
            what, e
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_invocation_rejects_malformed() {
        let bodies: [&[u8]; 6] = [b"", b"   ", b"{}", b"[1,2]", b"{not json", b"{\"input\": 3}"];
        for body in bodies {
            let err = parse_invocation(body).unwrap_err();
            assert_eq!(err.kind, ErrorKind::MalformedRequest, "body {:?}", body);
        }
    }

    #[test]
    fn test_parse_invocation_defaults_input() {
        let request = parse_invocation(br#"{"agent_code": "weather_agent"}"#).unwrap();
        assert_eq!(request.requested_code.as_deref(), Some("weather_agent"));
        assert!(request.input.is_empty());
    }

    #[test]
    fn test_settings_addr() {
        let settings = ServerSettings::new("127.0.0.1", 5001);
        assert_eq!(settings.socket_addr().unwrap().port(), 5001);
        assert!(ServerSettings::new("not a host", 1).socket_addr().is_err());
        assert_eq!(ServerSettings::default().port, 5000);
    }
}
