use agent_sdk::agents::{DataAnalysisAgent, WeatherAgent};
use agent_sdk::prelude::*;
use agent_sdk::server::{router, AppState};
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

struct FlakyAgent {
    base: AgentBase,
}

impl AgentContract for FlakyAgent {
    fn base(&self) -> &AgentBase {
        &self.base
    }

    fn execute(&self, _input: &Payload) -> AgentResult<Payload> {
        Err(AgentError::execution("upstream unavailable"))
    }
}

fn app(agent: Arc<dyn AgentContract>) -> Router {
    router(AppState::new(Arc::new(Orchestrator::new(agent))))
}

fn data_app() -> Router {
    app(Arc::new(DataAnalysisAgent::new()))
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
    let resp = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = resp.status();
    let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

async fn post_raw(app: Router, uri: &str, body: impl Into<Body>) -> (StatusCode, Value) {
    let resp = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(body.into())
                .unwrap(),
        )
        .await
        .unwrap();
    let status = resp.status();
    let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

async fn post_json(app: Router, uri: &str, payload: Value) -> (StatusCode, Value) {
    post_raw(app, uri, payload.to_string()).await
}

#[tokio::test]
async fn health_reports_identity() {
    let (status, body) = get_json(data_app(), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["agent_code"], "data_analysis_agent");
    assert!(body["agent_name"].is_string());
}

#[tokio::test]
async fn info_describes_agent() {
    let (status, body) = get_json(data_app(), "/info").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["agent_code"], "data_analysis_agent");
    assert_eq!(body["input_schema"]["type"], "object");
    assert!(body["input_schema"]["properties"]["data"].is_object());
    assert!(body["capabilities"].as_array().is_some_and(|c| !c.is_empty()));
    assert_eq!(body["timeout"], 30);
}

#[tokio::test]
async fn execute_success_envelope() {
    let (status, body) = post_json(
        data_app(),
        "/execute",
        json!({
            "agent_code": "data_analysis_agent",
            "input": {"data": [1, 2, 3, 4, 5], "operation": "avg"}
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["agent_code"], "data_analysis_agent");
    assert_eq!(body["result"].as_f64(), Some(3.0));
    assert_eq!(body["data_count"], 5);
    assert!(body["execution_time"].as_u64().is_some());
}

#[tokio::test]
async fn execute_validation_failure_is_bad_request() {
    let (status, body) = post_json(
        data_app(),
        "/execute",
        json!({"input": {"data": [], "operation": "sum"}}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "error");
    assert_eq!(body["error_kind"], "VALIDATION");
    assert_eq!(body["agent_code"], "data_analysis_agent");
    assert!(body["execution_time"].as_u64().is_some());
}

#[tokio::test]
async fn execute_wrong_agent_is_bad_request() {
    let (status, body) = post_json(
        data_app(),
        "/execute",
        json!({"agent_code": "weather_agent", "input": {"data": [1], "operation": "sum"}}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_kind"], "IDENTITY_MISMATCH");
    assert!(body["error"]
        .as_str()
        .is_some_and(|e| e.contains("weather_agent")));
}

#[tokio::test]
async fn execute_empty_agent_code_runs() {
    let (status, body) = post_json(
        data_app(),
        "/execute",
        json!({"agent_code": "", "input": {"data": [1, 2, 3], "operation": "sum"}}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["result"], 6);
}

#[tokio::test]
async fn execute_malformed_bodies() {
    for raw in ["", "{}", "not json", "[1, 2]", r#"{"input": "text"}"#] {
        let (status, body) = post_raw(data_app(), "/execute", raw.to_string()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body {:?}", raw);
        assert_eq!(body["status"], "error");
        assert_eq!(body["error_kind"], "MALFORMED_REQUEST");
    }
}

#[tokio::test]
async fn execute_failure_is_server_error() {
    let flaky = app(Arc::new(FlakyAgent {
        base: AgentBase::new("flaky_agent", "Flaky", "Always fails"),
    }));
    let (status, body) = post_json(flaky, "/execute", json!({"input": {"x": 1}})).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["status"], "error");
    assert_eq!(body["error_kind"], "EXECUTION");
    assert_eq!(body["error"], "upstream unavailable");
}

#[tokio::test]
async fn config_update_applies() {
    let weather = app(Arc::new(WeatherAgent::new()));

    let (status, body) =
        post_json(weather.clone(), "/config", json!({"unit": "fahrenheit"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");

    let (status, body) =
        post_json(weather, "/execute", json!({"input": {"city": "Beijing"}})).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["temperature"]
        .as_str()
        .is_some_and(|t| t.ends_with("°F")));
}

#[tokio::test]
async fn config_rejected_by_agent() {
    let weather = app(Arc::new(WeatherAgent::new()));
    let (status, body) = post_json(weather, "/config", json!({"unit": "kelvin"})).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["status"], "error");
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn config_must_be_object() {
    let (status, body) = post_raw(data_app(), "/config", "[1, 2]".to_string()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_kind"], "MALFORMED_REQUEST");
}
