//! Shared fixtures: a mock Jamf Pro server and fast retry settings

#![allow(dead_code)]

use jamf_uploader::api::RetryConfig;
use jamf_uploader::{Environment, ProcessorContext};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TOKEN: &str = "test-token";

/// Mock server that already answers the Basic-to-Bearer token exchange
pub async fn jamf_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": TOKEN,
            "expires": "2099-01-01T00:00:00Z"
        })))
        .mount(&server)
        .await;
    server
}

/// Environment pointing at `server` with username/password credentials
pub fn jamf_env(server: &MockServer) -> Environment {
    Environment::new()
        .with("JSS_URL", server.uri())
        .with("API_USERNAME", "autopkg")
        .with("API_PASSWORD", "hunter2")
}

/// Five attempts, no waiting
pub fn fast_retry() -> RetryConfig {
    RetryConfig::default()
        .with_sleep(Duration::ZERO)
        .with_min_sleep(Duration::ZERO)
}

pub fn context(env: Environment) -> ProcessorContext {
    ProcessorContext::new(env).with_retry(fast_retry())
}

/// Empty Jamf Pro listing
pub fn no_results() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({"totalCount": 0, "results": []}))
}

/// Jamf Pro listing with one record
pub fn one_result(record: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({"totalCount": 1, "results": [record]}))
}
