//! Structured request logging with correlation ids
//!
//! Each request gets a uuid so its request and response lines can be matched
//! up in verbose logs. Header values that carry credentials are masked.

use serde_json::json;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use log::{debug, warn};

const SENSITIVE_HEADERS: [&str; 3] = ["authorization", "cookie", "set-cookie"];

/// Context for one HTTP exchange
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub correlation_id: String,
    pub method: String,
    pub url: String,
    pub start_time: Instant,
}

impl RequestContext {
    pub fn start(method: &str, url: &str) -> Self {
        Self {
            correlation_id: uuid::Uuid::new_v4().to_string(),
            method: method.to_string(),
            url: url.to_string(),
            start_time: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}

/// Log HTTP request details
pub fn log_request(context: &RequestContext, headers: &HashMap<String, String>) {
    let log_data = json!({
        "event": "http_request",
        "correlation_id": context.correlation_id,
        "method": context.method,
        "url": context.url,
        "headers": sanitize_headers(headers),
    });
    debug!("HTTP Request: {}", log_data);
}

/// Log HTTP response details
pub fn log_response(context: &RequestContext, status_code: u16) {
    let log_data = json!({
        "event": "http_response",
        "correlation_id": context.correlation_id,
        "method": context.method,
        "url": context.url,
        "status_code": status_code,
        "duration_ms": context.elapsed().as_millis(),
    });

    if status_code >= 400 {
        warn!("HTTP Response (Error): {}", log_data);
    } else {
        debug!("HTTP Response: {}", log_data);
    }
}

pub fn sanitize_headers(headers: &HashMap<String, String>) -> HashMap<String, String> {
    headers
        .iter()
        .map(|(name, value)| {
            if SENSITIVE_HEADERS.contains(&name.to_ascii_lowercase().as_str()) {
                (name.clone(), "[REDACTED]".to_string())
            } else {
                (name.clone(), value.clone())
            }
        })
        .collect()
}
