//! Webhook notifiers that report upload summaries
//!
//! Notifiers read every `*_summary_result` entry left in the environment by
//! earlier processors. When none carries data, nothing is posted.

pub mod google_chat;
pub mod jira;
pub mod slack;
pub mod teams;

use crate::api::constants::{self, headers};
use crate::api::models::ApiResponse;
use crate::api::resilience::logging::{self, RequestContext};
use crate::api::resilience::retry::{self, RetryConfig, RetryPolicy};
use crate::environment::Environment;
use crate::error::{JamfError, Result};
use crate::processors::{Outcome, ProcessorContext, ProcessorOutput, SummaryRecord};
use anyhow::Context;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde_json::Value;
use std::collections::HashMap;

pub use google_chat::GoogleChatNotifier;
pub use jira::JiraIssueCreator;
pub use slack::SlackNotifier;
pub use teams::TeamsNotifier;

/// Summaries worth reporting, keyed by the environment key they came from
pub fn collect_reports(env: &Environment) -> Vec<(String, SummaryRecord)> {
    env.summaries()
        .into_iter()
        .filter(|(_, record)| !record.data.is_empty())
        .collect()
}

/// `(field, value)` pairs of a record in reporting order
pub fn report_lines(record: &SummaryRecord) -> Vec<(&str, &str)> {
    record
        .report_fields
        .iter()
        .filter_map(|field| {
            record
                .data
                .get(field)
                .filter(|value| !value.is_empty())
                .map(|value| (field.as_str(), value.as_str()))
        })
        .collect()
}

/// Require a webhook URL input and check its scheme
pub(crate) fn webhook_url(env: &Environment, key: &str) -> Result<String> {
    let url = env.require(key)?;
    if !url.starts_with("https://") && !url.starts_with("http://") {
        return Err(JamfError::invalid(key, "webhook URL must be http(s)"));
    }
    Ok(url)
}

/// Basic credentials for services that authenticate webhook posts
#[derive(Debug, Clone, PartialEq)]
pub struct WebhookCredentials {
    pub username: String,
    pub token: String,
}

/// Posts JSON payloads to third-party webhooks, retrying until a 2xx
pub struct WebhookClient {
    http_client: reqwest::Client,
    retry: RetryConfig,
    credentials: Option<WebhookCredentials>,
}

impl WebhookClient {
    pub fn new(retry: RetryConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(constants::USER_AGENT)
            .build()?;
        Ok(Self {
            http_client,
            retry,
            credentials: None,
        })
    }

    pub fn with_credentials(mut self, credentials: Option<WebhookCredentials>) -> Self {
        self.credentials = credentials;
        self
    }

    pub async fn post_json(&self, url: &str, payload: &Value) -> Result<ApiResponse> {
        let body = serde_json::to_vec(payload)?;
        RetryPolicy::new(self.retry.clone())
            .with_predicate(retry::success_only)
            .execute(|| self.send(url, body.clone()))
            .await
    }

    async fn send(&self, url: &str, body: Vec<u8>) -> Result<ApiResponse> {
        let context = RequestContext::start("POST", url);
        let mut logged_headers = HashMap::new();
        logged_headers.insert(CONTENT_TYPE.to_string(), headers::CONTENT_TYPE_JSON.to_string());

        let mut request = self
            .http_client
            .post(url)
            .header(CONTENT_TYPE, headers::CONTENT_TYPE_JSON)
            .body(body);
        if let Some(credentials) = &self.credentials {
            logged_headers.insert(AUTHORIZATION.to_string(), format!("Basic {}", credentials.username));
            request = request.basic_auth(&credentials.username, Some(&credentials.token));
        }
        logging::log_request(&context, &logged_headers);

        let response = request.send().await?;
        logging::log_response(&context, response.status().as_u16());
        ApiResponse::read(response, false).await
    }
}

/// Shared run logic: collect, build, post
pub(crate) async fn deliver<F>(
    context: &ProcessorContext,
    service: &str,
    url: &str,
    build_payload: F,
) -> anyhow::Result<ProcessorOutput>
where
    F: FnOnce(&[(String, SummaryRecord)]) -> Value,
{
    Ok(match post_reports(context, service, url, None, build_payload).await? {
        Some(_) => ProcessorOutput::new(Outcome::Sent).with_variable("notification_sent", true),
        None => ProcessorOutput::new(Outcome::NothingToReport),
    })
}

/// Post the collected reports; `None` when there was nothing to send
pub(crate) async fn post_reports<F>(
    context: &ProcessorContext,
    service: &str,
    url: &str,
    credentials: Option<WebhookCredentials>,
    build_payload: F,
) -> anyhow::Result<Option<ApiResponse>>
where
    F: FnOnce(&[(String, SummaryRecord)]) -> Value,
{
    let reports = collect_reports(context.env());
    if reports.is_empty() {
        log::info!("No summaries to report to {}", service);
        return Ok(None);
    }

    let payload = build_payload(&reports);
    log::info!("Posting {} summary record(s) to {}", reports.len(), service);
    let response = WebhookClient::new(context.retry().clone())?
        .with_credentials(credentials)
        .post_json(url, &payload)
        .await
        .with_context(|| format!("posting to {}", service))?;
    Ok(Some(response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_only_records_with_data_are_reported() {
        let empty = SummaryRecord::new("nothing");
        let full = SummaryRecord::new("Categories").field("category", "Browsers");
        let env = Environment::new()
            .with("jamfpolicyuploader_summary_result", serde_json::to_value(&empty).unwrap())
            .with("jamfcategoryuploader_summary_result", serde_json::to_value(&full).unwrap())
            .with("unrelated", json!({"data": {"x": "y"}}));

        let reports = collect_reports(&env);
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].0, "jamfcategoryuploader_summary_result");
    }

    #[test]
    fn test_report_lines_skip_blank_values() {
        let record = SummaryRecord::new("Policies")
            .field("policy", "Install Firefox")
            .field("icon", "");
        assert_eq!(report_lines(&record), vec![("policy", "Install Firefox")]);
    }

    #[test]
    fn test_webhook_url_scheme() {
        let env = Environment::new()
            .with("good", "https://hooks.slack.com/services/T/B/X")
            .with("bad", "hooks.slack.com");
        assert!(webhook_url(&env, "good").is_ok());
        assert!(webhook_url(&env, "bad").is_err());
        assert!(webhook_url(&env, "missing").is_err());
    }
}
