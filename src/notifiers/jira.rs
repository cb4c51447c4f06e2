use super::{WebhookCredentials, post_reports, report_lines, webhook_url};
use crate::api::constants::{env_keys, join_url};
use crate::environment::Environment;
use crate::error::Result;
use crate::processors::{Outcome, Processor, ProcessorContext, ProcessorOutput, SummaryRecord};
use async_trait::async_trait;
use serde_json::{Map, Value, json};

pub const ISSUE_ENDPOINT: &str = "rest/api/2/issue";
pub const DEFAULT_SUMMARY: &str = "Jamf Pro: new items uploaded";
/// Jira Cloud's stock "Task" issue type
pub const DEFAULT_ISSUE_TYPE: &str = "10001";

/// Opens a Jira issue describing what the run changed
#[derive(Debug, Clone, PartialEq)]
pub struct JiraIssueCreator {
    pub jira_url: String,
    pub credentials: WebhookCredentials,
    pub project_id: String,
    pub issue_type_id: String,
    pub priority_id: Option<String>,
    pub assignee_id: Option<String>,
    pub summary: String,
    pub server: Option<String>,
}

impl JiraIssueCreator {
    pub fn from_env(env: &Environment) -> Result<Self> {
        Ok(Self {
            jira_url: webhook_url(env, "jira_url")?,
            credentials: WebhookCredentials {
                username: env.require("jira_username")?,
                token: env.require("jira_api_token")?,
            },
            project_id: env.require("jira_project_id")?,
            issue_type_id: env.string_or("jira_issuetype_id", DEFAULT_ISSUE_TYPE),
            priority_id: env.string("jira_priority_id"),
            assignee_id: env.string("jira_assignee_id"),
            summary: env.string_or("jira_summary", DEFAULT_SUMMARY),
            server: env.string(env_keys::JSS_URL),
        })
    }

    pub fn issue_url(&self) -> String {
        join_url(&self.jira_url, ISSUE_ENDPOINT)
    }

    pub fn payload(&self, reports: &[(String, SummaryRecord)]) -> Value {
        let mut description = String::new();
        if let Some(server) = &self.server {
            description.push_str(&format!("Jamf Pro server: {}\n", server));
        }
        for (_, record) in reports {
            description.push_str(&format!("\n*{}*\n", record.summary_text));
            for (field, value) in report_lines(record) {
                description.push_str(&format!("* {}: {}\n", field, value));
            }
        }

        let mut fields = Map::new();
        fields.insert("project".into(), json!({"id": self.project_id}));
        fields.insert("issuetype".into(), json!({"id": self.issue_type_id}));
        fields.insert("summary".into(), json!(self.summary));
        fields.insert("description".into(), json!(description.trim()));
        if let Some(priority) = &self.priority_id {
            fields.insert("priority".into(), json!({"id": priority}));
        }
        if let Some(assignee) = &self.assignee_id {
            fields.insert("assignee".into(), json!({"id": assignee}));
        }
        json!({"fields": fields})
    }
}

#[async_trait]
impl Processor for JiraIssueCreator {
    fn name(&self) -> &'static str {
        "JamfJiraIssueCreator"
    }

    async fn run(&self, context: &ProcessorContext) -> anyhow::Result<ProcessorOutput> {
        let url = self.issue_url();
        let response = post_reports(
            context,
            "Jira",
            &url,
            Some(self.credentials.clone()),
            |reports| self.payload(reports),
        )
        .await?;

        let Some(response) = response else {
            return Ok(ProcessorOutput::new(Outcome::NothingToReport));
        };
        let issue_key = response
            .json()
            .and_then(|body| body.get("key"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        log::info!("Created Jira issue {}", issue_key);

        let mut output = ProcessorOutput::new(Outcome::Sent).with_variable("notification_sent", true);
        if !issue_key.is_empty() {
            output = output
                .with_object_id(issue_key.clone())
                .with_variable("jira_issue_key", issue_key);
        }
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env() -> Environment {
        Environment::new()
            .with("jira_url", "https://example.atlassian.net/")
            .with("jira_username", "autopkg@example.com")
            .with("jira_api_token", "api-token")
            .with("jira_project_id", "10200")
    }

    #[test]
    fn test_defaults_and_issue_url() {
        let creator = JiraIssueCreator::from_env(&env()).unwrap();
        assert_eq!(creator.issue_url(), "https://example.atlassian.net/rest/api/2/issue");
        assert_eq!(creator.issue_type_id, DEFAULT_ISSUE_TYPE);
        assert_eq!(creator.summary, DEFAULT_SUMMARY);
        assert!(JiraIssueCreator::from_env(&env().with("jira_api_token", "")).is_err());
    }

    #[test]
    fn test_issue_fields() {
        let creator = JiraIssueCreator::from_env(&env().with("jira_priority_id", "3")).unwrap();
        let records = vec![(
            "jamfpolicyuploader_summary_result".to_string(),
            SummaryRecord::new("Policies").field("policy", "Install Firefox"),
        )];

        let payload = creator.payload(&records);
        let fields = &payload["fields"];
        assert_eq!(fields["project"]["id"], "10200");
        assert_eq!(fields["issuetype"]["id"], DEFAULT_ISSUE_TYPE);
        assert_eq!(fields["priority"]["id"], "3");
        assert!(fields.get("assignee").is_none());
        assert!(fields["description"].as_str().unwrap().contains("* policy: Install Firefox"));
    }
}
