//! Upload, delete and notification processors
//!
//! A processor is built from an [`Environment`], runs once against a
//! [`ProcessorContext`] and hands back a [`ProcessorOutput`]. Callers merge
//! that output into the next environment with [`Environment::merged`].

pub mod api_client;
pub mod api_role;
pub mod category;
pub mod computer_group;
pub mod extension_attribute;
pub mod icon;
pub mod object;
pub mod package;
pub mod patch;
pub mod policy;
pub mod script;

use crate::api::client::JamfClient;
use crate::api::endpoints::ObjectType;
use crate::api::models::{ApiRequest, RequestBody};
use crate::api::resilience::retry::{self, RetryConfig, StatusPredicate};
use crate::environment::Environment;
use crate::error::{JamfError, Result};
use crate::notifiers::{
    google_chat::GoogleChatNotifier, jira::JiraIssueCreator, slack::SlackNotifier, teams::TeamsNotifier,
};
use async_trait::async_trait;
use once_cell::sync::OnceCell;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

pub use api_client::ApiClientUploader;
pub use api_role::ApiRoleUploader;
pub use category::CategoryUploader;
pub use computer_group::ComputerGroupUploader;
pub use extension_attribute::ExtensionAttributeUploader;
pub use icon::IconUploader;
pub use object::{ObjectDeleter, ObjectUploader};
pub use package::PackageUploader;
pub use patch::PatchUploader;
pub use policy::{PolicyDeleter, PolicyUploader};
pub use script::ScriptUploader;

#[async_trait]
pub trait Processor: Send + Sync {
    /// Jamf-style name, e.g. `JamfCategoryUploader`
    fn name(&self) -> &'static str;

    async fn run(&self, context: &ProcessorContext) -> anyhow::Result<ProcessorOutput>;
}

/// Everything a processor invocation may touch
pub struct ProcessorContext {
    env: Environment,
    retry: RetryConfig,
    client: OnceCell<JamfClient>,
}

impl ProcessorContext {
    pub fn new(env: Environment) -> Self {
        let retry = RetryConfig::from_env(&env);
        Self {
            env,
            retry,
            client: OnceCell::new(),
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    pub fn retry(&self) -> &RetryConfig {
        &self.retry
    }

    /// Jamf client for this invocation, built on first use
    pub fn jamf(&self) -> Result<&JamfClient> {
        self.client.get_or_try_init(|| {
            let settings = crate::api::models::ConnectionSettings::from_env(&self.env)?;
            JamfClient::new(settings, self.retry.clone())
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Created,
    Updated,
    Unchanged,
    Deleted,
    Absent,
    Sent,
    NothingToReport,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Outcome::Created => "created",
            Outcome::Updated => "updated",
            Outcome::Unchanged => "unchanged",
            Outcome::Deleted => "deleted",
            Outcome::Absent => "absent",
            Outcome::Sent => "sent",
            Outcome::NothingToReport => "nothing to report",
        };
        f.write_str(label)
    }
}

/// What a notifier reports for one processor run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryRecord {
    pub summary_text: String,
    pub report_fields: Vec<String>,
    pub data: BTreeMap<String, String>,
}

impl SummaryRecord {
    pub fn new(summary_text: impl Into<String>) -> Self {
        Self {
            summary_text: summary_text.into(),
            ..Default::default()
        }
    }

    /// Add a reported field; field order is kept for rendering
    pub fn field(mut self, key: &str, value: impl Into<String>) -> Self {
        if !self.report_fields.iter().any(|f| f == key) {
            self.report_fields.push(key.to_string());
        }
        self.data.insert(key.to_string(), value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessorOutput {
    pub outcome: Outcome,
    pub object_id: Option<String>,
    pub variables: BTreeMap<String, Value>,
    pub summary: Option<SummaryRecord>,
}

impl ProcessorOutput {
    pub fn new(outcome: Outcome) -> Self {
        Self {
            outcome,
            object_id: None,
            variables: BTreeMap::new(),
            summary: None,
        }
    }

    /// Object already present and left alone
    pub fn unchanged(id: impl Into<String>) -> Self {
        Self::new(Outcome::Unchanged).with_object_id(id)
    }

    pub fn with_object_id(mut self, id: impl Into<String>) -> Self {
        self.object_id = Some(id.into());
        self
    }

    pub fn with_variable(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.variables.insert(key.into(), value.into());
        self
    }

    pub fn with_summary(mut self, summary: SummaryRecord) -> Self {
        self.summary = Some(summary);
        self
    }

    pub fn changed(&self) -> bool {
        matches!(
            self.outcome,
            Outcome::Created | Outcome::Updated | Outcome::Deleted
        )
    }
}

/// Create-or-replace choice made after resolving a name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Create,
    Replace(String),
    Keep(String),
}

impl Decision {
    pub fn decide(existing: Option<String>, replace: bool) -> Self {
        match existing {
            None => Decision::Create,
            Some(id) if replace => Decision::Replace(id),
            Some(id) => Decision::Keep(id),
        }
    }

    pub fn existing_id(&self) -> Option<&str> {
        match self {
            Decision::Create => None,
            Decision::Replace(id) | Decision::Keep(id) => Some(id),
        }
    }
}

/// POST a new object or PUT over an existing one, with retries
pub async fn upsert_object(
    client: &JamfClient,
    object_type: ObjectType,
    existing: Option<&str>,
    body: RequestBody,
    predicate: StatusPredicate,
) -> Result<(Outcome, Option<String>)> {
    let (method, path, outcome) = match existing {
        None => (Method::POST, object_type.create_path(), Outcome::Created),
        Some(id) => (Method::PUT, object_type.object_path(id), Outcome::Updated),
    };

    log::info!("{} {} at {}", if existing.is_some() { "Replacing" } else { "Creating" }, object_type, path);
    let request = ApiRequest::new(method, path, object_type.family()).with_body(body);
    let response = client.upload(&request, predicate).await?;

    let id = response
        .object_id()
        .or_else(|| existing.map(str::to_string));
    Ok((outcome, id))
}

/// DELETE an object by id, with retries
pub async fn delete_object(client: &JamfClient, object_type: ObjectType, id: &str) -> Result<()> {
    let request = ApiRequest::delete(object_type.object_path(id), object_type.family());
    log::info!("Deleting {} {}", object_type, id);
    client.upload(&request, retry::standard).await?;
    Ok(())
}

/// Id of the named category, or `-1` when no category was given
pub(crate) async fn category_id(client: &JamfClient, category: Option<&str>, input_key: &str) -> Result<String> {
    let Some(category) = category else {
        return Ok("-1".to_string());
    };
    crate::api::resolver::find_id(client, ObjectType::Category, category, None)
        .await?
        .ok_or_else(|| JamfError::invalid(input_key, format!("category '{}' not found", category)))
}

/// Read a file named by an input variable into memory
pub(crate) fn read_input_file(path: &std::path::Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| JamfError::file(path, e))
}

/// File name component of a path, for default object names
pub(crate) fn file_name_of(path: &std::path::Path) -> Option<String> {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
}

/// Every processor reachable from the CLI and recipes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProcessorKind {
    JamfCategoryUploader,
    JamfComputerGroupUploader,
    JamfPolicyUploader,
    JamfPolicyDeleter,
    JamfScriptUploader,
    JamfExtensionAttributeUploader,
    #[serde(rename = "JamfAPIRoleUploader")]
    JamfApiRoleUploader,
    #[serde(rename = "JamfAPIClientUploader")]
    JamfApiClientUploader,
    JamfIconUploader,
    JamfPackageUploader,
    JamfPatchUploader,
    JamfObjectUploader,
    JamfObjectDeleter,
    JamfSlackNotifier,
    JamfTeamsNotifier,
    JamfGoogleChatNotifier,
    JamfJiraIssueCreator,
}

impl ProcessorKind {
    pub const ALL: [ProcessorKind; 17] = [
        ProcessorKind::JamfCategoryUploader,
        ProcessorKind::JamfComputerGroupUploader,
        ProcessorKind::JamfPolicyUploader,
        ProcessorKind::JamfPolicyDeleter,
        ProcessorKind::JamfScriptUploader,
        ProcessorKind::JamfExtensionAttributeUploader,
        ProcessorKind::JamfApiRoleUploader,
        ProcessorKind::JamfApiClientUploader,
        ProcessorKind::JamfIconUploader,
        ProcessorKind::JamfPackageUploader,
        ProcessorKind::JamfPatchUploader,
        ProcessorKind::JamfObjectUploader,
        ProcessorKind::JamfObjectDeleter,
        ProcessorKind::JamfSlackNotifier,
        ProcessorKind::JamfTeamsNotifier,
        ProcessorKind::JamfGoogleChatNotifier,
        ProcessorKind::JamfJiraIssueCreator,
    ];

    pub fn jamf_name(&self) -> &'static str {
        match self {
            ProcessorKind::JamfCategoryUploader => "JamfCategoryUploader",
            ProcessorKind::JamfComputerGroupUploader => "JamfComputerGroupUploader",
            ProcessorKind::JamfPolicyUploader => "JamfPolicyUploader",
            ProcessorKind::JamfPolicyDeleter => "JamfPolicyDeleter",
            ProcessorKind::JamfScriptUploader => "JamfScriptUploader",
            ProcessorKind::JamfExtensionAttributeUploader => "JamfExtensionAttributeUploader",
            ProcessorKind::JamfApiRoleUploader => "JamfAPIRoleUploader",
            ProcessorKind::JamfApiClientUploader => "JamfAPIClientUploader",
            ProcessorKind::JamfIconUploader => "JamfIconUploader",
            ProcessorKind::JamfPackageUploader => "JamfPackageUploader",
            ProcessorKind::JamfPatchUploader => "JamfPatchUploader",
            ProcessorKind::JamfObjectUploader => "JamfObjectUploader",
            ProcessorKind::JamfObjectDeleter => "JamfObjectDeleter",
            ProcessorKind::JamfSlackNotifier => "JamfSlackNotifier",
            ProcessorKind::JamfTeamsNotifier => "JamfTeamsNotifier",
            ProcessorKind::JamfGoogleChatNotifier => "JamfGoogleChatNotifier",
            ProcessorKind::JamfJiraIssueCreator => "JamfJiraIssueCreator",
        }
    }

    /// Command-line spelling, e.g. `category-uploader`
    pub fn cli_name(&self) -> &'static str {
        match self {
            ProcessorKind::JamfCategoryUploader => "category-uploader",
            ProcessorKind::JamfComputerGroupUploader => "computer-group-uploader",
            ProcessorKind::JamfPolicyUploader => "policy-uploader",
            ProcessorKind::JamfPolicyDeleter => "policy-deleter",
            ProcessorKind::JamfScriptUploader => "script-uploader",
            ProcessorKind::JamfExtensionAttributeUploader => "extension-attribute-uploader",
            ProcessorKind::JamfApiRoleUploader => "api-role-uploader",
            ProcessorKind::JamfApiClientUploader => "api-client-uploader",
            ProcessorKind::JamfIconUploader => "icon-uploader",
            ProcessorKind::JamfPackageUploader => "package-uploader",
            ProcessorKind::JamfPatchUploader => "patch-uploader",
            ProcessorKind::JamfObjectUploader => "object-uploader",
            ProcessorKind::JamfObjectDeleter => "object-deleter",
            ProcessorKind::JamfSlackNotifier => "slack-notifier",
            ProcessorKind::JamfTeamsNotifier => "teams-notifier",
            ProcessorKind::JamfGoogleChatNotifier => "google-chat-notifier",
            ProcessorKind::JamfJiraIssueCreator => "jira-notifier",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ProcessorKind::JamfCategoryUploader => "Create or update a category",
            ProcessorKind::JamfComputerGroupUploader => "Upload a computer group from an XML template",
            ProcessorKind::JamfPolicyUploader => "Upload a policy from an XML template, optionally with an icon",
            ProcessorKind::JamfPolicyDeleter => "Delete a policy by name",
            ProcessorKind::JamfScriptUploader => "Upload a script with its metadata",
            ProcessorKind::JamfExtensionAttributeUploader => "Upload a computer extension attribute script",
            ProcessorKind::JamfApiRoleUploader => "Upload an API role from a JSON template",
            ProcessorKind::JamfApiClientUploader => "Create or update an API client, optionally rotating its secret",
            ProcessorKind::JamfIconUploader => "Upload a Self Service icon",
            ProcessorKind::JamfPackageUploader => "Create package metadata and upload the package file",
            ProcessorKind::JamfPatchUploader => "Upload a patch policy for a patch software title",
            ProcessorKind::JamfObjectUploader => "Upload any supported object type from a template",
            ProcessorKind::JamfObjectDeleter => "Delete any supported object type by name",
            ProcessorKind::JamfSlackNotifier => "Post run summaries to a Slack webhook",
            ProcessorKind::JamfTeamsNotifier => "Post run summaries to a Microsoft Teams webhook",
            ProcessorKind::JamfGoogleChatNotifier => "Post run summaries to a Google Chat webhook",
            ProcessorKind::JamfJiraIssueCreator => "Open a Jira issue listing run summaries",
        }
    }

    /// Validate inputs and construct the processor
    pub fn build(&self, env: &Environment) -> Result<Box<dyn Processor>> {
        let processor: Box<dyn Processor> = match self {
            ProcessorKind::JamfCategoryUploader => Box::new(CategoryUploader::from_env(env)?),
            ProcessorKind::JamfComputerGroupUploader => Box::new(ComputerGroupUploader::from_env(env)?),
            ProcessorKind::JamfPolicyUploader => Box::new(PolicyUploader::from_env(env)?),
            ProcessorKind::JamfPolicyDeleter => Box::new(PolicyDeleter::from_env(env)?),
            ProcessorKind::JamfScriptUploader => Box::new(ScriptUploader::from_env(env)?),
            ProcessorKind::JamfExtensionAttributeUploader => {
                Box::new(ExtensionAttributeUploader::from_env(env)?)
            }
            ProcessorKind::JamfApiRoleUploader => Box::new(ApiRoleUploader::from_env(env)?),
            ProcessorKind::JamfApiClientUploader => Box::new(ApiClientUploader::from_env(env)?),
            ProcessorKind::JamfIconUploader => Box::new(IconUploader::from_env(env)?),
            ProcessorKind::JamfPackageUploader => Box::new(PackageUploader::from_env(env)?),
            ProcessorKind::JamfPatchUploader => Box::new(PatchUploader::from_env(env)?),
            ProcessorKind::JamfObjectUploader => Box::new(ObjectUploader::from_env(env)?),
            ProcessorKind::JamfObjectDeleter => Box::new(ObjectDeleter::from_env(env)?),
            ProcessorKind::JamfSlackNotifier => Box::new(SlackNotifier::from_env(env)?),
            ProcessorKind::JamfTeamsNotifier => Box::new(TeamsNotifier::from_env(env)?),
            ProcessorKind::JamfGoogleChatNotifier => Box::new(GoogleChatNotifier::from_env(env)?),
            ProcessorKind::JamfJiraIssueCreator => Box::new(JiraIssueCreator::from_env(env)?),
        };
        Ok(processor)
    }
}

impl fmt::Display for ProcessorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.jamf_name())
    }
}

impl FromStr for ProcessorKind {
    type Err = JamfError;

    /// Accepts `JamfCategoryUploader`, `category-uploader` and
    /// `jamf-category-uploader`, ignoring case
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        let bare = wanted.strip_prefix("jamf-").unwrap_or(&wanted);
        ProcessorKind::ALL
            .into_iter()
            .find(|kind| kind.jamf_name().eq_ignore_ascii_case(&wanted) || kind.cli_name() == bare)
            .ok_or_else(|| JamfError::invalid("processor", format!("unknown processor '{}'", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decision_table() {
        assert_eq!(Decision::decide(None, true), Decision::Create);
        assert_eq!(Decision::decide(None, false), Decision::Create);
        assert_eq!(Decision::decide(Some("42".into()), true), Decision::Replace("42".into()));
        assert_eq!(Decision::decide(Some("42".into()), false), Decision::Keep("42".into()));
    }

    #[test]
    fn test_processor_kind_parsing() {
        assert_eq!(
            "JamfAPIRoleUploader".parse::<ProcessorKind>().unwrap(),
            ProcessorKind::JamfApiRoleUploader
        );
        assert_eq!(
            "category-uploader".parse::<ProcessorKind>().unwrap(),
            ProcessorKind::JamfCategoryUploader
        );
        assert_eq!(
            "jamf-slack-notifier".parse::<ProcessorKind>().unwrap(),
            ProcessorKind::JamfSlackNotifier
        );
        assert_eq!(
            "JamfPatchUploader".parse::<ProcessorKind>().unwrap(),
            ProcessorKind::JamfPatchUploader
        );
        assert_eq!(
            "jira-notifier".parse::<ProcessorKind>().unwrap(),
            ProcessorKind::JamfJiraIssueCreator
        );
        assert!("JamfPrinterUploader".parse::<ProcessorKind>().is_err());
    }

    #[test]
    fn test_every_kind_has_distinct_names() {
        let mut names: Vec<_> = ProcessorKind::ALL.iter().map(|k| k.cli_name()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), ProcessorKind::ALL.len());
    }

    #[test]
    fn test_summary_fields_keep_order() {
        let summary = SummaryRecord::new("Categories")
            .field("category", "Browsers")
            .field("priority", "10")
            .field("category", "Utilities");
        assert_eq!(summary.report_fields, vec!["category", "priority"]);
        assert_eq!(summary.data["category"], "Utilities");
    }

    #[test]
    fn test_build_reports_missing_input() {
        let err = ProcessorKind::JamfCategoryUploader
            .build(&Environment::new())
            .err()
            .unwrap();
        assert!(matches!(err, JamfError::MissingInput(key) if key == "category_name"));
    }
}
