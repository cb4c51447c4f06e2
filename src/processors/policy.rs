//! Policy upload (with optional Self Service icon) and deletion

use super::object::{TemplateUpload, delete_named, upload_from_template};
use super::{Outcome, Processor, ProcessorContext, ProcessorOutput, SummaryRecord, file_name_of, read_input_file};
use crate::api::client::JamfClient;
use crate::api::constants;
use crate::api::endpoints::{ApiFamily, ObjectType};
use crate::api::models::{ApiRequest, FileUpload, RequestBody};
use crate::api::resilience::retry;
use crate::environment::Environment;
use crate::error::Result;
use anyhow::Context;
use async_trait::async_trait;
use reqwest::Method;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq)]
pub struct PolicyUploader {
    pub name: String,
    pub template: PathBuf,
    pub replace: bool,
    pub icon: Option<PathBuf>,
    pub replace_icon: bool,
}

impl PolicyUploader {
    pub fn from_env(env: &Environment) -> Result<Self> {
        Ok(Self {
            name: env.require("policy_name")?,
            template: env.require_path("policy_template")?,
            replace: env.flag("replace_policy"),
            icon: env.path("icon"),
            replace_icon: env.flag("replace_icon"),
        })
    }

    async fn upload_icon(&self, client: &JamfClient, policy_id: &str, icon: &Path) -> Result<()> {
        let bytes = read_input_file(icon)?;
        let file_name = file_name_of(icon).unwrap_or_else(|| "icon.png".to_string());
        let request = ApiRequest::new(
            Method::POST,
            constants::policy_icon_upload_path(policy_id),
            ApiFamily::Classic,
        )
        .with_body(RequestBody::File(FileUpload::new("name", file_name, bytes)));

        log::info!("Uploading icon {} to policy {}", icon.display(), policy_id);
        client.upload(&request, retry::standard).await?;
        Ok(())
    }
}

#[async_trait]
impl Processor for PolicyUploader {
    fn name(&self) -> &'static str {
        "JamfPolicyUploader"
    }

    async fn run(&self, context: &ProcessorContext) -> anyhow::Result<ProcessorOutput> {
        let client = context.jamf()?;
        client.authenticate().await.context("Jamf authentication failed")?;

        let result = upload_from_template(
            client,
            context.env(),
            ObjectType::Policy,
            &self.name,
            &self.template,
            self.replace,
        )
        .await
        .with_context(|| format!("uploading policy '{}'", self.name))?;

        let (outcome, id) = match &result {
            TemplateUpload::Kept(id) => (Outcome::Unchanged, Some(id.clone())),
            TemplateUpload::Written { outcome, id } => (*outcome, id.clone()),
        };

        let mut icon_uploaded = false;
        if let (Some(icon), Some(id)) = (&self.icon, &id) {
            if outcome == Outcome::Created || self.replace_icon {
                self.upload_icon(client, id, icon)
                    .await
                    .with_context(|| format!("uploading icon for policy '{}'", self.name))?;
                icon_uploaded = true;
            }
        }

        let mut output = ProcessorOutput::new(outcome)
            .with_variable("policy_updated", outcome != Outcome::Unchanged)
            .with_variable("icon_uploaded", icon_uploaded);
        if let Some(id) = id {
            output = output.with_variable("policy_id", id.clone()).with_object_id(id);
        }

        if outcome != Outcome::Unchanged || icon_uploaded {
            let icon_name = self
                .icon
                .as_deref()
                .and_then(file_name_of)
                .unwrap_or_default();
            output = output.with_summary(
                SummaryRecord::new("The following policies were created or updated in Jamf Pro:")
                    .field("policy", self.name.clone())
                    .field("template", self.template.display().to_string())
                    .field("icon", if icon_uploaded { icon_name } else { String::new() }),
            );
        }
        Ok(output)
    }
}

/// Deletes a policy by name
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyDeleter {
    pub name: String,
}

impl PolicyDeleter {
    pub fn from_env(env: &Environment) -> Result<Self> {
        Ok(Self {
            name: env.require("policy_name")?,
        })
    }
}

#[async_trait]
impl Processor for PolicyDeleter {
    fn name(&self) -> &'static str {
        "JamfPolicyDeleter"
    }

    async fn run(&self, context: &ProcessorContext) -> anyhow::Result<ProcessorOutput> {
        let client = context.jamf()?;
        client.authenticate().await.context("Jamf authentication failed")?;

        let deleted = delete_named(client, ObjectType::Policy, &self.name)
            .await
            .with_context(|| format!("deleting policy '{}'", self.name))?;

        Ok(match deleted {
            Some(id) => ProcessorOutput::new(Outcome::Deleted)
                .with_object_id(id)
                .with_summary(
                    SummaryRecord::new("The following policies were deleted from Jamf Pro:")
                        .field("policy", self.name.clone()),
                ),
            None => ProcessorOutput::new(Outcome::Absent),
        })
    }
}
