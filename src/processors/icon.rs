use super::{Outcome, Processor, ProcessorContext, ProcessorOutput, SummaryRecord, file_name_of, read_input_file};
use crate::api::endpoints::ObjectType;
use crate::api::models::{ApiRequest, FileUpload, RequestBody};
use crate::api::resilience::retry;
use crate::environment::Environment;
use crate::error::{JamfError, Result};
use anyhow::Context;
use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use std::path::PathBuf;

/// Uploads a Self Service icon. Icons cannot be looked up by name, so every
/// run uploads a new one.
#[derive(Debug, Clone, PartialEq)]
pub struct IconUploader {
    pub icon_file: PathBuf,
}

impl IconUploader {
    pub fn from_env(env: &Environment) -> Result<Self> {
        Ok(Self {
            icon_file: env.require_path("icon_file")?,
        })
    }
}

#[async_trait]
impl Processor for IconUploader {
    fn name(&self) -> &'static str {
        "JamfIconUploader"
    }

    async fn run(&self, context: &ProcessorContext) -> anyhow::Result<ProcessorOutput> {
        let client = context.jamf()?;
        client.authenticate().await.context("Jamf authentication failed")?;

        let bytes = read_input_file(&self.icon_file)?;
        let file_name = file_name_of(&self.icon_file).unwrap_or_else(|| "icon.png".to_string());
        let request = ApiRequest::new(Method::POST, ObjectType::Icon.create_path(), ObjectType::Icon.family())
            .with_body(RequestBody::File(FileUpload::new("file", file_name.clone(), bytes)));

        let response = client
            .upload(&request, retry::standard)
            .await
            .with_context(|| format!("uploading icon {}", self.icon_file.display()))?;

        let id = response
            .object_id()
            .ok_or_else(|| JamfError::UnexpectedResponse("icon upload response had no id".into()))?;
        let uri = response
            .json()
            .and_then(|body| body.get("url"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        log::info!("Uploaded icon {} as id {}", file_name, id);

        let summary = SummaryRecord::new("The following icons were uploaded to Jamf Pro:")
            .field("icon_file", file_name)
            .field("icon_id", id.clone())
            .field("icon_uri", uri.clone());

        Ok(ProcessorOutput::new(Outcome::Created)
            .with_object_id(id.clone())
            .with_variable("icon_id", id)
            .with_variable("selfservice_icon_uri", uri)
            .with_variable("icon_updated", true)
            .with_summary(summary))
    }
}
