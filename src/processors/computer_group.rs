use super::object::{TemplateUpload, upload_from_template};
use super::{Processor, ProcessorContext, ProcessorOutput, SummaryRecord};
use crate::api::endpoints::ObjectType;
use crate::environment::Environment;
use crate::error::Result;
use anyhow::Context;
use async_trait::async_trait;
use std::path::PathBuf;

/// Uploads a computer group from a Classic XML template
#[derive(Debug, Clone, PartialEq)]
pub struct ComputerGroupUploader {
    pub name: String,
    pub template: PathBuf,
    pub replace: bool,
}

impl ComputerGroupUploader {
    pub fn from_env(env: &Environment) -> Result<Self> {
        Ok(Self {
            name: env.require("computergroup_name")?,
            template: env.require_path("computergroup_template")?,
            replace: env.flag("replace_group"),
        })
    }
}

#[async_trait]
impl Processor for ComputerGroupUploader {
    fn name(&self) -> &'static str {
        "JamfComputerGroupUploader"
    }

    async fn run(&self, context: &ProcessorContext) -> anyhow::Result<ProcessorOutput> {
        let client = context.jamf()?;
        client.authenticate().await.context("Jamf authentication failed")?;

        let result = upload_from_template(
            client,
            context.env(),
            ObjectType::ComputerGroup,
            &self.name,
            &self.template,
            self.replace,
        )
        .await
        .with_context(|| format!("uploading computer group '{}'", self.name))?;

        Ok(match result {
            TemplateUpload::Kept(id) => ProcessorOutput::unchanged(id.clone())
                .with_variable("computergroup_id", id)
                .with_variable("group_uploaded", false)
                .with_variable("computergroup_updated", false),
            TemplateUpload::Written { outcome, id } => {
                let summary = SummaryRecord::new("The following computer groups were created or updated in Jamf Pro:")
                    .field("group", self.name.clone())
                    .field("template", self.template.display().to_string());
                let mut output = ProcessorOutput::new(outcome)
                    .with_variable("group_uploaded", true)
                    .with_variable("computergroup_updated", true)
                    .with_summary(summary);
                if let Some(id) = id {
                    output = output.with_variable("computergroup_id", id.clone()).with_object_id(id);
                }
                output
            }
        })
    }
}
