use super::{Decision, Processor, ProcessorContext, ProcessorOutput, SummaryRecord, upsert_object};
use crate::api::endpoints::ObjectType;
use crate::api::models::RequestBody;
use crate::api::resilience::retry;
use crate::api::resolver;
use crate::environment::Environment;
use crate::error::{JamfError, Result};
use crate::template;
use anyhow::Context;
use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Uploads an API role from a JSON template
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRoleUploader {
    pub name: String,
    pub template: PathBuf,
    pub replace: bool,
}

impl ApiRoleUploader {
    pub fn from_env(env: &Environment) -> Result<Self> {
        Ok(Self {
            name: env.require("api_role_name")?,
            template: env.require_path("api_role_template")?,
            replace: env.flag("replace_api_role"),
        })
    }

    /// Rendered template with `displayName` set to the role name
    pub fn body(&self, template: &Path, env: &Environment) -> Result<Value> {
        let mut body = template::render_json_file(template, env)?;
        let object = body.as_object_mut().ok_or_else(|| {
            JamfError::Template(format!("{} must contain a JSON object", template.display()))
        })?;
        object.insert("displayName".into(), Value::String(self.name.clone()));
        Ok(body)
    }
}

#[async_trait]
impl Processor for ApiRoleUploader {
    fn name(&self) -> &'static str {
        "JamfAPIRoleUploader"
    }

    async fn run(&self, context: &ProcessorContext) -> anyhow::Result<ProcessorOutput> {
        let client = context.jamf()?;
        client.authenticate().await.context("Jamf authentication failed")?;

        let existing = resolver::find_id(client, ObjectType::ApiRole, &self.name, None)
            .await
            .with_context(|| format!("looking up API role '{}'", self.name))?;
        let existing = match Decision::decide(existing, self.replace) {
            Decision::Keep(id) => {
                log::info!("API role '{}' already exists (id {}); not replacing", self.name, id);
                return Ok(ProcessorOutput::unchanged(id.clone())
                    .with_variable("api_role_id", id)
                    .with_variable("api_role_updated", false));
            }
            decision => decision.existing_id().map(str::to_string),
        };

        let body = self.body(&self.template, context.env())?;
        let (outcome, id) = upsert_object(
            client,
            ObjectType::ApiRole,
            existing.as_deref(),
            RequestBody::Json(body),
            retry::standard,
        )
        .await
        .with_context(|| format!("uploading API role '{}'", self.name))?;
        log::info!("API role '{}' {}", self.name, outcome);

        let summary = SummaryRecord::new("The following API roles were created or updated in Jamf Pro:")
            .field("api_role_name", self.name.clone())
            .field("template", self.template.display().to_string());

        let mut output = ProcessorOutput::new(outcome)
            .with_variable("api_role_updated", true)
            .with_summary(summary);
        if let Some(id) = id {
            output = output.with_variable("api_role_id", id.clone()).with_object_id(id);
        }
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_display_name_is_forced() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"displayName": "placeholder", "privileges": ["Read Computers", "%EXTRA_PRIVILEGE%"]}}"#
        )
        .unwrap();

        let env = Environment::new()
            .with("api_role_name", "AutoPkg")
            .with("api_role_template", file.path().display().to_string())
            .with("EXTRA_PRIVILEGE", "Update Policies");
        let uploader = ApiRoleUploader::from_env(&env).unwrap();
        let body = uploader.body(&uploader.template, &env).unwrap();

        assert_eq!(body["displayName"], "AutoPkg");
        assert_eq!(body["privileges"][1], "Update Policies");
    }

    #[test]
    fn test_non_object_template_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[1, 2]").unwrap();
        let env = Environment::new()
            .with("api_role_name", "AutoPkg")
            .with("api_role_template", file.path().display().to_string());
        let uploader = ApiRoleUploader::from_env(&env).unwrap();
        assert!(matches!(
            uploader.body(&uploader.template, &env),
            Err(JamfError::Template(_))
        ));
    }
}
