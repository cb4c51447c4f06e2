//! Generic template uploader and name-based deleter for any [`ObjectType`]

use super::{
    Decision, Outcome, Processor, ProcessorContext, ProcessorOutput, SummaryRecord, delete_object,
    upsert_object,
};
use crate::api::client::JamfClient;
use crate::api::endpoints::{ApiFamily, ObjectType};
use crate::api::models::RequestBody;
use crate::api::resilience::retry;
use crate::api::resolver;
use crate::environment::Environment;
use crate::error::{JamfError, Result};
use crate::template;
use anyhow::Context;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Result of a create-or-replace from a template
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TemplateUpload {
    /// Existing object left in place
    Kept(String),
    Written { outcome: Outcome, id: Option<String> },
}

/// Render a template into the body type the object's API family expects
pub(crate) fn render_body(object_type: ObjectType, path: &Path, env: &Environment) -> Result<RequestBody> {
    match object_type.family() {
        ApiFamily::Classic => Ok(RequestBody::Xml(template::render_xml_file(path, env)?)),
        ApiFamily::JamfPro => Ok(RequestBody::Json(template::render_json_file(path, env)?)),
    }
}

/// Resolve `name`, then create or replace it from `template_path`
pub(crate) async fn upload_from_template(
    client: &JamfClient,
    env: &Environment,
    object_type: ObjectType,
    name: &str,
    template_path: &Path,
    replace: bool,
) -> Result<TemplateUpload> {
    let existing = resolver::find_id(client, object_type, name, None).await?;
    let existing = match Decision::decide(existing, replace) {
        Decision::Keep(id) => {
            log::info!("{} '{}' already exists (id {}); not replacing", object_type, name, id);
            return Ok(TemplateUpload::Kept(id));
        }
        decision => decision.existing_id().map(str::to_string),
    };

    let body = render_body(object_type, template_path, env)?;
    let (outcome, id) =
        upsert_object(client, object_type, existing.as_deref(), body, retry::standard).await?;
    log::info!("{} '{}' {} (id {})", object_type, name, outcome, id.as_deref().unwrap_or("unknown"));
    Ok(TemplateUpload::Written { outcome, id })
}

/// Uploads any supported object type from a template
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectUploader {
    pub object_type: ObjectType,
    pub name: String,
    pub template: PathBuf,
    pub replace: bool,
}

impl ObjectUploader {
    pub fn from_env(env: &Environment) -> Result<Self> {
        let object_type: ObjectType = env.require("object_type")?.parse()?;
        match object_type {
            ObjectType::Icon => {
                return Err(JamfError::invalid("object_type", "icons are uploaded with JamfIconUploader"));
            }
            ObjectType::PatchPolicy => {
                return Err(JamfError::invalid(
                    "object_type",
                    "patch policies are uploaded with JamfPatchUploader",
                ));
            }
            _ => {}
        }
        Ok(Self {
            object_type,
            name: env.require("object_name")?,
            template: env.require_path("object_template")?,
            replace: env.flag("replace_object"),
        })
    }
}

#[async_trait]
impl Processor for ObjectUploader {
    fn name(&self) -> &'static str {
        "JamfObjectUploader"
    }

    async fn run(&self, context: &ProcessorContext) -> anyhow::Result<ProcessorOutput> {
        let client = context.jamf()?;
        client.authenticate().await.context("Jamf authentication failed")?;

        let result = upload_from_template(
            client,
            context.env(),
            self.object_type,
            &self.name,
            &self.template,
            self.replace,
        )
        .await
        .with_context(|| format!("uploading {} '{}'", self.object_type, self.name))?;

        Ok(match result {
            TemplateUpload::Kept(id) => ProcessorOutput::unchanged(id.clone())
                .with_variable("object_id", id)
                .with_variable("object_updated", false),
            TemplateUpload::Written { outcome, id } => {
                let summary = SummaryRecord::new("The following objects were created or updated in Jamf Pro:")
                    .field("type", self.object_type.as_str())
                    .field("name", self.name.clone())
                    .field("template", self.template.display().to_string());
                let mut output = ProcessorOutput::new(outcome)
                    .with_variable("object_updated", true)
                    .with_summary(summary);
                if let Some(id) = id {
                    output = output.with_variable("object_id", id.clone()).with_object_id(id);
                }
                output
            }
        })
    }
}

/// Deletes any supported object type by name
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectDeleter {
    pub object_type: ObjectType,
    pub name: String,
}

impl ObjectDeleter {
    pub fn from_env(env: &Environment) -> Result<Self> {
        Ok(Self {
            object_type: env.require("object_type")?.parse()?,
            name: env.require("object_name")?,
        })
    }
}

/// Delete the named object when it exists
pub(crate) async fn delete_named(
    client: &JamfClient,
    object_type: ObjectType,
    name: &str,
) -> Result<Option<String>> {
    match resolver::find_id(client, object_type, name, None).await? {
        Some(id) => {
            delete_object(client, object_type, &id).await?;
            log::info!("Deleted {} '{}' (id {})", object_type, name, id);
            Ok(Some(id))
        }
        None => {
            log::info!("{} '{}' does not exist; nothing to delete", object_type, name);
            Ok(None)
        }
    }
}

#[async_trait]
impl Processor for ObjectDeleter {
    fn name(&self) -> &'static str {
        "JamfObjectDeleter"
    }

    async fn run(&self, context: &ProcessorContext) -> anyhow::Result<ProcessorOutput> {
        let client = context.jamf()?;
        client.authenticate().await.context("Jamf authentication failed")?;

        let deleted = delete_named(client, self.object_type, &self.name)
            .await
            .with_context(|| format!("deleting {} '{}'", self.object_type, self.name))?;

        Ok(match deleted {
            Some(id) => ProcessorOutput::new(Outcome::Deleted)
                .with_object_id(id)
                .with_summary(
                    SummaryRecord::new("The following objects were deleted from Jamf Pro:")
                        .field("type", self.object_type.as_str())
                        .field("name", self.name.clone()),
                ),
            None => ProcessorOutput::new(Outcome::Absent),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_object_type_is_validated() {
        let env = Environment::new()
            .with("object_type", "printer")
            .with("object_name", "x")
            .with("object_template", "x.xml");
        assert!(matches!(
            ObjectUploader::from_env(&env),
            Err(JamfError::InvalidInput { .. })
        ));

        let patch = env.clone().with("object_type", "patch_policy");
        assert!(ObjectUploader::from_env(&patch).is_err());

        let env = env.with("object_type", "computer-group");
        assert_eq!(
            ObjectUploader::from_env(&env).unwrap().object_type,
            ObjectType::ComputerGroup
        );
    }

    #[test]
    fn test_render_body_follows_family() {
        let env = Environment::new().with("NAME", "Fish & Chips");

        let mut xml = tempfile::NamedTempFile::new().unwrap();
        write!(xml, "<computer_group><name>%NAME%</name></computer_group>").unwrap();
        match render_body(ObjectType::ComputerGroup, xml.path(), &env).unwrap() {
            RequestBody::Xml(text) => assert!(text.contains("Fish &amp; Chips")),
            other => panic!("expected XML body, got {:?}", other),
        }

        let mut json = tempfile::NamedTempFile::new().unwrap();
        write!(json, "{{\"displayName\": \"%NAME%\"}}").unwrap();
        match render_body(ObjectType::ApiRole, json.path(), &env).unwrap() {
            RequestBody::Json(value) => assert_eq!(value["displayName"], "Fish & Chips"),
            other => panic!("expected JSON body, got {:?}", other),
        }
    }
}
