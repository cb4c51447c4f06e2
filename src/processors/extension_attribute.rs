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
use quick_xml::escape::escape;
use std::path::PathBuf;

const DATA_TYPES: [&str; 3] = ["String", "Integer", "Date"];

/// Uploads a script-backed computer extension attribute
#[derive(Debug, Clone, PartialEq)]
pub struct ExtensionAttributeUploader {
    pub name: String,
    pub script_path: PathBuf,
    pub description: String,
    pub data_type: String,
    pub inventory_display: String,
    pub enabled: bool,
    pub replace: bool,
}

impl ExtensionAttributeUploader {
    pub fn from_env(env: &Environment) -> Result<Self> {
        let data_type = env.string_or("ea_data_type", "String");
        let data_type = DATA_TYPES
            .iter()
            .find(|t| t.eq_ignore_ascii_case(&data_type))
            .ok_or_else(|| {
                JamfError::invalid("ea_data_type", format!("'{}' is not one of {}", data_type, DATA_TYPES.join(", ")))
            })?
            .to_string();

        Ok(Self {
            name: env.require("ea_name")?,
            script_path: env.require_path("ea_script_path")?,
            description: env.string_or("ea_description", ""),
            data_type,
            inventory_display: env.string_or("ea_inventory_display", "Extension Attributes"),
            enabled: env.flag_or("ea_enabled", true),
            replace: env.flag("replace_ea"),
        })
    }

    /// Classic XML document for this attribute
    pub fn to_xml(&self, script: &str) -> String {
        format!(
            "<computer_extension_attribute>\
             <name>{name}</name>\
             <enabled>{enabled}</enabled>\
             <description>{description}</description>\
             <data_type>{data_type}</data_type>\
             <input_type><type>script</type><platform>Mac</platform><script>{script}</script></input_type>\
             <inventory_display>{display}</inventory_display>\
             </computer_extension_attribute>",
            name = escape(self.name.as_str()),
            enabled = self.enabled,
            description = escape(self.description.as_str()),
            data_type = self.data_type,
            script = escape(script),
            display = escape(self.inventory_display.as_str()),
        )
    }
}

#[async_trait]
impl Processor for ExtensionAttributeUploader {
    fn name(&self) -> &'static str {
        "JamfExtensionAttributeUploader"
    }

    async fn run(&self, context: &ProcessorContext) -> anyhow::Result<ProcessorOutput> {
        let client = context.jamf()?;
        client.authenticate().await.context("Jamf authentication failed")?;

        let object_type = ObjectType::ComputerExtensionAttribute;
        let existing = resolver::find_id(client, object_type, &self.name, None)
            .await
            .with_context(|| format!("looking up extension attribute '{}'", self.name))?;
        let existing = match Decision::decide(existing, self.replace) {
            Decision::Keep(id) => {
                log::info!("Extension attribute '{}' already exists (id {}); not replacing", self.name, id);
                return Ok(ProcessorOutput::unchanged(id.clone())
                    .with_variable("ea_id", id)
                    .with_variable("ea_updated", false));
            }
            decision => decision.existing_id().map(str::to_string),
        };

        let script = template::render_file(&self.script_path, context.env(), false)
            .with_context(|| format!("reading {}", self.script_path.display()))?;

        let (outcome, id) = upsert_object(
            client,
            object_type,
            existing.as_deref(),
            RequestBody::Xml(self.to_xml(&script)),
            retry::standard,
        )
        .await
        .with_context(|| format!("uploading extension attribute '{}'", self.name))?;
        log::info!("Extension attribute '{}' {}", self.name, outcome);

        let summary = SummaryRecord::new("The following extension attributes were created or updated in Jamf Pro:")
            .field("name", self.name.clone())
            .field("path", self.script_path.display().to_string());

        let mut output = ProcessorOutput::new(outcome)
            .with_variable("ea_updated", true)
            .with_summary(summary);
        if let Some(id) = id {
            output = output.with_variable("ea_id", id.clone()).with_object_id(id);
        }
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uploader() -> ExtensionAttributeUploader {
        let env = Environment::new()
            .with("ea_name", "Firefox Version")
            .with("ea_script_path", "ea.sh");
        ExtensionAttributeUploader::from_env(&env).unwrap()
    }

    #[test]
    fn test_defaults() {
        let ea = uploader();
        assert_eq!(ea.data_type, "String");
        assert_eq!(ea.inventory_display, "Extension Attributes");
        assert!(ea.enabled);
    }

    #[test]
    fn test_xml_escapes_script_and_parses() {
        let xml = uploader().to_xml("#!/bin/sh\n[ -d /Applications ] && echo \"<result>yes</result>\"\n");
        let doc = roxmltree::Document::parse(&xml).unwrap();
        let script = doc
            .descendants()
            .find(|n| n.has_tag_name("script"))
            .and_then(|n| n.text())
            .unwrap();
        assert!(script.contains("&& echo \"<result>yes</result>\""));
        assert!(xml.contains("<enabled>true</enabled>"));
    }

    #[test]
    fn test_data_type_is_normalised() {
        let env = Environment::new()
            .with("ea_name", "x")
            .with("ea_script_path", "x.sh")
            .with("ea_data_type", "integer");
        assert_eq!(ExtensionAttributeUploader::from_env(&env).unwrap().data_type, "Integer");

        let env = env.with("ea_data_type", "float");
        assert!(ExtensionAttributeUploader::from_env(&env).is_err());
    }
}
