//! Patch policy upload
//!
//! A patch policy lives under a patch software title. The title is resolved
//! first; when a version and package are given, the package is linked to that
//! version on the title before the policy itself is written.

use super::{Decision, Outcome, Processor, ProcessorContext, ProcessorOutput, SummaryRecord};
use crate::api::client::JamfClient;
use crate::api::endpoints::{ObjectType, patch_policy_create_path};
use crate::api::models::{ApiRequest, RequestBody};
use crate::api::resilience::retry;
use crate::api::resolver;
use crate::environment::Environment;
use crate::error::{JamfError, Result};
use crate::template;
use anyhow::Context;
use async_trait::async_trait;
use quick_xml::escape::escape;
use reqwest::Method;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq)]
pub struct PatchUploader {
    pub title: String,
    pub name: String,
    pub template: PathBuf,
    pub version: Option<String>,
    pub pkg_name: Option<String>,
    pub replace: bool,
}

impl PatchUploader {
    pub fn from_env(env: &Environment) -> Result<Self> {
        Ok(Self {
            title: env.require("patch_softwaretitle")?,
            name: env.require("patch_name")?,
            template: env.require_path("patch_template")?,
            version: env.string("patch_version"),
            pkg_name: env.string("pkg_name"),
            replace: env.flag("replace_patch"),
        })
    }

    /// Both a version and a package name are needed to link a package
    pub fn links_package(&self) -> bool {
        self.version.is_some() && self.pkg_name.is_some()
    }

    /// Classic document linking `package_id` to `version` on a title
    pub fn version_link_xml(version: &str, package_id: &str) -> String {
        format!(
            "<patch_software_title><versions><version>\
             <software_version>{}</software_version>\
             <package><id>{}</id></package>\
             </version></versions></patch_software_title>",
            escape(version),
            escape(package_id),
        )
    }

    async fn link_package(&self, client: &JamfClient, title_id: &str) -> Result<Option<String>> {
        let (Some(version), Some(pkg_name)) = (&self.version, &self.pkg_name) else {
            return Ok(None);
        };

        let package_id = resolver::find_id(client, ObjectType::Package, pkg_name, None)
            .await?
            .ok_or_else(|| JamfError::invalid("pkg_name", format!("package '{}' not found", pkg_name)))?;

        log::info!(
            "Linking package '{}' (id {}) to version {} of '{}'",
            pkg_name,
            package_id,
            version,
            self.title
        );
        let request = ApiRequest::new(
            Method::PUT,
            ObjectType::PatchSoftwareTitle.object_path(title_id),
            ObjectType::PatchSoftwareTitle.family(),
        )
        .with_body(RequestBody::Xml(Self::version_link_xml(version, &package_id)));
        client.upload(&request, retry::standard).await?;
        Ok(Some(package_id))
    }
}

#[async_trait]
impl Processor for PatchUploader {
    fn name(&self) -> &'static str {
        "JamfPatchUploader"
    }

    async fn run(&self, context: &ProcessorContext) -> anyhow::Result<ProcessorOutput> {
        let client = context.jamf()?;
        client.authenticate().await.context("Jamf authentication failed")?;

        let title_id = resolver::find_id(client, ObjectType::PatchSoftwareTitle, &self.title, None)
            .await
            .with_context(|| format!("looking up patch software title '{}'", self.title))?
            .ok_or_else(|| {
                JamfError::invalid(
                    "patch_softwaretitle",
                    format!("patch software title '{}' not found", self.title),
                )
            })?;

        let existing = resolver::find_id(client, ObjectType::PatchPolicy, &self.name, None)
            .await
            .with_context(|| format!("looking up patch policy '{}'", self.name))?;
        let existing = match Decision::decide(existing, self.replace) {
            Decision::Keep(id) => {
                log::info!("Patch policy '{}' already exists (id {}); not replacing", self.name, id);
                return Ok(ProcessorOutput::unchanged(id.clone())
                    .with_variable("patch_policy_id", id)
                    .with_variable("patch_softwaretitle_id", title_id)
                    .with_variable("patch_updated", false));
            }
            decision => decision.existing_id().map(str::to_string),
        };

        let package_id = self
            .link_package(client, &title_id)
            .await
            .with_context(|| format!("linking package to patch software title '{}'", self.title))?;

        let mut template_env = context.env().clone().with("patch_softwaretitle_id", title_id.clone());
        if let Some(version) = &self.version {
            template_env = template_env.with("patch_version", version.clone());
        }
        let body = template::render_xml_file(&self.template, &template_env)?;

        let (method, path, outcome) = match &existing {
            None => (Method::POST, patch_policy_create_path(&title_id), Outcome::Created),
            Some(id) => (Method::PUT, ObjectType::PatchPolicy.object_path(id), Outcome::Updated),
        };
        log::info!("{} patch policy '{}' at {}", if existing.is_some() { "Replacing" } else { "Creating" }, self.name, path);
        let request = ApiRequest::new(method, path, ObjectType::PatchPolicy.family()).with_body(RequestBody::Xml(body));
        let response = client
            .upload(&request, retry::standard)
            .await
            .with_context(|| format!("uploading patch policy '{}'", self.name))?;
        let id = response.object_id().or(existing);

        let summary = SummaryRecord::new("The following patch policies were created or updated in Jamf Pro:")
            .field("patch_title", self.title.clone())
            .field("patch_policy", self.name.clone())
            .field("patch_version", self.version.clone().unwrap_or_default())
            .field("pkg_name", if package_id.is_some() { self.pkg_name.clone().unwrap_or_default() } else { String::new() });

        let mut output = ProcessorOutput::new(outcome)
            .with_variable("patch_softwaretitle_id", title_id)
            .with_variable("patch_updated", true)
            .with_summary(summary);
        if let Some(id) = id {
            output = output.with_variable("patch_policy_id", id.clone()).with_object_id(id);
        }
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_package_link_needs_a_version() {
        let env = Environment::new()
            .with("patch_softwaretitle", "Firefox")
            .with("patch_name", "Firefox patch")
            .with("patch_template", "patch.xml")
            .with("pkg_name", "Firefox-128.0.pkg");
        let uploader = PatchUploader::from_env(&env).unwrap();
        assert!(!uploader.links_package());
        assert!(!uploader.replace);

        let uploader = PatchUploader::from_env(&env.with("patch_version", "128.0")).unwrap();
        assert!(uploader.links_package());
        assert_eq!(uploader.version.as_deref(), Some("128.0"));
    }

    #[test]
    fn test_title_and_policy_names_are_required() {
        let env = Environment::new().with("patch_name", "Firefox patch");
        assert!(matches!(
            PatchUploader::from_env(&env),
            Err(JamfError::MissingInput(key)) if key == "patch_softwaretitle"
        ));
    }

    #[test]
    fn test_version_link_document() {
        let xml = PatchUploader::version_link_xml("128.0 <esr>", "9");
        assert!(xml.contains("<software_version>128.0 &lt;esr&gt;</software_version>"));
        assert!(xml.contains("<package><id>9</id></package>"));
    }
}
