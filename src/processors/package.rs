//! Package metadata and file upload through the Jamf Pro API
//!
//! A package is two writes: the metadata record (`api/v1/packages`) and the
//! file itself, sent to the record's `upload` endpoint. `replace_pkg`
//! re-sends both; `replace_pkg_metadata` rewrites only the record.

use super::{
    Outcome, Processor, ProcessorContext, ProcessorOutput, SummaryRecord, category_id, file_name_of,
    read_input_file, upsert_object,
};
use crate::api::client::JamfClient;
use crate::api::constants;
use crate::api::endpoints::{ApiFamily, ObjectType};
use crate::api::models::{ApiRequest, FileUpload, RequestBody};
use crate::api::resilience::retry;
use crate::api::resolver;
use crate::environment::Environment;
use crate::error::{JamfError, Result};
use anyhow::Context;
use async_trait::async_trait;
use reqwest::Method;
use serde_json::{Value, json};
use std::path::PathBuf;

pub const DEFAULT_PRIORITY: i64 = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct PackageUploader {
    pub path: PathBuf,
    pub file_name: String,
    pub name: String,
    pub category: Option<String>,
    pub info: String,
    pub notes: String,
    pub priority: i64,
    pub reboot_required: bool,
    pub replace: bool,
    pub replace_metadata: bool,
}

/// Which writes a run performs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackagePlan {
    CreateAndUpload,
    ReplaceAndUpload,
    MetadataOnly,
    Skip,
}

impl PackagePlan {
    pub fn decide(exists: bool, replace: bool, replace_metadata: bool) -> Self {
        match (exists, replace, replace_metadata) {
            (false, _, _) => PackagePlan::CreateAndUpload,
            (true, true, _) => PackagePlan::ReplaceAndUpload,
            (true, false, true) => PackagePlan::MetadataOnly,
            (true, false, false) => PackagePlan::Skip,
        }
    }

    fn uploads_file(&self) -> bool {
        matches!(self, PackagePlan::CreateAndUpload | PackagePlan::ReplaceAndUpload)
    }
}

impl PackageUploader {
    pub fn from_env(env: &Environment) -> Result<Self> {
        let path = env.require_path("pkg_path")?;
        if !path.is_file() {
            return Err(JamfError::invalid("pkg_path", format!("{} is not a file", path.display())));
        }
        let file_name =
            file_name_of(&path).ok_or_else(|| JamfError::invalid("pkg_path", "path has no file name"))?;
        let name = env.string("pkg_name").unwrap_or_else(|| file_name.clone());

        Ok(Self {
            path,
            file_name,
            name,
            category: env.string("pkg_category"),
            info: env.string_or("pkg_info", ""),
            notes: env.string_or("pkg_notes", ""),
            priority: env.integer("pkg_priority", DEFAULT_PRIORITY)?,
            reboot_required: env.flag("pkg_reboot_required"),
            replace: env.flag("replace_pkg"),
            replace_metadata: env.flag("replace_pkg_metadata"),
        })
    }

    pub fn metadata(&self, category_id: &str) -> Value {
        json!({
            "packageName": self.name,
            "fileName": self.file_name,
            "categoryId": category_id,
            "info": self.info,
            "notes": self.notes,
            "priority": self.priority,
            "rebootRequired": self.reboot_required,
            "fillUserTemplate": false,
            "fillExistingUsers": false,
            "osInstall": false,
            "suppressUpdates": false,
            "suppressFromDock": false,
            "suppressEula": false,
            "suppressRegistration": false,
        })
    }

    async fn upload_file(&self, client: &JamfClient, package_id: &str) -> Result<()> {
        let bytes = read_input_file(&self.path)?;
        log::info!("Uploading {} ({} bytes) to package {}", self.file_name, bytes.len(), package_id);
        let request = ApiRequest::new(Method::POST, constants::package_upload_path(package_id), ApiFamily::JamfPro)
            .with_body(RequestBody::File(FileUpload::new("file", self.file_name.clone(), bytes)));
        client.upload(&request, retry::standard).await?;
        Ok(())
    }
}

#[async_trait]
impl Processor for PackageUploader {
    fn name(&self) -> &'static str {
        "JamfPackageUploader"
    }

    async fn run(&self, context: &ProcessorContext) -> anyhow::Result<ProcessorOutput> {
        let client = context.jamf()?;
        client.authenticate().await.context("Jamf authentication failed")?;

        let existing = resolver::find_id(client, ObjectType::Package, &self.name, None)
            .await
            .with_context(|| format!("looking up package '{}'", self.name))?;
        let plan = PackagePlan::decide(existing.is_some(), self.replace, self.replace_metadata);
        log::debug!("Package '{}' plan: {:?}", self.name, plan);

        if let (PackagePlan::Skip, Some(id)) = (plan, &existing) {
            log::info!("Package '{}' already exists (id {}); not replacing", self.name, id);
            return Ok(ProcessorOutput::unchanged(id.clone())
                .with_variable("pkg_id", id.clone())
                .with_variable("pkg_uploaded", false)
                .with_variable("pkg_metadata_updated", false)
                .with_variable("pkg_updated", false));
        }

        let category = category_id(client, self.category.as_deref(), "pkg_category").await?;
        let (outcome, id) = upsert_object(
            client,
            ObjectType::Package,
            existing.as_deref(),
            RequestBody::Json(self.metadata(&category)),
            retry::standard,
        )
        .await
        .with_context(|| format!("writing metadata for package '{}'", self.name))?;
        let id = id.ok_or_else(|| JamfError::UnexpectedResponse("package record has no id".into()))?;

        if plan.uploads_file() {
            self.upload_file(client, &id)
                .await
                .with_context(|| format!("uploading {}", self.path.display()))?;
        }
        log::info!("Package '{}' {} (id {})", self.name, outcome, id);

        let summary = SummaryRecord::new("The following packages were uploaded to or updated in Jamf Pro:")
            .field("pkg_name", self.name.clone())
            .field("pkg_path", self.path.display().to_string())
            .field("category", self.category.clone().unwrap_or_default())
            .field("pkg_status", if plan.uploads_file() { "uploaded" } else { "metadata updated" });

        Ok(ProcessorOutput::new(outcome)
            .with_object_id(id.clone())
            .with_variable("pkg_id", id)
            .with_variable("pkg_uploaded", plan.uploads_file())
            .with_variable("pkg_metadata_updated", true)
            .with_variable("pkg_updated", true)
            .with_summary(summary))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_table() {
        assert_eq!(PackagePlan::decide(false, false, false), PackagePlan::CreateAndUpload);
        assert_eq!(PackagePlan::decide(true, true, false), PackagePlan::ReplaceAndUpload);
        assert_eq!(PackagePlan::decide(true, false, true), PackagePlan::MetadataOnly);
        assert_eq!(PackagePlan::decide(true, false, false), PackagePlan::Skip);
    }

    #[test]
    fn test_missing_package_file_is_rejected_before_connecting() {
        let dir = tempfile::tempdir().unwrap();
        let env = Environment::new()
            .with("pkg_path", dir.path().join("Firefox-128.0.pkg").display().to_string());
        match PackageUploader::from_env(&env) {
            Err(JamfError::InvalidInput { key, .. }) => assert_eq!(key, "pkg_path"),
            other => panic!("expected InvalidInput, got {:?}", other),
        }

        // a directory is not a package either
        let env = Environment::new().with("pkg_path", dir.path().display().to_string());
        assert!(PackageUploader::from_env(&env).is_err());
    }

    #[test]
    fn test_metadata_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let pkg = dir.path().join("Firefox-128.0.pkg");
        std::fs::write(&pkg, b"xar!").unwrap();
        let env = Environment::new().with("pkg_path", pkg.display().to_string());
        let uploader = PackageUploader::from_env(&env).unwrap();
        assert_eq!(uploader.name, "Firefox-128.0.pkg");

        let metadata = uploader.metadata("-1");
        assert_eq!(metadata["fileName"], "Firefox-128.0.pkg");
        assert_eq!(metadata["priority"], 10);
        assert_eq!(metadata["rebootRequired"], false);
        assert_eq!(metadata["categoryId"], "-1");
    }
}
