use super::{Decision, Processor, ProcessorContext, ProcessorOutput, SummaryRecord, upsert_object};
use crate::api::endpoints::ObjectType;
use crate::api::models::RequestBody;
use crate::api::resilience::retry;
use crate::api::resolver;
use crate::environment::Environment;
use crate::error::Result;
use anyhow::Context;
use async_trait::async_trait;
use serde_json::json;

pub const DEFAULT_PRIORITY: i64 = 10;

/// Creates or updates a category
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryUploader {
    pub name: String,
    pub priority: i64,
    pub replace: bool,
}

impl CategoryUploader {
    pub fn from_env(env: &Environment) -> Result<Self> {
        Ok(Self {
            name: env.require("category_name")?,
            priority: env.integer("category_priority", DEFAULT_PRIORITY)?,
            replace: env.flag("replace_category"),
        })
    }
}

#[async_trait]
impl Processor for CategoryUploader {
    fn name(&self) -> &'static str {
        "JamfCategoryUploader"
    }

    async fn run(&self, context: &ProcessorContext) -> anyhow::Result<ProcessorOutput> {
        let client = context.jamf()?;
        client.authenticate().await.context("Jamf authentication failed")?;

        let existing = resolver::find_id(client, ObjectType::Category, &self.name, None)
            .await
            .with_context(|| format!("looking up category '{}'", self.name))?;

        let existing = match Decision::decide(existing, self.replace) {
            Decision::Keep(id) => {
                log::info!("Category '{}' already exists (id {}); not replacing", self.name, id);
                return Ok(ProcessorOutput::unchanged(id.clone())
                    .with_variable("category_id", id)
                    .with_variable("category_updated", false));
            }
            decision => decision.existing_id().map(str::to_string),
        };

        let body = json!({
            "name": self.name,
            "priority": self.priority,
        });
        let (outcome, id) = upsert_object(
            client,
            ObjectType::Category,
            existing.as_deref(),
            RequestBody::Json(body),
            retry::conflict_is_done,
        )
        .await
        .with_context(|| format!("uploading category '{}'", self.name))?;

        // a 409 on create carries no id
        let id = match id {
            Some(id) => Some(id),
            None => resolver::find_id(client, ObjectType::Category, &self.name, None).await?,
        };
        log::info!("Category '{}' {} (id {})", self.name, outcome, id.as_deref().unwrap_or("unknown"));

        let summary = SummaryRecord::new("The following categories were created or updated in Jamf Pro:")
            .field("category", self.name.clone())
            .field("priority", self.priority.to_string());

        let mut output = ProcessorOutput::new(outcome)
            .with_variable("category_updated", true)
            .with_summary(summary);
        if let Some(id) = id {
            output = output.with_variable("category_id", id.clone()).with_object_id(id);
        }
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let env = Environment::new().with("category_name", "Browsers");
        let uploader = CategoryUploader::from_env(&env).unwrap();
        assert_eq!(uploader.priority, 10);
        assert!(!uploader.replace);
    }

    #[test]
    fn test_priority_must_be_numeric() {
        let env = Environment::new()
            .with("category_name", "Browsers")
            .with("category_priority", "high");
        assert!(CategoryUploader::from_env(&env).is_err());
    }
}
