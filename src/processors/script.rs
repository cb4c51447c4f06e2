use super::{
    Decision, Processor, ProcessorContext, ProcessorOutput, SummaryRecord, category_id, file_name_of,
    upsert_object,
};
use crate::api::endpoints::ObjectType;
use crate::api::models::RequestBody;
use crate::api::resilience::retry;
use crate::api::resolver;
use crate::environment::Environment;
use crate::error::{JamfError, Result};
use crate::template;
use anyhow::Context;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::path::PathBuf;

const PRIORITIES: [&str; 3] = ["BEFORE", "AFTER", "AT_REBOOT"];

/// Uploads a script and its metadata through the Jamf Pro API
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptUploader {
    pub path: PathBuf,
    pub name: String,
    pub category: Option<String>,
    pub priority: String,
    pub info: String,
    pub notes: String,
    pub os_requirements: String,
    /// `parameter4` through `parameter11`, in order
    pub parameters: Vec<(String, String)>,
    pub replace: bool,
}

impl ScriptUploader {
    pub fn from_env(env: &Environment) -> Result<Self> {
        let path = env.require_path("script_path")?;
        let name = match env.string("script_name") {
            Some(name) => name,
            None => file_name_of(&path).ok_or_else(|| JamfError::MissingInput("script_name".into()))?,
        };

        let priority = env.string_or("script_priority", "AFTER").to_ascii_uppercase();
        if !PRIORITIES.contains(&priority.as_str()) {
            return Err(JamfError::invalid(
                "script_priority",
                format!("'{}' is not one of {}", priority, PRIORITIES.join(", ")),
            ));
        }

        let parameters = (4..=11)
            .filter_map(|n| {
                env.string(&format!("script_parameter{}", n))
                    .map(|value| (format!("parameter{}", n), value))
            })
            .collect();

        Ok(Self {
            path,
            name,
            category: env.string("script_category"),
            priority,
            info: env.string_or("script_info", ""),
            notes: env.string_or("script_notes", ""),
            os_requirements: env.string_or("script_os_requirements", ""),
            parameters,
            replace: env.flag("replace_script"),
        })
    }

    pub fn body(&self, contents: String, category_id: &str) -> Value {
        let mut body = Map::new();
        body.insert("name".into(), Value::String(self.name.clone()));
        body.insert("info".into(), Value::String(self.info.clone()));
        body.insert("notes".into(), Value::String(self.notes.clone()));
        body.insert("priority".into(), Value::String(self.priority.clone()));
        body.insert("categoryId".into(), Value::String(category_id.to_string()));
        body.insert("osRequirements".into(), Value::String(self.os_requirements.clone()));
        for (key, value) in &self.parameters {
            body.insert(key.clone(), Value::String(value.clone()));
        }
        body.insert("scriptContents".into(), Value::String(contents));
        Value::Object(body)
    }
}

#[async_trait]
impl Processor for ScriptUploader {
    fn name(&self) -> &'static str {
        "JamfScriptUploader"
    }

    async fn run(&self, context: &ProcessorContext) -> anyhow::Result<ProcessorOutput> {
        let client = context.jamf()?;
        client.authenticate().await.context("Jamf authentication failed")?;

        let existing = resolver::find_id(client, ObjectType::Script, &self.name, None)
            .await
            .with_context(|| format!("looking up script '{}'", self.name))?;
        let existing = match Decision::decide(existing, self.replace) {
            Decision::Keep(id) => {
                log::info!("Script '{}' already exists (id {}); not replacing", self.name, id);
                return Ok(ProcessorOutput::unchanged(id.clone())
                    .with_variable("script_id", id)
                    .with_variable("script_updated", false));
            }
            decision => decision.existing_id().map(str::to_string),
        };

        let category = category_id(client, self.category.as_deref(), "script_category").await?;
        let contents = template::render_file(&self.path, context.env(), false)
            .with_context(|| format!("reading script {}", self.path.display()))?;

        let (outcome, id) = upsert_object(
            client,
            ObjectType::Script,
            existing.as_deref(),
            RequestBody::Json(self.body(contents, &category)),
            retry::standard,
        )
        .await
        .with_context(|| format!("uploading script '{}'", self.name))?;
        log::info!("Script '{}' {} (id {})", self.name, outcome, id.as_deref().unwrap_or("unknown"));

        let summary = SummaryRecord::new("The following scripts were created or updated in Jamf Pro:")
            .field("script", self.name.clone())
            .field("path", self.path.display().to_string())
            .field("category", self.category.clone().unwrap_or_default())
            .field("priority", self.priority.clone())
            .field("os_req", self.os_requirements.clone())
            .field("info", self.info.clone())
            .field("notes", self.notes.clone());

        let mut output = ProcessorOutput::new(outcome)
            .with_variable("script_updated", true)
            .with_summary(summary);
        if let Some(id) = id {
            output = output.with_variable("script_id", id.clone()).with_object_id(id);
        }
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_defaults_to_file_name() {
        let env = Environment::new()
            .with("script_path", "/tmp/scripts/postinstall.sh")
            .with("script_parameter4", "Firefox")
            .with("script_parameter6", "--force");
        let uploader = ScriptUploader::from_env(&env).unwrap();
        assert_eq!(uploader.name, "postinstall.sh");
        assert_eq!(uploader.priority, "AFTER");
        assert_eq!(
            uploader.parameters,
            vec![
                ("parameter4".to_string(), "Firefox".to_string()),
                ("parameter6".to_string(), "--force".to_string())
            ]
        );
    }

    #[test]
    fn test_priority_is_validated() {
        let env = Environment::new()
            .with("script_path", "a.sh")
            .with("script_priority", "before");
        assert_eq!(ScriptUploader::from_env(&env).unwrap().priority, "BEFORE");

        let env = env.with("script_priority", "sometime");
        assert!(ScriptUploader::from_env(&env).is_err());
    }

    #[test]
    fn test_body_uses_category_id_and_contents() {
        let env = Environment::new().with("script_path", "a.sh");
        let body = ScriptUploader::from_env(&env)
            .unwrap()
            .body("#!/bin/sh\necho hi\n".to_string(), "-1");
        assert_eq!(body["categoryId"], "-1");
        assert_eq!(body["scriptContents"], "#!/bin/sh\necho hi\n");
        assert_eq!(body["name"], "a.sh");
        assert!(body.get("parameter4").is_none());
    }
}
