//! Sequential processor chains loaded from TOML
//!
//! ```toml
//! [input]
//! NAME = "Firefox"
//!
//! [[process]]
//! processor = "JamfCategoryUploader"
//! [process.arguments]
//! category_name = "Browsers"
//! ```
//!
//! Each step sees the recipe input, every earlier step's arguments and
//! outputs, and its own arguments. String arguments are rendered against
//! that environment first, so `%NAME%` style references work.

use crate::api::resilience::retry::RetryConfig;
use crate::environment::Environment;
use crate::processors::{ProcessorContext, ProcessorKind, ProcessorOutput};
use crate::template;
use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub input: BTreeMap<String, Value>,
    #[serde(default)]
    pub process: Vec<RecipeStep>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeStep {
    pub processor: String,
    #[serde(default)]
    pub arguments: BTreeMap<String, Value>,
}

/// One executed step
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepResult {
    pub processor: ProcessorKind,
    pub output: ProcessorOutput,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecipeRun {
    pub steps: Vec<StepResult>,
    pub env: Environment,
}

impl Recipe {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read recipe: {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Failed to parse recipe: {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let recipe: Recipe = toml::from_str(content)?;
        // reject unknown processors before anything runs
        for (index, step) in recipe.process.iter().enumerate() {
            step.kind()
                .with_context(|| format!("step {} of recipe", index + 1))?;
        }
        Ok(recipe)
    }
}

impl RecipeStep {
    pub fn kind(&self) -> Result<ProcessorKind> {
        Ok(self.processor.parse::<ProcessorKind>()?)
    }

    /// Step arguments with string values rendered against `env`
    fn rendered_arguments(&self, env: &Environment) -> Vec<(String, Value)> {
        self.arguments
            .iter()
            .map(|(key, value)| {
                let value = match value {
                    Value::String(text) => Value::String(template::render(text, env, false)),
                    other => other.clone(),
                };
                (key.clone(), value)
            })
            .collect()
    }
}

/// Run every step of `recipe` in order, stopping at the first failure
pub async fn run_recipe(recipe: &Recipe, base: Environment, retry: Option<RetryConfig>) -> Result<RecipeRun> {
    let mut env = base.overlay(recipe.input.clone());
    let mut steps = Vec::with_capacity(recipe.process.len());

    for (index, step) in recipe.process.iter().enumerate() {
        let kind = step.kind()?;
        info!("Step {}/{}: {}", index + 1, recipe.process.len(), kind);

        let step_env = env.clone().overlay(step.rendered_arguments(&env));
        let processor = kind
            .build(&step_env)
            .with_context(|| format!("{} has invalid input", kind))?;

        let mut context = ProcessorContext::new(step_env.clone());
        if let Some(retry) = &retry {
            context = context.with_retry(retry.clone());
        }

        let output = processor
            .run(&context)
            .await
            .with_context(|| format!("{} failed", kind))?;
        debug!("{} finished: {}", kind, output.outcome);

        env = step_env.merged(processor.name(), &output);
        steps.push(StepResult {
            processor: kind,
            output,
        });
    }

    Ok(RecipeRun { steps, env })
}

#[cfg(test)]
mod tests {
    use super::*;

    const RECIPE: &str = r#"
description = "Firefox"

[input]
NAME = "Firefox"

[[process]]
processor = "JamfCategoryUploader"
[process.arguments]
category_name = "Browsers"

[[process]]
processor = "policy-uploader"
[process.arguments]
policy_name = "Install %NAME%"
policy_template = "Policy.xml"
"#;

    #[test]
    fn test_parse_recipe() {
        let recipe = Recipe::parse(RECIPE).unwrap();
        assert_eq!(recipe.input["NAME"], "Firefox");
        assert_eq!(recipe.process.len(), 2);
        assert_eq!(recipe.process[1].kind().unwrap(), ProcessorKind::JamfPolicyUploader);
    }

    #[test]
    fn test_unknown_processor_is_rejected() {
        let err = Recipe::parse("[[process]]\nprocessor = \"JamfPatchUploader\"\n").unwrap_err();
        assert!(format!("{:#}", err).contains("JamfPatchUploader"));
    }

    #[test]
    fn test_arguments_are_rendered() {
        let recipe = Recipe::parse(RECIPE).unwrap();
        let env = Environment::new().with("NAME", "Firefox");
        let args: BTreeMap<_, _> = recipe.process[1].rendered_arguments(&env).into_iter().collect();
        assert_eq!(args["policy_name"], "Install Firefox");
    }

    #[tokio::test]
    async fn test_failing_step_stops_the_run() {
        // missing category_name fails validation before any network access
        let recipe = Recipe::parse("[[process]]\nprocessor = \"JamfCategoryUploader\"\n").unwrap();
        let err = run_recipe(&recipe, Environment::new(), None).await.unwrap_err();
        assert!(format!("{:#}", err).contains("category_name"));
    }
}
