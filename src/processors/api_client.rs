use super::{Decision, Outcome, Processor, ProcessorContext, ProcessorOutput, SummaryRecord};
use crate::api::client::JamfClient;
use crate::api::constants;
use crate::api::endpoints::{ApiFamily, ObjectType};
use crate::api::models::{ApiRequest, RequestBody, id_to_string};
use crate::api::resilience::retry;
use crate::api::resolver;
use crate::environment::Environment;
use crate::error::{JamfError, Result};
use anyhow::Context;
use async_trait::async_trait;
use reqwest::Method;
use serde_json::{Value, json};

pub const DEFAULT_TOKEN_LIFETIME: i64 = 1800;

/// Creates or updates an API client (integration) bound to API roles
#[derive(Debug, Clone, PartialEq)]
pub struct ApiClientUploader {
    pub name: String,
    pub role_names: Vec<String>,
    pub enabled: bool,
    pub token_lifetime: i64,
    pub generate_secret: bool,
    pub replace: bool,
}

/// Identifiers of an uploaded integration
#[derive(Debug, Clone, PartialEq)]
struct Integration {
    id: Option<String>,
    client_id: Option<String>,
}

impl Integration {
    fn from_record(record: &Value) -> Self {
        Self {
            id: record.get("id").and_then(id_to_string),
            client_id: record.get("clientId").and_then(id_to_string),
        }
    }
}

impl ApiClientUploader {
    pub fn from_env(env: &Environment) -> Result<Self> {
        let role_names = env.list("api_role_names");
        if role_names.is_empty() {
            return Err(JamfError::MissingInput("api_role_names".into()));
        }
        let token_lifetime = env.integer("access_token_lifetime", DEFAULT_TOKEN_LIFETIME)?;
        if token_lifetime <= 0 {
            return Err(JamfError::invalid("access_token_lifetime", "must be a positive number of seconds"));
        }

        Ok(Self {
            name: env.require("api_client_name")?,
            role_names,
            enabled: env.flag_or("api_client_enabled", true),
            token_lifetime,
            generate_secret: env.flag("api_client_generate_secret"),
            replace: env.flag("replace_api_client"),
        })
    }

    pub fn body(&self) -> Value {
        json!({
            "authorizationScopes": self.role_names,
            "displayName": self.name,
            "enabled": self.enabled,
            "accessTokenLifetimeSeconds": self.token_lifetime,
        })
    }

    async fn write(&self, client: &JamfClient, existing: Option<&str>) -> Result<(Outcome, Integration)> {
        let object_type = ObjectType::ApiClient;
        let (method, path, outcome) = match existing {
            None => (Method::POST, object_type.create_path(), Outcome::Created),
            Some(id) => (Method::PUT, object_type.object_path(id), Outcome::Updated),
        };
        let request = ApiRequest::new(method, path, ApiFamily::JamfPro).with_body(RequestBody::Json(self.body()));
        let response = client.upload(&request, retry::standard).await?;

        let mut integration = response
            .json()
            .map(Integration::from_record)
            .unwrap_or(Integration { id: None, client_id: None });
        if integration.id.is_none() {
            integration.id = existing.map(str::to_string);
        }
        Ok((outcome, integration))
    }

    /// Ask Jamf Pro to issue a new client secret for the integration
    async fn rotate_secret(&self, client: &JamfClient, integration_id: &str) -> Result<String> {
        let request = ApiRequest::new(
            Method::POST,
            constants::api_client_credentials_path(integration_id),
            ApiFamily::JamfPro,
        );
        let response = client.upload(&request, retry::standard).await?;
        response
            .json()
            .and_then(|body| body.get("clientSecret"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| JamfError::UnexpectedResponse("client credentials response had no clientSecret".into()))
    }
}

#[async_trait]
impl Processor for ApiClientUploader {
    fn name(&self) -> &'static str {
        "JamfAPIClientUploader"
    }

    async fn run(&self, context: &ProcessorContext) -> anyhow::Result<ProcessorOutput> {
        let client = context.jamf()?;
        client.authenticate().await.context("Jamf authentication failed")?;

        let record = resolver::find_object(client, ObjectType::ApiClient, &self.name, None)
            .await
            .with_context(|| format!("looking up API client '{}'", self.name))?;
        let found = record.as_ref().map(Integration::from_record);

        let existing_id = found.as_ref().and_then(|i| i.id.clone());
        let (outcome, integration) = match Decision::decide(existing_id, self.replace) {
            Decision::Keep(id) => {
                log::info!("API client '{}' already exists (id {}); not replacing", self.name, id);
                let client_id = found.and_then(|i| i.client_id);
                (Outcome::Unchanged, Integration { id: Some(id), client_id })
            }
            decision => {
                let existing = decision.existing_id().map(str::to_string);
                self.write(client, existing.as_deref())
                    .await
                    .with_context(|| format!("uploading API client '{}'", self.name))?
            }
        };

        let mut output = ProcessorOutput::new(outcome)
            .with_variable("api_client_updated", outcome != Outcome::Unchanged);
        if let Some(id) = &integration.id {
            output = output.with_object_id(id.clone()).with_variable("api_integration_id", id.clone());
        }
        if let Some(client_id) = integration.client_id.as_ref().or(integration.id.as_ref()) {
            output = output.with_variable("api_client_id", client_id.clone());
        }

        let mut secret_generated = false;
        if self.generate_secret {
            let id = integration
                .id
                .as_deref()
                .ok_or_else(|| JamfError::UnexpectedResponse("API client has no id".into()))?;
            let secret = self
                .rotate_secret(client, id)
                .await
                .with_context(|| format!("generating a client secret for '{}'", self.name))?;
            log::info!("Generated new client secret for API client '{}'", self.name);
            output = output.with_variable("api_client_secret", secret);
            secret_generated = true;
        }

        if outcome != Outcome::Unchanged || secret_generated {
            output = output.with_summary(
                SummaryRecord::new("The following API clients were created or updated in Jamf Pro:")
                    .field("api_client_name", self.name.clone())
                    .field("api_role_names", self.role_names.join(", "))
                    .field("enabled", self.enabled.to_string())
                    .field("access_token_lifetime", self.token_lifetime.to_string()),
            );
        }
        Ok(output)
    }
}
