use super::auth::AuthManager;
use super::constants::{self, headers};
use super::endpoints::ApiFamily;
use super::models::{ApiRequest, ApiResponse, AuthMode, ConnectionSettings, Credentials, RequestBody};
use super::resilience::logging::{self, RequestContext};
use super::resilience::retry::{RetryConfig, RetryPolicy, StatusPredicate};
use crate::environment::Environment;
use crate::error::Result;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use std::collections::HashMap;

/// Jamf Pro client shared by every request of one processor invocation
pub struct JamfClient {
    settings: ConnectionSettings,
    http_client: reqwest::Client,
    auth: AuthManager,
    retry: RetryConfig,
}

impl JamfClient {
    pub fn new(settings: ConnectionSettings, retry: RetryConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .user_agent(constants::USER_AGENT)
            .build()?;
        Ok(Self::with_http_client(settings, retry, http_client))
    }

    /// Create a client around an already configured HTTP client
    pub fn with_http_client(
        settings: ConnectionSettings,
        retry: RetryConfig,
        http_client: reqwest::Client,
    ) -> Self {
        let auth = AuthManager::new(
            http_client.clone(),
            settings.base_url.clone(),
            settings.credentials.clone(),
        );
        Self {
            settings,
            http_client,
            auth,
            retry,
        }
    }

    pub fn from_env(env: &Environment) -> Result<Self> {
        Self::new(ConnectionSettings::from_env(env)?, RetryConfig::from_env(env))
    }

    pub fn base_url(&self) -> &str {
        &self.settings.base_url
    }

    pub fn settings(&self) -> &ConnectionSettings {
        &self.settings
    }

    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry
    }

    pub fn auth(&self) -> &AuthManager {
        &self.auth
    }

    /// Obtain a token up front so bad credentials fail before any lookup
    pub async fn authenticate(&self) -> Result<()> {
        if self.settings.auth_mode == AuthMode::Basic {
            return Ok(());
        }
        self.auth.token().await?;
        Ok(())
    }

    /// Send one request. Non-2xx statuses come back as responses; a 401 with
    /// refreshable credentials triggers one token refresh and a re-send.
    pub async fn send(&self, request: &ApiRequest) -> Result<ApiResponse> {
        let response = self.dispatch(request).await?;

        if response.status_code == 401
            && self.settings.auth_mode == AuthMode::Bearer
            && self.auth.can_refresh()
        {
            log::info!("Token rejected for {}; refreshing and re-sending once", response.url);
            self.auth.refresh().await?;
            return self.dispatch(request).await;
        }

        Ok(response)
    }

    /// `send` wrapped in the fixed-interval retry loop
    pub async fn upload(&self, request: &ApiRequest, predicate: StatusPredicate) -> Result<ApiResponse> {
        RetryPolicy::new(self.retry.clone())
            .with_predicate(predicate)
            .execute(move || self.send(request))
            .await
    }

    async fn dispatch(&self, request: &ApiRequest) -> Result<ApiResponse> {
        let url = constants::join_url(&self.settings.base_url, &request.path);
        let accept = request
            .accept
            .clone()
            .unwrap_or_else(|| request.family.media_type().to_string());

        let mut logged_headers = HashMap::new();
        logged_headers.insert(ACCEPT.to_string(), accept.clone());

        let mut builder = self
            .http_client
            .request(request.method.clone(), &url)
            .header(ACCEPT, &accept);

        builder = match (&self.settings.auth_mode, &self.settings.credentials) {
            (AuthMode::Basic, Credentials::UsernamePassword { username, password }) => {
                logged_headers.insert(AUTHORIZATION.to_string(), "Basic".to_string());
                builder.basic_auth(username, Some(password))
            }
            _ => {
                let token = self.auth.token().await?;
                logged_headers.insert(AUTHORIZATION.to_string(), "Bearer".to_string());
                builder.bearer_auth(&token.access_token)
            }
        };

        builder = match &request.body {
            Some(RequestBody::Xml(xml)) => {
                logged_headers.insert(CONTENT_TYPE.to_string(), headers::CONTENT_TYPE_XML.to_string());
                builder
                    .header(CONTENT_TYPE, headers::CONTENT_TYPE_XML)
                    .body(xml.clone())
            }
            Some(RequestBody::Json(value)) => {
                logged_headers.insert(CONTENT_TYPE.to_string(), headers::CONTENT_TYPE_JSON.to_string());
                builder
                    .header(CONTENT_TYPE, headers::CONTENT_TYPE_JSON)
                    .body(serde_json::to_vec(value)?)
            }
            Some(RequestBody::File(file)) => {
                logged_headers.insert(CONTENT_TYPE.to_string(), "multipart/form-data".to_string());
                let part = Part::bytes(file.bytes.clone())
                    .file_name(file.file_name.clone())
                    .mime_str(&file.mime_type)?;
                builder.multipart(Form::new().part(file.field.clone(), part))
            }
            None => builder,
        };

        let context = RequestContext::start(request.method.as_str(), &url);
        logging::log_request(&context, &logged_headers);

        let response = builder.send().await?;
        logging::log_response(&context, response.status().as_u16());

        let prefer_json = request.family == ApiFamily::JamfPro || accept.contains("json");
        ApiResponse::read(response, prefer_json).await
    }
}
