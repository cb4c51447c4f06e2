use super::constants::env_keys;
use super::endpoints::ApiFamily;
use crate::environment::Environment;
use crate::error::{AuthError, JamfError, Result};
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

/// Credentials supplied for one run
#[derive(Clone, PartialEq)]
pub enum Credentials {
    ClientCredentials {
        client_id: String,
        client_secret: String,
    },
    UsernamePassword {
        username: String,
        password: String,
    },
    /// Pre-issued bearer token; cannot be refreshed
    Token(String),
}

impl Credentials {
    /// Pick the credential pair to use: client credentials first, then
    /// username/password, then a supplied token
    pub fn resolve(
        username: Option<String>,
        password: Option<String>,
        client_id: Option<String>,
        client_secret: Option<String>,
        token: Option<String>,
    ) -> std::result::Result<Self, AuthError> {
        if let (Some(client_id), Some(client_secret)) = (client_id, client_secret) {
            return Ok(Credentials::ClientCredentials {
                client_id,
                client_secret,
            });
        }
        if let (Some(username), Some(password)) = (username, password) {
            return Ok(Credentials::UsernamePassword { username, password });
        }
        token.map(Credentials::Token).ok_or(AuthError::NoCredentials)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Credentials::ClientCredentials { .. } => "client credentials",
            Credentials::UsernamePassword { .. } => "username/password",
            Credentials::Token(_) => "bearer token",
        }
    }
}

// Secrets stay out of debug logs
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::ClientCredentials { client_id, .. } => f
                .debug_struct("ClientCredentials")
                .field("client_id", client_id)
                .finish_non_exhaustive(),
            Credentials::UsernamePassword { username, .. } => f
                .debug_struct("UsernamePassword")
                .field("username", username)
                .finish_non_exhaustive(),
            Credentials::Token(_) => f.write_str("Token(..)"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMode {
    /// Exchange credentials for a bearer token
    #[default]
    Bearer,
    /// Send username/password as HTTP Basic on every request
    Basic,
}

/// Cached token information
#[derive(Debug, Clone, PartialEq)]
pub struct TokenInfo {
    pub access_token: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl TokenInfo {
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| at <= Utc::now())
    }
}

/// Where and how to connect
#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    pub base_url: String,
    pub credentials: Credentials,
    pub auth_mode: AuthMode,
    pub timeout: Duration,
}

impl ConnectionSettings {
    pub fn new(base_url: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
            auth_mode: AuthMode::Bearer,
            timeout: Duration::from_secs(300),
        }
    }

    pub fn with_auth_mode(mut self, auth_mode: AuthMode) -> Self {
        self.auth_mode = auth_mode;
        self
    }

    /// Read `JSS_URL` and the credential keys from a processor environment
    pub fn from_env(env: &Environment) -> Result<Self> {
        let base_url = env.require(env_keys::JSS_URL)?;
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(JamfError::invalid(
                env_keys::JSS_URL,
                format!("'{}' is not an http(s) URL", base_url),
            ));
        }

        let credentials = Credentials::resolve(
            env.string(env_keys::API_USERNAME),
            env.string(env_keys::API_PASSWORD),
            env.string(env_keys::CLIENT_ID),
            env.string(env_keys::CLIENT_SECRET),
            env.string(env_keys::BEARER_TOKEN),
        )?;

        let auth_mode = if env.flag(env_keys::BASIC_AUTH) {
            if !matches!(credentials, Credentials::UsernamePassword { .. }) {
                return Err(AuthError::BasicRequiresPassword.into());
            }
            AuthMode::Basic
        } else {
            AuthMode::Bearer
        };

        Ok(Self::new(base_url, credentials).with_auth_mode(auth_mode))
    }
}

/// File sent as a multipart form part
#[derive(Debug, Clone, PartialEq)]
pub struct FileUpload {
    pub field: String,
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl FileUpload {
    pub fn new(field: impl Into<String>, file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let mime_type = guess_mime(&file_name).to_string();
        Self {
            field: field.into(),
            file_name,
            mime_type,
            bytes,
        }
    }
}

fn guess_mime(file_name: &str) -> &'static str {
    let lower = file_name.to_ascii_lowercase();
    if lower.ends_with(".png") {
        "image/png"
    } else if lower.ends_with(".jpg") || lower.ends_with(".jpeg") {
        "image/jpeg"
    } else if lower.ends_with(".gif") {
        "image/gif"
    } else {
        "application/octet-stream"
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Xml(String),
    Json(Value),
    File(FileUpload),
}

/// One request against a Jamf endpoint
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub family: ApiFamily,
    pub body: Option<RequestBody>,
    pub accept: Option<String>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>, family: ApiFamily) -> Self {
        Self {
            method,
            path: path.into(),
            family,
            body: None,
            accept: None,
        }
    }

    pub fn get(path: impl Into<String>, family: ApiFamily) -> Self {
        Self::new(Method::GET, path, family)
    }

    pub fn delete(path: impl Into<String>, family: ApiFamily) -> Self {
        Self::new(Method::DELETE, path, family)
    }

    pub fn with_body(mut self, body: RequestBody) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_accept(mut self, accept: impl Into<String>) -> Self {
        self.accept = Some(accept.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Empty,
    Json(Value),
    Text(String),
}

/// Normalised HTTP response
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub url: String,
    pub status_code: u16,
    pub headers: HashMap<String, String>,
    pub body: ResponseBody,
}

impl ApiResponse {
    pub fn new(status_code: u16, body: ResponseBody) -> Self {
        Self {
            url: String::new(),
            status_code,
            headers: HashMap::new(),
            body,
        }
    }

    /// Read a reqwest response, decoding JSON when the family or the
    /// server's content type says so
    pub async fn read(response: reqwest::Response, prefer_json: bool) -> Result<Self> {
        let url = response.url().to_string();
        let status_code = response.status().as_u16();
        let mut headers = HashMap::new();
        for (name, value) in response.headers() {
            if let Ok(value_str) = value.to_str() {
                headers.insert(name.to_string(), value_str.to_string());
            }
        }

        let is_json = prefer_json
            || headers
                .get("content-type")
                .is_some_and(|ct| ct.contains("json"));

        let text = response.text().await?;
        let body = if text.trim().is_empty() {
            ResponseBody::Empty
        } else if is_json {
            match serde_json::from_str::<Value>(&text) {
                Ok(json) => ResponseBody::Json(json),
                Err(_) => ResponseBody::Text(text),
            }
        } else {
            ResponseBody::Text(text)
        };

        Ok(Self {
            url,
            status_code,
            headers,
            body,
        })
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    pub fn json(&self) -> Option<&Value> {
        match &self.body {
            ResponseBody::Json(value) => Some(value),
            _ => None,
        }
    }

    /// Body as text, whatever it was decoded to
    pub fn text(&self) -> String {
        match &self.body {
            ResponseBody::Empty => String::new(),
            ResponseBody::Json(value) => value.to_string(),
            ResponseBody::Text(text) => text.clone(),
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Id of the object a create/update call returned: `id` of a JSON body or
    /// the first `<id>` element of a Classic XML body
    pub fn object_id(&self) -> Option<String> {
        match &self.body {
            ResponseBody::Json(value) => value.get("id").and_then(id_to_string),
            ResponseBody::Text(text) => roxmltree::Document::parse(text).ok().and_then(|doc| {
                doc.descendants()
                    .find(|node| node.has_tag_name("id"))
                    .and_then(|node| node.text())
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty())
            }),
            ResponseBody::Empty => None,
        }
    }
}

/// Jamf ids are numbers in the Classic API and strings in the Jamf Pro API
pub fn id_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
