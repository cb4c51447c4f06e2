//! Error types for the Jamf upload pipeline
//!
//! Library layers return [`JamfError`]; processors and the CLI wrap it in
//! `anyhow` with extra context.

use std::path::PathBuf;
use thiserror::Error;

/// Failures while turning credentials into a usable token
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AuthError {
    /// Neither a client id/secret pair, a username/password pair nor a token was supplied
    #[error("no usable credentials: supply CLIENT_ID/CLIENT_SECRET, API_USERNAME/API_PASSWORD or BEARER_TOKEN")]
    NoCredentials,

    /// Token endpoint answered with a non-success status
    #[error("token request rejected with HTTP {status}: {message}")]
    Rejected { status: u16, message: String },

    /// Token endpoint answered 2xx but without a token field
    #[error("token response malformed: {0}")]
    MalformedResponse(String),

    /// Basic auth mode needs a username and password
    #[error("basic authentication requires API_USERNAME and API_PASSWORD")]
    BasicRequiresPassword,
}

#[derive(Debug, Error)]
pub enum JamfError {
    #[error("missing required input variable '{0}'")]
    MissingInput(String),

    #[error("invalid value for '{key}': {reason}")]
    InvalidInput { key: String, reason: String },

    #[error("cannot read {}: {source}", .path.display())]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("template error: {0}")]
    Template(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("permission denied (HTTP 401) for {url}")]
    PermissionDenied { url: String },

    #[error("conflict (HTTP 409): {message}")]
    Conflict { message: String },

    #[error("upload failed after {attempts} attempts (last status: {})", status_label(.status))]
    Upload { attempts: u32, status: Option<u16> },

    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn status_label(status: &Option<u16>) -> String {
    match status {
        Some(code) => code.to_string(),
        None => "no response".to_string(),
    }
}

impl JamfError {
    pub fn invalid(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            key: key.into(),
            reason: reason.into(),
        }
    }

    pub fn file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::File {
            path: path.into(),
            source,
        }
    }

    /// Transport failures are the only errors the retry loop tries again
    pub fn is_transient(&self) -> bool {
        matches!(self, JamfError::Http(_))
    }
}

pub type Result<T> = std::result::Result<T, JamfError>;
