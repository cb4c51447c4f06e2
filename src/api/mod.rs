//! Jamf Pro Classic and Jamf Pro API access
//!
//! Token handling, request dispatch, retries and name lookups. Everything
//! above this layer talks to a Jamf server through [`JamfClient`].

pub mod auth;
pub mod client;
pub mod constants;
pub mod endpoints;
pub mod models;
pub mod resilience;
pub mod resolver;

pub use auth::AuthManager;
pub use client::JamfClient;
pub use endpoints::{ApiFamily, ObjectType};
pub use models::{
    ApiRequest, ApiResponse, AuthMode, ConnectionSettings, Credentials, FileUpload, RequestBody,
    ResponseBody, TokenInfo,
};
pub use resilience::{RetryConfig, RetryPolicy, StatusPredicate, Verdict};
