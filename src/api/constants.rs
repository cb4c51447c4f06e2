//! API constants for the Jamf Pro Classic and Jamf Pro APIs

/// Path prefix of every Classic API resource
pub const CLASSIC_PREFIX: &str = "JSSResource";

/// Bearer token exchange with HTTP Basic credentials
pub const TOKEN_ENDPOINT: &str = "api/v1/auth/token";

/// OAuth2 client-credentials exchange
pub const OAUTH_TOKEN_ENDPOINT: &str = "api/oauth/token";

/// Page size used by Jamf Pro API listing lookups
pub const LOOKUP_PAGE_SIZE: u32 = 1000;

pub const USER_AGENT: &str = concat!("jamf-uploader/", env!("CARGO_PKG_VERSION"));

/// Standard media types
pub mod headers {
    pub const CONTENT_TYPE_JSON: &str = "application/json";
    pub const CONTENT_TYPE_XML: &str = "application/xml";
}

/// Environment keys understood by every Jamf processor
pub mod env_keys {
    pub const JSS_URL: &str = "JSS_URL";
    pub const API_USERNAME: &str = "API_USERNAME";
    pub const API_PASSWORD: &str = "API_PASSWORD";
    pub const CLIENT_ID: &str = "CLIENT_ID";
    pub const CLIENT_SECRET: &str = "CLIENT_SECRET";
    pub const BEARER_TOKEN: &str = "BEARER_TOKEN";
    pub const BASIC_AUTH: &str = "jamf_basic_auth";
    pub const SLEEP: &str = "sleep";

    /// Keys copied from the process environment when present
    pub const CONNECTION: [&str; 6] = [
        JSS_URL,
        API_USERNAME,
        API_PASSWORD,
        CLIENT_ID,
        CLIENT_SECRET,
        BEARER_TOKEN,
    ];
}

/// Join a server URL and a relative API path
pub fn join_url(base_url: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Classic endpoint for attaching a file (icon) to a policy
pub fn policy_icon_upload_path(policy_id: &str) -> String {
    format!("{}/fileuploads/policies/id/{}", CLASSIC_PREFIX, policy_id)
}

/// Jamf Pro endpoint receiving a package's file contents
pub fn package_upload_path(package_id: &str) -> String {
    format!("api/v1/packages/{}/upload", package_id)
}

/// Jamf Pro endpoint that issues a new client secret for an API client
pub fn api_client_credentials_path(client_id: &str) -> String {
    format!("api/v1/api-integrations/{}/client-credentials", client_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_url_normalises_slashes() {
        assert_eq!(
            join_url("https://example.jamfcloud.com/", "/api/v1/categories"),
            "https://example.jamfcloud.com/api/v1/categories"
        );
        assert_eq!(
            join_url("https://example.jamfcloud.com", "JSSResource/policies"),
            "https://example.jamfcloud.com/JSSResource/policies"
        );
    }

    #[test]
    fn test_join_url_keeps_absolute_paths() {
        assert_eq!(
            join_url("https://a.example", "https://b.example/x"),
            "https://b.example/x"
        );
    }
}
