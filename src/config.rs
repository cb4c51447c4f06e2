use crate::api::constants::env_keys;
use crate::environment::{Environment, parse_assignment};
use anyhow::{Context, Result};
use log::{LevelFilter, debug, info};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Connection defaults for the Jamf Pro server
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub token: Option<String>,
    #[serde(default)]
    pub basic_auth: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetrySettings {
    /// Seconds between upload attempts; values under 30 are raised to 30
    pub sleep_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub retry: RetrySettings,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Seed values for every processor environment
    #[serde(default)]
    pub variables: BTreeMap<String, Value>,
}

impl Config {
    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = if cfg!(target_os = "linux") {
            dirs::config_dir()
                .context("Failed to get XDG config directory")?
                .join("jamf-uploader")
        } else {
            dirs::home_dir()
                .context("Failed to get home directory")?
                .join(".jamf-uploader")
        };
        Ok(config_dir.join("config.toml"))
    }

    /// Load `path`, or the default location when `path` is `None`. A missing
    /// default file yields an empty config; a missing explicit file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (config_path, explicit) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => (Self::get_config_path()?, false),
        };
        debug!("Loading config from: {:?}", config_path);

        if !config_path.exists() {
            if explicit {
                anyhow::bail!("Config file does not exist: {}", config_path.display());
            }
            info!("No config file at {:?}, using defaults", config_path);
            return Ok(Self::default());
        }

        let config_content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;
        Self::parse(&config_content)
            .with_context(|| format!("Failed to parse config file: {:?}", config_path))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        debug!("Loaded config with {} seed variables", config.variables.len());
        Ok(config)
    }

    /// Level from `[logging] level`, when set and valid
    pub fn log_level(&self) -> Option<LevelFilter> {
        self.logging
            .level
            .as_deref()
            .and_then(|level| level.parse::<LevelFilter>().ok())
    }

    /// Environment holding the `[variables]` table and the `[server]` and
    /// `[retry]` settings under the keys processors read
    pub fn seed_environment(&self) -> Environment {
        let mut env = Environment::new().overlay(self.variables.clone());

        let server = [
            (env_keys::JSS_URL, &self.server.url),
            (env_keys::API_USERNAME, &self.server.username),
            (env_keys::API_PASSWORD, &self.server.password),
            (env_keys::CLIENT_ID, &self.server.client_id),
            (env_keys::CLIENT_SECRET, &self.server.client_secret),
            (env_keys::BEARER_TOKEN, &self.server.token),
        ];
        for (key, value) in server {
            if let Some(value) = value {
                env = env.with(key, value.clone());
            }
        }
        if self.server.basic_auth {
            env = env.with(env_keys::BASIC_AUTH, true);
        }
        if let Some(sleep) = self.retry.sleep_secs {
            env = env.with(env_keys::SLEEP, sleep);
        }
        env
    }

    /// Full environment for one invocation. Later layers win: config file,
    /// process variables (including `.env`), `--env` files, `--set` pairs.
    pub fn build_environment(&self, env_files: &[PathBuf], assignments: &[String]) -> Result<Environment> {
        let mut env = overlay_process_env(self.seed_environment(), |key| std::env::var(key).ok());

        for path in env_files {
            let file_env = Environment::from_file(path)
                .with_context(|| format!("Failed to load variables from {}", path.display()))?;
            env = env.overlay(file_env.iter().map(|(k, v)| (k.clone(), v.clone())));
        }

        for raw in assignments {
            let (key, value) = parse_assignment(raw)?;
            env = env.with(key, value);
        }
        Ok(env)
    }
}

/// Copy connection keys found by `lookup` into `env`
pub fn overlay_process_env<F>(env: Environment, lookup: F) -> Environment
where
    F: Fn(&str) -> Option<String>,
{
    let found: Vec<(String, Value)> = env_keys::CONNECTION
        .iter()
        .filter_map(|key| {
            lookup(key)
                .filter(|value| !value.is_empty())
                .map(|value| (key.to_string(), Value::String(value)))
        })
        .collect();
    if !found.is_empty() {
        debug!("Using {} connection setting(s) from the process environment", found.len());
    }
    env.overlay(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const CONFIG: &str = r#"
[server]
url = "https://example.jamfcloud.com"
client_id = "abc"
client_secret = "def"

[retry]
sleep_secs = 45

[logging]
level = "debug"

[variables]
NAME = "Firefox"
category_priority = 5
"#;

    #[test]
    fn test_seed_environment() {
        let config = Config::parse(CONFIG).unwrap();
        let env = config.seed_environment();
        assert_eq!(env.string("JSS_URL").as_deref(), Some("https://example.jamfcloud.com"));
        assert_eq!(env.string("CLIENT_ID").as_deref(), Some("abc"));
        assert_eq!(env.string("sleep").as_deref(), Some("45"));
        assert_eq!(env.string("NAME").as_deref(), Some("Firefox"));
        assert!(!env.contains("jamf_basic_auth"));
        assert_eq!(config.log_level(), Some(LevelFilter::Debug));
    }

    #[test]
    fn test_empty_config_is_valid() {
        assert_eq!(Config::parse("").unwrap(), Config::default());
    }

    #[test]
    fn test_process_env_overrides_file() {
        let config = Config::parse(CONFIG).unwrap();
        let env = overlay_process_env(config.seed_environment(), |key| match key {
            "JSS_URL" => Some("https://other.example.com".to_string()),
            "API_USERNAME" => Some(String::new()),
            _ => None,
        });
        assert_eq!(env.string("JSS_URL").as_deref(), Some("https://other.example.com"));
        assert!(!env.contains("API_USERNAME"));
        assert_eq!(env.string("CLIENT_ID").as_deref(), Some("abc"));
    }

    #[test]
    fn test_env_files_then_assignments() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"NAME": "Chrome", "category_name": "Browsers"}}"#).unwrap();

        let config = Config::parse(CONFIG).unwrap();
        let env = config
            .build_environment(
                &[file.path().to_path_buf()],
                &["category_name=Web Browsers".to_string()],
            )
            .unwrap();
        assert_eq!(env.string("NAME").as_deref(), Some("Chrome"));
        assert_eq!(env.string("category_name").as_deref(), Some("Web Browsers"));
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::load(Some(&dir.path().join("nope.toml"))).is_err());
    }
}
