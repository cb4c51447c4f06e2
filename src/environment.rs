//! Processor input environment
//!
//! An [`Environment`] is the key/value mapping a processor reads its inputs
//! from. It is never mutated by a processor: outputs come back as a
//! [`ProcessorOutput`] and are merged into a new environment by the caller.

use crate::error::{JamfError, Result};
use crate::processors::{ProcessorOutput, SummaryRecord};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Suffix of the key a processor's summary is stored under
pub const SUMMARY_SUFFIX: &str = "_summary_result";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Environment(BTreeMap<String, Value>);

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, returns a new environment
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Overlay every entry of `entries` on top of this environment
    pub fn overlay<I, K>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        for (key, value) in entries {
            self.0.insert(key.into(), value);
        }
        self
    }

    /// New environment containing this one plus a processor's outputs.
    /// A run without a summary drops the one an earlier run left behind.
    pub fn merged(&self, processor_name: &str, output: &ProcessorOutput) -> Self {
        let mut next = self.clone();
        for (key, value) in &output.variables {
            next.0.insert(key.clone(), value.clone());
        }
        let key = summary_key(processor_name);
        match output.summary.as_ref().map(serde_json::to_value) {
            Some(Ok(value)) => {
                next.0.insert(key, value);
            }
            _ => {
                next.0.remove(&key);
            }
        }
        next
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// String form of a value; `None` for absent, null or blank strings
    pub fn string(&self, key: &str) -> Option<String> {
        self.get(key)
            .and_then(value_to_string)
            .filter(|s| !s.trim().is_empty())
    }

    pub fn string_or(&self, key: &str, default: &str) -> String {
        self.string(key).unwrap_or_else(|| default.to_string())
    }

    pub fn require(&self, key: &str) -> Result<String> {
        self.string(key)
            .ok_or_else(|| JamfError::MissingInput(key.to_string()))
    }

    pub fn require_path(&self, key: &str) -> Result<PathBuf> {
        self.require(key).map(PathBuf::from)
    }

    pub fn path(&self, key: &str) -> Option<PathBuf> {
        self.string(key).map(PathBuf::from)
    }

    /// Boolean input; accepts real booleans as well as "True"/"yes"/"1" strings
    pub fn flag(&self, key: &str) -> bool {
        self.flag_or(key, false)
    }

    pub fn flag_or(&self, key: &str, default: bool) -> bool {
        match self.get(key) {
            None | Some(Value::Null) => default,
            Some(Value::Bool(b)) => *b,
            Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
            Some(Value::String(s)) if s.trim().is_empty() => default,
            Some(Value::String(s)) => parse_bool(s),
            Some(_) => default,
        }
    }

    pub fn integer(&self, key: &str, default: i64) -> Result<i64> {
        match self.get(key) {
            None | Some(Value::Null) => Ok(default),
            Some(Value::Number(n)) => n
                .as_i64()
                .ok_or_else(|| JamfError::invalid(key, format!("'{}' is not an integer", n))),
            Some(Value::String(s)) if s.trim().is_empty() => Ok(default),
            Some(Value::String(s)) => s
                .trim()
                .parse::<i64>()
                .map_err(|_| JamfError::invalid(key, format!("'{}' is not an integer", s))),
            Some(other) => Err(JamfError::invalid(key, format!("'{}' is not an integer", other))),
        }
    }

    /// List input; accepts a JSON array or a comma separated string
    pub fn list(&self, key: &str) -> Vec<String> {
        match self.get(key) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(value_to_string)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            Some(value) => value_to_string(value)
                .map(|s| {
                    s.split(',')
                        .map(|part| part.trim().to_string())
                        .filter(|part| !part.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            None => Vec::new(),
        }
    }

    /// Every summary record stored in this environment, ordered by key
    pub fn summaries(&self) -> Vec<(String, SummaryRecord)> {
        self.0
            .iter()
            .filter(|(key, _)| key.ends_with(SUMMARY_SUFFIX))
            .filter_map(|(key, value)| {
                serde_json::from_value::<SummaryRecord>(value.clone())
                    .ok()
                    .map(|record| (key.clone(), record))
            })
            .collect()
    }

    /// Load a JSON or TOML file of variables; the extension picks the format
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| JamfError::file(path, e))?;
        let is_toml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

        if is_toml {
            let map: BTreeMap<String, Value> = toml::from_str(&text).map_err(|e| {
                JamfError::invalid(path.display().to_string(), e.to_string())
            })?;
            Ok(Self(map))
        } else {
            let map: BTreeMap<String, Value> = serde_json::from_str(&text)?;
            Ok(Self(map))
        }
    }
}

impl From<BTreeMap<String, Value>> for Environment {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Environment {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

pub fn summary_key(processor_name: &str) -> String {
    format!("{}{}", processor_name.to_lowercase(), SUMMARY_SUFFIX)
}

/// Render a scalar value the way it is substituted into payloads.
/// Booleans are capitalised (`True`/`False`) as recipe templates expect.
pub fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(true) => Some("True".to_string()),
        Value::Bool(false) => Some("False".to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

fn parse_bool(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "true" | "yes" | "y" | "1" | "on"
    )
}

/// Parse `KEY=VALUE` as given on the command line
pub fn parse_assignment(raw: &str) -> Result<(String, Value)> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| JamfError::invalid(raw, "expected KEY=VALUE"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(JamfError::invalid(raw, "empty key"));
    }
    Ok((key.to_string(), Value::String(value.to_string())))
}
