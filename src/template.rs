//! `%KEY%` placeholder substitution for XML and JSON payload templates

use crate::environment::{value_to_string, Environment};
use crate::error::{JamfError, Result};
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;
use std::path::Path;

/// Nested substitutions are resolved for at most this many passes
pub const MAX_PASSES: usize = 5;

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"%(\w+)%").expect("placeholder pattern is valid"));

/// Result of rendering, including keys that had no replacement
#[derive(Debug, Clone, PartialEq)]
pub struct Rendered {
    pub text: String,
    pub unresolved: Vec<String>,
}

/// Substitute placeholders, logging a warning for every unresolvable key
pub fn render(template: &str, env: &Environment, xml_escape: bool) -> String {
    render_detailed(template, env, xml_escape).text
}

pub fn render_detailed(template: &str, env: &Environment, xml_escape: bool) -> Rendered {
    let mut text = template.to_string();
    let mut unresolved: BTreeSet<String> = BTreeSet::new();

    for pass in 1..=MAX_PASSES {
        let keys: BTreeSet<String> = PLACEHOLDER
            .captures_iter(&text)
            .map(|cap| cap[1].to_string())
            .filter(|key| !unresolved.contains(key))
            .collect();

        if keys.is_empty() {
            break;
        }
        debug!("Template pass {}: {} placeholder(s)", pass, keys.len());

        for key in keys {
            match env.get(&key).and_then(value_to_string) {
                Some(value) => {
                    let replacement = if xml_escape {
                        quick_xml::escape::escape(value.as_str()).into_owned()
                    } else {
                        value
                    };
                    text = text.replace(&format!("%{}%", key), &replacement);
                }
                None => {
                    warn!("Template placeholder '%{}%' has no replacement value", key);
                    unresolved.insert(key);
                }
            }
        }
    }

    Rendered {
        text,
        unresolved: unresolved.into_iter().collect(),
    }
}

/// Read a template from disk and render it
pub fn render_file(path: &Path, env: &Environment, xml_escape: bool) -> Result<String> {
    let template = std::fs::read_to_string(path).map_err(|e| JamfError::file(path, e))?;
    Ok(render(&template, env, xml_escape))
}

/// Render a JSON template and parse the result
pub fn render_json_file(path: &Path, env: &Environment) -> Result<serde_json::Value> {
    let rendered = render_file(path, env, false)?;
    serde_json::from_str(&rendered).map_err(|e| {
        JamfError::Template(format!("{} is not valid JSON after substitution: {}", path.display(), e))
    })
}

/// Render an XML template and check that it is well formed
pub fn render_xml_file(path: &Path, env: &Environment) -> Result<String> {
    let rendered = render_file(path, env, true)?;
    roxmltree::Document::parse(&rendered).map_err(|e| {
        JamfError::Template(format!("{} is not well-formed XML after substitution: {}", path.display(), e))
    })?;
    Ok(rendered)
}
