use super::{deliver, report_lines, webhook_url};
use crate::api::constants::env_keys;
use crate::environment::Environment;
use crate::error::Result;
use crate::processors::{Processor, ProcessorContext, ProcessorOutput, SummaryRecord};
use async_trait::async_trait;
use serde_json::{Map, Value, json};

pub const DEFAULT_USERNAME: &str = "AutoPkg";

#[derive(Debug, Clone, PartialEq)]
pub struct SlackNotifier {
    pub webhook_url: String,
    pub username: String,
    pub channel: Option<String>,
    pub icon_url: Option<String>,
    pub icon_emoji: Option<String>,
    pub server: Option<String>,
}

impl SlackNotifier {
    pub fn from_env(env: &Environment) -> Result<Self> {
        Ok(Self {
            webhook_url: webhook_url(env, "slack_webhook_url")?,
            username: env.string_or("slack_username", DEFAULT_USERNAME),
            channel: env.string("slack_channel"),
            icon_url: env.string("slack_icon_url"),
            icon_emoji: env.string("slack_icon_emoji"),
            server: env.string(env_keys::JSS_URL),
        })
    }

    pub fn payload(&self, reports: &[(String, SummaryRecord)]) -> Value {
        let mut text = String::new();
        if let Some(server) = &self.server {
            text.push_str(&format!("*Jamf Pro server:* {}\n", server));
        }
        for (_, record) in reports {
            text.push_str(&format!("\n*{}*\n", record.summary_text));
            for (field, value) in report_lines(record) {
                text.push_str(&format!("• {}: {}\n", field, value));
            }
        }

        let mut payload = Map::new();
        payload.insert("username".into(), json!(self.username));
        payload.insert("text".into(), json!(text.trim_end()));
        if let Some(channel) = &self.channel {
            payload.insert("channel".into(), json!(channel));
        }
        // Slack ignores icon_emoji when icon_url is present
        if let Some(icon_url) = &self.icon_url {
            payload.insert("icon_url".into(), json!(icon_url));
        } else if let Some(icon_emoji) = &self.icon_emoji {
            payload.insert("icon_emoji".into(), json!(icon_emoji));
        }
        Value::Object(payload)
    }
}

#[async_trait]
impl Processor for SlackNotifier {
    fn name(&self) -> &'static str {
        "JamfSlackNotifier"
    }

    async fn run(&self, context: &ProcessorContext) -> anyhow::Result<ProcessorOutput> {
        deliver(context, "Slack", &self.webhook_url, |reports| self.payload(reports)).await
    }
}
