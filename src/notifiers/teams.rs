use super::{deliver, report_lines, webhook_url};
use crate::api::constants::env_keys;
use crate::environment::Environment;
use crate::error::Result;
use crate::processors::{Processor, ProcessorContext, ProcessorOutput, SummaryRecord};
use async_trait::async_trait;
use serde_json::{Value, json};

/// Posts an adaptive card to a Microsoft Teams incoming webhook
#[derive(Debug, Clone, PartialEq)]
pub struct TeamsNotifier {
    pub webhook_url: String,
    pub server: Option<String>,
}

impl TeamsNotifier {
    pub fn from_env(env: &Environment) -> Result<Self> {
        Ok(Self {
            webhook_url: webhook_url(env, "teams_webhook_url")?,
            server: env.string(env_keys::JSS_URL),
        })
    }

    pub fn payload(&self, reports: &[(String, SummaryRecord)]) -> Value {
        let mut body = vec![json!({
            "type": "TextBlock",
            "text": "Jamf Pro upload summary",
            "weight": "Bolder",
            "size": "Medium",
            "wrap": true,
        })];
        if let Some(server) = &self.server {
            body.push(json!({"type": "TextBlock", "text": server, "isSubtle": true, "wrap": true}));
        }

        for (_, record) in reports {
            body.push(json!({
                "type": "TextBlock",
                "text": record.summary_text,
                "weight": "Bolder",
                "wrap": true,
            }));
            let facts: Vec<Value> = report_lines(record)
                .into_iter()
                .map(|(title, value)| json!({"title": title, "value": value}))
                .collect();
            body.push(json!({"type": "FactSet", "facts": facts}));
        }

        json!({
            "type": "message",
            "attachments": [{
                "contentType": "application/vnd.microsoft.card.adaptive",
                "contentUrl": null,
                "content": {
                    "$schema": "http://adaptivecards.io/schemas/adaptive-card.json",
                    "type": "AdaptiveCard",
                    "version": "1.4",
                    "body": body,
                }
            }]
        })
    }
}

#[async_trait]
impl Processor for TeamsNotifier {
    fn name(&self) -> &'static str {
        "JamfTeamsNotifier"
    }

    async fn run(&self, context: &ProcessorContext) -> anyhow::Result<ProcessorOutput> {
        deliver(context, "Microsoft Teams", &self.webhook_url, |reports| self.payload(reports)).await
    }
}
