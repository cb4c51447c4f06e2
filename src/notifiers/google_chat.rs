use super::{deliver, report_lines, webhook_url};
use crate::api::constants::env_keys;
use crate::environment::Environment;
use crate::error::Result;
use crate::processors::{Processor, ProcessorContext, ProcessorOutput, SummaryRecord};
use async_trait::async_trait;
use serde_json::{Value, json};

/// Posts a card message to a Google Chat space webhook
#[derive(Debug, Clone, PartialEq)]
pub struct GoogleChatNotifier {
    pub webhook_url: String,
    pub server: Option<String>,
}

impl GoogleChatNotifier {
    pub fn from_env(env: &Environment) -> Result<Self> {
        Ok(Self {
            webhook_url: webhook_url(env, "gchat_webhook_url")?,
            server: env.string(env_keys::JSS_URL),
        })
    }

    pub fn payload(&self, reports: &[(String, SummaryRecord)]) -> Value {
        let sections: Vec<Value> = reports
            .iter()
            .map(|(_, record)| {
                let widgets: Vec<Value> = report_lines(record)
                    .into_iter()
                    .map(|(label, value)| json!({"decoratedText": {"topLabel": label, "text": value}}))
                    .collect();
                json!({"header": record.summary_text, "widgets": widgets})
            })
            .collect();

        let mut header = json!({"title": "Jamf Pro upload summary"});
        if let Some(server) = &self.server {
            header["subtitle"] = json!(server);
        }

        json!({
            "cardsV2": [{
                "cardId": "jamf-uploader-summary",
                "card": {
                    "header": header,
                    "sections": sections,
                }
            }]
        })
    }
}

#[async_trait]
impl Processor for GoogleChatNotifier {
    fn name(&self) -> &'static str {
        "JamfGoogleChatNotifier"
    }

    async fn run(&self, context: &ProcessorContext) -> anyhow::Result<ProcessorOutput> {
        deliver(context, "Google Chat", &self.webhook_url, |reports| self.payload(reports)).await
    }
}
