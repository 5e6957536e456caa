//! Publishes one SNS notification per upserted tender, invoked in-process by the
//! ingest worker strictly after its owning transaction commits. A publish failure is
//! logged and otherwise swallowed: the row is already durable, so notification is
//! best-effort, not part of the transactional guarantee.

use aws_config::BehaviorVersion;
use aws_sdk_sns::types::MessageAttributeValue;
use aws_sdk_sns::Client as SnsClient;
use serde::Serialize;
use tender_core::types::PublishIntent;
use tracing::{error, info};

const SUBJECT_MAX_LEN: usize = 95;
const DESCRIPTION_MAX_LEN: usize = 300;

pub struct Publisher {
    client: SnsClient,
    topic_arn: String,
}

#[derive(Debug, Serialize)]
struct NotificationBody<'a> {
    #[serde(rename = "tenderId")]
    tender_id: i64,
    title: &'a str,
    category: Option<&'a str>,
    source: &'a str,
    published_at: Option<String>,
    closing_at: Option<String>,
    url: Option<&'a str>,
    description: Option<String>,
}

impl Publisher {
    pub async fn new(topic_arn: String) -> Self {
        let aws_config = aws_config::defaults(BehaviorVersion::latest()).load().await;
        let client = SnsClient::new(&aws_config);
        Self { client, topic_arn }
    }

    /// Publishes every intent, logging and continuing past individual failures.
    /// Returns the number successfully published.
    pub async fn publish_all(&self, intents: &[PublishIntent]) -> usize {
        let mut published = 0;
        for intent in intents {
            match self.publish_one(intent).await {
                Ok(()) => published += 1,
                Err(e) => error!(
                    tender_id = intent.tender_id,
                    error = %e,
                    "failed to publish notification"
                ),
            }
        }
        published
    }

    async fn publish_one(&self, intent: &PublishIntent) -> anyhow::Result<()> {
        let category = intent
            .category
            .clone()
            .unwrap_or_else(|| intent.source.as_str().to_string())
            .to_lowercase();
        let category = if category.is_empty() { "general".to_string() } else { category };

        let subject = truncate_chars(
            &format!("New {} tender: {}", intent.category.as_deref().unwrap_or("general"), intent.title),
            SUBJECT_MAX_LEN,
        );

        let body = NotificationBody {
            tender_id: intent.tender_id,
            title: &intent.title,
            category: intent.category.as_deref(),
            source: intent.source.as_str(),
            published_at: intent.published_at.map(|dt| dt.to_rfc3339()),
            closing_at: intent.closing_at.map(|dt| dt.to_rfc3339()),
            url: intent.url.as_deref(),
            description: intent
                .description
                .as_deref()
                .map(|d| truncate_chars(d, DESCRIPTION_MAX_LEN)),
        };
        let message = serde_json::to_string(&body)?;

        self.client
            .publish()
            .topic_arn(&self.topic_arn)
            .subject(subject)
            .message(message)
            .message_attributes(
                "category",
                MessageAttributeValue::builder()
                    .data_type("String")
                    .string_value(category)
                    .build()?,
            )
            .send()
            .await?;

        info!(tender_id = intent.tender_id, "published notification");
        Ok(())
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_chars_respects_char_boundaries() {
        let s = "a".repeat(100);
        assert_eq!(truncate_chars(&s, 95).chars().count(), 95);
        assert_eq!(truncate_chars("short", 95), "short");
    }
}
