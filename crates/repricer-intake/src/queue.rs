//! SQS client speaking the JSON wire protocol.
//!
//! Targets SQS-compatible endpoints (`X-Amz-Target: AmazonSQS.<Action>`,
//! `Content-Type: application/x-amz-json-1.0`). Requests are unsigned;
//! credentialed deployments front the endpoint with a signing proxy.

use crate::error::{IntakeError, IntakeResult};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, trace};

/// Queue client configuration.
#[derive(Debug, Clone)]
pub struct SqsConfig {
    /// Endpoint the JSON protocol requests are posted to.
    pub endpoint: String,
    /// Messages per receive call; SQS caps this at 10.
    pub batch_size: u32,
    /// Long-poll wait; SQS caps this at 20 seconds.
    pub wait_time_secs: u32,
    /// Visibility timeout granted on receive. Must exceed the worst-case
    /// event processing budget or in-flight messages get redelivered.
    pub visibility_timeout_secs: u32,
}

impl Default for SqsConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:9324".to_string(),
            batch_size: 10,
            wait_time_secs: 20,
            visibility_timeout_secs: 300,
        }
    }
}

/// One received queue message. The receipt handle is retained until the
/// orchestrator reports a terminal outcome.
#[derive(Debug, Clone)]
pub struct QueueMessage {
    pub message_id: String,
    pub receipt_handle: String,
    pub body: String,
}

#[derive(Debug, Deserialize)]
struct ReceiveMessageResponse {
    #[serde(rename = "Messages", default)]
    messages: Vec<RawMessage>,
}

#[derive(Debug, Deserialize)]
struct RawMessage {
    #[serde(rename = "MessageId", default)]
    message_id: String,
    #[serde(rename = "ReceiptHandle")]
    receipt_handle: String,
    #[serde(rename = "Body")]
    body: String,
}

/// Minimal SQS client over reqwest.
pub struct SqsClient {
    http: reqwest::Client,
    config: SqsConfig,
}

impl SqsClient {
    pub fn new(config: SqsConfig) -> IntakeResult<Self> {
        // The request timeout must outlive the long poll.
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(u64::from(config.wait_time_secs) + 10))
            .build()?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &SqsConfig {
        &self.config
    }

    async fn call(&self, action: &str, payload: serde_json::Value) -> IntakeResult<String> {
        trace!(action, "queue request");
        let response = self
            .http
            .post(&self.config.endpoint)
            .header("X-Amz-Target", format!("AmazonSQS.{action}"))
            .header("Content-Type", "application/x-amz-json-1.0")
            .body(payload.to_string())
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(IntakeError::Api {
                status: status.as_u16(),
                message: text,
            });
        }
        Ok(text)
    }

    /// Long-poll one batch of messages.
    pub async fn receive_messages(&self, queue_url: &str) -> IntakeResult<Vec<QueueMessage>> {
        let body = self
            .call(
                "ReceiveMessage",
                json!({
                    "QueueUrl": queue_url,
                    "MaxNumberOfMessages": self.config.batch_size.min(10),
                    "WaitTimeSeconds": self.config.wait_time_secs.min(20),
                    "VisibilityTimeout": self.config.visibility_timeout_secs,
                }),
            )
            .await?;

        let parsed: ReceiveMessageResponse = serde_json::from_str(&body)?;
        let messages = parsed
            .messages
            .into_iter()
            .map(|m| QueueMessage {
                message_id: m.message_id,
                receipt_handle: m.receipt_handle,
                body: m.body,
            })
            .collect::<Vec<_>>();
        debug!(queue_url, count = messages.len(), "received batch");
        Ok(messages)
    }

    /// Delete a message after a terminal outcome.
    pub async fn delete_message(&self, queue_url: &str, receipt_handle: &str) -> IntakeResult<()> {
        self.call(
            "DeleteMessage",
            json!({
                "QueueUrl": queue_url,
                "ReceiptHandle": receipt_handle,
            }),
        )
        .await?;
        Ok(())
    }

    /// Adjust a message's visibility timeout (0 releases it immediately).
    pub async fn change_visibility(
        &self,
        queue_url: &str,
        receipt_handle: &str,
        visibility_timeout_secs: u32,
    ) -> IntakeResult<()> {
        self.call(
            "ChangeMessageVisibility",
            json!({
                "QueueUrl": queue_url,
                "ReceiptHandle": receipt_handle,
                "VisibilityTimeout": visibility_timeout_secs,
            }),
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_receive_response_parses() {
        let body = r#"{
            "Messages": [
                {"MessageId": "m-1", "ReceiptHandle": "rh-1", "Body": "{}"},
                {"MessageId": "m-2", "ReceiptHandle": "rh-2", "Body": "{\"a\":1}"}
            ]
        }"#;
        let parsed: ReceiveMessageResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.messages.len(), 2);
        assert_eq!(parsed.messages[0].receipt_handle, "rh-1");
    }

    #[test]
    fn test_empty_receive_response() {
        let parsed: ReceiveMessageResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.messages.is_empty());
    }

    #[test]
    fn test_config_caps_applied_at_request_time() {
        let config = SqsConfig {
            batch_size: 50,
            wait_time_secs: 90,
            ..Default::default()
        };
        assert_eq!(config.batch_size.min(10), 10);
        assert_eq!(config.wait_time_secs.min(20), 20);
    }
}
