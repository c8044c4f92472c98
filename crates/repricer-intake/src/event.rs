//! Raw events and their acknowledgement handles.

use crate::queue::SqsClient;
use repricer_core::{EventOutcome, EventSource};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// An unparsed event handed from an intake adapter to the orchestrator.
#[derive(Clone)]
pub struct RawEvent {
    pub source: EventSource,
    pub body: String,
    pub ack: EventAck,
    pub received_at: Instant,
}

impl RawEvent {
    pub fn from_webhook(body: String) -> Self {
        Self {
            source: EventSource::Walmart,
            body,
            ack: EventAck::None,
            received_at: Instant::now(),
        }
    }
}

/// How to settle the source message once the event reaches a terminal
/// outcome.
#[derive(Clone)]
pub enum EventAck {
    /// Queue message: delete on ack, leave for the visibility timeout on
    /// retry.
    Queue {
        client: Arc<SqsClient>,
        queue_url: String,
        receipt_handle: String,
    },
    /// Webhook events were answered 202 up front; nothing to settle.
    None,
}

impl EventAck {
    /// Report the terminal outcome to the source.
    ///
    /// Delete failures are logged and swallowed: the message redelivers and
    /// the pipeline is idempotent on (seller, sku).
    pub async fn settle(&self, outcome: &EventOutcome) {
        let EventAck::Queue {
            client,
            queue_url,
            receipt_handle,
        } = self
        else {
            return;
        };

        if outcome.should_ack() {
            if let Err(e) = client.delete_message(queue_url, receipt_handle).await {
                warn!(%queue_url, error = %e, "failed to delete message, it will redeliver");
            }
        } else {
            debug!(%queue_url, "leaving message for redelivery");
        }
    }
}
