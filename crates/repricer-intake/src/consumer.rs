//! Queue consumer loop.
//!
//! One loop per queue URL. Backpressure is the bounded internal stream:
//! when the worker pool is saturated, `send().await` blocks and polling
//! stops until capacity frees up. Receive errors back off exponentially.

use crate::event::{EventAck, RawEvent};
use crate::queue::SqsClient;
use repricer_core::EventSource;
use repricer_telemetry::metrics;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const BACKOFF_BASE: Duration = Duration::from_secs(1);
const BACKOFF_MAX: Duration = Duration::from_secs(60);

/// Spawns and owns the per-queue polling loops.
pub struct QueueConsumer {
    client: Arc<SqsClient>,
    queue_urls: Vec<String>,
    tx: mpsc::Sender<RawEvent>,
}

impl QueueConsumer {
    pub fn new(client: Arc<SqsClient>, queue_urls: Vec<String>, tx: mpsc::Sender<RawEvent>) -> Self {
        Self {
            client,
            queue_urls,
            tx,
        }
    }

    /// Spawn one polling task per configured queue.
    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> Vec<JoinHandle<()>> {
        self.queue_urls
            .iter()
            .map(|queue_url| {
                let client = Arc::clone(&self.client);
                let tx = self.tx.clone();
                let queue_url = queue_url.clone();
                let shutdown = shutdown.clone();
                tokio::spawn(poll_queue(client, queue_url, tx, shutdown))
            })
            .collect()
    }
}

async fn poll_queue(
    client: Arc<SqsClient>,
    queue_url: String,
    tx: mpsc::Sender<RawEvent>,
    mut shutdown: watch::Receiver<bool>,
) {
    info!(%queue_url, "queue consumer started");
    let mut backoff = BACKOFF_BASE;

    loop {
        if *shutdown.borrow() {
            break;
        }

        let batch = tokio::select! {
            result = client.receive_messages(&queue_url) => result,
            _ = shutdown.changed() => continue,
        };

        let messages = match batch {
            Ok(messages) => {
                backoff = BACKOFF_BASE;
                messages
            }
            Err(e) => {
                warn!(%queue_url, error = %e, backoff_secs = backoff.as_secs(), "receive failed");
                tokio::select! {
                    _ = tokio::time::sleep(backoff) => {}
                    _ = shutdown.changed() => {}
                }
                backoff = (backoff * 2).min(BACKOFF_MAX);
                continue;
            }
        };

        if messages.is_empty() {
            metrics::QUEUE_EMPTY_POLLS_TOTAL.inc();
            continue;
        }

        for message in messages {
            let event = RawEvent {
                source: EventSource::Amazon,
                body: message.body,
                ack: EventAck::Queue {
                    client: Arc::clone(&client),
                    queue_url: queue_url.clone(),
                    receipt_handle: message.receipt_handle,
                },
                received_at: Instant::now(),
            };
            // Blocks when the stream is full; that pause is the queue-side
            // backpressure.
            if tx.send(event).await.is_err() {
                debug!(%queue_url, "event stream closed, stopping consumer");
                return;
            }
        }
    }

    info!(%queue_url, "queue consumer stopped");
}
