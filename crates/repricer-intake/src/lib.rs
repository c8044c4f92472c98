//! Intake adapters feeding the internal event stream.
//!
//! The queue adapter long-polls SQS and retains each message's receipt
//! handle until the orchestrator reports a terminal outcome; the webhook
//! adapter (in the server crate) pushes into the same stream. Adapters do
//! not parse business semantics, only transport.

pub mod consumer;
pub mod error;
pub mod event;
pub mod queue;

pub use consumer::QueueConsumer;
pub use error::{IntakeError, IntakeResult};
pub use event::{EventAck, RawEvent};
pub use queue::{QueueMessage, SqsClient, SqsConfig};
