// Client runtime abstraction: how events reach a connected dashboard client.
//
// The browser transport itself lives outside this crate. Anything that can
// deliver an `Event` for one connection implements `ClientSink`.

pub mod channel;

pub use channel::ChannelClient;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::module::ContentResponse;

/// Runtime-specific errors
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Event receiver closed")]
    ReceiverClosed,

    #[error("Failed to serialize event payload: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Kind tag carried by every event sent downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    #[serde(rename = "content")]
    Content,
    #[serde(rename = "webResources")]
    WebResources,
}

/// Tagged payload sent to a client. The shape of `data` depends on `event_type`
/// and is opaque to the transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub data: serde_json::Value,
}

impl Event {
    /// Wrap a generated content response (possibly empty) in a content event.
    pub fn content(response: &ContentResponse) -> Result<Self, RuntimeError> {
        Ok(Self {
            event_type: EventType::Content,
            data: serde_json::to_value(response)?,
        })
    }
}

/// Downstream half of a client connection.
///
/// # Object Safety
/// This trait is object-safe and intended to be used as `Arc<dyn ClientSink>`.
pub trait ClientSink: Send + Sync + 'static {
    /// Deliver an event to the client.
    ///
    /// # Errors
    /// Returns `RuntimeError::ReceiverClosed` when the client is gone.
    fn send(&self, event: Event) -> Result<(), RuntimeError>;

    /// Connection identifier, used to tag log records.
    fn id(&self) -> &str;
}
