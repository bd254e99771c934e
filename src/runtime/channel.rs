use parking_lot::RwLock;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::{ClientSink, Event, RuntimeError};

/// Client sink backed by an unbounded channel. The transport task drains the
/// receiving half and writes to the socket.
pub struct ChannelClient {
    id: String,
    event_tx: RwLock<mpsc::UnboundedSender<Event>>,
}

impl ChannelClient {
    /// Create a client with a server-generated id and the receiving half.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Event>) {
        Self::with_id(Uuid::new_v4().to_string())
    }

    pub fn with_id(id: impl Into<String>) -> (Self, mpsc::UnboundedReceiver<Event>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let client = Self {
            id: id.into(),
            event_tx: RwLock::new(event_tx),
        };
        (client, event_rx)
    }

    /// Replace the event sender (used when a client reconnects on the same connection id)
    pub fn replace_event_tx(&self, new_tx: mpsc::UnboundedSender<Event>) {
        *self.event_tx.write() = new_tx;
    }
}

impl ClientSink for ChannelClient {
    fn send(&self, event: Event) -> Result<(), RuntimeError> {
        self.event_tx
            .read()
            .send(event)
            .map_err(|_| RuntimeError::ReceiverClosed)?;
        Ok(())
    }

    fn id(&self) -> &str {
        &self.id
    }
}

impl std::fmt::Debug for ChannelClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelClient")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::EventType;

    fn event(n: u64) -> Event {
        Event {
            event_type: EventType::Content,
            data: serde_json::json!({ "n": n }),
        }
    }

    #[test]
    fn send_delivers_in_order() {
        let (client, mut rx) = ChannelClient::new();
        client.send(event(1)).unwrap();
        client.send(event(2)).unwrap();

        assert_eq!(rx.try_recv().unwrap().data["n"], 1);
        assert_eq!(rx.try_recv().unwrap().data["n"], 2);
    }

    #[test]
    fn send_after_receiver_dropped_fails() {
        let (client, rx) = ChannelClient::new();
        drop(rx);

        let err = client.send(event(1)).unwrap_err();
        assert!(matches!(err, RuntimeError::ReceiverClosed));
    }

    #[test]
    fn replace_event_tx_redirects_delivery() {
        let (client, mut old_rx) = ChannelClient::with_id("conn-1");
        let (new_tx, mut new_rx) = mpsc::unbounded_channel();
        client.replace_event_tx(new_tx);

        client.send(event(7)).unwrap();
        assert!(old_rx.try_recv().is_err());
        assert_eq!(new_rx.try_recv().unwrap().data["n"], 7);
        assert_eq!(client.id(), "conn-1");
    }

    #[test]
    fn event_serializes_with_type_tag() {
        let json = serde_json::to_value(Event {
            event_type: EventType::WebResources,
            data: serde_json::json!({}),
        })
        .unwrap();
        assert_eq!(json["type"], "webResources");
    }
}
