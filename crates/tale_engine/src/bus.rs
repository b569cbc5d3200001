use tale_core::BusEvent;
use tale_logging::{tale_debug, tale_trace, tale_warn};
use tokio::sync::broadcast;

pub const DEFAULT_EVENT_BUFFER: usize = 256;

/// In-process broadcast of server notifications.
///
/// The host feeds decoded notifications in with [`EventBus::publish`] or
/// [`EventBus::publish_raw`]; every live subscription sees each event once.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<BusEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER)
    }
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Returns how many subscriptions received the event.
    pub fn publish(&self, event: BusEvent) -> usize {
        tale_trace!("bus event {}", event.kind());
        self.sender.send(event).unwrap_or(0)
    }

    /// Decodes a `{"type", "data"}` envelope and publishes it.
    pub fn publish_raw(&self, raw: &str) -> Result<usize, serde_json::Error> {
        let event = BusEvent::from_json(raw).inspect_err(|err| {
            tale_warn!("dropping undecodable notification: {err}");
        })?;
        Ok(self.publish(event))
    }

    pub fn subscribe(&self) -> EventSubscription {
        tale_debug!("bus subscriber added");
        EventSubscription {
            receiver: self.sender.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// A live subscription; dropping it unsubscribes.
#[derive(Debug)]
pub struct EventSubscription {
    receiver: broadcast::Receiver<BusEvent>,
}

impl EventSubscription {
    /// Next event, or `None` once every bus handle is gone.
    pub async fn recv(&mut self) -> Option<BusEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tale_warn!("bus subscriber lagged; {skipped} events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

impl Drop for EventSubscription {
    fn drop(&mut self) {
        tale_debug!("bus subscriber removed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn dropped_subscription_stops_receiving() {
        let bus = EventBus::new(8);
        let sub = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);
        drop(sub);
        assert_eq!(bus.subscriber_count(), 0);
        assert_eq!(bus.publish(BusEvent::Other { kind: "ping".into() }), 0);
    }

    #[tokio::test]
    async fn raw_envelopes_reach_subscribers() {
        let bus = EventBus::default();
        let mut sub = bus.subscribe();
        let delivered = bus
            .publish_raw(r#"{"type":"job_status","data":{"_id":"j1","status":2}}"#)
            .unwrap();
        assert_eq!(delivered, 1);
        let event = sub.recv().await.unwrap();
        assert_eq!(event.kind(), tale_core::JOB_STATUS_EVENT);
    }
}
