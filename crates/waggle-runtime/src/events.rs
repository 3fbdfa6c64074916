//! Best-effort broadcast of [`EngineEvent`]s.
//!
//! Built on [`tokio::sync::broadcast`]: every subscriber sees every event and
//! a slow subscriber only loses its own backlog.  Publishing never fails;
//! with nobody listening the event is simply dropped.

use tokio::sync::broadcast;
use tracing::trace;
use waggle_types::{EngineEvent, EngineEventKind};

/// Number of buffered events before old ones are dropped for slow
/// subscribers.
pub const DEFAULT_CAPACITY: usize = 256;

/// Shared event bus.  Clones share the same channel.
#[derive(Clone, Debug)]
pub struct EventBus {
    sender: broadcast::Sender<EngineEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish `event`; returns how many subscribers received it.
    pub fn publish(&self, event: EngineEvent) -> usize {
        match self.sender.send(event) {
            Ok(n) => n,
            Err(broadcast::error::SendError(event)) => {
                trace!(kind = ?event.kind, "no event subscribers");
                0
            }
        }
    }

    /// Convenience: wrap `kind` in an [`EngineEvent`] from `source`.
    pub fn emit(&self, source: &str, kind: EngineEventKind) -> usize {
        self.publish(EngineEvent::new(source, kind))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.sender.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_without_subscribers_is_not_an_error() {
        let bus = EventBus::default();
        let n = bus.emit("test", EngineEventKind::RequestFailed { details: "x".into() });
        assert_eq!(n, 0);
    }

    #[tokio::test]
    async fn every_subscriber_sees_the_event() {
        let bus = EventBus::new(8);
        let mut a = bus.subscribe();
        let mut b = bus.clone().subscribe();
        assert_eq!(
            bus.emit(
                "waggle-runtime::test",
                EngineEventKind::DecisionRejected {
                    details: "bad".into()
                }
            ),
            2
        );
        for rx in [&mut a, &mut b] {
            let event = rx.recv().await.unwrap();
            assert_eq!(event.source, "waggle-runtime::test");
            assert!(matches!(event.kind, EngineEventKind::DecisionRejected { .. }));
        }
    }
}
