//! Change notifications
//!
//! Observers subscribe to an [`EventBus`] and receive [`Event`]s in the order
//! the model was mutated. Events only say *what* changed; the data itself is
//! read from the shared loader.

use std::path::PathBuf;
use tokio::sync::broadcast;
use tracing::{trace, warn};

use crate::constants::events::CHANNEL_CAPACITY;

/// Something observable changed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Devices were (re)discovered; previous sensor handles are gone
    HwmonsChanged,
    /// A polling tick refreshed sensor values
    SensorsUpdated { tick: u64, changed: usize },
    /// Polling interval in seconds
    IntervalChanged(i64),
    /// Error string; empty when healthy
    ErrorChanged(String),
    ConfigPathChanged(Option<PathBuf>),
    /// The rendered configuration text was regenerated
    ConfigFileChanged,
    ConfigSaved(PathBuf),
    /// A service request finished on its worker thread
    ServiceFinished {
        method: String,
        outcome: Result<String, String>,
    },
    /// The polling loop will not tick again
    LoopStopped,
}

/// Publish side of the notification channel
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<Event>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Deliver to every current subscriber. Having none is not an error.
    pub fn publish(&self, event: Event) {
        trace!(?event, "Publishing event");
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> Subscription {
        Subscription {
            rx: self.tx.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// Receive side handle; dropping it unsubscribes
#[derive(Debug)]
pub struct Subscription {
    rx: broadcast::Receiver<Event>,
}

impl Subscription {
    /// Wait for the next event; `None` once every bus handle is gone
    pub async fn recv(&mut self) -> Option<Event> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("Subscriber lagged {} events", n);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Next already-queued event, if any
    pub fn try_recv(&mut self) -> Option<Event> {
        loop {
            match self.rx.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    warn!("Subscriber lagged {} events", n);
                }
                Err(_) => return None,
            }
        }
    }

    /// Every queued event, oldest first
    pub fn drain(&mut self) -> Vec<Event> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_arrive_in_publish_order() {
        let bus = EventBus::new();
        let mut sub = bus.subscribe();
        bus.publish(Event::IntervalChanged(5));
        bus.publish(Event::ConfigFileChanged);
        bus.publish(Event::ErrorChanged(String::new()));

        assert_eq!(
            sub.drain(),
            vec![
                Event::IntervalChanged(5),
                Event::ConfigFileChanged,
                Event::ErrorChanged(String::new())
            ]
        );
        assert!(sub.try_recv().is_none());
    }

    #[test]
    fn test_publish_without_subscribers() {
        let bus = EventBus::new();
        bus.publish(Event::HwmonsChanged);
        let mut late = bus.subscribe();
        assert!(late.try_recv().is_none());
        assert_eq!(bus.subscriber_count(), 1);
        drop(late);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_recv_ends_when_bus_dropped() {
        let bus = EventBus::new();
        let mut sub = bus.subscribe();
        bus.publish(Event::LoopStopped);
        drop(bus);
        assert_eq!(sub.recv().await, Some(Event::LoopStopped));
        assert_eq!(sub.recv().await, None);
    }
}
