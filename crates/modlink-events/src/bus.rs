//! Event bus for broadcasting catalog changes to subscribers.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, trace, warn};

use modlink_core::ModuleId;

use crate::event::ModuleEvent;

/// Default channel capacity for the event bus.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Event bus for broadcasting [`ModuleEvent`]s to all subscribers.
///
/// Events are delivered asynchronously and in publication order. A
/// subscriber that falls more than `capacity` events behind loses the
/// oldest ones; the loss is logged on its next receive.
#[derive(Debug, Clone)]
pub struct ModuleEventBus {
    sender: broadcast::Sender<Arc<ModuleEvent>>,
    capacity: usize,
}

impl ModuleEventBus {
    /// Create a new event bus with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a new event bus with specified capacity.
    ///
    /// A capacity of zero is raised to one.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, _) = broadcast::channel(capacity);
        Self { sender, capacity }
    }

    /// Publish an event to all subscribers.
    ///
    /// Returns the number of receivers that received the event.
    pub fn publish(&self, event: ModuleEvent) -> usize {
        let event = Arc::new(event);
        trace!(
            event_type = event.event_type(),
            module_id = %event.module_id(),
            "Publishing module event"
        );

        if let Ok(count) = self.sender.send(Arc::clone(&event)) {
            debug!(
                event_type = event.event_type(),
                receiver_count = count,
                "Module event published"
            );
            count
        } else {
            trace!(event_type = event.event_type(), "No receivers for module event");
            0
        }
    }

    /// Subscribe to all events.
    #[must_use]
    pub fn subscribe(&self) -> EventReceiver {
        EventReceiver::new(self.sender.subscribe(), None)
    }

    /// Subscribe to events about a single module.
    #[must_use]
    pub fn subscribe_module(&self, module_id: ModuleId) -> EventReceiver {
        EventReceiver::new(self.sender.subscribe(), Some(module_id))
    }

    /// Get the current number of active receivers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Get the channel capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for ModuleEventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiver for events from the [`ModuleEventBus`].
pub struct EventReceiver {
    receiver: broadcast::Receiver<Arc<ModuleEvent>>,
    /// If set, events about other modules are skipped.
    module_filter: Option<ModuleId>,
}

impl EventReceiver {
    pub(crate) fn new(
        receiver: broadcast::Receiver<Arc<ModuleEvent>>,
        module_filter: Option<ModuleId>,
    ) -> Self {
        Self {
            receiver,
            module_filter,
        }
    }

    fn matches(&self, event: &ModuleEvent) -> bool {
        self.module_filter
            .as_ref()
            .is_none_or(|id| event.module_id() == id)
    }

    /// Receive the next event.
    ///
    /// Returns `None` once every sender has been dropped. Lagging is logged
    /// and skipped over, not surfaced.
    pub async fn recv(&mut self) -> Option<Arc<ModuleEvent>> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => {
                    if self.matches(&event) {
                        return Some(event);
                    }
                },
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    warn!(skipped = count, "Module event receiver lagged, events dropped");
                },
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Try to receive the next event without waiting.
    ///
    /// Returns `None` if no event is available or the channel is closed.
    pub fn try_recv(&mut self) -> Option<Arc<ModuleEvent>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.matches(&event) {
                        return Some(event);
                    }
                },
                Err(broadcast::error::TryRecvError::Lagged(count)) => {
                    warn!(skipped = count, "Module event receiver lagged, events dropped");
                },
                Err(
                    broadcast::error::TryRecvError::Empty | broadcast::error::TryRecvError::Closed,
                ) => return None,
            }
        }
    }
}

impl std::fmt::Debug for EventReceiver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventReceiver")
            .field("module_filter", &self.module_filter)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventMetadata;
    use modlink_core::ModuleInfo;

    fn installed(id: &str) -> ModuleEvent {
        ModuleEvent::Installed {
            metadata: EventMetadata::new("test"),
            module: ModuleInfo::new(ModuleId::from_static(id), "1.0.0"),
        }
    }

    #[tokio::test]
    async fn test_event_bus_creation() {
        let bus = ModuleEventBus::new();
        assert_eq!(bus.capacity(), DEFAULT_CHANNEL_CAPACITY);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_zero_capacity_is_raised() {
        let bus = ModuleEventBus::with_capacity(0);
        assert_eq!(bus.capacity(), 1);
    }

    #[tokio::test]
    async fn test_publish_and_receive() {
        let bus = ModuleEventBus::new();
        let mut receiver = bus.subscribe();

        assert_eq!(bus.publish(installed("home")), 1);

        let event = receiver.recv().await.unwrap();
        assert_eq!(event.event_type(), "module_installed");
        assert_eq!(event.module_id().as_str(), "home");
    }

    #[tokio::test]
    async fn test_no_subscribers() {
        let bus = ModuleEventBus::new();
        assert_eq!(bus.publish(installed("home")), 0);
    }

    #[tokio::test]
    async fn test_module_filter_skips_other_modules() {
        let bus = ModuleEventBus::new();
        let mut receiver = bus.subscribe_module(ModuleId::from_static("settings"));

        bus.publish(installed("home"));
        bus.publish(installed("settings"));

        let event = receiver.recv().await.unwrap();
        assert_eq!(event.module_id().as_str(), "settings");
        assert!(receiver.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_events_arrive_in_order() {
        let bus = ModuleEventBus::new();
        let mut receiver = bus.subscribe();

        bus.publish(installed("a"));
        bus.publish(installed("b"));
        bus.publish(installed("c"));

        let mut seen = Vec::new();
        while let Some(event) = receiver.try_recv() {
            seen.push(event.module_id().to_string());
        }
        assert_eq!(seen, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_recv_returns_none_when_bus_dropped() {
        let bus = ModuleEventBus::new();
        let mut receiver = bus.subscribe();
        drop(bus);
        assert!(receiver.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_lagged_receiver_keeps_newest() {
        let bus = ModuleEventBus::with_capacity(2);
        let mut receiver = bus.subscribe();

        bus.publish(installed("a"));
        bus.publish(installed("b"));
        bus.publish(installed("c"));

        let event = receiver.try_recv().unwrap();
        assert_eq!(event.module_id().as_str(), "b");
    }
}
