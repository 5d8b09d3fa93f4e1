//! Synchronous publish/subscribe fan-out for world events.

use lane_defence_core::Event;

/// Receives every event the session publishes.
pub trait Subscriber {
    /// Called once per event, at the point of emission.
    fn on_event(&mut self, event: &Event);
}

impl<F> Subscriber for F
where
    F: FnMut(&Event),
{
    fn on_event(&mut self, event: &Event) {
        self(event);
    }
}

/// Token returned by [`EventBus::subscribe`] used to unsubscribe later.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Retrieves the numeric representation of the token.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

/// Ordered registry of subscribers.
#[derive(Default)]
pub struct EventBus {
    subscribers: Vec<(SubscriberId, Box<dyn Subscriber>)>,
    next_id: u64,
}

impl EventBus {
    /// Registers a subscriber behind every subscriber registered before it.
    pub fn subscribe(&mut self, subscriber: Box<dyn Subscriber>) -> SubscriberId {
        let id = SubscriberId(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        self.subscribers.push((id, subscriber));
        id
    }

    /// Removes a subscriber, handing it back if it was registered.
    pub fn unsubscribe(&mut self, id: SubscriberId) -> Option<Box<dyn Subscriber>> {
        let index = self
            .subscribers
            .iter()
            .position(|(candidate, _)| *candidate == id)?;
        Some(self.subscribers.remove(index).1)
    }

    /// Number of registered subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    /// Reports whether no subscriber is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    /// Delivers each event to every subscriber in registration order.
    pub fn publish(&mut self, events: &[Event]) {
        for event in events {
            for (_, subscriber) in &mut self.subscribers {
                subscriber.on_event(event);
            }
        }
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscribers.len())
            .field("next_id", &self.next_id)
            .finish()
    }
}
