//! Listener registry bridging transport events to application callbacks.
//!
//! Subscriptions are handles, not entries in a shared map: `on()` returns
//! a token, and `remove_all()` unregisters exactly what this dispatcher
//! registered. Routing is by [`EventKind`], the closed discriminant of
//! [`ServerEvent`] — there is no string-keyed dispatch to typo.

use matchwire_proto::{EventKind, ServerEvent};

/// Token identifying one registered callback.
pub type SubscriptionId = u64;

/// Callback invoked with each matching inbound event.
pub type EventCallback = Box<dyn FnMut(&ServerEvent) + Send>;

struct Registration {
    id: SubscriptionId,
    kind: EventKind,
    once: bool,
    callback: EventCallback,
}

/// Listener registry for inbound transport events.
///
/// Delivery order is registration order. Callbacks receive the event by
/// reference; anything they need beyond the call must be cloned out.
#[derive(Default)]
pub struct EventDispatcher {
    next_id: SubscriptionId,
    registrations: Vec<Registration>,
}

impl EventDispatcher {
    /// Create an empty dispatcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback for an event kind.
    pub fn on(
        &mut self,
        kind: EventKind,
        callback: impl FnMut(&ServerEvent) + Send + 'static,
    ) -> SubscriptionId {
        self.register(kind, false, Box::new(callback))
    }

    /// Register a callback that is removed after its first delivery.
    pub fn once(
        &mut self,
        kind: EventKind,
        callback: impl FnMut(&ServerEvent) + Send + 'static,
    ) -> SubscriptionId {
        self.register(kind, true, Box::new(callback))
    }

    /// Remove one subscription by token. Returns whether it existed.
    pub fn off(&mut self, id: SubscriptionId) -> bool {
        let before = self.registrations.len();
        self.registrations.retain(|r| r.id != id);
        self.registrations.len() != before
    }

    /// Remove every subscription for an event kind. Returns how many.
    pub fn off_event(&mut self, kind: EventKind) -> usize {
        let before = self.registrations.len();
        self.registrations.retain(|r| r.kind != kind);
        before - self.registrations.len()
    }

    /// Remove every subscription this dispatcher holds.
    pub fn remove_all(&mut self) {
        self.registrations.clear();
    }

    /// Number of live subscriptions.
    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    /// Whether no subscriptions are registered.
    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// Deliver an event to every matching callback, in registration
    /// order. Returns the number of callbacks invoked.
    pub fn dispatch(&mut self, event: &ServerEvent) -> usize {
        let kind = event.kind();
        let mut delivered = 0;

        for registration in &mut self.registrations {
            if registration.kind == kind {
                (registration.callback)(event);
                delivered += 1;
            }
        }

        self.registrations.retain(|r| !(r.once && r.kind == kind));

        delivered
    }

    fn register(
        &mut self,
        kind: EventKind,
        once: bool,
        callback: EventCallback,
    ) -> SubscriptionId {
        let id = self.next_id;
        self.next_id += 1;
        self.registrations.push(Registration { id, kind, once, callback });
        id
    }
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("subscriptions", &self.registrations.len())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use super::*;

    fn typing_event() -> ServerEvent {
        ServerEvent::UserTyping { user_id: "u1".into(), is_typing: true }
    }

    fn counter() -> (Arc<AtomicUsize>, impl FnMut(&ServerEvent) + Send + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let clone = Arc::clone(&count);
        (count, move |_: &ServerEvent| {
            clone.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn dispatch_reaches_matching_listeners() {
        let mut dispatcher = EventDispatcher::new();
        let (count, callback) = counter();
        dispatcher.on(EventKind::UserTyping, callback);

        assert_eq!(dispatcher.dispatch(&typing_event()), 1);
        assert_eq!(dispatcher.dispatch(&typing_event()), 1);
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn dispatch_skips_other_kinds() {
        let mut dispatcher = EventDispatcher::new();
        let (count, callback) = counter();
        dispatcher.on(EventKind::NewMessage, callback);

        assert_eq!(dispatcher.dispatch(&typing_event()), 0);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn off_removes_exactly_one_subscription() {
        let mut dispatcher = EventDispatcher::new();
        let (count_a, cb_a) = counter();
        let (count_b, cb_b) = counter();

        let id_a = dispatcher.on(EventKind::UserTyping, cb_a);
        dispatcher.on(EventKind::UserTyping, cb_b);

        assert!(dispatcher.off(id_a));
        assert!(!dispatcher.off(id_a));

        dispatcher.dispatch(&typing_event());
        assert_eq!(count_a.load(Ordering::SeqCst), 0);
        assert_eq!(count_b.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn off_event_removes_all_for_that_kind() {
        let mut dispatcher = EventDispatcher::new();
        let (_, cb_a) = counter();
        let (_, cb_b) = counter();
        let (count_other, cb_other) = counter();

        dispatcher.on(EventKind::UserTyping, cb_a);
        dispatcher.on(EventKind::UserTyping, cb_b);
        dispatcher.on(EventKind::NewMessage, cb_other);

        assert_eq!(dispatcher.off_event(EventKind::UserTyping), 2);
        assert_eq!(dispatcher.len(), 1);

        dispatcher.dispatch(&typing_event());
        assert_eq!(count_other.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn once_fires_a_single_time() {
        let mut dispatcher = EventDispatcher::new();
        let (count, callback) = counter();
        dispatcher.once(EventKind::UserTyping, callback);

        assert_eq!(dispatcher.dispatch(&typing_event()), 1);
        assert_eq!(dispatcher.dispatch(&typing_event()), 0);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(dispatcher.is_empty());
    }

    #[test]
    fn once_for_a_different_kind_survives_dispatch() {
        let mut dispatcher = EventDispatcher::new();
        let (_, callback) = counter();
        dispatcher.once(EventKind::NewMessage, callback);

        dispatcher.dispatch(&typing_event());
        assert_eq!(dispatcher.len(), 1);
    }

    #[test]
    fn remove_all_leaves_nothing_behind() {
        let mut dispatcher = EventDispatcher::new();
        let (count, callback) = counter();
        let (_, cb_b) = counter();

        dispatcher.on(EventKind::UserTyping, callback);
        dispatcher.once(EventKind::NewMessage, cb_b);

        dispatcher.remove_all();
        assert!(dispatcher.is_empty());

        dispatcher.dispatch(&typing_event());
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn delivery_order_is_registration_order() {
        let mut dispatcher = EventDispatcher::new();
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));

        for tag in ["first", "second", "third"] {
            let order = Arc::clone(&order);
            dispatcher.on(EventKind::UserTyping, move |_| {
                if let Ok(mut seen) = order.lock() {
                    seen.push(tag);
                }
            });
        }

        dispatcher.dispatch(&typing_event());
        assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
    }
}
