//! Ordered subscriber registries for the notification bus.
//!
//! A [`Subscribers`] is one notification channel: handlers run in
//! subscription order and detach via the [`SubscriptionId`] returned
//! at registration. Handlers must not subscribe to or publish on the
//! channel currently invoking them; the registry lock is held for the
//! whole dispatch.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tracing::trace;

/// Handle returned by [`Subscribers::subscribe`], used to detach the
/// handler again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

static NEXT_SUBSCRIPTION: AtomicU64 = AtomicU64::new(1);

impl SubscriptionId {
    fn next() -> Self {
        SubscriptionId(NEXT_SUBSCRIPTION.fetch_add(1, Ordering::Relaxed))
    }
}

type Handler<T> = Box<dyn FnMut(&T) + Send>;

/// One notification channel: an ordered list of boxed handlers.
pub struct Subscribers<T> {
    entries: Mutex<Vec<(SubscriptionId, Handler<T>)>>,
}

impl<T> Subscribers<T> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Register a handler. Handlers run in subscription order.
    pub fn subscribe<F>(&self, handler: F) -> SubscriptionId
    where
        F: FnMut(&T) + Send + 'static,
    {
        let id = SubscriptionId::next();
        self.entries.lock().push((id, Box::new(handler)));
        id
    }

    /// Detach a handler. Returns whether it was registered here.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|(entry_id, _)| *entry_id != id);
        entries.len() != before
    }

    /// Invoke every handler with `payload`, in subscription order.
    pub fn emit(&self, payload: &T) {
        let mut entries = self.entries.lock();
        trace!(handlers = entries.len(), "dispatching notification");
        for (_, handler) in entries.iter_mut() {
            handler(payload);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl<T> Default for Subscribers<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_handlers_run_in_subscription_order() {
        let channel: Subscribers<u32> = Subscribers::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second", "third"] {
            let seen = seen.clone();
            channel.subscribe(move |value: &u32| {
                seen.lock().push((tag, *value));
            });
        }

        channel.emit(&7);
        assert_eq!(
            *seen.lock(),
            vec![("first", 7), ("second", 7), ("third", 7)]
        );
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let channel: Subscribers<u32> = Subscribers::new();
        let count = Arc::new(Mutex::new(0));

        let counter = count.clone();
        let id = channel.subscribe(move |_: &u32| {
            *counter.lock() += 1;
        });

        channel.emit(&1);
        assert!(channel.unsubscribe(id));
        channel.emit(&2);

        assert_eq!(*count.lock(), 1);
        assert!(!channel.unsubscribe(id));
    }

    #[test]
    fn test_ids_are_unique_across_channels() {
        let a: Subscribers<u32> = Subscribers::new();
        let b: Subscribers<String> = Subscribers::new();
        let id_a = a.subscribe(|_| {});
        let id_b = b.subscribe(|_| {});
        assert_ne!(id_a, id_b);
    }

    #[test]
    fn test_emit_with_no_handlers_is_fine() {
        let channel: Subscribers<u32> = Subscribers::new();
        channel.emit(&1);
        assert!(channel.is_empty());
    }
}
