//! In-process event bus.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use crate::bus::{ALL_EVENTS, EventBus, Handler, Subscription};
use crate::event::Event;

struct Entry<E> {
    id: u64,
    event_type: &'static str,
    handler: Handler<E>,
}

type Registry<E> = Mutex<Vec<Entry<E>>>;

/// In-memory pub/sub bus.
///
/// - No IO / no async
/// - Handlers are snapshotted before delivery, so a handler may publish,
///   subscribe or unsubscribe without deadlocking
pub struct InMemoryEventBus<E> {
    subscribers: Arc<Registry<E>>,
    next_id: AtomicU64,
}

impl<E> InMemoryEventBus<E> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<E> Default for InMemoryEventBus<E> {
    fn default() -> Self {
        Self {
            subscribers: Arc::new(Mutex::new(Vec::new())),
            next_id: AtomicU64::new(1),
        }
    }
}

impl<E> core::fmt::Debug for InMemoryEventBus<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let count = self
            .subscribers
            .lock()
            .map(|subs| subs.len())
            .unwrap_or_default();
        f.debug_struct("InMemoryEventBus")
            .field("subscribers", &count)
            .finish()
    }
}

impl<E: Event> EventBus<E> for InMemoryEventBus<E> {
    fn publish(&self, event: &E) {
        let event_type = event.event_type();
        let handlers: Vec<Handler<E>> = {
            let subs = self.subscribers.lock().unwrap_or_else(PoisonError::into_inner);
            subs.iter()
                .filter(|entry| entry.event_type == event_type || entry.event_type == ALL_EVENTS)
                .map(|entry| Arc::clone(&entry.handler))
                .collect()
        };

        tracing::trace!(event_type, handlers = handlers.len(), "publishing event");
        for handler in handlers {
            handler(event);
        }
    }

    fn subscribe(&self, event_type: &'static str, handler: Handler<E>) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Entry {
                id,
                event_type,
                handler,
            });

        let registry: Weak<Registry<E>> = Arc::downgrade(&self.subscribers);
        Subscription::new(move || {
            if let Some(registry) = registry.upgrade() {
                registry
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .retain(|entry| entry.id != id);
            }
        })
    }

    fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
