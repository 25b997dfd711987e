//! Event publishing/subscription abstraction (mechanics only).
//!
//! The bus is the single notification hub of a page: the session layer
//! publishes, UI observers subscribe.
//!
//! ## Delivery Guarantees
//!
//! - **Synchronous**: `publish` returns only after every matching handler ran
//! - **Ordered**: handlers run in subscription order
//! - **Same context**: handlers run on the publisher's thread, no queuing
//! - **No replay**: a late subscriber only sees events published after it
//!   subscribed, so it must read current state directly after subscribing

use std::sync::Arc;

/// Subscribe to this event type to receive every event.
pub const ALL_EVENTS: &str = "*";

/// Callback invoked for each delivered event.
pub type Handler<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// Handle returned by [`EventBus::subscribe`].
///
/// Dropping the handle keeps the handler registered; call
/// [`unsubscribe`](Subscription::unsubscribe) to remove it.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Remove the handler from the bus. No-op if the bus is gone.
    pub fn unsubscribe(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl core::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

/// Keyed publish/subscribe bus.
///
/// The trait requires `Send + Sync` so a bus can be shared by reference
/// (`Arc`) between the session layer, the API client and UI observers.
pub trait EventBus<E>: Send + Sync {
    /// Deliver `event` to every handler subscribed to its type (and to
    /// [`ALL_EVENTS`]) before returning.
    fn publish(&self, event: &E);

    /// Register `handler` for events whose type equals `event_type`.
    fn subscribe(&self, event_type: &'static str, handler: Handler<E>) -> Subscription;

    /// Number of handlers currently registered.
    fn subscriber_count(&self) -> usize;
}

impl<E, B> EventBus<E> for Arc<B>
where
    B: EventBus<E> + ?Sized,
{
    fn publish(&self, event: &E) {
        (**self).publish(event)
    }

    fn subscribe(&self, event_type: &'static str, handler: Handler<E>) -> Subscription {
        (**self).subscribe(event_type, handler)
    }

    fn subscriber_count(&self) -> usize {
        (**self).subscriber_count()
    }
}
