//! Synchronous publish/subscribe for in-page notifications.
//!
//! Components announce state changes (session, profile, errors) on a bus;
//! observers such as the auth card machine or visibility toggles subscribe
//! by event type and react on the publisher's own call stack.

pub mod bus;
pub mod event;
pub mod in_memory_bus;

pub use bus::{EventBus, Handler, Subscription, ALL_EVENTS};
pub use event::Event;
pub use in_memory_bus::InMemoryEventBus;
