/// A notification published on an [`EventBus`](crate::EventBus).
///
/// Events are immutable facts about something that already happened
/// (tokens stored, session cleared, ...). Subscribers select them by
/// [`event_type`](Event::event_type).
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Stable event name (e.g. "logged-in").
    fn event_type(&self) -> &'static str;
}
