//! Session manager: single source of truth for credentials and profile.
//!
//! ## Invariants
//! - A token pair is read as present only if **both** keys hold non-empty
//!   values; anything else is "no session".
//! - The cached profile is only visible while a token pair is present, and is
//!   removed together with the tokens.
//! - Authentication status is derived from storage on every read; there is no
//!   separate "logged in" flag that could drift from the tokens.
//!
//! ## Failure semantics
//! Storage failures are logged and degrade to "absent" (reads) or no-op
//! (writes). No operation here returns an error or panics.

use std::sync::{Arc, Mutex, PoisonError};

use sitekit_core::StorageKeys;
use sitekit_events::{Event, EventBus, InMemoryEventBus, Subscription};

use crate::profile::UserProfile;
use crate::storage::KeyValueStore;
use crate::tokens::TokenPair;

pub const TOKENS_UPDATED: &str = "tokens-updated";
pub const LOGGED_IN: &str = "logged-in";
pub const LOGGED_OUT: &str = "logged-out";
pub const USER_UPDATED: &str = "user-updated";
pub const ERROR: &str = "error";

/// Notifications broadcast by the [`SessionManager`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    TokensUpdated,
    LoggedIn(UserProfile),
    LoggedOut,
    UserUpdated(UserProfile),
    Error(String),
}

impl Event for SessionEvent {
    fn event_type(&self) -> &'static str {
        match self {
            SessionEvent::TokensUpdated => TOKENS_UPDATED,
            SessionEvent::LoggedIn(_) => LOGGED_IN,
            SessionEvent::LoggedOut => LOGGED_OUT,
            SessionEvent::UserUpdated(_) => USER_UPDATED,
            SessionEvent::Error(_) => ERROR,
        }
    }
}

/// Derived authentication state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    /// Tokens are present; the profile may not be cached yet.
    Authenticated(Option<UserProfile>),
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated(_))
    }
}

/// Owner of the token pair and cached profile for one page session.
///
/// Construct one per page load and share it by `Arc` with every consumer;
/// tests construct isolated instances over an [`InMemoryStore`](crate::InMemoryStore).
pub struct SessionManager {
    store: Arc<dyn KeyValueStore>,
    keys: StorageKeys,
    bus: Arc<dyn EventBus<SessionEvent>>,
    // Serializes multi-key reads and writes so no reader observes a
    // half-written or half-cleared session.
    guard: Mutex<()>,
}

impl SessionManager {
    pub fn new(store: Arc<dyn KeyValueStore>, keys: StorageKeys) -> Self {
        Self::with_bus(store, keys, Arc::new(InMemoryEventBus::<SessionEvent>::new()))
    }

    pub fn with_bus(
        store: Arc<dyn KeyValueStore>,
        keys: StorageKeys,
        bus: Arc<dyn EventBus<SessionEvent>>,
    ) -> Self {
        Self {
            store,
            keys,
            bus,
            guard: Mutex::new(()),
        }
    }

    pub fn bus(&self) -> Arc<dyn EventBus<SessionEvent>> {
        Arc::clone(&self.bus)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Tokens
    // ─────────────────────────────────────────────────────────────────────

    pub fn get_tokens(&self) -> Option<TokenPair> {
        let _guard = self.lock();
        self.read_tokens()
    }

    /// Persist a freshly issued pair and emit `tokens-updated`.
    ///
    /// Call only after a successful login or refresh exchange.
    pub fn set_tokens(&self, pair: &TokenPair) {
        {
            let _guard = self.lock();
            self.write_tokens(pair);
        }
        tracing::debug!("session tokens updated");
        self.bus.publish(&SessionEvent::TokensUpdated);
    }

    /// Persist the pair from a fresh login and emit `tokens-updated`.
    ///
    /// Any profile cached for a previous session is dropped in the same
    /// step, so nothing reads the old user's permissions against the new
    /// tokens.
    pub fn start_session(&self, pair: &TokenPair) {
        {
            let _guard = self.lock();
            self.erase(&self.keys.user);
            self.write_tokens(pair);
        }
        tracing::debug!("new session started");
        self.bus.publish(&SessionEvent::TokensUpdated);
    }

    /// Remove tokens and profile together and emit `logged-out`.
    ///
    /// Safe to call when already logged out.
    pub fn clear_session(&self) {
        {
            let _guard = self.lock();
            self.erase(&self.keys.access_token);
            self.erase(&self.keys.refresh_token);
            self.erase(&self.keys.user);
        }
        tracing::info!("session cleared");
        self.bus.publish(&SessionEvent::LoggedOut);
    }

    pub fn is_authenticated(&self) -> bool {
        self.get_tokens().is_some()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Profile
    // ─────────────────────────────────────────────────────────────────────

    /// Cached profile, or `None` when anonymous or nothing usable is cached.
    pub fn cached_profile(&self) -> Option<UserProfile> {
        let _guard = self.lock();
        self.read_tokens()?;
        self.read_profile()
    }

    /// Persist the profile and emit `user-updated`.
    pub fn set_profile(&self, profile: &UserProfile) {
        {
            let _guard = self.lock();
            match serde_json::to_string(profile) {
                Ok(json) => {
                    self.write(&self.keys.user, &json);
                }
                Err(err) => tracing::warn!(error = %err, "failed to serialize user profile"),
            }
        }
        self.bus.publish(&SessionEvent::UserUpdated(profile.clone()));
    }

    pub fn state(&self) -> SessionState {
        let _guard = self.lock();
        match self.read_tokens() {
            Some(_) => SessionState::Authenticated(self.read_profile()),
            None => SessionState::Anonymous,
        }
    }

    /// False when anonymous; otherwise true if the cached profile holds
    /// `name` or the `"admin"` sentinel.
    pub fn has_permission(&self, name: &str) -> bool {
        self.cached_profile()
            .is_some_and(|profile| profile.permissions.grants(name))
    }

    // ─────────────────────────────────────────────────────────────────────
    // Notifications
    // ─────────────────────────────────────────────────────────────────────

    /// Emit `logged-in` with the freshly authenticated profile.
    pub fn announce_login(&self, profile: &UserProfile) {
        tracing::info!(user_id = %profile.id, "user logged in");
        self.bus.publish(&SessionEvent::LoggedIn(profile.clone()));
    }

    /// Emit `error` so page-level observers can surface a message.
    pub fn report_error(&self, message: impl Into<String>) {
        self.bus.publish(&SessionEvent::Error(message.into()));
    }

    /// Register `handler` for one event type (see the constants in this
    /// module, or [`sitekit_events::ALL_EVENTS`]).
    ///
    /// Delivery is synchronous and in subscription order. There is no
    /// replay: read current state right after subscribing.
    pub fn subscribe<F>(&self, event_type: &'static str, handler: F) -> Subscription
    where
        F: Fn(&SessionEvent) + Send + Sync + 'static,
    {
        self.bus.subscribe(event_type, Arc::new(handler))
    }

    // ─────────────────────────────────────────────────────────────────────
    // Storage helpers (callers hold `guard`)
    // ─────────────────────────────────────────────────────────────────────

    fn lock(&self) -> std::sync::MutexGuard<'_, ()> {
        self.guard.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.store.get(key) {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(key, error = %err, "storage read failed; treating as absent");
                None
            }
        }
    }

    fn write(&self, key: &str, value: &str) -> bool {
        match self.store.set(key, value) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(key, error = %err, "storage write failed");
                false
            }
        }
    }

    fn erase(&self, key: &str) {
        if let Err(err) = self.store.remove(key) {
            tracing::warn!(key, error = %err, "storage remove failed");
        }
    }

    fn write_tokens(&self, pair: &TokenPair) {
        let stored = self.write(&self.keys.access_token, pair.access_token())
            && self.write(&self.keys.refresh_token, pair.refresh_token());
        if !stored {
            // Leave no half pair behind.
            self.erase(&self.keys.access_token);
            self.erase(&self.keys.refresh_token);
        }
    }

    fn read_tokens(&self) -> Option<TokenPair> {
        let access = self.read(&self.keys.access_token)?;
        let refresh = self.read(&self.keys.refresh_token)?;
        TokenPair::new(access, refresh)
    }

    fn read_profile(&self) -> Option<UserProfile> {
        let raw = self.read(&self.keys.user)?;
        match serde_json::from_str(&raw) {
            Ok(profile) => Some(profile),
            Err(err) => {
                tracing::warn!(error = %err, "cached profile unreadable; ignoring");
                None
            }
        }
    }
}

impl core::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SessionManager")
            .field("keys", &self.keys)
            .field("subscribers", &self.bus.subscriber_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use serde_json::json;
    use sitekit_events::ALL_EVENTS;

    use super::*;
    use crate::storage::{InMemoryStore, StorageError};

    fn manager() -> (Arc<InMemoryStore>, SessionManager) {
        let store = InMemoryStore::arc();
        let manager = SessionManager::new(store.clone(), StorageKeys::default());
        (store, manager)
    }

    fn pair(access: &str, refresh: &str) -> TokenPair {
        TokenPair::new(access, refresh).unwrap()
    }

    fn profile(permissions: serde_json::Value) -> UserProfile {
        UserProfile::from_api(&json!({
            "id": 1,
            "email": "a@b.com",
            "display_name": "A",
            "permissions": permissions,
        }))
        .unwrap()
    }

    fn record(manager: &SessionManager, event_type: &'static str) -> Arc<Mutex<Vec<SessionEvent>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        manager.subscribe(event_type, move |event| sink.lock().unwrap().push(event.clone()));
        seen
    }

    /// Store whose every operation fails.
    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Err(StorageError::Unavailable("disabled".into()))
        }

        fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("disabled".into()))
        }

        fn remove(&self, _key: &str) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("disabled".into()))
        }
    }

    #[test]
    fn start_session_drops_previous_profile() {
        let (_store, manager) = manager();
        manager.set_tokens(&pair("a1", "r1"));
        manager.set_profile(&profile(json!(["reports.export"])));

        let during = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&during);
        let manager = Arc::new(manager);
        let weak = Arc::downgrade(&manager);
        let _ = manager.subscribe(TOKENS_UPDATED, move |_event| {
            if let Some(manager) = weak.upgrade() {
                sink.lock().unwrap().push(manager.has_permission("reports.export"));
            }
        });

        manager.start_session(&pair("a2", "r2"));

        assert_eq!(*during.lock().unwrap(), vec![false]);
        assert_eq!(manager.get_tokens(), Some(pair("a2", "r2")));
        assert_eq!(manager.state(), SessionState::Authenticated(None));
    }

    #[test]
    fn starts_anonymous() {
        let (_store, manager) = manager();
        assert_eq!(manager.get_tokens(), None);
        assert!(!manager.is_authenticated());
        assert_eq!(manager.state(), SessionState::Anonymous);
        assert!(!manager.has_permission("reports.view"));
    }

    #[test]
    fn set_tokens_persists_and_notifies() {
        let (store, manager) = manager();
        let seen = record(&manager, TOKENS_UPDATED);

        manager.set_tokens(&pair("a1", "r1"));

        assert_eq!(manager.get_tokens(), Some(pair("a1", "r1")));
        assert_eq!(store.get("sitekit.access_token").unwrap().as_deref(), Some("a1"));
        assert_eq!(*seen.lock().unwrap(), vec![SessionEvent::TokensUpdated]);
        assert_eq!(manager.state(), SessionState::Authenticated(None));
    }

    #[test]
    fn partial_pair_reads_as_absent() {
        let (store, manager) = manager();
        store.set("sitekit.access_token", "only-access").unwrap();
        assert_eq!(manager.get_tokens(), None);

        store.set("sitekit.refresh_token", "").unwrap();
        assert!(!manager.is_authenticated());
    }

    #[test]
    fn clear_session_removes_everything_and_is_idempotent() {
        let (store, manager) = manager();
        let seen = record(&manager, LOGGED_OUT);
        manager.set_tokens(&pair("a", "r"));
        manager.set_profile(&profile(json!(["x"])));

        manager.clear_session();
        assert_eq!(manager.get_tokens(), None);
        assert_eq!(manager.cached_profile(), None);
        assert!(store.is_empty());

        manager.clear_session();
        assert_eq!(manager.get_tokens(), None);
        assert_eq!(manager.cached_profile(), None);
        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[test]
    fn profile_hidden_without_tokens() {
        let (store, manager) = manager();
        let cached = serde_json::to_string(&profile(json!(["x"]))).unwrap();
        store.set("sitekit.user", &cached).unwrap();

        assert_eq!(manager.cached_profile(), None);
        assert!(!manager.has_permission("x"));
    }

    #[test]
    fn set_profile_notifies_with_payload() {
        let (_store, manager) = manager();
        let seen = record(&manager, USER_UPDATED);
        let user = profile(json!("[\"reports.view\"]"));

        manager.set_tokens(&pair("a", "r"));
        manager.set_profile(&user);

        assert_eq!(manager.cached_profile(), Some(user.clone()));
        assert_eq!(*seen.lock().unwrap(), vec![SessionEvent::UserUpdated(user)]);
    }

    #[test]
    fn admin_sentinel_grants_any_permission() {
        let (_store, manager) = manager();
        manager.set_tokens(&pair("a", "r"));
        manager.set_profile(&profile(json!("[\"admin\"]")));

        for name in ["reports.view", "billing.manage", "admin", "x"] {
            assert!(manager.has_permission(name), "{name} should be granted");
        }
    }

    #[test]
    fn permission_checks_use_cached_set() {
        let (_store, manager) = manager();
        manager.set_tokens(&pair("a", "r"));
        manager.set_profile(&profile(json!("[\"reports.view\"]")));

        assert!(manager.has_permission("reports.view"));
        assert!(!manager.has_permission("admin"));
        assert!(!manager.has_permission("reports.edit"));
    }

    #[test]
    fn unreadable_cached_profile_is_absent() {
        let (store, manager) = manager();
        manager.set_tokens(&pair("a", "r"));
        store.set("sitekit.user", "{broken").unwrap();

        assert_eq!(manager.cached_profile(), None);
        assert!(manager.is_authenticated());
    }

    #[test]
    fn storage_failures_never_escape() {
        let manager = SessionManager::new(Arc::new(BrokenStore), StorageKeys::default());
        let seen = record(&manager, ALL_EVENTS);

        manager.set_tokens(&pair("a", "r"));
        manager.set_profile(&profile(json!([])));
        manager.clear_session();

        assert_eq!(manager.get_tokens(), None);
        assert_eq!(manager.cached_profile(), None);
        assert!(!manager.has_permission("admin"));
        assert_eq!(seen.lock().unwrap().len(), 3);
    }

    #[test]
    fn notifications_are_ordered_and_unsubscribable() {
        let (_store, manager) = manager();
        let order = Arc::new(Mutex::new(Vec::new()));

        let first_log = Arc::clone(&order);
        let first = manager.subscribe(LOGGED_OUT, move |_| first_log.lock().unwrap().push("first"));
        let second_log = Arc::clone(&order);
        let _second = manager.subscribe(LOGGED_OUT, move |_| second_log.lock().unwrap().push("second"));

        manager.clear_session();
        first.unsubscribe();
        manager.clear_session();

        assert_eq!(*order.lock().unwrap(), vec!["first", "second", "second"]);
    }

    #[test]
    fn handlers_can_read_state_during_delivery() {
        let store = InMemoryStore::arc();
        let manager = Arc::new(SessionManager::new(store, StorageKeys::default()));
        let observed = Arc::new(Mutex::new(None));

        let reader = Arc::clone(&manager);
        let sink = Arc::clone(&observed);
        manager.subscribe(TOKENS_UPDATED, move |_| {
            *sink.lock().unwrap() = Some(reader.is_authenticated());
        });

        manager.set_tokens(&pair("a", "r"));
        assert_eq!(*observed.lock().unwrap(), Some(true));
    }

    #[test]
    fn announce_login_and_errors_are_broadcast() {
        let (_store, manager) = manager();
        let seen = record(&manager, ALL_EVENTS);
        let user = profile(json!([]));

        manager.announce_login(&user);
        manager.report_error("boom");

        assert_eq!(
            *seen.lock().unwrap(),
            vec![SessionEvent::LoggedIn(user), SessionEvent::Error("boom".into())]
        );
    }

    proptest! {
        /// Property: set_tokens followed by get_tokens returns the same pair.
        #[test]
        fn token_round_trip(
            access in "[A-Za-z0-9._-]{1,64}",
            refresh in "[A-Za-z0-9._-]{1,64}"
        ) {
            let (_store, manager) = manager();
            let tokens = pair(&access, &refresh);
            manager.set_tokens(&tokens);
            prop_assert_eq!(manager.get_tokens(), Some(tokens));
        }

        /// Property: clear_session empties any prior state.
        #[test]
        fn clear_always_empties(
            access in "[A-Za-z0-9]{1,32}",
            refresh in "[A-Za-z0-9]{1,32}",
            with_profile in any::<bool>()
        ) {
            let (_store, manager) = manager();
            manager.set_tokens(&pair(&access, &refresh));
            if with_profile {
                manager.set_profile(&profile(json!([])));
            }
            manager.clear_session();
            prop_assert!(manager.get_tokens().is_none());
            prop_assert!(manager.cached_profile().is_none());
        }
    }
}
