//! Auth-dependent element visibility.
//!
//! Elements opt in with a rule string (the `data-auth` attribute):
//! `logged-in`, `logged-out`, or `permission:<name>`.

use std::sync::{Arc, Weak};

use sitekit_auth::{Permission, SessionManager};
use sitekit_events::{ALL_EVENTS, Subscription};

pub const AUTH_ATTRIBUTE: &str = "data-auth";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VisibilityRule {
    LoggedIn,
    LoggedOut,
    Permission(Permission),
}

impl VisibilityRule {
    /// `None` for anything unrecognised; such elements are left alone.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        match raw {
            "logged-in" => Some(VisibilityRule::LoggedIn),
            "logged-out" => Some(VisibilityRule::LoggedOut),
            _ => {
                let name = raw.strip_prefix("permission:")?.trim();
                if name.is_empty() {
                    None
                } else {
                    Some(VisibilityRule::Permission(Permission::new(name)))
                }
            }
        }
    }

    pub fn is_visible(&self, session: &SessionManager) -> bool {
        match self {
            VisibilityRule::LoggedIn => session.is_authenticated(),
            VisibilityRule::LoggedOut => !session.is_authenticated(),
            VisibilityRule::Permission(name) => session.has_permission(name.as_str()),
        }
    }
}

/// The page's rule-tagged elements.
pub trait ElementStore: Send + Sync {
    /// `(element id, raw rule)` for every element carrying [`AUTH_ATTRIBUTE`].
    fn tagged(&self) -> Vec<(String, String)>;

    fn set_visible(&self, id: &str, visible: bool);
}

#[derive(Debug)]
pub struct VisibilityController;

impl VisibilityController {
    /// Show or hide every element with a recognised rule. Returns how many
    /// elements were updated.
    pub fn apply(store: &dyn ElementStore, session: &SessionManager) -> usize {
        let mut updated = 0;
        for (id, raw) in store.tagged() {
            let Some(rule) = VisibilityRule::parse(&raw) else {
                tracing::debug!(element = %id, rule = %raw, "unrecognised visibility rule");
                continue;
            };
            store.set_visible(&id, rule.is_visible(session));
            updated += 1;
        }
        updated
    }

    /// Apply now, then again after every session event.
    pub fn observe(store: Arc<dyn ElementStore>, session: &Arc<SessionManager>) -> Subscription {
        Self::apply(store.as_ref(), session);

        // Weak: the session owns the bus that owns this handler.
        let weak: Weak<SessionManager> = Arc::downgrade(session);
        session.subscribe(ALL_EVENTS, move |_event| {
            if let Some(session) = weak.upgrade() {
                Self::apply(store.as_ref(), &session);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    use serde_json::json;
    use sitekit_auth::{InMemoryStore, TokenPair, UserProfile};
    use sitekit_core::StorageKeys;

    use super::*;

    #[derive(Default)]
    struct Page {
        rules: Vec<(String, String)>,
        shown: Mutex<BTreeMap<String, bool>>,
    }

    impl Page {
        fn with(rules: &[(&str, &str)]) -> Arc<Self> {
            Arc::new(Self {
                rules: rules
                    .iter()
                    .map(|(id, rule)| (id.to_string(), rule.to_string()))
                    .collect(),
                shown: Mutex::default(),
            })
        }

        fn shown(&self, id: &str) -> Option<bool> {
            self.shown.lock().unwrap().get(id).copied()
        }
    }

    impl ElementStore for Page {
        fn tagged(&self) -> Vec<(String, String)> {
            self.rules.clone()
        }

        fn set_visible(&self, id: &str, visible: bool) {
            self.shown.lock().unwrap().insert(id.to_string(), visible);
        }
    }

    fn session() -> Arc<SessionManager> {
        Arc::new(SessionManager::new(InMemoryStore::arc(), StorageKeys::default()))
    }

    fn sign_in(session: &SessionManager, permissions: serde_json::Value) {
        session.set_tokens(&TokenPair::new("a", "r").unwrap());
        let user =
            UserProfile::from_api(&json!({ "id": 1, "email": "a@b.com", "permissions": permissions }))
                .unwrap();
        session.set_profile(&user);
        session.announce_login(&user);
    }

    #[test]
    fn parses_rules() {
        assert_eq!(VisibilityRule::parse("logged-in"), Some(VisibilityRule::LoggedIn));
        assert_eq!(VisibilityRule::parse(" logged-out "), Some(VisibilityRule::LoggedOut));
        assert_eq!(
            VisibilityRule::parse("permission:Reports.View"),
            Some(VisibilityRule::Permission(Permission::new("reports.view")))
        );
        assert_eq!(VisibilityRule::parse("permission:"), None);
        assert_eq!(VisibilityRule::parse("admins-only"), None);
    }

    #[test]
    fn follows_session_changes() {
        let session = session();
        let page = Page::with(&[
            ("nav-account", "logged-in"),
            ("nav-login", "logged-out"),
            ("btn-export", "permission:reports.export"),
            ("banner", "sometimes"),
        ]);
        let _subscription = VisibilityController::observe(page.clone(), &session);

        assert_eq!(page.shown("nav-account"), Some(false));
        assert_eq!(page.shown("nav-login"), Some(true));
        assert_eq!(page.shown("btn-export"), Some(false));
        assert_eq!(page.shown("banner"), None);

        sign_in(&session, json!(["reports.view"]));
        assert_eq!(page.shown("nav-account"), Some(true));
        assert_eq!(page.shown("nav-login"), Some(false));
        assert_eq!(page.shown("btn-export"), Some(false));

        session.clear_session();
        assert_eq!(page.shown("nav-account"), Some(false));
        assert_eq!(page.shown("nav-login"), Some(true));
    }

    #[test]
    fn admin_sees_permission_gated_elements() {
        let session = session();
        let page = Page::with(&[("btn-export", "permission:reports.export")]);

        sign_in(&session, json!(["admin"]));

        assert_eq!(VisibilityController::apply(page.as_ref(), &session), 1);
        assert_eq!(page.shown("btn-export"), Some(true));
    }
}
