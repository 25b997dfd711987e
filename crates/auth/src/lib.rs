//! `sitekit-auth` — credential and profile state for a single page session.
//!
//! This crate is intentionally decoupled from HTTP: it owns what is stored
//! (token pair, cached profile), answers "who is logged in and what may they
//! do", and announces every change on a [`sitekit_events::EventBus`].

pub mod permissions;
pub mod profile;
pub mod session;
pub mod storage;
pub mod tokens;

pub use permissions::{ADMIN_PERMISSION, Permission, PermissionSet};
pub use profile::{ProfileError, UserProfile};
pub use session::{SessionEvent, SessionManager, SessionState};
pub use storage::{FileStore, InMemoryStore, KeyValueStore, StorageError};
pub use tokens::TokenPair;
