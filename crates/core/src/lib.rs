//! `sitekit-core` — shared building blocks for the site client.
//!
//! This crate contains **pure** primitives (no IO beyond reading the process
//! environment): client configuration, validated input values and the
//! validation error model.

pub mod config;
pub mod error;
pub mod value_object;

pub use config::{AnimationConfig, ClientConfig, ConfigError, StorageKeys};
pub use error::{ValidationError, ValidationResult};
pub use value_object::{EmailAddress, NewPassword, ValueObject};
