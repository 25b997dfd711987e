//! Logging setup shared by every sitekit binary.

pub mod subscriber;

pub use subscriber::LogFormat;

/// Initialize process-wide logging with the format from `SITEKIT_LOG_FORMAT`
/// (JSON unless set to `text`).
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    subscriber::init(LogFormat::from_env());
}
