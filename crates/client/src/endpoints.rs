//! Fixed API paths, relative to the configured base URL.

pub const LOGIN: &str = "/login";
pub const REFRESH: &str = "/refresh";
pub const LOGOUT: &str = "/logout";
pub const FORGOT_PASSWORD: &str = "/forgot-password";
pub const RESET_PASSWORD: &str = "/reset-password";
pub const CURRENT_USER: &str = "/users/me";
pub const REPORTS: &str = "/reports";
pub const CATEGORIES: &str = "/categories";

/// `/reports/{id}` with the id percent-encoded.
pub fn report(id: &str) -> String {
    format!("{REPORTS}/{}", urlencoding::encode(id))
}
