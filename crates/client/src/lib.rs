//! `sitekit-client` — talking to the site API.
//!
//! - [`ApiClient`]: bearer-authenticated calls with a single refresh-and-retry
//!   on an expired access token
//! - [`AuthService`]: login / logout / password reset flows that feed the
//!   [`SessionManager`](sitekit_auth::SessionManager)
//! - [`reports`]: report listing and client-side filtering

pub mod auth_service;
pub mod client;
pub mod dto;
pub mod endpoints;
pub mod error;
pub mod reports;
pub mod transport;

pub use auth_service::AuthService;
pub use client::ApiClient;
pub use error::{ApiError, ApiResult};
pub use reports::{Category, Report, ReportFilter, ReportsService, filter_reports, sort_newest_first};
pub use transport::{HttpRequest, HttpResponse, HttpTransport, Method, ReqwestTransport, TransportError};
