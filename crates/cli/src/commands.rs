//! Subcommand handlers. Each returns the JSON document printed on stdout.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, anyhow};
use serde_json::{Value, json};

use sitekit_auth::{FileStore, SessionManager};
use sitekit_client::{
    ApiClient, ApiError, AuthService, ReportFilter, ReportsService, filter_reports, sort_newest_first,
};
use sitekit_core::ClientConfig;
use sitekit_ui::CardState;

use crate::{Cli, Commands};

pub const ENV_SESSION_FILE: &str = "SITEKIT_SESSION_FILE";

struct App {
    session: Arc<SessionManager>,
    auth: AuthService,
    reports: ReportsService,
}

impl App {
    fn build(session_file: Option<PathBuf>) -> anyhow::Result<Self> {
        let config = ClientConfig::from_env().context("failed to load configuration")?;
        let path = match session_file {
            Some(path) => path,
            None => default_session_path()?,
        };
        tracing::debug!(path = %path.display(), "using session file");

        let store = Arc::new(FileStore::new(path));
        let session = Arc::new(SessionManager::new(store, config.storage_keys.clone()));
        let api = Arc::new(
            ApiClient::with_reqwest(config, session.clone()).context("failed to build HTTP client")?,
        );

        Ok(Self {
            session,
            auth: AuthService::new(api.clone()),
            reports: ReportsService::new(api),
        })
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<Value> {
    let app = App::build(cli.session_file)?;

    match cli.command {
        Commands::Login { email, password } => {
            let profile = app.auth.login(&email, &password).await.map_err(friendly)?;
            let profile = serde_json::to_value(&profile)?;
            Ok(json!({
                "card": CardState::from_session(&app.session.state()).as_str(),
                "profile": profile,
            }))
        }
        Commands::Logout => {
            app.auth.logout().await;
            Ok(json!({ "card": CardState::Login.as_str() }))
        }
        Commands::Whoami => {
            let profile = serde_json::to_value(app.auth.restore().await)?;
            let state = app.session.state();
            Ok(json!({
                "authenticated": state.is_authenticated(),
                "card": CardState::from_session(&state).as_str(),
                "profile": profile,
            }))
        }
        Commands::ForgotPassword { email } => {
            app.auth.forgot_password(&email).await.map_err(friendly)?;
            Ok(json!({ "sent": true, "card": CardState::ResetPassword.as_str() }))
        }
        Commands::ResetPassword { token, password } => {
            app.auth
                .reset_password(&token, &password)
                .await
                .map_err(friendly)?;
            Ok(json!({ "reset": true, "card": CardState::Login.as_str() }))
        }
        Commands::Reports {
            category,
            query,
            tag,
            filter,
        } => {
            let filter = report_filter(filter.as_deref(), category, query, tag);
            let mut reports = app.reports.list().await.map_err(friendly)?;
            sort_newest_first(&mut reports);
            let shown = filter_reports(&reports, &filter);
            tracing::debug!(total = reports.len(), shown = shown.len(), "reports filtered");
            Ok(serde_json::to_value(shown)?)
        }
        Commands::Report { id } => {
            let report = app.reports.get(&id).await.map_err(friendly)?;
            Ok(serde_json::to_value(report)?)
        }
        Commands::Categories => {
            let categories = app.reports.categories().await.map_err(friendly)?;
            Ok(serde_json::to_value(categories)?)
        }
    }
}

/// Flags override whatever the raw query string set.
fn report_filter(
    raw: Option<&str>,
    category: Option<String>,
    query: Option<String>,
    tag: Option<String>,
) -> ReportFilter {
    let base = raw.map(ReportFilter::from_query_string).unwrap_or_default();
    ReportFilter {
        category: category.or(base.category),
        query: query.or(base.query),
        tag: tag.or(base.tag),
    }
}

fn friendly(err: ApiError) -> anyhow::Error {
    match err.status() {
        Some(status) => anyhow!("{} (status {status})", err.user_message()),
        None => anyhow!(err.user_message()),
    }
}

/// `$SITEKIT_SESSION_FILE`, else `{app_data_dir}/sitekit/session.json`.
fn default_session_path() -> anyhow::Result<PathBuf> {
    if let Ok(path) = std::env::var(ENV_SESSION_FILE) {
        if !path.trim().is_empty() {
            return Ok(PathBuf::from(path));
        }
    }

    let mut dir = dirs::data_dir()
        .or_else(|| {
            dirs::home_dir().map(|mut h| {
                h.push(".local");
                h.push("share");
                h
            })
        })
        .context("failed to resolve OS app data directory - tried data_dir() and home_dir()/.local/share")?;
    dir.push("sitekit");
    dir.push("session.json");
    Ok(dir)
}
