//! mgeops-wi library - WHOIS investigation service
//!
//! Operator tooling over the duel-match databases: identity resolution,
//! alt-account detection, alt-link curation, and Elo reversion with a full
//! audit trail.

use axum::Router;
use mgeops_common::config::ServiceConfig;
use std::sync::Arc;

pub mod api;
pub mod detect;
pub mod regions;
pub mod repo;
pub mod revert;
pub mod vanity;

use crate::regions::RegionSet;
use crate::repo::sqlite::{SqliteAuditLog, SqliteLinkRepository};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Per-region match/session/rating repositories
    pub regions: Arc<RegionSet>,
    /// Alt-link and permanent-name store (ops database)
    pub links: SqliteLinkRepository,
    /// Reversion audit store (ops database)
    pub audit: SqliteAuditLog,
    /// Service configuration
    pub config: Arc<ServiceConfig>,
    /// Shared HTTP client for Steam Web API calls
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(
        regions: RegionSet,
        links: SqliteLinkRepository,
        audit: SqliteAuditLog,
        config: ServiceConfig,
    ) -> Self {
        Self {
            regions: Arc::new(regions),
            links,
            audit,
            config: Arc::new(config),
            http: reqwest::Client::new(),
        }
    }
}

/// Build application router
///
/// Protected routes sit behind the shared-secret middleware; /health does
/// not.
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;
    use axum::routing::{get, post};

    let protected = Router::new()
        .route("/api/whois/resolve", get(api::whois::resolve))
        .route("/api/whois/sessions", get(api::whois::sessions))
        .route("/api/whois/activity", get(api::whois::activity))
        .route("/api/whois/overview", get(api::whois::overview))
        .route("/api/whois/alts", get(api::alts::candidates))
        .route("/api/whois/links", get(api::alts::list_links))
        .route("/api/whois/links/main", post(api::alts::declare_main))
        .route("/api/whois/links/alt", post(api::alts::link_alt))
        .route("/api/whois/links/unlink", post(api::alts::unlink_alt))
        .route("/api/whois/links/permname", post(api::alts::set_perm_name))
        .route("/api/whois/revert-elo", post(api::revert::reconcile))
        .route("/api/whois/revert-elo/history", get(api::revert::history))
        .route("/api/whois/revert-elo/history/:id", get(api::revert::history_entry))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::auth::auth_middleware,
        ));

    let public = Router::new().route("/health", get(api::health));

    Router::new().merge(protected).merge(public).with_state(state)
}
