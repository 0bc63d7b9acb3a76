//! Identity and session-log handlers

use axum::extract::{Query, State};
use axum::Json;
use chrono::Utc;
use mgeops_common::activity::{activity_histograms, ActivityHistograms};
use mgeops_common::db::SessionLogRow;
use mgeops_common::steamid::IdVariantSet;
use mgeops_common::{Error, SteamId64};
use serde::{Deserialize, Serialize};

use crate::api::ApiError;
use crate::regions::Region;
use crate::repo::SessionRepository;
use crate::AppState;

/// Resolve an identifier, trying the vanity API when plain parsing fails
/// and a Steam API key is configured
pub(crate) async fn resolve_input(state: &AppState, input: &str) -> Result<SteamId64, Error> {
    match SteamId64::parse(input) {
        Ok(id) => Ok(id),
        Err(e) => {
            if let Some(api_key) = state.config.steam_api_key.as_deref() {
                if let Some(id) = crate::vanity::resolve_vanity(&state.http, api_key, input).await {
                    return Ok(id);
                }
            }
            Err(e)
        }
    }
}

/// Region selection shared by the session-log handlers; defaults to the
/// first configured region
pub(crate) fn pick_region<'a>(state: &'a AppState, name: Option<&str>) -> Result<&'a Region, Error> {
    match name {
        Some(name) => state.regions.get(name),
        None => {
            let names = state.regions.names();
            let first = names
                .first()
                .ok_or_else(|| Error::Config("no regions configured".to_string()))?;
            state.regions.get(first)
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ResolveParams {
    pub id: String,
}

#[derive(Debug, Serialize)]
pub struct ResolveResponse {
    pub steamid64: SteamId64,
    pub account_id: Option<u64>,
    pub steam2: Option<String>,
    pub steam3: Option<String>,
    pub variants: IdVariantSet,
}

/// GET /api/whois/resolve?id=
pub async fn resolve(
    State(state): State<AppState>,
    Query(params): Query<ResolveParams>,
) -> Result<Json<ResolveResponse>, ApiError> {
    let id = resolve_input(&state, &params.id).await?;
    Ok(Json(ResolveResponse {
        steamid64: id,
        account_id: id.account_id().ok(),
        steam2: id.steam2_canonical().ok(),
        steam3: id.steam3().ok(),
        variants: id.variants(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct SessionsParams {
    pub id: String,
    pub region: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct SessionsResponse {
    pub steamid64: SteamId64,
    pub region: String,
    pub sessions: Vec<SessionLogRow>,
}

/// GET /api/whois/sessions?id=&region=&limit=
pub async fn sessions(
    State(state): State<AppState>,
    Query(params): Query<SessionsParams>,
) -> Result<Json<SessionsResponse>, ApiError> {
    let id = resolve_input(&state, &params.id).await?;
    let region = pick_region(&state, params.region.as_deref())?;
    let limit = params.limit.unwrap_or(100).clamp(1, 500);

    let rows = region.sessions.sessions_for(&id.variants(), limit).await?;
    Ok(Json(SessionsResponse {
        steamid64: id,
        region: region.name.clone(),
        sessions: rows,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ActivityParams {
    pub id: String,
    pub region: Option<String>,
    pub days: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct ActivityResponse {
    pub steamid64: SteamId64,
    pub region: String,
    pub sessions_counted: usize,
    pub histograms: ActivityHistograms,
}

/// GET /api/whois/activity?id=&region=&days=
pub async fn activity(
    State(state): State<AppState>,
    Query(params): Query<ActivityParams>,
) -> Result<Json<ActivityResponse>, ApiError> {
    let id = resolve_input(&state, &params.id).await?;
    let region = pick_region(&state, params.region.as_deref())?;
    let days = params
        .days
        .unwrap_or(crate::detect::DEFAULT_WINDOW_DAYS)
        .min(crate::detect::MAX_WINDOW_DAYS);
    let since = Utc::now().timestamp() - i64::from(days) * 86_400;

    let times = region.sessions.session_times(&id.variants(), since).await?;
    Ok(Json(ActivityResponse {
        steamid64: id,
        region: region.name.clone(),
        sessions_counted: times.len(),
        histograms: activity_histograms(&times),
    }))
}

#[derive(Debug, Deserialize)]
pub struct OverviewParams {
    pub id: String,
}

#[derive(Debug, Serialize)]
pub struct RegionOverview {
    pub region: String,
    pub available: bool,
    pub has_stats: bool,
    pub rating: Option<i64>,
    pub last_seen: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct OverviewResponse {
    pub steamid64: SteamId64,
    pub regions: Vec<RegionOverview>,
}

/// GET /api/whois/overview?id=
///
/// Per-region presence and rating; a failing region reports
/// `available: false` without failing the rest.
pub async fn overview(
    State(state): State<AppState>,
    Query(params): Query<OverviewParams>,
) -> Result<Json<OverviewResponse>, ApiError> {
    let id = resolve_input(&state, &params.id).await?;

    let presence = state.regions.presence(id).await?;
    let ratings = state.regions.rating_overview(id).await?;

    // Both lists come back in configured-region order
    let regions = presence
        .into_iter()
        .zip(ratings)
        .map(|(p, r)| RegionOverview {
            region: p.region,
            available: p.available && r.available,
            has_stats: p.has_stats,
            rating: r.rating,
            last_seen: p.last_seen,
        })
        .collect();

    Ok(Json(OverviewResponse {
        steamid64: id,
        regions,
    }))
}
