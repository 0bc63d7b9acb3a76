//! Alt detection and link-graph handlers

use axum::extract::{Query, State};
use axum::Json;
use mgeops_common::SteamId64;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::api::whois::{pick_region, resolve_input};
use crate::api::ApiError;
use crate::detect::links::{AltGroup, LinkService};
use crate::detect::{AltCandidate, AltDetector};
use crate::regions::RegionRating;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CandidatesParams {
    pub id: String,
    pub region: Option<String>,
    pub days: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct RankedCandidate {
    #[serde(flatten)]
    pub candidate: AltCandidate,
    /// Current rating per region, for candidates that normalize to 64-bit
    pub ratings: Vec<RegionRating>,
}

#[derive(Debug, Serialize)]
pub struct CandidatesResponse {
    pub steamid64: SteamId64,
    pub region: String,
    pub window_days: u32,
    pub candidates: Vec<RankedCandidate>,
}

/// GET /api/whois/alts?id=&region=&days=
pub async fn candidates(
    State(state): State<AppState>,
    Query(params): Query<CandidatesParams>,
) -> Result<Json<CandidatesResponse>, ApiError> {
    let id = resolve_input(&state, &params.id).await?;
    let region = pick_region(&state, params.region.as_deref())?;
    let days = params
        .days
        .unwrap_or(crate::detect::DEFAULT_WINDOW_DAYS)
        .min(crate::detect::MAX_WINDOW_DAYS);

    let detector = AltDetector::new(&region.sessions);
    let found = detector.find_candidates(id, Some(days)).await?;

    // Attach per-region ratings; candidates that never normalize keep an
    // empty list
    let mut candidates = Vec::with_capacity(found.len());
    for candidate in found {
        let ratings = match candidate.steamid64 {
            Some(candidate_id) => state
                .regions
                .rating_overview(candidate_id)
                .await
                .unwrap_or_default(),
            None => Vec::new(),
        };
        candidates.push(RankedCandidate { candidate, ratings });
    }

    Ok(Json(CandidatesResponse {
        steamid64: id,
        region: region.name.clone(),
        window_days: days,
        candidates,
    }))
}

#[derive(Debug, Serialize)]
pub struct LinksResponse {
    pub groups: Vec<AltGroup>,
}

/// GET /api/whois/links
pub async fn list_links(
    State(state): State<AppState>,
) -> Result<Json<LinksResponse>, ApiError> {
    let service = LinkService::new(&state.links);
    let groups = service.grouped().await?;
    Ok(Json(LinksResponse { groups }))
}

#[derive(Debug, Deserialize)]
pub struct DeclareMainRequest {
    pub main: String,
    /// Acting operator, recorded on the row
    pub actor: String,
}

/// POST /api/whois/links/main
pub async fn declare_main(
    State(state): State<AppState>,
    Json(request): Json<DeclareMainRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let service = LinkService::new(&state.links);
    let main64 = service.declare_main(&request.main, &request.actor).await?;
    Ok(Json(json!({ "ok": true, "main": main64 })))
}

#[derive(Debug, Deserialize)]
pub struct LinkAltRequest {
    pub alt: String,
    pub main: String,
    pub actor: String,
}

/// POST /api/whois/links/alt
pub async fn link_alt(
    State(state): State<AppState>,
    Json(request): Json<LinkAltRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let service = LinkService::new(&state.links);
    service
        .link_alt(&request.alt, &request.main, &request.actor)
        .await?;
    Ok(Json(json!({ "ok": true })))
}

#[derive(Debug, Deserialize)]
pub struct UnlinkAltRequest {
    pub alt: String,
}

/// POST /api/whois/links/unlink
pub async fn unlink_alt(
    State(state): State<AppState>,
    Json(request): Json<UnlinkAltRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let service = LinkService::new(&state.links);
    let removed = service.unlink_alt(&request.alt).await?;
    Ok(Json(json!({ "ok": true, "removed": removed })))
}

#[derive(Debug, Deserialize)]
pub struct PermNameRequest {
    pub id: String,
    pub name: Option<String>,
    pub actor: String,
}

/// POST /api/whois/links/permname
pub async fn set_perm_name(
    State(state): State<AppState>,
    Json(request): Json<PermNameRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let service = LinkService::new(&state.links);
    let id64 = service
        .set_perm_name(&request.id, request.name.as_deref(), &request.actor)
        .await?;
    Ok(Json(json!({ "ok": true, "id": id64 })))
}
