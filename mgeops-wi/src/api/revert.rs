//! Elo reversion handlers

use axum::extract::{Path, Query, State};
use axum::Json;
use mgeops_common::Error;
use serde::{Deserialize, Serialize};

use crate::api::ApiError;
use crate::repo::{AuditLog, HistoryQuery, Scope};
use crate::revert::{
    Actor, ReversionEngine, ReversionRecord, ReversionRecordSummary, ReversionSummary, Selection,
};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ReconcileRequest {
    pub region: String,
    /// Target account, any identifier encoding
    pub steamid: String,
    #[serde(default)]
    pub match_ids: Option<Vec<i64>>,
    #[serde(default)]
    pub filters: Option<Filters>,
    #[serde(default)]
    pub scope: Scope,
    /// False (default) previews; true applies
    #[serde(default)]
    pub apply: bool,
    /// Required when applying; recorded in the audit trail
    #[serde(default)]
    pub actor: Option<Actor>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Filters {
    pub from: Option<i64>,
    pub to: Option<i64>,
    pub versus: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ReconcileResponse {
    pub ok: bool,
    pub dry_run: bool,
    #[serde(flatten)]
    pub summary: ReversionSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audit_id: Option<String>,
}

/// POST /api/whois/revert-elo
///
/// One operation, two modes: preview (default) computes without writing;
/// apply executes the transactional rollback and appends an audit record.
pub async fn reconcile(
    State(state): State<AppState>,
    Json(request): Json<ReconcileRequest>,
) -> Result<Json<ReconcileResponse>, ApiError> {
    let region = state.regions.get(&request.region)?;

    let filters = request.filters.unwrap_or_default();
    let selection = Selection {
        match_ids: request.match_ids,
        from: filters.from,
        to: filters.to,
        versus: filters.versus,
        scope: request.scope,
    };

    let engine = ReversionEngine::new(
        &region.matches,
        &region.ratings,
        &state.audit,
        state.config.baseline_rating,
    );

    if !request.apply {
        let summary = engine
            .preview(&region.name, &request.steamid, &selection)
            .await?;
        return Ok(Json(ReconcileResponse {
            ok: true,
            dry_run: true,
            summary,
            audit_id: None,
        }));
    }

    let actor = request
        .actor
        .ok_or_else(|| Error::InvalidIdentifier("actor required when applying".to_string()))?;
    let applied = engine
        .apply(&region.name, &request.steamid, &selection, &actor)
        .await?;

    Ok(Json(ReconcileResponse {
        ok: true,
        dry_run: false,
        summary: applied.summary,
        audit_id: Some(applied.audit_id),
    }))
}

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    pub region: String,
    pub steamid2: Option<String>,
    pub take: Option<i64>,
    pub skip: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub items: Vec<ReversionRecordSummary>,
    pub total: i64,
}

/// GET /api/whois/revert-elo/history?region=&steamid2=&take=&skip=
pub async fn history(
    State(state): State<AppState>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<HistoryResponse>, ApiError> {
    // Region must exist even though the audit store is region-agnostic
    state.regions.get(&params.region)?;

    let query = HistoryQuery {
        region: params.region,
        target_steam2: params.steamid2,
        take: params.take.unwrap_or(50).clamp(1, 200),
        skip: params.skip.unwrap_or(0).max(0),
    };
    let (items, total) = state.audit.list(&query).await?;
    Ok(Json(HistoryResponse { items, total }))
}

/// GET /api/whois/revert-elo/history/{id}
pub async fn history_entry(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ReversionRecord>, ApiError> {
    let record = state
        .audit
        .get(&id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("reversion record {}", id)))?;
    Ok(Json(record))
}
