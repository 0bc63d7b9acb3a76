//! Repository traits
//!
//! The engines never touch a connection pool directly: every read and write
//! goes through one of these traits, constructed once per process and passed
//! in explicitly. Tests substitute in-memory fakes; production wires the
//! SQLite implementations from [`sqlite`].
//!
//! Query parameters are typed structs, validated by construction, never
//! ad hoc maps.

pub mod sqlite;

use mgeops_common::db::{AltLinkRow, DuelRow, PermNameRow, SessionLogRow};
use mgeops_common::steamid::IdVariantSet;
use mgeops_common::Result;
use serde::{Deserialize, Serialize};

use crate::revert::{ReversionRecord, ReversionRecordSummary};

/// Which side of a duel the target must be on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    #[default]
    All,
    Wins,
    Losses,
}

/// Typed match selection for [`MatchRepository`]
///
/// `target_steam2` is the legacy form the match tables are keyed by.
/// An explicit `match_ids` list and the time/opponent filters combine with
/// AND semantics; the scope always applies.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DuelQuery {
    pub target_steam2: String,
    #[serde(default)]
    pub scope: Scope,
    #[serde(default)]
    pub match_ids: Option<Vec<i64>>,
    /// Inclusive endtime lower bound, unix seconds
    #[serde(default)]
    pub from: Option<i64>,
    /// Inclusive endtime upper bound, unix seconds
    #[serde(default)]
    pub to: Option<i64>,
    /// Restrict to duels against this opponent (legacy form)
    #[serde(default)]
    pub versus_steam2: Option<String>,
}

/// One rating write in an atomic batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RatingUpdate {
    pub steamid2: String,
    pub rating: i64,
}

/// Paging/filter parameters for audit history listing
#[derive(Debug, Clone, Default)]
pub struct HistoryQuery {
    pub region: String,
    pub target_steam2: Option<String>,
    pub take: i64,
    pub skip: i64,
}

/// Read access to the per-region duel records
pub trait MatchRepository {
    fn find_duels(
        &self,
        query: &DuelQuery,
    ) -> impl std::future::Future<Output = Result<Vec<DuelRow>>> + Send;

    fn count_duels(
        &self,
        query: &DuelQuery,
    ) -> impl std::future::Future<Output = Result<i64>> + Send;

    /// Endtime of the most recent duel involving any of the given variants
    fn last_duel_endtime(
        &self,
        variants: &IdVariantSet,
    ) -> impl std::future::Future<Output = Result<Option<i64>>> + Send;
}

/// Read access to the per-region connection logs
pub trait SessionRepository {
    /// Distinct origins used by any of the variants since `since` (unix s)
    fn distinct_ips(
        &self,
        variants: &IdVariantSet,
        since: i64,
    ) -> impl std::future::Future<Output = Result<Vec<String>>> + Send;

    /// All sessions observed on the given origins since `since`
    fn sessions_on_ips(
        &self,
        ips: &[String],
        since: i64,
    ) -> impl std::future::Future<Output = Result<Vec<SessionLogRow>>> + Send;

    /// Distinct display names used by any of the variants since `since`
    fn distinct_names(
        &self,
        variants: &IdVariantSet,
        since: i64,
    ) -> impl std::future::Future<Output = Result<Vec<String>>> + Send;

    /// Most recent sessions for the variants, newest first
    fn sessions_for(
        &self,
        variants: &IdVariantSet,
        limit: i64,
    ) -> impl std::future::Future<Output = Result<Vec<SessionLogRow>>> + Send;

    /// Observation times (unix seconds) for the variants since `since`
    fn session_times(
        &self,
        variants: &IdVariantSet,
        since: i64,
    ) -> impl std::future::Future<Output = Result<Vec<i64>>> + Send;
}

/// Read/write access to the per-region rating table
pub trait RatingStore {
    fn get_rating(
        &self,
        steamid2: &str,
    ) -> impl std::future::Future<Output = Result<Option<i64>>> + Send;

    /// True when the player has a stats row in this region
    fn has_stats(
        &self,
        steamid2: &str,
    ) -> impl std::future::Future<Output = Result<bool>> + Send;

    /// Apply all updates in one transaction; partial application must never
    /// be observable. Failure maps to `Error::Persistence`.
    fn set_ratings_atomic(
        &self,
        updates: &[RatingUpdate],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// Append-only reversion audit store
pub trait AuditLog {
    /// Append one record, returning its id
    fn append(
        &self,
        record: &ReversionRecord,
    ) -> impl std::future::Future<Output = Result<String>> + Send;

    /// Number of prior reversions recorded for this region + target
    fn count_prior(
        &self,
        region: &str,
        target_steam2: &str,
    ) -> impl std::future::Future<Output = Result<i64>> + Send;

    /// Paginated listing, newest first; returns (rows, total)
    fn list(
        &self,
        query: &HistoryQuery,
    ) -> impl std::future::Future<Output = Result<(Vec<ReversionRecordSummary>, i64)>> + Send;

    fn get(
        &self,
        id: &str,
    ) -> impl std::future::Future<Output = Result<Option<ReversionRecord>>> + Send;
}

/// Alt-link forest and permanent-name store
pub trait LinkRepository {
    /// Link row for this 64-bit id, if any
    fn find(
        &self,
        steam_id64: &str,
    ) -> impl std::future::Future<Output = Result<Option<AltLinkRow>>> + Send;

    /// True when any row names one of these variants as its main
    fn is_main_for_any(
        &self,
        variants: &IdVariantSet,
    ) -> impl std::future::Future<Output = Result<bool>> + Send;

    fn upsert_link(
        &self,
        alt64: &str,
        main64: &str,
        actor: &str,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Upsert a root row (`main_steam_id = NULL`) without disturbing an
    /// existing link
    fn upsert_root(
        &self,
        main64: &str,
        actor: &str,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Delete rows keyed by any of the variants; returns rows removed
    fn delete(
        &self,
        variants: &IdVariantSet,
    ) -> impl std::future::Future<Output = Result<u64>> + Send;

    fn all(&self) -> impl std::future::Future<Output = Result<Vec<AltLinkRow>>> + Send;

    fn perm_names(
        &self,
        ids: &[String],
    ) -> impl std::future::Future<Output = Result<Vec<PermNameRow>>> + Send;

    fn upsert_perm_name(
        &self,
        steam_id64: &str,
        name: Option<&str>,
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}
