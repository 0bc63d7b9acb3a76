//! Elo reversion engine
//!
//! Given a target account and a match selection, computes the rollback of
//! the rating changes those matches produced: the target is reset to the
//! configured baseline rating, and every opponent's own rating movement
//! from the selected matches is clawed back. Preview is a pure read; apply
//! executes all rating writes in one transaction and then appends exactly
//! one audit record.
//!
//! The target is deliberately reset to a fixed baseline instead of a
//! chained "undo" rating: selected matches need not be contiguous, so
//! replaying the chain has no well-defined order. The original rating data
//! stays in the duel rows either way.

use chrono::{DateTime, Utc};
use mgeops_common::db::DuelRow;
use mgeops_common::steamid::SteamId64;
use mgeops_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{error, info, warn};

use crate::repo::{AuditLog, DuelQuery, MatchRepository, RatingStore, RatingUpdate, Scope};

/// Which matches to consider for a reversion
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Selection {
    /// Explicit duel ids; when present, filters still apply on top
    #[serde(default)]
    pub match_ids: Option<Vec<i64>>,
    /// Inclusive endtime lower bound, unix seconds
    #[serde(default)]
    pub from: Option<i64>,
    /// Inclusive endtime upper bound, unix seconds
    #[serde(default)]
    pub to: Option<i64>,
    /// Only duels against this opponent (any identifier encoding)
    #[serde(default)]
    pub versus: Option<String>,
    #[serde(default)]
    pub scope: Scope,
}

/// Acting operator identity recorded in the audit trail
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Actor {
    pub steam_id64: Option<SteamId64>,
    pub name: Option<String>,
}

/// Side the target was on in one duel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Winner,
    Loser,
}

/// Match outcome from the target's perspective
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Win,
    Loss,
}

/// The target-side rating movement of one selected duel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    pub id: i64,
    pub role: Role,
    /// Opponent identifier as recorded in the duel row
    pub opponent: String,
    pub outcome: Outcome,
    /// Rating after the match (what the target currently carries from it)
    pub from: i64,
    /// Rating before the match (what a per-match undo would restore)
    pub to: i64,
    /// `from - to`: the rating the target gained or lost in this match
    pub delta: i64,
}

/// Aggregated consequence for one opponent across the selected duels
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpponentAdjustment {
    pub steamid2: String,
    /// Currently stored rating, if the opponent still has a stats row
    pub current_rating: Option<i64>,
    /// `current - delta`; present only when a write will happen
    pub final_rating: Option<i64>,
    /// Net rating the opponent gained from facing the target
    pub delta: i64,
}

/// Full computed result of a reversion, identical for preview and apply
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReversionSummary {
    pub region: String,
    pub target_steam2: String,
    pub target_steam64: SteamId64,
    pub matches_considered: usize,
    pub changes: Vec<Change>,
    pub opponents: Vec<OpponentAdjustment>,
    /// Target's currently stored rating, if any
    pub current_rating: Option<i64>,
    /// The baseline rating the target is reset to
    pub final_rating: i64,
    /// Prior audit records for this region + target (informational)
    pub prior_reversions: i64,
}

/// Audit record appended once per successful apply; never mutated
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReversionRecord {
    pub region: String,
    pub target_steam2: String,
    pub target_steam64: SteamId64,
    pub actor_steam64: Option<SteamId64>,
    pub actor_name: Option<String>,
    pub request: Selection,
    pub rating_before: Option<i64>,
    pub rating_after: Option<i64>,
    pub matches_considered: i64,
    pub opponents_count: i64,
    pub opponents_total_delta: i64,
    pub changes: Vec<Change>,
    pub opponents: Vec<OpponentAdjustment>,
    pub created_at: DateTime<Utc>,
}

/// Listing row for the audit history view
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReversionRecordSummary {
    pub id: String,
    pub region: String,
    pub target_steam2: String,
    pub target_steam64: Option<SteamId64>,
    pub actor_name: Option<String>,
    pub rating_before: Option<i64>,
    pub rating_after: Option<i64>,
    pub matches_considered: i64,
    pub opponents_count: i64,
    pub opponents_total_delta: i64,
    pub created_at: DateTime<Utc>,
}

/// Result of a successful apply
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppliedReversion {
    pub summary: ReversionSummary,
    pub audit_id: String,
}

/// The reversion engine, generic over its repositories
pub struct ReversionEngine<'a, M, R, A> {
    matches: &'a M,
    ratings: &'a R,
    audit: &'a A,
    baseline_rating: i64,
}

impl<'a, M, R, A> ReversionEngine<'a, M, R, A>
where
    M: MatchRepository,
    R: RatingStore,
    A: AuditLog,
{
    pub fn new(matches: &'a M, ratings: &'a R, audit: &'a A, baseline_rating: i64) -> Self {
        Self {
            matches,
            ratings,
            audit,
            baseline_rating,
        }
    }

    /// Compute the reversion without writing anything
    ///
    /// An empty selection result is a valid zero-change summary, not an
    /// error.
    pub async fn preview(
        &self,
        region: &str,
        target: &str,
        selection: &Selection,
    ) -> Result<ReversionSummary> {
        self.compute(region, target, selection).await
    }

    /// Compute the reversion, then apply it atomically and append one
    /// audit record
    ///
    /// All rating writes (target + qualifying opponents) happen in a single
    /// transaction; on failure nothing is written and no audit record
    /// exists.
    pub async fn apply(
        &self,
        region: &str,
        target: &str,
        selection: &Selection,
        actor: &Actor,
    ) -> Result<AppliedReversion> {
        let summary = self.compute(region, target, selection).await?;

        let mut updates = Vec::new();
        if summary.current_rating.is_some() {
            updates.push(RatingUpdate {
                steamid2: summary.target_steam2.clone(),
                rating: summary.final_rating,
            });
        } else {
            // Nothing to reset: the target has no stats row in this region
            warn!(
                region = region,
                target = %summary.target_steam2,
                "reversion target has no stored rating; skipping target write"
            );
        }
        for opp in &summary.opponents {
            if let Some(final_rating) = opp.final_rating {
                updates.push(RatingUpdate {
                    steamid2: opp.steamid2.clone(),
                    rating: final_rating,
                });
            }
        }

        if !updates.is_empty() {
            self.ratings.set_ratings_atomic(&updates).await?;
        }

        let record = ReversionRecord {
            region: summary.region.clone(),
            target_steam2: summary.target_steam2.clone(),
            target_steam64: summary.target_steam64,
            actor_steam64: actor.steam_id64,
            actor_name: actor.name.clone(),
            request: selection.clone(),
            rating_before: summary.current_rating,
            rating_after: summary.current_rating.map(|_| summary.final_rating),
            matches_considered: summary.matches_considered as i64,
            opponents_count: summary.opponents.len() as i64,
            opponents_total_delta: summary.opponents.iter().map(|o| o.delta).sum(),
            changes: summary.changes.clone(),
            opponents: summary.opponents.clone(),
            created_at: Utc::now(),
        };

        let audit_id = match self.audit.append(&record).await {
            Ok(id) => id,
            Err(e) => {
                // The rating transaction has already committed; surface the
                // failure loudly rather than pretending nothing happened
                error!(
                    region = region,
                    target = %summary.target_steam2,
                    rows = updates.len(),
                    "audit append failed AFTER rating transaction committed: {}",
                    e
                );
                return Err(Error::Persistence(format!(
                    "ratings updated but audit append failed: {}",
                    e
                )));
            }
        };

        info!(
            region = region,
            target = %summary.target_steam2,
            matches = summary.matches_considered,
            rows = updates.len(),
            audit_id = %audit_id,
            "applied elo reversion"
        );

        Ok(AppliedReversion { summary, audit_id })
    }

    async fn compute(
        &self,
        region: &str,
        target: &str,
        selection: &Selection,
    ) -> Result<ReversionSummary> {
        let target_id = SteamId64::parse(target)?;
        // Match tables are keyed by the legacy form
        let target_steam2 = target_id.steam2_canonical()?;

        let versus_steam2 = match &selection.versus {
            Some(raw) => Some(SteamId64::parse(raw)?.steam2_canonical()?),
            None => None,
        };

        let query = DuelQuery {
            target_steam2: target_steam2.clone(),
            scope: selection.scope,
            match_ids: selection.match_ids.clone(),
            from: selection.from,
            to: selection.to,
            versus_steam2,
        };

        let duels = self.matches.find_duels(&query).await?;

        let mut changes = Vec::new();
        // BTreeMap keeps opponent output order deterministic
        let mut opponent_deltas: BTreeMap<String, i64> = BTreeMap::new();

        for duel in &duels {
            let (role, outcome, opponent) = if duel.winner == target_steam2 {
                (Role::Winner, Outcome::Win, duel.loser.clone())
            } else {
                (Role::Loser, Outcome::Loss, duel.winner.clone())
            };

            if let Some((from, to)) = target_side_ratings(duel, role) {
                changes.push(Change {
                    id: duel.id,
                    role,
                    opponent: opponent.clone(),
                    outcome,
                    from,
                    to,
                    delta: from - to,
                });
            }

            if let Some((opp_new, opp_prev)) = opponent_side_ratings(duel, role) {
                *opponent_deltas.entry(opponent).or_insert(0) += opp_new - opp_prev;
            }
        }

        let mut opponents = Vec::new();
        for (steamid2, delta) in opponent_deltas {
            if delta == 0 {
                continue;
            }
            let current_rating = self.ratings.get_rating(&steamid2).await?;
            let final_rating = current_rating.map(|current| current - delta);
            opponents.push(OpponentAdjustment {
                steamid2,
                current_rating,
                final_rating,
                delta,
            });
        }

        let current_rating = self.ratings.get_rating(&target_steam2).await?;
        let prior_reversions = self.audit.count_prior(region, &target_steam2).await?;

        Ok(ReversionSummary {
            region: region.to_string(),
            target_steam2,
            target_steam64: target_id,
            matches_considered: duels.len(),
            changes,
            opponents,
            current_rating,
            final_rating: self.baseline_rating,
            prior_reversions,
        })
    }
}

/// Target-side (new, previous) rating pair, when the row recorded both
fn target_side_ratings(duel: &DuelRow, role: Role) -> Option<(i64, i64)> {
    match role {
        Role::Winner => Some((duel.winner_new_elo?, duel.winner_previous_elo?)),
        Role::Loser => Some((duel.loser_new_elo?, duel.loser_previous_elo?)),
    }
}

/// Opponent-side (new, previous) rating pair, when the row recorded both
fn opponent_side_ratings(duel: &DuelRow, target_role: Role) -> Option<(i64, i64)> {
    match target_role {
        Role::Winner => Some((duel.loser_new_elo?, duel.loser_previous_elo?)),
        Role::Loser => Some((duel.winner_new_elo?, duel.winner_previous_elo?)),
    }
}
