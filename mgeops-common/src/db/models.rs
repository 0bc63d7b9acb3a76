//! Database models
//!
//! Row shapes for the region match databases (populated by the game
//! servers; read-only here except the `rating` column) and the ops
//! database (alt links, permanent names, reversion audit records).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One completed duel from `mgemod_duels`
///
/// The four rating columns are nullable: older plugin versions did not
/// record them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuelRow {
    pub id: i64,
    /// Winner identifier as recorded (legacy `STEAM_0:Y:Z` form)
    pub winner: String,
    /// Loser identifier as recorded (legacy `STEAM_0:Y:Z` form)
    pub loser: String,
    pub winner_previous_elo: Option<i64>,
    pub winner_new_elo: Option<i64>,
    pub loser_previous_elo: Option<i64>,
    pub loser_new_elo: Option<i64>,
    /// Match end, unix seconds
    pub endtime: Option<i64>,
}

/// One observed connection from `whois_logs`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionLogRow {
    /// Identifier exactly as the logging plugin recorded it (any encoding)
    pub steam_id: String,
    pub ip: String,
    pub name: Option<String>,
    /// Observation time, unix seconds
    pub seen_at: i64,
}

/// Per-player rating row from `mgemod_stats`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsRow {
    /// Legacy `STEAM_0:Y:Z` identifier
    pub steamid: String,
    pub rating: Option<i64>,
}

/// One edge of the alt-link forest from `whois_alt_links`
///
/// `main_steam_id = NULL` marks a declared main with no designated alts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AltLinkRow {
    pub steam_id: String,
    pub main_steam_id: Option<String>,
    pub linked_at: DateTime<Utc>,
    pub linked_by: Option<String>,
}

/// Permanent display name from `whois_permname`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermNameRow {
    pub steam_id: String,
    pub name: Option<String>,
}
