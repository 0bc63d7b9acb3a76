//! SQLite repository implementations
//!
//! Region repositories share one pool per region database; the audit and
//! link repositories share the ops pool. Every `IN (...)` list is built
//! from bound placeholders, never string interpolation: identifier strings
//! come from user input.

use chrono::{DateTime, Utc};
use mgeops_common::db::{AltLinkRow, DuelRow, PermNameRow, SessionLogRow};
use mgeops_common::steamid::IdVariantSet;
use mgeops_common::{Error, Result};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::repo::{
    AuditLog, DuelQuery, HistoryQuery, LinkRepository, MatchRepository, RatingStore, RatingUpdate,
    Scope, SessionRepository,
};
use crate::revert::{ReversionRecord, ReversionRecordSummary};

/// `?, ?, ?` for an IN list of `n` values
fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

/// A deferred bind value for dynamically assembled queries
enum Bind {
    Int(i64),
    Text(String),
}

/// WHERE clause + binds shared by `find_duels` and `count_duels`
fn duel_where(query: &DuelQuery) -> (String, Vec<Bind>) {
    let mut clauses: Vec<String> = Vec::new();
    let mut binds: Vec<Bind> = Vec::new();

    match query.scope {
        Scope::All => {
            clauses.push("(winner = ? OR loser = ?)".to_string());
            binds.push(Bind::Text(query.target_steam2.clone()));
            binds.push(Bind::Text(query.target_steam2.clone()));
        }
        Scope::Wins => {
            clauses.push("winner = ?".to_string());
            binds.push(Bind::Text(query.target_steam2.clone()));
        }
        Scope::Losses => {
            clauses.push("loser = ?".to_string());
            binds.push(Bind::Text(query.target_steam2.clone()));
        }
    }

    if let Some(ids) = &query.match_ids {
        if ids.is_empty() {
            // An explicit empty selection matches nothing
            clauses.push("0 = 1".to_string());
        } else {
            clauses.push(format!("id IN ({})", placeholders(ids.len())));
            binds.extend(ids.iter().map(|&id| Bind::Int(id)));
        }
    }
    if let Some(from) = query.from {
        clauses.push("endtime >= ?".to_string());
        binds.push(Bind::Int(from));
    }
    if let Some(to) = query.to {
        clauses.push("endtime <= ?".to_string());
        binds.push(Bind::Int(to));
    }
    if let Some(versus) = &query.versus_steam2 {
        clauses.push(
            "((winner = ? AND loser = ?) OR (winner = ? AND loser = ?))".to_string(),
        );
        binds.push(Bind::Text(query.target_steam2.clone()));
        binds.push(Bind::Text(versus.clone()));
        binds.push(Bind::Text(versus.clone()));
        binds.push(Bind::Text(query.target_steam2.clone()));
    }

    (clauses.join(" AND "), binds)
}

fn bind_all<'q>(
    mut q: sqlx::query::QueryAs<'q, sqlx::Sqlite, DuelTuple, sqlx::sqlite::SqliteArguments<'q>>,
    binds: &[Bind],
) -> sqlx::query::QueryAs<'q, sqlx::Sqlite, DuelTuple, sqlx::sqlite::SqliteArguments<'q>> {
    for bind in binds {
        q = match bind {
            Bind::Int(v) => q.bind(*v),
            Bind::Text(v) => q.bind(v.clone()),
        };
    }
    q
}

type DuelTuple = (
    i64,
    String,
    String,
    Option<i64>,
    Option<i64>,
    Option<i64>,
    Option<i64>,
    Option<i64>,
);

fn duel_from_tuple(t: DuelTuple) -> DuelRow {
    DuelRow {
        id: t.0,
        winner: t.1,
        loser: t.2,
        winner_previous_elo: t.3,
        winner_new_elo: t.4,
        loser_previous_elo: t.5,
        loser_new_elo: t.6,
        endtime: t.7,
    }
}

/// Duel records of one region database
#[derive(Clone)]
pub struct SqliteMatchRepository {
    pool: SqlitePool,
}

impl SqliteMatchRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl MatchRepository for SqliteMatchRepository {
    async fn find_duels(&self, query: &DuelQuery) -> Result<Vec<DuelRow>> {
        let (where_clause, binds) = duel_where(query);
        let sql = format!(
            "SELECT id, winner, loser, winner_previous_elo, winner_new_elo, \
             loser_previous_elo, loser_new_elo, endtime \
             FROM mgemod_duels WHERE {} ORDER BY id DESC",
            where_clause
        );
        let rows = bind_all(sqlx::query_as::<_, DuelTuple>(&sql), &binds)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(duel_from_tuple).collect())
    }

    async fn count_duels(&self, query: &DuelQuery) -> Result<i64> {
        let (where_clause, binds) = duel_where(query);
        let sql = format!("SELECT COUNT(*) FROM mgemod_duels WHERE {}", where_clause);
        let mut q = sqlx::query_as::<_, (i64,)>(&sql);
        for bind in &binds {
            q = match bind {
                Bind::Int(v) => q.bind(*v),
                Bind::Text(v) => q.bind(v.clone()),
            };
        }
        let (count,) = q.fetch_one(&self.pool).await?;
        Ok(count)
    }

    async fn last_duel_endtime(&self, variants: &IdVariantSet) -> Result<Option<i64>> {
        if variants.is_empty() {
            return Ok(None);
        }
        let ph = placeholders(variants.len());
        let sql = format!(
            "SELECT endtime FROM mgemod_duels \
             WHERE winner IN ({ph}) OR loser IN ({ph}) \
             ORDER BY id DESC LIMIT 1"
        );
        let mut q = sqlx::query_as::<_, (Option<i64>,)>(&sql);
        for v in variants.iter().chain(variants.iter()) {
            q = q.bind(v.to_string());
        }
        let row = q.fetch_optional(&self.pool).await?;
        Ok(row.and_then(|(endtime,)| endtime))
    }
}

/// Connection logs of one region database
#[derive(Clone)]
pub struct SqliteSessionRepository {
    pool: SqlitePool,
}

impl SqliteSessionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

type SessionTuple = (String, String, Option<String>, i64);

fn session_from_tuple(t: SessionTuple) -> SessionLogRow {
    SessionLogRow {
        steam_id: t.0,
        ip: t.1,
        name: t.2,
        seen_at: t.3,
    }
}

impl SessionRepository for SqliteSessionRepository {
    async fn distinct_ips(&self, variants: &IdVariantSet, since: i64) -> Result<Vec<String>> {
        if variants.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT DISTINCT ip FROM whois_logs \
             WHERE steam_id IN ({}) AND seen_at >= ? AND ip != '' \
             ORDER BY ip",
            placeholders(variants.len())
        );
        let mut q = sqlx::query_as::<_, (String,)>(&sql);
        for v in variants.iter() {
            q = q.bind(v.to_string());
        }
        let rows = q.bind(since).fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(|(ip,)| ip).collect())
    }

    async fn sessions_on_ips(&self, ips: &[String], since: i64) -> Result<Vec<SessionLogRow>> {
        if ips.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT steam_id, ip, name, seen_at FROM whois_logs \
             WHERE ip IN ({}) AND seen_at >= ?",
            placeholders(ips.len())
        );
        let mut q = sqlx::query_as::<_, SessionTuple>(&sql);
        for ip in ips {
            q = q.bind(ip);
        }
        let rows = q.bind(since).fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(session_from_tuple).collect())
    }

    async fn distinct_names(&self, variants: &IdVariantSet, since: i64) -> Result<Vec<String>> {
        if variants.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT DISTINCT name FROM whois_logs \
             WHERE steam_id IN ({}) AND seen_at >= ? \
             AND name IS NOT NULL AND name != '' \
             ORDER BY name",
            placeholders(variants.len())
        );
        let mut q = sqlx::query_as::<_, (String,)>(&sql);
        for v in variants.iter() {
            q = q.bind(v.to_string());
        }
        let rows = q.bind(since).fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(|(name,)| name).collect())
    }

    async fn sessions_for(&self, variants: &IdVariantSet, limit: i64) -> Result<Vec<SessionLogRow>> {
        if variants.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT steam_id, ip, name, seen_at FROM whois_logs \
             WHERE steam_id IN ({}) ORDER BY seen_at DESC LIMIT ?",
            placeholders(variants.len())
        );
        let mut q = sqlx::query_as::<_, SessionTuple>(&sql);
        for v in variants.iter() {
            q = q.bind(v.to_string());
        }
        let rows = q.bind(limit).fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(session_from_tuple).collect())
    }

    async fn session_times(&self, variants: &IdVariantSet, since: i64) -> Result<Vec<i64>> {
        if variants.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT seen_at FROM whois_logs WHERE steam_id IN ({}) AND seen_at >= ?",
            placeholders(variants.len())
        );
        let mut q = sqlx::query_as::<_, (i64,)>(&sql);
        for v in variants.iter() {
            q = q.bind(v.to_string());
        }
        let rows = q.bind(since).fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(|(seen_at,)| seen_at).collect())
    }
}

/// Rating table of one region database
#[derive(Clone)]
pub struct SqliteRatingStore {
    pool: SqlitePool,
}

impl SqliteRatingStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl RatingStore for SqliteRatingStore {
    async fn get_rating(&self, steamid2: &str) -> Result<Option<i64>> {
        let row = sqlx::query_as::<_, (Option<i64>,)>(
            "SELECT rating FROM mgemod_stats WHERE steamid = ?",
        )
        .bind(steamid2)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.and_then(|(rating,)| rating))
    }

    async fn has_stats(&self, steamid2: &str) -> Result<bool> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM mgemod_stats WHERE steamid = ?")
                .bind(steamid2)
                .fetch_one(&self.pool)
                .await?;
        Ok(count > 0)
    }

    async fn set_ratings_atomic(&self, updates: &[RatingUpdate]) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| Error::Persistence(format!("begin failed: {}", e)))?;

        for update in updates {
            sqlx::query("UPDATE mgemod_stats SET rating = ? WHERE steamid = ?")
                .bind(update.rating)
                .bind(&update.steamid2)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    Error::Persistence(format!("update for {} failed: {}", update.steamid2, e))
                })?;
        }

        tx.commit()
            .await
            .map_err(|e| Error::Persistence(format!("commit failed: {}", e)))
    }
}

/// Reversion audit records in the ops database
#[derive(Clone)]
pub struct SqliteAuditLog {
    pool: SqlitePool,
}

impl SqliteAuditLog {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| Error::Internal(format!("serialize: {}", e)))
}

fn from_json<T: serde::de::DeserializeOwned>(value: &str) -> Result<T> {
    serde_json::from_str(value).map_err(|e| Error::Internal(format!("deserialize: {}", e)))
}

impl AuditLog for SqliteAuditLog {
    async fn append(&self, record: &ReversionRecord) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        sqlx::query(
            r#"
            INSERT INTO elo_reversions (
                id, region, target_steam2, target_steam64,
                actor_steam64, actor_name, request_json,
                rating_before, rating_after,
                matches_considered, opponents_count, opponents_total_delta,
                changes_json, opponents_json, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&record.region)
        .bind(&record.target_steam2)
        .bind(record.target_steam64.to_string())
        .bind(record.actor_steam64.map(|a| a.to_string()))
        .bind(&record.actor_name)
        .bind(to_json(&record.request)?)
        .bind(record.rating_before)
        .bind(record.rating_after)
        .bind(record.matches_considered)
        .bind(record.opponents_count)
        .bind(record.opponents_total_delta)
        .bind(to_json(&record.changes)?)
        .bind(to_json(&record.opponents)?)
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;
        Ok(id)
    }

    async fn count_prior(&self, region: &str, target_steam2: &str) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM elo_reversions WHERE region = ? AND target_steam2 = ?",
        )
        .bind(region)
        .bind(target_steam2)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn list(&self, query: &HistoryQuery) -> Result<(Vec<ReversionRecordSummary>, i64)> {
        let take = query.take.clamp(1, 200);
        let skip = query.skip.max(0);

        type SummaryTuple = (
            String,
            String,
            String,
            Option<String>,
            Option<String>,
            Option<i64>,
            Option<i64>,
            i64,
            i64,
            i64,
            DateTime<Utc>,
        );

        let (rows, total) = if let Some(target) = &query.target_steam2 {
            let rows = sqlx::query_as::<_, SummaryTuple>(
                "SELECT id, region, target_steam2, target_steam64, actor_name, \
                 rating_before, rating_after, matches_considered, opponents_count, \
                 opponents_total_delta, created_at \
                 FROM elo_reversions WHERE region = ? AND target_steam2 = ? \
                 ORDER BY created_at DESC LIMIT ? OFFSET ?",
            )
            .bind(&query.region)
            .bind(target)
            .bind(take)
            .bind(skip)
            .fetch_all(&self.pool)
            .await?;
            let (total,): (i64,) = sqlx::query_as(
                "SELECT COUNT(*) FROM elo_reversions WHERE region = ? AND target_steam2 = ?",
            )
            .bind(&query.region)
            .bind(target)
            .fetch_one(&self.pool)
            .await?;
            (rows, total)
        } else {
            let rows = sqlx::query_as::<_, SummaryTuple>(
                "SELECT id, region, target_steam2, target_steam64, actor_name, \
                 rating_before, rating_after, matches_considered, opponents_count, \
                 opponents_total_delta, created_at \
                 FROM elo_reversions WHERE region = ? \
                 ORDER BY created_at DESC LIMIT ? OFFSET ?",
            )
            .bind(&query.region)
            .bind(take)
            .bind(skip)
            .fetch_all(&self.pool)
            .await?;
            let (total,): (i64,) =
                sqlx::query_as("SELECT COUNT(*) FROM elo_reversions WHERE region = ?")
                    .bind(&query.region)
                    .fetch_one(&self.pool)
                    .await?;
            (rows, total)
        };

        let summaries = rows
            .into_iter()
            .map(|t| ReversionRecordSummary {
                id: t.0,
                region: t.1,
                target_steam2: t.2,
                target_steam64: t.3.and_then(|s| mgeops_common::SteamId64::parse(&s).ok()),
                actor_name: t.4,
                rating_before: t.5,
                rating_after: t.6,
                matches_considered: t.7,
                opponents_count: t.8,
                opponents_total_delta: t.9,
                created_at: t.10,
            })
            .collect();

        Ok((summaries, total))
    }

    async fn get(&self, id: &str) -> Result<Option<ReversionRecord>> {
        type RecordTuple = (
            String,
            String,
            String,
            Option<String>,
            Option<String>,
            String,
            Option<i64>,
            Option<i64>,
            i64,
            i64,
            i64,
            String,
            String,
            DateTime<Utc>,
        );

        let row = sqlx::query_as::<_, RecordTuple>(
            "SELECT region, target_steam2, target_steam64, actor_steam64, actor_name, \
             request_json, rating_before, rating_after, matches_considered, \
             opponents_count, opponents_total_delta, changes_json, opponents_json, \
             created_at \
             FROM elo_reversions WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(t) = row else {
            return Ok(None);
        };

        let target_steam64 = mgeops_common::SteamId64::parse(&t.2)
            .map_err(|_| Error::Internal(format!("corrupt target_steam64 in audit row {}", id)))?;

        Ok(Some(ReversionRecord {
            region: t.0,
            target_steam2: t.1,
            target_steam64,
            actor_steam64: t.3.and_then(|s| mgeops_common::SteamId64::parse(&s).ok()),
            actor_name: t.4,
            request: from_json(&t.5)?,
            rating_before: t.6,
            rating_after: t.7,
            matches_considered: t.8,
            opponents_count: t.9,
            opponents_total_delta: t.10,
            changes: from_json(&t.11)?,
            opponents: from_json(&t.12)?,
            created_at: t.13,
        }))
    }
}

/// Alt-link and permanent-name tables in the ops database
#[derive(Clone)]
pub struct SqliteLinkRepository {
    pool: SqlitePool,
}

impl SqliteLinkRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

type LinkTuple = (String, Option<String>, DateTime<Utc>, Option<String>);

fn link_from_tuple(t: LinkTuple) -> AltLinkRow {
    AltLinkRow {
        steam_id: t.0,
        main_steam_id: t.1,
        linked_at: t.2,
        linked_by: t.3,
    }
}

impl LinkRepository for SqliteLinkRepository {
    async fn find(&self, steam_id64: &str) -> Result<Option<AltLinkRow>> {
        let row = sqlx::query_as::<_, LinkTuple>(
            "SELECT steam_id, main_steam_id, linked_at, linked_by \
             FROM whois_alt_links WHERE steam_id = ?",
        )
        .bind(steam_id64)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(link_from_tuple))
    }

    async fn is_main_for_any(&self, variants: &IdVariantSet) -> Result<bool> {
        if variants.is_empty() {
            return Ok(false);
        }
        let sql = format!(
            "SELECT COUNT(*) FROM whois_alt_links WHERE main_steam_id IN ({})",
            placeholders(variants.len())
        );
        let mut q = sqlx::query_as::<_, (i64,)>(&sql);
        for v in variants.iter() {
            q = q.bind(v.to_string());
        }
        let (count,) = q.fetch_one(&self.pool).await?;
        Ok(count > 0)
    }

    async fn upsert_link(&self, alt64: &str, main64: &str, actor: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO whois_alt_links (steam_id, main_steam_id, linked_by) \
             VALUES (?, ?, ?) \
             ON CONFLICT(steam_id) DO UPDATE SET \
             main_steam_id = excluded.main_steam_id, linked_by = excluded.linked_by",
        )
        .bind(alt64)
        .bind(main64)
        .bind(actor)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn upsert_root(&self, main64: &str, actor: &str) -> Result<()> {
        // DO NOTHING keeps an existing link row intact
        sqlx::query(
            "INSERT INTO whois_alt_links (steam_id, main_steam_id, linked_by) \
             VALUES (?, NULL, ?) \
             ON CONFLICT(steam_id) DO NOTHING",
        )
        .bind(main64)
        .bind(actor)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete(&self, variants: &IdVariantSet) -> Result<u64> {
        if variants.is_empty() {
            return Ok(0);
        }
        let sql = format!(
            "DELETE FROM whois_alt_links WHERE steam_id IN ({})",
            placeholders(variants.len())
        );
        let mut q = sqlx::query(&sql);
        for v in variants.iter() {
            q = q.bind(v.to_string());
        }
        let result = q.execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn all(&self) -> Result<Vec<AltLinkRow>> {
        let rows = sqlx::query_as::<_, LinkTuple>(
            "SELECT steam_id, main_steam_id, linked_at, linked_by \
             FROM whois_alt_links ORDER BY steam_id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(link_from_tuple).collect())
    }

    async fn perm_names(&self, ids: &[String]) -> Result<Vec<PermNameRow>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT steam_id, name FROM whois_permname WHERE steam_id IN ({})",
            placeholders(ids.len())
        );
        let mut q = sqlx::query_as::<_, (String, Option<String>)>(&sql);
        for id in ids {
            q = q.bind(id);
        }
        let rows = q.fetch_all(&self.pool).await?;
        Ok(rows
            .into_iter()
            .map(|(steam_id, name)| PermNameRow { steam_id, name })
            .collect())
    }

    async fn upsert_perm_name(&self, steam_id64: &str, name: Option<&str>) -> Result<()> {
        sqlx::query(
            "INSERT INTO whois_permname (steam_id, name) VALUES (?, ?) \
             ON CONFLICT(steam_id) DO UPDATE SET name = excluded.name",
        )
        .bind(steam_id64)
        .bind(name)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
