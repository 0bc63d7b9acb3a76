//! Shared test fixtures: a two-region deployment over temporary SQLite
//! files, with seeding helpers for duels, stats, and session logs.

// Not every test binary uses every helper
#![allow(dead_code)]

use mgeops_common::config::{RegionConfig, ServiceConfig};
use mgeops_common::db::init_ops_database;
use mgeops_wi::regions::RegionSet;
use mgeops_wi::repo::sqlite::{SqliteAuditLog, SqliteLinkRepository};
use mgeops_wi::AppState;
use sqlx::SqlitePool;
use std::path::Path;

pub struct TestDeployment {
    pub state: AppState,
    pub ar_pool: SqlitePool,
    pub br_pool: SqlitePool,
    // Held for the lifetime of the deployment; dropping deletes the files
    _dir: tempfile::TempDir,
}

/// Open a second pool onto an already-initialized database file
async fn connect(path: &Path) -> SqlitePool {
    SqlitePool::connect(&format!("sqlite://{}?mode=rwc", path.display()))
        .await
        .expect("connect to test database")
}

/// Build a two-region deployment; `api_secret` enables auth when set
pub async fn deployment(api_secret: Option<&str>) -> TestDeployment {
    let dir = tempfile::tempdir().expect("tempdir");
    let ar_path = dir.path().join("mge-ar.db");
    let br_path = dir.path().join("mge-br.db");
    let ops_path = dir.path().join("ops.db");

    let config = ServiceConfig {
        listen: "127.0.0.1:0".to_string(),
        regions: vec![
            RegionConfig {
                name: "ar".to_string(),
                db_path: ar_path.clone(),
            },
            RegionConfig {
                name: "br".to_string(),
                db_path: br_path.clone(),
            },
        ],
        ops_db_path: ops_path.clone(),
        baseline_rating: 1600,
        steam_api_key: None,
        api_secret: api_secret.map(|s| s.to_string()),
    };

    let regions = RegionSet::open(&config.regions).await.expect("open regions");
    let ops_pool = init_ops_database(&ops_path).await.expect("init ops db");
    let links = SqliteLinkRepository::new(ops_pool.clone());
    let audit = SqliteAuditLog::new(ops_pool);

    let ar_pool = connect(&ar_path).await;
    let br_pool = connect(&br_path).await;

    TestDeployment {
        state: AppState::new(regions, links, audit, config),
        ar_pool,
        br_pool,
        _dir: dir,
    }
}

pub async fn seed_duel(
    pool: &SqlitePool,
    winner: &str,
    loser: &str,
    winner_elo: Option<(i64, i64)>,
    loser_elo: Option<(i64, i64)>,
    endtime: i64,
) -> i64 {
    let result = sqlx::query(
        "INSERT INTO mgemod_duels \
         (winner, loser, winner_previous_elo, winner_new_elo, \
          loser_previous_elo, loser_new_elo, endtime) \
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(winner)
    .bind(loser)
    .bind(winner_elo.map(|(prev, _)| prev))
    .bind(winner_elo.map(|(_, new)| new))
    .bind(loser_elo.map(|(prev, _)| prev))
    .bind(loser_elo.map(|(_, new)| new))
    .bind(endtime)
    .execute(pool)
    .await
    .expect("seed duel");
    result.last_insert_rowid()
}

pub async fn seed_stats(pool: &SqlitePool, steamid2: &str, rating: i64) {
    sqlx::query("INSERT INTO mgemod_stats (steamid, rating) VALUES (?, ?)")
        .bind(steamid2)
        .bind(rating)
        .execute(pool)
        .await
        .expect("seed stats");
}

pub async fn seed_session(
    pool: &SqlitePool,
    steam_id: &str,
    ip: &str,
    name: &str,
    seen_at: i64,
) {
    sqlx::query("INSERT INTO whois_logs (steam_id, ip, name, seen_at) VALUES (?, ?, ?, ?)")
        .bind(steam_id)
        .bind(ip)
        .bind(name)
        .bind(seen_at)
        .execute(pool)
        .await
        .expect("seed session");
}

pub async fn rating_of(pool: &SqlitePool, steamid2: &str) -> Option<i64> {
    let row: Option<(Option<i64>,)> =
        sqlx::query_as("SELECT rating FROM mgemod_stats WHERE steamid = ?")
            .bind(steamid2)
            .fetch_optional(pool)
            .await
            .expect("query rating");
    row.and_then(|(rating,)| rating)
}
