//! Database initialization
//!
//! Region databases are normally created and populated by the game servers;
//! the schema bootstrap here exists so a fresh deployment (or a test) can
//! start against empty files. All statements are idempotent.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Open (creating if needed) a region match database
pub async fn init_region_database(db_path: &Path) -> Result<SqlitePool> {
    let pool = open_pool(db_path).await?;
    create_duels_table(&pool).await?;
    create_stats_table(&pool).await?;
    create_whois_logs_table(&pool).await?;
    Ok(pool)
}

/// Open (creating if needed) the ops database (links, names, audit)
pub async fn init_ops_database(db_path: &Path) -> Result<SqlitePool> {
    let pool = open_pool(db_path).await?;
    create_alt_links_table(&pool).await?;
    create_permname_table(&pool).await?;
    create_reversions_table(&pool).await?;
    Ok(pool)
}

async fn open_pool(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // WAL allows concurrent readers with one writer; the reversion apply
    // path holds the only write transaction
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;
    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    Ok(pool)
}

async fn create_duels_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS mgemod_duels (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            winner TEXT NOT NULL,
            loser TEXT NOT NULL,
            winner_previous_elo INTEGER,
            winner_new_elo INTEGER,
            loser_previous_elo INTEGER,
            loser_new_elo INTEGER,
            endtime INTEGER
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_duels_winner ON mgemod_duels(winner)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_duels_loser ON mgemod_duels(loser)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_stats_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS mgemod_stats (
            steamid TEXT PRIMARY KEY,
            rating INTEGER
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_whois_logs_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS whois_logs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            steam_id TEXT NOT NULL,
            ip TEXT NOT NULL,
            name TEXT,
            seen_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_whois_logs_steam_id ON whois_logs(steam_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_whois_logs_ip ON whois_logs(ip)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_alt_links_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS whois_alt_links (
            steam_id TEXT PRIMARY KEY,
            main_steam_id TEXT,
            linked_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            linked_by TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_alt_links_main ON whois_alt_links(main_steam_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_permname_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS whois_permname (
            steam_id TEXT PRIMARY KEY,
            name TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_reversions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS elo_reversions (
            id TEXT PRIMARY KEY,
            region TEXT NOT NULL,
            target_steam2 TEXT NOT NULL,
            target_steam64 TEXT,
            actor_steam64 TEXT,
            actor_name TEXT,
            request_json TEXT NOT NULL,
            rating_before INTEGER,
            rating_after INTEGER,
            matches_considered INTEGER NOT NULL,
            opponents_count INTEGER NOT NULL,
            opponents_total_delta INTEGER NOT NULL,
            changes_json TEXT NOT NULL,
            opponents_json TEXT NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_reversions_region_target
         ON elo_reversions(region, target_steam2, created_at)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
