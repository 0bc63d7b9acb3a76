//! Region set: per-region repositories and degraded fan-out lookups
//!
//! Each region is an independent match database. Cross-region views (does
//! this player exist here, what do they rate) query every region
//! concurrently and merge by region name; one region being down must not
//! take the whole view with it, so each result carries an availability
//! flag instead.

use futures::future::join_all;
use mgeops_common::db::init_region_database;
use mgeops_common::steamid::SteamId64;
use mgeops_common::{config::RegionConfig, Error, Result};
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::warn;

use crate::repo::{MatchRepository, RatingStore};
use crate::repo::sqlite::{SqliteMatchRepository, SqliteRatingStore, SqliteSessionRepository};

/// One region's repositories, sharing a single pool
#[derive(Clone)]
pub struct Region {
    pub name: String,
    pub matches: SqliteMatchRepository,
    pub sessions: SqliteSessionRepository,
    pub ratings: SqliteRatingStore,
}

impl Region {
    pub fn new(name: String, pool: SqlitePool) -> Self {
        Self {
            name,
            matches: SqliteMatchRepository::new(pool.clone()),
            sessions: SqliteSessionRepository::new(pool.clone()),
            ratings: SqliteRatingStore::new(pool),
        }
    }
}

/// Per-region rating lookup result
#[derive(Debug, Clone, Serialize)]
pub struct RegionRating {
    pub region: String,
    /// False when the region's database could not be queried
    pub available: bool,
    pub rating: Option<i64>,
}

/// Per-region presence lookup result
#[derive(Debug, Clone, Serialize)]
pub struct RegionPresence {
    pub region: String,
    pub available: bool,
    pub has_stats: bool,
    /// Endtime of the player's most recent duel, unix seconds
    pub last_seen: Option<i64>,
}

/// All configured regions, in config order
pub struct RegionSet {
    regions: Vec<Region>,
}

impl RegionSet {
    /// Open every configured region database
    pub async fn open(configs: &[RegionConfig]) -> Result<Self> {
        let mut regions = Vec::with_capacity(configs.len());
        for config in configs {
            let pool = init_region_database(&config.db_path).await?;
            regions.push(Region::new(config.name.clone(), pool));
        }
        Ok(Self { regions })
    }

    #[cfg(test)]
    pub fn from_regions(regions: Vec<Region>) -> Self {
        Self { regions }
    }

    pub fn get(&self, name: &str) -> Result<&Region> {
        self.regions
            .iter()
            .find(|r| r.name == name)
            .ok_or_else(|| Error::NotFound(format!("unknown region: {}", name)))
    }

    pub fn names(&self) -> Vec<&str> {
        self.regions.iter().map(|r| r.name.as_str()).collect()
    }

    /// Current rating per region, degraded per-region on failure
    pub async fn rating_overview(&self, id: SteamId64) -> Result<Vec<RegionRating>> {
        let steamid2 = id.steam2_canonical()?;

        let lookups = self.regions.iter().map(|region| {
            let steamid2 = steamid2.clone();
            async move {
                match region.ratings.get_rating(&steamid2).await {
                    Ok(rating) => RegionRating {
                        region: region.name.clone(),
                        available: true,
                        rating,
                    },
                    Err(e) => {
                        warn!(region = %region.name, "rating lookup failed: {}", e);
                        RegionRating {
                            region: region.name.clone(),
                            available: false,
                            rating: None,
                        }
                    }
                }
            }
        });

        Ok(join_all(lookups).await)
    }

    /// Stats-row presence and last-seen per region, degraded per-region
    pub async fn presence(&self, id: SteamId64) -> Result<Vec<RegionPresence>> {
        let steamid2 = id.steam2_canonical()?;
        let variants = id.variants();

        let lookups = self.regions.iter().map(|region| {
            let steamid2 = steamid2.clone();
            let variants = variants.clone();
            async move {
                let has_stats = region.ratings.has_stats(&steamid2).await;
                let last_seen = region.matches.last_duel_endtime(&variants).await;
                match (has_stats, last_seen) {
                    (Ok(has_stats), Ok(last_seen)) => RegionPresence {
                        region: region.name.clone(),
                        available: true,
                        has_stats,
                        last_seen,
                    },
                    (has_stats, last_seen) => {
                        if let Err(e) = &has_stats {
                            warn!(region = %region.name, "stats lookup failed: {}", e);
                        }
                        if let Err(e) = &last_seen {
                            warn!(region = %region.name, "last-seen lookup failed: {}", e);
                        }
                        RegionPresence {
                            region: region.name.clone(),
                            available: false,
                            has_stats: has_stats.unwrap_or(false),
                            last_seen: last_seen.unwrap_or(None),
                        }
                    }
                }
            }
        });

        Ok(join_all(lookups).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn region(name: &str, dir: &tempfile::TempDir) -> (Region, SqlitePool) {
        let pool = init_region_database(&dir.path().join(format!("{}.db", name)))
            .await
            .expect("init region db");
        (Region::new(name.to_string(), pool.clone()), pool)
    }

    #[tokio::test]
    async fn test_rating_overview_merges_by_region() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (ar, ar_pool) = region("ar", &dir).await;
        let (br, _br_pool) = region("br", &dir).await;

        let id = SteamId64::parse("76561198012345678").unwrap();
        let steamid2 = id.steam2_canonical().unwrap();
        sqlx::query("INSERT INTO mgemod_stats (steamid, rating) VALUES (?, ?)")
            .bind(&steamid2)
            .bind(1700)
            .execute(&ar_pool)
            .await
            .expect("insert");

        let set = RegionSet::from_regions(vec![ar, br]);
        let overview = set.rating_overview(id).await.unwrap();

        assert_eq!(overview.len(), 2);
        assert_eq!(overview[0].region, "ar");
        assert!(overview[0].available);
        assert_eq!(overview[0].rating, Some(1700));
        assert_eq!(overview[1].region, "br");
        assert!(overview[1].available);
        assert_eq!(overview[1].rating, None);
    }

    #[tokio::test]
    async fn test_unknown_region_is_not_found() {
        let set = RegionSet::from_regions(Vec::new());
        assert!(matches!(set.get("xx"), Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_failed_region_degrades_without_failing_others() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (ar, ar_pool) = region("ar", &dir).await;
        let (br, br_pool) = region("br", &dir).await;

        let id = SteamId64::parse("76561198012345678").unwrap();
        let steamid2 = id.steam2_canonical().unwrap();
        sqlx::query("INSERT INTO mgemod_stats (steamid, rating) VALUES (?, ?)")
            .bind(&steamid2)
            .bind(1650)
            .execute(&ar_pool)
            .await
            .expect("insert");

        // Closing br's pool makes every br query fail
        br_pool.close().await;

        let set = RegionSet::from_regions(vec![ar, br]);
        let overview = set.rating_overview(id).await.unwrap();

        assert_eq!(overview.len(), 2);
        assert!(overview[0].available);
        assert_eq!(overview[0].rating, Some(1650));
        assert!(!overview[1].available);
        assert_eq!(overview[1].rating, None);

        let presence = set.presence(id).await.unwrap();
        assert!(presence[0].available);
        assert!(!presence[1].available);
    }
}
