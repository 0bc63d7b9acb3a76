//! Operator-curated alt-link graph maintenance
//!
//! The graph is a forest of depth 1: an identifier is either a main
//! (target of edges, or a declared root) or an alt (source of exactly one
//! edge), never both. Rows are keyed by 64-bit ids on write, but historical
//! rows may carry any encoding, so reads normalize before grouping.

use mgeops_common::steamid::SteamId64;
use mgeops_common::{Error, Result};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::info;

use crate::repo::LinkRepository;

/// One display group: a main with its linked alts
#[derive(Debug, Clone, Serialize)]
pub struct AltGroup {
    pub main: SteamId64,
    pub perm_name: Option<String>,
    pub alts: Vec<SteamId64>,
}

/// Alt-link maintenance operations over a [`LinkRepository`]
pub struct LinkService<'a, L> {
    links: &'a L,
}

impl<'a, L: LinkRepository> LinkService<'a, L> {
    pub fn new(links: &'a L) -> Self {
        Self { links }
    }

    /// Declare an account a main (root with no designated alts yet)
    ///
    /// Idempotent: re-declaring an existing main or an account that
    /// already has alts is a no-op upsert.
    pub async fn declare_main(&self, main: &str, actor: &str) -> Result<SteamId64> {
        let main64 = SteamId64::parse(main)?;
        self.links.upsert_root(&main64.to_string(), actor).await?;
        Ok(main64)
    }

    /// Link `alt` under `main`
    ///
    /// Re-linking an existing alt moves it to the new main. Fails with
    /// `ConflictingRole` when `alt` is itself recorded as a main for
    /// others, and `SelfLink` when both sides normalize to one account.
    pub async fn link_alt(&self, alt: &str, main: &str, actor: &str) -> Result<()> {
        let alt64 = SteamId64::parse(alt)?;
        let main64 = SteamId64::parse(main)?;
        if alt64 == main64 {
            return Err(Error::SelfLink);
        }

        // Depth-1 invariant: an account with alts of its own cannot become
        // an alt
        if self.links.is_main_for_any(&alt64.variants()).await? {
            return Err(Error::ConflictingRole(alt64.to_string()));
        }

        self.links
            .upsert_link(&alt64.to_string(), &main64.to_string(), actor)
            .await?;
        info!(alt = %alt64, main = %main64, actor = actor, "linked alt");
        Ok(())
    }

    /// Remove the link for `alt`; absent links are not an error
    pub async fn unlink_alt(&self, alt: &str) -> Result<u64> {
        let alt64 = SteamId64::parse(alt)?;
        let removed = self.links.delete(&alt64.variants()).await?;
        if removed > 0 {
            info!(alt = %alt64, rows = removed, "unlinked alt");
        }
        Ok(removed)
    }

    /// Record a permanent display name and ensure the id shows as a group
    pub async fn set_perm_name(&self, id: &str, name: Option<&str>, actor: &str) -> Result<SteamId64> {
        let id64 = SteamId64::parse(id)?;
        self.links.upsert_perm_name(&id64.to_string(), name).await?;
        self.links.upsert_root(&id64.to_string(), actor).await?;
        Ok(id64)
    }

    /// Group the whole forest by main for display
    ///
    /// Rows with unparseable identifiers are skipped. Mains are every link
    /// target plus every row that is not itself an alt; permanent names
    /// are resolved across each main's full variant set because historical
    /// name rows are keyed inconsistently.
    pub async fn grouped(&self) -> Result<Vec<AltGroup>> {
        let rows = self.links.all().await?;

        // Normalize every row to 64-bit ids first
        let mut edges: Vec<(SteamId64, Option<SteamId64>)> = Vec::new();
        for row in &rows {
            let Ok(id64) = SteamId64::parse(&row.steam_id) else {
                continue;
            };
            let main64 = row
                .main_steam_id
                .as_deref()
                .and_then(|m| SteamId64::parse(m).ok());
            edges.push((id64, main64));
        }

        let alt_ids: BTreeSet<SteamId64> = edges
            .iter()
            .filter(|(_, main)| main.is_some())
            .map(|(alt, _)| *alt)
            .collect();

        let mut mains: BTreeSet<SteamId64> = edges.iter().filter_map(|(_, main)| *main).collect();
        for (id64, _) in &edges {
            if !alt_ids.contains(id64) {
                mains.insert(*id64);
            }
        }

        // One name query across every variant of every main
        let mut variant_ids: Vec<String> = Vec::new();
        let mut main_variants: BTreeMap<SteamId64, Vec<String>> = BTreeMap::new();
        for main in &mains {
            let variants: Vec<String> = main.variants().as_slice().to_vec();
            variant_ids.extend(variants.iter().cloned());
            main_variants.insert(*main, variants);
        }
        let name_rows = self.links.perm_names(&variant_ids).await?;
        let mut names: BTreeMap<String, String> = BTreeMap::new();
        for row in name_rows {
            if let Some(name) = row.name {
                let trimmed = name.trim().to_string();
                if !trimmed.is_empty() {
                    names.insert(row.steam_id, trimmed);
                }
            }
        }

        let groups = mains
            .into_iter()
            .map(|main| {
                let perm_name = main_variants
                    .get(&main)
                    .and_then(|variants| variants.iter().find_map(|v| names.get(v).cloned()));
                let alts = edges
                    .iter()
                    .filter(|(_, m)| *m == Some(main))
                    .map(|(alt, _)| *alt)
                    .collect();
                AltGroup {
                    main,
                    perm_name,
                    alts,
                }
            })
            .collect();

        Ok(groups)
    }
}
