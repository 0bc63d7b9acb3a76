//! Alt-account detection
//!
//! Correlates shared network origins and display-name similarity into a
//! ranked candidate list. Origins shared by many accounts (LAN cafes,
//! campus NAT) are down-weighted; a handful of rare shared origins
//! saturates the origin-overlap score.
//!
//! Detection is read-only. The operator-curated link graph lives in
//! [`links`].

pub mod links;

use chrono::Utc;
use mgeops_common::similarity::string_similarity;
use mgeops_common::steamid::SteamId64;
use mgeops_common::Result;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use tracing::debug;

use crate::repo::SessionRepository;

/// Hard ceiling on the lookback window, in days
pub const MAX_WINDOW_DAYS: u32 = 3650;
/// Default lookback window, in days
pub const DEFAULT_WINDOW_DAYS: u32 = 365;

/// An origin's rarity weight floors at 1/10 once ten accounts share it
const ORIGIN_DIVERSITY_CAP: usize = 10;
/// Weighted rare-origin matches needed to saturate the overlap score
const ORIGIN_SATURATION: f64 = 3.0;
/// Cap on the name-similarity contribution
const NAME_WEIGHT: f64 = 0.6;

/// Confidence label derived from the combined score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AltLabel {
    Likely,
    Possible,
    Unlikely,
}

impl AltLabel {
    fn from_score(score: f64) -> Self {
        if score >= 0.70 {
            AltLabel::Likely
        } else if score >= 0.40 {
            AltLabel::Possible
        } else {
            AltLabel::Unlikely
        }
    }
}

/// Per-candidate score breakdown
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    pub ip_overlap_score: f64,
    pub name_similarity_score: f64,
}

/// One ranked alt candidate; derived, never persisted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AltCandidate {
    /// Identifier exactly as observed in the session logs
    pub steamid_raw: String,
    /// 64-bit normalization, when the raw form parses
    pub steamid64: Option<SteamId64>,
    pub score: f64,
    pub label: AltLabel,
    pub shared_ips: Vec<String>,
    pub evidence: Evidence,
}

/// The alt detector, generic over its session log source
pub struct AltDetector<'a, S> {
    sessions: &'a S,
}

impl<'a, S: SessionRepository> AltDetector<'a, S> {
    pub fn new(sessions: &'a S) -> Self {
        Self { sessions }
    }

    /// Rank accounts that share network origins with the subject
    ///
    /// A subject with no recorded origins in the window yields an empty
    /// list, not an error. Output is sorted by score descending, ties
    /// broken by raw identifier ascending.
    pub async fn find_candidates(
        &self,
        subject: SteamId64,
        window_days: Option<u32>,
    ) -> Result<Vec<AltCandidate>> {
        let days = window_days.unwrap_or(DEFAULT_WINDOW_DAYS).min(MAX_WINDOW_DAYS);
        let since = Utc::now().timestamp() - i64::from(days) * 86_400;

        let subject_variants = subject.variants();

        let subject_ips = self.sessions.distinct_ips(&subject_variants, since).await?;
        if subject_ips.is_empty() {
            return Ok(Vec::new());
        }

        let rows = self.sessions.sessions_on_ips(&subject_ips, since).await?;
        let subject_names = self.sessions.distinct_names(&subject_variants, since).await?;

        // Account diversity per origin, counted over every identifier seen
        // there (subject included)
        let mut ip_accounts: HashMap<&str, HashSet<&str>> = HashMap::new();
        for row in &rows {
            let sid = row.steam_id.trim();
            if sid.is_empty() {
                continue;
            }
            ip_accounts.entry(row.ip.as_str()).or_default().insert(sid);
        }

        // Evidence per candidate, keyed by the raw observed identifier
        struct CandidateEvidence {
            shared_ips: BTreeSet<String>,
            names: BTreeSet<String>,
        }
        let mut candidates: BTreeMap<String, CandidateEvidence> = BTreeMap::new();
        for row in &rows {
            let sid = row.steam_id.trim();
            if sid.is_empty() || subject_variants.matches(sid) {
                continue;
            }
            let entry = candidates
                .entry(sid.to_string())
                .or_insert_with(|| CandidateEvidence {
                    shared_ips: BTreeSet::new(),
                    names: BTreeSet::new(),
                });
            entry.shared_ips.insert(row.ip.clone());
            if let Some(name) = &row.name {
                if !name.is_empty() {
                    entry.names.insert(name.clone());
                }
            }
        }

        let mut out: Vec<AltCandidate> = candidates
            .into_iter()
            .map(|(steamid_raw, evidence)| {
                // Rare origins weigh more: 1.0 for a single account, floor
                // 0.1 once ten or more share it
                let mut ip_score = 0.0;
                for ip in &evidence.shared_ips {
                    let account_count = ip_accounts.get(ip.as_str()).map_or(1, |s| s.len().max(1));
                    ip_score += 1.0 / account_count.min(ORIGIN_DIVERSITY_CAP) as f64;
                }
                let ip_overlap_score = (ip_score / ORIGIN_SATURATION).min(1.0);

                let mut name_sim: f64 = 0.0;
                for subject_name in &subject_names {
                    for candidate_name in &evidence.names {
                        name_sim = name_sim.max(string_similarity(subject_name, candidate_name));
                    }
                }
                let name_similarity_score = name_sim * NAME_WEIGHT;

                let score =
                    (0.75 * ip_overlap_score + 0.25 * name_similarity_score).clamp(0.0, 1.0);

                AltCandidate {
                    steamid64: SteamId64::parse(&steamid_raw).ok(),
                    steamid_raw,
                    score,
                    label: AltLabel::from_score(score),
                    shared_ips: evidence.shared_ips.into_iter().collect(),
                    evidence: Evidence {
                        ip_overlap_score,
                        name_similarity_score,
                    },
                }
            })
            .collect();

        out.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.steamid_raw.cmp(&b.steamid_raw))
        });

        debug!(
            subject = %subject,
            window_days = days,
            origins = subject_ips.len(),
            candidates = out.len(),
            "alt detection pass complete"
        );

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mgeops_common::db::SessionLogRow;
    use mgeops_common::steamid::IdVariantSet;

    const SUBJECT_64: &str = "76561198012345678";

    fn now() -> i64 {
        Utc::now().timestamp()
    }

    fn session(steam_id: &str, ip: &str, name: &str) -> SessionLogRow {
        SessionLogRow {
            steam_id: steam_id.to_string(),
            ip: ip.to_string(),
            name: if name.is_empty() {
                None
            } else {
                Some(name.to_string())
            },
            seen_at: now() - 3600,
        }
    }

    struct FakeSessions {
        rows: Vec<SessionLogRow>,
    }

    impl SessionRepository for FakeSessions {
        async fn distinct_ips(
            &self,
            variants: &IdVariantSet,
            since: i64,
        ) -> Result<Vec<String>> {
            let mut ips: Vec<String> = self
                .rows
                .iter()
                .filter(|r| r.seen_at >= since && variants.contains(&r.steam_id))
                .map(|r| r.ip.clone())
                .collect();
            ips.sort();
            ips.dedup();
            Ok(ips)
        }

        async fn sessions_on_ips(
            &self,
            ips: &[String],
            since: i64,
        ) -> Result<Vec<SessionLogRow>> {
            Ok(self
                .rows
                .iter()
                .filter(|r| r.seen_at >= since && ips.contains(&r.ip))
                .cloned()
                .collect())
        }

        async fn distinct_names(
            &self,
            variants: &IdVariantSet,
            since: i64,
        ) -> Result<Vec<String>> {
            let mut names: Vec<String> = self
                .rows
                .iter()
                .filter(|r| r.seen_at >= since && variants.contains(&r.steam_id))
                .filter_map(|r| r.name.clone())
                .collect();
            names.sort();
            names.dedup();
            Ok(names)
        }

        async fn sessions_for(
            &self,
            variants: &IdVariantSet,
            limit: i64,
        ) -> Result<Vec<SessionLogRow>> {
            Ok(self
                .rows
                .iter()
                .filter(|r| variants.contains(&r.steam_id))
                .take(limit as usize)
                .cloned()
                .collect())
        }

        async fn session_times(&self, variants: &IdVariantSet, since: i64) -> Result<Vec<i64>> {
            Ok(self
                .rows
                .iter()
                .filter(|r| r.seen_at >= since && variants.contains(&r.steam_id))
                .map(|r| r.seen_at)
                .collect())
        }
    }

    fn subject() -> SteamId64 {
        SteamId64::parse(SUBJECT_64).unwrap()
    }

    #[tokio::test]
    async fn test_no_origins_yields_empty_list() {
        let sessions = FakeSessions { rows: Vec::new() };
        let detector = AltDetector::new(&sessions);
        let candidates = detector.find_candidates(subject(), None).await.unwrap();
        assert!(candidates.is_empty());
    }

    #[tokio::test]
    async fn test_rare_shared_origin_scores_high() {
        let sessions = FakeSessions {
            rows: vec![
                session(SUBJECT_64, "10.0.0.1", "player"),
                session("76561198087654321", "10.0.0.1", "player2"),
            ],
        };
        let detector = AltDetector::new(&sessions);
        let candidates = detector.find_candidates(subject(), None).await.unwrap();

        assert_eq!(candidates.len(), 1);
        let c = &candidates[0];
        assert_eq!(c.steamid_raw, "76561198087654321");
        // Two accounts on one origin: rarity 0.5, overlap 0.5/3
        assert!((c.evidence.ip_overlap_score - 0.5 / 3.0).abs() < 1e-9);
        assert!(c.steamid64.is_some());
    }

    #[tokio::test]
    async fn test_subject_variants_excluded() {
        let subject_id = subject();
        let steam2 = subject_id.steam2_canonical().unwrap();
        let steam3 = subject_id.steam3().unwrap();
        let sessions = FakeSessions {
            rows: vec![
                session(SUBJECT_64, "10.0.0.1", "main"),
                // The same account under other encodings must not become
                // its own candidate
                session(&steam2, "10.0.0.1", "main"),
                session(&steam3, "10.0.0.1", "main"),
            ],
        };
        let detector = AltDetector::new(&sessions);
        let candidates = detector.find_candidates(subject_id, None).await.unwrap();
        assert!(candidates.is_empty());
    }

    #[tokio::test]
    async fn test_adding_shared_origin_never_decreases_score() {
        let candidate = "76561198087654321";
        let base_rows = vec![
            session(SUBJECT_64, "10.0.0.1", "a"),
            session(candidate, "10.0.0.1", "b"),
        ];
        let mut more_rows = base_rows.clone();
        more_rows.push(session(SUBJECT_64, "10.0.0.2", "a"));
        more_rows.push(session(candidate, "10.0.0.2", "b"));

        let few = AltDetector::new(&FakeSessions { rows: base_rows })
            .find_candidates(subject(), None)
            .await
            .unwrap();
        let many = AltDetector::new(&FakeSessions { rows: more_rows })
            .find_candidates(subject(), None)
            .await
            .unwrap();

        assert!(many[0].evidence.ip_overlap_score >= few[0].evidence.ip_overlap_score);
    }

    #[tokio::test]
    async fn test_unrelated_candidate_does_not_shift_scores() {
        let candidate = "76561198087654321";
        let rows = vec![
            session(SUBJECT_64, "10.0.0.1", "a"),
            session(candidate, "10.0.0.1", "b"),
        ];
        let mut with_unrelated = rows.clone();
        // A second candidate on a different shared origin
        with_unrelated.push(session(SUBJECT_64, "10.0.0.9", "a"));
        with_unrelated.push(session("76561198011111111", "10.0.0.9", "zzz"));

        let before = AltDetector::new(&FakeSessions { rows })
            .find_candidates(subject(), None)
            .await
            .unwrap();
        let after = AltDetector::new(&FakeSessions { rows: with_unrelated })
            .find_candidates(subject(), None)
            .await
            .unwrap();

        let b = before.iter().find(|c| c.steamid_raw == candidate).unwrap();
        let a = after.iter().find(|c| c.steamid_raw == candidate).unwrap();
        assert!((a.score - b.score).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_name_similarity_contributes() {
        let twin = "76561198087654321";
        let stranger = "76561198011111111";
        let rows = vec![
            session(SUBJECT_64, "10.0.0.1", "sniperwolf"),
            session(twin, "10.0.0.1", "sniperwolf"),
            session(stranger, "10.0.0.1", "xX_unrelated_Xx"),
        ];
        let detector = AltDetector::new(&FakeSessions { rows });
        let candidates = detector.find_candidates(subject(), None).await.unwrap();

        let twin_c = candidates.iter().find(|c| c.steamid_raw == twin).unwrap();
        let stranger_c = candidates
            .iter()
            .find(|c| c.steamid_raw == stranger)
            .unwrap();
        assert!(twin_c.score > stranger_c.score);
        assert!((twin_c.evidence.name_similarity_score - NAME_WEIGHT).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_sorted_by_score_then_identifier() {
        let rows = vec![
            session(SUBJECT_64, "10.0.0.1", "a"),
            // Two candidates with identical evidence: tie broken by id
            session("76561198087654322", "10.0.0.1", "b"),
            session("76561198087654321", "10.0.0.1", "b"),
        ];
        let detector = AltDetector::new(&FakeSessions { rows });
        let candidates = detector.find_candidates(subject(), None).await.unwrap();

        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].steamid_raw, "76561198087654321");
        assert_eq!(candidates[1].steamid_raw, "76561198087654322");
    }

    #[test]
    fn test_label_thresholds() {
        assert_eq!(AltLabel::from_score(0.70), AltLabel::Likely);
        assert_eq!(AltLabel::from_score(0.69), AltLabel::Possible);
        assert_eq!(AltLabel::from_score(0.40), AltLabel::Possible);
        assert_eq!(AltLabel::from_score(0.39), AltLabel::Unlikely);
    }
}
