//! Vanity-URL resolution through the Steam Web API
//!
//! Custom profile URLs (`steamcommunity.com/id/<vanity>`) carry no numeric
//! identifier; the only way to resolve them is the `ResolveVanityURL`
//! endpoint. Resolution is best-effort: any network or API failure yields
//! `None` and the caller falls back to rejecting the input.

use mgeops_common::SteamId64;
use serde::Deserialize;
use tracing::debug;

const RESOLVE_URL: &str = "https://api.steampowered.com/ISteamUser/ResolveVanityURL/v0001/";

#[derive(Debug, Deserialize)]
struct VanityEnvelope {
    response: VanityResponse,
}

#[derive(Debug, Deserialize)]
struct VanityResponse {
    steamid: Option<String>,
}

/// Extract the vanity segment from a profile URL, or accept a bare vanity
///
/// Bare vanities are bounded to the character set Steam allows; anything
/// else returns `None` without a network call.
pub fn extract_vanity(input: &str) -> Option<String> {
    let trimmed = input.trim();
    let lower = trimmed.to_ascii_lowercase();

    if let Some(idx) = lower.find("steamcommunity.com/id/") {
        let rest = &trimmed[idx + "steamcommunity.com/id/".len()..];
        let segment: String = rest.chars().take_while(|&c| c != '/' && c != '?').collect();
        if segment.is_empty() {
            return None;
        }
        return Some(segment);
    }

    let looks_like_vanity = (2..=64).contains(&trimmed.len())
        && trimmed
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'));
    if looks_like_vanity {
        Some(trimmed.to_string())
    } else {
        None
    }
}

/// Resolve a vanity name or profile URL to a 64-bit identity
///
/// Returns `None` when the input is not vanity-shaped, the API call fails,
/// or the API reports no match.
pub async fn resolve_vanity(
    client: &reqwest::Client,
    api_key: &str,
    input: &str,
) -> Option<SteamId64> {
    let vanity = extract_vanity(input)?;

    let result = client
        .get(RESOLVE_URL)
        .query(&[("key", api_key), ("vanityurl", vanity.as_str())])
        .send()
        .await;

    let response = match result {
        Ok(r) if r.status().is_success() => r,
        Ok(r) => {
            debug!(vanity = %vanity, status = %r.status(), "vanity resolution rejected");
            return None;
        }
        Err(e) => {
            debug!(vanity = %vanity, "vanity resolution failed: {}", e);
            return None;
        }
    };

    let envelope: VanityEnvelope = response.json().await.ok()?;
    let steamid = envelope.response.steamid?;
    if steamid.len() != 17 || !steamid.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    SteamId64::parse(&steamid).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_from_url() {
        assert_eq!(
            extract_vanity("https://steamcommunity.com/id/someplayer/").as_deref(),
            Some("someplayer")
        );
        assert_eq!(
            extract_vanity("steamcommunity.com/id/some.player?l=en").as_deref(),
            Some("some.player")
        );
    }

    #[test]
    fn test_accepts_bare_vanity() {
        assert_eq!(extract_vanity("some_player-1").as_deref(), Some("some_player-1"));
    }

    #[test]
    fn test_rejects_non_vanity() {
        assert_eq!(extract_vanity(""), None);
        assert_eq!(extract_vanity("x"), None);
        assert_eq!(extract_vanity("has spaces in it"), None);
        assert_eq!(extract_vanity("steamcommunity.com/id/"), None);
    }
}
