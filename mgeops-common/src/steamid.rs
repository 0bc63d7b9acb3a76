//! Steam identity parsing and variant expansion
//!
//! Historical match and session records are keyed by whichever identifier
//! encoding the recording plugin happened to use: 64-bit, bare account id,
//! legacy `STEAM_X:Y:Z` (with two universe spellings in the wild), or
//! `[U:1:N]` with or without brackets. Every lookup therefore goes through
//! the full variant set produced here.
//!
//! All conversions are integer arithmetic on `u64`; 64-bit identifiers are
//! above the f64 safe-integer range, so no intermediate floating point is
//! ever used.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Fixed platform offset between the 64-bit form and the account id
pub const ACCOUNT_ID_OFFSET: u64 = 76_561_197_960_265_728;

/// A canonical 64-bit Steam identifier
///
/// Serialized as a decimal string: 64-bit values exceed the f64
/// safe-integer range and would be corrupted by JSON number handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct SteamId64(u64);

impl SteamId64 {
    /// Parse any supported identifier encoding into the 64-bit form
    ///
    /// Accepted inputs:
    /// - 17-digit 64-bit form (`76561198012345678`)
    /// - profile URL containing one (`steamcommunity.com/profiles/7656...`)
    /// - bracketed or bare account form (`[U:1:52080950]`, `U:1:52080950`)
    /// - legacy triplet (`STEAM_0:0:26040475`, universe digit ignored)
    /// - raw account id (up to 10 digits)
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidIdentifier("empty input".to_string()));
        }

        if let Some(id) = parse_plain_64(trimmed) {
            return Ok(SteamId64(id));
        }
        if let Some(id) = parse_profile_url(trimmed) {
            return Ok(SteamId64(id));
        }
        if let Some(account_id) = parse_steam3(trimmed) {
            return from_account_id(account_id);
        }
        if let Some(account_id) = parse_steam2(trimmed) {
            return from_account_id(account_id);
        }
        // Raw account id (bounded to 10 digits so it cannot collide with
        // the 17-digit 64-bit form)
        if trimmed.len() <= 10 && trimmed.chars().all(|c| c.is_ascii_digit()) {
            let account_id: u64 = trimmed
                .parse()
                .map_err(|_| Error::InvalidIdentifier(trimmed.to_string()))?;
            return from_account_id(account_id);
        }

        Err(Error::InvalidIdentifier(trimmed.to_string()))
    }

    /// The raw 64-bit value
    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// Account id (64-bit form minus the platform offset)
    ///
    /// Fails with `NotConvertible` for values below the offset constant.
    pub fn account_id(&self) -> Result<u64> {
        self.0
            .checked_sub(ACCOUNT_ID_OFFSET)
            .ok_or_else(|| Error::NotConvertible(self.0.to_string()))
    }

    /// Legacy triplet form, both universe spellings
    ///
    /// `STEAM_0:Y:Z` and `STEAM_1:Y:Z` denote the same account; historical
    /// logs contain both.
    pub fn steam2(&self) -> Result<(String, String)> {
        let account_id = self.account_id()?;
        let y = account_id % 2;
        let z = (account_id - y) / 2;
        Ok((format!("STEAM_0:{}:{}", y, z), format!("STEAM_1:{}:{}", y, z)))
    }

    /// The `STEAM_0` universe spelling used by the match-log tables
    pub fn steam2_canonical(&self) -> Result<String> {
        Ok(self.steam2()?.0)
    }

    /// Bracketed account form `[U:1:N]`
    pub fn steam3(&self) -> Result<String> {
        Ok(format!("[U:1:{}]", self.account_id()?))
    }

    /// All string forms that denote this account, deduplicated
    ///
    /// Always contains the 64-bit form; the derived forms are omitted for
    /// values below the offset constant. Output order is deterministic.
    pub fn variants(&self) -> IdVariantSet {
        let mut variants = vec![self.0.to_string()];
        if let Ok(account_id) = self.account_id() {
            variants.push(account_id.to_string());
            let y = account_id % 2;
            let z = (account_id - y) / 2;
            variants.push(format!("STEAM_0:{}:{}", y, z));
            variants.push(format!("STEAM_1:{}:{}", y, z));
            variants.push(format!("[U:1:{}]", account_id));
            variants.push(format!("U:1:{}", account_id));
        }
        IdVariantSet(variants)
    }
}

impl std::fmt::Display for SteamId64 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<SteamId64> for String {
    fn from(id: SteamId64) -> String {
        id.0.to_string()
    }
}

impl TryFrom<String> for SteamId64 {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        SteamId64::parse(&value)
    }
}

fn from_account_id(account_id: u64) -> Result<SteamId64> {
    let id = account_id
        .checked_add(ACCOUNT_ID_OFFSET)
        .ok_or_else(|| Error::NotConvertible(account_id.to_string()))?;
    Ok(SteamId64(id))
}

fn parse_plain_64(input: &str) -> Option<u64> {
    if input.len() == 17 && input.chars().all(|c| c.is_ascii_digit()) {
        input.parse().ok()
    } else {
        None
    }
}

fn parse_profile_url(input: &str) -> Option<u64> {
    let lower = input.to_ascii_lowercase();
    let idx = lower.find("steamcommunity.com/profiles/")?;
    let rest = &input[idx + "steamcommunity.com/profiles/".len()..];
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    parse_plain_64(&digits)
}

/// `[U:1:N]` or `U:1:N`, case-insensitive
fn parse_steam3(input: &str) -> Option<u64> {
    let inner = input
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .unwrap_or(input);
    let rest = inner
        .strip_prefix("U:1:")
        .or_else(|| inner.strip_prefix("u:1:"))?;
    if rest.is_empty() || !rest.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    rest.parse().ok()
}

/// `STEAM_X:Y:Z`, case-insensitive; the universe digit X is ignored
fn parse_steam2(input: &str) -> Option<u64> {
    let upper = input.to_ascii_uppercase();
    let rest = upper.strip_prefix("STEAM_")?;
    let mut parts = rest.split(':');
    let universe = parts.next()?;
    let y = parts.next()?;
    let z = parts.next()?;
    if parts.next().is_some() {
        return None;
    }
    if universe.len() != 1 || !universe.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let y: u64 = match y {
        "0" => 0,
        "1" => 1,
        _ => return None,
    };
    if z.is_empty() || !z.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let z: u64 = z.parse().ok()?;
    z.checked_mul(2)?.checked_add(y)
}

/// The set of all string encodings that denote one account
///
/// Used verbatim as the `IN (...)` list when querying historical tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdVariantSet(Vec<String>);

impl IdVariantSet {
    pub fn contains(&self, candidate: &str) -> bool {
        self.0.iter().any(|v| v == candidate)
    }

    /// True when `candidate` denotes the same account under any encoding,
    /// either verbatim or after normalizing it to the 64-bit form
    pub fn matches(&self, candidate: &str) -> bool {
        if self.contains(candidate) {
            return true;
        }
        match SteamId64::parse(candidate) {
            Ok(id) => self.contains(&id.to_string()),
            Err(_) => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|s| s.as_str())
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID64: u64 = 76_561_198_012_345_678;

    #[test]
    fn test_parse_plain_64() {
        let id = SteamId64::parse("76561198012345678").unwrap();
        assert_eq!(id.as_u64(), ID64);
    }

    #[test]
    fn test_parse_profile_url() {
        let id =
            SteamId64::parse("https://steamcommunity.com/profiles/76561198012345678/").unwrap();
        assert_eq!(id.as_u64(), ID64);
    }

    #[test]
    fn test_parse_steam3_bracketed_and_bare() {
        let account_id = ID64 - ACCOUNT_ID_OFFSET;
        let bracketed = format!("[U:1:{}]", account_id);
        let bare = format!("U:1:{}", account_id);
        assert_eq!(SteamId64::parse(&bracketed).unwrap().as_u64(), ID64);
        assert_eq!(SteamId64::parse(&bare).unwrap().as_u64(), ID64);
    }

    #[test]
    fn test_parse_steam2_both_universes() {
        let id = SteamId64::parse("76561198012345678").unwrap();
        let (u0, u1) = id.steam2().unwrap();
        assert_eq!(SteamId64::parse(&u0).unwrap(), id);
        assert_eq!(SteamId64::parse(&u1).unwrap(), id);
    }

    #[test]
    fn test_parse_raw_account_id() {
        let account_id = ID64 - ACCOUNT_ID_OFFSET;
        let id = SteamId64::parse(&account_id.to_string()).unwrap();
        assert_eq!(id.as_u64(), ID64);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for input in ["", "   ", "not-an-id", "STEAM_0:2:123", "STEAM_0:1", "[U:1:]"] {
            assert!(
                SteamId64::parse(input).is_err(),
                "expected rejection for {:?}",
                input
            );
        }
    }

    #[test]
    fn test_steam2_round_trip() {
        // Round trip across a spread of account ids, both parities
        for account_id in [1u64, 2, 26_040_475, 52_080_950, 999_999_999] {
            let id = SteamId64(ACCOUNT_ID_OFFSET + account_id);
            let (u0, u1) = id.steam2().unwrap();
            assert_eq!(SteamId64::parse(&u0).unwrap(), id);
            assert_eq!(SteamId64::parse(&u1).unwrap(), id);
        }
    }

    #[test]
    fn test_steam3_round_trip() {
        let id = SteamId64(ACCOUNT_ID_OFFSET + 52_080_950);
        let s3 = id.steam3().unwrap();
        assert_eq!(SteamId64::parse(&s3).unwrap(), id);
    }

    #[test]
    fn test_below_offset_not_convertible() {
        let id = SteamId64::parse("10000000000000000").unwrap();
        assert!(matches!(id.account_id(), Err(Error::NotConvertible(_))));
        assert!(id.steam2().is_err());
        assert!(id.steam3().is_err());
        // Variant set degrades to just the 64-bit form
        assert_eq!(id.variants().len(), 1);
    }

    #[test]
    fn test_variants_closure_and_stability() {
        let id = SteamId64(ACCOUNT_ID_OFFSET + 52_080_950);
        let variants = id.variants();
        assert!(variants.contains(&id.to_string()));
        assert_eq!(variants, id.variants());
        // Every variant parses back to the same account
        for v in variants.iter() {
            assert_eq!(SteamId64::parse(v).unwrap(), id, "variant {}", v);
        }
        assert_eq!(variants.len(), 6);
    }

    #[test]
    fn test_variant_set_matches_normalized() {
        let id = SteamId64(ACCOUNT_ID_OFFSET + 52_080_950);
        let variants = id.variants();
        // A spelling not in the set verbatim, but equal after normalization
        assert!(variants.matches("u:1:52080950"));
        assert!(!variants.matches("STEAM_0:0:1"));
        assert!(!variants.matches("garbage"));
    }

    #[test]
    fn test_serde_as_string() {
        let id = SteamId64(ACCOUNT_ID_OFFSET + 52_080_950);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id.as_u64()));
        let back: SteamId64 = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
