//! Content-hash freshness gate
//!
//! Three configuration domains are hashed independently. A refresh is only
//! skipped when the cached digest of every domain matches the digest of the
//! current values; digests expire from the cache after one hour.

use crate::cache::Cache;
use crate::error::Result;
use crate::rar::RarRow;
use crate::setup::{RosterOptions, Setup, UnitOptions};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;

/// How long a committed digest stays valid
pub const HASH_TTL_SECS: u64 = 3600;

/// An independently hashed group of settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Domain {
    /// The guild-source table
    Guilds,
    /// Provider login plus every output-shaping switch
    Credential,
    /// Manual rename/add/remove rows
    Rar,
}

impl Domain {
    pub const ALL: [Domain; 3] = [Domain::Guilds, Domain::Credential, Domain::Rar];

    fn key_suffix(&self) -> &'static str {
        match self {
            Domain::Guilds => "guilds",
            Domain::Credential => "cred",
            Domain::Rar => "rar",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Domain::Guilds => "guilds",
            Domain::Credential => "credential",
            Domain::Rar => "rar",
        };
        f.write_str(name)
    }
}

#[derive(Serialize)]
struct CredentialDomain<'a> {
    username: &'a str,
    password: &'a str,
    roster: &'a RosterOptions,
    units: &'a UnitOptions,
}

/// Current digest of each domain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Digests {
    pub guilds: String,
    pub credential: String,
    pub rar: String,
}

impl Digests {
    /// Hash the current setup and manual-edit rows
    pub fn compute(setup: &Setup, rar_rows: &[RarRow]) -> Result<Self> {
        let credential = CredentialDomain {
            username: setup.swgoh_help.username.trim(),
            password: &setup.swgoh_help.password,
            roster: &setup.roster,
            units: &setup.units,
        };

        // only directive rows count, and their order in the table does not
        let mut rar: Vec<&RarRow> = rar_rows.iter().filter(|r| r.is_directive()).collect();
        rar.sort_by_key(|r| (r.add_ally_code, r.remove_ally_code));

        Ok(Self {
            guilds: digest(&setup.guilds)?,
            credential: digest(&credential)?,
            rar: digest(&rar)?,
        })
    }

    pub fn get(&self, domain: Domain) -> &str {
        match domain {
            Domain::Guilds => &self.guilds,
            Domain::Credential => &self.credential,
            Domain::Rar => &self.rar,
        }
    }
}

/// SHA-256 hex digest over the JSON serialization of `value`
pub fn digest<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let json = serde_json::to_string(value)?;
    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

/// Compares current digests with cached ones and commits new ones
pub struct FreshnessTracker<'a> {
    cache: &'a mut dyn Cache,
    cache_key: String,
    digests: Digests,
}

impl<'a> FreshnessTracker<'a> {
    pub fn new(cache: &'a mut dyn Cache, cache_key: impl Into<String>, digests: Digests) -> Self {
        Self {
            cache,
            cache_key: cache_key.into(),
            digests,
        }
    }

    fn key(&self, domain: Domain) -> String {
        format!("{}-{}", self.cache_key, domain.key_suffix())
    }

    /// Cached digest equals the current one
    pub fn is_fresh(&self, domain: Domain) -> bool {
        self.cache
            .get(&self.key(domain))
            .is_some_and(|cached| cached == self.digests.get(domain))
    }

    /// Every domain is fresh
    pub fn all_fresh(&self) -> bool {
        Domain::ALL.iter().all(|d| self.is_fresh(*d))
    }

    /// Freshness of every domain, in [`Domain::ALL`] order
    pub fn report(&self) -> Vec<(Domain, bool)> {
        Domain::ALL.iter().map(|d| (*d, self.is_fresh(*d))).collect()
    }

    /// Replace the current digests (settings changed during the cycle)
    pub fn update(&mut self, digests: Digests) {
        self.digests = digests;
    }

    /// Store the current digest of `domain`
    pub fn commit(&mut self, domain: Domain) -> Result<()> {
        let key = self.key(domain);
        let value = self.digests.get(domain).to_string();
        self.cache.put(&key, &value, HASH_TTL_SECS)
    }

    /// Store the current digest of every domain
    pub fn commit_all(&mut self) -> Result<()> {
        for domain in Domain::ALL {
            self.commit(domain)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::setup::{HeroAbilityMode, Toggle};

    fn rar_row(add: u64, remove: u64) -> RarRow {
        RarRow {
            add_ally_code: add,
            remove_ally_code: remove,
            ..RarRow::default()
        }
    }

    #[test]
    fn test_digest_is_sha256_hex() {
        let d = digest("abc").unwrap();
        assert_eq!(d.len(), 64);
        assert!(d.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(d, digest("abc").unwrap());
        assert_ne!(d, digest("abd").unwrap());
    }

    #[test]
    fn test_rar_digest_ignores_row_order_and_blank_rows() {
        let setup = Setup::default();
        let a = Digests::compute(&setup, &[rar_row(2, 0), rar_row(1, 0)]).unwrap();
        let b = Digests::compute(&setup, &[rar_row(0, 0), rar_row(1, 0), rar_row(2, 0)]).unwrap();
        let c = Digests::compute(&setup, &[rar_row(1, 0), rar_row(3, 0)]).unwrap();

        assert_eq!(a.rar, b.rar);
        assert_ne!(a.rar, c.rar);
    }

    #[test]
    fn test_credential_domain_covers_output_switches() {
        let setup = Setup::default();
        let mut changed = setup.clone();
        changed.units.hero_abilities = HeroAbilityMode::Detailed;
        let mut ship = setup.clone();
        ship.units.ship_abilities = Toggle::ON;

        let base = Digests::compute(&setup, &[]).unwrap();
        let d1 = Digests::compute(&changed, &[]).unwrap();
        let d2 = Digests::compute(&ship, &[]).unwrap();

        assert_ne!(base.credential, d1.credential);
        assert_ne!(base.credential, d2.credential);
        assert_eq!(base.guilds, d1.guilds);
        assert_eq!(base.rar, d1.rar);
    }

    #[test]
    fn test_fresh_only_after_commit() {
        let setup = Setup::template();
        let digests = Digests::compute(&setup, &[]).unwrap();
        let mut cache = MemoryCache::new();

        let mut tracker = FreshnessTracker::new(&mut cache, "test", digests.clone());
        assert!(!tracker.all_fresh());

        tracker.commit(Domain::Guilds).unwrap();
        assert!(tracker.is_fresh(Domain::Guilds));
        assert!(!tracker.all_fresh());

        tracker.commit_all().unwrap();
        assert!(tracker.all_fresh());

        assert_eq!(cache.get("test-guilds"), Some(digests.guilds.clone()));
        assert_eq!(cache.get("test-cred"), Some(digests.credential.clone()));
        assert_eq!(cache.get("test-rar"), Some(digests.rar));
    }

    #[test]
    fn test_one_stale_domain_makes_cycle_stale() {
        let setup = Setup::template();
        let mut cache = MemoryCache::new();
        {
            let mut tracker =
                FreshnessTracker::new(&mut cache, "k", Digests::compute(&setup, &[]).unwrap());
            tracker.commit_all().unwrap();
        }

        let digests = Digests::compute(&setup, &[rar_row(5, 0)]).unwrap();
        let tracker = FreshnessTracker::new(&mut cache, "k", digests);

        assert_eq!(tracker.report(), vec![
            (Domain::Guilds, true),
            (Domain::Credential, true),
            (Domain::Rar, false),
        ]);
        assert!(!tracker.all_fresh());
    }

    #[test]
    fn test_expired_digest_is_stale() {
        let setup = Setup::template();
        let digests = Digests::compute(&setup, &[]).unwrap();
        let mut cache = MemoryCache::new();
        cache.put("k-guilds", &digests.guilds, 0).unwrap();

        let tracker = FreshnessTracker::new(&mut cache, "k", digests);
        assert!(!tracker.is_fresh(Domain::Guilds));
    }
}
