//! Ability categories, ordering and qualification rules
//!
//! Providers identify skills with structured identifiers such as
//! `leaderskill_VADER` or `specialskill_COMMANDERLUKE01`. The category is the
//! leading token of that identifier:
//!
//! ```text
//! identifier := category "_" rest
//!             | category            (no separator: the whole identifier)
//! ```
//!
//! An identifier whose leading token is empty (e.g. `""` or `"_FOO"`) maps to
//! [`AbilityCategory::Other`] with the name `unknown`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;

/// Highest tier an ability can reach; zetas only count at this tier
pub const MAX_TIER: u32 = 8;

/// Category tag of an ability
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AbilityCategory {
    Hardware,
    Contract,
    Unique,
    Leader,
    Special,
    Basic,
    Other(String),
}

impl AbilityCategory {
    /// Categories ordered from most senior to least senior
    const PRIORITY: [AbilityCategory; 6] = [
        AbilityCategory::Hardware,
        AbilityCategory::Contract,
        AbilityCategory::Unique,
        AbilityCategory::Leader,
        AbilityCategory::Special,
        AbilityCategory::Basic,
    ];

    /// Map a category token to a category
    pub fn from_token(token: &str) -> Self {
        match token {
            "hardwareskill" => AbilityCategory::Hardware,
            "contractskill" => AbilityCategory::Contract,
            "uniqueskill" => AbilityCategory::Unique,
            "leaderskill" => AbilityCategory::Leader,
            "specialskill" => AbilityCategory::Special,
            "basicskill" => AbilityCategory::Basic,
            "" => AbilityCategory::Other("unknown".to_string()),
            other => AbilityCategory::Other(other.to_string()),
        }
    }

    /// Token used in output tables
    pub fn as_str(&self) -> &str {
        match self {
            AbilityCategory::Hardware => "hardwareskill",
            AbilityCategory::Contract => "contractskill",
            AbilityCategory::Unique => "uniqueskill",
            AbilityCategory::Leader => "leaderskill",
            AbilityCategory::Special => "specialskill",
            AbilityCategory::Basic => "basicskill",
            AbilityCategory::Other(s) => s,
        }
    }

    /// Seniority rank, 0 being the most senior. Unknown categories rank last.
    pub fn rank(&self) -> usize {
        Self::PRIORITY
            .iter()
            .position(|c| c == self)
            .unwrap_or(Self::PRIORITY.len())
    }
}

impl fmt::Display for AbilityCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for AbilityCategory {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for AbilityCategory {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let token = String::deserialize(deserializer)?;
        Ok(AbilityCategory::from_token(&token))
    }
}

/// Extract the category from a structured skill identifier
pub fn parse_category(identifier: &str) -> AbilityCategory {
    let token = identifier.split('_').next().unwrap_or_default();
    AbilityCategory::from_token(token)
}

/// An ability owned by a unit instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ability {
    pub name: String,
    pub category: AbilityCategory,
    pub tier: u32,
    pub is_zeta: bool,
}

impl Ability {
    pub fn new(name: impl Into<String>, category: AbilityCategory, tier: u32, is_zeta: bool) -> Self {
        Self {
            name: name.into(),
            category,
            tier,
            is_zeta,
        }
    }

    /// Zeta upgrade that has actually been applied (zeta flag at max tier)
    pub fn is_applied_zeta(&self) -> bool {
        self.is_zeta && self.tier == MAX_TIER
    }

    pub fn is_leader(&self) -> bool {
        self.category == AbilityCategory::Leader
    }
}

/// Ordering used for every ability list: category seniority, then
/// case-sensitive name
pub fn compare_abilities(a: &Ability, b: &Ability) -> Ordering {
    a.category
        .rank()
        .cmp(&b.category.rank())
        .then_with(|| a.name.cmp(&b.name))
}

/// Sort abilities in place with [`compare_abilities`]
pub fn sort_abilities(abilities: &mut [Ability]) {
    abilities.sort_by(compare_abilities);
}
