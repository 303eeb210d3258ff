//! Provider-independent data model for units, players and guilds

use crate::ability::{Ability, AbilityCategory};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Hero or ship
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitType {
    Hero,
    Ship,
}

impl UnitType {
    /// Map a provider combat type code (1 = hero, anything else = ship)
    pub fn from_combat_type(code: u32) -> Self {
        if code == 1 {
            UnitType::Hero
        } else {
            UnitType::Ship
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UnitType::Hero => "hero",
            UnitType::Ship => "ship",
        }
    }
}

impl fmt::Display for UnitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Catalog entry for a unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitDefinition {
    pub base_id: String,
    pub name: String,
    pub alignment: String,
    pub role: String,
    /// Ordered, duplicate-free, lower-case tags
    pub tags: Vec<String>,
    /// Back-filled from the first observed instance
    pub abilities: Option<Vec<Ability>>,
    /// Back-filled from the first observed instance
    pub unit_type: Option<UnitType>,
}

impl UnitDefinition {
    pub fn new(
        base_id: impl Into<String>,
        name: impl Into<String>,
        alignment: impl Into<String>,
        role: impl Into<String>,
        tags: Vec<String>,
    ) -> Self {
        Self {
            base_id: base_id.into(),
            name: name.into(),
            alignment: alignment.into(),
            role: role.into(),
            tags: normalize_tags(tags),
            abilities: None,
            unit_type: None,
        }
    }

    /// Record the abilities and type of an observed instance.
    ///
    /// Fields that are already set are left alone.
    pub fn backfill(&mut self, instance: &UnitInstance) {
        if self.abilities.is_none() {
            self.abilities = Some(instance.abilities.clone());
        }
        if self.unit_type.is_none() {
            self.unit_type = Some(instance.unit_type);
        }
    }
}

/// Lower-case tags, dropping blanks and repeated tags while keeping order
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.as_ref().trim().to_lowercase();
        if !tag.is_empty() && !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}

/// Catalog entry for an ability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbilityDefinition {
    pub base_id: String,
    pub name: String,
    pub category: AbilityCategory,
    pub tier_max: u32,
    pub is_zeta: bool,
}

/// Every unit and ability known to the provider
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnitCatalog {
    pub heroes: Vec<UnitDefinition>,
    pub ships: Vec<UnitDefinition>,
    pub abilities: Vec<AbilityDefinition>,
}

impl UnitCatalog {
    /// Find a definition by base id (heroes first, then ships)
    pub fn find(&self, base_id: &str) -> Option<&UnitDefinition> {
        self.units().find(|d| d.base_id == base_id)
    }

    /// Mutable lookup used by the back-fill
    pub fn find_mut(&mut self, base_id: &str) -> Option<&mut UnitDefinition> {
        self.heroes
            .iter_mut()
            .chain(self.ships.iter_mut())
            .find(|d| d.base_id == base_id)
    }

    /// Heroes followed by ships
    pub fn units(&self) -> impl Iterator<Item = &UnitDefinition> {
        self.heroes.iter().chain(self.ships.iter())
    }

    pub fn unit_count(&self) -> usize {
        self.heroes.len() + self.ships.len()
    }
}

/// A player's copy of a unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitInstance {
    pub base_id: String,
    pub unit_type: UnitType,
    pub level: u32,
    pub power: u64,
    pub rarity: u32,
    /// Heroes only
    pub gear_level: Option<u32>,
    pub abilities: Vec<Ability>,
}

/// Aggregate player metrics; every field is optional because not every
/// provider reports it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerStats {
    pub gp: Option<u64>,
    pub heroes_gp: Option<u64>,
    pub ships_gp: Option<u64>,
    pub fleet_arena_rank: Option<u64>,
    pub fleet_arena_battles_won: Option<u64>,
    pub squad_arena_rank: Option<u64>,
    pub squad_arena_battles_won: Option<u64>,
    pub normal_battles_won: Option<u64>,
    pub hard_battles_won: Option<u64>,
    pub galactic_war_battles_won: Option<u64>,
    pub guild_raids_won: Option<u64>,
    pub guild_tokens_earned: Option<u64>,
    pub gear_donated_in_guild_exchange: Option<u64>,
}

/// A player and their units, keyed by base id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub ally_code: u64,
    pub name: String,
    pub level: u32,
    pub stats: PlayerStats,
    pub units: BTreeMap<String, UnitInstance>,
}

impl PlayerRecord {
    pub fn new(ally_code: u64, name: impl Into<String>, level: u32) -> Self {
        Self {
            ally_code,
            name: name.into(),
            level,
            stats: PlayerStats::default(),
            units: BTreeMap::new(),
        }
    }

    /// Insert a unit, replacing any previous instance with the same base id
    pub fn add_unit(&mut self, unit: UnitInstance) {
        self.units.insert(unit.base_id.clone(), unit);
    }

    /// Highest unit level on the roster, 1 when the roster is empty
    pub fn max_unit_level(&self) -> u32 {
        self.units.values().map(|u| u.level).max().unwrap_or(1).max(1)
    }
}

/// A guild and its members
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuildRoster {
    pub id: u64,
    pub name: String,
    pub members: Vec<PlayerRecord>,
}

impl GuildRoster {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            members: Vec::new(),
        }
    }

    /// Position of the member with the given ally code
    pub fn position(&self, ally_code: u64) -> Option<usize> {
        self.members.iter().position(|m| m.ally_code == ally_code)
    }

    pub fn contains(&self, ally_code: u64) -> bool {
        self.position(ally_code).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instance(base_id: &str, level: u32, abilities: Vec<Ability>) -> UnitInstance {
        UnitInstance {
            base_id: base_id.to_string(),
            unit_type: UnitType::Hero,
            level,
            power: 1000,
            rarity: 7,
            gear_level: Some(12),
            abilities,
        }
    }

    #[test]
    fn test_combat_type_mapping() {
        assert_eq!(UnitType::from_combat_type(1), UnitType::Hero);
        assert_eq!(UnitType::from_combat_type(2), UnitType::Ship);
        assert_eq!(UnitType::from_combat_type(0), UnitType::Ship);
    }

    #[test]
    fn test_normalize_tags() {
        let tags = normalize_tags(["Dark Side", "Attacker", "", "Sith", "dark side"]);
        assert_eq!(tags, vec!["dark side", "attacker", "sith"]);
    }

    #[test]
    fn test_backfill_keeps_first_snapshot() {
        let mut def = UnitDefinition::new("VADER", "Darth Vader", "Dark Side", "Attacker", vec![]);
        let first = instance(
            "VADER",
            85,
            vec![Ability::new("Merciless", AbilityCategory::Special, 8, true)],
        );
        let second = instance("VADER", 85, vec![]);

        def.backfill(&first);
        def.backfill(&second);

        assert_eq!(def.abilities.as_ref().map(|a| a.len()), Some(1));
        assert_eq!(def.unit_type, Some(UnitType::Hero));
    }

    #[test]
    fn test_catalog_find_searches_ships_too() {
        let catalog = UnitCatalog {
            heroes: vec![UnitDefinition::new("VADER", "Darth Vader", "", "", vec![])],
            ships: vec![UnitDefinition::new("TIEADVANCED", "TIE Advanced x1", "", "", vec![])],
            abilities: vec![],
        };

        assert!(catalog.find("VADER").is_some());
        assert!(catalog.find("TIEADVANCED").is_some());
        assert!(catalog.find("HAN").is_none());
        assert_eq!(catalog.unit_count(), 2);
    }

    #[test]
    fn test_max_unit_level_defaults_to_one() {
        let mut player = PlayerRecord::new(1, "Empty", 0);
        assert_eq!(player.max_unit_level(), 1);

        player.add_unit(instance("A", 60, vec![]));
        player.add_unit(instance("B", 85, vec![]));
        assert_eq!(player.max_unit_level(), 85);
    }
}
