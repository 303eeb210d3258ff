//! Turn reconciled rosters and the unit catalog into flat tables
//!
//! Rows are built in two passes. The first pass emits each row with its base
//! cells followed by the qualifying abilities, tracking the widest ability
//! list per table. The second pass appends the ability headers and pads every
//! row with empty cells to the header width. Rows are never truncated.
//!
//! While walking the rosters, a catalog definition that has no abilities or
//! unit type yet takes them from the first instance seen.

use crate::ability::{sort_abilities, Ability};
use crate::model::{GuildRoster, PlayerRecord, UnitCatalog, UnitInstance, UnitType};
use crate::setup::{HeroAbilityMode, OutputOptions, RosterOptions};
use crate::table::{CellValue, Table};

pub const ROSTER_TABLE: &str = "roster";
pub const UNITS_TABLE: &str = "units";
pub const ABILITIES_TABLE: &str = "abilities";
pub const HEROES_TABLE: &str = "heroes";
pub const SHIPS_TABLE: &str = "ships";

const ROSTER_HEADERS: [&str; 5] = ["guildId", "guildName", "name", "allyCode", "level"];
const GP_HEADERS: [&str; 3] = ["gp", "heroesGp", "shipsGp"];
const BATTLE_HEADERS: [&str; 7] = [
    "fleetArenaRank",
    "fleetArenaBattlesWon",
    "squadArenaRank",
    "squadArenaBattlesWon",
    "normalBattlesWon",
    "hardBattlesWon",
    "galacticWarBattlesWon",
];
const ACTIVITY_HEADERS: [&str; 3] = ["guildRaidsWon", "guildTokensEarned", "gearDonatedInGuildExchange"];
const HERO_HEADERS: [&str; 7] = ["name", "allyCode", "unit", "rarity", "level", "gearLevel", "power"];
const SHIP_HEADERS: [&str; 6] = ["name", "allyCode", "unit", "rarity", "level", "power"];
const UNIT_HEADERS: [&str; 6] = ["name", "baseId", "type", "alignment", "role", "tags"];
const ABILITY_HEADERS: [&str; 5] = ["baseId", "name", "type", "tierMax", "isZeta"];

/// The five output tables of a refresh
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    pub roster: Table,
    pub units: Table,
    pub abilities: Table,
    pub heroes: Table,
    pub ships: Table,
}

impl Projection {
    /// Tables in write order
    pub fn tables(&self) -> [&Table; 5] {
        [&self.roster, &self.units, &self.abilities, &self.heroes, &self.ships]
    }
}

/// Which fields of an ability become cells
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AbilityCells {
    NameType,
    NameTypeZetaTier,
    NameTypeTier,
    NameTypeZeta,
}

impl AbilityCells {
    fn headers(self) -> &'static [&'static str] {
        match self {
            AbilityCells::NameType => &["ability", "type"],
            AbilityCells::NameTypeZetaTier => &["ability", "type", "isZeta", "tier"],
            AbilityCells::NameTypeTier => &["ability", "type", "tier"],
            AbilityCells::NameTypeZeta => &["ability", "type", "isZeta"],
        }
    }

    fn push(self, cells: &mut Vec<CellValue>, ability: &Ability) {
        cells.push(ability.name.as_str().into());
        cells.push(ability.category.as_str().into());
        match self {
            AbilityCells::NameType => {}
            AbilityCells::NameTypeZetaTier => {
                cells.push(ability.is_zeta.into());
                cells.push(ability.tier.into());
            }
            AbilityCells::NameTypeTier => cells.push(ability.tier.into()),
            AbilityCells::NameTypeZeta => cells.push(ability.is_zeta.into()),
        }
    }
}

/// Abilities selected for a table and the cells each one produces
#[derive(Debug, Clone, Copy)]
struct AbilityColumns {
    filter: fn(&Ability) -> bool,
    cells: AbilityCells,
}

impl AbilityColumns {
    fn for_heroes(mode: HeroAbilityMode) -> Option<Self> {
        match mode {
            HeroAbilityMode::None => None,
            HeroAbilityMode::Zetas => Some(Self {
                filter: Ability::is_applied_zeta,
                cells: AbilityCells::NameType,
            }),
            HeroAbilityMode::LeaderAndZetas => Some(Self {
                filter: |a| a.is_leader() || a.is_applied_zeta(),
                cells: AbilityCells::NameTypeZetaTier,
            }),
            HeroAbilityMode::Detailed => Some(Self {
                filter: |_| true,
                cells: AbilityCells::NameTypeZetaTier,
            }),
        }
    }

    fn for_ships(enabled: bool) -> Option<Self> {
        enabled.then_some(Self {
            filter: |_| true,
            cells: AbilityCells::NameTypeTier,
        })
    }

    fn for_units() -> Self {
        Self {
            filter: |_| true,
            cells: AbilityCells::NameTypeZeta,
        }
    }

    /// Append the qualifying abilities, returning how many were written
    fn push(&self, cells: &mut Vec<CellValue>, abilities: &[Ability]) -> usize {
        let mut count = 0;
        for ability in abilities.iter().filter(|a| (self.filter)(a)) {
            self.cells.push(cells, ability);
            count += 1;
        }
        count
    }
}

/// A table under construction with a variable number of ability groups
struct RowBuilder {
    table: Table,
    columns: Option<AbilityColumns>,
    max_abilities: usize,
}

impl RowBuilder {
    fn new(name: &str, headers: &[&str], columns: Option<AbilityColumns>) -> Self {
        Self {
            table: Table::new(name, headers),
            columns,
            max_abilities: 0,
        }
    }

    fn push(&mut self, mut cells: Vec<CellValue>, abilities: &[Ability]) {
        if let Some(columns) = &self.columns {
            let count = columns.push(&mut cells, abilities);
            self.max_abilities = self.max_abilities.max(count);
        }
        self.table.push_row(cells);
    }

    fn finish(mut self) -> Table {
        if let Some(columns) = &self.columns {
            for i in 0..self.max_abilities {
                for header in columns.cells.headers() {
                    self.table.push_column(format!("{}_{}", header, i));
                }
            }
        }
        let width = self.table.column_count();
        self.table.pad_rows(width);
        self.table
    }
}

/// Project rosters into the output tables, back-filling `catalog` on the way
pub fn project(
    rosters: &[GuildRoster],
    catalog: &mut UnitCatalog,
    options: &OutputOptions,
) -> Projection {
    let unit_options = &options.units;
    let mut heroes = RowBuilder::new(
        HEROES_TABLE,
        &HERO_HEADERS,
        AbilityColumns::for_heroes(unit_options.hero_abilities),
    );
    let mut ships = RowBuilder::new(
        SHIPS_TABLE,
        &SHIP_HEADERS,
        AbilityColumns::for_ships(unit_options.ship_abilities.is_on()),
    );

    for member in rosters.iter().flat_map(|r| r.members.iter()) {
        for instance in member.units.values() {
            let mut abilities = instance.abilities.clone();
            sort_abilities(&mut abilities);

            let (unit_name, unit_type) = match catalog.find_mut(&instance.base_id) {
                Some(definition) => {
                    definition.backfill(&UnitInstance {
                        abilities: abilities.clone(),
                        ..instance.clone()
                    });
                    (
                        definition.name.clone(),
                        definition.unit_type.unwrap_or(instance.unit_type),
                    )
                }
                None => (instance.base_id.clone(), instance.unit_type),
            };

            match unit_type {
                UnitType::Hero if unit_options.unit_types.includes_heroes() => {
                    let mut cells = unit_cells(member, &unit_name, instance);
                    cells.push(instance.gear_level.into());
                    cells.push(instance.power.into());
                    heroes.push(cells, &abilities);
                }
                UnitType::Ship if unit_options.unit_types.includes_ships() => {
                    let mut cells = unit_cells(member, &unit_name, instance);
                    cells.push(instance.power.into());
                    ships.push(cells, &abilities);
                }
                _ => {}
            }
        }
    }

    let with_abilities = unit_options.hero_abilities != HeroAbilityMode::None
        || unit_options.ship_abilities.is_on();

    Projection {
        roster: roster_table(rosters, &options.roster),
        units: units_table(catalog, with_abilities),
        abilities: abilities_table(catalog),
        heroes: heroes.finish(),
        ships: ships.finish(),
    }
}

fn unit_cells(member: &PlayerRecord, unit_name: &str, instance: &UnitInstance) -> Vec<CellValue> {
    vec![
        member.name.as_str().into(),
        member.ally_code.into(),
        unit_name.into(),
        instance.rarity.into(),
        instance.level.into(),
    ]
}

fn roster_table(rosters: &[GuildRoster], options: &RosterOptions) -> Table {
    let mut headers: Vec<&str> = ROSTER_HEADERS.to_vec();
    if options.gp.is_on() {
        headers.extend(GP_HEADERS);
    }
    if options.battles.is_on() {
        headers.extend(BATTLE_HEADERS);
    }
    if options.guild_activities.is_on() {
        headers.extend(ACTIVITY_HEADERS);
    }

    let mut table = Table::new(ROSTER_TABLE, &headers);
    for roster in rosters {
        for member in &roster.members {
            let stats = &member.stats;
            let mut cells: Vec<CellValue> = vec![
                roster.id.into(),
                roster.name.as_str().into(),
                member.name.as_str().into(),
                member.ally_code.into(),
                member.level.into(),
            ];
            if options.gp.is_on() {
                cells.extend([stats.gp, stats.heroes_gp, stats.ships_gp].map(CellValue::from));
            }
            if options.battles.is_on() {
                cells.extend(
                    [
                        stats.fleet_arena_rank,
                        stats.fleet_arena_battles_won,
                        stats.squad_arena_rank,
                        stats.squad_arena_battles_won,
                        stats.normal_battles_won,
                        stats.hard_battles_won,
                        stats.galactic_war_battles_won,
                    ]
                    .map(CellValue::from),
                );
            }
            if options.guild_activities.is_on() {
                cells.extend(
                    [
                        stats.guild_raids_won,
                        stats.guild_tokens_earned,
                        stats.gear_donated_in_guild_exchange,
                    ]
                    .map(CellValue::from),
                );
            }
            table.push_row(cells);
        }
    }
    table
}

fn units_table(catalog: &UnitCatalog, with_abilities: bool) -> Table {
    let mut units = RowBuilder::new(
        UNITS_TABLE,
        &UNIT_HEADERS,
        with_abilities.then(AbilityColumns::for_units),
    );
    for definition in catalog.units() {
        let cells = vec![
            definition.name.as_str().into(),
            definition.base_id.as_str().into(),
            definition.unit_type.map(|t| t.as_str()).into(),
            definition.alignment.as_str().into(),
            definition.role.as_str().into(),
            definition.tags.join(",").into(),
        ];
        units.push(cells, definition.abilities.as_deref().unwrap_or_default());
    }
    units.finish()
}

fn abilities_table(catalog: &UnitCatalog) -> Table {
    let mut table = Table::new(ABILITIES_TABLE, &ABILITY_HEADERS);
    for ability in &catalog.abilities {
        table.push_row(vec![
            ability.base_id.as_str().into(),
            ability.name.as_str().into(),
            ability.category.as_str().into(),
            ability.tier_max.into(),
            ability.is_zeta.into(),
        ]);
    }
    table
}
