//! swgoh.gg client (public REST API, guilds addressed by guild id)

use super::{http_client, Provider};
use crate::ability::{parse_category, Ability};
use crate::error::{Error, Result};
use crate::model::{
    AbilityDefinition, GuildRoster, PlayerRecord, PlayerStats, UnitCatalog, UnitDefinition,
    UnitInstance, UnitType,
};
use crate::setup::GuildRef;
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

const NAME: &str = "swgoh.gg";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct UnitResponse {
    base_id: String,
    name: String,
    alignment: String,
    role: String,
    categories: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AbilityResponse {
    base_id: String,
    name: String,
    is_zeta: bool,
    tier_max: u32,
}

#[derive(Debug, Deserialize)]
struct GuildResponse {
    data: GuildData,
    players: Vec<PlayerResponse>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GuildData {
    name: String,
}

#[derive(Debug, Deserialize)]
struct PlayerResponse {
    data: PlayerData,
    #[serde(default)]
    units: Vec<UnitWrapper>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PlayerData {
    ally_code: Option<u64>,
    level: u32,
    name: String,
    url: String,
    galactic_power: Option<u64>,
    character_galactic_power: Option<u64>,
    ship_galactic_power: Option<u64>,
    ship_battles_won: Option<u64>,
    pvp_battles_won: Option<u64>,
    pve_battles_won: Option<u64>,
    pve_hard_won: Option<u64>,
    galactic_war_won: Option<u64>,
    guild_raid_won: Option<u64>,
    guild_contribution: Option<u64>,
    guild_exchange_donations: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct UnitWrapper {
    data: UnitData,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct UnitData {
    base_id: String,
    combat_type: u32,
    gear_level: u32,
    level: u32,
    power: u64,
    rarity: u32,
    ability_data: Vec<AbilityData>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AbilityData {
    id: String,
    name: String,
    is_zeta: bool,
    ability_tier: u32,
}

/// Client for the swgoh.gg API
pub struct SwgohGg {
    client: Client,
    base_url: String,
}

impl SwgohGg {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: http_client(NAME, timeout)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}/{}", self.base_url, path);
        tracing::debug!(%url, "GET");

        let response = self.client.get(&url).send().map_err(|e| Error::Http {
            provider: NAME,
            source: e,
        })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(Error::Auth {
                provider: NAME,
                message: format!("GET {} returned {}", url, status),
            });
        }
        if !status.is_success() {
            return Err(Error::Provider {
                provider: NAME,
                message: format!("GET {} returned {}", url, status),
            });
        }

        response.json().map_err(|e| Error::Provider {
            provider: NAME,
            message: format!("malformed payload from {}: {}", url, e),
        })
    }

    fn unit_list(&self, path: &str) -> Result<Vec<UnitDefinition>> {
        let units: Vec<UnitResponse> = self.get(path)?;
        Ok(units.into_iter().map(to_definition).collect())
    }
}

impl Provider for SwgohGg {
    fn name(&self) -> &'static str {
        NAME
    }

    fn fetch_unit_catalog(&self) -> Result<UnitCatalog> {
        let heroes = self.unit_list("characters/")?;
        let ships = self.unit_list("ships/")?;
        let abilities: Vec<AbilityResponse> = self.get("abilities/")?;

        Ok(UnitCatalog {
            heroes,
            ships,
            abilities: abilities
                .into_iter()
                .map(|a| AbilityDefinition {
                    category: parse_category(&a.base_id),
                    base_id: a.base_id,
                    name: a.name,
                    tier_max: a.tier_max,
                    is_zeta: a.is_zeta,
                })
                .collect(),
        })
    }

    fn fetch_guild_roster(&self, guild: &GuildRef) -> Result<GuildRoster> {
        let guild_id = match guild {
            GuildRef::SwgohGg { guild_id } => *guild_id,
            other => {
                return Err(Error::Provider {
                    provider: NAME,
                    message: format!("cannot fetch {}", other),
                })
            }
        };

        let response: GuildResponse = self.get(&format!("guild/{}/", guild_id))?;
        let mut roster = GuildRoster::new(guild_id, response.data.name);
        for player in response.players {
            roster.members.push(to_player(player, None)?);
        }
        Ok(roster)
    }

    fn fetch_player(&self, ally_code: u64) -> Result<PlayerRecord> {
        let response: PlayerResponse = self.get(&format!("player/{}/", ally_code))?;
        to_player(response, Some(ally_code))
    }
}

fn to_definition(unit: UnitResponse) -> UnitDefinition {
    let tags: Vec<String> = [unit.alignment.clone(), unit.role.clone()]
        .into_iter()
        .chain(unit.categories)
        .collect();
    UnitDefinition::new(unit.base_id, unit.name, unit.alignment, unit.role, tags)
}

fn to_player(response: PlayerResponse, requested: Option<u64>) -> Result<PlayerRecord> {
    let data = response.data;
    let ally_code = data
        .ally_code
        .filter(|code| *code > 0)
        .or_else(|| first_number(&data.url))
        .or(requested)
        .filter(|code| *code > 0)
        .ok_or_else(|| Error::Provider {
            provider: NAME,
            message: format!("player '{}' has no ally code", data.name),
        })?;

    let mut player = PlayerRecord::new(ally_code, data.name, data.level);
    player.stats = PlayerStats {
        gp: data.galactic_power,
        heroes_gp: data.character_galactic_power,
        ships_gp: data.ship_galactic_power,
        fleet_arena_battles_won: data.ship_battles_won,
        squad_arena_battles_won: data.pvp_battles_won,
        normal_battles_won: data.pve_battles_won,
        hard_battles_won: data.pve_hard_won,
        galactic_war_battles_won: data.galactic_war_won,
        guild_raids_won: data.guild_raid_won,
        guild_tokens_earned: data.guild_contribution,
        gear_donated_in_guild_exchange: data.guild_exchange_donations,
        ..PlayerStats::default()
    };

    for unit in response.units {
        let unit = unit.data;
        if unit.base_id.is_empty() {
            return Err(Error::Provider {
                provider: NAME,
                message: format!("unit without base id on player {}", ally_code),
            });
        }
        let unit_type = UnitType::from_combat_type(unit.combat_type);
        player.add_unit(UnitInstance {
            base_id: unit.base_id,
            unit_type,
            level: unit.level,
            power: unit.power,
            rarity: unit.rarity,
            gear_level: (unit_type == UnitType::Hero).then_some(unit.gear_level),
            abilities: unit
                .ability_data
                .into_iter()
                .map(|a| Ability::new(a.name, parse_category(&a.id), a.ability_tier, a.is_zeta))
                .collect(),
        });
    }

    Ok(player)
}

/// First run of digits in `s`, e.g. the ally code in a profile url
pub(crate) fn first_number(s: &str) -> Option<u64> {
    let digits: String = s
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ability::AbilityCategory;
    use serde_json::json;

    fn client(server: &mockito::ServerGuard) -> SwgohGg {
        SwgohGg::new(server.url(), Duration::from_secs(5)).unwrap()
    }

    fn player_json(ally_code: u64, name: &str) -> serde_json::Value {
        json!({
            "data": {
                "ally_code": ally_code,
                "level": 85,
                "name": name,
                "url": format!("/p/{}/", ally_code),
                "galactic_power": 5000000,
                "character_galactic_power": 3000000,
                "ship_galactic_power": 2000000,
                "pvp_battles_won": 1200
            },
            "units": [
                {
                    "data": {
                        "base_id": "VADER",
                        "combat_type": 1,
                        "gear_level": 13,
                        "level": 85,
                        "power": 30000,
                        "rarity": 7,
                        "ability_data": [
                            { "id": "basicskill_VADER", "name": "Terrifying Swing", "is_zeta": false, "ability_tier": 8 },
                            { "id": "leaderskill_VADER", "name": "Inspiring Through Fear", "is_zeta": true, "ability_tier": 8 }
                        ]
                    }
                },
                {
                    "data": {
                        "base_id": "TIEADVANCED",
                        "combat_type": 2,
                        "gear_level": 1,
                        "level": 85,
                        "power": 40000,
                        "rarity": 7,
                        "ability_data": []
                    }
                }
            ]
        })
    }

    #[test]
    fn test_fetch_guild_roster_normalizes_players() {
        let mut server = mockito::Server::new();
        let body = json!({
            "data": { "name": "Rebel Scum", "id": 4321, "member_count": 2 },
            "players": [player_json(111222333, "Han"), player_json(444555666, "Leia")]
        });
        let mock = server
            .mock("GET", "/guild/4321/")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body.to_string())
            .expect(1)
            .create();

        let roster = client(&server)
            .fetch_guild_roster(&GuildRef::SwgohGg { guild_id: 4321 })
            .unwrap();

        mock.assert();
        assert_eq!(roster.id, 4321);
        assert_eq!(roster.name, "Rebel Scum");
        assert_eq!(roster.members.len(), 2);

        let han = &roster.members[0];
        assert_eq!(han.ally_code, 111222333);
        assert_eq!(han.stats.gp, Some(5000000));
        assert_eq!(han.stats.squad_arena_battles_won, Some(1200));
        assert_eq!(han.stats.squad_arena_rank, None);

        let vader = &han.units["VADER"];
        assert_eq!(vader.unit_type, UnitType::Hero);
        assert_eq!(vader.gear_level, Some(13));
        assert_eq!(vader.abilities[1].category, AbilityCategory::Leader);
        assert!(vader.abilities[1].is_zeta);

        let tie = &han.units["TIEADVANCED"];
        assert_eq!(tie.unit_type, UnitType::Ship);
        assert_eq!(tie.gear_level, None);
    }

    #[test]
    fn test_fetch_player_falls_back_to_url_ally_code() {
        let mut server = mockito::Server::new();
        let mut body = player_json(0, "Chewie");
        body["data"]["ally_code"] = serde_json::Value::Null;
        body["data"]["url"] = json!("/p/987654321/");
        let _player = server
            .mock("GET", "/player/987654321/")
            .with_status(200)
            .with_body(body.to_string())
            .create();

        let player = client(&server).fetch_player(987654321).unwrap();
        assert_eq!(player.ally_code, 987654321);
        assert_eq!(player.name, "Chewie");
        assert_eq!(player.units.len(), 2);
    }

    #[test]
    fn test_fetch_unit_catalog() {
        let mut server = mockito::Server::new();
        let _units = server
            .mock("GET", "/characters/")
            .with_status(200)
            .with_body(
                json!([{
                    "base_id": "VADER",
                    "name": "Darth Vader",
                    "alignment": "Dark Side",
                    "role": "Attacker",
                    "categories": ["Empire", "Sith", "Attacker"],
                    "combat_type": 1
                }])
                .to_string(),
            )
            .create();
        let _ships = server
            .mock("GET", "/ships/")
            .with_status(200)
            .with_body(
                json!([{
                    "base_id": "TIEADVANCED",
                    "name": "TIE Advanced x1",
                    "alignment": "Dark Side",
                    "role": "Attacker",
                    "categories": ["Empire"],
                    "combat_type": 2
                }])
                .to_string(),
            )
            .create();
        let _abilities = server
            .mock("GET", "/abilities/")
            .with_status(200)
            .with_body(
                json!([{
                    "base_id": "leaderskill_VADER",
                    "name": "Inspiring Through Fear",
                    "is_zeta": true,
                    "tier_max": 8
                }])
                .to_string(),
            )
            .create();

        let catalog = client(&server).fetch_unit_catalog().unwrap();

        assert_eq!(catalog.heroes.len(), 1);
        assert_eq!(catalog.ships.len(), 1);
        let vader = &catalog.heroes[0];
        assert_eq!(vader.tags, vec!["dark side", "attacker", "empire", "sith"]);
        assert_eq!(vader.alignment, "Dark Side");
        assert!(vader.abilities.is_none());
        assert_eq!(catalog.abilities[0].category, AbilityCategory::Leader);
        assert_eq!(catalog.abilities[0].tier_max, 8);
    }

    #[test]
    fn test_http_error_status() {
        let mut server = mockito::Server::new();
        let _guild = server.mock("GET", "/guild/1/").with_status(500).create();

        let err = client(&server)
            .fetch_guild_roster(&GuildRef::SwgohGg { guild_id: 1 })
            .unwrap_err();
        assert!(matches!(err, Error::Provider { .. }));
    }

    #[test]
    fn test_malformed_guild_payload() {
        let mut server = mockito::Server::new();
        let _guild = server
            .mock("GET", "/guild/1/")
            .with_status(200)
            .with_body(r#"{"data": {"name": "x"}}"#)
            .create();

        let err = client(&server)
            .fetch_guild_roster(&GuildRef::SwgohGg { guild_id: 1 })
            .unwrap_err();
        assert!(matches!(err, Error::Provider { .. }));
    }

    #[test]
    fn test_rejects_foreign_guild_ref() {
        let server = mockito::Server::new();
        let err = client(&server)
            .fetch_guild_roster(&GuildRef::SwgohHelp { ally_code: 1 })
            .unwrap_err();
        assert!(matches!(err, Error::Provider { .. }));
    }

    #[test]
    fn test_first_number() {
        assert_eq!(first_number("/p/123456789/"), Some(123456789));
        assert_eq!(first_number("G42abc7"), Some(42));
        assert_eq!(first_number("none"), None);
    }
}
