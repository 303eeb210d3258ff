//! swgoh.help client (authenticated API, guilds addressed by a member's ally code)

use super::swgoh_gg::first_number;
use super::{http_client, Provider};
use crate::ability::{parse_category, Ability};
use crate::error::{Error, Result};
use crate::model::{
    GuildRoster, PlayerRecord, PlayerStats, UnitCatalog, UnitDefinition, UnitInstance, UnitType,
};
use crate::setup::{Credentials, GuildRef};
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::cell::OnceCell;
use std::time::Duration;

const NAME: &str = "swgoh.help";
const LANGUAGE: &str = "eng_us";

/// Category ids that translate into unit tags; anything else is dropped
const CATEGORY_TAGS: &[(&str, &str)] = &[
    ("alignment_dark", "dark side"),
    ("alignment_light", "light side"),
    ("role_attacker", "attacker"),
    ("role_capital", "capital ship"),
    ("role_healer", "healer"),
    ("role_support", "support"),
    ("role_tank", "tank"),
    ("affiliation_empire", "empire"),
    ("affiliation_firstorder", "first order"),
    ("affiliation_imperialtrooper", "imperial trooper"),
    ("affiliation_nightsisters", "nightsister"),
    ("affiliation_oldrepublic", "old republic"),
    ("affiliation_phoenix", "phoenix"),
    ("affiliation_rebels", "rebel"),
    ("affiliation_republic", "galactic republic"),
    ("affiliation_resistance", "resistance"),
    ("affiliation_rogue_one", "rogue one"),
    ("affiliation_separatist", "separatist"),
    ("character_fleetcommander", "fleet commander"),
    ("profession_bountyhunter", "bounty hunters"),
    ("profession_clonetrooper", "clone trooper"),
    ("profession_jedi", "jedi"),
    ("profession_scoundrel", "scoundrel"),
    ("profession_sith", "sith"),
    ("profession_smuggler", "smuggler"),
    ("shipclass_cargoship", "cargo ship"),
    ("species_droid", "droid"),
    ("species_ewok", "ewok"),
    ("species_geonosian", "geonosian"),
    ("species_jawa", "jawa"),
    ("species_tusken", "tusken"),
];

fn category_tag(id: &str) -> Option<&'static str> {
    CATEGORY_TAGS
        .iter()
        .find(|(key, _)| *key == id)
        .map(|(_, tag)| *tag)
}

#[derive(Serialize)]
struct SignIn<'a> {
    username: &'a str,
    password: &'a str,
    grant_type: &'static str,
    client_id: &'static str,
    client_secret: &'static str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct UnitListEntry {
    base_id: String,
    name_key: String,
    force_alignment: u32,
    combat_type: u32,
    category_id_list: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GuildResponse {
    id: String,
    name: String,
    roster: Vec<GuildMember>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct GuildMember {
    ally_code: u64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct PlayerResponse {
    ally_code: u64,
    level: u32,
    name: String,
    stats: Vec<StatEntry>,
    arena: Arena,
    roster: Vec<RosterUnit>,
    error: Option<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StatEntry {
    index: u32,
    value: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Arena {
    char: ArenaRank,
    ship: ArenaRank,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ArenaRank {
    rank: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RosterUnit {
    def_id: String,
    combat_type: u32,
    gp: u64,
    gear: u32,
    level: u32,
    rarity: u32,
    skills: Vec<Skill>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct Skill {
    id: String,
    name_key: String,
    tier: u32,
    is_zeta: bool,
}

/// Client for the swgoh.help API
pub struct SwgohHelp {
    client: Client,
    base_url: String,
    credentials: Credentials,
    token: OnceCell<String>,
}

impl SwgohHelp {
    pub fn new(
        base_url: impl Into<String>,
        credentials: Credentials,
        timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            client: http_client(NAME, timeout)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
            token: OnceCell::new(),
        })
    }

    /// Bearer token, signing in on first use
    fn token(&self) -> Result<&str> {
        if let Some(token) = self.token.get() {
            return Ok(token.as_str());
        }
        let token = self.sign_in()?;
        Ok(self.token.get_or_init(|| token).as_str())
    }

    fn sign_in(&self) -> Result<String> {
        if !self.credentials.has_password() {
            return Err(Error::Auth {
                provider: NAME,
                message: "no username/password configured".to_string(),
            });
        }

        let form = SignIn {
            username: self.credentials.username.trim(),
            password: &self.credentials.password,
            grant_type: "password",
            client_id: "abc",
            client_secret: "123",
        };
        let url = format!("{}/auth/signin", self.base_url);
        tracing::debug!(%url, "signing in");

        let response: TokenResponse = self.send(self.client.post(&url).form(&form), &url)?;
        Ok(response.access_token)
    }

    fn post<T: DeserializeOwned>(&self, path: &str, body: &serde_json::Value) -> Result<T> {
        let token = self.token()?;
        let url = format!("{}/{}", self.base_url, path);
        tracing::debug!(%url, "POST");

        self.send(self.client.post(&url).bearer_auth(token).json(body), &url)
    }

    fn send<T: DeserializeOwned>(&self, request: RequestBuilder, url: &str) -> Result<T> {
        let response = request.send().map_err(|e| Error::Http {
            provider: NAME,
            source: e,
        })?;

        let status = response.status();
        if matches!(
            status,
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
        ) {
            return Err(Error::Auth {
                provider: NAME,
                message: format!("POST {} returned {}", url, status),
            });
        }
        if !status.is_success() {
            return Err(Error::Provider {
                provider: NAME,
                message: format!("POST {} returned {}", url, status),
            });
        }

        response.json().map_err(|e| Error::Provider {
            provider: NAME,
            message: format!("malformed payload from {}: {}", url, e),
        })
    }

    fn players(&self, ally_codes: &[u64]) -> Result<Vec<PlayerRecord>> {
        let body = json!({
            "allycodes": ally_codes,
            "language": LANGUAGE,
            "project": {
                "allyCode": true,
                "level": true,
                "name": true,
                "stats": true,
                "arena": { "char": { "rank": true }, "ship": { "rank": true } },
                "roster": {
                    "combatType": true,
                    "defId": true,
                    "gp": true,
                    "gear": true,
                    "level": true,
                    "rarity": true,
                    "skills": { "id": true, "tier": true, "nameKey": true, "isZeta": true }
                }
            }
        });
        let players: Vec<PlayerResponse> = self.post("swgoh/players", &body)?;
        players.into_iter().map(to_player).collect()
    }
}

impl Provider for SwgohHelp {
    fn name(&self) -> &'static str {
        NAME
    }

    fn fetch_unit_catalog(&self) -> Result<UnitCatalog> {
        let body = json!({
            "collection": "unitsList",
            "language": LANGUAGE,
            "match": { "rarity": 7, "obtainable": true, "obtainableTime": 0 },
            "project": {
                "baseId": true,
                "nameKey": true,
                "forceAlignment": true,
                "combatType": true,
                "categoryIdList": true
            }
        });
        let units: Vec<UnitListEntry> = self.post("swgoh/data", &body)?;
        if units.is_empty() {
            return Err(Error::Provider {
                provider: NAME,
                message: "empty unit list".to_string(),
            });
        }

        let mut catalog = UnitCatalog::default();
        for unit in units {
            let combat_type = UnitType::from_combat_type(unit.combat_type);
            let definition = to_definition(unit);
            match combat_type {
                UnitType::Hero => catalog.heroes.push(definition),
                UnitType::Ship => catalog.ships.push(definition),
            }
        }
        Ok(catalog)
    }

    fn fetch_guild_roster(&self, guild: &GuildRef) -> Result<GuildRoster> {
        let ally_code = match guild {
            GuildRef::SwgohHelp { ally_code } => *ally_code,
            other => {
                return Err(Error::Provider {
                    provider: NAME,
                    message: format!("cannot fetch {}", other),
                })
            }
        };

        let body = json!({
            "allycode": ally_code,
            "language": LANGUAGE,
            "project": {
                "id": true,
                "name": true,
                "roster": { "allyCode": true, "level": true, "name": true }
            }
        });
        let mut guilds: Vec<GuildResponse> = self.post("swgoh/guilds", &body)?;
        if guilds.len() != 1 {
            return Err(Error::Provider {
                provider: NAME,
                message: format!("expected one guild for ally code {}, got {}", ally_code, guilds.len()),
            });
        }
        let guild = guilds.remove(0);

        let id = first_number(&guild.id).ok_or_else(|| Error::Provider {
            provider: NAME,
            message: format!("guild id '{}' has no digits", guild.id),
        })?;

        let ally_codes: Vec<u64> = guild
            .roster
            .iter()
            .map(|m| m.ally_code)
            .filter(|code| *code > 0)
            .collect();
        if ally_codes.is_empty() {
            return Err(Error::Provider {
                provider: NAME,
                message: format!("guild '{}' has no members", guild.name),
            });
        }

        let mut roster = GuildRoster::new(id, guild.name);
        roster.members = self.players(&ally_codes)?;
        Ok(roster)
    }

    fn fetch_player(&self, ally_code: u64) -> Result<PlayerRecord> {
        let mut players = self.players(&[ally_code])?;
        if players.len() != 1 {
            return Err(Error::Provider {
                provider: NAME,
                message: format!("expected one player for ally code {}, got {}", ally_code, players.len()),
            });
        }
        Ok(players.remove(0))
    }
}

fn to_definition(unit: UnitListEntry) -> UnitDefinition {
    let alignment = match unit.force_alignment {
        2 => "light side",
        3 => "dark side",
        _ => "",
    };
    let role = unit
        .category_id_list
        .iter()
        .filter(|id| id.starts_with("role_"))
        .find_map(|id| category_tag(id))
        .unwrap_or_default();
    let tags: Vec<&str> = std::iter::once(alignment)
        .chain(unit.category_id_list.iter().filter_map(|id| category_tag(id)))
        .collect();

    UnitDefinition::new(
        unit.base_id,
        unit.name_key,
        alignment,
        role,
        tags.into_iter().map(str::to_string).collect(),
    )
}

fn to_player(response: PlayerResponse) -> Result<PlayerRecord> {
    if let Some(error) = response.error {
        return Err(Error::Provider {
            provider: NAME,
            message: format!("player lookup failed: {}", error),
        });
    }
    if response.ally_code == 0 {
        return Err(Error::Provider {
            provider: NAME,
            message: format!("player '{}' has no ally code", response.name),
        });
    }

    let stat = |index: u32| {
        response
            .stats
            .iter()
            .find(|s| s.index == index)
            .and_then(|s| s.value)
    };
    let stats = PlayerStats {
        gp: stat(1),
        heroes_gp: stat(2),
        ships_gp: stat(3),
        fleet_arena_rank: response.arena.ship.rank,
        fleet_arena_battles_won: stat(4),
        squad_arena_rank: response.arena.char.rank,
        squad_arena_battles_won: stat(5),
        normal_battles_won: stat(6),
        hard_battles_won: stat(7),
        galactic_war_battles_won: stat(8),
        guild_raids_won: stat(9),
        guild_tokens_earned: stat(10),
        gear_donated_in_guild_exchange: stat(11),
    };

    let mut player = PlayerRecord::new(response.ally_code, response.name, response.level);
    player.stats = stats;

    for unit in response.roster {
        let unit_type = UnitType::from_combat_type(unit.combat_type);
        player.add_unit(UnitInstance {
            base_id: unit.def_id,
            unit_type,
            level: unit.level,
            power: unit.gp,
            rarity: unit.rarity,
            gear_level: (unit_type == UnitType::Hero).then_some(unit.gear),
            abilities: unit
                .skills
                .into_iter()
                .map(|s| Ability::new(s.name_key, parse_category(&s.id), s.tier, s.is_zeta))
                .collect(),
        });
    }

    Ok(player)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ability::AbilityCategory;
    use mockito::Matcher;

    fn credentials() -> Credentials {
        Credentials {
            username: "user".to_string(),
            password: "pass".to_string(),
        }
    }

    fn client(server: &mockito::ServerGuard) -> SwgohHelp {
        SwgohHelp::new(server.url(), credentials(), Duration::from_secs(5)).unwrap()
    }

    fn mock_sign_in(server: &mut mockito::ServerGuard) -> mockito::Mock {
        server
            .mock("POST", "/auth/signin")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("username".into(), "user".into()),
                Matcher::UrlEncoded("grant_type".into(), "password".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"access_token": "tok", "expires_in": 3600}"#)
            .expect(1)
            .create()
    }

    fn player_json(ally_code: u64, name: &str) -> serde_json::Value {
        json!({
            "allyCode": ally_code,
            "level": 85,
            "name": name,
            "stats": [
                { "index": 1, "value": 4000000 },
                { "index": 2, "value": 2500000 },
                { "index": 5, "value": 900 },
                { "index": 11, "value": 321 }
            ],
            "arena": { "char": { "rank": 12 }, "ship": { "rank": 34 } },
            "roster": [
                {
                    "defId": "REYJEDITRAINING",
                    "combatType": 1,
                    "gp": 25000,
                    "gear": 12,
                    "level": 85,
                    "rarity": 7,
                    "skills": [
                        { "id": "specialskill_REYJEDITRAINING01", "nameKey": "Insight", "tier": 8, "isZeta": false },
                        { "id": "leaderskill_REYJEDITRAINING", "nameKey": "Inspiring Through Light", "tier": 8, "isZeta": true }
                    ]
                },
                {
                    "defId": "MILLENNIUMFALCON",
                    "combatType": 2,
                    "gp": 50000,
                    "gear": 1,
                    "level": 85,
                    "rarity": 7,
                    "skills": []
                }
            ]
        })
    }

    #[test]
    fn test_fetch_guild_signs_in_once() {
        let mut server = mockito::Server::new();
        let sign_in = mock_sign_in(&mut server);
        let guild = server
            .mock("POST", "/swgoh/guilds")
            .match_header("authorization", "Bearer tok")
            .match_body(Matcher::PartialJson(json!({ "allycode": 111222333 })))
            .with_status(200)
            .with_body(
                json!([{
                    "id": "G1234567890",
                    "name": "Resistance HQ",
                    "roster": [{ "allyCode": 111222333 }, { "allyCode": 444555666 }]
                }])
                .to_string(),
            )
            .expect(2)
            .create();
        let players = server
            .mock("POST", "/swgoh/players")
            .match_header("authorization", "Bearer tok")
            .match_body(Matcher::PartialJson(json!({ "allycodes": [111222333, 444555666] })))
            .with_status(200)
            .with_body(
                json!([player_json(111222333, "Rey"), player_json(444555666, "Finn")]).to_string(),
            )
            .expect(2)
            .create();

        let help = client(&server);
        let reference = GuildRef::SwgohHelp { ally_code: 111222333 };
        let roster = help.fetch_guild_roster(&reference).unwrap();
        help.fetch_guild_roster(&reference).unwrap();

        sign_in.assert();
        guild.assert();
        players.assert();

        assert_eq!(roster.id, 1234567890);
        assert_eq!(roster.name, "Resistance HQ");
        assert_eq!(roster.members.len(), 2);

        let rey = &roster.members[0];
        assert_eq!(rey.stats.gp, Some(4000000));
        assert_eq!(rey.stats.ships_gp, None);
        assert_eq!(rey.stats.squad_arena_battles_won, Some(900));
        assert_eq!(rey.stats.squad_arena_rank, Some(12));
        assert_eq!(rey.stats.fleet_arena_rank, Some(34));
        assert_eq!(rey.stats.gear_donated_in_guild_exchange, Some(321));

        let unit = &rey.units["REYJEDITRAINING"];
        assert_eq!(unit.power, 25000);
        assert_eq!(unit.gear_level, Some(12));
        assert_eq!(unit.abilities[1].category, AbilityCategory::Leader);
        assert_eq!(rey.units["MILLENNIUMFALCON"].gear_level, None);
    }

    #[test]
    fn test_fetch_unit_catalog_maps_categories() {
        let mut server = mockito::Server::new();
        let _sign_in = mock_sign_in(&mut server);
        let _data = server
            .mock("POST", "/swgoh/data")
            .match_body(Matcher::PartialJson(json!({ "collection": "unitsList" })))
            .with_status(200)
            .with_body(
                json!([
                    {
                        "baseId": "REYJEDITRAINING",
                        "nameKey": "Rey (Jedi Training)",
                        "forceAlignment": 2,
                        "combatType": 1,
                        "categoryIdList": ["role_attacker", "affiliation_resistance", "species_human", "profession_jedi"]
                    },
                    {
                        "baseId": "MILLENNIUMFALCON",
                        "nameKey": "Millennium Falcon",
                        "forceAlignment": 2,
                        "combatType": 2,
                        "categoryIdList": ["shipclass_cargoship", "affiliation_rebels"]
                    }
                ])
                .to_string(),
            )
            .create();

        let catalog = client(&server).fetch_unit_catalog().unwrap();

        assert_eq!(catalog.heroes.len(), 1);
        assert_eq!(catalog.ships.len(), 1);
        let rey = &catalog.heroes[0];
        assert_eq!(rey.name, "Rey (Jedi Training)");
        assert_eq!(rey.alignment, "light side");
        assert_eq!(rey.role, "attacker");
        assert_eq!(rey.tags, vec!["light side", "attacker", "resistance", "jedi"]);
        assert_eq!(catalog.ships[0].role, "");
        assert!(catalog.abilities.is_empty());
    }

    #[test]
    fn test_rejected_credentials() {
        let mut server = mockito::Server::new();
        let _sign_in = server.mock("POST", "/auth/signin").with_status(401).create();

        let err = client(&server).fetch_player(1).unwrap_err();
        assert!(matches!(err, Error::Auth { .. }));
    }

    #[test]
    fn test_missing_password_fails_without_request() {
        let server = mockito::Server::new();
        let help = SwgohHelp::new(server.url(), Credentials::default(), Duration::from_secs(5))
            .unwrap();

        assert!(matches!(help.fetch_player(1), Err(Error::Auth { .. })));
    }

    #[test]
    fn test_player_error_entry() {
        let mut server = mockito::Server::new();
        let _sign_in = mock_sign_in(&mut server);
        let _players = server
            .mock("POST", "/swgoh/players")
            .with_status(200)
            .with_body(r#"[{"error": "not found"}]"#)
            .create();

        let err = client(&server).fetch_player(999).unwrap_err();
        assert!(matches!(err, Error::Provider { .. }));
    }

    #[test]
    fn test_category_tag_table() {
        assert_eq!(category_tag("profession_bountyhunter"), Some("bounty hunters"));
        assert_eq!(category_tag("species_human"), None);
    }
}
