//! Setup file: guild sources, credentials and output-shaping switches
//!
//! The setup is a JSON document loaded once per refresh cycle. Switches keep
//! the permissive spreadsheet convention: a switch is on when it holds `true`
//! or the exact string `"ON"`, and off for anything else. Enumerated settings
//! are strict and fail to load on unknown values.

use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const SWGOH_GG_URL: &str = "https://swgoh.gg/api";
pub const SWGOH_HELP_URL: &str = "https://api.swgoh.help";

/// An on/off switch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Toggle(pub bool);

impl Toggle {
    pub const ON: Toggle = Toggle(true);
    pub const OFF: Toggle = Toggle(false);

    pub fn is_on(self) -> bool {
        self.0
    }
}

impl<'de> Deserialize<'de> for Toggle {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Bool(bool),
            Text(String),
            Other(Value),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Bool(b) => Toggle(b),
            Raw::Text(s) => Toggle(s == "ON"),
            Raw::Other(_) => Toggle::OFF,
        })
    }
}

/// Which provider backs a guild
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataSource {
    SwgohGg,
    SwgohHelp,
}

impl DataSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataSource::SwgohGg => "SwgohGg",
            DataSource::SwgohHelp => "SwgohHelp",
        }
    }

    /// Lenient lookup used for guild rows, where unknown sources disable the row
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "SwgohGg" => Some(DataSource::SwgohGg),
            "SwgohHelp" => Some(DataSource::SwgohHelp),
            _ => None,
        }
    }
}

impl FromStr for DataSource {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        DataSource::parse(s).ok_or_else(|| Error::invalid_setting("data_source", s))
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which unit rows the heroes/ships tables receive
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum UnitTypes {
    #[default]
    Both,
    HeroesOnly,
    ShipsOnly,
}

impl UnitTypes {
    pub fn label(&self) -> &'static str {
        match self {
            UnitTypes::Both => "Heroes & Ships",
            UnitTypes::HeroesOnly => "Heroes only",
            UnitTypes::ShipsOnly => "Ships only",
        }
    }

    pub fn includes_heroes(&self) -> bool {
        *self != UnitTypes::ShipsOnly
    }

    pub fn includes_ships(&self) -> bool {
        *self != UnitTypes::HeroesOnly
    }
}

impl FromStr for UnitTypes {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "Heroes & Ships" | "both" => Ok(UnitTypes::Both),
            "Heroes only" | "heroes-only" => Ok(UnitTypes::HeroesOnly),
            "Ships only" | "ships-only" => Ok(UnitTypes::ShipsOnly),
            other => Err(Error::invalid_setting("unit_types", other)),
        }
    }
}

impl TryFrom<String> for UnitTypes {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<UnitTypes> for String {
    fn from(v: UnitTypes) -> Self {
        v.label().to_string()
    }
}

/// Which hero abilities are projected into the heroes table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum HeroAbilityMode {
    #[default]
    None,
    Zetas,
    LeaderAndZetas,
    Detailed,
}

impl HeroAbilityMode {
    pub fn label(&self) -> &'static str {
        match self {
            HeroAbilityMode::None => "None",
            HeroAbilityMode::Zetas => "Zetas only",
            HeroAbilityMode::LeaderAndZetas => "Leader & zetas",
            HeroAbilityMode::Detailed => "Detailed",
        }
    }
}

impl FromStr for HeroAbilityMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "None" | "none" => Ok(HeroAbilityMode::None),
            "Zetas only" | "zetas" => Ok(HeroAbilityMode::Zetas),
            "Leader & zetas" | "leader-and-zetas" => Ok(HeroAbilityMode::LeaderAndZetas),
            "Detailed" | "detailed" => Ok(HeroAbilityMode::Detailed),
            other => Err(Error::invalid_setting("hero_abilities", other)),
        }
    }
}

impl TryFrom<String> for HeroAbilityMode {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<HeroAbilityMode> for String {
    fn from(v: HeroAbilityMode) -> Self {
        v.label().to_string()
    }
}

/// One row of the guild-source table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuildRow {
    pub enabled: Toggle,
    /// Display name; filled from the fetched roster when blank
    pub name: String,
    pub data_source: String,
    pub guild_id: Option<u64>,
    pub ally_code: Option<u64>,
}

impl GuildRow {
    /// Interpret the row as an active guild, if it is one
    pub fn to_settings(&self) -> Option<GuildSettings> {
        if !self.enabled.is_on() {
            return None;
        }
        let source = match DataSource::parse(&self.data_source)? {
            DataSource::SwgohGg => GuildRef::SwgohGg {
                guild_id: self.guild_id?,
            },
            DataSource::SwgohHelp => GuildRef::SwgohHelp {
                ally_code: self.ally_code?,
            },
        };
        Some(GuildSettings {
            name: self.name.trim().to_string(),
            source,
        })
    }
}

/// How a guild is addressed at its provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GuildRef {
    /// swgoh.gg addresses guilds by guild id
    SwgohGg { guild_id: u64 },
    /// swgoh.help addresses guilds through any member's ally code
    SwgohHelp { ally_code: u64 },
}

impl GuildRef {
    pub fn data_source(&self) -> DataSource {
        match self {
            GuildRef::SwgohGg { .. } => DataSource::SwgohGg,
            GuildRef::SwgohHelp { .. } => DataSource::SwgohHelp,
        }
    }
}

impl fmt::Display for GuildRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GuildRef::SwgohGg { guild_id } => write!(f, "SwgohGg guild {}", guild_id),
            GuildRef::SwgohHelp { ally_code } => write!(f, "SwgohHelp ally code {}", ally_code),
        }
    }
}

/// An active guild source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildSettings {
    pub name: String,
    pub source: GuildRef,
}

/// swgoh.help login
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn has_password(&self) -> bool {
        !self.password.trim().is_empty()
    }
}

/// Optional column groups of the roster table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RosterOptions {
    pub gp: Toggle,
    pub battles: Toggle,
    pub guild_activities: Toggle,
}

/// Shape of the heroes/ships/units tables
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnitOptions {
    pub unit_types: UnitTypes,
    pub hero_abilities: HeroAbilityMode,
    pub ship_abilities: Toggle,
}

/// Everything that shapes the projected tables
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutputOptions {
    pub roster: RosterOptions,
    pub units: UnitOptions,
}

/// Provider endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderOptions {
    pub swgoh_gg_url: String,
    pub swgoh_help_url: String,
    /// Provider used for the unit catalog
    pub catalog_source: DataSource,
    pub timeout_secs: u64,
}

impl Default for ProviderOptions {
    fn default() -> Self {
        Self {
            swgoh_gg_url: SWGOH_GG_URL.to_string(),
            swgoh_help_url: SWGOH_HELP_URL.to_string(),
            catalog_source: DataSource::SwgohGg,
            timeout_secs: 30,
        }
    }
}

/// The whole setup file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Setup {
    /// Prefix for the freshness cache keys
    pub cache_key: String,
    /// File cache location, relative to the setup file
    pub cache_path: PathBuf,
    /// RAR table location (CSV), relative to the setup file
    pub rar_table: Option<PathBuf>,
    pub guilds: Vec<GuildRow>,
    pub swgoh_help: Credentials,
    pub roster: RosterOptions,
    pub units: UnitOptions,
    pub providers: ProviderOptions,
    /// Directory the setup was loaded from
    #[serde(skip)]
    pub base_dir: PathBuf,
}

impl Default for Setup {
    fn default() -> Self {
        Self {
            cache_key: "roster".to_string(),
            cache_path: PathBuf::from(".roster-cache.json"),
            rar_table: None,
            guilds: Vec::new(),
            swgoh_help: Credentials::default(),
            roster: RosterOptions::default(),
            units: UnitOptions::default(),
            providers: ProviderOptions::default(),
            base_dir: PathBuf::new(),
        }
    }
}

impl Setup {
    /// Load a setup file from JSON
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let mut setup = Self::from_json(&content)?;
        setup.base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Ok(setup)
    }

    /// Parse a setup document, surfacing bad enumerated values as
    /// [`Error::InvalidSetting`]
    pub fn from_json(content: &str) -> Result<Self> {
        let raw: Value = serde_json::from_str(content)?;
        check_setting::<UnitTypes>(&raw, "units", "unit_types")?;
        check_setting::<HeroAbilityMode>(&raw, "units", "hero_abilities")?;
        check_setting::<DataSource>(&raw, "providers", "catalog_source")?;
        Ok(serde_json::from_value(raw)?)
    }

    /// Save the setup file to JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// A commented-by-example starting point for `roster init`
    pub fn template() -> Self {
        Self {
            cache_key: "my-guilds".to_string(),
            rar_table: Some(PathBuf::from("rar.csv")),
            guilds: vec![GuildRow {
                enabled: Toggle::ON,
                name: String::new(),
                data_source: DataSource::SwgohGg.to_string(),
                guild_id: Some(0),
                ally_code: None,
            }],
            roster: RosterOptions {
                gp: Toggle::ON,
                ..RosterOptions::default()
            },
            units: UnitOptions {
                hero_abilities: HeroAbilityMode::LeaderAndZetas,
                ..UnitOptions::default()
            },
            ..Self::default()
        }
    }

    /// Enabled rows that name a known data source and carry its identifier
    pub fn active_guilds(&self) -> Vec<GuildSettings> {
        self.guilds.iter().filter_map(GuildRow::to_settings).collect()
    }

    pub fn output_options(&self) -> OutputOptions {
        OutputOptions {
            roster: self.roster,
            units: self.units,
        }
    }

    /// Resolve a path relative to the setup file directory
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    pub fn cache_file(&self) -> PathBuf {
        self.resolve(&self.cache_path)
    }

    pub fn rar_table_file(&self) -> Option<PathBuf> {
        self.rar_table.as_deref().map(|p| self.resolve(p))
    }

    /// Write resolved display names back onto the matching enabled rows
    pub fn apply_guild_names(&mut self, guilds: &[GuildSettings]) {
        for settings in guilds {
            let row = self.guilds.iter_mut().find(|row| {
                row.to_settings()
                    .is_some_and(|s| s.source == settings.source)
            });
            if let Some(row) = row {
                if row.name != settings.name {
                    row.name = settings.name.clone();
                }
            }
        }
    }
}

/// Parse `section.setting` with `T`'s own rules, if present
fn check_setting<T: FromStr>(raw: &Value, section: &str, setting: &str) -> Result<()> {
    match raw.get(section).and_then(|s| s.get(setting)) {
        None | Some(Value::Null) => Ok(()),
        Some(Value::String(s)) => s
            .parse::<T>()
            .map(|_| ())
            .map_err(|_| Error::invalid_setting(setting, s.as_str())),
        Some(other) => Err(Error::invalid_setting(setting, other.to_string())),
    }
}
