//! Data providers and the adapter that routes requests between them
//!
//! Each backing provider reports failures as [`Error`](crate::Error). The
//! [`ProviderAdapter`] sits in front of them, logs failures and hands the
//! orchestrator `Option`s: either a complete object or nothing.

pub mod swgoh_gg;
pub mod swgoh_help;

pub use swgoh_gg::SwgohGg;
pub use swgoh_help::SwgohHelp;

use crate::error::{Error, Result};
use crate::model::{GuildRoster, PlayerRecord, UnitCatalog};
use crate::setup::{DataSource, GuildRef, GuildSettings, Setup};
use reqwest::blocking::Client;
use std::time::Duration;
use tracing::{debug, warn};

/// A source of units, guilds and players
pub trait Provider {
    fn name(&self) -> &'static str;

    /// Every hero, ship and ability definition
    fn fetch_unit_catalog(&self) -> Result<UnitCatalog>;

    /// A guild and all of its members with their units
    fn fetch_guild_roster(&self, guild: &GuildRef) -> Result<GuildRoster>;

    /// A single player with their units
    fn fetch_player(&self, ally_code: u64) -> Result<PlayerRecord>;
}

/// Single-player lookups used by the reconciler
pub trait PlayerSource {
    fn fetch_player(&self, ally_code: u64) -> Option<PlayerRecord>;
}

pub(crate) fn http_client(provider: &'static str, timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| Error::Http { provider, source: e })
}

/// Routes requests to the provider that serves them
pub struct ProviderAdapter {
    swgoh_gg: Box<dyn Provider>,
    swgoh_help: Box<dyn Provider>,
    catalog_source: DataSource,
    player_source: DataSource,
}

impl ProviderAdapter {
    pub fn new(
        swgoh_gg: Box<dyn Provider>,
        swgoh_help: Box<dyn Provider>,
        catalog_source: DataSource,
        player_source: DataSource,
    ) -> Self {
        Self {
            swgoh_gg,
            swgoh_help,
            catalog_source,
            player_source,
        }
    }

    /// Build both HTTP clients from the setup.
    ///
    /// Single players come from swgoh.help when a password is configured,
    /// otherwise from swgoh.gg.
    pub fn from_setup(setup: &Setup) -> Result<Self> {
        let timeout = Duration::from_secs(setup.providers.timeout_secs);
        let swgoh_gg = SwgohGg::new(&setup.providers.swgoh_gg_url, timeout)?;
        let swgoh_help = SwgohHelp::new(
            &setup.providers.swgoh_help_url,
            setup.swgoh_help.clone(),
            timeout,
        )?;
        let player_source = if setup.swgoh_help.has_password() {
            DataSource::SwgohHelp
        } else {
            DataSource::SwgohGg
        };

        Ok(Self::new(
            Box::new(swgoh_gg),
            Box::new(swgoh_help),
            setup.providers.catalog_source,
            player_source,
        ))
    }

    fn provider(&self, source: DataSource) -> &dyn Provider {
        match source {
            DataSource::SwgohGg => self.swgoh_gg.as_ref(),
            DataSource::SwgohHelp => self.swgoh_help.as_ref(),
        }
    }

    pub fn fetch_catalog(&self) -> Option<UnitCatalog> {
        let provider = self.provider(self.catalog_source);
        match provider.fetch_unit_catalog() {
            Ok(catalog) => {
                debug!(
                    provider = provider.name(),
                    units = catalog.unit_count(),
                    abilities = catalog.abilities.len(),
                    "fetched unit catalog"
                );
                Some(catalog)
            }
            Err(e) => {
                warn!(provider = provider.name(), error = %e, "unit catalog fetch failed");
                None
            }
        }
    }

    pub fn fetch_guild(&self, guild: &GuildSettings) -> Option<GuildRoster> {
        let provider = self.provider(guild.source.data_source());
        match provider.fetch_guild_roster(&guild.source) {
            Ok(roster) => {
                debug!(
                    provider = provider.name(),
                    guild = %roster.name,
                    members = roster.members.len(),
                    "fetched guild"
                );
                Some(roster)
            }
            Err(e) => {
                warn!(provider = provider.name(), source = %guild.source, error = %e, "guild fetch failed");
                None
            }
        }
    }
}

impl PlayerSource for ProviderAdapter {
    fn fetch_player(&self, ally_code: u64) -> Option<PlayerRecord> {
        let provider = self.provider(self.player_source);
        match provider.fetch_player(ally_code) {
            Ok(player) => Some(player),
            Err(e) => {
                warn!(provider = provider.name(), ally_code, error = %e, "player fetch failed");
                None
            }
        }
    }
}
