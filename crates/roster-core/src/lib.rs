//! roster-core: Core library for aggregating guild rosters into tables
//!
//! This library provides functionality to:
//! - Load the setup file (guild sources, credentials, output switches)
//! - Fetch the unit catalog, guilds and players from swgoh.gg or swgoh.help
//! - Apply manual rename/add/remove directives to the fetched rosters
//! - Project rosters into roster, unit, ability, hero and ship tables
//! - Skip the whole cycle when no setting changed since the last refresh

pub mod ability;
pub mod cache;
pub mod error;
pub mod freshness;
pub mod model;
pub mod orchestrator;
pub mod parser;
pub mod projector;
pub mod provider;
pub mod rar;
pub mod reconciler;
pub mod setup;
pub mod sink;
pub mod table;

pub use ability::{parse_category, sort_abilities, Ability, AbilityCategory};
pub use cache::{Cache, FileCache, MemoryCache};
pub use error::{Error, Result};
pub use freshness::{Digests, Domain, FreshnessTracker};
pub use model::{GuildRoster, PlayerRecord, UnitCatalog, UnitDefinition, UnitInstance, UnitType};
pub use orchestrator::{Orchestrator, RefreshOutcome, RefreshSummary};
pub use parser::parse_csv;
pub use projector::{project, Projection};
pub use provider::{PlayerSource, Provider, ProviderAdapter};
pub use rar::{RarDirectives, RarRow};
pub use reconciler::reconcile;
pub use setup::{GuildSettings, Setup};
pub use sink::{list_tables, DirectorySink, MemorySink, OutputFormat, TableFile, TableSink};
pub use table::{CellValue, Column, Row, Table};
