//! One refresh cycle: freshness gate, fetch, reconcile, project, write, commit

use crate::cache::Cache;
use crate::error::{Error, Result};
use crate::freshness::{Digests, Domain, FreshnessTracker};
use crate::model::GuildRoster;
use crate::projector::project;
use crate::provider::ProviderAdapter;
use crate::rar::{RarDirectives, RarRow};
use crate::reconciler::reconcile;
use crate::setup::{DataSource, GuildSettings, Setup};
use crate::sink::TableSink;
use tracing::info;

/// What a refresh did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Every settings domain matched its cached digest
    UpToDate,
    Refreshed(RefreshSummary),
}

/// Results of a completed refresh
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshSummary {
    /// Active guilds with display names resolved from the fetched rosters
    pub guilds: Vec<GuildSettings>,
    /// Players across all rosters after reconciliation
    pub players: usize,
    /// Row count of each written table, in write order
    pub tables: Vec<(String, usize)>,
}

/// Runs refresh cycles against a setup, a provider adapter, a cache and a sink
pub struct Orchestrator<'a> {
    setup: &'a Setup,
    rar_rows: &'a [RarRow],
    providers: &'a ProviderAdapter,
    cache: &'a mut dyn Cache,
    sink: &'a mut dyn TableSink,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        setup: &'a Setup,
        rar_rows: &'a [RarRow],
        providers: &'a ProviderAdapter,
        cache: &'a mut dyn Cache,
        sink: &'a mut dyn TableSink,
    ) -> Self {
        Self {
            setup,
            rar_rows,
            providers,
            cache,
            sink,
        }
    }

    /// Freshness of every settings domain, without fetching anything
    pub fn status(&mut self) -> Result<Vec<(Domain, bool)>> {
        let digests = Digests::compute(self.setup, self.rar_rows)?;
        let tracker = FreshnessTracker::new(&mut *self.cache, self.setup.cache_key.as_str(), digests);
        Ok(tracker.report())
    }

    /// Run one cycle. Digests are committed only after every table has been
    /// written, so any failure leaves the cache stale.
    pub fn refresh(&mut self, force: bool) -> Result<RefreshOutcome> {
        let setup = self.setup;
        let guilds = setup.active_guilds();
        let digests = Digests::compute(setup, self.rar_rows)?;
        let mut tracker = FreshnessTracker::new(&mut *self.cache, setup.cache_key.as_str(), digests);

        if !force && tracker.all_fresh() {
            info!("settings unchanged, nothing to do");
            return Ok(RefreshOutcome::UpToDate);
        }
        info!(guilds = guilds.len(), force, "refreshing");

        let mut catalog = self
            .providers
            .fetch_catalog()
            .ok_or(Error::CatalogUnavailable)?;

        let mut rosters: Vec<GuildRoster> = Vec::with_capacity(guilds.len());
        let mut resolved = Vec::with_capacity(guilds.len());
        for guild in &guilds {
            let roster = self.providers.fetch_guild(guild).ok_or_else(|| {
                let label = if guild.name.is_empty() {
                    guild.source.to_string()
                } else {
                    guild.name.clone()
                };
                Error::GuildUnavailable(label)
            })?;

            let name = if guild.name.is_empty() {
                roster.name.clone()
            } else {
                guild.name.clone()
            };
            info!(guild = %name, members = roster.members.len(), "fetched guild");
            resolved.push(GuildSettings {
                name,
                source: guild.source,
            });
            rosters.push(roster);
        }

        let directives = RarDirectives::from_rows(self.rar_rows);
        reconcile(&mut rosters, &directives, self.providers);

        // members of swgoh.gg guilds take their highest unit level
        for (roster, guild) in rosters.iter_mut().zip(&guilds) {
            if guild.source.data_source() == DataSource::SwgohGg {
                for member in &mut roster.members {
                    member.level = member.max_unit_level();
                }
            }
        }

        let projection = project(&rosters, &mut catalog, &setup.output_options());
        let mut tables = Vec::new();
        for table in projection.tables() {
            self.sink.write_table(table)?;
            tables.push((table.name.clone(), table.row_count()));
        }

        let mut named = setup.clone();
        named.apply_guild_names(&resolved);
        tracker.update(Digests::compute(&named, self.rar_rows)?);
        tracker.commit_all()?;

        let players = rosters.iter().map(|r| r.members.len()).sum();
        info!(players, "refresh complete");

        Ok(RefreshOutcome::Refreshed(RefreshSummary {
            guilds: resolved,
            players,
            tables,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ability::{Ability, AbilityCategory};
    use crate::cache::MemoryCache;
    use crate::model::{PlayerRecord, UnitCatalog, UnitDefinition, UnitInstance, UnitType};
    use crate::provider::tests::StubProvider;
    use crate::reconciler::PLAYER_GUILD;
    use crate::setup::{GuildRef, GuildRow, Toggle};
    use crate::sink::MemorySink;
    use crate::table::{CellValue, Table};
    use std::cell::Cell;
    use std::rc::Rc;

    fn member(ally_code: u64, name: &str, unit_level: u32) -> PlayerRecord {
        let mut player = PlayerRecord::new(ally_code, name, 0);
        player.add_unit(UnitInstance {
            base_id: "HERO".to_string(),
            unit_type: UnitType::Hero,
            level: unit_level,
            power: 1000,
            rarity: 7,
            gear_level: Some(10),
            abilities: vec![Ability::new("Lead", AbilityCategory::Leader, 8, false)],
        });
        player
    }

    fn setup() -> Setup {
        Setup {
            cache_key: "test".to_string(),
            guilds: vec![GuildRow {
                enabled: Toggle::ON,
                name: String::new(),
                data_source: "SwgohGg".to_string(),
                guild_id: Some(7),
                ally_code: None,
            }],
            ..Setup::default()
        }
    }

    /// Adapter over stub providers, plus a shared count of provider calls
    fn adapter(with_catalog: bool, with_guild: bool) -> (ProviderAdapter, Rc<Cell<usize>>) {
        let calls = Rc::new(Cell::new(0));
        let mut gg = StubProvider::named("gg");
        gg.calls = calls.clone();
        if with_catalog {
            gg.catalog = Some(UnitCatalog {
                heroes: vec![UnitDefinition::new("HERO", "The Hero", "Light Side", "Leader", vec![])],
                ..UnitCatalog::default()
            });
        }
        if with_guild {
            let mut roster = GuildRoster::new(7, "Alpha");
            roster.members = vec![member(1, "One", 80), member(2, "Two", 60)];
            gg.guilds.push((GuildRef::SwgohGg { guild_id: 7 }, roster));
        }
        gg.players.push(member(9, "Nine", 70));

        let adapter = ProviderAdapter::new(
            Box::new(gg),
            Box::new(StubProvider::named("help")),
            DataSource::SwgohGg,
            DataSource::SwgohGg,
        );
        (adapter, calls)
    }

    /// Sink that fails on a given write
    struct FailingSink {
        fail_on: usize,
        writes: usize,
    }

    impl TableSink for FailingSink {
        fn write_table(&mut self, _table: &Table) -> Result<()> {
            self.writes += 1;
            if self.writes == self.fail_on {
                return Err(Error::Io(std::io::Error::other("disk full")));
            }
            Ok(())
        }
    }

    #[test]
    fn test_refresh_writes_tables_and_commits() {
        let setup = setup();
        let (adapter, _) = adapter(true, true);
        let mut cache = MemoryCache::new();
        let mut sink = MemorySink::new();

        let outcome = Orchestrator::new(&setup, &[], &adapter, &mut cache, &mut sink)
            .refresh(false)
            .unwrap();

        let RefreshOutcome::Refreshed(summary) = outcome else {
            panic!("expected a refresh");
        };
        assert_eq!(summary.guilds[0].name, "Alpha");
        assert_eq!(summary.players, 2);
        let names: Vec<&str> = summary.tables.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["roster", "units", "abilities", "heroes", "ships"]);

        assert_eq!(sink.writes, 5);
        let roster = sink.get("roster").unwrap();
        assert_eq!(roster.cell(0, "guildName"), Some(&CellValue::String("Alpha".into())));
        // swgoh.gg level is derived from the highest unit level
        assert_eq!(roster.cell(0, "level"), Some(&CellValue::Integer(80)));
        assert_eq!(roster.cell(1, "level"), Some(&CellValue::Integer(60)));
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn test_fresh_settings_skip_fetch_and_write() {
        let mut setup = setup();
        let (adapter, calls) = adapter(true, true);
        let mut cache = MemoryCache::new();
        let mut sink = MemorySink::new();

        let outcome = Orchestrator::new(&setup, &[], &adapter, &mut cache, &mut sink)
            .refresh(false)
            .unwrap();
        if let RefreshOutcome::Refreshed(summary) = outcome {
            setup.apply_guild_names(&summary.guilds);
        }
        let calls_after_first = calls.get();
        let writes_after_first = sink.writes;

        let outcome = Orchestrator::new(&setup, &[], &adapter, &mut cache, &mut sink)
            .refresh(false)
            .unwrap();

        assert_eq!(outcome, RefreshOutcome::UpToDate);
        assert_eq!(calls.get(), calls_after_first);
        assert_eq!(sink.writes, writes_after_first);
    }

    #[test]
    fn test_force_ignores_freshness() {
        let setup = setup();
        let (adapter, calls) = adapter(true, true);
        let mut cache = MemoryCache::new();
        let mut sink = MemorySink::new();

        for _ in 0..2 {
            Orchestrator::new(&setup, &[], &adapter, &mut cache, &mut sink)
                .refresh(true)
                .unwrap();
        }

        assert_eq!(calls.get(), 4);
        assert_eq!(sink.writes, 10);
    }

    #[test]
    fn test_changed_rar_table_triggers_refresh() {
        let setup = setup();
        let (adapter, _) = adapter(true, true);
        let mut cache = MemoryCache::new();
        let mut sink = MemorySink::new();
        Orchestrator::new(&setup, &[], &adapter, &mut cache, &mut sink)
            .refresh(false)
            .unwrap();

        let rows = vec![RarRow {
            new_name: "Niner".to_string(),
            add_ally_code: 9,
            ..RarRow::default()
        }];
        let mut orchestrator = Orchestrator::new(&setup, &rows, &adapter, &mut cache, &mut sink);
        let status = orchestrator.status().unwrap();
        assert!(status.contains(&(Domain::Rar, false)));

        let outcome = orchestrator.refresh(false).unwrap();
        let RefreshOutcome::Refreshed(summary) = outcome else {
            panic!("expected a refresh");
        };
        assert_eq!(summary.players, 3);

        let roster = sink.get("roster").unwrap();
        assert_eq!(roster.cell(2, "guildName"), Some(&CellValue::String(PLAYER_GUILD.into())));
        assert_eq!(roster.cell(2, "name"), Some(&CellValue::String("Niner".into())));
        // players outside swgoh.gg guilds keep their reported level
        assert_eq!(roster.cell(2, "level"), Some(&CellValue::Integer(0)));
    }

    #[test]
    fn test_failed_write_leaves_cache_stale() {
        let setup = setup();
        let (adapter, _) = adapter(true, true);
        let mut cache = MemoryCache::new();
        let mut sink = FailingSink { fail_on: 3, writes: 0 };

        let err = Orchestrator::new(&setup, &[], &adapter, &mut cache, &mut sink)
            .refresh(false)
            .unwrap_err();

        assert!(matches!(err, Error::Io(_)));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_missing_catalog_is_fatal() {
        let setup = setup();
        let (adapter, _) = adapter(false, true);
        let mut cache = MemoryCache::new();
        let mut sink = MemorySink::new();

        let err = Orchestrator::new(&setup, &[], &adapter, &mut cache, &mut sink)
            .refresh(false)
            .unwrap_err();

        assert!(matches!(err, Error::CatalogUnavailable));
        assert_eq!(sink.writes, 0);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_missing_guild_is_fatal() {
        let setup = setup();
        let (adapter, _) = adapter(true, false);
        let mut cache = MemoryCache::new();
        let mut sink = MemorySink::new();

        let err = Orchestrator::new(&setup, &[], &adapter, &mut cache, &mut sink)
            .refresh(false)
            .unwrap_err();

        assert!(matches!(err, Error::GuildUnavailable(label) if label == "SwgohGg guild 7"));
        assert_eq!(sink.writes, 0);
        assert!(cache.is_empty());
    }
}
