//! Apply manual rename/add/remove directives to fetched guild rosters
//!
//! Directives run in a fixed order: every add, then every rename, then every
//! remove. Adding and removing the same ally code therefore leaves the player
//! out. A final pass drops repeated ally codes so that a player appears in at
//! most one roster.

use crate::model::{GuildRoster, PlayerRecord};
use crate::provider::PlayerSource;
use crate::rar::{Add, RarDirectives};
use std::collections::HashSet;
use tracing::{debug, warn};

/// Name of the roster collecting players added without a target guild
pub const PLAYER_GUILD: &str = "PLAYER";

/// Apply `rar` to `rosters` in place, fetching added players from `players`
pub fn reconcile(rosters: &mut Vec<GuildRoster>, rar: &RarDirectives, players: &dyn PlayerSource) {
    for add in &rar.add {
        apply_add(rosters, add, players);
    }

    for rename in &rar.rename {
        for member in rosters.iter_mut().flat_map(|r| r.members.iter_mut()) {
            if member.ally_code == rename.ally_code {
                debug!(ally_code = rename.ally_code, from = %member.name, to = %rename.new_name, "rename");
                member.name = rename.new_name.clone();
            }
        }
    }

    for &ally_code in &rar.remove {
        for roster in rosters.iter_mut() {
            let before = roster.members.len();
            roster.members.retain(|m| m.ally_code != ally_code);
            if roster.members.len() != before {
                debug!(ally_code, guild = %roster.name, "removed");
            }
        }
    }

    dedupe(rosters);
}

fn find_member(rosters: &[GuildRoster], ally_code: u64) -> Option<(usize, usize)> {
    rosters
        .iter()
        .enumerate()
        .find_map(|(ri, r)| r.position(ally_code).map(|mi| (ri, mi)))
}

fn find_roster(rosters: &[GuildRoster], name: &str) -> Option<usize> {
    rosters.iter().position(|r| r.name == name)
}

fn apply_add(rosters: &mut Vec<GuildRoster>, add: &Add, players: &dyn PlayerSource) {
    let ally_code = add.ally_code;
    let target = add.target_guild.as_deref();
    let target_index = target.and_then(|t| find_roster(rosters, t));

    match (find_member(rosters, ally_code), target, target_index) {
        (Some((from, index)), _, Some(to)) => {
            if from == to {
                debug!(ally_code, guild = %rosters[to].name, "already in target guild");
                return;
            }
            let player = rosters[from].members.remove(index);
            debug!(ally_code, from = %rosters[from].name, to = %rosters[to].name, "moved");
            rosters[to].members.push(player);
        }
        (Some(_), _, None) => {
            debug!(ally_code, guild = ?target, "already present, no configured target");
        }
        (None, Some(target), None) => {
            debug!(ally_code, guild = target, "target guild is not configured");
        }
        (None, _, to) => {
            let Some(player) = players.fetch_player(ally_code) else {
                warn!(ally_code, "player could not be fetched, add dropped");
                return;
            };
            match to {
                Some(to) => {
                    debug!(ally_code, guild = %rosters[to].name, "added");
                    rosters[to].members.push(player);
                }
                None => push_to_player_guild(rosters, player),
            }
        }
    }
}

fn push_to_player_guild(rosters: &mut Vec<GuildRoster>, player: PlayerRecord) {
    debug!(ally_code = player.ally_code, "added to {}", PLAYER_GUILD);
    match rosters
        .iter_mut()
        .find(|r| r.id == 0 && r.name == PLAYER_GUILD)
    {
        Some(roster) => roster.members.push(player),
        None => {
            let mut roster = GuildRoster::new(0, PLAYER_GUILD);
            roster.members.push(player);
            rosters.push(roster);
        }
    }
}

/// Keep the first occurrence of every ally code in roster order
fn dedupe(rosters: &mut [GuildRoster]) {
    let mut seen = HashSet::new();
    for roster in rosters.iter_mut() {
        let guild = roster.name.clone();
        roster.members.retain(|m| {
            let first = seen.insert(m.ally_code);
            if !first {
                warn!(ally_code = m.ally_code, %guild, "duplicate player dropped");
            }
            first
        });
    }
}
