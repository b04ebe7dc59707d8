//! The snapshot-diff engine.
//!
//! Given an older and a newer snapshot, walks players, squads, teams and
//! server fields in a fixed order and derives the event stream capturing
//! every observed transition. Pure over its inputs apart from two effects
//! on the newer snapshot: the derived event batch is merged into its event
//! collection, and `joined_at`/`created_at` are backfilled on entities
//! first seen without one.
//!
//! Matching is scoped per entity type and re-run independently for
//! players, squads and teams: each newer entity consumes at most one
//! entity from a working copy of the older list, first seen first matched
//! in list order. A field comparison where either side is unobserved never
//! produces a change event — absence of information is not evidence of
//! change.

use crate::config::DiffConfig;
use crate::events::{
    Event, EventCollection, PlayerChangeLoadoutEvent, PlayerChangeRoleEvent,
    PlayerJoinServerEvent, PlayerJoinSquadEvent, PlayerJoinTeamEvent, PlayerLeaveServerEvent,
    PlayerLeaveSquadEvent, PlayerLeaveTeamEvent, PlayerLevelUpEvent, ServerMapChangedEvent,
    ServerStateChangedEvent, SquadCreatedEvent, SquadDisbandedEvent, SquadLeaderChangeEvent,
    TeamCreatedEvent, TeamDisbandedEvent,
};
use crate::field::Field;
use crate::hopper::Hopper;
use crate::key::{matches_filters, KeyAttributes, Keyed};
use crate::link::{Link, Linkable};
use crate::metrics::DiffMetrics;
use crate::state::{Player, Server, Squad, Team};
use chrono::{DateTime, Utc};
use std::time::Instant;
use tracing::instrument;

/// Counters from the player pass, folded into [`DiffMetrics`].
#[derive(Debug, Default)]
struct RosterDelta {
    matched: u64,
    joined: u64,
    left: u64,
}

/// Compare two snapshots, merging the derived event batch into `newer`'s
/// event collection.
///
/// `older` is never mutated. The fixed pass order — players, squads,
/// teams, server — mirrors "most granular entity first"; only the
/// within-pass left-to-right entity order matters for deterministic event
/// ordering.
#[instrument(skip_all)]
pub fn compare_snapshots(
    newer: &mut Hopper,
    older: &Hopper,
    config: &DiffConfig,
    metrics: Option<&mut DiffMetrics>,
) {
    let run_started = Instant::now();
    let now = Utc::now();
    let mut batch = EventCollection::new();

    let Hopper {
        players,
        squads,
        teams,
        server,
        events,
    } = newer;

    let pass_started = Instant::now();
    let roster = diff_players(players, &*squads, &*teams, older, config, now, &mut batch);
    let players_time = pass_started.elapsed();

    let pass_started = Instant::now();
    diff_squads(squads, &*players, older, config, now, &mut batch);
    let squads_time = pass_started.elapsed();

    let pass_started = Instant::now();
    diff_teams(teams, older, config, now, &mut batch);
    let teams_time = pass_started.elapsed();

    let pass_started = Instant::now();
    diff_server(&*server, &older.server, now, &mut batch);

    let emitted = batch.len();
    events.merge(&batch);
    let server_time = pass_started.elapsed();

    log::debug!(
        "derived {} events ({} matched, {} joined, {} left)",
        emitted,
        roster.matched,
        roster.joined,
        roster.left
    );

    if let Some(metrics) = metrics {
        metrics.snapshots_compared += 1;
        metrics.events_emitted += emitted as u64;
        metrics.players_matched += roster.matched;
        metrics.players_joined += roster.joined;
        metrics.players_left += roster.left;
        metrics.players_time += players_time;
        metrics.squads_time += squads_time;
        metrics.teams_time += teams_time;
        metrics.server_time += server_time;
        metrics.total_time += run_started.elapsed();
    }
}

impl Hopper {
    /// Compare this snapshot against the `older` one it succeeds. See
    /// [`compare_snapshots`].
    pub fn compare_older(&mut self, older: &Hopper, config: &DiffConfig) {
        compare_snapshots(self, older, config, None);
    }
}

/// Record an engine-built event. The engine only constructs public kinds,
/// so a rejection here is a bug worth hearing about, not worth panicking
/// over.
fn record(batch: &mut EventCollection, event: Event) {
    if let Err(err) = batch.add(event) {
        log::warn!("dropped derived event: {}", err);
    }
}

/// Take the first entity in `pool` whose populated key fields agree with
/// `keys`. An empty key set never matches, so entities with zero set key
/// fields are always treated as new or removed.
fn take_match<E: Keyed>(pool: &mut Vec<E>, keys: &KeyAttributes) -> Option<E> {
    let index = pool
        .iter()
        .position(|candidate| matches_filters(candidate, keys, true))?;
    Some(pool.remove(index))
}

/// Rebuild an entity link for embedding into an event.
///
/// With `fallback`, the target is looked up in the pool that owns it so
/// the link carries a full copy and survives the snapshot being dropped.
/// Without, any copy already attached is stripped.
fn event_link<E: Linkable>(link: &Link, pool: &[E], fallback: bool) -> Link {
    if fallback {
        pool.iter()
            .find(|entity| matches_filters(*entity, link.keys(), true))
            .map(|entity| entity.create_link(true))
            .unwrap_or_else(|| link.clone())
    } else {
        link.clone().without_fallback()
    }
}

#[instrument(skip_all)]
fn diff_players(
    newer_players: &mut [Player],
    newer_squads: &[Squad],
    newer_teams: &[Team],
    older: &Hopper,
    config: &DiffConfig,
    now: DateTime<Utc>,
    batch: &mut EventCollection,
) -> RosterDelta {
    let mut delta = RosterDelta::default();
    let mut remaining: Vec<Player> = older.players.clone();

    for player in newer_players.iter_mut() {
        let keys = player.key_attributes();
        let matched = take_match(&mut remaining, &keys);

        if let Some(m) = &matched {
            delta.matched += 1;

            // Role change.
            if player.role.has() && m.role.has() && player.role != m.role {
                record(
                    batch,
                    Event::PlayerChangeRole(PlayerChangeRoleEvent {
                        event_time: now,
                        player: player.create_link(config.fallback_links),
                        old: m.role.clone(),
                        new: player.role.clone(),
                    }),
                );
            }

            // Loadout change.
            if player.loadout.has() && m.loadout.has() && player.loadout != m.loadout {
                record(
                    batch,
                    Event::PlayerChangeLoadout(PlayerChangeLoadoutEvent {
                        event_time: now,
                        player: player.create_link(config.fallback_links),
                        old: m.loadout.clone(),
                        new: player.loadout.clone(),
                    }),
                );
            }

            // Level up, on strict increase only.
            if let (Some(&new), Some(&old)) = (player.level.get(), m.level.get()) {
                if new > old {
                    record(
                        batch,
                        Event::PlayerLevelUp(PlayerLevelUpEvent {
                            event_time: now,
                            player: player.create_link(config.fallback_links),
                            old,
                            new,
                        }),
                    );
                }
            }
        }

        if config.backfill_timestamps && player.joined_at.get().is_none() {
            let inherited = matched.as_ref().and_then(|m| m.joined_at.get().copied());
            player.joined_at = Field::Set(inherited.unwrap_or(player.observed_at));
        }

        if matched.is_none() {
            delta.joined += 1;
            record(
                batch,
                Event::PlayerJoinServer(PlayerJoinServerEvent {
                    event_time: now,
                    player: player.create_link(config.fallback_links),
                }),
            );
        }

        // Squad transition. A squad change is a leave of the old squad and
        // a join of the new one; both may fire in the same pass.
        let newer_squad = player.squad.get();
        let older_squad = matched.as_ref().and_then(|m| m.squad.get());

        if let Some(squad) = newer_squad {
            let joined = match older_squad {
                Some(old) => squad.keys() != old.keys(),
                None => true,
            };
            if joined {
                record(
                    batch,
                    Event::PlayerJoinSquad(PlayerJoinSquadEvent {
                        event_time: now,
                        player: player.create_link(config.fallback_links),
                        squad: event_link(squad, newer_squads, config.fallback_links),
                    }),
                );
            }
        }
        if let Some(old) = older_squad {
            let left = match newer_squad {
                Some(squad) => squad.keys() != old.keys(),
                None => true,
            };
            if left {
                record(
                    batch,
                    Event::PlayerLeaveSquad(PlayerLeaveSquadEvent {
                        event_time: now,
                        player: player.create_link(config.fallback_links),
                        squad: event_link(old, &older.squads, config.fallback_links),
                    }),
                );
            }
        }

        // Team transition, same rules.
        let newer_team = player.team.get();
        let older_team = matched.as_ref().and_then(|m| m.team.get());

        if let Some(team) = newer_team {
            let joined = match older_team {
                Some(old) => team.keys() != old.keys(),
                None => true,
            };
            if joined {
                record(
                    batch,
                    Event::PlayerJoinTeam(PlayerJoinTeamEvent {
                        event_time: now,
                        player: player.create_link(config.fallback_links),
                        team: event_link(team, newer_teams, config.fallback_links),
                    }),
                );
            }
        }
        if let Some(old) = older_team {
            let left = match newer_team {
                Some(team) => team.keys() != old.keys(),
                None => true,
            };
            if left {
                record(
                    batch,
                    Event::PlayerLeaveTeam(PlayerLeaveTeamEvent {
                        event_time: now,
                        player: player.create_link(config.fallback_links),
                        team: event_link(old, &older.teams, config.fallback_links),
                    }),
                );
            }
        }
    }

    // Every older player left unmatched has left the server, and with it
    // any squad and team they were in.
    for player in remaining {
        delta.left += 1;
        let link = player.create_link(config.fallback_links);
        record(
            batch,
            Event::PlayerLeaveServer(PlayerLeaveServerEvent {
                event_time: now,
                player: link.clone(),
            }),
        );
        if let Some(squad) = player.squad.get() {
            record(
                batch,
                Event::PlayerLeaveSquad(PlayerLeaveSquadEvent {
                    event_time: now,
                    player: link.clone(),
                    squad: event_link(squad, &older.squads, config.fallback_links),
                }),
            );
        }
        if let Some(team) = player.team.get() {
            record(
                batch,
                Event::PlayerLeaveTeam(PlayerLeaveTeamEvent {
                    event_time: now,
                    player: link.clone(),
                    team: event_link(team, &older.teams, config.fallback_links),
                }),
            );
        }
    }

    delta
}

#[instrument(skip_all)]
fn diff_squads(
    newer_squads: &mut [Squad],
    newer_players: &[Player],
    older: &Hopper,
    config: &DiffConfig,
    now: DateTime<Utc>,
    batch: &mut EventCollection,
) {
    let mut remaining: Vec<Squad> = older.squads.clone();

    for squad in newer_squads.iter_mut() {
        let keys = squad.key_attributes();
        let matched = take_match(&mut remaining, &keys);

        if let Some(m) = &matched {
            // Leader change, by link equality. Either side may be absent —
            // a squad can gain or lose its leader outright.
            if squad.leader.has() && m.leader.has() && squad.leader != m.leader {
                let old = m
                    .leader
                    .as_ref()
                    .map(|leader| event_link(leader, &older.players, config.fallback_links));
                let new = squad
                    .leader
                    .as_ref()
                    .map(|leader| event_link(leader, newer_players, config.fallback_links));
                record(
                    batch,
                    Event::SquadLeaderChange(SquadLeaderChangeEvent {
                        event_time: now,
                        squad: squad.create_link(config.fallback_links),
                        old,
                        new,
                    }),
                );
            }
        }

        if config.backfill_timestamps && squad.created_at.get().is_none() {
            let inherited = matched.as_ref().and_then(|m| m.created_at.get().copied());
            squad.created_at = Field::Set(inherited.unwrap_or(squad.observed_at));
        }

        if matched.is_none() {
            record(
                batch,
                Event::SquadCreated(SquadCreatedEvent {
                    event_time: now,
                    squad: squad.create_link(config.fallback_links),
                }),
            );
        }
    }

    for squad in remaining {
        record(
            batch,
            Event::SquadDisbanded(SquadDisbandedEvent {
                event_time: now,
                squad: squad.create_link(config.fallback_links),
            }),
        );
    }
}

#[instrument(skip_all)]
fn diff_teams(
    newer_teams: &mut [Team],
    older: &Hopper,
    config: &DiffConfig,
    now: DateTime<Utc>,
    batch: &mut EventCollection,
) {
    let mut remaining: Vec<Team> = older.teams.clone();

    for team in newer_teams.iter_mut() {
        let keys = team.key_attributes();
        let matched = take_match(&mut remaining, &keys);

        if config.backfill_timestamps && team.created_at.get().is_none() {
            let inherited = matched.as_ref().and_then(|m| m.created_at.get().copied());
            team.created_at = Field::Set(inherited.unwrap_or(team.observed_at));
        }

        if matched.is_none() {
            record(
                batch,
                Event::TeamCreated(TeamCreatedEvent {
                    event_time: now,
                    team: team.create_link(config.fallback_links),
                }),
            );
        }
    }

    for team in remaining {
        record(
            batch,
            Event::TeamDisbanded(TeamDisbandedEvent {
                event_time: now,
                team: team.create_link(config.fallback_links),
            }),
        );
    }
}

#[instrument(skip_all)]
fn diff_server(newer: &Server, older: &Server, now: DateTime<Utc>, batch: &mut EventCollection) {
    if let (Some(new), Some(old)) = (newer.map.get(), older.map.get()) {
        if new != old {
            record(
                batch,
                Event::ServerMapChanged(ServerMapChangedEvent {
                    event_time: now,
                    old: old.clone(),
                    new: new.clone(),
                }),
            );
        }
    }

    if let (Some(new), Some(old)) = (newer.state.get(), older.state.get()) {
        if new != old {
            record(
                batch,
                Event::ServerStateChanged(ServerStateChangedEvent {
                    event_time: now,
                    old: old.clone(),
                    new: new.clone(),
                    score: Field::Unset,
                }),
            );
        }
    }
}
