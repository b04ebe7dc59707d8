//! The snapshot container.
//!
//! A [`Hopper`] is one fully-populated, point-in-time view of a server:
//! ordered player/squad/team lists, exactly one server record, and exactly
//! one event collection. A data source populates it once; afterwards it is
//! only mutated by the diff engine (event batch merge plus timestamp
//! backfills).

use crate::events::EventCollection;
use crate::key::{matches_filters, KeyAttributes, Keyed};
use crate::merge::Merge;
use crate::state::{Player, Server, Squad, Team};
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use thiserror::Error;

/// Errors raised by container operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HopperError {
    /// An added entity's key attributes already match an existing entry.
    #[error("duplicate entity in scope '{scope}': {keys:?}")]
    Duplicate { scope: &'static str, keys: KeyAttributes },
    /// A `single` lookup matched more than one entity.
    #[error("ambiguous match in scope '{scope}': {count} entities match {filters:?}")]
    AmbiguousMatch {
        scope: &'static str,
        filters: KeyAttributes,
        count: usize,
    },
    /// `team1`/`team2` accessed with fewer teams present.
    #[error("no team at index {0}")]
    MissingTeam(usize),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Hopper {
    pub players: Vec<Player>,
    pub squads: Vec<Squad>,
    pub teams: Vec<Team>,
    pub server: Server,
    pub events: EventCollection,
}

fn add_entities<E: Keyed>(
    target: &mut Vec<E>,
    entities: impl IntoIterator<Item = E>,
) -> Result<(), HopperError> {
    for entity in entities {
        let keys = entity.key_attributes();
        if target
            .iter()
            .any(|existing| matches_filters(existing, &keys, true))
        {
            return Err(HopperError::Duplicate {
                scope: E::SCOPE,
                keys,
            });
        }
        target.push(entity);
    }
    Ok(())
}

fn find_all<'a, E: Keyed>(
    pool: &'a [E],
    filters: &KeyAttributes,
    ignore_unknown: bool,
) -> Vec<&'a E> {
    pool.iter()
        .filter(|entity| matches_filters(*entity, filters, ignore_unknown))
        .collect()
}

fn find_single<'a, E: Keyed>(
    pool: &'a [E],
    filters: &KeyAttributes,
    ignore_unknown: bool,
) -> Result<Option<&'a E>, HopperError> {
    let matches = find_all(pool, filters, ignore_unknown);
    match matches.len() {
        0 => Ok(None),
        1 => Ok(Some(matches[0])),
        count => Err(HopperError::AmbiguousMatch {
            scope: E::SCOPE,
            filters: filters.clone(),
            count,
        }),
    }
}

impl Hopper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append players, rejecting any whose key attributes already match an
    /// existing entry. A duplicate add signals a caller error.
    pub fn add_players(
        &mut self,
        players: impl IntoIterator<Item = Player>,
    ) -> Result<(), HopperError> {
        add_entities(&mut self.players, players)
    }

    pub fn add_squads(
        &mut self,
        squads: impl IntoIterator<Item = Squad>,
    ) -> Result<(), HopperError> {
        add_entities(&mut self.squads, squads)
    }

    pub fn add_teams(&mut self, teams: impl IntoIterator<Item = Team>) -> Result<(), HopperError> {
        add_entities(&mut self.teams, teams)
    }

    pub fn set_server(&mut self, server: Server) {
        self.server = server;
    }

    /// All players matching every filter. Lenient matching (`ignore_unknown`)
    /// skips filtered fields a candidate has no information about.
    pub fn find_players(&self, filters: &KeyAttributes, ignore_unknown: bool) -> Vec<&Player> {
        find_all(&self.players, filters, ignore_unknown)
    }

    /// Exactly one matching player, `None` for no match, an error when the
    /// filters are ambiguous.
    pub fn find_player(
        &self,
        filters: &KeyAttributes,
        ignore_unknown: bool,
    ) -> Result<Option<&Player>, HopperError> {
        find_single(&self.players, filters, ignore_unknown)
    }

    pub fn find_squads(&self, filters: &KeyAttributes, ignore_unknown: bool) -> Vec<&Squad> {
        find_all(&self.squads, filters, ignore_unknown)
    }

    pub fn find_squad(
        &self,
        filters: &KeyAttributes,
        ignore_unknown: bool,
    ) -> Result<Option<&Squad>, HopperError> {
        find_single(&self.squads, filters, ignore_unknown)
    }

    pub fn find_teams(&self, filters: &KeyAttributes, ignore_unknown: bool) -> Vec<&Team> {
        find_all(&self.teams, filters, ignore_unknown)
    }

    pub fn find_team(
        &self,
        filters: &KeyAttributes,
        ignore_unknown: bool,
    ) -> Result<Option<&Team>, HopperError> {
        find_single(&self.teams, filters, ignore_unknown)
    }

    /// Convenience accessor assuming two teams are present.
    pub fn team1(&self) -> Result<&Team, HopperError> {
        self.teams.first().ok_or(HopperError::MissingTeam(0))
    }

    pub fn team2(&self) -> Result<&Team, HopperError> {
        self.teams.get(1).ok_or(HopperError::MissingTeam(1))
    }

    /// Build one snapshot by merging each input in order: per scope,
    /// entities match by key attributes and merge field by field with the
    /// most recently observed value winning; unmatched entities append.
    pub fn gather<'a>(hoppers: impl IntoIterator<Item = &'a Hopper>) -> Hopper {
        let mut gathered = Hopper::new();
        for hopper in hoppers {
            gathered.merge_from(hopper);
        }
        gathered
    }

    /// Structural audit of the populated snapshot: per-scope key
    /// uniqueness. Intended for data-source collaborators that assemble
    /// hoppers from several partial reads.
    pub fn validate(&self) -> anyhow::Result<()> {
        fn check_scope<E: Keyed>(pool: &[E]) -> anyhow::Result<()> {
            for (index, entity) in pool.iter().enumerate() {
                let keys = entity.key_attributes();
                if keys.is_empty() {
                    continue;
                }
                let twins = pool
                    .iter()
                    .skip(index + 1)
                    .filter(|other| matches_filters(*other, &keys, true))
                    .count();
                if twins > 0 {
                    bail!(
                        "scope '{}' holds {} entities matching keys {:?}",
                        E::SCOPE,
                        twins + 1,
                        keys
                    );
                }
            }
            Ok(())
        }

        check_scope(&self.players).context("players scope")?;
        check_scope(&self.squads).context("squads scope")?;
        check_scope(&self.teams).context("teams scope")?;
        Ok(())
    }

    /// Deterministic checksum of the snapshot's observable state.
    ///
    /// Entity lists are hashed in canonical (key-sorted) order so two
    /// snapshots with the same content produce the same checksum regardless
    /// of population order. Events and construction timestamps are not part
    /// of the checksum.
    pub fn checksum(&self) -> u64 {
        let mut hasher = DefaultHasher::new();

        fn sorted_keys<E: Keyed>(pool: &[E]) -> Vec<(KeyAttributes, &E)> {
            let mut keyed: Vec<_> = pool
                .iter()
                .map(|entity| (entity.key_attributes(), entity))
                .collect();
            keyed.sort_by(|a, b| a.0.cmp(&b.0));
            keyed
        }

        for (keys, player) in sorted_keys(&self.players) {
            keys.hash(&mut hasher);
            player.role.hash(&mut hasher);
            player.loadout.hash(&mut hasher);
            player.level.hash(&mut hasher);
            player.kills.hash(&mut hasher);
            player.deaths.hash(&mut hasher);
            player.alive.hash(&mut hasher);
            player.is_vip.hash(&mut hasher);
            player.is_spectator.hash(&mut hasher);
            player.team.hash(&mut hasher);
            player.squad.hash(&mut hasher);
        }

        for (keys, squad) in sorted_keys(&self.squads) {
            keys.hash(&mut hasher);
            squad.leader.hash(&mut hasher);
            squad.squad_type.hash(&mut hasher);
            squad.team.hash(&mut hasher);
        }

        for (keys, team) in sorted_keys(&self.teams) {
            keys.hash(&mut hasher);
            team.leader.hash(&mut hasher);
        }

        self.server.name.hash(&mut hasher);
        self.server.map.hash(&mut hasher);
        self.server.gamemode.hash(&mut hasher);
        self.server.state.hash(&mut hasher);

        hasher.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::Field;
    use crate::key::KeyValue;
    use crate::testing::HopperBuilder;

    fn player(steamid: &str, name: &str) -> Player {
        Player {
            steamid: steamid.into(),
            name: name.into(),
            ..Player::new()
        }
    }

    #[test]
    fn test_duplicate_add_rejected() {
        let mut hopper = Hopper::new();
        hopper.add_players([player("1", "bob")]).unwrap();

        let err = hopper.add_players([player("1", "bob")]).unwrap_err();
        assert!(matches!(err, HopperError::Duplicate { scope: "players", .. }));
    }

    #[test]
    fn test_keyless_entities_are_not_duplicates() {
        let mut hopper = Hopper::new();
        hopper
            .add_players([Player::new(), Player::new()])
            .unwrap();
        assert_eq!(hopper.players.len(), 2);
    }

    #[test]
    fn test_find_single_semantics() {
        let hopper = HopperBuilder::new()
            .player(player("1", "bob"))
            .player(player("2", "alice"))
            .build();

        let filters = KeyAttributes::new().with("steamid", "1");
        let hit = hopper.find_player(&filters, false).unwrap();
        assert_eq!(hit.map(|p| p.name.clone()), Some(Field::Set("bob".into())));

        // Zero matches is not an error.
        let filters = KeyAttributes::new().with("steamid", "3");
        assert_eq!(hopper.find_player(&filters, false).unwrap(), None);
    }

    #[test]
    fn test_find_single_ambiguous_is_error() {
        let mut one = player("1", "bob");
        let mut two = player("2", "bob");
        // Different ids so the duplicate check does not trip on the name.
        one.id = Field::Set(KeyValue::Int(1));
        two.id = Field::Set(KeyValue::Int(2));
        let mut hopper = Hopper::new();
        hopper.players.push(one);
        hopper.players.push(two);

        let filters = KeyAttributes::new().with("name", "bob");
        let err = hopper.find_player(&filters, false).unwrap_err();
        assert!(matches!(err, HopperError::AmbiguousMatch { count: 2, .. }));
    }

    #[test]
    fn test_find_lenient_skips_unknown_fields() {
        let mut known = player("1", "bob");
        known.level = Field::Set(10);
        let vague = Player {
            name: "ghost".into(),
            ..Player::new()
        };
        let mut hopper = Hopper::new();
        hopper.add_players([known, vague]).unwrap();

        // The vague player has no steamid; strict filtering excludes it,
        // lenient filtering needs an agreeing field.
        let filters = KeyAttributes::new().with("name", "ghost").with("steamid", "9");
        assert!(hopper.find_players(&filters, false).is_empty());
        assert_eq!(hopper.find_players(&filters, true).len(), 1);
    }

    #[test]
    fn test_team_accessors() {
        let hopper = Hopper::new();
        assert_eq!(hopper.team1().unwrap_err(), HopperError::MissingTeam(0));

        let hopper = HopperBuilder::new()
            .team(Team {
                id: Field::Set(KeyValue::Int(1)),
                ..Team::new()
            })
            .build();
        assert!(hopper.team1().is_ok());
        assert_eq!(hopper.team2().unwrap_err(), HopperError::MissingTeam(1));
    }

    #[test]
    fn test_gather_merges_in_order() {
        let mut first = Hopper::new();
        let mut p = player("1", "bob");
        p.role = "rifleman".into();
        first.add_players([p]).unwrap();

        let mut second = Hopper::new();
        let mut p = player("1", "bob");
        p.role = "medic".into();
        p.level = Field::Set(3);
        second.add_players([p, player("2", "alice")]).unwrap();

        let gathered = Hopper::gather([&first, &second]);
        assert_eq!(gathered.players.len(), 2);
        // Later sources win on matched fields.
        assert_eq!(gathered.players[0].role, Field::Set("medic".to_string()));
        assert_eq!(gathered.players[0].level, Field::Set(3));
    }

    #[test]
    fn test_validate_flags_duplicate_keys() {
        let mut hopper = Hopper::new();
        hopper.players.push(player("1", "bob"));
        hopper.players.push(player("1", "bob"));
        assert!(hopper.validate().is_err());
        assert!(Hopper::new().validate().is_ok());
    }

    #[test]
    fn test_checksum_determinism_and_sensitivity() {
        let build = |role: &str| {
            let mut p = player("1", "bob");
            p.role = role.into();
            HopperBuilder::new().player(p).server_map("carentan").build()
        };

        let a = build("rifleman");
        let b = build("rifleman");
        assert_eq!(a.checksum(), b.checksum());

        let c = build("medic");
        assert_ne!(a.checksum(), c.checksum());
    }

    #[test]
    fn test_checksum_ignores_population_order() {
        let mut a = Hopper::new();
        a.add_players([player("1", "bob"), player("2", "alice")]).unwrap();
        let mut b = Hopper::new();
        b.add_players([player("2", "alice"), player("1", "bob")]).unwrap();
        assert_eq!(a.checksum(), b.checksum());
    }
}
