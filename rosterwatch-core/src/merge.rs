//! Field-wise merging of partial snapshots.
//!
//! Several data sources each produce a partial snapshot of the same server
//! moment; `Hopper::gather` folds them into one. The rule everywhere is
//! "most recently observed wins": any observed state (including observed-
//! empty) overrides `Unset`, and later sources override earlier ones.
//! Entity lists merge by key-attribute matching: matched entries merge
//! field by field, unmatched entries are appended in order.

use crate::events::EventCollection;
use crate::field::Field;
use crate::hopper::Hopper;
use crate::key::{matches_filters, Keyed};
use crate::state::{Player, PlayerScore, Server, ServerSettings, Squad, Team};

/// Merge another instance of the same shape into `self`.
pub trait Merge {
    fn merge_from(&mut self, other: &Self);
}

impl<T: Clone> Merge for Field<T> {
    fn merge_from(&mut self, other: &Self) {
        if other.has() {
            *self = other.clone();
        }
    }
}

/// Merge `other` into `target` by lenient key matching. Matched entities
/// merge field by field; unmatched ones are appended preserving order.
pub fn merge_entity_lists<E>(target: &mut Vec<E>, other: &[E])
where
    E: Keyed + Merge + Clone,
{
    for incoming in other {
        let keys = incoming.key_attributes();
        let existing = target
            .iter()
            .position(|candidate| matches_filters(candidate, &keys, true));
        match existing {
            Some(index) => target[index].merge_from(incoming),
            None => target.push(incoming.clone()),
        }
    }
}

impl Merge for Player {
    fn merge_from(&mut self, other: &Self) {
        self.steamid.merge_from(&other.steamid);
        self.name.merge_from(&other.name);
        self.id.merge_from(&other.id);
        self.team.merge_from(&other.team);
        self.squad.merge_from(&other.squad);
        self.role.merge_from(&other.role);
        self.loadout.merge_from(&other.loadout);
        self.level.merge_from(&other.level);
        self.kills.merge_from(&other.kills);
        self.deaths.merge_from(&other.deaths);
        self.alive.merge_from(&other.alive);
        self.is_vip.merge_from(&other.is_vip);
        self.joined_at.merge_from(&other.joined_at);
        self.is_spectator.merge_from(&other.is_spectator);
        self.score.merge_from(&other.score);
        // observed_at keeps the earliest sighting.
    }
}

impl Merge for PlayerScore {
    fn merge_from(&mut self, other: &Self) {
        self.combat.merge_from(&other.combat);
        self.offense.merge_from(&other.offense);
        self.defense.merge_from(&other.defense);
        self.support.merge_from(&other.support);
    }
}

impl Merge for Squad {
    fn merge_from(&mut self, other: &Self) {
        self.id.merge_from(&other.id);
        self.leader.merge_from(&other.leader);
        self.creator.merge_from(&other.creator);
        self.name.merge_from(&other.name);
        self.squad_type.merge_from(&other.squad_type);
        self.team.merge_from(&other.team);
        self.players.merge_from(&other.players);
        self.created_at.merge_from(&other.created_at);
    }
}

impl Merge for Team {
    fn merge_from(&mut self, other: &Self) {
        self.id.merge_from(&other.id);
        self.leader.merge_from(&other.leader);
        self.name.merge_from(&other.name);
        self.squads.merge_from(&other.squads);
        self.players.merge_from(&other.players);
        self.created_at.merge_from(&other.created_at);
    }
}

impl Merge for Server {
    fn merge_from(&mut self, other: &Self) {
        self.name.merge_from(&other.name);
        self.map.merge_from(&other.map);
        self.gamemode.merge_from(&other.gamemode);
        self.next_map.merge_from(&other.next_map);
        self.next_gamemode.merge_from(&other.next_gamemode);
        self.round_start.merge_from(&other.round_start);
        self.state.merge_from(&other.state);
        // Settings merge field by field rather than wholesale, so two
        // sources each knowing half the settings compose.
        match (&mut self.settings, &other.settings) {
            (Field::Set(mine), Field::Set(theirs)) => mine.merge_from(theirs),
            (mine, theirs) => mine.merge_from(theirs),
        }
    }
}

impl Merge for ServerSettings {
    fn merge_from(&mut self, other: &Self) {
        self.rotation.merge_from(&other.rotation);
        self.max_players.merge_from(&other.max_players);
        self.max_queue_length.merge_from(&other.max_queue_length);
        self.max_vip_slots.merge_from(&other.max_vip_slots);
        self.idle_kick_time.merge_from(&other.idle_kick_time);
        self.max_allowed_ping.merge_from(&other.max_allowed_ping);
        self.team_switch_cooldown
            .merge_from(&other.team_switch_cooldown);
        self.auto_balance.merge_from(&other.auto_balance);
        self.vote_kick_enabled.merge_from(&other.vote_kick_enabled);
        self.chat_filter.merge_from(&other.chat_filter);
    }
}

impl Merge for EventCollection {
    fn merge_from(&mut self, other: &Self) {
        self.merge(other);
    }
}

impl Merge for Hopper {
    fn merge_from(&mut self, other: &Self) {
        merge_entity_lists(&mut self.players, &other.players);
        merge_entity_lists(&mut self.squads, &other.squads);
        merge_entity_lists(&mut self.teams, &other.teams);
        self.server.merge_from(&other.server);
        self.events.merge(&other.events);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::Field;
    use crate::key::KeyValue;

    fn player(steamid: &str) -> Player {
        Player {
            steamid: steamid.into(),
            ..Player::new()
        }
    }

    #[test]
    fn test_field_merge_newest_observed_wins() {
        let mut a: Field<i64> = Field::Set(1);
        a.merge_from(&Field::Unset);
        assert_eq!(a, Field::Set(1));

        a.merge_from(&Field::Set(2));
        assert_eq!(a, Field::Set(2));

        // Observed-empty is information and overrides.
        a.merge_from(&Field::Absent);
        assert_eq!(a, Field::Absent);
    }

    #[test]
    fn test_matched_players_merge_fields() {
        let mut base = player("1");
        base.role = "rifleman".into();

        let mut update = player("1");
        update.level = Field::Set(10);

        let mut list = vec![base];
        merge_entity_lists(&mut list, &[update]);

        assert_eq!(list.len(), 1);
        assert_eq!(list[0].role, Field::Set("rifleman".to_string()));
        assert_eq!(list[0].level, Field::Set(10));
    }

    #[test]
    fn test_unmatched_players_append() {
        let mut list = vec![player("1")];
        merge_entity_lists(&mut list, &[player("2")]);
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_settings_compose_across_sources() {
        let mut a = Server::default();
        a.settings = Field::Set(ServerSettings {
            max_players: Field::Set(100),
            ..ServerSettings::default()
        });

        let mut b = Server::default();
        b.settings = Field::Set(ServerSettings {
            vote_kick_enabled: Field::Set(true),
            ..ServerSettings::default()
        });

        a.merge_from(&b);
        let settings = a.settings.get().unwrap();
        assert_eq!(settings.max_players, Field::Set(100));
        assert_eq!(settings.vote_kick_enabled, Field::Set(true));
    }

    #[test]
    fn test_squad_id_merge() {
        let mut a = Squad {
            id: Field::Set(KeyValue::Int(1)),
            ..Squad::new()
        };
        let b = Squad {
            id: Field::Set(KeyValue::Int(1)),
            name: "able".into(),
            ..Squad::new()
        };
        a.merge_from(&b);
        assert_eq!(a.name, Field::Set("able".to_string()));
    }
}
