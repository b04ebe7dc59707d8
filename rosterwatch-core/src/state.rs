//! Entity records for one server snapshot.
//!
//! Every observed attribute is a [`Field`] so partial data sources can
//! leave gaps without faking values. Relationship attributes hold
//! [`Link`]s — weak key-based references — never owned copies, so the
//! circular player/squad/team graph carries no ownership cycles.
//!
//! Each record also carries `observed_at`, the construction timestamp of
//! the snapshot record itself. The diff engine uses it to backfill
//! `joined_at`/`created_at` for entities first seen without one.

use crate::field::Field;
use crate::hopper::Hopper;
use crate::key::{matches_filters, KeyValue, Keyed};
use crate::link::Link;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A player currently on the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub steamid: Field<String>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub name: Field<String>,
    /// Server-assigned slot id; numeric or string depending on the source.
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub id: Field<KeyValue>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub team: Field<Link>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub squad: Field<Link>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub role: Field<String>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub loadout: Field<String>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub level: Field<i64>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub kills: Field<i64>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub deaths: Field<i64>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub alive: Field<bool>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub is_vip: Field<bool>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub joined_at: Field<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub is_spectator: Field<bool>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub score: Field<PlayerScore>,
    /// When this snapshot record was constructed.
    pub observed_at: DateTime<Utc>,
}

impl Player {
    pub fn new() -> Self {
        Self {
            steamid: Field::Unset,
            name: Field::Unset,
            id: Field::Unset,
            team: Field::Unset,
            squad: Field::Unset,
            role: Field::Unset,
            loadout: Field::Unset,
            level: Field::Unset,
            kills: Field::Unset,
            deaths: Field::Unset,
            alive: Field::Unset,
            is_vip: Field::Unset,
            joined_at: Field::Unset,
            is_spectator: Field::Unset,
            score: Field::Unset,
            observed_at: Utc::now(),
        }
    }

    /// Three-valued squad-leader check.
    ///
    /// `Some(true)` when this player equals its squad's leader, `Some(false)`
    /// when the squad has a different leader, `None` (unknown) when no squad
    /// or leader information is available. Absence of information is never
    /// reported as `false`.
    pub fn is_squad_leader(&self, tree: &Hopper) -> Option<bool> {
        let squad_link = self.squad.get()?;
        let resolved = squad_link.resolve_or_fallback(tree)?;
        let squad = resolved.as_squad()?;
        let leader = squad.leader.get()?;
        Some(matches_filters(self, leader.keys(), true))
    }
}

impl Default for Player {
    fn default() -> Self {
        Self::new()
    }
}

impl Keyed for Player {
    const SCOPE: &'static str = "players";
    const KEY_FIELDS: &'static [&'static str] = &["steamid", "id", "name"];

    fn key_value(&self, field: &str) -> Option<Field<KeyValue>> {
        match field {
            "steamid" => Some(self.steamid.clone().map(KeyValue::Str)),
            "id" => Some(self.id.clone()),
            "name" => Some(self.name.clone().map(KeyValue::Str)),
            _ => None,
        }
    }
}

/// Per-player score breakdown.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerScore {
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub combat: Field<i64>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub offense: Field<i64>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub defense: Field<i64>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub support: Field<i64>,
}

impl Keyed for PlayerScore {
    const SCOPE: &'static str = "players.score";
    const KEY_FIELDS: &'static [&'static str] = &[];

    fn key_value(&self, _field: &str) -> Option<Field<KeyValue>> {
        None
    }
}

/// A squad of players on one team.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Squad {
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub id: Field<KeyValue>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub leader: Field<Link>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub creator: Field<Link>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub name: Field<String>,
    /// Squad archetype (infantry, armor, recon, ...).
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub squad_type: Field<String>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub team: Field<Link>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub players: Field<Vec<Link>>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub created_at: Field<DateTime<Utc>>,
    /// When this snapshot record was constructed.
    pub observed_at: DateTime<Utc>,
}

impl Squad {
    pub fn new() -> Self {
        Self {
            id: Field::Unset,
            leader: Field::Unset,
            creator: Field::Unset,
            name: Field::Unset,
            squad_type: Field::Unset,
            team: Field::Unset,
            players: Field::Unset,
            created_at: Field::Unset,
            observed_at: Utc::now(),
        }
    }
}

impl Default for Squad {
    fn default() -> Self {
        Self::new()
    }
}

impl Keyed for Squad {
    const SCOPE: &'static str = "squads";
    const KEY_FIELDS: &'static [&'static str] = &["id", "name", "team"];

    fn key_value(&self, field: &str) -> Option<Field<KeyValue>> {
        match field {
            "id" => Some(self.id.clone()),
            "name" => Some(self.name.clone().map(KeyValue::Str)),
            "team" => Some(
                self.team
                    .as_ref()
                    .map(|link| KeyValue::Keys(link.keys().clone())),
            ),
            _ => None,
        }
    }
}

/// One of the (typically two) sides on the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub id: Field<KeyValue>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub leader: Field<Link>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub name: Field<String>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub squads: Field<Vec<Link>>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub players: Field<Vec<Link>>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub created_at: Field<DateTime<Utc>>,
    /// When this snapshot record was constructed.
    pub observed_at: DateTime<Utc>,
}

impl Team {
    pub fn new() -> Self {
        Self {
            id: Field::Unset,
            leader: Field::Unset,
            name: Field::Unset,
            squads: Field::Unset,
            players: Field::Unset,
            created_at: Field::Unset,
            observed_at: Utc::now(),
        }
    }

    /// Members of this team that are observed to have no squad.
    ///
    /// Players whose squad membership is unknown are not included — only
    /// those explicitly observed without one.
    pub fn unassigned_players<'a>(&self, tree: &'a Hopper) -> Vec<&'a Player> {
        let Some(links) = self.players.get() else {
            return Vec::new();
        };
        links
            .iter()
            .filter_map(|link| link.resolve(tree))
            .filter_map(|entity| entity.as_player())
            .filter(|player| player.squad.is_absent())
            .collect()
    }
}

impl Default for Team {
    fn default() -> Self {
        Self::new()
    }
}

impl Keyed for Team {
    const SCOPE: &'static str = "teams";
    const KEY_FIELDS: &'static [&'static str] = &["id", "name"];

    fn key_value(&self, field: &str) -> Option<Field<KeyValue>> {
        match field {
            "id" => Some(self.id.clone()),
            "name" => Some(self.name.clone().map(KeyValue::Str)),
            _ => None,
        }
    }
}

/// The server record of a snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Server {
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub name: Field<String>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub map: Field<String>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub gamemode: Field<String>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub next_map: Field<String>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub next_gamemode: Field<String>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub round_start: Field<DateTime<Utc>>,
    /// Coarse round state (warmup, in progress, ended).
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub state: Field<String>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub settings: Field<ServerSettings>,
}

impl Keyed for Server {
    const SCOPE: &'static str = "server";
    const KEY_FIELDS: &'static [&'static str] = &["name"];

    fn key_value(&self, field: &str) -> Option<Field<KeyValue>> {
        match field {
            "name" => Some(self.name.clone().map(KeyValue::Str)),
            _ => None,
        }
    }
}

/// Mutable server configuration as reported by the data source.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub rotation: Field<Vec<String>>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub max_players: Field<i64>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub max_queue_length: Field<i64>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub max_vip_slots: Field<i64>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub idle_kick_time: Field<Duration>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub max_allowed_ping: Field<i64>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub team_switch_cooldown: Field<Duration>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub auto_balance: Field<bool>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub vote_kick_enabled: Field<bool>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub chat_filter: Field<Vec<String>>,
}

impl Keyed for ServerSettings {
    const SCOPE: &'static str = "server.settings";
    const KEY_FIELDS: &'static [&'static str] = &[];

    fn key_value(&self, _field: &str) -> Option<Field<KeyValue>> {
        None
    }
}
