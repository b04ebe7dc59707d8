//! Event taxonomy and the per-snapshot event collection.
//!
//! Event kinds form a closed, ordered enumeration. The declaration order is
//! the evaluation order: anything that consumes "all events" sees
//! structural joins before attribute changes before leaves. A small private
//! subset (update/mount/dismount/setting-update) exists only as transient
//! signals between collaborators and never materializes in a collection.
//!
//! Events reference the entities they concern through [`Link`]s, preferably
//! fallback-mode so they stay meaningful after the source snapshot is
//! discarded.

use crate::field::Field;
use crate::key::KeyValue;
use crate::link::Link;
use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by the event collection.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EventError {
    /// Private kinds are transient signals and never enter a collection.
    #[error("event kind '{0}' is private and cannot be recorded")]
    PrivateEvent(EventKind),
    /// Name lookup against the kind table failed.
    #[error("unknown event kind '{0}'")]
    UnknownKind(String),
}

/// The closed set of event kinds, in evaluation order.
///
/// Private kinds come first, then every public kind in the order consumers
/// must consider them.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    // Private signals.
    Update,
    Mount,
    Dismount,
    SettingUpdate,
    // Public kinds, in order of evaluation.
    PlayerJoinServer,
    ServerMapChanged,
    ServerStateChanged,
    TeamCreated,
    SquadCreated,
    PlayerJoinTeam,
    PlayerJoinSquad,
    SquadLeaderChange,
    PlayerSpawn,
    PlayerRevived,
    PlayerChangeRole,
    PlayerChangeLoadout,
    PlayerEnterAdminCam,
    PlayerUseItem,
    PlayerMessage,
    PlayerWound,
    PlayerDowned,
    PlayerDeath,
    PlayerLevelUp,
    PlayerExitAdminCam,
    PlayerLeaveSquad,
    PlayerLeaveTeam,
    PlayerLeaveServer,
    SquadDisbanded,
    TeamDisbanded,
}

impl EventKind {
    /// Every kind, private ones included, in declaration order.
    pub const ALL: [EventKind; 29] = [
        EventKind::Update,
        EventKind::Mount,
        EventKind::Dismount,
        EventKind::SettingUpdate,
        EventKind::PlayerJoinServer,
        EventKind::ServerMapChanged,
        EventKind::ServerStateChanged,
        EventKind::TeamCreated,
        EventKind::SquadCreated,
        EventKind::PlayerJoinTeam,
        EventKind::PlayerJoinSquad,
        EventKind::SquadLeaderChange,
        EventKind::PlayerSpawn,
        EventKind::PlayerRevived,
        EventKind::PlayerChangeRole,
        EventKind::PlayerChangeLoadout,
        EventKind::PlayerEnterAdminCam,
        EventKind::PlayerUseItem,
        EventKind::PlayerMessage,
        EventKind::PlayerWound,
        EventKind::PlayerDowned,
        EventKind::PlayerDeath,
        EventKind::PlayerLevelUp,
        EventKind::PlayerExitAdminCam,
        EventKind::PlayerLeaveSquad,
        EventKind::PlayerLeaveTeam,
        EventKind::PlayerLeaveServer,
        EventKind::SquadDisbanded,
        EventKind::TeamDisbanded,
    ];

    /// Kinds excluded from public collections and iteration.
    pub fn is_private(self) -> bool {
        matches!(
            self,
            EventKind::Update
                | EventKind::Mount
                | EventKind::Dismount
                | EventKind::SettingUpdate
        )
    }

    /// All public kinds, in evaluation order.
    pub fn public() -> impl Iterator<Item = EventKind> {
        Self::ALL.into_iter().filter(|kind| !kind.is_private())
    }

    pub fn name(self) -> &'static str {
        match self {
            EventKind::Update => "update",
            EventKind::Mount => "mount",
            EventKind::Dismount => "dismount",
            EventKind::SettingUpdate => "setting_update",
            EventKind::PlayerJoinServer => "player_join_server",
            EventKind::ServerMapChanged => "server_map_changed",
            EventKind::ServerStateChanged => "server_state_changed",
            EventKind::TeamCreated => "team_created",
            EventKind::SquadCreated => "squad_created",
            EventKind::PlayerJoinTeam => "player_join_team",
            EventKind::PlayerJoinSquad => "player_join_squad",
            EventKind::SquadLeaderChange => "squad_leader_change",
            EventKind::PlayerSpawn => "player_spawn",
            EventKind::PlayerRevived => "player_revived",
            EventKind::PlayerChangeRole => "player_change_role",
            EventKind::PlayerChangeLoadout => "player_change_loadout",
            EventKind::PlayerEnterAdminCam => "player_enter_admin_cam",
            EventKind::PlayerUseItem => "player_use_item",
            EventKind::PlayerMessage => "player_message",
            EventKind::PlayerWound => "player_wound",
            EventKind::PlayerDowned => "player_downed",
            EventKind::PlayerDeath => "player_death",
            EventKind::PlayerLevelUp => "player_level_up",
            EventKind::PlayerExitAdminCam => "player_exit_admin_cam",
            EventKind::PlayerLeaveSquad => "player_leave_squad",
            EventKind::PlayerLeaveTeam => "player_leave_team",
            EventKind::PlayerLeaveServer => "player_leave_server",
            EventKind::SquadDisbanded => "squad_disbanded",
            EventKind::TeamDisbanded => "team_disbanded",
        }
    }

    /// Look a kind up by its snake_case name through the explicit table.
    pub fn from_name(name: &str) -> Result<EventKind, EventError> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == name)
            .ok_or_else(|| EventError::UnknownKind(name.to_string()))
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Default event timestamp: the moment of construction.
fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Compare two players embedded in fallback links by team.
///
/// `None` when either player copy or the first player's team is unknown;
/// `Some(false)` when the other's team is unknown or differs.
fn teams_equal(player: &Link, other: &Link) -> Option<bool> {
    let player = player.fallback_player()?;
    let other = other.fallback_player()?;
    let player_team = player.team.get()?;
    Some(match other.team.get() {
        Some(other_team) => player_team == other_team,
        None => false,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerJoinServerEvent {
    #[serde(default = "now")]
    pub event_time: DateTime<Utc>,
    pub player: Link,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerMapChangedEvent {
    #[serde(default = "now")]
    pub event_time: DateTime<Utc>,
    pub old: String,
    pub new: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerStateChangedEvent {
    #[serde(default = "now")]
    pub event_time: DateTime<Utc>,
    pub old: String,
    pub new: String,
    /// Final score line, when the round just ended.
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub score: Field<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamCreatedEvent {
    #[serde(default = "now")]
    pub event_time: DateTime<Utc>,
    pub team: Link,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SquadCreatedEvent {
    #[serde(default = "now")]
    pub event_time: DateTime<Utc>,
    pub squad: Link,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerJoinTeamEvent {
    #[serde(default = "now")]
    pub event_time: DateTime<Utc>,
    pub player: Link,
    pub team: Link,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerJoinSquadEvent {
    #[serde(default = "now")]
    pub event_time: DateTime<Utc>,
    pub player: Link,
    pub squad: Link,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SquadLeaderChangeEvent {
    #[serde(default = "now")]
    pub event_time: DateTime<Utc>,
    pub squad: Link,
    /// Previous leader; `Absent` when the squad had none.
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub old: Field<Link>,
    /// New leader; `Absent` when the squad now has none.
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub new: Field<Link>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSpawnEvent {
    #[serde(default = "now")]
    pub event_time: DateTime<Utc>,
    pub player: Link,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRevivedEvent {
    #[serde(default = "now")]
    pub event_time: DateTime<Utc>,
    pub player: Link,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub other: Field<Link>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerChangeRoleEvent {
    #[serde(default = "now")]
    pub event_time: DateTime<Utc>,
    pub player: Link,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub old: Field<String>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub new: Field<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerChangeLoadoutEvent {
    #[serde(default = "now")]
    pub event_time: DateTime<Utc>,
    pub player: Link,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub old: Field<String>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub new: Field<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerEnterAdminCamEvent {
    #[serde(default = "now")]
    pub event_time: DateTime<Utc>,
    pub player: Link,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerUseItemEvent {
    #[serde(default = "now")]
    pub event_time: DateTime<Utc>,
    pub player: Link,
    pub item: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerMessageEvent {
    #[serde(default = "now")]
    pub event_time: DateTime<Utc>,
    pub player: Link,
    pub message: String,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub channel: Field<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerWoundEvent {
    #[serde(default = "now")]
    pub event_time: DateTime<Utc>,
    pub player: Link,
    pub other: Link,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub item: Field<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerDownedEvent {
    #[serde(default = "now")]
    pub event_time: DateTime<Utc>,
    pub player: Link,
    pub other: Link,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub item: Field<String>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub headshot: Field<bool>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub distance: Field<f64>,
}

impl PlayerDownedEvent {
    /// Three-valued: `None` when the players or the victim's team are
    /// unknown — missing data never defaults to `false`.
    pub fn is_teamkill(&self) -> Option<bool> {
        teams_equal(&self.player, &self.other)
    }

    pub fn is_suicide(&self) -> Option<bool> {
        Some(self.player == self.other)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerDeathEvent {
    #[serde(default = "now")]
    pub event_time: DateTime<Utc>,
    pub player: Link,
    /// The killer; `Absent` for environmental deaths.
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub other: Field<Link>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub item: Field<String>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub headshot: Field<bool>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub distance: Field<f64>,
}

impl PlayerDeathEvent {
    /// Three-valued: `None` when the killer or the victim's team are
    /// unknown — missing data never defaults to `false`.
    pub fn is_teamkill(&self) -> Option<bool> {
        teams_equal(&self.player, self.other.get()?)
    }

    pub fn is_suicide(&self) -> Option<bool> {
        if !self.other.has() {
            return None;
        }
        Some(self.other.get() == Some(&self.player))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerLevelUpEvent {
    #[serde(default = "now")]
    pub event_time: DateTime<Utc>,
    pub player: Link,
    pub old: i64,
    pub new: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerExitAdminCamEvent {
    #[serde(default = "now")]
    pub event_time: DateTime<Utc>,
    pub player: Link,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerLeaveSquadEvent {
    #[serde(default = "now")]
    pub event_time: DateTime<Utc>,
    pub player: Link,
    pub squad: Link,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerLeaveTeamEvent {
    #[serde(default = "now")]
    pub event_time: DateTime<Utc>,
    pub player: Link,
    pub team: Link,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerLeaveServerEvent {
    #[serde(default = "now")]
    pub event_time: DateTime<Utc>,
    pub player: Link,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SquadDisbandedEvent {
    #[serde(default = "now")]
    pub event_time: DateTime<Utc>,
    pub squad: Link,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamDisbandedEvent {
    #[serde(default = "now")]
    pub event_time: DateTime<Utc>,
    pub team: Link,
}

/// Transient "snapshot refreshed" signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateEvent {
    #[serde(default = "now")]
    pub event_time: DateTime<Utc>,
}

/// Transient "data source attached" signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MountEvent {
    #[serde(default = "now")]
    pub event_time: DateTime<Utc>,
}

/// Transient "data source detached" signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DismountEvent {
    #[serde(default = "now")]
    pub event_time: DateTime<Utc>,
}

/// Transient "server setting changed" signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingUpdateEvent {
    #[serde(default = "now")]
    pub event_time: DateTime<Utc>,
    pub key: String,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub old: Field<KeyValue>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub new: Field<KeyValue>,
}

/// A single event with its typed payload.
///
/// Serializes internally tagged for clean JSONL output:
/// `{"type":"player_join_server","event_time":"...","player":{...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    Update(UpdateEvent),
    Mount(MountEvent),
    Dismount(DismountEvent),
    SettingUpdate(SettingUpdateEvent),
    PlayerJoinServer(PlayerJoinServerEvent),
    ServerMapChanged(ServerMapChangedEvent),
    ServerStateChanged(ServerStateChangedEvent),
    TeamCreated(TeamCreatedEvent),
    SquadCreated(SquadCreatedEvent),
    PlayerJoinTeam(PlayerJoinTeamEvent),
    PlayerJoinSquad(PlayerJoinSquadEvent),
    SquadLeaderChange(SquadLeaderChangeEvent),
    PlayerSpawn(PlayerSpawnEvent),
    PlayerRevived(PlayerRevivedEvent),
    PlayerChangeRole(PlayerChangeRoleEvent),
    PlayerChangeLoadout(PlayerChangeLoadoutEvent),
    PlayerEnterAdminCam(PlayerEnterAdminCamEvent),
    PlayerUseItem(PlayerUseItemEvent),
    PlayerMessage(PlayerMessageEvent),
    PlayerWound(PlayerWoundEvent),
    PlayerDowned(PlayerDownedEvent),
    PlayerDeath(PlayerDeathEvent),
    PlayerLevelUp(PlayerLevelUpEvent),
    PlayerExitAdminCam(PlayerExitAdminCamEvent),
    PlayerLeaveSquad(PlayerLeaveSquadEvent),
    PlayerLeaveTeam(PlayerLeaveTeamEvent),
    PlayerLeaveServer(PlayerLeaveServerEvent),
    SquadDisbanded(SquadDisbandedEvent),
    TeamDisbanded(TeamDisbandedEvent),
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Update(_) => EventKind::Update,
            Event::Mount(_) => EventKind::Mount,
            Event::Dismount(_) => EventKind::Dismount,
            Event::SettingUpdate(_) => EventKind::SettingUpdate,
            Event::PlayerJoinServer(_) => EventKind::PlayerJoinServer,
            Event::ServerMapChanged(_) => EventKind::ServerMapChanged,
            Event::ServerStateChanged(_) => EventKind::ServerStateChanged,
            Event::TeamCreated(_) => EventKind::TeamCreated,
            Event::SquadCreated(_) => EventKind::SquadCreated,
            Event::PlayerJoinTeam(_) => EventKind::PlayerJoinTeam,
            Event::PlayerJoinSquad(_) => EventKind::PlayerJoinSquad,
            Event::SquadLeaderChange(_) => EventKind::SquadLeaderChange,
            Event::PlayerSpawn(_) => EventKind::PlayerSpawn,
            Event::PlayerRevived(_) => EventKind::PlayerRevived,
            Event::PlayerChangeRole(_) => EventKind::PlayerChangeRole,
            Event::PlayerChangeLoadout(_) => EventKind::PlayerChangeLoadout,
            Event::PlayerEnterAdminCam(_) => EventKind::PlayerEnterAdminCam,
            Event::PlayerUseItem(_) => EventKind::PlayerUseItem,
            Event::PlayerMessage(_) => EventKind::PlayerMessage,
            Event::PlayerWound(_) => EventKind::PlayerWound,
            Event::PlayerDowned(_) => EventKind::PlayerDowned,
            Event::PlayerDeath(_) => EventKind::PlayerDeath,
            Event::PlayerLevelUp(_) => EventKind::PlayerLevelUp,
            Event::PlayerExitAdminCam(_) => EventKind::PlayerExitAdminCam,
            Event::PlayerLeaveSquad(_) => EventKind::PlayerLeaveSquad,
            Event::PlayerLeaveTeam(_) => EventKind::PlayerLeaveTeam,
            Event::PlayerLeaveServer(_) => EventKind::PlayerLeaveServer,
            Event::SquadDisbanded(_) => EventKind::SquadDisbanded,
            Event::TeamDisbanded(_) => EventKind::TeamDisbanded,
        }
    }

    pub fn event_time(&self) -> DateTime<Utc> {
        match self {
            Event::Update(e) => e.event_time,
            Event::Mount(e) => e.event_time,
            Event::Dismount(e) => e.event_time,
            Event::SettingUpdate(e) => e.event_time,
            Event::PlayerJoinServer(e) => e.event_time,
            Event::ServerMapChanged(e) => e.event_time,
            Event::ServerStateChanged(e) => e.event_time,
            Event::TeamCreated(e) => e.event_time,
            Event::SquadCreated(e) => e.event_time,
            Event::PlayerJoinTeam(e) => e.event_time,
            Event::PlayerJoinSquad(e) => e.event_time,
            Event::SquadLeaderChange(e) => e.event_time,
            Event::PlayerSpawn(e) => e.event_time,
            Event::PlayerRevived(e) => e.event_time,
            Event::PlayerChangeRole(e) => e.event_time,
            Event::PlayerChangeLoadout(e) => e.event_time,
            Event::PlayerEnterAdminCam(e) => e.event_time,
            Event::PlayerUseItem(e) => e.event_time,
            Event::PlayerMessage(e) => e.event_time,
            Event::PlayerWound(e) => e.event_time,
            Event::PlayerDowned(e) => e.event_time,
            Event::PlayerDeath(e) => e.event_time,
            Event::PlayerLevelUp(e) => e.event_time,
            Event::PlayerExitAdminCam(e) => e.event_time,
            Event::PlayerLeaveSquad(e) => e.event_time,
            Event::PlayerLeaveTeam(e) => e.event_time,
            Event::PlayerLeaveServer(e) => e.event_time,
            Event::SquadDisbanded(e) => e.event_time,
            Event::TeamDisbanded(e) => e.event_time,
        }
    }
}

/// Per-kind event lists for one snapshot.
///
/// A kind that was considered but produced nothing holds an empty list,
/// which is distinguishable from a kind never considered at all (no entry).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventCollection {
    by_kind: FxHashMap<EventKind, Vec<Event>>,
}

impl EventCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// File an event into its kind's list, creating the list on first use.
    /// Private kinds are rejected.
    pub fn add(&mut self, event: Event) -> Result<(), EventError> {
        let kind = event.kind();
        if kind.is_private() {
            return Err(EventError::PrivateEvent(kind));
        }
        self.by_kind.entry(kind).or_default().push(event);
        Ok(())
    }

    /// Pre-create an empty list for `kind`, marking it as considered so
    /// downstream consumers can tell it apart from a kind never evaluated.
    pub fn reserve(&mut self, kind: EventKind) -> Result<(), EventError> {
        if kind.is_private() {
            return Err(EventError::PrivateEvent(kind));
        }
        self.by_kind.entry(kind).or_default();
        Ok(())
    }

    /// The list for `kind`; `None` when the kind was never populated or
    /// reserved.
    pub fn get(&self, kind: EventKind) -> Option<&[Event]> {
        self.by_kind.get(&kind).map(Vec::as_slice)
    }

    /// [`EventCollection::get`] by kind name.
    pub fn get_by_name(&self, name: &str) -> Result<Option<&[Event]>, EventError> {
        Ok(self.get(EventKind::from_name(name)?))
    }

    /// Concatenate `other`'s per-kind lists onto this collection. Existing
    /// events are never overwritten; lists missing here are created.
    pub fn merge(&mut self, other: &EventCollection) {
        for (kind, events) in &other.by_kind {
            self.by_kind
                .entry(*kind)
                .or_default()
                .extend(events.iter().cloned());
        }
    }

    /// Populated kinds and their lists, in evaluation order.
    pub fn iter(&self) -> impl Iterator<Item = (EventKind, &[Event])> {
        EventKind::public()
            .filter_map(|kind| self.by_kind.get(&kind).map(|v| (kind, v.as_slice())))
    }

    /// Total number of recorded events across all kinds.
    pub fn len(&self) -> usize {
        self.by_kind.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::Linkable;
    use crate::state::Player;

    fn player_link(steamid: &str, team: Option<&crate::state::Team>) -> Link {
        let mut p = Player {
            steamid: steamid.into(),
            ..Player::new()
        };
        if let Some(team) = team {
            p.team = Field::Set(team.create_link(false));
        }
        p.create_link(true)
    }

    fn join_event(steamid: &str) -> Event {
        Event::PlayerJoinServer(PlayerJoinServerEvent {
            event_time: Utc::now(),
            player: player_link(steamid, None),
        })
    }

    #[test]
    fn test_kind_order_and_name_table() {
        assert!(EventKind::Update < EventKind::PlayerJoinServer);
        assert!(EventKind::PlayerJoinServer < EventKind::TeamDisbanded);
        for kind in EventKind::ALL {
            assert_eq!(EventKind::from_name(kind.name()), Ok(kind));
        }
        assert_eq!(
            EventKind::from_name("player_rank_up"),
            Err(EventError::UnknownKind("player_rank_up".into()))
        );
    }

    #[test]
    fn test_public_excludes_private() {
        let public: Vec<_> = EventKind::public().collect();
        assert_eq!(public.len(), 25);
        assert!(!public.contains(&EventKind::Update));
        assert_eq!(public[0], EventKind::PlayerJoinServer);
    }

    #[test]
    fn test_add_files_by_kind() {
        let mut events = EventCollection::new();
        events.add(join_event("1")).unwrap();
        events.add(join_event("2")).unwrap();

        assert_eq!(events.get(EventKind::PlayerJoinServer).map(|l| l.len()), Some(2));
        assert_eq!(events.get(EventKind::PlayerLeaveServer), None);
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn test_private_kinds_rejected() {
        let mut events = EventCollection::new();
        let err = events
            .add(Event::Update(UpdateEvent { event_time: Utc::now() }))
            .unwrap_err();
        assert_eq!(err, EventError::PrivateEvent(EventKind::Update));
        assert!(events.reserve(EventKind::Mount).is_err());
    }

    #[test]
    fn test_reserve_distinguishes_considered_from_untouched() {
        let mut events = EventCollection::new();
        events.reserve(EventKind::PlayerLevelUp).unwrap();

        assert_eq!(events.get(EventKind::PlayerLevelUp), Some(&[][..]));
        assert_eq!(events.get(EventKind::PlayerJoinServer), None);
    }

    #[test]
    fn test_merge_concatenates_per_kind() {
        let mut a = EventCollection::new();
        a.add(join_event("1")).unwrap();
        let mut b = EventCollection::new();
        b.add(join_event("2")).unwrap();
        b.reserve(EventKind::PlayerLevelUp).unwrap();

        a.merge(&b);
        assert_eq!(a.get(EventKind::PlayerJoinServer).map(|l| l.len()), Some(2));
        assert_eq!(a.get(EventKind::PlayerLevelUp), Some(&[][..]));
    }

    #[test]
    fn test_teamkill_is_three_valued() {
        let team_a = crate::state::Team {
            id: Field::Set(KeyValue::Int(1)),
            ..crate::state::Team::new()
        };
        let team_b = crate::state::Team {
            id: Field::Set(KeyValue::Int(2)),
            ..crate::state::Team::new()
        };

        let downed = |player: Link, other: Link| PlayerDownedEvent {
            event_time: Utc::now(),
            player,
            other,
            item: Field::Unset,
            headshot: Field::Unset,
            distance: Field::Unset,
        };

        // Same team: teamkill.
        let e = downed(player_link("1", Some(&team_a)), player_link("2", Some(&team_a)));
        assert_eq!(e.is_teamkill(), Some(true));

        // Different teams.
        let e = downed(player_link("1", Some(&team_a)), player_link("2", Some(&team_b)));
        assert_eq!(e.is_teamkill(), Some(false));

        // Victim team unknown: unknown, never false.
        let e = downed(player_link("1", None), player_link("2", Some(&team_a)));
        assert_eq!(e.is_teamkill(), None);

        // Suicide by link equality.
        let e = downed(player_link("1", None), player_link("1", None));
        assert_eq!(e.is_suicide(), Some(true));
    }
}
