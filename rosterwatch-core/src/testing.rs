//! Snapshot fixtures for tests.

use crate::field::Field;
use crate::hopper::Hopper;
use crate::state::{Player, Server, Squad, Team};

/// Chainable builder assembling a [`Hopper`] fixture.
///
/// Entities are inserted directly, bypassing the duplicate checks of the
/// `add_*` methods — fixtures are allowed to construct invalid snapshots
/// on purpose.
pub struct HopperBuilder {
    hopper: Hopper,
}

impl HopperBuilder {
    pub fn new() -> Self {
        Self {
            hopper: Hopper::new(),
        }
    }

    pub fn player(mut self, player: Player) -> Self {
        self.hopper.players.push(player);
        self
    }

    pub fn players(mut self, players: impl IntoIterator<Item = Player>) -> Self {
        self.hopper.players.extend(players);
        self
    }

    pub fn squad(mut self, squad: Squad) -> Self {
        self.hopper.squads.push(squad);
        self
    }

    pub fn team(mut self, team: Team) -> Self {
        self.hopper.teams.push(team);
        self
    }

    pub fn server(mut self, server: Server) -> Self {
        self.hopper.server = server;
        self
    }

    pub fn server_map(mut self, map: &str) -> Self {
        self.hopper.server.map = Field::Set(map.to_string());
        self
    }

    pub fn server_state(mut self, state: &str) -> Self {
        self.hopper.server.state = Field::Set(state.to_string());
        self
    }

    pub fn build(self) -> Hopper {
        self.hopper
    }
}

impl Default for HopperBuilder {
    fn default() -> Self {
        Self::new()
    }
}
