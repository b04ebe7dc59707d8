//! # Rosterwatch Core
//!
//! Snapshot/diff engine for multiplayer game-server state.
//!
//! A data source snapshots the live state of a server — players, squads,
//! teams, server settings — into a [`Hopper`] at successive points in
//! time. Comparing two consecutive hoppers derives a stream of discrete
//! domain events: joins, leaves, promotions, role changes, map changes.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌───────────────────┐
//! │ Data source │────▶│    Hopper    │────▶│ compare_snapshots │
//! │ (RCON, ...) │     │  (snapshot)  │     │    (pure fn)      │
//! └─────────────┘     └──────────────┘     └─────────┬─────────┘
//!                                                    │
//!                     ┌──────────────┐     ┌─────────▼─────────┐
//!                     │  Consumers   │◀────│  EventCollection  │
//!                     │ (bots, logs) │     │  (on the newer)   │
//!                     └──────────────┘     └───────────────────┘
//! ```
//!
//! ## Key Types
//!
//! | Type | Purpose |
//! |------|---------|
//! | [`Field`] | Tri-state presence: unset / observed-empty / value |
//! | [`Keyed`] | Scope path + key-field identity for every entity type |
//! | [`Link`] | Weak key-based reference, optionally carrying a fallback copy |
//! | [`Hopper`] | One point-in-time snapshot (players, squads, teams, server) |
//! | [`Event`] | Closed tagged union of derived events |
//! | [`compare_snapshots`] | Diff two snapshots into an event batch |
//!
//! ## Derived events
//!
//! The diff engine walks players, squads, teams and server fields in a
//! fixed order. Matching across snapshots is lenient: an entity missing a
//! key field is matched on the fields it does have, and a comparison where
//! either side is unobserved never produces a change event.

pub mod config;
pub mod diff;
pub mod event_log;
pub mod events;
pub mod field;
pub mod hopper;
pub mod key;
pub mod link;
pub mod merge;
pub mod metrics;
pub mod state;
pub mod testing;

pub use config::DiffConfig;
pub use diff::compare_snapshots;
pub use event_log::{EventLogError, EventLogWriter};
pub use events::{Event, EventCollection, EventError, EventKind};
pub use field::{Field, FieldError};
pub use hopper::{Hopper, HopperError};
pub use key::{matches_filters, KeyAttributes, KeyValue, Keyed};
pub use link::{EntityRef, Link, LinkTarget, Linkable};
pub use merge::Merge;
pub use metrics::DiffMetrics;
pub use state::{Player, PlayerScore, Server, ServerSettings, Squad, Team};
