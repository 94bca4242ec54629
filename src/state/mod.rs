//! State management module for Aetherfall.
//!
//! This module provides the core state types and stores:
//!
//! - `action` - Bounded, sequenced per-player action history
//! - `session` - Live presence record for one logged-in player
//! - `map` - Map registry and per-map player tables
//! - `reaper` - Background eviction of idle sessions
//! - `metablob` - Hierarchical five-coordinate metadata store
//! - `flags` - Global switches and variables, seeded once from disk
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                           WorldState                             │
//! │                                                                  │
//! │  ┌───────────────────┐ ┌────────────────┐ ┌───────────────────┐  │
//! │  │    MapRegistry    │ │  MetaBlobStore │ │  GlobalFlagStore  │  │
//! │  │                   │ │                │ │                   │  │
//! │  │ map_id →          │ │ (owner,        │ │ name → bool       │  │
//! │  │   PlayerTable     │ │  purpose,      │ │ name → i64        │  │
//! │  │                   │ │  client,       │ │                   │  │
//! │  │ player_id →       │ │  primary,      │ │ fixed key set     │  │
//! │  │   PlayerSession   │ │  secondary)    │ │ after first load  │  │
//! │  │     └ ActionLog   │ │    → String    │ │                   │  │
//! │  └─────────▲─────────┘ └────────────────┘ └───────────────────┘  │
//! │            │                                                     │
//! │      ┌─────┴──────┐                                              │
//! │      │ IdleReaper │  sweep every 3 min, evict idle > 5 min       │
//! │      └────────────┘                                              │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The three stores are independent of each other. Request handlers receive
//! a shared [`WorldState`] and call into it concurrently; all locking is
//! internal and scoped (registry for table creation, table for session
//! insertion/removal, session for its own log and activity stamp).

pub mod action;
pub mod flags;
pub mod map;
pub mod metablob;
pub mod reaper;
pub mod session;

// Re-export commonly used types
pub use action::{ActionEntry, ActionLog, MAX_ACTIONS, SPAWN_ACTION};
pub use flags::{FlagSeed, FlagSeedError, GlobalFlagStore};
pub use map::{MapRegistry, PlayerTable};
pub use metablob::{BlobPath, MetaBlobStore};
pub use reaper::{IdleReaper, ReaperHandle, IDLE_TIMEOUT, REAP_INTERVAL};
pub use session::{PlayerSession, SessionSnapshot};

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

/// Error taxonomy for core state operations.
///
/// Both variants are client faults; the request layer maps them to
/// client-fault responses. Anything the core cannot express here is a
/// server fault and must not silently drop state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    /// An operation required a session that does not exist.
    #[error("no session for player {player_id} on map {map_id}")]
    NotFound { map_id: i64, player_id: String },

    /// A malformed or unknown identifier or value.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// Combined world state.
///
/// The one explicitly constructed object request handlers share; nothing
/// in this crate is ambient global state. All state is volatile: a restart
/// clears sessions and blobs, and the flag store reseeds itself from its
/// external source on first access.
#[derive(Debug, Default)]
pub struct WorldState {
    pub registry: Arc<MapRegistry>,
    pub metablob: MetaBlobStore,
    pub flags: GlobalFlagStore,
}

impl WorldState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log a player onto a map, replacing any prior session.
    pub fn login(&self, map_id: i64, player_id: &str, x: i64, y: i64) {
        self.registry.login(map_id, player_id, x, y);
    }

    /// Append an action to a player's session; `NotFound` without one.
    pub fn record_action(
        &self,
        map_id: i64,
        player_id: &str,
        action_id: i64,
        x: i64,
        y: i64,
    ) -> Result<u64, StateError> {
        self.registry.record_action(map_id, player_id, action_id, x, y)
    }

    /// Remove a player's session; absent is a no-op.
    pub fn logout(&self, map_id: i64, player_id: &str) -> bool {
        self.registry.logout(map_id, player_id)
    }

    /// Public state of every session on a map.
    pub fn snapshot(&self, map_id: i64) -> Vec<SessionSnapshot> {
        self.registry.snapshot(map_id)
    }

    /// Start the idle reaper on the current tokio runtime with the
    /// production schedule.
    pub fn start_reaper(&self) -> ReaperHandle {
        IdleReaper::new(Arc::clone(&self.registry)).spawn()
    }

    /// One immediate idle sweep, outside the reaper's schedule.
    pub fn sweep_idle(&self, threshold: Duration) -> usize {
        self.registry.sweep_idle(threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_world_state_basic() {
        let world = WorldState::new();
        world.login(1, "p1", 5, 5);

        let seq = world.record_action(1, "p1", 3, 6, 5).unwrap();
        assert_eq!(seq, 1);

        let snaps = world.snapshot(1);
        assert_eq!(snaps.len(), 1);
        assert_eq!(snaps[0].actions.len(), 2);

        assert!(world.logout(1, "p1"));
        assert!(matches!(
            world.record_action(1, "p1", 3, 0, 0),
            Err(StateError::NotFound { .. })
        ));
    }

    #[test]
    fn test_stores_are_independent() {
        let world = WorldState::new();
        world.metablob.put("a", "p", "c", "pk", "sk", "v");
        world.login(1, "p1", 0, 0);

        world.sweep_idle(Duration::ZERO);
        // Reaping sessions touches neither blobs nor flags.
        assert_eq!(world.metablob.len(), 1);
        assert!(!world.flags.is_loaded());
    }
}
