//! Bounded per-player action history.
//!
//! Each session keeps the ten most recent symbolic actions its client has
//! submitted. Entries carry a monotonic sequence number assigned from a
//! counter that outlives evicted entries, so the game's parsing layer can
//! detect gaps and ordering even after old actions have been trimmed away.

use std::collections::VecDeque;

/// Maximum number of actions retained per session.
pub const MAX_ACTIONS: usize = 10;

/// Action ID used for the synthetic entry seeded at login.
pub const SPAWN_ACTION: i64 = 0;

/// A single symbolic action submitted for a player.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ActionEntry {
    /// Sequence number, unique within the session's lifetime
    pub seq: u64,

    /// Symbolic action identifier (game-defined)
    pub action_id: i64,

    /// X position at the time of the action
    pub x: i64,

    /// Y position at the time of the action
    pub y: i64,

    /// Map the action happened on
    pub map_id: i64,
}

impl ActionEntry {
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "seq": self.seq,
            "action_id": self.action_id,
            "x": self.x,
            "y": self.y,
            "map_id": self.map_id,
        })
    }
}

/// Bounded FIFO history of one player's actions.
///
/// Holds at most [`MAX_ACTIONS`] entries, evicting oldest-first on overflow.
/// The sequence counter is never rewound: a sequence number is used exactly
/// once, even after the entry that carried it has been evicted. The counter
/// resets only when the whole log is replaced by a fresh login.
#[derive(Debug, Clone)]
pub struct ActionLog {
    entries: VecDeque<ActionEntry>,
    next_seq: u64,
}

impl ActionLog {
    /// Create a log seeded with the synthetic spawn entry at sequence 0.
    ///
    /// The spawn entry counts toward the [`MAX_ACTIONS`] cap like any other
    /// entry and is evicted once enough real actions arrive.
    pub fn spawn(x: i64, y: i64, map_id: i64) -> Self {
        let mut entries = VecDeque::with_capacity(MAX_ACTIONS + 1);
        entries.push_back(ActionEntry {
            seq: 0,
            action_id: SPAWN_ACTION,
            x,
            y,
            map_id,
        });
        Self {
            entries,
            next_seq: 1,
        }
    }

    /// Append an action, trimming oldest entries down to the cap.
    ///
    /// Returns the sequence number assigned to the new entry.
    pub fn record(&mut self, action_id: i64, x: i64, y: i64, map_id: i64) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.push_back(ActionEntry {
            seq,
            action_id,
            x,
            y,
            map_id,
        });
        while self.entries.len() > MAX_ACTIONS {
            self.entries.pop_front();
        }
        seq
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Most recent entry.
    pub fn latest(&self) -> Option<&ActionEntry> {
        self.entries.back()
    }

    /// Oldest retained entry.
    pub fn oldest(&self) -> Option<&ActionEntry> {
        self.entries.front()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ActionEntry> {
        self.entries.iter()
    }

    /// Owned copy of the retained entries, oldest first.
    pub fn to_vec(&self) -> Vec<ActionEntry> {
        self.entries.iter().cloned().collect()
    }
}
