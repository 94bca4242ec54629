//! Live presence record for one logged-in player.
//!
//! A session is created by login, refreshed by every recorded action, and
//! torn down by logout or by the idle reaper. It owns the player's bounded
//! action history and the last-activity timestamp the reaper sweeps on.

use std::time::{Duration, Instant};

use crate::state::action::{ActionEntry, ActionLog};

/// Server-side record of one logged-in player on one map.
#[derive(Debug, Clone)]
pub struct PlayerSession {
    /// Externally generated unique identifier, scoped to one login
    pub player_id: String,

    /// Bounded history of the player's recent actions
    pub actions: ActionLog,

    /// Last time this player communicated with the server
    pub last_seen: Instant,

    /// Wall-clock time the session was created
    pub logged_in_at: chrono::DateTime<chrono::Utc>,
}

impl PlayerSession {
    /// Create a fresh session with the synthetic spawn entry at the login
    /// position. Any prior session for the same player is not consulted.
    pub fn login(player_id: String, x: i64, y: i64, map_id: i64) -> Self {
        Self {
            player_id,
            actions: ActionLog::spawn(x, y, map_id),
            last_seen: Instant::now(),
            logged_in_at: chrono::Utc::now(),
        }
    }

    /// Record activity (any message received for this player).
    pub fn touch(&mut self) {
        self.last_seen = Instant::now();
    }

    /// Time since the player last communicated.
    pub fn idle_time(&self) -> Duration {
        self.last_seen.elapsed()
    }

    /// Owned copy of the session's public state.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            player_id: self.player_id.clone(),
            actions: self.actions.to_vec(),
            idle: self.idle_time(),
            logged_in_at: self.logged_in_at,
        }
    }
}

/// Serializable copy of a session for external listing.
///
/// Carries no handles back into live state; mutating the source session
/// after the snapshot was taken does not affect it.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SessionSnapshot {
    pub player_id: String,
    pub actions: Vec<ActionEntry>,
    pub idle: Duration,
    pub logged_in_at: chrono::DateTime<chrono::Utc>,
}

impl SessionSnapshot {
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "player_id": self.player_id,
            "actions": self.actions.iter().map(ActionEntry::to_json).collect::<Vec<_>>(),
            "idle_secs": self.idle.as_secs(),
            "logged_in_at": self.logged_in_at.to_rfc3339(),
        })
    }
}
