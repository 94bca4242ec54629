//! Map and session registry.
//!
//! The registry maps map IDs to per-map player tables; each table maps
//! player IDs to live sessions. Locking is deliberately fine-grained:
//!
//! - the registry lock is taken for table creation and lookup only,
//! - each table has its own lock for session insertion and removal,
//! - each session sits behind its own mutex, so two players recording
//!   actions on the same map never contend with each other.
//!
//! Tables are created lazily by login and live for the process lifetime.
//! Read paths never create state: [`MapRegistry::get_table`] returns `None`
//! for a map nobody has logged into, and [`MapRegistry::snapshot`] of such
//! a map is simply empty.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};

use crate::state::session::{PlayerSession, SessionSnapshot};
use crate::state::StateError;

/// Players currently present on one map.
#[derive(Debug, Default)]
pub struct PlayerTable {
    sessions: RwLock<HashMap<String, Arc<Mutex<PlayerSession>>>>,
}

impl PlayerTable {
    fn new() -> Self {
        Self::default()
    }

    /// Insert a session, replacing any prior session for the same player.
    fn insert(&self, session: PlayerSession) {
        let player_id = session.player_id.clone();
        self.sessions
            .write()
            .insert(player_id, Arc::new(Mutex::new(session)));
    }

    /// Handle to a live session, if present.
    fn get(&self, player_id: &str) -> Option<Arc<Mutex<PlayerSession>>> {
        self.sessions.read().get(player_id).cloned()
    }

    /// Remove a session. Returns whether one was present.
    fn remove(&self, player_id: &str) -> bool {
        self.sessions.write().remove(player_id).is_some()
    }

    pub fn contains(&self, player_id: &str) -> bool {
        self.sessions.read().contains_key(player_id)
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    /// Copy the public state of every session on this map.
    ///
    /// Session handles are collected under the table lock, then each session
    /// is copied under its own lock, so every snapshot observes a session
    /// either before or after an append, never mid-trim.
    pub fn snapshot(&self) -> Vec<SessionSnapshot> {
        let handles: Vec<Arc<Mutex<PlayerSession>>> =
            self.sessions.read().values().cloned().collect();
        handles.iter().map(|s| s.lock().snapshot()).collect()
    }

    /// Player IDs idle strictly longer than `threshold`.
    fn collect_idle(&self, threshold: Duration) -> Vec<String> {
        let handles: Vec<Arc<Mutex<PlayerSession>>> =
            self.sessions.read().values().cloned().collect();
        handles
            .iter()
            .filter_map(|s| {
                let session = s.lock();
                (session.idle_time() > threshold).then(|| session.player_id.clone())
            })
            .collect()
    }
}

/// Process-wide registry of map player tables.
///
/// Tables are created on first login to a map and never removed.
#[derive(Debug, Default)]
pub struct MapRegistry {
    maps: RwLock<HashMap<i64, Arc<PlayerTable>>>,
}

impl MapRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table for a map, created if absent. Safe under concurrent calls for
    /// the same map: both callers end up with the same table.
    pub fn get_or_create_table(&self, map_id: i64) -> Arc<PlayerTable> {
        if let Some(table) = self.maps.read().get(&map_id) {
            return Arc::clone(table);
        }
        let mut maps = self.maps.write();
        Arc::clone(
            maps.entry(map_id)
                .or_insert_with(|| Arc::new(PlayerTable::new())),
        )
    }

    /// Table for a map, if one exists. Never creates an entry.
    pub fn get_table(&self, map_id: i64) -> Option<Arc<PlayerTable>> {
        self.maps.read().get(&map_id).cloned()
    }

    /// Map IDs that have ever seen a login.
    pub fn map_ids(&self) -> Vec<i64> {
        self.maps.read().keys().copied().collect()
    }

    /// Total sessions across all maps.
    pub fn session_count(&self) -> usize {
        let tables: Vec<Arc<PlayerTable>> = self.maps.read().values().cloned().collect();
        tables.iter().map(|t| t.len()).sum()
    }

    /// Log a player onto a map.
    ///
    /// Ensures the map's table exists, then installs a fresh session seeded
    /// with the spawn entry at `(x, y)`. Any prior session for the same
    /// player is replaced outright: its history and sequence counter are
    /// discarded (last writer wins).
    pub fn login(&self, map_id: i64, player_id: &str, x: i64, y: i64) {
        let table = self.get_or_create_table(map_id);
        table.insert(PlayerSession::login(player_id.to_string(), x, y, map_id));
    }

    /// Append an action to a player's session and refresh its activity.
    ///
    /// Returns the assigned sequence number, or [`StateError::NotFound`] if
    /// the player has no live session on the map. The append and trim happen
    /// under the session's own lock, so retried submissions for one player
    /// serialize cleanly and other players are unaffected.
    pub fn record_action(
        &self,
        map_id: i64,
        player_id: &str,
        action_id: i64,
        x: i64,
        y: i64,
    ) -> Result<u64, StateError> {
        let not_found = || StateError::NotFound {
            map_id,
            player_id: player_id.to_string(),
        };
        let handle = self
            .get_table(map_id)
            .ok_or_else(not_found)?
            .get(player_id)
            .ok_or_else(not_found)?;
        let mut session = handle.lock();
        let seq = session.actions.record(action_id, x, y, map_id);
        session.touch();
        Ok(seq)
    }

    /// Remove a player's session. Absence is a no-op, not an error.
    pub fn logout(&self, map_id: i64, player_id: &str) -> bool {
        match self.get_table(map_id) {
            Some(table) => table.remove(player_id),
            None => false,
        }
    }

    /// Public state of every session on a map. Empty for an unknown map.
    pub fn snapshot(&self, map_id: i64) -> Vec<SessionSnapshot> {
        match self.get_table(map_id) {
            Some(table) => table.snapshot(),
            None => Vec::new(),
        }
    }

    /// Reaper phase 1: identities of sessions idle strictly longer than
    /// `threshold` at scan time, across every map.
    pub fn collect_idle(&self, threshold: Duration) -> Vec<(i64, String)> {
        let tables: Vec<(i64, Arc<PlayerTable>)> = self
            .maps
            .read()
            .iter()
            .map(|(id, table)| (*id, Arc::clone(table)))
            .collect();
        let mut idle = Vec::new();
        for (map_id, table) in tables {
            for player_id in table.collect_idle(threshold) {
                idle.push((map_id, player_id));
            }
        }
        idle
    }

    /// Reaper phase 2: remove the collected identities. Identities already
    /// removed by a concurrent logout are skipped silently. Returns how many
    /// sessions were actually removed.
    pub fn remove_sessions(&self, idle: &[(i64, String)]) -> usize {
        idle.iter()
            .filter(|(map_id, player_id)| self.logout(*map_id, player_id))
            .count()
    }

    /// Full two-phase idle sweep: scan everything, then remove.
    ///
    /// The split avoids mutating any table while iterating it.
    pub fn sweep_idle(&self, threshold: Duration) -> usize {
        let idle = self.collect_idle(threshold);
        self.remove_sessions(&idle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_creates_table_and_session() {
        let registry = MapRegistry::new();
        registry.login(1, "p1", 5, 5);

        let table = registry.get_table(1).unwrap();
        assert!(table.contains("p1"));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_get_table_has_no_side_effects() {
        let registry = MapRegistry::new();
        assert!(registry.get_table(42).is_none());
        // The lookup must not have created an entry.
        assert!(registry.get_table(42).is_none());
        assert!(registry.map_ids().is_empty());
    }

    #[test]
    fn test_get_or_create_is_idempotent() {
        let registry = MapRegistry::new();
        let a = registry.get_or_create_table(7);
        let b = registry.get_or_create_table(7);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.map_ids(), vec![7]);
    }

    #[test]
    fn test_relogin_replaces_session() {
        let registry = MapRegistry::new();
        registry.login(1, "p1", 0, 0);
        for _ in 0..5 {
            registry.record_action(1, "p1", 3, 1, 1).unwrap();
        }

        // Re-login discards history and resets the sequence counter.
        registry.login(1, "p1", 9, 9);
        let snaps = registry.snapshot(1);
        assert_eq!(snaps.len(), 1);
        assert_eq!(snaps[0].actions.len(), 1);
        assert_eq!(snaps[0].actions[0].seq, 0);
        assert_eq!(registry.record_action(1, "p1", 3, 9, 9).unwrap(), 1);
    }

    #[test]
    fn test_record_action_without_session_is_not_found() {
        let registry = MapRegistry::new();
        let err = registry.record_action(1, "ghost", 3, 0, 0).unwrap_err();
        assert!(matches!(err, StateError::NotFound { .. }));

        // Unknown player on a known map is the same error.
        registry.login(1, "p1", 0, 0);
        assert!(registry.record_action(1, "ghost", 3, 0, 0).is_err());
    }

    #[test]
    fn test_login_logout_record_is_not_found() {
        let registry = MapRegistry::new();
        registry.login(1, "p1", 5, 5);
        assert!(registry.logout(1, "p1"));
        let err = registry.record_action(1, "p1", 3, 6, 5).unwrap_err();
        assert!(matches!(err, StateError::NotFound { .. }));
    }

    #[test]
    fn test_logout_absent_is_noop() {
        let registry = MapRegistry::new();
        assert!(!registry.logout(1, "nobody"));
        registry.login(1, "p1", 0, 0);
        assert!(registry.logout(1, "p1"));
        assert!(!registry.logout(1, "p1"));
    }

    #[test]
    fn test_overflow_scenario() {
        let registry = MapRegistry::new();
        registry.login(1, "p1", 5, 5);
        let mut last_seq = 0;
        for _ in 0..11 {
            last_seq = registry.record_action(1, "p1", 3, 6, 5).unwrap();
        }

        let snaps = registry.snapshot(1);
        assert_eq!(snaps[0].actions.len(), 10);
        assert_eq!(last_seq, 11);
        assert_eq!(snaps[0].actions.last().unwrap().seq, 11);
        // Spawn entry and first action fell off the front.
        assert_eq!(snaps[0].actions.first().unwrap().seq, 2);
    }

    #[test]
    fn test_snapshot_unknown_map_is_empty() {
        let registry = MapRegistry::new();
        assert!(registry.snapshot(99).is_empty());
        assert!(registry.get_table(99).is_none());
    }

    #[test]
    fn test_two_phase_sweep_removes_only_idle() {
        let registry = MapRegistry::new();
        registry.login(1, "old", 0, 0);
        registry.login(2, "older", 0, 0);
        std::thread::sleep(Duration::from_millis(30));
        registry.login(1, "fresh", 0, 0);
        assert_eq!(registry.session_count(), 3);

        let idle = registry.collect_idle(Duration::from_millis(15));
        assert_eq!(idle.len(), 2);
        assert!(idle.iter().all(|(_, p)| p.as_str() != "fresh"));

        assert_eq!(registry.remove_sessions(&idle), 2);
        assert_eq!(registry.session_count(), 1);
        assert!(registry.get_table(1).unwrap().contains("fresh"));
        assert!(!registry.get_table(1).unwrap().contains("old"));
        assert!(registry.get_table(2).unwrap().is_empty());
    }

    #[test]
    fn test_remove_tolerates_concurrent_logout() {
        let registry = MapRegistry::new();
        registry.login(1, "p1", 0, 0);
        std::thread::sleep(Duration::from_millis(5));

        let idle = registry.collect_idle(Duration::ZERO);
        assert_eq!(idle.len(), 1);

        // A logout lands between the scan and the removal phase.
        registry.logout(1, "p1");
        assert_eq!(registry.remove_sessions(&idle), 0);
    }

    #[test]
    fn test_concurrent_record_distinct_players() {
        let registry = Arc::new(MapRegistry::new());
        registry.login(1, "p1", 0, 0);
        registry.login(1, "p2", 0, 0);

        std::thread::scope(|scope| {
            for player_id in ["p1", "p2"] {
                let registry = Arc::clone(&registry);
                scope.spawn(move || {
                    for i in 0..100 {
                        registry.record_action(1, player_id, 3, i, i).unwrap();
                    }
                });
            }
        });

        // Each stream converged to the same result as a sequential run.
        for snap in registry.snapshot(1) {
            assert_eq!(snap.actions.len(), 10);
            assert_eq!(snap.actions.last().unwrap().seq, 100);
        }
    }

    #[test]
    fn test_concurrent_record_same_player_loses_nothing() {
        let registry = Arc::new(MapRegistry::new());
        registry.login(1, "p1", 0, 0);

        std::thread::scope(|scope| {
            for _ in 0..4 {
                let registry = Arc::clone(&registry);
                scope.spawn(move || {
                    for _ in 0..25 {
                        registry.record_action(1, "p1", 3, 0, 0).unwrap();
                    }
                });
            }
        });

        // 100 appends, no duplicated or skipped sequence numbers.
        let snaps = registry.snapshot(1);
        assert_eq!(snaps[0].actions.last().unwrap().seq, 100);
        let seqs: Vec<u64> = snaps[0].actions.iter().map(|e| e.seq).collect();
        assert_eq!(seqs, (91..=100).collect::<Vec<u64>>());
    }
}
