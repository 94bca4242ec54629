//! Aetherfall State Library
//!
//! This crate provides the ephemeral world-state core for Aetherfall
//! multiplayer servers.
//!
//! # Overview
//!
//! The state module provides:
//!
//! - **Session Registry** - Tracks which players are present on which map,
//!   with a bounded, monotonically sequenced history of each player's
//!   recent actions.
//!
//! - **Idle Reaper** - A background task that periodically evicts sessions
//!   whose players have gone quiet for too long.
//!
//! - **MetaBlob Store** - A generic hierarchical metadata store keyed by
//!   owner/purpose/client/primary/secondary coordinates, with point writes
//!   and prefix-scoped reads and deletes.
//!
//! - **Global Flags** - Named boolean switches and integer variables,
//!   seeded once from disk with a fixed key set thereafter.
//!
//! # Design Principles
//!
//! 1. **Everything is volatile** - Sessions, actions, and blobs live in
//!    memory only; a restart clears them. The flag store reseeds itself
//!    from its external source on first post-restart access.
//!
//! 2. **No ambient globals** - All state hangs off one explicitly
//!    constructed [`state::WorldState`] handed to request handlers.
//!
//! 3. **Fine-grained locking** - Registry, table, and session each lock
//!    themselves; two players never contend when recording actions.
//!
//! 4. **No networking** - This crate is pure state; routing, parameter
//!    parsing, and response serialization live in the consuming server.
//!
//! # Example
//!
//! ```rust
//! use aetherfall_state::identity;
//! use aetherfall_state::state::WorldState;
//!
//! let world = WorldState::new();
//!
//! // The request layer generates an ID, then logs the player in.
//! let player_id = identity::new_player_id();
//! world.login(1, &player_id, 5, 5);
//!
//! // Record a symbolic action and list the map.
//! world.record_action(1, &player_id, 3, 6, 5).unwrap();
//! for session in world.snapshot(1) {
//!     println!("{}", session.to_json());
//! }
//!
//! world.logout(1, &player_id);
//! ```

pub mod identity;
pub mod state;
