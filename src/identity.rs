//! Player identity generation.
//!
//! Player IDs are throwaway: a fresh one is generated per login and never
//! persisted. The core stores accept any pre-generated unique string; this
//! module is the collaborator the request layer calls before login.

use uuid::Uuid;

/// Generate a new player identifier (UUID v4, canonical string form).
pub fn new_player_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique_and_canonical() {
        let a = new_player_id();
        let b = new_player_id();
        assert_ne!(a, b);
        assert!(Uuid::parse_str(&a).is_ok());
        assert_eq!(a.len(), 36);
    }
}
