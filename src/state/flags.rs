//! Global game switches and variables.
//!
//! Two flat stores of named flags: boolean "switches" and integer
//! "variables". Both are seeded once from external flat JSON documents and
//! the key set is fixed from then on: a set call for a key the seed never
//! defined is rejected and changes nothing. This is deliberately the
//! opposite of [`MetaBlobStore`](crate::state::metablob::MetaBlobStore)'s
//! auto-create semantics.

use std::collections::HashMap;
use std::path::Path;

use parking_lot::RwLock;
use thiserror::Error;
use tracing::debug;

use crate::state::StateError;

/// Initial flag content from the external configuration source.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Deserialize)]
pub struct FlagSeed {
    pub switches: HashMap<String, bool>,
    pub variables: HashMap<String, i64>,
}

impl FlagSeed {
    /// Load the seed from two flat JSON documents, one per store
    /// (`{"1": true, ...}` and `{"1": 42, ...}`).
    pub fn from_files(
        switches_path: impl AsRef<Path>,
        variables_path: impl AsRef<Path>,
    ) -> Result<Self, FlagSeedError> {
        let switches = serde_json::from_str(&std::fs::read_to_string(switches_path)?)?;
        let variables = serde_json::from_str(&std::fs::read_to_string(variables_path)?)?;
        Ok(Self {
            switches,
            variables,
        })
    }
}

/// Failure to read or parse the flag seed documents.
#[derive(Debug, Error)]
pub enum FlagSeedError {
    #[error("failed to read flag seed file: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed flag seed document: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Lazily seeded store of global switches and variables.
#[derive(Debug, Default)]
pub struct GlobalFlagStore {
    seed: RwLock<Option<FlagSeed>>,
}

impl GlobalFlagStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `load` and install its result if the store is still unseeded.
    ///
    /// The loader runs outside the lock, so concurrent first accesses may
    /// race it; that is tolerated because the source is immutable and
    /// deterministic, so every racer produces identical content and the
    /// last write wins. Once seeded, later calls return without loading.
    pub fn ensure_loaded<F>(&self, load: F) -> Result<(), FlagSeedError>
    where
        F: FnOnce() -> Result<FlagSeed, FlagSeedError>,
    {
        if self.seed.read().is_some() {
            return Ok(());
        }
        let seed = load()?;
        debug!(
            "seeded flag store: {} switches, {} variables",
            seed.switches.len(),
            seed.variables.len()
        );
        *self.seed.write() = Some(seed);
        Ok(())
    }

    pub fn is_loaded(&self) -> bool {
        self.seed.read().is_some()
    }

    /// Set a switch. Only keys present in the seed can be written; anything
    /// else leaves the store unchanged and reports `InvalidArgument`.
    pub fn set_switch(&self, id: &str, value: bool) -> Result<(), StateError> {
        let mut seed = self.seed.write();
        match seed.as_mut().and_then(|s| s.switches.get_mut(id)) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(StateError::InvalidArgument(format!("unknown switch: {id}"))),
        }
    }

    /// Set a variable, with the same unknown-key rule as [`set_switch`](Self::set_switch).
    pub fn set_variable(&self, id: &str, value: i64) -> Result<(), StateError> {
        let mut seed = self.seed.write();
        match seed.as_mut().and_then(|s| s.variables.get_mut(id)) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(StateError::InvalidArgument(format!(
                "unknown variable: {id}"
            ))),
        }
    }

    /// Full current switch mapping. Empty before the seed is loaded.
    pub fn switches(&self) -> HashMap<String, bool> {
        self.seed
            .read()
            .as_ref()
            .map(|s| s.switches.clone())
            .unwrap_or_default()
    }

    /// Full current variable mapping. Empty before the seed is loaded.
    pub fn variables(&self) -> HashMap<String, i64> {
        self.seed
            .read()
            .as_ref()
            .map(|s| s.variables.clone())
            .unwrap_or_default()
    }

    pub fn switches_json(&self) -> serde_json::Value {
        serde_json::json!(self.switches())
    }

    pub fn variables_json(&self) -> serde_json::Value {
        serde_json::json!(self.variables())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn seed() -> FlagSeed {
        FlagSeed {
            switches: HashMap::from([("1".to_string(), false), ("2".to_string(), true)]),
            variables: HashMap::from([("1".to_string(), 100)]),
        }
    }

    fn loaded_store() -> GlobalFlagStore {
        let store = GlobalFlagStore::new();
        store.ensure_loaded(|| Ok(seed())).unwrap();
        store
    }

    #[test]
    fn test_ensure_loaded_runs_once() {
        let store = GlobalFlagStore::new();
        let mut calls = 0;
        store
            .ensure_loaded(|| {
                calls += 1;
                Ok(seed())
            })
            .unwrap();
        store
            .ensure_loaded(|| {
                calls += 1;
                Ok(seed())
            })
            .unwrap();
        assert_eq!(calls, 1);
        assert!(store.is_loaded());
    }

    #[test]
    fn test_set_existing_keys() {
        let store = loaded_store();
        store.set_switch("1", true).unwrap();
        store.set_variable("1", -5).unwrap();
        assert_eq!(store.switches().get("1"), Some(&true));
        assert_eq!(store.variables().get("1"), Some(&-5));

        // The JSON views reflect the updated values as flat objects.
        let switches = store.switches_json();
        assert_eq!(switches["1"], serde_json::json!(true));
        assert_eq!(switches["2"], serde_json::json!(true));
        assert_eq!(store.variables_json(), serde_json::json!({"1": -5}));
    }

    #[test]
    fn test_set_unknown_key_is_rejected_and_changes_nothing() {
        let store = loaded_store();
        let before = store.switches();

        let err = store.set_switch("unknown", true).unwrap_err();
        assert!(matches!(err, StateError::InvalidArgument(_)));
        assert_eq!(store.switches(), before);

        assert!(store.set_variable("unknown", 1).is_err());
        assert_eq!(store.variables().len(), 1);
    }

    #[test]
    fn test_unloaded_store_rejects_sets() {
        let store = GlobalFlagStore::new();
        assert!(store.set_switch("1", true).is_err());
        assert!(store.switches().is_empty());
    }

    #[test]
    fn test_load_error_propagates_and_store_stays_unseeded() {
        let store = GlobalFlagStore::new();
        let result = store.ensure_loaded(|| {
            Err(FlagSeedError::Io(std::io::Error::other("source missing")))
        });
        assert!(result.is_err());
        assert!(!store.is_loaded());
    }

    #[test]
    fn test_seed_from_files() {
        let dir = tempfile::tempdir().unwrap();
        let switches_path = dir.path().join("Switches.ini");
        let variables_path = dir.path().join("Variables.ini");
        std::fs::File::create(&switches_path)
            .unwrap()
            .write_all(br#"{"1": true, "2": false}"#)
            .unwrap();
        std::fs::File::create(&variables_path)
            .unwrap()
            .write_all(br#"{"gold": 250}"#)
            .unwrap();

        let seed = FlagSeed::from_files(&switches_path, &variables_path).unwrap();
        assert_eq!(seed.switches.get("1"), Some(&true));
        assert_eq!(seed.variables.get("gold"), Some(&250));

        let bad = FlagSeed::from_files(dir.path().join("missing"), &variables_path);
        assert!(matches!(bad, Err(FlagSeedError::Io(_))));
    }
}
