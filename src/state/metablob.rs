//! Hierarchical metadata store.
//!
//! Values are addressed by five ordered coordinates:
//! owner / purpose / client / primary key / secondary key. Writes always
//! name all five; reads and deletes can stop at any depth and address the
//! whole subtree below that prefix.
//!
//! Internally this is one flat ordered map keyed by the composite 5-tuple
//! rather than five nested maps: lexicographic key order makes every prefix
//! a contiguous range, so subtree reads and deletes are single range scans
//! and no level needs lazy initialization.
//!
//! Absence is a normal value here. Reading a missing prefix yields an empty
//! result and deleting one removes nothing; neither is an error.

use std::collections::BTreeMap;
use std::ops::Bound;

use parking_lot::RwLock;
use serde_json::Value;

/// Full composite key: owner, purpose, client, primary key, secondary key.
type BlobKey = [String; 5];

/// A prefix of the blob coordinates, 1 to 5 segments from the root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobPath {
    segments: Vec<String>,
}

impl BlobPath {
    pub fn owner(owner: impl Into<String>) -> Self {
        Self {
            segments: vec![owner.into()],
        }
    }

    pub fn purpose(owner: impl Into<String>, purpose: impl Into<String>) -> Self {
        Self {
            segments: vec![owner.into(), purpose.into()],
        }
    }

    pub fn client(
        owner: impl Into<String>,
        purpose: impl Into<String>,
        client: impl Into<String>,
    ) -> Self {
        Self {
            segments: vec![owner.into(), purpose.into(), client.into()],
        }
    }

    pub fn primary(
        owner: impl Into<String>,
        purpose: impl Into<String>,
        client: impl Into<String>,
        primary_key: impl Into<String>,
    ) -> Self {
        Self {
            segments: vec![owner.into(), purpose.into(), client.into(), primary_key.into()],
        }
    }

    pub fn secondary(
        owner: impl Into<String>,
        purpose: impl Into<String>,
        client: impl Into<String>,
        primary_key: impl Into<String>,
        secondary_key: impl Into<String>,
    ) -> Self {
        Self {
            segments: vec![
                owner.into(),
                purpose.into(),
                client.into(),
                primary_key.into(),
                secondary_key.into(),
            ],
        }
    }

    /// Number of coordinates in this prefix (1..=5).
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    fn matches(&self, key: &BlobKey) -> bool {
        self.segments
            .iter()
            .zip(key.iter())
            .all(|(seg, part)| seg == part)
    }

    /// Smallest full key within this prefix; empty strings sort first.
    fn range_start(&self) -> BlobKey {
        let mut start: BlobKey = Default::default();
        for (slot, seg) in start.iter_mut().zip(self.segments.iter()) {
            *slot = seg.clone();
        }
        start
    }
}

/// Generic metadata store with point writes and prefix-scoped reads/deletes.
#[derive(Debug, Default)]
pub struct MetaBlobStore {
    entries: RwLock<BTreeMap<BlobKey, String>>,
}

impl MetaBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write a leaf value, overwriting silently if it already exists.
    /// Intermediate levels are implicit; nothing needs pre-creating.
    pub fn put(
        &self,
        owner: impl Into<String>,
        purpose: impl Into<String>,
        client: impl Into<String>,
        primary_key: impl Into<String>,
        secondary_key: impl Into<String>,
        value: impl Into<String>,
    ) {
        let key: BlobKey = [
            owner.into(),
            purpose.into(),
            client.into(),
            primary_key.into(),
            secondary_key.into(),
        ];
        self.entries.write().insert(key, value.into());
    }

    /// The subtree rooted at `path` as nested JSON objects, leaves as
    /// strings. A full five-segment path yields the leaf value itself.
    /// A missing prefix yields `{}` (or `null` for a missing leaf).
    pub fn get(&self, path: &BlobPath) -> Value {
        let entries = self.entries.read();
        let matching: Vec<(&BlobKey, &String)> = entries
            .range((Bound::Included(path.range_start()), Bound::Unbounded))
            .take_while(|(key, _)| path.matches(key))
            .collect();

        if path.depth() == 5 {
            return matching
                .first()
                .map(|(_, value)| Value::String((*value).clone()))
                .unwrap_or(Value::Null);
        }
        subtree_json(&matching, path.depth())
    }

    /// Leaf value at the full five coordinates, if present.
    pub fn get_value(
        &self,
        owner: &str,
        purpose: &str,
        client: &str,
        primary_key: &str,
        secondary_key: &str,
    ) -> Option<String> {
        let key: BlobKey = [
            owner.to_string(),
            purpose.to_string(),
            client.to_string(),
            primary_key.to_string(),
            secondary_key.to_string(),
        ];
        self.entries.read().get(&key).cloned()
    }

    /// Remove the subtree rooted at `path`. Returns how many leaf values
    /// were removed; 0 for an absent prefix.
    pub fn delete(&self, path: &BlobPath) -> usize {
        let mut entries = self.entries.write();
        let doomed: Vec<BlobKey> = entries
            .range((Bound::Included(path.range_start()), Bound::Unbounded))
            .take_while(|(key, _)| path.matches(key))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &doomed {
            entries.remove(key);
        }
        doomed.len()
    }

    /// Total number of leaf values stored.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

/// Build the nested JSON object for sorted entries sharing a prefix of
/// `depth` segments. Entries arrive in key order, so each child's block is
/// contiguous.
fn subtree_json(entries: &[(&BlobKey, &String)], depth: usize) -> Value {
    if depth == 5 {
        return entries
            .first()
            .map(|(_, value)| Value::String((*value).clone()))
            .unwrap_or(Value::Null);
    }
    let mut map = serde_json::Map::new();
    let mut i = 0;
    while i < entries.len() {
        let segment = &entries[i].0[depth];
        let mut j = i + 1;
        while j < entries.len() && &entries[j].0[depth] == segment {
            j += 1;
        }
        map.insert(segment.clone(), subtree_json(&entries[i..j], depth + 1));
        i = j;
    }
    Value::Object(map)
}
