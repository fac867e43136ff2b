//! Per-node inclusion rules restricting the channels a layer drives.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaskEntry {
    pub included: bool,
    /// Apply `included` to every descendant without its own entry.
    #[serde(default)]
    pub include_children: bool,
}

/// Mapping from `/`-separated skeleton node path to its rule. Nodes covered
/// by no entry are excluded.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnimMask {
    entries: HashMap<String, MaskEntry>,
}

impl AnimMask {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, path: impl Into<String>, included: bool, include_children: bool) -> Self {
        self.insert(
            path,
            MaskEntry {
                included,
                include_children,
            },
        );
        self
    }

    pub fn insert(&mut self, path: impl Into<String>, entry: MaskEntry) {
        self.entries.insert(path.into(), entry);
    }

    #[inline]
    pub fn get(&self, path: &str) -> Option<&MaskEntry> {
        self.entries.get(path)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MaskEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Whether channels on `node` pass the mask. An exact entry wins;
    /// otherwise the nearest ancestor with `include_children` decides.
    pub fn includes(&self, node: &str) -> bool {
        if let Some(entry) = self.entries.get(node) {
            return entry.included;
        }
        let mut path = node;
        while let Some(idx) = path.rfind('/') {
            path = &path[..idx];
            if let Some(entry) = self.entries.get(path) {
                if entry.include_children {
                    return entry.included;
                }
            }
        }
        false
    }
}
