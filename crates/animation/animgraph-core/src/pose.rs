//! Blended channel values and the weighted accumulation that produces them.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::interp::lerp_f32;

/// Final channel values keyed by `"<node>.<property>"`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pose {
    channels: HashMap<String, Vec<f32>>,
}

impl Pose {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn get(&self, key: &str) -> Option<&[f32]> {
        self.channels.get(key).map(Vec::as_slice)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Vec<f32>) {
        self.channels.insert(key.into(), value);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[f32])> {
        self.channels.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn clear(&mut self) {
        self.channels.clear();
    }

    /// Move each channel of `layer` towards its value by `weight`. Channels
    /// absent here take the layer's value outright.
    pub fn blend_overwrite(&mut self, layer: &Pose, weight: f32) {
        for (key, src) in &layer.channels {
            match self.channels.get_mut(key) {
                Some(dst) if dst.len() == src.len() => {
                    for (d, s) in dst.iter_mut().zip(src) {
                        *d = lerp_f32(*d, *s, weight);
                    }
                }
                _ => {
                    self.channels.insert(key.clone(), src.clone());
                }
            }
        }
    }

    /// Add `layer * weight` on top of each channel. Channels absent here start
    /// from zero.
    pub fn blend_add(&mut self, layer: &Pose, weight: f32) {
        for (key, src) in &layer.channels {
            match self.channels.get_mut(key) {
                Some(dst) if dst.len() == src.len() => {
                    for (d, s) in dst.iter_mut().zip(src) {
                        *d += s * weight;
                    }
                }
                _ => {
                    self.channels
                        .insert(key.clone(), src.iter().map(|s| s * weight).collect());
                }
            }
        }
    }
}

#[derive(Clone, Debug)]
struct AccumEntry {
    sum: Vec<f32>,
    w: f32,
}

/// Weighted average of contributions per channel key.
#[derive(Default)]
pub struct Accumulator {
    map: HashMap<String, AccumEntry>,
}

impl Accumulator {
    pub fn new() -> Self {
        Self {
            map: HashMap::new(),
        }
    }

    pub fn add(&mut self, key: &str, value: &[f32], weight: f32) {
        if weight <= 0.0 {
            return;
        }
        match self.map.get_mut(key) {
            Some(entry) => {
                // Mismatched widths are ignored; first contribution wins the shape.
                if entry.sum.len() == value.len() {
                    for (s, v) in entry.sum.iter_mut().zip(value) {
                        *s += v * weight;
                    }
                    entry.w += weight;
                }
            }
            None => {
                self.map.insert(
                    key.to_string(),
                    AccumEntry {
                        sum: value.iter().map(|v| v * weight).collect(),
                        w: weight,
                    },
                );
            }
        }
    }

    pub fn finalize(self) -> Pose {
        let mut out = Pose::new();
        for (key, entry) in self.map {
            if entry.w > 0.0 {
                let w = entry.w;
                out.insert(key, entry.sum.into_iter().map(|s| s / w).collect());
            }
        }
        out
    }
}
