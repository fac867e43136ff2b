//! Error types for curve sampling and state-graph playback.

use serde::{Deserialize, Serialize};

/// Errors reported by the animation runtime.
///
/// Construction errors (`InvalidComponents`, `LengthMismatch`, ...) mean the
/// asset is malformed and must be rejected. Usage errors (`UnknownState`,
/// `NotATrack`, ...) leave the receiver untouched.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum AnimError {
    /// Tuple width of an AnimData buffer is zero
    #[error("AnimData components must be > 0, got {components}")]
    InvalidComponents { components: usize },

    /// Buffer length is not a multiple of the tuple width
    #[error("AnimData length {len} is not a multiple of {components} components")]
    LengthMismatch { len: usize, components: usize },

    /// A time input holds no keys
    #[error("Track '{track}': input {input} has no keys")]
    EmptyInput { track: String, input: usize },

    /// A time input is not sorted ascending or is not scalar
    #[error("Track '{track}': input {input} is not a sorted scalar time buffer")]
    UnsortedInput { track: String, input: usize },

    /// A curve references a missing input/output buffer
    #[error("Track '{track}': curve {curve} references {pool} {index} (pool size {len})")]
    CurveIndexOutOfRange {
        track: String,
        curve: usize,
        pool: String,
        index: usize,
        len: usize,
    },

    /// Output tuple count does not match the interpolation layout
    #[error("Track '{track}': curve {curve} expects {expected} output tuples, found {actual}")]
    ArityMismatch {
        track: String,
        curve: usize,
        expected: usize,
        actual: usize,
    },

    /// Declared duration ends before the last key
    #[error("Track '{track}': duration {duration} is shorter than last key time {last_time}")]
    DurationTooShort {
        track: String,
        duration: f32,
        last_time: f32,
    },

    /// Snapshot was sized for another track
    #[error("Snapshot does not match track '{track}'")]
    SnapshotMismatch { track: String },

    /// State name not present in the layer's graph
    #[error("Unknown state '{name}' in layer '{layer}'")]
    UnknownState { layer: String, name: String },

    /// Node path does not address a state or blend-tree child
    #[error("Unknown node path '{path}' in layer '{layer}'")]
    UnknownNode { layer: String, path: String },

    /// Layer lookup failed
    #[error("Unknown layer '{name}'")]
    UnknownLayer { name: String },

    /// A value offered for binding is not an animation track
    #[error("Value bound to '{path}' is not an animation track: {reason}")]
    NotATrack { path: String, reason: String },

    /// Playback requested while some reachable leaf has no track
    #[error("Layer '{layer}' is not playable")]
    NotPlayable { layer: String },

    /// State graph description is inconsistent
    #[error("Invalid state graph: {reason}")]
    InvalidGraph { reason: String },

    /// Serialization error
    #[error("Serialization error: {reason}")]
    Serialization { reason: String },
}

impl AnimError {
    /// Usage errors leave all state untouched and playback may continue.
    #[inline]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::UnknownState { .. }
                | Self::UnknownNode { .. }
                | Self::UnknownLayer { .. }
                | Self::NotATrack { .. }
                | Self::NotPlayable { .. }
        )
    }

    /// Get error category for logging
    #[inline]
    pub fn category(&self) -> &'static str {
        match self {
            Self::InvalidComponents { .. } | Self::LengthMismatch { .. } => "data",
            Self::EmptyInput { .. }
            | Self::UnsortedInput { .. }
            | Self::CurveIndexOutOfRange { .. }
            | Self::ArityMismatch { .. }
            | Self::DurationTooShort { .. } => "track",
            Self::SnapshotMismatch { .. } => "snapshot",
            Self::UnknownState { .. }
            | Self::UnknownNode { .. }
            | Self::UnknownLayer { .. }
            | Self::NotATrack { .. }
            | Self::NotPlayable { .. } => "usage",
            Self::InvalidGraph { .. } => "graph",
            Self::Serialization { .. } => "serialization",
        }
    }
}

impl From<serde_json::Error> for AnimError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            reason: err.to_string(),
        }
    }
}
