//! Animgraph Core (engine-agnostic)
//!
//! Keyframe curve sampling over shared immutable tracks, per-binding
//! evaluation caches, and layered state-machine playback with cross-fades,
//! masks and weighted layer blending. Hosts feed `update(dt)` once per frame
//! and read the blended [`Pose`].

pub mod cache;
pub mod component;
pub mod config;
pub mod controller;
pub mod curve;
pub mod data;
pub mod error;
pub mod graph;
pub mod interp;
pub mod layer;
pub mod mask;
pub mod notify;
pub mod parameters;
pub mod pose;
pub mod snapshot;
pub mod state;
pub mod track;

// Re-exports for hosts
pub use cache::AnimCache;
pub use component::AnimComponent;
pub use config::Config;
pub use controller::AnimController;
pub use curve::{AnimCurve, CurvePath, Interpolation};
pub use data::AnimData;
pub use error::AnimError;
pub use graph::{AnimTransition, BlendChild, LayerGraph, StateDesc, ANY_STATE};
pub use layer::{AnimComponentLayer, BlendType};
pub use mask::{AnimMask, MaskEntry};
pub use notify::{Notification, Notifications};
pub use parameters::{AnimParam, AnimParameters, Condition, ConditionValue, Predicate};
pub use pose::{Accumulator, Pose};
pub use snapshot::AnimSnapshot;
pub use state::{AnimNode, AnimState};
pub use track::{AnimEvent, AnimTrack};

pub type Result<T> = core::result::Result<T, AnimError>;
