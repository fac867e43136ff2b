//! Curves bind one time input to one value output of a track.

use serde::{Deserialize, Serialize};

/// How values between two keys are produced.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interpolation {
    /// Hold the left key.
    Step,
    #[default]
    Linear,
    /// Hermite with `[in_tangent, value, out_tangent]` stored per key.
    CubicSpline,
}

impl Interpolation {
    /// Output tuples stored per input key.
    #[inline]
    pub fn tuples_per_key(self) -> usize {
        match self {
            Self::Step | Self::Linear => 1,
            Self::CubicSpline => 3,
        }
    }

    #[inline]
    pub fn name(self) -> &'static str {
        match self {
            Self::Step => "step",
            Self::Linear => "linear",
            Self::CubicSpline => "cubic_spline",
        }
    }
}

/// Target of a curve: a `/`-separated skeleton node path plus a property.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CurvePath {
    pub node: String,
    pub property: String,
}

impl CurvePath {
    pub fn new(node: impl Into<String>, property: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            property: property.into(),
        }
    }

    /// Channel key used by poses: `"<node>.<property>"`.
    pub fn key(&self) -> String {
        format!("{}.{}", self.node, self.property)
    }
}

/// One animated channel of a track.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnimCurve {
    pub path: CurvePath,
    /// Index into the track's input (time) pool.
    pub input: usize,
    /// Index into the track's output (value) pool.
    pub output: usize,
    #[serde(default)]
    pub interpolation: Interpolation,
}

impl AnimCurve {
    pub fn new(path: CurvePath, input: usize, output: usize, interpolation: Interpolation) -> Self {
        Self {
            path,
            input,
            output,
            interpolation,
        }
    }
}
