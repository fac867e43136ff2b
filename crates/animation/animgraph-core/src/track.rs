//! Shared, read-only animation tracks.
//!
//! A track owns pools of time inputs and value outputs plus the curves that
//! pair them. It carries no evaluation state: every binding samples it
//! through its own [`AnimSnapshot`], so one `Arc<AnimTrack>` can be shared by
//! any number of states and entities.

use serde::{Deserialize, Serialize};

use crate::cache::AnimCache;
use crate::curve::AnimCurve;
use crate::data::AnimData;
use crate::error::AnimError;
use crate::snapshot::AnimSnapshot;

/// Named marker on a track's timeline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnimEvent {
    pub time: f32,
    pub name: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawAnimTrack")]
pub struct AnimTrack {
    name: String,
    duration: f32,
    inputs: Vec<AnimData>,
    outputs: Vec<AnimData>,
    curves: Vec<AnimCurve>,
    events: Vec<AnimEvent>,
    #[serde(skip_serializing)]
    channel_keys: Vec<String>,
}

#[derive(Deserialize)]
struct RawAnimTrack {
    name: String,
    duration: f32,
    inputs: Vec<AnimData>,
    outputs: Vec<AnimData>,
    curves: Vec<AnimCurve>,
    #[serde(default)]
    events: Vec<AnimEvent>,
}

impl TryFrom<RawAnimTrack> for AnimTrack {
    type Error = AnimError;

    fn try_from(raw: RawAnimTrack) -> Result<Self, Self::Error> {
        Ok(AnimTrack::new(raw.name, raw.duration, raw.inputs, raw.outputs, raw.curves)?
            .with_events(raw.events))
    }
}

impl AnimTrack {
    /// Build and validate a track. A curve that points outside the pools is
    /// rejected here so that evaluation never sees a corrupted index.
    pub fn new(
        name: impl Into<String>,
        duration: f32,
        inputs: Vec<AnimData>,
        outputs: Vec<AnimData>,
        curves: Vec<AnimCurve>,
    ) -> Result<Self, AnimError> {
        let name = name.into();

        let mut last_time = 0.0f32;
        for (i, input) in inputs.iter().enumerate() {
            if input.is_empty() {
                return Err(AnimError::EmptyInput {
                    track: name,
                    input: i,
                });
            }
            let sorted = input.components() == 1
                && input.data().iter().all(|t| t.is_finite())
                && input.data().windows(2).all(|w| w[0] <= w[1]);
            if !sorted {
                return Err(AnimError::UnsortedInput {
                    track: name,
                    input: i,
                });
            }
            if let Some(last) = input.last() {
                last_time = last_time.max(last);
            }
        }

        for (c, curve) in curves.iter().enumerate() {
            if curve.input >= inputs.len() {
                return Err(AnimError::CurveIndexOutOfRange {
                    track: name,
                    curve: c,
                    pool: "input".into(),
                    index: curve.input,
                    len: inputs.len(),
                });
            }
            if curve.output >= outputs.len() {
                return Err(AnimError::CurveIndexOutOfRange {
                    track: name,
                    curve: c,
                    pool: "output".into(),
                    index: curve.output,
                    len: outputs.len(),
                });
            }
            let expected = inputs[curve.input].count() * curve.interpolation.tuples_per_key();
            let actual = outputs[curve.output].count();
            if expected != actual {
                return Err(AnimError::ArityMismatch {
                    track: name,
                    curve: c,
                    expected,
                    actual,
                });
            }
        }

        if !duration.is_finite() || duration < last_time {
            return Err(AnimError::DurationTooShort {
                track: name,
                duration,
                last_time,
            });
        }

        let channel_keys = curves.iter().map(|c| c.path.key()).collect();
        Ok(Self {
            name,
            duration,
            inputs,
            outputs,
            curves,
            events: Vec::new(),
            channel_keys,
        })
    }

    /// Attach timeline events; they are kept sorted by time.
    pub fn with_events(mut self, mut events: Vec<AnimEvent>) -> Self {
        events.sort_by(|a, b| a.time.total_cmp(&b.time));
        self.events = events;
        self
    }

    pub fn from_json(s: &str) -> Result<Self, AnimError> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn to_json(&self) -> Result<String, AnimError> {
        Ok(serde_json::to_string(self)?)
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn duration(&self) -> f32 {
        self.duration
    }

    #[inline]
    pub fn inputs(&self) -> &[AnimData] {
        &self.inputs
    }

    #[inline]
    pub fn outputs(&self) -> &[AnimData] {
        &self.outputs
    }

    #[inline]
    pub fn curves(&self) -> &[AnimCurve] {
        &self.curves
    }

    #[inline]
    pub fn events(&self) -> &[AnimEvent] {
        &self.events
    }

    /// Pose channel key of each curve, in curve order.
    #[inline]
    pub fn channel_keys(&self) -> &[String] {
        &self.channel_keys
    }

    /// Events with `from < time <= to`.
    pub fn events_in_range(&self, from: f32, to: f32) -> impl Iterator<Item = &AnimEvent> {
        let start = self.events.partition_point(|e| e.time <= from);
        self.events[start..].iter().take_while(move |e| e.time <= to)
    }

    /// Sample every curve at `time` into `snapshot`. `time` must already be
    /// normalized into `[0, duration]` by the caller's loop policy.
    pub fn eval(&self, time: f32, snapshot: &mut AnimSnapshot) -> Result<(), AnimError> {
        if !snapshot.fits(self) {
            return Err(AnimError::SnapshotMismatch {
                track: self.name.clone(),
            });
        }
        let (caches, results) = snapshot.buffers_mut(time);
        self.eval_into(time, caches, results);
        Ok(())
    }

    /// Sampling kernel. Callers guarantee one cache per input and one result
    /// buffer per curve, sized to the curve's output components.
    pub(crate) fn eval_into(&self, time: f32, caches: &mut [AnimCache], results: &mut [Vec<f32>]) {
        for (cache, input) in caches.iter_mut().zip(&self.inputs) {
            cache.update(time, input.data());
        }
        for (curve, result) in self.curves.iter().zip(results.iter_mut()) {
            caches[curve.input].eval(result, curve.interpolation, &self.outputs[curve.output]);
        }
    }
}
