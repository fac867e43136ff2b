//! Per-input bracket cursor.
//!
//! Model:
//! - The bracket `[left, left + 1)` satisfies `times[left] <= time < times[left + 1]`,
//!   clamped so that `time <= first` selects 0 and `time >= last` selects `n - 2`.
//! - Forward queries (time not decreasing) scan from the cached bracket, which
//!   is amortized O(1) during playback. Backward queries re-seek with a binary
//!   search. Both paths select the same bracket for the same time.
//! - The fraction `t` is clamped to `[0, 1]`; a zero-length bracket yields 0.

use crate::curve::Interpolation;
use crate::data::AnimData;
use crate::interp::{hermite_into, lerp_into};

#[derive(Clone, Debug)]
pub struct AnimCache {
    last_time: f32,
    left: usize,
    right: usize,
    /// Bracket length in seconds.
    span: f32,
    t: f32,
    valid: bool,
}

impl Default for AnimCache {
    fn default() -> Self {
        Self {
            last_time: 0.0,
            left: 0,
            right: 0,
            span: 0.0,
            t: 0.0,
            valid: false,
        }
    }
}

/// Cold lookup of the bracket start for `time`.
#[inline]
fn seek(times: &[f32], time: f32) -> usize {
    let n = times.len();
    times.partition_point(|&x| x <= time).clamp(1, n - 1) - 1
}

impl AnimCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Time of the most recent `update`.
    #[inline]
    pub fn time(&self) -> f32 {
        self.last_time
    }

    /// Current bracket `(left, right)` key indices.
    #[inline]
    pub fn bracket(&self) -> (usize, usize) {
        (self.left, self.right)
    }

    /// Normalized position inside the current bracket.
    #[inline]
    pub fn fraction(&self) -> f32 {
        self.t
    }

    /// Reposition the bracket for `time` over the sorted key `times`.
    pub fn update(&mut self, time: f32, times: &[f32]) {
        let n = times.len();
        if n < 2 {
            self.left = 0;
            self.right = 0;
            self.span = 0.0;
            self.t = 0.0;
            self.last_time = time;
            self.valid = n == 1;
            return;
        }

        let last = n - 2;
        let left = if self.valid && time >= self.last_time {
            let mut i = self.left.min(last);
            while i < last && times[i + 1] <= time {
                i += 1;
            }
            i
        } else {
            seek(times, time)
        };

        let t0 = times[left];
        let t1 = times[left + 1];
        let span = t1 - t0;
        let mut t = if span > 0.0 {
            ((time - t0) / span).clamp(0.0, 1.0)
        } else {
            0.0
        };
        if t.is_nan() {
            t = 0.0;
        }

        self.left = left;
        self.right = left + 1;
        self.span = span;
        self.t = t;
        self.last_time = time;
        self.valid = true;
    }

    /// Write the interpolated tuple for the current bracket into `result`.
    /// `result` must hold `output.components()` values.
    pub fn eval(&self, result: &mut [f32], interpolation: Interpolation, output: &AnimData) {
        let per_key = interpolation.tuples_per_key();
        let value = move |key: usize| match interpolation {
            Interpolation::CubicSpline => output.tuple(key * per_key + 1),
            _ => output.tuple(key),
        };

        if self.left == self.right {
            result.copy_from_slice(value(self.left));
            return;
        }

        match interpolation {
            Interpolation::Step => {
                // Only a clamp past the last key reaches t == 1.
                let key = if self.t >= 1.0 { self.right } else { self.left };
                result.copy_from_slice(value(key));
            }
            Interpolation::Linear => {
                lerp_into(result, value(self.left), value(self.right), self.t);
            }
            Interpolation::CubicSpline => {
                let out_tangent = output.tuple(self.left * per_key + 2);
                let in_tangent = output.tuple(self.right * per_key);
                hermite_into(
                    result,
                    value(self.left),
                    out_tangent,
                    value(self.right),
                    in_tangent,
                    self.span,
                    self.t,
                );
            }
        }
    }
}
