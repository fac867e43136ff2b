//! Per-binding evaluation state for one shared track.

use std::sync::Arc;

use crate::cache::AnimCache;
use crate::track::AnimTrack;

/// Mutable sampling state: one cache per track input and one result buffer
/// per curve. Owned by exactly one binding; never shared.
#[derive(Clone, Debug)]
pub struct AnimSnapshot {
    track: Arc<AnimTrack>,
    time: f32,
    caches: Vec<AnimCache>,
    results: Vec<Vec<f32>>,
}

impl AnimSnapshot {
    /// Pre-size caches and result buffers to the track's cardinalities.
    pub fn new(track: Arc<AnimTrack>) -> Self {
        let caches = vec![AnimCache::new(); track.inputs().len()];
        let results = track
            .curves()
            .iter()
            .map(|c| vec![0.0; track.outputs()[c.output].components()])
            .collect();
        Self {
            track,
            time: 0.0,
            caches,
            results,
        }
    }

    /// Sample the bound track at `time`. Any call order is legal; results
    /// always reflect the most recent request.
    pub fn eval(&mut self, time: f32) {
        let Self {
            track,
            time: last,
            caches,
            results,
        } = self;
        track.eval_into(time, caches, results);
        *last = time;
    }

    #[inline]
    pub fn track(&self) -> &Arc<AnimTrack> {
        &self.track
    }

    /// Time of the most recent evaluation.
    #[inline]
    pub fn time(&self) -> f32 {
        self.time
    }

    #[inline]
    pub fn results(&self) -> &[Vec<f32>] {
        &self.results
    }

    /// Result buffer of curve `index`.
    #[inline]
    pub fn result(&self, index: usize) -> Option<&[f32]> {
        self.results.get(index).map(Vec::as_slice)
    }

    /// `(channel key, sampled values)` pairs in curve order.
    pub fn channels(&self) -> impl Iterator<Item = (&str, &[f32])> {
        self.track
            .channel_keys()
            .iter()
            .map(String::as_str)
            .zip(self.results.iter().map(Vec::as_slice))
    }

    /// True when this snapshot was built for exactly `track`.
    pub(crate) fn fits(&self, track: &AnimTrack) -> bool {
        std::ptr::eq(Arc::as_ptr(&self.track), track)
    }

    /// Record `time` and hand out the buffers for an eval of the bound track.
    pub(crate) fn buffers_mut(&mut self, time: f32) -> (&mut [AnimCache], &mut [Vec<f32>]) {
        self.time = time;
        (&mut self.caches, &mut self.results)
    }
}
