//! A state of a layer graph: one or more leaves, each sampling its own
//! snapshot of a shared track.

use std::sync::Arc;

use crate::mask::AnimMask;
use crate::pose::{Accumulator, Pose};
use crate::snapshot::AnimSnapshot;
use crate::track::AnimTrack;

/// Leaf of a state. A plain state has exactly one, named after the state.
#[derive(Clone, Debug)]
pub struct AnimNode {
    name: String,
    weight: f32,
    snapshot: Option<AnimSnapshot>,
}

impl AnimNode {
    pub fn new(name: impl Into<String>, weight: f32) -> Self {
        Self {
            name: name.into(),
            weight,
            snapshot: None,
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn weight(&self) -> f32 {
        self.weight
    }

    #[inline]
    pub fn track(&self) -> Option<&Arc<AnimTrack>> {
        self.snapshot.as_ref().map(AnimSnapshot::track)
    }

    #[inline]
    pub fn snapshot(&self) -> Option<&AnimSnapshot> {
        self.snapshot.as_ref()
    }

    #[inline]
    pub fn is_bound(&self) -> bool {
        self.snapshot.is_some()
    }
}

/// Playback position and bindings of one state.
#[derive(Clone, Debug)]
pub struct AnimState {
    name: String,
    speed: f32,
    looping: bool,
    /// Seconds, kept in `[0, duration]` by the loop policy.
    time: f32,
    blend_tree: bool,
    nodes: Vec<AnimNode>,
}

impl AnimState {
    /// Plain state with a single leaf.
    pub fn single(name: impl Into<String>, speed: f32, looping: bool) -> Self {
        let name = name.into();
        Self {
            nodes: vec![AnimNode::new(name.clone(), 1.0)],
            name,
            speed,
            looping,
            time: 0.0,
            blend_tree: false,
        }
    }

    /// Blend-tree state with one leaf per `(child, weight)`.
    pub fn blend_tree<I, S>(name: impl Into<String>, speed: f32, looping: bool, children: I) -> Self
    where
        I: IntoIterator<Item = (S, f32)>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            speed,
            looping,
            time: 0.0,
            blend_tree: true,
            nodes: children
                .into_iter()
                .map(|(n, w)| AnimNode::new(n, w))
                .collect(),
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn set_speed(&mut self, speed: f32) {
        self.speed = speed;
    }

    #[inline]
    pub fn looping(&self) -> bool {
        self.looping
    }

    pub fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
        self.time = self.normalize(self.time);
    }

    #[inline]
    pub fn is_blend_tree(&self) -> bool {
        self.blend_tree
    }

    #[inline]
    pub fn nodes(&self) -> &[AnimNode] {
        &self.nodes
    }

    #[inline]
    pub fn time(&self) -> f32 {
        self.time
    }

    /// Longest bound track; 0 while nothing is bound.
    pub fn duration(&self) -> f32 {
        self.nodes
            .iter()
            .filter_map(AnimNode::track)
            .map(|t| t.duration())
            .fold(0.0, f32::max)
    }

    /// Every leaf has a track.
    pub fn playable(&self) -> bool {
        !self.nodes.is_empty() && self.nodes.iter().all(AnimNode::is_bound)
    }

    /// Normalized position in `[0, 1]`.
    pub fn progress(&self) -> f32 {
        let d = self.duration();
        if d > 0.0 {
            (self.time / d).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    fn normalize(&self, time: f32) -> f32 {
        let d = self.duration();
        if !(d > 0.0) || !time.is_finite() {
            return 0.0;
        }
        if self.looping {
            let t = time.rem_euclid(d);
            // rem_euclid can round up to `d` for tiny negative inputs.
            if t >= d {
                0.0
            } else {
                t
            }
        } else {
            time.clamp(0.0, d)
        }
    }

    /// Advance by `dt * speed` under the loop policy. Returns the normalized
    /// position before the step and the unwrapped normalized position after
    /// it, for exit-time crossing checks.
    pub fn advance(&mut self, dt: f32) -> (f32, f32) {
        let d = self.duration();
        if !(d > 0.0) {
            return (0.0, 0.0);
        }
        let before = self.time / d;
        let raw = self.time + dt * self.speed;
        let after = if self.looping {
            raw / d
        } else {
            raw.clamp(0.0, d) / d
        };
        self.time = self.normalize(raw);
        (before, after)
    }

    /// Seek to `time` seconds.
    pub fn set_time(&mut self, time: f32) {
        self.time = self.normalize(time);
    }

    /// Seek to a normalized position.
    pub fn set_progress(&mut self, progress: f32) {
        self.set_time(progress * self.duration());
    }

    pub fn reset(&mut self) {
        self.time = 0.0;
    }

    /// Evaluate every bound leaf at the current time. Leaves shorter than
    /// the state wrap or hold on their own duration.
    pub fn sample(&mut self) {
        let time = self.time;
        let looping = self.looping;
        for node in &mut self.nodes {
            if let Some(snapshot) = node.snapshot.as_mut() {
                let d = snapshot.track().duration();
                let local = if d > 0.0 && time > d {
                    if looping {
                        time.rem_euclid(d)
                    } else {
                        d
                    }
                } else {
                    time
                };
                snapshot.eval(local);
            }
        }
    }

    /// Find the leaf addressed by `child`: the state itself when `None`,
    /// a blend-tree child otherwise.
    fn node_index(&self, child: Option<&str>) -> Option<usize> {
        match (self.blend_tree, child) {
            (false, None) => Some(0),
            (true, Some(c)) => self.nodes.iter().position(|n| n.name == c),
            _ => None,
        }
    }

    /// Whether `child` addresses a leaf of this state, or could be added
    /// as a new blend-tree child.
    pub fn accepts(&self, child: Option<&str>) -> bool {
        match child {
            None => !self.blend_tree,
            Some(c) => self.blend_tree && !c.is_empty(),
        }
    }

    /// Bind `track` to a leaf. A missing blend-tree child is created with
    /// weight 1. Returns false when `child` cannot address this state.
    pub fn bind(&mut self, child: Option<&str>, track: Arc<AnimTrack>) -> bool {
        if !self.accepts(child) {
            return false;
        }
        let idx = match self.node_index(child) {
            Some(i) => i,
            None => {
                let name = child.unwrap_or(self.name.as_str()).to_string();
                self.nodes.push(AnimNode::new(name, 1.0));
                self.nodes.len() - 1
            }
        };
        self.nodes[idx].snapshot = Some(AnimSnapshot::new(track));
        self.time = self.normalize(self.time);
        true
    }

    /// Drop the binding of one leaf, or of every leaf when `child` is `None`
    /// on a blend tree. Returns whether anything was unbound.
    pub fn unbind(&mut self, child: Option<&str>) -> bool {
        let mut changed = false;
        if self.blend_tree && child.is_none() {
            for node in &mut self.nodes {
                changed |= node.snapshot.take().is_some();
            }
        } else if let Some(i) = self.node_index(child) {
            changed = self.nodes[i].snapshot.take().is_some();
        }
        if changed {
            self.time = self.normalize(self.time);
        }
        changed
    }

    /// Channel keys driven by this state that pass `mask`.
    pub fn channels<'a>(&'a self, mask: Option<&'a AnimMask>) -> impl Iterator<Item = &'a str> + 'a {
        self.nodes
            .iter()
            .filter_map(AnimNode::track)
            .flat_map(|track| track.curves().iter().zip(track.channel_keys()))
            .filter(move |(curve, _)| mask.map_or(true, |m| m.includes(&curve.path.node)))
            .map(|(_, key)| key.as_str())
    }

    /// Blend the leaves' latest samples into a pose. Leaf weights are
    /// normalized over bound leaves; if they sum to zero, bound leaves are
    /// averaged equally.
    pub fn pose(&self, mask: Option<&AnimMask>) -> Pose {
        let total: f32 = self
            .nodes
            .iter()
            .filter(|n| n.is_bound())
            .map(|n| n.weight.max(0.0))
            .sum();
        let equal = !(total > 0.0);
        let mut acc = Accumulator::new();
        for node in &self.nodes {
            let Some(snapshot) = &node.snapshot else {
                continue;
            };
            let w = if equal { 1.0 } else { node.weight.max(0.0) / total };
            let curves = snapshot.track().curves();
            for ((curve, key), value) in curves
                .iter()
                .zip(snapshot.track().channel_keys())
                .zip(snapshot.results())
            {
                if mask.map_or(true, |m| m.includes(&curve.path.node)) {
                    acc.add(key, value, w);
                }
            }
        }
        acc.finalize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::{AnimCurve, CurvePath, Interpolation};
    use crate::data::AnimData;

    fn ramp(node: &str, duration: f32, to: f32) -> Arc<AnimTrack> {
        Arc::new(
            AnimTrack::new(
                "ramp",
                duration,
                vec![AnimData::scalar(vec![0.0, duration])],
                vec![AnimData::scalar(vec![0.0, to])],
                vec![AnimCurve::new(
                    CurvePath::new(node, "x"),
                    0,
                    0,
                    Interpolation::Linear,
                )],
            )
            .unwrap(),
        )
    }

    #[test]
    fn looping_wraps_and_clamping_holds() {
        let mut state = AnimState::single("Walk", 1.0, true);
        state.bind(None, ramp("Root", 2.0, 2.0));
        state.advance(1.5);
        let (before, after) = state.advance(1.0);
        assert_eq!(state.time(), 0.5);
        assert_eq!(before, 0.75);
        assert_eq!(after, 1.25);

        let mut once = AnimState::single("Jump", 1.0, false);
        once.bind(None, ramp("Root", 2.0, 2.0));
        once.advance(3.0);
        assert_eq!(once.time(), 2.0);
        assert_eq!(once.progress(), 1.0);
    }

    #[test]
    fn unbound_state_is_not_playable() {
        let mut state = AnimState::blend_tree("Move", 1.0, true, [("Walk", 1.0), ("Run", 1.0)]);
        assert!(!state.playable());
        assert!(state.bind(Some("Walk"), ramp("Root", 1.0, 1.0)));
        assert!(!state.playable());
        assert!(state.bind(Some("Run"), ramp("Root", 1.0, 3.0)));
        assert!(state.playable());
        assert!(!state.bind(None, ramp("Root", 1.0, 1.0)));
        assert!(state.unbind(Some("Run")));
        assert!(!state.playable());
    }

    #[test]
    fn blend_tree_pose_is_weight_normalized() {
        let mut state = AnimState::blend_tree("Move", 1.0, true, [("Walk", 1.0), ("Run", 3.0)]);
        state.bind(Some("Walk"), ramp("Root", 1.0, 4.0));
        state.bind(Some("Run"), ramp("Root", 1.0, 8.0));
        state.set_time(0.5);
        state.sample();
        let pose = state.pose(None);
        // 0.25 * 2 + 0.75 * 4
        assert!((pose.get("Root.x").unwrap()[0] - 3.5).abs() < 1e-6);
    }

    #[test]
    fn zero_weight_tree_averages_bound_leaves() {
        let mut state = AnimState::blend_tree("Move", 1.0, true, [("Walk", 0.0), ("Run", 0.0)]);
        assert!(state.is_blend_tree());
        assert!(!AnimState::single("Idle", 1.0, true).is_blend_tree());
        state.bind(Some("Walk"), ramp("Root", 1.0, 4.0));
        state.bind(Some("Run"), ramp("Root", 1.0, 8.0));
        state.set_time(0.5);
        state.sample();
        let pose = state.pose(None);
        assert!((pose.get("Root.x").unwrap()[0] - 3.0).abs() < 1e-6);
    }

    #[test]
    fn mask_filters_channels() {
        let mut state = AnimState::single("Idle", 1.0, true);
        state.bind(None, ramp("Root/Arm", 1.0, 1.0));
        let mask = AnimMask::new().with("Root/Leg", true, true);
        assert_eq!(state.channels(Some(&mask)).count(), 0);
        assert_eq!(state.channels(None).collect::<Vec<_>>(), vec!["Root/Arm.x"]);
        state.sample();
        assert!(state.pose(Some(&mask)).is_empty());
    }

    #[test]
    fn shorter_leaf_wraps_on_its_own_duration() {
        let mut state = AnimState::blend_tree("Mix", 1.0, true, [("Long", 1.0), ("Short", 0.0)]);
        state.bind(Some("Long"), ramp("A", 2.0, 2.0));
        state.bind(Some("Short"), ramp("B", 1.0, 1.0));
        state.set_time(1.5);
        state.sample();
        let short = state.nodes()[1].snapshot().unwrap();
        assert_eq!(short.time(), 0.5);
    }
}
