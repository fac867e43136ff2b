//! Per-layer state machine: active/previous states, cross-fades, automatic
//! transitions and the layer's local pose.
//!
//! Lifecycle:
//! - Idle: no active state. `play()` enters the default state.
//! - Playing: one active state advancing with `update(dt)`.
//! - Transitioning: a previous state fades out over `transition_duration`
//!   while the active state fades in. Both keep advancing.
//! - `pause()` suspends time in either of the last two; `reset()` returns to
//!   Idle while keeping parameter values.

use std::collections::VecDeque;
use std::sync::Arc;

use hashbrown::{HashMap, HashSet};
use log::{debug, warn};

use crate::config::Config;
use crate::error::AnimError;
use crate::graph::{split_node_path, AnimTransition, LayerGraph, ANY_STATE};
use crate::mask::AnimMask;
use crate::notify::{Notification, Notifications};
use crate::parameters::{AnimParam, AnimParameters};
use crate::pose::Pose;
use crate::state::AnimState;
use crate::track::AnimTrack;

/// Whether normalized position `exit` was passed while moving from `before`
/// to `after` (unwrapped). Exit times below 1 repeat every loop.
fn exit_crossed(before: f32, after: f32, exit: f32) -> bool {
    if exit < 1.0 {
        (before - exit).floor() < (after - exit).floor()
    } else {
        before < exit && exit <= after
    }
}

#[derive(Clone, Debug)]
pub struct AnimController {
    layer: String,
    config: Config,
    states: Vec<AnimState>,
    index: HashMap<String, usize>,
    transitions: Vec<AnimTransition>,
    default_state: usize,
    parameters: AnimParameters,
    mask: Option<AnimMask>,
    active: Option<usize>,
    previous: Option<usize>,
    transition_duration: f32,
    transition_progress: f32,
    playing: bool,
    channels: Vec<String>,
    notifications: Notifications,
}

impl AnimController {
    pub fn new(graph: &LayerGraph, config: Config) -> Result<Self, AnimError> {
        graph.validate()?;

        let mut states = Vec::with_capacity(graph.states.len());
        let mut index = HashMap::with_capacity(graph.states.len());
        for desc in &graph.states {
            let speed = desc.speed.unwrap_or(config.default_speed);
            let looping = desc.looping.unwrap_or(config.default_loop);
            let state = match &desc.blend_tree {
                Some(children) => AnimState::blend_tree(
                    desc.name.clone(),
                    speed,
                    looping,
                    children.iter().map(|c| (c.name.clone(), c.weight)),
                ),
                None => AnimState::single(desc.name.clone(), speed, looping),
            };
            index.insert(desc.name.clone(), states.len());
            states.push(state);
        }

        let default_state = graph
            .default_state
            .as_deref()
            .and_then(|n| index.get(n).copied())
            .unwrap_or(0);

        let mut parameters = AnimParameters::new();
        for (name, value) in &graph.parameters {
            parameters.set(name.clone(), *value);
        }

        Ok(Self {
            layer: graph.name.clone(),
            notifications: Notifications::new(config.max_notifications),
            config,
            states,
            index,
            transitions: graph.transitions.clone(),
            default_state,
            parameters,
            mask: None,
            active: None,
            previous: None,
            transition_duration: 0.0,
            transition_progress: 0.0,
            playing: false,
            channels: Vec::new(),
        })
    }

    fn usage_error(&self, err: AnimError) -> AnimError {
        warn!("layer '{}': {}", self.layer, err);
        err
    }

    fn unknown_state(&self, name: &str) -> AnimError {
        self.usage_error(AnimError::UnknownState {
            layer: self.layer.clone(),
            name: name.to_string(),
        })
    }

    pub(crate) fn notify(&mut self, n: Notification) {
        self.notifications.push(n);
    }

    fn state_name(&self, idx: Option<usize>) -> Option<String> {
        idx.map(|i| self.states[i].name().to_string())
    }

    // --- observables ---

    #[inline]
    pub fn name(&self) -> &str {
        &self.layer
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[inline]
    pub fn states(&self) -> &[AnimState] {
        &self.states
    }

    pub fn state(&self, name: &str) -> Option<&AnimState> {
        self.index.get(name).map(|&i| &self.states[i])
    }

    #[inline]
    pub fn transitions(&self) -> &[AnimTransition] {
        &self.transitions
    }

    pub fn default_state(&self) -> &str {
        self.states[self.default_state].name()
    }

    pub fn active_state(&self) -> Option<&str> {
        self.active.map(|i| self.states[i].name())
    }

    pub fn previous_state(&self) -> Option<&str> {
        self.previous.map(|i| self.states[i].name())
    }

    pub fn active_state_progress(&self) -> f32 {
        self.active.map_or(0.0, |i| self.states[i].progress())
    }

    pub fn active_state_duration(&self) -> f32 {
        self.active.map_or(0.0, |i| self.states[i].duration())
    }

    pub fn active_state_current_time(&self) -> f32 {
        self.active.map_or(0.0, |i| self.states[i].time())
    }

    /// Seek the active state. Ignored while idle.
    pub fn set_active_state_current_time(&mut self, time: f32) {
        if let Some(i) = self.active {
            self.states[i].set_time(time);
            self.states[i].sample();
        }
    }

    /// A previous state is still fading out.
    #[inline]
    pub fn transitioning(&self) -> bool {
        self.previous.is_some()
    }

    #[inline]
    pub fn transition_progress(&self) -> f32 {
        self.transition_progress
    }

    #[inline]
    pub fn transition_duration(&self) -> f32 {
        self.transition_duration
    }

    #[inline]
    pub fn playing(&self) -> bool {
        self.playing
    }

    /// Every state reachable from the default (or active) state has all of
    /// its leaves bound.
    pub fn playable(&self) -> bool {
        let mut seen = vec![false; self.states.len()];
        let mut queue = VecDeque::new();
        seen[self.default_state] = true;
        queue.push_back(self.default_state);
        if let Some(a) = self.active {
            if !seen[a] {
                seen[a] = true;
                queue.push_back(a);
            }
        }
        while let Some(i) = queue.pop_front() {
            if !self.states[i].playable() {
                return false;
            }
            let name = self.states[i].name();
            for t in &self.transitions {
                if t.from != name && t.from != ANY_STATE {
                    continue;
                }
                if let Some(&j) = self.index.get(&t.to) {
                    if !seen[j] {
                        seen[j] = true;
                        queue.push_back(j);
                    }
                }
            }
        }
        true
    }

    #[inline]
    pub fn mask(&self) -> Option<&AnimMask> {
        self.mask.as_ref()
    }

    /// Channel keys this layer may drive, as of the last `rebind`.
    #[inline]
    pub fn channels(&self) -> &[String] {
        &self.channels
    }

    // --- parameters ---

    #[inline]
    pub fn parameters(&self) -> &AnimParameters {
        &self.parameters
    }

    pub fn parameter(&self, name: &str) -> Option<AnimParam> {
        self.parameters.get(name)
    }

    pub fn set_parameter(&mut self, name: &str, value: AnimParam) {
        self.parameters.set(name, value);
    }

    pub fn set_float(&mut self, name: &str, value: f32) {
        self.set_parameter(name, AnimParam::Float(value));
    }

    pub fn set_integer(&mut self, name: &str, value: i32) {
        self.set_parameter(name, AnimParam::Integer(value));
    }

    pub fn set_boolean(&mut self, name: &str, value: bool) {
        self.set_parameter(name, AnimParam::Boolean(value));
    }

    pub fn set_trigger(&mut self, name: &str) {
        self.set_parameter(name, AnimParam::Trigger(true));
    }

    // --- playback ---

    fn enter(&mut self, idx: usize, offset: Option<f32>) {
        let state = &mut self.states[idx];
        state.reset();
        if let Some(o) = offset {
            state.set_progress(o);
        }
        self.active = Some(idx);
    }

    /// Start or resume playback, optionally switching to `name`. Cancels an
    /// in-flight fade.
    pub fn play(&mut self, name: Option<&str>) -> Result<(), AnimError> {
        let target = match name {
            Some(n) => match self.index.get(n) {
                Some(&i) => Some(i),
                None => return Err(self.unknown_state(n)),
            },
            None => None,
        };
        if !self.playable() {
            return Err(self.usage_error(AnimError::NotPlayable {
                layer: self.layer.clone(),
            }));
        }

        let target = target.or(match self.active {
            Some(_) => None,
            None => Some(self.default_state),
        });
        if let Some(idx) = target {
            if self.active != Some(idx) {
                let from = self.state_name(self.active);
                self.enter(idx, None);
                let to = self.states[idx].name().to_string();
                debug!("layer '{}': play {:?} -> {}", self.layer, from, to);
                self.notify(Notification::StateChanged {
                    layer: self.layer.clone(),
                    from,
                    to,
                });
            }
        }
        if self.previous.take().is_some() {
            debug!("layer '{}': fade cancelled by play", self.layer);
        }
        if let Some(a) = self.active {
            if self.finished(a) {
                self.states[a].reset();
            }
        }
        self.transition_progress = 0.0;
        self.playing = true;
        self.sample();
        Ok(())
    }

    /// Suspend time advancement, keeping position and any fade.
    pub fn pause(&mut self) {
        self.playing = false;
    }

    /// Back to idle. Parameters are kept; pending triggers are cleared.
    pub fn reset(&mut self) {
        self.playing = false;
        self.active = None;
        self.previous = None;
        self.transition_progress = 0.0;
        self.transition_duration = 0.0;
        for state in &mut self.states {
            state.reset();
        }
        self.parameters.clear_triggers();
        debug!("layer '{}': reset", self.layer);
    }

    /// Advance by `dt` seconds. No-op unless playing with an active state.
    pub fn update(&mut self, dt: f32) {
        if !self.playing {
            return;
        }
        let Some(active) = self.active else {
            return;
        };
        if !dt.is_finite() {
            warn!("layer '{}': ignoring non-finite dt {}", self.layer, dt);
            return;
        }

        let (before, after) = self.states[active].advance(dt);
        if let Some(prev) = self.previous {
            self.states[prev].advance(dt);
            let step = if self.transition_duration > 0.0 {
                dt / self.transition_duration
            } else {
                1.0
            };
            self.transition_progress = (self.transition_progress + step).max(0.0);
            if self.transition_progress >= 1.0 {
                self.complete_transition();
            }
        }
        if self.previous.is_none() {
            let finished = self.finished(active);
            // Reaching the last frame counts as crossing it, even when the
            // end was reached during a fade.
            let before = if finished {
                before.min(after - f32::EPSILON)
            } else {
                before
            };
            if let Some(i) = self.pick_transition(active, before, after) {
                let t = self.transitions[i].clone();
                if let Err(err) = self.update_state_from_transition(&t) {
                    warn!("layer '{}': automatic transition failed: {}", self.layer, err);
                }
            } else if finished {
                debug!(
                    "layer '{}': '{}' reached its end",
                    self.layer,
                    self.states[active].name()
                );
                self.playing = false;
            }
        }
        self.sample();
    }

    /// A non-looping state clamped at its last frame.
    fn finished(&self, idx: usize) -> bool {
        let state = &self.states[idx];
        !state.looping() && state.duration() > 0.0 && state.time() >= state.duration()
    }

    fn pick_transition(&self, active: usize, before: f32, after: f32) -> Option<usize> {
        let name = self.states[active].name();
        self.transitions
            .iter()
            .enumerate()
            .filter(|(_, t)| t.is_automatic())
            .filter(|(_, t)| t.from == name || (t.from == ANY_STATE && t.to != name))
            .filter(|(_, t)| t.exit_time.map_or(true, |x| exit_crossed(before, after, x)))
            .filter(|(_, t)| t.conditions.iter().all(|c| c.holds(&self.parameters)))
            .min_by_key(|(i, t)| (t.priority.unwrap_or(i32::MAX), *i))
            .map(|(i, _)| i)
    }

    fn complete_transition(&mut self) {
        let prev = self.previous.take();
        let from = self.state_name(prev);
        self.transition_progress = 0.0;
        self.transition_duration = 0.0;
        if let Some(to) = self.state_name(self.active) {
            debug!("layer '{}': transition {:?} -> {} complete", self.layer, from, to);
            self.notify(Notification::TransitionComplete {
                layer: self.layer.clone(),
                from,
                to,
            });
        }
    }

    /// Cross-fade to the state named `to`, using the declared edge from the
    /// active state (or `ANY`) when one exists. `duration` and `offset`
    /// override the edge.
    pub fn transition(
        &mut self,
        to: &str,
        duration: Option<f32>,
        offset: Option<f32>,
    ) -> Result<(), AnimError> {
        if !self.index.contains_key(to) {
            return Err(self.unknown_state(to));
        }
        let from = self.active_state().unwrap_or(ANY_STATE).to_string();
        let declared = self
            .transitions
            .iter()
            .find(|t| t.to == to && t.from == from)
            .or_else(|| {
                self.transitions
                    .iter()
                    .find(|t| t.to == to && t.from == ANY_STATE)
            })
            .cloned();
        let mut t = declared.unwrap_or_else(|| {
            AnimTransition::new(from, to, self.config.default_transition_duration)
        });
        if let Some(d) = duration {
            t.duration = d.max(0.0);
        }
        if let Some(o) = offset {
            t.offset = Some(o.clamp(0.0, 1.0));
        }
        self.update_state_from_transition(&t)
    }

    /// Begin the fade described by `t`: the active state becomes previous,
    /// the destination is restarted at `offset` and becomes active.
    pub fn update_state_from_transition(&mut self, t: &AnimTransition) -> Result<(), AnimError> {
        let Some(&target) = self.index.get(&t.to) else {
            return Err(self.unknown_state(&t.to));
        };
        for c in &t.conditions {
            self.parameters.consume_trigger(&c.parameter);
        }

        let from = self.active;
        let from_name = self.state_name(from);
        let to_name = self.states[target].name().to_string();
        let fade = t.duration > 0.0 && from.is_some_and(|a| a != target);

        self.previous = if fade { from } else { None };
        self.transition_duration = if fade { t.duration } else { 0.0 };
        self.transition_progress = 0.0;
        self.enter(target, t.offset);

        debug!(
            "layer '{}': transition {:?} -> {} over {}s",
            self.layer, from_name, to_name, self.transition_duration
        );
        if from != Some(target) {
            self.notify(Notification::StateChanged {
                layer: self.layer.clone(),
                from: from_name.clone(),
                to: to_name.clone(),
            });
        }
        if !fade {
            self.notify(Notification::TransitionComplete {
                layer: self.layer.clone(),
                from: from_name,
                to: to_name,
            });
        }
        self.sample();
        Ok(())
    }

    // --- bindings ---

    fn unknown_node(&self, path: &str) -> AnimError {
        self.usage_error(AnimError::UnknownNode {
            layer: self.layer.clone(),
            path: path.to_string(),
        })
    }

    /// Bind `track` to the leaf at `path` (`"State"` or `"State.Child"`),
    /// creating the state or blend-tree child when absent.
    pub fn assign_animation(
        &mut self,
        path: &str,
        track: Arc<AnimTrack>,
        speed: Option<f32>,
        looping: Option<bool>,
    ) -> Result<(), AnimError> {
        let (state_name, child) = split_node_path(path);
        if state_name.is_empty() || state_name == ANY_STATE || child == Some("") {
            return Err(self.unknown_node(path));
        }

        let idx = match self.index.get(state_name).copied() {
            Some(i) => {
                if !self.states[i].accepts(child) {
                    return Err(self.unknown_node(path));
                }
                i
            }
            None => {
                let speed = self.config.default_speed;
                let looping = self.config.default_loop;
                let state = match child {
                    Some(_) => AnimState::blend_tree(
                        state_name,
                        speed,
                        looping,
                        std::iter::empty::<(String, f32)>(),
                    ),
                    None => AnimState::single(state_name, speed, looping),
                };
                debug!("layer '{}': created state '{}'", self.layer, state_name);
                self.index.insert(state_name.to_string(), self.states.len());
                self.states.push(state);
                self.states.len() - 1
            }
        };

        let state = &mut self.states[idx];
        if let Some(s) = speed {
            state.set_speed(s);
        }
        state.bind(child, track);
        if let Some(l) = looping {
            state.set_looping(l);
        }
        self.sample();
        self.rebind();
        Ok(())
    }

    /// Unbind the tracks under `node`. Returns true when the active state
    /// lost its last binding needed for playback.
    pub fn remove_node_animations(&mut self, node: &str) -> bool {
        let (state_name, child) = split_node_path(node);
        let Some(&idx) = self.index.get(state_name) else {
            warn!("layer '{}': no node '{}' to unbind", self.layer, node);
            return false;
        };
        let was_playable = self.active.map_or(false, |a| self.states[a].playable());
        if !self.states[idx].unbind(child) {
            return false;
        }
        self.rebind();
        was_playable && self.active.map_or(false, |a| !self.states[a].playable())
    }

    /// Store `mask`. Returns whether it differs from the current one.
    pub fn assign_mask(&mut self, mask: Option<AnimMask>) -> bool {
        if self.mask == mask {
            return false;
        }
        self.mask = mask;
        true
    }

    /// Recompute the driven channel set and signal dependents.
    pub fn rebind(&mut self) {
        let channels = {
            let mask = self.mask.as_ref();
            let mut seen = HashSet::new();
            let mut channels = Vec::new();
            for state in &self.states {
                for key in state.channels(mask) {
                    if seen.insert(key) {
                        channels.push(key.to_string());
                    }
                }
            }
            channels
        };
        debug!("layer '{}': rebind, {} channels", self.layer, channels.len());
        self.channels = channels;
        self.notify(Notification::RebindRequired {
            layer: self.layer.clone(),
        });
    }

    // --- output ---

    fn sample(&mut self) {
        if let Some(a) = self.active {
            self.states[a].sample();
        }
        if let Some(p) = self.previous {
            self.states[p].sample();
        }
    }

    /// Mask-filtered layer pose. While fading, channels present in both
    /// states are lerped by `transition_progress`.
    pub fn pose(&self) -> Pose {
        let mask = self.mask.as_ref();
        match (self.active, self.previous) {
            (None, _) => Pose::new(),
            (Some(a), None) => self.states[a].pose(mask),
            (Some(a), Some(p)) => {
                let mut out = self.states[p].pose(mask);
                out.blend_overwrite(
                    &self.states[a].pose(mask),
                    self.transition_progress.clamp(0.0, 1.0),
                );
                out
            }
        }
    }

    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        self.notifications.drain()
    }
}
