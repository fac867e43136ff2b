//! A weighted, masked layer wrapping one controller.

use std::sync::Arc;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::controller::AnimController;
use crate::error::AnimError;
use crate::graph::LayerGraph;
use crate::mask::AnimMask;
use crate::notify::Notification;
use crate::parameters::AnimParam;
use crate::pose::Pose;
use crate::track::AnimTrack;

/// How a layer combines with the layers below it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlendType {
    /// `lerp(base, layer, weight)`
    #[default]
    Overwrite,
    /// `base + layer * weight`
    Add,
}

#[derive(Clone, Debug)]
pub struct AnimComponentLayer {
    controller: AnimController,
    weight: f32,
    blend_type: BlendType,
    activate: bool,
    /// Cached cross-layer output is stale.
    dirty: bool,
}

impl AnimComponentLayer {
    pub fn new(graph: &LayerGraph, config: Config) -> Result<Self, AnimError> {
        let activate = config.activate;
        Ok(Self {
            controller: AnimController::new(graph, config)?,
            weight: 1.0,
            blend_type: BlendType::Overwrite,
            activate,
            dirty: true,
        })
    }

    #[inline]
    pub fn name(&self) -> &str {
        self.controller.name()
    }

    #[inline]
    pub fn controller(&self) -> &AnimController {
        &self.controller
    }

    #[inline]
    pub fn controller_mut(&mut self) -> &mut AnimController {
        self.dirty = true;
        &mut self.controller
    }

    fn rebind_required(&mut self) {
        self.dirty = true;
        self.controller.rebind();
    }

    // --- observable fields ---

    #[inline]
    pub fn weight(&self) -> f32 {
        self.weight
    }

    /// Returns whether the weight changed.
    pub fn set_weight(&mut self, weight: f32) -> bool {
        if self.weight == weight {
            return false;
        }
        debug!("layer '{}': weight {} -> {}", self.name(), self.weight, weight);
        self.weight = weight;
        self.rebind_required();
        true
    }

    #[inline]
    pub fn blend_type(&self) -> BlendType {
        self.blend_type
    }

    /// Returns whether the blend type changed.
    pub fn set_blend_type(&mut self, blend_type: BlendType) -> bool {
        if self.blend_type == blend_type {
            return false;
        }
        self.blend_type = blend_type;
        self.rebind_required();
        true
    }

    #[inline]
    pub fn mask(&self) -> Option<&AnimMask> {
        self.controller.mask()
    }

    /// Store `mask`; rebinds once when the channel set changed.
    pub fn assign_mask(&mut self, mask: Option<AnimMask>) -> bool {
        if !self.controller.assign_mask(mask) {
            return false;
        }
        let layer = self.name().to_string();
        self.controller.notify(Notification::MaskChanged { layer });
        self.rebind_required();
        true
    }

    #[inline]
    pub fn activate(&self) -> bool {
        self.activate
    }

    pub fn set_activate(&mut self, activate: bool) {
        self.activate = activate;
    }

    #[inline]
    pub fn playing(&self) -> bool {
        self.controller.playing()
    }

    #[inline]
    pub fn playable(&self) -> bool {
        self.controller.playable()
    }

    /// Take and clear the stale-output flag.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    // --- bindings ---

    /// Bind a track, then start playback if the layer activates on bind and
    /// has just become playable.
    pub fn assign_animation(
        &mut self,
        path: &str,
        track: Arc<AnimTrack>,
        speed: Option<f32>,
        looping: Option<bool>,
    ) -> Result<(), AnimError> {
        self.controller.assign_animation(path, track, speed, looping)?;
        self.dirty = true;
        if self.activate && !self.controller.playing() && self.controller.playable() {
            self.controller.play(None)?;
        }
        Ok(())
    }

    /// Like `assign_animation`, for a track held in an untyped JSON value.
    /// A value that does not describe a valid track is rejected without
    /// touching existing bindings.
    pub fn assign_animation_value(
        &mut self,
        path: &str,
        value: &serde_json::Value,
        speed: Option<f32>,
        looping: Option<bool>,
    ) -> Result<(), AnimError> {
        let track = match AnimTrack::deserialize(value) {
            Ok(track) => track,
            Err(err) => {
                let err = AnimError::NotATrack {
                    path: path.to_string(),
                    reason: err.to_string(),
                };
                warn!("layer '{}': {}", self.name(), err);
                return Err(err);
            }
        };
        self.assign_animation(path, Arc::new(track), speed, looping)
    }

    /// Unbind tracks under `node`; pauses when the active state can no
    /// longer play.
    pub fn remove_node_animations(&mut self, node: &str) -> bool {
        let stop = self.controller.remove_node_animations(node);
        if stop {
            self.controller.pause();
        }
        self.dirty = true;
        stop
    }

    // --- forwarded playback ---

    pub fn play(&mut self, name: Option<&str>) -> Result<(), AnimError> {
        self.dirty = true;
        self.controller.play(name)
    }

    pub fn pause(&mut self) {
        self.controller.pause();
    }

    pub fn reset(&mut self) {
        self.dirty = true;
        self.controller.reset();
    }

    pub fn rebind(&mut self) {
        self.rebind_required();
    }

    pub fn update(&mut self, dt: f32) {
        if self.controller.playing() {
            self.dirty = true;
        }
        self.controller.update(dt);
    }

    pub fn transition(
        &mut self,
        to: &str,
        duration: Option<f32>,
        offset: Option<f32>,
    ) -> Result<(), AnimError> {
        self.controller.transition(to, duration, offset)?;
        self.dirty = true;
        Ok(())
    }

    pub fn set_parameter(&mut self, name: &str, value: AnimParam) {
        self.controller.set_parameter(name, value);
    }

    #[inline]
    pub fn pose(&self) -> Pose {
        self.controller.pose()
    }

    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        self.controller.drain_notifications()
    }
}
