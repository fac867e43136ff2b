//! Layer stack of one animated entity.
//!
//! Layers are blended bottom-up in insertion order. The blended pose is
//! cached and rebuilt only after a layer reports a change.

use std::sync::Arc;

use log::{debug, warn};

use crate::config::Config;
use crate::error::AnimError;
use crate::graph::LayerGraph;
use crate::layer::{AnimComponentLayer, BlendType};
use crate::notify::{Notification, Notifications};
use crate::parameters::AnimParam;
use crate::pose::Pose;
use crate::track::AnimTrack;

#[derive(Clone, Debug)]
pub struct AnimComponent {
    config: Config,
    layers: Vec<AnimComponentLayer>,
    notifications: Notifications,
    pose: Pose,
    dirty: bool,
}

impl Default for AnimComponent {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl AnimComponent {
    pub fn new(config: Config) -> Self {
        Self {
            notifications: Notifications::new(config.max_notifications),
            config,
            layers: Vec::new(),
            pose: Pose::new(),
            dirty: true,
        }
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Append a layer on top of the stack. Layer names must be unique.
    pub fn add_layer(&mut self, graph: &LayerGraph) -> Result<&mut AnimComponentLayer, AnimError> {
        if self.find_layer(&graph.name).is_some() {
            return Err(AnimError::InvalidGraph {
                reason: format!("duplicate layer '{}'", graph.name),
            });
        }
        let layer = AnimComponentLayer::new(graph, self.config.clone())?;
        debug!("added layer '{}'", graph.name);
        self.dirty = true;
        self.layers.push(layer);
        let last = self.layers.len() - 1;
        Ok(&mut self.layers[last])
    }

    /// Replace every layer with those described by `graphs`. On error the
    /// current stack is kept.
    pub fn load_state_graph(&mut self, graphs: &[LayerGraph]) -> Result<(), AnimError> {
        let mut next = AnimComponent::new(self.config.clone());
        for graph in graphs {
            next.add_layer(graph)?;
        }
        self.layers = next.layers;
        self.pose.clear();
        self.dirty = true;
        Ok(())
    }

    /// Parse and load `{"layers": [LayerGraph, ...]}` or a bare array.
    pub fn load_state_graph_json(&mut self, s: &str) -> Result<(), AnimError> {
        #[derive(serde::Deserialize)]
        #[serde(untagged)]
        enum Doc {
            Wrapped { layers: Vec<LayerGraph> },
            Bare(Vec<LayerGraph>),
        }
        let graphs = match serde_json::from_str::<Doc>(s)? {
            Doc::Wrapped { layers } => layers,
            Doc::Bare(layers) => layers,
        };
        self.load_state_graph(&graphs)
    }

    #[inline]
    pub fn layers(&self) -> &[AnimComponentLayer] {
        &self.layers
    }

    #[inline]
    pub fn layer(&self, index: usize) -> Option<&AnimComponentLayer> {
        self.layers.get(index)
    }

    pub fn find_layer(&self, name: &str) -> Option<&AnimComponentLayer> {
        self.layers.iter().find(|l| l.name() == name)
    }

    /// Mutable access; the cached pose is rebuilt on the next `pose()`.
    pub fn layer_mut(&mut self, name: &str) -> Option<&mut AnimComponentLayer> {
        let layer = self.layers.iter_mut().find(|l| l.name() == name)?;
        self.dirty = true;
        Some(layer)
    }

    fn target_layer(&mut self, layer: Option<&str>) -> Result<&mut AnimComponentLayer, AnimError> {
        let found = match layer {
            Some(name) => self.layers.iter_mut().find(|l| l.name() == name),
            None => self.layers.first_mut(),
        };
        match found {
            Some(l) => Ok(l),
            None => {
                let err = AnimError::UnknownLayer {
                    name: layer.unwrap_or_default().to_string(),
                };
                warn!("{err}");
                Err(err)
            }
        }
    }

    /// Bind `track` at `path` in `layer` (the bottom layer when `None`).
    pub fn assign_animation(
        &mut self,
        path: &str,
        track: Arc<AnimTrack>,
        layer: Option<&str>,
        speed: Option<f32>,
        looping: Option<bool>,
    ) -> Result<(), AnimError> {
        self.target_layer(layer)?
            .assign_animation(path, track, speed, looping)?;
        self.dirty = true;
        Ok(())
    }

    pub fn assign_animation_value(
        &mut self,
        path: &str,
        value: &serde_json::Value,
        layer: Option<&str>,
        speed: Option<f32>,
        looping: Option<bool>,
    ) -> Result<(), AnimError> {
        self.target_layer(layer)?
            .assign_animation_value(path, value, speed, looping)?;
        self.dirty = true;
        Ok(())
    }

    /// Returns true when some layer had to stop playback.
    pub fn remove_node_animations(&mut self, node: &str, layer: Option<&str>) -> Result<bool, AnimError> {
        let stop = self.target_layer(layer)?.remove_node_animations(node);
        self.dirty = true;
        Ok(stop)
    }

    // --- parameters, broadcast to every layer ---

    pub fn set_parameter(&mut self, name: &str, value: AnimParam) {
        for layer in &mut self.layers {
            layer.set_parameter(name, value);
        }
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

    /// Play every playable layer. Layers that cannot play are skipped.
    pub fn play(&mut self) {
        for layer in &mut self.layers {
            if layer.playable() {
                if let Err(err) = layer.play(None) {
                    warn!("layer '{}': play failed: {}", layer.name(), err);
                }
            }
        }
        self.dirty = true;
    }

    pub fn pause(&mut self) {
        for layer in &mut self.layers {
            layer.pause();
        }
    }

    pub fn reset(&mut self) {
        for layer in &mut self.layers {
            layer.reset();
        }
        self.dirty = true;
    }

    pub fn rebind(&mut self) {
        for layer in &mut self.layers {
            layer.rebind();
        }
        self.dirty = true;
    }

    pub fn playing(&self) -> bool {
        self.layers.iter().any(AnimComponentLayer::playing)
    }

    pub fn playable(&self) -> bool {
        !self.layers.is_empty() && self.layers.iter().all(AnimComponentLayer::playable)
    }

    /// Advance every layer by `dt` and collect their notifications.
    pub fn update(&mut self, dt: f32) {
        for layer in &mut self.layers {
            layer.update(dt);
        }
        self.collect();
    }

    fn collect(&mut self) {
        for layer in &mut self.layers {
            self.notifications.extend(layer.drain_notifications());
            if layer.take_dirty() {
                self.dirty = true;
            }
        }
    }

    /// Blended pose of all layers, rebuilt only when something changed.
    pub fn pose(&mut self) -> &Pose {
        self.collect();
        if self.dirty {
            let mut out = Pose::new();
            for layer in &self.layers {
                let w = layer.weight();
                if !(w > 0.0) {
                    continue;
                }
                let local = layer.pose();
                match layer.blend_type() {
                    BlendType::Overwrite => out.blend_overwrite(&local, w.min(1.0)),
                    BlendType::Add => out.blend_add(&local, w),
                }
            }
            self.pose = out;
            self.dirty = false;
        }
        &self.pose
    }

    /// Take all pending notifications from every layer, in emission order
    /// per layer.
    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        self.collect();
        self.notifications.drain()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::{AnimCurve, CurvePath, Interpolation};
    use crate::data::AnimData;
    use crate::graph::StateDesc;

    fn constant(node: &str, value: f32) -> Arc<AnimTrack> {
        Arc::new(
            AnimTrack::new(
                "const",
                1.0,
                vec![AnimData::scalar(vec![0.0, 1.0])],
                vec![AnimData::scalar(vec![value, value])],
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

    fn two_layers() -> AnimComponent {
        let mut c = AnimComponent::default();
        c.add_layer(&LayerGraph::new("Base", vec![StateDesc::new("Idle")]))
            .unwrap();
        c.add_layer(&LayerGraph::new("Upper", vec![StateDesc::new("Wave")]))
            .unwrap();
        c.assign_animation("Idle", constant("Root", 2.0), None, None, None)
            .unwrap();
        c.assign_animation("Wave", constant("Root", 6.0), Some("Upper"), None, None)
            .unwrap();
        c
    }

    #[test]
    fn overwrite_layer_lerps_over_base() {
        let mut c = two_layers();
        c.layer_mut("Upper").unwrap().set_weight(0.5);
        assert_eq!(c.pose().get("Root.x"), Some(&[4.0][..]));
    }

    #[test]
    fn additive_layer_adds_weighted() {
        let mut c = two_layers();
        let upper = c.layer_mut("Upper").unwrap();
        upper.set_blend_type(BlendType::Add);
        upper.set_weight(0.5);
        assert_eq!(c.pose().get("Root.x"), Some(&[5.0][..]));
    }

    #[test]
    fn zero_weight_layer_is_skipped() {
        let mut c = two_layers();
        c.layer_mut("Upper").unwrap().set_weight(0.0);
        assert_eq!(c.pose().get("Root.x"), Some(&[2.0][..]));
    }

    #[test]
    fn unknown_layer_and_duplicates_are_errors() {
        let mut c = two_layers();
        assert!(matches!(
            c.assign_animation("Idle", constant("Root", 0.0), Some("Face"), None, None),
            Err(AnimError::UnknownLayer { .. })
        ));
        assert!(c
            .add_layer(&LayerGraph::new("Base", vec![StateDesc::new("Idle")]))
            .is_err());
    }

    #[test]
    fn notifications_are_collected_from_layers() {
        let mut c = two_layers();
        let n = c.drain_notifications();
        assert!(n.iter().any(|n| n.layer() == "Base"));
        assert!(n.iter().any(|n| n.layer() == "Upper"));
        assert!(c.drain_notifications().is_empty());
    }
}
