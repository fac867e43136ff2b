use std::sync::Arc;

use animgraph_core::{
    AnimController, AnimError, AnimParam, AnimSnapshot, AnimTrack, AnimTransition, Config,
    LayerGraph, Notification, StateDesc,
};

fn approx(a: f32, b: f32, eps: f32) {
    assert!((a - b).abs() <= eps, "left={a} right={b} eps={eps}");
}

fn track(name: &str) -> Arc<AnimTrack> {
    Arc::new(animgraph_test_fixtures::tracks::load::<AnimTrack>(name).expect("load track fixture"))
}

fn pure_sample(track: &Arc<AnimTrack>, time: f32) -> f32 {
    let mut snap = AnimSnapshot::new(Arc::clone(track));
    snap.eval(time);
    snap.result(0).unwrap()[0]
}

fn height(c: &AnimController) -> f32 {
    c.pose().get("Root.height").expect("height channel")[0]
}

fn two_state(duration: f32) -> LayerGraph {
    LayerGraph::new("Base", vec![StateDesc::new("A"), StateDesc::new("B")])
        .with_transition(AnimTransition::new("A", "B", duration))
}

fn state_changes(notes: &[Notification]) -> Vec<String> {
    notes
        .iter()
        .filter_map(|n| match n {
            Notification::StateChanged { to, .. } => Some(to.clone()),
            _ => None,
        })
        .collect()
}

#[test]
fn looping_state_wraps_time() {
    let graph = LayerGraph::new("Base", vec![StateDesc::new("Loop")]);
    let mut c = AnimController::new(&graph, Config::default()).unwrap();
    c.assign_animation("Loop", track("ramp-2s"), None, Some(true))
        .unwrap();
    c.play(None).unwrap();
    c.update(1.5);
    c.update(1.0);
    assert_eq!(c.active_state_current_time(), 0.5);
    assert_eq!(height(&c), 0.5);
    assert_eq!(c.active_state_duration(), 2.0);
    approx(c.active_state_progress(), 0.25, 1e-6);
}

#[test]
fn non_looping_state_stops_on_last_frame() {
    let graph = LayerGraph::new("Base", vec![StateDesc::new("Once")]);
    let mut c = AnimController::new(&graph, Config::default()).unwrap();
    c.assign_animation("Once", track("ramp-2s"), None, Some(false))
        .unwrap();
    c.play(None).unwrap();
    c.update(1.5);
    assert!(c.playing());
    c.update(1.0);
    assert_eq!(c.active_state_current_time(), 2.0);
    assert_eq!(height(&c), 2.0);
    assert!(!c.playing());
    assert_eq!(c.active_state(), Some("Once"));

    // Stopped: further updates keep the last frame.
    c.update(0.5);
    assert_eq!(c.active_state_current_time(), 2.0);

    // Playing again replays from the start.
    c.play(None).unwrap();
    assert!(c.playing());
    assert_eq!(c.active_state_current_time(), 0.0);
    c.update(0.5);
    assert_eq!(height(&c), 0.5);
}

#[test]
fn exit_edge_fires_when_clip_ends_during_fade() {
    let graph = LayerGraph::new(
        "Base",
        vec![StateDesc::new("A"), StateDesc::new("B"), StateDesc::new("C")],
    )
    .with_transition(AnimTransition {
        exit_time: Some(1.0),
        ..AnimTransition::new("B", "C", 0.0)
    });
    let mut c = AnimController::new(&graph, Config::default()).unwrap();
    c.assign_animation("A", track("bounce"), None, None).unwrap();
    c.assign_animation("B", track("bounce"), None, Some(false))
        .unwrap();
    c.assign_animation("C", track("ramp-2s"), None, None).unwrap();
    c.play(None).unwrap();

    c.transition("B", Some(1.0), Some(0.5)).unwrap();
    c.update(0.75);
    assert!(c.transitioning());
    assert_eq!(c.state("B").unwrap().time(), 1.0);

    c.update(0.25);
    assert!(!c.transitioning());
    assert_eq!(c.active_state(), Some("C"));
    assert!(c.playing());
}

#[test]
fn seeking_the_active_state_resamples() {
    let graph = LayerGraph::new("Base", vec![StateDesc::new("Idle")]);
    let mut c = AnimController::new(&graph, Config::default()).unwrap();
    c.assign_animation("Idle", track("bounce"), None, None).unwrap();

    // Idle: nothing to seek.
    c.set_active_state_current_time(0.5);
    assert_eq!(c.active_state_current_time(), 0.0);

    c.play(None).unwrap();
    c.set_active_state_current_time(0.25);
    assert_eq!(c.active_state_current_time(), 0.25);
    assert_eq!(c.pose().get("Root.height"), Some(&[0.5][..]));

    // Looping states wrap the seek target.
    c.set_active_state_current_time(1.5);
    assert_eq!(c.active_state_current_time(), 0.5);
    assert_eq!(height(&c), 1.0);
}

#[test]
fn crossfade_endpoints_match_pure_samples() {
    let bounce = track("bounce");
    let ramp = track("ramp-2s");
    let mut c = AnimController::new(&two_state(0.5), Config::default()).unwrap();
    c.assign_animation("A", Arc::clone(&bounce), None, None).unwrap();
    c.assign_animation("B", Arc::clone(&ramp), None, None).unwrap();
    c.play(None).unwrap();
    c.update(0.1);

    c.transition("B", None, None).unwrap();
    assert!(c.transitioning());
    assert_eq!(c.transition_progress(), 0.0);
    assert_eq!(height(&c), pure_sample(&bounce, 0.1));

    c.update(0.25);
    approx(c.transition_progress(), 0.5, 1e-6);
    let mid = 0.5 * pure_sample(&bounce, 0.35) + 0.5 * pure_sample(&ramp, 0.25);
    approx(height(&c), mid, 1e-5);

    c.update(0.25);
    assert!(!c.transitioning());
    assert_eq!(c.previous_state(), None);
    assert_eq!(c.active_state(), Some("B"));
    assert_eq!(height(&c), pure_sample(&ramp, c.active_state_current_time()));
}

#[test]
fn states_sharing_a_track_sample_independently() {
    let bounce = track("bounce");
    let mut c = AnimController::new(&two_state(1.0), Config::default()).unwrap();
    c.assign_animation("A", Arc::clone(&bounce), None, None).unwrap();
    c.assign_animation("B", Arc::clone(&bounce), None, None).unwrap();
    assert_eq!(Arc::strong_count(&bounce), 3);

    c.play(None).unwrap();
    c.update(0.25);
    c.transition("B", None, Some(0.5)).unwrap();

    let a = c.state("A").unwrap().nodes()[0].snapshot().unwrap();
    let b = c.state("B").unwrap().nodes()[0].snapshot().unwrap();
    assert_eq!(a.result(0).unwrap(), &[0.5]);
    assert_eq!(b.result(0).unwrap(), &[1.0]);
    assert_eq!(c.state("B").unwrap().time(), 0.5);
}

#[test]
fn unknown_transition_is_reported_without_side_effects() {
    let mut c = AnimController::new(&two_state(0.5), Config::default()).unwrap();
    c.assign_animation("A", track("bounce"), None, None).unwrap();
    c.assign_animation("B", track("bounce"), None, None).unwrap();
    c.play(None).unwrap();
    c.update(0.2);
    c.drain_notifications();

    let err = c.transition("Nowhere", None, None).unwrap_err();
    assert!(matches!(err, AnimError::UnknownState { ref name, .. } if name == "Nowhere"));
    assert_eq!(c.active_state(), Some("A"));
    assert!(!c.transitioning());
    assert!(c.drain_notifications().is_empty());
    c.update(0.2);
    approx(c.active_state_current_time(), 0.4, 1e-6);
}

#[test]
fn transition_without_edge_uses_configured_duration() {
    let graph = LayerGraph::new("Base", vec![StateDesc::new("A"), StateDesc::new("B")]);
    let config = Config {
        default_transition_duration: 0.5,
        ..Config::default()
    };
    let mut c = AnimController::new(&graph, config).unwrap();
    c.assign_animation("A", track("bounce"), None, None).unwrap();
    c.assign_animation("B", track("bounce"), None, None).unwrap();
    c.play(None).unwrap();
    c.transition("B", None, None).unwrap();
    assert!(c.transitioning());
    assert_eq!(c.transition_duration(), 0.5);
    c.transition("A", Some(0.0), None).unwrap();
    assert!(!c.transitioning());
    assert_eq!(c.active_state(), Some("A"));
}

#[test]
fn interrupting_a_fade_fades_from_the_current_target() {
    let graph = LayerGraph::new(
        "Base",
        vec![StateDesc::new("A"), StateDesc::new("B"), StateDesc::new("C")],
    );
    let mut c = AnimController::new(&graph, Config::default()).unwrap();
    for s in ["A", "B", "C"] {
        c.assign_animation(s, track("bounce"), None, None).unwrap();
    }
    c.play(None).unwrap();
    c.transition("B", Some(1.0), None).unwrap();
    c.update(0.5);
    c.transition("C", Some(1.0), None).unwrap();
    assert_eq!(c.previous_state(), Some("B"));
    assert_eq!(c.active_state(), Some("C"));
    assert_eq!(c.transition_progress(), 0.0);
}

#[test]
fn play_cancels_fade_and_pause_freezes_it() {
    let mut c = AnimController::new(&two_state(1.0), Config::default()).unwrap();
    c.assign_animation("A", track("bounce"), None, None).unwrap();
    c.assign_animation("B", track("bounce"), None, None).unwrap();
    c.play(None).unwrap();
    c.transition("B", None, None).unwrap();
    c.update(0.25);
    c.pause();
    c.update(0.25);
    assert_eq!(c.transition_progress(), 0.25);
    c.play(None).unwrap();
    assert!(!c.transitioning());
    assert_eq!(c.active_state(), Some("B"));
}

#[test]
fn locomotion_graph_runs_on_parameters() {
    let json = animgraph_test_fixtures::graphs::json("locomotion").unwrap();
    let graph = LayerGraph::from_json(&json).unwrap();
    let mut c = AnimController::new(&graph, Config::default()).unwrap();
    c.assign_animation("Idle", track("bounce"), None, None).unwrap();
    c.assign_animation("Move.Walk", track("walk"), None, None).unwrap();
    assert!(!c.playable());
    c.assign_animation("Move.Run", track("run"), None, None).unwrap();
    assert!(!c.playable());
    c.assign_animation("Jump", track("bounce"), None, None).unwrap();
    assert!(c.playable());
    assert!(!c.state("Jump").unwrap().looping());

    c.play(None).unwrap();
    c.update(0.1);
    assert_eq!(c.active_state(), Some("Idle"));

    c.set_float("speed", 1.0);
    c.update(0.1);
    assert_eq!(c.active_state(), Some("Move"));
    assert_eq!(c.previous_state(), Some("Idle"));
    c.update(0.1);
    c.update(0.1);
    assert!(!c.transitioning());

    let pose = c.pose();
    assert!(pose.get("Root.height").is_none());
    let position = pose.get("Root/Hips.position").unwrap();
    approx(position[0], 0.25, 1e-5);
    approx(position[1], 1.04, 1e-5);

    c.set_trigger("jump");
    c.update(0.1);
    assert_eq!(c.active_state(), Some("Jump"));
    assert_eq!(c.parameter("jump"), Some(AnimParam::Trigger(false)));
    c.update(0.1);
    assert!(!c.transitioning());

    c.update(1.0);
    assert_eq!(c.active_state(), Some("Idle"));

    let changes = state_changes(&c.drain_notifications());
    assert_eq!(changes, vec!["Idle", "Move", "Jump", "Idle"]);
}

#[test]
fn reset_returns_to_idle() {
    let mut c = AnimController::new(&two_state(0.5), Config::default()).unwrap();
    c.assign_animation("A", track("bounce"), None, None).unwrap();
    c.assign_animation("B", track("bounce"), None, None).unwrap();
    c.play(None).unwrap();
    c.transition("B", None, None).unwrap();
    c.reset();
    assert_eq!(c.active_state(), None);
    assert_eq!(c.previous_state(), None);
    assert!(!c.playing());
    assert!(c.pose().is_empty());
    c.update(0.5);
    assert_eq!(c.active_state(), None);
    c.play(None).unwrap();
    assert_eq!(c.active_state(), Some("A"));
}
