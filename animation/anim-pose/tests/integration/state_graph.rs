//! State graph playback through StatePoseController

use std::sync::Arc;

use glam::Vec3;
use pretty_assertions::assert_eq;
use test_case::test_case;

use anim_pose::{
    AnimError, EvaluationContext, Interpolation, Joint, JointTrack, KeyframeClip, KeyframeTrack,
    Motion, NameHandle, NameTable, PoseController, Skeleton, StateGraph, StatePoseController,
    Transform, TransitionMoment, calculate_joint_transforms,
};

fn skeleton() -> Skeleton {
    Skeleton::new(vec![Joint::new(NameHandle(0), None, Transform::IDENTITY)]).unwrap()
}

fn hold(position: Vec3) -> Motion {
    let track = JointTrack {
        joint: 0,
        rotation: None,
        translation: Some(KeyframeTrack::constant(position)),
    };
    Motion::Clip(Arc::new(KeyframeClip::new(1.0, true, vec![track])))
}

fn tick(controller: &mut StatePoseController, skeleton: &Skeleton, delta_time: f32) -> Vec<Transform> {
    let joint_transforms = calculate_joint_transforms(skeleton);
    let ctx = EvaluationContext {
        time: 0.0,
        delta_time,
        world_transform: Transform::IDENTITY,
        skeleton,
        joint_transforms: &joint_transforms,
    };
    let mut out = Vec::new();
    controller.evaluate(&ctx, &mut out);
    out
}

#[test_case(true, 1 ; "flag set selects conditional transition")]
#[test_case(false, 2 ; "flag cleared falls back to default transition")]
fn test_transition_selection(flag: bool, expected: usize) {
    let mut names = NameTable::new();
    let mut builder = StateGraph::builder();
    let idle = builder.add_state(names.intern("idle"), Motion::Empty);
    let walk = builder.add_state(names.intern("walk"), Motion::Empty);
    let rest = builder.add_state(names.intern("rest"), Motion::Empty);
    builder
        .add_transition(idle, Some(walk), TransitionMoment::Immediate, "moving", 0.5, &mut names)
        .add_transition(idle, Some(rest), TransitionMoment::Immediate, "", 0.5, &mut names)
        .root(idle);
    let graph = builder.build().unwrap();

    let skeleton = skeleton();
    let mut controller = StatePoseController::new(Some(Arc::new(graph)));
    controller.set_condition(names.intern("moving"), flag);
    tick(&mut controller, &skeleton, 0.1);

    assert_eq!(controller.current_state(), Some(idle));
    assert_eq!(controller.next_state(), Some(expected));
}

#[test]
fn test_cross_fade_commits_at_duration() {
    let mut names = NameTable::new();
    let mut builder = StateGraph::builder();
    let from = builder.add_state(names.intern("from"), hold(Vec3::ZERO));
    let to = builder.add_state(names.intern("to"), hold(Vec3::new(0.0, 4.0, 0.0)));
    builder
        .add_transition(from, Some(to), TransitionMoment::Immediate, "", 2.0, &mut names)
        .root(from);
    let graph = builder.build().unwrap();

    let skeleton = skeleton();
    let mut controller = StatePoseController::new(Some(Arc::new(graph)));

    tick(&mut controller, &skeleton, 1.0);
    assert_eq!(controller.next_state(), Some(to));

    let halfway = tick(&mut controller, &skeleton, 1.0);
    assert_eq!(controller.next_state(), Some(to));
    let weight = std::f32::consts::FRAC_PI_4.sin();
    assert!((halfway[0].translation.y - 4.0 * weight).abs() < 1e-4);

    let committed = tick(&mut controller, &skeleton, 1.0);
    assert_eq!(controller.current_state(), Some(to));
    assert_eq!(controller.next_state(), None);
    assert!(committed[0].translation.abs_diff_eq(Vec3::new(0.0, 4.0, 0.0), 1e-5));
}

#[test]
fn test_set_state_jumps_by_name() {
    let mut names = NameTable::new();
    let mut builder = StateGraph::builder();
    let a = builder.add_state(names.intern("a"), Motion::Empty);
    let b = builder.add_state(names.intern("b"), hold(Vec3::X));
    builder.root(a);
    let graph = builder.build().unwrap();

    let skeleton = skeleton();
    let mut controller = StatePoseController::new(Some(Arc::new(graph)));
    tick(&mut controller, &skeleton, 0.1);

    assert!(controller.set_state(names.intern("b")));
    assert!(!controller.set_state(names.intern("missing")));

    let out = tick(&mut controller, &skeleton, 0.1);
    assert_eq!(controller.current_state(), Some(b));
    assert!(out[0].translation.abs_diff_eq(Vec3::X, 1e-6));
}

#[test]
fn test_builder_rejects_unknown_state() {
    let mut names = NameTable::new();
    let mut builder = StateGraph::builder();
    let a = builder.add_state(names.intern("a"), Motion::Empty);
    builder
        .add_transition(a, Some(7), TransitionMoment::AtEnd, "", 0.0, &mut names)
        .root(a);

    assert!(matches!(builder.build(), Err(AnimError::InvalidGraph(_))));
}

#[test]
fn test_linear_clip_drives_state() {
    let track = JointTrack {
        joint: 0,
        rotation: None,
        translation: Some(
            KeyframeTrack::new(
                Interpolation::Linear,
                vec![0.0, 1.0],
                vec![Vec3::ZERO, Vec3::new(2.0, 0.0, 0.0)],
            )
            .unwrap(),
        ),
    };
    let clip = KeyframeClip::new(1.0, false, vec![track]);

    let mut names = NameTable::new();
    let mut builder = StateGraph::builder();
    let play = builder.add_state(names.intern("play"), Motion::Clip(Arc::new(clip)));
    builder.root(play);
    let graph = builder.build().unwrap();

    let skeleton = skeleton();
    let mut controller = StatePoseController::new(Some(Arc::new(graph)));

    // Each tick samples at the state clock, then advances it
    tick(&mut controller, &skeleton, 0.25);
    let out = tick(&mut controller, &skeleton, 0.25);
    assert!(out[0].translation.abs_diff_eq(Vec3::new(0.5, 0.0, 0.0), 1e-5));
}

#[test_case(None, 1 ; "unset flag satisfies negated condition")]
#[test_case(Some(false), 1 ; "cleared flag satisfies negated condition")]
#[test_case(Some(true), 2 ; "set flag selects plain condition")]
fn test_negated_condition_selection(armed: Option<bool>, expected: usize) {
    let mut names = NameTable::new();
    let mut builder = StateGraph::builder();
    let idle = builder.add_state(names.intern("idle"), Motion::Empty);
    let calm = builder.add_state(names.intern("calm"), Motion::Empty);
    let ready = builder.add_state(names.intern("ready"), Motion::Empty);
    builder
        .add_transition(idle, Some(calm), TransitionMoment::Immediate, "!armed", 0.5, &mut names)
        .add_transition(idle, Some(ready), TransitionMoment::Immediate, "armed", 0.5, &mut names)
        .root(idle);
    let graph = builder.build().unwrap();

    let skeleton = skeleton();
    let mut controller = StatePoseController::new(Some(Arc::new(graph)));
    if let Some(armed) = armed {
        controller.set_condition(names.intern("armed"), armed);
    }
    tick(&mut controller, &skeleton, 0.1);

    assert_eq!(controller.next_state(), Some(expected));
}

#[test]
fn test_condition_change_mid_fade_keeps_target() {
    let mut names = NameTable::new();
    let mut builder = StateGraph::builder();
    let from = builder.add_state(names.intern("from"), hold(Vec3::ZERO));
    let go = builder.add_state(names.intern("advance"), hold(Vec3::new(0.0, 4.0, 0.0)));
    let stay = builder.add_state(names.intern("stay"), hold(Vec3::new(0.0, -4.0, 0.0)));
    builder
        .add_transition(from, Some(go), TransitionMoment::Immediate, "go", 2.0, &mut names)
        .add_transition(from, Some(stay), TransitionMoment::Immediate, "!go", 2.0, &mut names)
        .root(from);
    let graph = builder.build().unwrap();

    let skeleton = skeleton();
    let mut controller = StatePoseController::new(Some(Arc::new(graph)));
    let flag = names.intern("go");
    controller.set_condition(flag, true);

    tick(&mut controller, &skeleton, 1.0);
    assert_eq!(controller.next_state(), Some(go));

    // Flipping the flag only affects the next selection, not the fade in flight
    controller.set_condition(flag, false);
    let halfway = tick(&mut controller, &skeleton, 1.0);
    assert_eq!(controller.next_state(), Some(go));
    let weight = std::f32::consts::FRAC_PI_4.sin();
    assert!((halfway[0].translation.y - 4.0 * weight).abs() < 1e-4);

    let committed = tick(&mut controller, &skeleton, 1.0);
    assert_eq!(controller.current_state(), Some(go));
    assert_eq!(controller.next_state(), None);
    assert!(committed[0].translation.abs_diff_eq(Vec3::new(0.0, 4.0, 0.0), 1e-5));
}
