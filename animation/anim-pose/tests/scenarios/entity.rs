//! Whole-entity scenarios: controller stacks driven tick by tick

use std::sync::Arc;

use glam::{Vec3, Vec4};
use pretty_assertions::assert_eq;
use test_case::test_case;

use anim_pose::{
    AnimatedEntity, EntityOptions, IkOptions, IkPoseController, Interpolation, Joint, JointTrack,
    KeyframeClip, KeyframeTrack, NameTable, RenderPass, RenderView, SharedClock,
    SimpleAnimationController, Skeleton, SkinnedMeshRenderer, Transform, UpdatePhase,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[derive(Debug, Default)]
struct CaptureRenderer {
    joints: usize,
    last: Vec<Vec4>,
    draws: usize,
}

impl SkinnedMeshRenderer for CaptureRenderer {
    fn joint_count(&self) -> usize {
        self.joints
    }

    fn render(&mut self, skin_transforms: &[Vec4], _distance: f32) {
        self.last = skin_transforms.to_vec();
        self.draws += 1;
    }
}

fn chain(names: &mut NameTable) -> Arc<Skeleton> {
    Arc::new(
        Skeleton::new(vec![
            Joint::new(names.intern("root"), None, Transform::IDENTITY),
            Joint::new(names.intern("child"), Some(0), Transform::from_translation(Vec3::Y)),
            Joint::new(
                names.intern("grandchild"),
                Some(1),
                Transform::from_translation(Vec3::Y),
            ),
        ])
        .unwrap(),
    )
}

/// Raises the child joint by two units over one second
fn raise_child_clip() -> Arc<KeyframeClip> {
    let track = JointTrack {
        joint: 1,
        rotation: None,
        translation: Some(
            KeyframeTrack::new(
                Interpolation::Linear,
                vec![0.0, 1.0],
                vec![Vec3::ZERO, Vec3::new(0.0, 2.0, 0.0)],
            )
            .unwrap(),
        ),
    };
    Arc::new(KeyframeClip::new(1.0, false, vec![track]))
}

#[test_case(false ; "inline evaluation")]
#[test_case(true ; "background evaluation")]
fn test_clip_playback_end_to_end(async_evaluation: bool) {
    init_logging();
    let mut names = NameTable::new();
    let clock = SharedClock::new(0.0);

    let mut entity = AnimatedEntity::new(EntityOptions {
        async_evaluation,
        ..EntityOptions::default()
    });
    entity.set_skeleton(Some(chain(&mut names)));
    entity.set_controller(Some(Box::new(
        SimpleAnimationController::new(Some(raise_child_clip())).with_time_source(Arc::new(clock.clone())),
    )));

    let mut renderer = CaptureRenderer {
        joints: 3,
        ..CaptureRenderer::default()
    };
    let view = RenderView {
        fraction: 1.0,
        distance: 5.0,
        pass: RenderPass::Main,
    };

    for _ in 0..5 {
        clock.advance(0.1);
        entity.update(0.1);
        entity.render(&view, &mut renderer);
    }
    assert_eq!(entity.phase(), UpdatePhase::Settled);
    assert_eq!(renderer.draws, 5);

    // Child local y = 1 + 2 * 0.5
    let grandchild = entity.pose_transform(names.intern("grandchild")).unwrap();
    assert!(grandchild.translation.abs_diff_eq(Vec3::new(0.0, 3.0, 0.0), 1e-4));

    let skin = entity.skin_transform(names.intern("child")).unwrap();
    assert!(skin.translation.abs_diff_eq(Vec3::new(0.0, 1.0, 0.0), 1e-4));

    // Fraction 1 renders the current frame unchanged
    assert_eq!(renderer.last.len(), 6);
    assert!(renderer.last[3].abs_diff_eq(Vec4::new(0.0, 1.0, 0.0, 0.0), 1e-4));
}

#[test]
fn test_normalization_scenario() {
    let mut names = NameTable::new();
    let skeleton = Skeleton::new(vec![
        Joint::new(names.intern("root"), None, Transform::IDENTITY),
        Joint::new(
            names.intern("tip"),
            Some(0),
            Transform::from_translation(Vec3::new(0.0, 2.0, 0.0)),
        ),
    ])
    .unwrap();

    let mut entity = AnimatedEntity::new(EntityOptions {
        normalize_pose: true,
        ..EntityOptions::default()
    });
    entity.set_skeleton(Some(Arc::new(skeleton)));
    entity.update(0.1);

    let translations: Vec<Vec3> = entity
        .pose_transforms()
        .iter()
        .map(|t| t.translation)
        .collect();
    assert_eq!(translations, vec![Vec3::new(0.0, -1.0, 0.0), Vec3::new(0.0, 1.0, 0.0)]);

    // Without normalize_transform the entity stays put
    assert_eq!(entity.world_transform(), Transform::IDENTITY);
}

#[test]
fn test_ik_keeps_entity_above_ground() {
    init_logging();
    let mut names = NameTable::new();
    let skeleton = Skeleton::new(vec![
        Joint::new(
            names.intern("hip"),
            None,
            Transform::from_translation(Vec3::new(0.0, 0.5, 0.0)),
        ),
        Joint::new(
            names.intern("foot"),
            Some(0),
            Transform::from_translation(Vec3::new(0.0, -1.0, 0.0)),
        ),
    ])
    .unwrap();

    let mut entity = AnimatedEntity::default();
    entity.set_skeleton(Some(Arc::new(skeleton)));
    entity.set_controller(Some(Box::new(IkPoseController::new(None, IkOptions::default()))));
    entity.update(0.1);

    let foot = entity.pose_transform(names.intern("foot")).unwrap();
    assert!(foot.translation.y >= -1e-4);

    let hip = entity.pose_transform(names.intern("hip")).unwrap();
    assert!(hip.translation.y >= -1e-4);
}

#[test]
fn test_throttled_entity_catches_up_on_time() {
    let mut names = NameTable::new();
    let clip = raise_child_clip();

    let mut entity = AnimatedEntity::default();
    entity.set_skeleton(Some(chain(&mut names)));
    entity.set_controller(Some(Box::new(SimpleAnimationController::new(Some(clip)))));

    let mut renderer = CaptureRenderer {
        joints: 3,
        ..CaptureRenderer::default()
    };
    let shadow = RenderView {
        fraction: 1.0,
        distance: 50.0,
        pass: RenderPass::Shadow,
    };

    entity.update(0.125);
    for _ in 0..3 {
        entity.render(&shadow, &mut renderer);
        entity.update(0.125);
    }

    // Skipped ticks leave the pose at the first evaluation
    let child = entity.pose_transform(names.intern("child")).unwrap();
    assert!(child.translation.abs_diff_eq(Vec3::new(0.0, 1.25, 0.0), 1e-4));

    entity.render(&shadow, &mut renderer);
    entity.update(0.125);

    // Entity time reached 0.625 while skipping
    let child = entity.pose_transform(names.intern("child")).unwrap();
    assert!(child.translation.abs_diff_eq(Vec3::new(0.0, 2.25, 0.0), 1e-4));
}
