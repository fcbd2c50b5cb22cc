//! Transform propagation, pose storage and blending

use glam::{Quat, Vec3};
use pretty_assertions::assert_eq;
use test_case::test_case;

use anim_pose::{
    Joint, NameTable, Pose, Skeleton, Transform, blend_poses, calculate_joint_transforms,
    calculate_pose_transforms,
};

fn three_joint_chain(names: &mut NameTable) -> Skeleton {
    Skeleton::new(vec![
        Joint::new(names.intern("root"), None, Transform::IDENTITY),
        Joint::new(names.intern("child"), Some(0), Transform::from_translation(Vec3::Y)),
        Joint::new(
            names.intern("grandchild"),
            Some(1),
            Transform::from_translation(Vec3::Y),
        ),
    ])
    .unwrap()
}

#[test]
fn test_bind_transforms_of_chain() {
    let mut names = NameTable::new();
    let skeleton = three_joint_chain(&mut names);

    let translations: Vec<Vec3> = calculate_joint_transforms(&skeleton)
        .iter()
        .map(|t| t.translation)
        .collect();

    assert_eq!(
        translations,
        vec![Vec3::ZERO, Vec3::new(0.0, 1.0, 0.0), Vec3::new(0.0, 2.0, 0.0)]
    );
}

#[test]
fn test_pose_override_moves_descendants() {
    let mut names = NameTable::new();
    let skeleton = three_joint_chain(&mut names);
    let child = skeleton.find_joint(names.intern("child")).unwrap();

    let mut pose = Pose::new();
    pose.insert(child, Transform::from_translation(Vec3::new(0.0, 2.0, 0.0)));

    // The delta stacks on the child's bind offset
    let transforms = calculate_pose_transforms(&skeleton, &pose);
    assert!(transforms[1].translation.abs_diff_eq(Vec3::new(0.0, 3.0, 0.0), 1e-6));
    assert!(transforms[2].translation.abs_diff_eq(Vec3::new(0.0, 4.0, 0.0), 1e-6));
    assert!(transforms[0].abs_diff_eq(&Transform::IDENTITY, 1e-6));
}

#[test]
fn test_single_identity_root() {
    let mut names = NameTable::new();
    let skeleton =
        Skeleton::new(vec![Joint::new(names.intern("root"), None, Transform::IDENTITY)]).unwrap();

    let transforms = calculate_joint_transforms(&skeleton);
    let local = skeleton.joint(0).unwrap().local;
    assert!(transforms[0].mul(&local.inverse()).abs_diff_eq(&Transform::IDENTITY, 1e-6));
}

#[test]
fn test_storage_order_need_not_be_topological() {
    let mut names = NameTable::new();
    let skeleton = Skeleton::new(vec![
        Joint::new(names.intern("tip"), Some(2), Transform::from_translation(Vec3::X)),
        Joint::new(names.intern("root"), None, Transform::from_translation(Vec3::Y)),
        Joint::new(names.intern("mid"), Some(1), Transform::from_translation(Vec3::X)),
    ])
    .unwrap();

    let transforms = calculate_joint_transforms(&skeleton);
    assert!(transforms[0].translation.abs_diff_eq(Vec3::new(2.0, 1.0, 0.0), 1e-6));
}

#[test]
fn test_pose_insert_replaces() {
    let mut pose = Pose::new();
    pose.insert(4, Transform::from_translation(Vec3::X));
    pose.insert(1, Transform::IDENTITY);
    pose.insert(4, Transform::from_translation(Vec3::Z));

    assert_eq!(pose.len(), 2);
    assert_eq!(pose.get(4), Some(&Transform::from_translation(Vec3::Z)));
    assert_eq!(pose.indices().collect::<Vec<_>>(), vec![1, 4]);
}

#[test_case(0.0, 0 ; "factor zero keeps first pose")]
#[test_case(1.0, 1 ; "factor one yields second pose")]
fn test_blend_endpoints(factor: f32, expected: usize) {
    let mut a = Pose::new();
    a.insert(0, Transform::new(Quat::from_rotation_z(0.3), Vec3::X));
    a.insert(2, Transform::from_translation(Vec3::Z));
    let mut b = Pose::new();
    b.insert(0, Transform::new(Quat::from_rotation_x(-1.1), Vec3::Y));
    b.insert(1, Transform::from_translation(Vec3::new(0.0, 5.0, 0.0)));

    let mut out = Pose::new();
    blend_poses(&a, &b, factor, &mut out);

    let source = [&a, &b][expected];
    assert_eq!(out.len(), source.len());
    for (joint, transform) in source.iter() {
        assert!(out.get(joint).unwrap().abs_diff_eq(transform, 1e-6));
    }
}

#[test]
fn test_blend_midpoint_against_missing_side() {
    let mut names = NameTable::new();
    let skeleton = three_joint_chain(&mut names);

    let a = Pose::new();
    let mut b = Pose::new();
    b.insert(1, Transform::from_translation(Vec3::new(0.0, 2.0, 0.0)));

    let mut out = Pose::new();
    blend_poses(&a, &b, 0.5, &mut out);

    // Missing side is the bind pose, so the child rises halfway
    let child = out.get(1).unwrap();
    assert!(child.translation.abs_diff_eq(Vec3::new(0.0, 1.0, 0.0), 1e-6));
    let transforms = calculate_pose_transforms(&skeleton, &out);
    assert!(transforms[2].translation.abs_diff_eq(Vec3::new(0.0, 3.0, 0.0), 1e-6));
}
