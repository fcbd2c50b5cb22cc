//! Joint hierarchy transform propagation
//!
//! These functions turn a skeleton and an optional sparse [`Pose`] into
//! object-space joint transforms, blend poses, and compute bounds. Output
//! buffers are indexed 1:1 with the skeleton's joint array.
//!
//! Pose entries are deltas on top of the bind local transform: a joint's
//! posed local transform is `bind_local * delta`, and a joint without an
//! entry keeps its bind local transform.

use glam::Vec3;

use crate::pose::Pose;
use crate::skeleton::Skeleton;
use crate::transform::{Lerp, Transform};

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl BoundingBox {
    /// Box containing nothing; extending it with anything yields that thing
    pub const EMPTY: Self = Self {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    /// Check if nothing has been added yet
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Grow to contain a sphere
    pub fn extend_sphere(&mut self, center: Vec3, radius: f32) {
        let r = Vec3::splat(radius.max(0.0));
        self.min = self.min.min(center - r);
        self.max = self.max.max(center + r);
    }

    /// Center point
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Extent along each axis
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Box transformed by a rigid transform (re-fitted around its corners)
    pub fn transformed(&self, transform: &Transform) -> Self {
        if self.is_empty() {
            return *self;
        }
        let mut result = Self::EMPTY;
        for i in 0..8 {
            let corner = Vec3::new(
                if i & 1 == 0 { self.min.x } else { self.max.x },
                if i & 2 == 0 { self.min.y } else { self.max.y },
                if i & 4 == 0 { self.min.z } else { self.max.z },
            );
            result.extend_sphere(transform.transform_point(corner), 0.0);
        }
        result
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// Copy each joint's bind transform relative to its parent
pub fn calculate_joint_local_transforms(skeleton: &Skeleton) -> Vec<Transform> {
    skeleton.joints().iter().map(|joint| joint.local).collect()
}

/// Object-space bind transforms
pub fn calculate_joint_transforms(skeleton: &Skeleton) -> Vec<Transform> {
    let mut out = Vec::new();
    calculate_pose_transforms_into(skeleton, &Pose::new(), &mut out);
    out
}

/// Object-space transforms with the pose's deltas applied
pub fn calculate_pose_transforms(skeleton: &Skeleton, pose: &Pose) -> Vec<Transform> {
    let mut out = Vec::new();
    calculate_pose_transforms_into(skeleton, pose, &mut out);
    out
}

/// Like [`calculate_pose_transforms`] but reuses `out`
///
/// `out` is resized to the skeleton's joint count.
pub fn calculate_pose_transforms_into(skeleton: &Skeleton, pose: &Pose, out: &mut Vec<Transform>) {
    let joints = skeleton.joints();
    out.clear();
    out.resize(joints.len(), Transform::IDENTITY);

    for &index in skeleton.evaluation_order() {
        let joint = &joints[index];
        let local = match pose.get(index) {
            Some(delta) => joint.local.mul(delta),
            None => joint.local,
        };

        out[index] = match joint.parent {
            Some(parent) => out[parent].mul(&local),
            None => local,
        };
    }
}

/// Blend two poses into `out`
///
/// Every joint present in either pose is written. A joint missing on one
/// side blends against the identity delta, which is its bind transform.
/// `blend_factor` 0 reproduces `a`, 1 reproduces `b`.
pub fn blend_poses(a: &Pose, b: &Pose, blend_factor: f32, out: &mut Pose) {
    out.clear();

    if blend_factor <= 0.0 {
        out.clone_from(a);
        return;
    }
    if blend_factor >= 1.0 {
        out.clone_from(b);
        return;
    }

    for index in a.union_indices(b) {
        let from = a.get(index).copied().unwrap_or_default();
        let to = b.get(index).copied().unwrap_or_default();
        out.insert(index, from.lerp(&to, blend_factor));
    }
}

/// Bounds of the joint spheres, in bind pose or with a pose applied
pub fn calculate_bounding_box(skeleton: &Skeleton, pose: Option<&Pose>) -> BoundingBox {
    let transforms = match pose {
        Some(pose) => calculate_pose_transforms(skeleton, pose),
        None => calculate_joint_transforms(skeleton),
    };
    bounding_box_from_transforms(skeleton, &transforms)
}

/// Bounds of the joint spheres placed at already-propagated transforms
pub fn bounding_box_from_transforms(skeleton: &Skeleton, transforms: &[Transform]) -> BoundingBox {
    let mut bounds = BoundingBox::EMPTY;
    for (joint, transform) in skeleton.joints().iter().zip(transforms) {
        bounds.extend_sphere(transform.translation, joint.radius);
    }
    bounds
}
