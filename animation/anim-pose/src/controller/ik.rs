//! Iterative IK post-processing
//!
//! The solver works on joint positions only. Each pass first restores bone
//! lengths by moving both ends of every bone symmetrically, then pushes any
//! joint below the world ground plane (`y = 0`) back onto it. Rotations are
//! reconstructed afterwards from the change in bone direction.

use glam::{Quat, Vec3};

use super::{EvaluationContext, JointVelocity, PoseController};
use crate::name::NameHandle;
use crate::skeleton::Skeleton;
use crate::transform::Transform;

/// Solver settings
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub struct IkOptions {
    /// Relaxation passes per evaluation
    pub solver_iterations: u32,
    /// Bone length error below which no correction is applied
    pub length_epsilon: f32,
    /// Bone axes shorter than this are treated as degenerate
    pub axis_epsilon: f32,
}

impl Default for IkOptions {
    fn default() -> Self {
        Self {
            solver_iterations: 10,
            length_epsilon: 1e-4,
            axis_epsilon: 1e-6,
        }
    }
}

/// Decorator relaxing another controller's output under length and ground constraints
#[derive(Debug)]
pub struct IkPoseController {
    inner: Option<Box<dyn PoseController>>,
    options: IkOptions,
    /// Solved joint positions, object space
    nodes: Vec<Vec3>,
    rest_lengths: Vec<f32>,
    unconstrained: Vec<Transform>,
}

impl IkPoseController {
    /// Wrap `inner`; without one the bind pose is relaxed
    pub fn new(inner: Option<Box<dyn PoseController>>, options: IkOptions) -> Self {
        Self {
            inner,
            options,
            nodes: Vec::new(),
            rest_lengths: Vec::new(),
            unconstrained: Vec::new(),
        }
    }

    /// Solver settings
    pub fn options(&self) -> &IkOptions {
        &self.options
    }

    /// Change solver settings
    pub fn set_options(&mut self, options: IkOptions) {
        self.options = options;
    }

    /// Wrapped controller
    pub fn inner(&self) -> Option<&dyn PoseController> {
        self.inner.as_deref()
    }

    /// Wrapped controller, mutably
    pub fn inner_mut(&mut self) -> Option<&mut (dyn PoseController + 'static)> {
        self.inner.as_deref_mut()
    }

    /// Joint positions produced by the last solve
    pub fn solved_positions(&self) -> &[Vec3] {
        &self.nodes
    }

    fn build_rest_lengths(&mut self, skeleton: &Skeleton, joint_transforms: &[Transform]) {
        self.rest_lengths.clear();
        self.rest_lengths
            .extend(skeleton.joints().iter().enumerate().map(|(index, joint)| {
                joint.parent.map_or(0.0, |parent| {
                    joint_transforms[index]
                        .translation
                        .distance(joint_transforms[parent].translation)
                })
            }));
    }

    fn solve_lengths(&mut self, skeleton: &Skeleton) {
        for &index in skeleton.evaluation_order() {
            let Some(parent) = skeleton.parent(index) else {
                continue;
            };

            let delta = self.nodes[index] - self.nodes[parent];
            let length = delta.length();
            let error = length - self.rest_lengths[index];
            if error.abs() <= self.options.length_epsilon || length <= self.options.axis_epsilon {
                continue;
            }

            let correction = delta * (0.5 * error / length);
            self.nodes[index] -= correction;
            self.nodes[parent] += correction;
        }
    }

    fn solve_ground(&mut self, world: &Transform, to_object: &Transform) {
        for node in &mut self.nodes {
            let mut position = world.transform_point(*node);
            if position.y < 0.0 {
                position.y = 0.0;
                *node = to_object.transform_point(position);
            }
        }
    }

    fn relax(
        &mut self,
        skeleton: &Skeleton,
        joint_transforms: &[Transform],
        world: &Transform,
        pose_transforms: &mut [Transform],
    ) {
        self.build_rest_lengths(skeleton, joint_transforms);
        self.unconstrained.clear();
        self.unconstrained.extend_from_slice(pose_transforms);
        self.nodes.clear();
        self.nodes
            .extend(pose_transforms.iter().map(|transform| transform.translation));

        let to_object = world.inverse();
        for _ in 0..self.options.solver_iterations {
            self.solve_lengths(skeleton);
            self.solve_ground(world, &to_object);
        }

        for (index, joint) in skeleton.joints().iter().enumerate() {
            let target = &mut pose_transforms[index];
            target.translation = self.nodes[index];

            let Some(parent) = joint.parent else {
                continue;
            };

            let reference_axis =
                self.unconstrained[index].translation - self.unconstrained[parent].translation;
            let solved_axis = self.nodes[index] - self.nodes[parent];
            let epsilon = self.options.axis_epsilon;
            if reference_axis.length_squared() <= epsilon * epsilon
                || solved_axis.length_squared() <= epsilon * epsilon
            {
                log::trace!("Skipping rotation for degenerate bone {index}");
                continue;
            }

            let correction =
                Quat::from_rotation_arc(reference_axis.normalize(), solved_axis.normalize());
            target.rotation = (correction * target.rotation).normalize();
        }
    }
}

impl PoseController for IkPoseController {
    fn evaluate(
        &mut self,
        ctx: &EvaluationContext<'_>,
        pose_transforms: &mut Vec<Transform>,
    ) -> bool {
        let count = ctx.skeleton.joint_count();
        if ctx.joint_transforms.len() < count {
            return true;
        }

        let continue_updating = match self.inner.as_mut() {
            Some(inner) => inner.evaluate(ctx, pose_transforms),
            None => {
                pose_transforms.clear();
                true
            }
        };

        pose_transforms.truncate(count);
        let produced = pose_transforms.len();
        pose_transforms.extend_from_slice(&ctx.joint_transforms[produced..count]);

        self.relax(
            ctx.skeleton,
            ctx.joint_transforms,
            &ctx.world_transform,
            pose_transforms,
        );

        continue_updating
    }

    fn estimate_velocities(&self, skeleton: &Skeleton) -> Option<Vec<JointVelocity>> {
        // IK corrections are not reflected in velocities
        self.inner
            .as_ref()
            .and_then(|inner| inner.estimate_velocities(skeleton))
    }

    fn set_transform(&mut self, world_transform: &Transform) {
        if let Some(inner) = self.inner.as_mut() {
            inner.set_transform(world_transform);
        }
    }

    fn set_state(&mut self, name: NameHandle) -> bool {
        self.inner.as_mut().is_some_and(|inner| inner.set_state(name))
    }

    fn set_condition(&mut self, name: NameHandle, enabled: bool) {
        if let Some(inner) = self.inner.as_mut() {
            inner.set_condition(name, enabled);
        }
    }

    fn set_time_factor(&mut self, factor: f32) {
        if let Some(inner) = self.inner.as_mut() {
            inner.set_time_factor(factor);
        }
    }
}
