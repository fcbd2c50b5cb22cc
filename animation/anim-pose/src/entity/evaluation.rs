//! Pose evaluation work, inline or on the rayon pool
//!
//! Everything one evaluation touches is moved into an [`EvaluationJob`]:
//! the controller, the pose buffers and the skin slot being written. While a
//! job is in flight the entity owns none of it, so reading before the job is
//! joined is impossible rather than merely forbidden.

use std::sync::Arc;
use std::sync::mpsc;

use glam::{Vec3, Vec4};

use super::EntityOptions;
use crate::controller::{EvaluationContext, PoseController};
use crate::hierarchy::calculate_joint_transforms;
use crate::skeleton::Skeleton;
use crate::transform::Transform;

/// Skeleton-derived data, rebuilt when the skeleton changes
#[derive(Debug, Clone)]
pub(crate) struct BoundSkeleton {
    pub(crate) skeleton: Arc<Skeleton>,
    /// Object-space bind transforms
    pub(crate) joint_transforms: Vec<Transform>,
    pub(crate) inverse_bind: Vec<Transform>,
}

impl BoundSkeleton {
    pub(crate) fn new(skeleton: Arc<Skeleton>) -> Self {
        let joint_transforms = calculate_joint_transforms(&skeleton);
        let inverse_bind = joint_transforms.iter().map(Transform::inverse).collect();
        Self {
            skeleton,
            joint_transforms,
            inverse_bind,
        }
    }

    pub(crate) fn joint_count(&self) -> usize {
        self.joint_transforms.len()
    }

    /// Bring a pose buffer to full length, filling gaps with bind transforms
    pub(crate) fn pad(&self, pose_transforms: &mut Vec<Transform>) {
        let count = self.joint_count();
        pose_transforms.truncate(count);
        let produced = pose_transforms.len();
        pose_transforms.extend_from_slice(&self.joint_transforms[produced..]);
    }

    /// Write skin deltas (pose * inverse bind) for the given joints
    pub(crate) fn write_skin(
        &self,
        pose_transforms: &[Transform],
        joints: impl IntoIterator<Item = usize>,
        target: &mut [Vec4],
    ) {
        for index in joints {
            let (Some(pose), Some(inverse_bind)) =
                (pose_transforms.get(index), self.inverse_bind.get(index))
            else {
                continue;
            };
            let Some(slot) = target.get_mut(index * 2..index * 2 + 2) else {
                continue;
            };
            slot.copy_from_slice(&pose.mul(inverse_bind).to_packed());
        }
    }
}

/// Per-entity evaluation state
#[derive(Debug)]
pub(crate) struct Evaluator {
    pub(crate) controller: Option<Box<dyn PoseController>>,
    pub(crate) bound: Option<BoundSkeleton>,
    pub(crate) pose_transforms: Vec<Transform>,
    pub(crate) previous_pose_transforms: Vec<Transform>,
    /// Placement set by gameplay code, before normalization
    pub(crate) world_transform: Transform,
    /// Object-space offset removed by the last normalization
    pub(crate) normalize_offset: Vec3,
    pub(crate) options: EntityOptions,
    pub(crate) continue_updating: bool,
}

impl Evaluator {
    pub(crate) fn new(options: EntityOptions) -> Self {
        Self {
            controller: None,
            bound: None,
            pose_transforms: Vec::new(),
            previous_pose_transforms: Vec::new(),
            world_transform: Transform::IDENTITY,
            normalize_offset: Vec3::ZERO,
            options,
            continue_updating: true,
        }
    }

    /// Entity placement including the offset taken out of the pose
    pub(crate) fn placement(&self) -> Transform {
        self.world_transform
            .mul(&Transform::from_translation(self.normalize_offset))
    }

    /// Evaluate the controller and write skin deltas into `target`
    pub(crate) fn run(&mut self, time: f32, delta_time: f32, target: &mut [Vec4]) {
        let Some(bound) = &self.bound else {
            return;
        };

        self.previous_pose_transforms
            .clone_from(&self.pose_transforms);

        if let Some(controller) = self.controller.as_mut() {
            let ctx = EvaluationContext {
                time,
                delta_time,
                world_transform: self.world_transform,
                skeleton: &bound.skeleton,
                joint_transforms: &bound.joint_transforms,
            };
            self.continue_updating = controller.evaluate(&ctx, &mut self.pose_transforms);
        }

        bound.pad(&mut self.pose_transforms);

        self.normalize_offset = Vec3::ZERO;
        if self.options.normalize_pose && !self.pose_transforms.is_empty() {
            let sum: Vec3 = self.pose_transforms.iter().map(|t| t.translation).sum();
            let offset = sum / self.pose_transforms.len() as f32;
            for transform in &mut self.pose_transforms {
                transform.translation -= offset;
            }
            if self.options.normalize_transform {
                self.normalize_offset = offset;
            }
        }

        bound.write_skin(&self.pose_transforms, 0..bound.joint_count(), target);
    }
}

/// Everything needed to evaluate one frame
#[derive(Debug)]
pub(crate) struct EvaluationJob {
    pub(crate) evaluator: Box<Evaluator>,
    pub(crate) slot: usize,
    pub(crate) buffer: Vec<Vec4>,
    pub(crate) time: f32,
    pub(crate) delta_time: f32,
}

impl EvaluationJob {
    pub(crate) fn run(&mut self) {
        self.evaluator
            .run(self.time, self.delta_time, &mut self.buffer);
    }
}

/// Handle to a job running on the rayon pool
#[derive(Debug)]
pub(crate) struct PendingEvaluation {
    receiver: mpsc::Receiver<EvaluationJob>,
    slot: usize,
}

impl PendingEvaluation {
    pub(crate) fn spawn(mut job: EvaluationJob) -> Self {
        let slot = job.slot;
        let (sender, receiver) = mpsc::sync_channel(1);

        rayon::spawn(move || {
            job.run();
            // The entity may have been dropped meanwhile
            let _ = sender.send(job);
        });

        Self { receiver, slot }
    }

    /// Block until the job finishes; Err carries the slot of a lost job
    pub(crate) fn join(self) -> Result<EvaluationJob, usize> {
        self.receiver.recv().map_err(|_| self.slot)
    }
}
