//! Single clip playback

use std::sync::Arc;

use super::{EvaluationContext, JointVelocity, PoseController};
use crate::clip::AnimationClip;
use crate::hierarchy::calculate_pose_transforms_into;
use crate::pose::Pose;
use crate::skeleton::Skeleton;
use crate::time::TimeSource;
use crate::transform::Transform;

/// Plays one clip, sampled at the time reported by a [`TimeSource`]
///
/// Without a time source the entity time from the evaluation context is
/// used. A missing clip turns evaluation into a no-op.
#[derive(Debug)]
pub struct SimpleAnimationController {
    clip: Option<Arc<dyn AnimationClip>>,
    time_source: Option<Arc<dyn TimeSource>>,
    time_factor: f32,
    last_time: Option<f32>,
    pose: Pose,
    /// Last two evaluated outputs, for velocity estimation
    previous_transforms: Vec<Transform>,
    current_transforms: Vec<Transform>,
    history_delta: f32,
}

impl SimpleAnimationController {
    /// Create a controller playing `clip`
    pub fn new(clip: Option<Arc<dyn AnimationClip>>) -> Self {
        Self {
            clip,
            time_source: None,
            time_factor: 1.0,
            last_time: None,
            pose: Pose::new(),
            previous_transforms: Vec::new(),
            current_transforms: Vec::new(),
            history_delta: 0.0,
        }
    }

    /// Sample at the time reported by `source`
    pub fn with_time_source(mut self, source: Arc<dyn TimeSource>) -> Self {
        self.time_source = Some(source);
        self
    }

    /// Replace the clip
    pub fn set_clip(&mut self, clip: Option<Arc<dyn AnimationClip>>) {
        self.clip = clip;
        self.clear_history();
    }

    /// Currently bound clip
    pub fn clip(&self) -> Option<&Arc<dyn AnimationClip>> {
        self.clip.as_ref()
    }

    /// Time the clip was last sampled at
    pub fn last_time(&self) -> Option<f32> {
        self.last_time
    }

    /// The pose sampled on the last evaluation
    pub fn pose(&self) -> &Pose {
        &self.pose
    }

    fn clear_history(&mut self) {
        self.previous_transforms.clear();
        self.current_transforms.clear();
        self.history_delta = 0.0;
    }
}

impl PoseController for SimpleAnimationController {
    fn evaluate(
        &mut self,
        ctx: &EvaluationContext<'_>,
        pose_transforms: &mut Vec<Transform>,
    ) -> bool {
        let Some(clip) = &self.clip else {
            return true;
        };

        let base_time = self
            .time_source
            .as_ref()
            .map_or(ctx.time, |source| source.time());
        let time = base_time * self.time_factor;

        self.pose.clear();
        clip.sample(time, &mut self.pose);
        calculate_pose_transforms_into(ctx.skeleton, &self.pose, pose_transforms);

        std::mem::swap(&mut self.previous_transforms, &mut self.current_transforms);
        self.current_transforms.clone_from(pose_transforms);
        self.history_delta = self.last_time.map_or(0.0, |last| time - last);
        self.last_time = Some(time);

        true
    }

    fn estimate_velocities(&self, skeleton: &Skeleton) -> Option<Vec<JointVelocity>> {
        let count = skeleton.joint_count();
        if self.history_delta.abs() <= f32::EPSILON
            || self.previous_transforms.len() < count
            || self.current_transforms.len() < count
        {
            return None;
        }

        let inv_dt = 1.0 / self.history_delta;
        let velocities = self
            .previous_transforms
            .iter()
            .zip(&self.current_transforms)
            .take(count)
            .map(|(previous, current)| {
                let mut delta = current.rotation * previous.rotation.conjugate();
                if delta.w < 0.0 {
                    delta = -delta;
                }
                JointVelocity {
                    linear: (current.translation - previous.translation) * inv_dt,
                    angular: delta.to_scaled_axis() * inv_dt,
                }
            })
            .collect();

        Some(velocities)
    }

    fn set_transform(&mut self, _world_transform: &Transform) {
        // A teleport is not motion
        self.clear_history();
    }

    fn set_time_factor(&mut self, factor: f32) {
        self.time_factor = factor;
    }
}
