//! Pose controllers
//!
//! A pose controller turns elapsed time into object-space joint transforms.
//! Controllers are owned by the entity evaluating them; decorators such as
//! [`IkPoseController`] own the controller they wrap, so a controller stack
//! is always a tree.
//!
//! - [`SimpleAnimationController`]: plays one clip at an external time
//! - [`StatePoseController`]: state graph with conditional cross-fades
//! - [`IkPoseController`]: relaxes another controller's output under bone
//!   length and ground constraints

mod ik;
mod simple;
mod state;

use glam::Vec3;

use crate::name::NameHandle;
use crate::skeleton::Skeleton;
use crate::transform::Transform;

pub use ik::{IkOptions, IkPoseController};
pub use simple::SimpleAnimationController;
pub use state::StatePoseController;

/// Per-tick inputs to [`PoseController::evaluate`]
#[derive(Debug, Clone, Copy)]
pub struct EvaluationContext<'a> {
    /// Accumulated entity time in seconds
    pub time: f32,
    /// Seconds since the previous evaluation
    pub delta_time: f32,
    /// Entity placement in the world
    pub world_transform: Transform,
    /// Skeleton being animated
    pub skeleton: &'a Skeleton,
    /// Object-space bind transforms, one per joint
    pub joint_transforms: &'a [Transform],
}

/// Estimated motion of a single joint
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct JointVelocity {
    /// Units per second, object space
    pub linear: Vec3,
    /// Radians per second as a scaled axis, object space
    pub angular: Vec3,
}

/// Pluggable pose evaluation
pub trait PoseController: Send {
    /// Evaluate the current pose into `pose_transforms`
    ///
    /// Writes object-space transforms indexed by joint. Controllers may leave
    /// the buffer shorter than the skeleton; callers pad the rest with bind
    /// transforms. Returns whether the controller wants further updates.
    fn evaluate(&mut self, ctx: &EvaluationContext<'_>, pose_transforms: &mut Vec<Transform>)
    -> bool;

    /// Per-joint velocities of the most recent evaluation, if tracked
    fn estimate_velocities(&self, _skeleton: &Skeleton) -> Option<Vec<JointVelocity>> {
        None
    }

    /// Notify the controller that the entity was placed explicitly
    fn set_transform(&mut self, _world_transform: &Transform) {}

    /// Jump to a named state; returns false if the controller has no such state
    fn set_state(&mut self, _name: NameHandle) -> bool {
        false
    }

    /// Set a named boolean condition
    fn set_condition(&mut self, _name: NameHandle, _enabled: bool) {}

    /// Scale applied to elapsed time
    fn set_time_factor(&mut self, _factor: f32) {}
}

impl std::fmt::Debug for dyn PoseController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("dyn PoseController")
    }
}
