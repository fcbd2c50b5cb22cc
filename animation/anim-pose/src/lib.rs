//! Skeletal pose evaluation and animated-entity runtime
//!
//! The crate is layered bottom-up:
//!
//! - [`skeleton`], [`pose`] and [`hierarchy`]: joint hierarchy, sparse local
//!   pose overrides, transform propagation, pose blending and bounds
//! - [`clip`], [`graph`] and [`time`]: sampled motion sources
//! - [`controller`]: pose controllers (single clip, state graph, IK)
//! - [`entity`]: per-entity evaluation with buffered skin transforms
//!
//! ```
//! use std::sync::Arc;
//! use anim_pose::{AnimatedEntity, Joint, NameTable, Skeleton, Transform};
//! use glam::Vec3;
//!
//! let mut names = NameTable::new();
//! let skeleton = Skeleton::new(vec![
//!     Joint::new(names.intern("root"), None, Transform::IDENTITY),
//!     Joint::new(names.intern("spine"), Some(0), Transform::from_translation(Vec3::Y)),
//! ])?;
//!
//! let mut entity = AnimatedEntity::default();
//! entity.set_skeleton(Some(Arc::new(skeleton)));
//! entity.update(1.0 / 60.0);
//! assert_eq!(entity.skin_transforms().len(), 4);
//! # Ok::<(), anim_pose::AnimError>(())
//! ```

pub mod clip;
pub mod controller;
pub mod entity;
pub mod error;
pub mod graph;
pub mod hierarchy;
pub mod name;
pub mod pose;
pub mod skeleton;
pub mod time;
pub mod transform;

// Re-export common types
pub use clip::{AnimationClip, Interpolation, JointTrack, KeyframeClip, KeyframeTrack};
pub use controller::{
    EvaluationContext, IkOptions, IkPoseController, JointVelocity, PoseController,
    SimpleAnimationController, StatePoseController,
};
pub use entity::{
    AnimatedEntity, EntityOptions, RenderPass, RenderView, SkinnedMeshRenderer, UpdatePhase,
};
pub use error::{AnimError, Result};
pub use graph::{Motion, StateGraph, StateGraphBuilder, StateId, TransitionMoment};
pub use hierarchy::{BoundingBox, blend_poses, calculate_joint_transforms, calculate_pose_transforms};
pub use name::{NameHandle, NameTable};
pub use pose::Pose;
pub use skeleton::{Joint, Skeleton};
pub use time::{SharedClock, TimeSource};
pub use transform::{Lerp, Transform};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
