//! Animated entity: controller evaluation feeding buffered skin transforms
//!
//! Each [`AnimatedEntity::update`] evaluates the pose controller (unless the
//! throttle or an idle controller says otherwise), converts the pose into skin
//! deltas relative to the bind pose and settles them into the next ring slot.
//! Rendering blends the two most recent settled slots by a sub-frame
//! fraction.
//!
//! With [`EntityOptions::async_evaluation`] the evaluation runs on the rayon
//! pool. Every accessor joins an outstanding evaluation before touching any
//! buffer, which is why they take `&mut self`.

mod evaluation;
mod ring;
mod throttle;

use std::sync::Arc;

use glam::Vec4;

use crate::controller::{JointVelocity, PoseController};
use crate::hierarchy::{BoundingBox, bounding_box_from_transforms};
use crate::name::NameHandle;
use crate::skeleton::Skeleton;
use crate::transform::Transform;

use evaluation::{BoundSkeleton, EvaluationJob, Evaluator, PendingEvaluation};
use ring::SkinRing;
use throttle::UpdateThrottle;

pub use throttle::RenderPass;

/// Options for controlling entity evaluation
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub struct EntityOptions {
    /// Re-center the pose on the mean joint translation
    pub normalize_pose: bool,
    /// Move the entity by the removed offset so the mesh does not shift
    /// (only with `normalize_pose`)
    pub normalize_transform: bool,
    /// Evaluate on the rayon pool instead of inside `update`
    pub async_evaluation: bool,
    /// Tick interval used while the entity is drawn only in shadow passes
    pub throttle_interval: u32,
}

impl Default for EntityOptions {
    fn default() -> Self {
        Self {
            normalize_pose: false,
            normalize_transform: false,
            async_evaluation: false,
            throttle_interval: 4,
        }
    }
}

/// Per-render inputs supplied by the view
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderView {
    /// Position between the previous and current simulation tick, 0..=1
    pub fraction: f32,
    /// Distance from the camera
    pub distance: f32,
    /// Pass the entity is drawn in
    pub pass: RenderPass,
}

/// Mesh renderer consuming skin transforms
pub trait SkinnedMeshRenderer {
    /// Number of joints the mesh is skinned to
    fn joint_count(&self) -> usize;

    /// Draw with two `Vec4`s (rotation, translation) per joint
    fn render(&mut self, skin_transforms: &[Vec4], distance: f32);
}

/// Where the entity is in its per-frame update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdatePhase {
    /// The controller asked for no further updates
    Idle,
    /// An evaluation is running in the background
    InFlight,
    /// Buffers hold a complete frame
    Settled,
}

/// An entity animated by a pose controller
#[derive(Debug)]
pub struct AnimatedEntity {
    options: EntityOptions,
    skeleton: Option<Arc<Skeleton>>,
    mesh_joint_count: usize,
    evaluator: Option<Box<Evaluator>>,
    pending: Option<PendingEvaluation>,
    ring: SkinRing,
    throttle: UpdateThrottle,
    time: f32,
}

impl AnimatedEntity {
    /// Create an entity with no skeleton or controller bound
    pub fn new(options: EntityOptions) -> Self {
        Self {
            options,
            skeleton: None,
            mesh_joint_count: 0,
            evaluator: Some(Box::new(Evaluator::new(options))),
            pending: None,
            ring: SkinRing::new(),
            throttle: UpdateThrottle::new(options.throttle_interval),
            time: 0.0,
        }
    }

    /// Wait for an outstanding background evaluation
    fn sync(&mut self) {
        let Some(pending) = self.pending.take() else {
            return;
        };

        match pending.join() {
            Ok(job) => {
                self.ring.commit(job.slot, job.buffer);
                self.evaluator = Some(job.evaluator);
            }
            Err(slot) => {
                log::error!("Background pose evaluation lost; controller dropped");
                self.ring.restore(slot);
                self.evaluator = None;
            }
        }
    }

    /// Joined evaluator state
    fn evaluator(&mut self) -> &mut Evaluator {
        self.sync();
        let options = self.options;
        self.evaluator
            .get_or_insert_with(|| Box::new(Evaluator::new(options)))
    }

    /// Rebuild skeleton-derived buffers if the skeleton or mesh changed
    fn rebind_if_needed(&mut self) -> bool {
        let skeleton = self.skeleton.clone();
        let mesh_joint_count = self.mesh_joint_count;
        let evaluator = self.evaluator();

        let skeleton_changed = match (&skeleton, &evaluator.bound) {
            (Some(requested), Some(bound)) => !Arc::ptr_eq(requested, &bound.skeleton),
            (None, None) => false,
            _ => true,
        };

        if skeleton_changed {
            evaluator.bound = skeleton.map(BoundSkeleton::new);
            evaluator.pose_transforms.clear();
            evaluator.previous_pose_transforms.clear();
        }

        let skin_joint_count = evaluator
            .bound
            .as_ref()
            .map_or(0, BoundSkeleton::joint_count)
            .max(mesh_joint_count);

        if skeleton_changed || skin_joint_count != self.ring.joint_count() {
            log::debug!("Rebinding skin buffers for {skin_joint_count} joints");
            self.ring.resize(skin_joint_count);
            return true;
        }

        false
    }

    /// Advance the simulation by `delta_time` seconds
    pub fn update(&mut self, delta_time: f32) {
        self.sync();
        self.time += delta_time;

        if self.rebind_if_needed() {
            self.throttle.force();
        }

        let Some(delta) = self.throttle.begin_tick(delta_time) else {
            log::trace!("Throttled tick, reusing last skin transforms");
            self.ring.duplicate_current();
            return;
        };

        let evaluator = self.evaluator();
        if evaluator.bound.is_none() || !evaluator.continue_updating {
            self.ring.duplicate_current();
            return;
        }

        let Some(evaluator) = self.evaluator.take() else {
            return;
        };
        let (slot, buffer) = self.ring.take_next();
        let mut job = EvaluationJob {
            evaluator,
            slot,
            buffer,
            time: self.time,
            delta_time: delta,
        };

        if self.options.async_evaluation {
            self.pending = Some(PendingEvaluation::spawn(job));
        } else {
            job.run();
            self.ring.commit(job.slot, job.buffer);
            self.evaluator = Some(job.evaluator);
        }
    }

    /// Draw through `renderer`, interpolating the settled frames
    pub fn render(&mut self, view: &RenderView, renderer: &mut dyn SkinnedMeshRenderer) {
        self.sync();
        self.throttle.record_render(view.pass);

        let mesh_joint_count = renderer.joint_count();
        if mesh_joint_count != self.mesh_joint_count {
            self.mesh_joint_count = mesh_joint_count;
            let skeleton_joint_count = self
                .evaluator
                .as_ref()
                .and_then(|evaluator| evaluator.bound.as_ref())
                .map_or(0, BoundSkeleton::joint_count);
            let skin_joint_count = skeleton_joint_count.max(mesh_joint_count);
            if skin_joint_count != self.ring.joint_count() {
                log::debug!("Mesh expects {mesh_joint_count} joints, reshaping skin buffers");
                self.ring.reshape(skin_joint_count);
                self.throttle.force();
            }
        }

        let skin = self.ring.interpolate(view.fraction);
        renderer.render(skin, view.distance);
    }

    /// Current update phase
    pub fn phase(&self) -> UpdatePhase {
        if self.pending.is_some() {
            UpdatePhase::InFlight
        } else if self
            .evaluator
            .as_ref()
            .is_some_and(|evaluator| !evaluator.continue_updating)
        {
            UpdatePhase::Idle
        } else {
            UpdatePhase::Settled
        }
    }

    /// Accumulated simulation time
    pub fn time(&self) -> f32 {
        self.time
    }

    /// Evaluation options
    pub fn options(&self) -> &EntityOptions {
        &self.options
    }

    /// Change evaluation options
    pub fn set_options(&mut self, options: EntityOptions) {
        self.options = options;
        self.throttle.set_interval(options.throttle_interval);
        self.evaluator().options = options;
    }

    /// Bind a skeleton; buffers are rebuilt on the next update
    pub fn set_skeleton(&mut self, skeleton: Option<Arc<Skeleton>>) {
        self.sync();
        self.skeleton = skeleton;
    }

    /// Bound skeleton
    pub fn skeleton(&self) -> Option<&Arc<Skeleton>> {
        self.skeleton.as_ref()
    }

    /// Joint count of the skinned mesh; excess joints stay at bind pose
    pub fn set_mesh_joint_count(&mut self, count: usize) {
        self.sync();
        self.mesh_joint_count = count;
    }

    /// Replace the pose controller
    pub fn set_controller(&mut self, controller: Option<Box<dyn PoseController>>) {
        let evaluator = self.evaluator();
        evaluator.controller = controller;
        evaluator.continue_updating = true;
    }

    /// Access the pose controller; wakes an idle entity
    pub fn controller_mut(&mut self) -> Option<&mut (dyn PoseController + 'static)> {
        let evaluator = self.evaluator();
        evaluator.continue_updating = true;
        evaluator.controller.as_deref_mut()
    }

    /// Take the pose controller out of the entity
    pub fn take_controller(&mut self) -> Option<Box<dyn PoseController>> {
        self.evaluator().controller.take()
    }

    /// Entity placement in the world
    ///
    /// With [`EntityOptions::normalize_transform`] this includes the offset
    /// removed from the pose by the last evaluation.
    pub fn world_transform(&mut self) -> Transform {
        self.evaluator().placement()
    }

    /// Place the entity explicitly
    pub fn set_world_transform(&mut self, transform: Transform) {
        let evaluator = self.evaluator();
        evaluator.world_transform = transform;
        if let Some(controller) = evaluator.controller.as_mut() {
            controller.set_transform(&transform);
        }
    }

    fn joint_index(&mut self, joint: NameHandle) -> Option<usize> {
        self.evaluator()
            .bound
            .as_ref()
            .and_then(|bound| bound.skeleton.find_joint(joint))
    }

    /// Object-space bind transform of a joint
    pub fn joint_transform(&mut self, joint: NameHandle) -> Option<Transform> {
        let index = self.joint_index(joint)?;
        self.evaluator()
            .bound
            .as_ref()
            .and_then(|bound| bound.joint_transforms.get(index).copied())
    }

    /// Object-space transform of a joint in the evaluated pose
    pub fn pose_transform(&mut self, joint: NameHandle) -> Option<Transform> {
        let index = self.joint_index(joint)?;
        self.evaluator().pose_transforms.get(index).copied()
    }

    /// Skin delta of a joint in the current settled frame
    pub fn skin_transform(&mut self, joint: NameHandle) -> Option<Transform> {
        let index = self.joint_index(joint)?;
        let skin = self.ring.current();
        let pair = skin.get(index * 2..index * 2 + 2)?;
        Some(Transform::from_packed(pair[0], pair[1]))
    }

    /// Current settled skin transforms
    pub fn skin_transforms(&mut self) -> &[Vec4] {
        self.sync();
        self.ring.current()
    }

    /// Object-space pose transforms from the last evaluation
    pub fn pose_transforms(&mut self) -> &[Transform] {
        &self.evaluator().pose_transforms
    }

    /// Object-space pose transforms from the evaluation before the last
    pub fn previous_pose_transforms(&mut self) -> &[Transform] {
        &self.evaluator().previous_pose_transforms
    }

    /// Overwrite one joint of the evaluated pose
    ///
    /// With `inclusive`, the change relative to the joint's old transform is
    /// applied to the bind transforms of all its descendants as well. Returns
    /// false if the joint is unknown.
    pub fn set_pose_transform(
        &mut self,
        joint: NameHandle,
        transform: Transform,
        inclusive: bool,
    ) -> bool {
        let Some(index) = self.joint_index(joint) else {
            return false;
        };

        // Joined by the lookup above
        let Some(evaluator) = self.evaluator.as_deref_mut() else {
            return false;
        };
        let Some(bound) = evaluator.bound.as_ref() else {
            return false;
        };

        let pose = &mut evaluator.pose_transforms;
        bound.pad(pose);

        let old = pose[index];
        pose[index] = transform;
        let mut touched = vec![index];

        if inclusive {
            let delta = transform.mul(&old.inverse());
            for descendant in bound.skeleton.descendants(index) {
                pose[descendant] = delta.mul(&bound.joint_transforms[descendant]);
                touched.push(descendant);
            }
        }

        bound.write_skin(pose, touched, self.ring.current_mut());
        true
    }

    /// Object-space bounds of the evaluated pose
    ///
    /// Empty until an update binds a skeleton, then the bind pose until a
    /// pose has been evaluated.
    pub fn bounding_box(&mut self) -> BoundingBox {
        let evaluator = self.evaluator();
        let Some(bound) = evaluator.bound.as_ref() else {
            return BoundingBox::EMPTY;
        };

        if evaluator.pose_transforms.len() == bound.joint_count() {
            bounding_box_from_transforms(&bound.skeleton, &evaluator.pose_transforms)
        } else {
            bounding_box_from_transforms(&bound.skeleton, &bound.joint_transforms)
        }
    }

    /// Joint velocities reported by the controller
    pub fn estimate_velocities(&mut self) -> Option<Vec<JointVelocity>> {
        let evaluator = self.evaluator();
        let bound = evaluator.bound.as_ref()?;
        evaluator
            .controller
            .as_ref()?
            .estimate_velocities(&bound.skeleton)
    }
}

impl Default for AnimatedEntity {
    fn default() -> Self {
        Self::new(EntityOptions::default())
    }
}
