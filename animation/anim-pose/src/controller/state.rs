//! State graph playback with timed cross-fades

use std::collections::HashMap;
use std::f32::consts::FRAC_PI_2;
use std::sync::Arc;

use super::{EvaluationContext, PoseController};
use crate::graph::{StateContext, StateGraph, StateId, Transition};
use crate::hierarchy::{blend_poses, calculate_pose_transforms_into};
use crate::name::NameHandle;
use crate::pose::Pose;
use crate::transform::Transform;

/// Plays a [`StateGraph`], cross-fading between states as transitions fire
///
/// The controller is in one of three situations: no state (no graph bound
/// yet, or an empty graph), a single state playing, or a transition in
/// flight blending the current state into the next one.
#[derive(Debug)]
pub struct StatePoseController {
    graph: Option<Arc<StateGraph>>,
    reset_pending: bool,
    current: Option<StateContext>,
    next: Option<StateContext>,
    transition_elapsed: f32,
    transition_duration: f32,
    conditions: HashMap<NameHandle, bool>,
    time_factor: f32,
    current_pose: Pose,
    next_pose: Pose,
    blended_pose: Pose,
}

impl StatePoseController {
    /// Create a controller playing `graph`
    pub fn new(graph: Option<Arc<StateGraph>>) -> Self {
        Self {
            graph,
            reset_pending: true,
            current: None,
            next: None,
            transition_elapsed: 0.0,
            transition_duration: 0.0,
            conditions: HashMap::new(),
            time_factor: 1.0,
            current_pose: Pose::new(),
            next_pose: Pose::new(),
            blended_pose: Pose::new(),
        }
    }

    /// Bind a different graph; playback restarts at its root on the next evaluation
    pub fn set_graph(&mut self, graph: Option<Arc<StateGraph>>) {
        self.graph = graph;
        self.reset_pending = true;
    }

    /// Bound graph
    pub fn graph(&self) -> Option<&Arc<StateGraph>> {
        self.graph.as_ref()
    }

    /// State currently playing
    pub fn current_state(&self) -> Option<StateId> {
        self.current.map(|ctx| ctx.state)
    }

    /// Target of the in-flight transition
    pub fn next_state(&self) -> Option<StateId> {
        self.next.map(|ctx| ctx.state)
    }

    /// Playback context of the current state
    pub fn current_context(&self) -> Option<&StateContext> {
        self.current.as_ref()
    }

    /// Seconds spent in the in-flight transition
    pub fn transition_elapsed(&self) -> f32 {
        self.transition_elapsed
    }

    /// Value of a condition flag; unset flags are false
    pub fn condition(&self, name: NameHandle) -> bool {
        self.conditions.get(&name).copied().unwrap_or(false)
    }

    /// Current time factor
    pub fn time_factor(&self) -> f32 {
        self.time_factor
    }

    fn reset(&mut self, graph: &StateGraph) {
        self.reset_pending = false;
        self.current = graph
            .root()
            .and_then(|root| graph.state(root).map(|node| node.prepare(root)));
        self.next = None;
        self.transition_elapsed = 0.0;
        self.transition_duration = 0.0;
        log::debug!("State graph reset to root {:?}", self.current_state());
    }

    /// First eligible transition out of the current state
    ///
    /// Conditional transitions are considered before default ones. Within
    /// each group authored order decides.
    fn select_transition<'g>(
        &self,
        graph: &'g StateGraph,
        current: &StateContext,
    ) -> Option<&'g Transition> {
        let outgoing = || {
            graph
                .transitions()
                .iter()
                .filter(|t| t.from == current.state && t.to.is_some())
        };

        outgoing()
            .filter(|t| {
                t.condition
                    .is_some_and(|condition| condition.evaluate(&self.conditions))
            })
            .find(|t| t.moment_passes(current))
            .or_else(|| {
                outgoing()
                    .filter(|t| t.condition.is_none())
                    .find(|t| t.moment_passes(current))
            })
    }

    fn begin_transition(&mut self, graph: &StateGraph, transition: &Transition) {
        let Some(to) = transition.to else {
            return;
        };
        let Some(node) = graph.state(to) else {
            return;
        };

        log::debug!(
            "Transition {} -> {} over {}s",
            transition.from,
            to,
            transition.duration
        );
        self.next = Some(node.prepare(to));
        self.transition_elapsed = 0.0;
        self.transition_duration = transition.duration;
    }
}

impl PoseController for StatePoseController {
    fn evaluate(
        &mut self,
        ctx: &EvaluationContext<'_>,
        pose_transforms: &mut Vec<Transform>,
    ) -> bool {
        let Some(graph) = self.graph.clone() else {
            return true;
        };
        if self.reset_pending {
            self.reset(&graph);
        }

        let Some(mut current) = self.current else {
            return true;
        };
        let Some(current_node) = graph.state(current.state) else {
            return true;
        };

        let skeleton = ctx.skeleton;
        let delta = ctx.delta_time * self.time_factor;
        current_node.evaluate(&mut current, delta, &mut self.current_pose);
        self.current = Some(current);

        match self.next {
            Some(mut next) => {
                if let Some(next_node) = graph.state(next.state) {
                    next_node.evaluate(&mut next, delta, &mut self.next_pose);
                }
                self.transition_elapsed += delta;

                if self.transition_duration > 0.0 {
                    let progress = (self.transition_elapsed / self.transition_duration).min(1.0);
                    let weight = (progress * FRAC_PI_2).sin();
                    blend_poses(
                        &self.current_pose,
                        &self.next_pose,
                        weight,
                        &mut self.blended_pose,
                    );
                    calculate_pose_transforms_into(skeleton, &self.blended_pose, pose_transforms);
                } else {
                    calculate_pose_transforms_into(skeleton, &self.next_pose, pose_transforms);
                }

                if self.transition_elapsed >= self.transition_duration {
                    log::debug!("Transition committed to state {}", next.state);
                    self.current = Some(next);
                    self.next = None;
                } else {
                    self.next = Some(next);
                }
            }
            None => {
                calculate_pose_transforms_into(skeleton, &self.current_pose, pose_transforms);

                if let Some(transition) = self.select_transition(&graph, &current) {
                    let transition = transition.clone();
                    self.begin_transition(&graph, &transition);
                }
            }
        }

        true
    }

    fn set_state(&mut self, name: NameHandle) -> bool {
        let Some(graph) = self.graph.clone() else {
            return false;
        };
        let Some(id) = graph.find_state(name) else {
            return false;
        };
        let Some(node) = graph.state(id) else {
            return false;
        };

        self.reset_pending = false;
        self.current = Some(node.prepare(id));
        self.next = None;
        self.transition_elapsed = 0.0;
        self.transition_duration = 0.0;
        true
    }

    fn set_condition(&mut self, name: NameHandle, enabled: bool) {
        self.conditions.insert(name, enabled);
    }

    fn set_time_factor(&mut self, factor: f32) {
        self.time_factor = factor;
    }
}
