//! State graph resources
//!
//! States live in an arena and are referred to by [`StateId`]. Transitions
//! are directed edges between ids, so graphs may loop freely without any
//! ownership cycles. A graph is immutable once built and is shared behind an
//! `Arc` by the controllers playing it.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::clip::AnimationClip;
use crate::error::{AnimError, Result};
use crate::hierarchy::blend_poses;
use crate::name::{NameHandle, NameTable};
use crate::pose::Pose;

/// Index of a state inside its graph
pub type StateId = usize;

/// Animation produced by a state
#[derive(Debug, Clone)]
pub enum Motion {
    /// Bind pose, zero duration
    Empty,
    /// A single clip
    Clip(Arc<dyn AnimationClip>),
    /// Two motions blended with a fixed weight
    Blend {
        a: Box<Motion>,
        b: Box<Motion>,
        weight: f32,
    },
}

impl Motion {
    /// Duration of the motion in seconds
    pub fn duration(&self) -> f32 {
        match self {
            Self::Empty => 0.0,
            Self::Clip(clip) => clip.duration(),
            Self::Blend { a, b, .. } => a.duration().max(b.duration()),
        }
    }

    /// Sample the motion at `time` into `pose`
    pub fn sample(&self, time: f32, pose: &mut Pose) {
        match self {
            Self::Empty => {}
            Self::Clip(clip) => clip.sample(time, pose),
            Self::Blend { a, b, weight } => {
                let mut pose_a = Pose::new();
                let mut pose_b = Pose::new();
                a.sample(time, &mut pose_a);
                b.sample(time, &mut pose_b);
                blend_poses(&pose_a, &pose_b, *weight, pose);
            }
        }
    }
}

/// Per-state playback context
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateContext {
    /// State being played
    pub state: StateId,
    /// Local clock in seconds
    pub clock: f32,
    /// Duration of the state's motion
    pub duration: f32,
}

impl StateContext {
    /// Seconds left before the motion ends, never negative
    pub fn remaining(&self) -> f32 {
        (self.duration - self.clock).max(0.0)
    }
}

/// A node of the state graph
#[derive(Debug, Clone)]
pub struct StateNode {
    /// Interned state name
    pub name: NameHandle,
    /// What the state plays
    pub motion: Motion,
    /// Playback speed multiplier
    pub speed: f32,
}

impl StateNode {
    /// Fresh playback context for entering this state
    pub fn prepare(&self, id: StateId) -> StateContext {
        StateContext {
            state: id,
            clock: 0.0,
            duration: self.motion.duration(),
        }
    }

    /// Sample the state at its local clock, then advance that clock
    pub fn evaluate(&self, ctx: &mut StateContext, delta: f32, pose: &mut Pose) {
        pose.clear();
        self.motion.sample(ctx.clock, pose);
        ctx.clock += delta * self.speed;
    }
}

/// When a transition may fire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub enum TransitionMoment {
    /// As soon as its condition holds
    #[default]
    Immediate,
    /// Only once the source state is within the cross-fade of its end
    AtEnd,
}

/// Named boolean flag test, optionally negated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Condition {
    /// Flag name
    pub flag: NameHandle,
    /// Whether the flag must be false
    pub negated: bool,
}

impl Condition {
    /// Parse `"flag"` or `"!flag"`; empty expressions yield None
    pub fn parse(expression: &str, names: &mut NameTable) -> Option<Self> {
        let expression = expression.trim();
        let (negated, flag) = match expression.strip_prefix('!') {
            Some(rest) => (true, rest.trim()),
            None => (false, expression),
        };

        if flag.is_empty() {
            return None;
        }

        Some(Self {
            flag: names.intern(flag),
            negated,
        })
    }

    /// Evaluate against a flag table; absent flags are false
    pub fn evaluate(&self, flags: &HashMap<NameHandle, bool>) -> bool {
        let value = flags.get(&self.flag).copied().unwrap_or(false);
        value != self.negated
    }
}

/// Directed edge between two states
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    /// Source state
    pub from: StateId,
    /// Target state; transitions without a target never fire
    pub to: Option<StateId>,
    /// Gate on when the transition may fire
    pub moment: TransitionMoment,
    /// Flag test, None for default transitions
    pub condition: Option<Condition>,
    /// Cross-fade duration in seconds
    pub duration: f32,
}

impl Transition {
    /// Check the moment gate against the source state's playback
    pub fn moment_passes(&self, current: &StateContext) -> bool {
        match self.moment {
            TransitionMoment::Immediate => true,
            TransitionMoment::AtEnd => current.remaining() <= self.duration,
        }
    }
}

/// Immutable state machine definition
#[derive(Clone, Default)]
pub struct StateGraph {
    states: Vec<StateNode>,
    transitions: Vec<Transition>,
    root: Option<StateId>,
}

impl StateGraph {
    /// Start building a graph
    pub fn builder() -> StateGraphBuilder {
        StateGraphBuilder::default()
    }

    /// Designated start state, None for an empty graph
    pub fn root(&self) -> Option<StateId> {
        self.root
    }

    /// Get a state by id
    pub fn state(&self, id: StateId) -> Option<&StateNode> {
        self.states.get(id)
    }

    /// All states
    pub fn states(&self) -> &[StateNode] {
        &self.states
    }

    /// All transitions in authored order
    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    /// Find a state by name
    pub fn find_state(&self, name: NameHandle) -> Option<StateId> {
        self.states.iter().position(|state| state.name == name)
    }
}

impl fmt::Debug for StateGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateGraph")
            .field("states", &self.states.len())
            .field("transitions", &self.transitions.len())
            .field("root", &self.root)
            .finish()
    }
}

/// Builder validating state references
#[derive(Debug, Default)]
pub struct StateGraphBuilder {
    states: Vec<StateNode>,
    transitions: Vec<Transition>,
    root: Option<StateId>,
}

impl StateGraphBuilder {
    /// Add a state playing `motion` at normal speed
    pub fn add_state(&mut self, name: NameHandle, motion: Motion) -> StateId {
        self.add_state_with_speed(name, motion, 1.0)
    }

    /// Add a state with a playback speed multiplier
    pub fn add_state_with_speed(&mut self, name: NameHandle, motion: Motion, speed: f32) -> StateId {
        self.states.push(StateNode {
            name,
            motion,
            speed,
        });
        self.states.len() - 1
    }

    /// Add a transition; `condition` may be empty or start with `!`
    pub fn add_transition(
        &mut self,
        from: StateId,
        to: Option<StateId>,
        moment: TransitionMoment,
        condition: &str,
        duration: f32,
        names: &mut NameTable,
    ) -> &mut Self {
        self.transitions.push(Transition {
            from,
            to,
            moment,
            condition: Condition::parse(condition, names),
            duration: duration.max(0.0),
        });
        self
    }

    /// Set the start state
    pub fn root(&mut self, id: StateId) -> &mut Self {
        self.root = Some(id);
        self
    }

    /// Validate and produce the graph
    pub fn build(self) -> Result<StateGraph> {
        let count = self.states.len();

        if let Some(root) = self.root.filter(|&root| root >= count) {
            return Err(AnimError::InvalidGraph(format!(
                "root state {root} out of range ({count} states)"
            )));
        }

        for (index, transition) in self.transitions.iter().enumerate() {
            let out_of_range = transition.from >= count
                || transition.to.is_some_and(|to| to >= count);
            if out_of_range {
                return Err(AnimError::InvalidGraph(format!(
                    "transition {index} refers to a missing state ({count} states)"
                )));
            }
        }

        let mut seen = HashMap::with_capacity(count);
        for (index, state) in self.states.iter().enumerate() {
            if let Some(first) = seen.insert(state.name, index) {
                return Err(AnimError::InvalidGraph(format!(
                    "states {first} and {index} share a name"
                )));
            }
        }

        Ok(StateGraph {
            states: self.states,
            transitions: self.transitions,
            root: self.root,
        })
    }
}
