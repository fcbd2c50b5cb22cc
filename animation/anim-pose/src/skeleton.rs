//! Joint hierarchy
//!
//! A [`Skeleton`] is built once when assets load and shared read-only (behind
//! an `Arc`) by every entity that animates it. Construction validates the
//! parent links and precomputes everything the evaluation code looks up per
//! frame: a parent-before-child evaluation order, child lists and the
//! name to index map.

use std::collections::HashMap;

use crate::error::{AnimError, Result};
use crate::name::NameHandle;
use crate::transform::Transform;

/// A node in the joint hierarchy
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub struct Joint {
    /// Interned joint name
    pub name: NameHandle,
    /// Parent joint index (None for roots)
    pub parent: Option<usize>,
    /// Bind transform relative to the parent
    pub local: Transform,
    /// Physical radius, used for bounds
    pub radius: f32,
    /// Physical length of the bone
    pub length: f32,
}

impl Joint {
    /// Create a joint with no physical extent
    pub fn new(name: NameHandle, parent: Option<usize>, local: Transform) -> Self {
        Self {
            name,
            parent,
            local,
            radius: 0.0,
            length: 0.0,
        }
    }

    /// Set radius and length
    pub fn with_extent(mut self, radius: f32, length: f32) -> Self {
        self.radius = radius;
        self.length = length;
        self
    }

    /// Check if this joint has no parent
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// Validated joint hierarchy
#[derive(Debug, Clone)]
pub struct Skeleton {
    joints: Vec<Joint>,
    order: Vec<usize>,
    children: Vec<Vec<usize>>,
    lookup: HashMap<NameHandle, usize>,
}

impl Skeleton {
    /// Build a skeleton from joints in storage order
    ///
    /// Storage order does not have to put parents first; the evaluation
    /// order is computed here.
    pub fn new(joints: Vec<Joint>) -> Result<Self> {
        let count = joints.len();
        let mut children = vec![Vec::new(); count];
        let mut lookup = HashMap::with_capacity(count);

        for (index, joint) in joints.iter().enumerate() {
            if let Some(parent) = joint.parent {
                if parent >= count {
                    return Err(AnimError::InvalidParent {
                        joint: index,
                        parent,
                        count,
                    });
                }
                children[parent].push(index);
            }

            if let Some(first) = lookup.insert(joint.name, index) {
                return Err(AnimError::DuplicateJoint {
                    name: joint.name.raw(),
                    first,
                    second: index,
                });
            }
        }

        let order = Self::compute_order(&joints, &children)?;

        Ok(Self {
            joints,
            order,
            children,
            lookup,
        })
    }

    /// Breadth-first walk from every root; anything left unvisited sits on a cycle
    fn compute_order(joints: &[Joint], children: &[Vec<usize>]) -> Result<Vec<usize>> {
        let mut order: Vec<usize> = joints
            .iter()
            .enumerate()
            .filter(|(_, joint)| joint.is_root())
            .map(|(index, _)| index)
            .collect();

        let mut cursor = 0;
        while cursor < order.len() {
            let index = order[cursor];
            order.extend_from_slice(&children[index]);
            cursor += 1;
        }

        if order.len() != joints.len() {
            let mut visited = vec![false; joints.len()];
            for &index in &order {
                visited[index] = true;
            }
            let first_missing = visited.iter().position(|v| !v).unwrap_or(0);
            return Err(AnimError::HierarchyCycle(first_missing));
        }

        Ok(order)
    }

    /// Number of joints
    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    /// Check if the skeleton has no joints
    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }

    /// Get a joint by index
    pub fn joint(&self, index: usize) -> Option<&Joint> {
        self.joints.get(index)
    }

    /// All joints in storage order
    pub fn joints(&self) -> &[Joint] {
        &self.joints
    }

    /// Parent of a joint
    pub fn parent(&self, index: usize) -> Option<usize> {
        self.joints.get(index).and_then(|joint| joint.parent)
    }

    /// Find a joint index by name
    pub fn find_joint(&self, name: NameHandle) -> Option<usize> {
        self.lookup.get(&name).copied()
    }

    /// Direct children of a joint
    pub fn find_children(&self, index: usize) -> &[usize] {
        self.children.get(index).map_or(&[], Vec::as_slice)
    }

    /// All descendants of a joint, depth first, excluding the joint itself
    pub fn descendants(&self, index: usize) -> Vec<usize> {
        let mut result = Vec::new();
        let mut stack: Vec<usize> = self.find_children(index).iter().rev().copied().collect();

        while let Some(current) = stack.pop() {
            result.push(current);
            stack.extend(self.find_children(current).iter().rev());
        }

        result
    }

    /// Joint indices ordered so every parent precedes its children
    pub fn evaluation_order(&self) -> &[usize] {
        &self.order
    }

    /// Replace a joint's bind transform (authoring only)
    pub fn set_local_transform(&mut self, index: usize, local: Transform) -> Result<()> {
        let count = self.joints.len();
        let joint = self
            .joints
            .get_mut(index)
            .ok_or(AnimError::JointOutOfRange { index, count })?;
        joint.local = local;
        Ok(())
    }
}
