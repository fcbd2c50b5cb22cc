//! Sparse joint-local pose overrides
//!
//! An override is a delta composed onto the joint's bind local transform.

use crate::transform::Transform;

/// A sparse set of joint-local deltas, sorted by joint index
///
/// Joints without an entry keep their bind transform. Each joint index
/// appears at most once.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub struct Pose {
    entries: Vec<(usize, Transform)>,
}

impl Pose {
    /// Create an empty pose
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty pose with room for `capacity` overrides
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    fn search(&self, joint: usize) -> std::result::Result<usize, usize> {
        self.entries.binary_search_by_key(&joint, |(index, _)| *index)
    }

    /// Get the override for a joint
    pub fn get(&self, joint: usize) -> Option<&Transform> {
        self.search(joint).ok().map(|slot| &self.entries[slot].1)
    }

    /// Insert or replace the override for a joint
    pub fn insert(&mut self, joint: usize, transform: Transform) {
        match self.search(joint) {
            Ok(slot) => self.entries[slot].1 = transform,
            Err(slot) => self.entries.insert(slot, (joint, transform)),
        }
    }

    /// Remove the override for a joint
    pub fn remove(&mut self, joint: usize) -> Option<Transform> {
        self.search(joint)
            .ok()
            .map(|slot| self.entries.remove(slot).1)
    }

    /// Check if a joint is overridden
    pub fn contains(&self, joint: usize) -> bool {
        self.search(joint).is_ok()
    }

    /// Drop all overrides
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of overrides
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the pose overrides nothing
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Overrides in joint index order
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Transform)> {
        self.entries.iter().map(|(index, transform)| (*index, transform))
    }

    /// Overridden joint indices in increasing order
    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.entries.iter().map(|(index, _)| *index)
    }

    /// Sorted union of the joint indices of two poses
    pub fn union_indices(&self, other: &Self) -> Vec<usize> {
        let mut result = Vec::with_capacity(self.len().max(other.len()));
        let mut a = self.indices().peekable();
        let mut b = other.indices().peekable();

        loop {
            let next = match (a.peek(), b.peek()) {
                (Some(&x), Some(&y)) if x == y => {
                    a.next();
                    b.next();
                    x
                }
                (Some(&x), Some(&y)) if x < y => {
                    a.next();
                    x
                }
                (Some(_), Some(&y)) => {
                    b.next();
                    y
                }
                (Some(&x), None) => {
                    a.next();
                    x
                }
                (None, Some(&y)) => {
                    b.next();
                    y
                }
                (None, None) => break,
            };
            result.push(next);
        }

        result
    }
}

impl FromIterator<(usize, Transform)> for Pose {
    fn from_iter<I: IntoIterator<Item = (usize, Transform)>>(iter: I) -> Self {
        let mut pose = Pose::new();
        for (joint, transform) in iter {
            pose.insert(joint, transform);
        }
        pose
    }
}
