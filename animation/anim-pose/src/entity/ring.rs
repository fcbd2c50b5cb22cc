//! Triple-buffered skin transforms
//!
//! Two slots hold the most recent settled frames (previous and current); the
//! third is scratch space that receives the render-time interpolation. Each
//! joint occupies two `Vec4`s: rotation (xyzw) then translation (w = 0).

use glam::Vec4;

use crate::transform::{Lerp, Transform};

const SLOTS: usize = 3;

#[derive(Debug, Clone)]
pub(crate) struct SkinRing {
    slots: [Vec<Vec4>; SLOTS],
    previous: usize,
    current: usize,
    scratch: usize,
    joint_count: usize,
}

fn identity_slot(joint_count: usize) -> Vec<Vec4> {
    Transform::IDENTITY
        .to_packed()
        .into_iter()
        .cycle()
        .take(joint_count * 2)
        .collect()
}

impl SkinRing {
    pub(crate) fn new() -> Self {
        Self {
            slots: [Vec::new(), Vec::new(), Vec::new()],
            previous: 0,
            current: 1,
            scratch: 2,
            joint_count: 0,
        }
    }

    /// Reset every slot to `joint_count` identity deltas
    pub(crate) fn resize(&mut self, joint_count: usize) {
        self.joint_count = joint_count;
        for slot in &mut self.slots {
            *slot = identity_slot(joint_count);
        }
    }

    /// Change the joint count keeping settled data; new joints get identity deltas
    pub(crate) fn reshape(&mut self, joint_count: usize) {
        let identity = Transform::IDENTITY.to_packed();
        for slot in &mut self.slots {
            slot.truncate(joint_count * 2);
            let missing = joint_count.saturating_sub(slot.len() / 2);
            for _ in 0..missing {
                slot.extend_from_slice(&identity);
            }
        }
        self.joint_count = joint_count;
    }

    pub(crate) fn joint_count(&self) -> usize {
        self.joint_count
    }

    /// Hand out the oldest settled slot for writing the next frame
    pub(crate) fn take_next(&mut self) -> (usize, Vec<Vec4>) {
        let slot = self.previous;
        (slot, std::mem::take(&mut self.slots[slot]))
    }

    /// Return a written slot; it becomes the current frame
    pub(crate) fn commit(&mut self, slot: usize, buffer: Vec<Vec4>) {
        self.slots[slot] = buffer;
        if slot != self.current {
            self.previous = self.current;
            self.current = slot;
        }
    }

    /// Replace a slot whose buffer was lost with identity deltas
    pub(crate) fn restore(&mut self, slot: usize) {
        self.slots[slot] = identity_slot(self.joint_count);
    }

    /// Settle a frame identical to the current one
    pub(crate) fn duplicate_current(&mut self) {
        if let Ok([target, source]) = self.slots.get_disjoint_mut([self.previous, self.current]) {
            target.clone_from(source);
        }
    }

    /// Current settled frame
    pub(crate) fn current(&self) -> &[Vec4] {
        &self.slots[self.current]
    }

    /// Current settled frame, for direct edits
    pub(crate) fn current_mut(&mut self) -> &mut [Vec4] {
        &mut self.slots[self.current]
    }

    /// Blend previous and current into the scratch slot
    pub(crate) fn interpolate(&mut self, fraction: f32) -> &[Vec4] {
        let fraction = fraction.clamp(0.0, 1.0);
        let scratch = self.scratch;
        if let Ok([blended, from, to]) =
            self.slots
                .get_disjoint_mut([scratch, self.previous, self.current])
        {
            blended.clear();
            for (a, b) in from.chunks_exact(2).zip(to.chunks_exact(2)) {
                let a = Transform::from_packed(a[0], a[1]);
                let b = Transform::from_packed(b[0], b[1]);
                blended.extend_from_slice(&a.lerp(&b, fraction).to_packed());
            }
        }
        &self.slots[scratch]
    }
}
