//! Visibility-driven update throttling

/// Which render pass drew the entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub enum RenderPass {
    /// Full-fidelity view
    #[default]
    Main,
    /// Shadow casting only
    Shadow,
}

/// Decides which ticks evaluate the pose controller
///
/// An entity drawn only in shadow passes last frame evaluates on every
/// `interval`-th tick, with the skipped time handed to that evaluation so
/// playback speed is unchanged. Any other entity, including one that was not
/// drawn at all, updates every tick.
#[derive(Debug, Clone)]
pub(crate) struct UpdateThrottle {
    interval: u32,
    counter: u32,
    pending_delta: f32,
    rendered_main: bool,
    rendered_shadow: bool,
    force_next: bool,
}

impl UpdateThrottle {
    pub(crate) fn new(interval: u32) -> Self {
        Self {
            interval: interval.max(1),
            counter: 0,
            pending_delta: 0.0,
            rendered_main: false,
            rendered_shadow: false,
            force_next: true,
        }
    }

    pub(crate) fn set_interval(&mut self, interval: u32) {
        self.interval = interval.max(1);
    }

    /// Note a render of the entity during the current frame
    pub(crate) fn record_render(&mut self, pass: RenderPass) {
        match pass {
            RenderPass::Main => self.rendered_main = true,
            RenderPass::Shadow => self.rendered_shadow = true,
        }
    }

    /// Evaluate on the next tick regardless of visibility
    pub(crate) fn force(&mut self) {
        self.force_next = true;
    }

    /// Start a tick; returns the time to evaluate with, or None to skip
    pub(crate) fn begin_tick(&mut self, delta_time: f32) -> Option<f32> {
        let rendered_main = std::mem::take(&mut self.rendered_main);
        let shadow_only = std::mem::take(&mut self.rendered_shadow) && !rendered_main;
        let forced = std::mem::take(&mut self.force_next);
        self.pending_delta += delta_time;

        if forced || !shadow_only || self.interval == 1 {
            self.counter = 0;
            return Some(std::mem::take(&mut self.pending_delta));
        }

        self.counter += 1;
        if self.counter >= self.interval {
            self.counter = 0;
            Some(std::mem::take(&mut self.pending_delta))
        } else {
            None
        }
    }
}
