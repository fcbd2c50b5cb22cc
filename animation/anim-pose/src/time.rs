//! External time sources for clip playback

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

/// Something that reports the current playback time in seconds
pub trait TimeSource: fmt::Debug + Send + Sync {
    /// Current time in seconds
    fn time(&self) -> f32;
}

/// Cloneable clock shared between gameplay code and controllers
///
/// All clones observe the same time. The value is stored as raw `f32` bits
/// so it can be read from the evaluation thread without locking.
#[derive(Clone, Default)]
pub struct SharedClock {
    bits: Arc<AtomicU32>,
}

impl SharedClock {
    /// Create a clock starting at `time`
    pub fn new(time: f32) -> Self {
        Self {
            bits: Arc::new(AtomicU32::new(time.to_bits())),
        }
    }

    /// Set the current time
    pub fn set(&self, time: f32) {
        self.bits.store(time.to_bits(), Ordering::Release);
    }

    /// Move the clock forward by `delta` seconds
    pub fn advance(&self, delta: f32) {
        // Concurrent advances must not be lost
        let _ = self
            .bits
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |bits| {
                Some((f32::from_bits(bits) + delta).to_bits())
            });
    }
}

impl TimeSource for SharedClock {
    fn time(&self) -> f32 {
        f32::from_bits(self.bits.load(Ordering::Acquire))
    }
}

impl fmt::Debug for SharedClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedClock")
            .field("time", &self.time())
            .finish()
    }
}
