//! Rate-limited publish scheduling.
//!
//! A change at the end of a block arms exactly one future publish. While
//! samples are flowing the publish is counted down in samples; while the host
//! is sending empty blocks (transport stopped) it waits on the wall clock
//! instead. Switching between the two modes fires whatever is pending
//! immediately. An explicit get request bypasses all of it.

use crate::clock::Clock;
use crate::config::ProcessorConfig;

/// The single outstanding publish, if any.
///
/// Holding one variant excludes the other, so a countdown and a deadline can
/// never both be armed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PendingPublish {
    #[default]
    None,
    /// Samples left before firing.
    Samples(i64),
    /// Wall-clock time (ms) that must be passed before firing.
    Deadline(u64),
}

impl PendingPublish {
    pub fn is_pending(&self) -> bool {
        !matches!(self, PendingPublish::None)
    }
}

/// Per-processor publish state machine.
#[derive(Debug, Clone)]
pub struct PublishScheduler {
    pending: PendingPublish,
    changed: bool,
    get_requested: bool,
    sample_delay: i64,
    ms_delay: u64,
}

impl PublishScheduler {
    pub fn new(config: &ProcessorConfig) -> Self {
        Self::with_delays(config.update_sample_delay(), config.update_ms_delay())
    }

    pub fn with_delays(sample_delay: i64, ms_delay: u64) -> Self {
        Self {
            pending: PendingPublish::None,
            changed: false,
            get_requested: false,
            sample_delay: sample_delay.max(1),
            ms_delay,
        }
    }

    /// Something that feeds the published value changed during this block.
    #[inline]
    pub fn mark_changed(&mut self) {
        self.changed = true;
    }

    /// The consumer asked for the current state; publish at the end of this block.
    #[inline]
    pub fn request_get(&mut self) {
        self.get_requested = true;
    }

    #[inline]
    pub fn pending(&self) -> PendingPublish {
        self.pending
    }

    /// Drop any armed publish and outstanding flags. Called on activation.
    pub fn reset(&mut self) {
        self.pending = PendingPublish::None;
        self.changed = false;
        self.get_requested = false;
    }

    /// Evaluate the schedule after a block of `n_samples`. Returns true when
    /// the publisher should write now.
    ///
    /// The clock is read only when a deadline has to be armed or checked.
    pub fn end_block(&mut self, n_samples: usize, clock: &dyn Clock) -> bool {
        let n = n_samples as i64;

        if self.changed {
            self.changed = false;
            self.pending = if n == 0 {
                PendingPublish::Deadline(clock.now_ms() + self.ms_delay)
            } else {
                PendingPublish::Samples(self.sample_delay)
            };
        }

        if self.get_requested {
            self.get_requested = false;
            self.pending = PendingPublish::None;
            return true;
        }

        match self.pending {
            PendingPublish::None => false,
            PendingPublish::Samples(remaining) => {
                let remaining = remaining - n;
                if remaining <= 0 || n == 0 {
                    self.pending = PendingPublish::None;
                    true
                } else {
                    self.pending = PendingPublish::Samples(remaining);
                    false
                }
            }
            PendingPublish::Deadline(deadline) => {
                if n != 0 || clock.now_ms() > deadline {
                    self.pending = PendingPublish::None;
                    true
                } else {
                    false
                }
            }
        }
    }
}
