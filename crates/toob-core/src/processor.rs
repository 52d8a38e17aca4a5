//! The host-facing processor contract.

use crate::clock::{Clock, SystemClock};
use crate::compat::Arc;
use crate::error::{Error, Result};
use crate::events::InputEvent;
use crate::notify::NotifyBuffer;
use crate::urid::UridMap;
use crate::worker::WorkerHost;

/// Facilities the host offers a processor at construction.
#[derive(Clone)]
pub struct HostContext {
    pub urids: Arc<UridMap>,
    pub clock: Arc<dyn Clock>,
    pub worker: Option<Arc<WorkerHost>>,
}

impl HostContext {
    /// Global URID map, system clock, no worker.
    pub fn new() -> Self {
        Self {
            urids: UridMap::global(),
            clock: Arc::new(SystemClock::new()),
            worker: None,
        }
    }

    pub fn with_urids(mut self, urids: Arc<UridMap>) -> Self {
        self.urids = urids;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_worker(mut self, worker: Arc<WorkerHost>) -> Self {
        self.worker = Some(worker);
        self
    }

    /// The worker host, or `MissingFeature` for processors that can't run without one.
    pub fn require_worker(&self) -> Result<&Arc<WorkerHost>> {
        self.worker.as_ref().ok_or(Error::MissingFeature("worker"))
    }
}

impl Default for HostContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything one `process` call works on.
///
/// `input` and `output` have the same length, which may be zero: an empty
/// block means time passed with no audio.
pub struct ProcessBlock<'a> {
    pub input: &'a [f32],
    pub output: &'a mut [f32],
    /// Inbound events for this block, in frame order. Processors may move
    /// payloads out of them.
    pub events: &'a mut [InputEvent],
    /// Outbound channel, cleared by the host before the call.
    pub notify: &'a mut NotifyBuffer,
}

impl ProcessBlock<'_> {
    #[inline]
    pub fn len(&self) -> usize {
        self.output.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.output.is_empty()
    }
}

/// A real-time audio processor.
///
/// `process` runs on the audio thread: it must not block or allocate once
/// activated. Per block it handles events first, then samples, then the
/// publish schedule.
pub trait Processor: Send {
    /// Reset state and timelines before audio starts.
    fn activate(&mut self);

    fn deactivate(&mut self) {}

    fn process(&mut self, block: &mut ProcessBlock<'_>);
}
