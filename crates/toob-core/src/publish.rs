//! Timestamped publishing into the outbound channel.

use crate::clock::{Clock, FrameClock};
use crate::compat::Arc;
use crate::config::ProcessorConfig;
use crate::notify::{NotifyBuffer, Value};
use crate::schedule::PublishScheduler;
use crate::urid::{CoreUrids, Urid};

/// Frame clock, rate limiter, and `patch:Set` writer for one processor.
///
/// Per block: call [`mark_changed`](Self::mark_changed) /
/// [`request_get`](Self::request_get) while handling events and controls, run
/// the DSP, then [`end_block`](Self::end_block). When it returns a frame,
/// recompute the published value and write it with one of the `write_*`
/// methods.
pub struct ResponsePublisher {
    frames: FrameClock,
    scheduler: PublishScheduler,
    clock: Arc<dyn Clock>,
    urids: CoreUrids,
    dropped: u64,
}

impl ResponsePublisher {
    pub fn new(config: &ProcessorConfig, clock: Arc<dyn Clock>, urids: CoreUrids) -> Self {
        Self {
            frames: FrameClock::new(),
            scheduler: PublishScheduler::new(config),
            clock,
            urids,
            dropped: 0,
        }
    }

    /// Reset the timeline and arm an initial publish.
    pub fn activate(&mut self) {
        self.frames.reset();
        self.scheduler.reset();
        self.scheduler.mark_changed();
    }

    #[inline]
    pub fn mark_changed(&mut self) {
        self.scheduler.mark_changed();
    }

    #[inline]
    pub fn request_get(&mut self) {
        self.scheduler.request_get();
    }

    #[inline]
    pub fn frame(&self) -> u64 {
        self.frames.now()
    }

    pub fn scheduler(&self) -> &PublishScheduler {
        &self.scheduler
    }

    pub fn urids(&self) -> &CoreUrids {
        &self.urids
    }

    /// Writes rejected for lack of space since construction.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Advance the frame clock by the block and evaluate the schedule.
    /// Returns the frame to stamp a publish with, if one is due.
    pub fn end_block(&mut self, n_samples: usize) -> Option<u64> {
        self.frames.advance(n_samples);
        self.scheduler
            .end_block(n_samples, self.clock.as_ref())
            .then(|| self.frames.now())
    }

    /// Write `patch:Set { property, value }` at `frame`.
    ///
    /// A full channel drops the message; the caller's next publish retries.
    pub fn write_set(
        &mut self,
        notify: &mut NotifyBuffer,
        frame: u64,
        property: Urid,
        value: Value<'_>,
    ) -> bool {
        let result = notify.write(
            frame,
            self.urids.patch_set,
            &[
                (self.urids.patch_property, Value::Urid(property)),
                (self.urids.patch_value, value),
            ],
        );
        match result {
            Ok(()) => true,
            Err(_) => {
                self.dropped += 1;
                false
            }
        }
    }

    /// Publish a frequency-response vector.
    pub fn write_response(&mut self, notify: &mut NotifyBuffer, frame: u64, vector: &[f32]) -> bool {
        let property = self.urids.frequency_response_vector;
        self.write_set(notify, frame, property, Value::FloatVector(vector))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::events::PropertyValue;
    use crate::response::FrequencyResponse;
    use crate::urid::UridMap;

    fn publisher() -> (ResponsePublisher, CoreUrids) {
        let map = UridMap::new();
        let urids = CoreUrids::resolve(&map);
        let p = ResponsePublisher::new(
            &ProcessorConfig::default(),
            Arc::new(ManualClock::new(0)),
            urids,
        );
        (p, urids)
    }

    #[test]
    fn test_activation_publishes_after_one_cycle() {
        let (mut p, _) = publisher();
        p.activate();
        let fired: Vec<_> = (0..12).filter_map(|_| p.end_block(512)).collect();
        assert_eq!(fired, vec![5120]);
    }

    #[test]
    fn test_write_response_message_shape() {
        let (mut p, urids) = publisher();
        let mut notify = NotifyBuffer::new(4096);
        let mut curve = FrequencyResponse::new();
        p.request_get();
        let frame = p.end_block(64).unwrap();
        assert_eq!(frame, 64);
        assert!(p.write_response(&mut notify, frame, curve.compute(|_| 1.0, 1.0)));

        let msgs = notify.messages();
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].object_type, urids.patch_set);
        assert_eq!(
            msgs[0].property(urids.patch_property),
            Some(&PropertyValue::Urid(urids.frequency_response_vector))
        );
        match msgs[0].property(urids.patch_value) {
            Some(PropertyValue::FloatVector(v)) => assert_eq!(v.len(), 204),
            other => panic!("unexpected value {other:?}"),
        }
    }

    #[test]
    fn test_full_channel_counts_drop() {
        let (mut p, _) = publisher();
        let mut notify = NotifyBuffer::new(64);
        let curve = FrequencyResponse::new();
        assert!(!p.write_response(&mut notify, 0, curve.vector()));
        assert_eq!(p.dropped(), 1);
        assert!(notify.is_empty());
    }
}
