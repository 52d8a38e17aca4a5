//! Tuner: decimate, window, detect pitch off the audio thread, filter, publish.

use crate::config::TunerConfig;
use crate::error::Result;
use crate::pitch::{PitchDetector, PitchResult};
use crate::pitch_filter::PitchFilter;
use toob_core::{
    uris, CircularBuffer, Completion, ControlHandle, ControlInput, ControlOutput, CoreUrids,
    Detail, Dezipper, EventBody, HostContext, ProcessBlock, Processor, ProcessorConfig,
    ResponsePublisher, RtLog, Urid, Value, WorkHandler, WorkerSlot, DEFAULT_LOG_CAPACITY,
    DEFAULT_RAMP_SECS,
};
use toob_dsp::filters::Decimator;

/// One analysed window. The frame buffer rides back for reuse.
pub struct Analysis {
    pub result: PitchResult,
    pub frame: Vec<f32>,
}

/// Worker-side pitch detection.
pub struct PitchWorker {
    detector: PitchDetector,
}

impl PitchWorker {
    pub fn new(detector: PitchDetector) -> Self {
        Self { detector }
    }
}

impl WorkHandler for PitchWorker {
    type Request = Vec<f32>;
    type Response = Analysis;

    fn work(&mut self, frame: Vec<f32>) -> Analysis {
        let result = self.detector.detect(&frame);
        tracing::trace!(frequency = result.frequency, confidence = result.confidence, "pitch");
        Analysis { result, frame }
    }
}

/// Window counters since activation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TunerStats {
    /// Windows sent to the worker.
    pub submitted: u64,
    /// Windows below the threshold, answered with 0 on the audio thread.
    pub silent: u64,
    /// Windows that came due while an analysis was still in flight.
    pub skipped: u64,
}

#[derive(Debug, Clone)]
pub struct ToobTunerControls {
    pub ref_freq: ControlHandle,
    pub threshold: ControlHandle,
    pub mute: ControlHandle,
    /// Output: filtered pitch in Hz, 0 when there is none.
    pub freq: ControlHandle,
}

pub struct ToobTuner {
    ref_freq: ControlInput,
    threshold: ControlInput,
    mute: ControlInput,
    freq_out: ControlOutput,
    mute_z: Dezipper,
    threshold_amp: f32,

    decimator: Decimator,
    window: CircularBuffer<f32>,
    update_frame_count: usize,
    update_frame_index: usize,
    spare: Option<Vec<f32>>,
    /// Stands in for a window buffer lost with a failed analysis.
    reserve: Option<Vec<f32>>,
    slot: WorkerSlot<Vec<f32>, Analysis>,
    filter: PitchFilter,
    pitch: f32,
    stats: TunerStats,

    log: RtLog,
    publisher: ResponsePublisher,
    frequency_urid: Urid,
}

impl ToobTuner {
    pub fn new(config: &ProcessorConfig, tuner: &TunerConfig, ctx: &HostContext) -> Result<Self> {
        Self::with_handler(config, tuner, ctx, PitchWorker::new)
    }

    fn with_handler<H>(
        config: &ProcessorConfig,
        tuner: &TunerConfig,
        ctx: &HostContext,
        make_handler: impl FnOnce(PitchDetector) -> H,
    ) -> Result<Self>
    where
        H: WorkHandler<Request = Vec<f32>, Response = Analysis>,
    {
        config.validate()?;
        tuner.validate()?;
        let worker = ctx.require_worker()?;
        let sr = config.sample_rate;

        let factor = Decimator::factor_for(sr, tuner.analysis_rate_hz);
        let analysis_rate = sr / factor as f64;
        let detector = PitchDetector::new(analysis_rate, tuner.fft_size);
        let slot = worker.register(make_handler(detector))?;
        let (log, drain) = RtLog::new(DEFAULT_LOG_CAPACITY);
        worker.attach_log(drain)?;

        let core = CoreUrids::resolve(&ctx.urids);
        tracing::debug!(sample_rate = sr, factor, analysis_rate, fft_size = tuner.fft_size, "tuner created");
        Ok(Self {
            ref_freq: ControlInput::new(440.0, 425.0, 455.0),
            threshold: ControlInput::db(-40.0, -60.0, 0.0),
            mute: ControlInput::new(0.0, 0.0, 1.0),
            freq_out: ControlOutput::new(0.0),
            mute_z: Dezipper::new(1.0, DEFAULT_RAMP_SECS, sr),
            threshold_amp: toob_core::db_to_amplitude(-40.0),

            decimator: Decimator::new(factor, sr),
            window: CircularBuffer::new(tuner.fft_size),
            update_frame_count: tuner.update_frame_count(),
            update_frame_index: 0,
            spare: Some(vec![0.0; tuner.fft_size]),
            reserve: Some(vec![0.0; tuner.fft_size]),
            slot,
            filter: PitchFilter::new(tuner.history_len, tuner.agreement_fraction),
            pitch: 0.0,
            stats: TunerStats::default(),

            log,
            publisher: ResponsePublisher::new(config, ctx.clock.clone(), core),
            frequency_urid: ctx.urids.map(uris::TUNER_FREQUENCY),
        })
    }

    pub fn controls(&self) -> ToobTunerControls {
        ToobTunerControls {
            ref_freq: self.ref_freq.handle(),
            threshold: self.threshold.handle(),
            mute: self.mute.handle(),
            freq: self.freq_out.handle(),
        }
    }

    /// Current filtered pitch.
    pub fn frequency(&self) -> f32 {
        self.pitch
    }

    pub fn stats(&self) -> TunerStats {
        self.stats
    }

    pub fn decimation_factor(&self) -> usize {
        self.decimator.factor()
    }

    fn update_controls(&mut self) {
        if self.ref_freq.has_changed() {
            self.filter.set_reference(self.ref_freq.value());
        }
        if self.threshold.has_changed() {
            self.threshold_amp = self.threshold.amplitude();
        }
        if self.mute.has_changed() {
            let target = if self.mute.value() >= 0.5 { 0.0 } else { 1.0 };
            self.mute_z.set_target(target);
        }
    }

    fn collect(&mut self) {
        match self.slot.poll() {
            Some(Completion::Done(Analysis { result, frame })) => {
                self.spare = Some(frame);
                let raw = if result.is_voiced() { result.frequency } else { 0.0 };
                self.on_estimate(raw);
            }
            Some(Completion::Failed) => {
                // The window buffer went down with the handler.
                self.spare = self.reserve.take();
                let message = if self.spare.is_some() {
                    "pitch analysis failed"
                } else {
                    "pitch analysis failed again, tuner idle until reactivated"
                };
                let _ = self.log.error(self.publisher.frame(), message, Detail::None);
                self.on_estimate(0.0);
            }
            None => {}
        }
    }

    fn start_analysis(&mut self) {
        if !self.slot.is_idle() {
            self.stats.skipped += 1;
            return;
        }
        let Some(mut frame) = self.spare.take() else {
            return;
        };
        self.window.copy_to(&mut frame);
        let threshold = self.threshold_amp;
        if !frame.iter().any(|x| x.abs() > threshold) {
            self.spare = Some(frame);
            self.stats.silent += 1;
            self.on_estimate(0.0);
            return;
        }
        match self.slot.try_submit(frame) {
            Ok(()) => self.stats.submitted += 1,
            Err(e) => {
                if !e.is_busy() {
                    let _ = self.log.error(self.publisher.frame(), "tuner worker gone", Detail::None);
                }
                self.spare = Some(e.into_inner());
            }
        }
    }

    fn on_estimate(&mut self, raw: f32) {
        let value = self.filter.filter(raw);
        if value != self.pitch {
            self.pitch = value;
            self.freq_out.set(value);
            self.publisher.mark_changed();
        }
    }
}

impl Processor for ToobTuner {
    fn activate(&mut self) {
        tracing::trace!("tuner activated");
        self.publisher.activate();
        self.decimator.reset();
        self.window.clear();
        self.update_frame_index = 0;
        self.filter.reset();
        self.pitch = 0.0;
        self.freq_out.set(0.0);
        self.stats = TunerStats::default();
        if self.spare.is_none() && self.slot.is_idle() {
            self.spare = Some(vec![0.0; self.window.capacity()]);
        }
        if self.reserve.is_none() {
            self.reserve = Some(vec![0.0; self.window.capacity()]);
        }
        self.mute.invalidate();
        self.update_controls();
        self.mute_z.reset(self.mute_z.target());
    }

    fn process(&mut self, block: &mut ProcessBlock<'_>) {
        for event in block.events.iter() {
            if let EventBody::PatchGet { property } = &event.body {
                if property.map_or(true, |p| p == self.frequency_urid) {
                    self.publisher.request_get();
                }
            }
        }

        self.update_controls();
        self.collect();

        for (out, &x) in block.output.iter_mut().zip(block.input.iter()) {
            if let Some(d) = self.decimator.push(x) {
                self.window.push(d);
                self.update_frame_index += 1;
                if self.update_frame_index >= self.update_frame_count {
                    self.update_frame_index = 0;
                    self.start_analysis();
                }
            }
            *out = x * self.mute_z.tick();
        }

        if let Some(frame) = self.publisher.end_block(block.len()) {
            let property = self.frequency_urid;
            self.publisher
                .write_set(block.notify, frame, property, Value::Float(self.pitch));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use toob_core::{InputEvent, ManualClock, NotifyBuffer, PropertyValue, UridMap, WorkerHost};

    fn tuner(config: TunerConfig) -> (ToobTuner, Arc<WorkerHost>) {
        let host = Arc::new(WorkerHost::manual());
        let ctx = HostContext::new()
            .with_urids(Arc::new(UridMap::new()))
            .with_clock(Arc::new(ManualClock::new(0)))
            .with_worker(host.clone());
        let mut tuner = ToobTuner::new(&ProcessorConfig::default(), &config, &ctx).unwrap();
        tuner.activate();
        (tuner, host)
    }

    fn run(tuner: &mut ToobTuner, input: &[f32], notify: &mut NotifyBuffer) -> Vec<f32> {
        let mut output = vec![0.0; input.len()];
        notify.clear();
        tuner.process(&mut ProcessBlock {
            input,
            output: &mut output,
            events: &mut [],
            notify,
        });
        output
    }

    fn sine(freq: f32, amp: f32, start: usize, len: usize) -> Vec<f32> {
        (start..start + len)
            .map(|i| amp * (2.0 * std::f32::consts::PI * freq * i as f32 / 48000.0).sin())
            .collect()
    }

    #[test]
    fn test_decimation_factor() {
        let (tuner, _) = tuner(TunerConfig::default());
        assert_eq!(tuner.decimation_factor(), 4);
    }

    #[test]
    fn test_silence_never_reaches_worker() {
        let (mut tuner, host) = tuner(TunerConfig::default());
        let mut notify = NotifyBuffer::new(8192);
        for _ in 0..200 {
            run(&mut tuner, &[0.0; 512], &mut notify);
            host.run_pending();
        }
        let stats = tuner.stats();
        assert_eq!(stats.submitted, 0);
        assert!(stats.silent > 0);
        assert_eq!(tuner.frequency(), 0.0);
    }

    #[test]
    fn test_detects_steady_tone() {
        let (mut tuner, host) = tuner(TunerConfig::default());
        let mut notify = NotifyBuffer::new(8192);
        let mut t = 0;
        for _ in 0..400 {
            run(&mut tuner, &sine(110.0, 0.5, t, 512), &mut notify);
            t += 512;
            host.run_pending();
        }
        assert!(tuner.stats().submitted > 0);
        assert!(
            (tuner.frequency() - 110.0).abs() < 1.0,
            "got {}",
            tuner.frequency()
        );
        assert_eq!(tuner.controls().freq.get(), tuner.frequency());
    }

    #[test]
    fn test_busy_worker_skips_windows() {
        let (mut tuner, _host) = tuner(TunerConfig::default());
        let mut notify = NotifyBuffer::new(8192);
        let mut t = 0;
        // Never run the worker: only the first window can be submitted.
        for _ in 0..100 {
            run(&mut tuner, &sine(220.0, 0.5, t, 512), &mut notify);
            t += 512;
        }
        let stats = tuner.stats();
        assert_eq!(stats.submitted, 1);
        assert!(stats.skipped > 0);
    }

    #[test]
    fn test_mute_ramps_to_silence() {
        let (mut tuner, _host) = tuner(TunerConfig::default());
        let mut notify = NotifyBuffer::new(8192);
        tuner.controls().mute.set(1.0);
        let out = run(&mut tuner, &[0.5; 4800], &mut notify);
        assert!(out[0] > 0.4);
        assert_eq!(out[4799], 0.0);
    }

    #[test]
    fn test_patch_get_publishes_frequency() {
        let (mut tuner, _host) = tuner(TunerConfig::default());
        let mut notify = NotifyBuffer::new(8192);
        run(&mut tuner, &[0.0; 4800], &mut notify);

        let mut events = [InputEvent::get(0, None)];
        notify.clear();
        tuner.process(&mut ProcessBlock {
            input: &[0.0; 16],
            output: &mut [0.0; 16],
            events: &mut events,
            notify: &mut notify,
        });
        let msgs = notify.messages();
        assert_eq!(msgs.len(), 1);
        let urids = tuner.publisher.urids();
        assert_eq!(
            msgs[0].property(urids.patch_value),
            Some(&PropertyValue::Float(0.0))
        );
    }

    /// Panics on its first window, then behaves.
    struct FailsOnce {
        inner: PitchWorker,
        failed: bool,
    }

    impl WorkHandler for FailsOnce {
        type Request = Vec<f32>;
        type Response = Analysis;

        fn work(&mut self, frame: Vec<f32>) -> Analysis {
            if !self.failed {
                self.failed = true;
                panic!("detector fault");
            }
            self.inner.work(frame)
        }
    }

    #[test]
    fn test_recovers_after_failed_analysis() {
        let host = Arc::new(WorkerHost::manual());
        let ctx = HostContext::new()
            .with_urids(Arc::new(UridMap::new()))
            .with_clock(Arc::new(ManualClock::new(0)))
            .with_worker(host.clone());
        let mut tuner = ToobTuner::with_handler(
            &ProcessorConfig::default(),
            &TunerConfig::default(),
            &ctx,
            |detector| FailsOnce {
                inner: PitchWorker::new(detector),
                failed: false,
            },
        )
        .unwrap();
        tuner.activate();

        let mut notify = NotifyBuffer::new(8192);
        let mut t = 0;
        for _ in 0..400 {
            run(&mut tuner, &sine(110.0, 0.5, t, 512), &mut notify);
            t += 512;
            host.run_pending();
        }
        assert!(tuner.stats().submitted > 1);
        assert!(
            (tuner.frequency() - 110.0).abs() < 1.0,
            "got {}",
            tuner.frequency()
        );
    }
}
