//! Neural amp processor: trim → model → sag → tone stack → master → DC blocker.

use crate::error::Result;
use crate::slot::{LoadState, ModelSlot, SlotEvent};
use std::path::{Path, PathBuf};
use toob_core::{
    amplitude_to_db, uris, ControlHandle, ControlInput, ControlOutput, CoreUrids, Detail,
    Dezipper, EventBody, FrequencyResponse, HostContext, ProcessBlock, Processor,
    ProcessorConfig, ResponsePublisher, RtLog, Urid, Value, DEFAULT_LOG_CAPACITY,
    DEFAULT_RAMP_SECS,
};
use toob_dsp::filters::{DcBlocker, ToneStack};
use toob_dsp::{flush_denormal, SagProcessor, DEFAULT_SAG_FREQUENCY, MAX_SAG_FREQUENCY, MIN_SAG_FREQUENCY};

/// Samples per model call while gain is ramping or sag is pulling the drive.
const GAIN_CHUNK: usize = 16;
/// Paths whose log record didn't fit, held until `deactivate`.
const STRANDED_CAPACITY: usize = 16;
const DC_CUTOFF_HZ: f64 = 10.0;

#[derive(Debug, Clone, Copy)]
struct Urids {
    core: CoreUrids,
    model_file: Urid,
}

#[derive(Debug, Clone)]
pub struct ToobMlControls {
    pub trim: ControlHandle,
    pub gain: ControlHandle,
    pub master: ControlHandle,
    pub bass: ControlHandle,
    pub mid: ControlHandle,
    pub treble: ControlHandle,
    /// Output level drop under load, 0..1.
    pub sag: ControlHandle,
    /// Drive drop under load, 0..1.
    pub sag_drive: ControlHandle,
    /// Supply recovery corner, Hz.
    pub sag_frequency: ControlHandle,
    /// Output: input peak after trim, in dB.
    pub trim_out: ControlHandle,
    /// Output: 1 when the loaded model responds to gain.
    pub gain_enabled: ControlHandle,
}

pub struct ToobMl {
    trim: ControlInput,
    gain: ControlInput,
    master: ControlInput,
    bass: ControlInput,
    mid: ControlInput,
    treble: ControlInput,
    sag_level: ControlInput,
    sag_drive: ControlInput,
    sag_frequency: ControlInput,
    trim_out: ControlOutput,
    gain_enabled: ControlOutput,

    trim_z: Dezipper,
    gain_z: Dezipper,
    master_z: Dezipper,
    sag: SagProcessor,
    tone: ToneStack,
    dc: DcBlocker,

    slot: ModelSlot,
    log: RtLog,
    stranded: Vec<PathBuf>,
    response: FrequencyResponse,
    publisher: ResponsePublisher,
    urids: Urids,
    publish_path: bool,
}

impl ToobMl {
    /// Needs a worker host in `ctx`; fails with `MissingFeature("worker")` otherwise.
    pub fn new(config: &ProcessorConfig, ctx: &HostContext) -> Result<Self> {
        config.validate()?;
        let worker = ctx.require_worker()?;
        let sr = config.sample_rate;
        let core = CoreUrids::resolve(&ctx.urids);
        let urids = Urids {
            core,
            model_file: ctx.urids.map(uris::ML_MODEL_FILE),
        };

        let slot = ModelSlot::new(worker)?;
        let (log, drain) = RtLog::new(DEFAULT_LOG_CAPACITY);
        worker.attach_log(drain)?;

        tracing::debug!(sample_rate = sr, "toob ml created");
        Ok(Self {
            trim: ControlInput::db(0.0, -20.0, 20.0),
            gain: ControlInput::new(0.5, 0.0, 1.0),
            master: ControlInput::db(0.0, -40.0, 20.0),
            bass: ControlInput::new(0.5, 0.0, 1.0),
            mid: ControlInput::new(0.5, 0.0, 1.0),
            treble: ControlInput::new(0.5, 0.0, 1.0),
            sag_level: ControlInput::new(0.0, 0.0, 1.0),
            sag_drive: ControlInput::new(0.0, 0.0, 1.0),
            sag_frequency: ControlInput::new(
                DEFAULT_SAG_FREQUENCY,
                MIN_SAG_FREQUENCY,
                MAX_SAG_FREQUENCY,
            ),
            trim_out: ControlOutput::new(toob_core::MIN_DB),
            gain_enabled: ControlOutput::new(0.0),

            trim_z: Dezipper::new(1.0, DEFAULT_RAMP_SECS, sr),
            gain_z: Dezipper::new(0.5, DEFAULT_RAMP_SECS, sr),
            master_z: Dezipper::new(1.0, DEFAULT_RAMP_SECS, sr),
            sag: SagProcessor::new(sr),
            tone: ToneStack::new(sr),
            dc: DcBlocker::new(DC_CUTOFF_HZ, sr),

            slot,
            log,
            stranded: Vec::with_capacity(STRANDED_CAPACITY),
            response: FrequencyResponse::new(),
            publisher: ResponsePublisher::new(config, ctx.clock.clone(), core),
            urids,
            publish_path: false,
        })
    }

    pub fn controls(&self) -> ToobMlControls {
        ToobMlControls {
            trim: self.trim.handle(),
            gain: self.gain.handle(),
            master: self.master.handle(),
            bass: self.bass.handle(),
            mid: self.mid.handle(),
            treble: self.treble.handle(),
            sag: self.sag_level.handle(),
            sag_drive: self.sag_drive.handle(),
            sag_frequency: self.sag_frequency.handle(),
            trim_out: self.trim_out.handle(),
            gain_enabled: self.gain_enabled.handle(),
        }
    }

    pub fn model_path(&self) -> Option<&Path> {
        self.slot.live_path()
    }

    pub fn load_state(&self) -> LoadState {
        self.slot.state()
    }

    /// Tone-stack response at `f`, before trim.
    pub fn frequency_response(&self, f: f32) -> f32 {
        self.tone.magnitude_at(f)
    }

    fn handle_events(&mut self, block: &mut ProcessBlock<'_>) {
        let frame = self.publisher.frame();
        for event in block.events.iter_mut() {
            let at = frame + event.frame as u64;
            match &mut event.body {
                EventBody::PatchSet { property, value } if *property == self.urids.model_file => {
                    let Some(path) = value.take_path() else {
                        let _ = self.log.error(at, "modelFile set without a path", Detail::None);
                        continue;
                    };
                    match self.slot.request_load(path) {
                        Ok(None) => {}
                        Ok(Some(unused)) => {
                            // Displaced by a newer request, or a repeat of the latest one.
                            self.log_path(
                                tracing::Level::DEBUG,
                                at,
                                "model request dropped",
                                unused,
                            );
                        }
                        Err(e) => {
                            self.log_path(
                                tracing::Level::ERROR,
                                at,
                                "worker unavailable, model not loaded",
                                e.into_inner(),
                            );
                        }
                    }
                }
                EventBody::PatchSet { .. } | EventBody::ProgramChange(_) => {}
                EventBody::PatchGet { property } => match *property {
                    None => {
                        self.publisher.request_get();
                        self.publish_path = true;
                    }
                    Some(p) if p == self.urids.core.frequency_response_vector => {
                        self.publisher.request_get();
                    }
                    Some(p) if p == self.urids.model_file => self.publish_path = true,
                    Some(_) => {}
                },
            }
        }
    }

    fn service_slot(&mut self) {
        let frame = self.publisher.frame();
        match self.slot.service() {
            Some(SlotEvent::Swapped) => {
                self.publish_path = true;
                let _ = self.log.info(frame, "model swapped", Detail::None);
            }
            Some(SlotEvent::LoadFailed(path)) => {
                self.log_path(tracing::Level::ERROR, frame, "model load failed", path);
            }
            None => {}
        }
        self.gain_enabled
            .set(if self.slot.is_gain_enabled() { 1.0 } else { 0.0 });
    }

    /// Log with a path attached. A full queue leaves the path with us rather
    /// than freeing it on the audio thread.
    fn log_path(
        &mut self,
        level: tracing::Level,
        frame: u64,
        message: &'static str,
        path: PathBuf,
    ) {
        if let Err(Detail::Path(path)) = self.log.log(level, frame, message, Detail::Path(path)) {
            if self.stranded.len() < self.stranded.capacity() {
                self.stranded.push(path);
            } else {
                // Queue and holding area both full: leak it instead.
                std::mem::forget(path);
            }
        }
    }

    fn update_controls(&mut self) -> bool {
        let mut changed = false;
        if self.trim.has_changed() {
            self.trim_z.set_target(self.trim.amplitude());
            changed = true;
        }
        if self.gain.has_changed() {
            self.gain_z.set_target(self.gain.value());
        }
        if self.master.has_changed() {
            self.master_z.set_target(self.master.amplitude());
        }
        if self.sag_level.has_changed() {
            self.sag.set_sag(self.sag_level.value());
        }
        if self.sag_drive.has_changed() {
            self.sag.set_sag_drive(self.sag_drive.value());
        }
        if self.sag_frequency.has_changed() {
            self.sag.set_frequency(self.sag_frequency.value());
        }
        if self.bass.has_changed() {
            self.tone.set_bass(self.bass.value());
            changed = true;
        }
        if self.mid.has_changed() {
            self.tone.set_mid(self.mid.value());
            changed = true;
        }
        if self.treble.has_changed() {
            self.tone.set_treble(self.treble.value());
            changed = true;
        }
        changed
    }

    /// Model plus sag. Sag on the drive feeds back from the model's output,
    /// so it runs in short chunks like a gain ramp does.
    fn run_model(&mut self, buffer: &mut [f32]) {
        if !self.gain_z.is_ramping() && !self.sag.is_driving() {
            let gain = self.gain_z.tick();
            self.slot.process(buffer, gain);
            for y in buffer.iter_mut() {
                *y = self.sag.tick(*y);
            }
            return;
        }
        for chunk in buffer.chunks_mut(GAIN_CHUNK) {
            let mut gain = self.gain_z.target();
            for _ in 0..chunk.len() {
                gain = self.gain_z.tick();
            }
            let drive = self.sag.drive_gain();
            if drive < 1.0 {
                chunk.iter_mut().for_each(|x| *x *= drive);
            }
            self.slot.process(chunk, gain);
            for y in chunk.iter_mut() {
                *y = self.sag.tick(*y);
            }
        }
    }

    fn publish(&mut self, block: &mut ProcessBlock<'_>, frame: Option<u64>) {
        if let Some(frame) = frame {
            let tone = &self.tone;
            let vector = self
                .response
                .compute(|f| tone.magnitude_at(f), self.trim.amplitude());
            self.publisher.write_response(block.notify, frame, vector);
        }
        if self.publish_path {
            if let Some(path) = self.slot.live_path() {
                let frame = self.publisher.frame();
                let property = self.urids.model_file;
                self.publisher
                    .write_set(block.notify, frame, property, Value::Path(path));
            }
            self.publish_path = false;
        }
    }
}

impl Processor for ToobMl {
    fn activate(&mut self) {
        tracing::trace!("toob ml activated");
        self.publisher.activate();
        for port in [
            &mut self.trim,
            &mut self.gain,
            &mut self.master,
            &mut self.bass,
            &mut self.mid,
            &mut self.treble,
            &mut self.sag_level,
            &mut self.sag_drive,
            &mut self.sag_frequency,
        ] {
            port.invalidate();
            port.has_changed();
        }
        self.trim_z.reset(self.trim.amplitude());
        self.gain_z.reset(self.gain.value());
        self.master_z.reset(self.master.amplitude());
        self.tone.set_bass(self.bass.value());
        self.tone.set_mid(self.mid.value());
        self.tone.set_treble(self.treble.value());
        self.tone.reset();
        self.sag.set_sag(self.sag_level.value());
        self.sag.set_sag_drive(self.sag_drive.value());
        self.sag.set_frequency(self.sag_frequency.value());
        self.sag.reset();
        self.dc.reset();
        self.slot.reset();
        self.publish_path = true;
    }

    fn deactivate(&mut self) {
        if !self.stranded.is_empty() {
            tracing::debug!(count = self.stranded.len(), "releasing unlogged model paths");
            self.stranded.clear();
        }
    }

    fn process(&mut self, block: &mut ProcessBlock<'_>) {
        self.handle_events(block);
        self.service_slot();
        if self.update_controls() {
            self.publisher.mark_changed();
        }

        let n = block.len();
        for (y, x) in block.output.iter_mut().zip(block.input.iter()) {
            *y = *x;
        }
        if block.input.len() < n {
            block.output[block.input.len()..].fill(0.0);
        }
        self.trim_z.apply(block.output);
        if n > 0 {
            let peak = block.output.iter().fold(0.0f32, |m, x| m.max(x.abs()));
            self.trim_out.set(amplitude_to_db(peak));
        }

        self.run_model(block.output);
        for y in block.output.iter_mut() {
            let x = self.tone.tick(*y) * self.master_z.tick();
            *y = flush_denormal(self.dc.tick(x));
        }

        let frame = self.publisher.end_block(n);
        self.publish(block, frame);
    }
}
