//! Input conditioning ahead of an amp: trim, low cut, high cut, bright shelf, noise gate.

use crate::filters::{AnalogPrototype, AudioFilter2, ShelvingLowCut};
use crate::gate::{NoiseGate, GATE_OFF_DB};
use crate::{flush_denormal, Result};
use toob_core::{
    amplitude_to_db, ControlHandle, ControlInput, ControlOutput, CoreUrids, EventBody,
    FrequencyResponse, HostContext, ProcessBlock, Processor, ProcessorConfig, ResponsePublisher,
    MIN_DB,
};

#[derive(Debug, Clone)]
pub struct InputStageControls {
    pub trim: ControlHandle,
    pub locut: ControlHandle,
    pub bright: ControlHandle,
    pub brightf: ControlHandle,
    pub hicut: ControlHandle,
    pub gate_threshold: ControlHandle,
    /// Output: peak level after trim, dB.
    pub trim_out: ControlHandle,
    /// Output: 1 while the gate is open, 0 while closed.
    pub gate_out: ControlHandle,
}

pub struct InputStage {
    trim: ControlInput,
    locut: ControlInput,
    bright: ControlInput,
    brightf: ControlInput,
    hicut: ControlInput,
    gate_threshold: ControlInput,
    trim_out: ControlOutput,
    gate_out: ControlOutput,

    lo_cut_filter: AudioFilter2,
    hi_cut_filter: AudioFilter2,
    bright_filter: ShelvingLowCut,
    gate: NoiseGate,

    response: FrequencyResponse,
    publisher: ResponsePublisher,
    urids: CoreUrids,
    program: u8,
}

impl InputStage {
    pub fn new(config: &ProcessorConfig, ctx: &HostContext) -> Result<Self> {
        config.validate()?;
        let sr = config.sample_rate;
        let urids = CoreUrids::resolve(&ctx.urids);
        Ok(Self {
            trim: ControlInput::db(0.0, -20.0, 20.0),
            locut: ControlInput::new(30.0, 30.0, 300.0),
            bright: ControlInput::db(0.0, 0.0, 20.0),
            brightf: ControlInput::new(1300.0, 1000.0, 5000.0),
            hicut: ControlInput::new(13000.0, 2000.0, 13000.0),
            gate_threshold: ControlInput::db(GATE_OFF_DB, GATE_OFF_DB, -20.0),
            trim_out: ControlOutput::new(MIN_DB),
            gate_out: ControlOutput::new(1.0),

            lo_cut_filter: AudioFilter2::new(AnalogPrototype::HIPASS, 30.0, sr),
            hi_cut_filter: AudioFilter2::new(AnalogPrototype::LOWPASS, 13000.0, sr),
            bright_filter: ShelvingLowCut::new(1300.0, 0.0, sr),
            gate: NoiseGate::new(GATE_OFF_DB, sr),

            response: FrequencyResponse::new(),
            publisher: ResponsePublisher::new(config, ctx.clock.clone(), urids),
            urids,
            program: 0,
        })
    }

    pub fn controls(&self) -> InputStageControls {
        InputStageControls {
            trim: self.trim.handle(),
            locut: self.locut.handle(),
            bright: self.bright.handle(),
            brightf: self.brightf.handle(),
            hicut: self.hicut.handle(),
            gate_threshold: self.gate_threshold.handle(),
            trim_out: self.trim_out.handle(),
            gate_out: self.gate_out.handle(),
        }
    }

    pub fn program(&self) -> u8 {
        self.program
    }

    fn update_controls(&mut self) -> bool {
        let mut changed = self.trim.has_changed();
        if self.locut.has_changed() {
            self.lo_cut_filter.set_cutoff(self.locut.value() as f64);
            changed = true;
        }
        if self.hicut.has_changed() {
            self.hi_cut_filter.set_cutoff(self.hicut.value() as f64);
            changed = true;
        }
        if self.bright.has_changed() {
            self.bright_filter.set_low_cut_db(self.bright.value() as f64);
            changed = true;
        }
        if self.brightf.has_changed() {
            self.bright_filter.set_cutoff(self.brightf.value() as f64);
            changed = true;
        }
        // The gate doesn't shape the frequency response.
        if self.gate_threshold.has_changed() {
            self.gate.set_threshold_db(self.gate_threshold.value());
        }
        changed
    }
}

impl Processor for InputStage {
    fn activate(&mut self) {
        self.publisher.activate();
        self.lo_cut_filter.reset();
        self.hi_cut_filter.reset();
        self.bright_filter.reset();
        self.gate.reset();
    }

    fn process(&mut self, block: &mut ProcessBlock<'_>) {
        for event in block.events.iter() {
            match &event.body {
                EventBody::PatchGet { property } => {
                    if property.map_or(true, |p| p == self.urids.frequency_response_vector) {
                        self.publisher.request_get();
                    }
                }
                EventBody::ProgramChange(program) => self.program = *program,
                EventBody::PatchSet { .. } => {}
            }
        }

        if self.update_controls() {
            self.publisher.mark_changed();
        }

        let trim = self.trim.amplitude();
        let mut peak = 0.0f32;
        for (out, &x) in block.output.iter_mut().zip(block.input.iter()) {
            let trimmed = trim * x;
            peak = peak.max(trimmed.abs());
            let y = self.bright_filter.tick(
                self.hi_cut_filter.tick(self.lo_cut_filter.tick(trimmed)),
            );
            *out = flush_denormal(self.gate.tick(y));
        }
        if !block.is_empty() {
            self.trim_out.set(amplitude_to_db(peak));
            self.gate_out.set(if self.gate.is_open() { 1.0 } else { 0.0 });
        }

        if let Some(frame) = self.publisher.end_block(block.len()) {
            let (lo, hi, bright) = (&self.lo_cut_filter, &self.hi_cut_filter, &self.bright_filter);
            let vector = self.response.compute(
                |f| lo.magnitude_at(f) * hi.magnitude_at(f) * bright.magnitude_at(f),
                trim,
            );
            self.publisher.write_response(block.notify, frame, vector);
        }
    }
}
