//! Cabinet simulator: trim, low cut, high cut, bright shelf, comb.

use crate::filters::{AnalogPrototype, AudioFilter2, CombFilter, ShelvingLowCut};
use crate::{flush_denormal, Result};
use toob_core::{
    CoreUrids, ControlHandle, ControlInput, ControlOutput, EventBody, FrequencyResponse,
    HostContext, ProcessBlock, Processor, ProcessorConfig, ResponsePublisher,
};

/// Host-side handles to the cab sim's ports.
#[derive(Debug, Clone)]
pub struct CabSimControls {
    pub trim: ControlHandle,
    pub locut: ControlHandle,
    pub bright: ControlHandle,
    pub brightf: ControlHandle,
    pub hicut: ControlHandle,
    pub comb: ControlHandle,
    pub combf: ControlHandle,
    /// Output: peak level since the host last reset it.
    pub peak: ControlHandle,
}

pub struct CabSim {
    trim: ControlInput,
    locut: ControlInput,
    bright: ControlInput,
    brightf: ControlInput,
    hicut: ControlInput,
    comb: ControlInput,
    combf: ControlInput,
    peak_out: ControlOutput,

    lo_cut_filter: AudioFilter2,
    hi_cut_filter: AudioFilter2,
    bright_filter: ShelvingLowCut,
    comb_filter: CombFilter,

    response: FrequencyResponse,
    publisher: ResponsePublisher,
    urids: CoreUrids,
    program: u8,
    peak: f32,
}

impl CabSim {
    pub fn new(config: &ProcessorConfig, ctx: &HostContext) -> Result<Self> {
        config.validate()?;
        let sr = config.sample_rate;
        let urids = CoreUrids::resolve(&ctx.urids);
        tracing::debug!(sample_rate = sr, "cab sim created");
        Ok(Self {
            trim: ControlInput::db(0.0, -20.0, 20.0),
            locut: ControlInput::new(120.0, 30.0, 300.0),
            bright: ControlInput::db(0.0, 0.0, 20.0),
            brightf: ControlInput::new(1300.0, 1000.0, 5000.0),
            hicut: ControlInput::new(6000.0, 2000.0, 13000.0),
            comb: ControlInput::new(0.0, -1.0, 1.0),
            combf: ControlInput::new(3000.0, 1000.0, 8000.0),
            peak_out: ControlOutput::new(0.0),

            lo_cut_filter: AudioFilter2::new(AnalogPrototype::HIPASS, 120.0, sr),
            hi_cut_filter: AudioFilter2::new(AnalogPrototype::LOWPASS, 6000.0, sr),
            bright_filter: ShelvingLowCut::new(1300.0, 0.0, sr),
            comb_filter: CombFilter::new(sr),

            response: FrequencyResponse::new(),
            publisher: ResponsePublisher::new(config, ctx.clock.clone(), urids),
            urids,
            program: 0,
            peak: 0.0,
        })
    }

    pub fn controls(&self) -> CabSimControls {
        CabSimControls {
            trim: self.trim.handle(),
            locut: self.locut.handle(),
            bright: self.bright.handle(),
            brightf: self.brightf.handle(),
            hicut: self.hicut.handle(),
            comb: self.comb.handle(),
            combf: self.combf.handle(),
            peak: self.peak_out.handle(),
        }
    }

    pub fn program(&self) -> u8 {
        self.program
    }

    /// Product of every stage's magnitude at `f`, before trim.
    pub fn frequency_response(&self, f: f32) -> f32 {
        self.lo_cut_filter.magnitude_at(f)
            * self.hi_cut_filter.magnitude_at(f)
            * self.bright_filter.magnitude_at(f)
            * self.comb_filter.magnitude_at(f)
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
        if self.comb.has_changed() {
            self.comb_filter.set_gain(self.comb.value());
            changed = true;
        }
        if self.combf.has_changed() {
            self.comb_filter.set_frequency(self.combf.value() as f64);
            changed = true;
        }
        changed
    }

    fn publish(&mut self, block: &mut ProcessBlock<'_>, frame: u64) {
        let (lo, hi, bright, comb) = (
            &self.lo_cut_filter,
            &self.hi_cut_filter,
            &self.bright_filter,
            &self.comb_filter,
        );
        let vector = self.response.compute(
            |f| lo.magnitude_at(f) * hi.magnitude_at(f) * bright.magnitude_at(f) * comb.magnitude_at(f),
            self.trim.amplitude(),
        );
        self.publisher.write_response(block.notify, frame, vector);
    }
}

impl Processor for CabSim {
    fn activate(&mut self) {
        tracing::trace!("cab sim activated");
        self.publisher.activate();
        self.lo_cut_filter.reset();
        self.hi_cut_filter.reset();
        self.bright_filter.reset();
        self.comb_filter.reset();
        self.peak = 0.0;
    }

    fn deactivate(&mut self) {
        tracing::trace!("cab sim deactivated");
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
        for (out, &x) in block.output.iter_mut().zip(block.input.iter()) {
            let y = flush_denormal(self.comb_filter.tick(self.bright_filter.tick(
                self.hi_cut_filter.tick(self.lo_cut_filter.tick(trim * x)),
            )));
            self.peak = self.peak.max(y.abs());
            *out = y;
        }
        self.peak_out.set(self.peak);

        if let Some(frame) = self.publisher.end_block(block.len()) {
            self.publish(block, frame);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use toob_core::{InputEvent, ManualClock, NotifyBuffer, PropertyValue, UridMap};

    fn cab() -> (CabSim, CoreUrids) {
        let map = Arc::new(UridMap::new());
        let ctx = HostContext::new()
            .with_urids(map.clone())
            .with_clock(Arc::new(ManualClock::new(0)));
        let mut cab = CabSim::new(&ProcessorConfig::default(), &ctx).unwrap();
        cab.activate();
        (cab, CoreUrids::resolve(&map))
    }

    fn run(cab: &mut CabSim, n: usize, events: &mut [InputEvent], notify: &mut NotifyBuffer) {
        let input = vec![0.1f32; n];
        let mut output = vec![0.0f32; n];
        notify.clear();
        cab.process(&mut ProcessBlock {
            input: &input,
            output: &mut output,
            events,
            notify,
        });
    }

    #[test]
    fn test_patch_get_publishes_same_block() {
        let (mut cab, urids) = cab();
        let mut notify = NotifyBuffer::new(8192);
        let mut events = [InputEvent::get(0, Some(urids.frequency_response_vector))];
        run(&mut cab, 64, &mut events, &mut notify);

        let msgs = notify.messages();
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].frame, 64);
        match msgs[0].property(urids.patch_value) {
            Some(PropertyValue::FloatVector(v)) => {
                assert_eq!(v.len(), 204);
                assert_eq!(&v[..4], &[30.0, 20000.0, 5.0, -35.0]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_get_for_other_property_is_ignored() {
        let (mut cab, urids) = cab();
        let mut notify = NotifyBuffer::new(8192);
        let mut events = [InputEvent::get(0, Some(urids.patch_value))];
        run(&mut cab, 64, &mut events, &mut notify);
        assert!(notify.is_empty());
    }

    #[test]
    fn test_response_tracks_hicut() {
        let (mut cab, _) = cab();
        let controls = cab.controls();
        let mut notify = NotifyBuffer::new(8192);
        run(&mut cab, 64, &mut [], &mut notify);
        let before = cab.frequency_response(8000.0);

        controls.hicut.set(2000.0);
        run(&mut cab, 64, &mut [], &mut notify);
        assert!(cab.frequency_response(8000.0) < before * 0.5);
    }

    #[test]
    fn test_program_change_is_recorded() {
        let (mut cab, _) = cab();
        let mut notify = NotifyBuffer::new(8192);
        run(&mut cab, 0, &mut [InputEvent::program_change(0, 7)], &mut notify);
        assert_eq!(cab.program(), 7);
    }
}
