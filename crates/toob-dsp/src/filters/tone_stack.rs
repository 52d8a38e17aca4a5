//! Bass / mid / treble tone stack.
//!
//! Each control runs `0..=1` with 0.5 flat, mapped to ±12 dB on a low shelf,
//! a mid peak and a high shelf.

use super::biquad::{Biquad, BiquadType};

pub const TONE_RANGE_DB: f64 = 12.0;
const BASS_HZ: f64 = 100.0;
const MID_HZ: f64 = 650.0;
const TREBLE_HZ: f64 = 3000.0;

#[inline]
fn control_to_db(value: f32) -> f64 {
    (value.clamp(0.0, 1.0) as f64 * 2.0 - 1.0) * TONE_RANGE_DB
}

#[derive(Clone, Debug)]
pub struct ToneStack {
    bass: Biquad,
    mid: Biquad,
    treble: Biquad,
}

impl ToneStack {
    pub fn new(sample_rate: f64) -> Self {
        Self {
            bass: Biquad::new(BiquadType::LowShelf, BASS_HZ, 0.0, 0.707, sample_rate),
            mid: Biquad::new(BiquadType::Peaking, MID_HZ, 0.0, 0.7, sample_rate),
            treble: Biquad::new(BiquadType::HighShelf, TREBLE_HZ, 0.0, 0.707, sample_rate),
        }
    }

    pub fn set_bass(&mut self, value: f32) {
        self.bass.set_gain_db(control_to_db(value));
    }

    pub fn set_mid(&mut self, value: f32) {
        self.mid.set_gain_db(control_to_db(value));
    }

    pub fn set_treble(&mut self, value: f32) {
        self.treble.set_gain_db(control_to_db(value));
    }

    pub fn reset(&mut self) {
        self.bass.reset();
        self.mid.reset();
        self.treble.reset();
    }

    #[inline]
    pub fn tick(&mut self, x: f32) -> f32 {
        self.treble.tick(self.mid.tick(self.bass.tick(x)))
    }

    pub fn magnitude_at(&self, frequency: f32) -> f32 {
        self.bass.magnitude_at(frequency)
            * self.mid.magnitude_at(frequency)
            * self.treble.magnitude_at(frequency)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_centered_controls_are_flat() {
        let mut stack = ToneStack::new(48000.0);
        stack.set_bass(0.5);
        stack.set_mid(0.5);
        stack.set_treble(0.5);
        for f in [50.0, 650.0, 5000.0] {
            assert!((stack.magnitude_at(f) - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_treble_boost() {
        let mut stack = ToneStack::new(48000.0);
        stack.set_treble(1.0);
        assert!(stack.magnitude_at(12000.0) > 3.5);
        assert!(stack.magnitude_at(50.0) < 1.1);
    }
}
