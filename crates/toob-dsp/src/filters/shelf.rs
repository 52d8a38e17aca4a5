//! Low shelf used as a "bright" control: cutting lows tilts the tone up.

use super::biquad::{Biquad, BiquadType};

const SHELF_Q: f64 = 0.707;

#[derive(Clone, Debug)]
pub struct ShelvingLowCut {
    shelf: Biquad,
}

impl ShelvingLowCut {
    pub fn new(cutoff: f64, low_cut_db: f64, sample_rate: f64) -> Self {
        Self {
            shelf: Biquad::new(BiquadType::LowShelf, cutoff, -low_cut_db.abs(), SHELF_Q, sample_rate),
        }
    }

    /// Attenuation below the cutoff, in dB. Sign is ignored.
    pub fn set_low_cut_db(&mut self, db: f64) {
        let gain = -db.abs();
        if gain != self.shelf.gain_db() {
            self.shelf.set_gain_db(gain);
        }
    }

    pub fn set_cutoff(&mut self, hz: f64) {
        if hz != self.shelf.frequency() {
            self.shelf.set_frequency(hz);
        }
    }

    pub fn reset(&mut self) {
        self.shelf.reset();
    }

    #[inline]
    pub fn tick(&mut self, x: f32) -> f32 {
        self.shelf.tick(x)
    }

    #[inline]
    pub fn magnitude_at(&self, frequency: f32) -> f32 {
        self.shelf.magnitude_at(frequency)
    }
}
