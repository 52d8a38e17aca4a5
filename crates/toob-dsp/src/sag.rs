//! Power-supply sag.
//!
//! A tube amp's supply droops while the output stage draws current, pulling
//! down both the output level and, through the shared rail, the drive into the
//! preamp. The draw is tracked as a smoothed envelope of the output.

use std::f64::consts::PI;

pub const DEFAULT_SAG_FREQUENCY: f32 = 13.0;
pub const MIN_SAG_FREQUENCY: f32 = 5.0;
pub const MAX_SAG_FREQUENCY: f32 = 25.0;

/// Gain reduction at full depth and a full-scale envelope is 1 / (1 + DEPTH).
const DEPTH: f32 = 1.0;

#[derive(Debug, Clone)]
pub struct SagProcessor {
    sag: f32,
    sag_drive: f32,
    coeff: f32,
    envelope: f32,
    sample_rate: f64,
}

impl SagProcessor {
    pub fn new(sample_rate: f64) -> Self {
        let mut sag = Self {
            sag: 0.0,
            sag_drive: 0.0,
            coeff: 0.0,
            envelope: 0.0,
            sample_rate,
        };
        sag.set_frequency(DEFAULT_SAG_FREQUENCY);
        sag
    }

    /// Output level drop, 0..1.
    pub fn set_sag(&mut self, sag: f32) {
        self.sag = sag.clamp(0.0, 1.0);
    }

    /// Drive drop ahead of the model, 0..1.
    pub fn set_sag_drive(&mut self, sag_drive: f32) {
        self.sag_drive = sag_drive.clamp(0.0, 1.0);
    }

    /// Corner of the supply envelope, in Hz. Lower is a slower, spongier supply.
    pub fn set_frequency(&mut self, frequency: f32) {
        let f = frequency.clamp(MIN_SAG_FREQUENCY, MAX_SAG_FREQUENCY) as f64;
        self.coeff = (-2.0 * PI * f / self.sample_rate).exp() as f32;
    }

    pub fn is_driving(&self) -> bool {
        self.sag_drive > 0.0
    }

    pub fn envelope(&self) -> f32 {
        self.envelope
    }

    pub fn reset(&mut self) {
        self.envelope = 0.0;
    }

    /// Multiplier for the signal going into the model.
    #[inline]
    pub fn drive_gain(&self) -> f32 {
        1.0 / (1.0 + DEPTH * self.sag_drive * self.envelope)
    }

    /// Apply the output drop to one model output sample and track its draw.
    #[inline]
    pub fn tick(&mut self, y: f32) -> f32 {
        let out = y / (1.0 + DEPTH * self.sag * self.envelope);
        self.envelope = y.abs() + self.coeff * (self.envelope - y.abs());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_sag_is_transparent() {
        let mut sag = SagProcessor::new(48000.0);
        for n in 0..4800 {
            let x = (n as f32 * 0.05).sin();
            assert_eq!(sag.tick(x), x);
        }
        assert!(sag.envelope() > 0.1);
        assert_eq!(sag.drive_gain(), 1.0);
    }

    #[test]
    fn test_loud_signal_sags() {
        let mut sag = SagProcessor::new(48000.0);
        sag.set_sag(1.0);
        sag.set_sag_drive(0.5);
        let mut y = 0.0;
        for _ in 0..48000 {
            y = sag.tick(0.8);
        }
        // Envelope settles on the level; output drops by 1 / (1 + 0.8).
        assert!((sag.envelope() - 0.8).abs() < 1e-3);
        assert!((y - 0.8 / 1.8).abs() < 1e-3, "y {y}");
        assert!((sag.drive_gain() - 1.0 / 1.4).abs() < 1e-3);
    }

    #[test]
    fn test_frequency_sets_recovery_speed() {
        let settle = |hz: f32| {
            let mut sag = SagProcessor::new(48000.0);
            sag.set_frequency(hz);
            for _ in 0..48000 {
                sag.tick(1.0);
            }
            for _ in 0..480 {
                sag.tick(0.0);
            }
            sag.envelope()
        };
        assert!(settle(25.0) < settle(5.0));
        assert_eq!(settle(100.0), settle(MAX_SAG_FREQUENCY));
    }

    #[test]
    fn test_reset_clears_envelope() {
        let mut sag = SagProcessor::new(48000.0);
        sag.tick(1.0);
        sag.reset();
        assert_eq!(sag.envelope(), 0.0);
    }
}
