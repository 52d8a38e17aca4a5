//! One-pole DC blocker: `y[n] = x[n] - x[n-1] + R * y[n-1]`.

use std::f64::consts::PI;

#[derive(Clone, Debug)]
pub struct DcBlocker {
    r: f32,
    x1: f32,
    y1: f32,
    sample_rate: f64,
}

impl DcBlocker {
    /// `cutoff` is the -3 dB corner, typically a few Hz.
    pub fn new(cutoff: f64, sample_rate: f64) -> Self {
        Self {
            r: (1.0 - 2.0 * PI * cutoff / sample_rate) as f32,
            x1: 0.0,
            y1: 0.0,
            sample_rate,
        }
    }

    pub fn reset(&mut self) {
        self.x1 = 0.0;
        self.y1 = 0.0;
    }

    #[inline]
    pub fn tick(&mut self, x: f32) -> f32 {
        let y = x - self.x1 + self.r * self.y1;
        self.x1 = x;
        self.y1 = y;
        y
    }

    pub fn magnitude_at(&self, frequency: f32) -> f32 {
        let w = 2.0 * PI * frequency as f64 / self.sample_rate;
        let r = self.r as f64;
        let num = ((1.0 - w.cos()).powi(2) + w.sin().powi(2)).sqrt();
        let den = ((1.0 - r * w.cos()).powi(2) + (r * w.sin()).powi(2)).sqrt();
        (num / den) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_removes_offset() {
        let mut dc = DcBlocker::new(10.0, 48000.0);
        let mut y = 1.0;
        for _ in 0..48000 {
            y = dc.tick(0.5);
        }
        assert!(y.abs() < 1e-3);
    }

    #[test]
    fn test_passes_audio_band() {
        let dc = DcBlocker::new(10.0, 48000.0);
        assert!(dc.magnitude_at(1000.0) > 0.99);
        assert!(dc.magnitude_at(1.0) < 0.2);
    }
}
