//! Feed-forward comb: `y[n] = (x[n] + g * x[n - D]) / (1 + |g|)`.
//!
//! Models the notches a cabinet's back wall adds. `D = sample_rate / frequency`.

use std::f64::consts::PI;

pub const MIN_COMB_HZ: f64 = 1000.0;
pub const MAX_COMB_HZ: f64 = 8000.0;

#[derive(Clone, Debug)]
pub struct CombFilter {
    line: Vec<f32>,
    pos: usize,
    delay: usize,
    gain: f32,
    norm: f32,
    sample_rate: f64,
}

impl CombFilter {
    pub fn new(sample_rate: f64) -> Self {
        let max_delay = (sample_rate / MIN_COMB_HZ).ceil() as usize + 1;
        let mut comb = Self {
            line: vec![0.0; max_delay],
            pos: 0,
            delay: 1,
            gain: 0.0,
            norm: 1.0,
            sample_rate,
        };
        comb.set_frequency(4000.0);
        comb
    }

    /// Comb depth, `-1..=1`. Zero bypasses.
    pub fn set_gain(&mut self, gain: f32) {
        self.gain = gain.clamp(-1.0, 1.0);
        self.norm = 1.0 / (1.0 + self.gain.abs());
    }

    pub fn set_frequency(&mut self, hz: f64) {
        let hz = hz.clamp(MIN_COMB_HZ, MAX_COMB_HZ);
        self.delay = ((self.sample_rate / hz).round() as usize).clamp(1, self.line.len() - 1);
    }

    pub fn delay(&self) -> usize {
        self.delay
    }

    pub fn reset(&mut self) {
        self.line.fill(0.0);
        self.pos = 0;
    }

    #[inline]
    pub fn tick(&mut self, x: f32) -> f32 {
        let len = self.line.len();
        let read = (self.pos + len - self.delay) % len;
        let delayed = self.line[read];
        self.line[self.pos] = x;
        self.pos = (self.pos + 1) % len;
        (x + self.gain * delayed) * self.norm
    }

    pub fn magnitude_at(&self, frequency: f32) -> f32 {
        let w = 2.0 * PI * frequency as f64 / self.sample_rate * self.delay as f64;
        let g = self.gain as f64;
        let re = 1.0 + g * w.cos();
        let im = -g * w.sin();
        ((re * re + im * im).sqrt() * self.norm as f64) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bypass_at_zero_gain() {
        let mut comb = CombFilter::new(48000.0);
        for i in 0..100 {
            let x = (i as f32 * 0.1).sin();
            assert_eq!(comb.tick(x), x);
        }
        assert_eq!(comb.magnitude_at(1234.0), 1.0);
    }

    #[test]
    fn test_impulse_echo_at_delay() {
        let mut comb = CombFilter::new(48000.0);
        comb.set_gain(1.0);
        comb.set_frequency(4000.0);
        assert_eq!(comb.delay(), 12);
        let out: Vec<f32> = (0..20).map(|i| comb.tick(if i == 0 { 1.0 } else { 0.0 })).collect();
        assert_eq!(out[0], 0.5);
        assert_eq!(out[12], 0.5);
        assert!(out.iter().enumerate().all(|(i, &v)| i == 0 || i == 12 || v == 0.0));
    }

    #[test]
    fn test_notch_at_half_comb_frequency() {
        let mut comb = CombFilter::new(48000.0);
        comb.set_gain(1.0);
        comb.set_frequency(4000.0);
        assert!(comb.magnitude_at(2000.0) < 1e-3);
        assert!((comb.magnitude_at(4000.0) - 1.0).abs() < 1e-3);
    }
}
