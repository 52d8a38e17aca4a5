//! Anti-aliased integer downsampling.

use super::biquad::{Biquad, BiquadType};

/// Two cascaded Butterworth-Q low-pass sections ahead of an integer decimation.
#[derive(Clone, Debug)]
pub struct Decimator {
    factor: usize,
    phase: usize,
    stages: [Biquad; 2],
}

impl Decimator {
    /// `factor` of 1 passes every sample through the filter unchanged in rate.
    pub fn new(factor: usize, sample_rate: f64) -> Self {
        let factor = factor.max(1);
        let cutoff = (sample_rate / factor as f64) * 0.4;
        let stage = Biquad::new(BiquadType::LowPass, cutoff, 0.0, 0.7071, sample_rate);
        Self {
            factor,
            phase: 0,
            stages: [stage.clone(), stage],
        }
    }

    /// Integer factor bringing `sample_rate` down to roughly `target_rate` or above.
    pub fn factor_for(sample_rate: f64, target_rate: f64) -> usize {
        ((sample_rate / target_rate).floor() as usize).max(1)
    }

    pub fn factor(&self) -> usize {
        self.factor
    }

    pub fn reset(&mut self) {
        self.phase = 0;
        self.stages.iter_mut().for_each(Biquad::reset);
    }

    /// Filter one input sample. Every `factor`th call yields an output.
    #[inline]
    pub fn push(&mut self, x: f32) -> Option<f32> {
        let s0 = self.stages[0].tick(x);
        let y = self.stages[1].tick(s0);
        self.phase += 1;
        if self.phase == self.factor {
            self.phase = 0;
            Some(y)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_rate() {
        let mut d = Decimator::new(4, 48000.0);
        let count = (0..4800).filter_map(|_| d.push(0.1)).count();
        assert_eq!(count, 1200);
    }

    #[test]
    fn test_factor_for() {
        assert_eq!(Decimator::factor_for(48000.0, 12000.0), 4);
        assert_eq!(Decimator::factor_for(44100.0, 12000.0), 3);
        assert_eq!(Decimator::factor_for(8000.0, 12000.0), 1);
    }

    #[test]
    fn test_rejects_above_new_nyquist() {
        let sr = 48000.0;
        let mut d = Decimator::new(4, sr);
        let mut peak = 0.0f32;
        for n in 0..9600 {
            let x = (2.0 * std::f32::consts::PI * 10000.0 * n as f32 / sr as f32).sin();
            if let Some(y) = d.push(x) {
                if n > 4800 {
                    peak = peak.max(y.abs());
                }
            }
        }
        assert!(peak < 0.1, "aliased energy {peak}");
    }
}
