//! Second-order filters built from normalized analog prototypes.
//!
//! A prototype `H(s) = (b0 + b1 s + b2 s^2) / (a0 + a1 s + a2 s^2)` with its
//! corner at 1 rad/s is mapped to a digital biquad by the bilinear transform,
//! prewarped so the corner lands exactly on the requested cutoff.

use super::biquad::Coefficients;
use std::f64::consts::PI;

/// Analog prototype, coefficients in ascending powers of s.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AnalogPrototype {
    pub b: [f64; 3],
    pub a: [f64; 3],
}

impl AnalogPrototype {
    /// Chebyshev I low-pass, 0.2 dB ripple, -3 dB at 1.
    pub const LOWPASS: Self = Self {
        b: [0.8291449788086549, 0.0, 0.0],
        a: [0.8484582463996709, 1.156251050939778, 1.0],
    };

    /// Chebyshev I high-pass, 0.2 dB ripple, -3 dB at 1.
    pub const HIPASS: Self = Self {
        b: [0.0, 0.0, 0.982613364180136],
        a: [1.102510328053848, 1.097734328563927, 1.0],
    };

    /// Bilinear transform with the corner prewarped to `cutoff` Hz.
    pub fn bilinear(&self, cutoff: f64, sample_rate: f64) -> Coefficients {
        let cutoff = cutoff.clamp(1.0, sample_rate * 0.45);
        let k = (PI * cutoff / sample_rate).tan();
        let k2 = k * k;
        let map = |c: &[f64; 3]| {
            [
                c[0] * k2 + c[1] * k + c[2],
                2.0 * c[0] * k2 - 2.0 * c[2],
                c[0] * k2 - c[1] * k + c[2],
            ]
        };
        Coefficients::normalized(map(&self.b), map(&self.a))
    }
}

/// Cutoff-tunable filter over an [`AnalogPrototype`].
#[derive(Clone, Debug)]
pub struct AudioFilter2 {
    prototype: AnalogPrototype,
    coeffs: Coefficients,
    cutoff: f64,
    sample_rate: f64,
    z1: f64,
    z2: f64,
}

impl AudioFilter2 {
    pub fn new(prototype: AnalogPrototype, cutoff: f64, sample_rate: f64) -> Self {
        Self {
            prototype,
            coeffs: prototype.bilinear(cutoff, sample_rate),
            cutoff,
            sample_rate,
            z1: 0.0,
            z2: 0.0,
        }
    }

    pub fn set_cutoff(&mut self, cutoff: f64) {
        if cutoff != self.cutoff {
            self.cutoff = cutoff;
            self.coeffs = self.prototype.bilinear(cutoff, self.sample_rate);
        }
    }

    pub fn cutoff(&self) -> f64 {
        self.cutoff
    }

    pub fn reset(&mut self) {
        self.z1 = 0.0;
        self.z2 = 0.0;
    }

    #[inline]
    pub fn tick(&mut self, input: f32) -> f32 {
        let x = input as f64;
        let c = &self.coeffs;
        let y = c.b0 * x + self.z1;
        self.z1 = c.b1 * x - c.a1 * y + self.z2;
        self.z2 = c.b2 * x - c.a2 * y;
        y as f32
    }

    #[inline]
    pub fn magnitude_at(&self, frequency: f32) -> f32 {
        self.coeffs.magnitude(frequency as f64, self.sample_rate) as f32
    }
}
