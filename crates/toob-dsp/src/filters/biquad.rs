//! Second-order IIR section, Direct Form II Transposed.
//!
//! Coefficients are kept in f64; samples are f32.

use std::f64::consts::PI;

/// RBJ cookbook shapes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BiquadType {
    LowShelf,
    HighShelf,
    Peaking,
    HighPass,
    LowPass,
}

/// Normalized coefficients (a0 = 1).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Coefficients {
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    pub a1: f64,
    pub a2: f64,
}

impl Coefficients {
    pub const IDENTITY: Self = Self {
        b0: 1.0,
        b1: 0.0,
        b2: 0.0,
        a1: 0.0,
        a2: 0.0,
    };

    /// Normalize raw `b0..b2 / a0..a2` by `a0`.
    pub fn normalized(b: [f64; 3], a: [f64; 3]) -> Self {
        let a0 = a[0];
        Self {
            b0: b[0] / a0,
            b1: b[1] / a0,
            b2: b[2] / a0,
            a1: a[1] / a0,
            a2: a[2] / a0,
        }
    }

    /// Robert Bristow-Johnson's Audio EQ Cookbook.
    pub fn cookbook(kind: BiquadType, frequency: f64, gain_db: f64, q: f64, sample_rate: f64) -> Self {
        let omega = 2.0 * PI * frequency / sample_rate;
        let sin_omega = omega.sin();
        let cos_omega = omega.cos();
        let alpha = sin_omega / (2.0 * q);
        let a = 10.0_f64.powf(gain_db / 40.0);

        let (b, den) = match kind {
            BiquadType::Peaking => (
                [1.0 + alpha * a, -2.0 * cos_omega, 1.0 - alpha * a],
                [1.0 + alpha / a, -2.0 * cos_omega, 1.0 - alpha / a],
            ),
            BiquadType::LowShelf => {
                let k = 2.0 * a.sqrt() * alpha;
                (
                    [
                        a * ((a + 1.0) - (a - 1.0) * cos_omega + k),
                        2.0 * a * ((a - 1.0) - (a + 1.0) * cos_omega),
                        a * ((a + 1.0) - (a - 1.0) * cos_omega - k),
                    ],
                    [
                        (a + 1.0) + (a - 1.0) * cos_omega + k,
                        -2.0 * ((a - 1.0) + (a + 1.0) * cos_omega),
                        (a + 1.0) + (a - 1.0) * cos_omega - k,
                    ],
                )
            }
            BiquadType::HighShelf => {
                let k = 2.0 * a.sqrt() * alpha;
                (
                    [
                        a * ((a + 1.0) + (a - 1.0) * cos_omega + k),
                        -2.0 * a * ((a - 1.0) + (a + 1.0) * cos_omega),
                        a * ((a + 1.0) + (a - 1.0) * cos_omega - k),
                    ],
                    [
                        (a + 1.0) - (a - 1.0) * cos_omega + k,
                        2.0 * ((a - 1.0) - (a + 1.0) * cos_omega),
                        (a + 1.0) - (a - 1.0) * cos_omega - k,
                    ],
                )
            }
            BiquadType::HighPass => (
                [(1.0 + cos_omega) / 2.0, -(1.0 + cos_omega), (1.0 + cos_omega) / 2.0],
                [1.0 + alpha, -2.0 * cos_omega, 1.0 - alpha],
            ),
            BiquadType::LowPass => (
                [(1.0 - cos_omega) / 2.0, 1.0 - cos_omega, (1.0 - cos_omega) / 2.0],
                [1.0 + alpha, -2.0 * cos_omega, 1.0 - alpha],
            ),
        };
        Self::normalized(b, den)
    }

    /// |H(e^jw)| at `frequency`.
    pub fn magnitude(&self, frequency: f64, sample_rate: f64) -> f64 {
        let w = 2.0 * PI * frequency / sample_rate;
        let (c1, s1) = (w.cos(), w.sin());
        let (c2, s2) = ((2.0 * w).cos(), (2.0 * w).sin());
        let num_re = self.b0 + self.b1 * c1 + self.b2 * c2;
        let num_im = -(self.b1 * s1 + self.b2 * s2);
        let den_re = 1.0 + self.a1 * c1 + self.a2 * c2;
        let den_im = -(self.a1 * s1 + self.a2 * s2);
        ((num_re * num_re + num_im * num_im) / (den_re * den_re + den_im * den_im)).sqrt()
    }
}

#[derive(Clone, Debug)]
pub struct Biquad {
    coeffs: Coefficients,
    z1: f64,
    z2: f64,
    kind: BiquadType,
    frequency: f64,
    gain_db: f64,
    q: f64,
    sample_rate: f64,
}

impl Biquad {
    pub fn new(kind: BiquadType, frequency: f64, gain_db: f64, q: f64, sample_rate: f64) -> Self {
        Self {
            coeffs: Coefficients::cookbook(kind, frequency, gain_db, q, sample_rate),
            z1: 0.0,
            z2: 0.0,
            kind,
            frequency,
            gain_db,
            q,
            sample_rate,
        }
    }

    fn recalculate(&mut self) {
        self.coeffs =
            Coefficients::cookbook(self.kind, self.frequency, self.gain_db, self.q, self.sample_rate);
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

    pub fn reset(&mut self) {
        self.z1 = 0.0;
        self.z2 = 0.0;
    }

    pub fn set_frequency(&mut self, frequency: f64) {
        self.frequency = frequency;
        self.recalculate();
    }

    pub fn set_gain_db(&mut self, gain_db: f64) {
        self.gain_db = gain_db;
        self.recalculate();
    }

    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    pub fn gain_db(&self) -> f64 {
        self.gain_db
    }

    pub fn coefficients(&self) -> &Coefficients {
        &self.coeffs
    }

    #[inline]
    pub fn magnitude_at(&self, frequency: f32) -> f32 {
        self.coeffs.magnitude(frequency as f64, self.sample_rate) as f32
    }
}
