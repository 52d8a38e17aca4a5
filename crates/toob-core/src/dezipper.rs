//! Zipper-free gain changes.
//!
//! Control ports are sampled once per block; a [`Dezipper`] spreads the jump
//! between two block values over a fixed ramp so level controls don't click.

/// Default ramp length.
pub const DEFAULT_RAMP_SECS: f32 = 0.05;

/// Linear ramp toward a target gain.
#[derive(Debug, Clone)]
pub struct Dezipper {
    current: f32,
    target: f32,
    step: f32,
    remaining: u32,
    ramp_samples: u32,
}

impl Dezipper {
    pub fn new(initial: f32, ramp_secs: f32, sample_rate: f64) -> Self {
        Self {
            current: initial,
            target: initial,
            step: 0.0,
            remaining: 0,
            ramp_samples: (ramp_secs as f64 * sample_rate).max(1.0) as u32,
        }
    }

    #[inline]
    pub fn set_target(&mut self, target: f32) {
        if target == self.target {
            return;
        }
        self.target = target;
        self.remaining = self.ramp_samples;
        self.step = (self.target - self.current) / self.ramp_samples as f32;
    }

    /// Jump straight to `value`. Used on activation, where there is nothing to ramp from.
    #[inline]
    pub fn reset(&mut self, value: f32) {
        self.current = value;
        self.target = value;
        self.step = 0.0;
        self.remaining = 0;
    }

    #[inline]
    pub fn tick(&mut self) -> f32 {
        if self.remaining > 0 {
            self.remaining -= 1;
            self.current = if self.remaining == 0 {
                self.target
            } else {
                self.current + self.step
            };
        }
        self.current
    }

    #[inline]
    pub fn target(&self) -> f32 {
        self.target
    }

    #[inline]
    pub fn is_ramping(&self) -> bool {
        self.remaining > 0
    }

    /// Multiply `buffer` by the ramped gain in place.
    #[inline]
    pub fn apply(&mut self, buffer: &mut [f32]) {
        if !self.is_ramping() {
            let g = self.current;
            if g != 1.0 {
                buffer.iter_mut().for_each(|s| *s *= g);
            }
            return;
        }
        for sample in buffer.iter_mut() {
            *sample *= self.tick();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reaches_target_exactly() {
        let mut dz = Dezipper::new(0.0, 0.001, 48000.0);
        dz.set_target(1.0);
        for _ in 0..48 {
            dz.tick();
        }
        assert_eq!(dz.tick(), 1.0);
        assert!(!dz.is_ramping());
    }

    #[test]
    fn test_ramp_is_monotonic() {
        let mut dz = Dezipper::new(1.0, 0.01, 48000.0);
        dz.set_target(0.0);
        let mut last = 1.0;
        while dz.is_ramping() {
            let v = dz.tick();
            assert!(v <= last);
            last = v;
        }
        assert_eq!(last, 0.0);
    }

    #[test]
    fn test_apply_steady_gain() {
        let mut dz = Dezipper::new(0.5, 0.01, 48000.0);
        let mut buf = [1.0f32; 8];
        dz.apply(&mut buf);
        assert!(buf.iter().all(|&s| s == 0.5));
    }

    #[test]
    fn test_reset_skips_ramp() {
        let mut dz = Dezipper::new(0.0, 0.1, 48000.0);
        dz.set_target(1.0);
        dz.reset(0.25);
        assert!(!dz.is_ramping());
        assert_eq!(dz.tick(), 0.25);
    }
}
