//! Control ports shared between the host and the audio thread.
//!
//! The host writes a control value through a [`ControlHandle`] whenever it
//! likes; the audio thread samples it once per block through
//! [`ControlInput::has_changed`]. Output ports run the other way.

use crate::compat::{Arc, Ordering};
use atomic_float::AtomicF32;

/// Level floor used for dB conversions.
pub const MIN_DB: f32 = -96.0;

/// Convert decibels to linear amplitude. Anything at or below [`MIN_DB`] is silence.
#[inline]
pub fn db_to_amplitude(db: f32) -> f32 {
    if db <= MIN_DB {
        0.0
    } else {
        10.0_f32.powf(db / 20.0)
    }
}

/// Convert linear amplitude to decibels, floored at [`MIN_DB`].
#[inline]
pub fn amplitude_to_db(amp: f32) -> f32 {
    if amp <= 0.0 {
        MIN_DB
    } else {
        (20.0 * amp.log10()).max(MIN_DB)
    }
}

/// Host-side handle to a control port cell.
#[derive(Debug, Clone)]
pub struct ControlHandle {
    cell: Arc<AtomicF32>,
}

impl ControlHandle {
    #[inline]
    pub fn set(&self, value: f32) {
        self.cell.store(value, Ordering::Release);
    }

    #[inline]
    pub fn get(&self) -> f32 {
        self.cell.load(Ordering::Acquire)
    }
}

/// An input control port with change detection.
///
/// `has_changed` consumes the change: it updates the remembered value, so it
/// must be called at most once per block per port. The first call after
/// construction always reports a change.
#[derive(Debug)]
pub struct ControlInput {
    cell: Arc<AtomicF32>,
    min: f32,
    max: f32,
    last: f32,
}

impl ControlInput {
    pub fn new(default: f32, min: f32, max: f32) -> Self {
        debug_assert!(max >= min, "max must not be below min");
        Self {
            cell: Arc::new(AtomicF32::new(default.clamp(min, max))),
            min,
            max,
            last: f32::NAN,
        }
    }

    /// A port holding a level in dB, clamped to `[min_db, max_db]`.
    pub fn db(default_db: f32, min_db: f32, max_db: f32) -> Self {
        Self::new(default_db, min_db, max_db)
    }

    pub fn handle(&self) -> ControlHandle {
        ControlHandle {
            cell: Arc::clone(&self.cell),
        }
    }

    /// True iff the host value differs from the value seen at the previous call.
    #[inline]
    pub fn has_changed(&mut self) -> bool {
        let current = self.cell.load(Ordering::Acquire).clamp(self.min, self.max);
        // NaN on the first call never compares equal.
        if current == self.last {
            return false;
        }
        self.last = current;
        true
    }

    /// Value observed at the last `has_changed` call (or the current host value
    /// if it has never been sampled).
    #[inline]
    pub fn value(&self) -> f32 {
        if self.last.is_nan() {
            self.cell.load(Ordering::Acquire).clamp(self.min, self.max)
        } else {
            self.last
        }
    }

    /// [`value`](Self::value) interpreted as dB and converted to amplitude.
    #[inline]
    pub fn amplitude(&self) -> f32 {
        db_to_amplitude(self.value())
    }

    /// Forget the last observed value so the next block reports a change.
    pub fn invalidate(&mut self) {
        self.last = f32::NAN;
    }
}

/// An output control port, written by the audio thread and read by the host.
#[derive(Debug, Clone)]
pub struct ControlOutput {
    cell: Arc<AtomicF32>,
}

impl ControlOutput {
    pub fn new(initial: f32) -> Self {
        Self {
            cell: Arc::new(AtomicF32::new(initial)),
        }
    }

    #[inline]
    pub fn set(&self, value: f32) {
        self.cell.store(value, Ordering::Release);
    }

    #[inline]
    pub fn get(&self) -> f32 {
        self.cell.load(Ordering::Acquire)
    }

    pub fn handle(&self) -> ControlHandle {
        ControlHandle {
            cell: Arc::clone(&self.cell),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_call_reports_change() {
        let mut port = ControlInput::new(0.5, 0.0, 1.0);
        assert!(port.has_changed());
        assert!(!port.has_changed());
        assert_eq!(port.value(), 0.5);
    }

    #[test]
    fn test_change_is_consumed() {
        let mut port = ControlInput::new(0.0, -10.0, 10.0);
        let host = port.handle();
        port.has_changed();

        host.set(3.0);
        assert!(port.has_changed());
        assert!(!port.has_changed(), "second read in the same block must not re-report");
        assert_eq!(port.value(), 3.0);
    }

    #[test]
    fn test_values_are_clamped() {
        let mut port = ControlInput::new(0.0, -10.0, 10.0);
        port.handle().set(50.0);
        port.has_changed();
        assert_eq!(port.value(), 10.0);

        // A host write that clamps to the same value is not a change.
        port.handle().set(60.0);
        assert!(!port.has_changed());
    }

    #[test]
    fn test_invalidate_forces_change() {
        let mut port = ControlInput::new(1.0, 0.0, 2.0);
        port.has_changed();
        port.invalidate();
        assert!(port.has_changed());
    }

    #[test]
    fn test_db_conversion() {
        assert!((db_to_amplitude(0.0) - 1.0).abs() < 1e-6);
        assert!((db_to_amplitude(-6.0) - 0.501).abs() < 0.01);
        assert_eq!(db_to_amplitude(MIN_DB), 0.0);
        assert!((amplitude_to_db(1.0)).abs() < 1e-6);
        assert_eq!(amplitude_to_db(0.0), MIN_DB);
    }

    #[test]
    fn test_output_port() {
        let out = ControlOutput::new(0.0);
        let host = out.handle();
        out.set(440.0);
        assert_eq!(host.get(), 440.0);
    }
}
