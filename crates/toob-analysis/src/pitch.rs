//! Pitch detection using the YIN algorithm
//!
//! The YIN algorithm (de Cheveigné & Kawahara, 2002) with the difference
//! function computed from an FFT autocorrelation:
//!
//! 1. **Autocorrelation** - r(τ) = IFFT(conj(FFT(w)) · FFT(x)), w the first W samples
//! 2. **Difference function** - d(τ) = e(0) + e(τ) - 2·r(τ)
//! 3. **Cumulative mean normalized difference** - d'(τ)
//! 4. **Absolute threshold** - first local minimum of d'(τ) below threshold
//! 5. **Parabolic interpolation** - sub-sample accuracy
//!
//! Every buffer, including the FFT plans and scratch, is allocated when the
//! detector is built. `detect` itself does not allocate.

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

/// Result of pitch detection for a single frame
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PitchResult {
    /// Detected frequency in Hz (0.0 if unvoiced/uncertain)
    pub frequency: f32,
    /// Confidence/clarity of detection (0.0 - 1.0)
    pub confidence: f32,
    /// Nearest MIDI note number (if voiced)
    pub midi_note: Option<u8>,
    /// Cents deviation from nearest note (-50 to +50)
    pub cents_offset: f32,
}

impl PitchResult {
    pub fn is_voiced(&self) -> bool {
        self.frequency > 0.0 && self.confidence > 0.0
    }

    /// Note name with sharps, e.g. "A4", "C#5".
    pub fn note_name(&self) -> Option<String> {
        self.midi_note.map(|note| {
            const NAMES: [&str; 12] = [
                "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
            ];
            let name = NAMES[(note % 12) as usize];
            let octave = (note / 12) as i32 - 1;
            format!("{}{}", name, octave)
        })
    }
}

/// Pitch detector for fixed-length frames.
pub struct PitchDetector {
    sample_rate: f64,
    frame_size: usize,
    min_period: usize,
    max_period: usize,
    threshold: f32,

    forward: Arc<dyn Fft<f32>>,
    inverse: Arc<dyn Fft<f32>>,
    signal: Vec<Complex<f32>>,
    window: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
    cum_sq: Vec<f64>,
    difference: Vec<f32>,
    cumulative_mean: Vec<f32>,
}

impl PitchDetector {
    /// Detector for frames of `frame_size` samples, tracking 40 Hz - 2 kHz.
    pub fn new(sample_rate: f64, frame_size: usize) -> Self {
        Self::with_range(sample_rate, frame_size, 40.0, 2000.0)
    }

    pub fn with_range(sample_rate: f64, frame_size: usize, min_freq: f32, max_freq: f32) -> Self {
        // Need at least two periods of the lowest pitch in the frame.
        let max_period = ((sample_rate / min_freq as f64) as usize).min(frame_size / 2);
        let min_period = ((sample_rate / max_freq as f64) as usize).max(2);
        let window_len = frame_size - max_period;
        let fft_len = (frame_size + window_len).next_power_of_two();

        let mut planner = FftPlanner::new();
        let forward = planner.plan_fft_forward(fft_len);
        let inverse = planner.plan_fft_inverse(fft_len);
        let scratch_len = forward
            .get_inplace_scratch_len()
            .max(inverse.get_inplace_scratch_len());

        Self {
            sample_rate,
            frame_size,
            min_period,
            max_period,
            threshold: 0.1,
            forward,
            inverse,
            signal: vec![Complex::default(); fft_len],
            window: vec![Complex::default(); fft_len],
            scratch: vec![Complex::default(); scratch_len],
            cum_sq: vec![0.0; frame_size + 1],
            difference: vec![0.0; max_period + 1],
            cumulative_mean: vec![0.0; max_period + 1],
        }
    }

    /// YIN threshold, clamped to 0.01 - 0.5. Lower is stricter.
    pub fn set_threshold(&mut self, threshold: f32) {
        self.threshold = threshold.clamp(0.01, 0.5);
    }

    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Detect the pitch of one frame. Frames of the wrong length are unvoiced.
    pub fn detect(&mut self, samples: &[f32]) -> PitchResult {
        if samples.len() != self.frame_size || self.max_period <= self.min_period {
            return PitchResult::default();
        }

        self.compute_difference(samples);
        self.compute_cumulative_mean();

        let (period, aperiodicity) = self.find_best_period();
        if period == 0 {
            return PitchResult::default();
        }

        let refined_period = self.parabolic_interpolation(period);
        let frequency = (self.sample_rate / refined_period) as f32;
        let confidence = (1.0 - aperiodicity).max(0.0);
        let (midi_note, cents_offset) = freq_to_midi(frequency);

        PitchResult {
            frequency,
            confidence,
            midi_note: Some(midi_note),
            cents_offset,
        }
    }

    /// d(τ) = Σ(x[j] - x[j+τ])² over a window of `frame_size - max_period`.
    fn compute_difference(&mut self, samples: &[f32]) {
        let n = samples.len();
        let w = n - self.max_period;

        for (dst, &x) in self.signal.iter_mut().zip(samples) {
            *dst = Complex::new(x, 0.0);
        }
        self.signal[n..].fill(Complex::default());
        for (dst, &x) in self.window.iter_mut().zip(&samples[..w]) {
            *dst = Complex::new(x, 0.0);
        }
        self.window[w..].fill(Complex::default());

        self.forward
            .process_with_scratch(&mut self.signal, &mut self.scratch);
        self.forward
            .process_with_scratch(&mut self.window, &mut self.scratch);
        for (s, win) in self.signal.iter_mut().zip(&self.window) {
            *s *= win.conj();
        }
        self.inverse
            .process_with_scratch(&mut self.signal, &mut self.scratch);
        let norm = 1.0 / self.signal.len() as f64;

        self.cum_sq[0] = 0.0;
        for (i, &x) in samples.iter().enumerate() {
            self.cum_sq[i + 1] = self.cum_sq[i] + (x as f64) * (x as f64);
        }
        let energy = |start: usize| self.cum_sq[start + w] - self.cum_sq[start];

        let e0 = energy(0);
        self.difference[0] = 0.0;
        for tau in 1..=self.max_period {
            let r = self.signal[tau].re as f64 * norm;
            self.difference[tau] = (e0 + energy(tau) - 2.0 * r).max(0.0) as f32;
        }
    }

    /// d'(τ) = d(τ) / ((1/τ) Σ d(j)), d'(0) = 1
    fn compute_cumulative_mean(&mut self) {
        self.cumulative_mean[0] = 1.0;
        let mut running_sum = 0.0f32;
        for tau in 1..=self.max_period {
            running_sum += self.difference[tau];
            self.cumulative_mean[tau] = if running_sum > 1e-10 {
                self.difference[tau] * tau as f32 / running_sum
            } else {
                1.0
            };
        }
    }

    /// First local minimum below threshold, so subharmonics don't win.
    /// Returns `(period, aperiodicity)`; period 0 means unvoiced.
    fn find_best_period(&self) -> (usize, f32) {
        let mut tau = self.min_period;
        while tau < self.max_period {
            if self.cumulative_mean[tau] < self.threshold {
                while tau + 1 < self.max_period
                    && self.cumulative_mean[tau + 1] < self.cumulative_mean[tau]
                {
                    tau += 1;
                }
                return (tau, self.cumulative_mean[tau]);
            }
            tau += 1;
        }

        let (best_tau, best_val) = (self.min_period..=self.max_period)
            .map(|t| (t, self.cumulative_mean[t]))
            .fold((0, f32::MAX), |best, cur| if cur.1 < best.1 { cur } else { best });

        if best_val < 0.5 {
            (best_tau, best_val)
        } else {
            (0, 1.0)
        }
    }

    fn parabolic_interpolation(&self, tau: usize) -> f64 {
        if tau < 1 || tau >= self.max_period {
            return tau as f64;
        }
        let s0 = self.cumulative_mean[tau - 1] as f64;
        let s1 = self.cumulative_mean[tau] as f64;
        let s2 = self.cumulative_mean[tau + 1] as f64;

        let denominator = 2.0 * (2.0 * s1 - s2 - s0);
        if denominator.abs() > 1e-10 {
            tau as f64 + (s2 - s0) / denominator
        } else {
            tau as f64
        }
    }
}

/// Fractional MIDI note of `freq` given the frequency of A4.
#[inline]
pub fn midi_note(freq: f32, a4_hz: f32) -> f32 {
    69.0 + 12.0 * (freq / a4_hz).log2()
}

/// Convert frequency to the nearest MIDI note and the cents offset from it.
pub fn freq_to_midi(freq: f32) -> (u8, f32) {
    if freq <= 0.0 {
        return (0, 0.0);
    }
    let note = (midi_note(freq, 440.0).round() as i32).clamp(0, 127) as u8;
    let cents = 1200.0 * (freq / midi_to_freq(note)).log2();
    (note, cents)
}

pub fn midi_to_freq(note: u8) -> f32 {
    440.0 * 2.0f32.powf((note as f32 - 69.0) / 12.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generate_sine(sample_rate: f64, freq: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| {
                let t = i as f32 / sample_rate as f32;
                (2.0 * std::f32::consts::PI * freq * t).sin()
            })
            .collect()
    }

    #[test]
    fn test_detect_a440() {
        let mut detector = PitchDetector::new(12000.0, 4096);
        let result = detector.detect(&generate_sine(12000.0, 440.0, 4096));

        assert!(result.is_voiced(), "Should detect voiced signal");
        assert!(
            (result.frequency - 440.0).abs() < 2.0,
            "Expected ~440 Hz, got {} Hz",
            result.frequency
        );
        assert_eq!(result.midi_note, Some(69));
        assert_eq!(result.note_name().as_deref(), Some("A4"));
    }

    #[test]
    fn test_guitar_range() {
        let mut detector = PitchDetector::new(12000.0, 4096);
        for &freq in &[82.41f32, 110.0, 196.0, 329.63, 987.77] {
            let result = detector.detect(&generate_sine(12000.0, freq, 4096));
            let error_percent = ((result.frequency - freq) / freq).abs() * 100.0;
            assert!(
                error_percent < 1.5,
                "Expected {}Hz, got {}Hz ({}% error)",
                freq,
                result.frequency,
                error_percent
            );
        }
    }

    #[test]
    fn test_silence_is_unvoiced() {
        let mut detector = PitchDetector::new(12000.0, 4096);
        let result = detector.detect(&vec![0.0; 4096]);
        assert!(!result.is_voiced());
    }

    #[test]
    fn test_wrong_frame_length() {
        let mut detector = PitchDetector::new(12000.0, 2048);
        let result = detector.detect(&generate_sine(12000.0, 440.0, 1024));
        assert_eq!(result, PitchResult::default());
    }

    #[test]
    fn test_freq_midi_conversion() {
        let (note, cents) = freq_to_midi(440.0);
        assert_eq!(note, 69);
        assert!(cents.abs() < 1.0);

        for midi in [40, 45, 50, 55, 59, 64] {
            let (back, cents) = freq_to_midi(midi_to_freq(midi));
            assert_eq!(back, midi);
            assert!(cents.abs() < 0.01);
        }
        assert!((midi_note(432.0, 432.0) - 69.0).abs() < 1e-6);
    }
}
