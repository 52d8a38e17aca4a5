//! Temporal consistency filter for pitch estimates.
//!
//! A tuner display should not flicker to a neighbouring note because one
//! analysis window caught a pick transient. Each new estimate is compared
//! with the recent history by pitch class; it is only let through when
//! enough of the recent non-zero estimates agree with it.

use std::collections::VecDeque;

/// Estimates closer than this many semitones (by pitch class) agree.
pub const MATCH_SEMITONES: f32 = 0.5;

#[derive(Debug, Clone)]
pub struct PitchFilter {
    history: VecDeque<f32>,
    history_len: usize,
    agreement: f32,
    reference_hz: f32,
}

/// Position within the octave, `0.0..12.0`.
#[inline]
fn pitch_class(freq: f32, reference_hz: f32) -> f32 {
    crate::pitch::midi_note(freq, reference_hz).rem_euclid(12.0)
}

impl PitchFilter {
    /// `history_len` past estimates are kept; `agreement` is the fraction of
    /// non-zero entries (the new one included) that must match.
    pub fn new(history_len: usize, agreement: f32) -> Self {
        Self {
            history: VecDeque::with_capacity(history_len.max(1)),
            history_len: history_len.max(1),
            agreement: agreement.clamp(0.0, 1.0),
            reference_hz: 440.0,
        }
    }

    pub fn set_reference(&mut self, reference_hz: f32) {
        self.reference_hz = reference_hz;
    }

    /// True when `current` and `historical` are the same note within
    /// [`MATCH_SEMITONES`], ignoring octave. Zero never matches.
    pub fn pitch_matches(&self, current: f32, historical: f32) -> bool {
        if current <= 0.0 || historical <= 0.0 {
            return false;
        }
        let a = pitch_class(current, self.reference_hz);
        let b = pitch_class(historical, self.reference_hz);
        let d = (a - b).abs();
        d.min(12.0 - d) < MATCH_SEMITONES
    }

    /// Feed the next raw estimate; returns it, or 0 if it is an outlier.
    pub fn filter(&mut self, value: f32) -> f32 {
        let mut accepted = value;
        if value > 0.0 {
            let mut voiced = 1usize;
            let mut matches = 1usize;
            for &past in &self.history {
                if past > 0.0 {
                    voiced += 1;
                    if self.pitch_matches(value, past) {
                        matches += 1;
                    }
                }
            }
            if (matches as f32) < self.agreement * voiced as f32 {
                accepted = 0.0;
            }
        }

        if self.history.len() == self.history_len {
            self.history.pop_front();
        }
        self.history.push_back(value);
        accepted
    }

    pub fn reset(&mut self) {
        self.history.clear();
    }
}
