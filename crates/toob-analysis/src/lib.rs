//! Pitch analysis for toob.
//!
//! - [`PitchDetector`]: FFT-accelerated YIN over fixed frames
//! - [`PitchFilter`]: suppresses estimates that disagree with recent history
//! - [`ToobTuner`]: the tuner processor, running detection on the worker

mod error;
pub use error::{Error, Result};

mod config;
pub use config::TunerConfig;

pub mod pitch;
pub use pitch::{freq_to_midi, midi_to_freq, PitchDetector, PitchResult};

mod pitch_filter;
pub use pitch_filter::{PitchFilter, MATCH_SEMITONES};

mod tuner;
pub use tuner::{Analysis, PitchWorker, ToobTuner, ToobTunerControls, TunerStats};
