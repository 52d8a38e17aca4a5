//! Tolerance constants for audio testing.

/// Floating point rounding errors (passthrough, exact gain).
pub const FLOAT_EPSILON: f32 = 1e-6;

/// Filter processing and response computation.
pub const DSP_EPSILON: f32 = 1e-4;

/// Silence threshold (~-80dB). Values below this are considered silent.
pub const SILENCE_THRESHOLD: f32 = 0.0001;

/// Pitch estimates, in Hz.
pub const PITCH_EPSILON_HZ: f32 = 1.0;
