//! Filter collaborators. Each one exposes `tick` for audio and
//! `magnitude_at` for drawing its response.

mod biquad;
pub use biquad::{Biquad, BiquadType, Coefficients};

mod prototype;
pub use prototype::{AnalogPrototype, AudioFilter2};

mod shelf;
pub use shelf::ShelvingLowCut;

mod comb;
pub use comb::{CombFilter, MAX_COMB_HZ, MIN_COMB_HZ};

mod tone_stack;
pub use tone_stack::{ToneStack, TONE_RANGE_DB};

mod dc_blocker;
pub use dc_blocker::DcBlocker;

mod decimator;
pub use decimator::Decimator;
