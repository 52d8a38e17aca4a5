//! Filter building blocks and the two filter-only toob processors.
//!
//! - [`CabSim`]: speaker cabinet simulation with a published frequency response
//! - [`InputStage`]: trim, tone cleanup and noise gate ahead of an amp model
//! - [`SagProcessor`]: power-supply sag applied around an amp model
//! - [`filters`]: the biquads, analog-prototype filters, comb, tone stack,
//!   DC blocker and decimator they are built from

mod error;
pub use error::{Error, Result};

pub mod filters;

mod gate;
pub use gate::{NoiseGate, GATE_OFF_DB};

mod sag;
pub use sag::{SagProcessor, DEFAULT_SAG_FREQUENCY, MAX_SAG_FREQUENCY, MIN_SAG_FREQUENCY};

mod cab_sim;
pub use cab_sim::{CabSim, CabSimControls};

mod input_stage;
pub use input_stage::{InputStage, InputStageControls};

/// Zero out values small enough to be denormal after a few more multiplies.
#[inline]
pub fn flush_denormal(x: f32) -> f32 {
    if x.abs() < 1.0e-18 {
        0.0
    } else {
        x
    }
}
