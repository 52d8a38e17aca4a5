//! Neural amp models for toob.
//!
//! - [`AmpModel`]: the per-block model interface, with [`Waveshaper`] and
//!   [`LstmModel`] implementations loaded from JSON by [`load_model`]
//! - [`ModelSlot`]: worker-backed load / swap / retire lifecycle
//! - [`ToobMl`]: the amp processor built on them

mod error;
pub use error::{Error, Result};

mod model;
pub use model::{load_model, AmpModel, ModelSpec};

mod waveshaper;
pub use waveshaper::{Waveshaper, WaveshaperSpec};

mod lstm;
pub use lstm::{LstmModel, LstmSpec, LstmWeights};

mod loader;
pub use loader::{LoadOutcome, ModelLoader};

mod slot;
pub use slot::{LoadState, ModelSlot, Retired, SlotEvent};

mod toob_ml;
pub use toob_ml::{ToobMl, ToobMlControls};
