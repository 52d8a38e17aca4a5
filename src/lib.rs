//! # Toob - Real-time guitar effect processors
//!
//! Host-agnostic audio processors built on one real-time scheduling core.
//!
//! ## Architecture
//!
//! Toob is an umbrella crate that coordinates:
//! - **toob-core** - Scheduling core (change detection, rate-limited publishing,
//!   worker offload, event channels)
//! - **toob-dsp** - Filters, the cabinet simulator and the input stage
//! - **toob-neural** - Neural amp models and the `ToobMl` processor
//! - **toob-analysis** - Pitch detection and the tuner
//!
//! ## Quick Start
//!
//! ```ignore
//! use toob::prelude::*;
//!
//! let config = ProcessorConfig::with_sample_rate(48000.0);
//! let worker = Arc::new(WorkerHost::spawn("toob-worker")?);
//! let ctx = HostContext::new().with_worker(worker);
//!
//! let mut host = OfflineHost::new(ToobMl::new(&config, &ctx)?, &config);
//! let (output, messages) = host.render(&input, 256);
//! ```
//!
//! ## Feature Flags
//!
//! - `default` / `full` - Everything enabled
//! - `dsp` - Cab sim, input stage, filters
//! - `neural` - Neural amp (implies `dsp`)
//! - `analysis` - Tuner (implies `dsp`)

/// Re-export of toob-core for direct access
pub use toob_core as core;

pub use toob_core::{
    Clock, Completion, ControlHandle, ControlInput, ControlOutput, CoreUrids, Disposer,
    EventBody, FrequencyResponse, HostContext, InputEvent, ManualClock, NotifyBuffer,
    NotifyMessage, ProcessBlock, Processor, ProcessorConfig, PropertyValue, PublishScheduler,
    ResponsePublisher, SystemClock, Urid, UridMap, WorkHandler, WorkerHost, WorkerSlot,
};

#[cfg(feature = "dsp")]
pub use toob_dsp as dsp;
#[cfg(feature = "dsp")]
pub use toob_dsp::{CabSim, CabSimControls, InputStage, InputStageControls};

#[cfg(feature = "neural")]
pub use toob_neural as neural;
#[cfg(feature = "neural")]
pub use toob_neural::{AmpModel, LoadState, ModelSlot, ToobMl, ToobMlControls};

#[cfg(feature = "analysis")]
pub use toob_analysis as analysis;
#[cfg(feature = "analysis")]
pub use toob_analysis::{PitchDetector, PitchFilter, ToobTuner, ToobTunerControls, TunerConfig};

mod error;
pub use error::{Error, Result};

mod host;
pub use host::OfflineHost;

pub mod prelude {
    pub use crate::{Error, OfflineHost, Result};
    pub use std::sync::Arc;
    pub use toob_core::prelude::*;
    pub use toob_core::{uris, ManualClock, NotifyMessage};

    #[cfg(feature = "dsp")]
    pub use crate::{CabSim, InputStage};
    #[cfg(feature = "neural")]
    pub use crate::{LoadState, ToobMl};
    #[cfg(feature = "analysis")]
    pub use crate::{ToobTuner, TunerConfig};
}
