//! Centralized error type for the toob umbrella crate.
//!
//! Wraps all subsystem errors so `?` propagates naturally across crate boundaries.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] toob_core::Error),

    #[cfg(feature = "dsp")]
    #[error("DSP: {0}")]
    Dsp(#[from] toob_dsp::Error),

    #[cfg(feature = "neural")]
    #[error("Neural: {0}")]
    Neural(#[from] toob_neural::Error),

    #[cfg(feature = "analysis")]
    #[error("Analysis: {0}")]
    Analysis(#[from] toob_analysis::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
