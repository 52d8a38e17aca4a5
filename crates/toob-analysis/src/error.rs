//! Error types for toob-analysis

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid tuner config: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Core(#[from] toob_core::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
