//! Amp model abstraction and the on-disk model format.

use crate::error::{Error, Result};
use crate::lstm::{LstmModel, LstmSpec};
use crate::waveshaper::{Waveshaper, WaveshaperSpec};
use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// A loaded amp model.
///
/// Selected once at load time and driven through a single dynamic call per
/// block. Implementations must not allocate in `process`.
pub trait AmpModel: Send {
    /// Clear recurrent state.
    fn reset(&mut self);

    /// Process `buffer` in place. `gain` is the gain control, `0..=1`.
    fn process(&mut self, buffer: &mut [f32], gain: f32);

    /// Whether the model responds to the gain control.
    fn is_gain_enabled(&self) -> bool;
}

/// Model file contents, dispatched on `"architecture"`.
#[derive(Debug, Deserialize)]
#[serde(tag = "architecture")]
pub enum ModelSpec {
    Waveshaper(WaveshaperSpec),
    #[serde(rename = "LSTM")]
    Lstm(LstmSpec),
}

impl ModelSpec {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn build(self) -> Result<Box<dyn AmpModel>> {
        Ok(match self {
            ModelSpec::Waveshaper(spec) => Box::new(Waveshaper::new(spec)?),
            ModelSpec::Lstm(spec) => Box::new(LstmModel::new(spec)?),
        })
    }
}

/// Read and build a model. Blocking; call from a worker.
pub fn load_model(path: &Path) -> Result<Box<dyn AmpModel>> {
    if !path.is_file() {
        return Err(Error::InvalidModel(format!("{} is not a file", path.display())));
    }
    let reader = BufReader::new(File::open(path)?);
    let spec: ModelSpec = serde_json::from_reader(reader)?;
    spec.build()
}

/// Maps the `0..=1` gain control to a drive multiplier, 0.5 being unity.
#[inline]
pub(crate) fn gain_to_drive(gain: f32) -> f32 {
    toob_core::db_to_amplitude((gain.clamp(0.0, 1.0) - 0.5) * 24.0)
}
