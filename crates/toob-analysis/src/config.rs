//! Tuner analysis configuration.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TunerConfig {
    /// Analysis window in decimated samples. Power of two.
    pub fft_size: usize,
    /// Target analysis rate; the real rate is the host rate over an integer factor.
    pub analysis_rate_hz: f64,
    /// Decimated samples between analyses. Defaults to half a window.
    pub update_frame_count: Option<usize>,
    /// Share of recent voiced estimates that must agree with a new one.
    pub agreement_fraction: f32,
    pub history_len: usize,
}

impl Default for TunerConfig {
    fn default() -> Self {
        Self {
            fft_size: 4096,
            analysis_rate_hz: 12000.0,
            update_frame_count: None,
            agreement_fraction: 0.6,
            history_len: 5,
        }
    }
}

impl TunerConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).map_err(toob_core::Error::from)?;
        config.validate()?;
        Ok(config)
    }

    pub fn update_frame_count(&self) -> usize {
        self.update_frame_count.unwrap_or(self.fft_size / 2)
    }

    pub fn validate(&self) -> Result<()> {
        if self.fft_size < 256 || !self.fft_size.is_power_of_two() {
            return Err(Error::InvalidConfig(format!(
                "fft_size {} must be a power of two of at least 256",
                self.fft_size
            )));
        }
        if !(1000.0..=96000.0).contains(&self.analysis_rate_hz) {
            return Err(Error::InvalidConfig(format!(
                "analysis_rate_hz {} out of range (1000-96000 Hz)",
                self.analysis_rate_hz
            )));
        }
        let count = self.update_frame_count();
        if count == 0 || count > self.fft_size {
            return Err(Error::InvalidConfig(format!(
                "update_frame_count {} out of range (1-{})",
                count, self.fft_size
            )));
        }
        if !(0.0..=1.0).contains(&self.agreement_fraction) {
            return Err(Error::InvalidConfig(format!(
                "agreement_fraction {} out of range (0-1)",
                self.agreement_fraction
            )));
        }
        if self.history_len == 0 {
            return Err(Error::InvalidConfig("history_len must be non-zero".into()));
        }
        Ok(())
    }
}
