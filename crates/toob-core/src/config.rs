//! Processor configuration.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Default cap on outbound publishes per second.
pub const MAX_UPDATES_PER_SECOND: u32 = 10;

/// Default outbound notify buffer budget per block, in bytes.
pub const DEFAULT_NOTIFY_CAPACITY: usize = 8192;

/// Configuration shared by every processor instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorConfig {
    pub sample_rate: f64,
    /// Upper bound on publishes per second, in both sample and wall-clock time.
    pub max_updates_per_second: u32,
    /// Byte budget of the outbound notify buffer the host hands us each block.
    pub notify_capacity: usize,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000.0,
            max_updates_per_second: MAX_UPDATES_PER_SECOND,
            notify_capacity: DEFAULT_NOTIFY_CAPACITY,
        }
    }
}

impl ProcessorConfig {
    pub fn with_sample_rate(sample_rate: f64) -> Self {
        Self {
            sample_rate,
            ..Default::default()
        }
    }

    /// Parse from TOML. Missing keys take their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.sample_rate < 8000.0 || self.sample_rate > 384000.0 {
            return Err(Error::InvalidConfig(format!(
                "sample_rate {} out of range (8000-384000 Hz)",
                self.sample_rate
            )));
        }
        if self.max_updates_per_second == 0 || self.max_updates_per_second > 100 {
            return Err(Error::InvalidConfig(format!(
                "max_updates_per_second {} out of range (1-100)",
                self.max_updates_per_second
            )));
        }
        if self.notify_capacity < 64 {
            return Err(Error::InvalidConfig(format!(
                "notify_capacity {} too small (minimum 64 bytes)",
                self.notify_capacity
            )));
        }
        Ok(())
    }

    /// Samples between a change and its publish while audio is streaming.
    pub fn update_sample_delay(&self) -> i64 {
        (self.sample_rate / self.max_updates_per_second as f64) as i64
    }

    /// Milliseconds between a change and its publish while no samples flow.
    pub fn update_ms_delay(&self) -> u64 {
        1000 / self.max_updates_per_second as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ProcessorConfig::default();
        assert_eq!(config.sample_rate, 48000.0);
        assert!(config.validate().is_ok());
        assert_eq!(config.update_sample_delay(), 4800);
        assert_eq!(config.update_ms_delay(), 100);
    }

    #[test]
    fn test_delays_follow_sample_rate() {
        let config = ProcessorConfig::with_sample_rate(44100.0);
        assert_eq!(config.update_sample_delay(), 4410);
    }

    #[test]
    fn test_rejects_bad_sample_rate() {
        let config = ProcessorConfig::with_sample_rate(1000.0);
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_from_toml_partial() {
        let config = ProcessorConfig::from_toml_str("sample_rate = 96000.0\n").unwrap();
        assert_eq!(config.sample_rate, 96000.0);
        assert_eq!(config.max_updates_per_second, MAX_UPDATES_PER_SECOND);
        assert_eq!(config.notify_capacity, DEFAULT_NOTIFY_CAPACITY);
    }

    #[test]
    fn test_from_toml_invalid() {
        assert!(ProcessorConfig::from_toml_str("max_updates_per_second = 0\n").is_err());
        assert!(matches!(
            ProcessorConfig::from_toml_str("sample_rate = \"fast\"\n"),
            Err(Error::ConfigParse(_))
        ));
    }
}
