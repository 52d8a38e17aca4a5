//! Static tanh waveshaper: `level * tanh(drive * x)`.

use crate::error::{Error, Result};
use crate::model::{gain_to_drive, AmpModel};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct WaveshaperSpec {
    pub drive: f32,
    pub level: f32,
    #[serde(default = "default_gain_enabled")]
    pub gain_enabled: bool,
}

fn default_gain_enabled() -> bool {
    true
}

#[derive(Debug, Clone)]
pub struct Waveshaper {
    drive: f32,
    level: f32,
    gain_enabled: bool,
}

impl Waveshaper {
    pub fn new(spec: WaveshaperSpec) -> Result<Self> {
        if !(spec.drive.is_finite() && spec.drive > 0.0) || !spec.level.is_finite() {
            return Err(Error::InvalidModel(format!(
                "waveshaper drive {} / level {} out of range",
                spec.drive, spec.level
            )));
        }
        Ok(Self {
            drive: spec.drive,
            level: spec.level,
            gain_enabled: spec.gain_enabled,
        })
    }

    pub fn level(&self) -> f32 {
        self.level
    }
}

impl AmpModel for Waveshaper {
    fn reset(&mut self) {}

    fn process(&mut self, buffer: &mut [f32], gain: f32) {
        let drive = if self.gain_enabled {
            self.drive * gain_to_drive(gain)
        } else {
            self.drive
        };
        for x in buffer.iter_mut() {
            *x = self.level * (drive * *x).tanh();
        }
    }

    fn is_gain_enabled(&self) -> bool {
        self.gain_enabled
    }
}
