//! Self-keyed noise gate.

use toob_core::{amplitude_to_db, db_to_amplitude};

/// Threshold at or below which the gate is switched off entirely.
pub const GATE_OFF_DB: f32 = -80.0;

const ATTACK_SECS: f32 = 0.001;
const HOLD_SECS: f32 = 0.05;
const RELEASE_SECS: f32 = 0.1;
const RANGE_DB: f32 = -80.0;
/// Opening is this many dB above the closing threshold.
const HYSTERESIS_DB: f32 = 3.0;

#[inline]
pub(crate) fn time_to_coeff(time_seconds: f32, sample_rate: f64) -> f32 {
    if time_seconds <= 0.0 {
        0.0
    } else {
        (-1.0 / (time_seconds * sample_rate as f32)).exp()
    }
}

/// Gate driven by its own input.
///
/// Opens when the input crosses the threshold plus hysteresis, holds for a
/// short time once the input drops below the threshold, then releases down
/// to the range floor.
#[derive(Debug, Clone)]
pub struct NoiseGate {
    threshold_db: f32,
    gate_level: f32,
    hold_counter: usize,
    attack_coeff: f32,
    release_coeff: f32,
    hold_samples: usize,
    floor: f32,
    open: bool,
}

impl NoiseGate {
    pub fn new(threshold_db: f32, sample_rate: f64) -> Self {
        Self {
            threshold_db,
            gate_level: 0.0,
            hold_counter: 0,
            attack_coeff: time_to_coeff(ATTACK_SECS, sample_rate),
            release_coeff: time_to_coeff(RELEASE_SECS, sample_rate),
            hold_samples: (HOLD_SECS * sample_rate as f32) as usize,
            floor: db_to_amplitude(RANGE_DB),
            open: false,
        }
    }

    pub fn set_threshold_db(&mut self, threshold_db: f32) {
        self.threshold_db = threshold_db;
    }

    pub fn is_enabled(&self) -> bool {
        self.threshold_db > GATE_OFF_DB
    }

    pub fn is_open(&self) -> bool {
        !self.is_enabled() || self.open
    }

    pub fn gate_level(&self) -> f32 {
        self.gate_level
    }

    pub fn reset(&mut self) {
        self.gate_level = 0.0;
        self.hold_counter = 0;
        self.open = false;
    }

    #[inline]
    pub fn tick(&mut self, x: f32) -> f32 {
        if !self.is_enabled() {
            return x;
        }
        let level_db = amplitude_to_db(x.abs());
        if level_db >= self.threshold_db + HYSTERESIS_DB {
            self.open = true;
        }
        if self.open && level_db >= self.threshold_db {
            self.hold_counter = self.hold_samples;
        }

        if self.open {
            self.gate_level = self.attack_coeff * self.gate_level + (1.0 - self.attack_coeff);
            if level_db < self.threshold_db {
                if self.hold_counter > 0 {
                    self.hold_counter -= 1;
                } else {
                    self.open = false;
                }
            }
        } else {
            self.gate_level *= self.release_coeff;
        }

        let gain = self.floor + self.gate_level * (1.0 - self.floor);
        x * gain
    }
}
