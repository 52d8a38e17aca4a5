//! Inbound control events, consumed once per block before any sample processing.

use crate::urid::Urid;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A typed property value carried by a `patch:Set`.
///
/// Variant order is part of the notify wire format.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum PropertyValue {
    #[default]
    None,
    Float(f32),
    Int(i32),
    Urid(Urid),
    Path(PathBuf),
    FloatVector(Vec<f32>),
}

impl PropertyValue {
    pub fn as_float(&self) -> Option<f32> {
        match *self {
            PropertyValue::Float(v) => Some(v),
            PropertyValue::Int(v) => Some(v as f32),
            _ => None,
        }
    }

    /// Move a path out, leaving `None` behind.
    ///
    /// Lets the audio thread take ownership of a host-allocated path without
    /// cloning it.
    pub fn take_path(&mut self) -> Option<PathBuf> {
        match std::mem::take(self) {
            PropertyValue::Path(path) => Some(path),
            other => {
                *self = other;
                None
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventBody {
    /// Request the current value of `property`, or of everything when `None`.
    PatchGet { property: Option<Urid> },
    PatchSet { property: Urid, value: PropertyValue },
    /// MIDI program change. Recorded, not interpreted.
    ProgramChange(u8),
}

#[derive(Debug, Clone, PartialEq)]
pub struct InputEvent {
    /// Offset into the current block.
    pub frame: u32,
    pub body: EventBody,
}

impl InputEvent {
    pub fn get(frame: u32, property: Option<Urid>) -> Self {
        Self {
            frame,
            body: EventBody::PatchGet { property },
        }
    }

    pub fn set(frame: u32, property: Urid, value: PropertyValue) -> Self {
        Self {
            frame,
            body: EventBody::PatchSet { property, value },
        }
    }

    pub fn program_change(frame: u32, program: u8) -> Self {
        Self {
            frame,
            body: EventBody::ProgramChange(program),
        }
    }
}
