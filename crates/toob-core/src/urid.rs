//! URI to integer identifier mapping.
//!
//! Message types and property keys are URIs. Processors resolve the ones they
//! use once at construction and keep the integers, so the audio thread only
//! ever compares `Urid`s and never touches the map's lock.

use crate::compat::{Arc, HashMap, Mutex};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Well-known URIs.
pub mod uris {
    pub const PATCH_GET: &str = "http://lv2plug.in/ns/ext/patch#Get";
    pub const PATCH_SET: &str = "http://lv2plug.in/ns/ext/patch#Set";
    pub const PATCH_PROPERTY: &str = "http://lv2plug.in/ns/ext/patch#property";
    pub const PATCH_VALUE: &str = "http://lv2plug.in/ns/ext/patch#value";
    pub const ATOM_FLOAT: &str = "http://lv2plug.in/ns/ext/atom#Float";
    pub const ATOM_INT: &str = "http://lv2plug.in/ns/ext/atom#Int";
    pub const ATOM_URID: &str = "http://lv2plug.in/ns/ext/atom#URID";
    pub const ATOM_PATH: &str = "http://lv2plug.in/ns/ext/atom#Path";
    pub const ATOM_VECTOR: &str = "http://lv2plug.in/ns/ext/atom#Vector";

    pub const TOOB: &str = "http://two-play.com/plugins/toob";
    pub const FREQUENCY_RESPONSE_VECTOR: &str =
        "http://two-play.com/plugins/toob#frequencyResponseVector";
    pub const TUNER_FREQUENCY: &str = "http://two-play.com/plugins/toob-tuner#frequency";
    pub const ML_MODEL_FILE: &str = "http://two-play.com/plugins/toob-ml#modelFile";

    pub const CAB_SIM: &str = "http://two-play.com/plugins/toob-cab-sim";
    pub const INPUT_STAGE: &str = "http://two-play.com/plugins/toob-input_stage";
    pub const TOOB_ML: &str = "http://two-play.com/plugins/toob-ml";
    pub const TOOB_TUNER: &str = "http://two-play.com/plugins/toob-tuner";
}

/// Mapped identifier. Never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Urid(u32);

impl From<Urid> for u32 {
    fn from(urid: Urid) -> u32 {
        urid.0
    }
}

impl TryFrom<u32> for Urid {
    type Error = &'static str;

    fn try_from(raw: u32) -> Result<Self, Self::Error> {
        Urid::from_raw(raw).ok_or("zero is not a valid urid")
    }
}

impl Urid {
    #[inline]
    pub fn get(self) -> u32 {
        self.0
    }

    /// Rebuild from a raw value read back off the wire. Zero is not a valid id.
    pub fn from_raw(raw: u32) -> Option<Self> {
        (raw != 0).then_some(Self(raw))
    }
}

#[derive(Debug, Default)]
struct Table {
    by_uri: HashMap<String, Urid>,
    by_id: Vec<String>,
}

/// Process-wide or per-host URI registry.
#[derive(Debug, Default)]
pub struct UridMap {
    table: Mutex<Table>,
}

impl UridMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared registry for hosts that don't bring their own.
    pub fn global() -> Arc<UridMap> {
        static GLOBAL: OnceLock<Arc<UridMap>> = OnceLock::new();
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(UridMap::new())))
    }

    /// Return the id for `uri`, allocating the next one on first sight.
    ///
    /// Takes a lock. Not for the audio thread.
    pub fn map(&self, uri: &str) -> Urid {
        let mut table = self.table.lock();
        if let Some(&id) = table.by_uri.get(uri) {
            return id;
        }
        table.by_id.push(uri.to_owned());
        let id = Urid(table.by_id.len() as u32);
        table.by_uri.insert(uri.to_owned(), id);
        id
    }

    pub fn unmap(&self, id: Urid) -> Option<String> {
        let table = self.table.lock();
        table.by_id.get(id.0 as usize - 1).cloned()
    }

    pub fn len(&self) -> usize {
        self.table.lock().by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Identifiers every processor needs for the patch protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoreUrids {
    pub patch_get: Urid,
    pub patch_set: Urid,
    pub patch_property: Urid,
    pub patch_value: Urid,
    pub frequency_response_vector: Urid,
}

impl CoreUrids {
    pub fn resolve(map: &UridMap) -> Self {
        Self {
            patch_get: map.map(uris::PATCH_GET),
            patch_set: map.map(uris::PATCH_SET),
            patch_property: map.map(uris::PATCH_PROPERTY),
            patch_value: map.map(uris::PATCH_VALUE),
            frequency_response_vector: map.map(uris::FREQUENCY_RESPONSE_VECTOR),
        }
    }
}
