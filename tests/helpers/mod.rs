//! Test helpers and fixtures for toob integration tests
//!
//! Every processor is driven through [`OfflineHost`] with a private URID map,
//! a manual clock, and (where needed) a manual worker host, so runs are
//! deterministic and never touch an audio device.

#![allow(dead_code)]

pub mod tolerances;

use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use toob::prelude::*;
use toob::{CoreUrids, PropertyValue};

/// Default test sample rate (matches common hardware)
pub const TEST_SAMPLE_RATE: f64 = 48000.0;

/// Standard buffer size for deterministic testing
pub const TEST_BUFFER_SIZE: usize = 512;

/// A host context with its own URID map and clock, and a manual worker.
pub struct TestContext {
    pub ctx: HostContext,
    pub urids: Arc<UridMap>,
    pub clock: ManualClock,
    pub worker: Arc<WorkerHost>,
    pub config: ProcessorConfig,
}

pub fn test_context() -> TestContext {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let urids = Arc::new(UridMap::new());
    let clock = ManualClock::new(0);
    let worker = Arc::new(WorkerHost::manual());
    let ctx = HostContext::new()
        .with_urids(urids.clone())
        .with_clock(Arc::new(clock.clone()))
        .with_worker(worker.clone());
    TestContext {
        ctx,
        urids,
        clock,
        worker,
        config: ProcessorConfig::with_sample_rate(TEST_SAMPLE_RATE),
    }
}

impl TestContext {
    pub fn core_urids(&self) -> CoreUrids {
        CoreUrids::resolve(&self.urids)
    }

    pub fn urid(&self, uri: &str) -> Urid {
        self.urids.map(uri)
    }
}

/// Generate a sine wave at `frequency`, starting at sample `start`.
pub fn generate_sine(frequency: f64, amplitude: f32, start: usize, num_samples: usize) -> Vec<f32> {
    (start..start + num_samples)
        .map(|i| {
            let t = i as f64 / TEST_SAMPLE_RATE;
            amplitude * (2.0 * std::f64::consts::PI * frequency * t).sin() as f32
        })
        .collect()
}

/// Generate silence (zero samples).
pub fn generate_silence(num_samples: usize) -> Vec<f32> {
    vec![0.0; num_samples]
}

/// Calculate peak amplitude of a signal.
pub fn peak(samples: &[f32]) -> f32 {
    samples.iter().map(|s| s.abs()).fold(0.0_f32, f32::max)
}

/// Value of a `patch:Set` for `property` among `messages`, if any.
pub fn set_value<'a>(
    messages: &'a [NotifyMessage],
    urids: &CoreUrids,
    property: Urid,
) -> Option<&'a PropertyValue> {
    messages.iter().find_map(|m| {
        match m.property(urids.patch_property) {
            Some(PropertyValue::Urid(p)) if *p == property => m.property(urids.patch_value),
            _ => None,
        }
    })
}

/// Published frequency-response vector, if any.
pub fn response_vector(messages: &[NotifyMessage], urids: &CoreUrids) -> Option<Vec<f32>> {
    match set_value(messages, urids, urids.frequency_response_vector) {
        Some(PropertyValue::FloatVector(v)) => Some(v.clone()),
        _ => None,
    }
}

/// Write a waveshaper model file. The file is deleted when the handle drops.
pub fn waveshaper_model(drive: f32, level: f32) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create temp model");
    write!(
        file,
        r#"{{"architecture":"Waveshaper","drive":{drive},"level":{level},"gain_enabled":false}}"#
    )
    .expect("write temp model");
    file
}

/// Assert the published path matches `expected`.
pub fn assert_path(value: Option<&PropertyValue>, expected: &Path) {
    match value {
        Some(PropertyValue::Path(p)) => assert_eq!(p, expected),
        other => panic!("expected path {}, got {other:?}", expected.display()),
    }
}
