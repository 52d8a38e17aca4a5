//! Windowed analysis pipeline of the tuner.
//!
//! Run with:
//! ```bash
//! cargo test -p toob --test tuner_tests --features analysis
//! ```

#![cfg(feature = "analysis")]

#[path = "helpers/mod.rs"]
mod helpers;

use helpers::tolerances::*;
use helpers::{generate_sine, set_value, test_context, TEST_BUFFER_SIZE};
use toob::prelude::*;
use toob::{PitchFilter, PropertyValue};

/// Input samples per analysis window hop at 48 kHz with the default config.
const HOP: usize = 2048 * 4;

fn tuner_host(t: &helpers::TestContext) -> OfflineHost<ToobTuner> {
    let tuner = ToobTuner::new(&t.config, &TunerConfig::default(), &t.ctx).unwrap();
    OfflineHost::new(tuner, &t.config).with_worker(t.worker.clone())
}

#[test]
fn test_threshold_gates_worker_dispatch() {
    let t = test_context();
    let mut host = tuner_host(&t);

    // -60 dB is under the default -40 dB threshold: no analysis at all.
    let quiet = generate_sine(110.0, 0.001, 0, HOP * 20);
    host.render(&quiet, TEST_BUFFER_SIZE);
    let stats = host.processor().stats();
    assert_eq!(stats.submitted, 0);
    assert_eq!(stats.silent, 20);

    // Above threshold, every window goes to the worker exactly once.
    let loud = generate_sine(110.0, 0.5, HOP * 20, HOP * 10);
    host.render(&loud, TEST_BUFFER_SIZE);
    let stats = host.processor().stats();
    assert_eq!(stats.submitted, 10);
    assert_eq!(stats.silent, 20);
    assert_eq!(stats.skipped, 0);
}

#[test]
fn test_tuner_publishes_detected_pitch() {
    let t = test_context();
    let urids = t.core_urids();
    let frequency = t.urid(uris::TUNER_FREQUENCY);
    let mut host = tuner_host(&t);

    let (_, messages) = host.render(&generate_sine(196.0, 0.5, 0, HOP * 12), TEST_BUFFER_SIZE);
    let last = messages
        .iter()
        .rev()
        .find_map(|m| match set_value(std::slice::from_ref(m), &urids, frequency) {
            Some(PropertyValue::Float(f)) => Some(*f),
            _ => None,
        })
        .expect("a frequency publish");
    assert!((last - 196.0).abs() < PITCH_EPSILON_HZ, "published {last}");
    assert!((host.processor().controls().freq.get() - 196.0).abs() < PITCH_EPSILON_HZ);
}

#[test]
fn test_tone_then_silence_drops_to_zero() {
    let t = test_context();
    let mut host = tuner_host(&t);
    host.render(&generate_sine(330.0, 0.5, 0, HOP * 8), TEST_BUFFER_SIZE);
    assert!(host.processor().frequency() > 0.0);

    host.render(&vec![0.0; HOP * 4], TEST_BUFFER_SIZE);
    assert_eq!(host.processor().frequency(), 0.0);
}

#[test]
fn test_single_outlier_is_suppressed() {
    let mut filter = PitchFilter::new(5, 0.6);
    for _ in 0..5 {
        assert_eq!(filter.filter(440.0), 440.0);
    }
    assert_eq!(filter.filter(466.0), 0.0);
    // The note itself is still there afterwards.
    assert_eq!(filter.filter(440.0), 440.0);
}

#[test]
fn test_mute_silences_output_only() {
    let t = test_context();
    let mut host = tuner_host(&t);
    host.processor().controls().mute.set(1.0);
    let (out, _) = host.render(&generate_sine(110.0, 0.5, 0, HOP * 6), TEST_BUFFER_SIZE);
    assert!(out[HOP..].iter().all(|&y| y.abs() < SILENCE_THRESHOLD));
    assert!(host.processor().stats().submitted > 0);
}
