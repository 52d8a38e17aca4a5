//! Shared sync primitives, re-exported so every toob crate names them the same way.

pub use parking_lot::Mutex;

pub use std::{
    collections::HashMap,
    sync::Arc,
    sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicUsize, Ordering},
};
