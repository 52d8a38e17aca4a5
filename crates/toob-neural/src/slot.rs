//! Glitch-free model replacement.
//!
//! The live model is owned by the audio thread and only ever replaced whole,
//! inside [`ModelSlot::service`]. Loading happens on the worker through one
//! slot, retiring the previous model through another, so neither construction
//! nor destruction of a model runs on the audio thread.
//!
//! ```text
//! Idle ──request──▶ Loading ──ok──▶ Loaded ──▶ Deleting ──▶ Idle
//!                      │                                     ▲
//!                      └──────────────failed─────────────────┘
//! ```

use crate::loader::{LoadOutcome, ModelLoader};
use crate::model::AmpModel;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use toob_core::{Completion, Disposer, SubmitError, WorkerHost, WorkerSlot};

/// A model and path on their way to the disposer.
pub struct Retired {
    pub model: Option<Box<dyn AmpModel>>,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Idle,
    Loading,
    /// New model is live; the old one hasn't been handed off yet.
    Loaded,
    Deleting,
}

/// Something the owner should report or publish.
#[derive(Debug, PartialEq)]
pub enum SlotEvent {
    Swapped,
    /// The load of this path produced nothing. Empty when the handler itself failed.
    LoadFailed(PathBuf),
}

pub struct ModelSlot {
    live: Option<Box<dyn AmpModel>>,
    live_path: PathBuf,
    loader: WorkerSlot<PathBuf, LoadOutcome>,
    disposer: WorkerSlot<Retired, ()>,
    state: LoadState,
    /// Hash of the path on its way through the loader.
    in_flight: u64,
    retiring: Option<Retired>,
    orphan: Option<Retired>,
}

fn path_hash(path: &Path) -> u64 {
    let mut hasher = DefaultHasher::new();
    path.hash(&mut hasher);
    hasher.finish()
}

impl ModelSlot {
    pub fn new(worker: &WorkerHost) -> toob_core::Result<Self> {
        Ok(Self {
            live: None,
            live_path: PathBuf::new(),
            loader: worker.register(ModelLoader)?,
            disposer: worker.register(Disposer::<Retired>::new())?,
            state: LoadState::Idle,
            in_flight: 0,
            retiring: None,
            orphan: None,
        })
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    pub fn is_loaded(&self) -> bool {
        self.live.is_some()
    }

    /// Path of the live model, if any.
    pub fn live_path(&self) -> Option<&Path> {
        self.live.as_ref().map(|_| self.live_path.as_path())
    }

    pub fn is_gain_enabled(&self) -> bool {
        self.live.as_ref().is_some_and(|m| m.is_gain_enabled())
    }

    /// Ask for `path` to become the live model.
    ///
    /// While a load is already under way the path is parked and replaces any
    /// previously parked one. Returns the path the slot no longer needs: the
    /// displaced parked one, or `path` itself when it is already the latest
    /// request (live, loading or parked). A gone worker hands the path back as
    /// an error.
    pub fn request_load(
        &mut self,
        path: PathBuf,
    ) -> Result<Option<PathBuf>, SubmitError<PathBuf>> {
        if self.is_latest(&path) {
            return Ok(Some(path));
        }
        if self.state != LoadState::Idle {
            return Ok(self.loader.park(path));
        }
        let hash = path_hash(&path);
        match self.loader.try_submit(path) {
            Ok(()) => {
                self.in_flight = hash;
                self.state = LoadState::Loading;
                Ok(None)
            }
            Err(SubmitError::Busy(path)) => Ok(self.loader.park(path)),
            Err(e) => Err(e),
        }
    }

    /// True when `path` is what the slot will end up with if nothing else arrives.
    fn is_latest(&self, path: &Path) -> bool {
        if let Some(parked) = self.loader.coalesced() {
            return parked == path;
        }
        if self.state == LoadState::Loading {
            return self.in_flight == path_hash(path);
        }
        self.live.is_some() && self.live_path == path
    }

    /// Advance the lifecycle. Call once per block, before processing samples.
    pub fn service(&mut self) -> Option<SlotEvent> {
        match self.state {
            LoadState::Idle => self.dispatch_parked(),
            LoadState::Loading => match self.loader.poll()? {
                Completion::Done(LoadOutcome {
                    path,
                    model: Some(model),
                }) => {
                    let old = self.live.replace(model);
                    let old_path = std::mem::replace(&mut self.live_path, path);
                    self.retiring = Some(Retired {
                        model: old,
                        path: old_path,
                    });
                    self.state = LoadState::Loaded;
                    Some(SlotEvent::Swapped)
                }
                Completion::Done(LoadOutcome { path, model: None }) => {
                    self.state = LoadState::Idle;
                    Some(SlotEvent::LoadFailed(path))
                }
                Completion::Failed => {
                    self.state = LoadState::Idle;
                    Some(SlotEvent::LoadFailed(PathBuf::new()))
                }
            },
            LoadState::Loaded => {
                self.retire();
                None
            }
            LoadState::Deleting => {
                self.disposer.poll()?;
                self.state = LoadState::Idle;
                self.dispatch_parked()
            }
        }
    }

    /// Run the live model over `buffer`; pass-through when none is loaded.
    #[inline]
    pub fn process(&mut self, buffer: &mut [f32], gain: f32) {
        if let Some(model) = self.live.as_mut() {
            model.process(buffer, gain);
        }
    }

    pub fn reset(&mut self) {
        if let Some(model) = self.live.as_mut() {
            model.reset();
        }
    }

    fn retire(&mut self) {
        self.state = LoadState::Idle;
        let Some(retired) = self.retiring.take() else {
            return;
        };
        if retired.model.is_none() && retired.path.capacity() == 0 {
            return;
        }
        match self.disposer.try_submit(retired) {
            Ok(()) => self.state = LoadState::Deleting,
            Err(e) => {
                // No worker to free it on; hold it until the slot is dropped.
                if self.orphan.is_none() {
                    self.orphan = Some(e.into_inner());
                }
            }
        }
    }

    fn dispatch_parked(&mut self) -> Option<SlotEvent> {
        let hash = self.loader.coalesced().map(|p| path_hash(p));
        match self.loader.dispatch_coalesced() {
            Ok(true) => {
                self.in_flight = hash.unwrap_or_default();
                self.state = LoadState::Loading;
                None
            }
            Ok(false) => None,
            Err(e) => Some(SlotEvent::LoadFailed(e.into_inner())),
        }
    }
}

impl Drop for ModelSlot {
    fn drop(&mut self) {
        if self.orphan.is_some() {
            tracing::warn!("retired model freed outside the worker");
        }
    }
}
