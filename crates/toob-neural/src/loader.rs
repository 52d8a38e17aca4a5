//! Worker-side model loading.

use crate::model::{load_model, AmpModel};
use std::path::PathBuf;
use toob_core::WorkHandler;

/// What came back from one load request.
///
/// A failed load has `model: None`. The error itself stays on the worker,
/// where it has already been logged.
pub struct LoadOutcome {
    pub path: PathBuf,
    pub model: Option<Box<dyn AmpModel>>,
}

impl std::fmt::Debug for LoadOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadOutcome")
            .field("path", &self.path)
            .field("loaded", &self.model.is_some())
            .finish()
    }
}

#[derive(Debug, Default)]
pub struct ModelLoader;

impl WorkHandler for ModelLoader {
    type Request = PathBuf;
    type Response = LoadOutcome;

    fn work(&mut self, path: PathBuf) -> LoadOutcome {
        match load_model(&path) {
            Ok(mut model) => {
                model.reset();
                tracing::info!(path = %path.display(), "model loaded");
                LoadOutcome {
                    path,
                    model: Some(model),
                }
            }
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "model load failed");
                LoadOutcome { path, model: None }
            }
        }
    }
}
