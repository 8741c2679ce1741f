use log::info;
use std::sync::Arc;

use super::chat::{ ChatClient, ModelLoader };
use super::{ LlmError, ModelChoice, ModelSpec };

/// Whether the slot must load `requested` before it can serve it.
pub fn needs_reload(loaded: Option<ModelChoice>, requested: ModelChoice) -> bool {
    loaded != Some(requested)
}

/// Holds at most one loaded model and the identifier it was loaded for.
#[derive(Default)]
pub struct ModelSlot {
    loaded: Option<ModelChoice>,
    handle: Option<Arc<dyn ChatClient>>,
}

impl ModelSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn loaded(&self) -> Option<ModelChoice> {
        self.loaded
    }

    /// Returns the client for `spec.choice`, loading it first if the slot holds anything else.
    pub async fn ensure(
        &mut self,
        spec: &ModelSpec,
        loader: &dyn ModelLoader
    ) -> Result<Arc<dyn ChatClient>, LlmError> {
        if let Some(handle) = self.handle.as_ref().filter(|_| !needs_reload(self.loaded, spec.choice)) {
            return Ok(Arc::clone(handle));
        }

        // Release the previous model before loading so only one is ever held.
        self.handle = None;
        self.loaded = None;

        let handle = loader.load(spec).await?;
        info!("Model loaded successfully.");
        self.loaded = Some(spec.choice);
        self.handle = Some(Arc::clone(&handle));
        Ok(handle)
    }
}
