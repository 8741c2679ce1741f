pub mod ollama;

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

use self::ollama::OllamaLoader;
use super::{ LlmError, ModelSpec };
use crate::cli::Args;

#[derive(Deserialize, Debug, Clone)]
pub struct CompletionResponse {
    pub response: String,
}

/// A loaded model: formatted prompt in, generated text out.
#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<CompletionResponse, LlmError>;

    fn get_model(&self) -> String;
}

/// Brings a model artifact into the inference engine and hands back a client for it.
#[async_trait]
pub trait ModelLoader: Send + Sync {
    async fn load(&self, spec: &ModelSpec) -> Result<Arc<dyn ChatClient>, LlmError>;
}

pub fn new_loader(args: &Args) -> Arc<dyn ModelLoader> {
    Arc::new(OllamaLoader::new(args.inference_base_url.clone(), args.model_tag_prefix.clone()))
}
