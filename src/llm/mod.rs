pub mod chat;
pub mod slot;

use serde::{ Deserialize, Serialize };
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

use crate::cli::Args;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Invalid model choice. Please choose llama or mistral.")]
    InvalidModelChoice(String),

    #[error("model artifact '{path}' cannot be used: {source}")]
    Artifact {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("inference backend request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("inference backend error: {0}")]
    Backend(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelChoice {
    Llama,
    Mistral,
}

impl ModelChoice {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelChoice::Llama => "llama",
            ModelChoice::Mistral => "mistral",
        }
    }
}

impl fmt::Display for ModelChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelChoice {
    type Err = LlmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "llama" => Ok(ModelChoice::Llama),
            "mistral" => Ok(ModelChoice::Mistral),
            _ => Err(LlmError::InvalidModelChoice(s.to_string())),
        }
    }
}

/// Sampling parameters handed to the inference engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GenerationConfig {
    pub max_new_tokens: u32,
    pub temperature: f32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_new_tokens: 100,
            temperature: 0.1,
        }
    }
}

/// Everything a loader needs to bring one model into memory.
#[derive(Debug, Clone)]
pub struct ModelSpec {
    pub choice: ModelChoice,
    pub artifact: PathBuf,
    pub model_type: &'static str,
    pub config: GenerationConfig,
}

impl ModelSpec {
    pub fn for_choice(choice: ModelChoice, args: &Args) -> Self {
        let artifact = match choice {
            ModelChoice::Llama => &args.llama_model_path,
            ModelChoice::Mistral => &args.mistral_model_path,
        };
        Self {
            choice,
            artifact: PathBuf::from(artifact),
            model_type: choice.as_str(),
            config: GenerationConfig::default(),
        }
    }
}
