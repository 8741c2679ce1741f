use async_trait::async_trait;
use log::{ debug, info };
use reqwest::{ Client as HttpClient, Response, StatusCode };
use serde::{ Deserialize, Serialize };
use sha2::{ Digest, Sha256 };
use std::collections::HashMap;
use std::fs::File;
use std::io;
use std::path::{ Path, PathBuf };
use std::sync::Arc;
use std::time::UNIX_EPOCH;
use tokio::io::AsyncReadExt;

use super::{ ChatClient, CompletionResponse, ModelLoader };
use crate::llm::{ GenerationConfig, LlmError, ModelSpec };

const GGUF_MAGIC: &[u8; 4] = b"GGUF";

#[derive(Debug)]
pub struct OllamaClient {
    http: HttpClient,
    base_url: String,
    completion_model: String,
    options: GenerateOptions,
}

#[derive(Debug, Clone, Copy, Serialize)]
struct GenerateOptions {
    num_predict: u32,
    temperature: f32,
}

impl From<GenerationConfig> for GenerateOptions {
    fn from(config: GenerationConfig) -> Self {
        Self {
            num_predict: config.max_new_tokens,
            temperature: config.temperature,
        }
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    raw: bool,
    options: GenerateOptions,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

#[derive(Serialize)]
struct ModelRef<'a> {
    model: &'a str,
}

#[derive(Serialize)]
struct CreateRequest<'a> {
    model: &'a str,
    files: HashMap<String, String>,
    parameters: GenerateOptions,
    stream: bool,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

async fn ensure_success(resp: Response) -> Result<Response, LlmError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    let message = serde_json
        ::from_str::<ErrorBody>(&body)
        .map(|b| b.error)
        .unwrap_or(body);
    Err(LlmError::Backend(format!("{}: {}", status, message)))
}

impl OllamaClient {
    pub fn new(base_url: String, completion_model: String, config: GenerationConfig) -> Self {
        Self {
            http: HttpClient::new(),
            base_url,
            completion_model,
            options: config.into(),
        }
    }

    async fn generate(&self, prompt: &str) -> Result<GenerateResponse, LlmError> {
        let url = format!("{}/api/generate", self.base_url.trim_end_matches('/'));
        let req = GenerateRequest {
            model: &self.completion_model,
            prompt,
            stream: false,
            raw: true,
            options: self.options,
        };
        let resp = ensure_success(self.http.post(&url).json(&req).send().await?).await?;
        Ok(resp.json::<GenerateResponse>().await?)
    }
}

#[async_trait]
impl ChatClient for OllamaClient {
    async fn complete(&self, prompt: &str) -> Result<CompletionResponse, LlmError> {
        let gen_resp = self.generate(prompt).await?;
        Ok(CompletionResponse { response: gen_resp.response })
    }

    fn get_model(&self) -> String {
        self.completion_model.clone()
    }
}

/// Imports local model files into an Ollama server. Tags carry a fingerprint of
/// the artifact, so pointing a choice at another file registers a new model.
#[derive(Debug, Clone)]
pub struct OllamaLoader {
    http: HttpClient,
    base_url: String,
    tag_prefix: String,
}

impl OllamaLoader {
    pub fn new(base_url: String, tag_prefix: String) -> Self {
        Self {
            http: HttpClient::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            tag_prefix,
        }
    }

    pub fn model_tag(&self, spec: &ModelSpec) -> Result<String, LlmError> {
        let fingerprint = artifact_fingerprint(&spec.artifact)?;
        Ok(format!("{}-{}:{}", self.tag_prefix, spec.choice, fingerprint))
    }

    async fn model_exists(&self, tag: &str) -> Result<bool, LlmError> {
        let url = format!("{}/api/show", self.base_url);
        let resp = self.http.post(&url).json(&ModelRef { model: tag }).send().await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        ensure_success(resp).await?;
        Ok(true)
    }

    async fn upload_blob(&self, artifact: &Path, digest: &str) -> Result<(), LlmError> {
        let url = format!("{}/api/blobs/sha256:{}", self.base_url, digest);
        let head = self.http.head(&url).send().await?;
        if head.status().is_success() {
            debug!("Blob sha256:{} already present on the inference server", digest);
            return Ok(());
        }

        let file = tokio::fs::File::open(artifact).await.map_err(|e| artifact_error(artifact, e))?;
        info!("Uploading model artifact {}", artifact.display());
        ensure_success(self.http.post(&url).body(file).send().await?).await?;
        Ok(())
    }

    async fn import_artifact(&self, tag: &str, spec: &ModelSpec) -> Result<(), LlmError> {
        ensure_gguf(&spec.artifact).await?;
        let digest = file_digest(spec.artifact.clone()).await?;
        self.upload_blob(&spec.artifact, &digest).await?;

        let file_name = spec.artifact
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("{}.gguf", spec.model_type));
        let mut files = HashMap::new();
        files.insert(file_name, format!("sha256:{}", digest));

        let url = format!("{}/api/create", self.base_url);
        let req = CreateRequest {
            model: tag,
            files,
            parameters: spec.config.into(),
            stream: false,
        };
        ensure_success(self.http.post(&url).json(&req).send().await?).await?;
        info!("Registered {} as '{}'", spec.artifact.display(), tag);
        Ok(())
    }
}

#[async_trait]
impl ModelLoader for OllamaLoader {
    async fn load(&self, spec: &ModelSpec) -> Result<Arc<dyn ChatClient>, LlmError> {
        let tag = self.model_tag(spec)?;
        if !self.model_exists(&tag).await? {
            self.import_artifact(&tag, spec).await?;
        }

        // An empty prompt makes the server load the weights without generating.
        let url = format!("{}/api/generate", self.base_url);
        ensure_success(
            self.http.post(&url).json(&ModelRef { model: &tag }).send().await?
        ).await?;

        Ok(Arc::new(OllamaClient::new(self.base_url.clone(), tag, spec.config)))
    }
}

fn artifact_error(path: &Path, source: io::Error) -> LlmError {
    LlmError::Artifact {
        path: path.display().to_string(),
        source,
    }
}

/// Short hash of canonical path, size and mtime. Cheap enough to run on every
/// load, unlike a full content digest.
fn artifact_fingerprint(path: &Path) -> Result<String, LlmError> {
    let canonical = std::fs::canonicalize(path).map_err(|e| artifact_error(path, e))?;
    let metadata = std::fs::metadata(&canonical).map_err(|e| artifact_error(path, e))?;
    let modified = metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map_or(0, |d| d.as_nanos());

    let mut hasher = Sha256::new();
    hasher.update(canonical.to_string_lossy().as_bytes());
    hasher.update(metadata.len().to_le_bytes());
    hasher.update(modified.to_le_bytes());
    let digest = hex::encode(hasher.finalize());
    Ok(digest[..12].to_string())
}

/// Ollama only imports GGUF weights; GGML `.bin` files must be converted first.
async fn ensure_gguf(path: &Path) -> Result<(), LlmError> {
    let mut file = tokio::fs::File::open(path).await.map_err(|e| artifact_error(path, e))?;
    let mut magic = [0u8; 4];
    let is_gguf = match file.read_exact(&mut magic).await {
        Ok(_) => &magic == GGUF_MAGIC,
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => false,
        Err(e) => {
            return Err(artifact_error(path, e));
        }
    };
    if !is_gguf {
        return Err(
            artifact_error(
                path,
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    "not a GGUF file; convert GGML models with llama.cpp's convert script first"
                )
            )
        );
    }
    Ok(())
}

async fn file_digest(path: PathBuf) -> Result<String, LlmError> {
    tokio::task
        ::spawn_blocking(move || -> Result<String, LlmError> {
            let mut file = File::open(&path).map_err(|e| artifact_error(&path, e))?;
            let mut hasher = Sha256::new();
            io::copy(&mut file, &mut hasher).map_err(|e| artifact_error(&path, e))?;
            Ok(hex::encode(hasher.finalize()))
        }).await
        .map_err(|e| LlmError::Backend(format!("digest task failed: {}", e)))?
}
