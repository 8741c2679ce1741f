use clap::{ Parser, Subcommand };

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    // --- History Store Args ---
    /// Path to the SQLite database holding the `messages` table
    #[arg(long, env = "DB_PATH", default_value = "database.sqlite")]
    pub db_path: String,

    /// Number of most recent exchanges included in the prompt.
    #[arg(long, env = "HISTORY_LIMIT", default_value = "5")]
    pub history_limit: usize,

    // --- Model Artifact Args ---
    /// Local model file served for `"model_choice": "llama"`
    #[arg(long, env = "LLAMA_MODEL_PATH", default_value = "models/llama-2-7b-chat.Q2_K.gguf")]
    pub llama_model_path: String,

    /// Local model file served for `"model_choice": "mistral"`
    #[arg(
        long,
        env = "MISTRAL_MODEL_PATH",
        default_value = "models/mistral-7b-instruct-v0.2-code-ft.Q2_K.gguf"
    )]
    pub mistral_model_path: String,

    // --- Inference Engine Args ---
    /// Base URL of the local inference server (e.g., http://localhost:11434 for Ollama)
    #[arg(long, env = "INFERENCE_BASE_URL", default_value = "http://localhost:11434")]
    pub inference_base_url: String,

    /// Prefix for the model tags registered with the inference server.
    #[arg(long, env = "MODEL_TAG_PREFIX", default_value = "chat-bridge")]
    pub model_tag_prefix: String,

    // --- General App Args ---
    /// Optional path to a JSON file overriding the chat prompt template.
    #[arg(long, env = "PROMPTS_PATH")]
    pub prompts_path: Option<String>,

    /// Enable debug logging on stderr
    #[arg(long, env = "DEBUG", default_value = "false")]
    pub debug: bool,

    /// Read-only history listing instead of answering a request from stdin.
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Print the most recent stored messages across all conversations, newest first.
    Recent {
        #[arg(long, default_value = "10")]
        limit: usize,
    },
    /// Print every stored message of one conversation, oldest first.
    Show {
        conversation_id: String,
    },
}
