pub mod agent;
pub mod models;
pub mod config;
pub mod llm;
pub mod cli;
pub mod history;
pub mod error;

use agent::ChatAgent;
use cli::{ Args, Command };
use error::HandlerError;
use history::{ HistoryStore, SqliteHistoryStore };
use log::{ error, info };
use models::chat::{ ConversationId, HandlerOutput };

/// What the process prints and how it exits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub output: String,
    pub exit_code: i32,
}

/// Handles one request document read from stdin.
pub async fn run(args: Args, input: &str) -> RunOutcome {
    let data = match serde_json::from_str::<serde_json::Value>(input) {
        Ok(data) => data,
        Err(e) => {
            error!("Request is not valid JSON: {}", e);
            return RunOutcome {
                output: HandlerOutput::Error(HandlerError::InvalidJson.to_string()).to_json(),
                exit_code: 1,
            };
        }
    };

    info!("--- Core Configuration ---");
    info!("Database Path: {}", args.db_path);
    info!("Llama Model: {}", args.llama_model_path);
    info!("Mistral Model: {}", args.mistral_model_path);
    info!("Inference Base URL: {}", args.inference_base_url);
    info!("History Limit: {}", args.history_limit);
    info!("Prompts Path: {}", args.prompts_path.as_deref().unwrap_or("built-in"));
    info!("-------------------------");

    let output = match ChatAgent::new(args) {
        Ok(mut agent) => agent.process_json_input(&data).await,
        Err(e) => HandlerOutput::Error(e.to_string()).to_json(),
    };
    RunOutcome { output, exit_code: 0 }
}

/// Prints stored messages as a JSON array. Failures exit 1 with `{"error": ...}`.
pub async fn run_history(args: &Args, command: &Command) -> RunOutcome {
    let store = SqliteHistoryStore::new(&args.db_path);
    let messages = match command {
        Command::Recent { limit } => store.list_recent(*limit).await,
        Command::Show { conversation_id } => {
            let id = ConversationId(serde_json::Value::String(conversation_id.clone()));
            store.get_messages(&id).await
        }
    };
    let listed = messages.and_then(|messages| Ok(serde_json::to_string(&messages)?));

    match listed {
        Ok(output) => RunOutcome { output, exit_code: 0 },
        Err(e) => {
            error!("Failed to read history from {}: {}", args.db_path, e);
            RunOutcome { output: HandlerOutput::Error(e.to_string()).to_json(), exit_code: 1 }
        }
    }
}
