use log::{ debug, info };
use serde_json::Value as JsonValue;
use std::sync::Arc;

use crate::cli::Args;
use crate::config::prompt::{ self, PromptConfig };
use crate::error::HandlerError;
use crate::history::{ format_history_for_prompt, initialize_history_store, HistoryStore };
use crate::llm::chat::{ new_loader, ChatClient, ModelLoader };
use crate::llm::slot::ModelSlot;
use crate::llm::{ LlmError, ModelChoice, ModelSpec };
use crate::models::chat::{ ChatRequest, Conversation, HandlerOutput, HistoryTurn };

/// Turns one JSON request into one JSON reply. Keeps the last loaded model
/// between calls.
pub struct ChatAgent {
    args: Args,
    loader: Arc<dyn ModelLoader>,
    history_store: Arc<dyn HistoryStore>,
    prompt_config: PromptConfig,
    slot: ModelSlot,
}

impl ChatAgent {
    pub fn new(args: Args) -> Result<Self, HandlerError> {
        let prompt_config = match &args.prompts_path {
            Some(path) => prompt::load_prompts(path)?,
            None => PromptConfig::default(),
        };
        let loader = new_loader(&args);
        let history_store = initialize_history_store(&args);
        info!(
            "Inference server: {} (model tags '{}-*')",
            args.inference_base_url,
            args.model_tag_prefix
        );
        Ok(Self::with_components(args, loader, history_store, prompt_config))
    }

    pub fn with_components(
        args: Args,
        loader: Arc<dyn ModelLoader>,
        history_store: Arc<dyn HistoryStore>,
        prompt_config: PromptConfig
    ) -> Self {
        Self {
            args,
            loader,
            history_store,
            prompt_config,
            slot: ModelSlot::new(),
        }
    }

    pub fn loaded_model(&self) -> Option<ModelChoice> {
        self.slot.loaded()
    }

    /// Parses `input` and handles it; unparseable input yields the invalid-JSON error object.
    pub async fn process_raw_input(&mut self, input: &str) -> String {
        match serde_json::from_str::<JsonValue>(input) {
            Ok(data) => self.process_json_input(&data).await,
            Err(e) => {
                debug!("Rejecting request body: {}", e);
                HandlerOutput::Error(HandlerError::InvalidJson.to_string()).to_json()
            }
        }
    }

    pub async fn process_json_input(&mut self, data: &JsonValue) -> String {
        HandlerOutput::from(self.handle(data).await).to_json()
    }

    async fn handle(&mut self, data: &JsonValue) -> Result<String, HandlerError> {
        let request = ChatRequest::from_json(data)?;
        let choice = match request.model_choice.as_str() {
            Some(s) => s.parse::<ModelChoice>()?,
            None => {
                return Err(LlmError::InvalidModelChoice(request.model_choice.to_string()).into());
            }
        };

        let spec = ModelSpec::for_choice(choice, &self.args);
        let client = self.slot.ensure(&spec, self.loader.as_ref()).await?;

        let conversation = self.history_store.get_conversation(&request.conversation_id).await?;
        let (response, updated) = self.send_query(client.as_ref(), &request.query, conversation).await?;
        // The new turn is not written back to the store.
        debug!("Conversation {} now has {} turns in memory", updated.id.0, updated.turns.len());

        Ok(response)
    }

    pub fn build_prompt(&self, turns: &[HistoryTurn], query: &str) -> String {
        let context = format_history_for_prompt(turns, self.args.history_limit);
        prompt::get_chat_prompt(&self.prompt_config, &context, query)
    }

    async fn send_query(
        &self,
        client: &dyn ChatClient,
        query: &str,
        mut conversation: Conversation
    ) -> Result<(String, Conversation), HandlerError> {
        let prompt = self.build_prompt(&conversation.turns, query);
        debug!("Prompting {} with {} bytes", client.get_model(), prompt.len());
        let raw = client.complete(&prompt).await?.response;
        let response = prompt::clean_response(&raw);
        conversation.push(query, response.clone());
        Ok((response, conversation))
    }
}
