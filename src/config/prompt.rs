use log::info;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use thiserror::Error;

pub const DEFAULT_CHAT_TEMPLATE: &str =
    "\nYou are a helpful AI assistant. Your task is to respond directly and concisely to the human's current question, using the conversation history for context if necessary. Do not generate any follow-up questions, additional dialogue, or content beyond answering the current question.\n\nConversation history (for context only):\n{context}\n\nHuman: {input_text}\nAI: ";

const PLACEHOLDERS: [&str; 2] = ["{context}", "{input_text}"];

#[derive(Debug, Error)]
pub enum PromptError {
    #[error("Prompt template is missing the {0} placeholder")]
    MissingPlaceholder(&'static str),

    #[error("Prompt file IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Prompt JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct PromptConfig {
    pub chat_template: String,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self { chat_template: DEFAULT_CHAT_TEMPLATE.to_string() }
    }
}

impl PromptConfig {
    fn validate(&self) -> Result<(), PromptError> {
        for placeholder in PLACEHOLDERS {
            if !self.chat_template.contains(placeholder) {
                return Err(PromptError::MissingPlaceholder(placeholder));
            }
        }
        Ok(())
    }
}

pub fn load_prompts_from_str(content: &str) -> Result<PromptConfig, PromptError> {
    let config: PromptConfig = serde_json::from_str(content)?;
    config.validate()?;
    Ok(config)
}

pub fn load_prompts<P: AsRef<Path>>(path: P) -> Result<PromptConfig, PromptError> {
    let content = fs::read_to_string(path.as_ref())?;
    let config = load_prompts_from_str(&content)?;
    info!("Loaded prompt template from {}", path.as_ref().display());
    Ok(config)
}

/// Substitutes `{context}` and `{input_text}` in one pass, so text inside
/// either value is never treated as a placeholder.
pub fn get_chat_prompt(config: &PromptConfig, context: &str, input_text: &str) -> String {
    let template = config.chat_template.as_str();
    let mut out = String::with_capacity(template.len() + context.len() + input_text.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        if tail.starts_with("{context}") {
            out.push_str(context);
            rest = &tail["{context}".len()..];
        } else if tail.starts_with("{input_text}") {
            out.push_str(input_text);
            rest = &tail["{input_text}".len()..];
        } else {
            out.push('{');
            rest = &tail[1..];
        }
    }
    out.push_str(rest);
    out
}

/// Keeps only the first line of generated text, minus a leading `AI:` label.
pub fn clean_response(raw: &str) -> String {
    let first_line = raw.split('\n').next().unwrap_or("").trim();
    first_line.strip_prefix("AI:").unwrap_or(first_line).trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_response_keeps_first_line_without_label() {
        let raw = "AI: Paris is the capital.\nWhat else would you like to know?";
        assert_eq!(clean_response(raw), "Paris is the capital.");
    }

    #[test]
    fn clean_response_strips_whitespace_and_only_exact_label() {
        assert_eq!(clean_response("   The answer is 4.  \nHuman: thanks"), "The answer is 4.");
        assert_eq!(clean_response("ai: lowercase stays"), "ai: lowercase stays");
        assert_eq!(clean_response("AIRPORT codes"), "AIRPORT codes");
        assert_eq!(clean_response("\nsecond line only"), "");
        assert_eq!(clean_response(""), "");
    }

    #[test]
    fn default_template_renders_context_and_query() {
        let prompt = get_chat_prompt(&PromptConfig::default(), "Human: a\nAI: b", "What is 2+2?");
        assert!(prompt.contains("Conversation history (for context only):\nHuman: a\nAI: b\n"));
        assert!(prompt.ends_with("Human: What is 2+2?\nAI: "));
        assert!(prompt.contains("Do not generate any follow-up questions"));
    }

    #[test]
    fn default_template_lines_are_not_indented() {
        let prompt = get_chat_prompt(&PromptConfig::default(), "Human: a\nAI: b", "Hi");
        assert!(prompt.lines().all(|line| !line.starts_with(' ')));
        assert!(prompt.ends_with("\nHuman: Hi\nAI: "));
    }

    #[test]
    fn values_containing_placeholders_are_not_expanded() {
        let config = PromptConfig { chat_template: "[{context}] {input_text} {other}".into() };
        let prompt = get_chat_prompt(&config, "{input_text}", "why {context}?");
        assert_eq!(prompt, "[{input_text}] why {context}? {other}");
    }

    #[test]
    fn template_without_placeholders_is_rejected() {
        let err = load_prompts_from_str(r#"{"chat_template": "Human: {input_text}"}"#).unwrap_err();
        assert!(matches!(err, PromptError::MissingPlaceholder("{context}")));
    }

    #[test]
    fn loads_template_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prompts.json");
        fs::write(&path, r#"{"chat_template": "{context}\nQ: {input_text}\nA: "}"#).unwrap();

        let config = load_prompts(&path).unwrap();
        assert_eq!(get_chat_prompt(&config, "", "hi"), "\nQ: hi\nA: ");
    }

    #[test]
    fn missing_prompt_file_is_an_io_error() {
        let err = load_prompts("/nonexistent/prompts.json").unwrap_err();
        assert!(matches!(err, PromptError::IoError(_)));
    }
}
