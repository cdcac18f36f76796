//! Builds the message list sent to a provider from an endpoint's prompt
//! fragments and the running conversation.
//!
//! Only the primary prompt (prefixed by any free-form user inputs) and the
//! secondary prompt reach the provider. Tertiary, quaternary and quinary
//! prompts are carried for operator display only.

use serde_json::{Map, Value};
use std::collections::BTreeMap;

use super::provider::ChatMessage;
use crate::core::models::{ConversationTurn, PromptSet, PromptSlot, Role};

/// Display key for free-form user inputs.
pub const USER_INPUT_LABEL: &str = "User input";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedPrompt {
    /// Ordered messages for the provider; the first is always the system message.
    pub messages: Vec<ChatMessage>,
    /// Description -> prompt text, for audit display. Never sent to the provider.
    pub display_prompts: BTreeMap<String, String>,
}

impl ComposedPrompt {
    /// Contents of the system messages actually sent.
    #[must_use]
    pub fn system_prompts(&self) -> Vec<&str> {
        self.messages
            .iter()
            .filter(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
            .collect()
    }

    /// System prompts as an index-keyed object (`{"0": "..."}`), the shape audit consumers read.
    #[must_use]
    pub fn total_prompts_json(&self) -> Value {
        let map: Map<String, Value> = self
            .system_prompts()
            .into_iter()
            .enumerate()
            .map(|(i, p)| (i.to_string(), Value::String(p.to_string())))
            .collect();
        Value::Object(map)
    }
}

/// Compose the outbound prompt.
///
/// The system message is `user_inputs` followed directly by the primary
/// prompt. With a secondary prompt and no history the conversation is seeded
/// with a single user message holding the secondary prompt; otherwise the
/// history is forwarded unchanged.
#[must_use]
pub fn compose(
    prompts: &PromptSet,
    user_inputs: Option<&str>,
    history: &[ConversationTurn],
) -> ComposedPrompt {
    let system_content = format!(
        "{}{}",
        user_inputs.unwrap_or_default(),
        prompts.prompt(PromptSlot::Primary).unwrap_or_default()
    );

    let mut messages = vec![ChatMessage::system(system_content)];

    match prompts.prompt(PromptSlot::Secondary) {
        Some(secondary) if history.is_empty() => messages.push(ChatMessage::user(secondary)),
        _ => messages.extend(history.iter().map(ChatMessage::from)),
    }

    ComposedPrompt {
        messages,
        display_prompts: display_prompts(prompts, user_inputs),
    }
}

/// Audit mapping of every configured fragment, keyed by its own description.
///
/// Fragments without a description use their slot label; a repeated
/// description is disambiguated with the slot label.
#[must_use]
pub fn display_prompts(prompts: &PromptSet, user_inputs: Option<&str>) -> BTreeMap<String, String> {
    let mut display = BTreeMap::new();

    if let Some(inputs) = user_inputs.filter(|s| !s.trim().is_empty()) {
        display.insert(USER_INPUT_LABEL.to_string(), inputs.to_string());
    }

    for fragment in prompts.fragments() {
        let mut key = fragment.display_key().to_string();
        if display.contains_key(&key) {
            key = format!("{key} ({})", fragment.slot.label());
        }
        display.insert(key, fragment.text.to_string());
    }

    display
}

/// The automatic user message asking the model to expand one proposal into `fullText`.
#[must_use]
pub fn proposal_detail_request(title: &str) -> String {
    format!("(Automatic message) Please write the details of \"{title}\".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_primary_yields_empty_system_message() {
        let composed = compose(&PromptSet::default(), None, &[]);
        assert_eq!(composed.messages, vec![ChatMessage::system("")]);
    }

    #[test]
    fn test_repeated_description_is_disambiguated() {
        let prompts = PromptSet {
            primary_prompt: Some("a".to_string()),
            primary_prompt_description: Some("Prompt".to_string()),
            tertiary_prompt: Some("c".to_string()),
            tertiary_prompt_description: Some("Prompt".to_string()),
            ..PromptSet::default()
        };
        let display = display_prompts(&prompts, None);
        assert_eq!(display.get("Prompt").map(String::as_str), Some("a"));
        assert_eq!(
            display.get("Prompt (Tertiary prompt)").map(String::as_str),
            Some("c")
        );
    }

    #[test]
    fn test_total_prompts_json_is_index_keyed() {
        let prompts = PromptSet {
            primary_prompt: Some("answer in JSON".to_string()),
            ..PromptSet::default()
        };
        let composed = compose(&prompts, Some("Age: 17\n"), &[]);
        assert_eq!(
            composed.total_prompts_json(),
            serde_json::json!({"0": "Age: 17\nanswer in JSON"})
        );
    }
}
