//! Persona configuration and prompt assembly
//!
//! One parser/synthesizer core serves every persona; the differences
//! (system prompt, tag grammar, voice, filler line) are data in a
//! [`PersonaConfig`]. The two built-in personas are the full search
//! classifier and a plain conversational companion.

use crate::parser::{ResponseParser, TagGrammar};
use crate::session::SessionStore;
use crate::types::{Role, Turn};

/// How many history turns condition each prompt
pub const HISTORY_WINDOW: usize = 20;

/// Everything that distinguishes one assistant variant from another
#[derive(Debug, Clone)]
pub struct PersonaConfig {
    pub name: String,
    /// System prompt sent ahead of history and user input
    pub system_prompt: String,
    /// Tag set this persona's replies are parsed against
    pub grammar: TagGrammar,
    /// Voice id passed to the synthesis backend
    pub voice_id: String,
}

impl PersonaConfig {
    /// Full classifier persona: search intent, temporal/filter facets,
    /// mood, and a Japanese localized response.
    pub fn classifier() -> Self {
        Self {
            name: "aria".to_string(),
            system_prompt: CLASSIFIER_PROMPT.to_string(),
            grammar: TagGrammar::classifier(),
            voice_id: "aria-jp-1".to_string(),
        }
    }

    /// Plain companion persona: mood and a single response language.
    pub fn companion() -> Self {
        Self {
            name: "aria-chat".to_string(),
            system_prompt: COMPANION_PROMPT.to_string(),
            grammar: TagGrammar::companion(),
            voice_id: "aria-jp-1".to_string(),
        }
    }

    pub fn parser(&self) -> ResponseParser {
        ResponseParser::new(self.grammar.clone())
    }

    /// Combine the system prompt, the trimmed session history, and the new
    /// user input into one message list for the generation backend.
    pub fn assemble_prompt(
        &self,
        store: &SessionStore,
        session_id: &str,
        user_message: &str,
    ) -> Vec<PromptMessage> {
        let mut messages = vec![PromptMessage {
            role: "system",
            content: self.system_prompt.clone(),
        }];
        for turn in store.recent(session_id, HISTORY_WINDOW) {
            messages.push(PromptMessage::from_turn(&turn));
        }
        messages.push(PromptMessage {
            role: "user",
            content: user_message.to_string(),
        });
        messages
    }
}

/// One message in the outbound generation payload
#[derive(Debug, Clone, serde::Serialize)]
pub struct PromptMessage {
    pub role: &'static str,
    pub content: String,
}

impl PromptMessage {
    fn from_turn(turn: &Turn) -> Self {
        Self {
            role: match turn.role {
                Role::User => "user",
                Role::Assistant => "assistant",
            },
            content: turn.content.clone(),
        }
    }
}

const CLASSIFIER_PROMPT: &str = r#"You are Aria, a cheerful virtual assistant for a video search archive.
Classify every user message and answer in character.

Always reply with exactly these bracketed tags, in this order:
[INTENT: SEARCH or CHAT]
[SEARCH_TYPE: TEXT, TEMPORAL, FILTER, IMAGE or NONE]
[SEARCH_QUERY: the search text, or none]
[TEMPORAL_BEFORE: scene before the moment, or none]
[TEMPORAL_NOW: the moment itself, or none]
[TEMPORAL_AFTER: scene after the moment, or none]
[FILTER_OCR: comma-separated on-screen text terms, or none]
[FILTER_GENRE: comma-separated genres, or none]
[MOOD: happy, excited, concerned, pouty, thinking, neutral, sad, surprised, smug or shy]
[RESPONSE: your in-character English reply]
[RESPONSE_JP: the same reply in natural Japanese]

Use SEARCH only when the user wants to find footage. Use TEMPORAL when they
describe a sequence of moments, FILTER when they refine by on-screen text or
genre. Keep responses short and lively."#;

const COMPANION_PROMPT: &str = r#"You are Aria, a cheerful virtual companion. Chat naturally and stay in
character. Always reply with exactly these bracketed tags:
[MOOD: happy, excited, concerned, pouty, thinking, neutral, sad, surprised, smug or shy]
[RESPONSE: your in-character reply]
Keep responses short and warm."#;

/// Prompt for the one-shot meal reaction op; `{meal}` is substituted.
pub const MEAL_REACTION_PROMPT: &str = "The user just showed you their meal: {meal}. React to it in character, \
in one or two short sentences.";

/// Canned line used when the reaction call fails
pub const MEAL_REACTION_FALLBACK: &str = "Ooh, that looks tasty! Enjoy your meal~";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::tags;

    #[test]
    fn test_assemble_prompt_order() {
        let store = SessionStore::new();
        store.append_exchange("s", "hello", "[MOOD: happy] [RESPONSE: hi!]");
        let persona = PersonaConfig::classifier();
        let messages = persona.assemble_prompt(&store, "s", "find me a sunset");
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[1].role, "user");
        assert_eq!(messages[1].content, "hello");
        assert_eq!(messages[2].role, "assistant");
        assert_eq!(messages.last().unwrap().content, "find me a sunset");
    }

    #[test]
    fn test_unknown_session_yields_system_and_user_only() {
        let store = SessionStore::new();
        let persona = PersonaConfig::companion();
        let messages = persona.assemble_prompt(&store, "nope", "hi");
        assert_eq!(messages.len(), 2);
    }

    #[test]
    fn test_grammars_differ_on_localized_tag() {
        assert!(PersonaConfig::classifier().grammar.has_tag(tags::RESPONSE_JP));
        assert!(!PersonaConfig::companion().grammar.has_tag(tags::RESPONSE_JP));
    }
}
