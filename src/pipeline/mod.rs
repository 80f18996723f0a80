//! Response interpretation pipeline
//!
//! One request flows: pacing gate → prompt assembly → generation →
//! parsing → speech synthesis (with estimated-duration fallback) →
//! animation synthesis → session update. Generation failures propagate;
//! synthesis failures never do.

use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::avatar::{self, AnimationPacket};
use crate::error::{AriaError, Result};
use crate::generation::GenerationBackend;
use crate::persona::{PersonaConfig, MEAL_REACTION_FALLBACK, MEAL_REACTION_PROMPT};
use crate::session::{PacingGate, SessionStore};
use crate::speech::{SpeechArtifactManager, SpeechResult};
use crate::types::{Classification, FilterQuery, Intent, Mood, SearchType, TemporalQuery};

/// The assistant's spoken reply
#[derive(Debug, Clone, Serialize)]
pub struct AssistantResponse {
    pub text: String,
    pub mood: Mood,
}

/// Reference to a playable speech artifact
#[derive(Debug, Clone, Serialize)]
pub struct AudioRef {
    pub url: String,
    pub duration: f32,
}

/// Combined result of one classified exchange
#[derive(Debug, Clone, Serialize)]
pub struct ChatOutcome {
    #[serde(rename = "userMessage")]
    pub user_message: String,
    #[serde(rename = "isSearchQuery")]
    pub is_search_query: bool,
    #[serde(rename = "searchType")]
    pub search_type: SearchType,
    #[serde(rename = "searchQuery")]
    pub search_query: Option<String>,
    #[serde(rename = "temporalQuery")]
    pub temporal_query: Option<TemporalQuery>,
    #[serde(rename = "filterQuery")]
    pub filter_query: Option<FilterQuery>,
    pub intent: Intent,
    #[serde(rename = "assistantResponse")]
    pub assistant_response: AssistantResponse,
    pub audio: Option<AudioRef>,
    pub avatar: AnimationPacket,
    #[serde(rename = "sessionId")]
    pub session_id: String,
    #[serde(rename = "useFallbackAudio")]
    pub use_fallback_audio: bool,
}

/// Result of a standalone synthesis request
#[derive(Debug, Clone, Serialize)]
pub struct TtsOutcome {
    pub audio: Option<AudioRef>,
    pub avatar: AnimationPacket,
    #[serde(rename = "useFallbackAudio")]
    pub use_fallback_audio: bool,
}

/// Owns the shared stores and backends for all request handlers.
pub struct ChatPipeline {
    sessions: Arc<SessionStore>,
    gate: Arc<PacingGate>,
    generator: Arc<dyn GenerationBackend>,
    speech: Arc<SpeechArtifactManager>,
}

impl ChatPipeline {
    pub fn new(
        sessions: Arc<SessionStore>,
        gate: Arc<PacingGate>,
        generator: Arc<dyn GenerationBackend>,
        speech: Arc<SpeechArtifactManager>,
    ) -> Self {
        Self {
            sessions,
            gate,
            generator,
            speech,
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn speech(&self) -> &SpeechArtifactManager {
        &self.speech
    }

    /// Run one full exchange under the given persona.
    pub async fn chat(
        &self,
        persona: &PersonaConfig,
        message: &str,
        session_id: Option<String>,
    ) -> Result<ChatOutcome> {
        if message.trim().is_empty() {
            return Err(AriaError::InvalidInput("message is empty".to_string()));
        }
        let session_id = session_id.unwrap_or_else(|| Uuid::new_v4().to_string());

        let messages = persona.assemble_prompt(&self.sessions, &session_id, message);
        self.gate.wait().await;
        let raw = self.generator.generate(&messages).await?;
        tracing::debug!(persona = %persona.name, chars = raw.len(), "reply received");

        let classification = persona.parser().parse(&raw);
        self.finish_exchange(persona, message, &session_id, classification)
            .await
    }

    /// One-shot reaction to a named meal. A failed generation call degrades
    /// to a canned line instead of failing the request.
    pub async fn meal_reaction(
        &self,
        persona: &PersonaConfig,
        meal: &str,
        session_id: Option<String>,
    ) -> Result<ChatOutcome> {
        if meal.trim().is_empty() {
            return Err(AriaError::InvalidInput("meal is empty".to_string()));
        }
        let session_id = session_id.unwrap_or_else(|| Uuid::new_v4().to_string());
        let prompt = MEAL_REACTION_PROMPT.replace("{meal}", meal);

        let messages = persona.assemble_prompt(&self.sessions, &session_id, &prompt);
        self.gate.wait().await;
        let classification = match self.generator.generate(&messages).await {
            Ok(raw) => persona.parser().parse(&raw),
            Err(e) => {
                tracing::warn!(error = %e, "meal reaction generation failed, using canned line");
                let mut c = persona.parser().parse("");
                c.text = MEAL_REACTION_FALLBACK.to_string();
                c.mood = Mood::Happy;
                c
            }
        };

        self.finish_exchange(persona, meal, &session_id, classification)
            .await
    }

    /// Synthesize arbitrary text and build its animation packet.
    pub async fn tts(&self, text: &str, voice_id: &str) -> Result<TtsOutcome> {
        if text.trim().is_empty() {
            return Err(AriaError::InvalidInput("text is empty".to_string()));
        }
        let speech = self.speech.synthesize(text, None, voice_id).await;
        let avatar = avatar::synthesize(text, Mood::Neutral, speech.duration);
        Ok(TtsOutcome {
            audio: audio_ref(&speech),
            use_fallback_audio: speech.fallback,
            avatar,
        })
    }

    /// Drop all history for a session. Idempotent.
    pub fn clear_history(&self, session_id: &str) {
        self.sessions.clear(session_id);
    }

    async fn finish_exchange(
        &self,
        persona: &PersonaConfig,
        user_message: &str,
        session_id: &str,
        classification: Classification,
    ) -> Result<ChatOutcome> {
        let speech = self
            .speech
            .synthesize(
                &classification.text,
                classification.text_localized.as_deref(),
                &persona.voice_id,
            )
            .await;
        let avatar = avatar::synthesize(&classification.text, classification.mood, speech.duration);

        // The raw tagged reply goes into history so the model keeps seeing
        // its own output format.
        self.sessions
            .append_exchange(session_id, user_message, &classification.raw_response);

        Ok(ChatOutcome {
            user_message: user_message.to_string(),
            is_search_query: classification.is_search_query(),
            search_type: classification.search_type,
            search_query: classification.search_query,
            temporal_query: classification.temporal_query,
            filter_query: classification.filter_query,
            intent: classification.intent,
            assistant_response: AssistantResponse {
                text: classification.text,
                mood: classification.mood,
            },
            audio: audio_ref(&speech),
            use_fallback_audio: speech.fallback,
            avatar,
            session_id: session_id.to_string(),
        })
    }
}

fn audio_ref(speech: &SpeechResult) -> Option<AudioRef> {
    speech.url.as_ref().map(|url| AudioRef {
        url: url.clone(),
        duration: speech.duration,
    })
}
