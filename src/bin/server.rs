//! Aria backend server
//!
//! Run with: aria-server

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use aria::generation::{GenerationConfig, OpenAiCompatClient};
use aria::pipeline::ChatPipeline;
use aria::server::{router, AppState};
use aria::session::{PacingGate, SessionStore};
use aria::speech::{HttpSpeechBackend, SpeechArtifactManager, SpeechBackend, SpeechConfig};

#[derive(Parser, Debug)]
#[command(name = "aria-server")]
#[command(about = "Aria conversational avatar backend")]
struct Args {
    /// Listen port
    #[arg(long, env = "ARIA_PORT", default_value = "3020")]
    port: u16,

    /// Generation backend base URL (OpenAI-compatible)
    #[arg(long, env = "BASE_AI_URL")]
    ai_url: Option<String>,

    /// Generation model id
    #[arg(long, env = "CHAT_MODEL_ID")]
    model_id: Option<String>,

    /// Generation API key
    #[arg(long, env = "AI_API_KEY")]
    ai_key: Option<String>,

    /// Speech synthesis backend base URL
    #[arg(long, env = "TTS_API_URL")]
    tts_url: Option<String>,

    /// Speech synthesis API key
    #[arg(long, env = "TTS_API_KEY")]
    tts_key: Option<String>,

    /// Directory for synthesized audio artifacts
    #[arg(long, env = "ARIA_AUDIO_DIR", default_value = "./audio")]
    audio_dir: String,

    /// Minimum seconds between generation calls
    #[arg(long, env = "ARIA_PACING_SECONDS", default_value = "4")]
    pacing_seconds: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let generation_config = match (&args.ai_url, &args.model_id) {
        (Some(base_url), Some(model_id)) => Some(GenerationConfig {
            base_url: base_url.clone(),
            model_id: model_id.clone(),
            api_key: args.ai_key.clone(),
        }),
        _ => None,
    };
    let generation_configured = generation_config.is_some();
    let generator: Arc<dyn aria::generation::GenerationBackend> = match generation_config {
        Some(config) => Arc::new(OpenAiCompatClient::new(config)),
        None => {
            tracing::warn!("BASE_AI_URL/CHAT_MODEL_ID unset, chat requests will fail");
            Arc::new(UnconfiguredBackend)
        }
    };

    let speech_backend: Option<Arc<dyn SpeechBackend>> = args.tts_url.as_ref().map(|base_url| {
        Arc::new(HttpSpeechBackend::new(SpeechConfig {
            base_url: base_url.clone(),
            api_key: args.tts_key.clone(),
        })) as Arc<dyn SpeechBackend>
    });
    let synthesis_configured = speech_backend.is_some();
    if !synthesis_configured {
        tracing::warn!("TTS_API_URL unset, responses will use fallback audio");
    }

    std::fs::create_dir_all(&args.audio_dir)?;
    let speech = SpeechArtifactManager::new(speech_backend, &args.audio_dir, "/audio");

    let pipeline = ChatPipeline::new(
        Arc::new(SessionStore::new()),
        Arc::new(PacingGate::new(Duration::from_secs(args.pacing_seconds))),
        generator,
        Arc::new(speech),
    );
    let state = AppState::new(Arc::new(pipeline), generation_configured, synthesis_configured);

    let app = router(state);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], args.port));
    tracing::info!(version = aria::VERSION, %addr, "aria-server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Placeholder backend used when no generation endpoint is configured.
struct UnconfiguredBackend;

#[async_trait::async_trait]
impl aria::generation::GenerationBackend for UnconfiguredBackend {
    async fn generate(&self, _messages: &[aria::persona::PromptMessage]) -> aria::Result<String> {
        Err(aria::AriaError::Config(
            "generation backend not configured".to_string(),
        ))
    }
}
