//! Speech synthesis and artifact lifecycle
//!
//! Artifacts are mp3 files named `aria-tts-<uuid>.mp3`, written under the
//! audio directory and served by URL. Every successful synthesis enqueues
//! an expiry entry; the artifact is deleted when its TTL lapses unless an
//! explicit delete cancels the pending entry first. Synthesis failure is a
//! first-class outcome: callers get a fallback result with an estimated
//! duration, never an error.

mod estimate;

pub use estimate::estimate_duration;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use uuid::Uuid;

use crate::error::{AriaError, Result};

/// Filename namespace for synthesized artifacts
pub const ARTIFACT_NAMESPACE: &str = "aria-tts";

/// How long an artifact stays on disk before the expiry queue removes it
pub const ARTIFACT_TTL: Duration = Duration::from_secs(120);

/// `<namespace>-<uuid>.mp3`, the only names the manager will touch
static ARTIFACT_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^aria-tts-[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}\.mp3$",
    )
    .expect("artifact name regex")
});

/// Validate a filename against the artifact naming pattern.
pub fn is_valid_artifact_name(name: &str) -> bool {
    ARTIFACT_NAME_RE.is_match(name)
}

/// Synthesized audio returned by a backend
pub struct SpeechAudio {
    pub data: Vec<u8>,
    /// Playback length when the backend reports one
    pub duration: Option<f32>,
}

/// A black-box text-to-speech service
#[async_trait]
pub trait SpeechBackend: Send + Sync {
    async fn synthesize(&self, text: &str, voice_id: &str) -> Result<SpeechAudio>;
}

/// Configuration for the HTTP TTS client
#[derive(Debug, Clone)]
pub struct SpeechConfig {
    pub base_url: String,
    pub api_key: Option<String>,
}

impl SpeechConfig {
    pub fn from_env() -> Option<Self> {
        let base_url = std::env::var("TTS_API_URL").ok()?;
        Some(Self {
            base_url,
            api_key: std::env::var("TTS_API_KEY").ok(),
        })
    }
}

/// Client for an HTTP synthesis endpoint returning raw mp3 bytes
pub struct HttpSpeechBackend {
    client: reqwest::Client,
    config: SpeechConfig,
}

impl HttpSpeechBackend {
    pub fn new(config: SpeechConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    pub fn from_env() -> Option<Self> {
        SpeechConfig::from_env().map(Self::new)
    }
}

#[async_trait]
impl SpeechBackend for HttpSpeechBackend {
    async fn synthesize(&self, text: &str, voice_id: &str) -> Result<SpeechAudio> {
        let mut request = self
            .client
            .post(format!("{}/synthesize", self.config.base_url.trim_end_matches('/')))
            .json(&serde_json::json!({ "text": text, "voice": voice_id }));
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(AriaError::Synthesis(format!(
                "backend returned {}",
                response.status()
            )));
        }

        let duration = response
            .headers()
            .get("x-audio-duration")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<f32>().ok());
        let data = response.bytes().await?.to_vec();
        Ok(SpeechAudio { data, duration })
    }
}

/// Outcome of one synthesis request. `fallback: true` means no artifact
/// exists and the caller should substitute client-side playback.
#[derive(Debug, Clone, Serialize)]
pub struct SpeechResult {
    pub url: Option<String>,
    pub filename: Option<String>,
    pub duration: f32,
    pub fallback: bool,
}

impl SpeechResult {
    fn fallback_for(text: &str) -> Self {
        Self {
            url: None,
            filename: None,
            duration: estimate_duration(text),
            fallback: true,
        }
    }
}

/// Owns artifact storage, naming, and the expiry queue.
pub struct SpeechArtifactManager {
    backend: Option<Arc<dyn SpeechBackend>>,
    audio_dir: PathBuf,
    public_base: String,
    ttl: Duration,
    /// Pending expiries keyed by filename; explicit delete aborts the entry
    pending: Arc<DashMap<String, tokio::task::AbortHandle>>,
}

impl SpeechArtifactManager {
    pub fn new(
        backend: Option<Arc<dyn SpeechBackend>>,
        audio_dir: impl Into<PathBuf>,
        public_base: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            audio_dir: audio_dir.into(),
            public_base: public_base.into(),
            ttl: ARTIFACT_TTL,
            pending: Arc::new(DashMap::new()),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn is_configured(&self) -> bool {
        self.backend.is_some()
    }

    pub fn audio_dir(&self) -> &Path {
        &self.audio_dir
    }

    /// Synthesize `text` (preferring the pre-translated `localized` variant
    /// when present), persist the artifact, and schedule its expiry.
    ///
    /// Any failure resolves to a fallback result; this never errors.
    pub async fn synthesize(
        &self,
        text: &str,
        localized: Option<&str>,
        voice_id: &str,
    ) -> SpeechResult {
        let spoken = localized.filter(|t| !t.is_empty()).unwrap_or(text);

        let Some(backend) = &self.backend else {
            tracing::debug!("speech backend not configured, using fallback duration");
            return SpeechResult::fallback_for(spoken);
        };

        let audio = match backend.synthesize(spoken, voice_id).await {
            Ok(audio) => audio,
            Err(e) => {
                tracing::warn!(error = %e, "speech synthesis failed, using fallback duration");
                return SpeechResult::fallback_for(spoken);
            }
        };

        let filename = format!("{}-{}.mp3", ARTIFACT_NAMESPACE, Uuid::new_v4());
        let path = self.audio_dir.join(&filename);
        if let Err(e) = tokio::fs::write(&path, &audio.data).await {
            tracing::warn!(error = %e, path = %path.display(), "failed to persist artifact");
            return SpeechResult::fallback_for(spoken);
        }

        self.schedule_expiry(&filename);

        SpeechResult {
            url: Some(format!("{}/{}", self.public_base.trim_end_matches('/'), filename)),
            filename: Some(filename),
            duration: audio.duration.unwrap_or_else(|| estimate_duration(spoken)),
            fallback: false,
        }
    }

    /// Enqueue an unconditional TTL deletion for `filename`.
    fn schedule_expiry(&self, filename: &str) {
        let pending = Arc::clone(&self.pending);
        let path = self.audio_dir.join(filename);
        let name = filename.to_string();
        let ttl = self.ttl;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            pending.remove(&name);
            // Missing file means an explicit delete won the race.
            match tokio::fs::remove_file(&path).await {
                Ok(()) => tracing::debug!(artifact = %name, "artifact expired"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => tracing::warn!(error = %e, artifact = %name, "artifact expiry failed"),
            }
        });
        self.pending
            .insert(filename.to_string(), handle.abort_handle());
    }

    /// Delete an artifact by name, cancelling its pending expiry.
    ///
    /// Names failing the pattern check are rejected before any filesystem
    /// access. Returns whether a file was actually removed; a missing file
    /// is `Ok(false)`, not an error.
    pub async fn delete_by_name(&self, filename: &str) -> Result<bool> {
        if !is_valid_artifact_name(filename) {
            return Err(AriaError::InvalidArtifactName(filename.to_string()));
        }

        if let Some((_, handle)) = self.pending.remove(filename) {
            handle.abort();
        }

        match tokio::fs::remove_file(self.audio_dir.join(filename)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Number of artifacts awaiting expiry
    pub fn pending_expiries(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    struct FixedBackend {
        spoken: Mutex<Vec<String>>,
        fail: bool,
    }

    impl FixedBackend {
        fn new(fail: bool) -> Self {
            Self {
                spoken: Mutex::new(Vec::new()),
                fail,
            }
        }
    }

    #[async_trait]
    impl SpeechBackend for FixedBackend {
        async fn synthesize(&self, text: &str, _voice_id: &str) -> Result<SpeechAudio> {
            self.spoken.lock().push(text.to_string());
            if self.fail {
                return Err(AriaError::Synthesis("boom".to_string()));
            }
            Ok(SpeechAudio {
                data: vec![0xff, 0xfb, 0x90],
                duration: Some(1.5),
            })
        }
    }

    fn manager(backend: Option<Arc<dyn SpeechBackend>>, dir: &Path) -> SpeechArtifactManager {
        SpeechArtifactManager::new(backend, dir, "/audio")
    }

    #[test]
    fn test_artifact_name_pattern() {
        let good = format!("{}-{}.mp3", ARTIFACT_NAMESPACE, Uuid::new_v4());
        assert!(is_valid_artifact_name(&good));
        assert!(!is_valid_artifact_name("aria-tts-notauuid.mp3"));
        assert!(!is_valid_artifact_name("../../etc/passwd"));
        assert!(!is_valid_artifact_name(&format!(
            "other-{}.mp3",
            Uuid::new_v4()
        )));
        assert!(!is_valid_artifact_name(&format!(
            "{}-{}.wav",
            ARTIFACT_NAMESPACE,
            Uuid::new_v4()
        )));
    }

    #[tokio::test]
    async fn test_unconfigured_backend_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let m = manager(None, dir.path());
        let result = m.synthesize("hello there friend", None, "v").await;
        assert!(result.fallback);
        assert!(result.url.is_none());
        assert!(result.duration >= 1.0);
    }

    #[tokio::test]
    async fn test_backend_failure_falls_back_without_error() {
        let dir = tempfile::tempdir().unwrap();
        let m = manager(Some(Arc::new(FixedBackend::new(true))), dir.path());
        let result = m.synthesize("hello", None, "v").await;
        assert!(result.fallback);
        assert!(result.filename.is_none());
    }

    #[tokio::test]
    async fn test_success_persists_and_schedules_expiry() {
        let dir = tempfile::tempdir().unwrap();
        let m = manager(Some(Arc::new(FixedBackend::new(false))), dir.path());
        let result = m.synthesize("hello", None, "v").await;
        assert!(!result.fallback);
        let filename = result.filename.unwrap();
        assert!(is_valid_artifact_name(&filename));
        assert!(dir.path().join(&filename).exists());
        assert_eq!(result.url.unwrap(), format!("/audio/{}", filename));
        assert_eq!(result.duration, 1.5);
        assert_eq!(m.pending_expiries(), 1);
    }

    #[tokio::test]
    async fn test_localized_text_takes_priority() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(FixedBackend::new(false));
        let m = manager(Some(backend.clone()), dir.path());
        m.synthesize("hello", Some("こんにちは"), "v").await;
        assert_eq!(backend.spoken.lock()[0], "こんにちは");
    }

    #[tokio::test]
    async fn test_empty_localized_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(FixedBackend::new(false));
        let m = manager(Some(backend.clone()), dir.path());
        m.synthesize("hello", Some(""), "v").await;
        assert_eq!(backend.spoken.lock()[0], "hello");
    }

    #[tokio::test]
    async fn test_delete_cancels_expiry_and_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let m = manager(Some(Arc::new(FixedBackend::new(false))), dir.path());
        let result = m.synthesize("hello", None, "v").await;
        let filename = result.filename.unwrap();
        assert!(m.delete_by_name(&filename).await.unwrap());
        assert_eq!(m.pending_expiries(), 0);
        assert!(!dir.path().join(&filename).exists());
    }

    #[tokio::test]
    async fn test_delete_missing_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let m = manager(None, dir.path());
        let name = format!("{}-{}.mp3", ARTIFACT_NAMESPACE, Uuid::new_v4());
        assert!(!m.delete_by_name(&name).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_malformed_name_fails_closed() {
        let dir = tempfile::tempdir().unwrap();
        let m = manager(None, dir.path());
        let err = m.delete_by_name("../secret.mp3").await.unwrap_err();
        assert!(matches!(err, AriaError::InvalidArtifactName(_)));
    }

    #[tokio::test]
    async fn test_expiry_removes_artifact_after_ttl() {
        let dir = tempfile::tempdir().unwrap();
        let m = manager(Some(Arc::new(FixedBackend::new(false))), dir.path())
            .with_ttl(Duration::from_millis(50));
        let result = m.synthesize("hello", None, "v").await;
        let filename = result.filename.unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(!dir.path().join(&filename).exists());
        assert_eq!(m.pending_expiries(), 0);
    }
}
