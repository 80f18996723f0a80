//! Fallback speech duration estimation

/// Average speaking rate used when no synthesized audio exists
const WORDS_PER_SECOND: f32 = 2.5;

/// Floor so even one-word replies animate for a beat
const MIN_DURATION_SECONDS: f32 = 1.0;

/// Estimate how long `text` takes to speak, in seconds.
pub fn estimate_duration(text: &str) -> f32 {
    let words = text.split_whitespace().count();
    (words as f32 / WORDS_PER_SECOND).max(MIN_DURATION_SECONDS)
}
