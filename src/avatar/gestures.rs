//! Gesture suggestion rules
//!
//! Rules are independent and may all fire; events come out in the fixed
//! order the rules are evaluated, with no dedup or priority.

use serde::{Deserialize, Serialize};

use crate::types::Mood;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GestureType {
    Bounce,
    HeadTilt,
    DefensiveCross,
    Emphasis,
    DramaticPose,
    Celebrate,
}

/// One suggested gesture on the playback timeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GestureEvent {
    #[serde(rename = "type")]
    pub gesture_type: GestureType,
    /// Seconds from playback start
    pub time: f32,
    pub duration: f32,
}

impl GestureEvent {
    fn new(gesture_type: GestureType, time: f32, duration: f32) -> Self {
        Self {
            gesture_type,
            time,
            duration,
        }
    }
}

/// Keywords that trigger a celebratory gesture
const CELEBRATION_WORDS: [&str; 4] = ["yay", "congratulations", "congrats", "hooray"];

/// Evaluate every rule against the response text and mood.
pub fn suggest_gestures(text: &str, mood: Mood, duration: f32) -> Vec<GestureEvent> {
    let lower = text.to_lowercase();
    let mut events = Vec::new();

    // Mood rules
    match mood {
        Mood::Excited | Mood::Happy => {
            events.push(GestureEvent::new(GestureType::Bounce, 0.2, 0.8));
        }
        Mood::Pouty => {
            events.push(GestureEvent::new(GestureType::DefensiveCross, 0.2, 1.2));
        }
        Mood::Thinking => {
            events.push(GestureEvent::new(GestureType::HeadTilt, 0.2, 1.0));
        }
        _ => {}
    }

    // Lexical rules
    if text.contains('?') {
        events.push(GestureEvent::new(GestureType::HeadTilt, duration * 0.5, 0.9));
    }
    if text.contains('!') {
        events.push(GestureEvent::new(GestureType::Emphasis, duration * 0.3, 0.6));
    }
    if lower.contains("explosion") {
        events.push(GestureEvent::new(GestureType::DramaticPose, duration * 0.4, 1.5));
    }
    if CELEBRATION_WORDS.iter().any(|w| lower.contains(w)) {
        events.push(GestureEvent::new(GestureType::Celebrate, duration * 0.2, 1.2));
    }

    events
}
