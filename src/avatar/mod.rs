//! Avatar animation synthesis
//!
//! Derives a playback-synchronized animation packet (visemes, expression,
//! gestures, eye blinks, body movement) from the final response text, its
//! mood, and the audio duration. Packets are built fresh per response and
//! never persisted.

mod gestures;
mod lipsync;

pub use gestures::{suggest_gestures, GestureEvent, GestureType};
pub use lipsync::{build_visemes, Viseme, VisemeEvent};

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::types::Mood;

/// Frame rate hint for clients interpolating between events
pub const FRAME_RATE: u32 = 30;

/// First blink lands here, in seconds
const BLINK_START: f32 = 0.8;
/// Base spacing between blinks
const BLINK_INTERVAL: f32 = 3.5;
/// Symmetric jitter applied to each spacing
const BLINK_JITTER: f32 = 1.0;
/// Length of one blink
const BLINK_DURATION: f32 = 0.12;

/// Intensity used for any mood missing from the expression table
const DEFAULT_INTENSITY: f32 = 0.5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Timeline {
    #[serde(rename = "durationSeconds")]
    pub duration_seconds: f32,
    #[serde(rename = "frameRate")]
    pub frame_rate: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expression {
    pub mood: Mood,
    /// In [0, 1]
    pub intensity: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LipSync {
    pub visemes: Vec<VisemeEvent>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlinkEvent {
    /// Seconds from playback start
    pub time: f32,
    pub duration: f32,
}

/// Idle-motion flags plus an intensity scalar
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovementProfile {
    pub sway: bool,
    pub bounce: bool,
    #[serde(rename = "leanForward")]
    pub lean_forward: bool,
    pub intensity: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BodyMovement {
    pub profile: MovementProfile,
}

/// The full per-response animation packet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnimationPacket {
    pub timeline: Timeline,
    pub expression: Expression,
    #[serde(rename = "lipSync")]
    pub lip_sync: LipSync,
    pub gestures: Vec<GestureEvent>,
    #[serde(rename = "eyeBlinks")]
    pub eye_blinks: Vec<BlinkEvent>,
    #[serde(rename = "bodyMovement")]
    pub body_movement: BodyMovement,
}

/// Fixed mood → expression intensity table
fn expression_intensity(mood: Mood) -> f32 {
    match mood {
        Mood::Excited => 1.0,
        Mood::Surprised => 0.9,
        Mood::Happy => 0.8,
        Mood::Pouty => 0.7,
        Mood::Concerned => 0.6,
        Mood::Smug => 0.6,
        Mood::Sad => DEFAULT_INTENSITY,
        Mood::Shy => DEFAULT_INTENSITY,
        Mood::Thinking => 0.4,
        Mood::Neutral => 0.3,
    }
}

/// Fixed mood → body-movement profile table
fn movement_profile(mood: Mood) -> MovementProfile {
    match mood {
        Mood::Happy => MovementProfile {
            sway: true,
            bounce: true,
            lean_forward: false,
            intensity: 0.7,
        },
        Mood::Excited => MovementProfile {
            sway: true,
            bounce: true,
            lean_forward: true,
            intensity: 1.0,
        },
        Mood::Concerned => MovementProfile {
            sway: false,
            bounce: false,
            lean_forward: true,
            intensity: 0.4,
        },
        Mood::Pouty => MovementProfile {
            sway: false,
            bounce: false,
            lean_forward: false,
            intensity: 0.2,
        },
        Mood::Thinking => MovementProfile {
            sway: true,
            bounce: false,
            lean_forward: false,
            intensity: 0.3,
        },
        Mood::Sad => MovementProfile {
            sway: false,
            bounce: false,
            lean_forward: false,
            intensity: 0.2,
        },
        Mood::Surprised => MovementProfile {
            sway: false,
            bounce: true,
            lean_forward: true,
            intensity: 0.8,
        },
        Mood::Smug => MovementProfile {
            sway: true,
            bounce: false,
            lean_forward: false,
            intensity: 0.5,
        },
        Mood::Shy => MovementProfile {
            sway: false,
            bounce: false,
            lean_forward: false,
            intensity: 0.3,
        },
        // Neutral idle
        Mood::Neutral => MovementProfile {
            sway: true,
            bounce: false,
            lean_forward: false,
            intensity: 0.3,
        },
    }
}

/// Blink schedule: fixed start, base interval with symmetric random
/// jitter, until the schedule passes the total duration. Times are
/// strictly increasing since the jitter never cancels the interval.
fn build_blinks(duration: f32) -> Vec<BlinkEvent> {
    let mut rng = rand::thread_rng();
    let mut blinks = Vec::new();
    let mut t = BLINK_START;
    while t < duration {
        blinks.push(BlinkEvent {
            time: t,
            duration: BLINK_DURATION,
        });
        t += BLINK_INTERVAL + rng.gen_range(-BLINK_JITTER..=BLINK_JITTER);
    }
    blinks
}

/// Build the complete animation packet for one response.
pub fn synthesize(text: &str, mood: Mood, duration_seconds: f32) -> AnimationPacket {
    let duration = duration_seconds.max(0.0);
    AnimationPacket {
        timeline: Timeline {
            duration_seconds: duration,
            frame_rate: FRAME_RATE,
        },
        expression: Expression {
            mood,
            intensity: expression_intensity(mood),
        },
        lip_sync: LipSync {
            visemes: build_visemes(text, duration),
        },
        gestures: suggest_gestures(text, mood, duration),
        eye_blinks: build_blinks(duration),
        body_movement: BodyMovement {
            profile: movement_profile(mood),
        },
    }
}
