//! Character-driven lip-sync timeline

use serde::{Deserialize, Serialize};

/// Visual mouth-shape categories, derived from letter classes rather than
/// true phonetic analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Viseme {
    A,
    E,
    I,
    O,
    U,
    M,
    N,
    F,
    S,
    K,
    Th,
    Sh,
    R,
    W,
    Rest,
}

/// One mouth-shape event on the playback timeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisemeEvent {
    /// Seconds from playback start
    pub time: f32,
    pub viseme: Viseme,
    /// Active seconds; 80% of the slice, leaving a transition gap
    pub duration: f32,
}

/// Fraction of each character slice the mouth shape stays active
const ACTIVE_FRACTION: f32 = 0.8;

/// Static letter-class lookup. Unrecognized characters rest the mouth.
fn classify_char(c: char) -> Viseme {
    match c.to_ascii_lowercase() {
        'a' => Viseme::A,
        'e' => Viseme::E,
        'i' | 'y' => Viseme::I,
        'o' => Viseme::O,
        'u' => Viseme::U,
        'm' | 'b' | 'p' => Viseme::M,
        'n' | 'd' | 't' | 'l' => Viseme::N,
        'f' | 'v' => Viseme::F,
        's' | 'z' => Viseme::S,
        'c' | 'k' | 'g' | 'q' | 'x' => Viseme::K,
        'h' => Viseme::Th,
        'j' => Viseme::Sh,
        'r' => Viseme::R,
        'w' => Viseme::W,
        _ => Viseme::Rest,
    }
}

/// Build the viseme sequence for `text` spread evenly over `duration`
/// seconds: one event per character, each in its own time slice.
pub fn build_visemes(text: &str, duration: f32) -> Vec<VisemeEvent> {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() || duration <= 0.0 {
        return Vec::new();
    }

    let slice = duration / chars.len() as f32;
    chars
        .iter()
        .enumerate()
        .map(|(i, &c)| VisemeEvent {
            time: i as f32 * slice,
            viseme: classify_char(c),
            duration: slice * ACTIVE_FRACTION,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_event_per_character() {
        let events = build_visemes("hello!", 3.0);
        assert_eq!(events.len(), 6);
    }

    #[test]
    fn test_timeline_bounds_and_monotonicity() {
        let text = "a somewhat longer line of text";
        let duration = 4.2;
        let events = build_visemes(text, duration);
        assert_eq!(events[0].time, 0.0);
        assert!(events.last().unwrap().time < duration);
        for pair in events.windows(2) {
            assert!(pair[0].time <= pair[1].time);
        }
    }

    #[test]
    fn test_active_duration_leaves_transition_gap() {
        let events = build_visemes("ab", 2.0);
        let slice = 1.0;
        assert!((events[0].duration - slice * 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_classification_table() {
        assert_eq!(classify_char('A'), Viseme::A);
        assert_eq!(classify_char('b'), Viseme::M);
        assert_eq!(classify_char('h'), Viseme::Th);
        assert_eq!(classify_char('j'), Viseme::Sh);
        assert_eq!(classify_char(' '), Viseme::Rest);
        assert_eq!(classify_char('?'), Viseme::Rest);
        assert_eq!(classify_char('7'), Viseme::Rest);
        assert_eq!(classify_char('猫'), Viseme::Rest);
    }

    #[test]
    fn test_empty_text_yields_no_events() {
        assert!(build_visemes("", 2.0).is_empty());
        assert!(build_visemes("hi", 0.0).is_empty());
    }
}
