//! Response parser - the protocol core
//!
//! Generated replies are expected to carry bracketed tags such as
//! `[INTENT: SEARCH]` or `[RESPONSE: ...]`. The tag set is declarative
//! data (an ordered list of [`TagRule`]s evaluated by one extraction
//! routine), so a persona adds or drops a tag without new parsing code.
//!
//! The parser is total: partial, malformed, or reordered tag sets never
//! raise; every missing field resolves to its typed default and the result
//! is always a fully-populated [`Classification`].

use std::collections::HashMap;

use crate::types::{Classification, FilterQuery, Intent, Mood, SearchType, TemporalQuery};

/// Tag names understood by the built-in personas
pub mod tags {
    pub const INTENT: &str = "INTENT";
    pub const SEARCH_TYPE: &str = "SEARCH_TYPE";
    pub const SEARCH_QUERY: &str = "SEARCH_QUERY";
    pub const TEMPORAL_BEFORE: &str = "TEMPORAL_BEFORE";
    pub const TEMPORAL_NOW: &str = "TEMPORAL_NOW";
    pub const TEMPORAL_AFTER: &str = "TEMPORAL_AFTER";
    pub const FILTER_OCR: &str = "FILTER_OCR";
    pub const FILTER_GENRE: &str = "FILTER_GENRE";
    pub const MOOD: &str = "MOOD";
    pub const RESPONSE: &str = "RESPONSE";
    pub const RESPONSE_JP: &str = "RESPONSE_JP";
}

/// How a tag's value is captured from the raw reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureMode {
    /// `[TAG: value]` on one line; the value cannot contain `]`
    SingleLine,
    /// Free-form value that may contain `]`; capture runs to the next tag
    /// boundary or end of text
    Greedy,
}

/// One entry of the tag grammar
#[derive(Debug, Clone)]
pub struct TagRule {
    pub name: &'static str,
    pub capture: CaptureMode,
    /// Raw default used when the tag is absent. A default of `"none"`
    /// normalizes to an empty field.
    pub default: &'static str,
}

impl TagRule {
    pub const fn single(name: &'static str, default: &'static str) -> Self {
        Self {
            name,
            capture: CaptureMode::SingleLine,
            default,
        }
    }

    pub const fn greedy(name: &'static str, default: &'static str) -> Self {
        Self {
            name,
            capture: CaptureMode::Greedy,
            default,
        }
    }
}

/// Ordered tag grammar for one persona
#[derive(Debug, Clone)]
pub struct TagGrammar {
    rules: Vec<TagRule>,
}

impl TagGrammar {
    pub fn new(rules: Vec<TagRule>) -> Self {
        Self { rules }
    }

    /// Full classifier grammar: search tags, mood, and both response languages
    pub fn classifier() -> Self {
        Self::new(vec![
            TagRule::single(tags::INTENT, "CHAT"),
            TagRule::single(tags::SEARCH_TYPE, "NONE"),
            TagRule::single(tags::SEARCH_QUERY, "none"),
            TagRule::single(tags::TEMPORAL_BEFORE, "none"),
            TagRule::single(tags::TEMPORAL_NOW, "none"),
            TagRule::single(tags::TEMPORAL_AFTER, "none"),
            TagRule::single(tags::FILTER_OCR, "none"),
            TagRule::single(tags::FILTER_GENRE, "none"),
            TagRule::single(tags::MOOD, "neutral"),
            TagRule::greedy(tags::RESPONSE, DEFAULT_RESPONSE),
            TagRule::greedy(tags::RESPONSE_JP, "none"),
        ])
    }

    /// Conversation-only grammar: mood and a single response language
    pub fn companion() -> Self {
        Self::new(vec![
            TagRule::single(tags::MOOD, "neutral"),
            TagRule::greedy(tags::RESPONSE, DEFAULT_RESPONSE),
        ])
    }

    pub fn has_tag(&self, name: &str) -> bool {
        self.rules.iter().any(|r| r.name == name)
    }

    pub fn rules(&self) -> &[TagRule] {
        &self.rules
    }
}

/// Filler used when a reply carries no usable RESPONSE tag
pub const DEFAULT_RESPONSE: &str = "Sorry, I lost my train of thought for a second. Could you say that again?";

/// Parses raw replies against a [`TagGrammar`]
#[derive(Debug, Clone)]
pub struct ResponseParser {
    grammar: TagGrammar,
}

impl ResponseParser {
    pub fn new(grammar: TagGrammar) -> Self {
        Self { grammar }
    }

    /// Parse one reply into a fully-populated classification. Never fails.
    pub fn parse(&self, raw: &str) -> Classification {
        let mut fields: HashMap<&str, Option<String>> = HashMap::new();
        for rule in self.grammar.rules() {
            fields.insert(rule.name, extract_field(raw, rule));
        }
        let field = |name: &str| fields.get(name).cloned().flatten();

        let intent = field(tags::INTENT)
            .and_then(|v| v.parse::<Intent>().ok())
            .unwrap_or_default();
        let mut search_type = field(tags::SEARCH_TYPE)
            .and_then(|v| v.parse::<SearchType>().ok())
            .unwrap_or_default();
        let mut search_query = field(tags::SEARCH_QUERY);

        // Temporal facets only materialize when the reply declared a
        // temporal search.
        let temporal_query = if search_type == SearchType::Temporal {
            let t = TemporalQuery {
                before: field(tags::TEMPORAL_BEFORE),
                now: field(tags::TEMPORAL_NOW),
                after: field(tags::TEMPORAL_AFTER),
            };
            (!t.is_empty()).then_some(t)
        } else {
            None
        };

        let f = FilterQuery {
            ocr: split_filter_terms(field(tags::FILTER_OCR)),
            genre: split_filter_terms(field(tags::FILTER_GENRE)),
        };
        let filter_query = (!f.is_empty()).then_some(f);

        // Field evidence beats the declared type, but only for SEARCH
        // replies; filter tags on a CHAT reply are discarded.
        if intent == Intent::Search
            && filter_query.is_some()
            && search_type != SearchType::Filter
        {
            search_type = SearchType::Filter;
        }

        // A temporal-only search still needs a flat query string.
        if search_query.is_none() {
            if let Some(t) = &temporal_query {
                let joined = t.joined();
                if !joined.is_empty() {
                    search_query = Some(joined);
                }
            }
        }

        let mood = field(tags::MOOD)
            .map(|v| Mood::parse_or_neutral(&v))
            .unwrap_or_default();

        let text = field(tags::RESPONSE).unwrap_or_else(|| DEFAULT_RESPONSE.to_string());
        let text_localized = if self.grammar.has_tag(tags::RESPONSE_JP) {
            field(tags::RESPONSE_JP)
        } else {
            None
        };

        Classification {
            intent,
            search_type,
            search_query,
            temporal_query,
            filter_query,
            text,
            text_localized,
            mood,
            raw_response: raw.to_string(),
        }
    }
}

/// Single extraction routine shared by every rule.
///
/// Returns the normalized value, or the rule default when the tag is
/// absent; a literal `"none"` (any case) normalizes to `None`.
fn extract_field(raw: &str, rule: &TagRule) -> Option<String> {
    let captured = match rule.capture {
        CaptureMode::SingleLine => capture_single_line(raw, rule.name),
        CaptureMode::Greedy => capture_greedy(raw, rule.name),
    };
    let value = captured.unwrap_or_else(|| rule.default.to_string());
    normalize_value(&value)
}

fn tag_open(name: &str) -> String {
    format!("[{}:", name)
}

/// `[TAG: value]` where the value sits on one line with no `]` of its own.
fn capture_single_line(raw: &str, name: &str) -> Option<String> {
    let open = tag_open(name);
    let start = raw.find(&open)? + open.len();
    let rest = &raw[start..];
    let end = rest.find(']')?;
    let value = &rest[..end];
    if value.contains('\n') {
        return None;
    }
    Some(value.trim().to_string())
}

/// Free-form capture that runs to the next tag boundary or end of text,
/// with trailing bracket artifacts stripped.
fn capture_greedy(raw: &str, name: &str) -> Option<String> {
    let open = tag_open(name);
    let start = raw.find(&open)? + open.len();
    let rest = &raw[start..];
    let end = next_tag_boundary(rest).unwrap_or(rest.len());
    let value = rest[..end].trim().trim_end_matches(']').trim();
    Some(value.to_string())
}

/// Byte offset of the next `[NAME:` opener, for any all-caps tag name.
fn next_tag_boundary(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        if b != b'[' {
            continue;
        }
        let mut j = i + 1;
        while j < bytes.len() && (bytes[j].is_ascii_uppercase() || bytes[j] == b'_') {
            j += 1;
        }
        if j > i + 1 && j < bytes.len() && bytes[j] == b':' {
            return Some(i);
        }
    }
    None
}

/// Trim, and treat a literal "none" (case-insensitive) or empty as absent.
fn normalize_value(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("none") {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Comma-split, trim, lowercase, and drop empties and "none" literals.
fn split_filter_terms(field: Option<String>) -> Vec<String> {
    field
        .map(|v| {
            v.split(',')
                .map(|t| t.trim().to_lowercase())
                .filter(|t| !t.is_empty() && t != "none")
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> Classification {
        ResponseParser::new(TagGrammar::classifier()).parse(raw)
    }

    #[test]
    fn test_full_search_reply() {
        let c = parse(
            "[INTENT: SEARCH] [SEARCH_TYPE: TEXT] [SEARCH_QUERY: red car on a bridge] \
             [MOOD: excited] [RESPONSE: On it! Searching for that red car now~]",
        );
        assert_eq!(c.intent, Intent::Search);
        assert_eq!(c.search_type, SearchType::Text);
        assert_eq!(c.search_query.as_deref(), Some("red car on a bridge"));
        assert_eq!(c.mood, Mood::Excited);
        assert!(c.is_search_query());
        assert_eq!(c.text, "On it! Searching for that red car now~");
    }

    #[test]
    fn test_missing_all_tags_defaults() {
        let c = parse("just some untagged text");
        assert_eq!(c.intent, Intent::Chat);
        assert_eq!(c.search_type, SearchType::None);
        assert_eq!(c.mood, Mood::Neutral);
        assert!(c.search_query.is_none());
        assert!(c.temporal_query.is_none());
        assert!(c.filter_query.is_none());
        assert!(!c.text.is_empty());
        assert!(!c.is_search_query());
        assert_eq!(c.raw_response, "just some untagged text");
    }

    #[test]
    fn test_none_literal_normalizes_to_absent() {
        let c = parse("[INTENT: SEARCH] [SEARCH_TYPE: TEXT] [SEARCH_QUERY: None]");
        assert!(c.search_query.is_none());
        assert!(!c.is_search_query());
    }

    #[test]
    fn test_filter_evidence_overrides_declared_type() {
        let c = parse(
            "[INTENT: SEARCH] [SEARCH_TYPE: TEXT] [FILTER_OCR: SALE, exit] \
             [FILTER_GENRE: News] [RESPONSE: Filtering!]",
        );
        assert_eq!(c.search_type, SearchType::Filter);
        let f = c.filter_query.unwrap();
        assert_eq!(f.ocr, vec!["sale", "exit"]);
        assert_eq!(f.genre, vec!["news"]);
    }

    #[test]
    fn test_filter_on_chat_reply_is_discarded_from_type() {
        let c = parse("[INTENT: CHAT] [SEARCH_TYPE: NONE] [FILTER_OCR: sale]");
        // Filter data is parsed but the declared type stands and the reply
        // is not a search.
        assert_eq!(c.search_type, SearchType::None);
        assert!(!c.is_search_query());
    }

    #[test]
    fn test_temporal_only_now_synthesizes_query() {
        let c = parse(
            "[INTENT: SEARCH] [SEARCH_TYPE: TEMPORAL] [TEMPORAL_BEFORE: none] \
             [TEMPORAL_NOW: a man opens a door] [TEMPORAL_AFTER: none]",
        );
        let t = c.temporal_query.as_ref().unwrap();
        assert_eq!(t.before, None);
        assert_eq!(t.now.as_deref(), Some("a man opens a door"));
        assert_eq!(t.after, None);
        assert_eq!(c.search_query.as_deref(), Some("a man opens a door"));
        assert!(c.is_search_query());
    }

    #[test]
    fn test_temporal_fields_ignored_for_text_search() {
        let c = parse(
            "[INTENT: SEARCH] [SEARCH_TYPE: TEXT] [SEARCH_QUERY: cats] \
             [TEMPORAL_NOW: a man opens a door]",
        );
        assert!(c.temporal_query.is_none());
        assert_eq!(c.search_query.as_deref(), Some("cats"));
    }

    #[test]
    fn test_greedy_response_may_contain_brackets() {
        let c = parse(
            "[MOOD: happy] [RESPONSE: Check this [in brackets] right here!] [RESPONSE_JP: none]",
        );
        assert_eq!(c.text, "Check this [in brackets] right here!");
    }

    #[test]
    fn test_trailing_bracket_artifact_stripped() {
        let c = parse("[MOOD: happy] [RESPONSE: All done!]");
        assert_eq!(c.text, "All done!");
    }

    #[test]
    fn test_unknown_mood_defaults_to_neutral() {
        let c = parse("[MOOD: bamboozled] [RESPONSE: hm]");
        assert_eq!(c.mood, Mood::Neutral);
    }

    #[test]
    fn test_reordered_tags_parse_the_same() {
        let c = parse("[RESPONSE: hey!] [MOOD: happy] [INTENT: CHAT]");
        assert_eq!(c.mood, Mood::Happy);
        assert_eq!(c.text, "hey!");
    }

    #[test]
    fn test_localized_response_captured() {
        let c = parse("[RESPONSE: Good morning!] [RESPONSE_JP: おはよう！]");
        assert_eq!(c.text_localized.as_deref(), Some("おはよう！"));
    }

    #[test]
    fn test_companion_grammar_skips_search_tags() {
        let parser = ResponseParser::new(TagGrammar::companion());
        let c = parser.parse("[INTENT: SEARCH] [MOOD: shy] [RESPONSE: um, hi]");
        // The companion grammar has no INTENT rule, so the default applies.
        assert_eq!(c.intent, Intent::Chat);
        assert_eq!(c.mood, Mood::Shy);
        assert!(c.text_localized.is_none());
    }
}
