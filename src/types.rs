//! Core types for Aria

use serde::{Deserialize, Serialize};

/// Classified intent of a user message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Intent {
    Search,
    #[default]
    Chat,
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Intent::Search => write!(f, "SEARCH"),
            Intent::Chat => write!(f, "CHAT"),
        }
    }
}

impl std::str::FromStr for Intent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "SEARCH" => Ok(Intent::Search),
            "CHAT" => Ok(Intent::Chat),
            _ => Err(format!("Unknown intent: {}", s)),
        }
    }
}

/// Kind of search a SEARCH intent resolves to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum SearchType {
    Text,
    Temporal,
    Filter,
    Image,
    #[default]
    None,
}

impl std::fmt::Display for SearchType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SearchType::Text => write!(f, "TEXT"),
            SearchType::Temporal => write!(f, "TEMPORAL"),
            SearchType::Filter => write!(f, "FILTER"),
            SearchType::Image => write!(f, "IMAGE"),
            SearchType::None => write!(f, "NONE"),
        }
    }
}

impl std::str::FromStr for SearchType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "TEXT" => Ok(SearchType::Text),
            "TEMPORAL" => Ok(SearchType::Temporal),
            "FILTER" => Ok(SearchType::Filter),
            "IMAGE" => Ok(SearchType::Image),
            "NONE" => Ok(SearchType::None),
            _ => Err(format!("Unknown search type: {}", s)),
        }
    }
}

/// Mood label attached to a generated response, driving avatar expression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Happy,
    Excited,
    Concerned,
    Pouty,
    Thinking,
    #[default]
    Neutral,
    Sad,
    Surprised,
    Smug,
    Shy,
}

impl Mood {
    /// All moods the parser recognizes
    pub const ALL: [Mood; 10] = [
        Mood::Happy,
        Mood::Excited,
        Mood::Concerned,
        Mood::Pouty,
        Mood::Thinking,
        Mood::Neutral,
        Mood::Sad,
        Mood::Surprised,
        Mood::Smug,
        Mood::Shy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mood::Happy => "happy",
            Mood::Excited => "excited",
            Mood::Concerned => "concerned",
            Mood::Pouty => "pouty",
            Mood::Thinking => "thinking",
            Mood::Neutral => "neutral",
            Mood::Sad => "sad",
            Mood::Surprised => "surprised",
            Mood::Smug => "smug",
            Mood::Shy => "shy",
        }
    }

    /// Case-insensitive lookup, defaulting to neutral for unknown labels
    pub fn parse_or_neutral(s: &str) -> Mood {
        let lower = s.trim().to_lowercase();
        Mood::ALL
            .into_iter()
            .find(|m| m.as_str() == lower)
            .unwrap_or(Mood::Neutral)
    }
}

impl std::fmt::Display for Mood {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Role of a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// A single message in a session's history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Structured decomposition of a search into before/now/after scene descriptions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TemporalQuery {
    pub before: Option<String>,
    pub now: Option<String>,
    pub after: Option<String>,
}

impl TemporalQuery {
    pub fn is_empty(&self) -> bool {
        self.before.is_none() && self.now.is_none() && self.after.is_none()
    }

    /// Concatenate the populated components in before/now/after order
    pub fn joined(&self) -> String {
        [&self.before, &self.now, &self.after]
            .into_iter()
            .flatten()
            .cloned()
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Structured decomposition of a search refinement into term lists
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct FilterQuery {
    pub ocr: Vec<String>,
    pub genre: Vec<String>,
}

impl FilterQuery {
    pub fn is_empty(&self) -> bool {
        self.ocr.is_empty() && self.genre.is_empty()
    }
}

/// Fully-populated result of parsing one generated reply.
///
/// Every field is always present; missing or malformed tags resolve to
/// typed defaults rather than errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Classification {
    pub intent: Intent,
    #[serde(rename = "searchType")]
    pub search_type: SearchType,
    #[serde(rename = "searchQuery")]
    pub search_query: Option<String>,
    #[serde(rename = "temporalQuery")]
    pub temporal_query: Option<TemporalQuery>,
    #[serde(rename = "filterQuery")]
    pub filter_query: Option<FilterQuery>,
    /// Primary-language response text
    pub text: String,
    /// Pre-translated localized response, when the persona requests one
    #[serde(rename = "textLocalized")]
    pub text_localized: Option<String>,
    pub mood: Mood,
    /// Original unparsed reply, kept for diagnostics only
    #[serde(rename = "rawResponse")]
    pub raw_response: String,
}

impl Classification {
    /// True iff this is a SEARCH with at least one populated query facet
    pub fn is_search_query(&self) -> bool {
        self.intent == Intent::Search
            && (self.search_query.as_deref().is_some_and(|q| !q.is_empty())
                || self.temporal_query.as_ref().is_some_and(|t| !t.is_empty())
                || self.filter_query.as_ref().is_some_and(|f| !f.is_empty()))
    }
}
