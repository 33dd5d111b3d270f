use serde::{Deserialize, Serialize};

// --- Taxonomy Entries ---

/// Deck a symbolic card belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeckKind {
    Tarot,
    Numerology,
    Oracle,
}

impl DeckKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeckKind::Tarot => "tarot",
            DeckKind::Numerology => "numerology",
            DeckKind::Oracle => "oracle",
        }
    }
}

/// A symbolic card: English name, Korean display name, owning deck.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub name: String,
    pub korean: String,
    pub deck: DeckKind,
}

impl Card {
    pub fn new(name: &str, korean: &str, deck: DeckKind) -> Self {
        Self {
            name: name.to_string(),
            korean: korean.to_string(),
            deck,
        }
    }
}

// --- Topic ---

/// One topic: a triple drawn from the three taxonomies.
/// Identity is structural equality of (personality, situation, card name).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    pub personality: String,
    pub situation: String,
    pub card: Card,
}

impl Topic {
    /// Main keyword of the situation label, without the English gloss.
    /// "신뢰 문제 (trust issues)" → "신뢰 문제".
    pub fn situation_keyword(&self) -> &str {
        match self.situation.split_once('(') {
            Some((keyword, _)) => keyword.trim(),
            None => self.situation.trim(),
        }
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} × {} × {}",
            self.personality, self.situation, self.card.name
        )
    }
}

// --- Publication Status ---

/// Recorded outcome of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostStatus {
    Published,
    Draft,
    Scheduled,
    Failed,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Published => "published",
            PostStatus::Draft => "draft",
            PostStatus::Scheduled => "scheduled",
            PostStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "published" => Some(PostStatus::Published),
            "draft" => Some(PostStatus::Draft),
            "scheduled" => Some(PostStatus::Scheduled),
            "failed" => Some(PostStatus::Failed),
            _ => None,
        }
    }

    /// Statuses recognized by the CMS wire protocol map onto ledger statuses:
    /// "publish" is a live post, "future" is a scheduled one.
    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "publish" => Some(PostStatus::Published),
            "future" => Some(PostStatus::Scheduled),
            "draft" => Some(PostStatus::Draft),
            _ => None,
        }
    }

    /// Only delivered posts consume a combination; drafts and failures
    /// leave the topic available for re-selection.
    pub fn blocks_reselection(&self) -> bool {
        matches!(self, PostStatus::Published | PostStatus::Scheduled)
    }
}

impl std::fmt::Display for PostStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// --- Article ---

/// A generated article. Transient: owned by the coordinator for the
/// duration of one run, mutated only by sanitization.
#[derive(Debug, Clone)]
pub struct Article {
    pub title: String,
    pub body: String,
    pub word_count: usize,
}

impl Article {
    pub fn new(title: String, body: String) -> Self {
        let word_count = body.split_whitespace().count();
        Self {
            title,
            body,
            word_count,
        }
    }

    /// Replace the body, recomputing the word count.
    pub fn with_body(self, body: String) -> Self {
        Self::new(self.title, body)
    }
}

// --- Validation ---

/// A single safety-policy violation found in generated content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Violation {
    ForbiddenTerm { term: String },
    MissingDisclaimer,
    TooFewSections { found: usize, required: usize },
    TooShort { chars: usize, minimum: usize },
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Violation::ForbiddenTerm { term } => write!(f, "forbidden term \"{term}\""),
            Violation::MissingDisclaimer => write!(f, "required disclaimer missing"),
            Violation::TooFewSections { found, required } => {
                write!(f, "too few section headers: {found} (minimum {required})")
            }
            Violation::TooShort { chars, minimum } => {
                write!(f, "content too short: {chars} characters (minimum {minimum})")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn situation_keyword_strips_gloss() {
        let topic = Topic {
            personality: "INFP".to_string(),
            situation: "신뢰 문제 (trust issues)".to_string(),
            card: Card::new("The Moon", "달", DeckKind::Tarot),
        };
        assert_eq!(topic.situation_keyword(), "신뢰 문제");
    }

    #[test]
    fn status_round_trips_through_str() {
        for status in [
            PostStatus::Published,
            PostStatus::Draft,
            PostStatus::Scheduled,
            PostStatus::Failed,
        ] {
            assert_eq!(PostStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(PostStatus::parse("pending"), None);
    }

    #[test]
    fn wire_status_mapping() {
        assert_eq!(PostStatus::from_wire("publish"), Some(PostStatus::Published));
        assert_eq!(PostStatus::from_wire("future"), Some(PostStatus::Scheduled));
        assert_eq!(PostStatus::from_wire("draft"), Some(PostStatus::Draft));
        assert_eq!(PostStatus::from_wire("published"), None);
    }

    #[test]
    fn word_count_tracks_body() {
        let article = Article::new("t".to_string(), "one two three".to_string());
        assert_eq!(article.word_count, 3);
        let article = article.with_body("one two".to_string());
        assert_eq!(article.word_count, 2);
    }
}
