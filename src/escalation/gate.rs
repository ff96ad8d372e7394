//! Acceptance gate shared by every knowledge source
//!
//! A candidate passage must survive three checks before its answer is
//! accepted: a cheap screen of the raw text, a relevance verdict and a
//! screen of the extracted answer.

use serde::{Deserialize, Serialize};

use crate::types::RejectReason;

/// Gate thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateConfig {
    /// Raw passages shorter than this are rejected
    pub min_passage_chars: usize,
    /// Characters of the passage shown to the relevance check
    pub relevance_excerpt_chars: usize,
    /// Extracted answers shorter than this are rejected
    pub min_answer_chars: usize,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            min_passage_chars: 50,
            relevance_excerpt_chars: 1000,
            min_answer_chars: 15,
        }
    }
}

/// Outcome of the relevance check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelevanceVerdict {
    Relevant,
    Irrelevant,
    /// Neither affirmative nor negative
    Ambiguous,
}

const AFFIRMATIVE: &[&str] = &["yes", "relevant", "true", "affirmative", "correct"];
const NEGATIVE: &[&str] = &["no", "not", "irrelevant", "unrelated", "false", "none"];

/// Negated affirmatives, matched on space-joined words
const NEGATED: &[&str] = &[
    "not relevant",
    "not related",
    "isn t relevant",
    "is irrelevant",
    "no relevance",
    "not at all relevant",
];

/// Phrases that mark an extracted answer as a non-answer
pub const NEGATIVE_PHRASES: &[&str] = &[
    "does not contain",
    "doesn't contain",
    "not found",
    "no information",
    "no relevant information",
    "no clear answer",
    "i'm sorry",
    "i am sorry",
    "unable to find",
    "couldn't find",
    "could not find",
    "cannot find",
    "can't find",
    "not mentioned",
    "not provided",
];

/// Screen a raw lookup result: empty, too short, or a known miss marker
pub fn screen_passage(raw: &str, markers: &[&str], min_chars: usize) -> Result<(), RejectReason> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(RejectReason::EmptyResult);
    }

    let chars = trimmed.chars().count();
    if chars < min_chars {
        return Err(RejectReason::PassageTooShort { chars });
    }

    if let Some(marker) = markers.iter().find(|m| raw.contains(**m)) {
        return Err(RejectReason::NoResultMarker {
            marker: marker.to_string(),
        });
    }

    Ok(())
}

/// Interpret a free-text yes/no answer. The first word decides; otherwise
/// a negated affirmative ("not relevant") rejects, and a mixed response
/// must contain only affirmative or only negative words.
pub fn parse_relevance(response: &str) -> RelevanceVerdict {
    let lowered = response.to_lowercase();
    let words: Vec<&str> = lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();

    let Some(first) = words.first() else {
        return RelevanceVerdict::Ambiguous;
    };

    if AFFIRMATIVE.contains(first) {
        return RelevanceVerdict::Relevant;
    }
    if NEGATIVE.contains(first) {
        return RelevanceVerdict::Irrelevant;
    }

    let joined = words.join(" ");
    if NEGATED.iter().any(|phrase| joined.contains(phrase)) {
        return RelevanceVerdict::Irrelevant;
    }

    let yes = words.iter().any(|w| AFFIRMATIVE.contains(w));
    let no = words.iter().any(|w| NEGATIVE.contains(w));
    match (yes, no) {
        (true, false) => RelevanceVerdict::Relevant,
        (false, true) => RelevanceVerdict::Irrelevant,
        _ => RelevanceVerdict::Ambiguous,
    }
}

/// Screen an extracted answer for failure phrases and length
pub fn screen_answer(answer: &str, min_chars: usize) -> Result<(), RejectReason> {
    let lowered = answer.to_lowercase();
    if let Some(phrase) = NEGATIVE_PHRASES.iter().find(|p| lowered.contains(**p)) {
        return Err(RejectReason::NegativeAnswer {
            phrase: phrase.to_string(),
        });
    }

    let chars = answer.trim().chars().count();
    if chars < min_chars {
        return Err(RejectReason::AnswerTooShort { chars });
    }

    Ok(())
}

/// First `max` characters of a passage
pub fn excerpt(passage: &str, max: usize) -> &str {
    match passage.char_indices().nth(max) {
        Some((idx, _)) => &passage[..idx],
        None => passage,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::escalation::source::ENCYCLOPEDIA_MARKERS;

    #[test]
    fn test_screen_passage() {
        assert_eq!(screen_passage("  ", &[], 50), Err(RejectReason::EmptyResult));
        assert_eq!(
            screen_passage("too short", &[], 50),
            Err(RejectReason::PassageTooShort { chars: 9 })
        );

        let ambiguous = "Mercury may refer to: a planet, an element, a Roman god, and several other things.";
        assert_eq!(
            screen_passage(ambiguous, ENCYCLOPEDIA_MARKERS, 50),
            Err(RejectReason::NoResultMarker {
                marker: "may refer to".to_string()
            })
        );

        let good = "Paris is the capital and most populous city of France, on the Seine.";
        assert_eq!(screen_passage(good, ENCYCLOPEDIA_MARKERS, 50), Ok(()));
    }

    #[test]
    fn test_parse_relevance() {
        assert_eq!(parse_relevance("YES"), RelevanceVerdict::Relevant);
        assert_eq!(parse_relevance("Yes, it answers the question."), RelevanceVerdict::Relevant);
        assert_eq!(parse_relevance("No."), RelevanceVerdict::Irrelevant);
        assert_eq!(parse_relevance("No, it is not relevant"), RelevanceVerdict::Irrelevant);
        assert_eq!(parse_relevance("The text is relevant"), RelevanceVerdict::Relevant);
        assert_eq!(parse_relevance("Partially, maybe"), RelevanceVerdict::Ambiguous);
        assert_eq!(parse_relevance(""), RelevanceVerdict::Ambiguous);
        assert_eq!(parse_relevance("Somewhat relevant but not really"), RelevanceVerdict::Ambiguous);
    }

    #[test]
    fn test_negated_relevance_is_irrelevant() {
        assert_eq!(
            parse_relevance("The text is not relevant to the question."),
            RelevanceVerdict::Irrelevant
        );
        assert_eq!(
            parse_relevance("This passage isn't relevant."),
            RelevanceVerdict::Irrelevant
        );
        assert_eq!(
            parse_relevance("The passage is not related to the question"),
            RelevanceVerdict::Irrelevant
        );
    }

    #[test]
    fn test_screen_answer() {
        assert_eq!(screen_answer("Paris is the capital of France.", 15), Ok(()));
        assert_eq!(
            screen_answer("The provided text does not contain the answer.", 15),
            Err(RejectReason::NegativeAnswer {
                phrase: "does not contain".to_string()
            })
        );
        assert_eq!(screen_answer("Paris.", 15), Err(RejectReason::AnswerTooShort { chars: 6 }));
    }

    #[test]
    fn test_excerpt_is_char_safe() {
        assert_eq!(excerpt("çağrı merkezi", 4), "çağr");
        assert_eq!(excerpt("abc", 10), "abc");
    }
}
