//! Fallback responder: the terminal handler that always answers

use crate::types::{AnswerResult, Question, SourceLabel, Track};

/// Templated refusal, or `custom_message` when given
pub fn respond(question: &Question, custom_message: Option<&str>) -> AnswerResult {
    let answer = match custom_message {
        Some(message) => message.to_string(),
        None => format!(
            "Sorry, I can't answer '{}' with my current knowledge and abilities. You could try asking it differently.",
            question
        ),
    };
    AnswerResult::new(answer, SourceLabel::Fallback, Track::Fallback)
}
