//! Query expansion
//!
//! One generation call turns a question into several search queries.
//! When that call fails or yields nothing usable the question itself is
//! the only query.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::deadline::Deadline;
use crate::llm::{GenerationRequest, Generator, PromptKind};
use crate::prompts;
use crate::types::Question;

/// Parse one query per line, dropping blanks, list markers and repeats
pub fn parse_variants(raw: &str, max_variants: usize) -> Vec<String> {
    let mut variants: Vec<String> = Vec::new();

    for line in raw.lines() {
        let query = strip_list_marker(line.trim()).trim();
        if query.is_empty() || variants.iter().any(|v| v == query) {
            continue;
        }
        variants.push(query.to_string());
        if variants.len() == max_variants {
            break;
        }
    }

    variants
}

fn strip_list_marker(line: &str) -> &str {
    let line = line.trim_start_matches(['-', '*', '•']);
    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 {
        let rest = &line[digits..];
        if let Some(stripped) = rest.strip_prefix('.').or_else(|| rest.strip_prefix(')')) {
            return stripped;
        }
    }
    line
}

/// Paraphrases a question into search queries
#[derive(Clone)]
pub struct QueryExpander {
    generator: Arc<dyn Generator>,
    max_variants: usize,
}

impl QueryExpander {
    pub fn new(generator: Arc<dyn Generator>, max_variants: usize) -> Self {
        Self {
            generator,
            max_variants: max_variants.max(1),
        }
    }

    /// Query variants in generation order, never empty
    pub async fn expand(&self, question: &Question, deadline: &Deadline) -> Vec<String> {
        let request = GenerationRequest::new(
            PromptKind::ExpandQuery,
            prompts::query_expansion(question.as_str(), self.max_variants),
        );

        match deadline.run(self.generator.generate(&request)).await {
            Ok(raw) => {
                let variants = parse_variants(&raw, self.max_variants);
                if variants.is_empty() {
                    warn!("query expansion returned no usable lines, using the question");
                    vec![question.as_str().to_string()]
                } else {
                    debug!(count = variants.len(), ?variants, "query variants");
                    variants
                }
            }
            Err(e) => {
                warn!(error = %e, "query expansion failed, using the question");
                vec![question.as_str().to_string()]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockGenerator;

    #[test]
    fn test_parse_drops_blank_lines() {
        let variants = parse_variants("first query\n\n  \nsecond query\n", 5);
        assert_eq!(variants, vec!["first query", "second query"]);
    }

    #[test]
    fn test_parse_strips_list_markers_and_duplicates() {
        let variants = parse_variants("1. alpha\n2) beta\n- gamma\n* alpha", 5);
        assert_eq!(variants, vec!["alpha", "beta", "gamma"]);
    }

    #[test]
    fn test_parse_caps_variant_count() {
        let variants = parse_variants("a\nb\nc\nd\ne\nf\ng", 5);
        assert_eq!(variants.len(), 5);
        assert_eq!(variants[4], "e");
    }

    #[test]
    fn test_numbers_without_marker_are_kept() {
        assert_eq!(parse_variants("2024 budget rules", 5), vec!["2024 budget rules"]);
    }

    #[tokio::test]
    async fn test_expansion_failure_falls_back_to_question() {
        let generator = Arc::new(MockGenerator::new().with_failure(PromptKind::ExpandQuery, "down"));
        let expander = QueryExpander::new(generator, 5);

        let variants = expander.expand(&Question::new("What changed?"), &Deadline::none()).await;
        assert_eq!(variants, vec!["What changed?"]);
    }

    #[tokio::test]
    async fn test_blank_expansion_falls_back_to_question() {
        let generator = Arc::new(MockGenerator::new().with_reply(PromptKind::ExpandQuery, "\n \n"));
        let expander = QueryExpander::new(generator, 5);

        let variants = expander.expand(&Question::new("q"), &Deadline::none()).await;
        assert_eq!(variants, vec!["q"]);
    }
}
