//! Fixed prompt templates
//!
//! Every generation call the pipeline makes is built here so the wording
//! the label parsers depend on (category names, sentinel phrase, yes/no
//! answers) stays in one place.

/// Category name the router expects for corpus questions
pub const CATEGORY_CORPUS: &str = "Document Corpus";

/// Category name the router expects for open-domain questions
pub const CATEGORY_GENERAL: &str = "General Knowledge";

/// Category name the router expects for everything else
pub const CATEGORY_UNRELATED: &str = "Unrelated";

/// Phrase the grounded answerer must emit when evidence has no answer
pub const NOT_FOUND_SENTINEL: &str = "No specific information on this topic was found in the provided documents.";

/// Phrase the extraction step must emit when a passage has no answer
pub const EXTRACTION_NOT_FOUND: &str = "The provided text does not contain the answer to this question.";

/// Router taxonomy prompt
pub fn classification(question: &str) -> String {
    format!(
        r#"Your task is to read the user's question CAREFULLY and decide which of the categories below it belongs to. Choose the most specific category that matches the content of the question.

Categories:

1. **{corpus}**:
   * Content: questions answered by the indexed document collection: regulations, laws, official announcements, notices, procedures, eligibility conditions, application steps, and anything the user asks about the contents of those documents.
   * Keywords: "regulation", "law", "announcement", "conditions", "requirements", "application", "published", "in force", "article", "notice".
   * PRIORITY: if the question asks about an official rule, a provision, its conditions or an announcement, ALWAYS choose this category.

2. **{general}**:
   * Content: current events, news, general culture, biographies, places, definitions of concepts, science and technology, history. Anything that needs an encyclopedia or a web search rather than the document collection.
   * Keywords: "what is", "who is", "where", "when", "latest", "news", "biography", "define", "explain", "summarize".

3. **{unrelated}**: questions that fit neither category above.

Write only the category name: {corpus}, {general}, or {unrelated}

Question:
{question}

Category:"#,
        corpus = CATEGORY_CORPUS,
        general = CATEGORY_GENERAL,
        unrelated = CATEGORY_UNRELATED,
        question = question,
    )
}

/// Query expansion prompt producing one search query per line
pub fn query_expansion(question: &str, variants: usize) -> String {
    format!(
        r#"You are helping search a document collection. Write {variants} different versions of the user's question that could find relevant passages with a similarity search. Rephrase with synonyms, split compound questions, and vary the level of detail.

Write one query per line. Do not number them and do not add any other text.

Question: {question}"#,
    )
}

/// Evidence-constrained answer prompt
pub fn grounded_answer(question: &str, evidence: &str) -> String {
    format!(
        r#"TASK: Answer the user's question ("Question") using only the document excerpts provided ("Context Excerpts").
STEPS:
1. Read all the Context Excerpts.
2. Look for the answer to the Question in those excerpts.
3. If you find the answer: answer the Question directly and clearly using only information from the excerpts. Include details such as article numbers or dates when present.
4. If you cannot find the answer: write only this sentence: "{sentinel}"
5. NEVER add outside knowledge or guesses.

CONTEXT EXCERPTS:
{evidence}

QUESTION: {question}

ANSWER:"#,
        sentinel = NOT_FOUND_SENTINEL,
    )
}

/// Binary relevance check of a passage
pub fn relevance(question: &str, passage: &str) -> String {
    format!(
        "Is the following text relevant to the question '{question}'? Answer only YES or NO.\n\nText:\n{passage}"
    )
}

/// Answer extraction from one passage
pub fn extraction(question: &str, passage: &str, passage_kind: &str) -> String {
    format!(
        r#"TASK: Answer the Question below using the provided {passage_kind}.
INSTRUCTIONS:
1. Read the text.
2. Look for the answer to the question in the text.
3. If you find it, write the information directly and briefly.
4. If you cannot find it, write ONLY "{not_found}"
5. Do not use phrases such as "according to the text".

PROVIDED {upper}:
{passage}

QUESTION: {question}

ANSWER:"#,
        not_found = EXTRACTION_NOT_FOUND,
        upper = passage_kind.to_uppercase(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_lists_all_categories() {
        let prompt = classification("Who is Ada Lovelace?");
        assert!(prompt.contains(CATEGORY_CORPUS));
        assert!(prompt.contains(CATEGORY_GENERAL));
        assert!(prompt.contains(CATEGORY_UNRELATED));
        assert!(prompt.trim_end().ends_with("Category:"));
        assert!(prompt.contains("Who is Ada Lovelace?"));
    }

    #[test]
    fn test_grounded_prompt_carries_sentinel() {
        let prompt = grounded_answer("q", "[1] evidence");
        assert!(prompt.contains(NOT_FOUND_SENTINEL));
        assert!(prompt.contains("[1] evidence"));
    }

    #[test]
    fn test_extraction_names_passage_kind() {
        let prompt = extraction("q", "passage", "Wikipedia text");
        assert!(prompt.contains("PROVIDED WIKIPEDIA TEXT"));
        assert!(prompt.contains(EXTRACTION_NOT_FOUND));
    }

    #[test]
    fn test_expansion_asks_for_count() {
        assert!(query_expansion("q", 4).contains("Write 4 different versions"));
    }
}
