//! Evidence set assembly under a character budget

use serde::Serialize;

use crate::corpus::EvidenceChunk;

/// Default context budget in characters
pub const DEFAULT_CONTEXT_BUDGET: usize = 20_000;

/// Ordered, deduplicated evidence that fits the context budget
#[derive(Debug, Clone, Serialize)]
pub struct EvidenceSet {
    chunks: Vec<EvidenceChunk>,
    total_chars: usize,
    budget: usize,
    /// Candidates left out once the budget closed the set
    dropped: usize,
}

impl EvidenceSet {
    /// Accept chunks in order until the next one would overflow `budget`.
    /// No chunk is split and nothing after the first overflow is added.
    pub fn assemble(candidates: Vec<EvidenceChunk>, budget: usize) -> Self {
        let offered = candidates.len();
        let mut chunks = Vec::new();
        let mut total_chars = 0;

        for chunk in candidates {
            let len = chunk.char_len();
            if total_chars + len > budget {
                break;
            }
            total_chars += len;
            chunks.push(chunk);
        }

        let dropped = offered - chunks.len();
        Self {
            chunks,
            total_chars,
            budget,
            dropped,
        }
    }

    pub fn empty(budget: usize) -> Self {
        Self::assemble(Vec::new(), budget)
    }

    pub fn chunks(&self) -> &[EvidenceChunk] {
        &self.chunks
    }

    pub fn total_chars(&self) -> usize {
        self.total_chars
    }

    pub fn budget(&self) -> usize {
        self.budget
    }

    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Candidates existed but the first one was already over budget
    pub fn exceeded_budget(&self) -> bool {
        self.chunks.is_empty() && self.dropped > 0
    }

    /// Numbered excerpts for the grounded prompt
    pub fn render(&self) -> String {
        self.chunks
            .iter()
            .enumerate()
            .map(|(idx, chunk)| {
                format!(
                    "[Excerpt {}] (source: {})\n{}",
                    idx + 1,
                    chunk.origin,
                    chunk.text
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::ChunkOrigin;
    use quickcheck_macros::quickcheck;

    fn chunk(id: usize, len: usize) -> EvidenceChunk {
        EvidenceChunk::new("x".repeat(len), ChunkOrigin::new("doc", id))
    }

    #[test]
    fn test_all_chunks_fit() {
        let set = EvidenceSet::assemble(vec![chunk(0, 10), chunk(1, 10)], 100);
        assert_eq!(set.len(), 2);
        assert_eq!(set.total_chars(), 20);
        assert_eq!(set.dropped(), 0);
        assert!(!set.exceeded_budget());
    }

    #[test]
    fn test_truncates_at_boundary_chunk() {
        // each chunk fits alone, the third pushes the total over
        let set = EvidenceSet::assemble(vec![chunk(0, 40), chunk(1, 40), chunk(2, 40), chunk(3, 5)], 100);
        assert_eq!(set.len(), 2);
        assert_eq!(set.total_chars(), 80);
        assert_eq!(set.dropped(), 2);
        assert_eq!(set.chunks()[1].origin.offset, 1);
    }

    #[test]
    fn test_exact_budget_is_accepted() {
        let set = EvidenceSet::assemble(vec![chunk(0, 60), chunk(1, 40)], 100);
        assert_eq!(set.total_chars(), 100);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_oversized_first_chunk() {
        let set = EvidenceSet::assemble(vec![chunk(0, 150), chunk(1, 10)], 100);
        assert!(set.is_empty());
        assert!(set.exceeded_budget());
    }

    #[test]
    fn test_empty_is_not_exceeded() {
        let set = EvidenceSet::empty(100);
        assert!(set.is_empty());
        assert!(!set.exceeded_budget());
    }

    #[test]
    fn test_render_numbers_excerpts() {
        let set = EvidenceSet::assemble(
            vec![EvidenceChunk::new("first", ChunkOrigin::new("a.md", 0))],
            100,
        );
        assert_eq!(set.render(), "[Excerpt 1] (source: a.md@0)\nfirst");
    }

    #[quickcheck]
    fn prop_total_never_exceeds_budget(lengths: Vec<u16>, budget: u16) -> bool {
        let candidates: Vec<_> = lengths
            .iter()
            .enumerate()
            .map(|(i, len)| chunk(i, *len as usize % 500))
            .collect();
        let set = EvidenceSet::assemble(candidates, budget as usize);

        let summed: usize = set.chunks().iter().map(|c| c.char_len()).sum();
        set.total_chars() <= set.budget() && summed == set.total_chars()
    }

    #[quickcheck]
    fn prop_kept_chunks_are_a_prefix(lengths: Vec<u16>, budget: u16) -> bool {
        let candidates: Vec<_> = lengths
            .iter()
            .enumerate()
            .map(|(i, len)| chunk(i, *len as usize % 500))
            .collect();
        let set = EvidenceSet::assemble(candidates.clone(), budget as usize);

        set.chunks() == &candidates[..set.len()] && set.len() + set.dropped() == candidates.len()
    }
}
