//! Fixed-size overlapping text chunks

/// One window of a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    /// Character offset of the first character
    pub offset: usize,
    pub text: String,
}

/// Split `text` into windows of at most `size` characters, each starting
/// `overlap` characters before the previous one ended. Windows end on
/// whitespace when one is available past the overlap.
pub fn chunk_text(text: &str, size: usize, overlap: usize) -> Vec<TextChunk> {
    let chars: Vec<char> = text.chars().collect();
    if size == 0 || chars.is_empty() {
        return Vec::new();
    }

    let overlap = overlap.min(size - 1);
    let mut chunks = Vec::new();
    let mut start = 0;

    loop {
        let mut end = (start + size).min(chars.len());

        if end < chars.len() {
            let min_end = start + overlap + 1;
            if let Some(pos) = (min_end..end).rev().find(|&i| chars[i].is_whitespace()) {
                end = pos;
            }
        }

        let window: String = chars[start..end].iter().collect();
        if !window.trim().is_empty() {
            chunks.push(TextChunk {
                offset: start,
                text: window,
            });
        }

        if end >= chars.len() {
            break;
        }
        start = end - overlap;
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck_macros::quickcheck;

    #[test]
    fn test_short_text_is_one_chunk() {
        let chunks = chunk_text("hello world", 750, 150);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].offset, 0);
        assert_eq!(chunks[0].text, "hello world");
    }

    #[test]
    fn test_empty_text() {
        assert!(chunk_text("", 10, 2).is_empty());
        assert!(chunk_text("abc", 0, 0).is_empty());
    }

    #[test]
    fn test_windows_overlap() {
        let text = "abcdefghijklmnopqrstuvwxyz";
        let chunks = chunk_text(text, 10, 3);
        assert_eq!(chunks[0].text, "abcdefghij");
        assert_eq!(chunks[1].offset, 7);
        assert_eq!(chunks[1].text, "hijklmnopq");
        assert_eq!(chunks.last().map(|c| c.text.chars().last()), Some(Some('z')));
    }

    #[test]
    fn test_prefers_whitespace_break() {
        let chunks = chunk_text("one two three four five six", 12, 2);
        assert_eq!(chunks[0].text, "one two");
        assert_eq!(chunks[1].offset, 5);
    }

    #[quickcheck]
    fn prop_chunks_are_bounded_and_located(text: String, size: u8, overlap: u8) -> bool {
        let size = (size as usize % 64) + 1;
        let overlap = overlap as usize % 64;
        let chars: Vec<char> = text.chars().collect();

        chunk_text(&text, size, overlap).iter().all(|chunk| {
            let len = chunk.text.chars().count();
            let expected: String = chars[chunk.offset..chunk.offset + len].iter().collect();
            len <= size && expected == chunk.text
        })
    }

    #[quickcheck]
    fn prop_offsets_strictly_increase(text: String, size: u8, overlap: u8) -> bool {
        let size = (size as usize % 64) + 1;
        let overlap = overlap as usize % 64;
        let chunks = chunk_text(&text, size, overlap);
        chunks.windows(2).all(|w| w[0].offset < w[1].offset)
    }
}
