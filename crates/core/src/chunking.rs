use crate::error::Result;
use regex::Regex;

/// Blank line, optionally holding spaces or tabs, with either line ending.
pub const PARAGRAPH_BOUNDARY: &str = r"\r?\n[ \t]*\r?\n";

/// Splits extracted text into paragraph chunks.
///
/// No size cap and no overlap: every blank-line separated paragraph becomes
/// one chunk, trimmed, and whitespace-only paragraphs are dropped.
#[derive(Debug, Clone)]
pub struct TextChunker {
    boundary: Regex,
}

impl TextChunker {
    pub fn new() -> Result<Self> {
        Self::with_boundary(PARAGRAPH_BOUNDARY)
    }

    pub fn with_boundary(pattern: &str) -> Result<Self> {
        Ok(Self {
            boundary: Regex::new(pattern)?,
        })
    }

    pub fn chunk(&self, text: &str) -> Vec<String> {
        self.boundary
            .split(text)
            .map(str::trim)
            .filter(|paragraph| !paragraph.is_empty())
            .map(str::to_string)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::TextChunker;

    fn chunker() -> TextChunker {
        TextChunker::new().expect("default boundary compiles")
    }

    #[test]
    fn paragraphs_become_trimmed_chunks() {
        let chunks = chunker().chunk("  First paragraph.\n\nSecond one\nstill second.  \n\n\nThird");
        assert_eq!(
            chunks,
            vec!["First paragraph.", "Second one\nstill second.", "Third"]
        );
    }

    #[test]
    fn empty_and_blank_input_yield_nothing() {
        assert!(chunker().chunk("").is_empty());
        assert!(chunker().chunk("   \n\n  ").is_empty());
    }

    #[test]
    fn text_without_breaks_is_a_single_chunk() {
        assert_eq!(chunker().chunk("  one line\nand another "), vec!["one line\nand another"]);
    }

    #[test]
    fn whitespace_only_lines_and_crlf_count_as_boundaries() {
        let chunks = chunker().chunk("A\n \t\nB\r\n\r\nC");
        assert_eq!(chunks, vec!["A", "B", "C"]);
    }
}
