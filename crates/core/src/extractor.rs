use crate::error::{AssistantError, Result};
use lopdf::Document;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct PageText {
    pub number: u32,
    pub text: String,
}

/// Turns uploaded bytes into plain text. Failures are reported as an empty
/// string so one unreadable file never aborts a batch.
pub trait PdfExtractor: Send + Sync {
    fn extract_text(&self, bytes: &[u8]) -> String;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfExtractor;

impl LopdfExtractor {
    pub fn extract_pages(&self, bytes: &[u8]) -> Result<Vec<PageText>> {
        let document =
            Document::load_mem(bytes).map_err(|error| AssistantError::PdfParse(error.to_string()))?;

        let mut pages = Vec::new();
        for (page_no, _page_id) in document.get_pages() {
            let text = document
                .extract_text(&[page_no])
                .map_err(|error| AssistantError::PdfParse(error.to_string()))?;

            if !text.trim().is_empty() {
                pages.push(PageText {
                    number: page_no,
                    text,
                });
            }
        }

        Ok(pages)
    }
}

impl PdfExtractor for LopdfExtractor {
    fn extract_text(&self, bytes: &[u8]) -> String {
        match self.extract_pages(bytes) {
            Ok(pages) => {
                info!(pages = pages.len(), "pdf text extracted");
                join_pages(&pages)
            }
            Err(error) => {
                warn!(%error, "pdf text extraction failed");
                String::new()
            }
        }
    }
}

/// Pages are separated by a blank line so that a page break is also a
/// paragraph boundary for chunking.
pub fn join_pages(pages: &[PageText]) -> String {
    let mut text = String::new();
    for page in pages {
        text.push_str(&page.text);
        text.push_str("\n\n");
    }
    text
}

#[cfg(test)]
mod tests {
    use super::{join_pages, LopdfExtractor, PageText, PdfExtractor};

    #[test]
    fn unreadable_bytes_yield_empty_text() {
        let text = LopdfExtractor.extract_text(b"%PDF-1.4\n%broken");
        assert!(text.is_empty());
    }

    #[test]
    fn pages_are_joined_with_blank_lines() {
        let pages = vec![
            PageText {
                number: 1,
                text: "Page one".to_string(),
            },
            PageText {
                number: 2,
                text: "Page two".to_string(),
            },
        ];
        assert_eq!(join_pages(&pages), "Page one\n\nPage two\n\n");
    }
}
