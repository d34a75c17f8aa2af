//! PDF text extraction with layout-repair heuristics.
//!
//! Naive PDF text extraction frequently concatenates words across layout
//! boundaries, so the raw text-layer output is repaired before cleanup:
//! missing spaces are re-inserted at case transitions, after sentence
//! punctuation, and around brackets. Paragraph breaks are collapsed but
//! never fully erased.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

use sift_core::error::{SiftError, SiftResult};
use sift_core::text::{truncate_to, word_count};
use sift_core::types::{
    DocumentMetadata, ExtractionMetadata, ExtractionMethod, ExtractionOptions, ExtractionResult,
};
use sift_core::Processor;

static LOWER_UPPER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\p{Ll})(\p{Lu})").expect("static regex"));
static SENTENCE_BOUNDARY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([.!?;:])(\p{L})").expect("static regex"));
static BEFORE_OPEN_BRACKET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([\p{L}\p{N}])([(\[])").expect("static regex"));
static AFTER_CLOSE_BRACKET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([)\]])([\p{L}\p{N}])").expect("static regex"));
static EXCESS_NEWLINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").expect("static regex"));
static TRAILING_SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]+\n").expect("static regex"));

/// PDF text-layer extractor.
///
/// Does not rasterize: a scanned PDF with no text layer yields little or no
/// text here, and routing it through an image/vision strategy is the
/// caller's decision. Confidence is 0.95 for generally reliable text-layer
/// extraction.
#[derive(Debug, Clone, Default)]
pub struct PdfProcessor;

impl PdfProcessor {
    pub fn new() -> Self {
        Self
    }

    /// Re-insert spaces lost at layout boundaries and tidy line structure.
    fn repair_layout(text: &str) -> String {
        let repaired = LOWER_UPPER.replace_all(text, "$1 $2");
        let repaired = SENTENCE_BOUNDARY.replace_all(&repaired, "$1 $2");
        let repaired = BEFORE_OPEN_BRACKET.replace_all(&repaired, "$1 $2");
        let repaired = AFTER_CLOSE_BRACKET.replace_all(&repaired, "$1 $2");
        let repaired = TRAILING_SPACES.replace_all(&repaired, "\n");
        let repaired = EXCESS_NEWLINES.replace_all(&repaired, "\n\n");
        repaired.trim().to_string()
    }

    /// Estimate the page count from page-object markers in the raw bytes.
    /// `/Type /Pages` (the tree node) must not count, hence the trailing
    /// byte check.
    fn estimate_page_count(content: &[u8]) -> Option<usize> {
        let mut count = 0;
        for pattern in [&b"/Type /Page"[..], &b"/Type/Page"[..]] {
            let mut offset = 0;
            while let Some(pos) = find(&content[offset..], pattern) {
                let end = offset + pos + pattern.len();
                if content.get(end) != Some(&b's') {
                    count += 1;
                }
                offset = end;
            }
        }
        (count > 0).then_some(count)
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

#[async_trait]
impl Processor for PdfProcessor {
    async fn extract(
        &self,
        content: &[u8],
        options: &ExtractionOptions,
    ) -> SiftResult<ExtractionResult> {
        let size = content.len();
        let pages = Self::estimate_page_count(content);

        let buffer = content.to_vec();
        let raw = tokio::task::spawn_blocking(move || {
            pdf_extract::extract_text_from_mem(&buffer)
                .map_err(|e| SiftError::Parse(format!("failed to extract PDF text: {}", e)))
        })
        .await??;

        let text = Self::repair_layout(&raw);
        if text.is_empty() {
            return Err(SiftError::Parse(
                "PDF contained no text layer (scanned document?)".to_string(),
            ));
        }

        // Truncation applies only via max_text_length, never page count.
        let (text, truncated) = truncate_to(text, options.max_text_length);

        let mut metadata = ExtractionMetadata {
            size,
            ..Default::default()
        };
        if options.extract_metadata {
            metadata.document = Some(DocumentMetadata {
                pages,
                words: Some(word_count(&text)),
                characters: Some(text.chars().count()),
                ..Default::default()
            });
        }

        let mut result =
            ExtractionResult::ok(text, metadata, ExtractionMethod::StructuredParse, 0.95);
        if truncated {
            result = result.with_warning(format!(
                "text truncated to {} characters",
                options.max_text_length
            ));
        }
        Ok(result)
    }

    fn supported_types(&self) -> &[&str] {
        &["application/pdf"]
    }

    fn name(&self) -> &str {
        "pdf"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repair_inserts_space_at_case_transition() {
        assert_eq!(
            PdfProcessor::repair_layout("endOfSentenceNext"),
            "end Of Sentence Next"
        );
    }

    #[test]
    fn test_repair_inserts_space_after_punctuation() {
        assert_eq!(
            PdfProcessor::repair_layout("First sentence.Second sentence"),
            "First sentence. Second sentence"
        );
    }

    #[test]
    fn test_repair_spaces_brackets() {
        assert_eq!(
            PdfProcessor::repair_layout("see(figure 1)for details"),
            "see (figure 1) for details"
        );
    }

    #[test]
    fn test_repair_preserves_paragraph_breaks() {
        let repaired = PdfProcessor::repair_layout("para one\n\n\n\n\npara two");
        assert_eq!(repaired, "para one\n\npara two");
    }

    #[test]
    fn test_page_count_estimate() {
        let pdf = b"%PDF-1.4\n1 0 obj << /Type /Pages /Kids [2 0 R] >>\n\
                    2 0 obj << /Type /Page /Parent 1 0 R >>\n\
                    3 0 obj << /Type/Page /Parent 1 0 R >>";
        assert_eq!(PdfProcessor::estimate_page_count(pdf), Some(2));
        assert_eq!(PdfProcessor::estimate_page_count(b"no pages here"), None);
    }

    #[tokio::test]
    async fn test_invalid_pdf_fails() {
        let processor = PdfProcessor::new();
        let err = processor
            .extract(b"%PDF-not really a pdf", &ExtractionOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SiftError::Parse(_)));
    }

    #[test]
    fn test_supported_types() {
        let processor = PdfProcessor::new();
        assert!(processor.can_process("application/pdf"));
        assert!(!processor.can_process("text/plain"));
        assert_eq!(processor.name(), "pdf");
    }
}
