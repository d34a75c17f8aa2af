//! Plain-text and markup extraction.
//!
//! Covers plain text, HTML, markdown, JSON, and XML. The declared MIME type
//! only routes the buffer to this processor; the concrete handler is picked
//! by a second, text-specific content sniff (markdown signals in a
//! `text/plain` upload, JSON in a `.txt`, and so on), since text types are
//! the most commonly mislabeled.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use pulldown_cmark::{html, Parser};
use regex::Regex;

use sift_core::error::{SiftError, SiftResult};
use sift_core::text::{
    collect_json_strings, html_head, non_printable_ratio, normalize_whitespace, strip_html,
    truncate_to, word_count,
};
use sift_core::types::{
    DocumentMetadata, ExtractionMetadata, ExtractionMethod, ExtractionOptions, ExtractionResult,
};
use sift_core::Processor;

static MARKDOWN_SIGNALS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?m)^#{1,6} \S",          // ATX headers
        r"(?m)^```",                // fenced code
        r"\[[^\]]+\]\([^)]+\)",     // links
        r"(?m)^[-*+] \S",           // unordered lists
        r"(?m)^\d+\. \S",           // ordered lists
        r"(?m)^\|.+\|\s*$",         // tables
        r"(?m)^> \S",               // block quotes
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static regex"))
    .collect()
});

/// Which handler a text-family buffer is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextKind {
    Plain,
    Html,
    Markdown,
    Json,
    Xml,
}

/// Processor for the text family: plain, HTML, markdown, JSON, XML.
///
/// All handling is deterministic, so confidence is 1.0 on success.
#[derive(Debug, Clone, Default)]
pub struct TextProcessor;

impl TextProcessor {
    pub fn new() -> Self {
        Self
    }

    /// Second-stage sniff within the text family. Dispatch is content-based
    /// regardless of which text MIME type routed the buffer here, since
    /// text types are the most commonly mislabeled.
    fn sniff(content: &str) -> TextKind {
        let trimmed = content.trim_start();
        if (trimmed.starts_with('{') || trimmed.starts_with('['))
            && serde_json::from_str::<serde_json::Value>(content).is_ok()
        {
            return TextKind::Json;
        }
        if trimmed.starts_with('<') {
            let lower: String = trimmed.chars().take(64).collect::<String>().to_lowercase();
            if lower.starts_with("<html") || lower.starts_with("<!doctype html") {
                return TextKind::Html;
            }
            if lower.starts_with("<?xml") {
                return TextKind::Xml;
            }
        }
        if MARKDOWN_SIGNALS.iter().any(|re| re.is_match(content)) {
            return TextKind::Markdown;
        }
        TextKind::Plain
    }

    fn extract_html(content: &str) -> (String, DocumentMetadata) {
        let head = html_head(content);
        let text = strip_html(content);
        let document = DocumentMetadata {
            title: head.title,
            author: head.author,
            ..Default::default()
        };
        (text, document)
    }

    /// Markdown is rendered to HTML and stripped through the same path as
    /// native HTML, which keeps whitespace handling consistent between the
    /// two.
    fn extract_markdown(content: &str) -> String {
        let parser = Parser::new(content);
        let mut rendered = String::with_capacity(content.len() * 2);
        html::push_html(&mut rendered, parser);
        strip_html(&rendered)
    }

    fn extract_json(content: &str) -> Option<String> {
        let value: serde_json::Value = serde_json::from_str(content).ok()?;
        let mut strings = Vec::new();
        collect_json_strings(&value, &mut strings);
        Some(strings.join(" "))
    }
}

#[async_trait]
impl Processor for TextProcessor {
    async fn extract(
        &self,
        content: &[u8],
        options: &ExtractionOptions,
    ) -> SiftResult<ExtractionResult> {
        let raw = std::str::from_utf8(content)
            .map_err(|e| SiftError::Parse(format!("content is not valid UTF-8: {}", e)))?;

        if non_printable_ratio(raw) >= 0.10 {
            return Err(SiftError::Parse(
                "content does not look like text (too many control characters)".to_string(),
            ));
        }

        let kind = Self::sniff(raw);
        let mut warnings: Vec<String> = Vec::new();
        let mut document = DocumentMetadata::default();

        let (text, method) = match kind {
            TextKind::Plain => (raw.to_string(), ExtractionMethod::DirectText),
            TextKind::Markdown => (
                Self::extract_markdown(raw),
                ExtractionMethod::FormatConverter,
            ),
            TextKind::Html => {
                let (text, doc) = Self::extract_html(raw);
                document = doc;
                (text, ExtractionMethod::StructuredParse)
            }
            TextKind::Xml => (strip_html(raw), ExtractionMethod::StructuredParse),
            TextKind::Json => match Self::extract_json(raw) {
                Some(text) => (text, ExtractionMethod::StructuredParse),
                None => {
                    warnings
                        .push("declared JSON did not parse; decoded as plain text".to_string());
                    (raw.to_string(), ExtractionMethod::DirectText)
                }
            },
        };

        let text = if options.preserve_formatting {
            text
        } else {
            normalize_whitespace(&text)
        };

        let (text, truncated) = truncate_to(text, options.max_text_length);
        if truncated {
            warnings.push(format!(
                "text truncated to {} characters",
                options.max_text_length
            ));
        }

        let mut metadata = ExtractionMetadata {
            size: content.len(),
            ..Default::default()
        };
        if options.extract_metadata {
            document.words = Some(word_count(&text));
            document.characters = Some(text.chars().count());
            metadata.document = Some(document);
        }

        let mut result = ExtractionResult::ok(text, metadata, method, 1.0);
        for warning in warnings {
            result = result.with_warning(warning);
        }
        Ok(result)
    }

    fn supported_types(&self) -> &[&str] {
        &[
            "text/plain",
            "text/html",
            "text/markdown",
            "application/json",
            "application/xml",
            "text/xml",
        ]
    }

    fn name(&self) -> &str {
        "text"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> ExtractionOptions {
        ExtractionOptions::default()
    }

    #[tokio::test]
    async fn test_plain_text() {
        let processor = TextProcessor::new();
        let result = processor
            .extract(b"Hello   world.\nSecond line.", &options())
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.text, "Hello world.\nSecond line.");
        assert_eq!(result.processing.confidence, 1.0);
        assert_eq!(result.processing.method, ExtractionMethod::DirectText);
        let document = result.metadata.document.unwrap();
        assert_eq!(document.words, Some(4));
    }

    #[tokio::test]
    async fn test_html_extraction() {
        let processor = TextProcessor::new();
        let html = "<html><head><title>Page</title>\
                    <script>var x = 1;</script></head>\
                    <body><h1>Heading</h1><p>Body text</p></body></html>";
        let result = processor.extract(html.as_bytes(), &options()).await.unwrap();
        assert!(result.text.contains("Heading"));
        assert!(result.text.contains("Body text"));
        assert!(!result.text.contains("var x"));
        assert_eq!(
            result.metadata.document.unwrap().title.as_deref(),
            Some("Page")
        );
        assert_eq!(result.processing.method, ExtractionMethod::StructuredParse);
    }

    #[tokio::test]
    async fn test_markdown_detected_and_rendered() {
        let processor = TextProcessor::new();
        let md = "# Title\n\nSome *emphasis* and a [link](https://example.com).\n\n- item one\n- item two\n";
        let result = processor.extract(md.as_bytes(), &options()).await.unwrap();
        assert!(result.success);
        assert!(result.text.contains("Title"));
        assert!(result.text.contains("emphasis"));
        assert!(result.text.contains("item one"));
        assert!(!result.text.contains('#'));
        assert!(!result.text.contains('*'));
        assert_eq!(result.processing.method, ExtractionMethod::FormatConverter);
    }

    #[tokio::test]
    async fn test_json_string_leaves() {
        let processor = TextProcessor::new();
        let json = br#"{"name": "John", "age": 30, "city": "Oslo", "tags": ["a", "b"]}"#;
        let result = processor.extract(json, &options()).await.unwrap();
        assert!(result.text.contains("John"));
        assert!(result.text.contains("Oslo"));
        // Numbers and keys are intentionally dropped.
        assert!(!result.text.contains("30"));
        assert!(!result.text.contains("age"));
        assert_eq!(result.processing.method, ExtractionMethod::StructuredParse);
    }

    #[tokio::test]
    async fn test_xml_tags_stripped() {
        let processor = TextProcessor::new();
        let xml = b"<?xml version=\"1.0\"?><note><to>Tove</to><body>Remember me</body></note>";
        let result = processor.extract(xml, &options()).await.unwrap();
        assert!(result.text.contains("Tove"));
        assert!(result.text.contains("Remember me"));
        assert!(!result.text.contains("<note>"));
    }

    #[tokio::test]
    async fn test_preserve_formatting() {
        let processor = TextProcessor::new();
        let opts = options().with_preserved_formatting(true);
        let result = processor.extract(b"a   b", &opts).await.unwrap();
        assert_eq!(result.text, "a   b");
    }

    #[tokio::test]
    async fn test_truncation_warning() {
        let processor = TextProcessor::new();
        let opts = options().with_max_text_length(5);
        let result = processor
            .extract(b"a long line of text", &opts)
            .await
            .unwrap();
        assert!(result.text.len() <= 5);
        assert!(result
            .processing
            .warnings
            .iter()
            .any(|w| w.contains("truncated")));
    }

    #[tokio::test]
    async fn test_binary_rejected() {
        let processor = TextProcessor::new();
        let err = processor
            .extract(&[0xFF, 0xD8, 0xFF], &options())
            .await
            .unwrap_err();
        assert!(matches!(err, SiftError::Parse(_)));
    }

    #[tokio::test]
    async fn test_idempotent() {
        let processor = TextProcessor::new();
        let input = b"# Doc\n\nrepeatable *content*";
        let first = processor.extract(input, &options()).await.unwrap();
        let second = processor.extract(input, &options()).await.unwrap();
        assert_eq!(first.text, second.text);
    }

    #[test]
    fn test_supported_types() {
        let processor = TextProcessor::new();
        assert!(processor.can_process("text/plain"));
        assert!(processor.can_process("application/json"));
        assert!(!processor.can_process("application/pdf"));
        assert_eq!(processor.name(), "text");
    }
}
