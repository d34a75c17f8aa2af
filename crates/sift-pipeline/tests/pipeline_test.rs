//! End-to-end behavior of the orchestrating adapter.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use sift_core::error::{SiftError, SiftResult};
use sift_core::types::{ExtractionMetadata, ExtractionMethod};
use sift_pipeline::{
    DocumentPipeline, ErrorCode, ExtractionOptions, ExtractionResult, PipelineConfig, Processor,
};

fn pipeline() -> DocumentPipeline {
    DocumentPipeline::new(PipelineConfig::default())
}

/// Processor that always fails; stands in for a format whose parser
/// rejects the content.
struct FailingProcessor;

#[async_trait]
impl Processor for FailingProcessor {
    async fn extract(
        &self,
        _content: &[u8],
        _options: &ExtractionOptions,
    ) -> SiftResult<ExtractionResult> {
        Err(SiftError::Parse("always fails".to_string()))
    }

    fn supported_types(&self) -> &[&str] {
        &["x/fail"]
    }

    fn name(&self) -> &str {
        "failing"
    }
}

/// Processor that accepts anything handed to it directly but claims a type
/// nothing declares, so it is only reachable through exhaustive fallback.
struct RescueProcessor;

#[async_trait]
impl Processor for RescueProcessor {
    async fn extract(
        &self,
        _content: &[u8],
        _options: &ExtractionOptions,
    ) -> SiftResult<ExtractionResult> {
        Ok(ExtractionResult::ok(
            "rescued content".to_string(),
            ExtractionMetadata::default(),
            ExtractionMethod::DirectText,
            1.0,
        ))
    }

    fn supported_types(&self) -> &[&str] {
        &["x/rescue"]
    }

    fn name(&self) -> &str {
        "rescue"
    }
}

struct PanickingProcessor;

#[async_trait]
impl Processor for PanickingProcessor {
    async fn extract(
        &self,
        _content: &[u8],
        _options: &ExtractionOptions,
    ) -> SiftResult<ExtractionResult> {
        panic!("processor bug");
    }

    fn supported_types(&self) -> &[&str] {
        &["x/panic"]
    }

    fn name(&self) -> &str {
        "panicking"
    }
}

/// Processor that hangs while holding a counted worker, releasing it on
/// drop. Used to observe teardown after a timeout.
struct HangingProcessor {
    active: Arc<AtomicUsize>,
}

struct HangingWorker(Arc<AtomicUsize>);

impl Drop for HangingWorker {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Processor for HangingProcessor {
    async fn extract(
        &self,
        _content: &[u8],
        _options: &ExtractionOptions,
    ) -> SiftResult<ExtractionResult> {
        self.active.fetch_add(1, Ordering::SeqCst);
        let _worker = HangingWorker(self.active.clone());
        tokio::time::sleep(Duration::from_secs(3600)).await;
        unreachable!("hanging processor never completes in tests")
    }

    fn supported_types(&self) -> &[&str] {
        &["x/hang"]
    }

    fn name(&self) -> &str {
        "hanging"
    }
}

// --- text family ---

#[tokio::test]
async fn text_family_is_deterministic_and_fully_confident() {
    let pipeline = pipeline();
    let cases: Vec<(&str, Vec<u8>)> = vec![
        ("text/plain", b"alpha beta gamma".to_vec()),
        (
            "text/markdown",
            b"# alpha\n\nbeta *gamma*\n\n- delta\n".to_vec(),
        ),
        (
            "text/html",
            b"<html><body><p>alpha</p><p>beta gamma</p></body></html>".to_vec(),
        ),
        (
            "application/json",
            br#"{"first": "alpha", "rest": ["beta", "gamma"]}"#.to_vec(),
        ),
        (
            "application/xml",
            b"<?xml version=\"1.0\"?><r><a>alpha</a><b>beta gamma</b></r>".to_vec(),
        ),
    ];

    for (mime, content) in cases {
        let result = pipeline.process(&content, mime, None).await;
        assert!(result.success, "{} should succeed", mime);
        assert_eq!(
            result.processing.confidence, 1.0,
            "{} should be fully confident",
            mime
        );
        for word in ["alpha", "beta", "gamma"] {
            assert!(
                result.text.contains(word),
                "{} output missing '{}': {:?}",
                mime,
                word,
                result.text
            );
        }
        assert_eq!(result.metadata.mime_type, mime);
        assert_eq!(result.metadata.processor_name.as_deref(), Some("text"));
    }
}

#[tokio::test]
async fn repeated_processing_is_idempotent() {
    let pipeline = pipeline();
    let content = b"# Title\n\nSame *input*, same output.";

    let first = pipeline.process(content, "text/markdown", None).await;
    let second = pipeline.process(content, "text/markdown", None).await;

    assert_eq!(first.text, second.text);
    // Everything but the measured duration is identical.
    assert_eq!(
        serde_json::to_value(&first.metadata).unwrap(),
        serde_json::to_value(&second.metadata).unwrap()
    );
    assert_eq!(first.processing.method, second.processing.method);
    assert_eq!(first.processing.confidence, second.processing.confidence);
    assert_eq!(first.processing.warnings, second.processing.warnings);
}

#[tokio::test]
async fn truncation_law() {
    let pipeline = pipeline();
    let long = "word ".repeat(1000);
    let options = ExtractionOptions::default().with_max_text_length(64);

    let result = pipeline
        .process(long.as_bytes(), "text/plain", Some(&options))
        .await;

    assert!(result.success);
    assert!(result.text.len() <= 64);
    assert!(result
        .processing
        .warnings
        .iter()
        .any(|w| w.contains("truncated")));
}

// --- admission control ---

#[tokio::test]
async fn empty_buffer_law() {
    let pipeline = pipeline();
    for mime in ["text/plain", "application/pdf", "x/whatever"] {
        let result = pipeline.process(b"", mime, None).await;
        assert!(!result.success);
        assert_eq!(result.error.as_ref().unwrap().code, ErrorCode::EmptyInput);

        let fallback = pipeline.process_with_fallback(b"", mime, None).await;
        assert_eq!(fallback.error.unwrap().code, ErrorCode::EmptyInput);
    }
}

#[tokio::test]
async fn oversized_buffer_is_rejected_before_work() {
    let pipeline = pipeline();
    let options = ExtractionOptions::default().with_max_file_size(8);
    let result = pipeline
        .process(b"way more than eight bytes", "text/plain", Some(&options))
        .await;
    assert!(!result.success);
    assert_eq!(result.error.unwrap().code, ErrorCode::FileTooLarge);
}

#[tokio::test]
async fn invalid_options_yield_typed_failure() {
    let pipeline = pipeline();
    let options = ExtractionOptions::default().with_max_text_length(0);
    let result = pipeline.process(b"text", "text/plain", Some(&options)).await;
    assert!(!result.success);
    assert_eq!(
        result.error.unwrap().code,
        ErrorCode::AdapterInternalError
    );
}

// --- fallback behavior ---

#[tokio::test]
async fn mislabeled_json_is_recovered() {
    let pipeline = pipeline();
    let json = br#"{"customer": "John", "notes": ["first", "second"]}"#;

    // Declared as plain text: the text processor's internal sniff handles it.
    let as_text = pipeline.process_with_fallback(json, "text/plain", None).await;
    assert!(as_text.success);
    assert!(as_text.text.contains("John"));

    // Declared as something no processor claims: content sniffing recovers.
    let as_binary = pipeline
        .process_with_fallback(json, "application/octet-stream", None)
        .await;
    assert!(as_binary.success);
    assert!(as_binary.text.contains("John"));
    assert!(as_binary
        .processing
        .warnings
        .iter()
        .any(|w| w.contains("re-detected")));
}

#[tokio::test]
async fn csv_scenario() {
    let pipeline = pipeline();
    let result = pipeline
        .process(b"Name,Age\nJohn,30\nJane,25", "text/csv", None)
        .await;

    assert!(result.success);
    assert!(result.text.contains("John"));
    assert!(result.text.contains("Jane"));
    assert_eq!(result.metadata.mime_type, "text/csv");
}

#[tokio::test]
async fn jpeg_header_without_ocr_fails_with_meaningful_code() {
    // No OCR/vision processor in the default registry.
    let pipeline = pipeline();
    let result = pipeline
        .process_with_fallback(&[0xFF, 0xD8, 0xFF], "unsupported/type", None)
        .await;

    assert!(!result.success);
    let code = result.error.unwrap().code;
    assert!(
        matches!(
            code,
            ErrorCode::UnsupportedType | ErrorCode::CorruptOrUnparseable
        ),
        "unexpected code {:?}",
        code
    );
}

#[tokio::test]
async fn exhaustive_fallback_tags_its_winner() {
    let config = PipelineConfig::default();
    let pipeline = DocumentPipeline::with_processors(
        config,
        vec![
            Arc::new(FailingProcessor),
            Arc::new(RescueProcessor),
        ],
    );

    // Binary-ish content that sniffs to nothing, declared with a type only
    // the failing processor claims.
    let noise: Vec<u8> = (0..64u8).map(|i| i.wrapping_mul(7) ^ 0x81).collect();
    let result = pipeline.process_with_fallback(&noise, "x/fail", None).await;

    assert!(result.success);
    assert_eq!(result.text, "rescued content");
    assert_eq!(result.metadata.processor_name.as_deref(), Some("rescue"));
    assert!(result
        .processing
        .warnings
        .iter()
        .any(|w| w.contains("used fallback processor")));
}

#[tokio::test]
async fn first_failure_is_returned_when_nothing_succeeds() {
    let pipeline = DocumentPipeline::with_processors(
        PipelineConfig::default(),
        vec![Arc::new(FailingProcessor)],
    );

    let noise: Vec<u8> = (0..64u8).map(|i| i.wrapping_mul(7) ^ 0x81).collect();
    let result = pipeline.process_with_fallback(&noise, "x/fail", None).await;

    assert!(!result.success);
    // The first failure (from the declared type) is preserved.
    assert_eq!(
        result.error.unwrap().code,
        ErrorCode::CorruptOrUnparseable
    );
    assert_eq!(result.metadata.processor_name.as_deref(), Some("failing"));
}

#[tokio::test]
async fn unsupported_type_without_fallback() {
    let pipeline = pipeline();
    let result = pipeline.process(b"data", "x/made-up", None).await;
    assert!(!result.success);
    assert_eq!(result.error.unwrap().code, ErrorCode::UnsupportedType);
}

// --- containment ---

#[tokio::test]
async fn panicking_processor_is_contained() {
    let pipeline = DocumentPipeline::with_processors(
        PipelineConfig::default(),
        vec![Arc::new(PanickingProcessor)],
    );

    let result = pipeline.process(b"data", "x/panic", None).await;
    assert!(!result.success);
    let error = result.error.unwrap();
    assert_eq!(error.code, ErrorCode::AdapterInternalError);
    assert!(error.message.contains("panicking"));
}

#[tokio::test(start_paused = true)]
async fn timeout_releases_worker_resources() {
    let active = Arc::new(AtomicUsize::new(0));
    let pipeline = DocumentPipeline::with_processors(
        PipelineConfig::default(),
        vec![Arc::new(HangingProcessor {
            active: active.clone(),
        })],
    );

    let options = ExtractionOptions::default().with_timeout_ms(1);
    let result = pipeline.process(b"img", "x/hang", Some(&options)).await;

    assert!(!result.success);
    assert_eq!(result.error.unwrap().code, ErrorCode::Timeout);
    // The worker guard was dropped when the invocation was abandoned.
    assert_eq!(active.load(Ordering::SeqCst), 0);
}

// --- introspection ---

#[tokio::test]
async fn stats_reflect_registry() {
    let pipeline = pipeline();
    let stats = pipeline.stats();

    assert_eq!(stats.per_processor.len(), stats.processor_count);
    assert!(stats
        .per_processor
        .iter()
        .any(|p| p.supported_types.contains(&"text/plain".to_string())));
    assert_eq!(
        stats.supported_type_count,
        pipeline.supported_types().len()
    );
    assert!(pipeline.is_supported("text/plain"));
}

#[tokio::test]
async fn registry_order_breaks_ties() {
    // Two processors claim the same type; the first registered wins.
    struct Claimer(&'static str);

    #[async_trait]
    impl Processor for Claimer {
        async fn extract(
            &self,
            _content: &[u8],
            _options: &ExtractionOptions,
        ) -> SiftResult<ExtractionResult> {
            Ok(ExtractionResult::ok(
                self.0.to_string(),
                ExtractionMetadata::default(),
                ExtractionMethod::DirectText,
                1.0,
            ))
        }

        fn supported_types(&self) -> &[&str] {
            &["x/shared"]
        }

        fn name(&self) -> &str {
            self.0
        }
    }

    let pipeline = DocumentPipeline::with_processors(
        PipelineConfig::default(),
        vec![Arc::new(Claimer("first")), Arc::new(Claimer("second"))],
    );

    let result = pipeline.process(b"data", "x/shared", None).await;
    assert_eq!(result.text, "first");
    assert_eq!(result.metadata.processor_name.as_deref(), Some("first"));
}
