//! The processor capability trait.

use async_trait::async_trait;

use crate::error::SiftResult;
use crate::types::{ExtractionOptions, ExtractionResult};

/// A self-contained strategy for extracting text and metadata from one or
/// more MIME types.
///
/// Processors are stateless per call: they may own transient per-call
/// resources (an OCR worker, a decoder) but must not leak state across
/// calls. They are constructed once at startup and shared behind
/// `Arc<dyn Processor>`.
///
/// An `Err` return means the processor itself broke; a well-formed
/// `Ok(ExtractionResult { success: false, .. })` means the content could
/// not be handled. The orchestrator treats both as recoverable and falls
/// back to other strategies.
#[async_trait]
pub trait Processor: Send + Sync {
    /// Extract text and metadata from raw bytes.
    async fn extract(
        &self,
        content: &[u8],
        options: &ExtractionOptions,
    ) -> SiftResult<ExtractionResult>;

    /// MIME types this processor handles.
    fn supported_types(&self) -> &[&str];

    /// Whether this processor handles the given MIME type.
    fn can_process(&self, mime_type: &str) -> bool {
        self.supported_types().contains(&mime_type)
    }

    /// Human-readable name, attached to results for attribution.
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ExtractionMetadata, ExtractionMethod};

    struct EchoProcessor;

    #[async_trait]
    impl Processor for EchoProcessor {
        async fn extract(
            &self,
            content: &[u8],
            _options: &ExtractionOptions,
        ) -> SiftResult<ExtractionResult> {
            Ok(ExtractionResult::ok(
                String::from_utf8_lossy(content).into_owned(),
                ExtractionMetadata::default(),
                ExtractionMethod::DirectText,
                1.0,
            ))
        }

        fn supported_types(&self) -> &[&str] {
            &["text/plain"]
        }

        fn name(&self) -> &str {
            "echo"
        }
    }

    #[tokio::test]
    async fn test_default_can_process() {
        let processor = EchoProcessor;
        assert!(processor.can_process("text/plain"));
        assert!(!processor.can_process("application/pdf"));

        let result = processor
            .extract(b"hi", &ExtractionOptions::default())
            .await
            .unwrap();
        assert_eq!(result.text, "hi");
    }
}
