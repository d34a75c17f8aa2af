//! The orchestrating adapter.
//!
//! Given `(bytes, declared MIME type, options)`, produces exactly one
//! `ExtractionResult`, trying strategies in priority order: the external
//! understanding service, the first matching local processor, a
//! content-sniffed retry, and finally the exhaustive fallback loop. Every
//! failure path terminates in a typed `success: false` result - nothing
//! escapes this boundary as an error or a panic.

use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;
use serde::Serialize;

use sift_core::types::{ExtractionOptions, ExtractionResult};
use sift_core::{detect_type, ErrorCode, PipelineConfig, Processor};
use sift_docling::DoclingClient;
use sift_processors::ProcessorFactory;

/// Orchestrator for one extraction request at a time, safe to share across
/// concurrent requests.
///
/// The processor registry is fixed at construction; its order is the
/// tie-break during exhaustive fallback.
pub struct DocumentPipeline {
    processors: Vec<Arc<dyn Processor>>,
    docling: Option<DoclingClient>,
    defaults: ExtractionOptions,
}

/// Introspection snapshot for callers deciding whether to attempt an
/// upload at all.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineStats {
    pub processor_count: usize,
    pub supported_type_count: usize,
    pub per_processor: Vec<ProcessorStats>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessorStats {
    pub name: String,
    pub supported_types: Vec<String>,
}

impl DocumentPipeline {
    /// Pipeline with the default processor registry and, when configured,
    /// the external understanding service.
    pub fn new(config: PipelineConfig) -> Self {
        let docling = config.docling.map(DoclingClient::new);
        Self {
            processors: ProcessorFactory::all(),
            docling,
            defaults: config.options,
        }
    }

    /// Pipeline over a custom ordered registry.
    pub fn with_processors(config: PipelineConfig, processors: Vec<Arc<dyn Processor>>) -> Self {
        let docling = config.docling.map(DoclingClient::new);
        Self {
            processors,
            docling,
            defaults: config.options,
        }
    }

    /// Append a processor to the registry (last in fallback order).
    pub fn add_processor(mut self, processor: Arc<dyn Processor>) -> Self {
        self.processors.push(processor);
        self
    }

    /// Process a buffer under its declared MIME type.
    ///
    /// Strategy order: external understanding service (if configured,
    /// healthy, and supporting the type), then the first registered
    /// processor claiming the type. The external service's failure is
    /// recorded as a warning, never surfaced as the final error unless
    /// everything else fails too.
    pub async fn process(
        &self,
        content: &[u8],
        mime_type: &str,
        options: Option<&ExtractionOptions>,
    ) -> ExtractionResult {
        let started = Instant::now();
        let options = options.unwrap_or(&self.defaults);

        if let Err(e) = options.validate() {
            return self.finalize(
                ExtractionResult::failure(ErrorCode::AdapterInternalError, e.to_string()),
                content,
                mime_type,
                started,
            );
        }

        if content.is_empty() {
            return self.finalize(
                ExtractionResult::failure(ErrorCode::EmptyInput, "input buffer is empty"),
                content,
                mime_type,
                started,
            );
        }

        if content.len() > options.max_file_size_bytes {
            return self.finalize(
                ExtractionResult::failure(
                    ErrorCode::FileTooLarge,
                    format!(
                        "input is {} bytes, limit is {}",
                        content.len(),
                        options.max_file_size_bytes
                    ),
                ),
                content,
                mime_type,
                started,
            );
        }

        let mut external_warning: Option<String> = None;
        if let Some(docling) = &self.docling {
            if docling.supports(mime_type) && docling.is_available().await {
                let result = docling.process(content, mime_type, None, options).await;
                if result.has_text() {
                    let result = result.with_processor_name("docling");
                    return self.finalize(result, content, mime_type, started);
                }
                let detail = result
                    .error
                    .map(|e| e.message)
                    .unwrap_or_else(|| "empty response".to_string());
                tracing::debug!(detail = %detail, "external understanding failed, falling back");
                external_warning =
                    Some(format!("external understanding service failed: {}", detail));
            }
        }

        let Some(processor) = self.processors.iter().find(|p| p.can_process(mime_type)) else {
            let mut failure = ExtractionResult::failure(
                ErrorCode::UnsupportedType,
                format!("no processor registered for '{}'", mime_type),
            );
            if let Some(warning) = external_warning {
                failure = failure.with_warning(warning);
            }
            return self.finalize(failure, content, mime_type, started);
        };

        let mut result = self.run_processor(processor, content, options).await;
        if let Some(warning) = external_warning {
            result = result.with_warning(warning);
        }
        self.finalize(result, content, mime_type, started)
    }

    /// Process with recovery for unreliable declared types (e.g.
    /// browser-supplied uploads).
    ///
    /// After a failed `process`, the true type is re-detected from content
    /// magic numbers and retried; if that still fails, every remaining
    /// registered processor is tried in order. When nothing succeeds, the
    /// *first* failure is returned so the caller sees the most meaningful
    /// error for the originally declared type.
    ///
    /// When re-detection yields the already-tried declared type, the
    /// exhaustive loop still runs over all processors. That is intentional
    /// degradation - a safety net at some latency cost on adversarial
    /// inputs - rather than an oversight.
    pub async fn process_with_fallback(
        &self,
        content: &[u8],
        mime_type: &str,
        options: Option<&ExtractionOptions>,
    ) -> ExtractionResult {
        let started = Instant::now();
        let options_ref = options.unwrap_or(&self.defaults);

        let first = self.process(content, mime_type, options).await;
        if first.success {
            return first;
        }
        // Nothing can rescue an empty or oversized buffer.
        if let Some(error) = &first.error {
            if matches!(error.code, ErrorCode::EmptyInput | ErrorCode::FileTooLarge) {
                return first;
            }
        }

        let mut tried: Vec<&str> = self
            .processors
            .iter()
            .filter(|p| p.can_process(mime_type))
            .take(1)
            .map(|p| p.name())
            .collect();

        let detected = detect_type(&content[..content.len().min(1024)]);
        if let Some(detected_mime) = detected {
            if detected_mime != mime_type {
                tracing::debug!(declared = mime_type, detected = detected_mime, "re-detected type");
                let retry = self.process(content, detected_mime, options).await;
                if retry.success {
                    return retry
                        .with_warning(format!("mime type re-detected as '{}'", detected_mime));
                }
                if let Some(processor) =
                    self.processors.iter().find(|p| p.can_process(detected_mime))
                {
                    tried.push(processor.name());
                }
            }
        }

        for processor in &self.processors {
            if tried.contains(&processor.name()) {
                continue;
            }
            let result = self.run_processor(processor, content, options_ref).await;
            if result.has_text() {
                let result = result
                    .with_warning("used fallback processor")
                    .with_duration_ms(started.elapsed().as_millis() as u64);
                return self.stamp(result, content, detected.unwrap_or(mime_type));
            }
        }

        first
    }

    /// Run one processor with full containment: an `Err` becomes a typed
    /// failure and a panic becomes `ADAPTER_INTERNAL_ERROR`, so one
    /// misbehaving processor cannot take down the pipeline. The per-call
    /// timeout bounds the whole invocation.
    async fn run_processor(
        &self,
        processor: &Arc<dyn Processor>,
        content: &[u8],
        options: &ExtractionOptions,
    ) -> ExtractionResult {
        let budget = options.effective_timeout();
        let invocation =
            std::panic::AssertUnwindSafe(processor.extract(content, options)).catch_unwind();

        let result = match tokio::time::timeout(budget, invocation).await {
            Ok(Ok(Ok(result))) => result,
            Ok(Ok(Err(e))) => {
                tracing::debug!(processor = processor.name(), error = %e, "processor failed");
                ExtractionResult::failure(e.code(), e.to_string())
            }
            Ok(Err(_panic)) => {
                tracing::warn!(processor = processor.name(), "processor panicked");
                ExtractionResult::failure(
                    ErrorCode::AdapterInternalError,
                    format!("processor '{}' panicked", processor.name()),
                )
            }
            Err(_) => ExtractionResult::failure(
                ErrorCode::Timeout,
                format!(
                    "processor '{}' exceeded {}ms budget",
                    processor.name(),
                    budget.as_millis()
                ),
            ),
        };

        result.with_processor_name(processor.name())
    }

    /// Stamp common metadata and the end-to-end duration on a result.
    fn finalize(
        &self,
        result: ExtractionResult,
        content: &[u8],
        mime_type: &str,
        started: Instant,
    ) -> ExtractionResult {
        let result = result.with_duration_ms(started.elapsed().as_millis() as u64);
        self.stamp(result, content, mime_type)
    }

    fn stamp(&self, mut result: ExtractionResult, content: &[u8], mime_type: &str) -> ExtractionResult {
        result.metadata.size = content.len();
        if result.metadata.mime_type.is_empty() {
            result.metadata.mime_type = mime_type.to_string();
        }
        result
    }

    /// All MIME types the registry can handle, in registry order, deduped.
    pub fn supported_types(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for processor in &self.processors {
            for mime in processor.supported_types().iter().copied() {
                if !seen.contains(&mime) {
                    seen.push(mime);
                }
            }
        }
        seen
    }

    /// Whether any registered processor handles this MIME type.
    pub fn is_supported(&self, mime_type: &str) -> bool {
        self.processors.iter().any(|p| p.can_process(mime_type))
    }

    /// Registry snapshot for caller-side introspection.
    pub fn stats(&self) -> PipelineStats {
        PipelineStats {
            processor_count: self.processors.len(),
            supported_type_count: self.supported_types().len(),
            per_processor: self
                .processors
                .iter()
                .map(|p| ProcessorStats {
                    name: p.name().to_string(),
                    supported_types: p
                        .supported_types()
                        .iter()
                        .map(|s| s.to_string())
                        .collect(),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry_order() {
        let pipeline = DocumentPipeline::new(PipelineConfig::default());
        let stats = pipeline.stats();
        assert!(stats.processor_count >= 2);
        assert_eq!(stats.per_processor.first().unwrap().name, "text");
        assert_eq!(stats.per_processor.last().unwrap().name, "media");
        assert!(stats.supported_type_count > 0);
    }

    #[test]
    fn test_is_supported() {
        let pipeline = DocumentPipeline::new(PipelineConfig::default());
        assert!(pipeline.is_supported("text/plain"));
        assert!(!pipeline.is_supported("application/x-nonexistent"));
    }

    #[test]
    fn test_supported_types_deduped() {
        let pipeline = DocumentPipeline::new(PipelineConfig::default());
        let types = pipeline.supported_types();
        let mut deduped = types.clone();
        deduped.dedup();
        assert_eq!(types.len(), deduped.len());
    }
}
