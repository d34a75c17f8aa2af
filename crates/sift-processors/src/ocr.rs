//! Image OCR with a hard timeout and guaranteed worker teardown.
//!
//! The engine is a trait so tests can substitute a controllable double and
//! deployments can swap tesseract for another engine. Every extraction
//! races the engine against the per-call timeout; the worker guard is
//! released on all exit paths (success, failure, timeout), observable via
//! [`OcrProcessor::active_workers`].

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use sift_core::error::{SiftError, SiftResult};
use sift_core::types::{
    ExtractionMetadata, ExtractionMethod, ExtractionOptions, ExtractionResult, ImageMetadata,
};
use sift_core::{ErrorCode, Processor};

/// Confidence below which a warning is attached to the result.
const LOW_CONFIDENCE_THRESHOLD: f32 = 0.5;

/// Raw engine output.
#[derive(Debug, Clone)]
pub struct OcrOutput {
    pub text: String,
    /// Engine confidence normalized to [0, 1].
    pub confidence: f32,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// An OCR engine capable of recognizing text in raw image bytes.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Recognize text. Implementations decode the image themselves so the
    /// caller's timeout covers decoding too.
    async fn recognize(&self, image_bytes: Vec<u8>, language: &str) -> SiftResult<OcrOutput>;

    /// Engine identifier, used in result attribution.
    fn name(&self) -> &'static str;
}

/// Tesseract-backed engine via rusty-tesseract.
#[derive(Debug, Clone, Default)]
pub struct TesseractEngine;

impl TesseractEngine {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl OcrEngine for TesseractEngine {
    async fn recognize(&self, image_bytes: Vec<u8>, language: &str) -> SiftResult<OcrOutput> {
        let language = language.to_string();

        tokio::task::spawn_blocking(move || {
            let decoded = image::load_from_memory(&image_bytes)
                .map_err(|e| SiftError::Parse(format!("failed to decode image: {}", e)))?;

            // Tesseract works best on grayscale input.
            let luma = decoded.to_luma8();
            let (width, height) = luma.dimensions();
            let input = rusty_tesseract::Image::from_dynamic_image(
                &image::DynamicImage::ImageLuma8(luma),
            )
                .map_err(|e| SiftError::Internal(format!("failed to prepare OCR input: {}", e)))?;

            let args = rusty_tesseract::Args {
                lang: language,
                ..Default::default()
            };

            let text = rusty_tesseract::image_to_string(&input, &args)
                .map_err(|e| SiftError::Internal(format!("OCR engine failed: {}", e)))?;

            // Mean word confidence; tesseract reports -1 for non-word boxes.
            let confidence = rusty_tesseract::image_to_data(&input, &args)
                .ok()
                .map(|data| {
                    let scores: Vec<f32> = data
                        .data
                        .iter()
                        .map(|d| d.conf)
                        .filter(|c| *c >= 0.0)
                        .collect();
                    if scores.is_empty() {
                        0.0
                    } else {
                        (scores.iter().sum::<f32>() / scores.len() as f32) / 100.0
                    }
                })
                .unwrap_or(0.0);

            Ok(OcrOutput {
                text,
                confidence,
                width: Some(width),
                height: Some(height),
            })
        })
        .await?
    }

    fn name(&self) -> &'static str {
        "tesseract"
    }
}

/// Decrements the active-worker count when dropped, on every exit path.
struct WorkerGuard {
    counter: Arc<AtomicUsize>,
}

impl WorkerGuard {
    fn new(counter: Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self { counter }
    }
}

impl Drop for WorkerGuard {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}

/// OCR processor racing an engine against the per-call timeout.
pub struct OcrProcessor {
    engine: Arc<dyn OcrEngine>,
    active_workers: Arc<AtomicUsize>,
}

impl OcrProcessor {
    /// Processor backed by the tesseract engine.
    pub fn new() -> Self {
        Self::with_engine(Arc::new(TesseractEngine::new()))
    }

    /// Processor backed by a custom engine.
    pub fn with_engine(engine: Arc<dyn OcrEngine>) -> Self {
        Self {
            engine,
            active_workers: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of OCR workers currently held. Test hook for verifying
    /// teardown after timeouts.
    pub fn active_workers(&self) -> usize {
        self.active_workers.load(Ordering::SeqCst)
    }
}

impl Default for OcrProcessor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Processor for OcrProcessor {
    async fn extract(
        &self,
        content: &[u8],
        options: &ExtractionOptions,
    ) -> SiftResult<ExtractionResult> {
        let budget = options.effective_timeout();
        let guard = WorkerGuard::new(self.active_workers.clone());

        let outcome = tokio::time::timeout(
            budget,
            self.engine.recognize(content.to_vec(), &options.ocr_language),
        )
        .await;

        // Dropped before returning on every path below.
        drop(guard);

        let output = match outcome {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return Err(e),
            Err(_) => {
                tracing::warn!(
                    engine = self.engine.name(),
                    timeout_ms = budget.as_millis() as u64,
                    "OCR timed out"
                );
                return Err(SiftError::Timeout {
                    elapsed_ms: budget.as_millis() as u64,
                });
            }
        };

        if output.text.trim().is_empty() {
            return Err(SiftError::Parse(
                "OCR produced no text for this image".to_string(),
            ));
        }

        let mut metadata = ExtractionMetadata {
            size: content.len(),
            ..Default::default()
        };
        if options.extract_metadata {
            metadata.image = Some(ImageMetadata {
                width: output.width,
                height: output.height,
                format: None,
            });
        }

        let confidence = output.confidence.clamp(0.0, 1.0);
        let mut result =
            ExtractionResult::ok(output.text, metadata, ExtractionMethod::Ocr, confidence);
        if confidence < LOW_CONFIDENCE_THRESHOLD {
            // Warning-grade, not a hard error: the text is still returned.
            result = result.with_warning(format!(
                "{}: confidence {:.2} is below {}",
                ErrorCode::OcrLowConfidence,
                confidence,
                LOW_CONFIDENCE_THRESHOLD
            ));
        }
        Ok(result)
    }

    fn supported_types(&self) -> &[&str] {
        &[
            "image/png",
            "image/jpeg",
            "image/gif",
            "image/webp",
            "image/bmp",
            "image/tiff",
        ]
    }

    fn name(&self) -> &str {
        "ocr"
    }
}
