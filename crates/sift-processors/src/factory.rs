//! Factory for assembling the processor registry.

use std::sync::Arc;

use sift_core::Processor;

use crate::media::MediaProcessor;
use crate::text::TextProcessor;

#[cfg(feature = "pdf")]
use crate::pdf::PdfProcessor;

#[cfg(feature = "office")]
use crate::office::OfficeProcessor;

#[cfg(feature = "archive")]
use crate::archive::ArchiveProcessor;

#[cfg(feature = "ocr")]
use crate::ocr::{OcrEngine, OcrProcessor};

#[cfg(feature = "vision")]
use crate::vision::{VisionConfig, VisionProcessor};

/// Factory for creating format processors.
pub struct ProcessorFactory;

impl ProcessorFactory {
    /// Create a text/markup processor.
    pub fn text() -> Arc<dyn Processor> {
        Arc::new(TextProcessor::new())
    }

    /// Create an office-document processor.
    #[cfg(feature = "office")]
    pub fn office() -> Arc<dyn Processor> {
        Arc::new(OfficeProcessor::new())
    }

    /// Create a PDF processor.
    #[cfg(feature = "pdf")]
    pub fn pdf() -> Arc<dyn Processor> {
        Arc::new(PdfProcessor::new())
    }

    /// Create an OCR processor backed by tesseract.
    #[cfg(feature = "ocr")]
    pub fn ocr() -> Arc<dyn Processor> {
        Arc::new(OcrProcessor::new())
    }

    /// Create an OCR processor with a custom engine.
    #[cfg(feature = "ocr")]
    pub fn ocr_with_engine(engine: Arc<dyn OcrEngine>) -> Arc<dyn Processor> {
        Arc::new(OcrProcessor::with_engine(engine))
    }

    /// Create a vision-LLM processor.
    #[cfg(feature = "vision")]
    pub fn vision() -> Arc<dyn Processor> {
        Arc::new(VisionProcessor::new())
    }

    /// Create a vision-LLM processor with custom configuration.
    #[cfg(feature = "vision")]
    pub fn vision_with_config(config: VisionConfig) -> Arc<dyn Processor> {
        Arc::new(VisionProcessor::with_config(config))
    }

    /// Create an archive processor.
    #[cfg(feature = "archive")]
    pub fn archive() -> Arc<dyn Processor> {
        Arc::new(ArchiveProcessor::new())
    }

    /// Create a media metadata processor.
    pub fn media() -> Arc<dyn Processor> {
        Arc::new(MediaProcessor::new())
    }

    /// All available processors in registry order.
    ///
    /// Order is significant: it is the tie-break during exhaustive
    /// fallback. Text-family processors come first because mislabeled
    /// plain/structured text is the most common false-negative case;
    /// archive and media close the list. Vision precedes OCR so the
    /// traditional engine is the fallback for images.
    #[allow(clippy::vec_init_then_push)]
    pub fn all() -> Vec<Arc<dyn Processor>> {
        let mut processors: Vec<Arc<dyn Processor>> = Vec::new();

        processors.push(Self::text());

        #[cfg(feature = "office")]
        processors.push(Self::office());

        #[cfg(feature = "pdf")]
        processors.push(Self::pdf());

        #[cfg(feature = "vision")]
        processors.push(Self::vision());

        #[cfg(feature = "ocr")]
        processors.push(Self::ocr());

        #[cfg(feature = "archive")]
        processors.push(Self::archive());

        processors.push(Self::media());

        processors
    }
}
