//! sift-processors - Format processors for the sift extraction pipeline.
//!
//! Each processor implements the [`sift_core::Processor`] trait for one
//! format family and is registered with the orchestrating pipeline in a
//! fixed order (text-family first, so mislabeled plain text is recovered
//! cheaply during exhaustive fallback).
//!
//! # Features
//!
//! - `pdf` (default) - PDF text extraction via pdf-extract
//! - `office` (default) - Word/Excel/CSV via docx-rs and calamine
//! - `archive` (default) - ZIP containers via zip
//! - `ocr` - image OCR via tesseract (requires tesseract installed)
//! - `vision` - image transcription via a vision LLM
//! - `full` - everything
//!
//! # Example
//!
//! ```ignore
//! use sift_processors::ProcessorFactory;
//! use sift_core::ExtractionOptions;
//!
//! let processors = ProcessorFactory::all();
//! let text = &processors[0];
//! let result = text.extract(b"hello", &ExtractionOptions::default()).await?;
//! ```

mod factory;
mod media;
mod text;

#[cfg(feature = "pdf")]
mod pdf;

#[cfg(feature = "office")]
mod office;

#[cfg(feature = "archive")]
mod archive;

#[cfg(feature = "ocr")]
pub mod ocr;

#[cfg(feature = "vision")]
pub mod vision;

pub use factory::ProcessorFactory;
pub use media::MediaProcessor;
pub use text::TextProcessor;

#[cfg(feature = "pdf")]
pub use pdf::PdfProcessor;

#[cfg(feature = "office")]
pub use office::OfficeProcessor;

#[cfg(feature = "archive")]
pub use archive::ArchiveProcessor;

#[cfg(feature = "ocr")]
pub use ocr::{OcrEngine, OcrOutput, OcrProcessor, TesseractEngine};

#[cfg(feature = "vision")]
pub use vision::{VisionConfig, VisionProcessor};
