//! sift-core - Contracts and shared types for the sift extraction pipeline.
//!
//! This crate defines the `Processor` capability trait, the options/result
//! value objects, the error taxonomy, pipeline configuration, and the
//! MIME-sniffing and text-cleanup utilities the processors share.
//!
//! # Example
//!
//! ```ignore
//! use sift_core::{detect_type, ExtractionOptions, ExtractionResult};
//!
//! let mime = detect_type(b"%PDF-1.7 ...");
//! assert_eq!(mime, Some("application/pdf"));
//!
//! let options = ExtractionOptions::new().with_max_text_length(10_000);
//! ```

pub mod config;
pub mod error;
pub mod mime;
pub mod text;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use config::{DoclingConfig, PipelineConfig};
pub use error::{ErrorCode, SiftError, SiftResult};
pub use mime::detect_type;
pub use traits::Processor;
pub use types::{
    AudioMetadata, DocumentMetadata, ExtractionError, ExtractionMetadata, ExtractionMethod,
    ExtractionOptions, ExtractionResult, ImageMetadata, ProcessingInfo, VideoMetadata,
};
