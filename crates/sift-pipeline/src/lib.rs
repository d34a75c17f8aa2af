//! sift-pipeline - Orchestrating adapter for the sift extraction pipeline.
//!
//! Binds the format processors and the optional docling understanding
//! service into one entry point. Callers hand it bytes, a declared MIME
//! type, and options; they always get exactly one `ExtractionResult` back,
//! never an error or a panic.
//!
//! # Example
//!
//! ```ignore
//! use sift_pipeline::DocumentPipeline;
//! use sift_core::PipelineConfig;
//!
//! let pipeline = DocumentPipeline::new(PipelineConfig::from_env());
//! let result = pipeline
//!     .process_with_fallback(&bytes, "application/pdf", None)
//!     .await;
//! if result.success {
//!     println!("{}", result.text);
//! }
//! ```

mod pipeline;

pub use pipeline::{DocumentPipeline, PipelineStats, ProcessorStats};

// Re-export the core vocabulary so most callers only need this crate.
pub use sift_core::{
    DoclingConfig, ErrorCode, ExtractionMethod, ExtractionOptions, ExtractionResult,
    PipelineConfig, Processor,
};
