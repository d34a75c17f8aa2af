//! Extraction result value objects.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::ErrorCode;
use crate::types::method::ExtractionMethod;

/// Uniform result returned by every processor and by the pipeline.
///
/// Invariant: exactly one of (`success == true` with confidence in [0,1])
/// or (`success == false` with `error` populated). Use [`ExtractionResult::ok`]
/// and [`ExtractionResult::failure`] to stay on the right side of it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// Whether extraction produced usable text (or a deliberate
    /// metadata-only description).
    pub success: bool,
    /// Extracted text. Empty on failure.
    pub text: String,
    /// File-level and format-family metadata.
    pub metadata: ExtractionMetadata,
    /// How the extraction went: method, confidence, timing, warnings.
    pub processing: ProcessingInfo,
    /// Present iff `success == false`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ExtractionError>,
}

/// Typed failure attached to an unsuccessful result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionError {
    /// Taxonomy code for programmatic handling.
    pub code: ErrorCode,
    /// Human-readable detail.
    pub message: String,
}

/// File-level metadata plus optional format-family sub-objects.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionMetadata {
    /// Input size in bytes.
    pub size: usize,
    /// MIME type the extraction ran under.
    pub mime_type: String,
    /// Original filename, when the caller supplied one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    /// Name of the processor that produced (or failed to produce) the result.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processor_name: Option<String>,
    /// Document-family metadata (PDF, Office, text).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<DocumentMetadata>,
    /// Image-family metadata.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageMetadata>,
    /// Video-family metadata.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video: Option<VideoMetadata>,
    /// Audio-family metadata.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio: Option<AudioMetadata>,
    /// Additional processor-specific metadata (classification output,
    /// section/table counts from the external service, ...).
    #[serde(skip_serializing_if = "HashMap::is_empty", default)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// Metadata for document-family formats.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Page count, sheet count, or archive entry count depending on family.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pages: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub words: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub characters: Option<usize>,
}

/// Metadata for raster images.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

/// Metadata parsed from video container headers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub codec: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

/// Metadata parsed from audio container headers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AudioMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<f64>,
    /// Bitrate in kbps.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bitrate: Option<u32>,
    /// Sample rate in Hz.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_rate: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channels: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub codec: Option<String>,
}

/// Processing outcome details attached to every result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingInfo {
    /// End-to-end duration in milliseconds, set by the orchestrator.
    pub duration_ms: u64,
    /// How the text was produced.
    pub method: ExtractionMethod,
    /// Self-reported reliability in [0, 1]. Zero on failure.
    pub confidence: f32,
    /// Non-fatal notes accumulated along the way.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub warnings: Vec<String>,
}

impl ExtractionResult {
    /// Build a successful result. Confidence is clamped into [0, 1].
    pub fn ok(
        text: String,
        metadata: ExtractionMetadata,
        method: ExtractionMethod,
        confidence: f32,
    ) -> Self {
        Self {
            success: true,
            text,
            metadata,
            processing: ProcessingInfo {
                duration_ms: 0,
                method,
                confidence: confidence.clamp(0.0, 1.0),
                warnings: Vec::new(),
            },
            error: None,
        }
    }

    /// Build a failed result with a populated error.
    pub fn failure(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            success: false,
            text: String::new(),
            metadata: ExtractionMetadata::default(),
            processing: ProcessingInfo {
                duration_ms: 0,
                method: ExtractionMethod::DirectText,
                confidence: 0.0,
                warnings: Vec::new(),
            },
            error: Some(ExtractionError {
                code,
                message: message.into(),
            }),
        }
    }

    /// Build a failed result tagged with a method and metadata.
    pub fn failure_with_metadata(
        code: ErrorCode,
        message: impl Into<String>,
        metadata: ExtractionMetadata,
        method: ExtractionMethod,
    ) -> Self {
        let mut result = Self::failure(code, message);
        result.metadata = metadata;
        result.processing.method = method;
        result
    }

    /// Append a warning.
    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.processing.warnings.push(warning.into());
        self
    }

    /// Set the measured duration.
    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.processing.duration_ms = duration_ms;
        self
    }

    /// Tag the result with the processor that produced it.
    pub fn with_processor_name(mut self, name: impl Into<String>) -> Self {
        self.metadata.processor_name = Some(name.into());
        self
    }

    /// Attach an extra metadata entry.
    pub fn with_extra(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.metadata.extra.insert(key.into(), value.into());
        self
    }

    /// Whether the result carries usable, non-blank text.
    pub fn has_text(&self) -> bool {
        self.success && !self.text.trim().is_empty()
    }
}
