//! Extraction method taxonomy.

use serde::{Deserialize, Serialize};
use strum::Display;

/// How a result's text was produced.
///
/// Closed enum: it both reports what happened and drives the default
/// confidence attached to a successful result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ExtractionMethod {
    /// Straight decode of text bytes.
    DirectText,
    /// Optical character recognition (tesseract or vision model).
    Ocr,
    /// Structured parse of a document format (PDF, DOCX, XLSX, ...).
    StructuredParse,
    /// Conversion through an intermediate format (e.g. markdown to HTML).
    FormatConverter,
    /// Per-entry extraction from an archive container.
    ArchiveExtraction,
    /// Container metadata only, no content transcription.
    MetadataOnly,
    /// Result produced by the external document-understanding service.
    ExternalUnderstanding,
}

impl ExtractionMethod {
    /// Default confidence for a successful extraction via this method.
    ///
    /// Deterministic decodes are 1.0; lossy conversions and header-derived
    /// descriptions sit lower. OCR has no static default - the engine's own
    /// score is used instead.
    pub fn default_confidence(&self) -> f32 {
        match self {
            ExtractionMethod::DirectText => 1.0,
            ExtractionMethod::Ocr => 0.5,
            ExtractionMethod::StructuredParse => 0.95,
            ExtractionMethod::FormatConverter => 1.0,
            ExtractionMethod::ArchiveExtraction => 1.0,
            ExtractionMethod::MetadataOnly => 0.9,
            ExtractionMethod::ExternalUnderstanding => 0.97,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_display_snake_case() {
        assert_eq!(ExtractionMethod::DirectText.to_string(), "direct_text");
        assert_eq!(
            ExtractionMethod::ExternalUnderstanding.to_string(),
            "external_understanding"
        );
    }

    #[test]
    fn test_method_serde_roundtrip() {
        let json = serde_json::to_string(&ExtractionMethod::ArchiveExtraction).unwrap();
        assert_eq!(json, "\"archive_extraction\"");
        let back: ExtractionMethod = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ExtractionMethod::ArchiveExtraction);
    }

    #[test]
    fn test_default_confidence_bounds() {
        for method in [
            ExtractionMethod::DirectText,
            ExtractionMethod::Ocr,
            ExtractionMethod::StructuredParse,
            ExtractionMethod::FormatConverter,
            ExtractionMethod::ArchiveExtraction,
            ExtractionMethod::MetadataOnly,
            ExtractionMethod::ExternalUnderstanding,
        ] {
            let c = method.default_confidence();
            assert!((0.0..=1.0).contains(&c));
        }
    }
}
