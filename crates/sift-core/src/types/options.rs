//! Per-call extraction options.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{SiftError, SiftResult};

/// Lower bound for the per-call timeout.
pub const MIN_TIMEOUT_MS: u64 = 1_000;
/// Upper bound for the per-call timeout.
pub const MAX_TIMEOUT_MS: u64 = 300_000;

/// Immutable options for a single extraction call.
///
/// All fields have defaults; callers override only what they need via the
/// `with_*` builders.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionOptions {
    /// Hard ceiling on the input buffer size, enforced before any work.
    pub max_file_size_bytes: usize,
    /// Language hint passed to the OCR engine (ISO 639-2 code).
    pub ocr_language: String,
    /// Whether to populate format-family metadata sub-objects.
    pub extract_metadata: bool,
    /// Keep original whitespace instead of normalizing it.
    pub preserve_formatting: bool,
    /// Ceiling on the returned text length, applied after cleanup.
    pub max_text_length: usize,
    /// Per-call timeout budget. Clamped to [1s, 300s] at use sites.
    pub timeout_ms: u64,
    /// Whether archive entries are individually extracted or just listed.
    pub process_embedded_entries: bool,
}

impl Default for ExtractionOptions {
    fn default() -> Self {
        Self {
            max_file_size_bytes: 50 * 1024 * 1024,
            ocr_language: "eng".to_string(),
            extract_metadata: true,
            preserve_formatting: false,
            max_text_length: 1_000_000,
            timeout_ms: 30_000,
            process_embedded_entries: true,
        }
    }
}

impl ExtractionOptions {
    /// Create options with all defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum input size in bytes.
    pub fn with_max_file_size(mut self, bytes: usize) -> Self {
        self.max_file_size_bytes = bytes;
        self
    }

    /// Set the OCR language hint.
    pub fn with_ocr_language(mut self, language: impl Into<String>) -> Self {
        self.ocr_language = language.into();
        self
    }

    /// Enable or disable metadata extraction.
    pub fn with_metadata(mut self, extract: bool) -> Self {
        self.extract_metadata = extract;
        self
    }

    /// Keep original whitespace instead of normalizing.
    pub fn with_preserved_formatting(mut self, preserve: bool) -> Self {
        self.preserve_formatting = preserve;
        self
    }

    /// Set the ceiling on returned text length.
    pub fn with_max_text_length(mut self, max: usize) -> Self {
        self.max_text_length = max;
        self
    }

    /// Set the per-call timeout in milliseconds.
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Extract archive entries individually instead of listing them.
    pub fn with_embedded_entries(mut self, process: bool) -> Self {
        self.process_embedded_entries = process;
        self
    }

    /// Check option invariants.
    pub fn validate(&self) -> SiftResult<()> {
        if self.max_text_length == 0 {
            return Err(SiftError::Internal(
                "max_text_length must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Timeout budget clamped into the sane range.
    pub fn effective_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms.clamp(MIN_TIMEOUT_MS, MAX_TIMEOUT_MS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ExtractionOptions::default();
        assert_eq!(options.max_file_size_bytes, 50 * 1024 * 1024);
        assert_eq!(options.ocr_language, "eng");
        assert!(options.extract_metadata);
        assert!(!options.preserve_formatting);
        assert_eq!(options.max_text_length, 1_000_000);
        assert_eq!(options.timeout_ms, 30_000);
        assert!(options.process_embedded_entries);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_builders() {
        let options = ExtractionOptions::new()
            .with_max_text_length(100)
            .with_ocr_language("deu")
            .with_preserved_formatting(true)
            .with_embedded_entries(false);
        assert_eq!(options.max_text_length, 100);
        assert_eq!(options.ocr_language, "deu");
        assert!(options.preserve_formatting);
        assert!(!options.process_embedded_entries);
    }

    #[test]
    fn test_validate_rejects_zero_text_length() {
        let options = ExtractionOptions::new().with_max_text_length(0);
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_timeout_clamping() {
        let low = ExtractionOptions::new().with_timeout_ms(1);
        assert_eq!(low.effective_timeout(), Duration::from_millis(MIN_TIMEOUT_MS));

        let high = ExtractionOptions::new().with_timeout_ms(10_000_000);
        assert_eq!(high.effective_timeout(), Duration::from_millis(MAX_TIMEOUT_MS));

        let mid = ExtractionOptions::new().with_timeout_ms(45_000);
        assert_eq!(mid.effective_timeout(), Duration::from_millis(45_000));
    }
}
