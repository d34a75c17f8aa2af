//! Error types for extraction operations.
//!
//! Two layers: `SiftError` is the internal fallible-plumbing error used
//! between processors and the orchestrator, and `ErrorCode` is the closed
//! taxonomy surfaced to callers inside a failed `ExtractionResult`. Nothing
//! crosses the public pipeline boundary as an `Err` - the orchestrator folds
//! every `SiftError` into a typed failure result.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for extraction operations.
pub type SiftResult<T> = Result<T, SiftError>;

/// Internal error type for processors and adapters.
#[derive(Error, Debug)]
pub enum SiftError {
    /// No processor is registered for the given MIME type.
    #[error("Unsupported content type: {0}")]
    UnsupportedType(String),

    /// Input buffer was empty.
    #[error("Empty input buffer")]
    EmptyInput,

    /// Input exceeds the configured size ceiling.
    #[error("File too large: {size} bytes (limit {limit})")]
    FileTooLarge { size: usize, limit: usize },

    /// Processing exceeded its timeout budget.
    #[error("Processing timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },

    /// Content could not be parsed by the selected processor.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Network failure talking to an external service.
    #[error("Network error: {0}")]
    Network(String),

    /// IO error during extraction.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Task join error from spawn_blocking.
    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),

    /// Unexpected internal failure.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SiftError {
    /// Map this error onto the caller-facing taxonomy.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::UnsupportedType(_) => ErrorCode::UnsupportedType,
            Self::EmptyInput => ErrorCode::EmptyInput,
            Self::FileTooLarge { .. } => ErrorCode::FileTooLarge,
            Self::Timeout { .. } => ErrorCode::Timeout,
            Self::Parse(_) | Self::Io(_) => ErrorCode::CorruptOrUnparseable,
            Self::Network(_) => ErrorCode::ExternalServiceUnavailable,
            Self::TaskJoin(_) | Self::Internal(_) => ErrorCode::AdapterInternalError,
        }
    }
}

/// Closed error taxonomy surfaced in failed extraction results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Empty or missing input buffer.
    EmptyInput,
    /// No processor can handle the MIME type.
    UnsupportedType,
    /// Input exceeds the configured size ceiling.
    FileTooLarge,
    /// Processing exceeded its timeout budget.
    Timeout,
    /// External understanding service is unreachable or errored.
    ExternalServiceUnavailable,
    /// Content is corrupt or not parseable as its declared format.
    CorruptOrUnparseable,
    /// OCR succeeded but with low confidence (warning-grade).
    OcrLowConfidence,
    /// Catch-all for unexpected processor failures caught at the
    /// orchestrator boundary.
    AdapterInternalError,
}

impl ErrorCode {
    /// Stable string form of the code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::EmptyInput => "EMPTY_INPUT",
            ErrorCode::UnsupportedType => "UNSUPPORTED_TYPE",
            ErrorCode::FileTooLarge => "FILE_TOO_LARGE",
            ErrorCode::Timeout => "TIMEOUT",
            ErrorCode::ExternalServiceUnavailable => "EXTERNAL_SERVICE_UNAVAILABLE",
            ErrorCode::CorruptOrUnparseable => "CORRUPT_OR_UNPARSEABLE",
            ErrorCode::OcrLowConfidence => "OCR_LOW_CONFIDENCE",
            ErrorCode::AdapterInternalError => "ADAPTER_INTERNAL_ERROR",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
