//! Pipeline configuration.
//!
//! Everything is explicit: the orchestrator receives a `PipelineConfig` at
//! construction time and no component reads ambient global state. The
//! `from_env` constructor exists as a convenience for binaries, mirroring
//! the rest of the workspace's client constructors.

use serde::{Deserialize, Serialize};

use crate::types::ExtractionOptions;

/// Configuration for the whole extraction pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// External document-understanding service. `None` disables the
    /// external-first strategy entirely.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docling: Option<DoclingConfig>,
    /// Default options applied when a caller passes none.
    pub options: ExtractionOptions,
}

impl PipelineConfig {
    /// Config with no external service and default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach an external understanding service.
    pub fn with_docling(mut self, docling: DoclingConfig) -> Self {
        self.docling = Some(docling);
        self
    }

    /// Override the default per-call options.
    pub fn with_options(mut self, options: ExtractionOptions) -> Self {
        self.options = options;
        self
    }

    /// Build from environment variables.
    ///
    /// `SIFT_DOCLING_URL` enables the external service; `SIFT_DOCLING_ENABLED`
    /// (default true when a URL is set) and `SIFT_DOCLING_TIMEOUT_MS` tune it.
    pub fn from_env() -> Self {
        let docling = std::env::var("SIFT_DOCLING_URL").ok().map(|base_url| {
            let enabled = std::env::var("SIFT_DOCLING_ENABLED")
                .map(|v| v != "false" && v != "0")
                .unwrap_or(true);
            let timeout_ms = std::env::var("SIFT_DOCLING_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DoclingConfig::DEFAULT_TIMEOUT_MS);
            DoclingConfig {
                base_url,
                enabled,
                timeout_ms,
                ..DoclingConfig::default()
            }
        });

        Self {
            docling,
            options: ExtractionOptions::default(),
        }
    }
}

/// Connection settings for the external document-understanding service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DoclingConfig {
    /// Service base URL, e.g. `http://localhost:8001`.
    pub base_url: String,
    /// Feature switch; a configured-but-disabled service is never probed.
    pub enabled: bool,
    /// Request timeout for `/process` calls.
    pub timeout_ms: u64,
    /// Probe timeout for `/health` calls.
    pub health_timeout_ms: u64,
    /// How long a health verdict is cached before re-probing.
    pub health_ttl_ms: u64,
}

impl DoclingConfig {
    pub const DEFAULT_TIMEOUT_MS: u64 = 60_000;

    /// Config pointing at a base URL with default timeouts.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }
}

impl Default for DoclingConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8001".to_string(),
            enabled: true,
            timeout_ms: Self::DEFAULT_TIMEOUT_MS,
            health_timeout_ms: 3_000,
            health_ttl_ms: 5_000,
        }
    }
}
