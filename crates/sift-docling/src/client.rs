//! Docling service client implementation.

use std::time::{Duration, Instant};

use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::Mutex;

use sift_core::types::{
    DocumentMetadata, ExtractionMetadata, ExtractionMethod, ExtractionOptions, ExtractionResult,
};
use sift_core::{mime, DoclingConfig, ErrorCode};

/// Confidence attached to results from the understanding service: above
/// local structured parsing, below a deterministic text decode.
const DOCLING_CONFIDENCE: f32 = 0.97;

/// MIME types the docling service advertises support for.
const SUPPORTED_TYPES: &[&str] = &[
    mime::PDF,
    mime::DOCX,
    mime::XLSX,
    "application/vnd.openxmlformats-officedocument.presentationml.presentation",
    mime::HTML,
    "image/png",
    "image/jpeg",
    "image/tiff",
];

/// Client for the docling document-understanding service.
///
/// A thin, optional, network-bound collaborator: every failure mode
/// (network, timeout, non-2xx, unusable payload) comes back as a failed
/// `ExtractionResult`, never as an `Err` - the orchestrator treats it as a
/// fallback signal, not a fatal error.
pub struct DoclingClient {
    client: Client,
    config: DoclingConfig,
    health: Mutex<Option<(Instant, bool)>>,
}

#[derive(Debug, Deserialize)]
struct ProcessResponse {
    success: bool,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    metadata: Option<ProcessMetadata>,
    #[serde(default)]
    sections: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    tables: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    images: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    processing_time_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ProcessMetadata {
    #[serde(default)]
    filename: Option<String>,
    #[serde(default)]
    num_pages: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct HealthResponse {
    status: String,
}

impl DoclingClient {
    /// Create a client for the configured service.
    pub fn new(config: DoclingConfig) -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .build()
            .expect("reqwest client build never fails with default TLS config");
        Self {
            client,
            config,
            health: Mutex::new(None),
        }
    }

    /// Whether the service handles this MIME type.
    pub fn supports(&self, mime_type: &str) -> bool {
        self.config.enabled && SUPPORTED_TYPES.contains(&mime_type)
    }

    /// The configured base URL.
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Probe service health, caching the verdict briefly so concurrent
    /// extraction calls do not hammer `/health`.
    pub async fn is_available(&self) -> bool {
        if !self.config.enabled {
            return false;
        }

        let ttl = Duration::from_millis(self.config.health_ttl_ms);
        let mut cached = self.health.lock().await;
        if let Some((probed_at, verdict)) = *cached {
            if probed_at.elapsed() < ttl {
                return verdict;
            }
        }

        let verdict = self.probe().await;
        *cached = Some((Instant::now(), verdict));
        verdict
    }

    async fn probe(&self) -> bool {
        let url = format!("{}/health", self.config.base_url.trim_end_matches('/'));
        let budget = Duration::from_millis(self.config.health_timeout_ms);

        let request = self.client.get(&url).send();
        let response = match tokio::time::timeout(budget, request).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                tracing::debug!(error = %e, "docling health probe failed");
                return false;
            }
            Err(_) => {
                tracing::debug!(timeout_ms = budget.as_millis() as u64, "docling health probe timed out");
                return false;
            }
        };

        if !response.status().is_success() {
            return false;
        }
        match response.json::<HealthResponse>().await {
            Ok(health) => health.status == "healthy",
            Err(_) => false,
        }
    }

    /// Submit a buffer for processing and map the response into the
    /// pipeline's result shape.
    ///
    /// The request is raced against the configured timeout; on expiry the
    /// in-flight request future is dropped, which tears down the
    /// connection rather than leaving the transfer running.
    #[tracing::instrument(skip(self, content, options), fields(size = content.len()))]
    pub async fn process(
        &self,
        content: &[u8],
        mime_type: &str,
        filename: Option<&str>,
        options: &ExtractionOptions,
    ) -> ExtractionResult {
        let url = format!("{}/process", self.config.base_url.trim_end_matches('/'));
        let budget = Duration::from_millis(self.config.timeout_ms);

        let file_name = filename
            .map(|f| f.to_string())
            .unwrap_or_else(|| default_filename(mime_type));

        let part = match Part::bytes(content.to_vec())
            .file_name(file_name)
            .mime_str(mime_type)
        {
            Ok(part) => part,
            Err(e) => {
                return ExtractionResult::failure(
                    ErrorCode::ExternalServiceUnavailable,
                    format!("invalid MIME type for multipart upload: {}", e),
                )
            }
        };

        let form = Form::new()
            .part("file", part)
            .text("export_format", "markdown")
            .text("ocr_enabled", "true")
            .text("extract_tables", "true")
            .text("extract_images", "true")
            .text(
                "preserve_layout",
                if options.preserve_formatting { "true" } else { "false" },
            );

        let request = self.client.post(&url).multipart(form).send();
        let response = match tokio::time::timeout(budget, request).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                return ExtractionResult::failure(
                    ErrorCode::ExternalServiceUnavailable,
                    format!("docling request failed: {}", e),
                )
            }
            Err(_) => {
                return ExtractionResult::failure(
                    ErrorCode::Timeout,
                    format!("docling request timed out after {}ms", budget.as_millis()),
                )
            }
        };

        if !response.status().is_success() {
            return ExtractionResult::failure(
                ErrorCode::ExternalServiceUnavailable,
                format!("docling returned HTTP {}", response.status()),
            );
        }

        let payload: ProcessResponse = match response.json().await {
            Ok(payload) => payload,
            Err(e) => {
                return ExtractionResult::failure(
                    ErrorCode::ExternalServiceUnavailable,
                    format!("docling response parse failed: {}", e),
                )
            }
        };

        self.map_response(payload, content.len(), mime_type, options)
    }

    fn map_response(
        &self,
        payload: ProcessResponse,
        size: usize,
        mime_type: &str,
        options: &ExtractionOptions,
    ) -> ExtractionResult {
        if !payload.success {
            return ExtractionResult::failure(
                ErrorCode::ExternalServiceUnavailable,
                payload
                    .error
                    .unwrap_or_else(|| "docling reported failure without detail".to_string()),
            );
        }

        let content = payload.content.unwrap_or_default();
        if content.trim().is_empty() {
            return ExtractionResult::failure(
                ErrorCode::ExternalServiceUnavailable,
                "docling returned empty content".to_string(),
            );
        }

        let (text, truncated) =
            sift_core::text::truncate_to(content, options.max_text_length);

        let mut metadata = ExtractionMetadata {
            size,
            mime_type: mime_type.to_string(),
            ..Default::default()
        };

        if options.extract_metadata {
            let mut document = DocumentMetadata::default();
            if let Some(service_metadata) = payload.metadata {
                document.pages = service_metadata.num_pages;
                metadata.filename = service_metadata.filename;
            }
            document.words = Some(sift_core::text::word_count(&text));
            document.characters = Some(text.chars().count());
            metadata.document = Some(document);

            if let Some(sections) = payload.sections {
                if !sections.is_empty() {
                    metadata.extra.insert("sections".into(), sections.into());
                }
            }
            if let Some(tables) = payload.tables {
                if !tables.is_empty() {
                    metadata.extra.insert("tables".into(), tables.into());
                }
            }
            if let Some(images) = payload.images {
                if !images.is_empty() {
                    metadata.extra.insert("images".into(), images.into());
                }
            }
            if let Some(elapsed) = payload.processing_time_ms {
                metadata
                    .extra
                    .insert("service_processing_time_ms".into(), elapsed.into());
            }
        }

        let mut result = ExtractionResult::ok(
            text,
            metadata,
            ExtractionMethod::ExternalUnderstanding,
            DOCLING_CONFIDENCE,
        );
        if truncated {
            result = result.with_warning(format!(
                "text truncated to {} characters",
                options.max_text_length
            ));
        }
        result
    }
}

fn default_filename(mime_type: &str) -> String {
    match mime::extension_for(mime_type) {
        Some(ext) => format!("upload.{}", ext),
        None => "upload.bin".to_string(),
    }
}
