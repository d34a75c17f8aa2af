//! Vision-LLM image transcription.
//!
//! Two passes against a multimodal model: a verbatim transcription of any
//! visible text, then a structured classification (document type, sections,
//! tables, signatures, language) parsed into extra metadata. Any API
//! failure is surfaced as a network error so the orchestrator can fall back
//! to the traditional OCR engine.

use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestMessageContentPartImage,
        ChatCompletionRequestUserMessage, ChatCompletionRequestUserMessageContent,
        ChatCompletionRequestUserMessageContentPart, CreateChatCompletionRequest, ImageDetail,
        ImageUrl,
    },
    Client,
};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::Deserialize;

use sift_core::error::{SiftError, SiftResult};
use sift_core::types::{
    ExtractionMetadata, ExtractionMethod, ExtractionOptions, ExtractionResult, ImageMetadata,
};
use sift_core::Processor;

/// Configuration for vision extraction.
#[derive(Debug, Clone)]
pub struct VisionConfig {
    /// Model to use (default: gpt-4o).
    pub model: String,
    /// Max tokens per response (default: 2000).
    pub max_tokens: u32,
    /// Image detail level (default: High).
    pub detail: ImageDetail,
    /// Run the structured classification pass (default: true).
    pub classify: bool,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            max_tokens: 2000,
            detail: ImageDetail::High,
            classify: true,
        }
    }
}

/// Structured classification returned by the second pass.
#[derive(Debug, Clone, Default, Deserialize)]
struct Classification {
    #[serde(default)]
    document_type: Option<String>,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    sections: Vec<String>,
    #[serde(default)]
    has_tables: Option<bool>,
    #[serde(default)]
    has_signatures: Option<bool>,
    #[serde(default)]
    confidence: Option<f32>,
}

/// Vision-LLM processor for images.
pub struct VisionProcessor {
    client: Client<OpenAIConfig>,
    config: VisionConfig,
}

impl VisionProcessor {
    /// Processor with the default OpenAI client (API key from environment).
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            config: VisionConfig::default(),
        }
    }

    /// Processor with custom configuration.
    pub fn with_config(config: VisionConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    /// Processor with a custom client (API key, base URL).
    pub fn with_client(client: Client<OpenAIConfig>, config: VisionConfig) -> Self {
        Self { client, config }
    }

    fn detect_format(content: &[u8]) -> Result<&'static str, SiftError> {
        if content.len() < 8 {
            return Err(SiftError::Parse(
                "content too short to detect image format".to_string(),
            ));
        }
        if content.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
            Ok("png")
        } else if content.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Ok("jpeg")
        } else if content.starts_with(b"GIF87a") || content.starts_with(b"GIF89a") {
            Ok("gif")
        } else if content.starts_with(b"RIFF") && content.len() > 12 && &content[8..12] == b"WEBP" {
            Ok("webp")
        } else {
            Err(SiftError::Parse("unknown image format".to_string()))
        }
    }

    async fn ask(&self, data_url: &str, prompt: &str) -> SiftResult<String> {
        let image_part = ChatCompletionRequestMessageContentPartImage {
            image_url: ImageUrl {
                url: data_url.to_string(),
                detail: Some(self.config.detail.clone()),
            },
        };

        let request = CreateChatCompletionRequest {
            model: self.config.model.clone(),
            messages: vec![ChatCompletionRequestMessage::User(
                ChatCompletionRequestUserMessage {
                    content: ChatCompletionRequestUserMessageContent::Array(vec![
                        ChatCompletionRequestUserMessageContentPart::Text(
                            prompt.to_string().into(),
                        ),
                        ChatCompletionRequestUserMessageContentPart::ImageUrl(image_part),
                    ]),
                    name: None,
                },
            )],
            max_completion_tokens: Some(self.config.max_tokens),
            ..Default::default()
        };

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| SiftError::Network(format!("vision API error: {}", e)))?;

        response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .ok_or_else(|| SiftError::Network("empty response from vision API".to_string()))
    }

    /// Parse the classification response leniently: models wrap JSON in
    /// code fences more often than not.
    fn parse_classification(raw: &str) -> Option<Classification> {
        let stripped = raw
            .trim()
            .trim_start_matches("```json")
            .trim_start_matches("```")
            .trim_end_matches("```")
            .trim();
        serde_json::from_str(stripped).ok()
    }
}

impl Default for VisionProcessor {
    fn default() -> Self {
        Self::new()
    }
}

const TRANSCRIPTION_PROMPT: &str = "Transcribe all text visible in this image verbatim. \
     Preserve reading order and line breaks. If the image contains no text, \
     describe its contents in one or two sentences instead.";

const CLASSIFICATION_PROMPT: &str = "Classify this document image. Respond with only a JSON object: \
     {\"document_type\": string, \"language\": string, \
     \"sections\": [string], \"has_tables\": bool, \
     \"has_signatures\": bool, \"confidence\": number between 0 and 1}";

#[async_trait]
impl Processor for VisionProcessor {
    async fn extract(
        &self,
        content: &[u8],
        options: &ExtractionOptions,
    ) -> SiftResult<ExtractionResult> {
        let format = Self::detect_format(content)?;
        let data_url = format!("data:image/{};base64,{}", format, STANDARD.encode(content));

        let budget = options.effective_timeout();
        let text = tokio::time::timeout(budget, self.ask(&data_url, TRANSCRIPTION_PROMPT))
            .await
            .map_err(|_| SiftError::Timeout {
                elapsed_ms: budget.as_millis() as u64,
            })??;

        if text.trim().is_empty() {
            return Err(SiftError::Network(
                "vision model returned no content".to_string(),
            ));
        }

        let mut metadata = ExtractionMetadata {
            size: content.len(),
            ..Default::default()
        };
        if options.extract_metadata {
            metadata.image = Some(ImageMetadata {
                width: None,
                height: None,
                format: Some(format.to_string()),
            });
        }

        let mut confidence = 0.85;
        let mut result_extra: Vec<(String, serde_json::Value)> = Vec::new();
        let mut warnings: Vec<String> = Vec::new();

        if self.config.classify {
            // A failed classification pass degrades to transcription-only.
            match tokio::time::timeout(budget, self.ask(&data_url, CLASSIFICATION_PROMPT)).await {
                Ok(Ok(raw)) => match Self::parse_classification(&raw) {
                    Some(classification) => {
                        if let Some(c) = classification.confidence {
                            confidence = c.clamp(0.0, 1.0);
                        }
                        if let Some(doc_type) = classification.document_type {
                            result_extra.push(("document_type".into(), doc_type.into()));
                        }
                        if let Some(language) = classification.language {
                            result_extra.push(("language".into(), language.into()));
                        }
                        if !classification.sections.is_empty() {
                            result_extra
                                .push(("sections".into(), classification.sections.into()));
                        }
                        if let Some(tables) = classification.has_tables {
                            result_extra.push(("has_tables".into(), tables.into()));
                        }
                        if let Some(signatures) = classification.has_signatures {
                            result_extra.push(("has_signatures".into(), signatures.into()));
                        }
                    }
                    None => warnings
                        .push("classification response was not valid JSON".to_string()),
                },
                Ok(Err(e)) => {
                    tracing::debug!(error = %e, "vision classification pass failed");
                    warnings.push("document classification unavailable".to_string());
                }
                Err(_) => warnings.push("document classification timed out".to_string()),
            }
        }

        let mut result = ExtractionResult::ok(text, metadata, ExtractionMethod::Ocr, confidence);
        for (key, value) in result_extra {
            result = result.with_extra(key, value);
        }
        for warning in warnings {
            result = result.with_warning(warning);
        }
        Ok(result)
    }

    fn supported_types(&self) -> &[&str] {
        &["image/png", "image/jpeg", "image/gif", "image/webp"]
    }

    fn name(&self) -> &str {
        "vision"
    }
}
