//! ZIP archive extraction.
//!
//! Only top-level entries are read; nested archives are never recursed
//! into. Accumulation stops early once the text limit would be exceeded,
//! which bounds worst-case memory and CPU on adversarial archives.

use async_trait::async_trait;
use std::io::{Cursor, Read};

use sift_core::error::{SiftError, SiftResult};
use sift_core::text::strip_html;
use sift_core::types::{
    DocumentMetadata, ExtractionMetadata, ExtractionMethod, ExtractionOptions, ExtractionResult,
};
use sift_core::{mime, Processor};

/// Per-entry read ceiling, so a single huge entry cannot blow the budget
/// before the accumulated-length check sees it.
const MAX_ENTRY_BYTES: u64 = 10 * 1024 * 1024;

/// Processor for ZIP containers.
#[derive(Debug, Clone, Default)]
pub struct ArchiveProcessor;

impl ArchiveProcessor {
    pub fn new() -> Self {
        Self
    }

    fn list_entries(content: Vec<u8>) -> Result<(String, usize), SiftError> {
        let mut archive = zip::ZipArchive::new(Cursor::new(content))
            .map_err(|e| SiftError::Parse(format!("failed to open archive: {}", e)))?;

        let mut lines: Vec<String> = Vec::new();
        for index in 0..archive.len() {
            let entry = archive
                .by_index(index)
                .map_err(|e| SiftError::Parse(format!("failed to read archive entry: {}", e)))?;
            if entry.is_dir() {
                continue;
            }
            lines.push(format!("{} ({} bytes)", entry.name(), entry.size()));
        }
        let count = lines.len();
        Ok((lines.join("\n"), count))
    }

    fn extract_entries(
        content: Vec<u8>,
        max_text_length: usize,
    ) -> Result<(String, usize, Vec<String>), SiftError> {
        let mut archive = zip::ZipArchive::new(Cursor::new(content))
            .map_err(|e| SiftError::Parse(format!("failed to open archive: {}", e)))?;

        let mut sections: Vec<String> = Vec::new();
        let mut accumulated = 0usize;
        let mut warnings: Vec<String> = Vec::new();
        let mut entries = 0usize;

        for index in 0..archive.len() {
            let mut entry = archive
                .by_index(index)
                .map_err(|e| SiftError::Parse(format!("failed to read archive entry: {}", e)))?;
            if entry.is_dir() {
                continue;
            }
            entries += 1;

            let name = entry.name().to_string();
            let section = if Self::is_text_entry(&name) && entry.size() <= MAX_ENTRY_BYTES {
                let mut bytes = Vec::with_capacity(entry.size() as usize);
                entry
                    .read_to_end(&mut bytes)
                    .map_err(|e| SiftError::Parse(format!("failed to read '{}': {}", name, e)))?;
                match String::from_utf8(bytes) {
                    Ok(text) => {
                        format!("=== {} ===\n{}", name, Self::clean_entry(&name, &text))
                    }
                    Err(_) => format!("[File: {}]", name),
                }
            } else {
                format!("[File: {}]", name)
            };

            // Stop before exceeding the budget instead of extracting
            // everything and discarding.
            if accumulated + section.len() > max_text_length {
                warnings.push(format!(
                    "stopped at entry '{}': text limit of {} characters reached",
                    name, max_text_length
                ));
                break;
            }
            accumulated += section.len() + 2;
            sections.push(section);
        }

        Ok((sections.join("\n\n"), entries, warnings))
    }

    fn is_text_entry(name: &str) -> bool {
        name.rsplit('.')
            .next()
            .map(|ext| mime::is_text_extension(&ext.to_lowercase()))
            .unwrap_or(false)
    }

    /// Light cleanup per entry: JSON is re-serialized pretty, markup is
    /// tag-stripped, everything else passes through.
    fn clean_entry(name: &str, text: &str) -> String {
        let ext = name.rsplit('.').next().unwrap_or("").to_lowercase();
        match ext.as_str() {
            "json" => match serde_json::from_str::<serde_json::Value>(text) {
                Ok(value) => serde_json::to_string_pretty(&value).unwrap_or_else(|_| text.into()),
                Err(_) => text.to_string(),
            },
            "html" | "htm" | "xml" => strip_html(text),
            _ => text.to_string(),
        }
    }
}

#[async_trait]
impl Processor for ArchiveProcessor {
    async fn extract(
        &self,
        content: &[u8],
        options: &ExtractionOptions,
    ) -> SiftResult<ExtractionResult> {
        let size = content.len();
        let buffer = content.to_vec();

        let mut metadata = ExtractionMetadata {
            size,
            ..Default::default()
        };

        if !options.process_embedded_entries {
            let (listing, count) =
                tokio::task::spawn_blocking(move || Self::list_entries(buffer)).await??;
            if options.extract_metadata {
                metadata.document = Some(DocumentMetadata {
                    pages: Some(count),
                    ..Default::default()
                });
            }
            return Ok(ExtractionResult::ok(
                listing,
                metadata,
                ExtractionMethod::MetadataOnly,
                1.0,
            ));
        }

        let max_text_length = options.max_text_length;
        let (text, entries, warnings) =
            tokio::task::spawn_blocking(move || Self::extract_entries(buffer, max_text_length))
                .await??;

        if options.extract_metadata {
            metadata.document = Some(DocumentMetadata {
                pages: Some(entries),
                ..Default::default()
            });
        }

        let mut result =
            ExtractionResult::ok(text, metadata, ExtractionMethod::ArchiveExtraction, 1.0);
        for warning in warnings {
            result = result.with_warning(warning);
        }
        Ok(result)
    }

    fn supported_types(&self) -> &[&str] {
        &[
            "application/zip",
            "application/x-zip-compressed",
        ]
    }

    fn name(&self) -> &str {
        "archive"
    }
}
