//! Office document extraction: Word, Excel, and CSV.
//!
//! Word text goes through a mandatory structural cleanup regardless of
//! `preserve_formatting` - downstream chunking depends on stable paragraph
//! breaks, so line endings, paragraph boundaries, and intra-line whitespace
//! are always normalized. Formatting fidelity (bold, italics) is out of
//! scope; only textual structure is kept.

use async_trait::async_trait;
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use docx_rs::{DocumentChild, ParagraphChild, RunChild, TableChild, TableRowChild};
use std::io::Cursor;

use sift_core::error::{SiftError, SiftResult};
use sift_core::text::{truncate_to, word_count};
use sift_core::types::{
    DocumentMetadata, ExtractionMetadata, ExtractionMethod, ExtractionOptions, ExtractionResult,
};
use sift_core::{mime, Processor};

/// Processor for Word, Excel, and CSV content.
///
/// Structured conversions (Word, Excel) report confidence 0.9 for the
/// inherent loss in flattening; CSV is a plain decode at 1.0.
#[derive(Debug, Clone, Default)]
pub struct OfficeProcessor;

impl OfficeProcessor {
    pub fn new() -> Self {
        Self
    }

    /// Extract Word text synchronously (called within spawn_blocking).
    fn extract_docx_sync(content: Vec<u8>) -> Result<String, SiftError> {
        let docx = docx_rs::read_docx(&content)
            .map_err(|e| SiftError::Parse(format!("failed to parse Word document: {}", e)))?;

        let mut paragraphs: Vec<String> = Vec::new();
        for child in docx.document.children {
            match child {
                DocumentChild::Paragraph(p) => {
                    let text = Self::paragraph_text(&p);
                    if !text.trim().is_empty() {
                        paragraphs.push(text);
                    }
                }
                DocumentChild::Table(t) => {
                    let text = Self::table_text(&t);
                    if !text.trim().is_empty() {
                        paragraphs.push(text);
                    }
                }
                _ => {}
            }
        }

        Ok(Self::structural_cleanup(&paragraphs.join("\n\n")))
    }

    fn paragraph_text(p: &docx_rs::Paragraph) -> String {
        let mut text = String::new();
        for child in &p.children {
            match child {
                ParagraphChild::Run(r) => {
                    for run_child in &r.children {
                        match run_child {
                            RunChild::Text(t) => text.push_str(&t.text),
                            RunChild::Tab(_) => text.push('\t'),
                            RunChild::Break(_) => text.push('\n'),
                            _ => {}
                        }
                    }
                }
                ParagraphChild::Hyperlink(h) => {
                    for link_child in &h.children {
                        if let ParagraphChild::Run(r) = link_child {
                            for run_child in &r.children {
                                if let RunChild::Text(t) = run_child {
                                    text.push_str(&t.text);
                                }
                            }
                        }
                    }
                }
                _ => {}
            }
        }
        text
    }

    fn table_text(t: &docx_rs::Table) -> String {
        let mut rows: Vec<String> = Vec::new();
        for row in &t.rows {
            let TableChild::TableRow(r) = row;
            let mut cells: Vec<String> = Vec::new();
            for cell in &r.cells {
                let TableRowChild::TableCell(c) = cell;
                let mut cell_text = String::new();
                for child in &c.children {
                    if let docx_rs::TableCellContent::Paragraph(p) = child {
                        let para = Self::paragraph_text(p);
                        if !cell_text.is_empty() && !para.is_empty() {
                            cell_text.push(' ');
                        }
                        cell_text.push_str(&para);
                    }
                }
                cells.push(cell_text.trim().to_string());
            }
            rows.push(cells.join(" | "));
        }
        rows.join("\n")
    }

    /// Mandatory structural cleanup for Word output: normalize line
    /// endings, keep paragraph breaks as exactly one blank line, collapse
    /// intra-line whitespace, drop blank lines inside paragraphs.
    fn structural_cleanup(text: &str) -> String {
        let unified = text.replace("\r\n", "\n").replace('\r', "\n");
        let mut paragraphs: Vec<String> = Vec::new();
        for block in unified.split("\n\n") {
            let lines: Vec<String> = block
                .lines()
                .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
                .filter(|line| !line.is_empty())
                .collect();
            if !lines.is_empty() {
                paragraphs.push(lines.join("\n"));
            }
        }
        paragraphs.join("\n\n")
    }

    /// Each worksheet becomes CSV text under a `=== {sheet} ===` delimiter.
    fn extract_workbook_sync(content: Vec<u8>) -> Result<(String, usize), SiftError> {
        let cursor = Cursor::new(content);
        let mut workbook = open_workbook_auto_from_rs(cursor)
            .map_err(|e| SiftError::Parse(format!("failed to open workbook: {}", e)))?;

        let sheet_names = workbook.sheet_names().to_vec();
        let mut sections: Vec<String> = Vec::new();

        for name in &sheet_names {
            let range = match workbook.worksheet_range(name) {
                Ok(range) => range,
                Err(e) => {
                    return Err(SiftError::Parse(format!(
                        "failed to read sheet '{}': {}",
                        name, e
                    )))
                }
            };
            let mut lines: Vec<String> = Vec::new();
            for row in range.rows() {
                let cells: Vec<String> = row.iter().map(Self::cell_to_string).collect();
                if cells.iter().any(|c| !c.is_empty()) {
                    lines.push(cells.join(","));
                }
            }
            sections.push(format!("=== {} ===\n{}", name, lines.join("\n")));
        }

        Ok((sections.join("\n\n"), sheet_names.len()))
    }

    fn cell_to_string(cell: &Data) -> String {
        match cell {
            Data::Empty => String::new(),
            Data::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    fn extract_csv(content: &[u8]) -> Result<String, SiftError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(content);

        let mut lines: Vec<String> = Vec::new();
        for record in reader.records() {
            let record =
                record.map_err(|e| SiftError::Parse(format!("failed to parse CSV: {}", e)))?;
            lines.push(record.iter().collect::<Vec<_>>().join(","));
        }
        Ok(lines.join("\n"))
    }

    fn is_spreadsheet(mime_type: &str) -> bool {
        matches!(mime_type, mime::XLSX | mime::XLS)
    }
}

#[async_trait]
impl Processor for OfficeProcessor {
    async fn extract(
        &self,
        content: &[u8],
        options: &ExtractionOptions,
    ) -> SiftResult<ExtractionResult> {
        let size = content.len();
        let mut metadata = ExtractionMetadata {
            size,
            ..Default::default()
        };

        // The trait carries no declared type, so the concrete office format
        // is resolved from the container bytes. OLE2 containers (legacy
        // .xls/.doc) go to calamine, which reads .xls natively; a legacy
        // .doc inside one surfaces as a parse failure.
        let detected = sift_core::detect_type(content);
        let is_ole2 = content.starts_with(&[0xD0, 0xCF, 0x11, 0xE0]);
        let buffer = content.to_vec();

        let (text, mut document, method, confidence) = if detected == Some(mime::XLSX) || is_ole2 {
            let (text, sheets) =
                tokio::task::spawn_blocking(move || Self::extract_workbook_sync(buffer)).await??;
            let document = DocumentMetadata {
                pages: Some(sheets),
                ..Default::default()
            };
            (text, document, ExtractionMethod::StructuredParse, 0.9)
        } else if matches!(detected, Some(mime::DOCX) | Some(mime::ZIP)) {
            let text =
                tokio::task::spawn_blocking(move || Self::extract_docx_sync(buffer)).await??;
            (
                text,
                DocumentMetadata::default(),
                ExtractionMethod::StructuredParse,
                0.9,
            )
        } else {
            // Not a recognized container: treat as CSV. The reader rejects
            // non-UTF-8 input, so binary noise fails rather than producing
            // garbage text.
            let text = Self::extract_csv(content)?;
            (
                text,
                DocumentMetadata::default(),
                ExtractionMethod::DirectText,
                1.0,
            )
        };

        if text.trim().is_empty() {
            return Err(SiftError::Parse(
                "document contained no extractable text".to_string(),
            ));
        }

        let (text, truncated) = truncate_to(text, options.max_text_length);
        if options.extract_metadata {
            document.words = Some(word_count(&text));
            document.characters = Some(text.chars().count());
            metadata.document = Some(document);
        }

        let mut result = ExtractionResult::ok(text, metadata, method, confidence);
        if truncated {
            result = result.with_warning(format!(
                "text truncated to {} characters",
                options.max_text_length
            ));
        }
        Ok(result)
    }

    fn supported_types(&self) -> &[&str] {
        &[
            mime::DOCX,
            mime::DOC,
            mime::XLSX,
            mime::XLS,
            mime::CSV,
        ]
    }

    fn name(&self) -> &str {
        "office"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_csv_extraction() {
        let processor = OfficeProcessor::new();
        let result = processor
            .extract(b"Name,Age\nJohn,30\nJane,25", &ExtractionOptions::default())
            .await
            .unwrap();
        assert!(result.success);
        assert!(result.text.contains("John"));
        assert!(result.text.contains("Jane"));
        assert_eq!(result.processing.confidence, 1.0);
        assert_eq!(result.processing.method, ExtractionMethod::DirectText);
    }

    #[tokio::test]
    async fn test_invalid_docx_fails() {
        let processor = OfficeProcessor::new();
        // ZIP magic but not a Word document.
        let bogus = [0x50, 0x4B, 0x03, 0x04, 0x00, 0x00, 0x00, 0x00];
        let err = processor
            .extract(&bogus, &ExtractionOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SiftError::Parse(_)));
    }

    #[test]
    fn test_structural_cleanup() {
        let raw = "First  paragraph\twith   spacing\r\n\r\nSecond\nparagraph\n\n\n\nThird";
        let cleaned = OfficeProcessor::structural_cleanup(raw);
        assert!(cleaned.contains("First paragraph with spacing"));
        assert!(cleaned.contains("\n\n"));
        assert!(!cleaned.contains("\r"));
        assert!(!cleaned.contains("  "));
    }

    #[test]
    fn test_supported_types() {
        let processor = OfficeProcessor::new();
        assert!(processor.can_process(mime::DOCX));
        assert!(processor.can_process(mime::XLSX));
        assert!(processor.can_process("text/csv"));
        assert!(!processor.can_process("application/pdf"));
        assert_eq!(processor.name(), "office");
    }
}
