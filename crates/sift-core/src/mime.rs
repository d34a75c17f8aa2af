//! Content-based MIME detection and extension mapping.
//!
//! `detect_type` is a pure function over the leading bytes of a buffer:
//! fixed magic numbers first, then structural heuristics on a UTF-8 decode
//! of the head. It is independent of any caller-declared type - the
//! pipeline uses it to recover from mislabeled uploads.

use crate::text::non_printable_ratio;

pub const PDF: &str = "application/pdf";
pub const DOCX: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const XLSX: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const DOC: &str = "application/msword";
pub const XLS: &str = "application/vnd.ms-excel";
pub const CSV: &str = "text/csv";
pub const ZIP: &str = "application/zip";
pub const JSON: &str = "application/json";
pub const XML: &str = "application/xml";
pub const HTML: &str = "text/html";
pub const MARKDOWN: &str = "text/markdown";
pub const PLAIN: &str = "text/plain";
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Bytes of the head inspected by the structural heuristics.
const SNIFF_WINDOW: usize = 1024;

/// Buffers up to this size are fully parsed for the JSON check; larger ones
/// fall back to a shape heuristic on the head.
const JSON_PARSE_LIMIT: usize = 64 * 1024;

/// Detect the MIME type of a buffer from its content.
///
/// Returns `None` when no heuristic matches; the caller then keeps the
/// declared (or octet-stream) type.
pub fn detect_type(content: &[u8]) -> Option<&'static str> {
    if content.is_empty() {
        return None;
    }

    if content.starts_with(b"%PDF") {
        return Some(PDF);
    }
    if content.starts_with(&[0x50, 0x4B, 0x03, 0x04]) {
        return Some(sniff_zip_container(content));
    }
    if content.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
        return Some("image/png");
    }
    if content.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Some("image/jpeg");
    }
    if content.starts_with(b"GIF87a") || content.starts_with(b"GIF89a") {
        return Some("image/gif");
    }
    if content.starts_with(b"RIFF") && content.len() > 12 && &content[8..12] == b"WEBP" {
        return Some("image/webp");
    }
    if content.starts_with(b"BM") && content.len() > 6 {
        return Some("image/bmp");
    }

    sniff_text(content)
}

/// Distinguish OOXML Word/Excel from a generic ZIP by scanning the head for
/// internal entry paths. The first local file header carries the entry name
/// at a fixed offset, so a head-window scan is sufficient for documents
/// produced by mainstream writers.
fn sniff_zip_container(content: &[u8]) -> &'static str {
    let head = &content[..content.len().min(SNIFF_WINDOW)];
    if contains(head, b"word/") {
        DOCX
    } else if contains(head, b"xl/") {
        XLSX
    } else {
        ZIP
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

/// Structural heuristics over a UTF-8 decode of the head.
fn sniff_text(content: &[u8]) -> Option<&'static str> {
    let head_len = content.len().min(SNIFF_WINDOW);
    let head = match std::str::from_utf8(&content[..head_len]) {
        Ok(s) => s,
        // A multi-byte sequence may be cut at the window edge; accept the
        // valid prefix if there is a meaningful amount of it.
        Err(e) if e.valid_up_to() > head_len.saturating_sub(4) => {
            std::str::from_utf8(&content[..e.valid_up_to()]).ok()?
        }
        Err(_) => return None,
    };

    let trimmed = head.trim_start();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        if looks_like_json(content, trimmed) {
            return Some(JSON);
        }
    }
    if trimmed.starts_with('<') {
        let lower: String = trimmed.chars().take(64).collect::<String>().to_lowercase();
        if lower.starts_with("<html") || lower.starts_with("<!doctype html") {
            return Some(HTML);
        }
        return Some(XML);
    }
    if non_printable_ratio(head) < 0.10 {
        return Some(PLAIN);
    }
    None
}

fn looks_like_json(content: &[u8], head: &str) -> bool {
    if content.len() <= JSON_PARSE_LIMIT {
        if let Ok(s) = std::str::from_utf8(content) {
            return serde_json::from_str::<serde_json::Value>(s).is_ok();
        }
        return false;
    }
    // Too big to parse outright: accept on shape.
    head.contains('"') && (head.contains(':') || head.trim_start().starts_with('['))
}

/// Canonical file extension for a MIME type.
pub fn extension_for(mime_type: &str) -> Option<&'static str> {
    let ext = match mime_type {
        PDF => "pdf",
        DOCX => "docx",
        XLSX => "xlsx",
        DOC => "doc",
        XLS => "xls",
        CSV => "csv",
        ZIP => "zip",
        JSON => "json",
        XML | "text/xml" => "xml",
        HTML => "html",
        MARKDOWN => "md",
        PLAIN => "txt",
        "image/png" => "png",
        "image/jpeg" => "jpg",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "image/bmp" => "bmp",
        "image/tiff" => "tiff",
        "audio/mpeg" => "mp3",
        "audio/wav" | "audio/x-wav" => "wav",
        "audio/ogg" => "ogg",
        "audio/flac" => "flac",
        "video/mp4" => "mp4",
        "video/webm" => "webm",
        "video/x-msvideo" => "avi",
        _ => return None,
    };
    Some(ext)
}

/// MIME type for a file extension (lowercase, without the dot).
pub fn mime_for_extension(ext: &str) -> Option<&'static str> {
    let mime = match ext {
        "pdf" => PDF,
        "docx" => DOCX,
        "xlsx" => XLSX,
        "doc" => DOC,
        "xls" => XLS,
        "csv" => CSV,
        "zip" => ZIP,
        "json" => JSON,
        "xml" => XML,
        "html" | "htm" => HTML,
        "md" | "markdown" => MARKDOWN,
        "txt" | "text" | "log" => PLAIN,
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "tiff" | "tif" => "image/tiff",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "ogg" => "audio/ogg",
        "flac" => "audio/flac",
        "mp4" | "m4v" => "video/mp4",
        "webm" => "video/webm",
        "avi" => "video/x-msvideo",
        _ => return None,
    };
    Some(mime)
}

/// Whether an archive entry with this extension is decoded as text.
pub fn is_text_extension(ext: &str) -> bool {
    matches!(
        ext,
        "txt"
            | "text"
            | "log"
            | "md"
            | "markdown"
            | "json"
            | "xml"
            | "html"
            | "htm"
            | "csv"
            | "tsv"
            | "yaml"
            | "yml"
            | "toml"
            | "ini"
            | "cfg"
    )
}
