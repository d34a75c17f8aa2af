//! Text cleanup utilities shared by the processors.

use once_cell::sync::Lazy;
use regex::Regex;

static SCRIPT_BLOCKS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<script[^>]*>.*?</script>").expect("static regex"));
static STYLE_BLOCKS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<style[^>]*>.*?</style>").expect("static regex"));
static HTML_COMMENTS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<!--.*?-->").expect("static regex"));
static HTML_TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("static regex"));
static SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]+").expect("static regex"));
static SPACE_AROUND_NEWLINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r" ?\n ?").expect("static regex"));
static EXCESS_NEWLINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").expect("static regex"));

static HTML_TITLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").expect("static regex"));
static META_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<meta\s+name=["'](description|keywords|author)["']\s+content=["']([^"']*)["']"#)
        .expect("static regex")
});

/// Collapse whitespace runs to single spaces, cap consecutive newlines at
/// two, and trim. Line structure (single and double newlines) survives.
pub fn normalize_whitespace(text: &str) -> String {
    let unified = text.replace("\r\n", "\n").replace('\r', "\n");
    let collapsed = SPACES.replace_all(&unified, " ");
    let collapsed = SPACE_AROUND_NEWLINE.replace_all(&collapsed, "\n");
    let collapsed = EXCESS_NEWLINES.replace_all(&collapsed, "\n\n");
    collapsed.trim().to_string()
}

/// Strip an HTML document down to its visible text.
///
/// Removes script/style blocks and comments before tags so their contents
/// never leak into the output, then decodes the common entities.
pub fn strip_html(html: &str) -> String {
    let without_scripts = SCRIPT_BLOCKS.replace_all(html, " ");
    let without_styles = STYLE_BLOCKS.replace_all(&without_scripts, " ");
    let without_comments = HTML_COMMENTS.replace_all(&without_styles, " ");
    let without_tags = HTML_TAGS.replace_all(&without_comments, " ");
    normalize_whitespace(&decode_entities(&without_tags))
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Head metadata pulled from an HTML document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HtmlHead {
    pub title: Option<String>,
    pub description: Option<String>,
    pub keywords: Option<String>,
    pub author: Option<String>,
}

/// Extract `<title>` and description/keywords/author meta tags.
pub fn html_head(html: &str) -> HtmlHead {
    let mut head = HtmlHead::default();

    if let Some(captures) = HTML_TITLE.captures(html) {
        let title = normalize_whitespace(&decode_entities(&captures[1]));
        if !title.is_empty() {
            head.title = Some(title);
        }
    }

    for captures in META_TAG.captures_iter(html) {
        let value = decode_entities(captures[2].trim());
        if value.is_empty() {
            continue;
        }
        match captures[1].to_lowercase().as_str() {
            "description" => head.description = Some(value),
            "keywords" => head.keywords = Some(value),
            "author" => head.author = Some(value),
            _ => {}
        }
    }

    head
}

/// Recursively collect every string leaf in a JSON value.
///
/// Structural keys are ignored on purpose: downstream consumers want prose,
/// not data shape.
pub fn collect_json_strings(value: &serde_json::Value, out: &mut Vec<String>) {
    match value {
        serde_json::Value::String(s) => {
            if !s.trim().is_empty() {
                out.push(s.trim().to_string());
            }
        }
        serde_json::Value::Array(items) => {
            for item in items {
                collect_json_strings(item, out);
            }
        }
        serde_json::Value::Object(map) => {
            for item in map.values() {
                collect_json_strings(item, out);
            }
        }
        _ => {}
    }
}

/// Truncate to at most `max` bytes on a char boundary.
///
/// Returns the (possibly shortened) text and whether truncation occurred.
pub fn truncate_to(text: String, max: usize) -> (String, bool) {
    if text.len() <= max {
        return (text, false);
    }
    let mut cut = max;
    while cut > 0 && !text.is_char_boundary(cut) {
        cut -= 1;
    }
    (text[..cut].to_string(), true)
}

/// Ratio of control characters (excluding tab/newline/carriage return) to
/// total characters. Empty input counts as fully non-printable.
pub fn non_printable_ratio(text: &str) -> f64 {
    let total = text.chars().count();
    if total == 0 {
        return 1.0;
    }
    let non_printable = text
        .chars()
        .filter(|c| c.is_control() && !matches!(c, '\n' | '\r' | '\t'))
        .count();
    non_printable as f64 / total as f64
}

/// Whitespace-separated word count.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}
