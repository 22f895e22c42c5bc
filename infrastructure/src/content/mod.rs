//! Content normalization for fetched bodies
//!
//! | Kind | Detected by | Output |
//! |------|-------------|--------|
//! | Binary | `Content-Type` media family | One-line notice, body never decoded |
//! | HTML | `Content-Type`, or `<!doctype html`/`<html` in the first 500 bytes of an untyped or `text/plain` body | Title + cleaned main region |
//! | JSON | `Content-Type` (`application/json`, `+json`) | Pretty-printed, raw on parse failure |
//! | Text | anything else | As-is |
//!
//! Output is always capped at [`MAX_OUTPUT_BYTES`].

pub mod html;

use serde_json::Value;
use tracing::debug;

/// Cap on normalized output
pub const MAX_OUTPUT_BYTES: usize = 100 * 1024;

/// Cap on HTML handed to the cleaning pipeline
pub const MAX_HTML_BYTES: usize = 5 * 1024 * 1024;

/// Cleaned HTML shorter than this is treated as an unrendered app shell
pub const MIN_EXTRACTED_CHARS: usize = 50;

const SNIFF_BYTES: usize = 500;

const CLIENT_RENDERED_NOTICE: &str = "[This page appears to be rendered client-side with JavaScript; \
no readable content could be extracted from the HTML.]";

const BINARY_APPLICATION_TYPES: &[&str] = &[
    "application/octet-stream",
    "application/pdf",
    "application/zip",
    "application/gzip",
    "application/x-gzip",
    "application/x-tar",
    "application/x-bzip2",
    "application/x-xz",
    "application/zstd",
    "application/x-7z-compressed",
    "application/x-rar-compressed",
    "application/vnd.rar",
    "application/java-archive",
    "application/wasm",
    "application/x-msdownload",
    "application/x-executable",
    "application/x-mach-binary",
    "application/x-sharedlib",
    "application/vnd.ms-fontobject",
    "application/font-woff",
    "application/x-font-ttf",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Html,
    Json,
    Text,
    Binary,
}

impl ContentKind {
    pub fn label(&self) -> &'static str {
        match self {
            ContentKind::Html => "HTML",
            ContentKind::Json => "JSON",
            ContentKind::Text => "Text",
            ContentKind::Binary => "Binary",
        }
    }
}

/// Readable form of a response body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedContent {
    pub kind: ContentKind,
    pub title: Option<String>,
    pub text: String,
    /// Human-readable content type, e.g. `HTML` or `Binary (image/png)`
    pub label: String,
    /// Output hit [`MAX_OUTPUT_BYTES`] (or the input hit [`MAX_HTML_BYTES`])
    pub truncated: bool,
}

pub struct ContentNormalizer;

impl ContentNormalizer {
    /// Classify from the `Content-Type` header, sniffing `prefix` for HTML
    /// when the header is missing or `text/plain`.
    pub fn classify(content_type: Option<&str>, prefix: &[u8]) -> ContentKind {
        let mime = content_type.map(essence).unwrap_or_default();

        if is_binary_mime(&mime) {
            return ContentKind::Binary;
        }
        if mime == "text/html" || mime == "application/xhtml+xml" {
            return ContentKind::Html;
        }
        if mime == "application/json" || mime.ends_with("+json") {
            return ContentKind::Json;
        }
        if (mime.is_empty() || mime == "text/plain") && looks_like_html(prefix) {
            return ContentKind::Html;
        }
        ContentKind::Text
    }

    /// Whether a body of this type should not be downloaded at all
    pub fn is_binary(content_type: Option<&str>) -> bool {
        content_type.map(essence).is_some_and(|m| is_binary_mime(&m))
    }

    /// Notice standing in for a binary body
    pub fn binary_notice(content_type: Option<&str>, content_length: Option<u64>) -> NormalizedContent {
        let mime = content_type.map(essence).unwrap_or_else(|| "unknown".to_string());
        let size = content_length
            .map(|n| format!("{} bytes", n))
            .unwrap_or_else(|| "unknown size".to_string());
        NormalizedContent {
            kind: ContentKind::Binary,
            title: None,
            text: format!("[Binary content ({}, {}) not displayed]", mime, size),
            label: format!("Binary ({})", mime),
            truncated: false,
        }
    }

    /// Turn a raw body into readable text
    pub fn clean(body: &[u8], content_type: Option<&str>) -> NormalizedContent {
        let kind = Self::classify(content_type, body);
        debug!(kind = kind.label(), bytes = body.len(), "Normalizing content");

        let (title, text, input_truncated) = match kind {
            ContentKind::Binary => {
                return Self::binary_notice(content_type, Some(body.len() as u64));
            }
            ContentKind::Html => {
                let raw = String::from_utf8_lossy(body);
                let capped = truncate_at_boundary(&raw, MAX_HTML_BYTES);
                let (title, text) = html::html_to_text(capped);
                let text = if text.chars().count() < MIN_EXTRACTED_CHARS {
                    CLIENT_RENDERED_NOTICE.to_string()
                } else {
                    text
                };
                (title, text, capped.len() < raw.len())
            }
            ContentKind::Json => {
                let text = serde_json::from_slice::<Value>(body)
                    .ok()
                    .and_then(|v| serde_json::to_string_pretty(&v).ok())
                    .unwrap_or_else(|| String::from_utf8_lossy(body).into_owned());
                (None, text, false)
            }
            ContentKind::Text => (None, String::from_utf8_lossy(body).into_owned(), false),
        };

        let (text, output_truncated) = cap_output(text);
        NormalizedContent {
            kind,
            title,
            text,
            label: kind.label().to_string(),
            truncated: input_truncated || output_truncated,
        }
    }
}

/// Lowercased MIME type without parameters
fn essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase()
}

fn is_binary_mime(mime: &str) -> bool {
    ["image/", "audio/", "video/", "font/"]
        .iter()
        .any(|family| mime.starts_with(family))
        || BINARY_APPLICATION_TYPES.contains(&mime)
}

fn looks_like_html(prefix: &[u8]) -> bool {
    let head = &prefix[..prefix.len().min(SNIFF_BYTES)];
    let head = String::from_utf8_lossy(head).to_ascii_lowercase();
    head.contains("<!doctype html") || head.contains("<html")
}

/// Longest prefix of `s` no longer than `max` bytes that ends on a char
/// boundary
pub fn truncate_at_boundary(s: &str, max: usize) -> &str {
    &s[..s.floor_char_boundary(max)]
}

fn cap_output(text: String) -> (String, bool) {
    if text.len() <= MAX_OUTPUT_BYTES {
        return (text, false);
    }
    let total = text.len();
    let kept = truncate_at_boundary(&text, MAX_OUTPUT_BYTES);
    (
        format!(
            "{}\n\n[... truncated at {} bytes, total: {} bytes]",
            kept, MAX_OUTPUT_BYTES, total
        ),
        true,
    )
}
