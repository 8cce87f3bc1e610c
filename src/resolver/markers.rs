//! Text-marker extraction from raw page and metadata bodies.
//!
//! Each function takes a raw body (HTML or JSON text) and returns an optional decoded
//! string. Nothing outside this module depends on the marker grammar.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};

/// Key of the embedded clean-asset reference.
pub const NO_WATERMARK_KEY: &str = "no_watermark";

/// Key of the embedded downloadable (possibly watermarked) reference.
pub const DOWNLOADABLE_KEY: &str = "downloadable_url";

fn compile_static_regex(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid static regex '{pattern}': {e}"))
}

// A JSON string literal or `null`, captured with its quotes so serde_json can decode
// escapes such as `\/` and `\u002F`.
const JSON_VALUE: &str = r#"("(?:[^"\\]|\\.)*"|null)"#;

static NO_WATERMARK_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(&marker_pattern(NO_WATERMARK_KEY)));

static DOWNLOADABLE_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(&marker_pattern(DOWNLOADABLE_KEY)));

static TITLE_RE: LazyLock<Regex> = LazyLock::new(|| compile_static_regex(&marker_pattern("title")));

static OG_TITLE_SELECTOR: LazyLock<Option<Selector>> =
    LazyLock::new(|| Selector::parse(r#"meta[property="og:title"]"#).ok());

static TITLE_SELECTOR: LazyLock<Option<Selector>> =
    LazyLock::new(|| Selector::parse("title").ok());

fn marker_pattern(key: &str) -> String {
    format!(r#""{}"\s*:\s*{JSON_VALUE}"#, regex::escape(key))
}

/// Extracts the clean-asset URL, if the body embeds a non-null, non-empty one.
#[must_use]
pub fn no_watermark_url(body: &str) -> Option<String> {
    first_json_string(&NO_WATERMARK_RE, body)
}

/// Extracts the downloadable (degraded) asset URL.
#[must_use]
pub fn downloadable_url(body: &str) -> Option<String> {
    first_json_string(&DOWNLOADABLE_RE, body)
}

/// First non-empty `"title": "..."` value in the body.
#[must_use]
pub fn json_title(body: &str) -> Option<String> {
    first_json_string(&TITLE_RE, body)
}

/// `og:title` meta content from an HTML document.
#[must_use]
pub fn og_title(html: &str) -> Option<String> {
    let selector = OG_TITLE_SELECTOR.as_ref()?;
    let document = Html::parse_document(html);
    document
        .select(selector)
        .filter_map(|element| element.value().attr("content"))
        .map(str::trim)
        .find(|value| !value.is_empty())
        .map(str::to_string)
}

/// Text of the document `<title>` element.
#[must_use]
pub fn document_title(html: &str) -> Option<String> {
    let selector = TITLE_SELECTOR.as_ref()?;
    let document = Html::parse_document(html);
    document
        .select(selector)
        .map(|element| element.text().collect::<String>())
        .map(|text| text.trim().to_string())
        .find(|text| !text.is_empty())
}

/// Page title in priority order: `og:title`, a `"title"` JSON field, `<title>`.
#[must_use]
pub fn page_title(html: &str) -> Option<String> {
    og_title(html)
        .or_else(|| json_title(html))
        .or_else(|| document_title(html))
}

fn first_json_string(re: &Regex, body: &str) -> Option<String> {
    re.captures_iter(body)
        .filter_map(|caps| caps.get(1))
        .filter_map(|m| decode_json_string(m.as_str()))
        .next()
}

fn decode_json_string(literal: &str) -> Option<String> {
    if literal == "null" {
        return None;
    }
    let decoded: String = serde_json::from_str(literal).ok()?;
    let trimmed = decoded.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("null") {
        None
    } else {
        Some(trimmed.to_string())
    }
}
