//! Classification of raw detail payloads.
//!
//! [`detect`] inspects a [`RawContentFragment`] and returns exactly one
//! [`EncodingShape`], together with the located payload so the matching
//! decoder does not need to search again. Checks run in a fixed order and the
//! first match wins:
//!
//! 1. a `NAME.FIELD = '<payload>';` assignment → [`EncodingShape::AssignedLiteral`]
//! 2. the content value is a JSON object or array → [`EncodingShape::JsonAst`]
//! 3. a known container already holds rendered HTML → [`EncodingShape::InlineHtml`]
//! 4. only an external URL references the content → [`EncodingShape::ExternalRef`]
//! 5. otherwise → [`EncodingShape::Unknown`], which keeps the teaser.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use url::Url;

use crate::decode::literal::{Assignment, AssignmentPattern, find_assignment, find_assignments};
use crate::parse::Document;

/// JSON pointers tried for the content value when no hint is given.
const DEFAULT_CONTENT_POINTERS: &[&str] = &["/content", "/data/content", "/content/rendered", "/body", "/html"];

/// JSON pointers tried for a secondary content URL when no hint is given.
const DEFAULT_EXTERNAL_POINTERS: &[&str] = &["/content_url", "/data/content_url", "/contentUrl"];

static SCRIPT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?is)<script[^>]*>(.*?)</script>").unwrap());

/// Containers tried for inline HTML when no hint is given.
const DEFAULT_CONTAINERS: &[&str] = &[
    "article",
    ".article-content",
    ".post-content",
    ".entry-content",
    "#js_content",
    "main",
];

/// A detail payload as fetched, before classification.
#[derive(Debug, Clone, PartialEq)]
pub enum RawContentFragment {
    /// An HTML page, a bare HTML fragment or a script payload.
    Text(String),
    /// A parsed API response.
    Json(Value),
}

impl RawContentFragment {
    /// Builds a fragment from a response body.
    ///
    /// Bodies declared as JSON, or that parse as a JSON object, become
    /// [`RawContentFragment::Json`]; everything else stays text.
    pub fn from_body(body: String, content_type: Option<&str>) -> Self {
        let declared_json = content_type.is_some_and(|ct| ct.to_ascii_lowercase().contains("json"));
        let trimmed = body.trim_start();
        if (declared_json || trimmed.starts_with('{'))
            && let Ok(value) = serde_json::from_str::<Value>(&body)
        {
            return RawContentFragment::Json(value);
        }
        RawContentFragment::Text(body)
    }

    /// Raw text suitable for logging.
    pub fn to_raw_string(&self) -> String {
        match self {
            RawContentFragment::Text(text) => text.clone(),
            RawContentFragment::Json(value) => value.to_string(),
        }
    }
}

/// Source-specific knowledge that steers detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceHints {
    /// JSON pointer of the content value, e.g. `/data/content`.
    pub content_field: Option<String>,
    /// JSON pointer of a secondary content URL, e.g. `/data/content_url`.
    pub external_field: Option<String>,
    /// Assignment carrying a quoted body, e.g. `GLOBAL_CONFIG.larkContent`.
    pub assignment: Option<AssignmentPattern>,
    /// CSS selector of the container holding a rendered body.
    pub container: Option<String>,
    /// Whether an external content URL may be reported.
    pub follow_external: bool,
}

impl Default for SourceHints {
    fn default() -> Self {
        Self { content_field: None, external_field: None, assignment: None, container: None, follow_external: true }
    }
}

impl SourceHints {
    pub fn content_field(mut self, pointer: impl Into<String>) -> Self {
        self.content_field = Some(pointer.into());
        self
    }

    pub fn external_field(mut self, pointer: impl Into<String>) -> Self {
        self.external_field = Some(pointer.into());
        self
    }

    pub fn assignment(mut self, pattern: AssignmentPattern) -> Self {
        self.assignment = Some(pattern);
        self
    }

    pub fn container(mut self, selector: impl Into<String>) -> Self {
        self.container = Some(selector.into());
        self
    }

    /// Hints for a body fetched through an external reference.
    ///
    /// Field pointers fall back to the defaults and references are not
    /// reported again, so at most one hop is followed.
    pub fn without_external(&self) -> Self {
        Self { content_field: None, external_field: None, follow_external: false, ..self.clone() }
    }
}

/// Result of classification.
#[derive(Debug, Clone, PartialEq)]
pub enum EncodingShape {
    /// Ready HTML taken from a container or content field.
    InlineHtml(String),
    /// A quoted literal assignment still to be unescaped.
    AssignedLiteral(Assignment),
    /// A JSON document tree.
    JsonAst(Value),
    /// The content lives at another URL.
    ExternalRef(Url),
    /// Nothing recognisable; the teaser is kept.
    Unknown,
}

impl EncodingShape {
    /// Short tag used in logs.
    pub fn tag(&self) -> &'static str {
        match self {
            EncodingShape::InlineHtml(_) => "inline-html",
            EncodingShape::AssignedLiteral(_) => "assigned-literal",
            EncodingShape::JsonAst(_) => "json-ast",
            EncodingShape::ExternalRef(_) => "external-ref",
            EncodingShape::Unknown => "unknown",
        }
    }
}

/// Classifies a fragment.
pub fn detect(fragment: &RawContentFragment, hints: &SourceHints) -> EncodingShape {
    match fragment {
        RawContentFragment::Text(text) => detect_text(text, hints),
        RawContentFragment::Json(value) => detect_json(value, hints),
    }
}

fn detect_text(text: &str, hints: &SourceHints) -> EncodingShape {
    if let Some(assignment) = find_literal(text, hints) {
        return EncodingShape::AssignedLiteral(assignment);
    }

    let trimmed = text.trim();
    if (trimmed.starts_with('{') || trimmed.starts_with('['))
        && let Ok(value) = serde_json::from_str::<Value>(trimmed)
    {
        return detect_json(&value, hints);
    }

    if let Some(html) = find_container(text, hints) {
        return EncodingShape::InlineHtml(html);
    }

    if let Some(url) = bare_url(trimmed) {
        return if hints.follow_external { EncodingShape::ExternalRef(url) } else { EncodingShape::Unknown };
    }

    EncodingShape::Unknown
}

fn detect_json(value: &Value, hints: &SourceHints) -> EncodingShape {
    let is_tree = value.get("type").is_some_and(Value::is_string) && value.get("content").is_some_and(Value::is_array);
    if is_tree || value.is_array() {
        return EncodingShape::JsonAst(value.clone());
    }

    let content = content_value(value, hints);

    if let Some(Value::String(text)) = content
        && let Some(assignment) = find_literal(text, hints)
    {
        return EncodingShape::AssignedLiteral(assignment);
    }

    match content {
        Some(node @ (Value::Object(_) | Value::Array(_))) => return EncodingShape::JsonAst(node.clone()),
        Some(Value::String(text)) => {
            let trimmed = text.trim();
            if (trimmed.starts_with('{') || trimmed.starts_with('['))
                && let Ok(parsed) = serde_json::from_str::<Value>(trimmed)
                && (parsed.is_object() || parsed.is_array())
            {
                return EncodingShape::JsonAst(parsed);
            }
            if !trimmed.is_empty() && bare_url(trimmed).is_none() {
                return EncodingShape::InlineHtml(text.clone());
            }
        }
        _ => {}
    }

    if hints.follow_external {
        let external = match hints.external_field.as_deref() {
            Some(pointer) => value.pointer(pointer),
            None => DEFAULT_EXTERNAL_POINTERS.iter().find_map(|p| value.pointer(p)),
        };
        if let Some(url) = external.and_then(Value::as_str).and_then(bare_url) {
            return EncodingShape::ExternalRef(url);
        }
        if let Some(Value::String(text)) = content
            && let Some(url) = bare_url(text.trim())
        {
            return EncodingShape::ExternalRef(url);
        }
    }

    EncodingShape::Unknown
}

fn content_value<'a>(value: &'a Value, hints: &SourceHints) -> Option<&'a Value> {
    match hints.content_field.as_deref() {
        Some(pointer) => value.pointer(pointer),
        None => DEFAULT_CONTENT_POINTERS
            .iter()
            .filter_map(|p| value.pointer(p))
            .find(|v| !v.is_null() && v.as_str().is_none_or(|s| !s.trim().is_empty())),
    }
    .filter(|v| !v.is_null())
}

fn find_literal(text: &str, hints: &SourceHints) -> Option<Assignment> {
    match &hints.assignment {
        Some(pattern) => find_assignment(text, pattern),
        // Without a hint only assignments that carry markup count, so stray
        // script statements fall through to the container check.
        None if text.contains("<script") => SCRIPT_RE
            .captures_iter(text)
            .filter_map(|caps| caps.get(1))
            .flat_map(|body| find_assignments(body.as_str(), &AssignmentPattern::default()))
            .find(Assignment::carries_markup),
        None if !text.trim_start().starts_with('<') => find_assignments(text, &AssignmentPattern::default())
            .into_iter()
            .find(Assignment::carries_markup),
        None => None,
    }
}

fn find_container(text: &str, hints: &SourceHints) -> Option<String> {
    let looks_like_page = {
        let head = text.trim_start().get(..512).unwrap_or(text.trim_start()).to_ascii_lowercase();
        head.starts_with("<!doctype") || head.contains("<html") || head.contains("<body")
    };

    if !looks_like_page {
        let trimmed = text.trim();
        return (trimmed.starts_with('<') && trimmed.ends_with('>')).then(|| trimmed.to_string());
    }

    let doc = Document::parse(text);
    let selectors: Vec<&str> = match hints.container.as_deref() {
        Some(selector) => vec![selector],
        None => DEFAULT_CONTAINERS.to_vec(),
    };

    selectors.into_iter().find_map(|selector| {
        doc.select_first(selector)
            .ok()
            .flatten()
            .map(|el| el.inner_html())
            .filter(|html| !html.trim().is_empty())
    })
}

fn bare_url(text: &str) -> Option<Url> {
    if text.is_empty() || text.chars().any(char::is_whitespace) {
        return None;
    }
    Url::parse(text).ok().filter(|u| matches!(u.scheme(), "http" | "https"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn text(s: &str) -> RawContentFragment {
        RawContentFragment::Text(s.to_string())
    }

    #[test]
    fn test_assignment_wins_over_container() {
        let page = r#"<html><body><article><p>teaser</p></article>
            <script>GLOBAL_CONFIG.larkContent = '&lt;p&gt;full&lt;/p&gt;';</script></body></html>"#;
        let hints = SourceHints::default().assignment(AssignmentPattern::new("GLOBAL_CONFIG", "larkContent"));
        assert_eq!(detect(&text(page), &hints).tag(), "assigned-literal");
    }

    #[test]
    fn test_assignment_found_in_script_without_hint() {
        let page = r"<html><script>window.ga = 'UA-1';</script><script>window.body = '\x3cp\x3ex\x3c/p\x3e';</script></html>";
        match detect(&text(page), &SourceHints::default()) {
            EncodingShape::AssignedLiteral(a) => {
                assert_eq!(a.field, "body");
                assert_eq!(a.payload, r"\x3cp\x3ex\x3c/p\x3e");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_plain_script_assignment_does_not_hide_container() {
        let page = "<html><body><article><p>Real article body here</p></article>\
            <script>document.domain = 'example.com';</script></body></html>";
        assert_eq!(
            detect(&text(page), &SourceHints::default()),
            EncodingShape::InlineHtml("<p>Real article body here</p>".to_string())
        );
    }

    #[test]
    fn test_hinted_assignment_needs_no_markup() {
        let page = "<html><script>document.domain = 'example.com';</script></html>";
        let hints = SourceHints::default().assignment(AssignmentPattern::new("document", "domain"));
        assert_eq!(detect(&text(page), &hints).tag(), "assigned-literal");
    }

    #[test]
    fn test_json_string_content_is_ast() {
        let body = json!({"data": {"content": "{\"type\":\"doc\",\"content\":[]}"}});
        let hints = SourceHints::default().content_field("/data/content");
        assert_eq!(detect(&RawContentFragment::Json(body), &hints).tag(), "json-ast");
    }

    #[test]
    fn test_json_object_content_is_ast() {
        let body = json!({"content": {"type": "doc", "content": []}});
        assert!(matches!(detect(&RawContentFragment::Json(body), &SourceHints::default()), EncodingShape::JsonAst(_)));
    }

    #[test]
    fn test_json_html_content_is_inline() {
        let body = json!({"content": {"rendered": "<p>Hello</p>"}, "title": {"rendered": "T"}});
        let hints = SourceHints::default().content_field("/content/rendered");
        assert_eq!(
            detect(&RawContentFragment::Json(body), &hints),
            EncodingShape::InlineHtml("<p>Hello</p>".to_string())
        );
    }

    #[test]
    fn test_container_in_page() {
        let page = "<!DOCTYPE html><html><body><div class=\"nav\">x</div><div class=\"post-content\"><p>Body</p></div></body></html>";
        assert_eq!(
            detect(&text(page), &SourceHints::default()),
            EncodingShape::InlineHtml("<p>Body</p>".to_string())
        );
        let hinted = SourceHints::default().container(".nav");
        assert_eq!(detect(&text(page), &hinted), EncodingShape::InlineHtml("x".to_string()));
    }

    #[test]
    fn test_bare_fragment_is_inline() {
        assert_eq!(detect(&text(" <p>Hi</p> "), &SourceHints::default()).tag(), "inline-html");
    }

    #[test]
    fn test_external_ref() {
        let body = json!({"data": {"content": "", "content_url": "https://static.example.com/a.json"}});
        match detect(&RawContentFragment::Json(body.clone()), &SourceHints::default()) {
            EncodingShape::ExternalRef(url) => assert_eq!(url.as_str(), "https://static.example.com/a.json"),
            other => panic!("unexpected {other:?}"),
        }
        let hints = SourceHints::default().without_external();
        assert_eq!(detect(&RawContentFragment::Json(body), &hints), EncodingShape::Unknown);
    }

    #[test]
    fn test_unknown() {
        assert_eq!(detect(&text("plain words only"), &SourceHints::default()), EncodingShape::Unknown);
        assert_eq!(detect(&RawContentFragment::Json(json!({"id": 1})), &SourceHints::default()), EncodingShape::Unknown);
        let empty_page = "<html><body><div>nothing marked up</div></body></html>";
        assert_eq!(detect(&text(empty_page), &SourceHints::default()), EncodingShape::Unknown);
    }

    #[test]
    fn test_from_body() {
        assert!(matches!(
            RawContentFragment::from_body("{\"a\":1}".into(), None),
            RawContentFragment::Json(_)
        ));
        assert!(matches!(
            RawContentFragment::from_body("[1]".into(), Some("application/json; charset=utf-8")),
            RawContentFragment::Json(_)
        ));
        assert!(matches!(RawContentFragment::from_body("<p>x</p>".into(), None), RawContentFragment::Text(_)));
    }
}
