//! HTML normalization applied to every decoded body.
//!
//! [`sanitize_html`] runs a fixed sequence of passes; later passes rely on
//! artifacts of earlier ones:
//!
//! 1. image embed cards become `<img>` elements
//! 2. remaining embed cards become short placeholder paragraphs, or vanish
//! 3. styling, tracking and provider-internal attributes are stripped
//! 4. inline wrappers left without attributes are unwrapped
//! 5. paragraphs with neither text nor images collapse to `<br>` or vanish
//! 6. runs of line breaks collapse to one
//! 7. media references are trimmed, resolved, proxied and marked no-referrer
//!
//! Element-level passes use `lol_html`; the structural cleanups are regex
//! passes over non-nesting elements.

use std::sync::LazyLock;

use lol_html::html_content::ContentType;
use percent_encoding::percent_decode_str;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use crate::article::{escape_attr, escape_text};
use crate::decode::decode_entities;
use crate::media::{MediaProxy, NO_REFERRER, REFERRER_POLICY_ATTR};
use crate::{Result, SyndicError};

/// Tag name of the provider embed element.
pub const EMBED_TAG: &str = "card";

/// Prefix stripped from embed descriptors before percent-decoding.
const DESCRIPTOR_SCHEME: &str = "data:";

// The start tag must not end in `/>`: self-closing cards have no content and
// are removed with the stray tags.
static CARD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<card\b(?:[^>]*[^/>])?>(.*?)</card\s*>").unwrap());
static STRAY_CARD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)</?card\b[^>]*>").unwrap());
static PARAGRAPH_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?is)<p(?:\s[^>]*)?>(.*?)</p\s*>").unwrap());
static SINGLE_BR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)^\s*<br\s*/?>\s*$").unwrap());
static DOUBLE_BR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>(\s*)<br\s*/?>").unwrap());
static IMAGE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<(?:img|picture|video|svg)\b").unwrap());
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());

/// Configuration for HTML sanitizing.
#[derive(Debug, Clone)]
pub struct SanitizeConfig {
    /// Attribute names removed from every element.
    pub stripped_attributes: Vec<String>,
    /// Attribute name prefixes removed from every element.
    pub stripped_attribute_prefixes: Vec<String>,
    /// Inline wrappers unwrapped once they carry no attributes.
    pub inline_wrappers: Vec<String>,
    /// Maximum characters kept in an embed placeholder.
    pub placeholder_len: usize,
    /// Media proxy applied to image sources.
    pub media: MediaProxy,
    /// Base URL for converting relative URLs
    pub base_url: Option<Url>,
}

impl Default for SanitizeConfig {
    fn default() -> Self {
        Self {
            stripped_attributes: ["class", "id", "style", "data-id", "data-lake-id", "data-card-type"]
                .into_iter()
                .map(String::from)
                .collect(),
            stripped_attribute_prefixes: vec!["data-lake".to_string()],
            inline_wrappers: vec!["span".to_string(), "font".to_string()],
            placeholder_len: 50,
            media: MediaProxy::default(),
            base_url: None,
        }
    }
}

impl SanitizeConfig {
    /// Returns a copy resolving relative URLs against `base_url`.
    pub fn with_base_url(&self, base_url: Option<Url>) -> Self {
        Self { base_url, ..self.clone() }
    }

    fn strips(&self, name: &str) -> bool {
        self.stripped_attributes.iter().any(|a| a.eq_ignore_ascii_case(name))
            || self.stripped_attribute_prefixes.iter().any(|p| name.starts_with(p.as_str()))
    }

    fn is_wrapper(&self, tag: &str) -> bool {
        self.inline_wrappers.iter().any(|w| w.eq_ignore_ascii_case(tag))
    }
}

/// Image fields carried by an image embed card.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EmbedImage {
    pub src: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "dimension")]
    pub width: Option<u64>,
    #[serde(default, deserialize_with = "dimension")]
    pub height: Option<u64>,
}

fn dimension<'de, D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Option<u64>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f.round() as u64)),
        Value::String(s) => s.trim().trim_end_matches("px").parse::<f64>().ok().map(|f| f.round() as u64),
        _ => None,
    }))
}

impl EmbedImage {
    fn to_html(&self) -> String {
        let mut img = format!(r#"<img src="{}""#, escape_attr(self.src.trim()));
        if let Some(name) = self.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            img.push_str(&format!(r#" alt="{}""#, escape_attr(name)));
        }
        if let Some(width) = self.width {
            img.push_str(&format!(r#" width="{width}""#));
        }
        if let Some(height) = self.height {
            img.push_str(&format!(r#" height="{height}""#));
        }
        img.push_str(&format!(r#" {REFERRER_POLICY_ATTR}="{NO_REFERRER}">"#));
        img
    }
}

/// Decodes an image card's descriptor attribute.
///
/// The value is URL-encoded JSON, optionally prefixed with `data:`.
///
/// # Errors
///
/// Returns [`SyndicError::EmbedDescriptor`] when the value does not decode to
/// an object with a non-blank `src`.
pub fn parse_embed_descriptor(value: &str) -> Result<EmbedImage> {
    let value = decode_entities(value.trim());
    let encoded = value.strip_prefix(DESCRIPTOR_SCHEME).unwrap_or(&value);
    let json = percent_decode_str(encoded)
        .decode_utf8()
        .map_err(|e| SyndicError::EmbedDescriptor(format!("invalid UTF-8: {e}")))?;
    let image: EmbedImage =
        serde_json::from_str(&json).map_err(|e| SyndicError::EmbedDescriptor(format!("invalid JSON: {e}")))?;
    if image.src.trim().is_empty() {
        return Err(SyndicError::EmbedDescriptor("missing src".to_string()));
    }
    Ok(image)
}

macro_rules! rewrite {
    ($html:expr, [$($handler:expr),+ $(,)?]) => {{
        let mut output = Vec::with_capacity($html.len());
        let result = {
            let mut rewriter = lol_html::HtmlRewriter::new(
                lol_html::Settings { element_content_handlers: vec![$($handler),+], ..Default::default() },
                |c: &[u8]| output.extend_from_slice(c),
            );
            rewriter.write($html.as_bytes()).and_then(|_| rewriter.end())
        };
        result
            .map_err(|e| SyndicError::HtmlParseError(e.to_string()))
            .and_then(|_| String::from_utf8(output).map_err(|e| SyndicError::HtmlParseError(e.to_string())))
    }};
}

/// Sanitizes HTML from any decode path.
///
/// # Errors
///
/// Returns [`SyndicError::HtmlParseError`] if the rewriter fails. No partially
/// rewritten output is returned in that case.
pub fn sanitize_html(html: &str, config: &SanitizeConfig) -> Result<String> {
    let mut processed = convert_image_cards(html)?;
    processed = replace_embed_cards(&processed, config.placeholder_len);
    processed = strip_attributes(&processed, config)?;
    processed = collapse_degenerate_paragraphs(&processed);
    processed = collapse_line_breaks(&processed);
    rewrite_media(&processed, config)
}

/// Replaces image cards with `<img>`; cards with bad descriptors are dropped.
fn convert_image_cards(html: &str) -> Result<String> {
    if !html.contains("<card") {
        return Ok(html.to_string());
    }

    rewrite!(html, [lol_html::element!(r#"card[name="image"]"#, |el| {
        match el.get_attribute("value").as_deref().map(parse_embed_descriptor) {
            Some(Ok(image)) => el.replace(&image.to_html(), ContentType::Html),
            Some(Err(e)) => {
                tracing::warn!(error = %e, "dropping image card");
                el.remove();
            }
            None => {
                tracing::warn!("dropping image card without descriptor");
                el.remove();
            }
        }
        Ok(())
    })])
}

/// Replaces any remaining embed card with a placeholder built from its text.
fn replace_embed_cards(html: &str, max_chars: usize) -> String {
    if !html.contains("<card") {
        return html.to_string();
    }

    let replaced = CARD_RE.replace_all(html, |caps: &regex::Captures| {
        let inner = caps.get(1).map(|m| m.as_str()).unwrap_or("");
        let text = flattened_text(inner);
        if text.is_empty() {
            return String::new();
        }
        let mut placeholder: String = text.chars().take(max_chars).collect();
        if text.chars().count() > max_chars {
            placeholder.push('…');
        }
        format!("<p>{}</p>", escape_text(&placeholder))
    });
    STRAY_CARD_RE.replace_all(&replaced, "").to_string()
}

/// Removes configured attributes and unwraps bare inline wrappers.
fn strip_attributes(html: &str, config: &SanitizeConfig) -> Result<String> {
    rewrite!(html, [lol_html::element!("*", |el| {
        let doomed: Vec<String> =
            el.attributes().iter().map(|a| a.name()).filter(|name| config.strips(name)).collect();
        for name in doomed {
            el.remove_attribute(&name);
        }
        if config.is_wrapper(&el.tag_name()) && el.attributes().is_empty() {
            el.remove_and_keep_content();
        }
        Ok(())
    })])
}

/// Paragraphs without text or images become a single `<br>` or are removed.
fn collapse_degenerate_paragraphs(html: &str) -> String {
    PARAGRAPH_RE
        .replace_all(html, |caps: &regex::Captures| {
            let whole = caps.get(0).map(|m| m.as_str()).unwrap_or("");
            let inner = caps.get(1).map(|m| m.as_str()).unwrap_or("");
            if !flattened_text(inner).is_empty() || IMAGE_RE.is_match(inner) {
                whole.to_string()
            } else if SINGLE_BR_RE.is_match(inner) {
                "<br>".to_string()
            } else {
                String::new()
            }
        })
        .to_string()
}

/// Removes a line break immediately followed by another.
fn collapse_line_breaks(html: &str) -> String {
    let mut result = html.to_string();
    loop {
        let next = DOUBLE_BR_RE.replace_all(&result, "$1<br>").to_string();
        if next == result {
            return result;
        }
        result = next;
    }
}

/// Trims, resolves and proxies media and link URLs.
fn rewrite_media(html: &str, config: &SanitizeConfig) -> Result<String> {
    let base = config.base_url.as_ref();
    let media = &config.media;

    rewrite!(html, [
        lol_html::element!("img", |el| {
            // Attribute values come back still entity-encoded and are written
            // back verbatim, so decode before rewriting and escape after.
            if let Some(src) = el.get_attribute("src") {
                el.set_attribute("src", &escape_attr(&media.rewrite(&decode_entities(&src), base))).ok();
            }
            if let Some(srcset) = el.get_attribute("srcset") {
                el.set_attribute("srcset", &escape_attr(&rewrite_srcset(&decode_entities(&srcset), media, base))).ok();
            }
            el.set_attribute(REFERRER_POLICY_ATTR, NO_REFERRER).ok();
            Ok(())
        }),
        lol_html::element!("a[href]", |el| {
            if let Some(href) = el.get_attribute("href") {
                let href = decode_entities(&href);
                let trimmed = href.trim();
                let resolved = match base {
                    Some(base) if !trimmed.starts_with('#') => {
                        base.join(trimmed).map(|u| u.to_string()).unwrap_or_else(|_| trimmed.to_string())
                    }
                    _ => trimmed.to_string(),
                };
                el.set_attribute("href", &escape_attr(&resolved)).ok();
            }
            Ok(())
        }),
    ])
}

fn rewrite_srcset(srcset: &str, media: &MediaProxy, base: Option<&Url>) -> String {
    srcset
        .split(',')
        .map(str::trim)
        .filter(|candidate| !candidate.is_empty())
        .map(|candidate| match candidate.split_once(char::is_whitespace) {
            Some((url, descriptor)) => format!("{} {}", media.rewrite(url, base), descriptor.trim()),
            None => media.rewrite(candidate, base),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Text of an HTML snippet with tags removed, entities decoded and
/// whitespace collapsed.
fn flattened_text(html: &str) -> String {
    let text = decode_entities(&TAG_RE.replace_all(html, " "));
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
