//! Article records flowing into and out of the pipeline.
//!
//! [`ArticleSummary`] is what a list page yields: a key, some metadata and a
//! short teaser. [`NormalizedArticle`] is the final feed item, carrying either
//! the full sanitized body or the teaser when anything went wrong.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// One entry of an article list, produced before any detail fetch.
///
/// Immutable once handed to the pipeline. The `link` doubles as the cache key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleSummary {
    /// Source-native identifier (a uuid, a slug or the link itself).
    pub id: String,
    /// Canonical absolute URL of the article.
    pub link: String,
    /// Title as shown in the list.
    pub title: String,
    /// Author as shown in the list, possibly empty.
    pub author: String,
    /// Publication timestamp when the list exposes one.
    #[serde(with = "time::serde::rfc3339::option")]
    pub published_at: Option<OffsetDateTime>,
    /// Short summary text used when the full body cannot be produced.
    pub teaser: String,
    /// Categories known from the list page.
    pub categories: Vec<String>,
}

impl ArticleSummary {
    /// Creates a summary with the required fields; the rest start empty.
    pub fn new(id: impl Into<String>, link: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            link: link.into(),
            title: title.into(),
            author: String::new(),
            published_at: None,
            teaser: String::new(),
            categories: Vec::new(),
        }
    }

    /// Sets the teaser text.
    pub fn with_teaser(mut self, teaser: impl Into<String>) -> Self {
        self.teaser = teaser.into();
        self
    }

    /// Sets the author.
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    /// Sets the publication timestamp.
    pub fn with_published_at(mut self, published_at: OffsetDateTime) -> Self {
        self.published_at = Some(published_at);
        self
    }

    /// Sets the categories.
    pub fn with_categories(mut self, categories: Vec<String>) -> Self {
        self.categories = categories;
        self
    }

    /// Key under which the pipeline memoizes this article.
    pub fn cache_key(&self) -> &str {
        &self.link
    }

    /// Teaser body, guaranteed non-empty.
    ///
    /// Falls back to the escaped title, then to the link, when the list page
    /// provided no teaser at all.
    pub fn fallback_body(&self) -> String {
        [self.teaser.trim(), self.title.trim(), self.link.trim()]
            .into_iter()
            .find(|s| !s.is_empty())
            .map(escape_text)
            .unwrap_or_else(|| "&nbsp;".to_string())
    }
}

/// Metadata discovered on the detail payload that supersedes the list's.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetailOverrides {
    pub title: Option<String>,
    pub author: Option<String>,
    pub categories: Option<Vec<String>>,
}

/// Where the body of a [`NormalizedArticle`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BodyOrigin {
    /// Full content decoded, rendered and sanitized.
    Full,
    /// The teaser was kept.
    #[default]
    Teaser,
}

/// Final output record merged into the feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedArticle {
    pub title: String,
    pub author: String,
    #[serde(with = "time::serde::rfc3339::option")]
    pub published_at: Option<OffsetDateTime>,
    /// Absolute canonical link.
    pub link: String,
    /// Never empty.
    pub body_html: String,
    pub categories: Vec<String>,
    #[serde(skip)]
    pub origin: BodyOrigin,
}

impl NormalizedArticle {
    /// Builds an item carrying the full sanitized body.
    ///
    /// An empty body is treated as a failure and the teaser is used instead.
    pub fn full(summary: &ArticleSummary, overrides: DetailOverrides, body_html: String) -> Self {
        if body_html.trim().is_empty() {
            return Self::teaser(summary);
        }

        let DetailOverrides { title, author, categories } = overrides;
        Self {
            title: title.filter(|t| !t.trim().is_empty()).unwrap_or_else(|| summary.title.clone()),
            author: author.filter(|a| !a.trim().is_empty()).unwrap_or_else(|| summary.author.clone()),
            published_at: summary.published_at,
            link: summary.link.clone(),
            body_html,
            categories: categories.unwrap_or_else(|| summary.categories.clone()),
            origin: BodyOrigin::Full,
        }
    }

    /// Builds an item that keeps the teaser.
    pub fn teaser(summary: &ArticleSummary) -> Self {
        Self {
            title: summary.title.clone(),
            author: summary.author.clone(),
            published_at: summary.published_at,
            link: summary.link.clone(),
            body_html: summary.fallback_body(),
            categories: summary.categories.clone(),
            origin: BodyOrigin::Teaser,
        }
    }

    /// Returns true when the full body was produced.
    pub fn is_full(&self) -> bool {
        self.origin == BodyOrigin::Full
    }
}

/// Escapes text for use inside an HTML element.
pub(crate) fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Escapes text for use inside a double-quoted HTML attribute.
pub(crate) fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary() -> ArticleSummary {
        ArticleSummary::new("42", "https://example.com/a/42", "Title")
            .with_teaser("Short teaser")
            .with_author("Ada")
            .with_categories(vec!["rust".into()])
    }

    #[test]
    fn test_teaser_keeps_summary_fields() {
        let item = NormalizedArticle::teaser(&summary());
        assert_eq!(item.body_html, "Short teaser");
        assert_eq!(item.title, "Title");
        assert_eq!(item.author, "Ada");
        assert!(!item.is_full());
    }

    #[test]
    fn test_full_applies_overrides() {
        let overrides = DetailOverrides {
            title: Some("Detail title".into()),
            author: Some("  ".into()),
            categories: Some(vec!["a".into(), "b".into()]),
        };
        let item = NormalizedArticle::full(&summary(), overrides, "<p>Body</p>".into());
        assert_eq!(item.title, "Detail title");
        assert_eq!(item.author, "Ada");
        assert_eq!(item.categories, vec!["a", "b"]);
        assert!(item.is_full());
    }

    #[test]
    fn test_full_with_blank_body_falls_back() {
        let item = NormalizedArticle::full(&summary(), DetailOverrides::default(), "   ".into());
        assert_eq!(item.body_html, "Short teaser");
        assert!(!item.is_full());
    }

    #[test]
    fn test_fallback_body_never_empty() {
        let bare = ArticleSummary::new("1", "https://example.com/1", "A <b> title");
        assert_eq!(bare.fallback_body(), "A &lt;b&gt; title");

        let nothing = ArticleSummary::new("", "", "");
        assert!(!nothing.fallback_body().is_empty());
    }

    #[test]
    fn test_serialization_uses_rfc3339() {
        let published = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        let item = NormalizedArticle::teaser(&summary().with_published_at(published));
        let json = serde_json::to_string(&item).unwrap();
        assert!(json.contains(r#""published_at":"2023-11-14T22:13:20Z""#));
        assert!(json.contains(r#""body_html":"Short teaser""#));
        assert!(!json.contains("origin"));
    }

    #[test]
    fn test_escape_attr() {
        assert_eq!(escape_attr(r#"a"b&c"#), "a&quot;b&amp;c");
    }
}
