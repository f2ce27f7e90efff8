//! RSS 2.0 serialization.
//!
//! Bodies go into `<description>` wrapped in CDATA, matching what most feed
//! readers expect from HTML-bearing feeds.

use std::fmt::Write;

use time::OffsetDateTime;
use time::format_description::well_known::Rfc2822;

use crate::article::{NormalizedArticle, escape_text};
use crate::formatters::Feed;
use crate::{Result, SyndicError};

/// Configuration for RSS output
#[derive(Debug, Clone)]
pub struct RssConfig {
    /// Value of the channel `<generator>` element
    pub generator: String,
    /// Channel `<ttl>` in minutes
    pub ttl_minutes: Option<u32>,
    /// Channel `<language>`
    pub language: Option<String>,
}

impl Default for RssConfig {
    fn default() -> Self {
        Self { generator: "syndic".to_string(), ttl_minutes: None, language: None }
    }
}

fn rfc2822(at: OffsetDateTime) -> Result<String> {
    at.format(&Rfc2822).map_err(|e| SyndicError::ConfigError(e.to_string()))
}

/// Wraps `text` in CDATA, splitting any `]]>` it contains.
fn cdata(text: &str) -> String {
    format!("<![CDATA[{}]]>", text.replace("]]>", "]]]]><![CDATA[>"))
}

fn element(out: &mut String, indent: &str, name: &str, text: &str) -> std::fmt::Result {
    writeln!(out, "{indent}<{name}>{}</{name}>", escape_text(text))
}

fn write_item(out: &mut String, item: &NormalizedArticle) -> Result<()> {
    let fmt = |e: std::fmt::Error| SyndicError::ConfigError(e.to_string());

    writeln!(out, "    <item>").map_err(fmt)?;
    element(out, "      ", "title", &item.title).map_err(fmt)?;
    element(out, "      ", "link", &item.link).map_err(fmt)?;
    writeln!(out, "      <guid isPermaLink=\"true\">{}</guid>", escape_text(&item.link)).map_err(fmt)?;
    if !item.author.trim().is_empty() {
        element(out, "      ", "dc:creator", &item.author).map_err(fmt)?;
    }
    if let Some(published_at) = item.published_at {
        element(out, "      ", "pubDate", &rfc2822(published_at)?).map_err(fmt)?;
    }
    for category in item.categories.iter().filter(|c| !c.trim().is_empty()) {
        element(out, "      ", "category", category).map_err(fmt)?;
    }
    writeln!(out, "      <description>{}</description>", cdata(&item.body_html)).map_err(fmt)?;
    writeln!(out, "    </item>").map_err(fmt)?;
    Ok(())
}

/// Convert a feed to an RSS 2.0 document
pub fn convert_to_rss(feed: &Feed, config: &RssConfig) -> Result<String> {
    let fmt = |e: std::fmt::Error| SyndicError::ConfigError(e.to_string());
    let mut out = String::new();

    writeln!(out, r#"<?xml version="1.0" encoding="UTF-8"?>"#).map_err(fmt)?;
    writeln!(out, r#"<rss version="2.0" xmlns:dc="http://purl.org/dc/elements/1.1/">"#).map_err(fmt)?;
    writeln!(out, "  <channel>").map_err(fmt)?;
    element(&mut out, "    ", "title", &feed.title).map_err(fmt)?;
    element(&mut out, "    ", "link", &feed.link).map_err(fmt)?;
    element(&mut out, "    ", "description", &feed.description).map_err(fmt)?;
    if let Some(language) = &config.language {
        element(&mut out, "    ", "language", language).map_err(fmt)?;
    }
    element(&mut out, "    ", "generator", &config.generator).map_err(fmt)?;
    element(&mut out, "    ", "lastBuildDate", &rfc2822(OffsetDateTime::now_utc())?).map_err(fmt)?;
    if let Some(ttl) = config.ttl_minutes {
        writeln!(out, "    <ttl>{ttl}</ttl>").map_err(fmt)?;
    }

    for item in &feed.items {
        write_item(&mut out, item)?;
    }

    writeln!(out, "  </channel>").map_err(fmt)?;
    writeln!(out, "</rss>").map_err(fmt)?;
    Ok(out)
}

/// RSS formatter with configurable options
pub struct RssFormatter {
    config: RssConfig,
}

impl RssFormatter {
    pub fn new(config: RssConfig) -> Self {
        Self { config }
    }

    pub fn convert(&self, feed: &Feed) -> Result<String> {
        convert_to_rss(feed, &self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::article::{ArticleSummary, DetailOverrides};
    use time::macros::datetime;

    fn feed() -> Feed {
        let summary = ArticleSummary::new("1", "https://example.com/a?x=1&y=2", "Fish & Chips")
            .with_author("Li,Wang")
            .with_categories(vec!["Rust".into(), " ".into()])
            .with_published_at(datetime!(2024-05-20 10:11:12 +8));
        Feed {
            title: "Example <feed>".to_string(),
            link: "https://example.com/".to_string(),
            description: String::new(),
            items: vec![NormalizedArticle::full(&summary, DetailOverrides::default(), "<p>a ]]> b</p>".into())],
        }
    }

    #[test]
    fn test_cdata_splits_terminator() {
        assert_eq!(cdata("x]]>y"), "<![CDATA[x]]]]><![CDATA[>y]]>");
    }

    #[test]
    fn test_convert_to_rss() {
        let config = RssConfig { ttl_minutes: Some(60), language: Some("zh-CN".into()), ..Default::default() };
        let xml = RssFormatter::new(config).convert(&feed()).unwrap();

        assert!(xml.starts_with("<?xml"));
        assert!(xml.contains("<title>Example &lt;feed&gt;</title>"));
        assert!(xml.contains("<title>Fish &amp; Chips</title>"));
        assert!(xml.contains("<link>https://example.com/a?x=1&amp;y=2</link>"));
        assert!(xml.contains("<dc:creator>Li,Wang</dc:creator>"));
        assert!(xml.contains("<pubDate>Mon, 20 May 2024 10:11:12 +0800</pubDate>"));
        assert_eq!(xml.matches("<category>").count(), 1);
        assert!(xml.contains("<ttl>60</ttl>"));
        assert!(xml.contains("<language>zh-CN</language>"));
        assert!(xml.contains("<description><![CDATA[<p>a ]]]]><![CDATA[> b</p>]]></description>"));
        assert!(xml.trim_end().ends_with("</rss>"));
    }

    #[test]
    fn test_empty_author_omitted() {
        let mut feed = feed();
        feed.items[0].author.clear();
        let xml = convert_to_rss(&feed, &RssConfig::default()).unwrap();
        assert!(!xml.contains("dc:creator>"));
    }
}
