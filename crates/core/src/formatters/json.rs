use crate::article::NormalizedArticle;
use crate::formatters::Feed;
use crate::{Result, SyndicError};
use serde::Serialize;

/// Complete JSON output structure
#[derive(Debug, Clone, Serialize)]
pub struct JsonOutput<'a> {
    pub title: &'a str,
    pub link: &'a str,
    pub description: &'a str,
    pub items: Vec<JsonItem<'a>>,
}

/// One feed item as serialized
#[derive(Debug, Clone, Serialize)]
pub struct JsonItem<'a> {
    #[serde(flatten)]
    pub article: &'a NormalizedArticle,
    /// Whether the body is the full article or the teaser
    pub full: bool,
    /// Body as plain text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Configuration for JSON output
#[derive(Debug, Clone, Default)]
pub struct JsonConfig {
    /// Include a plain-text rendition of each body
    pub include_text: bool,
    /// Pretty print JSON output
    pub pretty: bool,
}

/// Convert HTML to plain text by stripping tags
fn html_to_text(html: &str) -> String {
    let doc = scraper::Html::parse_fragment(html);
    doc.root_element().text().collect::<Vec<_>>().join(" ").split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Convert a feed to JSON
pub fn convert_to_json(feed: &Feed, config: &JsonConfig) -> Result<String> {
    let items = feed
        .items
        .iter()
        .map(|article| JsonItem {
            article,
            full: article.is_full(),
            text: if config.include_text { Some(html_to_text(&article.body_html)) } else { None },
        })
        .collect();

    let output = JsonOutput { title: &feed.title, link: &feed.link, description: &feed.description, items };

    if config.pretty {
        serde_json::to_string_pretty(&output).map_err(|e| SyndicError::ConfigError(e.to_string()))
    } else {
        serde_json::to_string(&output).map_err(|e| SyndicError::ConfigError(e.to_string()))
    }
}

/// JSON formatter with configurable options
pub struct JsonFormatter {
    config: JsonConfig,
}

impl JsonFormatter {
    pub fn new(config: JsonConfig) -> Self {
        Self { config }
    }

    pub fn convert(&self, feed: &Feed) -> Result<String> {
        convert_to_json(feed, &self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::article::{ArticleSummary, DetailOverrides};

    fn feed() -> Feed {
        let summary = ArticleSummary::new("1", "https://example.com/1", "First").with_teaser("Teaser");
        Feed {
            title: "Example".to_string(),
            link: "https://example.com/".to_string(),
            description: "Demo feed".to_string(),
            items: vec![
                NormalizedArticle::full(&summary, DetailOverrides::default(), "<p>Body <b>text</b></p>".into()),
                NormalizedArticle::teaser(&ArticleSummary::new("2", "https://example.com/2", "Second")),
            ],
        }
    }

    #[test]
    fn test_html_to_text_strips_tags() {
        let text = html_to_text("<p>Text with <strong>bold</strong> and <em>italic</em>.</p>");
        assert!(!text.contains("<strong>"));
        assert!(text.contains("bold"));
        assert!(text.contains("italic"));
    }

    #[test]
    fn test_convert_to_json_compact() {
        let json = convert_to_json(&feed(), &JsonConfig::default()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["title"], "Example");
        assert_eq!(value["items"][0]["title"], "First");
        assert_eq!(value["items"][0]["full"], true);
        assert_eq!(value["items"][0]["body_html"], "<p>Body <b>text</b></p>");
        assert_eq!(value["items"][1]["full"], false);
        assert_eq!(value["items"][1]["body_html"], "Second");
        assert!(value["items"][0].get("text").is_none());
        assert!(!json.contains('\n'));
    }

    #[test]
    fn test_convert_to_json_with_text() {
        let config = JsonConfig { include_text: true, pretty: true };
        let json = JsonFormatter::new(config).convert(&feed()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["items"][0]["text"], "Body text");
        assert!(json.contains('\n'));
    }
}
