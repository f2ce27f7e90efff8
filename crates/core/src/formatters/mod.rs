//! Feed output formats.

pub mod json;
pub mod rss;

pub use json::{JsonConfig, JsonFormatter, convert_to_json};
pub use rss::{RssConfig, RssFormatter, convert_to_rss};

use serde::Serialize;

use crate::article::NormalizedArticle;
use crate::sources::FeedInfo;

/// A finished feed: channel metadata plus items in list order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Feed {
    pub title: String,
    pub link: String,
    pub description: String,
    pub items: Vec<NormalizedArticle>,
}

impl Feed {
    pub fn new(info: FeedInfo, items: Vec<NormalizedArticle>) -> Self {
        let FeedInfo { title, link, description } = info;
        Self { title, link, description, items }
    }
}

/// Output format selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Rss,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = crate::SyndicError;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "rss" | "xml" => Ok(Self::Rss),
            "json" => Ok(Self::Json),
            other => Err(crate::SyndicError::ConfigError(format!("unknown output format '{other}'"))),
        }
    }
}

/// Serializes `feed` in `format` with default settings.
pub fn format_feed(feed: &Feed, format: OutputFormat, pretty: bool) -> crate::Result<String> {
    match format {
        OutputFormat::Rss => convert_to_rss(feed, &RssConfig::default()),
        OutputFormat::Json => convert_to_json(feed, &JsonConfig { pretty, ..Default::default() }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_from_str() {
        assert_eq!("RSS".parse::<OutputFormat>().unwrap(), OutputFormat::Rss);
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert!("atom".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_feed_from_info() {
        let info = FeedInfo { title: "T".into(), link: "https://example.com/".into(), description: "D".into() };
        let feed = Feed::new(info, Vec::new());
        assert_eq!(feed.title, "T");
        assert!(feed.items.is_empty());
    }
}
