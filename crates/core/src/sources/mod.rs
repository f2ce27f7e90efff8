//! Built-in article sources.
//!
//! A source knows how to obtain an article list and how to request each
//! article's detail payload. Everything after that (detection, decoding,
//! rendering, sanitizing, fallback) is shared and lives in the pipeline.

use async_trait::async_trait;
use serde::Serialize;
use time::{OffsetDateTime, PrimitiveDateTime, UtcOffset, macros::format_description};
use url::Url;

use crate::article::{ArticleSummary, DetailOverrides};
use crate::detect::{RawContentFragment, SourceHints};
use crate::fetch::{FetchGateway, FetchOptions};
use crate::{Result, SyndicError};

#[cfg(feature = "fetch")]
pub mod aliyun;
#[cfg(feature = "fetch")]
pub mod infoq;
#[cfg(feature = "fetch")]
pub mod wordpress;

#[cfg(feature = "fetch")]
pub use aliyun::AliyunBlog;
#[cfg(feature = "fetch")]
pub use infoq::InfoqTopic;
#[cfg(feature = "fetch")]
pub use wordpress::WordPressPosts;

/// Channel-level metadata of a feed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FeedInfo {
    pub title: String,
    pub link: String,
    pub description: String,
}

/// Result of a list fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct Listing {
    pub info: FeedInfo,
    pub items: Vec<ArticleSummary>,
}

/// How to obtain one article's detail payload.
#[derive(Debug, Clone, PartialEq)]
pub struct DetailRequest {
    pub url: Url,
    pub options: FetchOptions,
    /// Render the page headlessly and wait for this selector instead of a
    /// plain fetch.
    pub render_selector: Option<String>,
    /// Payload already in hand; no fetch is made.
    pub inline: Option<RawContentFragment>,
}

impl DetailRequest {
    pub fn get(url: Url) -> Self {
        Self { url, options: FetchOptions::get(), render_selector: None, inline: None }
    }

    pub fn with_options(url: Url, options: FetchOptions) -> Self {
        Self { url, options, render_selector: None, inline: None }
    }

    /// A request served by the headless renderer.
    pub fn rendered(url: Url, selector: impl Into<String>) -> Self {
        Self { url, options: FetchOptions::get(), render_selector: Some(selector.into()), inline: None }
    }

    /// A request whose payload is already known.
    pub fn inline(url: Url, fragment: RawContentFragment) -> Self {
        Self { url, options: FetchOptions::get(), render_selector: None, inline: Some(fragment) }
    }
}

/// A producer of article lists and detail requests.
#[async_trait]
pub trait ArticleSource: Send + Sync {
    /// Short name used in logs and errors.
    fn name(&self) -> &str;

    /// Fetches the article list.
    ///
    /// # Errors
    ///
    /// Any error here aborts the feed; the orchestrator reports it as
    /// [`SyndicError::ListUnavailable`].
    async fn list(&self, gateway: &dyn FetchGateway, limit: Option<usize>) -> Result<Listing>;

    /// Describes the detail fetch for one summary.
    fn detail_request(&self, summary: &ArticleSummary) -> Result<DetailRequest>;

    /// Detection hints for this source's detail payloads.
    fn hints(&self) -> SourceHints {
        SourceHints::default()
    }

    /// Image hosts that reject hotlinked requests.
    fn protected_hosts(&self) -> Vec<String> {
        Vec::new()
    }

    /// Metadata found on the detail payload that supersedes the list's.
    fn overrides(&self, _summary: &ArticleSummary, _detail: &RawContentFragment) -> DetailOverrides {
        DetailOverrides::default()
    }
}

/// Builds a source from a CLI-style name and argument.
///
/// Known names: `aliyun-blog`, `infoq-topic <id|alias>`, `wordpress <posts-api-url>`.
#[cfg(feature = "fetch")]
pub fn source_by_name(name: &str, arg: Option<&str>) -> Result<Box<dyn ArticleSource>> {
    let require = |what: &str| {
        arg.map(str::trim)
            .filter(|a| !a.is_empty())
            .ok_or_else(|| SyndicError::ConfigError(format!("source '{name}' requires {what}")))
    };

    match name {
        "aliyun-blog" | "aliyun" => Ok(Box::new(AliyunBlog::new())),
        "infoq-topic" | "infoq" => Ok(Box::new(InfoqTopic::new(require("a topic id or alias")?))),
        "wordpress" | "wp" => Ok(Box::new(WordPressPosts::new(crate::fetch::parse_url(require("a posts API URL")?)?))),
        other => Err(SyndicError::ConfigError(format!("unknown source '{other}'"))),
    }
}

/// Names accepted by [`source_by_name`].
pub const SOURCE_NAMES: &[&str] = &["aliyun-blog", "infoq-topic", "wordpress"];

/// Parses a wall-clock date as shown on list pages, in the given offset.
///
/// Accepts `YYYY-MM-DD`, `YYYY-MM-DD HH:MM` and `YYYY-MM-DD HH:MM:SS`, with
/// either a space or `T` separator.
pub fn parse_local_datetime(text: &str, offset: UtcOffset) -> Option<OffsetDateTime> {
    let text = text.trim().replace('T', " ");
    let with_seconds = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    let with_minutes = format_description!("[year]-[month]-[day] [hour]:[minute]");
    let date_only = format_description!("[year]-[month]-[day]");

    PrimitiveDateTime::parse(&text, &with_seconds)
        .or_else(|_| PrimitiveDateTime::parse(&text, &with_minutes))
        .or_else(|_| time::Date::parse(&text, &date_only).map(|d| d.midnight()))
        .ok()
        .map(|dt| dt.assume_offset(offset))
}

/// Converts a millisecond Unix timestamp.
pub fn from_unix_millis(millis: i64) -> Option<OffsetDateTime> {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000).ok()
}

/// China Standard Time, used by the built-in Chinese-language sources.
pub(crate) fn china_offset() -> UtcOffset {
    UtcOffset::from_hms(8, 0, 0).unwrap_or(UtcOffset::UTC)
}

/// Resolves `href` against `base`, trimming stray whitespace first.
pub(crate) fn absolute_link(base: &Url, href: &str) -> Option<Url> {
    base.join(href.trim()).ok()
}

/// Fetches and rejects non-success list responses with the source name.
pub(crate) async fn fetch_list(
    gateway: &dyn FetchGateway, url: &Url, options: &FetchOptions, source: &str,
) -> Result<RawContentFragment> {
    gateway
        .fetch(url, options)
        .await
        .map_err(|e| SyndicError::ListUnavailable(format!("{source}: {e}")))
}
