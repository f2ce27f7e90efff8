//! Alibaba Cloud developer community blog.
//!
//! The list is a server-rendered HTML page. Detail pages carry the article in a
//! `GLOBAL_CONFIG.larkContent = '...';` script assignment.

use async_trait::async_trait;
use url::Url;

use super::{ArticleSource, DetailRequest, FeedInfo, Listing, absolute_link, china_offset, fetch_list, parse_local_datetime};
use crate::article::ArticleSummary;
use crate::decode::AssignmentPattern;
use crate::detect::{RawContentFragment, SourceHints};
use crate::fetch::{FetchGateway, FetchOptions, parse_url};
use crate::parse::{Document, Element};
use crate::{Result, SyndicError};

const ROOT_URL: &str = "https://developer.aliyun.com";
const LIST_PATH: &str = "/blog";

const CARD_SELECTOR: &str = "li.blog-home-main-box-card";
const TITLE_SELECTOR: &str = "a.blog-card-title";
const AUTHOR_SELECTOR: &str = "a.blog-card-author-item";
const TIME_SELECTOR: &str = "div.blog-card-time";
const TEASER_SELECTOR: &str = "p.blog-card-desc";

/// The blog index at `developer.aliyun.com/blog`.
#[derive(Debug, Clone)]
pub struct AliyunBlog {
    root: String,
}

impl Default for AliyunBlog {
    fn default() -> Self {
        Self::new()
    }
}

impl AliyunBlog {
    pub fn new() -> Self {
        Self { root: ROOT_URL.to_string() }
    }

    /// Points the source at another host, e.g. a local mock.
    pub fn with_root(root: impl Into<String>) -> Self {
        Self { root: root.into().trim_end_matches('/').to_string() }
    }

    fn list_url(&self) -> Result<Url> {
        parse_url(&format!("{}{}", self.root, LIST_PATH))
    }

    /// Parses the list page.
    pub fn parse_list(&self, html: &str) -> Result<Vec<ArticleSummary>> {
        let base = parse_url(&self.root)?;
        let doc = Document::parse(html);
        let cards = doc.select(CARD_SELECTOR)?;

        Ok(cards.iter().filter_map(|card| summary_from_card(card, &base)).collect())
    }
}

fn first_text(card: &Element<'_>, selector: &str) -> String {
    card.select_first(selector).ok().flatten().map(|el| el.clean_text()).unwrap_or_default()
}

fn summary_from_card(card: &Element<'_>, base: &Url) -> Option<ArticleSummary> {
    let title_link = card.select_first(TITLE_SELECTOR).ok().flatten()?;
    let link = absolute_link(base, title_link.attr("href")?)?;
    let title = title_link
        .select_first("h2")
        .ok()
        .flatten()
        .map(|h| h.clean_text())
        .unwrap_or_else(|| title_link.clean_text());

    let mut summary = ArticleSummary::new(link.as_str(), link.as_str(), title)
        .with_author(first_text(card, AUTHOR_SELECTOR))
        .with_teaser(first_text(card, TEASER_SELECTOR));
    if let Some(published_at) = parse_local_datetime(&first_text(card, TIME_SELECTOR), china_offset()) {
        summary = summary.with_published_at(published_at);
    }
    Some(summary)
}

#[async_trait]
impl ArticleSource for AliyunBlog {
    fn name(&self) -> &str {
        "aliyun-blog"
    }

    async fn list(&self, gateway: &dyn FetchGateway, limit: Option<usize>) -> Result<Listing> {
        let url = self.list_url()?;
        let body = match fetch_list(gateway, &url, &FetchOptions::get(), self.name()).await? {
            RawContentFragment::Text(html) => html,
            RawContentFragment::Json(_) => {
                return Err(SyndicError::ListUnavailable(format!("{}: expected an HTML list page", self.name())));
            }
        };

        let mut items = self.parse_list(&body)?;
        if let Some(limit) = limit {
            items.truncate(limit);
        }

        Ok(Listing {
            info: FeedInfo {
                title: "阿里云开发者社区 - 技术博客".to_string(),
                link: url.to_string(),
                description: "阿里云开发者社区的技术博客，分享云计算、大数据、人工智能等前沿技术。".to_string(),
            },
            items,
        })
    }

    fn detail_request(&self, summary: &ArticleSummary) -> Result<DetailRequest> {
        Ok(DetailRequest::get(parse_url(&summary.link)?))
    }

    fn hints(&self) -> SourceHints {
        SourceHints::default()
            .assignment(AssignmentPattern::new("GLOBAL_CONFIG", "larkContent"))
            .container(".article-inner")
    }

    fn protected_hosts(&self) -> Vec<String> {
        vec!["alicdn.com".to_string(), "aliyuncs.com".to_string()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::{EncodingShape, detect};

    const LIST_HTML: &str = r#"
        <ul>
          <li class="blog-home-main-box-card">
            <a class="blog-card-title" href="/article/1640001"><h2> First post </h2></a>
            <a class="blog-card-author-item" href="/u/1">alice</a>
            <a class="blog-card-author-item" href="/u/2">bob</a>
            <div class="blog-card-time">2024-05-20</div>
            <p class="blog-card-desc">  A short   summary. </p>
          </li>
          <li class="blog-home-main-box-card">
            <a class="blog-card-title" href="https://developer.aliyun.com/article/1640002"><h2>Second</h2></a>
          </li>
          <li class="blog-home-main-box-card"><span>no link</span></li>
        </ul>"#;

    #[test]
    fn test_parse_list() {
        let items = AliyunBlog::new().parse_list(LIST_HTML).unwrap();
        assert_eq!(items.len(), 2);

        assert_eq!(items[0].link, "https://developer.aliyun.com/article/1640001");
        assert_eq!(items[0].title, "First post");
        assert_eq!(items[0].author, "alice");
        assert_eq!(items[0].teaser, "A short summary.");
        assert!(items[0].published_at.is_some());

        assert_eq!(items[1].link, "https://developer.aliyun.com/article/1640002");
        assert_eq!(items[1].teaser, "");
        assert!(items[1].published_at.is_none());
    }

    #[test]
    fn test_hints_find_lark_content() {
        let page = r#"<html><body><div class="article-inner">teaser</div>
            <script>window.x = 1; GLOBAL_CONFIG.larkContent = '&lt;p&gt;Full&lt;/p&gt;';</script></body></html>"#;
        let shape = detect(&RawContentFragment::Text(page.into()), &AliyunBlog::new().hints());
        match shape {
            EncodingShape::AssignedLiteral(a) => assert_eq!(a.payload, "&lt;p&gt;Full&lt;/p&gt;"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_with_root() {
        let source = AliyunBlog::with_root("http://127.0.0.1:9000/");
        assert_eq!(source.list_url().unwrap().as_str(), "http://127.0.0.1:9000/blog");
    }
}
