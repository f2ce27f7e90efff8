//! WordPress REST API post lists (`/wp-json/wp/v2/posts`).
//!
//! List entries already carry `content.rendered`, so the detail payload is the
//! list entry itself and no second request is made. Entries not seen in the
//! last list are fetched from `posts/{id}`.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;
use time::UtcOffset;
use url::Url;

use super::{ArticleSource, DetailRequest, FeedInfo, Listing, fetch_list, parse_local_datetime};
use crate::article::{ArticleSummary, DetailOverrides};
use crate::decode::decode_entities;
use crate::detect::{RawContentFragment, SourceHints};
use crate::fetch::{FetchGateway, FetchOptions, parse_url};
use crate::parse::Document;
use crate::{Result, SyndicError};

const DEFAULT_LIMIT: usize = 10;

/// Posts of a WordPress site, e.g.
/// `https://www.nasachina.cn/wp-json/wp/v2/posts?categories=2`.
#[derive(Debug)]
pub struct WordPressPosts {
    api: Url,
    entries: Mutex<HashMap<String, Value>>,
}

impl WordPressPosts {
    pub fn new(api: Url) -> Self {
        Self { api, entries: Mutex::new(HashMap::new()) }
    }

    fn list_url(&self, limit: usize) -> Url {
        let mut url = self.api.clone();
        let kept: Vec<(String, String)> =
            url.query_pairs().filter(|(k, _)| k != "per_page").map(|(k, v)| (k.into_owned(), v.into_owned())).collect();
        url.query_pairs_mut().clear().extend_pairs(kept).append_pair("per_page", &limit.to_string());
        url
    }

    fn post_url(&self, id: &str) -> Url {
        let mut url = self.api.clone();
        url.set_query(None);
        let path = format!("{}/{}", url.path().trim_end_matches('/'), id);
        url.set_path(&path);
        url
    }

    fn site_root(&self) -> String {
        let mut root = self.api.clone();
        root.set_path("/");
        root.set_query(None);
        root.to_string()
    }

    /// Converts one post object into a summary.
    pub fn summary_from_post(post: &Value) -> Option<ArticleSummary> {
        let id = match post.get("id")? {
            Value::Number(n) => n.to_string(),
            Value::String(s) => s.clone(),
            _ => return None,
        };
        let link = post.get("link").and_then(Value::as_str).map(str::trim).filter(|l| !l.is_empty())?;
        let link = parse_url(link).ok()?;
        let title = rendered(post, "title").map(|t| decode_entities(t.trim())).unwrap_or_default();
        let teaser = rendered(post, "excerpt")
            .map(|html| Document::parse_fragment(html).text_content().split_whitespace().collect::<Vec<_>>().join(" "))
            .unwrap_or_default();

        let mut summary = ArticleSummary::new(id, link.as_str(), title).with_teaser(teaser);
        let published = post
            .get("date_gmt")
            .and_then(Value::as_str)
            .and_then(|d| parse_local_datetime(d, UtcOffset::UTC));
        if let Some(published_at) = published {
            summary = summary.with_published_at(published_at);
        }
        Some(summary)
    }
}

fn rendered<'a>(post: &'a Value, field: &str) -> Option<&'a str> {
    match post.get(field)? {
        Value::Object(obj) => obj.get("rendered").and_then(Value::as_str),
        Value::String(s) => Some(s.as_str()),
        _ => None,
    }
}

#[async_trait]
impl ArticleSource for WordPressPosts {
    fn name(&self) -> &str {
        "wordpress"
    }

    async fn list(&self, gateway: &dyn FetchGateway, limit: Option<usize>) -> Result<Listing> {
        let url = self.list_url(limit.unwrap_or(DEFAULT_LIMIT));
        let posts = match fetch_list(gateway, &url, &FetchOptions::get(), self.name()).await? {
            RawContentFragment::Json(Value::Array(posts)) => posts,
            _ => return Err(SyndicError::ListUnavailable(format!("{}: expected a JSON array of posts", self.name()))),
        };

        let mut items = Vec::with_capacity(posts.len());
        {
            let mut entries = self.entries.lock().map_err(|e| SyndicError::ConfigError(e.to_string()))?;
            for post in posts {
                if let Some(summary) = Self::summary_from_post(&post) {
                    entries.insert(summary.id.clone(), post);
                    items.push(summary);
                }
            }
        }

        Ok(Listing {
            info: FeedInfo {
                title: url.host_str().unwrap_or("WordPress").to_string(),
                link: self.site_root(),
                description: String::new(),
            },
            items,
        })
    }

    fn detail_request(&self, summary: &ArticleSummary) -> Result<DetailRequest> {
        let known = self.entries.lock().ok().and_then(|entries| entries.get(&summary.id).cloned());
        match known {
            Some(post) => Ok(DetailRequest::inline(parse_url(&summary.link)?, RawContentFragment::Json(post))),
            None => Ok(DetailRequest::get(self.post_url(&summary.id))),
        }
    }

    fn hints(&self) -> SourceHints {
        SourceHints::default().content_field("/content/rendered")
    }

    fn overrides(&self, _summary: &ArticleSummary, detail: &RawContentFragment) -> DetailOverrides {
        let RawContentFragment::Json(post) = detail else {
            return DetailOverrides::default();
        };
        DetailOverrides {
            title: rendered(post, "title").map(|t| decode_entities(t.trim())).filter(|t| !t.is_empty()),
            author: None,
            categories: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn post() -> Value {
        json!({
            "id": 42,
            "date_gmt": "2024-05-20T10:11:12",
            "link": " https://www.nasachina.cn/apod/42.html ",
            "title": {"rendered": "M31 &#8211; Andromeda"},
            "excerpt": {"rendered": "<p>A galaxy\n far away.</p>"},
            "content": {"rendered": "<p><img src=\" https://www.nasachina.cn/a.jpg \"></p>"}
        })
    }

    fn api() -> Url {
        Url::parse("https://www.nasachina.cn/wp-json/wp/v2/posts?categories=2&per_page=3").unwrap()
    }

    #[test]
    fn test_summary_from_post() {
        let summary = WordPressPosts::summary_from_post(&post()).unwrap();
        assert_eq!(summary.id, "42");
        assert_eq!(summary.link, "https://www.nasachina.cn/apod/42.html");
        assert_eq!(summary.title, "M31 – Andromeda");
        assert_eq!(summary.teaser, "A galaxy far away.");
        assert!(summary.published_at.is_some());
    }

    #[test]
    fn test_list_url_replaces_per_page() {
        let source = WordPressPosts::new(api());
        assert_eq!(
            source.list_url(5).as_str(),
            "https://www.nasachina.cn/wp-json/wp/v2/posts?categories=2&per_page=5"
        );
        assert_eq!(source.post_url("42").as_str(), "https://www.nasachina.cn/wp-json/wp/v2/posts/42");
        assert_eq!(source.site_root(), "https://www.nasachina.cn/");
    }

    #[test]
    fn test_detail_request_without_listing_fetches_post() {
        let source = WordPressPosts::new(api());
        let summary = WordPressPosts::summary_from_post(&post()).unwrap();
        let request = source.detail_request(&summary).unwrap();
        assert!(request.inline.is_none());
        assert!(request.url.as_str().ends_with("/posts/42"));
    }

    #[test]
    fn test_hints_read_rendered_content() {
        let shape = crate::detect::detect(&RawContentFragment::Json(post()), &WordPressPosts::new(api()).hints());
        assert_eq!(shape.tag(), "inline-html");
    }
}
