//! InfoQ China topic feeds.
//!
//! Everything goes through JSON APIs: topic info, then the topic's article
//! list, then one `getDetail` POST per article. A detail carries the body
//! inline (HTML or a serialized document tree) or points at it through
//! `content_url`.

use async_trait::async_trait;
use serde_json::{Value, json};
use url::Url;

use super::{ArticleSource, DetailRequest, FeedInfo, Listing, fetch_list, from_unix_millis};
use crate::article::{ArticleSummary, DetailOverrides};
use crate::detect::{RawContentFragment, SourceHints};
use crate::fetch::{FetchGateway, FetchOptions, parse_url};
use crate::{Result, SyndicError};

const ROOT_URL: &str = "https://www.infoq.cn";
const DEFAULT_LIMIT: usize = 15;

/// Articles of one InfoQ topic, addressed by numeric id or alias.
#[derive(Debug, Clone)]
pub struct InfoqTopic {
    topic: String,
    root: String,
}

impl InfoqTopic {
    pub fn new(topic: impl Into<String>) -> Self {
        Self { topic: topic.into(), root: ROOT_URL.to_string() }
    }

    /// Points the source at another host, e.g. a local mock.
    pub fn with_root(mut self, root: impl Into<String>) -> Self {
        self.root = root.into().trim_end_matches('/').to_string();
        self
    }

    fn api(&self, path: &str) -> Result<Url> {
        parse_url(&format!("{}/public/v1/{}", self.root, path))
    }

    fn page_url(&self) -> String {
        format!("{}/topic/{}", self.root, self.topic)
    }

    fn article_link(&self, uuid: &str) -> String {
        format!("{}/article/{}", self.root, uuid)
    }

    fn info_body(&self) -> Value {
        match self.topic.trim().parse::<u64>() {
            Ok(id) => json!({ "id": id }),
            Err(_) => json!({ "alias": self.topic.trim() }),
        }
    }

    fn api_options(&self, body: Value) -> FetchOptions {
        FetchOptions::post_json(body)
            .header("Referer", self.page_url())
            .header("Origin", self.root.clone())
            .header("Content-Type", "application/json")
    }

    /// Converts one `getList` entry into a summary.
    pub fn summary_from_entry(&self, entry: &Value) -> Option<ArticleSummary> {
        let uuid = entry.get("uuid").and_then(Value::as_str).filter(|u| !u.is_empty())?;
        let link = self.article_link(uuid);
        let title = str_field(entry, "article_title");

        let mut categories = names(entry.get("topic"), "name");
        categories.extend(names(entry.get("label"), "name"));

        let mut summary = ArticleSummary::new(uuid, link, title)
            .with_teaser(str_field(entry, "article_summary"))
            .with_author(authors(entry).unwrap_or_default())
            .with_categories(categories);
        if let Some(published_at) = entry.get("publish_time").and_then(Value::as_i64).and_then(from_unix_millis) {
            summary = summary.with_published_at(published_at);
        }
        Some(summary)
    }
}

fn str_field(value: &Value, name: &str) -> String {
    value.get(name).and_then(Value::as_str).map(str::trim).unwrap_or_default().to_string()
}

fn names(list: Option<&Value>, field: &str) -> Vec<String> {
    list.and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.get(field).and_then(Value::as_str))
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

/// Author nicknames joined with `,`, falling back to `no_author`.
fn authors(value: &Value) -> Option<String> {
    let nicknames = names(value.get("author"), "nickname");
    if !nicknames.is_empty() {
        return Some(nicknames.join(","));
    }
    value.get("no_author").and_then(Value::as_str).map(str::trim).filter(|a| !a.is_empty()).map(str::to_string)
}

#[async_trait]
impl ArticleSource for InfoqTopic {
    fn name(&self) -> &str {
        "infoq-topic"
    }

    async fn list(&self, gateway: &dyn FetchGateway, limit: Option<usize>) -> Result<Listing> {
        let unavailable = |reason: &str| SyndicError::ListUnavailable(format!("{}: {reason}", self.name()));

        let info = match fetch_list(gateway, &self.api("topic/getInfo")?, &self.api_options(self.info_body()), self.name()).await? {
            RawContentFragment::Json(body) => body.get("data").filter(|d| d.is_object()).cloned(),
            RawContentFragment::Text(_) => None,
        }
        .ok_or_else(|| unavailable(&format!("topic {} not found", self.topic)))?;

        let topic_id = info.get("id").cloned().ok_or_else(|| unavailable("topic info has no id"))?;
        let list_body = json!({
            "id": topic_id,
            "ptype": 0,
            "size": limit.unwrap_or(DEFAULT_LIMIT),
            "type": 0,
        });

        let entries = match fetch_list(gateway, &self.api("article/getList")?, &self.api_options(list_body), self.name()).await? {
            RawContentFragment::Json(body) => body.get("data").and_then(Value::as_array).cloned(),
            RawContentFragment::Text(_) => None,
        }
        .ok_or_else(|| unavailable("article list response has no data"))?;

        let mut items: Vec<ArticleSummary> = entries.iter().filter_map(|e| self.summary_from_entry(e)).collect();
        if let Some(limit) = limit {
            items.truncate(limit);
        }

        Ok(Listing {
            info: FeedInfo {
                title: format!("InfoQ 话题 - {}", str_field(&info, "name")),
                link: self.page_url(),
                description: str_field(&info, "desc"),
            },
            items,
        })
    }

    fn detail_request(&self, summary: &ArticleSummary) -> Result<DetailRequest> {
        let options = FetchOptions::post_json(json!({ "uuid": summary.id }))
            .header("Referer", summary.link.clone())
            .header("Content-Type", "application/json");
        Ok(DetailRequest::with_options(self.api("article/getDetail")?, options))
    }

    fn hints(&self) -> SourceHints {
        SourceHints::default().content_field("/data/content").external_field("/data/content_url")
    }

    fn protected_hosts(&self) -> Vec<String> {
        vec!["geekbang.org".to_string(), "infoq.cn".to_string()]
    }

    fn overrides(&self, _summary: &ArticleSummary, detail: &RawContentFragment) -> DetailOverrides {
        let RawContentFragment::Json(body) = detail else {
            return DetailOverrides::default();
        };
        let Some(data) = body.get("data") else {
            return DetailOverrides::default();
        };
        DetailOverrides {
            title: Some(str_field(data, "article_title")).filter(|t| !t.is_empty()),
            author: authors(data),
            categories: None,
        }
    }
}
