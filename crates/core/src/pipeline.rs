//! Feed generation: list, then fetch → detect → decode → render → sanitize per
//! article, with batching, pacing, memoization and teaser fallback.
//!
//! The [`Orchestrator`] is the only place errors are converted: anything that
//! goes wrong while processing one article is logged with the article key and
//! the article keeps its teaser. Only a missing or empty list is reported to
//! the caller.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use syndic_core::pipeline::{Orchestrator, PipelineConfig};
//! use syndic_core::sources::AliyunBlog;
//! use syndic_core::{FetchConfig, ReqwestGateway};
//!
//! # async fn example() -> syndic_core::Result<()> {
//! let gateway = Arc::new(ReqwestGateway::new(FetchConfig::default())?);
//! let orchestrator = Orchestrator::new(gateway, PipelineConfig::builder().concurrency(2).build());
//! let feed = orchestrator.run(&AliyunBlog::new(), Some(10)).await?;
//! println!("{} items", feed.items.len());
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use url::Url;

use crate::article::{ArticleSummary, NormalizedArticle};
use crate::cache::{ContentCache, MemoryCache};
use crate::decode::{LiteralStrategy, decode};
use crate::detect::{EncodingShape, RawContentFragment, detect};
use crate::document::DecodedDocument;
use crate::fetch::{FetchGateway, FetchOptions};
use crate::formatters::Feed;
use crate::pacing::{JitterRange, batches};
use crate::render::{RenderContext, render};
use crate::renderer::{RendererPool, WaitUntil};
use crate::sanitize::{SanitizeConfig, sanitize_html};
use crate::sources::{ArticleSource, DetailRequest};
use crate::{Result, SyndicError};

/// Configuration for the orchestrator.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use syndic_core::pipeline::PipelineConfig;
///
/// let config = PipelineConfig::builder()
///     .concurrency(5)
///     .batch_pacing(Duration::from_millis(500))
///     .cache_failures(false)
///     .build();
/// assert_eq!(config.concurrency, 5);
/// ```
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Articles processed concurrently per batch (default: 3).
    pub concurrency: usize,

    /// Delay between batches (default: 1s).
    pub batch_pacing: Duration,

    /// Randomized delay before each detail fetch (default: 1000..=2500 ms).
    pub jitter: JitterRange,

    /// Deadline for each detail fetch (default: 30s).
    pub fetch_timeout: Duration,

    /// Deadline for one rendered detail load, lease included (default: 15s).
    pub renderer_timeout: Duration,

    /// Memoize teaser fallbacks as well as full bodies (default: true).
    pub cache_failures: bool,

    /// Expiry of memoized entries (default: none).
    pub cache_ttl: Option<Duration>,

    /// Follow one external content reference per article (default: true).
    pub follow_external_refs: bool,

    /// How assigned literals are unescaped (default: grammar).
    pub literal_strategy: LiteralStrategy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            concurrency: 3,
            batch_pacing: Duration::from_secs(1),
            jitter: JitterRange::default(),
            fetch_timeout: Duration::from_secs(30),
            renderer_timeout: Duration::from_secs(15),
            cache_failures: true,
            cache_ttl: None,
            follow_external_refs: true,
            literal_strategy: LiteralStrategy::default(),
        }
    }
}

impl PipelineConfig {
    /// Creates a new builder for PipelineConfig.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::new()
    }
}

/// Builder for PipelineConfig.
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self { config: PipelineConfig::default() }
    }

    /// Sets the batch size; zero is treated as one.
    pub fn concurrency(mut self, value: usize) -> Self {
        self.config.concurrency = value.max(1);
        self
    }

    pub fn batch_pacing(mut self, value: Duration) -> Self {
        self.config.batch_pacing = value;
        self
    }

    pub fn jitter(mut self, value: JitterRange) -> Self {
        self.config.jitter = value;
        self
    }

    pub fn fetch_timeout(mut self, value: Duration) -> Self {
        self.config.fetch_timeout = value;
        self
    }

    pub fn renderer_timeout(mut self, value: Duration) -> Self {
        self.config.renderer_timeout = value;
        self
    }

    pub fn cache_failures(mut self, value: bool) -> Self {
        self.config.cache_failures = value;
        self
    }

    pub fn cache_ttl(mut self, value: Option<Duration>) -> Self {
        self.config.cache_ttl = value;
        self
    }

    pub fn follow_external_refs(mut self, value: bool) -> Self {
        self.config.follow_external_refs = value;
        self
    }

    pub fn literal_strategy(mut self, value: LiteralStrategy) -> Self {
        self.config.literal_strategy = value;
        self
    }

    /// Builds the config.
    pub fn build(self) -> PipelineConfig {
        self.config
    }
}

impl Default for PipelineConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Counters describing one [`Orchestrator::process_with_report`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunReport {
    pub batches: usize,
    pub pacing_delays: usize,
    pub full: usize,
    pub fallbacks: usize,
}

/// Drives the per-article pipeline over a list.
pub struct Orchestrator {
    gateway: Arc<dyn FetchGateway>,
    cache: Arc<dyn ContentCache<NormalizedArticle>>,
    config: PipelineConfig,
    sanitize: SanitizeConfig,
    renderer: Option<Arc<RendererPool>>,
}

impl Orchestrator {
    /// Creates an orchestrator with an in-memory cache built from `config`.
    pub fn new(gateway: Arc<dyn FetchGateway>, config: PipelineConfig) -> Self {
        let mut cache = MemoryCache::new().with_ttl(config.cache_ttl);
        if !config.cache_failures {
            cache = cache.retain_if(NormalizedArticle::is_full);
        }
        Self { gateway, cache: Arc::new(cache), config, sanitize: SanitizeConfig::default(), renderer: None }
    }

    /// Replaces the cache, e.g. to share one across orchestrators.
    pub fn with_cache(mut self, cache: Arc<dyn ContentCache<NormalizedArticle>>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_sanitize_config(mut self, sanitize: SanitizeConfig) -> Self {
        self.sanitize = sanitize;
        self
    }

    /// Attaches a headless renderer for sources that request one.
    pub fn with_renderer(mut self, pool: Arc<RendererPool>) -> Self {
        self.renderer = Some(pool);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Lists `source` and processes every entry.
    ///
    /// # Errors
    ///
    /// Returns [`SyndicError::ListUnavailable`] when the list cannot be fetched
    /// or parsed and [`SyndicError::EmptyList`] when it has no entries.
    /// Per-article failures never surface here.
    pub async fn run(&self, source: &dyn ArticleSource, limit: Option<usize>) -> Result<Feed> {
        self.run_with_report(source, limit).await.map(|(feed, _)| feed)
    }

    /// Like [`Orchestrator::run`], also returning the [`RunReport`].
    ///
    /// # Errors
    ///
    /// Same as [`Orchestrator::run`].
    pub async fn run_with_report(&self, source: &dyn ArticleSource, limit: Option<usize>) -> Result<(Feed, RunReport)> {
        let listing = source.list(self.gateway.as_ref(), limit).await.map_err(|e| match e {
            SyndicError::ListUnavailable(_) | SyndicError::EmptyList { .. } => e,
            other => SyndicError::ListUnavailable(format!("{}: {other}", source.name())),
        })?;

        if listing.items.is_empty() {
            return Err(SyndicError::EmptyList { source_name: source.name().to_string() });
        }

        tracing::info!(source = source.name(), items = listing.items.len(), "article list fetched");
        let (items, report) = self.process_with_report(source, &listing.items).await;
        Ok((Feed::new(listing.info, items), report))
    }

    /// Processes `items`, returning one article per summary in input order.
    pub async fn process(&self, source: &dyn ArticleSource, items: &[ArticleSummary]) -> Vec<NormalizedArticle> {
        self.process_with_report(source, items).await.0
    }

    /// Like [`Orchestrator::process`], also reporting batch and pacing counts.
    pub async fn process_with_report(
        &self, source: &dyn ArticleSource, items: &[ArticleSummary],
    ) -> (Vec<NormalizedArticle>, RunReport) {
        let sanitize = self.sanitize_for(source);
        let mut report = RunReport::default();
        let mut articles = Vec::with_capacity(items.len());

        for (index, batch) in batches(items, self.config.concurrency).enumerate() {
            if index > 0 {
                tracing::debug!(delay_ms = self.config.batch_pacing.as_millis() as u64, "pacing between batches");
                tokio::time::sleep(self.config.batch_pacing).await;
                report.pacing_delays += 1;
            }

            let settled = join_all(batch.iter().map(|summary| self.process_item(source, summary, &sanitize))).await;
            report.batches += 1;
            articles.extend(settled);
        }

        report.full = articles.iter().filter(|a| a.is_full()).count();
        report.fallbacks = articles.len() - report.full;
        tracing::info!(
            source = source.name(),
            full = report.full,
            fallbacks = report.fallbacks,
            batches = report.batches,
            "processing finished"
        );
        (articles, report)
    }

    /// Waits for outstanding renderer leases and closes the renderer session.
    pub async fn shutdown(&self) -> Result<()> {
        match &self.renderer {
            Some(pool) => pool.shutdown().await,
            None => Ok(()),
        }
    }

    fn sanitize_for(&self, source: &dyn ArticleSource) -> SanitizeConfig {
        let mut sanitize = self.sanitize.clone();
        sanitize.media = sanitize.media.protect(source.protected_hosts());
        sanitize
    }

    async fn process_item(
        &self, source: &dyn ArticleSource, summary: &ArticleSummary, sanitize: &SanitizeConfig,
    ) -> NormalizedArticle {
        let key = summary.cache_key();
        let producer = Box::pin(async move {
            match self.build_article(source, summary, sanitize).await {
                Ok(article) => article,
                Err(e) => {
                    tracing::warn!(key, error = %e, "keeping teaser");
                    NormalizedArticle::teaser(summary)
                }
            }
        });
        self.cache.try_get(key, producer).await
    }

    async fn build_article(
        &self, source: &dyn ArticleSource, summary: &ArticleSummary, sanitize: &SanitizeConfig,
    ) -> Result<NormalizedArticle> {
        let key = summary.cache_key();
        let request = source.detail_request(summary)?;
        let fragment = self.load(&request, key).await?;

        let hints = source.hints();
        let mut shape = detect(&fragment, &hints);
        tracing::debug!(key, shape = shape.tag(), "detected detail payload");

        if let EncodingShape::ExternalRef(url) = shape.clone() {
            if !self.config.follow_external_refs {
                tracing::debug!(key, url = %url, "external content not followed");
                return Ok(NormalizedArticle::teaser(summary));
            }
            let secondary = self.fetch(&url, &FetchOptions::get(), key).await?;
            shape = detect(&secondary, &hints.without_external());
            tracing::debug!(key, url = %url, shape = shape.tag(), "detected external payload");
        }

        let Some(document) = decode(&shape, self.config.literal_strategy)? else {
            tracing::debug!(key, shape = shape.tag(), "no decodable content");
            return Ok(NormalizedArticle::teaser(summary));
        };

        let sanitize = sanitize.with_base_url(Url::parse(&summary.link).ok());
        let html = match document {
            DecodedDocument::Html(html) => html,
            DecodedDocument::Tree(tree) => render(&tree, &RenderContext::new(&sanitize.media, sanitize.base_url.as_ref())),
        };
        let body = sanitize_html(&html, &sanitize)?;

        Ok(NormalizedArticle::full(summary, source.overrides(summary, &fragment), body))
    }

    async fn load(&self, request: &DetailRequest, key: &str) -> Result<RawContentFragment> {
        if let Some(fragment) = &request.inline {
            return Ok(fragment.clone());
        }

        match (&request.render_selector, &self.renderer) {
            (Some(selector), Some(pool)) => {
                self.pause_before_fetch(key).await;
                let timeout = self.config.renderer_timeout;
                let rendered = async {
                    let mut lease = pool.lease().await?;
                    lease.render(&request.url, Some(selector), WaitUntil::default()).await
                };
                let html = tokio::time::timeout(timeout, rendered)
                    .await
                    .map_err(|_| SyndicError::Timeout { timeout: timeout.as_secs() })??;
                Ok(RawContentFragment::Text(html))
            }
            (Some(_), None) => {
                tracing::warn!(key, "no renderer attached; fetching directly");
                self.fetch(&request.url, &request.options, key).await
            }
            (None, _) => self.fetch(&request.url, &request.options, key).await,
        }
    }

    async fn fetch(&self, url: &Url, options: &FetchOptions, key: &str) -> Result<RawContentFragment> {
        self.pause_before_fetch(key).await;
        let timeout = self.config.fetch_timeout;
        tokio::time::timeout(timeout, self.gateway.fetch(url, options))
            .await
            .map_err(|_| SyndicError::Timeout { timeout: timeout.as_secs() })?
    }

    async fn pause_before_fetch(&self, key: &str) {
        let delay = self.config.jitter.sample();
        if !delay.is_zero() {
            tracing::debug!(key, delay_ms = delay.as_millis() as u64, "jitter");
            tokio::time::sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_config_default() {
        let config = PipelineConfig::default();
        assert_eq!(config.concurrency, 3);
        assert_eq!(config.batch_pacing, Duration::from_secs(1));
        assert_eq!(config.jitter, JitterRange::default());
        assert_eq!(config.fetch_timeout, Duration::from_secs(30));
        assert!(config.cache_failures);
        assert!(config.cache_ttl.is_none());
        assert!(config.follow_external_refs);
        assert_eq!(config.literal_strategy, LiteralStrategy::Grammar);
    }

    #[test]
    fn test_builder() {
        let config = PipelineConfig::builder()
            .concurrency(0)
            .jitter(JitterRange::none())
            .fetch_timeout(Duration::from_secs(5))
            .renderer_timeout(Duration::from_secs(2))
            .cache_ttl(Some(Duration::from_secs(3600)))
            .follow_external_refs(false)
            .literal_strategy(LiteralStrategy::JsonRewrap)
            .build();
        assert_eq!(config.concurrency, 1);
        assert_eq!(config.jitter, JitterRange::none());
        assert_eq!(config.renderer_timeout, Duration::from_secs(2));
        assert_eq!(config.cache_ttl, Some(Duration::from_secs(3600)));
        assert!(!config.follow_external_refs);
        assert_eq!(config.literal_strategy, LiteralStrategy::JsonRewrap);
    }
}
