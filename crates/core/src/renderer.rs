//! Headless renderer seam.
//!
//! No browser is bundled. Callers plug a driver in by implementing
//! [`RendererSession`] and [`RenderedPage`]; the orchestrator shares one
//! session across tasks through a [`RendererPool`], handing each task its own
//! page as a [`PageLease`]. [`RendererPool::shutdown`] waits until every lease
//! has been returned before closing the session.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;
use url::Url;

use crate::{Result, SyndicError};

/// Navigation milestone to wait for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WaitUntil {
    Load,
    #[default]
    DomContentLoaded,
    NetworkIdle,
}

/// Resource categories a page may request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Document,
    Script,
    Stylesheet,
    Image,
    Font,
    Media,
    Xhr,
    Other,
}

/// Resource kinds a page should not load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceFilter {
    pub blocked: Vec<ResourceKind>,
}

impl Default for ResourceFilter {
    fn default() -> Self {
        Self { blocked: vec![ResourceKind::Image, ResourceKind::Font, ResourceKind::Media] }
    }
}

impl ResourceFilter {
    /// Allows everything.
    pub fn none() -> Self {
        Self { blocked: Vec::new() }
    }

    pub fn allows(&self, kind: ResourceKind) -> bool {
        !self.blocked.contains(&kind)
    }
}

/// One isolated page of a renderer session.
#[async_trait]
pub trait RenderedPage: Send {
    async fn navigate(&mut self, url: &Url, wait_until: WaitUntil) -> Result<()>;
    async fn wait_for_selector(&mut self, selector: &str) -> Result<()>;
    /// Serialized DOM of the page.
    async fn content(&mut self) -> Result<String>;
}

/// A running renderer that can open pages.
#[async_trait]
pub trait RendererSession: Send + Sync {
    async fn new_page(&self, filter: &ResourceFilter) -> Result<Box<dyn RenderedPage>>;
    async fn close(&self) -> Result<()>;
}

#[derive(Default)]
struct Leases {
    outstanding: AtomicUsize,
    released: Notify,
}

struct LeaseGuard {
    leases: Arc<Leases>,
}

impl LeaseGuard {
    fn acquire(leases: &Arc<Leases>) -> Self {
        leases.outstanding.fetch_add(1, Ordering::SeqCst);
        Self { leases: Arc::clone(leases) }
    }
}

impl Drop for LeaseGuard {
    fn drop(&mut self) {
        if self.leases.outstanding.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.leases.released.notify_waiters();
        }
    }
}

/// Shared renderer session with lease accounting.
pub struct RendererPool {
    session: Arc<dyn RendererSession>,
    filter: ResourceFilter,
    timeout: Duration,
    leases: Arc<Leases>,
    closed: AtomicBool,
}

impl RendererPool {
    pub fn new(session: Arc<dyn RendererSession>) -> Self {
        Self {
            session,
            filter: ResourceFilter::default(),
            timeout: Duration::from_secs(15),
            leases: Arc::new(Leases::default()),
            closed: AtomicBool::new(false),
        }
    }

    pub fn with_filter(mut self, filter: ResourceFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Deadline applied to navigation and each selector wait.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Leases currently held by tasks.
    pub fn outstanding(&self) -> usize {
        self.leases.outstanding.load(Ordering::SeqCst)
    }

    /// Opens a page for one task.
    ///
    /// # Errors
    ///
    /// Returns [`SyndicError::Renderer`] after shutdown or when the session
    /// cannot open a page.
    pub async fn lease(&self) -> Result<PageLease> {
        // Count the lease before checking `closed` so a concurrent shutdown
        // either rejects it here or waits for it.
        let guard = LeaseGuard::acquire(&self.leases);
        if self.closed.load(Ordering::SeqCst) {
            return Err(SyndicError::Renderer("renderer pool is shut down".to_string()));
        }
        let page = self.session.new_page(&self.filter).await?;
        Ok(PageLease { page, timeout: self.timeout, _guard: guard })
    }

    /// Stops issuing leases, waits for outstanding ones, then closes the session.
    pub async fn shutdown(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        loop {
            let released = self.leases.released.notified();
            let outstanding = self.outstanding();
            if outstanding == 0 {
                break;
            }
            tracing::debug!(outstanding, "waiting for renderer leases");
            released.await;
        }
        self.session.close().await
    }
}

/// A page borrowed from a [`RendererPool`]; returned on drop.
pub struct PageLease {
    page: Box<dyn RenderedPage>,
    timeout: Duration,
    _guard: LeaseGuard,
}

impl PageLease {
    /// Navigates to `url`, optionally waits for `selector`, and returns the DOM.
    ///
    /// # Errors
    ///
    /// Returns [`SyndicError::Timeout`] when navigation or the selector wait
    /// exceeds the pool's deadline, or whatever the driver reports.
    pub async fn render(&mut self, url: &Url, selector: Option<&str>, wait_until: WaitUntil) -> Result<String> {
        let timeout = self.timeout;
        with_deadline(timeout, self.page.navigate(url, wait_until)).await?;
        if let Some(selector) = selector {
            with_deadline(timeout, self.page.wait_for_selector(selector)).await?;
        }
        self.page.content().await
    }
}

async fn with_deadline<F>(timeout: Duration, fut: F) -> Result<()>
where
    F: std::future::Future<Output = Result<()>>,
{
    tokio::time::timeout(timeout, fut)
        .await
        .map_err(|_| SyndicError::Timeout { timeout: timeout.as_secs() })?
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeSession {
        closed: AtomicBool,
        page_delay: Duration,
        selector_delay: Duration,
        visited: Arc<Mutex<Vec<String>>>,
    }

    struct FakePage {
        url: Option<Url>,
        selector_delay: Duration,
        visited: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl RenderedPage for FakePage {
        async fn navigate(&mut self, url: &Url, _wait_until: WaitUntil) -> Result<()> {
            self.visited.lock().unwrap().push(url.to_string());
            self.url = Some(url.clone());
            Ok(())
        }

        async fn wait_for_selector(&mut self, _selector: &str) -> Result<()> {
            tokio::time::sleep(self.selector_delay).await;
            Ok(())
        }

        async fn content(&mut self) -> Result<String> {
            let url = self.url.as_ref().map(Url::as_str).unwrap_or_default();
            Ok(format!("<html><body><article>{url}</article></body></html>"))
        }
    }

    #[async_trait]
    impl RendererSession for FakeSession {
        async fn new_page(&self, filter: &ResourceFilter) -> Result<Box<dyn RenderedPage>> {
            assert!(!filter.allows(ResourceKind::Image));
            tokio::time::sleep(self.page_delay).await;
            Ok(Box::new(FakePage {
                url: None,
                selector_delay: self.selector_delay,
                visited: Arc::clone(&self.visited),
            }))
        }

        async fn close(&self) -> Result<()> {
            self.closed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_lease_renders_and_returns() {
        let session = Arc::new(FakeSession::default());
        let pool = RendererPool::new(session.clone());
        {
            let mut lease = pool.lease().await.unwrap();
            assert_eq!(pool.outstanding(), 1);
            let url = Url::parse("https://example.com/a").unwrap();
            let html = lease.render(&url, Some("article"), WaitUntil::default()).await.unwrap();
            assert!(html.contains("https://example.com/a"));
        }
        assert_eq!(pool.outstanding(), 0);
        assert_eq!(session.visited.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_selector_wait_times_out() {
        let session = Arc::new(FakeSession { selector_delay: Duration::from_secs(60), ..Default::default() });
        let pool = RendererPool::new(session).with_timeout(Duration::from_secs(5));
        let mut lease = pool.lease().await.unwrap();
        let url = Url::parse("https://example.com/slow").unwrap();
        let result = lease.render(&url, Some("#content"), WaitUntil::NetworkIdle).await;
        assert!(matches!(result, Err(SyndicError::Timeout { timeout: 5 })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_waits_for_leases() {
        let session = Arc::new(FakeSession::default());
        let pool = Arc::new(RendererPool::new(session.clone()));

        let first = pool.lease().await.unwrap();
        let second = pool.lease().await.unwrap();
        let holder = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            drop(first);
            tokio::time::sleep(Duration::from_secs(1)).await;
            drop(second);
        });

        let shutdown = {
            let pool = Arc::clone(&pool);
            tokio::spawn(async move { pool.shutdown().await })
        };

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(!session.closed.load(Ordering::SeqCst));
        assert_eq!(pool.outstanding(), 1);

        holder.await.unwrap();
        shutdown.await.unwrap().unwrap();
        assert!(session.closed.load(Ordering::SeqCst));
        assert!(matches!(pool.lease().await, Err(SyndicError::Renderer(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_waits_for_lease_still_opening() {
        let session = Arc::new(FakeSession { page_delay: Duration::from_secs(2), ..Default::default() });
        let pool = Arc::new(RendererPool::new(session.clone()));

        let opening = {
            let pool = Arc::clone(&pool);
            tokio::spawn(async move {
                let lease = pool.lease().await;
                tokio::time::sleep(Duration::from_secs(1)).await;
                lease.is_ok()
            })
        };
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(pool.outstanding(), 1);

        let shutdown = {
            let pool = Arc::clone(&pool);
            tokio::spawn(async move { pool.shutdown().await })
        };
        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert!(!session.closed.load(Ordering::SeqCst));

        assert!(opening.await.unwrap());
        shutdown.await.unwrap().unwrap();
        assert!(session.closed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_rejected_lease_is_not_counted() {
        let session = Arc::new(FakeSession::default());
        let pool = RendererPool::new(session.clone());
        pool.shutdown().await.unwrap();

        assert!(matches!(pool.lease().await, Err(SyndicError::Renderer(_))));
        assert_eq!(pool.outstanding(), 0);
    }

    #[test]
    fn test_resource_filter() {
        assert!(ResourceFilter::default().allows(ResourceKind::Document));
        assert!(!ResourceFilter::default().allows(ResourceKind::Font));
        assert!(ResourceFilter::none().allows(ResourceKind::Media));
    }
}
