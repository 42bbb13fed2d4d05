//! Crawl coordinator - engine assembly and supervision
//!
//! This module contains the orchestration of a crawl, including:
//! - Building the fetcher, robots cache, rate limiter and frontier
//! - Seeding the frontier from seeds and, optionally, sitemaps
//! - Spawning the worker pool and the metrics reporter
//! - Watching the termination conditions
//! - Shutting everything down within a bounded grace period

use crate::config::Config;
use crate::crawler::fetcher::Fetcher;
use crate::crawler::parser::{HtmlParser, PageParser};
use crate::crawler::sitemap::SitemapFetcher;
use crate::crawler::worker::{run_worker, WorkerContext};
use crate::frontier::{Frontier, VisitedSet};
use crate::output::{spawn_reporter, Metrics, MetricsSnapshot};
use crate::robots::{RobotsCache, RobotsFetcher};
use crate::state::{HostRateLimiter, PageBudget};
use crate::storage::PageStorage;
use crate::url::{host_of, is_host_allowed, normalize};
use crate::CrawlerError;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Why a crawl stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// `maxPages` pages were committed
    BudgetReached,

    /// The frontier stayed empty with nothing in flight for the grace window
    FrontierExhausted,

    /// Shutdown was requested from outside (e.g. Ctrl-C)
    Cancelled,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BudgetReached => write!(f, "page budget reached"),
            Self::FrontierExhausted => write!(f, "frontier exhausted"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Result of a completed crawl
#[derive(Debug, Clone)]
pub struct CrawlSummary {
    pub stop_reason: StopReason,
    /// Pages committed against the budget
    pub pages_crawled: usize,
    /// Tasks still queued when the crawl stopped
    pub pending: usize,
    pub metrics: MetricsSnapshot,
}

impl fmt::Display for CrawlSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Crawl finished ({}): {} page(s) crawled, {} pending, {}",
            self.stop_reason, self.pages_crawled, self.pending, self.metrics
        )
    }
}

/// Timing knobs for the supervisor
#[derive(Debug, Clone, Copy)]
struct Supervision {
    tick: Duration,
    empty_grace: Duration,
    shutdown_grace: Duration,
    metrics_interval: Duration,
}

/// Main crawl engine
///
/// Owns every component of a crawl. Build it with [`CrawlEngine::new`],
/// optionally swap collaborators with the `with_*` methods, then consume it
/// with [`CrawlEngine::run`].
pub struct CrawlEngine {
    config: Arc<Config>,
    frontier: Arc<Frontier>,
    fetcher: Fetcher,
    robots: RobotsCache,
    sitemaps: Option<SitemapFetcher>,
    parser: Arc<dyn PageParser>,
    storage: Arc<dyn PageStorage>,
    metrics: Arc<Metrics>,
    cancel: CancellationToken,
}

impl CrawlEngine {
    /// Creates a new engine
    ///
    /// The frontier is in memory unless `frontierDb` is configured, in which
    /// case pending tasks from an earlier run are resumed.
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    /// * `storage` - Where crawled pages are persisted
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlEngine)` - All components were built
    /// * `Err(CrawlerError)` - A component could not be built; the run cannot start
    pub fn new(config: Config, storage: Arc<dyn PageStorage>) -> Result<Self, CrawlerError> {
        let crawler = &config.crawler;
        let proxy = crawler.proxy();

        let fetcher = Fetcher::from_config(crawler)?;

        let robots_fetcher =
            RobotsFetcher::new(&crawler.user_agent, crawler.robots_timeout(), proxy.as_ref())
                .map_err(|e| CrawlerError::Bootstrap(format!("robots.txt client: {}", e)))?;

        let sitemaps = if crawler.follow_sitemaps {
            Some(
                SitemapFetcher::new(&crawler.user_agent, crawler.request_timeout(), proxy.as_ref())
                    .map_err(|e| CrawlerError::Bootstrap(format!("sitemap client: {}", e)))?,
            )
        } else {
            None
        };

        let frontier = match &crawler.frontier_db {
            Some(path) => {
                let frontier = Frontier::open_sqlite(path).map_err(|e| {
                    CrawlerError::Bootstrap(format!(
                        "cannot open frontier database {}: {}",
                        path.display(),
                        e
                    ))
                })?;
                tracing::info!(
                    "Opened durable frontier {} with {} pending task(s)",
                    path.display(),
                    frontier.len()
                );
                frontier
            }
            None => Frontier::in_memory(),
        };

        Ok(Self {
            config: Arc::new(config),
            frontier: Arc::new(frontier),
            fetcher,
            robots: RobotsCache::new(robots_fetcher),
            sitemaps,
            parser: Arc::new(HtmlParser),
            storage,
            metrics: Arc::new(Metrics::new()),
            cancel: CancellationToken::new(),
        })
    }

    /// Replaces the HTML parser
    pub fn with_parser(mut self, parser: Arc<dyn PageParser>) -> Self {
        self.parser = parser;
        self
    }

    /// Replaces the frontier
    pub fn with_frontier(mut self, frontier: Frontier) -> Self {
        self.frontier = Arc::new(frontier);
        self
    }

    /// Token that stops the crawl when cancelled
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Shared handle to the live metrics
    pub fn metrics(&self) -> Arc<Metrics> {
        self.metrics.clone()
    }

    /// Runs the crawl to completion
    ///
    /// 1. Seeds the frontier at depth 0 (and sitemap URLs at depth 1)
    /// 2. Spawns the worker pool and metrics reporter
    /// 3. Supervises until the budget is reached, the frontier is exhausted,
    ///    or the cancel token fires
    /// 4. Stops the workers, waiting at most `shutdownGraceMs`
    /// 5. Closes the frontier and returns the summary
    ///
    /// # Arguments
    ///
    /// * `seeds` - Seed URLs; normalized before being queued
    ///
    /// # Returns
    ///
    /// A [`CrawlSummary`]. Budget and frontier exhaustion are both normal
    /// completions.
    pub async fn run(self, seeds: &[String]) -> CrawlSummary {
        let crawler = &self.config.crawler;
        let supervision = Supervision {
            tick: crawler.supervisor_tick(),
            empty_grace: crawler.empty_grace(),
            shutdown_grace: crawler.shutdown_grace(),
            metrics_interval: crawler.metrics_interval(),
        };
        let workers = crawler.workers;

        self.seed(seeds).await;

        let ctx = Arc::new(WorkerContext {
            max_depth: crawler.max_depth,
            max_body_bytes: crawler.max_body_bytes,
            poll_timeout: supervision.tick,
            allowed_hosts: self.config.allowed_hosts.clone(),
            frontier: self.frontier.clone(),
            visited: VisitedSet::new(),
            budget: PageBudget::new(crawler.max_pages),
            robots: self.robots,
            limiter: HostRateLimiter::new(crawler.politeness_interval()),
            fetcher: self.fetcher,
            parser: self.parser,
            storage: self.storage,
            metrics: self.metrics.clone(),
            cancel: self.cancel.clone(),
        });

        tracing::info!(
            "Starting crawl with {} worker(s), {} task(s) queued, max {} page(s) to depth {}",
            workers,
            self.frontier.len(),
            crawler.max_pages,
            crawler.max_depth
        );

        let reporter_cancel = CancellationToken::new();
        let reporter = spawn_reporter(
            self.metrics.clone(),
            supervision.metrics_interval,
            reporter_cancel.clone(),
        );

        let mut pool = JoinSet::new();
        for id in 0..workers {
            pool.spawn(run_worker(id, ctx.clone()));
        }

        let stop_reason = supervise(&ctx, supervision).await;
        tracing::info!("Stopping crawl: {}", stop_reason);

        self.cancel.cancel();
        shutdown_workers(&mut pool, supervision.shutdown_grace).await;

        reporter_cancel.cancel();
        let _ = reporter.await;

        let pending = self.frontier.len();
        self.frontier.close();

        let summary = CrawlSummary {
            stop_reason,
            pages_crawled: ctx.budget.committed(),
            pending,
            metrics: self.metrics.snapshot(),
        };
        tracing::info!("Final metrics {}", summary.metrics);

        summary
    }

    /// Queues seeds at depth 0 and sitemap entries at depth 1
    async fn seed(&self, seeds: &[String]) {
        let allowed = &self.config.allowed_hosts;

        for seed in seeds {
            let url = normalize(seed);
            if !queue_if_allowed(&self.frontier, allowed, &url, 0) {
                tracing::warn!("Seed {} is not crawlable, ignoring", seed);
            }
        }

        let Some(sitemaps) = &self.sitemaps else {
            return;
        };

        let mut seen_origins = HashSet::new();
        for seed in seeds {
            let url = normalize(seed);
            let Some(origin) = crate::url::origin_of(&url) else {
                continue;
            };
            if !seen_origins.insert(origin) {
                continue;
            }

            let rules = self.robots.rules_for(&url).await;
            for sitemap_url in rules.sitemap_urls() {
                let locs = sitemaps.fetch(sitemap_url).await;
                let queued = locs
                    .iter()
                    .filter(|loc| queue_if_allowed(&self.frontier, allowed, &normalize(loc), 1))
                    .count();
                tracing::info!("Queued {} URL(s) from sitemap {}", queued, sitemap_url);
            }
        }
    }
}

/// Adds `url` at `depth` when its host is allowed
fn queue_if_allowed(frontier: &Frontier, allowed: &HashSet<String>, url: &str, depth: u32) -> bool {
    let Some(host) = host_of(url) else {
        return false;
    };
    if !is_host_allowed(&host, allowed) {
        return false;
    }

    match frontier.add(url, depth) {
        Ok(_) => true,
        Err(e) => {
            tracing::warn!("Failed to queue {}: {}", url, e);
            false
        }
    }
}

/// Watches the crawl until it should stop
///
/// The frontier counts as exhausted only when it is empty with no task in
/// flight on two checks at least `empty_grace` apart, with no activity seen
/// in between.
async fn supervise(ctx: &WorkerContext, supervision: Supervision) -> StopReason {
    let mut ticker = tokio::time::interval(supervision.tick);
    let mut idle_since: Option<Instant> = None;

    loop {
        tokio::select! {
            _ = ctx.cancel.cancelled() => {
                return if ctx.budget.is_exhausted() {
                    StopReason::BudgetReached
                } else {
                    StopReason::Cancelled
                };
            }
            _ = ticker.tick() => {}
        }

        if ctx.budget.is_exhausted() {
            return StopReason::BudgetReached;
        }

        let idle = ctx.frontier.is_empty() && ctx.metrics.in_flight() == 0;
        if !idle {
            idle_since = None;
            continue;
        }

        match idle_since {
            None => idle_since = Some(Instant::now()),
            Some(since) if since.elapsed() >= supervision.empty_grace => {
                return StopReason::FrontierExhausted;
            }
            Some(_) => {}
        }
    }
}

/// Waits for workers to finish, aborting any still running after `grace`
async fn shutdown_workers(pool: &mut JoinSet<()>, grace: Duration) {
    let drained = tokio::time::timeout(grace, async {
        while let Some(result) = pool.join_next().await {
            if let Err(e) = result {
                tracing::error!("Worker ended abnormally: {}", e);
            }
        }
    })
    .await;

    if drained.is_err() {
        tracing::warn!(
            "{} worker(s) still busy after {:?}, aborting",
            pool.len(),
            grace
        );
        pool.abort_all();
        while pool.join_next().await.is_some() {}
    }
}
