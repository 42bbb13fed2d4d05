//! Worker loop
//!
//! Each worker reserves a budget slot, polls one task and drives it through
//! [`process_task`], which returns a tagged [`TaskOutcome`]. Metrics and logs
//! are recorded from the outcome in one place.

use crate::crawler::fetcher::Fetcher;
use crate::crawler::parser::PageParser;
use crate::frontier::{CrawlTask, Frontier, VisitedSet};
use crate::output::Metrics;
use crate::robots::RobotsCache;
use crate::state::{FailureReason, HostRateLimiter, PageBudget, SkipReason, TaskOutcome};
use crate::storage::{PageRecord, PageStorage};
use crate::url::{host_of, is_host_allowed, normalize};
use crate::FetchError;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::SemaphorePermit;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Shared state every worker reads and updates
pub(crate) struct WorkerContext {
    pub max_depth: u32,
    pub max_body_bytes: u64,
    pub poll_timeout: Duration,
    pub allowed_hosts: HashSet<String>,
    pub frontier: Arc<Frontier>,
    pub visited: VisitedSet,
    pub budget: PageBudget,
    pub robots: RobotsCache,
    pub limiter: HostRateLimiter,
    pub fetcher: Fetcher,
    pub parser: Arc<dyn PageParser>,
    pub storage: Arc<dyn PageStorage>,
    pub metrics: Arc<Metrics>,
    pub cancel: CancellationToken,
}

/// Keeps the in-flight gauge honest even if processing panics
struct InFlight<'a>(&'a Metrics);

impl<'a> InFlight<'a> {
    fn start(metrics: &'a Metrics) -> Self {
        metrics.task_started();
        Self(metrics)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.task_finished();
    }
}

/// Runs one worker until the crawl is cancelled
pub(crate) async fn run_worker(id: usize, ctx: Arc<WorkerContext>) {
    tracing::debug!("Worker {} started", id);

    loop {
        let slot = tokio::select! {
            _ = ctx.cancel.cancelled() => break,
            slot = ctx.budget.reserve() => match slot {
                Ok(slot) => slot,
                Err(_) => break,
            },
        };

        let task = tokio::select! {
            _ = ctx.cancel.cancelled() => break,
            task = ctx.frontier.poll(ctx.poll_timeout) => task,
        };

        // Nothing pending; the slot goes back with `slot`
        let Some(task) = task else {
            continue;
        };

        let _in_flight = InFlight::start(&ctx.metrics);
        let outcome = process_task(&ctx, &task, slot).await;
        record_outcome(&ctx, &outcome);
    }

    tracing::debug!("Worker {} stopped", id);
}

/// Drives a single task from poll to outcome
///
/// # Task Flow
///
/// 1. Normalize the URL
/// 2. Skip hosts outside the allow-list
/// 3. Skip URLs already visited
/// 4. Skip tasks deeper than `maxDepth`
/// 5. Skip paths robots.txt disallows
/// 6. Claim the URL and wait for the host's politeness interval
/// 7. Fetch (the fetcher retries I/O failures)
/// 8. Classify: non-200 fails; non-HTML and oversized bodies are skipped
/// 9. Parse title and links
/// 10. Persist (failures are logged, not fatal)
/// 11. Commit against the page budget; the last page stops the crawl
/// 12. Enqueue unvisited, allowed links one level deeper
///
/// The budget `slot` is consumed on commit and released on any other outcome.
pub(crate) async fn process_task(
    ctx: &WorkerContext,
    task: &CrawlTask,
    slot: SemaphorePermit<'_>,
) -> TaskOutcome {
    let url = normalize(&task.url);

    let Some(host) = host_of(&url) else {
        return skipped(&url, SkipReason::InvalidUrl);
    };

    if !is_host_allowed(&host, &ctx.allowed_hosts) {
        return skipped(&url, SkipReason::HostNotAllowed);
    }

    if ctx.visited.contains(&url) {
        return skipped(&url, SkipReason::AlreadyVisited);
    }

    if task.depth > ctx.max_depth {
        return skipped(&url, SkipReason::DepthExceeded {
            depth: task.depth,
            max_depth: ctx.max_depth,
        });
    }

    if !ctx.robots.is_allowed(&url).await {
        return skipped(&url, SkipReason::RobotsDisallowed);
    }

    // Another worker may have claimed the URL while robots was consulted
    if !ctx.visited.claim(&url) {
        return skipped(&url, SkipReason::AlreadyVisited);
    }

    if !ctx.limiter.acquire(&host, &ctx.cancel).await || ctx.cancel.is_cancelled() {
        return TaskOutcome::Interrupted { url };
    }

    let started = Instant::now();
    let result = match ctx.fetcher.fetch(&url, &ctx.cancel).await {
        Ok(result) => result,
        Err(FetchError::Cancelled { .. }) => return TaskOutcome::Interrupted { url },
        Err(e) => {
            return TaskOutcome::Failed {
                url,
                reason: FailureReason::Fetch(e.to_string()),
            }
        }
    };
    ctx.metrics
        .record_fetch(started.elapsed().as_millis() as u64, result.body.len() as u64);

    if result.status_code != 200 {
        return TaskOutcome::Failed {
            url,
            reason: FailureReason::HttpStatus(result.status_code),
        };
    }

    if !result.is_html() {
        return skipped(&url, SkipReason::NotHtml {
            content_type: result.content_type.clone(),
        });
    }

    if let Some(length) = result.content_length {
        if length > ctx.max_body_bytes {
            return skipped(&url, SkipReason::TooLarge {
                length,
                limit: ctx.max_body_bytes,
            });
        }
    }

    let base_url = Url::parse(&result.final_url).or_else(|_| Url::parse(&url));
    let parsed = match base_url {
        Ok(base_url) => ctx.parser.parse(&result.text(), &base_url),
        Err(_) => Default::default(),
    };

    let record = PageRecord {
        url: url.clone(),
        title: parsed.title,
        body: result.body,
        links: parsed.links,
    };
    if let Err(e) = ctx.storage.save(&record) {
        tracing::warn!("Failed to store {}: {}", url, e);
    }

    let crawled = ctx.budget.commit(slot);
    ctx.visited.claim(&url);
    ctx.metrics.record_page();
    if crawled >= ctx.budget.max_pages() {
        tracing::info!("Page budget of {} reached, stopping crawl", crawled);
        ctx.cancel.cancel();
    }

    let links_enqueued = enqueue_links(ctx, &record.links, task.depth + 1);

    TaskOutcome::Fetched {
        url,
        depth: task.depth,
        status_code: result.status_code,
        bytes: record.body.len(),
        links_enqueued,
    }
}

fn skipped(url: &str, reason: SkipReason) -> TaskOutcome {
    TaskOutcome::Skipped {
        url: url.to_string(),
        reason,
    }
}

/// Adds each allowed, unvisited link to the frontier at `depth`
///
/// The same URL may be queued more than once; duplicates are skipped when
/// polled.
fn enqueue_links(ctx: &WorkerContext, links: &[String], depth: u32) -> usize {
    let mut enqueued = 0;

    for link in links {
        let link = normalize(link);
        let Some(host) = host_of(&link) else {
            continue;
        };
        if !is_host_allowed(&host, &ctx.allowed_hosts) || ctx.visited.contains(&link) {
            continue;
        }

        match ctx.frontier.add(&link, depth) {
            Ok(_) => enqueued += 1,
            Err(e) => {
                tracing::debug!("Stopped enqueueing links: {}", e);
                break;
            }
        }
    }

    enqueued
}

/// Logs an outcome and updates the matching counters
fn record_outcome(ctx: &WorkerContext, outcome: &TaskOutcome) {
    match outcome {
        TaskOutcome::Fetched { .. } => tracing::info!("{}", outcome),
        TaskOutcome::Skipped { .. } => {
            ctx.metrics.record_skip();
            tracing::debug!("{}", outcome);
        }
        TaskOutcome::Failed { url, .. } => {
            let host = host_of(url).unwrap_or_default();
            ctx.metrics.record_failure(&host);
            tracing::warn!("{}", outcome);
        }
        TaskOutcome::Interrupted { .. } => tracing::debug!("{}", outcome),
    }
}
