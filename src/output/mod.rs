//! Output module for crawl metrics and summaries
//!
//! This module handles:
//! - Live crawl counters shared by all workers
//! - Periodic metrics reporting
//! - Printing the final crawl summary

mod metrics;

pub use metrics::{spawn_reporter, Metrics, MetricsSnapshot};

use crate::crawler::CrawlSummary;

/// Prints a crawl summary to stdout
pub fn print_summary(summary: &CrawlSummary) {
    let metrics = &summary.metrics;

    println!("=== Crawl Summary ===");
    println!();
    println!("Stopped because:   {}", summary.stop_reason);
    println!("Elapsed:           {:.1}s", metrics.elapsed.as_secs_f64());
    println!("Pages crawled:     {}", summary.pages_crawled);
    println!("Pages failed:      {}", metrics.failed);
    println!("Tasks skipped:     {}", metrics.skipped);
    println!("Tasks pending:     {}", summary.pending);
    println!("HTTP exchanges:    {}", metrics.fetch_count);
    println!("Bytes fetched:     {}", metrics.bytes);
    println!("Average latency:   {:.1}ms", metrics.avg_latency_ms);

    if !metrics.top_failing_hosts.is_empty() {
        println!();
        println!("Hosts with the most failures:");
        for (host, count) in &metrics.top_failing_hosts {
            println!("  {:<40} {}", host, count);
        }
    }
}
