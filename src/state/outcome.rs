/// Task outcome definitions
///
/// Every task pulled from the frontier ends in exactly one of these outcomes.
use std::fmt;

/// Result of processing a single crawl task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    /// Page was fetched, parsed, persisted and committed
    Fetched {
        url: String,
        depth: u32,
        status_code: u16,
        bytes: usize,
        links_enqueued: usize,
    },

    /// Page was deliberately not fetched (or not kept) because of policy
    Skipped { url: String, reason: SkipReason },

    /// Page was attempted but did not succeed
    Failed { url: String, reason: FailureReason },

    /// Shutdown was signalled before the fetch began
    Interrupted { url: String },
}

/// Why a task was skipped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Host is absent from the configured allow-list
    HostNotAllowed,

    /// URL was already dispatched to a fetch
    AlreadyVisited,

    /// Task depth exceeds the configured maximum
    DepthExceeded { depth: u32, max_depth: u32 },

    /// robots.txt disallows the path
    RobotsDisallowed,

    /// Response Content-Type is not HTML
    NotHtml { content_type: Option<String> },

    /// Advertised Content-Length is over the body cap
    TooLarge { length: u64, limit: u64 },

    /// URL could not be parsed or has no host
    InvalidUrl,
}

/// Why a task failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// Network failure after the fetcher exhausted its retries
    Fetch(String),

    /// Response arrived with a non-200 status
    HttpStatus(u16),
}

impl TaskOutcome {
    /// The URL this outcome is about
    pub fn url(&self) -> &str {
        match self {
            Self::Fetched { url, .. }
            | Self::Skipped { url, .. }
            | Self::Failed { url, .. }
            | Self::Interrupted { url } => url,
        }
    }

    pub fn is_fetched(&self) -> bool {
        matches!(self, Self::Fetched { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// Short label used in log lines
    pub fn label(&self) -> &'static str {
        match self {
            Self::Fetched { .. } => "fetched",
            Self::Skipped { .. } => "skipped",
            Self::Failed { .. } => "failed",
            Self::Interrupted { .. } => "interrupted",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HostNotAllowed => write!(f, "host not in allow-list"),
            Self::AlreadyVisited => write!(f, "already visited"),
            Self::DepthExceeded { depth, max_depth } => {
                write!(f, "depth {} exceeds max depth {}", depth, max_depth)
            }
            Self::RobotsDisallowed => write!(f, "disallowed by robots.txt"),
            Self::NotHtml { content_type } => write!(
                f,
                "not HTML (content-type: {})",
                content_type.as_deref().unwrap_or("none")
            ),
            Self::TooLarge { length, limit } => {
                write!(f, "body of {} bytes exceeds {} byte cap", length, limit)
            }
            Self::InvalidUrl => write!(f, "not a crawlable URL"),
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fetch(message) => write!(f, "fetch error: {}", message),
            Self::HttpStatus(code) => write!(f, "HTTP {}", code),
        }
    }
}

impl fmt::Display for TaskOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fetched {
                url,
                depth,
                status_code,
                bytes,
                links_enqueued,
            } => write!(
                f,
                "fetched {} (depth {}, HTTP {}, {} bytes, {} links enqueued)",
                url, depth, status_code, bytes, links_enqueued
            ),
            Self::Skipped { url, reason } => write!(f, "skipped {}: {}", url, reason),
            Self::Failed { url, reason } => write!(f, "failed {}: {}", url, reason),
            Self::Interrupted { url } => write!(f, "interrupted {}", url),
        }
    }
}
