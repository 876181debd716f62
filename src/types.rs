use serde::{Deserialize, Serialize};

/// Read state of an entry as reported by Miniflux.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    Unread,
    Read,
}

/// A single article within a feed. Owned by the Miniflux instance; we only
/// read entries and request status transitions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry {
    pub id: i64,
    pub feed_id: i64,
    pub status: EntryStatus,
    #[serde(default)]
    pub title: String,
    pub url: String,
}

/// A subscribed feed. The opt-in marker for paywall filtering lives in
/// `rewrite_rules` as a named rule tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feed {
    pub id: i64,
    pub feed_url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub rewrite_rules: String,
}

/// Tunables for a filter run. Everything here mirrors upstream behavior we
/// don't control (Substack wording, URL shape), so none of it is compiled in.
#[derive(Debug, Clone)]
pub struct FilterConfig {
    /// Substring matched against a feed's URL to detect the target platform.
    pub platform_pattern: String,
    /// Rewrite-rule tag a feed owner sets to force filtering for that feed.
    pub opt_in_tag: String,
    /// Acceptable paywall-notice wordings, matched case-sensitively against
    /// the thread header. Multi-valued because Substack has reworded it.
    pub notice_texts: Vec<String>,
    /// When true, log the would-be-marked ids instead of writing.
    pub dry_run: bool,
    /// Capacity of the classified-entry LRU cache.
    pub cache_capacity: usize,
    pub user_agent: String,
    pub fetch_timeout_seconds: u64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            platform_pattern: "substack".to_string(),
            opt_in_tag: "paywall-filter".to_string(),
            notice_texts: crate::classifier::default_notice_texts(),
            dry_run: false,
            cache_capacity: 1024,
            user_agent: "miniflux-paywall-filter/0.1".to_string(),
            fetch_timeout_seconds: 30,
        }
    }
}

/// Counters from a single filter pass, for the caller's summary log line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Unread entries returned by the feed source.
    pub scanned: usize,
    /// Entries whose feed opted in or matched the platform pattern.
    pub candidates: usize,
    /// Candidate pages actually fetched (cache misses that returned 200).
    pub fetched: usize,
    /// Entries classified as paywalled this run.
    pub paywalled: usize,
    /// Entries included in the mark-as-read write (0 under dry-run).
    pub marked: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum FilterError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API request failed ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("unexpected status {status} fetching {url}")]
    Status { url: String, status: u16 },

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("selector error: {0}")]
    Selector(String),

    #[error("config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, FilterError>;
