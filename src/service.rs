use crate::cache::SeenCache;
use crate::classifier::PaywallClassifier;
use crate::fetcher::PageFetcher;
use crate::miniflux::FeedSource;
use crate::types::{Feed, FilterConfig, Result, RunSummary};
use scraper::Html;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// The filter job: selects candidate unread entries, classifies their pages,
/// and batch-marks paywalled ones as read.
pub struct FilterService<S: FeedSource> {
    source: S,
    fetcher: PageFetcher,
    classifier: PaywallClassifier,
    cache: SeenCache,
    config: FilterConfig,
}

impl<S: FeedSource> FilterService<S> {
    pub fn new(source: S, config: FilterConfig) -> Result<Self> {
        let fetcher = PageFetcher::new(&config.user_agent, config.fetch_timeout_seconds)?;
        let classifier = PaywallClassifier::new(config.notice_texts.clone())?;
        let cache = SeenCache::new(config.cache_capacity);
        Ok(Self {
            source,
            fetcher,
            classifier,
            cache,
            config,
        })
    }

    /// One complete synchronous pass over the unread queue.
    ///
    /// Listing entries or feeds failing aborts the run; a fetch or decode
    /// failure on a single page only skips that entry, leaving it uncached
    /// so the next run retries it. Successfully classified entries are
    /// cached whether paywalled or not and never re-fetched until evicted.
    pub async fn run_filter_job(&mut self) -> Result<RunSummary> {
        let entries = self.source.unread_entries().await?;
        let feeds = self.source.feeds().await?;
        let feeds_by_id: HashMap<i64, &Feed> = feeds.iter().map(|f| (f.id, f)).collect();

        let mut summary = RunSummary {
            scanned: entries.len(),
            ..RunSummary::default()
        };
        let mut paywalled_ids: Vec<i64> = Vec::new();

        for entry in &entries {
            let Some(feed) = feeds_by_id.get(&entry.feed_id) else {
                warn!(
                    "Entry {} references unknown feed {}, skipping",
                    entry.id, entry.feed_id
                );
                continue;
            };
            if !self.is_candidate(feed) {
                continue;
            }
            summary.candidates += 1;

            if self.cache.contains(entry.id) {
                debug!("Skipping cached entry {}", entry.id);
                continue;
            }

            let body = match self.fetcher.fetch(&entry.url).await {
                Ok(body) => body,
                Err(e) => {
                    warn!("Unable to get body for entry {}: {}", entry.id, e);
                    continue;
                }
            };
            summary.fetched += 1;

            let paywalled = {
                let document = Html::parse_document(&body);
                self.classifier.classify(&document)
            };
            debug!(
                "Classified entry {} ({}): paywalled={}",
                entry.id, entry.url, paywalled
            );

            // Cache both outcomes; only fetch failures stay retryable.
            self.cache.insert(entry.id);
            if paywalled {
                paywalled_ids.push(entry.id);
            }
        }

        summary.paywalled = paywalled_ids.len();
        if paywalled_ids.is_empty() {
            return Ok(summary);
        }

        if self.config.dry_run {
            info!(
                "Dry run: would have marked entries as read: {:?}",
                paywalled_ids
            );
            return Ok(summary);
        }

        self.source.mark_entries_read(&paywalled_ids).await?;
        summary.marked = paywalled_ids.len();
        info!("Marked {} paywalled entries as read", summary.marked);
        Ok(summary)
    }

    /// A feed participates if its owner opted in via the rewrite-rule tag,
    /// or its URL matches the target platform.
    fn is_candidate(&self, feed: &Feed) -> bool {
        let opted_in =
            !self.config.opt_in_tag.is_empty() && feed.rewrite_rules.contains(&self.config.opt_in_tag);
        opted_in || feed.feed_url.contains(&self.config.platform_pattern)
    }

    pub fn cache(&self) -> &SeenCache {
        &self.cache
    }
}
