use crate::types::{FilterError, Result};
use scraper::{Html, Selector};

/// Paywall-notice wordings Substack has used across revisions. The upstream
/// text is not under our control and has drifted at least once, so the
/// matcher accepts a configurable list rather than a single literal.
const NOTICE_TEXTS: &[&str] = &[
    "only visible to paying subscribers of",
    "only visible to paid subscribers of",
];

pub fn default_notice_texts() -> Vec<String> {
    NOTICE_TEXTS.iter().map(|s| s.to_string()).collect()
}

/// Decides whether a rendered Substack page is paywalled.
///
/// Substack renders standalone posts and discussion threads with different
/// DOM shapes, so two independent predicates are needed; any positive match
/// marks the page paywalled.
pub struct PaywallClassifier {
    post_marker: Selector,
    thread_head: Selector,
    notice_texts: Vec<String>,
}

impl PaywallClassifier {
    pub fn new(notice_texts: Vec<String>) -> Result<Self> {
        let post_marker = Selector::parse("article.post .paywall")
            .map_err(|e| FilterError::Selector(e.to_string()))?;
        let thread_head = Selector::parse(".thread-head")
            .map_err(|e| FilterError::Selector(e.to_string()))?;
        Ok(Self {
            post_marker,
            thread_head,
            notice_texts,
        })
    }

    /// OR of all predicates over the parsed document.
    pub fn classify(&self, document: &Html) -> bool {
        self.has_post_marker(document) || self.has_thread_notice(document)
    }

    /// A `.paywall` node under the `article.post` container. Presence alone
    /// is sufficient; Substack no longer guarantees determinate text inside
    /// the marker, so its content is not inspected.
    fn has_post_marker(&self, document: &Html) -> bool {
        document.select(&self.post_marker).next().is_some()
    }

    /// The thread header carries a literal subscribers-only notice on
    /// paywalled discussion threads. Case-sensitive substring match against
    /// the configured wordings.
    fn has_thread_notice(&self, document: &Html) -> bool {
        for head in document.select(&self.thread_head) {
            let text: String = head.text().collect();
            if self.notice_texts.iter().any(|n| text.contains(n.as_str())) {
                return true;
            }
        }
        false
    }
}
