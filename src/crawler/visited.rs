use dashmap::DashSet;

/// Concurrent set of normalized URLs that have been claimed for crawling
///
/// The set only grows. `try_claim` is the sole dedup gate: a URL is pushed to
/// the frontier if and only if its claim succeeded.
#[derive(Debug, Default)]
pub struct VisitedSet {
    urls: DashSet<String>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `url` as visited; returns `true` only for the first caller
    ///
    /// The insert checks and inserts under one shard lock, so two workers
    /// racing on one URL can never both win. The `contains` read only saves
    /// an allocation for already-known URLs.
    pub fn try_claim(&self, url: &str) -> bool {
        if self.urls.contains(url) {
            return false;
        }
        self.urls.insert(url.to_string())
    }

    pub fn contains(&self, url: &str) -> bool {
        self.urls.contains(url)
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}
