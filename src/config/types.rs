use serde::Deserialize;

/// Main configuration structure for Ripple-Crawl
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub fetcher: FetcherConfig,
    pub output: OutputConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Number of worker threads draining the frontier
    pub workers: usize,

    /// Maximum depth to crawl from the seed URL
    #[serde(rename = "max-depth")]
    pub max_depth: u32,

    /// Minimum time between requests to the same domain (milliseconds)
    #[serde(rename = "delay-ms")]
    pub delay_ms: u64,

    /// How long an idle worker waits before re-checking for work (milliseconds)
    #[serde(rename = "poll-interval-ms")]
    pub poll_interval_ms: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            max_depth: 3,
            delay_ms: 1000,
            poll_interval_ms: 100,
        }
    }
}

/// HTTP fetcher configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetcherConfig {
    /// Whole-request timeout (seconds)
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,

    /// Maximum number of redirects followed per request
    #[serde(rename = "max-redirects")]
    pub max_redirects: usize,

    /// User-Agent header sent with every request
    #[serde(rename = "user-agent")]
    pub user_agent: String,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            max_redirects: 10,
            user_agent: format!("ripple-crawl/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory receiving one `thread_<id>.json` file per worker
    pub directory: String,

    /// Whether to run the repair pass over the output files after the crawl
    pub finalize: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: "crawler_output".to_string(),
            finalize: true,
        }
    }
}
