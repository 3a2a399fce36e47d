use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{remote, stats};

/// Top-level pipeline configuration.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Directory holding raw shards and all produced artifacts.
    pub data_dir: PathBuf,
    /// Base URL for precomputed artifacts (`{base}/{relative-path}`).
    ///
    /// `None` disables the remote-fetch step entirely.
    pub remote_base: Option<String>,
    /// Bound on each remote artifact GET.
    pub fetch_timeout: Duration,
    /// Cap for the top-token table.
    pub top_tokens: usize,
    /// Cap for the top-bigram table.
    pub top_bigrams: usize,
    /// Cap for the top-domain table.
    pub top_domains: usize,
    /// Cap for the top-post table.
    pub top_posts: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            remote_base: None,
            fetch_timeout: Duration::from_secs(remote::DEFAULT_TIMEOUT_SECS),
            top_tokens: stats::TOP_TOKENS,
            top_bigrams: stats::TOP_BIGRAMS,
            top_domains: stats::TOP_DOMAINS,
            top_posts: stats::TOP_POSTS,
        }
    }
}

impl PipelineConfig {
    /// Create a config rooted at `data_dir` with defaults elsewhere.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    /// Configure the remote artifact base URL.
    pub fn with_remote_base(mut self, base: impl Into<String>) -> Self {
        self.remote_base = Some(base.into());
        self
    }

    /// Configure the remote fetch timeout.
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }
}
