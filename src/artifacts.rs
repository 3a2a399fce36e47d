//! Artifact path layout and remote URL mapping.
//!
//! Every pipeline output is a named file under the data directory, and every
//! one of them may also exist precomputed at `{remote_base}/{relative-path}`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::constants::artifacts;

/// Relative paths of the aggregate tables, in production order.
pub const STAT_TABLES: [&str; 9] = [
    artifacts::DAILY,
    artifacts::BY_HOUR,
    artifacts::BY_WEEKDAY,
    artifacts::BY_AUTHOR,
    artifacts::TOP_POSTS,
    artifacts::TOP_TOKENS,
    artifacts::TOP_BIGRAMS,
    artifacts::TOP_DOMAINS,
    artifacts::ENG_CORR,
];

/// Resolves artifact names to paths under one data directory.
#[derive(Clone, Debug)]
pub struct DataLayout {
    data_dir: PathBuf,
}

impl DataLayout {
    /// Layout rooted at `data_dir`.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// The data directory itself.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Absolute path of an artifact given its relative name.
    pub fn path(&self, relative: &str) -> PathBuf {
        self.data_dir.join(relative)
    }

    /// Canonical merged table.
    pub fn main_csv(&self) -> PathBuf {
        self.path(artifacts::MAIN)
    }

    /// Clean (enriched) table.
    pub fn clean_csv(&self) -> PathBuf {
        self.path(artifacts::CLEAN)
    }

    /// Morphologically tokenized table.
    pub fn tokenized_parquet(&self) -> PathBuf {
        self.path(artifacts::TOKENIZED)
    }

    /// Create the data directory and the stats subdirectory.
    pub fn ensure_dirs(&self) -> io::Result<()> {
        fs::create_dir_all(self.data_dir.join(artifacts::STATS_DIR))
    }
}

/// Remote location of an artifact: `{base}/{relative-path}`.
pub fn remote_url(base: &str, relative: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), relative)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_places_stats_under_subdirectory() {
        let layout = DataLayout::new("/tmp/gall");
        assert_eq!(layout.main_csv(), PathBuf::from("/tmp/gall/main.csv"));
        assert_eq!(
            layout.path(artifacts::TOP_TOKENS),
            PathBuf::from("/tmp/gall/stats/top_tokens.csv")
        );
    }

    #[test]
    fn remote_url_tolerates_trailing_slash() {
        assert_eq!(
            remote_url("https://raw.example.com/data/", "stats/by_author.csv"),
            "https://raw.example.com/data/stats/by_author.csv"
        );
    }
}
