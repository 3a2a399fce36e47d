//! Staged cache orchestrator.
//!
//! Each artifact is produced by one `ensure_*` entry point with the same
//! resolution order: an existing file is reused as-is, a configured remote
//! base is tried next, and only then is the artifact built locally from the
//! stage below it. `force` skips the first two steps for the requested stage
//! without invalidating the stages it depends on.

use once_cell::unsync::OnceCell;
use tracing::{debug, info, warn};

use crate::artifacts::{remote_url, DataLayout, STAT_TABLES};
use crate::config::PipelineConfig;
use crate::constants::artifacts;
use crate::data::CleanPost;
use crate::enrich::attach_clean_tokens;
use crate::errors::PipelineError;
use crate::merge::merge_shards;
use crate::remote::RemoteFetcher;
use crate::stats;
use crate::store;
use crate::tokenize::RegexTokenizer;
use crate::types::ArtifactPath;

/// How an `ensure_*` call satisfied its artifact.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StageOutcome {
    /// The artifact already existed on disk and was left untouched.
    Reused,
    /// A precomputed copy was downloaded from the remote base.
    Fetched,
    /// The artifact was built locally from the stage below it.
    Built,
}

/// Orchestrates artifact production under one data directory.
pub struct Pipeline {
    config: PipelineConfig,
    layout: DataLayout,
    fetcher: Option<RemoteFetcher>,
}

impl Pipeline {
    /// Pipeline over `config.data_dir`.
    pub fn new(config: PipelineConfig) -> Self {
        let layout = DataLayout::new(&config.data_dir);
        let fetcher = config
            .remote_base
            .as_ref()
            .map(|_| RemoteFetcher::new(config.fetch_timeout));
        Self {
            config,
            layout,
            fetcher,
        }
    }

    /// The artifact layout in use.
    pub fn layout(&self) -> &DataLayout {
        &self.layout
    }

    /// Resolve one artifact: reuse, fetch, or build, in that order.
    fn ensure_artifact(
        &self,
        relative: &str,
        force: bool,
        build: impl FnOnce() -> Result<(), PipelineError>,
    ) -> Result<StageOutcome, PipelineError> {
        let path = self.layout.path(relative);
        if !force {
            if path.exists() {
                debug!("reusing existing artifact {}", path.display());
                return Ok(StageOutcome::Reused);
            }
            if let (Some(base), Some(fetcher)) = (&self.config.remote_base, &self.fetcher) {
                let url = remote_url(base, relative);
                match fetcher.fetch_to_file(&url, &path) {
                    Ok(()) => return Ok(StageOutcome::Fetched),
                    Err(err) => warn!("falling back to local build: {err}"),
                }
            }
        }
        build()?;
        info!("built artifact {}", path.display());
        Ok(StageOutcome::Built)
    }

    /// Ensure the canonical merged table exists.
    pub fn ensure_canonical(&self, force: bool) -> Result<StageOutcome, PipelineError> {
        self.layout.ensure_dirs()?;
        self.ensure_artifact(artifacts::MAIN, force, || {
            let posts = merge_shards(self.layout.data_dir())?;
            store::write_canonical(&self.layout.main_csv(), &posts)
        })
    }

    /// Ensure the clean (normalized, tokenized, scored) table exists.
    ///
    /// The canonical stage below it is ensured first, unforced, so forcing
    /// this stage re-derives clean columns without re-merging shards.
    pub fn ensure_clean(&self, force: bool) -> Result<StageOutcome, PipelineError> {
        self.ensure_canonical(false)?;
        self.ensure_artifact(artifacts::CLEAN, force, || {
            let posts = store::read_canonical(&self.layout.main_csv())?;
            let rows = attach_clean_tokens(posts, &RegexTokenizer);
            store::write_clean(&self.layout.clean_csv(), &rows)
        })
    }

    /// Ensure the morphologically tokenized table exists.
    #[cfg(feature = "morph")]
    pub fn ensure_tokenized(&self, force: bool) -> Result<StageOutcome, PipelineError> {
        use crate::enrich::retokenize;
        use crate::tokenize::MorphTokenizer;

        self.ensure_clean(false)?;
        self.ensure_artifact(artifacts::TOKENIZED, force, || {
            let rows = store::read_clean(&self.layout.clean_csv())?;
            let tokenizer = MorphTokenizer::new()?;
            let rows = retokenize(rows, &tokenizer);
            store::write_tokenized_parquet(&self.layout.tokenized_parquet(), &rows)
        })
    }

    /// Ensure the morphologically tokenized table exists.
    ///
    /// Without the `morph` feature this stage cannot be built locally and
    /// always fails; the other stages are unaffected.
    #[cfg(not(feature = "morph"))]
    pub fn ensure_tokenized(&self, _force: bool) -> Result<StageOutcome, PipelineError> {
        Err(PipelineError::MissingDependency {
            stage: artifacts::TOKENIZED.to_string(),
            reason: "morphological tokenizer not compiled in (enable the `morph` feature)"
                .to_string(),
        })
    }

    /// Ensure all nine aggregate tables exist, in production order.
    pub fn ensure_stats(
        &self,
        force: bool,
    ) -> Result<Vec<(ArtifactPath, StageOutcome)>, PipelineError> {
        self.ensure_clean(false)?;
        let clean_path = self.layout.clean_csv();
        let loaded: OnceCell<Vec<CleanPost>> = OnceCell::new();
        // One bucketing pass feeds all three activity tables.
        let activity: OnceCell<stats::ActivityTables> = OnceCell::new();
        let mut outcomes = Vec::with_capacity(STAT_TABLES.len());
        for relative in STAT_TABLES {
            let outcome = self.ensure_artifact(relative, force, || {
                let rows = loaded.get_or_try_init(|| store::read_clean(&clean_path))?;
                let buckets = || activity.get_or_init(|| stats::activity(rows));
                let path = self.layout.path(relative);
                match relative {
                    artifacts::DAILY => {
                        store::write_count_table(&path, "date", "posts", &buckets().daily)
                    }
                    artifacts::BY_HOUR => {
                        store::write_count_table(&path, "hour", "posts", &buckets().hourly)
                    }
                    artifacts::BY_WEEKDAY => {
                        store::write_count_table(&path, "weekday", "posts", &buckets().weekday)
                    }
                    artifacts::BY_AUTHOR => store::write_authors(&path, &stats::authors(rows)),
                    artifacts::TOP_POSTS => store::write_top_posts(
                        &path,
                        &stats::top_posts(rows, self.config.top_posts),
                    ),
                    artifacts::TOP_TOKENS => store::write_count_table(
                        &path,
                        "token",
                        "count",
                        &stats::token_frequency(rows, self.config.top_tokens),
                    ),
                    artifacts::TOP_BIGRAMS => store::write_count_table(
                        &path,
                        "bigram",
                        "count",
                        &stats::bigram_frequency(rows, self.config.top_bigrams),
                    ),
                    artifacts::TOP_DOMAINS => store::write_count_table(
                        &path,
                        "domain",
                        "count",
                        &stats::domain_frequency(rows, self.config.top_domains),
                    ),
                    _ => store::write_correlation(&path, &stats::engagement_correlation(rows)),
                }
            })?;
            outcomes.push((relative.to_string(), outcome));
        }
        Ok(outcomes)
    }

    /// Run every stage in order and report each artifact's outcome.
    ///
    /// The tokenized stage runs only when `include_tokenized` is set, since
    /// it needs the morphological dictionary.
    pub fn ensure_all(
        &self,
        include_tokenized: bool,
        force: bool,
    ) -> Result<Vec<(ArtifactPath, StageOutcome)>, PipelineError> {
        let mut outcomes = Vec::new();
        outcomes.push((
            artifacts::MAIN.to_string(),
            self.ensure_canonical(force)?,
        ));
        outcomes.push((artifacts::CLEAN.to_string(), self.ensure_clean(force)?));
        if include_tokenized {
            outcomes.push((
                artifacts::TOKENIZED.to_string(),
                self.ensure_tokenized(force)?,
            ));
        }
        outcomes.extend(self.ensure_stats(force)?);
        Ok(outcomes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;
    use std::time::Duration;
    use tempfile::tempdir;

    const SHARD: &str = "번호,제목,내용,글쓴이,조회,추천,댓글,상세시간\n\
        1,안녕하세요,오늘 날씨 좋다 ㅋㅋㅋ,가나,10,2,0,2024.03.01 08:15:00\n\
        2,두번째 글,최악이다 진짜,다라,20,5,1,2024.03.02 21:30:00\n";

    fn seed_shard(dir: &std::path::Path) {
        fs::write(dir.join("post-dataset-a.csv"), SHARD).unwrap();
    }

    #[test]
    fn canonical_stage_builds_then_reuses() {
        let temp = tempdir().unwrap();
        seed_shard(temp.path());
        let pipeline = Pipeline::new(PipelineConfig::new(temp.path()));

        assert_eq!(pipeline.ensure_canonical(false).unwrap(), StageOutcome::Built);
        assert!(pipeline.layout().main_csv().exists());
        assert_eq!(pipeline.ensure_canonical(false).unwrap(), StageOutcome::Reused);
        assert_eq!(pipeline.ensure_canonical(true).unwrap(), StageOutcome::Built);
    }

    #[test]
    fn clean_stage_pulls_canonical_first() {
        let temp = tempdir().unwrap();
        seed_shard(temp.path());
        let pipeline = Pipeline::new(PipelineConfig::new(temp.path()));

        assert_eq!(pipeline.ensure_clean(false).unwrap(), StageOutcome::Built);
        assert!(pipeline.layout().main_csv().exists());
        let rows = store::read_clean(&pipeline.layout().clean_csv()).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].tokens.contains(&"날씨".to_string()));
        assert_eq!(rows[1].neg_hits, 1);
    }

    #[test]
    fn stats_stage_writes_all_tables() {
        let temp = tempdir().unwrap();
        seed_shard(temp.path());
        let pipeline = Pipeline::new(PipelineConfig::new(temp.path()));

        let outcomes = pipeline.ensure_stats(false).unwrap();
        assert_eq!(outcomes.len(), STAT_TABLES.len());
        for (relative, outcome) in &outcomes {
            assert_eq!(*outcome, StageOutcome::Built, "{relative}");
            assert!(pipeline.layout().path(relative).exists(), "{relative}");
        }

        let again = pipeline.ensure_stats(false).unwrap();
        assert!(again.iter().all(|(_, o)| *o == StageOutcome::Reused));
    }

    #[test]
    fn activity_tables_share_one_bucketing_pass() {
        let temp = tempdir().unwrap();
        seed_shard(temp.path());
        let pipeline = Pipeline::new(PipelineConfig::new(temp.path()));
        pipeline.ensure_stats(false).unwrap();

        let total = |relative: &str| -> u64 {
            fs::read_to_string(pipeline.layout().path(relative))
                .unwrap()
                .lines()
                .skip(1)
                .map(|line| line.rsplit(',').next().unwrap().parse::<u64>().unwrap())
                .sum()
        };
        let daily = total(artifacts::DAILY);
        assert_eq!(daily, 2);
        assert_eq!(total(artifacts::BY_HOUR), daily);
        assert_eq!(total(artifacts::BY_WEEKDAY), daily);
    }

    #[test]
    fn canonical_stage_prefers_remote_copy() {
        let payload = "번호,제목,내용,글쓴이,조회,추천,댓글,상세시간,제목url,글쓴이ip,첨부이미지,__source,datetime\n\
            9,원격,원격 본문,서버,1,1,0,,,,,remote.csv,\n";
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let body = payload.as_bytes().to_vec();
        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request_buf = [0u8; 1024];
            let _ = stream.read(&mut request_buf);
            let headers = format!(
                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            );
            stream.write_all(headers.as_bytes()).unwrap();
            stream.write_all(&body).unwrap();
        });

        let temp = tempdir().unwrap();
        let config = PipelineConfig::new(temp.path())
            .with_remote_base(format!("http://{addr}"))
            .with_fetch_timeout(Duration::from_secs(5));
        let pipeline = Pipeline::new(config);

        assert_eq!(pipeline.ensure_canonical(false).unwrap(), StageOutcome::Fetched);
        server.join().unwrap();
        let posts = store::read_canonical(&pipeline.layout().main_csv()).unwrap();
        assert_eq!(posts[0].id, Some(9));
    }

    #[test]
    fn dead_remote_falls_back_to_local_build() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let temp = tempdir().unwrap();
        seed_shard(temp.path());
        let config = PipelineConfig::new(temp.path())
            .with_remote_base(format!("http://{addr}"))
            .with_fetch_timeout(Duration::from_secs(1));
        let pipeline = Pipeline::new(config);

        assert_eq!(pipeline.ensure_canonical(false).unwrap(), StageOutcome::Built);
    }

    #[cfg(not(feature = "morph"))]
    #[test]
    fn tokenized_stage_requires_the_morph_feature() {
        let temp = tempdir().unwrap();
        seed_shard(temp.path());
        let pipeline = Pipeline::new(PipelineConfig::new(temp.path()));
        let err = pipeline.ensure_tokenized(false).unwrap_err();
        assert!(matches!(err, PipelineError::MissingDependency { .. }));
    }
}
