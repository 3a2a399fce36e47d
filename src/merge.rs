//! Shard discovery and canonical-table merging.
//!
//! The data directory holds either one zip archive of CSV shards (preferred)
//! or loose CSV files. Shards are read in a deterministic order, concatenated
//! with column-union semantics, deduplicated by post id (first occurrence
//! wins), and stamped with a parsed timestamp.

use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime};
use csv::StringRecord;
use indexmap::IndexSet;
use serde::Serialize;
use tracing::{debug, info, warn};
use walkdir::WalkDir;
use zip::ZipArchive;

use crate::constants::{artifacts, merge as cols};
use crate::data::{non_empty, parse_count, parse_id, Post};
use crate::errors::PipelineError;
use crate::reader::{read_csv_bytes, ShardTable};
use crate::types::ShardName;

/// What the data directory currently offers as pipeline input.
#[derive(Clone, Debug, Default, Serialize)]
pub struct InputInventory {
    /// Zip archives directly under the data dir.
    pub zips: Vec<PathBuf>,
    /// Candidate CSV shards (recursive, pipeline artifacts excluded).
    pub csvs: Vec<PathBuf>,
    /// Immediate subdirectories, for operator inspection.
    pub dirs: Vec<PathBuf>,
}

impl InputInventory {
    /// Scan `data_dir` for archives, loose shards, and subdirectories.
    pub fn scan(data_dir: &Path) -> Result<Self, PipelineError> {
        let mut inventory = Self::default();
        if !data_dir.is_dir() {
            return Ok(inventory);
        }
        for entry in fs::read_dir(data_dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.is_dir() {
                inventory.dirs.push(path);
            } else if has_extension(&path, "zip") {
                inventory.zips.push(path);
            }
        }
        for entry in WalkDir::new(data_dir)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
        {
            let path = entry.path();
            if has_extension(path, "csv") && !is_pipeline_artifact(data_dir, path) {
                inventory.csvs.push(path.to_path_buf());
            }
        }
        inventory.zips.sort();
        inventory.csvs.sort();
        inventory.dirs.sort();
        Ok(inventory)
    }

    /// True when neither an archive nor loose shards are available.
    pub fn is_empty(&self) -> bool {
        self.zips.is_empty() && self.csvs.is_empty()
    }
}

/// Merge every readable shard under `data_dir` into the canonical table.
///
/// Individual shard failures are logged and skipped; the merge only fails
/// when there is no input at all or when every shard fails.
pub fn merge_shards(data_dir: &Path) -> Result<Vec<Post>, PipelineError> {
    let inventory = InputInventory::scan(data_dir)?;
    if inventory.is_empty() {
        return Err(PipelineError::NoInput(data_dir.to_path_buf()));
    }

    let shards = if let Some(archive) = inventory.zips.first() {
        info!("merging from archive {}", archive.display());
        load_archive_shards(archive)?
    } else {
        info!("merging {} loose CSV shards", inventory.csvs.len());
        load_loose_shards(&inventory.csvs)
    };

    let attempted = shards.len();
    let mut posts: Vec<Post> = Vec::new();
    let mut loaded = 0usize;
    for (name, bytes) in shards {
        match read_csv_bytes(&name, &bytes) {
            // A decodable shard with neither headers nor rows carries no
            // data and must not count toward the merge.
            Ok(table) if table.is_empty() => {
                warn!("skipping shard '{name}': no headers or rows");
            }
            Ok(table) => {
                let rows = table.rows().len();
                posts.extend(
                    table
                        .rows()
                        .iter()
                        .map(|row| row_to_post(&table, row, &name)),
                );
                debug!("shard '{name}': {rows} rows");
                loaded += 1;
            }
            Err(err) => {
                warn!("skipping shard '{name}': {err}");
            }
        }
    }
    if loaded == 0 {
        return Err(PipelineError::EmptyMerge { attempted });
    }

    let before = posts.len();
    dedup_by_id(&mut posts);
    info!(
        "merged {loaded}/{attempted} shards: {} rows ({} duplicates dropped)",
        posts.len(),
        before - posts.len()
    );
    Ok(posts)
}

/// Keep the first occurrence per non-null id, in shard order.
///
/// Rows without an id are never treated as duplicates of each other.
fn dedup_by_id(posts: &mut Vec<Post>) {
    let mut seen: IndexSet<u64> = IndexSet::new();
    posts.retain(|post| match post.id {
        Some(id) => seen.insert(id),
        None => true,
    });
}

/// Deterministic shard order: dataset-marker entries first, then lexicographic.
fn shard_sort_key(name: &str) -> (u8, String) {
    let marker = if name.to_lowercase().contains(cols::DATASET_FOLDER_MARKER) {
        0
    } else {
        1
    };
    (marker, name.to_string())
}

fn load_archive_shards(archive: &Path) -> Result<Vec<(ShardName, Vec<u8>)>, PipelineError> {
    let file = File::open(archive)?;
    let mut zip = ZipArchive::new(file)
        .map_err(|err| PipelineError::Artifact(format!("unreadable archive: {err}")))?;

    let mut names: Vec<ShardName> = zip
        .file_names()
        .filter(|name| name.to_lowercase().ends_with(".csv"))
        .map(String::from)
        .collect();
    // Prefer the dataset folder; fall back to every CSV entry when the
    // archive does not use it.
    if names
        .iter()
        .any(|name| name.to_lowercase().contains(cols::DATASET_FOLDER_MARKER))
    {
        names.retain(|name| name.to_lowercase().contains(cols::DATASET_FOLDER_MARKER));
    }
    names.sort_by_key(|name| shard_sort_key(name));

    let mut shards = Vec::with_capacity(names.len());
    for name in names {
        let mut bytes = Vec::new();
        match zip.by_name(&name) {
            Ok(mut entry) => {
                if let Err(err) = entry.read_to_end(&mut bytes) {
                    warn!("skipping archive entry '{name}': {err}");
                    continue;
                }
            }
            Err(err) => {
                warn!("skipping archive entry '{name}': {err}");
                continue;
            }
        }
        shards.push((name, bytes));
    }
    Ok(shards)
}

fn load_loose_shards(paths: &[PathBuf]) -> Vec<(ShardName, Vec<u8>)> {
    let mut named: Vec<(ShardName, &PathBuf)> = paths
        .iter()
        .map(|path| (path.to_string_lossy().into_owned(), path))
        .collect();
    named.sort_by_key(|(name, _)| shard_sort_key(name));

    let mut shards = Vec::with_capacity(named.len());
    for (name, path) in named {
        match fs::read(path) {
            Ok(bytes) => shards.push((name, bytes)),
            Err(err) => warn!("skipping shard '{name}': {err}"),
        }
    }
    shards
}

fn row_to_post(table: &ShardTable, row: &StringRecord, shard: &str) -> Post {
    let text = |column: &str| table.field(row, column).and_then(non_empty);
    let count = |column: &str| table.field(row, column).and_then(parse_count);
    let posted_at_raw = text(cols::COL_POSTED_AT);
    let posted_at = posted_at_raw.as_deref().and_then(parse_posted_at);
    Post {
        id: table.field(row, cols::COL_ID).and_then(parse_id),
        title: text(cols::COL_TITLE),
        title_url: text(cols::COL_TITLE_URL),
        comment_count: count(cols::COL_COMMENTS),
        author: text(cols::COL_AUTHOR),
        author_ip: text(cols::COL_AUTHOR_IP),
        view_count: count(cols::COL_VIEWS),
        recommend_count: count(cols::COL_RECOMMENDS),
        posted_at_raw,
        posted_at,
        body: text(cols::COL_BODY),
        attachment_images: text(cols::COL_ATTACHMENTS),
        source_shard: shard.to_string(),
    }
}

/// Parse a free-form timestamp. Explicit formats first, then a permissive
/// fallback set; `None` when nothing matches, never an error.
pub fn parse_posted_at(raw: &str) -> Option<NaiveDateTime> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    for format in cols::DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(parsed);
        }
    }
    for format in cols::DATETIME_FALLBACK_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(parsed);
        }
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return date.and_hms_opt(0, 0, 0);
        }
    }
    None
}

fn has_extension(path: &Path, wanted: &str) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(wanted))
        .unwrap_or(false)
}

fn is_pipeline_artifact(data_dir: &Path, path: &Path) -> bool {
    let Ok(relative) = path.strip_prefix(data_dir) else {
        return false;
    };
    let relative = relative.to_string_lossy();
    relative == artifacts::MAIN
        || relative == artifacts::CLEAN
        || relative.starts_with(artifacts::STATS_DIR)
}
