use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::types::ShardName;

/// Error type for shard decoding, merge, staging, and persistence failures.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("shard '{shard}' could not be decoded with any configured encoding (tried {tried})")]
    Decode { shard: ShardName, tried: String },
    #[error("no archive or CSV shards found under {0}")]
    NoInput(PathBuf),
    #[error("all {attempted} candidate shards failed to read; merge would be empty")]
    EmptyMerge { attempted: usize },
    #[error("missing dependency for stage '{stage}': {reason}")]
    MissingDependency { stage: String, reason: String },
    #[error("remote artifact unavailable at {url}: {reason}")]
    RemoteFetch { url: String, reason: String },
    #[error("artifact failure: {0}")]
    Artifact(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}
