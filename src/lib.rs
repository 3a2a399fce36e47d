#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

/// Artifact path layout and remote URL mapping.
pub mod artifacts;
/// Pipeline configuration.
pub mod config;
/// Centralized constants: column names, cue lexicons, artifact names.
pub mod constants;
/// Post row types and field coercion helpers.
pub mod data;
/// Enrichment stage deriving clean rows from canonical rows.
pub mod enrich;
/// Shard discovery and canonical merging.
pub mod merge;
/// Staged cache orchestrator.
pub mod pipeline;
/// Encoding-tolerant CSV shard reading.
pub mod reader;
/// Remote artifact retrieval.
pub mod remote;
/// Lexicon-hit sentiment proxy.
pub mod sentiment;
/// Aggregate statistics over the clean table.
pub mod stats;
/// Artifact persistence (CSV and parquet).
pub mod store;
/// Boilerplate stripping and text normalization.
pub mod text;
/// Tokenization strategies.
pub mod tokenize;
/// Shared type aliases.
pub mod types;

mod errors;

pub use artifacts::{DataLayout, STAT_TABLES};
pub use config::PipelineConfig;
pub use data::{CleanPost, Post};
pub use errors::PipelineError;
pub use merge::{merge_shards, InputInventory};
pub use pipeline::{Pipeline, StageOutcome};
pub use remote::RemoteFetcher;
pub use sentiment::{score, SentimentHits};
pub use text::normalize;
#[cfg(feature = "morph")]
pub use tokenize::MorphTokenizer;
pub use tokenize::{RegexTokenizer, Tokenizer};
pub use types::{ArtifactPath, AuthorName, DomainName, ShardName, Token};
