//! Encoding-tolerant CSV shard reading.
//!
//! Real-world dumps mix UTF-8 exports with legacy CP949/EUC-KR ones, so each
//! shard is decoded by walking a fixed list of encoding strategies and taking
//! the first that decodes cleanly. UTF-8 variants come first: most shards are
//! already UTF-8, and the legacy Korean decoders accept almost any byte
//! sequence, which makes false positives likely if they are tried earlier.

use std::borrow::Cow;

use csv::{ReaderBuilder, StringRecord};
use indexmap::IndexMap;
use tracing::warn;

use crate::constants::reader::ENCODING_LABELS;
use crate::errors::PipelineError;
use crate::types::ShardName;

const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

/// Decoding strategies in attempt order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum EncodingAttempt {
    Utf8,
    Utf8Bom,
    Cp949,
    EucKr,
}

const ATTEMPT_ORDER: [EncodingAttempt; 4] = [
    EncodingAttempt::Utf8,
    EncodingAttempt::Utf8Bom,
    EncodingAttempt::Cp949,
    EncodingAttempt::EucKr,
];

/// One decoded shard: header order plus raw rows.
///
/// Rows keep their original field order; lookups go through the header map so
/// shards with differing column sets share one access path.
#[derive(Clone, Debug)]
pub struct ShardTable {
    headers: IndexMap<String, usize>,
    rows: Vec<StringRecord>,
}

impl ShardTable {
    /// Header names in file order.
    pub fn headers(&self) -> impl Iterator<Item = &str> {
        self.headers.keys().map(String::as_str)
    }

    /// Parsed rows, malformed ones already skipped.
    pub fn rows(&self) -> &[StringRecord] {
        &self.rows
    }

    /// Field of `row` under `column`, `None` when the column is absent from
    /// this shard or the row is short.
    pub fn field<'a>(&self, row: &'a StringRecord, column: &str) -> Option<&'a str> {
        let idx = *self.headers.get(column)?;
        row.get(idx)
    }

    /// True when the shard yielded neither headers nor rows. Such a shard
    /// carries no data and callers treat it as a failed read.
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty() && self.rows.is_empty()
    }
}

/// Decode and parse one CSV shard from raw bytes.
///
/// Malformed rows are skipped rather than fatal; a shard only fails when no
/// configured encoding decodes it.
pub fn read_csv_bytes(shard: &str, bytes: &[u8]) -> Result<ShardTable, PipelineError> {
    for attempt in ATTEMPT_ORDER {
        let Some(text) = decode(bytes, attempt) else {
            continue;
        };
        return Ok(parse_csv(shard, &text));
    }
    Err(PipelineError::Decode {
        shard: ShardName::from(shard),
        tried: ENCODING_LABELS.to_string(),
    })
}

fn decode(bytes: &[u8], attempt: EncodingAttempt) -> Option<Cow<'_, str>> {
    match attempt {
        EncodingAttempt::Utf8 => {
            // A BOM would survive strict UTF-8 and pollute the first header;
            // leave BOM-carrying input to the next attempt.
            if bytes.starts_with(&UTF8_BOM) {
                return None;
            }
            std::str::from_utf8(bytes).ok().map(Cow::Borrowed)
        }
        EncodingAttempt::Utf8Bom => {
            let stripped = bytes.strip_prefix(&UTF8_BOM[..])?;
            std::str::from_utf8(stripped).ok().map(Cow::Borrowed)
        }
        // encoding_rs models CP949 as the extended EUC-KR decoder; both
        // labels stay in the attempt order to match the configured priority.
        // BOM handling is off: a UTF-16 BOM must not reroute these attempts
        // to a decoder that is not in the configured list.
        EncodingAttempt::Cp949 | EncodingAttempt::EucKr => {
            let (text, had_errors) = encoding_rs::EUC_KR.decode_without_bom_handling(bytes);
            if had_errors {
                None
            } else {
                Some(text)
            }
        }
    }
}

fn parse_csv(shard: &str, text: &str) -> ShardTable {
    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: IndexMap<String, usize> = match reader.headers() {
        Ok(record) => record
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.trim().to_string(), idx))
            .collect(),
        Err(err) => {
            warn!("shard '{shard}': unreadable header row ({err}); treating as empty");
            IndexMap::new()
        }
    };

    let mut rows = Vec::new();
    let mut skipped = 0usize;
    for record in reader.into_records() {
        match record {
            Ok(row) => rows.push(row),
            Err(_) => skipped += 1,
        }
    }
    if skipped > 0 {
        warn!("shard '{shard}': skipped {skipped} malformed rows");
    }

    ShardTable { headers, rows }
}
