use chrono::NaiveDateTime;

use crate::types::{ShardName, Token};

/// One row of the canonical table.
///
/// Every field except provenance is optional: shards disagree on column
/// sets, and the merge guarantees the columns exist rather than the values.
#[derive(Clone, Debug, Default)]
pub struct Post {
    /// Numeric post id (`번호`), the dedup key. `None` when the shard lacks it.
    pub id: Option<u64>,
    /// Post title (`제목`).
    pub title: Option<String>,
    /// Title permalink (`제목url`).
    pub title_url: Option<String>,
    /// Comment count (`댓글`), `None` when missing or non-numeric.
    pub comment_count: Option<i64>,
    /// Author display name (`글쓴이`).
    pub author: Option<String>,
    /// Author IP fragment (`글쓴이ip`).
    pub author_ip: Option<String>,
    /// View count (`조회`), `None` when missing or non-numeric.
    pub view_count: Option<i64>,
    /// Recommend count (`추천`), `None` when missing or non-numeric.
    pub recommend_count: Option<i64>,
    /// Free-form timestamp text (`상세시간`), kept verbatim.
    pub posted_at_raw: Option<String>,
    /// Parsed timestamp; `None` when no known format matched.
    pub posted_at: Option<NaiveDateTime>,
    /// Body text (`내용`), raw.
    pub body: Option<String>,
    /// Attachment-image field (`첨부이미지`), raw.
    pub attachment_images: Option<String>,
    /// Which shard this row came from.
    pub source_shard: ShardName,
}

/// One row of the clean table: a canonical row plus derived text columns.
#[derive(Clone, Debug)]
pub struct CleanPost {
    /// The canonical row this enrichment was derived from.
    pub post: Post,
    /// Normalized title.
    pub clean_title: String,
    /// Normalized body.
    pub clean_body: String,
    /// Ordered tokens extracted from `clean_body`.
    pub tokens: Vec<Token>,
    /// Positive-cue hits in `clean_body`.
    pub pos_hits: u32,
    /// Negative-cue hits in `clean_body`.
    pub neg_hits: u32,
    /// Laughter-marker hits in `clean_body`.
    pub laugh_hits: u32,
}

/// Lenient integer coercion for count-like columns.
///
/// Trims, drops thousands separators, and returns `None` for anything that
/// still fails to parse (dashes, empty cells, stray text).
pub fn parse_count(raw: &str) -> Option<i64> {
    let cleaned: String = raw.trim().chars().filter(|ch| *ch != ',').collect();
    if cleaned.is_empty() || cleaned == "-" {
        return None;
    }
    cleaned.parse().ok()
}

/// Lenient id coercion, same rules as [`parse_count`] but unsigned.
pub fn parse_id(raw: &str) -> Option<u64> {
    let cleaned: String = raw.trim().chars().filter(|ch| *ch != ',').collect();
    cleaned.parse().ok()
}

/// Empty-or-whitespace cells become `None`; everything else is kept verbatim.
pub fn non_empty(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(raw.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_count_coerces_messy_values() {
        assert_eq!(parse_count("1,234"), Some(1234));
        assert_eq!(parse_count(" 42 "), Some(42));
        assert_eq!(parse_count("-"), None);
        assert_eq!(parse_count(""), None);
        assert_eq!(parse_count("조회수"), None);
    }

    #[test]
    fn non_empty_drops_whitespace_only_cells() {
        assert_eq!(non_empty("  "), None);
        assert_eq!(non_empty("ㅇㅇ"), Some("ㅇㅇ".to_string()));
    }
}
