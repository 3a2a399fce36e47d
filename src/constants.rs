/// Constants used by encoding-tolerant shard reading.
pub mod reader {
    /// Human-readable encoding labels in attempt order, used in error text.
    pub const ENCODING_LABELS: &str = "utf-8, utf-8-sig, cp949, euc-kr";
}

/// Constants used by shard discovery and canonical merging.
pub mod merge {
    /// Zip entry path marker identifying the post dataset folder.
    pub const DATASET_FOLDER_MARKER: &str = "post-dataset";

    /// Shard header for the numeric post id.
    pub const COL_ID: &str = "번호";
    /// Shard header for the post title.
    pub const COL_TITLE: &str = "제목";
    /// Shard header for the title permalink.
    pub const COL_TITLE_URL: &str = "제목url";
    /// Shard header for the comment count.
    pub const COL_COMMENTS: &str = "댓글";
    /// Shard header for the author name.
    pub const COL_AUTHOR: &str = "글쓴이";
    /// Shard header for the author IP fragment.
    pub const COL_AUTHOR_IP: &str = "글쓴이ip";
    /// Shard header for the view count.
    pub const COL_VIEWS: &str = "조회";
    /// Shard header for the recommend count.
    pub const COL_RECOMMENDS: &str = "추천";
    /// Shard header for the free-form timestamp text.
    pub const COL_POSTED_AT: &str = "상세시간";
    /// Shard header for the body text.
    pub const COL_BODY: &str = "내용";
    /// Shard header for the attachment-image field.
    pub const COL_ATTACHMENTS: &str = "첨부이미지";

    /// Canonical-table header for row provenance.
    pub const COL_SOURCE: &str = "__source";
    /// Canonical-table header for the parsed timestamp.
    pub const COL_DATETIME: &str = "datetime";

    /// Explicit timestamp formats tried before the permissive fallback.
    pub const DATETIME_FORMATS: [&str; 3] = [
        "%Y.%m.%d %H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
        "%Y/%m/%d %H:%M:%S",
    ];
    /// Permissive fallback formats (minute precision, ISO `T`, date-only).
    pub const DATETIME_FALLBACK_FORMATS: [&str; 7] = [
        "%Y-%m-%dT%H:%M:%S",
        "%Y.%m.%d %H:%M",
        "%Y-%m-%d %H:%M",
        "%Y/%m/%d %H:%M",
        "%Y.%m.%d",
        "%Y-%m-%d",
        "%Y/%m/%d",
    ];
}

/// Tiny cue lexicons for the sentiment proxy. Coarse by design; counts of
/// these substrings are a rough engagement signal, not a classifier.
pub mod sentiment {
    /// Positive cue substrings.
    pub const POS_CUES: [&str; 10] = [
        "좋", "사랑", "감사", "행복", "기쁘", "재밌", "귀엽", "최고", "멋지", "축하",
    ];
    /// Negative cue substrings.
    pub const NEG_CUES: [&str; 10] = [
        "싫", "짜증", "화나", "나쁘", "불편", "최악", "혐", "빡치", "역겹", "슬프",
    ];
    /// Laughter marker substrings.
    pub const LAUGHTER: [&str; 2] = ["ㅋㅋ", "ㅎㅎ"];
}

/// Constants used by the aggregate statistics tables.
pub mod stats {
    /// Default cap for the top-token table.
    pub const TOP_TOKENS: usize = 200;
    /// Default cap for the top-bigram table.
    pub const TOP_BIGRAMS: usize = 200;
    /// Default cap for the top-domain table.
    pub const TOP_DOMAINS: usize = 100;
    /// Default cap for the top-post table.
    pub const TOP_POSTS: usize = 50;
    /// Column labels of the engagement correlation matrix, in order.
    pub const ENGAGEMENT_COLUMNS: [&str; 6] =
        ["조회", "추천", "댓글", "pos_hits", "neg_hits", "laugh_hits"];
}

/// Constants naming persisted pipeline artifacts relative to the data dir.
pub mod artifacts {
    /// Merged canonical table.
    pub const MAIN: &str = "main.csv";
    /// Canonical table enriched with clean text, tokens, and proxy counts.
    pub const CLEAN: &str = "main_clean.csv";
    /// Clean table with morphological tokens, columnar.
    pub const TOKENIZED: &str = "main_clean_okt.parquet";
    /// Subdirectory holding aggregate tables.
    pub const STATS_DIR: &str = "stats";
    /// Daily post counts.
    pub const DAILY: &str = "stats/daily_posts.csv";
    /// Hour-of-day post counts.
    pub const BY_HOUR: &str = "stats/posts_by_hour.csv";
    /// Weekday post counts (0 = Monday).
    pub const BY_WEEKDAY: &str = "stats/posts_by_weekday.csv";
    /// Per-author rollup.
    pub const BY_AUTHOR: &str = "stats/by_author.csv";
    /// Highest-engagement posts.
    pub const TOP_POSTS: &str = "stats/top_posts.csv";
    /// Global token frequency.
    pub const TOP_TOKENS: &str = "stats/top_tokens.csv";
    /// Within-post bigram frequency.
    pub const TOP_BIGRAMS: &str = "stats/top_bigrams.csv";
    /// Outbound-domain frequency.
    pub const TOP_DOMAINS: &str = "stats/top_domains.csv";
    /// Engagement correlation matrix.
    pub const ENG_CORR: &str = "stats/engagement_corr.csv";
}

/// Constants used by remote artifact fetching.
pub mod remote {
    /// Default bound on a remote artifact GET, in seconds.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
}
