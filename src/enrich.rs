//! Enrichment stage: canonical rows -> clean rows.

use tracing::info;

use crate::data::{CleanPost, Post};
use crate::sentiment::score;
use crate::text::normalize;
use crate::tokenize::Tokenizer;

/// Derive the clean table from canonical rows.
///
/// Normalizes title and body, scores the sentiment proxy on the cleaned
/// body, and tokenizes it with the supplied strategy. Pure per row; the
/// tokenizer instance is shared read-only across all rows.
pub fn attach_clean_tokens(posts: Vec<Post>, tokenizer: &dyn Tokenizer) -> Vec<CleanPost> {
    let total = posts.len();
    let clean: Vec<CleanPost> = posts.into_iter().map(|post| enrich_one(post, tokenizer)).collect();
    info!("enriched {total} rows with clean text, tokens, and proxy scores");
    clean
}

/// Re-tokenize existing clean rows with a different strategy.
///
/// Used by the tokenized stage: normalization and proxy scores are already
/// derived, only the token column changes.
pub fn retokenize(mut posts: Vec<CleanPost>, tokenizer: &dyn Tokenizer) -> Vec<CleanPost> {
    for post in posts.iter_mut() {
        post.tokens = tokenizer.tokenize(&post.clean_body);
    }
    posts
}

fn enrich_one(post: Post, tokenizer: &dyn Tokenizer) -> CleanPost {
    let clean_title = normalize(post.title.as_deref().unwrap_or(""));
    let clean_body = normalize(post.body.as_deref().unwrap_or(""));
    let hits = score(&clean_body);
    let tokens = tokenizer.tokenize(&clean_body);
    CleanPost {
        post,
        clean_title,
        clean_body,
        tokens,
        pos_hits: hits.pos,
        neg_hits: hits.neg,
        laugh_hits: hits.laugh,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenize::RegexTokenizer;

    fn post_with_body(body: &str) -> Post {
        Post {
            id: Some(1),
            body: Some(body.to_string()),
            title: Some("제목 - dc official App".to_string()),
            source_shard: "test.csv".to_string(),
            ..Post::default()
        }
    }

    #[test]
    fn enrichment_derives_all_clean_columns() {
        let posts = vec![post_with_body("오늘 날씨 너무 좋다 ㅋㅋㅋㅋ https://y.com/x")];
        let clean = attach_clean_tokens(posts, &RegexTokenizer);

        assert_eq!(clean.len(), 1);
        let row = &clean[0];
        assert_eq!(row.clean_title, "제목");
        assert_eq!(row.clean_body, "오늘 날씨 너무 좋다 ㅋㅋ");
        assert_eq!(row.tokens, vec!["오늘", "날씨", "너무", "좋다"]);
        assert_eq!(row.pos_hits, 1);
        assert_eq!(row.laugh_hits, 1);
    }

    #[test]
    fn missing_body_yields_empty_derivations() {
        let posts = vec![Post {
            id: Some(2),
            source_shard: "test.csv".to_string(),
            ..Post::default()
        }];
        let clean = attach_clean_tokens(posts, &RegexTokenizer);
        assert_eq!(clean[0].clean_body, "");
        assert!(clean[0].tokens.is_empty());
        assert_eq!(clean[0].pos_hits, 0);
    }
}
