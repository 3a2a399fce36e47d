//! Lexicon-hit sentiment proxy.
//!
//! Counts occurrences of a few dozen cue substrings. This is a coarse
//! engagement heuristic for correlation tables, not a sentiment classifier,
//! and makes no accuracy claim.

use crate::constants::sentiment::{LAUGHTER, NEG_CUES, POS_CUES};

/// Non-negative cue counts for one piece of cleaned text.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SentimentHits {
    /// Positive-cue occurrences.
    pub pos: u32,
    /// Negative-cue occurrences.
    pub neg: u32,
    /// Laughter-marker occurrences.
    pub laugh: u32,
}

/// Count lexicon hits in `text`. Empty text scores `(0, 0, 0)`.
pub fn score(text: &str) -> SentimentHits {
    SentimentHits {
        pos: count_hits(text, &POS_CUES),
        neg: count_hits(text, &NEG_CUES),
        laugh: count_hits(text, &LAUGHTER),
    }
}

/// Sum of non-overlapping occurrences of each lexicon entry.
fn count_hits(text: &str, lexicon: &[&str]) -> u32 {
    lexicon
        .iter()
        .map(|cue| text.matches(cue).count() as u32)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positive_cues_count_per_occurrence() {
        assert_eq!(score("너무 좋고 사랑스러워"), SentimentHits { pos: 2, neg: 0, laugh: 0 });
    }

    #[test]
    fn empty_text_scores_zero() {
        assert_eq!(score(""), SentimentHits::default());
    }

    #[test]
    fn laughter_counts_pairs_after_normalization() {
        // Normalized laughter is exactly two characters per run.
        assert_eq!(score("ㅋㅋ 웃기고 ㅎㅎ").laugh, 2);
    }

    #[test]
    fn mixed_text_counts_each_category() {
        let hits = score("최고다 ㅋㅋ 근데 좀 짜증나네 최악");
        assert_eq!(hits.pos, 1);
        assert_eq!(hits.neg, 2);
        assert_eq!(hits.laugh, 1);
    }

    #[test]
    fn repeated_cue_counts_every_occurrence() {
        assert_eq!(score("좋다 좋다 좋다").pos, 3);
    }
}
