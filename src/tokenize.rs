//! Tokenizer strategies over cleaned text.
//!
//! Two interchangeable strategies share one contract: cleaned text in,
//! ordered token sequence out, deterministically. Downstream consumers only
//! depend on the token order (bigrams are adjacency within one sequence), so
//! strategies can be swapped without touching the aggregator.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::Token;

#[cfg(feature = "morph")]
use std::collections::HashSet;

#[cfg(feature = "morph")]
use crate::errors::PipelineError;

/// A tokenization strategy. Implementations must be deterministic and hold
/// no per-call state; instances are constructed once and reused read-only.
pub trait Tokenizer {
    /// Split cleaned text into an ordered token sequence. Repeats are kept;
    /// frequency counting happens downstream.
    fn tokenize(&self, text: &str) -> Vec<Token>;
}

static KOREAN_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[가-힣]{2,}").unwrap());

/// Dependency-free strategy: maximal runs of Korean syllables, length >= 2,
/// in order of appearance.
#[derive(Clone, Copy, Debug, Default)]
pub struct RegexTokenizer;

impl Tokenizer for RegexTokenizer {
    fn tokenize(&self, text: &str) -> Vec<Token> {
        KOREAN_RUN
            .find_iter(text)
            .map(|hit| hit.as_str().to_string())
            .collect()
    }
}

/// Morphological strategy backed by the embedded ko-dic dictionary.
///
/// Keeps nouns, verbs, and adjectives with surface length >= 2, minus a
/// shared stop-word set. The dictionary load is the expensive part, so one
/// instance is built per run and reused across every call.
#[cfg(feature = "morph")]
pub struct MorphTokenizer {
    tokenizer: lindera::tokenizer::Tokenizer,
    stopwords: HashSet<&'static str>,
}

#[cfg(feature = "morph")]
impl MorphTokenizer {
    /// Part-of-speech prefixes retained: common/proper nouns, verbs, adjectives.
    const KEPT_POS_PREFIXES: [&'static str; 3] = ["NN", "VV", "VA"];

    /// Load the embedded dictionary and the shared stop-word set.
    pub fn new() -> Result<Self, PipelineError> {
        use lindera::dictionary::{load_embedded_dictionary, DictionaryKind};
        use lindera::mode::Mode;
        use lindera::segmenter::Segmenter;

        let dictionary = load_embedded_dictionary(DictionaryKind::KoDic).map_err(|err| {
            PipelineError::MissingDependency {
                stage: "tokenized".to_string(),
                reason: format!("ko-dic dictionary unavailable: {err}"),
            }
        })?;
        let segmenter = Segmenter::new(Mode::Normal, dictionary, None);
        Ok(Self {
            tokenizer: lindera::tokenizer::Tokenizer::new(segmenter),
            stopwords: stopwords(),
        })
    }

    fn keeps(&self, surface: &str, pos: &str) -> bool {
        Self::KEPT_POS_PREFIXES
            .iter()
            .any(|prefix| pos.starts_with(prefix))
            && surface.chars().count() >= 2
            && !self.stopwords.contains(surface)
    }
}

#[cfg(feature = "morph")]
impl Tokenizer for MorphTokenizer {
    fn tokenize(&self, text: &str) -> Vec<Token> {
        self.tokenizer
            .tokenize(text)
            .unwrap_or_default()
            .iter()
            .filter(|token| {
                let pos = token
                    .details
                    .as_ref()
                    .and_then(|details| details.first())
                    .map(|detail| detail.as_ref())
                    .unwrap_or("");
                self.keeps(&token.surface, pos)
            })
            .map(|token| token.surface.to_string())
            .collect()
    }
}

/// Function-ish high-frequency Korean words excluded by the morphological
/// strategy. Loaded once from the bundled resource.
#[cfg(feature = "morph")]
fn stopwords() -> HashSet<&'static str> {
    include_str!("../resources/stopwords_ko.txt")
        .split_whitespace()
        .collect()
}
