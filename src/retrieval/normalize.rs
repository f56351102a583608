//! Text normalization for keyword matching
//!
//! Text is reduced to a set of lowercase content tokens: everything that is
//! not a letter, number or whitespace is dropped, the rest is lowercased, split
//! on whitespace and filtered against a fixed stop-word table.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;

lazy_static! {
    static ref NON_WORD_RE: Regex = Regex::new(r"[^\p{L}\p{N}\s]").unwrap();

    static ref STOP_WORDS: HashSet<&'static str> = {
        let words: &[&str] = &[
            // Articles, conjunctions & prepositions
            "a", "an", "the", "and", "but", "or", "nor", "if", "as", "because", "than",
            "so", "such", "about", "above", "after", "again", "against", "at", "before",
            "below", "between", "by", "down", "during", "for", "from", "further", "in",
            "into", "of", "off", "on", "once", "out", "over", "through", "to", "under",
            "until", "up", "with", "while",
            // Pronouns & determiners
            "i", "me", "my", "myself", "we", "our", "ours", "ourselves", "you", "your",
            "yours", "yourself", "yourselves", "he", "him", "his", "himself", "she", "her",
            "hers", "herself", "it", "its", "itself", "they", "them", "their", "theirs",
            "themselves", "this", "that", "these", "those", "what", "which", "who", "whom",
            "all", "any", "both", "each", "few", "more", "most", "other", "some", "own",
            "same",
            // Auxiliaries
            "am", "is", "are", "was", "were", "be", "been", "being", "have", "has", "had",
            "having", "do", "does", "did", "doing", "can", "will", "should",
            // Adverbs
            "here", "there", "when", "where", "why", "how", "just", "no", "not", "now",
            "only", "then", "too", "very",
            // Contraction fragments
            "s", "t", "i'm",
            // Reflection noise
            "thinking", "feeling", "felt", "issues",
        ];
        words.iter().copied().collect()
    };
}

/// Cleaned, lowercased text before tokenization
pub fn normalize_text(text: &str) -> String {
    NON_WORD_RE.replace_all(&text.to_lowercase(), "").into_owned()
}

/// Content tokens of `text`
pub fn normalize(text: &str) -> HashSet<String> {
    normalize_text(text)
        .split_whitespace()
        .filter(|token| !is_stop_word(token))
        .map(str::to_string)
        .collect()
}

pub fn is_stop_word(token: &str) -> bool {
    STOP_WORDS.contains(token)
}
