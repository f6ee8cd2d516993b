//! Term extraction for insight mining.
//!
//! Free-text answers are split on whitespace, lowercased and stripped of
//! surrounding punctuation. Stop words and short words are dropped, the rest
//! is grouped by term and ranked by number of occurrences.

use std::collections::{HashMap, HashSet};

/// Words never reported as insight terms (compared case-insensitively).
pub const STOP_WORDS: &[&str] = &[
    "guys",
    "like",
    "will",
    "would",
    "am",
    "are",
    "i",
    "you",
    "he",
    "she",
    "me",
    "mine",
    "the",
    "company",
    "organization",
    "feedier",
    "is",
    "they",
    "your",
    "that",
    "them",
    "him",
    "more",
    "much",
    "with",
    "has",
    "have",
    "good",
    "great",
    "just",
    "better",
    "none",
    "no",
    "nope",
    "not",
    "test",
    "from",
    "do",
    "did",
];

/// A ranked term and where it occurred.
#[derive(Debug, Clone, PartialEq)]
pub struct TermCount {
    pub term: String,
    pub occurrences: usize,
    /// Index of the source document for every occurrence, in order.
    pub sources: Vec<usize>,
}

/// Splits text into candidate terms.
#[derive(Debug, Clone)]
pub struct TermExtractor {
    stop_words: HashSet<&'static str>,
    min_length: usize,
}

impl TermExtractor {
    /// `min_length` is the shortest term kept, in characters.
    pub fn new(min_length: usize) -> Self {
        Self {
            stop_words: STOP_WORDS.iter().copied().collect(),
            min_length,
        }
    }

    pub fn is_stop_word(&self, word: &str) -> bool {
        self.stop_words.contains(word.to_lowercase().as_str())
    }

    /// Terms of one document, in order, repeats included.
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        text.split_whitespace()
            .map(|word| {
                word.trim_matches(|c: char| !c.is_alphanumeric())
                    .to_lowercase()
            })
            .filter(|word| word.chars().count() >= self.min_length)
            .filter(|word| !self.stop_words.contains(word.as_str()))
            .collect()
    }

    /// The `limit` most frequent terms across `documents`.
    ///
    /// Ties are broken alphabetically so the ranking is stable.
    pub fn top_terms<'a, I>(&self, documents: I, limit: usize) -> Vec<TermCount>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut by_term: HashMap<String, Vec<usize>> = HashMap::new();
        for (index, document) in documents.into_iter().enumerate() {
            for term in self.tokenize(document) {
                by_term.entry(term).or_default().push(index);
            }
        }

        let mut ranked: Vec<TermCount> = by_term
            .into_iter()
            .map(|(term, sources)| TermCount {
                occurrences: sources.len(),
                term,
                sources,
            })
            .collect();
        ranked.sort_by(|a, b| {
            b.occurrences
                .cmp(&a.occurrences)
                .then_with(|| a.term.cmp(&b.term))
        });
        ranked.truncate(limit);
        ranked
    }
}
