//! Lexical retrieval by token overlap
//!
//! Entries are scanned newest first and any entry sharing a content token
//! with the query matches. The scan stops once `max_results` matches are
//! collected, so only the most recent matches are ever considered; they are
//! returned oldest first.

use std::collections::HashSet;
use tracing::debug;

use super::normalize::normalize;
use super::{select, Corpus, Match, RetrievalMode, Retriever};
use crate::core::entry::{Entry, TextFields};
use crate::error::RetrievalError;

/// Token-overlap retriever
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordRetriever;

impl KeywordRetriever {
    pub fn new() -> Self {
        Self
    }

    /// Positions of the `max_results` most recent overlapping entries, ascending
    pub fn match_positions<F>(&self, query: &str, len: usize, text_at: F, max_results: usize) -> Vec<usize>
    where
        F: Fn(usize) -> String,
    {
        if len == 0 || max_results == 0 {
            return Vec::new();
        }

        let keywords = normalize(query);
        if keywords.is_empty() {
            debug!(query, "query has no content tokens");
            return Vec::new();
        }

        let mut positions = Vec::with_capacity(max_results);
        for position in (0..len).rev() {
            let tokens: HashSet<String> = normalize(&text_at(position));
            if !keywords.is_disjoint(&tokens) {
                positions.push(position);
                if positions.len() >= max_results {
                    break;
                }
            }
        }

        positions.reverse();
        positions
    }
}

impl Retriever for KeywordRetriever {
    fn mode(&self) -> RetrievalMode {
        RetrievalMode::Keyword
    }

    fn retrieve(
        &self,
        query: &str,
        corpus: &Corpus<'_>,
        max_results: usize,
    ) -> Result<Vec<Match>, RetrievalError> {
        let positions =
            self.match_positions(query, corpus.len(), |i| corpus.text_at(i), max_results);
        Ok(positions
            .into_iter()
            .map(|position| Match {
                position,
                similarity: None,
            })
            .collect())
    }
}

/// Most recent entries sharing a content token with `query`, oldest first
pub fn retrieve_keyword<'a, E: Entry>(
    query: &str,
    entries: &'a [E],
    fields: &TextFields,
    max_results: usize,
) -> Vec<&'a E> {
    let positions = KeywordRetriever::new().match_positions(
        query,
        entries.len(),
        |i| fields.joined_text(&entries[i]),
        max_results,
    );
    let matches: Vec<Match> = positions
        .into_iter()
        .map(|position| Match {
            position,
            similarity: None,
        })
        .collect();
    select(entries, &matches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::entry::{GoalEntry, MemoryEntry};

    fn memories(summaries: &[&str]) -> Vec<MemoryEntry> {
        summaries.iter().map(|s| MemoryEntry::from_summary(s)).collect()
    }

    fn summaries<'a>(found: &[&'a MemoryEntry]) -> Vec<&'a str> {
        found.iter().map(|m| m.summary.as_str()).collect()
    }

    #[test]
    fn test_most_recent_match_wins() {
        let entries = memories(&[
            "Felt grateful for family support",
            "Thinking about an art project",
            "Reflecting on the art project and fear of failure",
        ]);
        let found = retrieve_keyword(
            "Tell me about the art project",
            &entries,
            &TextFields::memory(),
            1,
        );
        assert_eq!(
            summaries(&found),
            vec!["Reflecting on the art project and fear of failure"]
        );
    }

    #[test]
    fn test_matches_returned_oldest_first() {
        let entries = memories(&[
            "art class",
            "family dinner",
            "art project",
            "art show",
        ]);
        let found = retrieve_keyword("art", &entries, &TextFields::memory(), 2);
        assert_eq!(summaries(&found), vec!["art project", "art show"]);

        let all = retrieve_keyword("art", &entries, &TextFields::memory(), 10);
        assert_eq!(summaries(&all), vec!["art class", "art project", "art show"]);
    }

    #[test]
    fn test_stop_words_do_not_match() {
        let entries = memories(&[
            "Expressed gratitude toward family and friends",
            "Talked about a professor at university",
        ]);
        let found = retrieve_keyword(
            "I was at a wedding with my family",
            &entries,
            &TextFields::memory(),
            2,
        );
        assert_eq!(
            summaries(&found),
            vec!["Expressed gratitude toward family and friends"]
        );
    }

    #[test]
    fn test_punctuation_is_ignored() {
        let entries = memories(&["Reminiscing about that special professor..."]);
        let found = retrieve_keyword("My PROFESSOR!", &entries, &TextFields::memory(), 2);
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn test_goal_fields_are_joined() {
        let goals = vec![
            GoalEntry::new("Become proficient in Spanish", "Reach CEFR Level C2."),
            GoalEntry::new("Launch AI MVP", "Ship a working prototype."),
        ];
        let found = retrieve_keyword(
            "How is my AI prototype going?",
            &goals,
            &TextFields::goals(),
            2,
        );
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Launch AI MVP");
    }

    #[test]
    fn test_empty_inputs() {
        let entries: Vec<MemoryEntry> = Vec::new();
        assert!(retrieve_keyword("art", &entries, &TextFields::memory(), 2).is_empty());

        let entries = memories(&["art project"]);
        assert!(retrieve_keyword("", &entries, &TextFields::memory(), 2).is_empty());
        assert!(retrieve_keyword("the and of", &entries, &TextFields::memory(), 2).is_empty());
        assert!(retrieve_keyword("art", &entries, &TextFields::memory(), 0).is_empty());
    }

    #[test]
    fn test_unknown_field_matches_nothing() {
        let entries = memories(&["art project"]);
        let fields = TextFields::from("mood");
        assert!(retrieve_keyword("art", &entries, &fields, 2).is_empty());
    }

    #[test]
    fn test_retriever_trait_positions() {
        let entries = memories(&["art class", "family dinner", "art show"]);
        let fields = TextFields::memory();
        let corpus = Corpus::new(&entries, &fields);

        let matches = KeywordRetriever::new().retrieve("art", &corpus, 5).unwrap();
        let positions: Vec<usize> = matches.iter().map(|m| m.position).collect();
        assert_eq!(positions, vec![0, 2]);
        assert!(matches.iter().all(|m| m.similarity.is_none()));
    }
}
