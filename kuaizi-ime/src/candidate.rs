//! The dictionary seam.
//!
//! Candidate lookup and ranking live outside the core. A
//! [`CandidateProvider`] answers spelling queries with a lazy, ranked
//! sequence of words and may offer phrase completions for a confirmed word.
//! [`StaticCandidates`] is the in-memory provider used by tests and demos.

use rustc_hash::FxHashMap;

use crate::input::CompletionInput;

/// Supplies ranked candidates for pinyin spellings.
pub trait CandidateProvider {
    /// Candidates for `spelling`, best first.
    fn candidates<'a>(&'a self, spelling: &str) -> Box<dyn Iterator<Item = String> + 'a>;

    /// Whether `spelling` is a complete spelling the dictionary knows.
    fn is_spelling(&self, spelling: &str) -> bool {
        self.candidates(spelling).next().is_some()
    }

    /// Phrases that may follow `word`.
    fn completions(&self, word: &str) -> Vec<CompletionInput> {
        let _ = word;
        Vec::new()
    }
}

/// A fixed dictionary.
#[derive(Debug, Clone, Default)]
pub struct StaticCandidates {
    words: FxHashMap<String, Vec<String>>,
    phrases: FxHashMap<String, Vec<CompletionInput>>,
}

impl StaticCandidates {
    /// Creates an empty dictionary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds ranked words for a spelling.
    pub fn with_words<I, S>(mut self, spelling: impl Into<String>, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.words
            .entry(spelling.into())
            .or_default()
            .extend(words.into_iter().map(Into::into));
        self
    }

    /// Adds a phrase completion after `word`.
    pub fn with_phrase<I, S>(mut self, word: impl Into<String>, following: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.phrases
            .entry(word.into())
            .or_default()
            .push(CompletionInput::new(following));
        self
    }
}

impl CandidateProvider for StaticCandidates {
    fn candidates<'a>(&'a self, spelling: &str) -> Box<dyn Iterator<Item = String> + 'a> {
        Box::new(self.words.get(spelling).into_iter().flatten().cloned())
    }

    fn completions(&self, word: &str) -> Vec<CompletionInput> {
        self.phrases.get(word).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_candidates() {
        let dict = StaticCandidates::new()
            .with_words("ni", ["你", "泥"])
            .with_phrase("你", ["好"]);

        assert_eq!(dict.candidates("ni").collect::<Vec<_>>(), ["你", "泥"]);
        assert!(dict.is_spelling("ni"));
        assert!(!dict.is_spelling("nih"));
        assert_eq!(dict.completions("你"), vec![CompletionInput::new(["好"])]);
        assert!(dict.completions("泥").is_empty());
    }
}
