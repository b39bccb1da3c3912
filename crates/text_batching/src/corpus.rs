use anyhow::{anyhow, ensure, Result};
use std::collections::HashMap;

/// A raw per-field column: for every sentence, its tokens for that field.
pub type RawColumn = Vec<Vec<String>>;

/// The `Sentence` struct represents a single tokenized example of a corpus.
///
/// It maps column names (e.g., `"word"`, `"head"`, `"deprel"`) to the
/// token-aligned values of that column. Every column of a sentence holds one
/// entry per token, so all columns share the same length.
///
/// # Examples:
/// - `{"word": ["The", "cat", "sat"], "head": ["2", "3", "0"]}`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sentence {
    columns: HashMap<String, Vec<String>>,
    len: usize,
}

impl Sentence {
    /// Creates a `Sentence` from a single `(column_name, tokens)` pair.
    ///
    /// Chain with [`with_column`](Self::with_column) to add more columns.
    pub fn from_column(name: impl Into<String>, tokens: Vec<String>) -> Self {
        let len = tokens.len();
        Self {
            columns: HashMap::from([(name.into(), tokens)]),
            len,
        }
    }

    /// Adds or overwrites a column. Fails if its length differs from the
    /// sentence's token count.
    pub fn with_column(mut self, name: impl Into<String>, tokens: Vec<String>) -> Result<Self> {
        let name = name.into();
        if self.columns.is_empty() {
            self.len = tokens.len();
        }
        ensure!(
            tokens.len() == self.len,
            "Column '{}' has {} tokens but the sentence has {}",
            name,
            tokens.len(),
            self.len
        );
        self.columns.insert(name, tokens);
        Ok(self)
    }

    /// Returns the tokens of a column.
    pub fn get(&self, column: &str) -> Result<&[String]> {
        self.columns
            .get(column)
            .map(Vec::as_slice)
            .ok_or_else(|| anyhow!("Column '{}' not found in sentence", column))
    }

    /// Number of tokens in the sentence.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns an iterator over all column names of this sentence.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }
}

/// An ordered collection of [`Sentence`]s. Sentence order defines the sample
/// index used everywhere downstream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Corpus {
    sentences: Vec<Sentence>,
}

impl Corpus {
    pub fn new(sentences: Vec<Sentence>) -> Self {
        Self { sentences }
    }

    pub fn len(&self) -> usize {
        self.sentences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sentences.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Sentence> {
        self.sentences.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Sentence> {
        self.sentences.iter()
    }

    /// Extracts one column across all sentences, index-aligned with the corpus.
    pub fn column(&self, name: &str) -> Result<RawColumn> {
        self.sentences
            .iter()
            .enumerate()
            .map(|(i, sentence)| {
                sentence
                    .get(name)
                    .map(<[String]>::to_vec)
                    .map_err(|e| e.context(format!("Sentence #{} is missing a column", i)))
            })
            .collect()
    }
}

impl FromIterator<Sentence> for Corpus {
    fn from_iter<I: IntoIterator<Item = Sentence>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Corpus {
    type Item = &'a Sentence;
    type IntoIter = std::slice::Iter<'a, Sentence>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_sentence_construction() -> Result<()> {
        let sentence = Sentence::from_column("word", tokens(&["a", "b", "c"]))
            .with_column("head", tokens(&["2", "0", "2"]))?;

        assert_eq!(sentence.len(), 3);
        assert_eq!(sentence.get("head")?, &tokens(&["2", "0", "2"])[..]);
        assert!(sentence.get("missing").is_err());

        let mut columns: Vec<_> = sentence.columns().collect();
        columns.sort_unstable();
        assert_eq!(columns, vec!["head", "word"]);
        Ok(())
    }

    #[test]
    fn test_sentence_rejects_misaligned_column() {
        let result = Sentence::from_column("word", tokens(&["a", "b"]))
            .with_column("head", tokens(&["1"]));
        assert!(result.is_err());
    }

    #[test]
    fn test_corpus_column_extraction() -> Result<()> {
        let corpus: Corpus = vec![
            Sentence::from_column("word", tokens(&["x"])),
            Sentence::from_column("word", tokens(&["y", "z"])),
        ]
        .into_iter()
        .collect();

        assert_eq!(corpus.len(), 2);
        assert_eq!(
            corpus.column("word")?,
            vec![tokens(&["x"]), tokens(&["y", "z"])]
        );

        let err = corpus.column("pos").unwrap_err();
        assert!(format!("{:#}", err).contains("Sentence #0"));
        Ok(())
    }
}
