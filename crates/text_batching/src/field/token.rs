use super::vocab::{Vocab, BOS, PAD, UNK};
use super::{Field, FieldValue, RawColumn};
use crate::corpus::Corpus;
use anyhow::{Context, Result};

/// Maps each token of a column to its vocabulary index.
///
/// # Example
/// ```ignore
/// let words = TokenField::build("word", &corpus, 2, true)?.with_bos(true);
/// ```
#[derive(Debug, Clone)]
pub struct TokenField {
    name: String,
    vocab: Vocab,
    lower: bool,
    bos: bool,
}

impl TokenField {
    /// Wraps an existing vocabulary. The vocabulary must contain [`PAD`].
    pub fn new(name: impl Into<String>, vocab: Vocab) -> Self {
        Self {
            name: name.into(),
            vocab,
            lower: false,
            bos: false,
        }
    }

    /// Builds the vocabulary from the named corpus column. With `lower`,
    /// tokens are lowercased both when counting and when looking up.
    pub fn build(
        name: impl Into<String>,
        corpus: &Corpus,
        min_freq: usize,
        lower: bool,
    ) -> Result<Self> {
        let name = name.into();
        let column = corpus
            .column(&name)
            .with_context(|| format!("Cannot build vocabulary for '{}'", name))?;
        let tokens: Vec<String> = column
            .into_iter()
            .flatten()
            .map(|t| if lower { t.to_lowercase() } else { t })
            .collect();
        let vocab = Vocab::build(tokens.iter().map(String::as_str), min_freq, &[PAD, UNK, BOS])?;
        Ok(Self::new(name, vocab).lowercase(lower))
    }

    /// Lowercases tokens before lookup.
    pub fn lowercase(mut self, lower: bool) -> Self {
        self.lower = lower;
        self
    }

    pub fn with_bos(mut self, bos: bool) -> Self {
        self.bos = bos;
        self
    }

    pub fn vocab(&self) -> &Vocab {
        &self.vocab
    }

    fn lookup(&self, token: &str) -> i64 {
        if self.lower {
            self.vocab.index(&token.to_lowercase())
        } else {
            self.vocab.index(token)
        }
    }
}

impl Field for TokenField {
    fn name(&self) -> &str {
        &self.name
    }

    fn pad_index(&self) -> i64 {
        self.vocab.get(PAD).unwrap_or(0)
    }

    fn bos(&self) -> bool {
        self.bos
    }

    fn transform(&self, column: RawColumn) -> Result<Vec<FieldValue>> {
        let bos_index = self.vocab.index(BOS);
        Ok(column
            .iter()
            .map(|tokens| {
                let ids: Vec<i64> = self
                    .bos
                    .then_some(bos_index)
                    .into_iter()
                    .chain(tokens.iter().map(|t| self.lookup(t)))
                    .collect();
                FieldValue::from(ids)
            })
            .collect())
    }
}
