use super::vocab::{Vocab, BOS, PAD, UNK};
use super::{Field, FieldValue, RawColumn};
use crate::corpus::Corpus;
use anyhow::{Context, Result};
use ndarray::Array2;

/// Splits every token into characters and maps them to indices, producing a
/// 2-D `[tokens, chars]` array per sample.
///
/// Rows are right-padded to the longest token of the sample, or cut/padded
/// to `fix_len` when set.
#[derive(Debug, Clone)]
pub struct SubwordField {
    name: String,
    vocab: Vocab,
    fix_len: Option<usize>,
    bos: bool,
}

impl SubwordField {
    pub fn new(name: impl Into<String>, vocab: Vocab) -> Self {
        Self {
            name: name.into(),
            vocab,
            fix_len: None,
            bos: false,
        }
    }

    /// Builds a character vocabulary from the named corpus column.
    pub fn build(name: impl Into<String>, corpus: &Corpus, min_freq: usize) -> Result<Self> {
        let name = name.into();
        let column = corpus
            .column(&name)
            .with_context(|| format!("Cannot build character vocabulary for '{}'", name))?;
        let chars: Vec<String> = column
            .iter()
            .flatten()
            .flat_map(|token| token.chars())
            .map(String::from)
            .collect();
        let vocab = Vocab::build(chars.iter().map(String::as_str), min_freq, &[PAD, UNK, BOS])?;
        Ok(Self::new(name, vocab))
    }

    pub fn with_fix_len(mut self, fix_len: usize) -> Self {
        self.fix_len = Some(fix_len);
        self
    }

    pub fn with_bos(mut self, bos: bool) -> Self {
        self.bos = bos;
        self
    }

    pub fn vocab(&self) -> &Vocab {
        &self.vocab
    }

    fn encode(&self, tokens: &[String]) -> Array2<i64> {
        let mut rows: Vec<Vec<i64>> = Vec::with_capacity(tokens.len() + 1);
        if self.bos {
            rows.push(vec![self.vocab.index(BOS)]);
        }
        rows.extend(
            tokens
                .iter()
                .map(|token| token.chars().map(|c| self.vocab.index(&c.to_string())).collect()),
        );

        let width = self
            .fix_len
            .unwrap_or_else(|| rows.iter().map(Vec::len).max().unwrap_or(0));
        let pad = self.pad_index();

        let mut out = Array2::from_elem((rows.len(), width), pad);
        for (i, row) in rows.iter().enumerate() {
            for (j, &id) in row.iter().take(width).enumerate() {
                out[[i, j]] = id;
            }
        }
        out
    }
}

impl Field for SubwordField {
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
        Ok(column
            .iter()
            .map(|tokens| FieldValue::Array(self.encode(tokens).into_dyn()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::Sentence;
    use ndarray::array;

    fn corpus() -> Corpus {
        Corpus::new(vec![Sentence::from_column(
            "word",
            vec!["ab".into(), "b".into()],
        )])
    }

    #[test]
    fn test_subword_shape() -> Result<()> {
        // chars: b(2) then a(1) -> b=3, a=4
        let field = SubwordField::build("word", &corpus(), 1)?;
        let values = field.transform(corpus().column("word")?)?;

        assert_eq!(
            values[0],
            FieldValue::Array(array![[4, 3], [3, 0]].into_dyn())
        );
        Ok(())
    }

    #[test]
    fn test_subword_fix_len_and_bos() -> Result<()> {
        let field = SubwordField::build("word", &corpus(), 1)?
            .with_fix_len(1)
            .with_bos(true);
        let values = field.transform(corpus().column("word")?)?;

        assert_eq!(
            values[0],
            FieldValue::Array(array![[2], [4], [3]].into_dyn())
        );
        Ok(())
    }
}
