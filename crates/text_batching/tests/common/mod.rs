#![allow(dead_code)]

use text_batching::{
    corpus::{Corpus, Sentence},
    field::{Field, FieldSpec, FieldValue, NumericField, RawColumn, TokenField},
    TextDataset,
};

use anyhow::Result;
use std::time::Duration;

/// Corpus whose sentence `i` has `lengths[i]` tokens with `word`, `head` and
/// `rel` columns. Heads point at the previous token.
pub fn corpus_with_lengths(lengths: &[usize]) -> Result<Corpus> {
    lengths
        .iter()
        .enumerate()
        .map(|(s, &n)| {
            let words = (0..n).map(|t| format!("w{}", (s + t) % 7)).collect();
            let heads = (0..n).map(|t| t.to_string()).collect();
            let rels = (0..n)
                .map(|t| if t == 0 { "root" } else { "dep" }.to_string())
                .collect();
            Sentence::from_column("word", words)
                .with_column("head", heads)?
                .with_column("rel", rels)
        })
        .collect()
}

/// Deterministic spread of lengths in `1..=max_len`.
pub fn varied_lengths(n: usize, max_len: usize) -> Vec<usize> {
    (0..n).map(|i| 1 + (i * 37 + i / 3) % max_len).collect()
}

/// `word` + `head` (with a root element) + `rel`, bucketed into `k` buckets.
pub fn parser_dataset(corpus: &Corpus, k: Option<usize>) -> Result<TextDataset> {
    let specs = vec![
        FieldSpec::field(TokenField::build("word", corpus, 1, false)?.with_bos(true)),
        FieldSpec::Group(vec![
            FieldSpec::field(NumericField::new("head").with_bos(0)),
            FieldSpec::Skip,
        ]),
        FieldSpec::field(TokenField::build("rel", corpus, 1, false)?.with_bos(true)),
    ];
    TextDataset::new(corpus, specs, k)
}

/// Yields one scalar per sentence, which the padding collator rejects.
pub struct SentenceIdField;

impl Field for SentenceIdField {
    fn name(&self) -> &str {
        "word"
    }

    fn pad_index(&self) -> i64 {
        0
    }

    fn transform(&self, column: RawColumn) -> Result<Vec<FieldValue>> {
        Ok((0..column.len() as i64).map(FieldValue::Scalar).collect())
    }
}

/// Waits until `cond` holds or `timeout` passes. Returns whether it held.
pub fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let start = std::time::Instant::now();
    while start.elapsed() < timeout {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    cond()
}
