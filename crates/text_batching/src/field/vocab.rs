use anyhow::{ensure, Result};
use std::collections::HashMap;

pub const PAD: &str = "<pad>";
pub const UNK: &str = "<unk>";
pub const BOS: &str = "<bos>";

/// String-to-index mapping with reserved special tokens.
///
/// Specials occupy the first indices in the order given. Regular tokens
/// follow, sorted by descending frequency and then lexically, so the same
/// counts always produce the same vocabulary.
#[derive(Debug, Clone, PartialEq)]
pub struct Vocab {
    itos: Vec<String>,
    stoi: HashMap<String, i64>,
    unk_index: i64,
}

impl Vocab {
    /// Builds a vocabulary from an iterator of tokens.
    ///
    /// `specials` must contain [`UNK`]; tokens seen fewer than `min_freq`
    /// times map to it.
    pub fn build<'a, I>(tokens: I, min_freq: usize, specials: &[&str]) -> Result<Self>
    where
        I: IntoIterator<Item = &'a str>,
    {
        ensure!(
            specials.contains(&UNK),
            "Vocabulary specials must include '{}'",
            UNK
        );

        let mut counts: HashMap<&str, usize> = HashMap::new();
        for token in tokens {
            *counts.entry(token).or_default() += 1;
        }

        let mut ranked: Vec<(&str, usize)> = counts
            .into_iter()
            .filter(|(token, count)| *count >= min_freq.max(1) && !specials.contains(token))
            .collect();
        ranked.sort_unstable_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

        let itos: Vec<String> = specials
            .iter()
            .copied()
            .chain(ranked.into_iter().map(|(token, _)| token))
            .map(str::to_string)
            .collect();

        let mut stoi = HashMap::with_capacity(itos.len());
        for (i, token) in itos.iter().enumerate() {
            stoi.entry(token.clone()).or_insert(i as i64);
        }
        let unk_index = stoi[UNK];

        Ok(Self {
            itos,
            stoi,
            unk_index,
        })
    }

    pub fn len(&self) -> usize {
        self.itos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.itos.is_empty()
    }

    /// Index of `token`, or the unknown index.
    pub fn index(&self, token: &str) -> i64 {
        self.stoi.get(token).copied().unwrap_or(self.unk_index)
    }

    /// Index of a token only if it is in the vocabulary.
    pub fn get(&self, token: &str) -> Option<i64> {
        self.stoi.get(token).copied()
    }

    pub fn token(&self, index: i64) -> Option<&str> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.itos.get(i))
            .map(String::as_str)
    }

    pub fn unk_index(&self) -> i64 {
        self.unk_index
    }
}
