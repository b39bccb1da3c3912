use super::{Field, FieldValue, RawColumn};
use anyhow::{Context, Result};

/// Parses every token of a column as an integer (e.g. dependency heads).
#[derive(Debug, Clone)]
pub struct NumericField {
    name: String,
    pad_index: i64,
    bos: Option<i64>,
}

impl NumericField {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pad_index: 0,
            bos: None,
        }
    }

    pub fn with_pad_index(mut self, pad_index: i64) -> Self {
        self.pad_index = pad_index;
        self
    }

    /// Prepends `value` to every sample.
    pub fn with_bos(mut self, value: i64) -> Self {
        self.bos = Some(value);
        self
    }
}

impl Field for NumericField {
    fn name(&self) -> &str {
        &self.name
    }

    fn pad_index(&self) -> i64 {
        self.pad_index
    }

    fn bos(&self) -> bool {
        self.bos.is_some()
    }

    fn transform(&self, column: RawColumn) -> Result<Vec<FieldValue>> {
        column
            .iter()
            .enumerate()
            .map(|(i, tokens)| {
                let mut values = Vec::with_capacity(tokens.len() + 1);
                values.extend(self.bos);
                for token in tokens {
                    let value = token.trim().parse::<i64>().with_context(|| {
                        format!(
                            "Field '{}': sentence #{} has non-integer token '{}'",
                            self.name, i, token
                        )
                    })?;
                    values.push(value);
                }
                Ok(FieldValue::from(values))
            })
            .collect()
    }
}
