//! Column transforms that turn raw corpus tokens into numeric arrays.
//!
//! A [`Field`] owns one named column of the corpus. Datasets are declared as
//! a (possibly nested) list of [`FieldSpec`]s which is flattened once into an
//! ordered list of fields; that order is the order of every batch's entries.

mod numeric;
mod subword;
mod token;
mod vocab;

pub use numeric::NumericField;
pub use subword::SubwordField;
pub use token::TokenField;
pub use vocab::{Vocab, BOS, PAD, UNK};

pub use crate::corpus::RawColumn;

use anyhow::Result;
use ndarray::{Array1, ArrayD};
use std::fmt;
use std::sync::Arc;

/// A single transformed per-sample value of a field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// A flat numeric array of any rank. Padded along every axis.
    Array(ArrayD<i64>),
    /// A fixed-width group of arrays. Each position is padded independently.
    Group(Vec<ArrayD<i64>>),
    Scalar(i64),
    Text(String),
}

impl FieldValue {
    /// Short name of the value's shape, used in error messages.
    pub fn shape_class(&self) -> &'static str {
        match self {
            FieldValue::Array(_) => "array",
            FieldValue::Group(_) => "group",
            FieldValue::Scalar(_) => "scalar",
            FieldValue::Text(_) => "text",
        }
    }

    pub fn as_array(&self) -> Option<&ArrayD<i64>> {
        match self {
            FieldValue::Array(array) => Some(array),
            _ => None,
        }
    }
}

impl From<Vec<i64>> for FieldValue {
    fn from(values: Vec<i64>) -> Self {
        FieldValue::Array(Array1::from(values).into_dyn())
    }
}

impl From<ArrayD<i64>> for FieldValue {
    fn from(array: ArrayD<i64>) -> Self {
        FieldValue::Array(array)
    }
}

/// A named column transform.
///
/// `transform` receives the raw tokens of every sentence (index-aligned with
/// the corpus) and must return exactly one value per sentence.
pub trait Field: Send + Sync {
    /// Column name; also the key under which the dataset stores the output.
    fn name(&self) -> &str;

    /// Value used when padding this field's arrays.
    fn pad_index(&self) -> i64;

    /// Whether a beginning-of-sequence element is prepended to each sample.
    fn bos(&self) -> bool {
        false
    }

    fn transform(&self, column: RawColumn) -> Result<Vec<FieldValue>>;
}

/// Declarative field layout, before flattening.
#[derive(Clone)]
pub enum FieldSpec {
    /// Placeholder for a corpus column that is not loaded.
    Skip,
    Field(Arc<dyn Field>),
    Group(Vec<FieldSpec>),
}

impl FieldSpec {
    pub fn field(field: impl Field + 'static) -> Self {
        FieldSpec::Field(Arc::new(field))
    }
}

impl fmt::Debug for FieldSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldSpec::Skip => write!(f, "Skip"),
            FieldSpec::Field(field) => write!(f, "Field({:?})", field.name()),
            FieldSpec::Group(specs) => f.debug_tuple("Group").field(specs).finish(),
        }
    }
}

impl<F: Field + 'static> From<F> for FieldSpec {
    fn from(field: F) -> Self {
        FieldSpec::field(field)
    }
}

/// Flattens specs depth-first: `Skip` entries vanish, groups expand in place.
pub fn flatten_fields(specs: &[FieldSpec]) -> Vec<Arc<dyn Field>> {
    let mut out = Vec::new();
    flatten_into(specs, &mut out);
    out
}

fn flatten_into(specs: &[FieldSpec], out: &mut Vec<Arc<dyn Field>>) {
    for spec in specs {
        match spec {
            FieldSpec::Skip => {}
            FieldSpec::Field(field) => out.push(Arc::clone(field)),
            FieldSpec::Group(inner) => flatten_into(inner, out),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named(&'static str);

    impl Field for Named {
        fn name(&self) -> &str {
            self.0
        }
        fn pad_index(&self) -> i64 {
            0
        }
        fn transform(&self, column: RawColumn) -> Result<Vec<FieldValue>> {
            Ok(column.iter().map(|_| FieldValue::Scalar(0)).collect())
        }
    }

    #[test]
    fn test_flatten_nested_specs() {
        let specs = vec![
            FieldSpec::Skip,
            FieldSpec::field(Named("word")),
            FieldSpec::Group(vec![
                FieldSpec::field(Named("feat")),
                FieldSpec::Skip,
                FieldSpec::Group(vec![Named("head").into()]),
            ]),
            Named("rel").into(),
        ];

        let names: Vec<String> = flatten_fields(&specs)
            .iter()
            .map(|f| f.name().to_string())
            .collect();
        assert_eq!(names, vec!["word", "feat", "head", "rel"]);
    }

    #[test]
    fn test_flatten_only_skips() {
        assert!(flatten_fields(&[FieldSpec::Skip, FieldSpec::Group(vec![])]).is_empty());
    }

    #[test]
    fn test_field_value_shape_class() {
        assert_eq!(FieldValue::from(vec![1, 2]).shape_class(), "array");
        assert_eq!(FieldValue::Group(vec![]).shape_class(), "group");
        assert_eq!(FieldValue::Scalar(3).shape_class(), "scalar");
        assert_eq!(FieldValue::Text("x".into()).shape_class(), "text");
    }

    #[test]
    fn test_spec_debug_names_fields() {
        let spec = FieldSpec::Group(vec![FieldSpec::Skip, Named("word").into()]);
        assert_eq!(format!("{:?}", spec), r#"Group([Skip, Field("word")])"#);
    }
}
