use crate::corpus::{Corpus, Sentence};
use anyhow::{bail, ensure, Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;

/// Reads CoNLL-style files: one token per line, tab-separated columns,
/// sentences separated by blank lines. Lines starting with `#` are comments.
///
/// # Example
/// ```ignore
/// let reader = ConllReader::new("train.conll", ["id", "word", "pos", "head", "deprel"]);
/// let corpus = reader.read()?;
/// ```
pub struct ConllReader {
    path: PathBuf,
    columns: Vec<String>,
}

impl ConllReader {
    /// Creates a reader for `path` with the given column names, in file order.
    pub fn new<I, S>(path: impl Into<PathBuf>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            path: path.into(),
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Reads the whole file into a [`Corpus`].
    pub fn read(&self) -> Result<Corpus> {
        let file = File::open(&self.path)
            .with_context(|| format!("Failed to open CoNLL file: {}", self.path.display()))?;
        self.parse_lines(BufReader::new(file).lines())
            .with_context(|| format!("Failed to parse {}", self.path.display()))
    }

    /// Parses CoNLL text held in memory.
    pub fn parse_str(&self, text: &str) -> Result<Corpus> {
        self.parse_lines(text.lines().map(|l| Ok(l.to_string())))
    }

    fn parse_lines<I>(&self, lines: I) -> Result<Corpus>
    where
        I: Iterator<Item = std::io::Result<String>>,
    {
        ensure!(!self.columns.is_empty(), "ConllReader needs at least one column");

        let mut sentences = Vec::new();
        let mut rows: Vec<Vec<String>> = Vec::new();

        for (line_num, line) in lines.enumerate() {
            let line = line.with_context(|| format!("Error reading line {}", line_num + 1))?;
            // Trailing tabs delimit empty cells, so only the line ending is cut.
            let trimmed = line.trim_end_matches(['\r', '\n']);

            if trimmed.trim().is_empty() {
                if !rows.is_empty() {
                    sentences.push(self.build_sentence(std::mem::take(&mut rows))?);
                }
                continue;
            }
            if trimmed.starts_with('#') {
                continue;
            }

            let cells: Vec<String> = trimmed.split('\t').map(str::to_string).collect();
            if cells.len() != self.columns.len() {
                bail!(
                    "Line {}: expected {} columns, found {}",
                    line_num + 1,
                    self.columns.len(),
                    cells.len()
                );
            }
            rows.push(cells);
        }
        if !rows.is_empty() {
            sentences.push(self.build_sentence(rows)?);
        }

        Ok(Corpus::new(sentences))
    }

    // Rows are token-major; columns are stored field-major.
    fn build_sentence(&self, rows: Vec<Vec<String>>) -> Result<Sentence> {
        let mut per_column: Vec<Vec<String>> = vec![Vec::with_capacity(rows.len()); self.columns.len()];
        for row in rows {
            for (col, cell) in row.into_iter().enumerate() {
                per_column[col].push(cell);
            }
        }

        let mut sentence = Sentence::default();
        for (name, tokens) in self.columns.iter().zip(per_column) {
            sentence = sentence.with_column(name.clone(), tokens)?;
        }
        Ok(sentence)
    }
}
