//! Tabular types shared by the pipeline stages.
//!
//! Input and output tables are plain string grids; computed features are kept as
//! typed `f64` columns until they are rendered for output.

use crate::error::FeaturizeError;
use serde::{Deserialize, Serialize};

/// A string table with a header row, as read from (or written to) CSV.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    /// Build a table, rejecting rows whose width differs from the header.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self, FeaturizeError> {
        if let Some((row, found)) = rows
            .iter()
            .enumerate()
            .find(|(_, r)| r.len() != headers.len())
            .map(|(i, r)| (i, r.len()))
        {
            return Err(FeaturizeError::RaggedRow {
                row,
                found,
                expected: headers.len(),
            });
        }
        Ok(Self { headers, rows })
    }

    /// Number of data rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of the first column with the given name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Values of a column in row order.
    pub fn column(&self, name: &str) -> Option<Vec<&str>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|r| r[idx].as_str()).collect())
    }

    /// Append a column. `values` must have one entry per row.
    pub fn push_column(&mut self, name: impl Into<String>, values: Vec<String>) {
        let at = self.headers.len();
        self.insert_column(at, name, values);
    }

    /// Insert a column at position `at`.
    pub fn insert_column(&mut self, at: usize, name: impl Into<String>, values: Vec<String>) {
        debug_assert_eq!(values.len(), self.rows.len());
        self.headers.insert(at, name.into());
        for (row, value) in self.rows.iter_mut().zip(values) {
            row.insert(at, value);
        }
    }

    /// Overwrite every value of an existing column via `f`.
    pub fn map_column<F>(&mut self, idx: usize, f: F)
    where
        F: Fn(&str) -> String,
    {
        for row in &mut self.rows {
            row[idx] = f(&row[idx]);
        }
    }

    /// Remove all columns whose name is in `names`.
    pub fn drop_columns(&mut self, names: &[&str]) {
        let keep: Vec<bool> = self
            .headers
            .iter()
            .map(|h| !names.contains(&h.as_str()))
            .collect();

        let filter = |values: &mut Vec<String>| {
            let mut flags = keep.iter();
            values.retain(|_| *flags.next().unwrap_or(&true));
        };

        filter(&mut self.headers);
        for row in &mut self.rows {
            filter(row);
        }
    }
}

/// One preprocessed chat message.
///
/// Feature functions receive this record instead of looking up table columns, so the
/// text variants they depend on are part of the type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Grouping key
    pub conversation_num: String,
    /// Author of the message
    pub speaker_nickname: String,
    /// Fully normalized text (lowercase, no punctuation, single spaces)
    pub message: String,
    /// Lowercased text with punctuation retained
    pub message_lower_with_punc: String,
}

/// A computed numeric column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureColumn {
    pub name: String,
    pub values: Vec<f64>,
}

impl FeatureColumn {
    pub fn new(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    /// Render the values for tabular output.
    pub fn rendered(&self) -> Vec<String> {
        self.values.iter().map(|&v| format_value(v)).collect()
    }
}

/// Render a feature value deterministically (shortest round-trip form, `0` for ±0).
pub fn format_value(value: f64) -> String {
    if value == 0.0 {
        "0".to_string()
    } else {
        format!("{value}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RawTable {
        RawTable::new(
            vec!["a".into(), "b".into(), "c".into()],
            vec![
                vec!["1".into(), "2".into(), "3".into()],
                vec!["4".into(), "5".into(), "6".into()],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let result = RawTable::new(vec!["a".into()], vec![vec!["1".into(), "2".into()]]);
        assert!(matches!(
            result,
            Err(FeaturizeError::RaggedRow {
                row: 0,
                found: 2,
                expected: 1
            })
        ));
    }

    #[test]
    fn test_insert_and_drop_columns() {
        let mut table = sample();
        table.insert_column(0, "id", vec!["x".into(), "y".into()]);
        assert_eq!(table.headers, vec!["id", "a", "b", "c"]);
        assert_eq!(table.rows[1], vec!["y", "4", "5", "6"]);

        table.drop_columns(&["a", "c"]);
        assert_eq!(table.headers, vec!["id", "b"]);
        assert_eq!(table.rows[0], vec!["x", "2"]);
    }

    #[test]
    fn test_column_lookup() {
        let table = sample();
        assert_eq!(table.column("b"), Some(vec!["2", "5"]));
        assert_eq!(table.column("z"), None);
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(3.0), "3");
        assert_eq!(format_value(-0.0), "0");
        assert_eq!(format_value(0.25), "0.25");
    }
}
