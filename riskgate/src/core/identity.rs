//! Per-row entity identifiers.

use super::dataset::Dataset;
use crate::error::Result;

/// Identity columns in priority order.
pub const IDENTITY_COLUMNS: [&str; 2] = ["entity_id", "user_id"];

/// Returns the synthetic identifier for row `index`.
pub fn synthetic_id(index: usize) -> String {
    format!("entity_{index}")
}

/// Derives one stable identifier per row.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityResolver;

impl IdentityResolver {
    pub fn new() -> Self {
        Self
    }

    /// Resolves exactly `n_rows` identifiers in row order.
    ///
    /// Values come from the first identity column present in `dataset`
    /// (`entity_id`, then `user_id`), coerced to strings. Rows without a value
    /// there, and every row when no identity column exists, receive
    /// `entity_<row_index>`.
    pub fn resolve(&self, dataset: Option<&Dataset>, n_rows: usize) -> Result<Vec<String>> {
        let source = match dataset {
            Some(dataset) => self.identity_values(dataset)?,
            None => None,
        };

        let ids = (0..n_rows)
            .map(|index| {
                source
                    .as_ref()
                    .and_then(|values| values.get(index).cloned().flatten())
                    .unwrap_or_else(|| synthetic_id(index))
            })
            .collect();
        Ok(ids)
    }

    /// Name of the identity column `resolve` would read, if any.
    pub fn identity_column(&self, dataset: &Dataset) -> Option<&'static str> {
        IDENTITY_COLUMNS
            .iter()
            .copied()
            .find(|name| dataset.has_column(name))
    }

    fn identity_values(&self, dataset: &Dataset) -> Result<Option<Vec<Option<String>>>> {
        match self.identity_column(dataset) {
            Some(name) => dataset.column_as_strings(name),
            None => Ok(None),
        }
    }
}
