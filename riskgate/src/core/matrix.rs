//! Numeric feature matrices and width reconciliation.

use ndarray::{s, Array2, ArrayView1, ArrayView2, Axis};

use super::log_sink::LogSink;
use crate::error::{Result, RiskError};

/// A dense `rows × width` matrix of `f64` features.
///
/// Built from the numeric columns of a dataset in declaration order; row `i`
/// always corresponds to row `i` of the source dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    values: Array2<f64>,
}

impl FeatureMatrix {
    pub fn new(values: Array2<f64>) -> Self {
        Self { values }
    }

    /// Creates a matrix of `rows × width` zeros.
    pub fn zeros(rows: usize, width: usize) -> Self {
        Self::new(Array2::zeros((rows, width)))
    }

    /// Builds a matrix from row vectors.
    ///
    /// # Errors
    ///
    /// Returns [`RiskError::InvalidData`] when the rows are ragged.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        let width = rows.first().map(Vec::len).unwrap_or(0);
        if let Some(bad) = rows.iter().position(|row| row.len() != width) {
            return Err(RiskError::InvalidData(format!(
                "row {bad} has {} values, expected {width}",
                rows[bad].len()
            )));
        }
        let flat: Vec<f64> = rows.iter().flatten().copied().collect();
        let values = Array2::from_shape_vec((rows.len(), width), flat)
            .map_err(|e| RiskError::InvalidData(e.to_string()))?;
        Ok(Self::new(values))
    }

    pub fn rows(&self) -> usize {
        self.values.nrows()
    }

    pub fn width(&self) -> usize {
        self.values.ncols()
    }

    pub fn is_empty(&self) -> bool {
        self.rows() == 0
    }

    pub fn view(&self) -> ArrayView2<'_, f64> {
        self.values.view()
    }

    pub fn row(&self, index: usize) -> ArrayView1<'_, f64> {
        self.values.row(index)
    }

    pub fn column(&self, index: usize) -> ArrayView1<'_, f64> {
        self.values.column(index)
    }

    pub fn into_inner(self) -> Array2<f64> {
        self.values
    }

    /// Returns the matrix as row vectors.
    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        self.values
            .axis_iter(Axis(0))
            .map(|row| row.to_vec())
            .collect()
    }
}

/// What [`reconcile_width`] did to the incoming matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidthAdjustment {
    Unchanged,
    /// Columns past `to` were dropped.
    Truncated { from: usize, to: usize },
    /// Zero columns were appended up to `to`.
    Padded { from: usize, to: usize },
}

impl WidthAdjustment {
    pub fn is_unchanged(&self) -> bool {
        matches!(self, Self::Unchanged)
    }
}

/// Aligns `matrix` to `expected_width` columns.
///
/// Wider matrices keep their first `expected_width` columns; narrower ones are
/// right-padded with zeros. Row count and order never change, and a matrix that
/// already has the expected width is returned untouched.
pub fn reconcile_width(matrix: FeatureMatrix, expected_width: usize) -> (FeatureMatrix, WidthAdjustment) {
    let width = matrix.width();
    if width == expected_width {
        return (matrix, WidthAdjustment::Unchanged);
    }

    if width > expected_width {
        let truncated = matrix.values.slice(s![.., ..expected_width]).to_owned();
        return (
            FeatureMatrix::new(truncated),
            WidthAdjustment::Truncated {
                from: width,
                to: expected_width,
            },
        );
    }

    let mut padded = Array2::zeros((matrix.rows(), expected_width));
    padded.slice_mut(s![.., ..width]).assign(&matrix.values);
    (
        FeatureMatrix::new(padded),
        WidthAdjustment::Padded {
            from: width,
            to: expected_width,
        },
    )
}

/// Adapts incoming matrices to a model's fixed feature width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DimensionReconciler {
    expected_width: usize,
}

impl DimensionReconciler {
    /// Creates a reconciler for `expected_width` columns.
    ///
    /// # Errors
    ///
    /// A width of zero is a configuration error.
    pub fn new(expected_width: usize) -> Result<Self> {
        if expected_width == 0 {
            return Err(RiskError::configuration(
                "expected feature width must be at least 1",
            ));
        }
        Ok(Self { expected_width })
    }

    pub fn expected_width(&self) -> usize {
        self.expected_width
    }

    /// Reconciles `matrix`, reporting any padding or truncation as a warning.
    pub fn reconcile(&self, matrix: FeatureMatrix, sink: &dyn LogSink) -> FeatureMatrix {
        let (reconciled, adjustment) = reconcile_width(matrix, self.expected_width);
        match adjustment {
            WidthAdjustment::Unchanged => {}
            WidthAdjustment::Truncated { from, to } => sink.warn(&format!(
                "feature width mismatch: expected {to}, got {from}; truncating to the first {to} columns"
            )),
            WidthAdjustment::Padded { from, to } => sink.warn(&format!(
                "feature width mismatch: expected {to}, got {from}; padding with {} zero columns",
                to - from
            )),
        }
        reconciled
    }
}
