//! Tabular input data backed by an Arrow record batch.

use std::sync::Arc;

use arrow::array::{Array, ArrayRef, AsArray, RecordBatch};
use arrow::compute::{cast, concat_batches};
use arrow::datatypes::{DataType, Float64Type, Schema, SchemaRef};
use arrow::json::reader::{infer_json_schema_from_iterator, ReaderBuilder};
use arrow::util::display::array_value_to_string;
use ndarray::Array2;
use serde_json::Value;

use super::matrix::FeatureMatrix;
use crate::error::{Result, RiskError};

/// Rows × named, typed columns.
///
/// Column types may be mixed. Numeric columns are identified by their Arrow
/// type, never by name.
#[derive(Debug, Clone)]
pub struct Dataset {
    batch: RecordBatch,
}

impl Dataset {
    pub fn new(batch: RecordBatch) -> Self {
        Self { batch }
    }

    /// Concatenates `batches` that share `schema` into one dataset.
    pub fn from_batches(schema: SchemaRef, batches: &[RecordBatch]) -> Result<Self> {
        let batch = concat_batches(&schema, batches)?;
        Ok(Self::new(batch))
    }

    /// A dataset with no columns and no rows.
    pub fn empty() -> Self {
        Self::new(RecordBatch::new_empty(Arc::new(Schema::empty())))
    }

    /// Builds a dataset from JSON row objects, inferring the schema.
    ///
    /// Integers become `Int64`, mixed integer/float columns become `Float64`,
    /// and columns mixing strings with other scalars become `Utf8`.
    ///
    /// # Errors
    ///
    /// Returns [`RiskError::InvalidData`] when a row is not a JSON object.
    pub fn from_json_rows(rows: &[Value]) -> Result<Self> {
        if rows.is_empty() {
            return Ok(Self::empty());
        }
        if let Some(index) = rows.iter().position(|row| !row.is_object()) {
            return Err(RiskError::InvalidData(format!(
                "row {index} is not a JSON object"
            )));
        }

        let schema = Arc::new(infer_json_schema_from_iterator(rows.iter().map(Ok))?);
        let mut decoder = ReaderBuilder::new(schema.clone())
            .with_coerce_primitive(true)
            .build_decoder()?;
        decoder.serialize(rows)?;
        match decoder.flush()? {
            Some(batch) => Ok(Self::new(batch)),
            None => Ok(Self::new(RecordBatch::new_empty(schema))),
        }
    }

    pub fn batch(&self) -> &RecordBatch {
        &self.batch
    }

    pub fn schema(&self) -> SchemaRef {
        self.batch.schema()
    }

    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    pub fn num_columns(&self) -> usize {
        self.batch.num_columns()
    }

    pub fn is_empty(&self) -> bool {
        self.num_rows() == 0
    }

    pub fn column_names(&self) -> Vec<String> {
        self.batch
            .schema()
            .fields()
            .iter()
            .map(|field| field.name().clone())
            .collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.batch.schema().index_of(name).is_ok()
    }

    pub fn column(&self, name: &str) -> Option<&ArrayRef> {
        self.batch.column_by_name(name)
    }

    /// Names of the numeric columns, in declaration order.
    pub fn numeric_columns(&self) -> Vec<String> {
        self.batch
            .schema()
            .fields()
            .iter()
            .filter(|field| is_numeric(field.data_type()))
            .map(|field| field.name().clone())
            .collect()
    }

    /// Builds the feature matrix from the numeric columns.
    ///
    /// Null and non-finite cells become `0.0`.
    pub fn feature_matrix(&self) -> Result<FeatureMatrix> {
        let schema = self.batch.schema();
        let numeric: Vec<usize> = schema
            .fields()
            .iter()
            .enumerate()
            .filter(|(_, field)| is_numeric(field.data_type()))
            .map(|(index, _)| index)
            .collect();

        let mut values = Array2::zeros((self.num_rows(), numeric.len()));
        for (target, source) in numeric.into_iter().enumerate() {
            let column = cast(self.batch.column(source), &DataType::Float64)?;
            let column = column.as_primitive::<Float64Type>();
            for row in 0..column.len() {
                let value = column.value(row);
                if column.is_valid(row) && value.is_finite() {
                    values[[row, target]] = value;
                }
            }
        }
        Ok(FeatureMatrix::new(values))
    }

    /// Renders column `name` as display strings; nulls are `None`.
    ///
    /// Returns `Ok(None)` when the column does not exist.
    pub fn column_as_strings(&self, name: &str) -> Result<Option<Vec<Option<String>>>> {
        match self.column(name) {
            Some(column) => strings_of(column).map(Some),
            None => Ok(None),
        }
    }

    /// Renders the column at `index` as display strings; nulls are `None`.
    pub fn column_at_as_strings(&self, index: usize) -> Result<Vec<Option<String>>> {
        if index >= self.num_columns() {
            return Err(RiskError::InvalidData(format!(
                "column index {index} out of range ({} columns)",
                self.num_columns()
            )));
        }
        strings_of(self.batch.column(index))
    }
}

impl From<RecordBatch> for Dataset {
    fn from(batch: RecordBatch) -> Self {
        Self::new(batch)
    }
}

fn is_numeric(data_type: &DataType) -> bool {
    data_type.is_numeric()
}

fn strings_of(column: &ArrayRef) -> Result<Vec<Option<String>>> {
    // logical nulls also cover `Null`-typed columns
    let nulls = column.logical_nulls();
    (0..column.len())
        .map(|row| {
            if nulls.as_ref().is_some_and(|n| n.is_null(row)) {
                Ok(None)
            } else {
                Ok(Some(array_value_to_string(column, row)?))
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{BooleanArray, Float64Array, Int64Array, StringArray};
    use arrow::datatypes::Field;
    use serde_json::json;

    fn mixed_batch() -> RecordBatch {
        let schema = Arc::new(Schema::new(vec![
            Field::new("user_id", DataType::Utf8, false),
            Field::new("logins", DataType::Int64, true),
            Field::new("active", DataType::Boolean, false),
            Field::new("bytes", DataType::Float64, false),
        ]));
        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(StringArray::from(vec!["alice", "bob"])),
                Arc::new(Int64Array::from(vec![Some(3), None])),
                Arc::new(BooleanArray::from(vec![true, false])),
                Arc::new(Float64Array::from(vec![1.5, 2.5])),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_numeric_columns_by_type() {
        let dataset = Dataset::new(mixed_batch());
        assert_eq!(dataset.numeric_columns(), vec!["logins", "bytes"]);
    }

    #[test]
    fn test_feature_matrix_fills_nulls_with_zero() {
        let matrix = Dataset::new(mixed_batch()).feature_matrix().unwrap();
        assert_eq!(matrix.to_rows(), vec![vec![3.0, 1.5], vec![0.0, 2.5]]);
    }

    #[test]
    fn test_from_json_rows_infers_types() {
        let dataset = Dataset::from_json_rows(&[
            json!({"entity_id": "a", "x": 1, "y": 0.5}),
            json!({"entity_id": "b", "x": 2, "y": 1}),
        ])
        .unwrap();

        assert_eq!(dataset.num_rows(), 2);
        assert_eq!(dataset.column_names(), vec!["entity_id", "x", "y"]);
        assert_eq!(dataset.numeric_columns(), vec!["x", "y"]);
        assert_eq!(
            dataset.feature_matrix().unwrap().to_rows(),
            vec![vec![1.0, 0.5], vec![2.0, 1.0]]
        );
    }

    #[test]
    fn test_from_json_rows_rejects_non_objects() {
        let err = Dataset::from_json_rows(&[json!([1, 2])]).unwrap_err();
        assert!(matches!(err, RiskError::InvalidData(_)));
    }

    #[test]
    fn test_empty_rows_give_empty_dataset() {
        let dataset = Dataset::from_json_rows(&[]).unwrap();
        assert!(dataset.is_empty());
        assert_eq!(dataset.num_columns(), 0);
    }

    #[test]
    fn test_column_as_strings_coerces_values() {
        let dataset = Dataset::new(mixed_batch());
        assert_eq!(
            dataset.column_as_strings("logins").unwrap(),
            Some(vec![Some("3".to_string()), None])
        );
        assert_eq!(dataset.column_as_strings("missing").unwrap(), None);
        assert!(dataset.column_at_as_strings(9).is_err());
    }
}
