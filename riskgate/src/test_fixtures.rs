//! Shared fixtures for plugin, source and runner tests.
//!
//! Available to this crate's unit tests and, with the `test-utils` feature, to
//! integration tests and downstream crates.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{Float64Array, Int64Array, RecordBatch, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use datafusion::datasource::MemTable;
use datafusion::prelude::SessionContext;

use crate::core::Dataset;
use crate::error::Result;

/// Identity of the single outlier row in [`auth_events_batch`].
pub const OUTLIER_ID: &str = "mallory";

/// Authentication activity: `normal_rows` regular users plus [`OUTLIER_ID`]
/// as the last row.
///
/// Columns: `entity_id` (Utf8), `logins` (Int64), `failures` (Int64),
/// `bytes` (Float64, nullable, null for every seventh user).
pub fn auth_events_batch(normal_rows: usize) -> RecordBatch {
    let schema = Arc::new(Schema::new(vec![
        Field::new("entity_id", DataType::Utf8, false),
        Field::new("logins", DataType::Int64, false),
        Field::new("failures", DataType::Int64, false),
        Field::new("bytes", DataType::Float64, true),
    ]));

    let mut ids: Vec<String> = (0..normal_rows).map(|i| format!("user_{i:03}")).collect();
    let mut logins: Vec<i64> = (0..normal_rows).map(|i| 8 + (i % 5) as i64).collect();
    let mut failures: Vec<i64> = (0..normal_rows).map(|i| (i % 3) as i64).collect();
    let mut bytes: Vec<Option<f64>> = (0..normal_rows)
        .map(|i| (i % 7 != 6).then(|| 1_000.0 + (i % 11) as f64 * 25.0))
        .collect();

    ids.push(OUTLIER_ID.to_string());
    logins.push(450);
    failures.push(120);
    bytes.push(Some(2_500_000.0));

    #[allow(clippy::expect_used)]
    let batch = RecordBatch::try_new(
        schema,
        vec![
            Arc::new(StringArray::from(ids)),
            Arc::new(Int64Array::from(logins)),
            Arc::new(Int64Array::from(failures)),
            Arc::new(Float64Array::from(bytes)),
        ],
    )
    .expect("fixture columns match the fixture schema");
    batch
}

/// [`auth_events_batch`] as a dataset.
pub fn auth_events(normal_rows: usize) -> Dataset {
    Dataset::new(auth_events_batch(normal_rows))
}

/// An edge list: `hub` connected to `leaves` leaves, plus a short chain
/// `a - b - c` that is disconnected from the star.
pub fn star_edges_batch(leaves: usize) -> RecordBatch {
    let schema = Arc::new(Schema::new(vec![
        Field::new("source", DataType::Utf8, false),
        Field::new("target", DataType::Utf8, false),
    ]));

    let mut sources: Vec<String> = vec!["hub".to_string(); leaves];
    let mut targets: Vec<String> = (0..leaves).map(|i| format!("leaf_{i}")).collect();
    sources.extend(["a".to_string(), "b".to_string()]);
    targets.extend(["b".to_string(), "c".to_string()]);

    #[allow(clippy::expect_used)]
    let batch = RecordBatch::try_new(
        schema,
        vec![
            Arc::new(StringArray::from(sources)),
            Arc::new(StringArray::from(targets)),
        ],
    )
    .expect("fixture columns match the fixture schema");
    batch
}

/// A session with two monthly `auth_events_*` tables sharing one schema and
/// a `network_edges` table.
///
/// `auth_events_2024_01` holds 30 regular users plus the outlier;
/// `auth_events_2024_02` holds 20 regular users plus the outlier.
pub async fn session_with_tables() -> Result<SessionContext> {
    let ctx = SessionContext::new();

    for (name, rows) in [("auth_events_2024_01", 30), ("auth_events_2024_02", 20)] {
        let batch = auth_events_batch(rows);
        let table = MemTable::try_new(batch.schema(), vec![vec![batch]])?;
        ctx.register_table(name, Arc::new(table))?;
    }

    let edges = star_edges_batch(12);
    let table = MemTable::try_new(edges.schema(), vec![vec![edges]])?;
    ctx.register_table("network_edges", Arc::new(table))?;

    Ok(ctx)
}

/// Writes `contents` to `dir/name` and returns the full path.
pub fn write_file(dir: &Path, name: &str, contents: &str) -> Result<PathBuf> {
    let path = dir.join(name);
    std::fs::write(&path, contents)?;
    Ok(path)
}

/// CSV text for [`auth_events_batch`] with a header row, `bytes` left empty
/// where the batch holds a null.
pub fn auth_events_csv(normal_rows: usize, delimiter: char) -> String {
    let batch = auth_events_batch(normal_rows);
    let columns = [
        "entity_id".to_string(),
        "logins".to_string(),
        "failures".to_string(),
        "bytes".to_string(),
    ];
    let mut lines = vec![columns.join(&delimiter.to_string())];
    let dataset = Dataset::new(batch);
    let cells: Vec<Vec<Option<String>>> = (0..columns.len())
        .map(|i| dataset.column_at_as_strings(i).unwrap_or_default())
        .collect();
    for row in 0..dataset.num_rows() {
        let line: Vec<String> = cells
            .iter()
            .map(|column| column[row].clone().unwrap_or_default())
            .collect();
        lines.push(line.join(&delimiter.to_string()));
    }
    lines.join("\n") + "\n"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_events_shape() {
        let dataset = auth_events(30);
        assert_eq!(dataset.num_rows(), 31);
        assert_eq!(dataset.numeric_columns(), vec!["logins", "failures", "bytes"]);
    }

    #[test]
    fn test_csv_rendering() {
        let csv = auth_events_csv(7, ',');
        let lines: Vec<_> = csv.lines().collect();
        assert_eq!(lines[0], "entity_id,logins,failures,bytes");
        assert_eq!(lines.len(), 9);
        assert_eq!(lines[7], "user_006,9,0,");
        assert!(lines[8].starts_with("mallory,450,120,"));
    }

    #[tokio::test]
    async fn test_session_tables() {
        let ctx = session_with_tables().await.unwrap();
        assert!(ctx.table_exist("network_edges").unwrap());
        assert!(ctx.table_exist("auth_events_2024_02").unwrap());
    }
}
