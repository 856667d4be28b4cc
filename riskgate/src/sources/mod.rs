//! Data loaders that turn an external source into a [`Dataset`].
//!
//! Loading is the only asynchronous step of a run: a source is read through a
//! DataFusion [`SessionContext`] before the [`ExecutionContext`] is built, and
//! plugins only ever see the materialized dataset.
//!
//! Three loaders are provided:
//!
//! - [`TableSource`]: a table registered in the session.
//! - [`IndexSource`]: the union of registered tables whose names match a glob,
//!   filtered by a query.
//! - [`FileSource`]: a local delimited file.
//!
//! [`SourceDescriptor::from_legacy`] picks a loader from a legacy input object.
//!
//! [`ExecutionContext`]: crate::core::ExecutionContext

use std::fmt::Debug;

use async_trait::async_trait;
use datafusion::prelude::{DataFrame, SessionContext};
use serde_json::{Map, Value};

use crate::core::Dataset;
use crate::error::{Result, RiskError};

mod file;
mod index;
mod table;

pub use file::FileSource;
pub use index::{IndexQuery, IndexSource, DEFAULT_INDEX_PATTERN};
pub use table::TableSource;

/// A source that can be materialized into a [`Dataset`].
///
/// # Examples
///
/// ```rust,no_run
/// use datafusion::prelude::SessionContext;
/// use riskgate::sources::{DataSource, FileSource};
///
/// # async fn example() -> riskgate::error::Result<()> {
/// let source = FileSource::new("/var/data", "auth.csv");
/// let dataset = source.load(&SessionContext::new()).await?;
/// println!("{} rows", dataset.num_rows());
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait DataSource: Debug + Send + Sync {
    /// Reads the source in full.
    async fn load(&self, ctx: &SessionContext) -> Result<Dataset>;

    /// Human-readable description for logs.
    fn description(&self) -> String;
}

/// Collects a DataFrame into one dataset.
pub(crate) async fn collect_dataset(df: DataFrame) -> Result<Dataset> {
    let declared = df.schema().inner().clone();
    let batches = df.collect().await?;
    let schema = batches
        .first()
        .map(|batch| batch.schema())
        .unwrap_or(declared);
    Dataset::from_batches(schema, &batches)
}

/// A loader chosen from a legacy input object.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceDescriptor {
    Table(TableSource),
    Index(IndexSource),
    File(FileSource),
}

impl SourceDescriptor {
    /// Parses the data-source fields of a legacy input object.
    ///
    /// The kind comes from `data_source`, then `type`, and defaults to a
    /// registered table. Accepted kinds:
    ///
    /// | kind                       | fields                                                   |
    /// |----------------------------|----------------------------------------------------------|
    /// | `table`, `spark`           | `table_name`                                             |
    /// | `index`, `elasticsearch`   | `index_name` or `index` (default `*`), `query`           |
    /// | `local_csv`, `file`        | `file_path`, `file_name`, `sep` (default `,`), `header`  |
    ///
    /// # Errors
    ///
    /// A missing identifier or an unknown kind is a configuration error. No
    /// data is touched.
    pub fn from_legacy(input: &Value) -> Result<Self> {
        let empty = Map::new();
        let fields = match input {
            Value::Object(fields) => fields,
            Value::Null => &empty,
            other => {
                return Err(RiskError::configuration(format!(
                    "legacy input must be a JSON object, got {other}"
                )))
            }
        };
        let text = |key: &str| string_field(fields, key);

        let kind = match text("data_source")? {
            Some(kind) => kind,
            None => text("type")?.unwrap_or("table"),
        };

        match kind {
            "table" | "spark" => {
                let table_name = text("table_name")?.ok_or_else(|| {
                    RiskError::configuration("table_name required for table data source")
                })?;
                Ok(Self::Table(TableSource::new(table_name)?))
            }
            "index" | "elasticsearch" => {
                let pattern = match text("index_name")? {
                    Some(name) => name,
                    None => text("index")?.unwrap_or(DEFAULT_INDEX_PATTERN),
                };
                let query = match fields.get("query") {
                    None | Some(Value::Null) => IndexQuery::MatchAll,
                    Some(query) => IndexQuery::from_json(query)?,
                };
                Ok(Self::Index(IndexSource::new(pattern)?.with_query(query)))
            }
            "local_csv" | "file" => {
                let (Some(file_path), Some(file_name)) = (text("file_path")?, text("file_name")?)
                else {
                    return Err(RiskError::configuration(
                        "file_path and file_name required for local_csv data source",
                    ));
                };
                let mut source = FileSource::new(file_path, file_name);
                if let Some(sep) = text("sep")? {
                    source = source.with_delimiter_str(sep)?;
                }
                match fields.get("header") {
                    None => {}
                    Some(Value::Bool(has_header)) => source = source.with_header(*has_header),
                    // a header row index, or null for no header
                    Some(Value::Number(_)) => source = source.with_header(true),
                    Some(Value::Null) => source = source.with_header(false),
                    Some(other) => {
                        return Err(RiskError::configuration(format!(
                            "'header' must be a boolean, got {other}"
                        )))
                    }
                }
                Ok(Self::File(source))
            }
            other => Err(RiskError::configuration(format!(
                "unknown data source '{other}'; expected table, index or local_csv"
            ))),
        }
    }

    /// Short name of the loader kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Table(_) => "table",
            Self::Index(_) => "index",
            Self::File(_) => "local_csv",
        }
    }
}

fn string_field<'a>(fields: &'a Map<String, Value>, key: &str) -> Result<Option<&'a str>> {
    match fields.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(other) => Err(RiskError::configuration(format!(
            "'{key}' must be a string, got {other}"
        ))),
    }
}

#[async_trait]
impl DataSource for SourceDescriptor {
    async fn load(&self, ctx: &SessionContext) -> Result<Dataset> {
        match self {
            Self::Table(source) => source.load(ctx).await,
            Self::Index(source) => source.load(ctx).await,
            Self::File(source) => source.load(ctx).await,
        }
    }

    fn description(&self) -> String {
        match self {
            Self::Table(source) => source.description(),
            Self::Index(source) => source.description(),
            Self::File(source) => source.description(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_to_table() {
        let descriptor = SourceDescriptor::from_legacy(&json!({"table_name": "auth_events"})).unwrap();
        assert_eq!(descriptor, SourceDescriptor::Table(TableSource::new("auth_events").unwrap()));
        assert_eq!(descriptor.kind(), "table");
    }

    #[test]
    fn test_legacy_aliases() {
        let spark = SourceDescriptor::from_legacy(&json!({"type": "spark", "table_name": "t"})).unwrap();
        assert_eq!(spark.kind(), "table");

        let es = SourceDescriptor::from_legacy(&json!({"data_source": "elasticsearch"})).unwrap();
        let SourceDescriptor::Index(index) = es else {
            panic!("expected an index source");
        };
        assert_eq!(index.pattern(), "*");
        assert_eq!(index.query(), &IndexQuery::MatchAll);
    }

    #[test]
    fn test_data_source_wins_over_type() {
        let descriptor = SourceDescriptor::from_legacy(&json!({
            "data_source": "index",
            "type": "table",
            "index_name": "logs_*",
            "query": {"term": {"user_id": "alice"}}
        }))
        .unwrap();
        let SourceDescriptor::Index(index) = descriptor else {
            panic!("expected an index source");
        };
        assert_eq!(index.pattern(), "logs_*");
        assert_eq!(
            index.query(),
            &IndexQuery::Term {
                field: "user_id".to_string(),
                value: json!("alice")
            }
        );
    }

    #[test]
    fn test_missing_identifiers_fail_fast() {
        for input in [
            json!({}),
            json!(null),
            json!({"data_source": "table"}),
            json!({"data_source": "local_csv", "file_path": "/tmp"}),
        ] {
            let err = SourceDescriptor::from_legacy(&input).unwrap_err();
            assert!(err.is_configuration(), "{input}: {err}");
        }
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let err = SourceDescriptor::from_legacy(&json!({"data_source": "kafka"})).unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("kafka"));
    }

    #[test]
    fn test_file_options() {
        let descriptor = SourceDescriptor::from_legacy(&json!({
            "data_source": "local_csv",
            "file_path": "/data",
            "file_name": "bro.log",
            "sep": "\t",
            "header": false
        }))
        .unwrap();
        let SourceDescriptor::File(file) = descriptor else {
            panic!("expected a file source");
        };
        assert_eq!(file.delimiter(), b'\t');
        assert!(!file.has_header());
        assert!(file.description().contains("bro.log"));
    }

    #[test]
    fn test_unsafe_table_name_rejected() {
        let err = SourceDescriptor::from_legacy(&json!({"table_name": "t; DROP TABLE x"})).unwrap_err();
        assert!(err.is_configuration());
    }
}
