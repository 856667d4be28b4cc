//! Registered-table loader.

use async_trait::async_trait;
use datafusion::prelude::SessionContext;
use tracing::{info, instrument};

use super::{collect_dataset, DataSource};
use crate::core::Dataset;
use crate::error::{Result, RiskError};
use crate::security::SqlSecurity;

/// Reads a table already registered in the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSource {
    table_name: String,
}

impl TableSource {
    /// # Errors
    ///
    /// Fails when `table_name` is not a valid SQL identifier.
    pub fn new(table_name: impl Into<String>) -> Result<Self> {
        let table_name = table_name.into();
        SqlSecurity::validate_identifier(&table_name)?;
        Ok(Self { table_name })
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }
}

#[async_trait]
impl DataSource for TableSource {
    #[instrument(skip(self, ctx), fields(table = %self.table_name))]
    async fn load(&self, ctx: &SessionContext) -> Result<Dataset> {
        let df = ctx.table(self.table_name.as_str()).await.map_err(|e| {
            RiskError::data_source_with_source(
                "table",
                format!("cannot read table '{}'", self.table_name),
                Box::new(e),
            )
        })?;
        let dataset = collect_dataset(df).await?;
        info!(rows = dataset.num_rows(), "loaded table");
        Ok(dataset)
    }

    fn description(&self) -> String {
        format!("table '{}'", self.table_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_validation() {
        assert!(TableSource::new("auth_events").is_ok());
        assert!(TableSource::new("warehouse.auth_events").is_ok());
        assert!(TableSource::new("").is_err());
        assert!(TableSource::new("events--").is_err());
    }

    #[tokio::test]
    async fn test_unregistered_table_is_data_source_error() {
        let source = TableSource::new("missing").unwrap();
        let err = source.load(&SessionContext::new()).await.unwrap_err();
        assert!(matches!(err, RiskError::DataSource { .. }));
    }
}
