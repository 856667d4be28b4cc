//! Local delimited-file loader.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use datafusion::prelude::{CsvReadOptions, SessionContext};
use tracing::{info, instrument};

use super::{collect_dataset, DataSource};
use crate::core::Dataset;
use crate::error::{Result, RiskError};

/// Reads `file_path/file_name` as a delimited text file.
///
/// Defaults to comma-separated with a header row. Column types are inferred
/// by DataFusion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSource {
    file_path: String,
    file_name: String,
    delimiter: u8,
    has_header: bool,
}

impl FileSource {
    pub fn new(file_path: impl Into<String>, file_name: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
            file_name: file_name.into(),
            delimiter: b',',
            has_header: true,
        }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Sets the delimiter from a one-byte string such as `","` or `"\t"`.
    pub fn with_delimiter_str(self, delimiter: &str) -> Result<Self> {
        match delimiter.as_bytes() {
            [byte] => Ok(self.with_delimiter(*byte)),
            _ => Err(RiskError::configuration(format!(
                "delimiter must be a single byte, got {delimiter:?}"
            ))),
        }
    }

    pub fn with_header(mut self, has_header: bool) -> Self {
        self.has_header = has_header;
        self
    }

    pub fn delimiter(&self) -> u8 {
        self.delimiter
    }

    pub fn has_header(&self) -> bool {
        self.has_header
    }

    pub fn path(&self) -> PathBuf {
        Path::new(&self.file_path).join(&self.file_name)
    }
}

#[async_trait]
impl DataSource for FileSource {
    #[instrument(skip(self, ctx), fields(file = %self.file_name))]
    async fn load(&self, ctx: &SessionContext) -> Result<Dataset> {
        let path = self.path();
        if !path.is_file() {
            return Err(RiskError::data_source(
                "local_csv",
                format!("file not found: {}", path.display()),
            ));
        }
        let location = path.to_str().ok_or_else(|| {
            RiskError::data_source("local_csv", format!("path is not UTF-8: {}", path.display()))
        })?;

        // DataFusion filters by extension, so use the file's own.
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| format!(".{ext}"))
            .unwrap_or_default();
        let options = CsvReadOptions::new()
            .has_header(self.has_header)
            .delimiter(self.delimiter)
            .file_extension(&extension);

        let df = ctx.read_csv(location, options).await.map_err(|e| {
            RiskError::data_source_with_source(
                "local_csv",
                format!("cannot read {}", path.display()),
                Box::new(e),
            )
        })?;
        let dataset = collect_dataset(df).await?;
        info!(rows = dataset.num_rows(), "loaded local file");
        Ok(dataset)
    }

    fn description(&self) -> String {
        format!("local file '{}'", self.path().display())
    }
}
