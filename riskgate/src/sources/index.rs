//! Search-index loader over registered tables.
//!
//! An index pattern selects every table of the session's default schema whose
//! name matches the glob. The matching tables are unioned and filtered by an
//! [`IndexQuery`], which accepts the `match_all`, `term` and `range` shapes of
//! a search query body.

use async_trait::async_trait;
use datafusion::logical_expr::Expr;
use datafusion::prelude::{ident, lit, SessionContext};
use glob::Pattern;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use super::{collect_dataset, DataSource};
use crate::core::Dataset;
use crate::error::{Result, RiskError};
use crate::security::SqlSecurity;

/// Pattern used when the input names no index.
pub const DEFAULT_INDEX_PATTERN: &str = "*";

/// Row filter applied to the unioned tables.
#[derive(Debug, Clone, PartialEq)]
pub enum IndexQuery {
    /// Every row.
    MatchAll,
    /// Rows where `field` equals `value`.
    Term { field: String, value: Value },
    /// Rows where `field` lies within the given bounds.
    Range {
        field: String,
        gte: Option<Value>,
        gt: Option<Value>,
        lte: Option<Value>,
        lt: Option<Value>,
    },
}

impl IndexQuery {
    /// Parses `{"match_all": {}}`, `{"term": {field: value}}` or
    /// `{"range": {field: {"gte": .., "lte": ..}}}`.
    ///
    /// A term value may also be wrapped as `{"value": ..}`.
    pub fn from_json(query: &Value) -> Result<Self> {
        let Some((kind, body)) = query.as_object().and_then(single_entry) else {
            return Err(RiskError::configuration(format!(
                "index query must be an object with exactly one clause, got {query}"
            )));
        };

        match kind.as_str() {
            "match_all" => Ok(Self::MatchAll),
            "term" => {
                let (field, value) = body.as_object().and_then(single_entry).ok_or_else(|| {
                    RiskError::configuration("term query must name exactly one field")
                })?;
                let value = match value {
                    Value::Object(wrapped) => wrapped.get("value").cloned().ok_or_else(|| {
                        RiskError::configuration(format!("term query on '{field}' has no value"))
                    })?,
                    other => other.clone(),
                };
                SqlSecurity::validate_identifier(field)?;
                Ok(Self::Term {
                    field: field.clone(),
                    value,
                })
            }
            "range" => {
                let (field, bounds) = body.as_object().and_then(single_entry).ok_or_else(|| {
                    RiskError::configuration("range query must name exactly one field")
                })?;
                let bounds = bounds.as_object().ok_or_else(|| {
                    RiskError::configuration(format!("range query on '{field}' needs bounds"))
                })?;
                SqlSecurity::validate_identifier(field)?;
                let bound = |key: &str| bounds.get(key).filter(|v| !v.is_null()).cloned();
                let (gte, gt, lte, lt) = (bound("gte"), bound("gt"), bound("lte"), bound("lt"));
                if gte.is_none() && gt.is_none() && lte.is_none() && lt.is_none() {
                    return Err(RiskError::configuration(format!(
                        "range query on '{field}' has no gte/gt/lte/lt bound"
                    )));
                }
                Ok(Self::Range {
                    field: field.clone(),
                    gte,
                    gt,
                    lte,
                    lt,
                })
            }
            other => Err(RiskError::configuration(format!(
                "unsupported index query '{other}'; expected match_all, term or range"
            ))),
        }
    }

    /// The filter expression, or `None` for [`IndexQuery::MatchAll`].
    pub fn to_expr(&self) -> Result<Option<Expr>> {
        match self {
            Self::MatchAll => Ok(None),
            Self::Term { field, value } => Ok(Some(ident(field).eq(literal(value)?))),
            Self::Range {
                field,
                gte,
                gt,
                lte,
                lt,
            } => {
                let column = || ident(field);
                let mut predicates = Vec::new();
                if let Some(v) = gte {
                    predicates.push(column().gt_eq(literal(v)?));
                }
                if let Some(v) = gt {
                    predicates.push(column().gt(literal(v)?));
                }
                if let Some(v) = lte {
                    predicates.push(column().lt_eq(literal(v)?));
                }
                if let Some(v) = lt {
                    predicates.push(column().lt(literal(v)?));
                }
                Ok(predicates.into_iter().reduce(Expr::and))
            }
        }
    }
}

fn single_entry(map: &serde_json::Map<String, Value>) -> Option<(&String, &Value)> {
    if map.len() == 1 {
        map.iter().next()
    } else {
        None
    }
}

fn literal(value: &Value) -> Result<Expr> {
    match value {
        Value::String(s) => Ok(lit(s.clone())),
        Value::Bool(b) => Ok(lit(*b)),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(lit(i))
            } else if let Some(u) = n.as_u64() {
                Ok(lit(u))
            } else {
                n.as_f64().map(lit).ok_or_else(|| {
                    RiskError::configuration(format!("unsupported query number {n}"))
                })
            }
        }
        other => Err(RiskError::configuration(format!(
            "query values must be scalars, got {other}"
        ))),
    }
}

/// Reads the union of registered tables matching an index pattern.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexSource {
    pattern: String,
    query: IndexQuery,
}

impl IndexSource {
    /// # Errors
    ///
    /// Fails when `pattern` is not a valid index glob.
    pub fn new(pattern: impl Into<String>) -> Result<Self> {
        let pattern = pattern.into();
        SqlSecurity::validate_index_pattern(&pattern)?;
        Ok(Self {
            pattern,
            query: IndexQuery::MatchAll,
        })
    }

    pub fn with_query(mut self, query: IndexQuery) -> Self {
        self.query = query;
        self
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn query(&self) -> &IndexQuery {
        &self.query
    }

    /// Registered tables of the default schema matching the pattern, sorted.
    pub fn matching_tables(&self, ctx: &SessionContext) -> Result<Vec<String>> {
        let glob = Pattern::new(&self.pattern).map_err(|e| {
            RiskError::configuration(format!("invalid index pattern '{}': {e}", self.pattern))
        })?;

        let state = ctx.state();
        let options = &state.config_options().catalog;
        let schema = ctx
            .catalog(&options.default_catalog)
            .and_then(|catalog| catalog.schema(&options.default_schema))
            .ok_or_else(|| {
                RiskError::data_source("index", "session has no default schema")
            })?;

        let mut tables: Vec<String> = schema
            .table_names()
            .into_iter()
            .filter(|name| glob.matches(name))
            .collect();
        tables.sort();
        Ok(tables)
    }
}

#[async_trait]
impl DataSource for IndexSource {
    #[instrument(skip(self, ctx), fields(index = %self.pattern))]
    async fn load(&self, ctx: &SessionContext) -> Result<Dataset> {
        let tables = self.matching_tables(ctx)?;
        if tables.is_empty() {
            warn!("no registered table matches the index pattern");
            return Ok(Dataset::empty());
        }
        debug!(?tables, "matched tables");

        let mut frames = Vec::with_capacity(tables.len());
        for table in &tables {
            frames.push(ctx.table(table.as_str()).await?);
        }
        let mut frames = frames.into_iter();
        let Some(mut df) = frames.next() else {
            return Ok(Dataset::empty());
        };
        for other in frames {
            df = df.union(other).map_err(|e| {
                RiskError::data_source_with_source(
                    "index",
                    "tables matching the index pattern do not share a schema",
                    Box::new(e),
                )
            })?;
        }
        if let Some(filter) = self.query.to_expr()? {
            df = df.filter(filter)?;
        }

        let dataset = collect_dataset(df).await?;
        info!(tables = tables.len(), rows = dataset.num_rows(), "loaded index");
        Ok(dataset)
    }

    fn description(&self) -> String {
        format!("index '{}'", self.pattern)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_queries() {
        assert_eq!(IndexQuery::from_json(&json!({"match_all": {}})).unwrap(), IndexQuery::MatchAll);
        assert_eq!(
            IndexQuery::from_json(&json!({"term": {"status": {"value": 500}}})).unwrap(),
            IndexQuery::Term {
                field: "status".to_string(),
                value: json!(500)
            }
        );
        let range = IndexQuery::from_json(&json!({"range": {"bytes": {"gte": 10, "lt": 20.5}}})).unwrap();
        assert_eq!(
            range,
            IndexQuery::Range {
                field: "bytes".to_string(),
                gte: Some(json!(10)),
                gt: None,
                lte: None,
                lt: Some(json!(20.5)),
            }
        );
        assert!(range.to_expr().unwrap().is_some());
        assert!(IndexQuery::MatchAll.to_expr().unwrap().is_none());
    }

    #[test]
    fn test_rejected_queries() {
        for query in [
            json!({"bool": {}}),
            json!({"term": {}}),
            json!({"range": {"bytes": {}}}),
            json!({"term": {"a; drop": 1}}),
            json!({"match_all": {}, "term": {"a": 1}}),
            json!("match_all"),
        ] {
            let err = IndexQuery::from_json(&query).unwrap_err();
            assert!(err.is_configuration(), "{query}: {err}");
        }
    }

    #[test]
    fn test_pattern_validation() {
        assert!(IndexSource::new("logs-*").is_ok());
        assert!(IndexSource::new("").is_err());
        assert!(IndexSource::new("logs/*").is_err());
    }
}
