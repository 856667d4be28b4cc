//! Free-form call parameters with typed accessors.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, RiskError};

/// Parameter carrying the row-count trigger of the volume check.
pub const THRESHOLD: &str = "threshold";
/// Parameter naming the edge source column of the graph family.
pub const SOURCE_COLUMN: &str = "source_column";
/// Parameter naming the edge target column of the graph family.
pub const TARGET_COLUMN: &str = "target_column";

/// String → value mapping handed to a plugin call. Keys are unique.
///
/// Accessors return `Ok(None)` for an absent key and a configuration error
/// for a present key with the wrong type, so a typo in a value is never
/// silently replaced by a default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Parameters(BTreeMap<String, Value>);

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds parameters from a JSON object; any other value is rejected.
    pub fn from_json(value: &Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self(
                map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            )),
            Value::Null => Ok(Self::new()),
            other => Err(RiskError::configuration(format!(
                "parameters must be a JSON object, got {other}"
            ))),
        }
    }

    /// Adds or replaces a parameter.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Reads a non-negative integer. Integral floats such as `10000.0` are accepted.
    pub fn get_u64(&self, key: &str) -> Result<Option<u64>> {
        match self.0.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => {
                if let Some(n) = value.as_u64() {
                    return Ok(Some(n));
                }
                match value.as_f64() {
                    Some(f) if f >= 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64 => {
                        Ok(Some(f as u64))
                    }
                    _ => Err(type_error(key, "a non-negative integer", value)),
                }
            }
        }
    }

    pub fn get_f64(&self, key: &str) -> Result<Option<f64>> {
        match self.0.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => value
                .as_f64()
                .map(Some)
                .ok_or_else(|| type_error(key, "a number", value)),
        }
    }

    /// Reads a string. Empty strings count as absent.
    pub fn get_str(&self, key: &str) -> Result<Option<&str>> {
        match self.0.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) if s.is_empty() => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.as_str())),
            Some(value) => Err(type_error(key, "a string", value)),
        }
    }

    pub fn get_bool(&self, key: &str) -> Result<Option<bool>> {
        match self.0.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => value
                .as_bool()
                .map(Some)
                .ok_or_else(|| type_error(key, "a boolean", value)),
        }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Parameters {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

fn type_error(key: &str, expected: &str, found: &Value) -> RiskError {
    RiskError::configuration(format!(
        "parameter '{key}' must be {expected}, got {found}"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_typed_accessors() {
        let params = Parameters::new()
            .with(THRESHOLD, 500)
            .with(SOURCE_COLUMN, "src")
            .with("contamination", 0.2)
            .with("verbose", true);

        assert_eq!(params.get_u64(THRESHOLD).unwrap(), Some(500));
        assert_eq!(params.get_str(SOURCE_COLUMN).unwrap(), Some("src"));
        assert_eq!(params.get_f64("contamination").unwrap(), Some(0.2));
        assert_eq!(params.get_bool("verbose").unwrap(), Some(true));
        assert_eq!(params.get_u64("missing").unwrap(), None);
    }

    #[test]
    fn test_wrong_type_is_configuration_error() {
        let params = Parameters::new().with(THRESHOLD, "lots");
        let err = params.get_u64(THRESHOLD).unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("threshold"));
    }

    #[test]
    fn test_integral_float_threshold_accepted() {
        let params = Parameters::new().with(THRESHOLD, 10000.0);
        assert_eq!(params.get_u64(THRESHOLD).unwrap(), Some(10000));

        let fractional = Parameters::new().with(THRESHOLD, 1.5);
        assert!(fractional.get_u64(THRESHOLD).is_err());
    }

    #[test]
    fn test_empty_string_counts_as_absent() {
        let params = Parameters::new().with(SOURCE_COLUMN, "");
        assert_eq!(params.get_str(SOURCE_COLUMN).unwrap(), None);
    }

    #[test]
    fn test_from_json() {
        let params = Parameters::from_json(&json!({"threshold": 3})).unwrap();
        assert_eq!(params.len(), 1);
        assert!(Parameters::from_json(&Value::Null).unwrap().is_empty());
        assert!(Parameters::from_json(&json!([1])).is_err());
    }
}
