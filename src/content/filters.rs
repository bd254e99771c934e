//! Label filters carried in client query parameters.
//!
//! A filter is written `key:value`. Query params carry either a single
//! filter string or a list of them.

use thiserror::Error;

use crate::module::LabelSet;
use crate::state::Filter;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    #[error("filter {0:?} is not in key:value form")]
    Malformed(String),

    #[error("filters must be a string or a list of strings, got {0}")]
    UnsupportedType(&'static str),
}

fn parse_filter(raw: &str) -> Result<Filter, FilterError> {
    match raw.split_once(':') {
        Some((key, value)) if !key.is_empty() => Ok(Filter::new(key, value)),
        _ => Err(FilterError::Malformed(raw.to_string())),
    }
}

fn json_type(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

/// Parse the `filters` query param value into an ordered filter list.
pub fn filters_from_query_params(value: &serde_json::Value) -> Result<Vec<Filter>, FilterError> {
    match value {
        serde_json::Value::String(raw) => Ok(vec![parse_filter(raw)?]),
        serde_json::Value::Array(items) => items
            .iter()
            .map(|item| match item {
                serde_json::Value::String(raw) => parse_filter(raw),
                other => Err(FilterError::UnsupportedType(json_type(other))),
            })
            .collect(),
        other => Err(FilterError::UnsupportedType(json_type(other))),
    }
}

/// Translate filters into the label set handed to modules. Later filters
/// win on duplicate keys.
pub fn filters_to_label_set(filters: &[Filter]) -> LabelSet {
    filters
        .iter()
        .map(|f| (f.key.clone(), f.value.clone()))
        .collect()
}
