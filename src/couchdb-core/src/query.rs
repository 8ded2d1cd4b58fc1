//! Query string encoding.
//!
//! CouchDB expects some parameters (key ranges, key lists) as JSON literals,
//! so `startkey="a"` must be sent quoted while `limit=3` stays bare.

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Parameters whose values travel as JSON text
pub const JSON_QUERY_KEYS: &[&str] = &["key", "keys", "startkey", "endkey", "start_key", "end_key"];

/// Query parameters in deterministic (sorted) order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryParams(BTreeMap<String, Value>);

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn to_query_string(&self) -> String {
        build_query_string(self)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for QueryParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = QueryParams::new();
        for (key, value) in iter {
            params.insert(key, value);
        }
        params
    }
}

/// `?a=1&b=x`, or an empty string when there is nothing to encode.
pub fn build_query_string(params: &QueryParams) -> String {
    if params.is_empty() {
        return String::new();
    }

    let pairs: Vec<String> = params
        .iter()
        .map(|(key, value)| {
            let text = if JSON_QUERY_KEYS.contains(&key.as_str()) {
                value.to_string()
            } else {
                plain(value)
            };
            format!("{}={}", urlencoding::encode(key), urlencoding::encode(&text))
        })
        .collect();

    format!("?{}", pairs.join("&"))
}

fn plain(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        // Numbers, booleans and nested values use their JSON text.
        other => other.to_string(),
    }
}
