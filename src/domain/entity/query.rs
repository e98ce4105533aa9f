//! List query filters and aggregate stats.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Filter set of a list query (`status=pending`, `visaType=student`, ...).
///
/// Backed by an ordered map so that two queries with the same filters
/// always produce the same cache key and query string, regardless of the
/// order the filters were added in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryFilters(BTreeMap<String, String>);

impl QueryFilters {
    /// An empty filter set (the unfiltered list).
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a filter.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Canonical, URL-encoded form (`status=pending&visaType=student`).
    ///
    /// Returns `"all"` for the empty filter set.
    pub fn canonical(&self) -> String {
        if self.0.is_empty() {
            return "all".to_string();
        }
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.0.iter())
            .finish()
    }
}

/// Aggregate counters for a dashboard (`total`, `pending`, `approved`, ...).
///
/// Realtime stats updates are partial: merging only overwrites the fields
/// present in the update and never drops existing ones.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatsSnapshot(Map<String, Value>);

impl StatsSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a snapshot from a JSON value; non-objects yield `None`.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    /// Shallow-merges `partial` into this snapshot.
    pub fn merge(&mut self, partial: &Map<String, Value>) {
        for (key, value) in partial {
            self.0.insert(key.clone(), value.clone());
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.0.get(key).and_then(Value::as_i64)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn canonical_form_ignores_insertion_order() {
        let a = QueryFilters::new().with("status", "pending").with("visaType", "student");
        let b = QueryFilters::new().with("visaType", "student").with("status", "pending");

        assert_eq!(a, b);
        assert_eq!(a.canonical(), "status=pending&visaType=student");
    }

    #[test]
    fn canonical_form_of_empty_filters() {
        assert_eq!(QueryFilters::new().canonical(), "all");
    }

    #[test]
    fn canonical_form_escapes_separators() {
        let filters = QueryFilters::new().with("search", "a&b=c");
        assert_eq!(filters.canonical(), "search=a%26b%3Dc");
    }

    #[test]
    fn merge_keeps_fields_missing_from_partial() {
        let mut stats = StatsSnapshot::from_value(json!({"total": 10, "pending": 4})).unwrap();
        let partial = json!({"pending": 3, "approved": 1});

        stats.merge(partial.as_object().unwrap());

        assert_eq!(stats.get_i64("total"), Some(10));
        assert_eq!(stats.get_i64("pending"), Some(3));
        assert_eq!(stats.get_i64("approved"), Some(1));
    }

    #[test]
    fn from_value_rejects_non_objects() {
        assert!(StatsSnapshot::from_value(json!([1, 2])).is_none());
        assert!(StatsSnapshot::from_value(json!(3)).is_none());
    }
}
