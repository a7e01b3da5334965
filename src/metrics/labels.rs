use serde::Serialize;
use std::collections::BTreeMap;

/// The label values which identify one series within a metric family.
///
/// Two label sets are equal iff they hold the same (name, value) pairs,
/// independent of insertion order.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct LabelSet(BTreeMap<String, String>);

impl LabelSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a label, returning the previous value for the name if present.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(name.into(), value.into())
    }

    #[allow(dead_code)]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    #[allow(dead_code)]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Compares the label names against an expected schema. Returns the
    /// missing and unexpected names, both empty when the schema matches.
    pub(crate) fn diff(&self, expected: &[&str]) -> (Vec<String>, Vec<String>) {
        let missing = expected
            .iter()
            .filter(|name| !self.0.contains_key(**name))
            .map(|name| name.to_string())
            .collect();

        let unexpected = self
            .0
            .keys()
            .filter(|name| !expected.contains(&name.as_str()))
            .cloned()
            .collect();

        (missing, unexpected)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for LabelSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}
