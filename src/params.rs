use std::fmt;

use serde::{
    de::{MapAccess, Visitor},
    Deserialize, Deserializer,
};

use crate::QueryValue;

/// Ordered query parameter map.
///
/// Keys keep their first insertion position; setting an existing key
/// replaces its value in place.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueryParams(Vec<(String, QueryValue)>);

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds parameters from key/value pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<QueryValue>,
    {
        let mut params = Self::new();
        params.extend(pairs);
        params
    }

    /// Sets one parameter, last write wins.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<QueryValue>) {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(existing, _)| *existing == key) {
            Some(slot) => slot.1 = value,
            None => self.0.push((key, value)),
        }
    }

    /// Merges pairs into the map.
    pub fn extend<I, K, V>(&mut self, pairs: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<QueryValue>,
    {
        for (key, value) in pairs {
            self.set(key, value);
        }
    }

    pub fn get(&self, key: &str) -> Option<&QueryValue> {
        self.0
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value)
    }

    pub fn remove(&mut self, key: &str) -> Option<QueryValue> {
        let idx = self.0.iter().position(|(existing, _)| existing == key)?;
        Some(self.0.remove(idx).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &QueryValue)> {
        self.0.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<(String, QueryValue)>> for QueryParams {
    fn from(pairs: Vec<(String, QueryValue)>) -> Self {
        Self::from_pairs(pairs)
    }
}

impl<K: Into<String>, V: Into<QueryValue>, const N: usize> From<[(K, V); N]> for QueryParams {
    fn from(pairs: [(K, V); N]) -> Self {
        Self::from_pairs(pairs)
    }
}

// Deserializes from a JSON object in document order.
impl<'de> Deserialize<'de> for QueryParams {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ParamsVisitor;

        impl<'de> Visitor<'de> for ParamsVisitor {
            type Value = QueryParams;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of query parameters")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<QueryParams, A::Error> {
                let mut params = QueryParams::new();
                while let Some((key, value)) = map.next_entry::<String, QueryValue>()? {
                    params.set(key, value);
                }
                Ok(params)
            }
        }

        deserializer.deserialize_map(ParamsVisitor)
    }
}
