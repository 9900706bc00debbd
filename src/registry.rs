use crate::error::LookupError;

use std::collections::BTreeMap;

/// Named collection of datasets or potentials
///
/// Iteration follows name order.
#[derive(Clone, Debug)]
pub struct Registry<T> {
    kind: &'static str,
    entries: BTreeMap<String, T>,
}

impl<T> Registry<T> {
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            entries: BTreeMap::new(),
        }
    }

    /// Insert an entry, returning the one it replaced
    pub fn insert(&mut self, name: impl Into<String>, value: T) -> Option<T> {
        self.entries.insert(name.into(), value)
    }

    pub fn with(mut self, name: impl Into<String>, value: T) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Result<&T, LookupError> {
        self.entries.get(name).ok_or_else(|| LookupError {
            kind: self.kind,
            name: name.to_owned(),
        })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
