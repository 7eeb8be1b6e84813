//! Ordered create/add options.
//!
//! ipset takes trailing options as `key value` pairs (`timeout 300`,
//! `hashsize 1024`) and a few bare keywords (`counters`, `nomatch`).
//! [`SetOptions`] keeps them in insertion order and guarantees every key is
//! serialized with its value.

use std::fmt::Display;

use crate::error::{IpsetError, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SetOptions {
    entries: Vec<(String, Option<String>)>,
}

impl SetOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key` to `value`. Re-setting a key replaces its value in place.
    pub fn set(mut self, key: impl Into<String>, value: impl Display) -> Self {
        self.insert(key.into(), Some(value.to_string()));
        self
    }

    /// Add a bare keyword such as `counters` or `comment`.
    pub fn flag(mut self, key: impl Into<String>) -> Self {
        self.insert(key.into(), None);
        self
    }

    /// Build from flat `key value key value ...` tokens.
    ///
    /// An odd token count or an empty key is rejected before anything
    /// reaches the binary.
    pub fn from_pairs<I, S>(tokens: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tokens: Vec<String> = tokens.into_iter().map(Into::into).collect();
        if tokens.len() % 2 != 0 {
            return Err(IpsetError::InvalidOptions(format!(
                "expected key/value pairs, got {} tokens ({})",
                tokens.len(),
                tokens.join(" ")
            )));
        }

        let mut options = Self::new();
        let mut iter = tokens.into_iter();
        while let (Some(key), Some(value)) = (iter.next(), iter.next()) {
            if key.trim().is_empty() {
                return Err(IpsetError::InvalidOptions(format!(
                    "empty option name for value '{}'",
                    value
                )));
            }
            options.insert(key, Some(value));
        }
        Ok(options)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .and_then(|(_, v)| v.as_deref())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serialize to argv tokens in insertion order.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::with_capacity(self.entries.len() * 2);
        for (key, value) in &self.entries {
            args.push(key.clone());
            if let Some(value) = value {
                args.push(value.clone());
            }
        }
        args
    }

    fn insert(&mut self, key: String, value: Option<String>) {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((key, value)),
        }
    }
}
