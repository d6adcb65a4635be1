//! Key/value configuration parameters with dot-separated sections
//!
//! `ConfigParams` is the bag both components are configured with and the shape
//! the cached reader hands back. A key such as `options.retry_timeout` lives in
//! the `options` section; [`ConfigParams::get_section`] strips that prefix.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

const SECTION_SEPARATOR: char = '.';
const ENTRY_SEPARATOR: char = ';';

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigParams {
    values: BTreeMap<String, String>,
}

impl ConfigParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build parameters from `(key, value)` pairs; later pairs win
    pub fn from_tuples<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        pairs.into_iter().collect()
    }

    /// Parse a `key1=value1;key2=value2` string.
    ///
    /// Empty entries are skipped and a key without `=` gets an empty value.
    pub fn parse(line: &str) -> Self {
        line.split(ENTRY_SEPARATOR)
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(|entry| match entry.split_once('=') {
                Some((key, value)) => (key.trim().to_string(), value.trim().to_string()),
                None => (entry.to_string(), String::new()),
            })
            .collect()
    }

    /// Flatten a JSON document into dotted keys.
    ///
    /// Nested objects become sections, array items are keyed by index and
    /// `null` becomes an empty value. A non-object root yields no parameters.
    pub fn from_value(value: &Value) -> Self {
        let mut params = Self::new();
        if let Value::Object(map) = value {
            for (key, child) in map {
                flatten_into(&mut params.values, key.clone(), child);
            }
        }
        params
    }

    /// Collect every setting of a loaded `config::Config` into parameters.
    pub fn from_config(config: &config::Config) -> Result<Self> {
        let value: Value = config.clone().try_deserialize()?;
        Ok(Self::from_value(&value))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn get_as_string(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    /// Integer value of `key`; fractional values are truncated
    pub fn get_as_long(&self, key: &str) -> Option<i64> {
        let raw = self.get(key)?.trim();
        raw.parse::<i64>()
            .ok()
            .or_else(|| raw.parse::<f64>().ok().filter(|v| v.is_finite()).map(|v| v as i64))
    }

    pub fn get_as_long_with_default(&self, key: &str, default: i64) -> i64 {
        self.get_as_long(key).unwrap_or(default)
    }

    pub fn get_as_integer_with_default(&self, key: &str, default: i32) -> i32 {
        self.get_as_long(key)
            .and_then(|v| i32::try_from(v).ok())
            .unwrap_or(default)
    }

    pub fn get_as_bool_with_default(&self, key: &str, default: bool) -> bool {
        match self.get(key).map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("true" | "t" | "yes" | "y" | "1") => true,
            Some("false" | "f" | "no" | "n" | "0") => false,
            _ => default,
        }
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.values.remove(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Parameters under `name.`, with the section prefix removed.
    ///
    /// Returns empty parameters when the section does not exist.
    pub fn get_section(&self, name: &str) -> ConfigParams {
        let prefix = format!("{name}{SECTION_SEPARATOR}");
        self.values
            .range(prefix.clone()..)
            .take_while(|(key, _)| key.starts_with(&prefix))
            .map(|(key, value)| (key[prefix.len()..].to_string(), value.clone()))
            .filter(|(key, _)| !key.is_empty())
            .collect()
    }

    /// Distinct top-level section names, in key order
    pub fn section_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for key in self.values.keys() {
            if let Some((section, _)) = key.split_once(SECTION_SEPARATOR)
                && !section.is_empty()
                && names.last().map(String::as_str) != Some(section)
            {
                names.push(section.to_string());
            }
        }
        names
    }

    /// Store every entry of `section` under `name.`; an empty name merges at the root
    pub fn add_section(&mut self, name: &str, section: &ConfigParams) {
        for (key, value) in section.iter() {
            let full_key = if name.is_empty() {
                key.to_string()
            } else {
                format!("{name}{SECTION_SEPARATOR}{key}")
            };
            self.values.insert(full_key, value.to_string());
        }
    }

    /// Copy of these parameters with every entry of `other` written over them
    pub fn override_with(&self, other: &ConfigParams) -> ConfigParams {
        let mut merged = self.clone();
        merged.add_section("", other);
        merged
    }

    /// Copy of these parameters with `defaults` filling the missing keys
    pub fn set_defaults(&self, defaults: &ConfigParams) -> ConfigParams {
        defaults.override_with(self)
    }
}

fn flatten_into(values: &mut BTreeMap<String, String>, key: String, value: &Value) {
    match value {
        Value::Object(map) => {
            for (child_key, child) in map {
                flatten_into(values, format!("{key}{SECTION_SEPARATOR}{child_key}"), child);
            }
        }
        Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                flatten_into(values, format!("{key}{SECTION_SEPARATOR}{index}"), child);
            }
        }
        Value::String(s) => {
            values.insert(key, s.clone());
        }
        Value::Null => {
            values.insert(key, String::new());
        }
        other => {
            values.insert(key, other.to_string());
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ConfigParams {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl Display for ConfigParams {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for (index, (key, value)) in self.values.iter().enumerate() {
            if index > 0 {
                write!(f, "{ENTRY_SEPARATOR}")?;
            }
            write!(f, "{key}={value}")?;
        }
        Ok(())
    }
}
