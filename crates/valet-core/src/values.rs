//! Values and flags with first-write-wins merge

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{CoreError, Result};

/// Prefix aliasing a value to another key
pub const KEY_PREFIX: &str = "key:";
/// Prefix expanding a value as a template against the other values
pub const TEMPLATE_PREFIX: &str = "template:";
/// Prefix reading a value from an environment variable
pub const ENV_PREFIX: &str = "env:";
/// Prefix reading a value from the output of a shell command
pub const CMD_PREFIX: &str = "cmd:";
/// Prefix reading a value from a file whose path is itself a template
pub const FILE_PREFIX: &str = "file:";

/// String values keyed by name
///
/// Raw entries may carry an indirection prefix (`key:`, `template:`, `env:`,
/// `cmd:`, `file:`); those are resolved lazily by the engine's resolver, never here.
///
/// Merging never overwrites: keys already present always win over merged-in keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, serde_yaml::Value>")]
pub struct Values(BTreeMap<String, String>);

impl Values {
    /// Create empty values
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Load values from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse values from a YAML mapping of scalars
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Builder-style insert that keeps an existing entry
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.entry(key.into()).or_insert_with(|| value.into());
        self
    }

    /// Insert or replace an entry
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Get the raw, unresolved entry for a key
    pub fn get_raw(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Pure existence check, no resolution
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Return a copy of self with `other` merged in; existing keys win
    pub fn merge_values(&self, other: &Values) -> Values {
        let mut merged = self.clone();
        for (key, value) in &other.0 {
            merged
                .0
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }
        merged
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl TryFrom<BTreeMap<String, serde_yaml::Value>> for Values {
    type Error = CoreError;

    fn try_from(raw: BTreeMap<String, serde_yaml::Value>) -> Result<Self> {
        let mut values = BTreeMap::new();
        for (key, value) in raw {
            let value = match value {
                serde_yaml::Value::String(s) => s,
                serde_yaml::Value::Bool(b) => b.to_string(),
                serde_yaml::Value::Number(n) => n.to_string(),
                serde_yaml::Value::Null => String::new(),
                _ => {
                    return Err(CoreError::InvalidValue {
                        key,
                        message: "values must be scalars".to_string(),
                    });
                }
            };
            values.insert(key, value);
        }
        Ok(Self(values))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Values {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut values = Values::new();
        for (k, v) in iter {
            values = values.with(k, v);
        }
        values
    }
}

/// Parse `key=value` pairs given on the command line
pub fn parse_set_values(set_args: &[String]) -> Result<Values> {
    let mut values = Values::new();
    for arg in set_args {
        let (key, val) = arg.split_once('=').ok_or_else(|| CoreError::InvalidValue {
            key: arg.clone(),
            message: "expected key=value".to_string(),
        })?;
        values.set(key.trim(), val);
    }
    Ok(values)
}

/// Active feature flags used to gate steps and resources
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Flags(Vec<String>);

impl Flags {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn contains(&self, flag: &str) -> bool {
        self.0.iter().any(|f| f == flag)
    }

    /// True when every flag in `required` is active
    pub fn contains_all(&self, required: &Flags) -> bool {
        required.0.iter().all(|f| self.contains(f))
    }

    /// Return a copy with `other` appended, skipping duplicates
    pub fn merge_flags(&self, other: &Flags) -> Flags {
        let mut merged = self.clone();
        for flag in &other.0 {
            if !merged.contains(flag) {
                merged.0.push(flag.clone());
            }
        }
        merged
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for Flags {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Flags::new().merge_flags(&Flags(iter.into_iter().map(Into::into).collect()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_existing_keys_win() {
        let base: Values = [("X", "1")].into_iter().collect();
        let other: Values = [("X", "2"), ("Y", "2")].into_iter().collect();

        let merged = base.merge_values(&other);

        assert_eq!(merged.get_raw("X"), Some("1"));
        assert_eq!(merged.get_raw("Y"), Some("2"));
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_merge_does_not_mutate_receiver() {
        let base: Values = [("X", "1")].into_iter().collect();
        let other: Values = [("Y", "2")].into_iter().collect();

        let _ = base.merge_values(&other);

        assert!(!base.contains_key("Y"));
    }

    #[test]
    fn test_from_yaml_stringifies_scalars() {
        let values = Values::from_yaml(
            r#"
Namespace: gloo-system
Replicas: 3
Enabled: true
Alias: "key:Namespace"
"#,
        )
        .unwrap();

        assert_eq!(values.get_raw("Replicas"), Some("3"));
        assert_eq!(values.get_raw("Enabled"), Some("true"));
        assert_eq!(values.get_raw("Alias"), Some("key:Namespace"));
    }

    #[test]
    fn test_from_yaml_rejects_nested() {
        let result = Values::from_yaml("image:\n  tag: v1\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_set_values() {
        let args = vec!["Version=1.2.3".to_string(), "Cmd=a=b".to_string()];
        let values = parse_set_values(&args).unwrap();

        assert_eq!(values.get_raw("Version"), Some("1.2.3"));
        assert_eq!(values.get_raw("Cmd"), Some("a=b"));
        assert!(parse_set_values(&["nope".to_string()]).is_err());
    }

    #[test]
    fn test_flags_merge_and_contains_all() {
        let active: Flags = ["enterprise", "dns"].into_iter().collect();
        let required: Flags = ["dns"].into_iter().collect();
        let missing: Flags = ["dns", "aws"].into_iter().collect();

        assert!(active.contains_all(&required));
        assert!(!active.contains_all(&missing));
        assert!(active.contains_all(&Flags::new()));

        let merged = active.merge_flags(&missing);
        assert_eq!(merged.iter().collect::<Vec<_>>(), vec!["enterprise", "dns", "aws"]);
    }
}
