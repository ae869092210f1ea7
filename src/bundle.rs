//! Parsed translation bundles.

use std::collections::HashMap;

use serde_json::Value;

use crate::error::LoadError;
use crate::locales::ResourceKey;

/// Separator for grouped keys, e.g. `navigation.settings`.
pub const KEY_SEPARATOR: char = '.';

/// A value in a translation file.
///
/// Either a plain string or a group of nested keys.
///
/// ```json
/// "greeting": "Hello {{name}}",
/// "navigation": { "settings": "Settings" }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum SectionValue {
    Text(String),
    Map(HashMap<String, SectionValue>),
}

/// The resolved key-to-string mapping for one `(locale, namespace)` pair.
///
/// Immutable once built; the loader hands it out behind an `Arc`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TranslationBundle {
    entries: HashMap<String, SectionValue>,
}

impl TranslationBundle {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parses the JSON text of `key`'s resource file.
    pub fn from_json_str(key: ResourceKey, json: &str) -> Result<Self, LoadError> {
        let value: Value = serde_json
            ::from_str(json)
            .map_err(|source| LoadError::Parse { key, source })?;
        Self::from_value(&value).ok_or(LoadError::NotAnObject(key))
    }

    /// Builds a bundle from a JSON object. Entries that are neither strings
    /// nor objects (numbers, arrays, null) are skipped.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        Some(Self { entries: parse_section_map(obj) })
    }

    /// Looks up `key`, walking groups on `.`. A literal key containing dots
    /// takes precedence over the grouped path.
    pub fn get(&self, key: &str) -> Option<&str> {
        if let Some(SectionValue::Text(text)) = self.entries.get(key) {
            return Some(text.as_str());
        }

        let mut parts = key.split(KEY_SEPARATOR);
        let mut current = self.entries.get(parts.next()?)?;
        for part in parts {
            match current {
                SectionValue::Map(map) => {
                    current = map.get(part)?;
                }
                SectionValue::Text(_) => {
                    return None;
                }
            }
        }

        match current {
            SectionValue::Text(text) => Some(text.as_str()),
            SectionValue::Map(_) => None,
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Number of top-level entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn parse_section_map(obj: &serde_json::Map<String, Value>) -> HashMap<String, SectionValue> {
    let mut section_map = HashMap::new();

    for (key, value) in obj {
        let section_value = if let Some(text) = value.as_str() {
            SectionValue::Text(text.to_string())
        } else if let Some(nested) = value.as_object() {
            SectionValue::Map(parse_section_map(nested))
        } else {
            continue;
        };
        section_map.insert(key.clone(), section_value);
    }

    section_map
}
