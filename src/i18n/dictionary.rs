//! Translation dictionary.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::types::{Error, Result};

/// Immutable key → localized string mapping.
///
/// Clones share the same storage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Dictionary {
    entries: Arc<HashMap<String, String>>,
}

impl Dictionary {
    pub fn new(entries: HashMap<String, String>) -> Self {
        Self {
            entries: Arc::new(entries),
        }
    }

    /// Build a dictionary from an `i18n.cache` payload.
    ///
    /// Accepts plain strings (`{"key": "text"}`) and message objects
    /// (`{"key": {"message": "text"}}`); other values are skipped.
    pub fn from_payload(payload: &Value) -> Result<Self> {
        let Value::Object(map) = payload else {
            return Err(Error::validation(format!(
                "dictionary payload must be an object, got {}",
                json_type(payload)
            )));
        };

        let mut entries = HashMap::with_capacity(map.len());
        for (key, value) in map {
            let text = match value {
                Value::String(s) => Some(s.clone()),
                Value::Object(obj) => obj
                    .get("message")
                    .and_then(Value::as_str)
                    .map(str::to_owned),
                _ => None,
            };
            match text {
                Some(text) => {
                    entries.insert(key.clone(), text);
                }
                None => tracing::warn!("Skipping dictionary entry {}: not a string", key),
            }
        }
        Ok(Self::new(entries))
    }

    pub fn to_payload(&self) -> Value {
        Value::Object(
            self.entries
                .iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect(),
        )
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Dictionary {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::new(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
