//! Translation directives carried by nodes.
//!
//! - content attribute: `i18n-content="key"` replaces the element text
//! - values attribute: `i18n-values="title:key;.placeholder:key2"` sets
//!   attributes (a leading dot is accepted; `.textContent` targets the text)
//! - inline markers: `__MSG_key__` inside a text node

use crate::i18n::Dictionary;

/// Where a value from the values attribute goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueTarget {
    Text,
    Attribute(String),
}

/// One `target:key` pair of a values attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueBinding {
    pub target: ValueTarget,
    pub key: String,
}

/// Parse a values attribute. Malformed pairs are skipped.
pub fn parse_values(raw: &str) -> Vec<ValueBinding> {
    raw.split(';')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .filter_map(|pair| {
            let Some((target, key)) = pair.split_once(':') else {
                tracing::debug!("Ignoring values directive without key: {}", pair);
                return None;
            };
            let (target, key) = (target.trim(), key.trim());
            if target.is_empty() || key.is_empty() {
                tracing::debug!("Ignoring incomplete values directive: {}", pair);
                return None;
            }
            let target = match target.strip_prefix('.').unwrap_or(target) {
                "textContent" | "innerText" => ValueTarget::Text,
                name => ValueTarget::Attribute(name.to_string()),
            };
            Some(ValueBinding {
                target,
                key: key.to_string(),
            })
        })
        .collect()
}

/// Inline marker syntax for text nodes.
#[derive(Debug, Clone)]
pub struct MarkerSyntax<'a> {
    pub prefix: &'a str,
    pub suffix: &'a str,
}

impl MarkerSyntax<'_> {
    /// Replace every marker whose key is in `dictionary`.
    ///
    /// Values are expanded recursively, so the result holds no marker that a
    /// later call would still replace. Unknown keys keep their marker, and so
    /// does a key whose value refers back to itself. Returns `None` when
    /// nothing was replaced.
    pub fn substitute(&self, text: &str, dictionary: &Dictionary) -> Option<String> {
        if self.prefix.is_empty() || !text.contains(self.prefix) {
            return None;
        }
        let mut active = Vec::new();
        match self.expand(text, dictionary, &mut active) {
            Some((out, true)) => Some(out),
            _ => None,
        }
    }

    /// Expand the markers of `text`. `active` holds the keys being expanded
    /// above this call; meeting one again is a cycle, which makes the whole
    /// enclosing key unresolvable (`None`). At the top level a cyclic key is
    /// kept as written instead.
    fn expand(
        &self,
        text: &str,
        dictionary: &Dictionary,
        active: &mut Vec<String>,
    ) -> Option<(String, bool)> {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        let mut replaced = false;
        while let Some(start) = rest.find(self.prefix) {
            let after_prefix = &rest[start + self.prefix.len()..];
            let Some(end) = after_prefix.find(self.suffix) else {
                break;
            };
            let key = &after_prefix[..end];
            let marker = &rest[start..start + self.prefix.len() + end + self.suffix.len()];
            out.push_str(&rest[..start]);

            match self.resolve(key, dictionary, active) {
                Resolution::Value(value) => {
                    out.push_str(&value);
                    replaced = true;
                }
                Resolution::Missing => out.push_str(marker),
                Resolution::Cyclic if !active.is_empty() => return None,
                Resolution::Cyclic => out.push_str(marker),
            }
            rest = &after_prefix[end + self.suffix.len()..];
        }
        out.push_str(rest);
        Some((out, replaced))
    }

    fn resolve(&self, key: &str, dictionary: &Dictionary, active: &mut Vec<String>) -> Resolution {
        let Some(value) = dictionary.get(key).filter(|_| !key.is_empty()) else {
            return Resolution::Missing;
        };
        if active.iter().any(|k| k == key) {
            return Resolution::Cyclic;
        }
        active.push(key.to_string());
        let expanded = self.expand(value, dictionary, active);
        active.pop();
        match expanded {
            Some((out, _)) => Resolution::Value(out),
            None => Resolution::Cyclic,
        }
    }
}

enum Resolution {
    Value(String),
    Missing,
    Cyclic,
}
