//! The flat, ordered metadata record that templates are resolved against.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single record value: plain text or an ordered list of strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    List(Vec<String>),
    Text(String),
}

impl fmt::Display for FieldValue {
    /// Lists join with a bare `,`, the same way a note's inline list reads
    /// back when it was written by hand.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::List(items) => f.write_str(&items.join(",")),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(items: Vec<String>) -> Self {
        FieldValue::List(items)
    }
}

/// Naming convention applied to record keys when they become frontmatter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyCase {
    SnakeCase,
    #[default]
    CamelCase,
}

/// Ordered mapping from field name to an optional value.
///
/// Insertion order is the order fields are substituted and emitted in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: IndexMap<String, Option<FieldValue>>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.insert(key.into(), Some(value.into()));
    }

    /// Records a field that is known but has no value.
    pub fn insert_absent(&mut self, key: impl Into<String>) {
        self.fields.insert(key.into(), None);
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key).and_then(Option::as_ref)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Case-insensitive key lookup; the first matching key in record order
    /// wins. The outer `Option` is `None` when no key matches.
    pub fn lookup_ignore_case(&self, key: &str) -> Option<Option<&FieldValue>> {
        let wanted = key.to_lowercase();
        self.fields
            .iter()
            .find(|(k, _)| k.to_lowercase() == wanted)
            .map(|(_, v)| v.as_ref())
    }

    /// The string form of a field; absent and unknown fields are empty.
    pub fn text(&self, key: &str) -> String {
        self.get(key).map(ToString::to_string).unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&FieldValue>)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_ref()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// A copy of this record with every key converted to snake_case.
    pub fn to_snake_case(&self) -> Record {
        let fields = self
            .fields
            .iter()
            .map(|(k, v)| (camel_to_snake_case(k), v.clone()))
            .collect();
        Record { fields }
    }

    /// Applies the configured key convention. camelCase is the native form
    /// so it is returned unchanged.
    pub fn with_key_case(&self, key_case: KeyCase) -> Record {
        match key_case {
            KeyCase::CamelCase => self.clone(),
            KeyCase::SnakeCase => self.to_snake_case(),
        }
    }
}

impl<K, V> FromIterator<(K, V)> for Record
where
    K: Into<String>,
    V: Into<FieldValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (k, v) in iter {
            record.insert(k, v);
        }
        record
    }
}

/// `publishDate` -> `publish_date`. Only ASCII uppercase letters are
/// rewritten; a leading capital also gains an underscore.
pub fn camel_to_snake_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 4);
    for ch in s.chars() {
        if ch.is_ascii_uppercase() {
            out.push('_');
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}
