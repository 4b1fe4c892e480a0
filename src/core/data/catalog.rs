use std::{collections::BTreeMap, fmt};

use serde::Serialize;

use super::position::TextRange;

/// Domain used when neither the file name nor its pattern names one.
pub const DEFAULT_DOMAIN: &str = "[undefined]";

/// Locale used when neither the file name nor its pattern names one.
pub const DEFAULT_LOCALE: &str = "und";

/// Scalar value of a catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CatalogValue {
    String(String),
    Number(serde_json::Number),
    Boolean(bool),
}

impl CatalogValue {
    /// Convert a scalar JSON value. Nulls and containers have no catalog value.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::String(s) => Some(CatalogValue::String(s.clone())),
            serde_json::Value::Number(n) => Some(CatalogValue::Number(n.clone())),
            serde_json::Value::Bool(b) => Some(CatalogValue::Boolean(*b)),
            _ => None,
        }
    }
}

impl fmt::Display for CatalogValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogValue::String(s) => write!(f, "{}", s),
            CatalogValue::Number(n) => write!(f, "{}", n),
            CatalogValue::Boolean(b) => write!(f, "{}", b),
        }
    }
}

/// Where a catalog key and its value are written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceLocation {
    pub file_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<TextRange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<TextRange>,
}

impl SourceLocation {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            key: None,
            value: None,
        }
    }
}

/// One translation of a key, for one domain and locale.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogMessage {
    pub value: CatalogValue,
    pub source: SourceLocation,
}

/// Translations of a single key: domain, then locale.
///
/// Both levels hold unique keys. Ordering is by name, never by insertion,
/// so that merging the same files in any order gives equal entries.
pub type CatalogEntry = BTreeMap<String, BTreeMap<String, CatalogMessage>>;

/// Flattened key to its translations.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Catalog {
    entries: BTreeMap<String, CatalogEntry>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn insert(
        &mut self,
        key: impl Into<String>,
        domain: impl Into<String>,
        locale: impl Into<String>,
        message: CatalogMessage,
    ) {
        self.entries
            .entry(key.into())
            .or_default()
            .entry(domain.into())
            .or_default()
            .insert(locale.into(), message);
    }

    /// Deep union with `other`. Messages from `other` win on the same key, domain and locale.
    pub fn merge(&mut self, other: &Catalog) {
        for (key, domains) in &other.entries {
            let entry = self.entries.entry(key.clone()).or_default();
            for (domain, locales) in domains {
                let target = entry.entry(domain.clone()).or_default();
                for (locale, message) in locales {
                    target.insert(locale.clone(), message.clone());
                }
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&CatalogEntry> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Exact lookup. Absence is reported as `None`, never substituted.
    pub fn lookup(&self, key: &str, domain: &str, locale: &str) -> Option<&CatalogMessage> {
        self.entries.get(key)?.get(domain)?.get(locale)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &CatalogEntry)> {
        self.entries.iter()
    }

    /// Every locale that holds at least one message.
    pub fn locales(&self) -> std::collections::BTreeSet<&str> {
        self.entries
            .values()
            .flat_map(|domains| domains.values())
            .flat_map(|locales| locales.keys())
            .map(String::as_str)
            .collect()
    }
}
