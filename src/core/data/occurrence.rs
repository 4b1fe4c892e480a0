use serde::Serialize;

use super::position::TextRange;

/// A single located usage of a translation key inside a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyOccurrence {
    /// The key text, without surrounding quotes.
    pub value: String,
    /// Span of the key in the template. For string literals the quotes are included.
    pub range: TextRange,
    /// Domain given at the usage site or inherited from `trans_default_domain`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
}

impl KeyOccurrence {
    pub fn new(value: impl Into<String>, range: TextRange) -> Self {
        Self {
            value: value.into(),
            range,
            domain: None,
            locale: None,
        }
    }

    pub fn with_domain(mut self, domain: Option<String>) -> Self {
        self.domain = domain;
        self
    }

    pub fn with_locale(mut self, locale: Option<String>) -> Self {
        self.locale = locale;
        self
    }
}

/// A translation key found in a template.
///
/// `Confirmed` keys come from a structural parse of the template and can be
/// trusted as is. `Candidate` keys come from the heuristic line scanner and
/// only become meaningful once the catalog confirms they exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TranslationKey {
    Confirmed(KeyOccurrence),
    Candidate(KeyOccurrence),
}

impl TranslationKey {
    pub fn occurrence(&self) -> &KeyOccurrence {
        match self {
            TranslationKey::Confirmed(occurrence) | TranslationKey::Candidate(occurrence) => {
                occurrence
            }
        }
    }

    pub fn into_occurrence(self) -> KeyOccurrence {
        match self {
            TranslationKey::Confirmed(occurrence) | TranslationKey::Candidate(occurrence) => {
                occurrence
            }
        }
    }

    pub fn value(&self) -> &str {
        &self.occurrence().value
    }

    pub fn is_candidate(&self) -> bool {
        matches!(self, TranslationKey::Candidate(_))
    }

    /// Promote a candidate once `exists` confirms the key, drop it otherwise.
    ///
    /// Confirmed keys are returned unchanged.
    pub fn verify(self, exists: impl FnOnce(&str) -> bool) -> Option<KeyOccurrence> {
        match self {
            TranslationKey::Confirmed(occurrence) => Some(occurrence),
            TranslationKey::Candidate(occurrence) => {
                exists(&occurrence.value).then_some(occurrence)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::core::data::occurrence::*;

    fn occurrence(value: &str) -> KeyOccurrence {
        KeyOccurrence::new(value, TextRange::default())
    }

    #[test]
    fn test_candidate_flag() {
        assert!(TranslationKey::Candidate(occurrence("a.b.c")).is_candidate());
        assert!(!TranslationKey::Confirmed(occurrence("a.b.c")).is_candidate());
    }

    #[test]
    fn test_verify_candidate() {
        let key = TranslationKey::Candidate(occurrence("known.key"));
        assert!(key.clone().verify(|k| k == "known.key").is_some());
        assert!(key.verify(|_| false).is_none());
    }

    #[test]
    fn test_verify_confirmed_ignores_catalog() {
        let key = TranslationKey::Confirmed(occurrence("unknown.key"));
        assert_eq!(key.verify(|_| false), Some(occurrence("unknown.key")));
    }

    #[test]
    fn test_serialize_kind_tag() {
        let key = TranslationKey::Candidate(occurrence("abc.def").with_locale(Some("fr".into())));
        let json = serde_json::to_value(&key).unwrap();
        assert_eq!(json["kind"], "candidate");
        assert_eq!(json["value"], "abc.def");
        assert_eq!(json["locale"], "fr");
        assert!(json.get("domain").is_none());
    }
}
