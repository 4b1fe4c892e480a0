//! Joining extracted keys with the unified catalog.

use serde::Serialize;

use crate::core::data::{Catalog, CatalogMessage, DEFAULT_DOMAIN, KeyOccurrence, TranslationKey};

/// One catalog translation of a resolved usage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Translation {
    pub domain: String,
    pub locale: String,
    #[serde(flatten)]
    pub message: CatalogMessage,
}

/// A key usage and the translations the catalog has for it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedUsage {
    pub occurrence: KeyOccurrence,
    /// Empty when the catalog has nothing for the usage's domain and locale.
    pub translations: Vec<Translation>,
}

impl ResolvedUsage {
    pub fn is_translated(&self) -> bool {
        !self.translations.is_empty()
    }

    pub fn has_locale(&self, locale: &str) -> bool {
        self.translations
            .iter()
            .any(|t| locale_matches(Some(locale), &t.locale))
    }
}

/// Whether messages of catalog `domain` serve a usage asking for `wanted`.
///
/// Files that name no domain serve every domain.
pub fn domain_matches(wanted: Option<&str>, domain: &str) -> bool {
    domain == DEFAULT_DOMAIN || wanted.is_none_or(|wanted| wanted == domain)
}

/// Locales compare ignoring ASCII case, so `fr_FR` finds a catalog's `fr_fr`.
pub fn locale_matches(wanted: Option<&str>, locale: &str) -> bool {
    wanted.is_none_or(|wanted| wanted.eq_ignore_ascii_case(locale))
}

/// Keep confirmed keys and the candidates the catalog knows, and attach their translations.
///
/// A usage with a domain only sees that domain, one with a locale only that locale.
pub fn cross_reference(keys: Vec<TranslationKey>, catalog: &Catalog) -> Vec<ResolvedUsage> {
    keys.into_iter()
        .filter_map(|key| key.verify(|value| catalog.contains_key(value)))
        .map(|occurrence| {
            let translations = translations(&occurrence, catalog);
            ResolvedUsage {
                occurrence,
                translations,
            }
        })
        .collect()
}

fn translations(occurrence: &KeyOccurrence, catalog: &Catalog) -> Vec<Translation> {
    let Some(entry) = catalog.get(&occurrence.value) else {
        return Vec::new();
    };

    entry
        .iter()
        .filter(|(domain, _)| domain_matches(occurrence.domain.as_deref(), domain))
        .flat_map(|(domain, locales)| {
            locales
                .iter()
                .filter(|(locale, _)| locale_matches(occurrence.locale.as_deref(), locale))
                .map(move |(locale, message)| Translation {
                    domain: domain.clone(),
                    locale: locale.clone(),
                    message: message.clone(),
                })
        })
        .collect()
}
