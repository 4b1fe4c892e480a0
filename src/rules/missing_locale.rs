//! Missing locale detection rule.
//!
//! Detects keys that exist in the catalog but lack a translation for a
//! required locale, or for the locale requested at the usage site.

use std::collections::BTreeSet;

use crate::{
    core::{context::AnalyzedTemplate, data::Catalog, resolve::domain_matches},
    issues::{MissingLocaleIssue, SourceContext},
};

/// Check used keys against `required_locales` (lowercased) and usage-site locales.
///
/// Locales compare ignoring case.
///
/// Keys absent from their domain are left to the missing-key rule.
pub fn check_missing_locale(
    templates: &[AnalyzedTemplate],
    catalog: &Catalog,
    required_locales: &[String],
) -> Vec<MissingLocaleIssue> {
    let mut issues = Vec::new();

    for template in templates {
        for usage in &template.usages {
            let occurrence = &usage.occurrence;
            let Some(entry) = catalog.get(&occurrence.value) else {
                continue;
            };

            let mut serving = entry
                .iter()
                .filter(|(domain, _)| domain_matches(occurrence.domain.as_deref(), domain))
                .peekable();
            if serving.peek().is_none() {
                continue;
            }
            let available: BTreeSet<String> = serving
                .flat_map(|(_, locales)| locales.keys())
                .map(|locale| locale.to_lowercase())
                .collect();

            let wanted: BTreeSet<String> = required_locales
                .iter()
                .cloned()
                .chain(occurrence.locale.as_deref().map(str::to_lowercase))
                .collect();
            let missing_in: Vec<String> = wanted
                .difference(&available)
                .cloned()
                .collect();

            if !missing_in.is_empty() {
                issues.push(MissingLocaleIssue {
                    context: SourceContext::from_range(
                        &template.file_name,
                        &template.text,
                        &occurrence.range,
                    ),
                    key: occurrence.value.clone(),
                    missing_in,
                });
            }
        }
    }

    issues
}
