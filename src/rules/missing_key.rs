//! Missing translation key detection rule.
//!
//! Detects keys used in templates but not defined in the catalog for the
//! domain they resolve to.

use crate::{
    core::{context::AnalyzedTemplate, data::Catalog, resolve::domain_matches},
    issues::{MissingKeyIssue, SourceContext},
};

/// Check for missing translation keys.
///
/// A usage without a domain only needs the key in some domain, and a key from
/// a file that names no domain satisfies every domain. Generic-scan
/// candidates never get here unless the catalog already has them.
pub fn check_missing_key(templates: &[AnalyzedTemplate], catalog: &Catalog) -> Vec<MissingKeyIssue> {
    let mut issues = Vec::new();

    for template in templates {
        for usage in &template.usages {
            let occurrence = &usage.occurrence;
            let entry = catalog.get(&occurrence.value);

            let present = match (&occurrence.domain, entry) {
                (_, None) => false,
                (None, Some(_)) => true,
                (Some(domain), Some(entry)) => {
                    entry.keys().any(|d| domain_matches(Some(domain.as_str()), d))
                }
            };
            if present {
                continue;
            }

            let other_domains = entry
                .map(|entry| entry.keys().cloned().collect())
                .unwrap_or_default();

            issues.push(MissingKeyIssue {
                context: SourceContext::from_range(
                    &template.file_name,
                    &template.text,
                    &occurrence.range,
                ),
                key: occurrence.value.clone(),
                domain: occurrence.domain.clone(),
                other_domains,
            });
        }
    }

    issues
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::core::data::{
        CatalogMessage, CatalogValue, DEFAULT_DOMAIN, KeyOccurrence, LineIndex, SourceLocation,
        TranslationKey,
    };
    use crate::core::resolve::cross_reference;
    use crate::rules::missing_key::*;

    fn catalog() -> Catalog {
        let mut catalog = Catalog::new();
        for (key, domain, file) in [
            ("known", "messages", "messages.en.yaml"),
            ("shared", DEFAULT_DOMAIN, "shared.yaml"),
        ] {
            catalog.insert(
                key,
                domain,
                "en",
                CatalogMessage {
                    value: CatalogValue::String("Known".to_string()),
                    source: SourceLocation::new(file),
                },
            );
        }
        catalog
    }

    fn template(text: &str, keys: Vec<(&str, Option<&str>)>) -> AnalyzedTemplate {
        let index = LineIndex::new(text);
        let keys = keys
            .into_iter()
            .map(|(key, domain)| {
                let start = text.find(key).unwrap();
                TranslationKey::Confirmed(
                    KeyOccurrence::new(key, index.range(start, start + key.len()))
                        .with_domain(domain.map(str::to_string)),
                )
            })
            .collect();
        AnalyzedTemplate {
            file_name: "page.twig".to_string(),
            text: text.to_string(),
            usages: cross_reference(keys, &catalog()),
        }
    }

    #[test]
    fn test_unknown_key() {
        let templates = vec![template("x\n  {{ 'unknown'|trans }}", vec![("unknown", None), ("x", None)])];
        let issues = check_missing_key(&templates, &catalog());
        let keys: Vec<(&str, usize, usize)> = issues
            .iter()
            .map(|i| (i.key.as_str(), i.context.line, i.context.col))
            .collect();
        assert_eq!(keys, vec![("unknown", 2, 7), ("x", 1, 1)]);
        assert_eq!(issues[0].context.source_line, "  {{ 'unknown'|trans }}");
    }

    #[test]
    fn test_known_key_in_another_domain() {
        let templates = vec![template("known", vec![("known", Some("admin"))])];
        let issues = check_missing_key(&templates, &catalog());
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].domain.as_deref(), Some("admin"));
        assert_eq!(issues[0].other_domains, vec!["messages"]);
    }

    #[test]
    fn test_known_key() {
        let templates = vec![template(
            "known known",
            vec![("known", None), ("known", Some("messages"))],
        )];
        assert!(check_missing_key(&templates, &catalog()).is_empty());
    }

    #[test]
    fn test_undefined_domain_satisfies_any_domain() {
        let templates = vec![template("shared", vec![("shared", Some("admin"))])];
        assert!(check_missing_key(&templates, &catalog()).is_empty());
    }
}
