use tracing::debug;

use super::domain::resolve_domain;
use super::{Document, ExtractError, ExtractOptions, Extraction, KeyExtractor, ParsingMode};
use crate::core::data::{KeyOccurrence, LineIndex, TranslationKey};
use crate::core::template::{
    Ast, Axis, NodeId, NodeKind, NodeType, Selector, descendants, parse,
};

/// Extracts keys from `trans` filters and `{% trans %}` tags of Twig templates.
///
/// ```twig
/// {% trans_default_domain 'admin' %}
/// {{ 'page.title'|trans }}
/// {{ 'page.title'|trans({}, 'messages', 'fr') }}
/// {{ 'page.title'|trans(domain='messages') }}
/// {% trans from 'messages' into 'fr' %}page.title{% endtrans %}
/// ```
#[derive(Debug, Clone)]
pub struct TwigExtractor {
    parsing_mode: ParsingMode,
    domain_support: bool,
}

impl TwigExtractor {
    pub fn new(options: &ExtractOptions) -> Self {
        Self {
            parsing_mode: options.parsing_mode,
            domain_support: options.domain_support,
        }
    }

    fn collect(&self, ast: &Ast, index: &LineIndex) -> Result<Vec<TranslationKey>, ExtractError> {
        let mut keys = Vec::new();

        let filters = Selector::new(NodeType::Identifier).with_attribute("name", "trans");
        for id in descendants(ast, ast.root(), &filters) {
            if let Some(occurrence) = self.filter_usage(ast, id)? {
                keys.push(TranslationKey::Confirmed(occurrence));
            }
        }

        let tags = Selector::new(NodeType::TransStatement);
        for id in descendants(ast, ast.root(), &tags) {
            if let Some(occurrence) = self.tag_usage(ast, index, id)? {
                keys.push(TranslationKey::Confirmed(occurrence));
            }
        }

        debug!(count = keys.len(), "extracted twig translation keys");
        Ok(keys)
    }

    /// `'key'|trans`, `'key'|trans(vars, domain, locale)` and the named-argument form.
    fn filter_usage(&self, ast: &Ast, trans: NodeId) -> Result<Option<KeyOccurrence>, ExtractError> {
        let node = ast.get(trans).ok_or(ExtractError::MissingNode(trans))?;
        let link = node.link().ok_or(ExtractError::Detached(trans))?;

        let (filter, arguments) = match (&ast[link.parent].kind, link.axis) {
            (NodeKind::FilterExpression { .. }, Axis::Filter) => (link.parent, &[][..]),
            (NodeKind::CallExpression { arguments, .. }, Axis::Callee) => {
                let call = ast[link.parent]
                    .link()
                    .ok_or(ExtractError::Detached(link.parent))?;
                if call.axis != Axis::Filter {
                    // `trans(...)` used as a function, not a filter.
                    return Ok(None);
                }
                (call.parent, arguments.as_slice())
            }
            _ => return Ok(None),
        };

        let (mut domain, mut locale) = (None, None);
        let mut named = false;
        for (position, &argument) in arguments.iter().enumerate() {
            match &ast[argument].kind {
                NodeKind::NamedArgument { key, value } => {
                    named = true;
                    let value = ast.string_value(*value).map(str::to_string);
                    match ast[*key].kind.attribute("name") {
                        Some("domain") if value.is_some() => domain = value,
                        Some("locale") if value.is_some() => locale = value,
                        _ => {}
                    }
                }
                _ if named => {}
                _ => {
                    let value = ast.string_value(argument).map(str::to_string);
                    match position {
                        1 if value.is_some() => domain = value,
                        2 if value.is_some() => locale = value,
                        _ => {}
                    }
                }
            }
        }

        let Some(key) = leading_string(ast, filter) else {
            return Ok(None);
        };
        let Some(value) = ast.string_value(key) else {
            return Ok(None);
        };

        let domain = self.domain(ast, trans, domain);
        Ok(Some(
            KeyOccurrence::new(value, ast[key].range)
                .with_domain(domain)
                .with_locale(locale),
        ))
    }

    /// `{% trans %}key{% endtrans %}` with optional `from`/`into` clauses.
    ///
    /// Bodies other than a single text node are skipped.
    fn tag_usage(
        &self,
        ast: &Ast,
        index: &LineIndex,
        tag: NodeId,
    ) -> Result<Option<KeyOccurrence>, ExtractError> {
        let node = ast.get(tag).ok_or(ExtractError::MissingNode(tag))?;
        let NodeKind::TransStatement {
            domain,
            locale,
            body,
            ..
        } = &node.kind
        else {
            return Ok(None);
        };

        let [text] = body.as_slice() else {
            return Ok(None);
        };
        let text_node = ast.get(*text).ok_or(ExtractError::MissingNode(*text))?;
        let NodeKind::Text { value } = &text_node.kind else {
            return Ok(None);
        };

        let key = value.trim();
        if key.is_empty() {
            return Ok(None);
        }
        let start = text_node.range.start.offset + (value.len() - value.trim_start().len());
        let range = index.range(start, start + key.len());

        let explicit_domain = domain.and_then(|id| ast.string_value(id)).map(str::to_string);
        let locale = locale.and_then(|id| ast.string_value(id)).map(str::to_string);

        Ok(Some(
            KeyOccurrence::new(key, range)
                .with_domain(self.domain(ast, tag, explicit_domain))
                .with_locale(locale),
        ))
    }

    /// Usage-site domain first, the inherited one otherwise.
    fn domain(&self, ast: &Ast, usage: NodeId, explicit: Option<String>) -> Option<String> {
        if !self.domain_support {
            return None;
        }
        explicit.or_else(|| resolve_domain(ast, usage))
    }
}

/// The string literal a filter chain starts with, e.g. `'key'` in `'key'|lower|trans`.
fn leading_string(ast: &Ast, filter: NodeId) -> Option<NodeId> {
    let mut current = filter;
    while let NodeKind::FilterExpression { expression, .. } = ast.get(current)?.kind {
        current = expression;
    }
    (ast[current].node_type() == NodeType::StringLiteral).then_some(current)
}

impl KeyExtractor for TwigExtractor {
    fn applies(&self, document: &Document) -> bool {
        self.parsing_mode == ParsingMode::Symfony && document.language_id == "twig"
    }

    fn extract(&self, document: &Document) -> Extraction {
        let parsed = parse(document.text);
        if let Some(fatal) = parsed.errors.iter().find(|err| !err.recovered) {
            debug!(errors = ?parsed.errors, "twig template could not be parsed");
            return Extraction::failed(fatal.to_string());
        }
        if !parsed.errors.is_empty() {
            debug!(count = parsed.errors.len(), "recovered from twig syntax errors");
        }

        let index = LineIndex::new(document.text);
        match self.collect(&parsed.ast, &index) {
            Ok(keys) => Extraction::new(keys),
            Err(err) => {
                debug!(%err, "twig extraction failed");
                Extraction::failed(err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::core::extract::twig::*;

    fn extract(source: &str) -> Extraction {
        TwigExtractor::new(&ExtractOptions::default()).extract(&Document::new("twig", source))
    }

    fn occurrences(source: &str) -> Vec<KeyOccurrence> {
        let extraction = extract(source);
        assert!(!extraction.has_errors);
        extraction
            .keys
            .into_iter()
            .map(TranslationKey::into_occurrence)
            .collect()
    }

    fn summary(source: &str) -> Vec<(String, Option<String>, Option<String>)> {
        occurrences(source)
            .into_iter()
            .map(|o| (o.value, o.domain, o.locale))
            .collect()
    }

    fn some(value: &str) -> Option<String> {
        Some(value.to_string())
    }

    #[test]
    fn test_simple_filter() {
        let source = "<h1>{{ 'page.title'|trans }}</h1>";
        let found = occurrences(source);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].value, "page.title");
        assert_eq!(found[0].range.slice(source), Some("'page.title'"));
        assert_eq!(found[0].range.start.column, 7);
    }

    #[test]
    fn test_positional_arguments() {
        assert_eq!(
            summary("{{ 'k'|trans({}, 'admin', 'fr') }}"),
            vec![("k".to_string(), some("admin"), some("fr"))]
        );
    }

    #[test]
    fn test_named_arguments() {
        assert_eq!(
            summary("{{ 'k'|trans(locale='de', domain='admin') }}"),
            vec![("k".to_string(), some("admin"), some("de"))]
        );
    }

    #[test]
    fn test_positional_ignored_after_named() {
        assert_eq!(
            summary("{{ 'k'|trans(arguments={}, 'admin', 'fr') }}"),
            vec![("k".to_string(), None, None)]
        );
    }

    #[test]
    fn test_chained_filters() {
        assert_eq!(
            summary("{{ 'k.one'|lower|trans|upper }}"),
            vec![("k.one".to_string(), None, None)]
        );
    }

    #[test]
    fn test_variable_key_is_skipped() {
        assert!(occurrences("{{ key|trans }}{{ trans }}{{ trans('x') }}").is_empty());
    }

    #[test]
    fn test_inherited_domain_and_override() {
        let source = "{% trans_default_domain 'admin' %}{{ 'a'|trans }}{{ 'b'|trans({}, 'front') }}";
        assert_eq!(
            summary(source),
            vec![
                ("a".to_string(), some("admin"), None),
                ("b".to_string(), some("front"), None)
            ]
        );
    }

    #[test]
    fn test_trans_tag() {
        let source = "{% trans from 'mail' into 'nl' %}\n  mail.subject \n{% endtrans %}";
        let found = occurrences(source);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].value, "mail.subject");
        assert_eq!(found[0].domain, some("mail"));
        assert_eq!(found[0].locale, some("nl"));
        assert_eq!(found[0].range.slice(source), Some("mail.subject"));
        assert_eq!(found[0].range.start.line, 1);
        assert_eq!(found[0].range.start.column, 2);
    }

    #[test]
    fn test_trans_tag_with_nested_tags_is_skipped() {
        assert!(occurrences("{% trans %}a {{ b }} c{% endtrans %}{% trans %}  {% endtrans %}").is_empty());
    }

    #[test]
    fn test_trans_tag_inherits_domain() {
        assert_eq!(
            summary("{% trans_default_domain 'app' %}{% trans %}key.name{% endtrans %}"),
            vec![("key.name".to_string(), some("app"), None)]
        );
    }

    #[test]
    fn test_filters_before_tags() {
        let source = "{% trans %}tag.key{% endtrans %}{{ 'filter.key'|trans }}";
        let values: Vec<String> = occurrences(source).into_iter().map(|o| o.value).collect();
        assert_eq!(values, vec!["filter.key", "tag.key"]);
    }

    #[test]
    fn test_domain_support_disabled() {
        let options = ExtractOptions {
            domain_support: false,
            ..ExtractOptions::default()
        };
        let source = "{% trans_default_domain 'admin' %}{{ 'a'|trans({}, 'x', 'fr') }}";
        let keys = TwigExtractor::new(&options)
            .extract(&Document::new("twig", source))
            .keys;
        assert_eq!(keys[0].occurrence().domain, None);
        assert_eq!(keys[0].occurrence().locale, some("fr"));
    }

    #[test]
    fn test_fatal_parse_error_flags_document() {
        let extraction = extract("{% if a %}{{ 'k'|trans }}");
        assert!(extraction.has_errors);
        assert!(extraction.keys.is_empty());
    }

    #[test]
    fn test_recovered_errors_keep_other_keys() {
        assert_eq!(
            summary("{{ 'a'| }}{{ 'b.key'|trans }}"),
            vec![("b.key".to_string(), None, None)]
        );
    }

    #[test]
    fn test_custom_paired_tag_keeps_domain() {
        let source = "{% trans_default_domain 'admin' %}\
            {% component 'card' %}{{ 'card.title'|trans }}{% endcomponent %}\
            {{ 'page.title'|trans }}";
        let extraction = extract(source);
        assert!(!extraction.has_errors);
        assert_eq!(
            summary(source),
            vec![
                ("card.title".to_string(), some("admin"), None),
                ("page.title".to_string(), some("admin"), None)
            ]
        );
    }

    #[test]
    fn test_unclosed_call_keeps_following_keys() {
        let mut source = String::from("{{ foo( }}");
        for i in 0..10 {
            source.push_str(&format!("{{{{ 'key.{}'|trans }}}}", i));
        }
        let extraction = extract(&source);
        assert!(!extraction.has_errors);
        assert_eq!(extraction.keys.len(), 10);
        assert_eq!(extraction.keys[9].occurrence().value, "key.9");
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let source = "{% trans_default_domain 'app' %}{{ 'a'|trans }}\
            {% if x %}{{ 'b'|trans({}, 'front', 'fr') }}{% endif %}\
            {% trans %}c{% endtrans %}";
        assert_eq!(summary(source), summary(source));
        assert_eq!(extract(source).keys, extract(source).keys);
    }

    #[test]
    fn test_applies_only_to_twig_in_symfony_mode() {
        let extractor = TwigExtractor::new(&ExtractOptions::default());
        assert!(extractor.applies(&Document::new("twig", "")));
        assert!(!extractor.applies(&Document::new("html", "")));

        let generic = TwigExtractor::new(&ExtractOptions {
            parsing_mode: ParsingMode::Generic,
            ..ExtractOptions::default()
        });
        assert!(!generic.applies(&Document::new("twig", "")));
    }
}
