use regex::Regex;

use super::{Document, ExtractOptions, Extraction, KeyExtractor};
use crate::core::data::{KeyOccurrence, LineIndex, TranslationKey};

/// Finds quoted strings matching the key pattern in any document.
///
/// The scan is fuzzy, so every result is a [`TranslationKey::Candidate`].
#[derive(Debug, Clone)]
pub struct GenericExtractor {
    regex: Regex,
    min_length: usize,
}

impl GenericExtractor {
    pub fn new(options: &ExtractOptions) -> Result<Self, regex::Error> {
        Ok(Self {
            regex: key_regex(&options.key_pattern)?,
            min_length: options.key_min_length,
        })
    }
}

/// `"key"` or `'key'`. An empty pair of quotes also matches so that it is consumed.
fn key_regex(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!(r#""({pattern})?"|'({pattern})?'"#))
}

impl KeyExtractor for GenericExtractor {
    fn applies(&self, _document: &Document) -> bool {
        true
    }

    fn extract(&self, document: &Document) -> Extraction {
        let index = LineIndex::new(document.text);
        let mut keys = Vec::new();
        let mut line_start = 0;

        for line in document.text.split('\n') {
            for captures in self.regex.captures_iter(line) {
                let Some(whole) = captures.get(0) else {
                    continue;
                };
                let Some(key) = captures.get(1).or_else(|| captures.get(2)) else {
                    continue;
                };
                if key.as_str().chars().count() < self.min_length {
                    continue;
                }
                let range = index.range(line_start + whole.start(), line_start + whole.end());
                keys.push(TranslationKey::Candidate(KeyOccurrence::new(
                    key.as_str(),
                    range,
                )));
            }
            line_start += line.len() + 1;
        }

        Extraction::new(keys)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::core::extract::generic::*;

    fn scan(options: &ExtractOptions, source: &str) -> Vec<KeyOccurrence> {
        let extraction = GenericExtractor::new(options)
            .unwrap()
            .extract(&Document::new("html", source));
        assert!(!extraction.has_errors);
        assert!(extraction.keys.iter().all(TranslationKey::is_candidate));
        extraction
            .keys
            .into_iter()
            .map(TranslationKey::into_occurrence)
            .collect()
    }

    #[test]
    fn test_double_and_single_quotes() {
        let source = "a \"form.label\" b\nc 'form.help' \"too short\"";
        let found = scan(&ExtractOptions::default(), source);
        let values: Vec<&str> = found.iter().map(|o| o.value.as_str()).collect();
        assert_eq!(values, vec!["form.label", "form.help"]);

        assert_eq!(found[0].range.slice(source), Some("\"form.label\""));
        assert_eq!(found[1].range.start.line, 1);
        assert_eq!(found[1].range.start.column, 2);
        assert_eq!(found[1].range.end.column, 13);
    }

    #[test]
    fn test_mismatched_quotes_do_not_match() {
        assert!(scan(&ExtractOptions::default(), "\"form.label'").is_empty());
    }

    #[test]
    fn test_minimum_length() {
        let options = ExtractOptions {
            key_pattern: "[a-z.]+".to_string(),
            key_min_length: 4,
            ..ExtractOptions::default()
        };
        let values: Vec<String> = scan(&options, "'a.b' 'a.bc' ''")
            .into_iter()
            .map(|o| o.value)
            .collect();
        assert_eq!(values, vec!["a.bc"]);
    }

    #[test]
    fn test_unicode_columns() {
        let source = "é 'menu.item'";
        let found = scan(&ExtractOptions::default(), source);
        assert_eq!(found[0].range.start.column, 2);
        assert_eq!(found[0].range.start.offset, 3);
    }

    #[test]
    fn test_invalid_pattern() {
        let options = ExtractOptions {
            key_pattern: "[".to_string(),
            ..ExtractOptions::default()
        };
        assert!(GenericExtractor::new(&options).is_err());
    }
}
