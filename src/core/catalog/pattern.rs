use std::path::Path;

use regex::Regex;

/// Domain and locale read from a catalog file path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileIdentity {
    pub domain: Option<String>,
    /// Lowercased.
    pub locale: Option<String>,
}

/// File name pattern such as `[DOMAIN].[LOCALE].yaml` or `i18n/[LOCALE]/*.json`.
///
/// Placeholders: `[DOMAIN]`, `[LOCALE]` (also spelled `[LANG]` or `[LANGCODE]`)
/// and `*` for anything within one path segment. Everything else is literal.
/// A pattern with `n` path segments is matched against the last `n` segments
/// of a path.
#[derive(Debug, Clone)]
pub struct FilenamePattern {
    source: String,
    regex: Regex,
    segments: usize,
}

const PLACEHOLDERS: &[(&str, Placeholder)] = &[
    ("[DOMAIN]", Placeholder::Domain),
    ("[LOCALE]", Placeholder::Locale),
    ("[LANGCODE]", Placeholder::Locale),
    ("[LANG]", Placeholder::Locale),
    ("*", Placeholder::Wildcard),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placeholder {
    Domain,
    Locale,
    Wildcard,
}

impl FilenamePattern {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        let pattern = pattern.trim().trim_start_matches('/');
        let mut expression = String::from("^");
        let mut seen_domain = false;
        let mut seen_locale = false;
        let mut rest = pattern;

        while !rest.is_empty() {
            let next = PLACEHOLDERS
                .iter()
                .filter_map(|(token, kind)| rest.find(token).map(|at| (at, *token, *kind)))
                .min_by_key(|(at, token, _)| (*at, usize::MAX - token.len()));

            let Some((at, token, kind)) = next else {
                expression.push_str(&regex::escape(rest));
                break;
            };

            expression.push_str(&regex::escape(&rest[..at]));
            // Repeated placeholders must match but only the first one captures.
            let group = match kind {
                Placeholder::Domain if !seen_domain => {
                    seen_domain = true;
                    "(?P<domain>[^/]+)"
                }
                Placeholder::Domain => "[^/]+",
                Placeholder::Locale if !seen_locale => {
                    seen_locale = true;
                    "(?P<locale>[^/.]+)"
                }
                Placeholder::Locale => "[^/.]+",
                Placeholder::Wildcard => "[^/]*",
            };
            expression.push_str(group);
            rest = &rest[at + token.len()..];
        }
        expression.push('$');

        Ok(Self {
            source: pattern.to_string(),
            regex: Regex::new(&expression)?,
            segments: pattern.split('/').count(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Domain and locale of `path`, if it matches.
    pub fn matches(&self, path: &Path) -> Option<FileIdentity> {
        let normalized = path.to_string_lossy().replace('\\', "/");
        let parts: Vec<&str> = normalized.split('/').filter(|s| !s.is_empty()).collect();
        if parts.len() < self.segments {
            return None;
        }
        let tail = parts[parts.len() - self.segments..].join("/");

        let captures = self.regex.captures(&tail)?;
        Some(FileIdentity {
            domain: captures.name("domain").map(|m| m.as_str().to_string()),
            locale: captures.name("locale").map(|m| m.as_str().to_lowercase()),
        })
    }
}

/// Identity from the first matching pattern.
pub fn identify(patterns: &[FilenamePattern], path: &Path) -> Option<FileIdentity> {
    patterns.iter().find_map(|pattern| pattern.matches(path))
}
