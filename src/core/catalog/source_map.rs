use enum_dispatch::enum_dispatch;

use super::json::JsonSourceMap;
use super::yaml::YamlSourceMap;
use crate::core::data::SourceLocation;

/// Position index of a parsed catalog file.
#[enum_dispatch]
pub trait SourceMap {
    /// Key and value ranges of the entry reached by following `segments`.
    fn lookup_segments(&self, segments: &[String]) -> Option<SourceLocation>;

    /// Key and value ranges of the entry at a flattened `path` (`a.b.0.c` or `a.b[0].c`).
    fn lookup(&self, path: &str) -> Option<SourceLocation> {
        self.lookup_segments(&split_key_path(path))
    }
}

#[enum_dispatch(SourceMap)]
#[derive(Debug, Clone)]
pub enum CatalogSourceMap {
    Json(JsonSourceMap),
    Yaml(YamlSourceMap),
}

/// Split a flattened key into its segments.
///
/// Bracket indices become their own segment and empty segments are dropped,
/// so `a[0].b`, `a.0.b` and `.a..0.b` all give `["a", "0", "b"]`.
pub fn split_key_path(path: &str) -> Vec<String> {
    let mut normalized = String::with_capacity(path.len() + 2);
    let mut rest = path;
    while let Some(open) = rest.find('[') {
        let after = &rest[open + 1..];
        match after.find(']') {
            Some(close) if !after[..close].contains('[') => {
                normalized.push_str(&rest[..open]);
                normalized.push('.');
                normalized.push_str(&after[..close]);
                normalized.push('.');
                rest = &after[close + 1..];
            }
            _ => {
                normalized.push_str(&rest[..=open]);
                rest = after;
            }
        }
    }
    normalized.push_str(rest);

    normalized
        .split('.')
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect()
}
