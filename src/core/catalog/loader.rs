use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::flatten::flatten;
use super::json::parse_json;
use super::pattern::{FilenamePattern, identify};
use super::source_map::{CatalogSourceMap, SourceMap};
use super::yaml::parse_yaml;
use super::CatalogError;
use crate::core::data::{
    Catalog, CatalogMessage, DEFAULT_DOMAIN, DEFAULT_LOCALE, SourceLocation,
};
use crate::core::extract::ParsingMode;

const ICU_SUFFIX: &str = "+intl-icu";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogFormat {
    Json,
    Yaml,
}

impl CatalogFormat {
    /// `.json` is JSON, everything else is read as YAML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => CatalogFormat::Json,
            _ => CatalogFormat::Yaml,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CatalogOptions {
    pub parsing_mode: ParsingMode,
    pub patterns: Vec<FilenamePattern>,
    /// Source locations name files relative to this directory.
    pub root: Option<PathBuf>,
}

impl CatalogOptions {
    pub fn file_name(&self, path: &Path) -> String {
        let relative = self
            .root
            .as_deref()
            .and_then(|root| path.strip_prefix(root).ok())
            .unwrap_or(path);
        relative.to_string_lossy().replace('\\', "/")
    }

    /// Domain and locale of a catalog file, defaults applied.
    pub fn identify(&self, path: &Path) -> (String, String) {
        let identity = identify(&self.patterns, path).unwrap_or_default();
        let locale = identity.locale;

        let domain = identity.domain.or_else(|| {
            if self.parsing_mode != ParsingMode::Symfony {
                return None;
            }
            let base = path.file_name()?.to_str()?;
            let mut segments = base.split('.');
            let first = segments.next()?;
            let has_more = segments.next().is_some();
            let is_locale = locale.as_deref() == Some(first.to_lowercase().as_str());
            (has_more && !is_locale && !first.is_empty()).then(|| first.to_string())
        });

        let domain = domain
            .map(|d| d.strip_suffix(ICU_SUFFIX).map(str::to_string).unwrap_or(d))
            .unwrap_or_else(|| DEFAULT_DOMAIN.to_string());
        (domain, locale.unwrap_or_else(|| DEFAULT_LOCALE.to_string()))
    }
}

/// Parse one catalog file into a catalog of its flattened keys.
pub fn parse_catalog_file(
    text: &str,
    path: &Path,
    options: &CatalogOptions,
) -> Result<Catalog, CatalogError> {
    let file_name = options.file_name(path);
    let (data, source_map): (_, CatalogSourceMap) = match CatalogFormat::from_path(path) {
        CatalogFormat::Json => {
            let (data, map) = parse_json(text, &file_name)?;
            (data, map.into())
        }
        CatalogFormat::Yaml => {
            let (data, map) = parse_yaml(text, &file_name)?;
            (data, map.into())
        }
    };
    let (domain, locale) = options.identify(path);

    let mut catalog = Catalog::new();
    for entry in flatten(&data) {
        let source = source_map
            .lookup_segments(&entry.segments)
            .unwrap_or_else(|| SourceLocation::new(file_name.as_str()));
        catalog.insert(
            entry.key,
            domain.as_str(),
            locale.as_str(),
            CatalogMessage {
                value: entry.value,
                source,
            },
        );
    }

    debug!(
        file = %file_name,
        %domain,
        %locale,
        keys = catalog.len(),
        "loaded catalog file"
    );
    Ok(catalog)
}

/// Like [`parse_catalog_file`], but a file that cannot be parsed gives an empty catalog.
pub fn load_catalog_file(text: &str, path: &Path, options: &CatalogOptions) -> Catalog {
    match parse_catalog_file(text, path, options) {
        Ok(catalog) => {
            if catalog.is_empty() {
                warn!(file = %path.display(), "catalog file has no translations");
            }
            catalog
        }
        Err(err) => {
            warn!(file = %path.display(), %err, "failed to parse catalog file");
            Catalog::new()
        }
    }
}
