//! Translation key extraction from template documents.
//!
//! Two strategies share the [`KeyExtractor`] contract:
//!
//! - [`TwigExtractor`]: parses Twig templates and reports `trans` filters and
//!   `{% trans %}` tags as confirmed keys with their domain and locale.
//! - [`GenericExtractor`]: scans any document line by line for quoted strings
//!   shaped like keys. Its results are candidates that only count once the
//!   catalog knows them.
//!
//! [`extract_translation_keys`] runs the first applicable strategy that
//! succeeds, so a template the Twig parser cannot handle still gets the
//! generic scan.

pub mod domain;
pub mod generic;
pub mod twig;

use enum_dispatch::enum_dispatch;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub use generic::GenericExtractor;
pub use twig::TwigExtractor;

use crate::core::data::TranslationKey;
use crate::core::template::NodeId;

/// Default pattern for keys found by the generic scanner.
pub const DEFAULT_KEY_PATTERN: &str = "[a-zA-Z0-9._-]{6,}";

/// Which kind of project the templates belong to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParsingMode {
    /// Symfony conventions: Twig templates and `domain.locale.ext` catalog names.
    #[default]
    Symfony,
    /// Regex scanning only, no domain inference from file names.
    Generic,
}

/// Settings shared by all extraction strategies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractOptions {
    pub parsing_mode: ParsingMode,
    /// Whether domains are resolved at all.
    pub domain_support: bool,
    pub key_pattern: String,
    pub key_min_length: usize,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            parsing_mode: ParsingMode::Symfony,
            domain_support: true,
            key_pattern: DEFAULT_KEY_PATTERN.to_string(),
            key_min_length: 0,
        }
    }
}

/// A template handed to the extractors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Document<'a> {
    /// Editor-style language id, e.g. `twig` or `html`.
    pub language_id: &'a str,
    pub text: &'a str,
}

impl<'a> Document<'a> {
    pub fn new(language_id: &'a str, text: &'a str) -> Self {
        Self { language_id, text }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Extraction {
    pub keys: Vec<TranslationKey>,
    /// The strategy failed for this document and `keys` must not be used.
    pub has_errors: bool,
    /// Why strategies failed. Set alongside usable keys when a fallback took over.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl Extraction {
    pub fn new(keys: Vec<TranslationKey>) -> Self {
        Self {
            keys,
            has_errors: false,
            errors: Vec::new(),
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            keys: Vec::new(),
            has_errors: true,
            errors: vec![error.into()],
        }
    }

    /// Whether the keys come from a fallback after an earlier strategy failed.
    pub fn is_fallback(&self) -> bool {
        !self.has_errors && !self.errors.is_empty()
    }
}

/// The syntax tree did not have the shape the extractor relies on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    #[error("node {0:?} does not exist")]
    MissingNode(NodeId),
    #[error("node {0:?} is not attached to the template")]
    Detached(NodeId),
}

#[enum_dispatch]
pub trait KeyExtractor {
    /// Whether this strategy handles the document at all.
    fn applies(&self, document: &Document) -> bool;

    fn extract(&self, document: &Document) -> Extraction;
}

#[enum_dispatch(KeyExtractor)]
#[derive(Debug, Clone)]
pub enum Extractor {
    Twig(TwigExtractor),
    Generic(GenericExtractor),
}

/// The strategies in priority order: Twig first, the generic scan as fallback.
pub fn build_extractors(options: &ExtractOptions) -> Result<Vec<Extractor>, regex::Error> {
    Ok(vec![
        TwigExtractor::new(options).into(),
        GenericExtractor::new(options)?.into(),
    ])
}

/// Keys of `document` from the first applicable strategy that succeeds.
///
/// When every applicable strategy fails the result is empty and flagged.
pub fn extract_translation_keys(extractors: &[Extractor], document: &Document) -> Extraction {
    let mut errors = Vec::new();
    for extractor in extractors.iter().filter(|e| e.applies(document)) {
        let mut extraction = extractor.extract(document);
        if !extraction.has_errors {
            errors.append(&mut extraction.errors);
            extraction.errors = errors;
            return extraction;
        }
        debug!(
            language = document.language_id,
            errors = ?extraction.errors,
            "extraction strategy failed, trying the next one"
        );
        errors.append(&mut extraction.errors);
    }

    Extraction {
        has_errors: !errors.is_empty(),
        errors,
        ..Extraction::default()
    }
}
