//! Core engine: template parsing, key extraction, catalogs and their join.
//!
//! ## Module Structure
//!
//! - `data`: positions, key occurrences and catalog types
//! - `template`: Twig lexer, parser, annotated AST and queries
//! - `extract`: translation keys from templates
//! - `catalog`: translation catalogs from JSON and YAML files
//! - `resolve`: keys joined with their catalog translations
//! - `file_scanner`: workspace file discovery
//! - `context`: the scan, extract and join pipeline over a project

pub mod catalog;
pub mod context;
pub mod data;
pub mod extract;
pub mod file_scanner;
pub mod resolve;
pub mod template;

pub use data::{
    Catalog, CatalogEntry, CatalogMessage, CatalogValue, DEFAULT_DOMAIN, DEFAULT_LOCALE,
    KeyOccurrence, LineIndex, Position, SourceLocation, TextRange, TranslationKey,
};
pub use resolve::{ResolvedUsage, Translation, cross_reference};
