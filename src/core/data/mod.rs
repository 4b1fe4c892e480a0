//! Core data types shared by the template and catalog pipelines.
//!
//! ## Module Structure
//!
//! - `position`: Position, TextRange and the LineIndex used to compute them
//! - `occurrence`: Translation key usages found in templates
//! - `catalog`: Catalog, CatalogEntry and source locations of catalog values

pub mod catalog;
pub mod occurrence;
pub mod position;

pub use catalog::{
    Catalog, CatalogEntry, CatalogMessage, CatalogValue, DEFAULT_DOMAIN, DEFAULT_LOCALE,
    SourceLocation,
};
pub use occurrence::{KeyOccurrence, TranslationKey};
pub use position::{LineIndex, Position, TextRange};
