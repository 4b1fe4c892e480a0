//! Translens - translation key checker for Twig templates
//!
//! Translens extracts translation-key usages from templates (Twig, with a
//! regex scan for anything else) and cross-references them with JSON and
//! YAML translation catalogs. Every usage carries its exact span, its
//! resolved domain and locale, and the catalog values with their positions.
//!
//! ## Module Structure
//!
//! - `cli`: Command-line interface layer (`check`, `keys`, `init`)
//! - `config`: Configuration file loading and parsing
//! - `core`: Template parsing, key extraction, catalogs and their join
//! - `issues`: Issue type definitions and reporting
//! - `rules`: Detection rules over the joined result

pub mod cli;
pub mod config;
pub mod core;
pub mod issues;
pub mod rules;
