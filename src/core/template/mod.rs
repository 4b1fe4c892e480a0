//! Twig template front end.
//!
//! ## Module Structure
//!
//! - `token` / `lexer`: Source text to tokens, lexical errors become error tokens
//! - `ast`: Arena-allocated syntax tree with parent/axis/index links
//! - `parser`: Recursive-descent parser with per-tag error recovery
//! - `annotate`: Fills in the parent links after parsing
//! - `query`: Descendant and preceding-sibling queries used by extraction

pub mod annotate;
pub mod ast;
pub mod lexer;
pub mod parser;
pub mod query;
pub mod token;

pub use ast::{Ast, Axis, Node, NodeId, NodeKind, NodeLink, NodeType};
pub use parser::{ParseError, ParseErrorKind, ParsedTemplate, parse};
pub use query::{Selector, descendants, preceding_siblings};
