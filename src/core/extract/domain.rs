//! Domain inherited from `{% trans_default_domain %}`.

use crate::core::template::{Ast, NodeId, NodeKind, preceding_siblings};

/// Domain of the closest `trans_default_domain` declared before `node`.
///
/// Scopes are searched from the innermost outwards. In each scope only the
/// last declaration preceding the node counts: if its domain is a string
/// literal that value wins, otherwise the search moves to the enclosing scope.
/// Declarations nested inside earlier siblings (e.g. an `if` branch) are never
/// considered since branch conditions are not evaluated.
pub fn resolve_domain(ast: &Ast, node: NodeId) -> Option<String> {
    let mut current = node;
    while let Some(link) = ast.get(current)?.link() {
        if let Some(index) = link.index {
            let declaration = preceding_siblings(ast, link.parent, link.axis, index)
                .into_iter()
                .rev()
                .find_map(|id| match ast[id].kind {
                    NodeKind::TransDefaultDomainStatement { domain } => Some(domain),
                    _ => None,
                });
            if let Some(domain) = declaration
                && let Some(value) = ast.string_value(domain)
            {
                return Some(value.to_string());
            }
        }
        current = link.parent;
    }
    None
}
