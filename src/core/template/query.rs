//! Structural queries over an annotated [`Ast`].

use super::ast::{Ast, Axis, NodeId, NodeType};

/// Node type plus attribute predicates, e.g. an `Identifier` whose `name` is `trans`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    pub node_type: NodeType,
    pub attributes: Vec<(&'static str, String)>,
}

impl Selector {
    pub fn new(node_type: NodeType) -> Self {
        Self {
            node_type,
            attributes: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.attributes.push((name, value.into()));
        self
    }

    pub fn matches(&self, ast: &Ast, id: NodeId) -> bool {
        let Some(node) = ast.get(id) else {
            return false;
        };
        node.node_type() == self.node_type
            && self
                .attributes
                .iter()
                .all(|(name, value)| node.kind.attribute(name) == Some(value.as_str()))
    }
}

/// All nodes below `start` matching `selector`, in document order. `start` itself is excluded.
pub fn descendants(ast: &Ast, start: NodeId, selector: &Selector) -> Vec<NodeId> {
    let mut found = Vec::new();
    let Some(node) = ast.get(start) else {
        return found;
    };

    let mut stack: Vec<NodeId> = node
        .kind
        .children()
        .into_iter()
        .rev()
        .map(|(_, _, id)| id)
        .collect();
    while let Some(id) = stack.pop() {
        if selector.matches(ast, id) {
            found.push(id);
        }
        stack.extend(ast[id].kind.children().into_iter().rev().map(|(_, _, id)| id));
    }
    found
}

/// Children of `ancestor` under `axis` with a list index strictly below `cutoff`, in order.
pub fn preceding_siblings(ast: &Ast, ancestor: NodeId, axis: Axis, cutoff: usize) -> Vec<NodeId> {
    let Some(node) = ast.get(ancestor) else {
        return Vec::new();
    };
    node.kind
        .children()
        .into_iter()
        .filter(|(child_axis, index, _)| {
            *child_axis == axis && index.is_some_and(|index| index < cutoff)
        })
        .map(|(_, _, id)| id)
        .collect()
}
