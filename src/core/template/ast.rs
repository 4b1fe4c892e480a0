//! Arena-allocated Twig syntax tree.
//!
//! Nodes reference their children by [`NodeId`]. The parent/axis/index link of
//! each node is stored beside its kind, never inside it, so the structural
//! fields of a [`NodeKind`] describe the tree and nothing else.

use std::{fmt, ops::Index};

use crate::core::data::TextRange;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Name of the structural field a child hangs off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    Body,
    Test,
    Consequent,
    Alternate,
    Arguments,
    Vars,
    Domain,
    Locale,
    Count,
    Expression,
    Filter,
    Callee,
    Key,
    Value,
    Elements,
    Properties,
    Object,
    Property,
    Left,
    Right,
    Argument,
}

impl Axis {
    pub fn as_str(self) -> &'static str {
        match self {
            Axis::Body => "body",
            Axis::Test => "test",
            Axis::Consequent => "consequent",
            Axis::Alternate => "alternate",
            Axis::Arguments => "arguments",
            Axis::Vars => "vars",
            Axis::Domain => "domain",
            Axis::Locale => "locale",
            Axis::Count => "count",
            Axis::Expression => "expression",
            Axis::Filter => "filter",
            Axis::Callee => "callee",
            Axis::Key => "key",
            Axis::Value => "value",
            Axis::Elements => "elements",
            Axis::Properties => "properties",
            Axis::Object => "object",
            Axis::Property => "property",
            Axis::Left => "left",
            Axis::Right => "right",
            Axis::Argument => "argument",
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a node hangs in the tree: its parent, the field, and the index for list fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeLink {
    pub parent: NodeId,
    pub axis: Axis,
    pub index: Option<usize>,
}

/// Discriminant of [`NodeKind`], used by queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    Template,
    Text,
    Print,
    TransStatement,
    TransDefaultDomainStatement,
    IfStatement,
    GenericTag,
    StringLiteral,
    NumberLiteral,
    BooleanLiteral,
    NullLiteral,
    Identifier,
    ArrayExpression,
    ObjectExpression,
    ObjectProperty,
    MemberExpression,
    CallExpression,
    NamedArgument,
    FilterExpression,
    UnaryExpression,
    BinaryExpression,
    ConditionalExpression,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    // Statements
    Template {
        body: Vec<NodeId>,
    },
    Text {
        value: String,
    },
    /// `{{ expression }}`
    Print {
        expression: NodeId,
    },
    /// `{% trans with vars from domain into locale %}body{% endtrans %}`
    TransStatement {
        vars: Option<NodeId>,
        count: Option<NodeId>,
        domain: Option<NodeId>,
        locale: Option<NodeId>,
        body: Vec<NodeId>,
    },
    TransDefaultDomainStatement {
        domain: NodeId,
    },
    /// `elseif` branches are nested `IfStatement`s in `alternate`.
    IfStatement {
        test: Option<NodeId>,
        consequent: Vec<NodeId>,
        alternate: Vec<NodeId>,
    },
    /// Any other tag. `body` is empty for unpaired tags, `alternate` holds a `for ... else` branch.
    GenericTag {
        name: String,
        arguments: Vec<NodeId>,
        body: Vec<NodeId>,
        alternate: Vec<NodeId>,
    },

    // Expressions
    StringLiteral {
        value: String,
    },
    NumberLiteral {
        value: String,
    },
    BooleanLiteral {
        value: bool,
    },
    NullLiteral,
    Identifier {
        name: String,
    },
    ArrayExpression {
        elements: Vec<NodeId>,
    },
    ObjectExpression {
        properties: Vec<NodeId>,
    },
    ObjectProperty {
        key: NodeId,
        value: NodeId,
    },
    MemberExpression {
        object: NodeId,
        property: NodeId,
        computed: bool,
    },
    CallExpression {
        callee: NodeId,
        arguments: Vec<NodeId>,
    },
    NamedArgument {
        key: NodeId,
        value: NodeId,
    },
    /// `expression|filter`, where `filter` is an `Identifier` or a `CallExpression`.
    FilterExpression {
        expression: NodeId,
        filter: NodeId,
    },
    UnaryExpression {
        operator: String,
        argument: NodeId,
    },
    BinaryExpression {
        operator: String,
        left: NodeId,
        right: NodeId,
    },
    /// `test ? consequent : alternate`, `test ?: alternate` or `test ? consequent`.
    ConditionalExpression {
        test: NodeId,
        consequent: Option<NodeId>,
        alternate: Option<NodeId>,
    },
}

impl NodeKind {
    pub fn node_type(&self) -> NodeType {
        match self {
            NodeKind::Template { .. } => NodeType::Template,
            NodeKind::Text { .. } => NodeType::Text,
            NodeKind::Print { .. } => NodeType::Print,
            NodeKind::TransStatement { .. } => NodeType::TransStatement,
            NodeKind::TransDefaultDomainStatement { .. } => NodeType::TransDefaultDomainStatement,
            NodeKind::IfStatement { .. } => NodeType::IfStatement,
            NodeKind::GenericTag { .. } => NodeType::GenericTag,
            NodeKind::StringLiteral { .. } => NodeType::StringLiteral,
            NodeKind::NumberLiteral { .. } => NodeType::NumberLiteral,
            NodeKind::BooleanLiteral { .. } => NodeType::BooleanLiteral,
            NodeKind::NullLiteral => NodeType::NullLiteral,
            NodeKind::Identifier { .. } => NodeType::Identifier,
            NodeKind::ArrayExpression { .. } => NodeType::ArrayExpression,
            NodeKind::ObjectExpression { .. } => NodeType::ObjectExpression,
            NodeKind::ObjectProperty { .. } => NodeType::ObjectProperty,
            NodeKind::MemberExpression { .. } => NodeType::MemberExpression,
            NodeKind::CallExpression { .. } => NodeType::CallExpression,
            NodeKind::NamedArgument { .. } => NodeType::NamedArgument,
            NodeKind::FilterExpression { .. } => NodeType::FilterExpression,
            NodeKind::UnaryExpression { .. } => NodeType::UnaryExpression,
            NodeKind::BinaryExpression { .. } => NodeType::BinaryExpression,
            NodeKind::ConditionalExpression { .. } => NodeType::ConditionalExpression,
        }
    }

    /// Structural children in field order, with their axis and list index.
    pub fn children(&self) -> Vec<(Axis, Option<usize>, NodeId)> {
        let mut out = Vec::new();
        let mut one = |axis: Axis, id: &NodeId| out.push((axis, None, *id));
        match self {
            NodeKind::Print { expression } => one(Axis::Expression, expression),
            NodeKind::TransDefaultDomainStatement { domain } => one(Axis::Domain, domain),
            NodeKind::ObjectProperty { key, value } | NodeKind::NamedArgument { key, value } => {
                one(Axis::Key, key);
                one(Axis::Value, value);
            }
            NodeKind::MemberExpression {
                object, property, ..
            } => {
                one(Axis::Object, object);
                one(Axis::Property, property);
            }
            NodeKind::FilterExpression { expression, filter } => {
                one(Axis::Expression, expression);
                one(Axis::Filter, filter);
            }
            NodeKind::UnaryExpression { argument, .. } => one(Axis::Argument, argument),
            NodeKind::BinaryExpression { left, right, .. } => {
                one(Axis::Left, left);
                one(Axis::Right, right);
            }
            NodeKind::ConditionalExpression {
                test,
                consequent,
                alternate,
            } => {
                one(Axis::Test, test);
                if let Some(id) = consequent {
                    one(Axis::Consequent, id);
                }
                if let Some(id) = alternate {
                    one(Axis::Alternate, id);
                }
            }
            NodeKind::TransStatement {
                vars,
                count,
                domain,
                locale,
                ..
            } => {
                for (axis, field) in [
                    (Axis::Vars, vars),
                    (Axis::Count, count),
                    (Axis::Domain, domain),
                    (Axis::Locale, locale),
                ] {
                    if let Some(id) = field {
                        one(axis, id);
                    }
                }
            }
            NodeKind::IfStatement { test: Some(id), .. } => one(Axis::Test, id),
            NodeKind::CallExpression { callee, .. } => one(Axis::Callee, callee),
            _ => {}
        }

        let lists: Vec<(Axis, &Vec<NodeId>)> = match self {
            NodeKind::Template { body } => vec![(Axis::Body, body)],
            NodeKind::TransStatement { body, .. } => vec![(Axis::Body, body)],
            NodeKind::IfStatement {
                consequent,
                alternate,
                ..
            } => vec![(Axis::Consequent, consequent), (Axis::Alternate, alternate)],
            NodeKind::GenericTag {
                arguments,
                body,
                alternate,
                ..
            } => vec![
                (Axis::Arguments, arguments),
                (Axis::Body, body),
                (Axis::Alternate, alternate),
            ],
            NodeKind::ArrayExpression { elements } => vec![(Axis::Elements, elements)],
            NodeKind::ObjectExpression { properties } => vec![(Axis::Properties, properties)],
            NodeKind::CallExpression { arguments, .. } => vec![(Axis::Arguments, arguments)],
            _ => Vec::new(),
        };
        for (axis, ids) in lists {
            out.extend(ids.iter().enumerate().map(|(i, id)| (axis, Some(i), *id)));
        }
        out
    }

    /// Scalar attribute used by attribute predicates in queries.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        match (self, name) {
            (NodeKind::Identifier { name }, "name")
            | (NodeKind::GenericTag { name, .. }, "name") => Some(name.as_str()),
            (NodeKind::Text { value }, "value")
            | (NodeKind::StringLiteral { value }, "value")
            | (NodeKind::NumberLiteral { value }, "value") => Some(value.as_str()),
            (NodeKind::BooleanLiteral { value }, "value") => Some(if *value { "true" } else { "false" }),
            (NodeKind::UnaryExpression { operator, .. }, "operator")
            | (NodeKind::BinaryExpression { operator, .. }, "operator") => Some(operator.as_str()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub range: TextRange,
    link: Option<NodeLink>,
}

impl Node {
    pub fn node_type(&self) -> NodeType {
        self.kind.node_type()
    }

    pub fn link(&self) -> Option<NodeLink> {
        self.link
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.link.map(|link| link.parent)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ast {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Default for Ast {
    fn default() -> Self {
        Self::new()
    }
}

impl Ast {
    /// An arena holding only an empty template root.
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                kind: NodeKind::Template { body: Vec::new() },
                range: TextRange::default(),
                link: None,
            }],
            root: NodeId(0),
        }
    }

    pub fn alloc(&mut self, kind: NodeKind, range: TextRange) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            range,
            link: None,
        });
        id
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Fill in the template root once its body has been parsed.
    pub(crate) fn finish_root(&mut self, body: Vec<NodeId>, range: TextRange) {
        if let Some(root) = self.nodes.get_mut(self.root.0) {
            root.kind = NodeKind::Template { body };
            root.range = range;
        }
    }

    /// Give a generic tag the body that followed it, extending its range.
    pub(crate) fn adopt_body(&mut self, id: NodeId, inner: Vec<NodeId>, range: TextRange) {
        if let Some(node) = self.nodes.get_mut(id.0)
            && let NodeKind::GenericTag { body, .. } = &mut node.kind
        {
            *body = inner;
            node.range = range;
        }
    }

    pub(crate) fn set_link(&mut self, id: NodeId, link: Option<NodeLink>) {
        if let Some(node) = self.nodes.get_mut(id.0) {
            node.link = link;
        }
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All node ids in allocation order.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> + use<> {
        (0..self.nodes.len()).map(NodeId)
    }

    /// Value of a `StringLiteral` node.
    pub fn string_value(&self, id: NodeId) -> Option<&str> {
        match &self.get(id)?.kind {
            NodeKind::StringLiteral { value } => Some(value.as_str()),
            _ => None,
        }
    }
}

impl Index<NodeId> for Ast {
    type Output = Node;

    fn index(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }
}
