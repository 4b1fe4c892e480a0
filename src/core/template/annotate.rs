use super::ast::{Ast, NodeLink};

/// Record on every node its parent, the field it hangs off and its list index.
///
/// The root gets no link. Uses an explicit stack so deeply nested templates
/// cannot overflow.
pub fn annotate(ast: &mut Ast) {
    let root = ast.root();
    ast.set_link(root, None);

    let mut stack = vec![root];
    while let Some(parent) = stack.pop() {
        for (axis, index, child) in ast[parent].kind.children() {
            ast.set_link(
                child,
                Some(NodeLink {
                    parent,
                    axis,
                    index,
                }),
            );
            stack.push(child);
        }
    }
}
