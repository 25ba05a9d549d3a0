//! Visitor pattern for arena traversal
//!
//! Provides a clean interface for walking an [`ExprTree`] without manually
//! handling the child layout of each node kind.

use crate::expr::Parameter;
use crate::tree::{ExprTree, NodeId, NodeKind};

/// Trait for visiting arena nodes
///
/// Each method returns a boolean indicating whether to continue visiting children.
/// `visit_node` receives every non-elementary node. All methods default to
/// continuing, so implementors only override the categories they care about.
///
/// # Example
/// ```
/// use bioexpr::{Expr, ExprTree, NodeVisitor, walk_tree};
///
/// #[derive(Default)]
/// struct VariableCounter { count: usize }
///
/// impl NodeVisitor for VariableCounter {
///     fn visit_variable(&mut self, _id: bioexpr::NodeId, _name: &str) -> bool {
///         self.count += 1;
///         true
///     }
/// }
///
/// let x = Expr::variable("x").unwrap();
/// let tree = ExprTree::from_expr(x.clone() * x);
/// let mut counter = VariableCounter::default();
/// walk_tree(&tree, tree.roots()[0], &mut counter);
/// assert_eq!(counter.count, 2);
/// ```
pub trait NodeVisitor {
    /// Visit a numeric literal or an operator, returns true to visit its children
    fn visit_node(&mut self, _id: NodeId, _kind: &NodeKind) -> bool {
        true
    }

    fn visit_beta(&mut self, _id: NodeId, _param: &Parameter) -> bool {
        true
    }

    fn visit_variable(&mut self, _id: NodeId, _name: &str) -> bool {
        true
    }

    fn visit_random_variable(&mut self, _id: NodeId, _name: &str) -> bool {
        true
    }

    fn visit_draws(&mut self, _id: NodeId, _name: &str, _draw_type: &str) -> bool {
        true
    }
}

/// Walk the subtree rooted at `id` with a visitor
///
/// Visits nodes in pre-order (parent before children, children in order).
pub fn walk_tree<V: NodeVisitor + ?Sized>(tree: &ExprTree, id: NodeId, visitor: &mut V) {
    let node = tree.node(id);
    let descend = match node.kind() {
        NodeKind::Beta(p) => visitor.visit_beta(id, p),
        NodeKind::Variable(name) => visitor.visit_variable(id, name),
        NodeKind::RandomVariable(name) => visitor.visit_random_variable(id, name),
        NodeKind::Draws { name, draw_type } => visitor.visit_draws(id, name, draw_type),
        kind => visitor.visit_node(id, kind),
    };
    if descend {
        for &c in node.children() {
            walk_tree(tree, c, visitor);
        }
    }
}

/// A simple visitor that counts nodes
#[derive(Default)]
pub struct NodeCounter {
    pub count: usize,
}

impl NodeVisitor for NodeCounter {
    fn visit_node(&mut self, _id: NodeId, _kind: &NodeKind) -> bool {
        self.count += 1;
        true
    }

    fn visit_beta(&mut self, _id: NodeId, _param: &Parameter) -> bool {
        self.count += 1;
        true
    }

    fn visit_variable(&mut self, _id: NodeId, _name: &str) -> bool {
        self.count += 1;
        true
    }

    fn visit_random_variable(&mut self, _id: NodeId, _name: &str) -> bool {
        self.count += 1;
        true
    }

    fn visit_draws(&mut self, _id: NodeId, _name: &str, _draw_type: &str) -> bool {
        self.count += 1;
        true
    }
}
