// Display formatting for arena nodes
use std::fmt;

use super::{ExprTree, NodeId, NodeKind};

/// Display adapter returned by [`ExprTree::display`]
pub struct NodeDisplay<'a> {
    tree: &'a ExprTree,
    id: NodeId,
}

impl<'a> NodeDisplay<'a> {
    pub(super) fn new(tree: &'a ExprTree, id: NodeId) -> Self {
        NodeDisplay { tree, id }
    }

    fn child(&self, id: NodeId) -> NodeDisplay<'a> {
        NodeDisplay::new(self.tree, id)
    }
}

impl fmt::Display for NodeDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let node = self.tree.node(self.id);
        let children = &node.children;
        match &node.kind {
            NodeKind::Numeric(v) => write!(f, "`{}`", v),
            NodeKind::Beta(p) => write!(f, "{}({})", p.name(), p.init_value()),
            NodeKind::Variable(name) | NodeKind::RandomVariable(name) => write!(f, "{}", name),
            NodeKind::Draws { name, draw_type } => {
                write!(f, "bioDraws(\"{}\", \"{}\")", name, draw_type)
            }

            NodeKind::Binary(op) => {
                let (l, r) = (self.child(children[0]), self.child(children[1]));
                match op.infix() {
                    Some(sym) => write!(f, "({} {} {})", l, sym, r),
                    None => write!(f, "{}({}, {})", op.class_name(), l, r),
                }
            }

            NodeKind::Unary(op) => {
                let c = self.child(children[0]);
                match op {
                    crate::UnaryOp::Neg => write!(f, "(-{})", c),
                    _ => write!(f, "{}({})", op.class_name(), c),
                }
            }

            NodeKind::Derive(name) => write!(f, "Derive({}, \"{}\")", self.child(children[0]), name),
            NodeKind::Integrate(name) => {
                write!(f, "Integrate({}, \"{}\")", self.child(children[0]), name)
            }

            NodeKind::MultSum => {
                let terms: Vec<String> = children.iter().map(|&c| self.child(c).to_string()).collect();
                write!(f, "bioMultSum({})", terms.join(", "))
            }

            NodeKind::Elem { keys } => {
                let entries: Vec<String> = keys
                    .iter()
                    .zip(&children[1..])
                    .map(|(k, &c)| format!("{}:{}", k, self.child(c)))
                    .collect();
                write!(f, "{{{{{}}}}}[{}]", entries.join(", "), self.child(children[0]))
            }

            NodeKind::LinearUtility { terms } => {
                let (betas, variables) = children.split_at(*terms);
                let parts: Vec<String> = betas
                    .iter()
                    .zip(variables)
                    .map(|(&b, &x)| format!("{} * {}", self.child(b), self.child(x)))
                    .collect();
                write!(f, "{}", parts.join(" + "))
            }

            NodeKind::LogLogit { util_keys, .. } => {
                let utils = &children[1..=util_keys.len()];
                let parts: Vec<String> = util_keys
                    .iter()
                    .zip(utils)
                    .map(|(k, &u)| format!("{}:{}", k, self.child(u)))
                    .collect();
                write!(f, "LogLogit({})", parts.join(", "))
            }
        }
    }
}
