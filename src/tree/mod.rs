//! Arena representation of expression trees.
//!
//! [`ExprTree`] stores the nodes of one or more expressions in a `SlotMap`.
//! A node owns its children through their handles; the `parent` field is a
//! plain handle used for "is contained in" queries and never owns anything.
//! The handle of a node doubles as its identity token in wire records.
//!
//! Several roots can live in the same arena. They are numbered together, so
//! a symbol appearing in two of them gets the same indices.

mod display;

use rustc_hash::FxHashMap;
use slotmap::{new_key_type, Key, SlotMap};

use crate::expr::{BinaryOp, Expr, ExprKind, Parameter, UnaryOp};

pub use display::NodeDisplay;

new_key_type! {
    /// Handle of a node in an [`ExprTree`]
    pub struct NodeId;
}

impl NodeId {
    /// Identity token of the node, unique within its arena
    #[inline]
    pub fn token(self) -> u64 {
        self.data().as_ffi()
    }
}

/// The kind of an arena node. Children are stored on the [`Node`].
///
/// Child layout per kind:
/// - `Binary`: `[left, right]`
/// - `Unary`, `Derive`, `Integrate`: `[child]`
/// - `Elem`: `[key, entry for keys[0], entry for keys[1], ...]`
/// - `LinearUtility`: `[beta_0, .., beta_n-1, variable_0, .., variable_n-1]`
/// - `LogLogit`: `[choice, util for util_keys.., av for av_keys..]`
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Numeric(f64),
    Beta(Parameter),
    Variable(String),
    RandomVariable(String),
    Draws { name: String, draw_type: String },
    Binary(BinaryOp),
    Unary(UnaryOp),
    Derive(String),
    Integrate(String),
    MultSum,
    Elem { keys: Vec<i64> },
    LinearUtility { terms: usize },
    LogLogit {
        util_keys: Vec<i64>,
        av_keys: Vec<i64>,
        full_choice_set: bool,
    },
}

impl NodeKind {
    /// Kind name used in wire records
    pub fn class_name(&self) -> &'static str {
        match self {
            NodeKind::Numeric(_) => "Numeric",
            NodeKind::Beta(_) => "Beta",
            NodeKind::Variable(_) => "Variable",
            NodeKind::RandomVariable(_) => "RandomVariable",
            NodeKind::Draws { .. } => "bioDraws",
            NodeKind::Binary(op) => op.class_name(),
            NodeKind::Unary(op) => op.class_name(),
            NodeKind::Derive(_) => "Derive",
            NodeKind::Integrate(_) => "Integrate",
            NodeKind::MultSum => "bioMultSum",
            NodeKind::Elem { .. } => "Elem",
            NodeKind::LinearUtility { .. } => "bioLinearUtility",
            NodeKind::LogLogit {
                full_choice_set: true,
                ..
            } => "_bioLogLogitFullChoiceSet",
            NodeKind::LogLogit { .. } => "LogLogit",
        }
    }

    /// Name of the symbol if this is an elementary node
    pub fn elementary_name(&self) -> Option<&str> {
        match self {
            NodeKind::Beta(p) => Some(p.name()),
            NodeKind::Variable(name) | NodeKind::RandomVariable(name) => Some(name),
            NodeKind::Draws { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn is_monte_carlo(&self) -> bool {
        matches!(self, NodeKind::Unary(UnaryOp::MonteCarlo))
    }

    pub fn is_panel_trajectory(&self) -> bool {
        matches!(self, NodeKind::Unary(UnaryOp::PanelTrajectory))
    }

    pub fn is_draws(&self) -> bool {
        matches!(self, NodeKind::Draws { .. })
    }

    pub fn is_integrate(&self) -> bool {
        matches!(self, NodeKind::Integrate(_))
    }

    pub fn is_random_variable(&self) -> bool {
        matches!(self, NodeKind::RandomVariable(_))
    }

    pub fn is_variable(&self) -> bool {
        matches!(self, NodeKind::Variable(_))
    }
}

/// A node of the arena
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) kind: NodeKind,
    pub(crate) children: Vec<NodeId>,
    pub(crate) parent: Option<NodeId>,
}

impl Node {
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }
}

/// Arena holding one or more expression trees
#[derive(Debug, Clone, Default)]
pub struct ExprTree {
    nodes: SlotMap<NodeId, Node>,
    roots: Vec<NodeId>,
}

impl ExprTree {
    /// Create an empty arena
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an arena holding a single expression
    pub fn from_expr(expr: Expr) -> Self {
        let mut tree = Self::new();
        tree.add_root(expr);
        tree
    }

    /// Move an expression into the arena as a new root and return its handle
    pub fn add_root(&mut self, expr: Expr) -> NodeId {
        let root = self.lower(expr, None);
        self.roots.push(root);
        root
    }

    /// Roots in insertion order
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Total number of nodes across all roots
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Access a node.
    ///
    /// # Panics
    /// Panics if `id` does not belong to this arena.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    /// Access a node if the handle belongs to this arena
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id].kind
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id].children
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].parent
    }

    fn insert(&mut self, kind: NodeKind, parent: Option<NodeId>) -> NodeId {
        self.nodes.insert(Node {
            kind,
            children: Vec::new(),
            parent,
        })
    }

    fn lower(&mut self, expr: Expr, parent: Option<NodeId>) -> NodeId {
        match expr.kind {
            ExprKind::Numeric(v) => self.insert(NodeKind::Numeric(v), parent),
            ExprKind::Beta(p) => self.insert(NodeKind::Beta(p), parent),
            ExprKind::Variable(name) => self.insert(NodeKind::Variable(name), parent),
            ExprKind::RandomVariable(name) => self.insert(NodeKind::RandomVariable(name), parent),
            ExprKind::Draws { name, draw_type } => {
                self.insert(NodeKind::Draws { name, draw_type }, parent)
            }
            ExprKind::Binary(op, left, right) => {
                let id = self.insert(NodeKind::Binary(op), parent);
                let l = self.lower(*left, Some(id));
                let r = self.lower(*right, Some(id));
                self.nodes[id].children = vec![l, r];
                id
            }
            ExprKind::Unary(op, child) => {
                let id = self.insert(NodeKind::Unary(op), parent);
                let c = self.lower(*child, Some(id));
                self.nodes[id].children = vec![c];
                id
            }
            ExprKind::Derive { child, name } => {
                let id = self.insert(NodeKind::Derive(name), parent);
                let c = self.lower(*child, Some(id));
                self.nodes[id].children = vec![c];
                id
            }
            ExprKind::Integrate { child, name } => {
                let id = self.insert(NodeKind::Integrate(name), parent);
                let c = self.lower(*child, Some(id));
                self.nodes[id].children = vec![c];
                id
            }
            ExprKind::MultSum(terms) => {
                let id = self.insert(NodeKind::MultSum, parent);
                let children = terms
                    .into_iter()
                    .map(|t| self.lower(t, Some(id)))
                    .collect();
                self.nodes[id].children = children;
                id
            }
            ExprKind::Elem { entries, key } => {
                let keys: Vec<i64> = entries.keys().copied().collect();
                let id = self.insert(NodeKind::Elem { keys }, parent);
                let mut children = Vec::with_capacity(entries.len() + 1);
                children.push(self.lower(*key, Some(id)));
                for entry in entries.into_values() {
                    children.push(self.lower(entry, Some(id)));
                }
                self.nodes[id].children = children;
                id
            }
            ExprKind::LinearUtility(terms) => {
                let id = self.insert(
                    NodeKind::LinearUtility { terms: terms.len() },
                    parent,
                );
                let (betas, variables): (Vec<_>, Vec<_>) =
                    terms.into_iter().map(|t| (t.beta, t.variable)).unzip();
                let mut children = Vec::with_capacity(betas.len() * 2);
                for beta in betas {
                    children.push(self.insert(NodeKind::Beta(beta), Some(id)));
                }
                for variable in variables {
                    children.push(self.insert(NodeKind::Variable(variable), Some(id)));
                }
                self.nodes[id].children = children;
                id
            }
            ExprKind::LogLogit {
                util,
                av,
                choice,
                full_choice_set,
            } => {
                let util_keys: Vec<i64> = util.keys().copied().collect();
                let av_keys: Vec<i64> = av.keys().copied().collect();
                let kind = NodeKind::LogLogit {
                    util_keys,
                    av_keys,
                    full_choice_set,
                };
                let id = self.insert(kind, parent);
                let mut children = Vec::with_capacity(util.len() + av.len() + 1);
                children.push(self.lower(*choice, Some(id)));
                for u in util.into_values() {
                    children.push(self.lower(u, Some(id)));
                }
                for a in av.into_values() {
                    children.push(self.lower(a, Some(id)));
                }
                self.nodes[id].children = children;
                id
            }
        }
    }

    // -------------------------------------------------------------------------
    // Structural queries
    // -------------------------------------------------------------------------

    /// Number of nodes in the subtree rooted at `id`
    pub fn subtree_size(&self, id: NodeId) -> usize {
        1 + self.nodes[id]
            .children
            .iter()
            .map(|&c| self.subtree_size(c))
            .sum::<usize>()
    }

    /// Check if the subtree rooted at `id` (itself included) contains a node matching `pred`
    pub fn embeds<F>(&self, id: NodeId, pred: F) -> bool
    where
        F: Fn(&NodeKind) -> bool + Copy,
    {
        if pred(&self.nodes[id].kind) {
            return true;
        }
        self.nodes[id]
            .children
            .iter()
            .any(|&c| self.embeds(c, pred))
    }

    /// Check if a strict ancestor of `id` matches `pred`
    pub fn is_contained_in<F>(&self, id: NodeId, pred: F) -> bool
    where
        F: Fn(&NodeKind) -> bool,
    {
        let mut current = self.nodes[id].parent;
        while let Some(p) = current {
            if pred(&self.nodes[p].kind) {
                return true;
            }
            current = self.nodes[p].parent;
        }
        false
    }

    /// Number of panel-trajectory operators in the subtree rooted at `id`
    pub fn count_panel_trajectories(&self, id: NodeId) -> usize {
        let own = usize::from(self.nodes[id].kind.is_panel_trajectory());
        own + self.nodes[id]
            .children
            .iter()
            .map(|&c| self.count_panel_trajectories(c))
            .sum::<usize>()
    }

    /// Check if evaluating `id` requires Monte-Carlo draws
    pub fn requires_draws(&self, id: NodeId) -> bool {
        self.embeds(id, NodeKind::is_monte_carlo)
    }

    /// First elementary node named `name` under `id`, in pre-order
    pub fn get_elementary(&self, id: NodeId, name: &str) -> Option<NodeId> {
        if self.nodes[id].kind.elementary_name() == Some(name) {
            return Some(id);
        }
        self.nodes[id]
            .children
            .iter()
            .find_map(|&c| self.get_elementary(c, name))
    }

    /// Overwrite the initial value of every parameter whose name is in `values`.
    ///
    /// Free and fixed parameters are treated alike.
    pub fn change_init_values(&mut self, values: &FxHashMap<String, f64>) {
        for node in self.nodes.values_mut() {
            if let NodeKind::Beta(param) = &mut node.kind {
                if let Some(&v) = values.get(param.name()) {
                    param.init_value = v;
                }
            }
        }
    }

    /// Handles of the subtree rooted at `id` in post-order (children before parents)
    pub fn post_order(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(self.nodes.len());
        self.post_order_into(id, &mut out);
        out
    }

    fn post_order_into(&self, id: NodeId, out: &mut Vec<NodeId>) {
        for &c in &self.nodes[id].children {
            self.post_order_into(c, out);
        }
        out.push(id);
    }

    /// Display adapter for the subtree rooted at `id`
    pub fn display(&self, id: NodeId) -> NodeDisplay<'_> {
        NodeDisplay::new(self, id)
    }
}
