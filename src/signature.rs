//! Signature emission: the wire format read by the evaluation engine.
//!
//! A tree is linearized in post-order into text records, one per node. Each
//! record names the node kind, carries the node's identity token between
//! braces and refers to its children by their tokens. Children are always
//! emitted before their parent, so the engine can rebuild the tree with a
//! single forward pass.
//!
//! ```text
//! <Beta>{4294967297}"beta1"[0],0,0
//! <Variable>{4294967298}"x",3,0
//! <Times>{4294967299}(2),4294967297,4294967298
//! ```

use std::fmt::Write;

use crate::registry::{Numbering, SymbolIndex};
use crate::tree::{ExprTree, NodeId, NodeKind};
use crate::ExprError;

/// Emit the signature of the subtree rooted at `root`.
///
/// # Errors
/// `MissingIndex` if an elementary node, or the target of a `Derive` or
/// `Integrate` node, has not been numbered.
pub fn signature(
    tree: &ExprTree,
    root: NodeId,
    numbering: &Numbering,
) -> Result<Vec<String>, ExprError> {
    tree.post_order(root)
        .into_iter()
        .map(|id| record(tree, id, numbering))
        .collect()
}

/// Emit the signatures of every root of `tree`, one sequence per root
pub fn signatures(tree: &ExprTree, numbering: &Numbering) -> Result<Vec<Vec<String>>, ExprError> {
    tree.roots()
        .iter()
        .map(|&root| signature(tree, root, numbering))
        .collect()
}

fn index(numbering: &Numbering, id: NodeId, name: &str) -> Result<SymbolIndex, ExprError> {
    numbering.index_of(id).ok_or_else(|| ExprError::MissingIndex {
        name: name.to_string(),
    })
}

fn record(tree: &ExprTree, id: NodeId, numbering: &Numbering) -> Result<String, ExprError> {
    let node = tree.node(id);
    let children = node.children();
    let kind = node.kind();
    let mut s = format!("<{}>{{{}}}", kind.class_name(), id.token());

    // Writing into a String cannot fail
    match kind {
        NodeKind::Numeric(v) => {
            let _ = write!(s, ",{}", v);
        }
        NodeKind::Beta(p) => {
            let idx = index(numbering, id, p.name())?;
            let _ = write!(
                s,
                "\"{}\"[{}],{},{}",
                p.name(),
                p.status().code(),
                idx.unique_id,
                idx.specific
            );
        }
        NodeKind::Variable(name)
        | NodeKind::RandomVariable(name)
        | NodeKind::Draws { name, .. } => {
            let idx = index(numbering, id, name)?;
            let _ = write!(s, "\"{}\",{},{}", name, idx.unique_id, idx.specific);
        }
        NodeKind::Derive(name) => {
            let target = numbering
                .derive_target(id)
                .ok_or_else(|| ExprError::MissingIndex { name: name.clone() })?;
            let _ = write!(s, ",{},{}", children[0].token(), target);
        }
        NodeKind::Integrate(name) => {
            let target = numbering
                .integrate_target(id)
                .ok_or_else(|| ExprError::MissingIndex { name: name.clone() })?;
            let _ = write!(s, ",{},{}", children[0].token(), target);
        }
        NodeKind::Elem { keys } => {
            let _ = write!(s, "({}),{}", keys.len(), children[0].token());
            for (k, c) in keys.iter().zip(&children[1..]) {
                let _ = write!(s, ",{},{}", k, c.token());
            }
        }
        NodeKind::LinearUtility { terms } => {
            let _ = write!(s, "({})", terms);
            let (betas, variables) = children.split_at(*terms);
            for (&b, &x) in betas.iter().zip(variables) {
                let (b_name, x_name) = match (tree.kind(b), tree.kind(x)) {
                    (NodeKind::Beta(p), NodeKind::Variable(v)) => (p.name(), v.as_str()),
                    _ => continue,
                };
                let b_idx = index(numbering, b, b_name)?;
                let x_idx = index(numbering, x, x_name)?;
                let _ = write!(
                    s,
                    ",{},{},{},{},{},{}",
                    b.token(),
                    b_idx.unique_id,
                    b_name,
                    x.token(),
                    x_idx.unique_id,
                    x_name
                );
            }
        }
        NodeKind::LogLogit {
            util_keys, av_keys, ..
        } => {
            let utils = &children[1..=util_keys.len()];
            let avs = &children[util_keys.len() + 1..];
            let _ = write!(s, "({}),{}", util_keys.len(), children[0].token());
            for (k, u) in util_keys.iter().zip(utils) {
                let av = av_keys
                    .iter()
                    .position(|a| a == k)
                    .map(|pos| avs[pos])
                    .ok_or_else(|| ExprError::KeyNotFound {
                        key: *k,
                        available: av_keys.clone(),
                    })?;
                let _ = write!(s, ",{},{},{}", k, u.token(), av.token());
            }
        }
        NodeKind::Binary(_) | NodeKind::Unary(_) | NodeKind::MultSum => {
            let _ = write!(s, "({})", children.len());
            for c in children {
                let _ = write!(s, ",{}", c.token());
            }
        }
    }
    Ok(s)
}
