//! Symbolic expressions for discrete choice models
//!
//! Builds the formulas of a choice model (typically a log-likelihood), checks
//! them, and hands them to an external evaluation engine as a flat sequence
//! of text records.
//!
//! # Features
//! - **Expression building** with operator overloading and constructors for
//!   choice-model operators (logit, keyed selection, linear utilities)
//! - **Arena representation** with stable node handles and parent links
//! - **Symbol numbering** shared by every formula of a session
//! - **Audit** of nesting rules and data compatibility
//! - **Signature emission** for the evaluation engine
//! - **Local interpretation** of formulas without data dependency
//! - **Builder pattern API** for evaluation sessions
//!
//! # Usage
//! ```
//! use std::collections::BTreeMap;
//! use bioexpr::{Expr, ExprTree, Interpreter, Numbering, ParamStatus, signature};
//!
//! let asc = Expr::beta("ASC", 0.5, None, None, ParamStatus::Free).unwrap();
//! let mut util = BTreeMap::new();
//! util.insert(1, Expr::numeric(0.0));
//! util.insert(2, asc);
//! let loglike = Expr::log_logit::<Expr, Expr>(util, None, 2);
//!
//! let mut tree = ExprTree::new();
//! let root = tree.add_root(loglike);
//!
//! let numbering = Numbering::build(&tree, &[]).unwrap();
//! let records = signature(&tree, root, &numbering).unwrap();
//! assert!(records.last().unwrap().starts_with("<LogLogit>"));
//!
//! let value = Interpreter::new(&tree).evaluate(root).unwrap();
//! assert!(value < 0.0);
//! ```

mod audit;
mod builder;
mod dataset;
mod engine;
mod error;
mod expr;
mod interpreter;
pub(crate) mod math;
mod registry;
mod signature;
mod tree;
pub mod visitor;

#[cfg(test)]
mod tests;

// Re-export key types for easier usage
pub use audit::{audit, audit_all, AuditReport};
pub use builder::{Evaluation, Prepared, DEFAULT_MISSING_DATA, DEFAULT_NUMBER_OF_DRAWS};
pub use dataset::{Dataset, Draws, MemoryDataset, PanelMap, NORMAL, UNIFORM, UNIFORMSYM};
pub use engine::{Derivatives, EvaluationEngine, EvaluationRequest, EvaluationResults};
pub use error::{ExprError, SymbolCategory};
pub use expr::{BinaryOp, Expr, ExprKind, LinearTerm, ParamStatus, Parameter, UnaryOp};
pub use interpreter::Interpreter;
pub use registry::{Numbering, SymbolIndex};
pub use signature::{signature, signatures};
pub use tree::{ExprTree, Node, NodeDisplay, NodeId, NodeKind};
pub use visitor::{walk_tree, NodeCounter, NodeVisitor};
