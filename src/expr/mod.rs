//! Expression construction tree.
//!
//! This module defines:
//! - `Expr` - an owned expression built by composition
//! - `ExprKind` - the closed set of node variants
//! - `BinaryOp` / `UnaryOp` - operator tags shared with the arena representation
//! - `Parameter` - a named scalar with initial value, bounds and status
//!
//! # Architecture
//!
//! An `Expr` owns its children. Composition consumes its operands, so a
//! subtree can never be shared between two parents: using the same parameter
//! twice means building (or cloning) two nodes with the same name. Before an
//! expression is numbered, audited or emitted it is lowered into an
//! [`ExprTree`](crate::ExprTree) arena, where every node gets a handle and a
//! non-owning parent link.
//!
//! # Usage
//!
//! ```
//! use bioexpr::Expr;
//!
//! let asc = Expr::beta("ASC_CAR", 0.0, None, None, bioexpr::ParamStatus::Free).unwrap();
//! let time = Expr::variable("CAR_TT").unwrap();
//! let b_time = Expr::beta("B_TIME", 0.0, None, Some(0.0), bioexpr::ParamStatus::Free).unwrap();
//! let v = asc + b_time * time;
//! ```

mod constructors;
mod ops;

use std::collections::BTreeMap;
use std::fmt;

use crate::tree::ExprTree;

/// Status of a parameter: estimated by the optimizer or held at its initial value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ParamStatus {
    #[default]
    Free,
    Fixed,
}

impl ParamStatus {
    /// Integer code used on the wire (0 = free, 1 = fixed)
    pub fn code(self) -> u8 {
        match self {
            ParamStatus::Free => 0,
            ParamStatus::Fixed => 1,
        }
    }
}

/// A named model parameter.
///
/// Bounds are advisory metadata for the optimizer and are not checked here.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub(crate) name: String,
    pub(crate) init_value: f64,
    pub(crate) lower: Option<f64>,
    pub(crate) upper: Option<f64>,
    pub(crate) status: ParamStatus,
}

impl Parameter {
    /// Create a free parameter without bounds
    pub fn new(name: impl Into<String>, init_value: f64) -> Result<Self, crate::ExprError> {
        let name = constructors::validate_name(name.into())?;
        if !init_value.is_finite() {
            return Err(crate::ExprError::InvalidValue {
                name,
                value: init_value,
            });
        }
        Ok(Parameter {
            name,
            init_value,
            lower: None,
            upper: None,
            status: ParamStatus::Free,
        })
    }

    /// Set the lower bound
    pub fn lower_bound(mut self, bound: f64) -> Self {
        self.lower = Some(bound);
        self
    }

    /// Set the upper bound
    pub fn upper_bound(mut self, bound: f64) -> Self {
        self.upper = Some(bound);
        self
    }

    /// Hold the parameter at its initial value during estimation
    pub fn fixed(mut self) -> Self {
        self.status = ParamStatus::Fixed;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn init_value(&self) -> f64 {
        self.init_value
    }

    pub fn lower(&self) -> Option<f64> {
        self.lower
    }

    pub fn upper(&self) -> Option<f64> {
        self.upper
    }

    pub fn status(&self) -> ParamStatus {
        self.status
    }

    pub fn is_free(&self) -> bool {
        self.status == ParamStatus::Free
    }
}

/// Binary operators. Logical and relational operators evaluate to 0.0 or 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Plus,
    Minus,
    Times,
    Divide,
    Power,
    Min,
    Max,
    And,
    Or,
    Equal,
    NotEqual,
    LessOrEqual,
    GreaterOrEqual,
    Less,
    Greater,
}

impl BinaryOp {
    /// Kind name used in wire records
    pub fn class_name(self) -> &'static str {
        match self {
            BinaryOp::Plus => "Plus",
            BinaryOp::Minus => "Minus",
            BinaryOp::Times => "Times",
            BinaryOp::Divide => "Divide",
            BinaryOp::Power => "Power",
            BinaryOp::Min => "bioMin",
            BinaryOp::Max => "bioMax",
            BinaryOp::And => "And",
            BinaryOp::Or => "Or",
            BinaryOp::Equal => "Equal",
            BinaryOp::NotEqual => "NotEqual",
            BinaryOp::LessOrEqual => "LessOrEqual",
            BinaryOp::GreaterOrEqual => "GreaterOrEqual",
            BinaryOp::Less => "Less",
            BinaryOp::Greater => "Greater",
        }
    }

    /// Infix symbol for display; `None` for function-style operators (min, max)
    pub fn infix(self) -> Option<&'static str> {
        match self {
            BinaryOp::Plus => Some("+"),
            BinaryOp::Minus => Some("-"),
            BinaryOp::Times => Some("*"),
            BinaryOp::Divide => Some("/"),
            BinaryOp::Power => Some("**"),
            BinaryOp::And => Some("and"),
            BinaryOp::Or => Some("or"),
            BinaryOp::Equal => Some("=="),
            BinaryOp::NotEqual => Some("!="),
            BinaryOp::LessOrEqual => Some("<="),
            BinaryOp::GreaterOrEqual => Some(">="),
            BinaryOp::Less => Some("<"),
            BinaryOp::Greater => Some(">"),
            BinaryOp::Min | BinaryOp::Max => None,
        }
    }

    /// Apply the operator to two floating-point operands
    pub fn apply(self, left: f64, right: f64) -> f64 {
        let truth = |b: bool| if b { 1.0 } else { 0.0 };
        match self {
            BinaryOp::Plus => left + right,
            BinaryOp::Minus => left - right,
            BinaryOp::Times => left * right,
            BinaryOp::Divide => left / right,
            BinaryOp::Power => left.powf(right),
            BinaryOp::Min => left.min(right),
            BinaryOp::Max => left.max(right),
            BinaryOp::And => truth(left != 0.0 && right != 0.0),
            BinaryOp::Or => truth(left != 0.0 || right != 0.0),
            BinaryOp::Equal => truth(left == right),
            BinaryOp::NotEqual => truth(left != right),
            BinaryOp::LessOrEqual => truth(left <= right),
            BinaryOp::GreaterOrEqual => truth(left >= right),
            BinaryOp::Less => truth(left < right),
            BinaryOp::Greater => truth(left > right),
        }
    }
}

/// Unary operators without extra payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Neg,
    Exp,
    Log,
    NormalCdf,
    /// Monte-Carlo integration over the draws of the child
    MonteCarlo,
    /// Likelihood of the sequence of observations of one individual
    PanelTrajectory,
}

impl UnaryOp {
    /// Kind name used in wire records
    pub fn class_name(self) -> &'static str {
        match self {
            UnaryOp::Neg => "UnaryMinus",
            UnaryOp::Exp => "exp",
            UnaryOp::Log => "log",
            UnaryOp::NormalCdf => "bioNormalCdf",
            UnaryOp::MonteCarlo => "MonteCarlo",
            UnaryOp::PanelTrajectory => "PanelLikelihoodTrajectory",
        }
    }
}

/// One `(parameter, variable)` pair of a linear utility
#[derive(Debug, Clone, PartialEq)]
pub struct LinearTerm {
    pub(crate) beta: Parameter,
    pub(crate) variable: String,
}

impl LinearTerm {
    pub fn beta(&self) -> &Parameter {
        &self.beta
    }

    pub fn variable(&self) -> &str {
        &self.variable
    }
}

/// An owned expression
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub(crate) kind: ExprKind,
}

impl std::ops::Deref for Expr {
    type Target = ExprKind;

    fn deref(&self) -> &Self::Target {
        &self.kind
    }
}

/// The kind (structure) of an expression node
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// Literal number
    Numeric(f64),

    /// Parameter (free or fixed)
    Beta(Parameter),

    /// Reference to a dataset column
    Variable(String),

    /// Symbol for deterministic numerical integration
    RandomVariable(String),

    /// Symbol bound to a series of Monte-Carlo draws of the given type
    Draws { name: String, draw_type: String },

    Binary(BinaryOp, Box<Expr>, Box<Expr>),

    Unary(UnaryOp, Box<Expr>),

    /// Derivative of the child with respect to the named elementary symbol
    Derive { child: Box<Expr>, name: String },

    /// Numerical integration of the child over the named random variable
    Integrate { child: Box<Expr>, name: String },

    /// Sum of all terms
    MultSum(Vec<Expr>),

    /// Entry of `entries` selected by the integer value of `key`
    Elem {
        entries: BTreeMap<i64, Expr>,
        key: Box<Expr>,
    },

    /// Sum of products of parameters and variables
    LinearUtility(Vec<LinearTerm>),

    /// Log of the logit probability of the chosen alternative.
    /// With `full_choice_set` every alternative is always available.
    LogLogit {
        util: BTreeMap<i64, Expr>,
        av: BTreeMap<i64, Expr>,
        choice: Box<Expr>,
        full_choice_set: bool,
    },
}

impl ExprKind {
    /// Check if this is an elementary symbol
    pub fn is_elementary(&self) -> bool {
        matches!(
            self,
            ExprKind::Beta(_)
                | ExprKind::Variable(_)
                | ExprKind::RandomVariable(_)
                | ExprKind::Draws { .. }
        )
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tree = ExprTree::from_expr(self.clone());
        match tree.roots().first() {
            Some(&root) => write!(f, "{}", tree.display(root)),
            None => Ok(()),
        }
    }
}
