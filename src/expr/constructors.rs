//! Expression constructors.
//!
//! Every operand slot accepts anything convertible into an [`Expr`]:
//! already-built expressions, `f64`, `i32` and `bool` literals (wrapped in
//! `Numeric`). Elementary constructors validate their names because names
//! are embedded between double quotes in wire records.

use std::collections::BTreeMap;

use super::{BinaryOp, Expr, ExprKind, LinearTerm, ParamStatus, Parameter, UnaryOp};
use crate::ExprError;

/// Reject names that cannot be embedded in a wire record
pub(crate) fn validate_name(name: String) -> Result<String, ExprError> {
    if name.is_empty() || name.contains('"') {
        return Err(ExprError::InvalidName { name });
    }
    Ok(name)
}

impl Expr {
    /// Create an expression from its kind
    pub fn new(kind: ExprKind) -> Self {
        Expr { kind }
    }

    /// Consume the expression and return its kind
    pub fn into_kind(self) -> ExprKind {
        self.kind
    }

    /// Return the literal value if this is a `Numeric`
    pub fn as_numeric(&self) -> Option<f64> {
        match &self.kind {
            ExprKind::Numeric(v) => Some(*v),
            _ => None,
        }
    }

    // -------------------------------------------------------------------------
    // Elementary expressions
    // -------------------------------------------------------------------------

    /// Create a numeric literal
    pub fn numeric(value: f64) -> Self {
        Expr::new(ExprKind::Numeric(value))
    }

    /// Create a parameter
    ///
    /// # Errors
    /// `InvalidName` for an empty or quoted name, `InvalidValue` for a
    /// non-finite initial value.
    pub fn beta(
        name: impl Into<String>,
        init_value: f64,
        lower: Option<f64>,
        upper: Option<f64>,
        status: ParamStatus,
    ) -> Result<Self, ExprError> {
        let mut param = Parameter::new(name, init_value)?;
        param.lower = lower;
        param.upper = upper;
        param.status = status;
        Ok(Expr::new(ExprKind::Beta(param)))
    }

    /// Create a variable referring to a dataset column
    pub fn variable(name: impl Into<String>) -> Result<Self, ExprError> {
        Ok(Expr::new(ExprKind::Variable(validate_name(name.into())?)))
    }

    /// Create a random variable for numerical integration
    pub fn random_variable(name: impl Into<String>) -> Result<Self, ExprError> {
        Ok(Expr::new(ExprKind::RandomVariable(validate_name(
            name.into(),
        )?)))
    }

    /// Create a symbol bound to Monte-Carlo draws of type `draw_type`
    pub fn draws(name: impl Into<String>, draw_type: impl Into<String>) -> Result<Self, ExprError> {
        Ok(Expr::new(ExprKind::Draws {
            name: validate_name(name.into())?,
            draw_type: draw_type.into(),
        }))
    }

    // -------------------------------------------------------------------------
    // Operators
    // -------------------------------------------------------------------------

    /// Create a binary operator node
    pub fn binary(op: BinaryOp, left: impl Into<Expr>, right: impl Into<Expr>) -> Self {
        Expr::new(ExprKind::Binary(
            op,
            Box::new(left.into()),
            Box::new(right.into()),
        ))
    }

    /// Create a unary operator node
    pub fn unary(op: UnaryOp, child: impl Into<Expr>) -> Self {
        Expr::new(ExprKind::Unary(op, Box::new(child.into())))
    }

    /// Raise to a power (since Rust `^` is XOR)
    pub fn pow(self, exponent: impl Into<Expr>) -> Self {
        Expr::binary(BinaryOp::Power, self, exponent)
    }

    /// Smallest of two expressions
    pub fn bio_min(left: impl Into<Expr>, right: impl Into<Expr>) -> Self {
        Expr::binary(BinaryOp::Min, left, right)
    }

    /// Largest of two expressions
    pub fn bio_max(left: impl Into<Expr>, right: impl Into<Expr>) -> Self {
        Expr::binary(BinaryOp::Max, left, right)
    }

    pub fn eq_expr(self, other: impl Into<Expr>) -> Self {
        Expr::binary(BinaryOp::Equal, self, other)
    }

    pub fn ne_expr(self, other: impl Into<Expr>) -> Self {
        Expr::binary(BinaryOp::NotEqual, self, other)
    }

    pub fn le_expr(self, other: impl Into<Expr>) -> Self {
        Expr::binary(BinaryOp::LessOrEqual, self, other)
    }

    pub fn ge_expr(self, other: impl Into<Expr>) -> Self {
        Expr::binary(BinaryOp::GreaterOrEqual, self, other)
    }

    pub fn lt_expr(self, other: impl Into<Expr>) -> Self {
        Expr::binary(BinaryOp::Less, self, other)
    }

    pub fn gt_expr(self, other: impl Into<Expr>) -> Self {
        Expr::binary(BinaryOp::Greater, self, other)
    }

    pub fn exp(self) -> Self {
        Expr::unary(UnaryOp::Exp, self)
    }

    /// Natural logarithm
    pub fn log(self) -> Self {
        Expr::unary(UnaryOp::Log, self)
    }

    /// Cumulative distribution function of the standard normal
    pub fn normal_cdf(self) -> Self {
        Expr::unary(UnaryOp::NormalCdf, self)
    }

    /// Monte-Carlo integration of `child` over its draws
    pub fn monte_carlo(child: impl Into<Expr>) -> Self {
        Expr::unary(UnaryOp::MonteCarlo, child)
    }

    /// Likelihood of the whole sequence of observations of an individual
    pub fn panel_trajectory(child: impl Into<Expr>) -> Self {
        Expr::unary(UnaryOp::PanelTrajectory, child)
    }

    /// Derivative of `child` with respect to the elementary symbol `name`
    pub fn derive(child: impl Into<Expr>, name: impl Into<String>) -> Result<Self, ExprError> {
        Ok(Expr::new(ExprKind::Derive {
            child: Box::new(child.into()),
            name: validate_name(name.into())?,
        }))
    }

    /// Numerical integration of `child` over the random variable `name`
    pub fn integrate(child: impl Into<Expr>, name: impl Into<String>) -> Result<Self, ExprError> {
        Ok(Expr::new(ExprKind::Integrate {
            child: Box::new(child.into()),
            name: validate_name(name.into())?,
        }))
    }

    // -------------------------------------------------------------------------
    // Multi-ary operators
    // -------------------------------------------------------------------------

    /// Sum of several terms
    pub fn mult_sum<I, T>(terms: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Expr>,
    {
        Expr::new(ExprKind::MultSum(terms.into_iter().map(Into::into).collect()))
    }

    /// Sum of the values of a keyed collection of terms
    pub fn mult_sum_map<T: Into<Expr>>(terms: BTreeMap<i64, T>) -> Self {
        Expr::mult_sum(terms.into_values())
    }

    /// Select the entry whose key is the integer value of `key`
    pub fn elem<T: Into<Expr>>(entries: BTreeMap<i64, T>, key: impl Into<Expr>) -> Self {
        Expr::new(ExprKind::Elem {
            entries: entries.into_iter().map(|(k, v)| (k, v.into())).collect(),
            key: Box::new(key.into()),
        })
    }

    /// Linear utility from `(parameter, variable)` pairs
    ///
    /// # Errors
    /// `InvalidLinearTerm` listing every pair whose first element is not a
    /// parameter or whose second element is not a variable.
    pub fn linear_utility(terms: Vec<(Expr, Expr)>) -> Result<Self, ExprError> {
        let mut problems = Vec::new();
        let mut valid = Vec::with_capacity(terms.len());
        for (beta, variable) in terms {
            match (beta.kind, variable.kind) {
                (ExprKind::Beta(param), ExprKind::Variable(name)) => valid.push(LinearTerm {
                    beta: param,
                    variable: name,
                }),
                (b, v) => {
                    if !matches!(b, ExprKind::Beta(_)) {
                        problems.push(format!("Expression {} is not a parameter.", Expr::new(b)));
                    }
                    if !matches!(v, ExprKind::Variable(_)) {
                        problems.push(format!("Expression {} is not a variable.", Expr::new(v)));
                    }
                }
            }
        }
        if !problems.is_empty() {
            return Err(ExprError::InvalidLinearTerm(format!(
                "Each element of the linear utility must be a tuple (parameter, variable). {}",
                problems.join(" ")
            )));
        }
        Ok(Expr::new(ExprKind::LinearUtility(valid)))
    }

    /// Log of the logit probability of the alternative selected by `choice`.
    ///
    /// When `av` is `None` every alternative is always available.
    pub fn log_logit<U, A>(
        util: BTreeMap<i64, U>,
        av: Option<BTreeMap<i64, A>>,
        choice: impl Into<Expr>,
    ) -> Self
    where
        U: Into<Expr>,
        A: Into<Expr>,
    {
        let av: BTreeMap<i64, Expr> = match av {
            Some(av) => av.into_iter().map(|(k, v)| (k, v.into())).collect(),
            None => util.keys().map(|&k| (k, Expr::numeric(1.0))).collect(),
        };
        Expr::new(ExprKind::LogLogit {
            util: util.into_iter().map(|(k, v)| (k, v.into())).collect(),
            av,
            choice: Box::new(choice.into()),
            full_choice_set: false,
        })
    }

    /// Log of the logit probability when all alternatives are always available.
    ///
    /// The engine is told so through a dedicated record kind and can skip
    /// the availability conditions.
    pub fn log_logit_full_choice_set<U: Into<Expr>>(
        util: BTreeMap<i64, U>,
        choice: impl Into<Expr>,
    ) -> Self {
        let av = util.keys().map(|&k| (k, Expr::numeric(1.0))).collect();
        Expr::new(ExprKind::LogLogit {
            util: util.into_iter().map(|(k, v)| (k, v.into())).collect(),
            av,
            choice: Box::new(choice.into()),
            full_choice_set: true,
        })
    }
}

impl From<Parameter> for Expr {
    fn from(param: Parameter) -> Self {
        Expr::new(ExprKind::Beta(param))
    }
}

impl From<f64> for Expr {
    fn from(n: f64) -> Self {
        Expr::numeric(n)
    }
}

impl From<i32> for Expr {
    fn from(n: i32) -> Self {
        Expr::numeric(f64::from(n))
    }
}

impl From<bool> for Expr {
    fn from(b: bool) -> Self {
        Expr::numeric(if b { 1.0 } else { 0.0 })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literals_are_wrapped() {
        let e = Expr::binary(BinaryOp::Plus, 1.5, 2);
        match e.kind {
            ExprKind::Binary(BinaryOp::Plus, l, r) => {
                assert_eq!(l.as_numeric(), Some(1.5));
                assert_eq!(r.as_numeric(), Some(2.0));
            }
            other => panic!("unexpected kind {:?}", other),
        }
    }

    #[test]
    fn test_bool_key_becomes_numeric() {
        let mut entries = BTreeMap::new();
        entries.insert(1, 10.0);
        let e = Expr::elem(entries, true);
        match e.kind {
            ExprKind::Elem { key, .. } => assert_eq!(key.as_numeric(), Some(1.0)),
            other => panic!("unexpected kind {:?}", other),
        }
    }

    #[test]
    fn test_invalid_names_rejected() {
        assert!(matches!(
            Expr::variable(""),
            Err(ExprError::InvalidName { .. })
        ));
        assert!(matches!(
            Expr::draws("a\"b", "NORMAL"),
            Err(ExprError::InvalidName { .. })
        ));
        assert!(matches!(
            Expr::beta("b", f64::NAN, None, None, ParamStatus::Free),
            Err(ExprError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_default_availabilities() {
        let mut util = BTreeMap::new();
        util.insert(1, 0.0);
        util.insert(2, 1.0);
        let e = Expr::log_logit::<f64, f64>(util, None, 1);
        match e.kind {
            ExprKind::LogLogit { av, .. } => {
                assert_eq!(av.len(), 2);
                assert!(av.values().all(|a| a.as_numeric() == Some(1.0)));
            }
            other => panic!("unexpected kind {:?}", other),
        }
    }
}
