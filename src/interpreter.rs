//! Direct recursive evaluation of an arena tree.
//!
//! Used for expressions without data dependency and for the observed-choice
//! sub-expressions checked by the audit. Parameters evaluate to their initial
//! value. Dataset-driven evaluation with derivatives goes through the
//! [`EvaluationEngine`](crate::EvaluationEngine) instead.

use crate::dataset::Dataset;
use crate::math::eval_normal_cdf;
use crate::tree::{ExprTree, NodeId, NodeKind};
use crate::{ExprError, UnaryOp};

/// Tree-local evaluator, optionally bound to one row of a dataset
#[derive(Clone, Copy)]
pub struct Interpreter<'a> {
    tree: &'a ExprTree,
    row: Option<(&'a dyn Dataset, usize)>,
}

impl<'a> Interpreter<'a> {
    pub fn new(tree: &'a ExprTree) -> Self {
        Interpreter { tree, row: None }
    }

    /// Resolve variables against row `row` of `dataset`
    pub fn with_row(mut self, dataset: &'a dyn Dataset, row: usize) -> Self {
        self.row = Some((dataset, row));
        self
    }

    /// Evaluate the subtree rooted at `id`
    pub fn evaluate(&self, id: NodeId) -> Result<f64, ExprError> {
        let node = self.tree.node(id);
        let children = node.children();
        match node.kind() {
            NodeKind::Numeric(v) => Ok(*v),
            NodeKind::Beta(p) => Ok(p.init_value()),
            NodeKind::Variable(name) => {
                let (dataset, row) = self
                    .row
                    .ok_or_else(|| ExprError::UnboundVariable { name: name.clone() })?;
                let column = dataset
                    .column_index(name)
                    .ok_or_else(|| ExprError::UnknownColumn { name: name.clone() })?;
                Ok(dataset.value(row, column))
            }
            NodeKind::RandomVariable(_) | NodeKind::Draws { .. } => {
                Err(ExprError::NotEvaluable(self.tree.display(id).to_string()))
            }
            NodeKind::Binary(op) => {
                let l = self.evaluate(children[0])?;
                let r = self.evaluate(children[1])?;
                Ok(op.apply(l, r))
            }
            NodeKind::Unary(op) => match op {
                UnaryOp::Neg => Ok(-self.evaluate(children[0])?),
                UnaryOp::Exp => Ok(self.evaluate(children[0])?.exp()),
                UnaryOp::Log => Ok(self.evaluate(children[0])?.ln()),
                UnaryOp::NormalCdf => Ok(eval_normal_cdf(self.evaluate(children[0])?)),
                UnaryOp::MonteCarlo | UnaryOp::PanelTrajectory => {
                    Err(ExprError::NotEvaluable(self.tree.display(id).to_string()))
                }
            },
            NodeKind::Derive(_) | NodeKind::Integrate(_) => {
                Err(ExprError::NotEvaluable(self.tree.display(id).to_string()))
            }
            NodeKind::MultSum => children
                .iter()
                .try_fold(0.0, |acc, &c| -> Result<f64, ExprError> {
                    Ok(acc + self.evaluate(c)?)
                }),
            NodeKind::Elem { keys } => {
                let key = to_key(self.evaluate(children[0])?, keys)?;
                let pos = keys
                    .iter()
                    .position(|&k| k == key)
                    .ok_or_else(|| ExprError::KeyNotFound {
                        key,
                        available: keys.clone(),
                    })?;
                self.evaluate(children[pos + 1])
            }
            NodeKind::LinearUtility { terms } => {
                let (betas, variables) = children.split_at(*terms);
                betas
                    .iter()
                    .zip(variables)
                    .try_fold(0.0, |acc, (&b, &x)| -> Result<f64, ExprError> {
                        Ok(acc + self.evaluate(b)? * self.evaluate(x)?)
                    })
            }
            NodeKind::LogLogit {
                util_keys, av_keys, ..
            } => {
                self.log_logit(children[0], util_keys, av_keys, &children[1..])
            }
        }
    }

    fn log_logit(
        &self,
        choice: NodeId,
        util_keys: &[i64],
        av_keys: &[i64],
        rest: &[NodeId],
    ) -> Result<f64, ExprError> {
        let (utils, avs) = rest.split_at(util_keys.len());
        let chosen = to_key(self.evaluate(choice)?, util_keys)?;
        let u_pos = util_keys
            .iter()
            .position(|&k| k == chosen)
            .ok_or_else(|| ExprError::KeyNotFound {
                key: chosen,
                available: util_keys.to_vec(),
            })?;
        let av_of = |key: i64| -> Result<f64, ExprError> {
            let pos = av_keys
                .iter()
                .position(|&k| k == key)
                .ok_or_else(|| ExprError::KeyNotFound {
                    key,
                    available: av_keys.to_vec(),
                })?;
            self.evaluate(avs[pos])
        };
        if av_of(chosen)? == 0.0 {
            return Ok(f64::INFINITY);
        }
        let v_chosen = self.evaluate(utils[u_pos])?;
        let mut denom = 0.0;
        for (&key, &util) in util_keys.iter().zip(utils) {
            if av_of(key)? != 0.0 {
                denom += (self.evaluate(util)? - v_chosen).exp();
            }
        }
        Ok(-denom.ln())
    }
}

/// Integer key selected by `value`, truncated toward zero
fn to_key(value: f64, available: &[i64]) -> Result<i64, ExprError> {
    if !value.is_finite() {
        return Err(ExprError::InvalidKey {
            value,
            available: available.to_vec(),
        });
    }
    Ok(value as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Expr, ParamStatus};
    use std::collections::BTreeMap;

    fn eval(expr: Expr) -> Result<f64, ExprError> {
        let tree = ExprTree::from_expr(expr);
        let root = tree.roots()[0];
        Interpreter::new(&tree).evaluate(root)
    }

    #[test]
    fn test_arithmetic_and_logic() {
        let b = Expr::beta("b", 2.0, None, None, ParamStatus::Free).unwrap();
        assert_eq!(eval(b.clone().pow(3) - 1).unwrap(), 7.0);
        assert_eq!(eval(Expr::numeric(2.0).le_expr(3.0)).unwrap(), 1.0);
        assert_eq!(eval(Expr::numeric(0.0) | Expr::numeric(0.0)).unwrap(), 0.0);
        assert_eq!(eval(Expr::bio_max(b, 5)).unwrap(), 5.0);
    }

    #[test]
    fn test_variable_without_row() {
        let x = Expr::variable("x").unwrap();
        assert!(matches!(eval(x), Err(ExprError::UnboundVariable { .. })));
    }

    #[test]
    fn test_elem_missing_key() {
        let mut entries = BTreeMap::new();
        entries.insert(1, 10.0);
        entries.insert(2, 20.0);
        assert_eq!(eval(Expr::elem(entries.clone(), 2)).unwrap(), 20.0);
        match eval(Expr::elem(entries, 3)) {
            Err(ExprError::KeyNotFound { key, available }) => {
                assert_eq!(key, 3);
                assert_eq!(available, vec![1, 2]);
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_non_finite_selector_is_rejected() {
        let mut entries = BTreeMap::new();
        entries.insert(0, 10.0);
        entries.insert(1, 20.0);
        match eval(Expr::elem(entries.clone(), f64::NAN)) {
            Err(ExprError::InvalidKey { value, available }) => {
                assert!(value.is_nan());
                assert_eq!(available, vec![0, 1]);
            }
            other => panic!("unexpected result {:?}", other),
        }
        assert!(matches!(
            eval(Expr::elem(entries, f64::INFINITY)),
            Err(ExprError::InvalidKey { .. })
        ));
    }

    #[test]
    fn test_log_logit_unavailable_choice() {
        let mut util = BTreeMap::new();
        util.insert(1, 0.0);
        util.insert(2, 1.0);
        let mut av = BTreeMap::new();
        av.insert(1, 0.0);
        av.insert(2, 1.0);
        let e = Expr::log_logit(util.clone(), Some(av), 1);
        assert_eq!(eval(e).unwrap(), f64::INFINITY);

        // Only the chosen alternative is available
        let mut av = BTreeMap::new();
        av.insert(1, 0.0);
        av.insert(2, 1.0);
        let e = Expr::log_logit(util, Some(av), 2);
        assert!(eval(e).unwrap().abs() < 1e-15);
    }

    #[test]
    fn test_draws_not_evaluable() {
        let d = Expr::draws("d", "NORMAL").unwrap();
        assert!(matches!(
            eval(Expr::monte_carlo(d)),
            Err(ExprError::NotEvaluable(_))
        ));
    }
}
