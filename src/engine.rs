//! Contract with the external evaluation engine.
//!
//! The engine receives the signature of a formula and computes its value and
//! derivatives over the dataset. This crate only prepares its input.

use crate::dataset::{Dataset, Draws, PanelMap};
use crate::ExprError;

/// Which derivatives the engine must compute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Derivatives {
    pub gradient: bool,
    pub hessian: bool,
    pub bhhh: bool,
}

impl Default for Derivatives {
    fn default() -> Self {
        Derivatives {
            gradient: true,
            hessian: true,
            bhhh: false,
        }
    }
}

impl Derivatives {
    /// Value only
    pub fn none() -> Self {
        Derivatives {
            gradient: false,
            hessian: false,
            bhhh: false,
        }
    }

    /// The Hessian and the BHHH matrix both require the gradient
    pub fn validate(self) -> Result<Self, ExprError> {
        if (self.hessian || self.bhhh) && !self.gradient {
            return Err(ExprError::InconsistentDerivatives);
        }
        Ok(self)
    }
}

/// Everything the engine needs for one evaluation
#[derive(Clone, Copy)]
pub struct EvaluationRequest<'a> {
    /// Post-order records of the formula
    pub signature: &'a [String],
    pub free_values: &'a [f64],
    pub fixed_values: &'a [f64],
    /// Value standing for a missing observation
    pub missing_data: f64,
    pub dataset: Option<&'a dyn Dataset>,
    pub panel: Option<&'a PanelMap>,
    pub draws: Option<&'a Draws>,
    pub derivatives: Derivatives,
    /// Sum over observations instead of one result per observation
    pub aggregation: bool,
}

/// Output of the engine.
///
/// With aggregation each vector holds one entry; otherwise one entry per
/// observation (or per individual for panel data). Derivative vectors are
/// empty when not requested.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvaluationResults {
    pub values: Vec<f64>,
    pub gradients: Vec<Vec<f64>>,
    pub hessians: Vec<Vec<Vec<f64>>>,
    pub bhhh: Vec<Vec<Vec<f64>>>,
}

impl EvaluationResults {
    /// The single value of an aggregated evaluation
    pub fn value(&self) -> Option<f64> {
        match self.values.as_slice() {
            [v] => Some(*v),
            _ => None,
        }
    }
}

/// External evaluation engine
pub trait EvaluationEngine {
    fn calculate(
        &mut self,
        request: &EvaluationRequest<'_>,
    ) -> Result<EvaluationResults, ExprError>;
}

impl<F> EvaluationEngine for F
where
    F: FnMut(&EvaluationRequest<'_>) -> Result<EvaluationResults, ExprError>,
{
    fn calculate(
        &mut self,
        request: &EvaluationRequest<'_>,
    ) -> Result<EvaluationResults, ExprError> {
        self(request)
    }
}
