//! Builder pattern API for evaluation sessions
//!
//! Provides a fluent interface for configuring and running the evaluation of a
//! formula: audit, numbering, draw generation, signature emission and the
//! call to the evaluation engine.
//!
//! # Example
//! ```
//! use bioexpr::{Evaluation, EvaluationRequest, EvaluationResults, Expr, ExprError, ExprTree};
//! use bioexpr::ParamStatus;
//! use rustc_hash::FxHashMap;
//!
//! let b = Expr::beta("b", 0.5, None, None, ParamStatus::Free).unwrap();
//! let mut tree = ExprTree::new();
//! let root = tree.add_root(b * 2.0);
//!
//! let mut engine = |req: &EvaluationRequest<'_>| -> Result<EvaluationResults, ExprError> {
//!     Ok(EvaluationResults { values: vec![req.free_values[0] * 2.0], ..Default::default() })
//! };
//! let results = Evaluation::new()
//!     .hessian(false)
//!     .evaluate(&tree, root, None, &mut engine, &FxHashMap::default())
//!     .unwrap();
//! assert_eq!(results.value(), Some(1.0));
//! ```

use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use crate::audit::audit;
use crate::dataset::{Dataset, Draws, PanelMap};
use crate::engine::{Derivatives, EvaluationEngine, EvaluationRequest, EvaluationResults};
use crate::registry::Numbering;
use crate::signature::signature;
use crate::tree::{ExprTree, NodeId};
use crate::ExprError;

/// Number of draws generated per observation unless configured otherwise
pub const DEFAULT_NUMBER_OF_DRAWS: usize = 1000;

/// Value standing for a missing observation unless configured otherwise
pub const DEFAULT_MISSING_DATA: f64 = 99999.0;

/// Builder for evaluation sessions
#[derive(Debug, Clone)]
pub struct Evaluation {
    number_of_draws: usize,
    missing_data: f64,
    derivatives: Derivatives,
    aggregation: bool,
}

impl Default for Evaluation {
    fn default() -> Self {
        Evaluation {
            number_of_draws: DEFAULT_NUMBER_OF_DRAWS,
            missing_data: DEFAULT_MISSING_DATA,
            derivatives: Derivatives::default(),
            aggregation: true,
        }
    }
}

/// Formula ready to be handed to the engine
#[derive(Debug, Clone)]
pub struct Prepared {
    numbering: Numbering,
    signature: Vec<String>,
    panel: Option<PanelMap>,
    draws: Option<Draws>,
    warnings: Vec<String>,
}

impl Prepared {
    pub fn numbering(&self) -> &Numbering {
        &self.numbering
    }

    pub fn signature(&self) -> &[String] {
        &self.signature
    }

    pub fn draws(&self) -> Option<&Draws> {
        self.draws.as_ref()
    }

    /// Audit warnings collected while preparing
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }
}

impl Evaluation {
    /// Create a new evaluation builder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of Monte-Carlo draws per observation (or per individual)
    pub fn number_of_draws(mut self, n: usize) -> Self {
        self.number_of_draws = n;
        self
    }

    /// Value standing for a missing observation
    pub fn missing_data(mut self, value: f64) -> Self {
        self.missing_data = value;
        self
    }

    pub fn gradient(mut self, on: bool) -> Self {
        self.derivatives.gradient = on;
        self
    }

    pub fn hessian(mut self, on: bool) -> Self {
        self.derivatives.hessian = on;
        self
    }

    /// Request the BHHH approximation of the Hessian
    pub fn bhhh(mut self, on: bool) -> Self {
        self.derivatives.bhhh = on;
        self
    }

    /// Sum the results over observations (default) or keep one per observation
    pub fn aggregation(mut self, on: bool) -> Self {
        self.aggregation = on;
        self
    }

    /// Audit, number and emit the formula rooted at `root`.
    ///
    /// Audit warnings are logged and kept in the result. Audit errors are
    /// logged, then returned as one `AuditFailed`.
    pub fn prepare(
        &self,
        tree: &ExprTree,
        root: NodeId,
        dataset: Option<&dyn Dataset>,
    ) -> Result<Prepared, ExprError> {
        let report = audit(tree, root, dataset);
        for w in &report.warnings {
            warn!(warning = %w, "Audit warning");
        }
        for e in &report.errors {
            warn!(error = %e, "Audit error");
        }
        let warnings = report.into_result()?;

        self.derivatives.validate()?;

        let requires_draws = tree.requires_draws(root);
        if dataset.is_none() {
            let variables = tree.dict_of_variables(root);
            if !variables.is_empty() {
                let names: Vec<&str> = variables.keys().map(String::as_str).collect();
                return Err(ExprError::missing_dataset(format!(
                    "No database is provided and the expression contains variables: {}",
                    names.join(", ")
                )));
            }
            if requires_draws {
                return Err(ExprError::missing_dataset(
                    "No database is provided and the expression requires Monte-Carlo draws",
                ));
            }
        }

        let columns = dataset.map_or(&[][..], |ds| ds.column_names());
        let numbering = Numbering::build(tree, columns)?;

        let panel = match dataset {
            Some(ds) if tree.count_panel_trajectories(root) > 0 => {
                let map = ds.panel_map().ok_or_else(|| {
                    ExprError::ShapeMismatch(
                        "the expression contains a panel trajectory but the data are not panel"
                            .to_string(),
                    )
                })?;
                Some(map.clone())
            }
            _ => None,
        };

        let draws = match dataset {
            Some(ds) if requires_draws => {
                Some(ds.generate_draws(numbering.draw_types(), self.number_of_draws)?)
            }
            _ => None,
        };

        let signature = signature(tree, root, &numbering)?;
        debug!(
            records = signature.len(),
            draws = draws.is_some(),
            panel = panel.is_some(),
            "Formula prepared"
        );
        Ok(Prepared {
            numbering,
            signature,
            panel,
            draws,
            warnings,
        })
    }

    fn request<'a>(
        &self,
        prepared: &'a Prepared,
        dataset: Option<&'a dyn Dataset>,
        free_values: &'a [f64],
        fixed_values: &'a [f64],
        derivatives: Derivatives,
    ) -> EvaluationRequest<'a> {
        EvaluationRequest {
            signature: &prepared.signature,
            free_values,
            fixed_values,
            missing_data: self.missing_data,
            dataset,
            panel: prepared.panel.as_ref(),
            draws: prepared.draws.as_ref(),
            derivatives,
            aggregation: self.aggregation,
        }
    }

    /// Evaluate the formula and the configured derivatives.
    ///
    /// Parameters named in `betas` take that value instead of their initial value.
    pub fn evaluate(
        &self,
        tree: &ExprTree,
        root: NodeId,
        dataset: Option<&dyn Dataset>,
        engine: &mut dyn EvaluationEngine,
        betas: &FxHashMap<String, f64>,
    ) -> Result<EvaluationResults, ExprError> {
        let prepared = self.prepare(tree, root, dataset)?;
        let (free, fixed) = prepared.numbering.values_with_overrides(betas);
        let request = self.request(&prepared, dataset, &free, &fixed, self.derivatives);
        debug!(
            free = free.len(),
            fixed = fixed.len(),
            "Calling evaluation engine"
        );
        engine.calculate(&request)
    }

    /// Value of the formula at the initial parameter values, without derivatives.
    ///
    /// Without a dataset the engine must return exactly one value.
    pub fn value(
        &self,
        tree: &ExprTree,
        root: NodeId,
        dataset: Option<&dyn Dataset>,
        engine: &mut dyn EvaluationEngine,
    ) -> Result<Vec<f64>, ExprError> {
        let prepared = self.prepare(tree, root, dataset)?;
        let free = prepared.numbering.free_values();
        let fixed = prepared.numbering.fixed_values();
        let request = self.request(&prepared, dataset, &free, &fixed, Derivatives::none());
        let results = engine.calculate(&request)?;
        if dataset.is_none() && results.values.len() != 1 {
            return Err(ExprError::engine(format!(
                "a formula without database must evaluate to one value, not {}",
                results.values.len()
            )));
        }
        Ok(results.values)
    }

    /// Prepare once and return a function of the free parameters.
    ///
    /// The function checks the length of its argument against the number of
    /// free parameters, in sorted-name order.
    pub fn create_function<'a>(
        &self,
        tree: &ExprTree,
        root: NodeId,
        dataset: Option<&'a dyn Dataset>,
        engine: &'a mut dyn EvaluationEngine,
    ) -> Result<impl FnMut(&[f64]) -> Result<EvaluationResults, ExprError> + 'a, ExprError> {
        let prepared = self.prepare(tree, root, dataset)?;
        let fixed = prepared.numbering.fixed_values();
        let settings = self.clone();
        Ok(move |free: &[f64]| {
            let expected = prepared.numbering.free_betas().len();
            if free.len() != expected {
                return Err(ExprError::DimensionMismatch {
                    expected,
                    got: free.len(),
                });
            }
            let request =
                settings.request(&prepared, dataset, free, &fixed, settings.derivatives);
            engine.calculate(&request)
        })
    }
}
