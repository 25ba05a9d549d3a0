//! Elementary-symbol numbering.
//!
//! Every elementary symbol of the roots of an [`ExprTree`] gets two numbers:
//! a unique id shared by all categories, and an index specific to its
//! category. Categories come in a fixed order: free parameters, fixed
//! parameters, random variables, draws, then dataset columns. Names within
//! the first four are sorted; columns keep the dataset order.
//!
//! Indices live in a side table keyed by node handle. Numbering never writes
//! into the tree, so a second numbering for another dataset starts fresh.

use std::collections::{BTreeMap, BTreeSet};

use rustc_hash::FxHashMap;
use slotmap::SecondaryMap;
use tracing::debug;

use crate::error::SymbolCategory;
use crate::expr::Parameter;
use crate::tree::{ExprTree, NodeId, NodeKind};
use crate::visitor::{walk_tree, NodeVisitor};
use crate::ExprError;

/// Unique id and category-specific index of an elementary node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SymbolIndex {
    pub unique_id: usize,
    pub specific: usize,
}

/// Collects elementary symbols by category. The first occurrence of a name wins.
#[derive(Default)]
struct SymbolCollector {
    free: BTreeMap<String, Parameter>,
    fixed: BTreeMap<String, Parameter>,
    random_variables: BTreeMap<String, NodeId>,
    draws: BTreeMap<String, String>,
    variables: BTreeMap<String, NodeId>,
}

impl NodeVisitor for SymbolCollector {
    fn visit_beta(&mut self, _id: NodeId, param: &Parameter) -> bool {
        let map = if param.is_free() {
            &mut self.free
        } else {
            &mut self.fixed
        };
        map.entry(param.name().to_string())
            .or_insert_with(|| param.clone());
        true
    }

    fn visit_variable(&mut self, id: NodeId, name: &str) -> bool {
        self.variables.entry(name.to_string()).or_insert(id);
        true
    }

    fn visit_random_variable(&mut self, id: NodeId, name: &str) -> bool {
        self.random_variables.entry(name.to_string()).or_insert(id);
        true
    }

    fn visit_draws(&mut self, _id: NodeId, name: &str, draw_type: &str) -> bool {
        self.draws
            .entry(name.to_string())
            .or_insert_with(|| draw_type.to_string());
        true
    }
}

fn collect(tree: &ExprTree, roots: &[NodeId]) -> SymbolCollector {
    let mut collector = SymbolCollector::default();
    for &root in roots {
        walk_tree(tree, root, &mut collector);
    }
    collector
}

impl ExprTree {
    /// Names of the parameters under `id`
    pub fn set_of_betas(&self, id: NodeId, free: bool, fixed: bool) -> BTreeSet<String> {
        let c = collect(self, &[id]);
        let mut names = BTreeSet::new();
        if free {
            names.extend(c.free.into_keys());
        }
        if fixed {
            names.extend(c.fixed.into_keys());
        }
        names
    }

    /// Variables under `id`, with the first node referring to each
    pub fn dict_of_variables(&self, id: NodeId) -> BTreeMap<String, NodeId> {
        collect(self, &[id]).variables
    }

    /// Random variables under `id`, with the first node referring to each
    pub fn dict_of_random_variables(&self, id: NodeId) -> BTreeMap<String, NodeId> {
        collect(self, &[id]).random_variables
    }

    /// Draw symbols under `id`, with their draw type
    pub fn dict_of_draws(&self, id: NodeId) -> BTreeMap<String, String> {
        collect(self, &[id]).draws
    }
}

fn positions(names: &[String]) -> FxHashMap<String, usize> {
    names
        .iter()
        .enumerate()
        .map(|(i, n)| (n.clone(), i))
        .collect()
}

/// Numbering of the elementary symbols of every root of an arena
#[derive(Debug, Clone)]
pub struct Numbering {
    indices: SecondaryMap<NodeId, SymbolIndex>,
    derive_targets: SecondaryMap<NodeId, usize>,
    integrate_targets: SecondaryMap<NodeId, usize>,
    unique_ids: FxHashMap<String, usize>,
    parameters: BTreeMap<String, Parameter>,
    free_betas: Vec<String>,
    fixed_betas: Vec<String>,
    random_variables: Vec<String>,
    draws: Vec<String>,
    variables: Vec<String>,
    draw_types: BTreeMap<String, String>,
}

impl Numbering {
    /// Number all roots of `tree` against the dataset `columns` (empty without dataset).
    ///
    /// # Errors
    /// `DuplicateSymbols` if a name appears in two categories (or twice among
    /// the columns), `UnknownSymbol` if a derivative or integration refers to
    /// a symbol absent from its category.
    pub fn build(tree: &ExprTree, columns: &[String]) -> Result<Self, ExprError> {
        let c = collect(tree, tree.roots());

        let free_betas: Vec<String> = c.free.keys().cloned().collect();
        let fixed_betas: Vec<String> = c.fixed.keys().cloned().collect();
        let random_variables: Vec<String> = c.random_variables.keys().cloned().collect();
        let draws: Vec<String> = c.draws.keys().cloned().collect();
        let variables: Vec<String> = columns.to_vec();

        let all_names = free_betas
            .iter()
            .chain(&fixed_betas)
            .chain(&random_variables)
            .chain(&draws)
            .chain(&variables);
        let mut unique_ids = FxHashMap::default();
        let mut duplicates = BTreeSet::new();
        for (uid, name) in all_names.enumerate() {
            if unique_ids.insert(name.clone(), uid).is_some() {
                duplicates.insert(name.clone());
            }
        }
        if !duplicates.is_empty() {
            return Err(ExprError::DuplicateSymbols {
                names: duplicates.into_iter().collect(),
            });
        }

        let free_pos = positions(&free_betas);
        let fixed_pos = positions(&fixed_betas);
        let rv_pos = positions(&random_variables);
        let draw_pos = positions(&draws);
        let var_pos = positions(&variables);

        let mut indices = SecondaryMap::new();
        let mut derive_targets = SecondaryMap::new();
        let mut integrate_targets = SecondaryMap::new();
        for &root in tree.roots() {
            for id in tree.post_order(root) {
                let (name, category_pos) = match tree.kind(id) {
                    NodeKind::Beta(p) if p.is_free() => (p.name(), &free_pos),
                    NodeKind::Beta(p) => (p.name(), &fixed_pos),
                    NodeKind::RandomVariable(name) => (name.as_str(), &rv_pos),
                    NodeKind::Draws { name, .. } => (name.as_str(), &draw_pos),
                    // Columns absent from the dataset stay unnumbered
                    NodeKind::Variable(name) => (name.as_str(), &var_pos),
                    NodeKind::Derive(name) => {
                        let uid = unique_ids
                            .get(name)
                            .copied()
                            .ok_or_else(|| ExprError::unknown_symbol(name.clone()))?;
                        derive_targets.insert(id, uid);
                        continue;
                    }
                    NodeKind::Integrate(name) => {
                        let specific =
                            rv_pos
                                .get(name)
                                .copied()
                                .ok_or_else(|| ExprError::UnknownSymbol {
                                    name: name.clone(),
                                    category: Some(SymbolCategory::RandomVariable),
                                })?;
                        integrate_targets.insert(id, specific);
                        continue;
                    }
                    _ => continue,
                };
                if let (Some(&specific), Some(&unique_id)) =
                    (category_pos.get(name), unique_ids.get(name))
                {
                    indices.insert(
                        id,
                        SymbolIndex {
                            unique_id,
                            specific,
                        },
                    );
                }
            }
        }

        let mut parameters = c.free;
        parameters.extend(c.fixed);

        debug!(
            free = free_betas.len(),
            fixed = fixed_betas.len(),
            random_variables = random_variables.len(),
            draws = draws.len(),
            variables = variables.len(),
            "Elementary expressions numbered"
        );

        Ok(Numbering {
            indices,
            derive_targets,
            integrate_targets,
            unique_ids,
            parameters,
            free_betas,
            fixed_betas,
            random_variables,
            draws,
            variables,
            draw_types: c.draws,
        })
    }

    /// Index of an elementary node, if it has been numbered
    pub fn index_of(&self, id: NodeId) -> Option<SymbolIndex> {
        self.indices.get(id).copied()
    }

    /// Unique id of the symbol targeted by a `Derive` node
    pub fn derive_target(&self, id: NodeId) -> Option<usize> {
        self.derive_targets.get(id).copied()
    }

    /// Random-variable index targeted by an `Integrate` node
    pub fn integrate_target(&self, id: NodeId) -> Option<usize> {
        self.integrate_targets.get(id).copied()
    }

    pub fn unique_id(&self, name: &str) -> Option<usize> {
        self.unique_ids.get(name).copied()
    }

    /// Metadata of a free or fixed parameter
    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.get(name)
    }

    pub fn free_betas(&self) -> &[String] {
        &self.free_betas
    }

    pub fn fixed_betas(&self) -> &[String] {
        &self.fixed_betas
    }

    pub fn random_variables(&self) -> &[String] {
        &self.random_variables
    }

    pub fn draws(&self) -> &[String] {
        &self.draws
    }

    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    /// Draw type of each draw symbol, in draw order
    pub fn draw_types(&self) -> &BTreeMap<String, String> {
        &self.draw_types
    }

    /// Number of symbols across all categories
    pub fn len(&self) -> usize {
        self.unique_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.unique_ids.is_empty()
    }

    fn values_of(&self, names: &[String], overrides: Option<&FxHashMap<String, f64>>) -> Vec<f64> {
        names
            .iter()
            .map(|n| {
                overrides
                    .and_then(|o| o.get(n).copied())
                    .or_else(|| self.parameters.get(n).map(Parameter::init_value))
                    .unwrap_or(0.0)
            })
            .collect()
    }

    /// Initial values of the free parameters, in free-parameter order
    pub fn free_values(&self) -> Vec<f64> {
        self.values_of(&self.free_betas, None)
    }

    /// Values of the fixed parameters, in fixed-parameter order
    pub fn fixed_values(&self) -> Vec<f64> {
        self.values_of(&self.fixed_betas, None)
    }

    /// Free and fixed values where names present in `betas` override the initial values
    pub fn values_with_overrides(&self, betas: &FxHashMap<String, f64>) -> (Vec<f64>, Vec<f64>) {
        (
            self.values_of(&self.free_betas, Some(betas)),
            self.values_of(&self.fixed_betas, Some(betas)),
        )
    }
}
