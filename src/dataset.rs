//! Tabular data consumed by the audit and the evaluation engine.
//!
//! [`Dataset`] is the seam towards any storage layer: column lookup, panel
//! grouping and Monte-Carlo draw generation. [`MemoryDataset`] is a
//! row-major in-memory implementation.

use std::collections::BTreeMap;
use std::ops::Range;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use crate::interpreter::Interpreter;
use crate::{Expr, ExprError, ExprTree};

/// Draw type: uniform on [0, 1)
pub const UNIFORM: &str = "UNIFORM";
/// Draw type: uniform on [-1, 1)
pub const UNIFORMSYM: &str = "UNIFORMSYM";
/// Draw type: standard normal
pub const NORMAL: &str = "NORMAL";

/// Contiguous row range of each individual, in order of appearance
pub type PanelMap = Vec<Range<usize>>;

/// Monte-Carlo draws, laid out as `[unit][draw][symbol]`.
///
/// A unit is an individual for panel data and an observation otherwise.
#[derive(Debug, Clone, PartialEq)]
pub struct Draws {
    values: Vec<f64>,
    num_units: usize,
    num_draws: usize,
    num_symbols: usize,
}

impl Draws {
    pub fn num_units(&self) -> usize {
        self.num_units
    }

    pub fn num_draws(&self) -> usize {
        self.num_draws
    }

    pub fn num_symbols(&self) -> usize {
        self.num_symbols
    }

    /// Draw `draw` of symbol `symbol` for unit `unit`
    pub fn get(&self, unit: usize, draw: usize, symbol: usize) -> Option<f64> {
        if unit >= self.num_units || draw >= self.num_draws || symbol >= self.num_symbols {
            return None;
        }
        self.values
            .get((unit * self.num_draws + draw) * self.num_symbols + symbol)
            .copied()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }
}

/// Access to the observations of an estimation or simulation
pub trait Dataset: Send + Sync {
    /// Column names, in storage order
    fn column_names(&self) -> &[String];

    fn num_rows(&self) -> usize;

    /// Value of column `column` at row `row`
    fn value(&self, row: usize, column: usize) -> f64;

    /// Position of the column `name`
    fn column_index(&self, name: &str) -> Option<usize> {
        self.column_names().iter().position(|c| c == name)
    }

    /// Whether observations are grouped by individual
    fn is_panel(&self) -> bool {
        self.panel_map().is_some()
    }

    fn panel_map(&self) -> Option<&PanelMap>;

    /// Generate `number` draws for each symbol of `types` (symbol name to draw type).
    ///
    /// Symbols are laid out in the iteration order of `types`.
    fn generate_draws(
        &self,
        types: &BTreeMap<String, String>,
        number: usize,
    ) -> Result<Draws, ExprError>;
}

/// Row-major in-memory dataset
#[derive(Debug, Clone, Default)]
pub struct MemoryDataset {
    columns: Vec<String>,
    rows: Vec<Vec<f64>>,
    panel: Option<PanelMap>,
    seed: Option<u64>,
}

impl MemoryDataset {
    /// Create a dataset from column names and rows
    ///
    /// # Errors
    /// `ShapeMismatch` if a row does not have one value per column,
    /// `DuplicateColumn` if a name appears twice.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<f64>>) -> Result<Self, ExprError> {
        for (i, name) in columns.iter().enumerate() {
            if columns[..i].contains(name) {
                return Err(ExprError::DuplicateColumn { name: name.clone() });
            }
        }
        if let Some((i, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, r)| r.len() != columns.len())
        {
            return Err(ExprError::ShapeMismatch(format!(
                "row {} has {} values for {} columns",
                i,
                row.len(),
                columns.len()
            )));
        }
        Ok(MemoryDataset {
            columns,
            rows,
            panel: None,
            seed: None,
        })
    }

    /// Parse textual cells. Cells that are not numbers are replaced by
    /// `missing_data`; the number of replaced cells is returned alongside.
    pub fn from_text_rows<S: AsRef<str>>(
        columns: Vec<String>,
        rows: &[Vec<S>],
        missing_data: f64,
    ) -> Result<(Self, usize), ExprError> {
        let mut missing = 0;
        let parsed = rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|cell| {
                        cell.as_ref().trim().parse::<f64>().unwrap_or_else(|_| {
                            missing += 1;
                            missing_data
                        })
                    })
                    .collect()
            })
            .collect();
        let dataset = Self::new(columns, parsed)?;
        if missing > 0 {
            info!(
                cells = missing,
                sentinel = missing_data,
                "Non-numeric cells replaced by the missing-data value"
            );
        }
        Ok((dataset, missing))
    }

    /// Group rows by the individual identifier in `column`.
    ///
    /// # Errors
    /// `UnknownColumn` if the column does not exist, `ShapeMismatch` if the
    /// rows of an individual are not contiguous.
    pub fn panel(mut self, column: &str) -> Result<Self, ExprError> {
        let col = self
            .column_index(column)
            .ok_or_else(|| ExprError::UnknownColumn {
                name: column.to_string(),
            })?;
        let mut map: PanelMap = Vec::new();
        let mut seen: Vec<f64> = Vec::new();
        for (row, values) in self.rows.iter().enumerate() {
            let id = values[col];
            if seen.last() == Some(&id) {
                if let Some(range) = map.last_mut() {
                    range.end = row + 1;
                }
                continue;
            }
            if seen.contains(&id) {
                return Err(ExprError::ShapeMismatch(format!(
                    "the observations of individual {} are not contiguous",
                    id
                )));
            }
            seen.push(id);
            map.push(row..row + 1);
        }
        info!(individuals = map.len(), column, "Panel structure declared");
        self.panel = Some(map);
        Ok(self)
    }

    /// Seed the draw generator so that draws are reproducible
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Add a column computed row by row from `expr` and return the variable
    /// referring to it.
    ///
    /// The expression may refer to existing columns.
    pub fn define_variable(
        &mut self,
        name: impl Into<String>,
        expr: Expr,
    ) -> Result<Expr, ExprError> {
        let name = name.into();
        if self.columns.contains(&name) {
            return Err(ExprError::DuplicateColumn { name });
        }
        let variable = Expr::variable(name.as_str())?;
        let tree = ExprTree::from_expr(expr);
        let root = tree.roots()[0];
        let values = (0..self.rows.len())
            .map(|row| Interpreter::new(&tree).with_row(&*self, row).evaluate(root))
            .collect::<Result<Vec<f64>, ExprError>>()?;
        for (row, v) in self.rows.iter_mut().zip(values) {
            row.push(v);
        }
        debug!(column = %name, "Variable defined");
        self.columns.push(name);
        Ok(variable)
    }

    fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}

fn draw_one(rng: &mut StdRng, draw_type: &str) -> Option<f64> {
    match draw_type {
        UNIFORM => Some(rng.gen::<f64>()),
        UNIFORMSYM => Some(2.0 * rng.gen::<f64>() - 1.0),
        NORMAL => {
            // Box-Muller
            let u1 = 1.0 - rng.gen::<f64>();
            let u2 = rng.gen::<f64>();
            Some((-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos())
        }
        _ => None,
    }
}

impl Dataset for MemoryDataset {
    fn column_names(&self) -> &[String] {
        &self.columns
    }

    fn num_rows(&self) -> usize {
        self.rows.len()
    }

    fn value(&self, row: usize, column: usize) -> f64 {
        self.rows[row][column]
    }

    fn panel_map(&self) -> Option<&PanelMap> {
        self.panel.as_ref()
    }

    fn generate_draws(
        &self,
        types: &BTreeMap<String, String>,
        number: usize,
    ) -> Result<Draws, ExprError> {
        if let Some((name, draw_type)) = types
            .iter()
            .find(|(_, t)| ![UNIFORM, UNIFORMSYM, NORMAL].contains(&t.as_str()))
        {
            return Err(ExprError::UnknownDrawType {
                name: name.clone(),
                draw_type: draw_type.clone(),
            });
        }
        let num_units = self.panel.as_ref().map_or(self.rows.len(), Vec::len);
        let mut rng = self.rng();
        let mut values = Vec::with_capacity(num_units * number * types.len());
        for _ in 0..num_units {
            for _ in 0..number {
                for draw_type in types.values() {
                    values.push(draw_one(&mut rng, draw_type).unwrap_or(0.0));
                }
            }
        }
        debug!(
            units = num_units,
            draws = number,
            symbols = types.len(),
            "Draws generated"
        );
        Ok(Draws {
            values,
            num_units,
            num_draws: number,
            num_symbols: types.len(),
        })
    }
}
