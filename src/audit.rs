//! Audit pass: structural and data-compatibility checks run before evaluation.
//!
//! The audit never fails. Every finding is recorded as an error (evaluation
//! must not proceed) or a warning (evaluation proceeds). Findings of children
//! come before those of their parent.

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use tracing::debug;

use crate::dataset::Dataset;
use crate::interpreter::Interpreter;
use crate::tree::{ExprTree, NodeId, NodeKind};
use crate::ExprError;

/// Longest list of offending observations quoted in a finding
const TRUNCATE: usize = 100;

/// Findings of the audit pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuditReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl AuditReport {
    /// No error was found (warnings allowed)
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    /// Append the findings of `other`
    pub fn merge(&mut self, other: AuditReport) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    /// Turn the errors into one combined `AuditFailed`, or return the warnings
    pub fn into_result(self) -> Result<Vec<String>, ExprError> {
        if self.errors.is_empty() {
            Ok(self.warnings)
        } else {
            Err(ExprError::AuditFailed {
                errors: self.errors,
            })
        }
    }
}

/// Audit the subtree rooted at `root`
pub fn audit(tree: &ExprTree, root: NodeId, dataset: Option<&dyn Dataset>) -> AuditReport {
    let mut report = AuditReport::default();
    for id in tree.post_order(root) {
        audit_node(tree, id, dataset, &mut report);
    }
    debug!(
        errors = report.errors.len(),
        warnings = report.warnings.len(),
        "Audit completed"
    );
    report
}

/// Audit every root of `tree`
pub fn audit_all(tree: &ExprTree, dataset: Option<&dyn Dataset>) -> AuditReport {
    let mut report = AuditReport::default();
    for &root in tree.roots() {
        report.merge(audit(tree, root, dataset));
    }
    report
}

fn audit_node(tree: &ExprTree, id: NodeId, dataset: Option<&dyn Dataset>, report: &mut AuditReport) {
    let children = tree.children(id);
    match tree.kind(id) {
        NodeKind::Draws { .. } => {
            if !tree.is_contained_in(id, NodeKind::is_monte_carlo) {
                report.errors.push(format!(
                    "bioDraws expression must be embedded into a MonteCarlo: {}",
                    tree.display(id)
                ));
            }
        }
        NodeKind::RandomVariable(_) => {
            if !tree.is_contained_in(id, NodeKind::is_integrate) {
                report.errors.push(format!(
                    "RandomVariable expression must be embedded into a integrate: {}",
                    tree.display(id)
                ));
            }
        }
        NodeKind::Integrate(_) => {
            if !tree.embeds(children[0], NodeKind::is_random_variable) {
                report.errors.push(format!(
                    "The argument of Integrate must contain a RandomVariable: {}",
                    tree.display(id)
                ));
            }
        }
        NodeKind::Variable(name) => match dataset {
            None => report.errors.push(format!(
                "The database must be provided to audit the variable {}.",
                name
            )),
            Some(ds) if ds.column_index(name).is_none() => report
                .errors
                .push(format!("Variable {} not found in the database.", name)),
            Some(_) => {}
        },
        kind if kind.is_monte_carlo() => audit_monte_carlo(tree, id, dataset, report),
        kind if kind.is_panel_trajectory() => match dataset {
            None => report.errors.push(format!(
                "Expression PanelLikelihoodTrajectory requires a database: {}",
                tree.display(id)
            )),
            Some(ds) if !ds.is_panel() => report.errors.push(format!(
                "Expression PanelLikelihoodTrajectory can only be used with panel data. \
                 Use the statement panel(\"IndividualId\") to declare the panel structure \
                 of the data: {}",
                tree.display(id)
            )),
            Some(_) => {}
        },
        NodeKind::LogLogit {
            util_keys, av_keys, ..
        } => {
            audit_log_logit(tree, id, util_keys, av_keys, dataset, report)
        }
        _ => {}
    }
}

fn audit_monte_carlo(
    tree: &ExprTree,
    id: NodeId,
    dataset: Option<&dyn Dataset>,
    report: &mut AuditReport,
) {
    let child = tree.children(id)[0];
    let has_trajectory = tree.embeds(child, NodeKind::is_panel_trajectory);
    match dataset {
        None if has_trajectory => report.warnings.push(
            "The formula contains a PanelLikelihoodTrajectory expression, and no database is given"
                .to_string(),
        ),
        Some(ds) if ds.is_panel() && !has_trajectory => report.errors.push(format!(
            "As the database is panel, the argument of MonteCarlo must contain a \
             PanelLikelihoodTrajectory: {}",
            tree.display(id)
        )),
        _ => {}
    }
    if !tree.embeds(child, NodeKind::is_draws) {
        report.errors.push(format!(
            "The argument of MonteCarlo must contain a bioDraws: {}",
            tree.display(id)
        ));
    }
    if tree.embeds(child, NodeKind::is_monte_carlo) {
        report.errors.push(format!(
            "It is not possible to include a MonteCarlo statement in another one: {}",
            tree.display(id)
        ));
    }
}

/// Join `row[value]` pairs with '-', truncated
fn observations(pairs: &[(usize, f64)]) -> String {
    truncated(
        pairs
            .iter()
            .map(|(row, v)| format!("{}[{}]", row, v))
            .collect::<Vec<_>>()
            .join("-"),
    )
}

fn truncated(content: String) -> String {
    if content.len() > TRUNCATE {
        let cut = (0..=TRUNCATE)
            .rev()
            .find(|&i| content.is_char_boundary(i))
            .unwrap_or(0);
        format!("{}...", &content[..cut])
    } else {
        content
    }
}

/// Chosen value and, when the choice is a valid key, the availability of that alternative
type ChoiceCheck = Result<(f64, Option<f64>), ExprError>;

fn check_choice(
    interpreter: Interpreter<'_>,
    choice: NodeId,
    util_keys: &[i64],
    av_keys: &[i64],
    avs: &[NodeId],
) -> ChoiceCheck {
    let value = interpreter.evaluate(choice)?;
    if value.fract() != 0.0 || !util_keys.contains(&(value as i64)) {
        return Ok((value, None));
    }
    match av_keys.iter().position(|&k| k == value as i64) {
        Some(pos) => Ok((value, Some(interpreter.evaluate(avs[pos])?))),
        None => Ok((value, None)),
    }
}

fn audit_log_logit(
    tree: &ExprTree,
    id: NodeId,
    util_keys: &[i64],
    av_keys: &[i64],
    dataset: Option<&dyn Dataset>,
    report: &mut AuditReport,
) {
    let children = tree.children(id);
    let choice = children[0];
    let avs = &children[util_keys.len() + 1..];

    let only_util: Vec<String> = util_keys
        .iter()
        .filter(|k| !av_keys.contains(k))
        .map(|k| format!("{} ", k))
        .collect();
    let only_av: Vec<String> = av_keys
        .iter()
        .filter(|k| !util_keys.contains(k))
        .map(|k| format!("{} ", k))
        .collect();
    let consistent = only_util.is_empty() && only_av.is_empty();
    if !consistent {
        let mut msg = String::from("Incompatible list of alternatives in logit expression. ");
        if !only_util.is_empty() {
            msg += &format!(
                "Id(s) used for utilities and not for availabilities: {}",
                only_util.join(", ")
            );
        }
        if !only_av.is_empty() {
            msg += &format!(
                " Id(s) used for availabilities and not for utilities: {}",
                only_av.join(", ")
            );
        }
        report.errors.push(msg);
    }

    let checks: Vec<ChoiceCheck> = match dataset {
        None => vec![check_choice(
            Interpreter::new(tree),
            choice,
            util_keys,
            av_keys,
            avs,
        )],
        Some(ds) => {
            let per_row = |row: usize| {
                check_choice(
                    Interpreter::new(tree).with_row(ds, row),
                    choice,
                    util_keys,
                    av_keys,
                    avs,
                )
            };
            #[cfg(feature = "parallel")]
            let checks = (0..ds.num_rows()).into_par_iter().map(per_row).collect();
            #[cfg(not(feature = "parallel"))]
            let checks = (0..ds.num_rows()).map(per_row).collect();
            checks
        }
    };

    let mut invalid = Vec::new();
    let mut unavailable = Vec::new();
    let mut failures = Vec::new();
    for (row, check) in checks.into_iter().enumerate() {
        match check {
            Ok((value, None)) if !util_keys.contains(&(value as i64)) || value.fract() != 0.0 => {
                invalid.push((row, value))
            }
            Ok((value, Some(av))) if av == 0.0 => unavailable.push((row, value)),
            Ok(_) => {}
            Err(e) => failures.push((row, e)),
        }
    }

    let choice_text = tree.display(choice);
    if !invalid.is_empty() {
        report.errors.push(format!(
            "The choice variable [{}] does not correspond to a valid alternative for the \
             following observations (rownumber[choice]): {}",
            choice_text,
            observations(&invalid)
        ));
    }
    // The message quotes the first failure only
    if let Some((_, first)) = failures.first() {
        let msg = match dataset {
            None => format!(
                "The choice of logit expression {} cannot be checked: {}",
                tree.display(id),
                first
            ),
            Some(_) => {
                let rows: Vec<String> = failures.iter().map(|(row, _)| row.to_string()).collect();
                format!(
                    "The choice of logit expression {} cannot be checked for the following \
                     observations (rownumber): {}. {}",
                    tree.display(id),
                    truncated(rows.join("-")),
                    first
                )
            }
        };
        report.errors.push(msg);
    }
    if consistent && !unavailable.is_empty() {
        let msg = match dataset {
            None => format!("The chosen alternative [{}] is not available", unavailable[0].1),
            Some(_) => format!(
                "The chosen alternative [{}] is not available for the following \
                 observations (rownumber[choice]): {}",
                choice_text,
                observations(&unavailable)
            ),
        };
        report.warnings.push(msg);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observation_list_is_truncated() {
        let pairs: Vec<(usize, f64)> = (0..50).map(|r| (r, 7.0)).collect();
        let text = observations(&pairs);
        assert!(text.ends_with("..."));
        assert_eq!(text.len(), TRUNCATE + 3);
        assert!(text.starts_with("0[7]-1[7]"));
    }

    #[test]
    fn test_report_into_result() {
        let report = AuditReport {
            errors: vec![],
            warnings: vec!["w".to_string()],
        };
        assert_eq!(report.into_result().unwrap(), vec!["w".to_string()]);

        let report = AuditReport {
            errors: vec!["a".to_string(), "b".to_string()],
            warnings: vec![],
        };
        assert!(matches!(
            report.into_result(),
            Err(ExprError::AuditFailed { errors }) if errors.len() == 2
        ));
    }
}
