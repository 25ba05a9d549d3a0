use std::collections::BTreeMap;

use super::{binary_logit, free, swissmetro_like, var};
use crate::{audit, audit_all, Dataset, Expr, ExprTree, MemoryDataset};

fn audit_expr(expr: Expr, dataset: Option<&dyn Dataset>) -> crate::AuditReport {
    let tree = ExprTree::from_expr(expr);
    audit(&tree, tree.roots()[0], dataset)
}

fn constant_logit(util_keys: &[i64], av_keys: &[i64], choice: f64) -> Expr {
    let util: BTreeMap<i64, f64> = util_keys.iter().map(|&k| (k, k as f64)).collect();
    let av: BTreeMap<i64, f64> = av_keys.iter().map(|&k| (k, 1.0)).collect();
    Expr::log_logit(util, Some(av), choice)
}

#[test]
fn test_draws_outside_monte_carlo() {
    let d = Expr::draws("ERR_TRAIN", "NORMAL").unwrap();
    let report = audit_expr(free("B", 0.0) * d, None);
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].contains("ERR_TRAIN"));
    assert!(report.warnings.is_empty());
}

#[test]
fn test_draws_inside_monte_carlo() {
    let d = Expr::draws("ERR_TRAIN", "NORMAL").unwrap();
    let report = audit_expr(Expr::monte_carlo((free("B", 0.0) * d).exp()).log(), None);
    assert!(report.is_ok());
}

#[test]
fn test_monte_carlo_rules() {
    let report = audit_expr(Expr::monte_carlo(free("B", 0.0)), None);
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].contains("must contain a bioDraws"));

    let d1 = Expr::draws("d1", "NORMAL").unwrap();
    let d2 = Expr::draws("d2", "NORMAL").unwrap();
    let report = audit_expr(Expr::monte_carlo(d1 * Expr::monte_carlo(d2)), None);
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].contains("in another one"));
}

#[test]
fn test_monte_carlo_and_panel_data() {
    let panel = swissmetro_like().panel("ID").unwrap();
    let flat = swissmetro_like();

    // Panel data without trajectory inside the aggregator
    let d = Expr::draws("d", "NORMAL").unwrap();
    let report = audit_expr(Expr::monte_carlo(d * var("TRAIN_TT")), Some(&panel));
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].starts_with("As the database is panel"));

    // Trajectory inside, panel data
    let d = Expr::draws("d", "NORMAL").unwrap();
    let traj = Expr::panel_trajectory((d * var("TRAIN_TT")).exp());
    let report = audit_expr(Expr::monte_carlo(traj).log(), Some(&panel));
    assert!(report.is_ok(), "{:?}", report.errors);

    // Trajectory inside, flat data: only the trajectory rule fires
    let d = Expr::draws("d", "NORMAL").unwrap();
    let traj = Expr::panel_trajectory((d * var("TRAIN_TT")).exp());
    let report = audit_expr(Expr::monte_carlo(traj), Some(&flat));
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].contains("can only be used with panel data"));

    // Trajectory inside, no data: warning from the aggregator, error from the trajectory
    let d = Expr::draws("d", "NORMAL").unwrap();
    let report = audit_expr(Expr::monte_carlo(Expr::panel_trajectory(d)), None);
    assert_eq!(report.warnings.len(), 1);
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].contains("requires a database"));
}

#[test]
fn test_random_variable_rules() {
    let omega = Expr::random_variable("omega").unwrap();
    let report = audit_expr(omega.normal_cdf(), None);
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].contains("integrate"));

    let omega = Expr::random_variable("omega").unwrap();
    let report = audit_expr(Expr::integrate(omega.normal_cdf(), "omega").unwrap(), None);
    assert!(report.is_ok());

    let report = audit_expr(Expr::integrate(free("B", 0.0), "omega").unwrap(), None);
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].contains("must contain a RandomVariable"));
}

#[test]
fn test_variable_rules() {
    let report = audit_expr(var("TRAIN_TT") * 2, None);
    assert_eq!(report.errors.len(), 1);

    let ds = swissmetro_like();
    let report = audit_expr(var("BUS_TT") + var("TRAIN_TT"), Some(&ds));
    assert_eq!(
        report.errors,
        vec!["Variable BUS_TT not found in the database.".to_string()]
    );
}

#[test]
fn test_key_mismatch_reported_once() {
    let report = audit_expr(constant_logit(&[1, 2, 3], &[1, 2], 1.0), None);
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].contains("not for availabilities: 3"));
    assert!(!report.errors[0].contains("not for utilities"));

    let report = audit_expr(constant_logit(&[1, 2], &[1, 2, 4], 1.0), None);
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].contains("not for utilities: 4"));

    let report = audit_expr(constant_logit(&[1, 2, 3], &[1, 2, 3], 1.0), None);
    assert!(report.errors.is_empty());
}

#[test]
fn test_invalid_choice_names_row_and_value() {
    let ds = MemoryDataset::new(
        vec!["CHOICE".into()],
        vec![vec![1.0], vec![3.0], vec![2.0]],
    )
    .unwrap();
    let mut util = BTreeMap::new();
    util.insert(1, 0.0);
    util.insert(2, 1.0);
    let e = Expr::log_logit::<f64, f64>(util, None, var("CHOICE"));
    let report = audit_expr(e, Some(&ds));
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].ends_with("(rownumber[choice]): 1[3]"));
}

#[test]
fn test_unavailable_choice_is_a_warning() {
    let ds = swissmetro_like();
    let report = audit_expr(binary_logit(), Some(&ds));
    assert!(report.is_ok(), "{:?}", report.errors);
    assert_eq!(report.warnings.len(), 1);
    assert!(report.warnings[0].ends_with("(rownumber[choice]): 2[2]"));

    // Without data the single choice value is checked
    let mut util = BTreeMap::new();
    util.insert(1, 0.0);
    util.insert(2, 1.0);
    let mut av = BTreeMap::new();
    av.insert(1, 1.0);
    av.insert(2, 0.0);
    let report = audit_expr(Expr::log_logit(util, Some(av), 2), None);
    assert_eq!(
        report.warnings,
        vec!["The chosen alternative [2] is not available".to_string()]
    );
}

#[test]
fn test_choice_evaluation_failure_is_an_error() {
    let mut util = BTreeMap::new();
    util.insert(1, 0.0);
    let d = Expr::draws("d", "UNIFORM").unwrap();
    let report = audit_expr(Expr::log_logit::<f64, f64>(util, None, d), None);
    // Draws outside Monte-Carlo, and the choice cannot be evaluated
    assert_eq!(report.errors.len(), 2);
    assert!(report.errors[1].contains("cannot be checked"));
}

#[test]
fn test_audit_all_collects_every_root() {
    let mut tree = ExprTree::new();
    tree.add_root(Expr::draws("a", "NORMAL").unwrap());
    tree.add_root(Expr::draws("b", "NORMAL").unwrap());
    let report = audit_all(&tree, None);
    assert_eq!(report.errors.len(), 2);
}

#[test]
fn test_failing_row_does_not_hide_other_findings() {
    let ds = MemoryDataset::new(
        vec!["CHOICE".into(), "K".into()],
        vec![vec![5.0, 0.0], vec![1.0, 3.0], vec![2.0, 0.0]],
    )
    .unwrap();
    let mut util = BTreeMap::new();
    util.insert(1, Expr::numeric(0.0));
    util.insert(2, Expr::numeric(1.0));
    let mut av1 = BTreeMap::new();
    av1.insert(0, 1.0);
    let mut av = BTreeMap::new();
    av.insert(1, Expr::elem(av1, var("K")));
    av.insert(2, Expr::numeric(0.0));
    let report = audit_expr(Expr::log_logit(util, Some(av), var("CHOICE")), Some(&ds));

    assert_eq!(report.errors.len(), 2, "{:?}", report.errors);
    assert!(report.errors[0].ends_with("(rownumber[choice]): 0[5]"));
    assert!(report.errors[1].contains("cannot be checked for the following observations (rownumber): 1."));
    assert!(report.errors[1].contains("Key 3 is not present"));
    // Row 2 is still checked after the failure on row 1
    assert_eq!(report.warnings.len(), 1);
    assert!(report.warnings[0].ends_with("(rownumber[choice]): 2[2]"));
}
