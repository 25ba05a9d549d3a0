use std::collections::BTreeMap;

use super::{binary_logit, fixed, free, swissmetro_like, var};
use crate::{Dataset, Expr, ExprError, ExprTree, Numbering, SymbolCategory, SymbolIndex};

#[test]
fn test_category_order_and_sorting() {
    let mut tree = ExprTree::new();
    let d = Expr::draws("xi", "NORMAL").unwrap();
    let rv = Expr::random_variable("omega").unwrap();
    let root = tree.add_root(
        free("Z", 0.0) + free("A", 0.0) + fixed("F", 1.0)
            + Expr::monte_carlo(d)
            + Expr::integrate(rv, "omega").unwrap()
            + var("x"),
    );
    let columns = vec!["y".to_string(), "x".to_string()];
    let numbering = Numbering::build(&tree, &columns).unwrap();

    assert_eq!(numbering.free_betas(), ["A", "Z"]);
    assert_eq!(numbering.fixed_betas(), ["F"]);
    assert_eq!(numbering.random_variables(), ["omega"]);
    assert_eq!(numbering.draws(), ["xi"]);
    assert_eq!(numbering.variables(), ["y", "x"]);

    // free(2) + fixed(1) + rv(1) + draws(1), then columns in dataset order
    assert_eq!(numbering.unique_id("A"), Some(0));
    assert_eq!(numbering.unique_id("Z"), Some(1));
    assert_eq!(numbering.unique_id("F"), Some(2));
    assert_eq!(numbering.unique_id("omega"), Some(3));
    assert_eq!(numbering.unique_id("xi"), Some(4));
    assert_eq!(numbering.unique_id("y"), Some(5));
    assert_eq!(numbering.unique_id("x"), Some(6));
    assert_eq!(numbering.len(), 7);

    let x = tree.get_elementary(root, "x").unwrap();
    assert_eq!(
        numbering.index_of(x),
        Some(SymbolIndex {
            unique_id: 6,
            specific: 1
        })
    );
}

#[test]
fn test_every_instance_gets_the_same_index() {
    let mut tree = ExprTree::new();
    let r1 = tree.add_root(free("B", 0.0) * 2);
    let r2 = tree.add_root(free("B", 0.0) - 1);
    let numbering = Numbering::build(&tree, &[]).unwrap();
    let b1 = tree.get_elementary(r1, "B").unwrap();
    let b2 = tree.get_elementary(r2, "B").unwrap();
    assert_ne!(b1, b2);
    assert_eq!(numbering.index_of(b1), numbering.index_of(b2));
}

#[test]
fn test_free_and_fixed_duplicate_named_once() {
    let mut tree = ExprTree::new();
    tree.add_root(free("B", 0.0) + free("C", 0.0));
    tree.add_root(fixed("B", 1.0) * fixed("B", 1.0));
    match Numbering::build(&tree, &[]) {
        Err(ExprError::DuplicateSymbols { names }) => assert_eq!(names, vec!["B".to_string()]),
        other => panic!("unexpected result {:?}", other),
    }
}

#[test]
fn test_parameter_named_like_a_column() {
    let tree = ExprTree::from_expr(free("CHOICE", 0.0) * var("TRAIN_TT"));
    let ds = swissmetro_like();
    assert!(matches!(
        Numbering::build(&tree, ds.column_names()),
        Err(ExprError::DuplicateSymbols { names }) if names == ["CHOICE"]
    ));
}

#[test]
fn test_derive_target_resolution() {
    let tree = ExprTree::from_expr(Expr::derive(free("B", 0.0) * var("x"), "B").unwrap());
    let numbering = Numbering::build(&tree, &["x".to_string()]).unwrap();
    let root = tree.roots()[0];
    assert_eq!(numbering.derive_target(root), Some(0));

    let tree = ExprTree::from_expr(Expr::derive(free("B", 0.0), "C").unwrap());
    assert_eq!(
        Numbering::build(&tree, &[]).unwrap_err(),
        ExprError::unknown_symbol("C")
    );
}

#[test]
fn test_integrate_target_must_be_random_variable() {
    let omega = Expr::random_variable("omega").unwrap();
    let tree = ExprTree::from_expr(Expr::integrate(omega * free("B", 0.0), "B").unwrap());
    match Numbering::build(&tree, &[]) {
        Err(ExprError::UnknownSymbol { name, category }) => {
            assert_eq!(name, "B");
            assert_eq!(category, Some(SymbolCategory::RandomVariable));
        }
        other => panic!("unexpected result {:?}", other),
    }
}

#[test]
fn test_values_and_overrides() {
    let tree = ExprTree::from_expr(binary_logit() + fixed("SCALE", 2.0));
    let ds = swissmetro_like();
    let numbering = Numbering::build(&tree, ds.column_names()).unwrap();
    assert_eq!(numbering.free_betas(), ["ASC_CAR", "B_TIME"]);
    assert_eq!(numbering.free_values(), vec![0.0, -1.0]);
    assert_eq!(numbering.fixed_values(), vec![2.0]);

    let mut betas = rustc_hash::FxHashMap::default();
    betas.insert("B_TIME".to_string(), -0.5);
    betas.insert("SCALE".to_string(), 3.0);
    let (free_values, fixed_values) = numbering.values_with_overrides(&betas);
    assert_eq!(free_values, vec![0.0, -0.5]);
    assert_eq!(fixed_values, vec![3.0]);
    assert_eq!(numbering.parameter("SCALE").map(|p| p.is_free()), Some(false));
}

#[test]
fn test_renumbering_for_another_dataset_is_fresh() {
    let tree = ExprTree::from_expr(free("B", 0.0) * var("x"));
    let root = tree.roots()[0];
    let x = tree.get_elementary(root, "x").unwrap();

    let first = Numbering::build(&tree, &["x".to_string()]).unwrap();
    let second = Numbering::build(&tree, &["w".to_string(), "x".to_string()]).unwrap();
    assert_eq!(first.index_of(x).map(|i| i.specific), Some(0));
    assert_eq!(second.index_of(x).map(|i| i.specific), Some(1));

    let without = Numbering::build(&tree, &[]).unwrap();
    assert_eq!(without.index_of(x), None);
}

#[test]
fn test_symbol_queries() {
    let mut util = BTreeMap::new();
    util.insert(1, free("B1", 0.0) * var("x"));
    util.insert(2, fixed("B2", 0.0) + Expr::monte_carlo(Expr::draws("d", "UNIFORM").unwrap()));
    let tree = ExprTree::from_expr(Expr::mult_sum_map(util));
    let root = tree.roots()[0];

    assert_eq!(
        tree.set_of_betas(root, true, true).into_iter().collect::<Vec<_>>(),
        vec!["B1".to_string(), "B2".to_string()]
    );
    assert_eq!(tree.set_of_betas(root, false, true).len(), 1);
    assert!(tree.dict_of_variables(root).contains_key("x"));
    assert_eq!(tree.dict_of_draws(root).get("d").map(String::as_str), Some("UNIFORM"));
    assert!(tree.dict_of_random_variables(root).is_empty());
}
