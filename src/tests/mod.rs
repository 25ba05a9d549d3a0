mod audit_tests;
mod numbering_tests;

use std::collections::BTreeMap;

use crate::{Expr, MemoryDataset, ParamStatus};

pub(crate) fn free(name: &str, value: f64) -> Expr {
    Expr::beta(name, value, None, None, ParamStatus::Free).unwrap()
}

pub(crate) fn fixed(name: &str, value: f64) -> Expr {
    Expr::beta(name, value, None, None, ParamStatus::Fixed).unwrap()
}

pub(crate) fn var(name: &str) -> Expr {
    Expr::variable(name).unwrap()
}

/// Small mode-choice dataset: individual id, choice, two travel times, availability of alt 2
pub(crate) fn swissmetro_like() -> MemoryDataset {
    MemoryDataset::new(
        vec![
            "ID".into(),
            "CHOICE".into(),
            "TRAIN_TT".into(),
            "CAR_TT".into(),
            "CAR_AV".into(),
        ],
        vec![
            vec![1.0, 1.0, 1.2, 0.8, 1.0],
            vec![1.0, 2.0, 1.5, 0.9, 1.0],
            vec![2.0, 2.0, 0.7, 1.1, 0.0],
            vec![3.0, 1.0, 1.0, 1.0, 1.0],
        ],
    )
    .unwrap()
}

/// Binary logit on `swissmetro_like`
pub(crate) fn binary_logit() -> Expr {
    let mut util = BTreeMap::new();
    util.insert(1, free("B_TIME", -1.0) * var("TRAIN_TT"));
    util.insert(2, free("ASC_CAR", 0.0) + free("B_TIME", -1.0) * var("CAR_TT"));
    let mut av = BTreeMap::new();
    av.insert(1, Expr::numeric(1.0));
    av.insert(2, var("CAR_AV"));
    Expr::log_logit(util, Some(av), var("CHOICE"))
}
