//! Operator overloading for ergonomic expression building
//!
//! Each operator produces the corresponding `Binary`/`Unary` node and
//! carries no other semantics. Comparisons cannot overload `PartialOrd`
//! (which must return `bool`), so they are the `*_expr` methods in
//! `constructors`.
//!
//! # Example
//! ```
//! use bioexpr::Expr;
//!
//! let x = Expr::variable("x").unwrap();
//! let y = Expr::variable("y").unwrap();
//! let e = (x.clone() + 1.0) * y - 2.0 * x;
//! ```

use std::ops::{Add, BitAnd, BitOr, Div, Mul, Neg, Sub};

use super::{BinaryOp, Expr, UnaryOp};

// ===== Macro for generating operator implementations =====
// Generates arithmetic and logical operator impls for combinations of types

macro_rules! impl_binary_ops {
    ($lhs:ty, $rhs:ty) => {
        impl Add<$rhs> for $lhs {
            type Output = Expr;
            fn add(self, rhs: $rhs) -> Expr {
                Expr::binary(BinaryOp::Plus, self, rhs)
            }
        }
        impl Sub<$rhs> for $lhs {
            type Output = Expr;
            fn sub(self, rhs: $rhs) -> Expr {
                Expr::binary(BinaryOp::Minus, self, rhs)
            }
        }
        impl Mul<$rhs> for $lhs {
            type Output = Expr;
            fn mul(self, rhs: $rhs) -> Expr {
                Expr::binary(BinaryOp::Times, self, rhs)
            }
        }
        impl Div<$rhs> for $lhs {
            type Output = Expr;
            fn div(self, rhs: $rhs) -> Expr {
                Expr::binary(BinaryOp::Divide, self, rhs)
            }
        }
        impl BitAnd<$rhs> for $lhs {
            type Output = Expr;
            fn bitand(self, rhs: $rhs) -> Expr {
                Expr::binary(BinaryOp::And, self, rhs)
            }
        }
        impl BitOr<$rhs> for $lhs {
            type Output = Expr;
            fn bitor(self, rhs: $rhs) -> Expr {
                Expr::binary(BinaryOp::Or, self, rhs)
            }
        }
    };
}

impl_binary_ops!(Expr, Expr);
impl_binary_ops!(Expr, f64);
impl_binary_ops!(Expr, i32);
// Literal on the left side
impl_binary_ops!(f64, Expr);
impl_binary_ops!(i32, Expr);

impl Neg for Expr {
    type Output = Expr;
    fn neg(self) -> Expr {
        Expr::unary(UnaryOp::Neg, self)
    }
}

#[cfg(test)]
mod tests {
    use crate::{BinaryOp, Expr, ExprKind, UnaryOp};

    #[test]
    fn test_operator_maps_to_variant() {
        let x = Expr::variable("x").unwrap();
        let e = 2.0 - x;
        assert!(matches!(e.kind, ExprKind::Binary(BinaryOp::Minus, _, _)));

        let y = Expr::variable("y").unwrap();
        let e = -(y & 1);
        match e.kind {
            ExprKind::Unary(UnaryOp::Neg, inner) => {
                assert!(matches!(inner.kind, ExprKind::Binary(BinaryOp::And, _, _)))
            }
            other => panic!("unexpected kind {:?}", other),
        }
    }

    #[test]
    fn test_argument_order_is_preserved() {
        let a = Expr::variable("a").unwrap();
        let e = 3 / a;
        match e.kind {
            ExprKind::Binary(BinaryOp::Divide, l, r) => {
                assert_eq!(l.as_numeric(), Some(3.0));
                assert!(matches!(r.kind, ExprKind::Variable(ref n) if n == "a"));
            }
            other => panic!("unexpected kind {:?}", other),
        }
    }
}
