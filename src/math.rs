//! Special functions used by the local interpreter.
//!
//! Generic over `num_traits::Float` so the same code serves `f32` and `f64`.

use num_traits::{Float, FloatConst};

/// Number of terms of the Maclaurin series / continued fraction
const MAX_TERMS: usize = 60;

/// Below this magnitude the Maclaurin series is used, above it the continued fraction
const SERIES_LIMIT: f64 = 2.0;

/// Error function
pub fn eval_erf<T: Float + FloatConst>(x: T) -> T {
    let sign = x.signum();
    let ax = x.abs();
    let limit = T::from(SERIES_LIMIT).unwrap_or_else(T::one);
    if ax < limit {
        sign * erf_series(ax)
    } else {
        sign * (T::one() - erfc_continued_fraction(ax))
    }
}

/// Cumulative distribution function of the standard normal: `0.5 * (1 + erf(x / sqrt(2)))`
pub fn eval_normal_cdf<T: Float + FloatConst>(x: T) -> T {
    let half = T::one() / (T::one() + T::one());
    if x.is_nan() {
        return x;
    }
    if x.is_infinite() {
        return if x > T::zero() { T::one() } else { T::zero() };
    }
    let z = x / T::SQRT_2();
    if z < -T::from(SERIES_LIMIT).unwrap_or_else(T::one) {
        // Keep precision in the lower tail
        return half * erfc_continued_fraction(-z);
    }
    half * (T::one() + eval_erf(z))
}

fn erf_series<T: Float + FloatConst>(x: T) -> T {
    let mut sum = T::zero();
    let mut factorial = T::one();
    let mut power = x;
    let mut n = T::zero();
    let two = T::one() + T::one();

    for i in 0..MAX_TERMS {
        let term = power / (factorial * (two * n + T::one()));
        if term.is_nan() || term.is_infinite() {
            break;
        }
        if i % 2 == 0 {
            sum = sum + term;
        } else {
            sum = sum - term;
        }
        n = n + T::one();
        factorial = factorial * n;
        power = power * x * x;
        if term.abs() < T::epsilon() {
            break;
        }
    }
    T::FRAC_2_SQRT_PI() * sum
}

// erfc(x) = exp(-x^2) / sqrt(pi) / (x + (1/2) / (x + 1 / (x + (3/2) / (x + ...))))
fn erfc_continued_fraction<T: Float + FloatConst>(x: T) -> T {
    let half = T::one() / (T::one() + T::one());
    let mut t = x;
    let mut n = T::from(MAX_TERMS).unwrap_or_else(T::one);
    while n > T::zero() {
        t = x + n * half / t;
        n = n - T::one();
    }
    (-x * x).exp() / (T::PI().sqrt() * t)
}
