//! Gauss-Legendre rules in one dimension.
//!
//! [`gauss`] works on the symmetric interval `[-1, 1]`, while [`unit_gauss`] maps the same
//! rule to `[0, 1]`.

use crate::Rule;
use std::f64::consts::PI;

const MAX_NEWTON_ITERATIONS: usize = 100;
const ROOT_TOLERANCE: f64 = 1e-15;

/// Evaluates the Legendre polynomial `P_n` and its derivative at `x`.
///
/// Both are computed with the three-term recurrences
/// `m P_m = (2m - 1) x P_{m-1} - (m - 1) P_{m-2}` and `P'_m = m P_{m-1} + x P'_{m-1}`,
/// which stay well defined at the end points.
fn legendre(n: usize, x: f64) -> (f64, f64) {
    let (mut p, mut p_prev) = (1.0, 0.0);
    let mut dp = 0.0;
    for m in 1..=n {
        let m = m as f64;
        let p_next = ((2.0 * m - 1.0) * x * p - (m - 1.0) * p_prev) / m;
        dp = m * p + x * dp;
        p_prev = p;
        p = p_next;
    }
    (p, dp)
}

/// The `i`-th largest root of `P_n` together with `P'_n` evaluated there.
fn legendre_root(n: usize, i: usize) -> (f64, f64) {
    // Asymptotic guess, close enough for Newton to converge to the intended root
    let mut x = (PI * (i as f64 + 0.75) / (n as f64 + 0.5)).cos();
    let (mut p, mut dp) = legendre(n, x);
    for _ in 0..MAX_NEWTON_ITERATIONS {
        let step = p / dp;
        x -= step;
        (p, dp) = legendre(n, x);
        if step.abs() <= ROOT_TOLERANCE {
            break;
        }
    }
    (x, dp)
}

/// Gauss rule on `[-1, 1]` with the given number of points.
///
/// With `n` points polynomials of degree up to `2n - 1` are integrated exactly. Points are
/// returned in descending order.
///
/// # Panics
///
/// Panics if zero points are requested.
pub fn gauss(num_points: usize) -> Rule<1> {
    let n = num_points;
    assert!(n > 0, "number of points must be positive");

    // The roots are symmetric about zero, so only the upper half is computed
    let upper: Vec<(f64, f64)> = (0..(n + 1) / 2)
        .map(|i| {
            let (x, dp) = legendre_root(n, i);
            (x, 2.0 / ((1.0 - x * x) * dp * dp))
        })
        .collect();
    let lower = upper.iter().rev().skip(n % 2).map(|&(x, w)| (-x, w));

    upper.iter().copied().chain(lower).map(|(x, w)| (w, [x])).unzip()
}

/// Gauss rule on the unit interval `[0, 1]`.
///
/// Same as [`gauss`], with points mapped by `x -> (x + 1) / 2` and weights halved, so that the
/// weights sum to one.
pub fn unit_gauss(num_points: usize) -> Rule<1> {
    let (weights, points) = gauss(num_points);
    weights
        .into_iter()
        .zip(points)
        .map(|(w, [x])| (0.5 * w, [0.5 * (x + 1.0)]))
        .unzip()
}
