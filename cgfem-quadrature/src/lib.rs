//! Quadrature rules for the unit reference domains of `cgfem`.
//!
//! All rules in the top-level functions of this crate are defined on the *unit* reference
//! domains:
//!
//! - the interval `[0, 1]`,
//! - the triangle with vertices `(0, 0)`, `(1, 0)`, `(0, 1)`,
//! - the square `[0, 1]^2`.
//!
//! The weights of each rule sum to the measure of its domain. Rules are requested by the
//! polynomial degree they must integrate exactly.
//!
//! The crate has no dependencies and works purely with `f64`, so that the rules can be
//! converted to any scalar type by the consumer.

use std::fmt;
use std::fmt::{Display, Formatter};

pub mod simplex;
pub mod tensor;
pub mod univariate;

/// Library-wide error type.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// Indicates that a rule satisfying the given requirements is not available.
    NoRuleAvailable,
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoRuleAvailable => {
                write!(
                    f,
                    "There is no quadrature rule satisfying the requirements available"
                )
            }
        }
    }
}

impl std::error::Error for Error {}

/// A D-dimensional point.
pub type Point<const D: usize> = [f64; D];

/// A two-dimensional point.
pub type Point2 = Point<2>;

/// A D-dimensional rule.
pub type Rule<const D: usize> = (Vec<f64>, Vec<Point<D>>);

/// A one-dimensional quadrature rule.
pub type Rule1d = Rule<1>;

/// A two-dimensional quadrature rule.
pub type Rule2d = Rule<2>;

/// Number of Gauss points per dimension needed to integrate polynomials of the given degree.
pub fn gauss_points_for_order(order: usize) -> usize {
    order / 2 + 1
}

/// Gauss rule on the unit interval `[0, 1]` exact for polynomials up to the given degree.
pub fn unit_interval(order: usize) -> Rule1d {
    univariate::unit_gauss(gauss_points_for_order(order))
}

/// Gauss rule on the unit square `[0, 1]^2` exact for tensor polynomials up to the given
/// degree in each variable.
pub fn unit_square(order: usize) -> Rule2d {
    tensor::unit_square_gauss(gauss_points_for_order(order))
}

/// Rule on the unit triangle exact for polynomials up to the given total degree.
///
/// Returns an error if no rule of the requested order is tabulated.
pub fn unit_triangle(order: usize) -> Result<Rule2d, Error> {
    simplex::triangle(order)
}

/// Integrates the given function with the given quadrature rule.
pub fn integrate<const D: usize>(rule: &Rule<D>, mut f: impl FnMut(&Point<D>) -> f64) -> f64 {
    let (weights, points) = rule;
    weights
        .iter()
        .zip(points)
        .map(|(w, x)| w * f(x))
        .sum()
}
