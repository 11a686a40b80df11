//! Quadrature rules on the reference elements.
//!
//! The rules themselves are tabulated in `f64` by the `cgfem-quadrature` crate and converted to
//! the scalar type in use here.
use crate::element::ReferenceElement;
use crate::Real;
use nalgebra::DVector;

/// Errors returned by quadrature methods.
pub use cgfem_quadrature::Error as QuadratureError;

/// A quadrature rule on a reference element.
#[derive(Debug, Clone, PartialEq)]
pub struct QuadratureRule<T: Real> {
    weights: Vec<T>,
    points: Vec<DVector<T>>,
}

impl<T: Real> QuadratureRule<T> {
    /// Builds a rule from raw weights and points.
    ///
    /// # Panics
    ///
    /// Panics if the number of weights and points differ.
    pub fn from_parts(weights: Vec<T>, points: Vec<DVector<T>>) -> Self {
        assert_eq!(weights.len(), points.len(), "Number of weights and points must agree");
        Self { weights, points }
    }

    pub fn weights(&self) -> &[T] {
        &self.weights
    }

    pub fn points(&self) -> &[DVector<T>] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Approximates the integral of the given function over the reference domain.
    pub fn integrate(&self, f: impl Fn(&DVector<T>) -> T) -> T {
        self.weights
            .iter()
            .zip(&self.points)
            .fold(T::zero(), |acc, (&w, x)| acc + w * f(x))
    }
}

fn convert_rule<T: Real, const D: usize>(rule: cgfem_quadrature::Rule<D>) -> QuadratureRule<T> {
    let (weights, points) = rule;
    let convert = |x: f64| T::from_f64(x).expect("Quadrature data must fit in T");
    QuadratureRule {
        weights: weights.into_iter().map(convert).collect(),
        points: points
            .into_iter()
            .map(|p| DVector::from_iterator(D, p.into_iter().map(convert)))
            .collect(),
    }
}

/// Returns a rule on the reference element that integrates polynomials of the given degree
/// exactly.
///
/// The weights sum to the volume of the reference element.
pub fn quadrature<T: Real>(reference_element: ReferenceElement, order: usize) -> eyre::Result<QuadratureRule<T>> {
    let rule = match reference_element {
        ReferenceElement::Line => convert_rule(cgfem_quadrature::unit_interval(order)),
        ReferenceElement::Triangle => convert_rule(cgfem_quadrature::unit_triangle(order)?),
        ReferenceElement::Square => convert_rule(cgfem_quadrature::unit_square(order)),
    };
    Ok(rule)
}
