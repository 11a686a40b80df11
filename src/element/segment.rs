use crate::Real;
use numeric_literals::replace_float_literals;

/// Linear basis functions on the unit interval `[0, 1]`, evaluated at `xi`.
#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
pub fn segment_basis<T: Real>(xi: T) -> [T; 2] {
    [1.0 - xi, xi]
}

/// Gradients of the linear basis functions on the unit interval.
///
/// The gradients are constant.
#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
pub fn segment_gradients<T: Real>() -> [T; 2] {
    [-1.0, 1.0]
}
