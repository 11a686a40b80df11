use crate::Real;
use numeric_literals::replace_float_literals;

/// Bilinear basis functions on the unit square `[0, 1]^2`.
///
/// The vertices are numbered counter-clockwise starting at the origin, i.e.
/// `(0, 0)`, `(1, 0)`, `(1, 1)`, `(0, 1)`.
#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
pub fn square_basis<T: Real>(xi: [T; 2]) -> [T; 4] {
    let [x, y] = xi;
    [
        (1.0 - x) * (1.0 - y),
        x * (1.0 - y),
        x * y,
        (1.0 - x) * y,
    ]
}

/// Gradients of the bilinear basis functions, evaluated at `xi`.
#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
pub fn square_gradients<T: Real>(xi: [T; 2]) -> [[T; 2]; 4] {
    let [x, y] = xi;
    [
        [y - 1.0, x - 1.0],
        [1.0 - y, -x],
        [y, x],
        [-y, 1.0 - x],
    ]
}
