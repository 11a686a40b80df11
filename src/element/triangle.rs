use crate::Real;
use numeric_literals::replace_float_literals;

/// Linear basis functions on the unit triangle with vertices `(0, 0)`, `(1, 0)`, `(0, 1)`.
#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
pub fn triangle_basis<T: Real>(xi: [T; 2]) -> [T; 3] {
    let [x, y] = xi;
    [1.0 - x - y, x, y]
}

/// Gradients of the linear triangle basis functions, one `[d/dx, d/dy]` pair per function.
#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
pub fn triangle_gradients<T: Real>() -> [[T; 2]; 3] {
    [[-1.0, -1.0], [1.0, 0.0], [0.0, 1.0]]
}
