use crate::assembly::local::QuadratureTable;
use crate::function::{Function, Parameter};
use crate::grid::Grid;
use crate::Real;
use nalgebra::{DMatrix, DVector};

/// Quadrature order for nonlinear functions of the state.
pub const NONLINEAR_QUADRATURE_ORDER: usize = 2;

/// Restricts the global vector `u` to the DOFs of the element.
pub fn gather_element_values<T: Real>(grid: &dyn Grid<T>, element: usize, u: &DVector<T>) -> DVector<T> {
    let vertices = grid.element_vertices(element);
    DVector::from_iterator(vertices.len(), vertices.iter().map(|&v| u[v]))
}

/// Evaluates the scalar function `f(u)` of the state at every quadrature point of the element.
fn evaluate_at_state<T: Real>(
    table: &QuadratureTable<T>,
    local_state: &DVector<T>,
    f: &dyn Function<T>,
    mu: Option<&Parameter<T>>,
) -> eyre::Result<Vec<T>> {
    table
        .interpolate(local_state)
        .iter()
        .map(|&u| f.evaluate_scalar(&DVector::from_element(1, u), mu))
        .collect()
}

/// Computes the nonlinear reaction residual of a single element.
///
/// The entry for basis function `i` is `q |J_e| sum_k w_k c(u_h(x_k)) phi_i(x_k)`, where `u_h`
/// interpolates the state `u` and `q` is the reaction coefficient value of the element.
pub fn nonlinear_reaction_element_vector<T: Real>(
    grid: &dyn Grid<T>,
    table: &QuadratureTable<T>,
    element: usize,
    u: &DVector<T>,
    coefficient: T,
    reaction: &dyn Function<T>,
    mu: Option<&Parameter<T>>,
) -> eyre::Result<DVector<T>> {
    let local_state = gather_element_values(grid, element, u);
    let c = evaluate_at_state(table, &local_state, reaction, mu)?;
    let mut vector = DVector::zeros(table.num_basis_functions());
    for (k, (&w, c_k)) in table.weights().iter().zip(c).enumerate() {
        vector += table.basis_values(k) * (w * c_k);
    }
    vector *= coefficient * grid.integration_element(element);
    Ok(vector)
}

/// Computes the Jacobian of the nonlinear reaction residual of a single element.
///
/// The entry `(i, j)` is `q |J_e| sum_k w_k c'(u_h(x_k)) phi_i(x_k) phi_j(x_k)`.
pub fn nonlinear_reaction_element_matrix<T: Real>(
    grid: &dyn Grid<T>,
    table: &QuadratureTable<T>,
    element: usize,
    u: &DVector<T>,
    coefficient: T,
    reaction_derivative: &dyn Function<T>,
    mu: Option<&Parameter<T>>,
) -> eyre::Result<DMatrix<T>> {
    let local_state = gather_element_values(grid, element, u);
    let dc = evaluate_at_state(table, &local_state, reaction_derivative, mu)?;
    let n = table.num_basis_functions();
    let mut matrix = DMatrix::zeros(n, n);
    for (k, (&w, dc_k)) in table.weights().iter().zip(dc).enumerate() {
        let phi = table.basis_values(k);
        matrix += &phi * phi.transpose() * (w * dc_k);
    }
    matrix *= coefficient * grid.integration_element(element);
    Ok(matrix)
}
