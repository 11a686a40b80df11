//! Functionality for error estimation.
//!
//! Errors are measured between the piecewise linear interpolants of nodal vectors, integrated
//! with the quadrature rule of a [`QuadratureTable`].
use crate::assembly::local::{gather_element_values, QuadratureTable};
use crate::function::{Function, Parameter};
use crate::grid::Grid;
use crate::{check_dimension, Real};
use itertools::izip;
use nalgebra::DVector;

/// Estimate the squared $L^2$ error $\norm{u_h - u_{d,h}}^2_{L^2}$ on the given element.
///
/// Both `u` and `u_d` are global nodal vectors.
pub fn estimate_element_l2_error_squared<T: Real>(
    grid: &dyn Grid<T>,
    table: &QuadratureTable<T>,
    element: usize,
    u: &DVector<T>,
    u_d: &DVector<T>,
) -> T {
    let local_error = gather_element_values(grid, element, u) - gather_element_values(grid, element, u_d);
    let error_at_points = table.interpolate(&local_error);

    let mut result = T::zero();
    for (&w, &e) in izip!(table.weights(), error_at_points.iter()) {
        result += w * e * e;
    }
    result * grid.integration_element(element)
}

/// Estimate the squared $L^2$ error $\norm{u_h - u}^2_{L^2}$ on the given element, where $u$ is
/// given as a function of space.
pub fn estimate_element_l2_error_squared_to_function<T: Real>(
    grid: &dyn Grid<T>,
    table: &QuadratureTable<T>,
    element: usize,
    u_h: &DVector<T>,
    u: &dyn Function<T>,
    mu: Option<&Parameter<T>>,
) -> eyre::Result<T> {
    let u_h_at_points = table.interpolate(&gather_element_values(grid, element, u_h));

    let mut result = T::zero();
    for (&w, xi, &u_h_k) in izip!(table.weights(), table.points(), u_h_at_points.iter()) {
        let x = grid.map_to_physical(element, xi);
        let error = u_h_k - u.evaluate_scalar(&x, mu)?;
        result += w * error * error;
    }
    Ok(result * grid.integration_element(element))
}

/// The gradient of [`estimate_element_l2_error_squared`] with respect to the local DOFs of `u`.
///
/// Entry $i$ is $|J_e| \sum_k w_k 2 (u_h - u_{d,h})(x_k) \phi_i(x_k)$.
pub fn estimate_element_l2_error_squared_gradient<T: Real>(
    grid: &dyn Grid<T>,
    table: &QuadratureTable<T>,
    element: usize,
    u: &DVector<T>,
    u_d: &DVector<T>,
) -> DVector<T> {
    let local_error = gather_element_values(grid, element, u) - gather_element_values(grid, element, u_d);
    let error_at_points = table.interpolate(&local_error);
    let two = T::one() + T::one();

    let mut gradient = DVector::zeros(table.num_basis_functions());
    for (k, (&w, &e)) in izip!(table.weights(), error_at_points.iter()).enumerate() {
        gradient += table.basis_values(k) * (w * two * e);
    }
    gradient * grid.integration_element(element)
}

/// Estimate the squared $L^2$ error $\norm{u_h - u_{d,h}}^2_{L^2}$ over the whole grid.
pub fn estimate_l2_error_squared<T: Real>(
    grid: &dyn Grid<T>,
    table: &QuadratureTable<T>,
    u: &DVector<T>,
    u_d: &DVector<T>,
) -> eyre::Result<T> {
    let n = grid.size(grid.dim());
    check_dimension(n, u.len(), "state")?;
    check_dimension(n, u_d.len(), "target state")?;
    Ok((0..grid.size(0))
        .map(|e| estimate_element_l2_error_squared(grid, table, e, u, u_d))
        .fold(T::zero(), |acc, e| acc + e))
}

/// Estimate the squared $L^2$ error $\norm{u_h - u}^2_{L^2}$ over the whole grid.
pub fn estimate_l2_error_squared_to_function<T: Real>(
    grid: &dyn Grid<T>,
    table: &QuadratureTable<T>,
    u_h: &DVector<T>,
    u: &dyn Function<T>,
    mu: Option<&Parameter<T>>,
) -> eyre::Result<T> {
    check_dimension(grid.size(grid.dim()), u_h.len(), "state")?;
    let mut result = T::zero();
    for e in 0..grid.size(0) {
        result += estimate_element_l2_error_squared_to_function(grid, table, e, u_h, u, mu)?;
    }
    Ok(result)
}
