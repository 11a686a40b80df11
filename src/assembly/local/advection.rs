use crate::assembly::local::{gradient_quadrature_order, ElementMatrices, QuadratureTable};
use crate::function::{Function, Parameter};
use crate::grid::Grid;
use crate::Real;
use nalgebra::DMatrix;

/// Computes the advection block of every element.
///
/// The entry in row `i` and column `j` of the block of element `e` is
/// `-|J_e| sum_k w_k phi_j(x_k) (v . G_i(x_k))`, i.e. the convective term in its weak form after
/// integration by parts, with the test function in the row. The velocity field `v` is evaluated
/// at the element center.
pub fn assemble_advection_blocks<T: Real>(
    grid: &dyn Grid<T>,
    velocity: &dyn Function<T>,
    mu: Option<&Parameter<T>>,
) -> eyre::Result<ElementMatrices<T>> {
    let reference_element = grid.reference_element();
    let table = QuadratureTable::new(reference_element, gradient_quadrature_order(reference_element))?;
    let n = table.num_basis_functions();
    let mut blocks = ElementMatrices::new(n);
    for e in 0..grid.size(0) {
        let v = velocity.evaluate_vector(grid.center(e), mu)?;
        let jit = grid.jacobian_inverse_transposed(e);
        let mut block = DMatrix::zeros(n, n);
        for (k, &w) in table.weights().iter().enumerate() {
            // Entry i holds v . G_i
            let convection = table.physical_gradients(jit, k).tr_mul(&v);
            block -= &convection * table.basis_values(k).transpose() * w;
        }
        block *= grid.integration_element(e);
        blocks.push(e, grid.element_vertices(e), &block);
    }
    Ok(blocks)
}
