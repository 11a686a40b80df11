use crate::assembly::local::{ElementMatrices, QuadratureTable};
use crate::function::{Function, Parameter};
use crate::grid::Grid;
use crate::Real;

/// Quadrature order for products of two basis functions.
pub const MASS_QUADRATURE_ORDER: usize = 2;

/// Computes the mass (or reaction) block of every element.
///
/// The block of element `e` is `c(x_e) |J_e| sum_k w_k phi_i(x_k) phi_j(x_k)`, where the
/// optional scalar coefficient `c` is evaluated at the element center `x_e` and defaults to one.
pub fn assemble_mass_blocks<T: Real>(
    grid: &dyn Grid<T>,
    coefficient: Option<&dyn Function<T>>,
    mu: Option<&Parameter<T>>,
) -> eyre::Result<ElementMatrices<T>> {
    let table = QuadratureTable::new(grid.reference_element(), MASS_QUADRATURE_ORDER)?;
    let reference_mass = table.basis_products();
    let mut blocks = ElementMatrices::new(table.num_basis_functions());
    for e in 0..grid.size(0) {
        let c = match coefficient {
            Some(f) => f.evaluate_scalar(grid.center(e), mu)?,
            None => T::one(),
        };
        let block = &reference_mass * (c * grid.integration_element(e));
        blocks.push(e, grid.element_vertices(e), &block);
    }
    Ok(blocks)
}
