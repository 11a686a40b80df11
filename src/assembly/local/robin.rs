use crate::assembly::local::{ElementMatrices, QuadratureTable};
use crate::element::ReferenceElement;
use crate::function::{Function, Parameter, Shape};
use crate::grid::Grid;
use crate::Real;
use nalgebra::{DMatrix, DVector};

/// Quadrature order of the Robin boundary term.
pub const ROBIN_QUADRATURE_ORDER: usize = 2;

/// Evaluates the Robin coefficient at `x` on the given facet.
///
/// Vector valued coefficients are projected onto the unit outer normal of the facet.
fn robin_coefficient<T: Real>(
    grid: &dyn Grid<T>,
    coefficient: &dyn Function<T>,
    facet: usize,
    x: &DVector<T>,
    mu: Option<&Parameter<T>>,
) -> eyre::Result<T> {
    match coefficient.shape_range() {
        Shape::Scalar => coefficient.evaluate_scalar(x, mu),
        _ => Ok(coefficient
            .evaluate_vector(x, mu)?
            .dot(&grid.unit_outer_normal(facet))),
    }
}

/// Computes the Robin block `|F| sum_k w_k c(x_k) psi_i(s_k) psi_j(s_k)` of each given facet.
///
/// On one-dimensional grids the block is the `1 x 1` matrix holding the coefficient at the
/// boundary point.
pub fn assemble_robin_blocks<T: Real>(
    grid: &dyn Grid<T>,
    coefficient: &dyn Function<T>,
    facets: &[usize],
    mu: Option<&Parameter<T>>,
) -> eyre::Result<ElementMatrices<T>> {
    if grid.dim() == 1 {
        let mut blocks = ElementMatrices::new(1);
        for &facet in facets {
            let c = robin_coefficient(grid, coefficient, facet, &grid.facet_center(facet), mu)?;
            blocks.push(facet, grid.facet_vertices(facet), &DMatrix::from_element(1, 1, c));
        }
        return Ok(blocks);
    }

    let table = QuadratureTable::new(ReferenceElement::Line, ROBIN_QUADRATURE_ORDER)?;
    let n = table.num_basis_functions();
    let mut blocks = ElementMatrices::new(n);
    for &facet in facets {
        let mut block = DMatrix::zeros(n, n);
        for (k, (&w, s)) in table.weights().iter().zip(table.points()).enumerate() {
            let x = grid.map_facet_to_physical(facet, s[0]);
            let c = robin_coefficient(grid, coefficient, facet, &x, mu)?;
            let psi = table.basis_values(k);
            block += &psi * psi.transpose() * (w * c);
        }
        block *= grid.facet_integration_element(facet);
        blocks.push(facet, grid.facet_vertices(facet), &block);
    }
    Ok(blocks)
}
