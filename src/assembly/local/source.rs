use crate::assembly::local::{ElementVectors, QuadratureTable};
use crate::element::ReferenceElement;
use crate::function::{Function, Parameter};
use crate::grid::Grid;
use crate::Real;
use nalgebra::DVector;

/// Quadrature order of the load functionals, whose data is taken at centers.
pub const LOAD_QUADRATURE_ORDER: usize = 1;

/// Computes the load vector `f(x_e) |J_e| sum_k w_k phi_i(x_k)` of every element.
pub fn assemble_source_vectors<T: Real>(
    grid: &dyn Grid<T>,
    f: &dyn Function<T>,
    mu: Option<&Parameter<T>>,
) -> eyre::Result<ElementVectors<T>> {
    let table = QuadratureTable::new(grid.reference_element(), LOAD_QUADRATURE_ORDER)?;
    let integrals = table.basis_integrals();
    let mut vectors = ElementVectors::new(table.num_basis_functions());
    for e in 0..grid.size(0) {
        let value = f.evaluate_scalar(grid.center(e), mu)?;
        let block = &integrals * (value * grid.integration_element(e));
        vectors.push(e, grid.element_vertices(e), &block);
    }
    Ok(vectors)
}

/// Computes the boundary load vector of each of the given facets.
///
/// On one-dimensional grids, facets are points and the block is the value of `f` at the point.
/// Otherwise the block of facet `F` is `f(x_F) |F| sum_k w_k psi_i(s_k)`, where `psi` are the
/// linear basis functions on the facet and `x_F` is the facet center.
pub fn assemble_boundary_source_vectors<T: Real>(
    grid: &dyn Grid<T>,
    f: &dyn Function<T>,
    facets: &[usize],
    mu: Option<&Parameter<T>>,
) -> eyre::Result<ElementVectors<T>> {
    if grid.dim() == 1 {
        let mut vectors = ElementVectors::new(1);
        for &facet in facets {
            let value = f.evaluate_scalar(&grid.facet_center(facet), mu)?;
            vectors.push(facet, grid.facet_vertices(facet), &DVector::from_element(1, value));
        }
        return Ok(vectors);
    }

    let table = QuadratureTable::new(ReferenceElement::Line, LOAD_QUADRATURE_ORDER)?;
    let integrals = table.basis_integrals();
    let mut vectors = ElementVectors::new(table.num_basis_functions());
    for &facet in facets {
        let value = f.evaluate_scalar(&grid.facet_center(facet), mu)?;
        let block = &integrals * (value * grid.facet_integration_element(facet));
        vectors.push(facet, grid.facet_vertices(facet), &block);
    }
    Ok(vectors)
}
