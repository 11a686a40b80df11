use crate::assembly::local::{ElementMatrices, QuadratureTable};
use crate::element::ReferenceElement;
use crate::function::{Function, Parameter, Shape};
use crate::grid::Grid;
use crate::Real;
use nalgebra::{DMatrix, DVector};

/// Quadrature order for products of two gradients.
///
/// First order elements with constant gradients are integrated exactly by a single point,
/// bilinear gradients need a rule of order two.
pub fn gradient_quadrature_order(reference_element: ReferenceElement) -> usize {
    match reference_element {
        ReferenceElement::Square => 2,
        ReferenceElement::Line | ReferenceElement::Triangle => 1,
    }
}

/// Evaluates a diffusion coefficient at `x` as a `dim x dim` matrix.
fn diffusion_tensor<T: Real>(
    diffusion: Option<&dyn Function<T>>,
    dim: usize,
    x: &DVector<T>,
    mu: Option<&Parameter<T>>,
) -> eyre::Result<DMatrix<T>> {
    match diffusion {
        None => Ok(DMatrix::identity(dim, dim)),
        Some(f) if f.shape_range() == Shape::Scalar => Ok(DMatrix::identity(dim, dim) * f.evaluate_scalar(x, mu)?),
        Some(f) => f.evaluate(x, mu),
    }
}

/// Computes the stiffness block of every element.
///
/// The block of element `e` is `c |J_e| sum_k w_k (G_i(x_k) . D G_j(x_k))` with physical
/// gradients `G`. The coefficient `D` is evaluated at the element center. It may be scalar,
/// matrix valued or absent, in which case it is the identity.
pub fn assemble_diffusion_blocks<T: Real>(
    grid: &dyn Grid<T>,
    diffusion: Option<&dyn Function<T>>,
    constant: T,
    mu: Option<&Parameter<T>>,
) -> eyre::Result<ElementMatrices<T>> {
    let table = QuadratureTable::new(grid.reference_element(), gradient_quadrature_order(grid.reference_element()))?;
    let n = table.num_basis_functions();
    let mut blocks = ElementMatrices::new(n);
    for e in 0..grid.size(0) {
        let d = diffusion_tensor(diffusion, grid.dim(), grid.center(e), mu)?;
        let jit = grid.jacobian_inverse_transposed(e);
        let scale = constant * grid.integration_element(e);
        let mut block = DMatrix::zeros(n, n);
        for (k, &w) in table.weights().iter().enumerate() {
            let g = table.physical_gradients(jit, k);
            block += g.transpose() * &d * &g * (w * scale);
        }
        blocks.push(e, grid.element_vertices(e), &block);
    }
    Ok(blocks)
}
