//! Basic procedural grid generation.
use crate::element::ReferenceElement;
use crate::grid::ConformingGrid;
use crate::{Error, Real};
use nalgebra::DVector;

/// Creates a uniform grid of `num_elements` line elements on the interval `[a, b]`.
pub fn create_interval_grid<T: Real>(a: T, b: T, num_elements: usize) -> eyre::Result<ConformingGrid<T>> {
    let n = T::from_usize(num_elements).expect("Must be able to fit usize in T");
    let h = (b - a) / n;
    let vertices = (0..=num_elements)
        .map(|i| {
            let i_as_t = T::from_usize(i).expect("Must be able to fit usize in T");
            DVector::from_element(1, a + h * i_as_t)
        })
        .collect();
    let elements = (0..num_elements).map(|i| vec![i, i + 1]).collect();
    ConformingGrid::new(ReferenceElement::Line, vertices, elements)
}

/// Creates a uniform grid of the unit interval.
pub fn create_unit_interval_grid<T: Real>(num_elements: usize) -> eyre::Result<ConformingGrid<T>> {
    create_interval_grid(T::zero(), T::one(), num_elements)
}

/// Creates a structured grid of the rectangle `[bottom_left, top_right]`.
///
/// The rectangle is divided into `cells_x` by `cells_y` squares. With
/// [`ReferenceElement::Triangle`] every square is split along its diagonal from bottom left to
/// top right. Vertices are numbered row by row, starting in the bottom left corner.
pub fn create_rectangular_grid<T: Real>(
    reference_element: ReferenceElement,
    bottom_left: [T; 2],
    top_right: [T; 2],
    cells_x: usize,
    cells_y: usize,
) -> eyre::Result<ConformingGrid<T>> {
    if reference_element == ReferenceElement::Line {
        Err(Error::UnsupportedReferenceElement(
            "rectangular grids consist of triangles or squares".to_string(),
        ))?;
    }

    let to_t = |i: usize| T::from_usize(i).expect("Must be able to fit usize in T");
    let hx = (top_right[0] - bottom_left[0]) / to_t(cells_x);
    let hy = (top_right[1] - bottom_left[1]) / to_t(cells_y);

    let mut vertices = Vec::with_capacity((cells_x + 1) * (cells_y + 1));
    for j in 0..=cells_y {
        for i in 0..=cells_x {
            let x = bottom_left[0] + hx * to_t(i);
            let y = bottom_left[1] + hy * to_t(j);
            vertices.push(DVector::from_row_slice(&[x, y]));
        }
    }

    let to_global_vertex_index = |i, j| (cells_x + 1) * j + i;
    let mut elements = Vec::new();
    for j in 0..cells_y {
        for i in 0..cells_x {
            let quad = [
                to_global_vertex_index(i, j),
                to_global_vertex_index(i + 1, j),
                to_global_vertex_index(i + 1, j + 1),
                to_global_vertex_index(i, j + 1),
            ];
            match reference_element {
                ReferenceElement::Triangle => {
                    elements.push(vec![quad[0], quad[1], quad[2]]);
                    elements.push(vec![quad[0], quad[2], quad[3]]);
                }
                _ => elements.push(quad.to_vec()),
            }
        }
    }

    ConformingGrid::new(reference_element, vertices, elements)
}

/// Creates a structured grid of the unit square with `n` cells in each direction.
pub fn create_unit_square_grid<T: Real>(
    reference_element: ReferenceElement,
    n: usize,
) -> eyre::Result<ConformingGrid<T>> {
    create_rectangular_grid(reference_element, [T::zero(), T::zero()], [T::one(), T::one()], n, n)
}
