//! Grid topology and geometry.
//!
//! The assembly routines only interact with grids through the [`Grid`] trait. [`ConformingGrid`]
//! is a simple implementation for conforming meshes of affinely mapped reference elements.
use crate::element::ReferenceElement;
use crate::{check_dimension, Real};
use eyre::eyre;
use nalgebra::{DMatrix, DVector};
use std::collections::BTreeMap;
use std::fmt::Debug;

pub mod procedural;

/// Topology and geometry queries needed for assembly.
///
/// Entities are addressed by codimension: codimension `0` are the elements, codimension `1` the
/// facets and codimension `dim` the vertices. Vertices coincide with the degrees of freedom of
/// the first order Lagrange spaces.
pub trait Grid<T: Real>: Debug + Send + Sync {
    fn reference_element(&self) -> ReferenceElement;

    fn dim(&self) -> usize {
        self.reference_element().dim()
    }

    /// Number of entities of the given codimension.
    fn size(&self, codim: usize) -> usize;

    /// Global vertex indices of the element, ordered like the reference element vertices.
    fn element_vertices(&self, element: usize) -> &[usize];

    /// Global vertex indices of the facet.
    fn facet_vertices(&self, facet: usize) -> &[usize];

    fn vertex(&self, index: usize) -> &DVector<T>;

    /// The inverse transposed Jacobian of the reference map of the element.
    fn jacobian_inverse_transposed(&self, element: usize) -> &DMatrix<T>;

    /// Absolute value of the determinant of the reference map Jacobian.
    fn integration_element(&self, element: usize) -> T;

    fn volume(&self, element: usize) -> T;

    fn center(&self, element: usize) -> &DVector<T>;

    /// Maps a reference coordinate of the element to physical space.
    fn map_to_physical(&self, element: usize, xi: &DVector<T>) -> DVector<T>;

    /// Ratio of physical to reference facet measure.
    fn facet_integration_element(&self, facet: usize) -> T;

    /// Maps the facet coordinate `s` in `[0, 1]` to physical space.
    ///
    /// For point facets of one-dimensional grids `s` is ignored.
    fn map_facet_to_physical(&self, facet: usize, s: T) -> DVector<T>;

    fn facet_center(&self, facet: usize) -> DVector<T> {
        self.map_facet_to_physical(facet, T::from_f64(0.5).expect("Literal must fit in T"))
    }

    /// Indices of the facets that belong to exactly one element, in ascending order.
    fn boundary_facets(&self) -> &[usize];

    /// Unit normal of the facet pointing out of its (first) adjacent element.
    fn unit_outer_normal(&self, facet: usize) -> DVector<T>;

    /// Total volume of the grid.
    fn total_volume(&self) -> T {
        (0..self.size(0)).fold(T::zero(), |acc, e| acc + self.volume(e))
    }
}

/// A conforming mesh of affinely mapped reference elements.
///
/// Geometric quantities are computed once on construction. Square elements are mapped with the
/// affine map through vertices `0`, `1` and `3`, so they must be parallelograms.
#[derive(Debug, Clone)]
pub struct ConformingGrid<T: Real> {
    reference_element: ReferenceElement,
    vertices: Vec<DVector<T>>,
    elements: Vec<Vec<usize>>,
    facets: Vec<Vec<usize>>,
    // First element adjacent to each facet
    facet_elements: Vec<usize>,
    boundary_facets: Vec<usize>,
    jacobians: Vec<DMatrix<T>>,
    jacobians_inverse_transposed: Vec<DMatrix<T>>,
    integration_elements: Vec<T>,
    centers: Vec<DVector<T>>,
}

impl<T: Real> ConformingGrid<T> {
    /// Creates a grid from vertex coordinates and element connectivity.
    ///
    /// Fails if coordinates have the wrong dimension, if an element references a vertex that
    /// does not exist or has the wrong number of vertices, or if an element is degenerate.
    pub fn new(
        reference_element: ReferenceElement,
        vertices: Vec<DVector<T>>,
        elements: Vec<Vec<usize>>,
    ) -> eyre::Result<Self> {
        let dim = reference_element.dim();
        for v in &vertices {
            check_dimension(dim, v.len(), "vertex coordinates")?;
        }

        let num_vertices = vertices.len();
        let mut jacobians = Vec::with_capacity(elements.len());
        let mut jacobians_inverse_transposed = Vec::with_capacity(elements.len());
        let mut integration_elements = Vec::with_capacity(elements.len());
        let mut centers = Vec::with_capacity(elements.len());

        for (element_idx, element) in elements.iter().enumerate() {
            check_dimension(reference_element.num_vertices(), element.len(), "element connectivity")?;
            if let Some(&v) = element.iter().find(|&&v| v >= num_vertices) {
                return Err(eyre!(
                    "element {} references vertex {}, but the grid only has {} vertices",
                    element_idx,
                    v,
                    num_vertices
                ));
            }

            let affine = reference_element.affine_vertices();
            let origin = &vertices[element[affine[0]]];
            let jacobian = DMatrix::from_fn(dim, dim, |i, j| vertices[element[affine[j + 1]]][i] - origin[i]);
            let determinant = jacobian.determinant();
            if determinant == T::zero() {
                return Err(eyre!("element {} is degenerate", element_idx));
            }
            let jacobian_inverse = jacobian
                .clone()
                .try_inverse()
                .ok_or_else(|| eyre!("Jacobian of element {} is not invertible", element_idx))?;

            centers.push(origin + &jacobian * reference_element.center::<T>());
            integration_elements.push(determinant.abs());
            jacobians_inverse_transposed.push(jacobian_inverse.transpose());
            jacobians.push(jacobian);
        }

        let (facets, facet_elements, boundary_facets) = find_facets(reference_element, num_vertices, &elements);

        Ok(Self {
            reference_element,
            vertices,
            elements,
            facets,
            facet_elements,
            boundary_facets,
            jacobians,
            jacobians_inverse_transposed,
            integration_elements,
            centers,
        })
    }

    pub fn vertices(&self) -> &[DVector<T>] {
        &self.vertices
    }

    pub fn elements(&self) -> &[Vec<usize>] {
        &self.elements
    }

    /// Jacobian of the reference map of the given element.
    pub fn jacobian(&self, element: usize) -> &DMatrix<T> {
        &self.jacobians[element]
    }
}

/// Enumerates the facets of the mesh.
///
/// In one dimension facets are the vertices themselves, so that facet `i` is vertex `i`. In two
/// dimensions facets are numbered in order of first appearance while iterating over the elements.
/// Returns the facets, the first element adjacent to each facet and the sorted boundary facets.
fn find_facets(
    reference_element: ReferenceElement,
    num_vertices: usize,
    elements: &[Vec<usize>],
) -> (Vec<Vec<usize>>, Vec<usize>, Vec<usize>) {
    let mut facets = Vec::new();
    let mut facet_elements = Vec::new();
    let mut counts = Vec::new();

    if reference_element.dim() == 1 {
        facets = (0..num_vertices).map(|v| vec![v]).collect();
        facet_elements = vec![usize::MAX; num_vertices];
        counts = vec![0; num_vertices];
        for (element_idx, element) in elements.iter().enumerate() {
            for &v in element {
                if counts[v] == 0 {
                    facet_elements[v] = element_idx;
                }
                counts[v] += 1;
            }
        }
    } else {
        // Use a BTreeMap with sorted vertex lists as keys to stay deterministic
        let mut facet_indices = BTreeMap::new();
        for (element_idx, element) in elements.iter().enumerate() {
            for local_facet in reference_element.facets() {
                let facet: Vec<usize> = local_facet.iter().map(|&i| element[i]).collect();
                let mut key = facet.clone();
                key.sort_unstable();
                let index = *facet_indices.entry(key).or_insert_with(|| {
                    facets.push(facet);
                    facet_elements.push(element_idx);
                    counts.push(0);
                    facets.len() - 1
                });
                counts[index] += 1;
            }
        }
    }

    let boundary_facets = counts
        .iter()
        .enumerate()
        .filter(|&(_, &count)| count == 1)
        .map(|(i, _)| i)
        .collect();
    (facets, facet_elements, boundary_facets)
}

impl<T: Real> Grid<T> for ConformingGrid<T> {
    fn reference_element(&self) -> ReferenceElement {
        self.reference_element
    }

    fn size(&self, codim: usize) -> usize {
        let dim = self.dim();
        if codim == 0 {
            self.elements.len()
        } else if codim == dim {
            self.vertices.len()
        } else if codim == 1 {
            self.facets.len()
        } else {
            0
        }
    }

    fn element_vertices(&self, element: usize) -> &[usize] {
        &self.elements[element]
    }

    fn facet_vertices(&self, facet: usize) -> &[usize] {
        &self.facets[facet]
    }

    fn vertex(&self, index: usize) -> &DVector<T> {
        &self.vertices[index]
    }

    fn jacobian_inverse_transposed(&self, element: usize) -> &DMatrix<T> {
        &self.jacobians_inverse_transposed[element]
    }

    fn integration_element(&self, element: usize) -> T {
        self.integration_elements[element]
    }

    fn volume(&self, element: usize) -> T {
        self.reference_element.volume::<T>() * self.integration_elements[element]
    }

    fn center(&self, element: usize) -> &DVector<T> {
        &self.centers[element]
    }

    fn map_to_physical(&self, element: usize, xi: &DVector<T>) -> DVector<T> {
        let origin = &self.vertices[self.elements[element][0]];
        origin + &self.jacobians[element] * xi
    }

    fn facet_integration_element(&self, facet: usize) -> T {
        match self.facets[facet].as_slice() {
            &[a, b] => (&self.vertices[b] - &self.vertices[a]).norm(),
            _ => T::one(),
        }
    }

    fn map_facet_to_physical(&self, facet: usize, s: T) -> DVector<T> {
        match self.facets[facet].as_slice() {
            &[a, b] => &self.vertices[a] + (&self.vertices[b] - &self.vertices[a]) * s,
            vertices => self.vertices[vertices[0]].clone(),
        }
    }

    fn boundary_facets(&self) -> &[usize] {
        &self.boundary_facets
    }

    fn unit_outer_normal(&self, facet: usize) -> DVector<T> {
        let element_center = &self.centers[self.facet_elements[facet]];
        let outward = self.facet_center(facet) - element_center;
        let normal = match self.facets[facet].as_slice() {
            &[a, b] => {
                let t = &self.vertices[b] - &self.vertices[a];
                DVector::from_row_slice(&[t[1], -t[0]]) / t.norm()
            }
            _ => DVector::from_element(1, T::one()),
        };
        if normal.dot(&outward) < T::zero() {
            -normal
        } else {
            normal
        }
    }
}
