//! Classification of the grid boundary into Dirichlet, Neumann and Robin parts.
use crate::grid::Grid;
use crate::Real;
use eyre::eyre;
use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Debug;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundaryType {
    Dirichlet,
    Neumann,
    Robin,
}

/// Boundary classification consumed by the assemblers.
///
/// Facets are classified by type. A vertex is a Dirichlet vertex if it belongs to a Dirichlet
/// facet. Since vertices are the degrees of freedom, [`BoundaryInfo::dirichlet_mask`] is
/// indexable by global DOF.
pub trait BoundaryInfo: Debug + Send + Sync {
    /// Boundary types with at least one facet, in ascending order.
    fn boundary_types(&self) -> Vec<BoundaryType>;

    /// Sorted indices of the facets of the given type.
    fn facets(&self, boundary_type: BoundaryType) -> &[usize];

    /// Sorted indices of the Dirichlet vertices.
    fn dirichlet_vertices(&self) -> &[usize];

    /// Mask over all vertices, `true` for Dirichlet vertices.
    fn dirichlet_mask(&self) -> &[bool];

    fn has_dirichlet(&self) -> bool {
        self.boundary_types().contains(&BoundaryType::Dirichlet)
    }

    fn has_neumann(&self) -> bool {
        self.boundary_types().contains(&BoundaryType::Neumann)
    }

    fn has_robin(&self) -> bool {
        self.boundary_types().contains(&BoundaryType::Robin)
    }

    fn robin_facets(&self) -> &[usize] {
        self.facets(BoundaryType::Robin)
    }
}

/// Boundary info stored as explicit facet lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenericBoundaryInfo {
    facets: BTreeMap<BoundaryType, Vec<usize>>,
    dirichlet_vertices: Vec<usize>,
    dirichlet_mask: Vec<bool>,
}

impl GenericBoundaryInfo {
    /// Creates boundary info from facet lists.
    ///
    /// Fails if a facet is classified twice or is not a boundary facet of the grid.
    pub fn from_facets<T: Real>(
        grid: &dyn Grid<T>,
        facets: BTreeMap<BoundaryType, Vec<usize>>,
    ) -> eyre::Result<Self> {
        let dim = grid.dim();
        let mut classified = BTreeMap::new();
        for (&boundary_type, type_facets) in &facets {
            for &facet in type_facets {
                if grid.boundary_facets().binary_search(&facet).is_err() {
                    return Err(eyre!("facet {} is not a boundary facet", facet));
                }
                if let Some(other) = classified.insert(facet, boundary_type) {
                    return Err(eyre!(
                        "facet {} is classified as both {:?} and {:?}",
                        facet,
                        other,
                        boundary_type
                    ));
                }
            }
        }

        let mut dirichlet_mask = vec![false; grid.size(dim)];
        if let Some(dirichlet_facets) = facets.get(&BoundaryType::Dirichlet) {
            for &facet in dirichlet_facets {
                for &v in grid.facet_vertices(facet) {
                    dirichlet_mask[v] = true;
                }
            }
        }
        let dirichlet_vertices = dirichlet_mask
            .iter()
            .enumerate()
            .filter(|&(_, &is_dirichlet)| is_dirichlet)
            .map(|(v, _)| v)
            .collect();

        let facets = facets
            .into_iter()
            .filter(|(_, type_facets)| !type_facets.is_empty())
            .map(|(boundary_type, mut type_facets)| {
                type_facets.sort_unstable();
                (boundary_type, type_facets)
            })
            .collect();

        Ok(Self {
            facets,
            dirichlet_vertices,
            dirichlet_mask,
        })
    }

    /// Classifies boundary facets by evaluating indicators at the facet centers.
    ///
    /// Facets that no indicator claims stay unclassified, which amounts to a homogeneous
    /// Neumann condition.
    pub fn from_indicators<T: Real>(
        grid: &dyn Grid<T>,
        indicators: &[(BoundaryType, &dyn Fn(&DVector<T>) -> bool)],
    ) -> eyre::Result<Self> {
        let mut facets: BTreeMap<BoundaryType, Vec<usize>> = BTreeMap::new();
        for &facet in grid.boundary_facets() {
            let center = grid.facet_center(facet);
            for (boundary_type, indicator) in indicators {
                if indicator(&center) {
                    facets.entry(*boundary_type).or_default().push(facet);
                }
            }
        }
        Self::from_facets(grid, facets)
    }

    /// Boundary info with the whole boundary of type Dirichlet.
    pub fn all_dirichlet<T: Real>(grid: &dyn Grid<T>) -> Self {
        Self::uniform(grid, BoundaryType::Dirichlet)
    }

    /// Boundary info with the whole boundary of the given type.
    pub fn uniform<T: Real>(grid: &dyn Grid<T>, boundary_type: BoundaryType) -> Self {
        let facets = BTreeMap::from([(boundary_type, grid.boundary_facets().to_vec())]);
        Self::from_facets(grid, facets).expect("Boundary facets of a grid are always valid")
    }

    /// Boundary info without any classified facets.
    pub fn empty<T: Real>(grid: &dyn Grid<T>) -> Self {
        Self {
            facets: BTreeMap::new(),
            dirichlet_vertices: Vec::new(),
            dirichlet_mask: vec![false; grid.size(grid.dim())],
        }
    }
}

impl BoundaryInfo for GenericBoundaryInfo {
    fn boundary_types(&self) -> Vec<BoundaryType> {
        self.facets.keys().copied().collect()
    }

    fn facets(&self, boundary_type: BoundaryType) -> &[usize] {
        self.facets
            .get(&boundary_type)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn dirichlet_vertices(&self) -> &[usize] {
        &self.dirichlet_vertices
    }

    fn dirichlet_mask(&self) -> &[bool] {
        &self.dirichlet_mask
    }
}
