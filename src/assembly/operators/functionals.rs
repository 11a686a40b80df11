use crate::assembly::global::{assemble_dense_vector, element_vectors, ElementVector};
use crate::assembly::local::{assemble_boundary_source_vectors, assemble_source_vectors, ElementVectors};
use crate::assembly::operators::{dirichlet_mask, VectorFunctional};
use crate::boundary::{BoundaryInfo, BoundaryType};
use crate::function::{check_function, Function, Parameter, Shape};
use crate::grid::Grid;
use crate::{Error, Real};
use nalgebra::DVector;
use std::sync::Arc;

/// The load functional `v -> int f v`.
///
/// Optionally, entries of Dirichlet DOFs are set to zero.
#[derive(Debug, Clone)]
pub struct L2Functional<T: Real> {
    grid: Arc<dyn Grid<T>>,
    function: Arc<dyn Function<T>>,
    boundary_info: Option<Arc<dyn BoundaryInfo>>,
    clear_dirichlet_dofs: bool,
    name: String,
}

impl<T: Real> L2Functional<T> {
    pub fn new(grid: Arc<dyn Grid<T>>, function: Arc<dyn Function<T>>) -> eyre::Result<Self> {
        check_function(function.as_ref(), grid.dim(), &[Shape::Scalar])?;
        Ok(Self {
            grid,
            function,
            boundary_info: None,
            clear_dirichlet_dofs: false,
            name: "l2_functional".to_string(),
        })
    }

    /// Sets entries of Dirichlet DOFs to zero.
    pub fn with_cleared_dirichlet_dofs(self, boundary_info: Arc<dyn BoundaryInfo>) -> Self {
        Self {
            boundary_info: Some(boundary_info),
            clear_dirichlet_dofs: true,
            ..self
        }
    }

    pub fn with_name(self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self
        }
    }

    fn vectors(&self, mu: Option<&Parameter<T>>) -> eyre::Result<ElementVectors<T>> {
        log::debug!("Integrating load vectors of {}", self.name);
        assemble_source_vectors(self.grid.as_ref(), self.function.as_ref(), mu)
    }

    fn mask(&self) -> Option<&[bool]> {
        dirichlet_mask(&self.boundary_info).filter(|_| self.clear_dirichlet_dofs)
    }
}

impl<T: Real> VectorFunctional<T> for L2Functional<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn dim(&self) -> usize {
        self.grid.size(self.grid.dim())
    }

    fn assemble(&self, mu: Option<&Parameter<T>>) -> eyre::Result<DVector<T>> {
        assemble_dense_vector(self.dim(), &self.vectors(mu)?, self.mask())
    }

    fn assemble_element_contributions(&self, mu: Option<&Parameter<T>>) -> eyre::Result<Vec<ElementVector<T>>> {
        Ok(element_vectors(&self.vectors(mu)?, self.mask()))
    }
}

/// The boundary load functional `v -> int_Gamma g v`.
///
/// Integrates over the facets of one boundary type, or over the whole boundary if no type is
/// given. Element contributions are given per facet.
#[derive(Debug, Clone)]
pub struct BoundaryL2Functional<T: Real> {
    grid: Arc<dyn Grid<T>>,
    function: Arc<dyn Function<T>>,
    boundary_info: Option<Arc<dyn BoundaryInfo>>,
    boundary_type: Option<BoundaryType>,
    clear_dirichlet_dofs: bool,
    name: String,
}

impl<T: Real> BoundaryL2Functional<T> {
    /// A functional integrating over the whole boundary.
    pub fn new(grid: Arc<dyn Grid<T>>, function: Arc<dyn Function<T>>) -> eyre::Result<Self> {
        check_function(function.as_ref(), grid.dim(), &[Shape::Scalar])?;
        Ok(Self {
            grid,
            function,
            boundary_info: None,
            boundary_type: None,
            clear_dirichlet_dofs: false,
            name: "boundary_l2_functional".to_string(),
        })
    }

    /// Restricts integration to facets of the given boundary type.
    pub fn with_boundary_type(self, boundary_info: Arc<dyn BoundaryInfo>, boundary_type: BoundaryType) -> Self {
        Self {
            boundary_info: Some(boundary_info),
            boundary_type: Some(boundary_type),
            ..self
        }
    }

    /// Sets entries of Dirichlet DOFs to zero.
    pub fn with_cleared_dirichlet_dofs(self) -> eyre::Result<Self> {
        if self.boundary_info.is_none() {
            Err(Error::MissingBoundaryInfo)?;
        }
        Ok(Self {
            clear_dirichlet_dofs: true,
            ..self
        })
    }

    pub fn with_name(self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self
        }
    }

    fn facets(&self) -> &[usize] {
        match (&self.boundary_info, self.boundary_type) {
            (Some(info), Some(boundary_type)) => info.facets(boundary_type),
            _ => self.grid.boundary_facets(),
        }
    }

    fn vectors(&self, mu: Option<&Parameter<T>>) -> eyre::Result<ElementVectors<T>> {
        let facets = self.facets();
        log::debug!("Integrating boundary load vectors of {} on {} facets", self.name, facets.len());
        assemble_boundary_source_vectors(self.grid.as_ref(), self.function.as_ref(), facets, mu)
    }

    fn mask(&self) -> Option<&[bool]> {
        dirichlet_mask(&self.boundary_info).filter(|_| self.clear_dirichlet_dofs)
    }
}

impl<T: Real> VectorFunctional<T> for BoundaryL2Functional<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn dim(&self) -> usize {
        self.grid.size(self.grid.dim())
    }

    fn assemble(&self, mu: Option<&Parameter<T>>) -> eyre::Result<DVector<T>> {
        assemble_dense_vector(self.dim(), &self.vectors(mu)?, self.mask())
    }

    fn assemble_element_contributions(&self, mu: Option<&Parameter<T>>) -> eyre::Result<Vec<ElementVector<T>>> {
        Ok(element_vectors(&self.vectors(mu)?, self.mask()))
    }
}

/// Dirichlet data `g` evaluated at the Dirichlet DOFs, zero elsewhere.
///
/// Combined with the unit diagonal of the Dirichlet rows of the system matrix, this imposes
/// `u = g` at Dirichlet DOFs.
#[derive(Debug, Clone)]
pub struct BoundaryDirichletFunctional<T: Real> {
    grid: Arc<dyn Grid<T>>,
    dirichlet_data: Arc<dyn Function<T>>,
    boundary_info: Arc<dyn BoundaryInfo>,
    name: String,
}

impl<T: Real> BoundaryDirichletFunctional<T> {
    pub fn new(
        grid: Arc<dyn Grid<T>>,
        dirichlet_data: Arc<dyn Function<T>>,
        boundary_info: Arc<dyn BoundaryInfo>,
    ) -> eyre::Result<Self> {
        check_function(dirichlet_data.as_ref(), grid.dim(), &[Shape::Scalar])?;
        Ok(Self {
            grid,
            dirichlet_data,
            boundary_info,
            name: "dirichlet_functional".to_string(),
        })
    }
}

impl<T: Real> VectorFunctional<T> for BoundaryDirichletFunctional<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn dim(&self) -> usize {
        self.grid.size(self.grid.dim())
    }

    fn assemble(&self, mu: Option<&Parameter<T>>) -> eyre::Result<DVector<T>> {
        let mut vector = DVector::zeros(self.dim());
        for &v in self.boundary_info.dirichlet_vertices() {
            vector[v] = self.dirichlet_data.evaluate_scalar(self.grid.vertex(v), mu)?;
        }
        Ok(vector)
    }

    fn assemble_element_contributions(&self, _mu: Option<&Parameter<T>>) -> eyre::Result<Vec<ElementVector<T>>> {
        Err(Error::NotImplemented("element contributions of Dirichlet data".to_string()).into())
    }
}

/// Nodal interpolation of a scalar function.
///
/// The assembled vector holds the function values at the grid vertices.
#[derive(Debug, Clone)]
pub struct InterpolationOperator<T: Real> {
    grid: Arc<dyn Grid<T>>,
    function: Arc<dyn Function<T>>,
    name: String,
}

impl<T: Real> InterpolationOperator<T> {
    pub fn new(grid: Arc<dyn Grid<T>>, function: Arc<dyn Function<T>>) -> eyre::Result<Self> {
        check_function(function.as_ref(), grid.dim(), &[Shape::Scalar])?;
        Ok(Self {
            grid,
            function,
            name: "interpolation".to_string(),
        })
    }
}

impl<T: Real> VectorFunctional<T> for InterpolationOperator<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn dim(&self) -> usize {
        self.grid.size(self.grid.dim())
    }

    fn assemble(&self, mu: Option<&Parameter<T>>) -> eyre::Result<DVector<T>> {
        let values = (0..self.dim())
            .map(|v| self.function.evaluate_scalar(self.grid.vertex(v), mu))
            .collect::<eyre::Result<Vec<_>>>()?;
        Ok(DVector::from_vec(values))
    }

    fn assemble_element_contributions(&self, _mu: Option<&Parameter<T>>) -> eyre::Result<Vec<ElementVector<T>>> {
        Err(Error::NotImplemented("element contributions of nodal interpolation".to_string()).into())
    }
}
