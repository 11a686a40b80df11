use crate::assembly::global::{assemble_sparse_matrix, element_matrices, DirichletTreatment, ElementMatrix};
use crate::assembly::local::{
    assemble_advection_blocks, assemble_diffusion_blocks, assemble_mass_blocks, assemble_robin_blocks, ElementMatrices,
};
use crate::assembly::operators::{dirichlet_mask, impl_operator_for_matrix_operator, MatrixOperator};
use crate::boundary::BoundaryInfo;
use crate::function::{check_function, Function, Parameter, Shape};
use crate::grid::Grid;
use crate::{Error, Real};
use nalgebra_sparse::CscMatrix;
use std::sync::Arc;

/// Default treatment for operators with or without boundary info.
fn default_treatment(boundary_info: &Option<Arc<dyn BoundaryInfo>>) -> DirichletTreatment {
    match boundary_info {
        Some(_) => DirichletTreatment::default(),
        None => DirichletTreatment::none(),
    }
}

fn check_treatment(
    boundary_info: &Option<Arc<dyn BoundaryInfo>>,
    treatment: &DirichletTreatment,
) -> eyre::Result<()> {
    if boundary_info.is_none() && treatment.clears_anything() {
        Err(Error::MissingBoundaryInfo)?;
    }
    Ok(())
}

/// Scatters element blocks of a square operator with the given treatment.
fn assemble_treated<T: Real>(
    grid: &dyn Grid<T>,
    blocks: &ElementMatrices<T>,
    boundary_info: &Option<Arc<dyn BoundaryInfo>>,
    treatment: &DirichletTreatment,
) -> eyre::Result<CscMatrix<T>> {
    let n = grid.size(grid.dim());
    assemble_sparse_matrix(n, n, blocks, dirichlet_mask(boundary_info), treatment)
}

fn element_contributions_treated<T: Real>(
    blocks: &ElementMatrices<T>,
    boundary_info: &Option<Arc<dyn BoundaryInfo>>,
    treatment: &DirichletTreatment,
) -> Vec<ElementMatrix<T>> {
    element_matrices(blocks, dirichlet_mask(boundary_info), treatment)
}

/// The diffusion (stiffness) operator `-div(c D grad u)` for first order elements.
///
/// Rows of Dirichlet DOFs are cleared and unit diagonal entries added by default.
#[derive(Debug, Clone)]
pub struct DiffusionOperator<T: Real> {
    grid: Arc<dyn Grid<T>>,
    boundary_info: Option<Arc<dyn BoundaryInfo>>,
    diffusion_function: Option<Arc<dyn Function<T>>>,
    diffusion_constant: T,
    treatment: DirichletTreatment,
    name: String,
}

impl<T: Real> DiffusionOperator<T> {
    pub fn new(grid: Arc<dyn Grid<T>>, boundary_info: Option<Arc<dyn BoundaryInfo>>) -> Self {
        let treatment = default_treatment(&boundary_info);
        Self {
            grid,
            boundary_info,
            diffusion_function: None,
            diffusion_constant: T::one(),
            treatment,
            name: "diffusion".to_string(),
        }
    }

    /// Sets a scalar or `dim x dim` matrix valued diffusion coefficient.
    pub fn with_diffusion_function(self, diffusion: Arc<dyn Function<T>>) -> eyre::Result<Self> {
        let dim = self.grid.dim();
        check_function(diffusion.as_ref(), dim, &[Shape::Scalar, Shape::Matrix(dim, dim)])?;
        Ok(Self {
            diffusion_function: Some(diffusion),
            ..self
        })
    }

    pub fn with_diffusion_constant(self, diffusion_constant: T) -> Self {
        Self {
            diffusion_constant,
            ..self
        }
    }

    pub fn with_dirichlet_treatment(self, treatment: DirichletTreatment) -> eyre::Result<Self> {
        check_treatment(&self.boundary_info, &treatment)?;
        Ok(Self { treatment, ..self })
    }

    pub fn with_name(self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self
        }
    }

    pub fn dirichlet_treatment(&self) -> &DirichletTreatment {
        &self.treatment
    }

    fn blocks(&self, mu: Option<&Parameter<T>>) -> eyre::Result<ElementMatrices<T>> {
        log::debug!("Integrating diffusion blocks of {}", self.name);
        assemble_diffusion_blocks(
            self.grid.as_ref(),
            self.diffusion_function.as_deref(),
            self.diffusion_constant,
            mu,
        )
    }
}

impl<T: Real> MatrixOperator<T> for DiffusionOperator<T> {
    fn assemble(&self, mu: Option<&Parameter<T>>) -> eyre::Result<CscMatrix<T>> {
        let blocks = self.blocks(mu)?;
        assemble_treated(self.grid.as_ref(), &blocks, &self.boundary_info, &self.treatment)
    }

    fn assemble_element_contributions(&self, mu: Option<&Parameter<T>>) -> eyre::Result<Vec<ElementMatrix<T>>> {
        let blocks = self.blocks(mu)?;
        Ok(element_contributions_treated(&blocks, &self.boundary_info, &self.treatment))
    }
}

/// The linear advection operator `div(v u)` in weak form, for a velocity field `v` with `dim`
/// components.
///
/// Rows of Dirichlet DOFs are cleared and unit diagonal entries added by default.
#[derive(Debug, Clone)]
pub struct AdvectionOperator<T: Real> {
    grid: Arc<dyn Grid<T>>,
    boundary_info: Option<Arc<dyn BoundaryInfo>>,
    velocity: Arc<dyn Function<T>>,
    treatment: DirichletTreatment,
    name: String,
}

impl<T: Real> AdvectionOperator<T> {
    pub fn new(
        grid: Arc<dyn Grid<T>>,
        boundary_info: Option<Arc<dyn BoundaryInfo>>,
        velocity: Arc<dyn Function<T>>,
    ) -> eyre::Result<Self> {
        let dim = grid.dim();
        check_function(velocity.as_ref(), dim, &[Shape::Vector(dim)])?;
        let treatment = default_treatment(&boundary_info);
        Ok(Self {
            grid,
            boundary_info,
            velocity,
            treatment,
            name: "advection".to_string(),
        })
    }

    pub fn with_dirichlet_treatment(self, treatment: DirichletTreatment) -> eyre::Result<Self> {
        check_treatment(&self.boundary_info, &treatment)?;
        Ok(Self { treatment, ..self })
    }

    pub fn with_name(self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self
        }
    }

    fn blocks(&self, mu: Option<&Parameter<T>>) -> eyre::Result<ElementMatrices<T>> {
        log::debug!("Integrating advection blocks of {}", self.name);
        assemble_advection_blocks(self.grid.as_ref(), self.velocity.as_ref(), mu)
    }
}

impl<T: Real> MatrixOperator<T> for AdvectionOperator<T> {
    fn assemble(&self, mu: Option<&Parameter<T>>) -> eyre::Result<CscMatrix<T>> {
        let blocks = self.blocks(mu)?;
        assemble_treated(self.grid.as_ref(), &blocks, &self.boundary_info, &self.treatment)
    }

    fn assemble_element_contributions(&self, mu: Option<&Parameter<T>>) -> eyre::Result<Vec<ElementMatrix<T>>> {
        let blocks = self.blocks(mu)?;
        Ok(element_contributions_treated(&blocks, &self.boundary_info, &self.treatment))
    }
}

/// The L2 product (mass matrix), optionally weighted by a scalar reaction coefficient.
///
/// Rows of Dirichlet DOFs are cleared and unit diagonal entries added by default.
#[derive(Debug, Clone)]
pub struct L2ProductOperator<T: Real> {
    grid: Arc<dyn Grid<T>>,
    boundary_info: Option<Arc<dyn BoundaryInfo>>,
    coefficient: Option<Arc<dyn Function<T>>>,
    treatment: DirichletTreatment,
    name: String,
}

impl<T: Real> L2ProductOperator<T> {
    pub fn new(grid: Arc<dyn Grid<T>>, boundary_info: Option<Arc<dyn BoundaryInfo>>) -> Self {
        let treatment = default_treatment(&boundary_info);
        Self {
            grid,
            boundary_info,
            coefficient: None,
            treatment,
            name: "l2".to_string(),
        }
    }

    pub fn with_coefficient(self, coefficient: Arc<dyn Function<T>>) -> eyre::Result<Self> {
        check_function(coefficient.as_ref(), self.grid.dim(), &[Shape::Scalar])?;
        Ok(Self {
            coefficient: Some(coefficient),
            ..self
        })
    }

    pub fn with_dirichlet_treatment(self, treatment: DirichletTreatment) -> eyre::Result<Self> {
        check_treatment(&self.boundary_info, &treatment)?;
        Ok(Self { treatment, ..self })
    }

    pub fn with_name(self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self
        }
    }

    fn blocks(&self, mu: Option<&Parameter<T>>) -> eyre::Result<ElementMatrices<T>> {
        log::debug!("Integrating mass blocks of {}", self.name);
        assemble_mass_blocks(self.grid.as_ref(), self.coefficient.as_deref(), mu)
    }
}

impl<T: Real> MatrixOperator<T> for L2ProductOperator<T> {
    fn assemble(&self, mu: Option<&Parameter<T>>) -> eyre::Result<CscMatrix<T>> {
        let blocks = self.blocks(mu)?;
        assemble_treated(self.grid.as_ref(), &blocks, &self.boundary_info, &self.treatment)
    }

    fn assemble_element_contributions(&self, mu: Option<&Parameter<T>>) -> eyre::Result<Vec<ElementMatrix<T>>> {
        let blocks = self.blocks(mu)?;
        Ok(element_contributions_treated(&blocks, &self.boundary_info, &self.treatment))
    }
}

/// The Robin boundary term `int_{Gamma_R} c u v`.
///
/// Vector valued coefficients are projected onto the unit outer normal. Without a coefficient,
/// boundary info or Robin facets the operator is zero. Its element contributions are given per
/// Robin facet.
#[derive(Debug, Clone)]
pub struct RobinBoundaryOperator<T: Real> {
    grid: Arc<dyn Grid<T>>,
    boundary_info: Option<Arc<dyn BoundaryInfo>>,
    robin_coefficient: Option<Arc<dyn Function<T>>>,
    name: String,
}

impl<T: Real> RobinBoundaryOperator<T> {
    pub fn new(
        grid: Arc<dyn Grid<T>>,
        boundary_info: Option<Arc<dyn BoundaryInfo>>,
        robin_coefficient: Option<Arc<dyn Function<T>>>,
    ) -> eyre::Result<Self> {
        let dim = grid.dim();
        if dim > 2 {
            Err(Error::NotImplemented(format!("Robin boundary operator in {} dimensions", dim)))?;
        }
        if let Some(c) = &robin_coefficient {
            check_function(c.as_ref(), dim, &[Shape::Scalar, Shape::Vector(dim)])?;
        }
        Ok(Self {
            grid,
            boundary_info,
            robin_coefficient,
            name: "robin".to_string(),
        })
    }

    pub fn with_name(self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self
        }
    }

    /// Robin facet blocks, or `None` if the operator vanishes.
    fn blocks(&self, mu: Option<&Parameter<T>>) -> eyre::Result<Option<ElementMatrices<T>>> {
        match (&self.robin_coefficient, &self.boundary_info) {
            (Some(c), Some(info)) if info.has_robin() => {
                log::debug!("Integrating Robin blocks on {} facets", info.robin_facets().len());
                let blocks = assemble_robin_blocks(self.grid.as_ref(), c.as_ref(), info.robin_facets(), mu)?;
                Ok(Some(blocks))
            }
            _ => Ok(None),
        }
    }
}

impl<T: Real> MatrixOperator<T> for RobinBoundaryOperator<T> {
    fn assemble(&self, mu: Option<&Parameter<T>>) -> eyre::Result<CscMatrix<T>> {
        let n = self.grid.size(self.grid.dim());
        match self.blocks(mu)? {
            Some(blocks) => assemble_sparse_matrix(n, n, &blocks, None, &DirichletTreatment::none()),
            None => Ok(CscMatrix::zeros(n, n)),
        }
    }

    fn assemble_element_contributions(&self, mu: Option<&Parameter<T>>) -> eyre::Result<Vec<ElementMatrix<T>>> {
        Ok(self
            .blocks(mu)?
            .map(|blocks| element_matrices(&blocks, None, &DirichletTreatment::none()))
            .unwrap_or_default())
    }
}

impl_operator_for_matrix_operator!(DiffusionOperator, AdvectionOperator, L2ProductOperator, RobinBoundaryOperator);
