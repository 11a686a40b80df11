use crate::assembly::global::{
    assemble_dense_vector, assemble_sparse_matrix, element_matrices, element_vectors, DirichletTreatment,
    ElementMatrix, ElementVector,
};
use crate::assembly::local::{
    nonlinear_reaction_element_matrix, nonlinear_reaction_element_vector, ElementMatrices, ElementVectors,
    QuadratureTable, NONLINEAR_QUADRATURE_ORDER,
};
use crate::assembly::operators::{dirichlet_mask, Operator};
use crate::boundary::BoundaryInfo;
use crate::function::{check_function, Function, Parameter, Shape};
use crate::grid::Grid;
use crate::{check_dimension, Real};
use nalgebra::DVector;
use nalgebra_sparse::CscMatrix;
use rayon::prelude::*;
use std::sync::Arc;

/// The nonlinear reaction operator `u -> q c(u)` in weak form.
///
/// The coefficient `q` is a scalar function of space, evaluated at element centers. The reaction
/// `c` and its derivative are scalar functions of the state value, i.e. functions on a
/// one-dimensional domain, and may depend on the parameter.
///
/// Entries of Dirichlet DOFs are zero in [`Operator::apply`], and rows of Dirichlet DOFs are zero
/// in [`Operator::jacobian`] without any unit diagonal.
#[derive(Debug, Clone)]
pub struct NonlinearReactionOperator<T: Real> {
    grid: Arc<dyn Grid<T>>,
    boundary_info: Option<Arc<dyn BoundaryInfo>>,
    reaction_coefficient: Arc<dyn Function<T>>,
    reaction_function: Arc<dyn Function<T>>,
    reaction_derivative: Arc<dyn Function<T>>,
    name: String,
}

impl<T: Real> NonlinearReactionOperator<T> {
    pub fn new(
        grid: Arc<dyn Grid<T>>,
        boundary_info: Option<Arc<dyn BoundaryInfo>>,
        reaction_coefficient: Arc<dyn Function<T>>,
        reaction_function: Arc<dyn Function<T>>,
        reaction_derivative: Arc<dyn Function<T>>,
    ) -> eyre::Result<Self> {
        check_function(reaction_coefficient.as_ref(), grid.dim(), &[Shape::Scalar])?;
        check_function(reaction_function.as_ref(), 1, &[Shape::Scalar])?;
        check_function(reaction_derivative.as_ref(), 1, &[Shape::Scalar])?;
        Ok(Self {
            grid,
            boundary_info,
            reaction_coefficient,
            reaction_function,
            reaction_derivative,
            name: "nonlinear_reaction".to_string(),
        })
    }

    pub fn with_name(self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self
        }
    }

    pub fn grid(&self) -> &Arc<dyn Grid<T>> {
        &self.grid
    }

    fn num_dofs(&self) -> usize {
        self.grid.size(self.grid.dim())
    }

    fn jacobian_treatment() -> DirichletTreatment {
        DirichletTreatment::default().with_clear_diag(true)
    }

    /// Residual vectors of the given elements, each scaled by its weight if weights are given.
    ///
    /// Elements are integrated in parallel, results keep the order of `elements`.
    fn element_residuals(
        &self,
        elements: &[usize],
        weights: Option<&DVector<T>>,
        u: &DVector<T>,
        mu: Option<&Parameter<T>>,
    ) -> eyre::Result<ElementVectors<T>> {
        check_dimension(self.num_dofs(), u.len(), "nonlinear reaction state")?;
        let grid = self.grid.as_ref();
        let table = QuadratureTable::new(grid.reference_element(), NONLINEAR_QUADRATURE_ORDER)?;
        log::debug!("Evaluating nonlinear reaction on {} elements", elements.len());
        let blocks = elements
            .par_iter()
            .map(|&e| {
                let q = self.reaction_coefficient.evaluate_scalar(grid.center(e), mu)?;
                nonlinear_reaction_element_vector(grid, &table, e, u, q, self.reaction_function.as_ref(), mu)
            })
            .collect::<eyre::Result<Vec<_>>>()?;

        let mut vectors = ElementVectors::new(table.num_basis_functions());
        for (i, (&e, block)) in elements.iter().zip(&blocks).enumerate() {
            vectors.push(e, grid.element_vertices(e), block);
            if let Some(rho) = weights {
                vectors.scale_block(i, rho[e]);
            }
        }
        Ok(vectors)
    }

    /// Jacobian blocks of the given elements, each scaled by its weight if weights are given.
    fn element_jacobians(
        &self,
        elements: &[usize],
        weights: Option<&DVector<T>>,
        u: &DVector<T>,
        mu: Option<&Parameter<T>>,
    ) -> eyre::Result<ElementMatrices<T>> {
        check_dimension(self.num_dofs(), u.len(), "nonlinear reaction state")?;
        let grid = self.grid.as_ref();
        let table = QuadratureTable::new(grid.reference_element(), NONLINEAR_QUADRATURE_ORDER)?;
        log::debug!("Evaluating nonlinear reaction Jacobian on {} elements", elements.len());
        let blocks = elements
            .par_iter()
            .map(|&e| {
                let q = self.reaction_coefficient.evaluate_scalar(grid.center(e), mu)?;
                nonlinear_reaction_element_matrix(grid, &table, e, u, q, self.reaction_derivative.as_ref(), mu)
            })
            .collect::<eyre::Result<Vec<_>>>()?;

        let mut matrices = ElementMatrices::new(table.num_basis_functions());
        for (i, (&e, block)) in elements.iter().zip(&blocks).enumerate() {
            matrices.push(e, grid.element_vertices(e), block);
            if let Some(rho) = weights {
                matrices.scale_block(i, rho[e]);
            }
        }
        Ok(matrices)
    }

    fn all_elements(&self) -> Vec<usize> {
        (0..self.grid.size(0)).collect()
    }

    fn residual(&self, vectors: &ElementVectors<T>) -> eyre::Result<DVector<T>> {
        assemble_dense_vector(self.num_dofs(), vectors, dirichlet_mask(&self.boundary_info))
    }

    fn jacobian_matrix(&self, matrices: &ElementMatrices<T>) -> eyre::Result<CscMatrix<T>> {
        let n = self.num_dofs();
        let treatment = Self::jacobian_treatment();
        assemble_sparse_matrix(n, n, matrices, dirichlet_mask(&self.boundary_info), &treatment)
    }

    /// Applies the operator and also returns the residual of every element.
    pub fn apply_with_element_contributions(
        &self,
        u: &DVector<T>,
        mu: Option<&Parameter<T>>,
    ) -> eyre::Result<(DVector<T>, Vec<ElementVector<T>>)> {
        let vectors = self.element_residuals(&self.all_elements(), None, u, mu)?;
        let contributions = element_vectors(&vectors, dirichlet_mask(&self.boundary_info));
        Ok((self.residual(&vectors)?, contributions))
    }

    /// Assembles the Jacobian and also returns the Jacobian block of every element.
    pub fn jacobian_with_element_contributions(
        &self,
        u: &DVector<T>,
        mu: Option<&Parameter<T>>,
    ) -> eyre::Result<(CscMatrix<T>, Vec<ElementMatrix<T>>)> {
        let matrices = self.element_jacobians(&self.all_elements(), None, u, mu)?;
        let contributions = element_matrices(&matrices, dirichlet_mask(&self.boundary_info), &Self::jacobian_treatment());
        Ok((self.jacobian_matrix(&matrices)?, contributions))
    }
}

impl<T: Real> Operator<T> for NonlinearReactionOperator<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn dim_source(&self) -> usize {
        self.num_dofs()
    }

    fn dim_range(&self) -> usize {
        self.num_dofs()
    }

    fn is_linear(&self) -> bool {
        false
    }

    fn apply(&self, u: &DVector<T>, mu: Option<&Parameter<T>>) -> eyre::Result<DVector<T>> {
        let vectors = self.element_residuals(&self.all_elements(), None, u, mu)?;
        self.residual(&vectors)
    }

    fn jacobian(&self, u: &DVector<T>, mu: Option<&Parameter<T>>) -> eyre::Result<CscMatrix<T>> {
        let matrices = self.element_jacobians(&self.all_elements(), None, u, mu)?;
        self.jacobian_matrix(&matrices)
    }
}

/// The nonlinear reaction operator restricted to a weighted subset of elements.
///
/// Only elements with nonzero weight `rho[e]` are integrated, and their contributions are scaled
/// by `rho[e]`. With all weights equal to one the results coincide exactly with those of
/// [`NonlinearReactionOperator`].
#[derive(Debug, Clone)]
pub struct ElementNonlinearReactionOperator<T: Real> {
    operator: NonlinearReactionOperator<T>,
    rho: DVector<T>,
    elements: Vec<usize>,
}

impl<T: Real> ElementNonlinearReactionOperator<T> {
    pub fn new(operator: NonlinearReactionOperator<T>, rho: DVector<T>) -> eyre::Result<Self> {
        check_dimension(operator.grid.size(0), rho.len(), "element weights")?;
        let elements = rho
            .iter()
            .enumerate()
            .filter(|&(_, &w)| w != T::zero())
            .map(|(e, _)| e)
            .collect();
        Ok(Self {
            operator,
            rho,
            elements,
        })
    }

    pub fn rho(&self) -> &DVector<T> {
        &self.rho
    }

    /// The elements with nonzero weight, in ascending order.
    pub fn active_elements(&self) -> &[usize] {
        &self.elements
    }

    pub fn apply_with_element_contributions(
        &self,
        u: &DVector<T>,
        mu: Option<&Parameter<T>>,
    ) -> eyre::Result<(DVector<T>, Vec<ElementVector<T>>)> {
        let vectors = self
            .operator
            .element_residuals(&self.elements, Some(&self.rho), u, mu)?;
        let contributions = element_vectors(&vectors, dirichlet_mask(&self.operator.boundary_info));
        Ok((self.operator.residual(&vectors)?, contributions))
    }

    pub fn jacobian_with_element_contributions(
        &self,
        u: &DVector<T>,
        mu: Option<&Parameter<T>>,
    ) -> eyre::Result<(CscMatrix<T>, Vec<ElementMatrix<T>>)> {
        let matrices = self
            .operator
            .element_jacobians(&self.elements, Some(&self.rho), u, mu)?;
        let contributions = element_matrices(
            &matrices,
            dirichlet_mask(&self.operator.boundary_info),
            &NonlinearReactionOperator::<T>::jacobian_treatment(),
        );
        Ok((self.operator.jacobian_matrix(&matrices)?, contributions))
    }
}

impl<T: Real> Operator<T> for ElementNonlinearReactionOperator<T> {
    fn name(&self) -> &str {
        &self.operator.name
    }

    fn dim_source(&self) -> usize {
        self.operator.num_dofs()
    }

    fn dim_range(&self) -> usize {
        self.operator.num_dofs()
    }

    fn is_linear(&self) -> bool {
        false
    }

    fn apply(&self, u: &DVector<T>, mu: Option<&Parameter<T>>) -> eyre::Result<DVector<T>> {
        let vectors = self
            .operator
            .element_residuals(&self.elements, Some(&self.rho), u, mu)?;
        self.operator.residual(&vectors)
    }

    fn jacobian(&self, u: &DVector<T>, mu: Option<&Parameter<T>>) -> eyre::Result<CscMatrix<T>> {
        let matrices = self
            .operator
            .element_jacobians(&self.elements, Some(&self.rho), u, mu)?;
        self.operator.jacobian_matrix(&matrices)
    }
}
