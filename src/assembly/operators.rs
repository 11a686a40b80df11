//! Assembled operators and functionals.
//!
//! Operators map states to states. Linear operators are backed by a sparse matrix assembled for
//! a given parameter, nonlinear operators additionally provide their Jacobian. Functionals are
//! backed by a dense vector and act on states through the dot product.
use crate::assembly::global::{csc_from_triplets, ElementMatrix, ElementVector};
use crate::boundary::BoundaryInfo;
use crate::function::{Coefficient, Parameter};
use crate::{check_dimension, Error, Real};
use nalgebra::{DMatrix, DVector};
use nalgebra_sparse::CscMatrix;
use std::fmt::Debug;
use std::sync::Arc;

/// Implements [`Operator`] for matrix operators with `name` and `grid` fields.
macro_rules! impl_operator_for_matrix_operator {
    ($($ty:ident),*) => {
        $(
            impl<T: $crate::Real> $crate::assembly::operators::Operator<T> for $ty<T> {
                fn name(&self) -> &str {
                    &self.name
                }

                fn dim_source(&self) -> usize {
                    self.grid.size(self.grid.dim())
                }

                fn dim_range(&self) -> usize {
                    self.grid.size(self.grid.dim())
                }

                fn is_linear(&self) -> bool {
                    true
                }

                fn apply(
                    &self,
                    u: &nalgebra::DVector<T>,
                    mu: Option<&$crate::function::Parameter<T>>,
                ) -> eyre::Result<nalgebra::DVector<T>> {
                    use $crate::assembly::operators::MatrixOperator;
                    $crate::assembly::operators::apply_matrix(&self.assemble(mu)?, u)
                }

                fn jacobian(
                    &self,
                    _u: &nalgebra::DVector<T>,
                    mu: Option<&$crate::function::Parameter<T>>,
                ) -> eyre::Result<nalgebra_sparse::CscMatrix<T>> {
                    use $crate::assembly::operators::MatrixOperator;
                    self.assemble(mu)
                }
            }
        )*
    };
}

pub(crate) use impl_operator_for_matrix_operator;

mod functionals;
mod linear;
mod nonlinear;
mod quadratic;

pub use functionals::*;
pub use linear::*;
pub use nonlinear::*;
pub use quadratic::*;

/// An operator `u, mu -> A(u, mu)` on the space of nodal vectors.
pub trait Operator<T: Real>: Debug + Send + Sync {
    fn name(&self) -> &str;

    fn dim_source(&self) -> usize;

    fn dim_range(&self) -> usize;

    fn is_linear(&self) -> bool;

    fn apply(&self, u: &DVector<T>, mu: Option<&Parameter<T>>) -> eyre::Result<DVector<T>>;

    /// The Jacobian of the operator at `u`, or the matrix itself for linear operators.
    fn jacobian(&self, u: &DVector<T>, mu: Option<&Parameter<T>>) -> eyre::Result<CscMatrix<T>>;
}

/// A linear operator backed by an assembled sparse matrix.
pub trait MatrixOperator<T: Real>: Operator<T> {
    fn assemble(&self, mu: Option<&Parameter<T>>) -> eyre::Result<CscMatrix<T>>;

    /// The element blocks of the matrix, with Dirichlet rows and columns zeroed as far as the
    /// operator's treatment clears them.
    ///
    /// Unit diagonal entries of Dirichlet DOFs belong to no element and are not included.
    fn assemble_element_contributions(&self, mu: Option<&Parameter<T>>) -> eyre::Result<Vec<ElementMatrix<T>>>;
}

/// A functional backed by an assembled dense vector.
pub trait VectorFunctional<T: Real>: Debug + Send + Sync {
    fn name(&self) -> &str;

    fn dim(&self) -> usize;

    fn assemble(&self, mu: Option<&Parameter<T>>) -> eyre::Result<DVector<T>>;

    fn assemble_element_contributions(&self, mu: Option<&Parameter<T>>) -> eyre::Result<Vec<ElementVector<T>>>;

    /// Applies the functional to `u`.
    fn apply(&self, u: &DVector<T>, mu: Option<&Parameter<T>>) -> eyre::Result<T> {
        check_dimension(self.dim(), u.len(), "functional argument")?;
        Ok(self.assemble(mu)?.dot(u))
    }
}

/// Multiplies an assembled matrix with a vector after checking dimensions.
pub fn apply_matrix<T: Real>(matrix: &CscMatrix<T>, u: &DVector<T>) -> eyre::Result<DVector<T>> {
    check_dimension(matrix.ncols(), u.len(), "operator argument")?;
    Ok(matrix * u)
}

/// Returns the Dirichlet mask if the boundary info has Dirichlet DOFs.
pub(crate) fn dirichlet_mask(boundary_info: &Option<Arc<dyn BoundaryInfo>>) -> Option<&[bool]> {
    boundary_info
        .as_ref()
        .filter(|info| info.has_dirichlet())
        .map(|info| info.dirichlet_mask())
}

/// A fixed, already assembled matrix.
#[derive(Debug, Clone)]
pub struct AssembledMatrixOperator<T: Real> {
    matrix: CscMatrix<T>,
    name: String,
}

impl<T: Real> AssembledMatrixOperator<T> {
    pub fn new(matrix: CscMatrix<T>, name: impl Into<String>) -> Self {
        Self {
            matrix,
            name: name.into(),
        }
    }

    pub fn matrix(&self) -> &CscMatrix<T> {
        &self.matrix
    }
}

impl<T: Real> Operator<T> for AssembledMatrixOperator<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn dim_source(&self) -> usize {
        self.matrix.ncols()
    }

    fn dim_range(&self) -> usize {
        self.matrix.nrows()
    }

    fn is_linear(&self) -> bool {
        true
    }

    fn apply(&self, u: &DVector<T>, _mu: Option<&Parameter<T>>) -> eyre::Result<DVector<T>> {
        apply_matrix(&self.matrix, u)
    }

    fn jacobian(&self, _u: &DVector<T>, _mu: Option<&Parameter<T>>) -> eyre::Result<CscMatrix<T>> {
        Ok(self.matrix.clone())
    }
}

impl<T: Real> MatrixOperator<T> for AssembledMatrixOperator<T> {
    fn assemble(&self, _mu: Option<&Parameter<T>>) -> eyre::Result<CscMatrix<T>> {
        Ok(self.matrix.clone())
    }

    fn assemble_element_contributions(&self, _mu: Option<&Parameter<T>>) -> eyre::Result<Vec<ElementMatrix<T>>> {
        Err(Error::NotImplemented(format!("element contributions of assembled matrix {}", self.name)).into())
    }
}

/// Sums `c * A` over sparse matrices into a single compact matrix.
fn sum_scaled_matrices<T: Real>(
    nrows: usize,
    ncols: usize,
    terms: impl IntoIterator<Item = (T, CscMatrix<T>)>,
) -> eyre::Result<CscMatrix<T>> {
    let mut rows = Vec::new();
    let mut cols = Vec::new();
    let mut values = Vec::new();
    for (c, matrix) in terms {
        for (i, j, &v) in matrix.triplet_iter() {
            rows.push(i);
            cols.push(j);
            values.push(c * v);
        }
    }
    csc_from_triplets(nrows, ncols, rows, cols, values)
}

/// A linear combination `sum_i c_i(mu) A_i(u, mu)` of operators.
#[derive(Debug, Clone)]
pub struct LincombOperator<T: Real> {
    operators: Vec<Arc<dyn Operator<T>>>,
    coefficients: Vec<Coefficient<T>>,
    name: String,
}

impl<T: Real> LincombOperator<T> {
    pub fn new(operators: Vec<Arc<dyn Operator<T>>>, coefficients: Vec<Coefficient<T>>) -> eyre::Result<Self> {
        check_dimension(operators.len(), coefficients.len(), "number of lincomb coefficients")?;
        let first = operators
            .first()
            .ok_or_else(|| Error::NotImplemented("empty linear combination of operators".to_string()))?;
        let (source, range) = (first.dim_source(), first.dim_range());
        for op in &operators {
            check_dimension(source, op.dim_source(), "lincomb operator source")?;
            check_dimension(range, op.dim_range(), "lincomb operator range")?;
        }
        Ok(Self {
            operators,
            coefficients,
            name: "lincomb".to_string(),
        })
    }

    pub fn with_name(self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self
        }
    }

    pub fn operators(&self) -> &[Arc<dyn Operator<T>>] {
        &self.operators
    }

    pub fn coefficients(&self) -> &[Coefficient<T>] {
        &self.coefficients
    }

    /// Evaluates all coefficients for the given parameter.
    pub fn evaluate_coefficients(&self, mu: Option<&Parameter<T>>) -> eyre::Result<Vec<T>> {
        self.coefficients.iter().map(|c| c.evaluate(mu)).collect()
    }

    /// Assembles the matrix of a linear combination of linear operators.
    pub fn assemble(&self, mu: Option<&Parameter<T>>) -> eyre::Result<CscMatrix<T>> {
        if !self.is_linear() {
            Err(Error::NotImplemented(format!(
                "assembling the nonlinear operator {} into a matrix",
                self.name
            )))?;
        }
        self.jacobian(&DVector::zeros(self.dim_source()), mu)
    }
}

impl<T: Real> Operator<T> for LincombOperator<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn dim_source(&self) -> usize {
        self.operators[0].dim_source()
    }

    fn dim_range(&self) -> usize {
        self.operators[0].dim_range()
    }

    fn is_linear(&self) -> bool {
        self.operators.iter().all(|op| op.is_linear())
    }

    fn apply(&self, u: &DVector<T>, mu: Option<&Parameter<T>>) -> eyre::Result<DVector<T>> {
        let mut result = DVector::zeros(self.dim_range());
        for (op, c) in self.operators.iter().zip(self.evaluate_coefficients(mu)?) {
            if c != T::zero() {
                result += op.apply(u, mu)? * c;
            }
        }
        Ok(result)
    }

    fn jacobian(&self, u: &DVector<T>, mu: Option<&Parameter<T>>) -> eyre::Result<CscMatrix<T>> {
        let mut terms = Vec::with_capacity(self.operators.len());
        for (op, c) in self.operators.iter().zip(self.evaluate_coefficients(mu)?) {
            if c != T::zero() {
                terms.push((c, op.jacobian(u, mu)?));
            }
        }
        sum_scaled_matrices(self.dim_range(), self.dim_source(), terms)
    }
}

/// A linear combination `sum_i c_i(mu) f_i(mu)` of vector functionals.
#[derive(Debug, Clone)]
pub struct LincombFunctional<T: Real> {
    functionals: Vec<Arc<dyn VectorFunctional<T>>>,
    coefficients: Vec<Coefficient<T>>,
    name: String,
}

impl<T: Real> LincombFunctional<T> {
    pub fn new(
        functionals: Vec<Arc<dyn VectorFunctional<T>>>,
        coefficients: Vec<Coefficient<T>>,
    ) -> eyre::Result<Self> {
        check_dimension(functionals.len(), coefficients.len(), "number of lincomb coefficients")?;
        let first = functionals
            .first()
            .ok_or_else(|| Error::NotImplemented("empty linear combination of functionals".to_string()))?;
        let dim = first.dim();
        for f in &functionals {
            check_dimension(dim, f.dim(), "lincomb functional dimension")?;
        }
        Ok(Self {
            functionals,
            coefficients,
            name: "lincomb".to_string(),
        })
    }

    pub fn with_name(self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self
        }
    }

    pub fn functionals(&self) -> &[Arc<dyn VectorFunctional<T>>] {
        &self.functionals
    }

    pub fn coefficients(&self) -> &[Coefficient<T>] {
        &self.coefficients
    }
}

impl<T: Real> VectorFunctional<T> for LincombFunctional<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn dim(&self) -> usize {
        self.functionals[0].dim()
    }

    fn assemble(&self, mu: Option<&Parameter<T>>) -> eyre::Result<DVector<T>> {
        let mut result = DVector::zeros(self.dim());
        for (f, c) in self.functionals.iter().zip(&self.coefficients) {
            result += f.assemble(mu)? * c.evaluate(mu)?;
        }
        Ok(result)
    }

    fn assemble_element_contributions(&self, mu: Option<&Parameter<T>>) -> eyre::Result<Vec<ElementVector<T>>> {
        let mut contributions = Vec::new();
        for (f, c) in self.functionals.iter().zip(&self.coefficients) {
            let c = c.evaluate(mu)?;
            contributions.extend(f.assemble_element_contributions(mu)?.into_iter().map(|mut v| {
                v.vector *= c;
                v
            }));
        }
        Ok(contributions)
    }
}

/// Several functionals stacked into one vector valued functional.
#[derive(Debug, Clone)]
pub struct BlockFunctional<T: Real> {
    functionals: Vec<Arc<dyn VectorFunctional<T>>>,
}

impl<T: Real> BlockFunctional<T> {
    pub fn new(functionals: Vec<Arc<dyn VectorFunctional<T>>>) -> eyre::Result<Self> {
        if let Some(first) = functionals.first() {
            for f in &functionals {
                check_dimension(first.dim(), f.dim(), "block functional dimension")?;
            }
        }
        Ok(Self { functionals })
    }

    pub fn num_blocks(&self) -> usize {
        self.functionals.len()
    }

    /// Assembles the functionals as rows of a dense matrix.
    pub fn assemble(&self, mu: Option<&Parameter<T>>) -> eyre::Result<DMatrix<T>> {
        let dim = self.functionals.first().map(|f| f.dim()).unwrap_or(0);
        let mut matrix = DMatrix::zeros(self.functionals.len(), dim);
        for (i, f) in self.functionals.iter().enumerate() {
            matrix.set_row(i, &f.assemble(mu)?.transpose());
        }
        Ok(matrix)
    }

    /// Applies all functionals to `u`.
    pub fn apply(&self, u: &DVector<T>, mu: Option<&Parameter<T>>) -> eyre::Result<DVector<T>> {
        let values = self
            .functionals
            .iter()
            .map(|f| f.apply(u, mu))
            .collect::<eyre::Result<Vec<_>>>()?;
        Ok(DVector::from_vec(values))
    }
}
