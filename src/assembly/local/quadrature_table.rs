use crate::element::{LagrangeBasis, ReferenceElement};
use crate::quadrature::{quadrature, QuadratureRule};
use crate::Real;
use nalgebra::{DMatrix, DVector, DVectorView};

/// Basis function values and reference gradients tabulated at the points of a quadrature rule.
#[derive(Debug, Clone, PartialEq)]
pub struct QuadratureTable<T: Real> {
    basis: LagrangeBasis,
    rule: QuadratureRule<T>,
    // Column k holds the values of all basis functions at point k
    values: DMatrix<T>,
    reference_gradients: Vec<DMatrix<T>>,
}

impl<T: Real> QuadratureTable<T> {
    /// Tabulates the first order basis at the points of the rule of the given order.
    pub fn new(reference_element: ReferenceElement, quadrature_order: usize) -> eyre::Result<Self> {
        let basis = LagrangeBasis::new(reference_element, 1)?;
        let rule = quadrature(reference_element, quadrature_order)?;
        let n = basis.num_functions();
        let mut values = DMatrix::zeros(n, rule.len());
        let mut reference_gradients = Vec::with_capacity(rule.len());
        for (k, xi) in rule.points().iter().enumerate() {
            values.set_column(k, &basis.evaluate(xi.as_slice()));
            reference_gradients.push(basis.gradients(xi.as_slice()));
        }
        Ok(Self {
            basis,
            rule,
            values,
            reference_gradients,
        })
    }

    pub fn basis(&self) -> &LagrangeBasis {
        &self.basis
    }

    pub fn rule(&self) -> &QuadratureRule<T> {
        &self.rule
    }

    pub fn weights(&self) -> &[T] {
        self.rule.weights()
    }

    pub fn points(&self) -> &[DVector<T>] {
        self.rule.points()
    }

    pub fn num_points(&self) -> usize {
        self.rule.len()
    }

    pub fn num_basis_functions(&self) -> usize {
        self.basis.num_functions()
    }

    /// Values of all basis functions at quadrature point `k`.
    pub fn basis_values(&self, k: usize) -> DVectorView<'_, T> {
        self.values.column(k)
    }

    /// Reference gradients at quadrature point `k`, one column per basis function.
    pub fn reference_gradients(&self, k: usize) -> &DMatrix<T> {
        &self.reference_gradients[k]
    }

    /// Physical gradients at quadrature point `k` for an element with the given inverse
    /// transposed Jacobian.
    pub fn physical_gradients(&self, jacobian_inverse_transposed: &DMatrix<T>, k: usize) -> DMatrix<T> {
        jacobian_inverse_transposed * &self.reference_gradients[k]
    }

    /// Evaluates the function with local coefficients `local` at all quadrature points.
    pub fn interpolate(&self, local: &DVector<T>) -> DVector<T> {
        self.values.tr_mul(local)
    }

    /// Weighted sums `sum_k w_k phi_i(x_k)`, i.e. the reference integrals of the basis functions.
    pub fn basis_integrals(&self) -> DVector<T> {
        let mut integrals = DVector::zeros(self.num_basis_functions());
        for (k, &w) in self.weights().iter().enumerate() {
            integrals += self.basis_values(k) * w;
        }
        integrals
    }

    /// Weighted sums `sum_k w_k phi_i(x_k) phi_j(x_k)`, the reference mass matrix.
    pub fn basis_products(&self) -> DMatrix<T> {
        let n = self.num_basis_functions();
        let mut products = DMatrix::zeros(n, n);
        for (k, &w) in self.weights().iter().enumerate() {
            let phi = self.basis_values(k);
            products += &phi * phi.transpose() * w;
        }
        products
    }
}
