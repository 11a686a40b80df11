use crate::assembly::global::{sum_element_vectors, ElementVector};
use crate::assembly::local::{QuadratureTable, NONLINEAR_QUADRATURE_ORDER};
use crate::error::{estimate_element_l2_error_squared, estimate_element_l2_error_squared_gradient};
use crate::function::Parameter;
use crate::grid::Grid;
use crate::{check_dimension, Error, Real};
use nalgebra::DVector;
use numeric_literals::replace_float_literals;
use std::fmt::Debug;
use std::sync::Arc;

/// A scalar valued functional `u, mu -> j(u, mu)` with derivatives in both arguments.
pub trait ScalarFunctional<T: Real>: Debug + Send + Sync {
    fn name(&self) -> &str;

    fn dim_source(&self) -> usize;

    fn apply(&self, u: &DVector<T>, mu: &Parameter<T>) -> eyre::Result<T>;

    /// The gradient of the functional with respect to the state.
    fn jacobian(&self, u: &DVector<T>, mu: &Parameter<T>) -> eyre::Result<DVector<T>>;

    /// The partial derivative with respect to parameter component `index`.
    fn d_mu(&self, mu: &Parameter<T>, index: usize) -> eyre::Result<T>;
}

/// The value of a scalar quantity restricted to a single element.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ElementScalar<T: Real> {
    pub element: usize,
    pub value: T,
}

/// The tracking functional `j(u, mu) = 1/2 ||u - u_d||^2_{L2} + 1/2 |mu - mu_d|^2`.
///
/// The state term is integrated element by element. The parameter term is not a spatial
/// integral, so its element contributions are apportioned by volume fraction: element `e` is
/// assigned `vol_e / |Omega|` of it.
#[derive(Debug, Clone)]
pub struct QuadraticFunctional<T: Real> {
    grid: Arc<dyn Grid<T>>,
    u_d: DVector<T>,
    mu_d: Parameter<T>,
    name: String,
}

impl<T: Real> QuadraticFunctional<T> {
    pub fn new(grid: Arc<dyn Grid<T>>, u_d: DVector<T>, mu_d: Parameter<T>) -> eyre::Result<Self> {
        check_dimension(grid.size(grid.dim()), u_d.len(), "target state")?;
        Ok(Self {
            grid,
            u_d,
            mu_d,
            name: "quadratic_functional".to_string(),
        })
    }

    pub fn with_name(self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self
        }
    }

    pub fn target_state(&self) -> &DVector<T> {
        &self.u_d
    }

    pub fn target_parameter(&self) -> &Parameter<T> {
        &self.mu_d
    }

    fn table(&self) -> eyre::Result<QuadratureTable<T>> {
        QuadratureTable::new(self.grid.reference_element(), NONLINEAR_QUADRATURE_ORDER)
    }

    fn parameter_difference(&self, mu: &Parameter<T>) -> eyre::Result<DVector<T>> {
        check_dimension(self.mu_d.len(), mu.len(), "parameter")?;
        Ok(mu - &self.mu_d)
    }

    fn parameter_component_difference(&self, mu: &Parameter<T>, index: usize) -> eyre::Result<T> {
        let diff = self.parameter_difference(mu)?;
        if index >= diff.len() {
            Err(Error::DimensionMismatch {
                expected: diff.len(),
                actual: index,
                context: "parameter component index".to_string(),
            })?;
        }
        Ok(diff[index])
    }

    fn volume_fraction(&self, element: usize, total_volume: T) -> T {
        self.grid.volume(element) / total_volume
    }

    /// Element values `w_e (1/2 l2_e + 1/2 vol_e/|Omega| |mu - mu_d|^2)` of the given elements.
    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    fn element_values(
        &self,
        elements: &[usize],
        weights: Option<&DVector<T>>,
        u: &DVector<T>,
        mu: &Parameter<T>,
    ) -> eyre::Result<Vec<ElementScalar<T>>> {
        check_dimension(self.dim_source(), u.len(), "state")?;
        let table = self.table()?;
        let grid = self.grid.as_ref();
        let parameter_norm_squared = self.parameter_difference(mu)?.norm_squared();
        let total_volume = grid.total_volume();
        log::debug!("Integrating tracking functional on {} elements", elements.len());
        Ok(elements
            .iter()
            .map(|&e| {
                let l2 = estimate_element_l2_error_squared(grid, &table, e, u, &self.u_d);
                let value = 0.5 * l2 + 0.5 * self.volume_fraction(e, total_volume) * parameter_norm_squared;
                let w = weights.map(|rho| rho[e]).unwrap_or(T::one());
                ElementScalar {
                    element: e,
                    value: w * value,
                }
            })
            .collect())
    }

    /// Element gradients `w_e int_e 2 (u_h - u_{d,h}) phi` of the given elements.
    fn element_gradients(
        &self,
        elements: &[usize],
        weights: Option<&DVector<T>>,
        u: &DVector<T>,
    ) -> eyre::Result<Vec<ElementVector<T>>> {
        check_dimension(self.dim_source(), u.len(), "state")?;
        let table = self.table()?;
        let grid = self.grid.as_ref();
        log::debug!("Integrating tracking functional gradient on {} elements", elements.len());
        Ok(elements
            .iter()
            .map(|&e| {
                let mut vector = estimate_element_l2_error_squared_gradient(grid, &table, e, u, &self.u_d);
                if let Some(rho) = weights {
                    vector *= rho[e];
                }
                ElementVector {
                    element: e,
                    dofs: grid.element_vertices(e).to_vec(),
                    vector,
                }
            })
            .collect())
    }

    /// Per-element shares `vol_e / |Omega| (mu - mu_d)` of the parameter gradient.
    ///
    /// The `dofs` of each returned vector index parameter components.
    fn element_parameter_gradients(&self, elements: &[usize], mu: &Parameter<T>) -> eyre::Result<Vec<ElementVector<T>>> {
        let diff = self.parameter_difference(mu)?;
        let total_volume = self.grid.total_volume();
        Ok(elements
            .iter()
            .map(|&e| ElementVector {
                element: e,
                dofs: (0..diff.len()).collect(),
                vector: &diff * self.volume_fraction(e, total_volume),
            })
            .collect())
    }

    fn all_elements(&self) -> Vec<usize> {
        (0..self.grid.size(0)).collect()
    }

    fn sum_gradients(&self, contributions: &[ElementVector<T>]) -> DVector<T> {
        sum_element_vectors(self.dim_source(), contributions)
    }

    /// Evaluates the functional and also returns the value of every element.
    pub fn apply_with_element_contributions(
        &self,
        u: &DVector<T>,
        mu: &Parameter<T>,
    ) -> eyre::Result<(T, Vec<ElementScalar<T>>)> {
        let values = self.element_values(&self.all_elements(), None, u, mu)?;
        Ok((self.apply(u, mu)?, values))
    }

    /// Computes the state gradient and also returns the gradient of every element.
    pub fn jacobian_with_element_contributions(
        &self,
        u: &DVector<T>,
        _mu: &Parameter<T>,
    ) -> eyre::Result<(DVector<T>, Vec<ElementVector<T>>)> {
        let contributions = self.element_gradients(&self.all_elements(), None, u)?;
        Ok((self.sum_gradients(&contributions), contributions))
    }

    /// Computes the parameter derivative and also returns the volume apportioned parameter
    /// gradient of every element.
    pub fn d_mu_with_element_contributions(
        &self,
        mu: &Parameter<T>,
        index: usize,
    ) -> eyre::Result<(T, Vec<ElementVector<T>>)> {
        let d_mu = self.d_mu(mu, index)?;
        Ok((d_mu, self.element_parameter_gradients(&self.all_elements(), mu)?))
    }
}

impl<T: Real> ScalarFunctional<T> for QuadraticFunctional<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn dim_source(&self) -> usize {
        self.grid.size(self.grid.dim())
    }

    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    fn apply(&self, u: &DVector<T>, mu: &Parameter<T>) -> eyre::Result<T> {
        check_dimension(self.dim_source(), u.len(), "state")?;
        let table = self.table()?;
        let grid = self.grid.as_ref();
        let l2 = (0..grid.size(0))
            .map(|e| estimate_element_l2_error_squared(grid, &table, e, u, &self.u_d))
            .fold(T::zero(), |acc, l2_e| acc + l2_e);
        Ok(0.5 * l2 + 0.5 * self.parameter_difference(mu)?.norm_squared())
    }

    fn jacobian(&self, u: &DVector<T>, _mu: &Parameter<T>) -> eyre::Result<DVector<T>> {
        let contributions = self.element_gradients(&self.all_elements(), None, u)?;
        Ok(self.sum_gradients(&contributions))
    }

    fn d_mu(&self, mu: &Parameter<T>, index: usize) -> eyre::Result<T> {
        self.parameter_component_difference(mu, index)
    }
}

/// The tracking functional restricted to a weighted subset of elements.
///
/// Only elements with nonzero weight `rho[e]` contribute, each scaled by `rho[e]`. The parameter
/// derivative is the volume fraction of the active elements times `mu[index] - mu_d[index]`.
#[derive(Debug, Clone)]
pub struct ElementQuadraticFunctional<T: Real> {
    functional: QuadraticFunctional<T>,
    rho: DVector<T>,
    elements: Vec<usize>,
}

impl<T: Real> ElementQuadraticFunctional<T> {
    pub fn new(functional: QuadraticFunctional<T>, rho: DVector<T>) -> eyre::Result<Self> {
        check_dimension(functional.grid.size(0), rho.len(), "element weights")?;
        let elements = rho
            .iter()
            .enumerate()
            .filter(|&(_, &w)| w != T::zero())
            .map(|(e, _)| e)
            .collect();
        Ok(Self {
            functional,
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
}

impl<T: Real> ScalarFunctional<T> for ElementQuadraticFunctional<T> {
    fn name(&self) -> &str {
        &self.functional.name
    }

    fn dim_source(&self) -> usize {
        self.functional.dim_source()
    }

    fn apply(&self, u: &DVector<T>, mu: &Parameter<T>) -> eyre::Result<T> {
        let values = self
            .functional
            .element_values(&self.elements, Some(&self.rho), u, mu)?;
        Ok(values
            .iter()
            .fold(T::zero(), |acc, element_value| acc + element_value.value))
    }

    fn jacobian(&self, u: &DVector<T>, _mu: &Parameter<T>) -> eyre::Result<DVector<T>> {
        let contributions = self
            .functional
            .element_gradients(&self.elements, Some(&self.rho), u)?;
        Ok(self.functional.sum_gradients(&contributions))
    }

    fn d_mu(&self, mu: &Parameter<T>, index: usize) -> eyre::Result<T> {
        let diff = self.functional.parameter_component_difference(mu, index)?;
        let total_volume = self.functional.grid.total_volume();
        let active_fraction = self
            .elements
            .iter()
            .map(|&e| self.functional.volume_fraction(e, total_volume))
            .fold(T::zero(), |acc, fraction| acc + fraction);
        Ok(active_fraction * diff)
    }
}
