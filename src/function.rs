//! Problem data: functions of a physical point and an optional parameter.
use crate::{check_dimension, Error, Real};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::{Debug, Display, Formatter};
use std::sync::Arc;

/// A parameter value, i.e. a vector of real numbers.
pub type Parameter<T> = DVector<T>;

/// Range shape of a [`Function`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Shape {
    Scalar,
    Vector(usize),
    Matrix(usize, usize),
}

impl Shape {
    /// Shape of the matrix holding a value of this shape.
    pub fn matrix_shape(&self) -> (usize, usize) {
        match *self {
            Self::Scalar => (1, 1),
            Self::Vector(n) => (n, 1),
            Self::Matrix(n, m) => (n, m),
        }
    }
}

impl Display for Shape {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar => write!(f, "scalar"),
            Self::Vector(n) => write!(f, "vector({})", n),
            Self::Matrix(n, m) => write!(f, "matrix({}x{})", n, m),
        }
    }
}

/// A function `x, mu -> value` with a declared domain dimension and range shape.
///
/// Values are returned as matrices: `1 x 1` for scalars, `n x 1` for vectors.
pub trait Function<T: Real>: Debug + Send + Sync {
    fn dim_domain(&self) -> usize;

    fn shape_range(&self) -> Shape;

    fn evaluate(&self, x: &DVector<T>, mu: Option<&Parameter<T>>) -> eyre::Result<DMatrix<T>>;

    fn evaluate_scalar(&self, x: &DVector<T>, mu: Option<&Parameter<T>>) -> eyre::Result<T> {
        Ok(self.evaluate(x, mu)?[(0, 0)])
    }

    fn evaluate_vector(&self, x: &DVector<T>, mu: Option<&Parameter<T>>) -> eyre::Result<DVector<T>> {
        Ok(self.evaluate(x, mu)?.column(0).into_owned())
    }

    /// The terms of the function if it is a linear combination.
    fn as_lincomb(&self) -> Option<&LincombFunction<T>> {
        None
    }
}

/// Checks that `f` is defined on `dim`-dimensional points and has one of the allowed shapes.
pub(crate) fn check_function<T: Real>(f: &dyn Function<T>, dim: usize, allowed: &[Shape]) -> eyre::Result<()> {
    check_dimension(dim, f.dim_domain(), "function domain")?;
    if !allowed.contains(&f.shape_range()) {
        let expected = allowed
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" or ");
        Err(Error::ShapeMismatch {
            expected,
            actual: f.shape_range().to_string(),
        })?;
    }
    Ok(())
}

/// A function with a constant value.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstantFunction<T: Real> {
    value: DMatrix<T>,
    shape: Shape,
    dim_domain: usize,
}

impl<T: Real> ConstantFunction<T> {
    pub fn scalar(value: T, dim_domain: usize) -> Self {
        Self {
            value: DMatrix::from_element(1, 1, value),
            shape: Shape::Scalar,
            dim_domain,
        }
    }

    pub fn vector(value: DVector<T>, dim_domain: usize) -> Self {
        let n = value.len();
        Self {
            value: DMatrix::from_column_slice(n, 1, value.as_slice()),
            shape: Shape::Vector(n),
            dim_domain,
        }
    }

    pub fn matrix(value: DMatrix<T>, dim_domain: usize) -> Self {
        let shape = Shape::Matrix(value.nrows(), value.ncols());
        Self {
            value,
            shape,
            dim_domain,
        }
    }
}

impl<T: Real> Function<T> for ConstantFunction<T> {
    fn dim_domain(&self) -> usize {
        self.dim_domain
    }

    fn shape_range(&self) -> Shape {
        self.shape
    }

    fn evaluate(&self, _x: &DVector<T>, _mu: Option<&Parameter<T>>) -> eyre::Result<DMatrix<T>> {
        Ok(self.value.clone())
    }
}

type Closure<T> = dyn Fn(&DVector<T>, Option<&Parameter<T>>) -> DMatrix<T> + Send + Sync;

/// A function defined by a closure.
#[derive(Clone)]
pub struct GenericFunction<T: Real> {
    closure: Arc<Closure<T>>,
    shape: Shape,
    dim_domain: usize,
}

impl<T: Real> Debug for GenericFunction<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenericFunction")
            .field("shape", &self.shape)
            .field("dim_domain", &self.dim_domain)
            .finish_non_exhaustive()
    }
}

impl<T: Real> GenericFunction<T> {
    /// Creates a function from a closure returning values of the given shape.
    pub fn new(
        dim_domain: usize,
        shape: Shape,
        closure: impl Fn(&DVector<T>, Option<&Parameter<T>>) -> DMatrix<T> + Send + Sync + 'static,
    ) -> Self {
        Self {
            closure: Arc::new(closure),
            shape,
            dim_domain,
        }
    }

    /// Creates a scalar function.
    pub fn scalar(
        dim_domain: usize,
        f: impl Fn(&DVector<T>, Option<&Parameter<T>>) -> T + Send + Sync + 'static,
    ) -> Self {
        Self::new(dim_domain, Shape::Scalar, move |x, mu| DMatrix::from_element(1, 1, f(x, mu)))
    }

    /// Creates a vector-valued function.
    pub fn vector(
        dim_domain: usize,
        dim_range: usize,
        f: impl Fn(&DVector<T>, Option<&Parameter<T>>) -> DVector<T> + Send + Sync + 'static,
    ) -> Self {
        Self::new(dim_domain, Shape::Vector(dim_range), move |x, mu| {
            let v = f(x, mu);
            DMatrix::from_column_slice(v.len(), 1, v.as_slice())
        })
    }
}

impl<T: Real> Function<T> for GenericFunction<T> {
    fn dim_domain(&self) -> usize {
        self.dim_domain
    }

    fn shape_range(&self) -> Shape {
        self.shape
    }

    fn evaluate(&self, x: &DVector<T>, mu: Option<&Parameter<T>>) -> eyre::Result<DMatrix<T>> {
        check_dimension(self.dim_domain, x.len(), "function argument")?;
        let value = (self.closure)(x, mu);
        check_dimension(self.shape.matrix_shape().0 * self.shape.matrix_shape().1, value.len(), "function value")?;
        Ok(value)
    }
}

type Expression<T> = dyn Fn(&Parameter<T>) -> T + Send + Sync;

/// A scalar coefficient that may depend on the parameter.
#[derive(Clone)]
pub enum Coefficient<T: Real> {
    Constant(T),
    /// The given component of the parameter.
    Component(usize),
    Expression(Arc<Expression<T>>),
    /// Another coefficient multiplied by a constant factor.
    Scaled(Box<Coefficient<T>>, T),
}

impl<T: Real> Debug for Coefficient<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constant(c) => write!(f, "Constant({:?})", c),
            Self::Component(i) => write!(f, "Component({})", i),
            Self::Expression(_) => write!(f, "Expression(..)"),
            Self::Scaled(c, s) => write!(f, "Scaled({:?}, {:?})", c, s),
        }
    }
}

impl<T: Real> Coefficient<T> {
    pub fn one() -> Self {
        Self::Constant(T::one())
    }

    pub fn expression(f: impl Fn(&Parameter<T>) -> T + Send + Sync + 'static) -> Self {
        Self::Expression(Arc::new(f))
    }

    pub fn is_parametric(&self) -> bool {
        match self {
            Self::Constant(_) => false,
            Self::Scaled(c, _) => c.is_parametric(),
            _ => true,
        }
    }

    pub fn evaluate(&self, mu: Option<&Parameter<T>>) -> eyre::Result<T> {
        match self {
            Self::Constant(c) => Ok(*c),
            Self::Component(i) => {
                let mu = mu.ok_or(Error::MissingParameter)?;
                if *i >= mu.len() {
                    Err(Error::DimensionMismatch {
                        expected: i + 1,
                        actual: mu.len(),
                        context: "parameter component".to_string(),
                    })?;
                }
                Ok(mu[*i])
            }
            Self::Expression(f) => Ok(f(mu.ok_or(Error::MissingParameter)?)),
            Self::Scaled(c, s) => Ok(*s * c.evaluate(mu)?),
        }
    }

    /// The coefficient multiplied by `-1`.
    pub fn negated(&self) -> Self {
        match self {
            Self::Constant(c) => Self::Constant(-*c),
            Self::Scaled(c, s) => Self::Scaled(c.clone(), -*s),
            _ => Self::Scaled(Box::new(self.clone()), -T::one()),
        }
    }
}

/// A linear combination `sum_i c_i(mu) f_i(x, mu)` of functions of equal shape.
#[derive(Debug, Clone)]
pub struct LincombFunction<T: Real> {
    functions: Vec<Arc<dyn Function<T>>>,
    coefficients: Vec<Coefficient<T>>,
}

impl<T: Real> LincombFunction<T> {
    pub fn new(functions: Vec<Arc<dyn Function<T>>>, coefficients: Vec<Coefficient<T>>) -> eyre::Result<Self> {
        check_dimension(functions.len(), coefficients.len(), "number of lincomb coefficients")?;
        if functions.is_empty() {
            Err(Error::NotImplemented("empty linear combination of functions".to_string()))?;
        }
        let shape = functions[0].shape_range();
        let dim = functions[0].dim_domain();
        for f in &functions {
            check_function(f.as_ref(), dim, &[shape])?;
        }
        Ok(Self {
            functions,
            coefficients,
        })
    }

    pub fn functions(&self) -> &[Arc<dyn Function<T>>] {
        &self.functions
    }

    pub fn coefficients(&self) -> &[Coefficient<T>] {
        &self.coefficients
    }
}

impl<T: Real> Function<T> for LincombFunction<T> {
    fn dim_domain(&self) -> usize {
        self.functions[0].dim_domain()
    }

    fn shape_range(&self) -> Shape {
        self.functions[0].shape_range()
    }

    fn evaluate(&self, x: &DVector<T>, mu: Option<&Parameter<T>>) -> eyre::Result<DMatrix<T>> {
        let (rows, cols) = self.shape_range().matrix_shape();
        let mut value = DMatrix::zeros(rows, cols);
        for (f, c) in self.functions.iter().zip(&self.coefficients) {
            value += f.evaluate(x, mu)? * c.evaluate(mu)?;
        }
        Ok(value)
    }

    fn as_lincomb(&self) -> Option<&LincombFunction<T>> {
        Some(self)
    }
}

/// Pointwise product of scalar functions.
#[derive(Debug, Clone)]
pub struct ProductFunction<T: Real> {
    factors: Vec<Arc<dyn Function<T>>>,
}

impl<T: Real> ProductFunction<T> {
    pub fn new(factors: Vec<Arc<dyn Function<T>>>) -> eyre::Result<Self> {
        if factors.is_empty() {
            Err(Error::NotImplemented("empty product of functions".to_string()))?;
        }
        let dim = factors[0].dim_domain();
        for f in &factors {
            check_function(f.as_ref(), dim, &[Shape::Scalar])?;
        }
        Ok(Self { factors })
    }
}

impl<T: Real> Function<T> for ProductFunction<T> {
    fn dim_domain(&self) -> usize {
        self.factors[0].dim_domain()
    }

    fn shape_range(&self) -> Shape {
        Shape::Scalar
    }

    fn evaluate(&self, x: &DVector<T>, mu: Option<&Parameter<T>>) -> eyre::Result<DMatrix<T>> {
        let mut product = T::one();
        for f in &self.factors {
            product *= f.evaluate_scalar(x, mu)?;
        }
        Ok(DMatrix::from_element(1, 1, product))
    }
}

/// Splits a function into `(term, coefficient)` pairs.
///
/// Linear combinations are split into their terms, any other function is returned with a unit
/// coefficient.
pub fn split_lincomb<T: Real>(f: &Arc<dyn Function<T>>) -> Vec<(Arc<dyn Function<T>>, Coefficient<T>)> {
    match f.as_lincomb() {
        Some(lincomb) => lincomb
            .functions()
            .iter()
            .cloned()
            .zip(lincomb.coefficients().iter().cloned())
            .collect(),
        None => vec![(Arc::clone(f), Coefficient::one())],
    }
}
