//! Reference elements and their first order Lagrange basis functions.
use crate::{Error, Real};
use nalgebra::{DMatrix, DVector};
use numeric_literals::replace_float_literals;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::{Display, Formatter};

mod quadrilateral;
mod segment;
mod triangle;

pub use quadrilateral::*;
pub use segment::*;
pub use triangle::*;

/// The reference elements supported by `cgfem`.
///
/// All reference elements live on unit domains: the interval `[0, 1]`, the triangle with
/// vertices `(0, 0)`, `(1, 0)`, `(0, 1)` and the square `[0, 1]^2`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ReferenceElement {
    Line,
    Triangle,
    Square,
}

impl ReferenceElement {
    /// Topological (and geometric) dimension of the element.
    pub fn dim(&self) -> usize {
        match self {
            Self::Line => 1,
            Self::Triangle | Self::Square => 2,
        }
    }

    /// Number of vertices, which is also the number of local degrees of freedom.
    pub fn num_vertices(&self) -> usize {
        match self {
            Self::Line => 2,
            Self::Triangle => 3,
            Self::Square => 4,
        }
    }

    /// Measure of the reference domain.
    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    pub fn volume<T: Real>(&self) -> T {
        match self {
            Self::Line | Self::Square => 1.0,
            Self::Triangle => 0.5,
        }
    }

    /// Barycenter of the reference domain.
    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    pub fn center<T: Real>(&self) -> DVector<T> {
        match self {
            Self::Line => DVector::from_element(1, 0.5),
            Self::Triangle => DVector::from_element(2, 1.0 / 3.0),
            Self::Square => DVector::from_element(2, 0.5),
        }
    }

    /// Local vertex indices of each facet, in the order facets are enumerated.
    ///
    /// Facets of two-dimensional elements keep the counter-clockwise orientation of the element.
    pub fn facets(&self) -> &'static [&'static [usize]] {
        match self {
            Self::Line => &[&[0], &[1]],
            Self::Triangle => &[&[0, 1], &[1, 2], &[2, 0]],
            Self::Square => &[&[0, 1], &[1, 2], &[2, 3], &[3, 0]],
        }
    }

    /// Local vertices `[origin, e_1, (e_2)]` spanning the affine reference map.
    ///
    /// The map sends the reference vertex at the origin to `origin` and each unit coordinate
    /// vector to the corresponding listed vertex. Squares are therefore assumed to be
    /// parallelograms.
    pub fn affine_vertices(&self) -> &'static [usize] {
        match self {
            Self::Line => &[0, 1],
            Self::Triangle => &[0, 1, 2],
            Self::Square => &[0, 1, 3],
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Line => "line",
            Self::Triangle => "triangle",
            Self::Square => "square",
        }
    }
}

impl Display for ReferenceElement {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// First order nodal Lagrange basis on a reference element.
///
/// This is the P1 basis on lines and triangles and the Q1 basis on squares. The basis functions
/// are ordered like the vertices of the reference element.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct LagrangeBasis {
    reference_element: ReferenceElement,
}

impl LagrangeBasis {
    /// Creates the basis of the given polynomial order.
    ///
    /// Only `order == 1` is supported.
    pub fn new(reference_element: ReferenceElement, order: usize) -> eyre::Result<Self> {
        if order != 1 {
            Err(Error::UnsupportedOrder(order))?;
        }
        Ok(Self { reference_element })
    }

    pub fn reference_element(&self) -> ReferenceElement {
        self.reference_element
    }

    pub fn num_functions(&self) -> usize {
        self.reference_element.num_vertices()
    }

    /// Whether the gradients are independent of the reference coordinate.
    pub fn has_constant_gradients(&self) -> bool {
        !matches!(self.reference_element, ReferenceElement::Square)
    }

    /// Evaluates all basis functions at the reference coordinate `xi`.
    ///
    /// # Panics
    ///
    /// Panics if `xi` does not have the dimension of the reference element.
    pub fn evaluate<T: Real>(&self, xi: &[T]) -> DVector<T> {
        assert_eq!(xi.len(), self.reference_element.dim(), "Reference coordinate has wrong dimension");
        match self.reference_element {
            ReferenceElement::Line => DVector::from_row_slice(&segment_basis(xi[0])),
            ReferenceElement::Triangle => DVector::from_row_slice(&triangle_basis([xi[0], xi[1]])),
            ReferenceElement::Square => DVector::from_row_slice(&square_basis([xi[0], xi[1]])),
        }
    }

    /// Evaluates the reference gradients at `xi`.
    ///
    /// Column `i` of the returned `dim x n` matrix is the gradient of basis function `i`.
    pub fn gradients<T: Real>(&self, xi: &[T]) -> DMatrix<T> {
        assert_eq!(xi.len(), self.reference_element.dim(), "Reference coordinate has wrong dimension");
        match self.reference_element {
            ReferenceElement::Line => DMatrix::from_row_slice(1, 2, &segment_gradients()),
            ReferenceElement::Triangle => {
                let grads = triangle_gradients();
                DMatrix::from_fn(2, 3, |k, i| grads[i][k])
            }
            ReferenceElement::Square => {
                let grads = square_gradients([xi[0], xi[1]]);
                DMatrix::from_fn(2, 4, |k, i| grads[i][k])
            }
        }
    }
}
