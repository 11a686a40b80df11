//! Continuous Galerkin finite element assembly for scalar elliptic problems.
//!
//! `cgfem` assembles the sparse matrices and vectors of linear (P1) and bilinear (Q1) finite
//! element discretizations on line, triangle and square meshes. On top of the classical diffusion,
//! advection, reaction and Robin terms it provides a nonlinear reaction operator with its Jacobian
//! and a quadratic tracking functional with derivatives, both of which can be restricted to a
//! weighted subset of elements.
//!
//! Solvers are not part of this crate. The results are [`nalgebra_sparse::CscMatrix`] and
//! [`nalgebra::DVector`] values that are handed to whatever solver the caller prefers.
use nalgebra::RealField;
use std::fmt;
use std::fmt::{Display, Formatter};

pub mod assembly;
pub mod boundary;
pub mod discretize;
pub mod element;
pub mod error;
pub mod function;
pub mod grid;
pub mod quadrature;

pub extern crate nalgebra;
pub extern crate nalgebra_sparse;

/// Scalar type used throughout the crate.
///
/// Used as a trait alias for the traits needed by generic `cgfem` routines.
pub trait Real: RealField + Copy + Send + Sync {}

impl<T> Real for T where T: RealField + Copy + Send + Sync {}

/// Library-wide error type.
///
/// Routines return [`eyre::Result`]. Errors that originate in `cgfem` itself carry one of these
/// variants, which callers can recover with [`eyre::Report::downcast_ref`].
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// The requested feature is not available.
    NotImplemented(String),
    /// An object requires a different reference element than the one provided.
    UnsupportedReferenceElement(String),
    /// Only first order shape functions are available.
    UnsupportedOrder(usize),
    /// A function has the wrong range shape for the place it is used in.
    ShapeMismatch { expected: String, actual: String },
    /// Lengths or dimensions of inputs do not agree.
    DimensionMismatch { expected: usize, actual: usize, context: String },
    /// Boundary treatment was requested without any boundary information.
    MissingBoundaryInfo,
    /// A parameter is needed to evaluate a parametric quantity, but none was given.
    MissingParameter,
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotImplemented(what) => write!(f, "Not implemented: {}", what),
            Self::UnsupportedReferenceElement(what) => write!(f, "Unsupported reference element: {}", what),
            Self::UnsupportedOrder(order) => {
                write!(f, "Shape functions of order {} are not available (only order 1)", order)
            }
            Self::ShapeMismatch { expected, actual } => {
                write!(f, "Function has range shape {}, expected {}", actual, expected)
            }
            Self::DimensionMismatch {
                expected,
                actual,
                context,
            } => write!(f, "Dimension mismatch in {}: expected {}, got {}", context, expected, actual),
            Self::MissingBoundaryInfo => write!(f, "Boundary treatment requires boundary info"),
            Self::MissingParameter => write!(f, "A parameter is required but none was provided"),
        }
    }
}

impl std::error::Error for Error {}

/// Returns a [`Error::DimensionMismatch`] if the two dimensions differ.
pub(crate) fn check_dimension(expected: usize, actual: usize, context: &str) -> eyre::Result<()> {
    if expected != actual {
        Err(Error::DimensionMismatch {
            expected,
            actual,
            context: context.to_string(),
        })?;
    }
    Ok(())
}
