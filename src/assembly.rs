//! Assembly of finite element matrices, vectors and operators.
//!
//! Assembly happens in two stages. The routines in [`local`] compute dense blocks for every
//! element (or boundary facet) together with the global indices of their rows and columns. The
//! routines in [`global`] scatter these blocks into sparse matrices or dense vectors and apply
//! the Dirichlet boundary treatment. The [`operators`] module wraps both stages into operators
//! that can be assembled for a given parameter.
pub mod global;
pub mod local;
pub mod operators;
