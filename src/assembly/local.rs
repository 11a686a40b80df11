//! Element-local integration.
//!
//! Every routine in this module computes one small dense block per element (or boundary facet)
//! and collects the blocks in [`ElementMatrices`] or [`ElementVectors`], which also record the
//! global row and column index of every entry.
use crate::Real;
use nalgebra::{DMatrix, DVector};

mod advection;
mod elliptic;
mod mass;
mod nonlinear;
mod quadrature_table;
mod robin;
mod source;

pub use advection::*;
pub use elliptic::*;
pub use mass::*;
pub use nonlinear::*;
pub use quadrature_table::*;
pub use robin::*;
pub use source::*;

/// Dense `n x n` blocks of a collection of entities, stored as flat arrays.
///
/// Block entries are stored row by row. For each entry, `rows` holds the global index of the
/// entity DOF of its row and `cols` the one of its column. Entries with equal global indices are
/// meant to be summed.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementMatrices<T: Real> {
    block_size: usize,
    entities: Vec<usize>,
    dofs: Vec<usize>,
    values: Vec<T>,
    rows: Vec<usize>,
    cols: Vec<usize>,
}

impl<T: Real> ElementMatrices<T> {
    pub fn new(block_size: usize) -> Self {
        Self {
            block_size,
            entities: Vec::new(),
            dofs: Vec::new(),
            values: Vec::new(),
            rows: Vec::new(),
            cols: Vec::new(),
        }
    }

    /// Appends the block of the given entity.
    ///
    /// # Panics
    ///
    /// Panics if the number of DOFs or the shape of the block do not match the block size.
    pub fn push(&mut self, entity: usize, dofs: &[usize], block: &DMatrix<T>) {
        let n = self.block_size;
        assert_eq!(dofs.len(), n, "Number of DOFs must match block size");
        assert_eq!(block.shape(), (n, n), "Block must be square with the block size");
        self.entities.push(entity);
        self.dofs.extend_from_slice(dofs);
        for i in 0..n {
            for j in 0..n {
                self.values.push(block[(i, j)]);
                self.rows.push(dofs[i]);
                self.cols.push(dofs[j]);
            }
        }
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn num_blocks(&self) -> usize {
        self.entities.len()
    }

    /// Indices of the elements (or facets) the blocks belong to.
    pub fn entities(&self) -> &[usize] {
        &self.entities
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    pub fn rows(&self) -> &[usize] {
        &self.rows
    }

    pub fn cols(&self) -> &[usize] {
        &self.cols
    }

    /// Global DOFs of the block with the given position.
    pub fn block_dofs(&self, index: usize) -> &[usize] {
        let n = self.block_size;
        &self.dofs[n * index..n * (index + 1)]
    }

    /// The block with the given position.
    pub fn block(&self, index: usize) -> DMatrix<T> {
        let n = self.block_size;
        DMatrix::from_row_slice(n, n, &self.values[n * n * index..n * n * (index + 1)])
    }

    /// Multiplies the block with the given position by a scalar.
    pub fn scale_block(&mut self, index: usize, factor: T) {
        let n = self.block_size;
        for v in &mut self.values[n * n * index..n * n * (index + 1)] {
            *v *= factor;
        }
    }
}

/// Dense vectors of a collection of entities, stored as flat arrays.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementVectors<T: Real> {
    block_size: usize,
    entities: Vec<usize>,
    values: Vec<T>,
    indices: Vec<usize>,
}

impl<T: Real> ElementVectors<T> {
    pub fn new(block_size: usize) -> Self {
        Self {
            block_size,
            entities: Vec::new(),
            values: Vec::new(),
            indices: Vec::new(),
        }
    }

    pub fn push(&mut self, entity: usize, dofs: &[usize], block: &DVector<T>) {
        assert_eq!(dofs.len(), self.block_size, "Number of DOFs must match block size");
        assert_eq!(block.len(), self.block_size, "Block length must match block size");
        self.entities.push(entity);
        self.indices.extend_from_slice(dofs);
        self.values.extend(block.iter().copied());
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn num_blocks(&self) -> usize {
        self.entities.len()
    }

    pub fn entities(&self) -> &[usize] {
        &self.entities
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn block_dofs(&self, index: usize) -> &[usize] {
        let n = self.block_size;
        &self.indices[n * index..n * (index + 1)]
    }

    pub fn block(&self, index: usize) -> DVector<T> {
        let n = self.block_size;
        DVector::from_column_slice(&self.values[n * index..n * (index + 1)])
    }

    pub fn scale_block(&mut self, index: usize, factor: T) {
        let n = self.block_size;
        for v in &mut self.values[n * index..n * (index + 1)] {
            *v *= factor;
        }
    }
}
