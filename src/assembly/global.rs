//! Scattering of element blocks into global matrices and vectors.
use crate::assembly::local::{ElementMatrices, ElementVectors};
use crate::{check_dimension, Real};
use nalgebra::{DMatrix, DVector};
use nalgebra_sparse::{CooMatrix, CscMatrix};
use serde::{Deserialize, Serialize};

/// How Dirichlet DOFs are treated when assembling a matrix.
///
/// Treatment is applied in a fixed order: rows are cleared, then columns, then unit diagonal
/// entries are added for all Dirichlet DOFs if anything was cleared and `clear_diag` is not set.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct DirichletTreatment {
    pub clear_rows: bool,
    pub clear_columns: bool,
    pub clear_diag: bool,
}

impl Default for DirichletTreatment {
    fn default() -> Self {
        Self {
            clear_rows: true,
            clear_columns: false,
            clear_diag: false,
        }
    }
}

impl DirichletTreatment {
    /// No treatment at all.
    pub fn none() -> Self {
        Self {
            clear_rows: false,
            clear_columns: false,
            clear_diag: false,
        }
    }

    /// Clears rows and columns and puts ones on the diagonal.
    pub fn symmetric() -> Self {
        Self {
            clear_rows: true,
            clear_columns: true,
            clear_diag: false,
        }
    }

    pub fn with_clear_rows(self, clear_rows: bool) -> Self {
        Self { clear_rows, ..self }
    }

    pub fn with_clear_columns(self, clear_columns: bool) -> Self {
        Self { clear_columns, ..self }
    }

    pub fn with_clear_diag(self, clear_diag: bool) -> Self {
        Self { clear_diag, ..self }
    }

    /// Whether rows or columns are cleared.
    pub fn clears_anything(&self) -> bool {
        self.clear_rows || self.clear_columns
    }

    /// Whether unit diagonal entries are added for Dirichlet DOFs.
    pub fn adds_unit_diagonal(&self) -> bool {
        self.clears_anything() && !self.clear_diag
    }
}

/// Applies Dirichlet treatment to matrix triplets in place.
fn treat_triplets<T: Real>(
    rows: &mut Vec<usize>,
    cols: &mut Vec<usize>,
    values: &mut Vec<T>,
    dirichlet_mask: &[bool],
    treatment: &DirichletTreatment,
) {
    if treatment.clear_rows {
        for (v, &r) in values.iter_mut().zip(rows.iter()) {
            if dirichlet_mask[r] {
                *v = T::zero();
            }
        }
    }
    if treatment.clear_columns {
        for (v, &c) in values.iter_mut().zip(cols.iter()) {
            if dirichlet_mask[c] {
                *v = T::zero();
            }
        }
    }
    if treatment.adds_unit_diagonal() {
        for (d, _) in dirichlet_mask.iter().enumerate().filter(|(_, &is_dirichlet)| is_dirichlet) {
            rows.push(d);
            cols.push(d);
            values.push(T::one());
        }
    }
}

/// Builds a compact CSC matrix from triplets, summing duplicates and dropping explicit zeros.
pub fn csc_from_triplets<T: Real>(
    nrows: usize,
    ncols: usize,
    rows: Vec<usize>,
    cols: Vec<usize>,
    values: Vec<T>,
) -> eyre::Result<CscMatrix<T>> {
    let coo = CooMatrix::try_from_triplets(nrows, ncols, rows, cols, values)
        .map_err(|e| eyre::eyre!("{}", e))?;
    // Conversion sums duplicate entries, filtering produces a right-sized standalone matrix
    let csc = CscMatrix::from(&coo);
    Ok(csc.filter(|_, _, v| *v != T::zero()))
}

/// Assembles a sparse matrix from element blocks.
///
/// Duplicate entries are summed. If a Dirichlet mask is given, `treatment` is applied to the
/// contributions before summation. Explicit zeros are removed from the result.
pub fn assemble_sparse_matrix<T: Real>(
    nrows: usize,
    ncols: usize,
    contributions: &ElementMatrices<T>,
    dirichlet_mask: Option<&[bool]>,
    treatment: &DirichletTreatment,
) -> eyre::Result<CscMatrix<T>> {
    let mut rows = contributions.rows().to_vec();
    let mut cols = contributions.cols().to_vec();
    let mut values = contributions.values().to_vec();
    log::debug!("Scattering {} element blocks into {}x{} matrix", contributions.num_blocks(), nrows, ncols);
    if let Some(mask) = dirichlet_mask {
        check_dimension(nrows.max(ncols), mask.len(), "Dirichlet mask")?;
        treat_triplets(&mut rows, &mut cols, &mut values, mask, treatment);
    }
    csc_from_triplets(nrows, ncols, rows, cols, values)
}

/// Applies Dirichlet treatment to an already assembled matrix.
///
/// Treating a matrix twice with the same treatment gives the same matrix as treating it once.
pub fn apply_dirichlet_treatment_csc<T: Real>(
    matrix: &CscMatrix<T>,
    dirichlet_mask: &[bool],
    treatment: &DirichletTreatment,
) -> eyre::Result<CscMatrix<T>> {
    check_dimension(matrix.nrows().max(matrix.ncols()), dirichlet_mask.len(), "Dirichlet mask")?;
    let mut rows = Vec::with_capacity(matrix.nnz());
    let mut cols = Vec::with_capacity(matrix.nnz());
    let mut values = Vec::with_capacity(matrix.nnz());
    for (i, j, &v) in matrix.triplet_iter() {
        rows.push(i);
        cols.push(j);
        values.push(v);
    }
    treat_triplets(&mut rows, &mut cols, &mut values, dirichlet_mask, treatment);
    csc_from_triplets(matrix.nrows(), matrix.ncols(), rows, cols, values)
}

/// Assembles a dense vector from element vectors.
///
/// Entries of Dirichlet DOFs are set to zero if a mask is given.
pub fn assemble_dense_vector<T: Real>(
    n: usize,
    contributions: &ElementVectors<T>,
    dirichlet_mask: Option<&[bool]>,
) -> eyre::Result<DVector<T>> {
    let mut vector = DVector::zeros(n);
    for (&i, &v) in contributions.indices().iter().zip(contributions.values()) {
        vector[i] += v;
    }
    if let Some(mask) = dirichlet_mask {
        check_dimension(n, mask.len(), "Dirichlet mask")?;
        for (v, _) in vector.iter_mut().zip(mask).filter(|(_, &is_dirichlet)| is_dirichlet) {
            *v = T::zero();
        }
    }
    Ok(vector)
}

/// The matrix block of a single element together with its global DOFs.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementMatrix<T: Real> {
    pub element: usize,
    pub dofs: Vec<usize>,
    pub matrix: DMatrix<T>,
}

/// The vector block of a single element together with its global DOFs.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementVector<T: Real> {
    pub element: usize,
    pub dofs: Vec<usize>,
    pub vector: DVector<T>,
}

/// Splits contributions into per-element matrices.
///
/// If a mask is given, the rows and columns of Dirichlet DOFs are zeroed as far as the treatment
/// clears them. Unit diagonal entries are never added to element blocks.
pub fn element_matrices<T: Real>(
    contributions: &ElementMatrices<T>,
    dirichlet_mask: Option<&[bool]>,
    treatment: &DirichletTreatment,
) -> Vec<ElementMatrix<T>> {
    (0..contributions.num_blocks())
        .map(|b| {
            let dofs = contributions.block_dofs(b).to_vec();
            let mut matrix = contributions.block(b);
            if let Some(mask) = dirichlet_mask {
                for (i, &dof) in dofs.iter().enumerate() {
                    if mask[dof] {
                        if treatment.clear_rows {
                            matrix.row_mut(i).fill(T::zero());
                        }
                        if treatment.clear_columns {
                            matrix.column_mut(i).fill(T::zero());
                        }
                    }
                }
            }
            ElementMatrix {
                element: contributions.entities()[b],
                dofs,
                matrix,
            }
        })
        .collect()
}

/// Splits contributions into per-element vectors, zeroing Dirichlet entries if a mask is given.
pub fn element_vectors<T: Real>(
    contributions: &ElementVectors<T>,
    dirichlet_mask: Option<&[bool]>,
) -> Vec<ElementVector<T>> {
    (0..contributions.num_blocks())
        .map(|b| {
            let dofs = contributions.block_dofs(b).to_vec();
            let mut vector = contributions.block(b);
            if let Some(mask) = dirichlet_mask {
                for (i, &dof) in dofs.iter().enumerate() {
                    if mask[dof] {
                        vector[i] = T::zero();
                    }
                }
            }
            ElementVector {
                element: contributions.entities()[b],
                dofs,
                vector,
            }
        })
        .collect()
}

/// Sums per-element matrices into a global sparse matrix.
pub fn sum_element_matrices<T: Real>(
    nrows: usize,
    ncols: usize,
    matrices: &[ElementMatrix<T>],
) -> eyre::Result<CscMatrix<T>> {
    let mut rows = Vec::new();
    let mut cols = Vec::new();
    let mut values = Vec::new();
    for element_matrix in matrices {
        let n = element_matrix.dofs.len();
        for i in 0..n {
            for j in 0..n {
                rows.push(element_matrix.dofs[i]);
                cols.push(element_matrix.dofs[j]);
                values.push(element_matrix.matrix[(i, j)]);
            }
        }
    }
    csc_from_triplets(nrows, ncols, rows, cols, values)
}

/// Sums per-element vectors into a global dense vector.
pub fn sum_element_vectors<T: Real>(n: usize, vectors: &[ElementVector<T>]) -> DVector<T> {
    let mut sum = DVector::zeros(n);
    for element_vector in vectors {
        for (&dof, &v) in element_vector.dofs.iter().zip(element_vector.vector.iter()) {
            sum[dof] += v;
        }
    }
    sum
}
