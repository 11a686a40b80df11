use crate::unit_tests::{all_dirichlet, dense, unit_square, PLANAR_ELEMENTS};
use cgfem::assembly::global::{
    apply_dirichlet_treatment_csc, assemble_dense_vector, assemble_sparse_matrix, csc_from_triplets,
    element_matrices, element_vectors, sum_element_matrices, sum_element_vectors, DirichletTreatment,
};
use cgfem::assembly::local::{assemble_diffusion_blocks, assemble_mass_blocks, assemble_source_vectors};
use cgfem::element::ReferenceElement;
use cgfem::function::ConstantFunction;
use cgfem::nalgebra::DMatrix;
use matrixcompare::{assert_matrix_eq, assert_scalar_eq};

#[test]
fn triplets_are_summed_and_zeros_dropped() {
    let matrix = csc_from_triplets(
        3,
        3,
        vec![0, 0, 1, 2, 2],
        vec![0, 0, 1, 0, 0],
        vec![1.0, 2.0, 0.0, 5.0, -5.0],
    )
    .unwrap();
    assert_eq!(matrix.nnz(), 1);
    let mut expected = DMatrix::<f64>::zeros(3, 3);
    expected[(0, 0)] = 3.0;
    assert_matrix_eq!(dense(&matrix), expected);
}

#[test]
fn out_of_bounds_triplets_are_rejected() {
    assert!(csc_from_triplets(2, 2, vec![2], vec![0], vec![1.0]).is_err());
}

#[test]
fn default_treatment_gives_identity_rows() {
    let grid = unit_square(ReferenceElement::Square, 2);
    let info = all_dirichlet(&grid);
    let blocks = assemble_diffusion_blocks(grid.as_ref(), None, 1.0, None).unwrap();
    let matrix = assemble_sparse_matrix(
        9,
        9,
        &blocks,
        Some(info.dirichlet_mask()),
        &DirichletTreatment::default(),
    )
    .unwrap();
    let matrix = dense(&matrix);
    for &d in info.dirichlet_vertices() {
        for j in 0..9 {
            let expected = if j == d { 1.0 } else { 0.0 };
            assert_scalar_eq!(matrix[(d, j)], expected);
        }
    }
    // The only free DOF keeps its couplings to Dirichlet DOFs in its row
    assert_scalar_eq!(matrix[(4, 4)], 8.0 / 3.0, comp = abs, tol = 1e-14);
    assert_scalar_eq!(matrix[(4, 0)], -1.0 / 3.0, comp = abs, tol = 1e-14);
    assert_scalar_eq!(matrix[(0, 4)], 0.0);
}

#[test]
fn symmetric_treatment_clears_columns() {
    let grid = unit_square(ReferenceElement::Triangle, 3);
    let info = all_dirichlet(&grid);
    let blocks = assemble_mass_blocks(grid.as_ref(), None, None).unwrap();
    let n = grid.size(2);
    let matrix = assemble_sparse_matrix(n, n, &blocks, Some(info.dirichlet_mask()), &DirichletTreatment::symmetric())
        .unwrap();
    let matrix = dense(&matrix);
    assert_matrix_eq!(matrix, matrix.transpose(), comp = abs, tol = 1e-15);
    for &d in info.dirichlet_vertices() {
        assert_scalar_eq!(matrix.column(d).sum(), 1.0);
        assert_scalar_eq!(matrix.row(d).sum(), 1.0);
    }
}

#[test]
fn clear_diag_leaves_dirichlet_rows_empty() {
    let grid = unit_square(ReferenceElement::Square, 2);
    let info = all_dirichlet(&grid);
    let blocks = assemble_mass_blocks(grid.as_ref(), None, None).unwrap();
    let treatment = DirichletTreatment::default().with_clear_diag(true);
    let matrix = assemble_sparse_matrix(9, 9, &blocks, Some(info.dirichlet_mask()), &treatment).unwrap();
    // Only row 4 survives
    assert_eq!(matrix.nnz(), 9);
    assert!(matrix.triplet_iter().all(|(i, _, _)| i == 4));
}

#[test]
fn no_treatment_without_mask() {
    let grid = unit_square(ReferenceElement::Square, 2);
    let blocks = assemble_mass_blocks(grid.as_ref(), None, None).unwrap();
    let matrix = assemble_sparse_matrix(9, 9, &blocks, None, &DirichletTreatment::default()).unwrap();
    let total: f64 = matrix.values().iter().sum();
    assert_scalar_eq!(total, 1.0, comp = abs, tol = 1e-14);
}

#[test]
fn mask_of_wrong_length_is_rejected() {
    let grid = unit_square(ReferenceElement::Square, 2);
    let blocks = assemble_mass_blocks(grid.as_ref(), None, None).unwrap();
    let mask = vec![false; 4];
    assert!(assemble_sparse_matrix(9, 9, &blocks, Some(&mask), &DirichletTreatment::default()).is_err());
}

#[test]
fn dirichlet_treatment_is_idempotent() {
    for reference_element in PLANAR_ELEMENTS {
        let grid = unit_square(reference_element, 3);
        let info = all_dirichlet(&grid);
        let n = grid.size(2);
        let blocks = assemble_diffusion_blocks(grid.as_ref(), None, 1.0, None).unwrap();
        let matrix = assemble_sparse_matrix(n, n, &blocks, None, &DirichletTreatment::none()).unwrap();

        for treatment in [
            DirichletTreatment::default(),
            DirichletTreatment::symmetric(),
            DirichletTreatment::default().with_clear_diag(true),
        ] {
            let once = apply_dirichlet_treatment_csc(&matrix, info.dirichlet_mask(), &treatment).unwrap();
            let twice = apply_dirichlet_treatment_csc(&once, info.dirichlet_mask(), &treatment).unwrap();
            assert_matrix_eq!(dense(&once), dense(&twice), comp = abs, tol = 1e-14);

            // Treating during assembly or afterwards gives the same matrix
            let direct = assemble_sparse_matrix(n, n, &blocks, Some(info.dirichlet_mask()), &treatment).unwrap();
            assert_matrix_eq!(dense(&once), dense(&direct), comp = abs, tol = 1e-14);
        }
    }
}

#[test]
fn treatment_deserializes_with_defaults() {
    let treatment: DirichletTreatment = serde_json::from_str(r#"{ "clear_columns": true }"#).unwrap();
    assert_eq!(treatment, DirichletTreatment::symmetric());
    let treatment: DirichletTreatment = serde_json::from_str("{}").unwrap();
    assert_eq!(treatment, DirichletTreatment::default());
    assert!(treatment.adds_unit_diagonal());
    assert!(!DirichletTreatment::none().clears_anything());
}

#[test]
fn dense_vector_assembly_clears_dirichlet_entries() {
    let grid = unit_square(ReferenceElement::Square, 2);
    let info = all_dirichlet(&grid);
    let f = ConstantFunction::scalar(1.0, 2);
    let vectors = assemble_source_vectors(grid.as_ref(), &f, None).unwrap();
    let full = assemble_dense_vector(9, &vectors, None).unwrap();
    assert_scalar_eq!(full.sum(), 1.0, comp = abs, tol = 1e-14);
    assert_scalar_eq!(full[4], 0.25, comp = abs, tol = 1e-14);

    let cleared = assemble_dense_vector(9, &vectors, Some(info.dirichlet_mask())).unwrap();
    assert_scalar_eq!(cleared.sum(), 0.25, comp = abs, tol = 1e-14);
}

#[test]
fn element_contributions_sum_to_global_result() {
    for reference_element in PLANAR_ELEMENTS {
        let grid = unit_square(reference_element, 3);
        let n = grid.size(2);
        let blocks = assemble_diffusion_blocks(grid.as_ref(), None, 1.0, None).unwrap();
        let global = assemble_sparse_matrix(n, n, &blocks, None, &DirichletTreatment::none()).unwrap();
        let per_element = element_matrices(&blocks, None, &DirichletTreatment::none());
        assert_eq!(per_element.len(), grid.size(0));
        let summed = sum_element_matrices(n, n, &per_element).unwrap();
        assert_matrix_eq!(dense(&summed), dense(&global), comp = abs, tol = 1e-14);

        let f = ConstantFunction::scalar(2.0, 2);
        let vectors = assemble_source_vectors(grid.as_ref(), &f, None).unwrap();
        let per_element = element_vectors(&vectors, None);
        assert_matrix_eq!(
            sum_element_vectors(n, &per_element),
            assemble_dense_vector(n, &vectors, None).unwrap(),
            comp = abs,
            tol = 1e-14
        );
    }
}

#[test]
fn element_contributions_zero_dirichlet_rows() {
    let grid = unit_square(ReferenceElement::Square, 2);
    let info = all_dirichlet(&grid);
    let blocks = assemble_mass_blocks(grid.as_ref(), None, None).unwrap();
    for element_matrix in element_matrices(&blocks, Some(info.dirichlet_mask()), &DirichletTreatment::default()) {
        for (i, &dof) in element_matrix.dofs.iter().enumerate() {
            if dof != 4 {
                assert_scalar_eq!(element_matrix.matrix.row(i).norm(), 0.0);
            } else {
                assert!(element_matrix.matrix.row(i).norm() > 0.0);
            }
        }
    }
}

#[test]
fn element_contributions_zero_dirichlet_columns_under_symmetric_treatment() {
    let grid = unit_square(ReferenceElement::Triangle, 2);
    let info = all_dirichlet(&grid);
    let blocks = assemble_mass_blocks(grid.as_ref(), None, None).unwrap();
    let treatment = DirichletTreatment::symmetric();
    for element_matrix in element_matrices(&blocks, Some(info.dirichlet_mask()), &treatment) {
        for (i, &dof) in element_matrix.dofs.iter().enumerate() {
            if dof != 4 {
                assert_scalar_eq!(element_matrix.matrix.row(i).norm(), 0.0);
                assert_scalar_eq!(element_matrix.matrix.column(i).norm(), 0.0);
            } else {
                assert!(element_matrix.matrix[(i, i)] > 0.0);
            }
        }
    }

    // Rows are kept when only columns are cleared
    let columns_only = DirichletTreatment::none().with_clear_columns(true);
    for element_matrix in element_matrices(&blocks, Some(info.dirichlet_mask()), &columns_only) {
        if let Some(center) = element_matrix.dofs.iter().position(|&dof| dof == 4) {
            for (j, &dof) in element_matrix.dofs.iter().enumerate() {
                if dof != 4 {
                    assert_scalar_eq!(element_matrix.matrix[(center, j)], 0.0);
                    assert!(element_matrix.matrix[(j, center)] > 0.0);
                }
            }
        }
    }
}
