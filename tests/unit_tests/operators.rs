use crate::unit_tests::{all_dirichlet, dense, spatial_unit_square, unit_interval, unit_square, PLANAR_ELEMENTS};
use cgfem::assembly::global::{sum_element_matrices, sum_element_vectors, DirichletTreatment};
use cgfem::assembly::operators::{
    AdvectionOperator, AssembledMatrixOperator, BlockFunctional, BoundaryDirichletFunctional, BoundaryL2Functional,
    DiffusionOperator, InterpolationOperator, L2Functional, L2ProductOperator, LincombFunctional, LincombOperator,
    MatrixOperator, Operator, RobinBoundaryOperator, VectorFunctional,
};
use cgfem::boundary::{BoundaryInfo, BoundaryType, GenericBoundaryInfo};
use cgfem::element::ReferenceElement;
use cgfem::function::{Coefficient, ConstantFunction, Function, GenericFunction};
use cgfem::nalgebra::{DMatrix, DVector};
use cgfem::Error;
use matrixcompare::{assert_matrix_eq, assert_scalar_eq};
use proptest::prelude::*;
use std::sync::Arc;

fn constant(value: f64, dim: usize) -> Arc<dyn Function<f64>> {
    Arc::new(ConstantFunction::scalar(value, dim))
}

#[test]
fn mass_matrix_is_symmetric_with_positive_diagonal() {
    for reference_element in PLANAR_ELEMENTS {
        let grid = unit_square(reference_element, 3);
        let mass = dense(&L2ProductOperator::new(grid.clone(), None).assemble(None).unwrap());
        assert_matrix_eq!(mass, mass.transpose(), comp = abs, tol = 1e-15);
        assert!(mass.diagonal().iter().all(|&d| d > 0.0));
        // 1^T M 1 is the area of the domain
        assert_scalar_eq!(mass.sum(), 1.0, comp = abs, tol = 1e-13);
    }
}

#[test]
fn reaction_coefficient_scales_mass_matrix() {
    let grid = unit_square(ReferenceElement::Square, 2);
    let plain = L2ProductOperator::new(grid.clone(), None).assemble(None).unwrap();
    let weighted = L2ProductOperator::new(grid.clone(), None)
        .with_coefficient(constant(3.0, 2))
        .unwrap()
        .assemble(None)
        .unwrap();
    assert_matrix_eq!(dense(&weighted), dense(&plain) * 3.0, comp = abs, tol = 1e-14);
}

#[test]
fn dirichlet_rows_of_stiffness_matrix_are_unit_rows() {
    let grid = unit_square(ReferenceElement::Triangle, 2);
    let info = all_dirichlet(&grid);
    let stiffness = dense(&DiffusionOperator::new(grid.clone(), Some(info.clone())).assemble(None).unwrap());
    for &d in info.dirichlet_vertices() {
        assert_scalar_eq!(stiffness.row(d).sum(), 1.0);
        assert_scalar_eq!(stiffness[(d, d)], 1.0);
    }
}

#[test]
fn clearing_without_boundary_info_is_rejected() {
    let grid = unit_square(ReferenceElement::Square, 2);
    let err = DiffusionOperator::new(grid.clone(), None)
        .with_dirichlet_treatment(DirichletTreatment::symmetric())
        .unwrap_err();
    assert_eq!(err.downcast_ref::<Error>(), Some(&Error::MissingBoundaryInfo));
    assert!(DiffusionOperator::new(grid, None)
        .with_dirichlet_treatment(DirichletTreatment::none())
        .is_ok());
}

#[test]
fn diffusion_rejects_vector_coefficient() {
    let grid = unit_square(ReferenceElement::Square, 2);
    let velocity: Arc<dyn Function<f64>> =
        Arc::new(ConstantFunction::vector(DVector::from_row_slice(&[1.0, 0.0]), 2));
    let err = DiffusionOperator::new(grid.clone(), None)
        .with_diffusion_function(velocity)
        .unwrap_err();
    assert!(matches!(err.downcast_ref::<Error>(), Some(Error::ShapeMismatch { .. })));
}

#[test]
fn element_contributions_sum_to_assembled_matrix() {
    for reference_element in PLANAR_ELEMENTS {
        let grid = unit_square(reference_element, 3);
        let info = all_dirichlet(&grid);
        let diffusion = GenericFunction::<f64>::scalar(2, |x, _| 1.0 + x[0] * x[1]);
        let operator = DiffusionOperator::new(grid.clone(), Some(info.clone()))
            .with_diffusion_function(Arc::new(diffusion))
            .unwrap()
            .with_dirichlet_treatment(DirichletTreatment::default().with_clear_diag(true))
            .unwrap();
        let contributions = operator.assemble_element_contributions(None).unwrap();
        assert_eq!(contributions.len(), grid.size(0));
        let summed = sum_element_matrices(16, 16, &contributions).unwrap();
        let assembled = operator.assemble(None).unwrap();
        assert_matrix_eq!(dense(&summed), dense(&assembled), comp = abs, tol = 1e-14);
    }
}

fn assert_contributions_match_on_free_rows(operator: &dyn MatrixOperator<f64>, mask: &[bool]) {
    let n = mask.len();
    let summed = dense(&sum_element_matrices(n, n, &operator.assemble_element_contributions(None).unwrap()).unwrap());
    let assembled = dense(&operator.assemble(None).unwrap());
    for i in (0..n).filter(|&i| !mask[i]) {
        assert_scalar_eq!((summed.row(i) - assembled.row(i)).norm(), 0.0, comp = abs, tol = 1e-14);
    }
}

#[test]
fn element_contributions_sum_to_assembled_matrix_with_cleared_columns() {
    for reference_element in PLANAR_ELEMENTS {
        let grid = unit_square(reference_element, 3);
        let info = all_dirichlet(&grid);
        let mask = info.dirichlet_mask().to_vec();
        assert_eq!(mask.iter().filter(|&&m| !m).count(), 4);

        let diffusion = DiffusionOperator::new(grid.clone(), Some(info.clone()))
            .with_dirichlet_treatment(DirichletTreatment::symmetric())
            .unwrap();
        assert_contributions_match_on_free_rows(&diffusion, &mask);

        let mass = L2ProductOperator::new(grid.clone(), Some(info.clone()))
            .with_dirichlet_treatment(DirichletTreatment::symmetric())
            .unwrap();
        assert_contributions_match_on_free_rows(&mass, &mask);
    }
}

#[test]
fn advection_of_constant_state_vanishes_on_interior_rows() {
    for reference_element in PLANAR_ELEMENTS {
        let grid = unit_square(reference_element, 3);
        let velocity: Arc<dyn Function<f64>> =
            Arc::new(ConstantFunction::vector(DVector::from_row_slice(&[0.5, 1.0]), 2));
        let operator = AdvectionOperator::new(grid.clone(), None, velocity).unwrap();
        // int v . grad phi_i vanishes for interior vertices
        let result = operator.apply(&DVector::repeat(16, 1.0), None).unwrap();
        for interior in [5, 6, 9, 10] {
            assert_scalar_eq!(result[interior], 0.0, comp = abs, tol = 1e-14);
        }
        assert!(operator.is_linear());
    }
}

#[test]
fn advection_requires_velocity_with_grid_dimension() {
    let grid = unit_square(ReferenceElement::Triangle, 2);
    let err = AdvectionOperator::new(grid.clone(), None, constant(1.0, 2)).unwrap_err();
    assert!(matches!(err.downcast_ref::<Error>(), Some(Error::ShapeMismatch { .. })));

    let three_components: Arc<dyn Function<f64>> =
        Arc::new(ConstantFunction::vector(DVector::from_row_slice(&[1.0, 1.0, 1.0]), 2));
    let err = AdvectionOperator::new(grid.clone(), None, three_components).unwrap_err();
    assert!(matches!(err.downcast_ref::<Error>(), Some(Error::ShapeMismatch { .. })));

    // A zero velocity gives the zero operator
    let zero: Arc<dyn Function<f64>> = Arc::new(ConstantFunction::vector(DVector::zeros(2), 2));
    let operator = AdvectionOperator::new(grid, None, zero).unwrap();
    assert_eq!(operator.assemble(None).unwrap().nnz(), 0);
}

#[test]
fn robin_operator_rejects_three_dimensional_grids() {
    for reference_element in PLANAR_ELEMENTS {
        let grid = spatial_unit_square(reference_element);
        let info: Arc<dyn BoundaryInfo> = Arc::new(GenericBoundaryInfo::uniform(grid.as_ref(), BoundaryType::Robin));
        for coefficient in [None, Some(constant(1.0, 3))] {
            let err = RobinBoundaryOperator::new(grid.clone(), Some(info.clone()), coefficient).unwrap_err();
            assert_eq!(
                err.downcast_ref::<Error>(),
                Some(&Error::NotImplemented("Robin boundary operator in 3 dimensions".to_string()))
            );
        }
    }
}

#[test]
fn robin_operator_without_data_is_zero() {
    let grid = unit_square(ReferenceElement::Square, 2);
    let info: Arc<dyn BoundaryInfo> = Arc::new(GenericBoundaryInfo::uniform(grid.as_ref(), BoundaryType::Robin));
    let without_coefficient = RobinBoundaryOperator::new(grid.clone(), Some(info), None).unwrap();
    assert_eq!(without_coefficient.assemble(None).unwrap().nnz(), 0);
    assert!(without_coefficient.assemble_element_contributions(None).unwrap().is_empty());

    let dirichlet_only = RobinBoundaryOperator::new(grid.clone(), Some(all_dirichlet(&grid)), Some(constant(1.0, 2)))
        .unwrap();
    assert_eq!(dirichlet_only.assemble(None).unwrap().nnz(), 0);
}

#[test]
fn robin_operator_integrates_over_robin_boundary() {
    let grid = unit_square(ReferenceElement::Triangle, 2);
    let info: Arc<dyn BoundaryInfo> = Arc::new(GenericBoundaryInfo::uniform(grid.as_ref(), BoundaryType::Robin));
    let operator = RobinBoundaryOperator::new(grid.clone(), Some(info), Some(constant(2.0, 2))).unwrap();
    let matrix = dense(&operator.assemble(None).unwrap());
    // 1^T R 1 = int_Gamma c = 2 * perimeter
    assert_scalar_eq!(matrix.sum(), 8.0, comp = abs, tol = 1e-13);
    // The interior vertex does not touch the boundary
    assert_scalar_eq!(matrix.row(4).norm(), 0.0);
    let contributions = operator.assemble_element_contributions(None).unwrap();
    assert_eq!(contributions.len(), 8);
}

#[test]
fn robin_operator_in_one_dimension() {
    let grid = unit_interval(4);
    let info: Arc<dyn BoundaryInfo> = Arc::new(GenericBoundaryInfo::uniform(grid.as_ref(), BoundaryType::Robin));
    let c: Arc<dyn Function<f64>> = Arc::new(GenericFunction::<f64>::scalar(1, |x, _| 1.0 + x[0]));
    let matrix = dense(&RobinBoundaryOperator::new(grid.clone(), Some(info), Some(c)).unwrap().assemble(None).unwrap());
    let mut expected = DMatrix::<f64>::zeros(5, 5);
    expected[(0, 0)] = 1.0;
    expected[(4, 4)] = 2.0;
    assert_matrix_eq!(matrix, expected, comp = abs, tol = 1e-15);
}

#[test]
fn robin_vector_coefficient_is_projected_on_normal() {
    let grid = unit_interval(2);
    let info: Arc<dyn BoundaryInfo> = Arc::new(GenericBoundaryInfo::uniform(grid.as_ref(), BoundaryType::Robin));
    let c: Arc<dyn Function<f64>> = Arc::new(ConstantFunction::vector(DVector::from_row_slice(&[3.0]), 1));
    let matrix = dense(&RobinBoundaryOperator::new(grid.clone(), Some(info), Some(c)).unwrap().assemble(None).unwrap());
    assert_scalar_eq!(matrix[(0, 0)], -3.0);
    assert_scalar_eq!(matrix[(2, 2)], 3.0);
}

#[test]
fn lincomb_operator_combines_matrices() {
    let grid = unit_square(ReferenceElement::Square, 2);
    let stiffness: Arc<dyn Operator<f64>> = Arc::new(DiffusionOperator::new(grid.clone(), None));
    let mass: Arc<dyn Operator<f64>> = Arc::new(L2ProductOperator::new(grid.clone(), None));
    let lincomb = LincombOperator::new(
        vec![stiffness.clone(), mass.clone()],
        vec![Coefficient::Component(0), Coefficient::Constant(2.0)],
    )
    .unwrap()
    .with_name("h1_like");
    let mu = DVector::from_row_slice(&[0.5]);
    let u = DVector::from_fn(9, |i, _| i as f64);

    let expected = dense(&stiffness.jacobian(&u, None).unwrap()) * 0.5 + dense(&mass.jacobian(&u, None).unwrap()) * 2.0;
    assert_matrix_eq!(dense(&lincomb.assemble(Some(&mu)).unwrap()), expected, comp = abs, tol = 1e-14);
    assert_matrix_eq!(lincomb.apply(&u, Some(&mu)).unwrap(), &expected * &u, comp = abs, tol = 1e-13);
    assert_eq!(lincomb.name(), "h1_like");
    assert!(lincomb.is_linear());

    let err = lincomb.assemble(None).unwrap_err();
    assert_eq!(err.downcast_ref::<Error>(), Some(&Error::MissingParameter));
}

#[test]
fn lincomb_operator_rejects_mismatched_dimensions() {
    let coarse: Arc<dyn Operator<f64>> = Arc::new(L2ProductOperator::new(unit_square(ReferenceElement::Square, 2), None));
    let fine: Arc<dyn Operator<f64>> = Arc::new(L2ProductOperator::new(unit_square(ReferenceElement::Square, 3), None));
    assert!(LincombOperator::new(vec![coarse, fine], vec![Coefficient::one(), Coefficient::one()]).is_err());
    assert!(LincombOperator::<f64>::new(vec![], vec![]).is_err());
}

#[test]
fn assembled_operator_returns_its_matrix() {
    let grid = unit_square(ReferenceElement::Square, 1);
    let matrix = L2ProductOperator::new(grid, None).assemble(None).unwrap();
    let operator = AssembledMatrixOperator::new(matrix.clone(), "mass");
    assert_eq!(operator.name(), "mass");
    assert_eq!(operator.assemble(None).unwrap(), matrix);
    assert!(operator.apply(&DVector::zeros(3), None).is_err());
    assert!(operator.assemble_element_contributions(None).is_err());
}

#[test]
fn load_functional_contributions_sum_to_vector() {
    for reference_element in PLANAR_ELEMENTS {
        let grid = unit_square(reference_element, 3);
        let f = Arc::new(GenericFunction::<f64>::scalar(2, |x, _| x[0] - 2.0 * x[1]));
        let functional = L2Functional::new(grid.clone(), f)
            .unwrap()
            .with_cleared_dirichlet_dofs(all_dirichlet(&grid));
        let vector = functional.assemble(None).unwrap();
        let contributions = functional.assemble_element_contributions(None).unwrap();
        assert_matrix_eq!(sum_element_vectors(16, &contributions), vector, comp = abs, tol = 1e-14);
        assert_scalar_eq!(vector[0], 0.0);
    }
}

#[test]
fn boundary_functional_restricted_to_type() {
    let grid = unit_square(ReferenceElement::Square, 2);
    let left: &dyn Fn(&DVector<f64>) -> bool = &|x| x[0] < 1e-10;
    let info: Arc<dyn BoundaryInfo> = Arc::new(
        GenericBoundaryInfo::from_indicators(grid.as_ref(), &[(BoundaryType::Neumann, left)]).unwrap(),
    );
    let functional = BoundaryL2Functional::new(grid.clone(), constant(1.0, 2))
        .unwrap()
        .with_boundary_type(info, BoundaryType::Neumann);
    let vector = functional.assemble(None).unwrap();
    assert_scalar_eq!(vector.sum(), 1.0, comp = abs, tol = 1e-14);
    for v in [0, 3, 6] {
        assert!(vector[v] > 0.0);
    }
    assert_eq!(functional.assemble_element_contributions(None).unwrap().len(), 2);

    let err = BoundaryL2Functional::new(grid, constant(1.0, 2))
        .unwrap()
        .with_cleared_dirichlet_dofs()
        .unwrap_err();
    assert_eq!(err.downcast_ref::<Error>(), Some(&Error::MissingBoundaryInfo));
}

#[test]
fn dirichlet_functional_holds_boundary_values() {
    let grid = unit_square(ReferenceElement::Triangle, 2);
    let g = Arc::new(GenericFunction::<f64>::scalar(2, |x, _| x[0] + 10.0 * x[1]));
    let functional = BoundaryDirichletFunctional::new(grid.clone(), g.clone(), all_dirichlet(&grid)).unwrap();
    let vector = functional.assemble(None).unwrap();
    assert_scalar_eq!(vector[4], 0.0);
    assert_scalar_eq!(vector[8], 11.0, comp = abs, tol = 1e-14);
    assert_scalar_eq!(vector[1], 0.5, comp = abs, tol = 1e-14);

    let interpolation = InterpolationOperator::new(grid.clone(), g).unwrap().assemble(None).unwrap();
    assert_scalar_eq!(interpolation[4], 5.5, comp = abs, tol = 1e-14);
}

#[test]
fn lincomb_and_block_functionals() {
    let grid = unit_square(ReferenceElement::Square, 2);
    let load: Arc<dyn VectorFunctional<f64>> = Arc::new(L2Functional::new(grid.clone(), constant(1.0, 2)).unwrap());
    let boundary: Arc<dyn VectorFunctional<f64>> =
        Arc::new(BoundaryL2Functional::new(grid.clone(), constant(1.0, 2)).unwrap());
    let lincomb = LincombFunctional::new(
        vec![load.clone(), boundary.clone()],
        vec![Coefficient::Constant(2.0), Coefficient::Constant(-1.0)],
    )
    .unwrap();
    let u = DVector::repeat(9, 1.0);
    // 2 * area - perimeter
    assert_scalar_eq!(lincomb.apply(&u, None).unwrap(), -2.0, comp = abs, tol = 1e-13);
    let contributions = lincomb.assemble_element_contributions(None).unwrap();
    assert_eq!(contributions.len(), 4 + 8);
    assert_matrix_eq!(
        sum_element_vectors(9, &contributions),
        lincomb.assemble(None).unwrap(),
        comp = abs,
        tol = 1e-14
    );

    let block = BlockFunctional::new(vec![load, boundary]).unwrap();
    assert_eq!(block.num_blocks(), 2);
    let outputs = block.apply(&u, None).unwrap();
    assert_scalar_eq!(outputs[0], 1.0, comp = abs, tol = 1e-14);
    assert_scalar_eq!(outputs[1], 4.0, comp = abs, tol = 1e-14);
    assert_eq!(block.assemble(None).unwrap().shape(), (2, 9));
}

proptest! {
    #[test]
    fn stiffness_rows_sum_to_zero(n in 1usize..5, c in 0.1..10.0, element_idx in 0usize..2) {
        let grid = unit_square(PLANAR_ELEMENTS[element_idx], n);
        let operator = DiffusionOperator::new(grid, None).with_diffusion_constant(c);
        let stiffness = dense(&operator.assemble(None).unwrap());
        for i in 0..stiffness.nrows() {
            prop_assert!(stiffness.row(i).sum().abs() <= 1e-12 * c);
        }
        prop_assert!(stiffness.diagonal().iter().all(|&d| d > 0.0));
    }
}
