use crate::unit_tests::{all_dirichlet, dense, spatial_unit_square, unit_square, PLANAR_ELEMENTS};
use cgfem::assembly::operators::{DiffusionOperator, MatrixOperator, VectorFunctional};
use cgfem::boundary::{BoundaryInfo, BoundaryType, GenericBoundaryInfo};
use cgfem::discretize::{
    discretize_stationary_cg, DiscretizationOptions, NonlinearReactionData, RobinData, StationaryProblem,
};
use cgfem::element::ReferenceElement;
use cgfem::function::{Coefficient, ConstantFunction, Function, GenericFunction, LincombFunction};
use cgfem::nalgebra::DVector;
use cgfem::Error;
use matrixcompare::{assert_matrix_eq, assert_scalar_eq};
use std::sync::Arc;

fn constant(value: f64, dim: usize) -> Arc<dyn Function<f64>> {
    Arc::new(ConstantFunction::scalar(value, dim))
}

fn poisson_problem() -> StationaryProblem<f64> {
    StationaryProblem {
        rhs: Some(constant(1.0, 2)),
        diffusion: Some(constant(1.0, 2)),
        name: "poisson".to_string(),
        ..Default::default()
    }
}

fn error_of<T: std::fmt::Debug>(result: eyre::Result<T>) -> Error {
    result
        .unwrap_err()
        .downcast_ref::<Error>()
        .cloned()
        .expect("error should originate in cgfem")
}

#[test]
fn unsupported_features_are_rejected_up_front() {
    let grid = unit_square(ReferenceElement::Square, 2);
    let bi = all_dirichlet(&grid);
    let options = DiscretizationOptions::default();

    let problem = StationaryProblem {
        nonlinear_advection: Some(Arc::new(ConstantFunction::vector(DVector::from_row_slice(&[1.0, 0.0]), 2))),
        ..poisson_problem()
    };
    let result = discretize_stationary_cg(&problem, grid.clone(), bi.clone(), &options).map(|(model, _)| model.name);
    assert!(matches!(error_of(result), Error::NotImplemented(_)));

    let problem = StationaryProblem {
        outputs: vec![("h1".to_string(), constant(1.0, 2))],
        ..poisson_problem()
    };
    let result = discretize_stationary_cg(&problem, grid, bi, &options).map(|(model, _)| model.name);
    assert_eq!(
        error_of(result),
        Error::NotImplemented("output functional of kind h1".to_string())
    );
}

#[test]
fn robin_data_is_rejected_on_three_dimensional_grids() {
    let grid = spatial_unit_square(ReferenceElement::Square);
    let bi: Arc<dyn BoundaryInfo> = Arc::new(GenericBoundaryInfo::uniform(grid.as_ref(), BoundaryType::Robin));
    let problem = StationaryProblem {
        rhs: Some(constant(1.0, 3)),
        diffusion: Some(constant(1.0, 3)),
        robin_data: Some(RobinData {
            coefficient: constant(1.0, 3),
            value: constant(0.0, 3),
        }),
        ..Default::default()
    };
    let result =
        discretize_stationary_cg(&problem, grid, bi, &DiscretizationOptions::default()).map(|(model, _)| model.name);
    assert_eq!(
        error_of(result),
        Error::NotImplemented("Robin boundary conditions in 3 dimensions".to_string())
    );
}

#[test]
fn model_contains_standard_products() {
    let grid = unit_square(ReferenceElement::Triangle, 2);
    let bi = all_dirichlet(&grid);
    let (model, data) =
        discretize_stationary_cg(&poisson_problem(), grid.clone(), bi, &DiscretizationOptions::default()).unwrap();

    let keys: Vec<_> = model.products.keys().cloned().collect();
    assert_eq!(keys, vec!["h1", "h1_0", "h1_0_semi", "h1_semi", "l2", "l2_0"]);
    assert_eq!(model.name, "poisson");
    assert_eq!(model.num_dofs(), 9);
    assert!(model.is_linear());
    assert!(model.output_functional.is_none());
    assert!(Arc::ptr_eq(&data.grid, &grid));

    let names: Vec<_> = model.operator.operators().iter().map(|op| op.name().to_string()).collect();
    assert_eq!(names, vec!["boundary_part", "diffusion"]);
}

#[test]
fn dirichlet_products_keep_unit_diagonals() {
    let grid = unit_square(ReferenceElement::Square, 2);
    let (model, _) =
        discretize_stationary_cg(&poisson_problem(), grid.clone(), all_dirichlet(&grid), &DiscretizationOptions::default())
            .unwrap();
    let u = DVector::zeros(9);
    let h1_0 = dense(&model.products["h1_0"].jacobian(&u, None).unwrap());
    let l2_0 = dense(&model.products["l2_0"].jacobian(&u, None).unwrap());

    // One unit diagonal from each of the two summands
    assert_eq!(h1_0[(0, 0)], 2.0);
    assert_eq!(l2_0[(0, 0)], 1.0);
    assert_eq!(h1_0[(0, 1)], 0.0);
    assert_eq!(h1_0[(1, 4)], 0.0);
    assert_eq!(h1_0[(4, 1)], 0.0);
    // Four elements of width 1/2 around the center vertex
    assert_scalar_eq!(h1_0[(4, 4)], 8.0 / 3.0 + 1.0 / 9.0, comp = abs, tol = 1e-14);
    assert_matrix_eq!(h1_0, h1_0.transpose(), comp = abs, tol = 1e-15);
}

#[test]
fn energy_product_is_assembled_on_request() {
    for reference_element in PLANAR_ELEMENTS {
        let grid = unit_square(reference_element, 3);
        let options = DiscretizationOptions {
            mu_energy_product: Some(DVector::from_row_slice(&[1.0])),
        };
        let (model, _) = discretize_stationary_cg(&poisson_problem(), grid.clone(), all_dirichlet(&grid), &options)
            .unwrap();
        assert_eq!(model.products.len(), 7);

        let u = DVector::zeros(16);
        let energy = dense(&model.products["energy"].jacobian(&u, None).unwrap());
        let h1_0_semi = dense(&model.products["h1_0_semi"].jacobian(&u, None).unwrap());
        assert_matrix_eq!(energy, h1_0_semi, comp = abs, tol = 1e-14);
    }
}

#[test]
fn parametric_diffusion_is_split_into_terms() {
    let grid = unit_square(ReferenceElement::Square, 3);
    let bi = all_dirichlet(&grid);
    let diffusion = LincombFunction::new(
        vec![constant(1.0, 2), constant(1.0, 2)],
        vec![Coefficient::expression(|mu| mu[0]), Coefficient::one()],
    )
    .unwrap();
    let problem = StationaryProblem {
        diffusion: Some(Arc::new(diffusion)),
        ..poisson_problem()
    };
    let (model, _) = discretize_stationary_cg(&problem, grid.clone(), bi.clone(), &DiscretizationOptions::default())
        .unwrap();

    let names: Vec<_> = model.operator.operators().iter().map(|op| op.name().to_string()).collect();
    assert_eq!(names, vec!["boundary_part", "diffusion_0", "diffusion_1"]);

    let mu = DVector::from_row_slice(&[2.0]);
    let (matrix, _) = model.assemble_linear_system(Some(&mu)).unwrap();
    let expected = DiffusionOperator::new(grid, Some(bi))
        .with_diffusion_constant(3.0)
        .assemble(None)
        .unwrap();
    assert_matrix_eq!(dense(&matrix), dense(&expected), comp = abs, tol = 1e-14);

    let result = model.assemble_linear_system(None);
    assert_eq!(error_of(result), Error::MissingParameter);
}

#[test]
fn neumann_data_enters_rhs_with_negative_sign() {
    let grid = unit_square(ReferenceElement::Square, 2);
    let left: &dyn Fn(&DVector<f64>) -> bool = &|x| x[0] < 1e-10;
    let rest: &dyn Fn(&DVector<f64>) -> bool = &|x| x[0] > 1e-10;
    let bi: Arc<dyn BoundaryInfo> = Arc::new(
        GenericBoundaryInfo::from_indicators(
            grid.as_ref(),
            &[(BoundaryType::Dirichlet, left), (BoundaryType::Neumann, rest)],
        )
        .unwrap(),
    );
    let problem = StationaryProblem {
        rhs: None,
        neumann_data: Some(constant(1.0, 2)),
        dirichlet_data: Some(constant(0.0, 2)),
        ..poisson_problem()
    };
    let (model, _) = discretize_stationary_cg(&problem, grid, bi, &DiscretizationOptions::default()).unwrap();

    let names: Vec<_> = model.rhs.functionals().iter().map(|f| f.name().to_string()).collect();
    assert_eq!(names, vec!["rhs", "neumann", "dirichlet_functional"]);
    assert_eq!(model.rhs.coefficients()[1].evaluate(None).unwrap(), -1.0);

    let rhs = model.rhs.assemble(None).unwrap();
    // Neumann boundary of length 3 minus the halves of the two facets touching the left side
    assert_scalar_eq!(rhs.sum(), -2.5, comp = abs, tol = 1e-14);
    for v in [0, 3, 6] {
        assert_eq!(rhs[v], 0.0);
    }
}

#[test]
fn outputs_are_stacked_in_order() {
    let grid = unit_square(ReferenceElement::Triangle, 2);
    let problem = StationaryProblem {
        outputs: vec![
            ("l2".to_string(), constant(1.0, 2)),
            ("l2_boundary".to_string(), constant(1.0, 2)),
        ],
        ..poisson_problem()
    };
    let (model, _) =
        discretize_stationary_cg(&problem, grid.clone(), all_dirichlet(&grid), &DiscretizationOptions::default())
            .unwrap();
    let outputs = model.output(&DVector::repeat(9, 1.0), None).unwrap().unwrap();
    assert_matrix_eq!(outputs, DVector::from_row_slice(&[1.0, 4.0]), comp = abs, tol = 1e-14);
}

#[test]
fn nonlinear_reaction_makes_model_nonlinear() {
    let grid = unit_square(ReferenceElement::Square, 2);
    let cube: Arc<dyn Function<f64>> = Arc::new(GenericFunction::<f64>::scalar(1, |u, _| u[0] * u[0] * u[0]));
    let derivative: Arc<dyn Function<f64>> = Arc::new(GenericFunction::<f64>::scalar(1, |u, _| 3.0 * u[0] * u[0]));
    let problem = StationaryProblem {
        nonlinear_reaction: Some(NonlinearReactionData {
            coefficient: constant(1.0, 2),
            function: cube,
            derivative,
        }),
        ..poisson_problem()
    };
    let (model, _) =
        discretize_stationary_cg(&problem, grid.clone(), all_dirichlet(&grid), &DiscretizationOptions::default())
            .unwrap();
    assert!(!model.is_linear());
    assert_eq!(model.operator.operators().last().unwrap().name(), "nonlinear_reaction");

    // At u = 0 the residual is the negated load on interior DOFs
    let residual = model.residual(&DVector::zeros(9), None).unwrap();
    assert_scalar_eq!(residual[4], -0.25, comp = abs, tol = 1e-15);
    assert_eq!(residual[0], 0.0);
}

#[test]
fn options_deserialize_with_defaults() {
    let options: DiscretizationOptions<f64> = serde_json::from_str("{}").unwrap();
    assert_eq!(options, DiscretizationOptions::default());

    let options = DiscretizationOptions {
        mu_energy_product: Some(DVector::from_row_slice(&[0.5, 2.0])),
    };
    let json = serde_json::to_string(&options).unwrap();
    let restored: DiscretizationOptions<f64> = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, options);
}
