//! Discretization of stationary problems with continuous Galerkin elements.
//!
//! [`discretize_stationary_cg`] turns a [`StationaryProblem`] on a given grid into a
//! [`StationaryModel`]: a linear combination of assembled operators, a right-hand side, the
//! standard inner products and optional output functionals.
use crate::assembly::global::{csc_from_triplets, DirichletTreatment};
use crate::assembly::operators::{
    AdvectionOperator, AssembledMatrixOperator, BlockFunctional, BoundaryDirichletFunctional, BoundaryL2Functional,
    DiffusionOperator, L2Functional, L2ProductOperator, LincombFunctional, LincombOperator, NonlinearReactionOperator,
    Operator, RobinBoundaryOperator, VectorFunctional,
};
use crate::boundary::{BoundaryInfo, BoundaryType};
use crate::function::{split_lincomb, Coefficient, ConstantFunction, Function, Parameter, ProductFunction, Shape};
use crate::grid::Grid;
use crate::{Error, Real};
use nalgebra::DVector;
use nalgebra_sparse::CscMatrix;
use numeric_literals::replace_float_literals;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// The nonlinear reaction term `q(x) c(u)` of a problem.
#[derive(Debug, Clone)]
pub struct NonlinearReactionData<T: Real> {
    /// Scalar coefficient `q` as a function of space.
    pub coefficient: Arc<dyn Function<T>>,
    /// Scalar function `c` of the state value.
    pub function: Arc<dyn Function<T>>,
    /// The derivative `c'`.
    pub derivative: Arc<dyn Function<T>>,
}

/// Robin data `(c, g)` for the boundary condition `c u + grad(u) . n = c g`.
#[derive(Debug, Clone)]
pub struct RobinData<T: Real> {
    pub coefficient: Arc<dyn Function<T>>,
    pub value: Arc<dyn Function<T>>,
}

/// A stationary problem
///
/// ```text
/// - div(d grad u) + div(v u) + r u + q c(u) = f
/// ```
///
/// together with boundary data. Missing terms are `None`. Linear combinations of functions are
/// discretized term by term, so that parameter dependent coefficients carry over to the model.
#[derive(Debug, Clone)]
pub struct StationaryProblem<T: Real> {
    pub rhs: Option<Arc<dyn Function<T>>>,
    pub diffusion: Option<Arc<dyn Function<T>>>,
    pub advection: Option<Arc<dyn Function<T>>>,
    pub nonlinear_advection: Option<Arc<dyn Function<T>>>,
    pub reaction: Option<Arc<dyn Function<T>>>,
    pub nonlinear_reaction: Option<NonlinearReactionData<T>>,
    pub dirichlet_data: Option<Arc<dyn Function<T>>>,
    pub neumann_data: Option<Arc<dyn Function<T>>>,
    pub robin_data: Option<RobinData<T>>,
    /// Output functionals as `(kind, function)` pairs, where kind is `l2` or `l2_boundary`.
    pub outputs: Vec<(String, Arc<dyn Function<T>>)>,
    pub name: String,
}

impl<T: Real> Default for StationaryProblem<T> {
    fn default() -> Self {
        Self {
            rhs: None,
            diffusion: None,
            advection: None,
            nonlinear_advection: None,
            reaction: None,
            nonlinear_reaction: None,
            dirichlet_data: None,
            neumann_data: None,
            robin_data: None,
            outputs: Vec::new(),
            name: "stationary_problem".to_string(),
        }
    }
}

/// Options for [`discretize_stationary_cg`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(serialize = "T: Serialize", deserialize = "T: Deserialize<'de>"))]
pub struct DiscretizationOptions<T: Real> {
    /// If given, an `energy` product is assembled from the symmetric part of the operator at this
    /// parameter.
    #[serde(default)]
    pub mu_energy_product: Option<Parameter<T>>,
}

impl<T: Real> Default for DiscretizationOptions<T> {
    fn default() -> Self {
        Self {
            mu_energy_product: None,
        }
    }
}

/// The discrete model of a stationary problem.
///
/// The discrete solution `u` solves `operator(u, mu) = rhs(mu)`.
#[derive(Debug, Clone)]
pub struct StationaryModel<T: Real> {
    pub operator: LincombOperator<T>,
    pub rhs: LincombFunctional<T>,
    pub products: BTreeMap<String, Arc<dyn Operator<T>>>,
    pub output_functional: Option<BlockFunctional<T>>,
    pub name: String,
}

impl<T: Real> StationaryModel<T> {
    pub fn num_dofs(&self) -> usize {
        self.operator.dim_source()
    }

    pub fn is_linear(&self) -> bool {
        self.operator.is_linear()
    }

    /// Assembles the system matrix and right-hand side of a linear model.
    pub fn assemble_linear_system(&self, mu: Option<&Parameter<T>>) -> eyre::Result<(CscMatrix<T>, DVector<T>)> {
        Ok((self.operator.assemble(mu)?, self.rhs.assemble(mu)?))
    }

    /// The residual `operator(u, mu) - rhs(mu)`.
    pub fn residual(&self, u: &DVector<T>, mu: Option<&Parameter<T>>) -> eyre::Result<DVector<T>> {
        Ok(self.operator.apply(u, mu)? - self.rhs.assemble(mu)?)
    }

    /// Evaluates all output functionals at `u`, or returns `None` if the model has no outputs.
    pub fn output(&self, u: &DVector<T>, mu: Option<&Parameter<T>>) -> eyre::Result<Option<DVector<T>>> {
        self.output_functional
            .as_ref()
            .map(|outputs| outputs.apply(u, mu))
            .transpose()
    }
}

/// Grid and boundary info the model was discretized on.
#[derive(Debug, Clone)]
pub struct DiscretizationData<T: Real> {
    pub grid: Arc<dyn Grid<T>>,
    pub boundary_info: Arc<dyn BoundaryInfo>,
}

/// Name of the `i`-th term of a possibly split function.
fn term_name(base: &str, index: usize, is_lincomb: bool) -> String {
    if is_lincomb {
        format!("{}_{}", base, index)
    } else {
        base.to_string()
    }
}

fn is_lincomb<T: Real>(f: &Arc<dyn Function<T>>) -> bool {
    f.as_lincomb().is_some()
}

/// Rejects problem features that cannot be discretized, before any assembly takes place.
fn check_problem<T: Real>(problem: &StationaryProblem<T>, grid: &dyn Grid<T>) -> eyre::Result<()> {
    if problem.nonlinear_advection.is_some() {
        Err(Error::NotImplemented("nonlinear advection".to_string()))?;
    }
    if let Some((kind, _)) = problem
        .outputs
        .iter()
        .find(|(kind, _)| kind != "l2" && kind != "l2_boundary")
    {
        Err(Error::NotImplemented(format!("output functional of kind {}", kind)))?;
    }
    if problem.robin_data.is_some() && grid.dim() > 2 {
        Err(Error::NotImplemented(format!("Robin boundary conditions in {} dimensions", grid.dim())))?;
    }
    Ok(())
}

/// Builds the operator lincomb and, if requested, the operators of the energy product.
fn build_operator<T: Real>(
    problem: &StationaryProblem<T>,
    grid: &Arc<dyn Grid<T>>,
    boundary_info: &Arc<dyn BoundaryInfo>,
    with_energy: bool,
) -> eyre::Result<(LincombOperator<T>, Vec<Arc<dyn Operator<T>>>)> {
    let bi = Some(Arc::clone(boundary_info));
    let without_diag = DirichletTreatment::default().with_clear_diag(true);
    let symmetric_without_diag = DirichletTreatment::symmetric().with_clear_diag(true);

    // The boundary part carries the unit diagonal of Dirichlet rows, all other terms clear it
    let mut operators: Vec<Arc<dyn Operator<T>>> = vec![Arc::new(
        DiffusionOperator::new(Arc::clone(grid), bi.clone())
            .with_diffusion_constant(T::zero())
            .with_name("boundary_part"),
    )];
    let mut coefficients = vec![Coefficient::one()];
    let mut energy: Vec<Arc<dyn Operator<T>>> = Vec::new();
    if with_energy {
        energy.push(Arc::new(
            DiffusionOperator::new(Arc::clone(grid), bi.clone())
                .with_diffusion_constant(T::zero())
                .with_dirichlet_treatment(DirichletTreatment::symmetric())?
                .with_name("energy_boundary_part"),
        ));
    }

    if let Some(diffusion) = &problem.diffusion {
        for (i, (d, c)) in split_lincomb(diffusion).into_iter().enumerate() {
            let op = DiffusionOperator::new(Arc::clone(grid), bi.clone())
                .with_diffusion_function(d)?
                .with_dirichlet_treatment(without_diag)?
                .with_name(term_name("diffusion", i, is_lincomb(diffusion)));
            operators.push(Arc::new(op));
            coefficients.push(c);
        }
        if with_energy {
            energy.push(Arc::new(
                DiffusionOperator::new(Arc::clone(grid), bi.clone())
                    .with_diffusion_function(Arc::clone(diffusion))?
                    .with_dirichlet_treatment(symmetric_without_diag)?,
            ));
        }
    }

    if let Some(advection) = &problem.advection {
        for (i, (v, c)) in split_lincomb(advection).into_iter().enumerate() {
            let op = AdvectionOperator::new(Arc::clone(grid), bi.clone(), v)?
                .with_dirichlet_treatment(without_diag)?
                .with_name(term_name("advection", i, is_lincomb(advection)));
            operators.push(Arc::new(op));
            coefficients.push(c);
        }
    }

    if let Some(reaction) = &problem.reaction {
        for (i, (r, c)) in split_lincomb(reaction).into_iter().enumerate() {
            let op = L2ProductOperator::new(Arc::clone(grid), bi.clone())
                .with_coefficient(r)?
                .with_dirichlet_treatment(without_diag)?
                .with_name(term_name("reaction", i, is_lincomb(reaction)));
            operators.push(Arc::new(op));
            coefficients.push(c);
        }
        if with_energy {
            energy.push(Arc::new(
                L2ProductOperator::new(Arc::clone(grid), bi.clone())
                    .with_coefficient(Arc::clone(reaction))?
                    .with_dirichlet_treatment(symmetric_without_diag)?,
            ));
        }
    }

    if let Some(nonlinear) = &problem.nonlinear_reaction {
        let op = NonlinearReactionOperator::new(
            Arc::clone(grid),
            bi.clone(),
            Arc::clone(&nonlinear.coefficient),
            Arc::clone(&nonlinear.function),
            Arc::clone(&nonlinear.derivative),
        )?;
        operators.push(Arc::new(op));
        coefficients.push(Coefficient::one());
    }

    if let Some(robin) = &problem.robin_data {
        for (i, (c_term, c)) in split_lincomb(&robin.coefficient).into_iter().enumerate() {
            let op = RobinBoundaryOperator::new(Arc::clone(grid), bi.clone(), Some(c_term))?.with_name(term_name(
                "robin",
                i,
                is_lincomb(&robin.coefficient),
            ));
            operators.push(Arc::new(op));
            coefficients.push(c);
        }
        if with_energy {
            energy.push(Arc::new(RobinBoundaryOperator::new(
                Arc::clone(grid),
                bi.clone(),
                Some(Arc::clone(&robin.coefficient)),
            )?));
        }
    }

    let operator = LincombOperator::new(operators, coefficients)?.with_name("elliptic_operator");
    Ok((operator, energy))
}

/// Builds the right-hand side lincomb from volume, Neumann, Robin and Dirichlet data.
fn build_rhs<T: Real>(
    problem: &StationaryProblem<T>,
    grid: &Arc<dyn Grid<T>>,
    boundary_info: &Arc<dyn BoundaryInfo>,
) -> eyre::Result<LincombFunctional<T>> {
    let mut functionals: Vec<Arc<dyn VectorFunctional<T>>> = Vec::new();
    let mut coefficients = Vec::new();

    let rhs: Arc<dyn Function<T>> = match &problem.rhs {
        Some(f) => Arc::clone(f),
        None => Arc::new(ConstantFunction::scalar(T::zero(), grid.dim())),
    };
    for (i, (f, c)) in split_lincomb(&rhs).into_iter().enumerate() {
        let functional = L2Functional::new(Arc::clone(grid), f)?
            .with_cleared_dirichlet_dofs(Arc::clone(boundary_info))
            .with_name(term_name("rhs", i, is_lincomb(&rhs)));
        functionals.push(Arc::new(functional));
        coefficients.push(c);
    }

    if let Some(neumann) = problem.neumann_data.as_ref().filter(|_| boundary_info.has_neumann()) {
        for (i, (g, c)) in split_lincomb(neumann).into_iter().enumerate() {
            let functional = BoundaryL2Functional::new(Arc::clone(grid), g)?
                .with_boundary_type(Arc::clone(boundary_info), BoundaryType::Neumann)
                .with_cleared_dirichlet_dofs()?
                .with_name(term_name("neumann", i, is_lincomb(neumann)));
            functionals.push(Arc::new(functional));
            coefficients.push(c.negated());
        }
    }

    if let Some(robin) = problem.robin_data.as_ref().filter(|_| boundary_info.has_robin()) {
        for (i, (c_term, c)) in split_lincomb(&robin.coefficient).into_iter().enumerate() {
            let product = ProductFunction::new(vec![c_term, Arc::clone(&robin.value)])?;
            let functional = BoundaryL2Functional::new(Arc::clone(grid), Arc::new(product))?
                .with_boundary_type(Arc::clone(boundary_info), BoundaryType::Robin)
                .with_cleared_dirichlet_dofs()?
                .with_name(term_name("robin", i, is_lincomb(&robin.coefficient)));
            functionals.push(Arc::new(functional));
            coefficients.push(c);
        }
    }

    if let Some(dirichlet) = problem
        .dirichlet_data
        .as_ref()
        .filter(|_| boundary_info.has_dirichlet())
    {
        for (g, c) in split_lincomb(dirichlet) {
            let functional = BoundaryDirichletFunctional::new(Arc::clone(grid), g, Arc::clone(boundary_info))?;
            functionals.push(Arc::new(functional));
            coefficients.push(c);
        }
    }

    Ok(LincombFunctional::new(functionals, coefficients)?.with_name("rhs"))
}

/// Builds the `h1`, `h1_semi`, `l2`, `h1_0`, `h1_0_semi` and `l2_0` products.
///
/// The `_0` variants clear Dirichlet rows and columns and keep unit diagonal entries.
fn build_products<T: Real>(
    grid: &Arc<dyn Grid<T>>,
    boundary_info: &Arc<dyn BoundaryInfo>,
) -> eyre::Result<BTreeMap<String, Arc<dyn Operator<T>>>> {
    let bi = Some(Arc::clone(boundary_info));
    let l2: Arc<dyn Operator<T>> = Arc::new(L2ProductOperator::new(Arc::clone(grid), None).with_name("l2"));
    let l2_0: Arc<dyn Operator<T>> = Arc::new(
        L2ProductOperator::new(Arc::clone(grid), bi.clone())
            .with_dirichlet_treatment(DirichletTreatment::symmetric())?
            .with_name("l2_0"),
    );
    let h1_semi: Arc<dyn Operator<T>> = Arc::new(DiffusionOperator::new(Arc::clone(grid), None).with_name("h1_semi"));
    let h1_0_semi: Arc<dyn Operator<T>> = Arc::new(
        DiffusionOperator::new(Arc::clone(grid), bi)
            .with_dirichlet_treatment(DirichletTreatment::symmetric())?
            .with_name("h1_0_semi"),
    );
    let h1 = LincombOperator::new(vec![l2.clone(), h1_semi.clone()], vec![Coefficient::one(), Coefficient::one()])?
        .with_name("h1");
    let h1_0 = LincombOperator::new(vec![l2_0.clone(), h1_0_semi.clone()], vec![Coefficient::one(), Coefficient::one()])?
        .with_name("h1_0");

    Ok(BTreeMap::from([
        ("h1".to_string(), Arc::new(h1) as Arc<dyn Operator<T>>),
        ("h1_semi".to_string(), h1_semi),
        ("l2".to_string(), l2),
        ("h1_0".to_string(), Arc::new(h1_0) as Arc<dyn Operator<T>>),
        ("h1_0_semi".to_string(), h1_0_semi),
        ("l2_0".to_string(), l2_0),
    ]))
}

/// Returns `(A + A^T) / 2`.
#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
fn symmetric_part<T: Real>(matrix: &CscMatrix<T>) -> eyre::Result<CscMatrix<T>> {
    let mut rows = Vec::with_capacity(2 * matrix.nnz());
    let mut cols = Vec::with_capacity(2 * matrix.nnz());
    let mut values = Vec::with_capacity(2 * matrix.nnz());
    for (i, j, &v) in matrix.triplet_iter() {
        rows.extend([i, j]);
        cols.extend([j, i]);
        values.extend([0.5 * v, 0.5 * v]);
    }
    csc_from_triplets(matrix.nrows(), matrix.ncols(), rows, cols, values)
}

/// Assembles the `energy` product from its operators at the given parameter.
fn build_energy_product<T: Real>(
    problem: &StationaryProblem<T>,
    operators: Vec<Arc<dyn Operator<T>>>,
    mu: &Parameter<T>,
) -> eyre::Result<AssembledMatrixOperator<T>> {
    let coefficients = vec![Coefficient::one(); operators.len()];
    let energy = LincombOperator::new(operators, coefficients)?.with_name("energy");
    let mut matrix = energy.assemble(Some(mu))?;
    let matrix_valued_diffusion = problem
        .diffusion
        .as_ref()
        .map_or(false, |d| matches!(d.shape_range(), Shape::Matrix(_, _)));
    if matrix_valued_diffusion {
        matrix = symmetric_part(&matrix)?;
    }
    Ok(AssembledMatrixOperator::new(matrix, "energy"))
}

/// Builds the stacked output functional.
fn build_outputs<T: Real>(
    problem: &StationaryProblem<T>,
    grid: &Arc<dyn Grid<T>>,
) -> eyre::Result<Option<BlockFunctional<T>>> {
    if problem.outputs.is_empty() {
        return Ok(None);
    }
    let mut outputs: Vec<Arc<dyn VectorFunctional<T>>> = Vec::with_capacity(problem.outputs.len());
    for (kind, f) in &problem.outputs {
        let mut terms: Vec<Arc<dyn VectorFunctional<T>>> = Vec::new();
        let mut coefficients = Vec::new();
        for (term, c) in split_lincomb(f) {
            let functional: Arc<dyn VectorFunctional<T>> = match kind.as_str() {
                "l2" => Arc::new(L2Functional::new(Arc::clone(grid), term)?),
                "l2_boundary" => Arc::new(BoundaryL2Functional::new(Arc::clone(grid), term)?),
                other => return Err(Error::NotImplemented(format!("output functional of kind {}", other)).into()),
            };
            terms.push(functional);
            coefficients.push(c);
        }
        outputs.push(Arc::new(LincombFunctional::new(terms, coefficients)?.with_name(kind.clone())));
    }
    Ok(Some(BlockFunctional::new(outputs)?))
}

/// Discretizes a stationary problem with first order continuous Galerkin elements.
///
/// The grid may consist of lines, triangles or squares. Unsupported problem features are
/// rejected before any assembly work starts.
pub fn discretize_stationary_cg<T: Real>(
    problem: &StationaryProblem<T>,
    grid: Arc<dyn Grid<T>>,
    boundary_info: Arc<dyn BoundaryInfo>,
    options: &DiscretizationOptions<T>,
) -> eyre::Result<(StationaryModel<T>, DiscretizationData<T>)> {
    check_problem(problem, grid.as_ref())?;
    log::debug!(
        "Discretizing {} on {} {} elements",
        problem.name,
        grid.size(0),
        grid.reference_element()
    );

    let (operator, energy_operators) =
        build_operator(problem, &grid, &boundary_info, options.mu_energy_product.is_some())?;
    let rhs = build_rhs(problem, &grid, &boundary_info)?;
    let mut products = build_products(&grid, &boundary_info)?;
    if let Some(mu) = &options.mu_energy_product {
        let energy = build_energy_product(problem, energy_operators, mu)?;
        products.insert("energy".to_string(), Arc::new(energy));
    }
    let output_functional = build_outputs(problem, &grid)?;

    log::info!(
        "Discretized {}: {} DOFs, {} operator terms, {} rhs terms, {} products, {} outputs",
        problem.name,
        grid.size(grid.dim()),
        operator.operators().len(),
        rhs.functionals().len(),
        products.len(),
        output_functional.as_ref().map_or(0, |o| o.num_blocks())
    );

    let model = StationaryModel {
        operator,
        rhs,
        products,
        output_functional,
        name: problem.name.clone(),
    };
    let data = DiscretizationData { grid, boundary_info };
    Ok((model, data))
}
