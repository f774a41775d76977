//! Interface between optimization problems and the solvers used to optimize them
use crate::optimize::objective::ObjectiveSense;
use crate::optimize::ProblemSolution;
use thiserror::Error;

#[cfg(feature = "microlp")]
pub mod microlp;

cfg_if::cfg_if! {
    if #[cfg(feature = "microlp")] {
        /// Solver used when no other is requested
        pub type DefaultSolver = self::microlp::MicrolpSolver;
    }
}

/// Incremental interface to an LP/MILP solver
///
/// A problem is loaded by adding its variables, constraints and objective terms, then
/// [`Solver::solve`] is called once. Time limits and other solver settings belong to the
/// implementing type and are never overridden by callers.
pub trait Solver {
    /// Whether the solver accepts integer variables
    fn integer_variable_capable(&self) -> bool;

    /// Whether the solver accepts binary variables
    fn binary_variable_capable(&self) -> bool;

    /// Add a continuous variable, bounds may be infinite
    fn add_continuous_variable(
        &mut self,
        id: &str,
        lower_bound: f64,
        upper_bound: f64,
    ) -> Result<(), SolverError>;

    /// Add a binary variable
    fn add_binary_variable(&mut self, id: &str) -> Result<(), SolverError>;

    /// Add an integer variable
    fn add_integer_variable(
        &mut self,
        id: &str,
        lower_bound: f64,
        upper_bound: f64,
    ) -> Result<(), SolverError>;

    /// Add a constraint `sum(coefficients * variables) = equals`
    fn add_equality_constraint(
        &mut self,
        id: &str,
        variables: Vec<&str>,
        coefficients: Vec<f64>,
        equals: f64,
    ) -> Result<(), SolverError>;

    /// Add a constraint `lower_bound <= sum(coefficients * variables) <= upper_bound`
    fn add_inequality_constraint(
        &mut self,
        id: &str,
        variables: Vec<&str>,
        coefficients: Vec<f64>,
        lower_bound: f64,
        upper_bound: f64,
    ) -> Result<(), SolverError>;

    /// Add a linear term to the objective
    fn add_linear_objective_term(
        &mut self,
        variable_id: &str,
        coefficient: f64,
    ) -> Result<(), SolverError>;

    /// Set whether the objective is minimized or maximized
    fn set_objective_sense(&mut self, objective_sense: ObjectiveSense) -> Result<(), SolverError>;

    /// Remove every objective term
    fn clear_objective(&mut self) -> Result<(), SolverError>;

    /// Optimize the loaded problem
    ///
    /// Infeasible or unbounded problems are reported through
    /// [`ProblemSolution::status`], not as errors.
    fn solve(&mut self) -> Result<ProblemSolution, SolverError>;
}

/// Errors raised by solver interfaces
#[derive(Error, Debug, Clone)]
pub enum SolverError {
    /// A term refers to a variable the solver doesn't know about
    #[error("Variable {0} has not been added to the solver")]
    UnknownVariable(String),
    /// A variable or constraint id was added twice
    #[error("Id {0} was already added to the solver")]
    DuplicateId(String),
    /// The solver can't represent the requested bounds
    #[error("Invalid bounds for {0}")]
    InvalidBounds(String),
    /// The solver doesn't support this kind of variable or term
    #[error("Unsupported by this solver: {0}")]
    Unsupported(String),
    /// Error reported by the solver library itself
    #[error("Solver backend error: {0}")]
    Backend(String),
}
