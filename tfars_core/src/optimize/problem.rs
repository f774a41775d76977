//! Provides struct representing an optimization problem
use crate::optimize::constraint::Constraint;
use crate::optimize::objective::{Objective, ObjectiveSense, ObjectiveTerm};
use crate::optimize::solvers::{Solver, SolverError};
use crate::optimize::variable::{Variable, VariableBuilder, VariableType};
use crate::optimize::ProblemSolution;
use indexmap::IndexMap;
use thiserror::Error;

/// An optimization problem
#[derive(Debug, Clone)]
pub struct Problem {
    /// Objective to optimize
    objective: Objective,
    /// Variables of the optimization problem
    variables: IndexMap<String, Variable>,
    /// Constraints of the optimization problem
    constraints: IndexMap<String, Constraint>,
    /// Type of problem
    problem_type: ProblemType,
}

impl Problem {
    // region Creation Functions
    /// Create a new optimization problem
    pub fn new(objective_sense: ObjectiveSense) -> Self {
        Self {
            objective: Objective::new(objective_sense),
            variables: IndexMap::new(),
            constraints: IndexMap::new(),
            problem_type: ProblemType::LinearContinuous,
        }
    }

    /// Create a new maximization problem
    pub fn new_maximization() -> Self {
        Self::new(ObjectiveSense::Maximize)
    }

    /// Create a new minimization problem
    pub fn new_minimization() -> Self {
        Self::new(ObjectiveSense::Minimize)
    }

    // endregion Creation Functions

    // region Accessors
    /// The objective of the problem
    pub fn objective(&self) -> &Objective {
        &self.objective
    }

    /// All variables of the problem, in insertion order
    pub fn variables(&self) -> &IndexMap<String, Variable> {
        &self.variables
    }

    /// All constraints of the problem, in insertion order
    pub fn constraints(&self) -> &IndexMap<String, Constraint> {
        &self.constraints
    }

    /// Get a variable by id
    pub fn get_variable(&self, id: &str) -> Option<&Variable> {
        self.variables.get(id)
    }

    /// Get a constraint by id
    pub fn get_constraint(&self, id: &str) -> Option<&Constraint> {
        self.constraints.get(id)
    }

    /// Type of the problem
    pub fn problem_type(&self) -> ProblemType {
        self.problem_type
    }
    // endregion Accessors

    // region Update Objective Sense
    /// Update the objective sense of the problem
    pub fn update_objective_sense(&mut self, sense: ObjectiveSense) {
        self.objective.set_sense(sense);
    }
    // endregion Update Objective Sense

    // region Adding Variables
    /// Add a variable to the optimization problem
    pub fn add_variable(&mut self, mut variable: Variable) -> Result<(), ProblemError> {
        // Validate that the variable can in fact be added to the problem
        self.validate_variable(&variable)?;
        // The index of the variable reflects the current variable count
        variable.index = self.variables.len();
        // Update the type of the model if needed
        match variable.variable_type {
            VariableType::Continuous => {}
            VariableType::Integer | VariableType::Binary => {
                if self.problem_type == ProblemType::LinearContinuous {
                    self.problem_type = ProblemType::LinearMixedInteger;
                }
            }
        }
        self.variables.insert(variable.id.clone(), variable);
        Ok(())
    }

    /// Create a new variable and add it to the optimization problem
    pub fn add_new_variable(
        &mut self,
        id: &str,
        name: Option<&str>,
        variable_type: VariableType,
        lower_bound: f64,
        upper_bound: f64,
    ) -> Result<(), ProblemError> {
        let new_var = VariableBuilder::default()
            .id(id)
            .name(name.map(|n| n.to_string()))
            .variable_type(variable_type)
            .lower_bound(lower_bound)
            .upper_bound(upper_bound)
            .build()
            .map_err(|e| ProblemError::InvalidVariable(e.to_string()))?;
        self.add_variable(new_var)
    }

    /// Create a new binary variable and add it to the optimization problem
    pub fn add_new_binary_variable(&mut self, id: &str) -> Result<(), ProblemError> {
        self.add_new_variable(id, None, VariableType::Binary, 0., 1.)
    }
    // endregion Adding Variables

    // region Adding Constraints
    /// Add a constraint to the problem
    pub fn add_constraint(&mut self, constraint: Constraint) -> Result<(), ProblemError> {
        self.validate_constraint(&constraint)?;
        self.constraints.insert(constraint.get_id(), constraint);
        Ok(())
    }

    /// Create a new equality constraint and add it to the model
    pub fn add_new_equality_constraint(
        &mut self,
        id: &str,
        variables: &[&str],
        coefficients: &[f64],
        equals: f64,
    ) -> Result<(), ProblemError> {
        self.add_constraint(Constraint::new_equality(
            id,
            variables,
            coefficients,
            equals,
        ))
    }

    /// Create a new inequality constraint and add it to the model
    pub fn add_new_inequality_constraint(
        &mut self,
        id: &str,
        variables: &[&str],
        coefficients: &[f64],
        lower_bound: f64,
        upper_bound: f64,
    ) -> Result<(), ProblemError> {
        self.add_constraint(Constraint::new_inequality(
            id,
            variables,
            coefficients,
            lower_bound,
            upper_bound,
        ))
    }

    /// Add a term to an existing constraint
    pub fn add_term_to_constraint(
        &mut self,
        constraint_id: &str,
        variable_id: &str,
        coefficient: f64,
    ) -> Result<(), ProblemError> {
        if !self.variables.contains_key(variable_id) {
            return Err(ProblemError::NonExistentVariablesInConstraint);
        }
        match self.constraints.get_mut(constraint_id) {
            Some(cons) => {
                cons.add_term(variable_id, coefficient);
                Ok(())
            }
            None => Err(ProblemError::NonExistentConstraint),
        }
    }
    // endregion Adding Constraints

    // region Adding Objective Terms
    /// Add a new term to the objective
    pub fn add_objective_term(&mut self, objective_term: ObjectiveTerm) -> Result<(), ProblemError> {
        if !self.variables.contains_key(&objective_term.variable) {
            return Err(ProblemError::NonExistentVariablesInObjective);
        }
        self.objective.add_term(objective_term);
        Ok(())
    }

    /// Add a new linear term to the objective using the variable id
    pub fn add_new_linear_objective_term(
        &mut self,
        variable_id: &str,
        coefficient: f64,
    ) -> Result<(), ProblemError> {
        self.add_objective_term(ObjectiveTerm::new(variable_id, coefficient))
    }
    // endregion Adding Objective Terms

    // region Update Bounds
    /// Update the bounds of a variable
    pub fn update_variable_bounds(
        &mut self,
        id: &str,
        lower_bound: f64,
        upper_bound: f64,
    ) -> Result<(), ProblemError> {
        if lower_bound > upper_bound {
            return Err(ProblemError::InvalidVariableBounds);
        }
        match self.variables.get_mut(id) {
            Some(var) => {
                var.lower_bound = lower_bound;
                var.upper_bound = upper_bound;
            }
            None => return Err(ProblemError::NonExistentVariable),
        };
        Ok(())
    }

    /// Update the bounds of a constraint
    pub fn update_constraint_bounds(
        &mut self,
        id: &str,
        lower_bound: f64,
        upper_bound: f64,
    ) -> Result<(), ProblemError> {
        if lower_bound > upper_bound {
            return Err(ProblemError::InvalidConstraintBounds);
        }
        match self.constraints.get_mut(id) {
            Some(cons) => cons.set_bounds(lower_bound, upper_bound),
            None => return Err(ProblemError::NonExistentConstraint),
        };
        Ok(())
    }
    // endregion Update Bounds

    // region Remove Objective Terms
    /// Remove all terms from the objective
    pub fn remove_all_objective_terms(&mut self) {
        self.objective.remove_all_terms();
    }
    // endregion Remove Objective Terms

    // region Solve
    /// Solve the problem with a copy of the given solver
    ///
    /// The solver passed in acts as a template (holding e.g. time limits), every call
    /// loads the problem into a fresh clone of it.
    pub fn optimize<S: Solver + Clone>(&self, solver: &S) -> Result<ProblemSolution, ProblemError> {
        let mut solver = solver.clone();
        if self.has_integer_variables()
            && !(solver.integer_variable_capable() && solver.binary_variable_capable())
        {
            return Err(ProblemError::UnsupportedProblemType(self.problem_type));
        }
        for (id, var) in &self.variables {
            match var.variable_type {
                VariableType::Continuous => {
                    solver.add_continuous_variable(id, var.lower_bound, var.upper_bound)?
                }
                VariableType::Integer => {
                    solver.add_integer_variable(id, var.lower_bound, var.upper_bound)?
                }
                VariableType::Binary => solver.add_binary_variable(id)?,
            }
        }
        for (id, cons) in &self.constraints {
            let variables = cons.get_variables();
            let coefficients = cons.terms().iter().map(|t| t.coefficient).collect();
            match cons {
                Constraint::Equality { equals, .. } => {
                    solver.add_equality_constraint(id, variables, coefficients, *equals)?
                }
                Constraint::Inequality {
                    lower_bound,
                    upper_bound,
                    ..
                } => solver.add_inequality_constraint(
                    id,
                    variables,
                    coefficients,
                    *lower_bound,
                    *upper_bound,
                )?,
            }
        }
        for term in self.objective.terms() {
            solver.add_linear_objective_term(&term.variable, term.coefficient)?;
        }
        solver.set_objective_sense(self.objective.sense())?;
        Ok(solver.solve()?)
    }
    // endregion Solve

    // region Validation Functions
    /// Check that a variable to be added is valid to add to this problem
    fn validate_variable(&self, variable: &Variable) -> Result<(), ProblemError> {
        if self.variables.contains_key(&variable.id) {
            return Err(ProblemError::VariableIdAlreadyExists);
        };
        if variable.lower_bound > variable.upper_bound {
            return Err(ProblemError::InvalidVariableBounds);
        }
        Ok(())
    }

    /// Check that a constraint to be added is valid to add to this Problem
    fn validate_constraint(&self, constraint: &Constraint) -> Result<(), ProblemError> {
        if self.constraints.contains_key(&constraint.get_id()) {
            return Err(ProblemError::ConstraintAlreadyExists);
        }
        let (lower_bound, upper_bound) = constraint.bounds();
        if lower_bound > upper_bound {
            return Err(ProblemError::InvalidConstraintBounds);
        }
        if constraint
            .get_variables()
            .iter()
            .any(|var| !self.variables.contains_key(*var))
        {
            return Err(ProblemError::NonExistentVariablesInConstraint);
        }
        Ok(())
    }
    // endregion Validation Functions

    // region Check Problem
    /// Whether any integer or binary variables are present
    pub fn has_integer_variables(&self) -> bool {
        self.variables.values().any(|var| {
            var.variable_type == VariableType::Integer || var.variable_type == VariableType::Binary
        })
    }
    // endregion Check Problem
}

/// Types of optimization problems
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ProblemType {
    /// Problem with linear objectives and constraints, and continuous variables
    LinearContinuous,
    /// Problem with linear objective and constraints, with integer and continuous variables
    LinearMixedInteger,
}

/// Errors associated with the Problem
#[derive(Error, Debug, Clone)]
pub enum ProblemError {
    /// Error when trying to add a variable with the same id as an existing variable
    #[error("Tried to add a variable with the same id as an existing variable")]
    VariableIdAlreadyExists,
    /// Error when trying to add variable with invalid bounds
    #[error("Tried to add a variable with lower_bound>upper_bound")]
    InvalidVariableBounds,
    /// Error when a variable can't be built
    #[error("Unable to build variable: {0}")]
    InvalidVariable(String),
    /// Error when trying to add a constraint with the same id as an existing constraint
    #[error("Tried to add a constraint with the same id as an existing constraint")]
    ConstraintAlreadyExists,
    /// Error when trying to add a constraint with invalid bounds
    #[error("Tried to add an inequality constraint with lower_bound > upper_bound")]
    InvalidConstraintBounds,
    /// Error when trying to add a constraint that contains variables not in the model
    #[error("Tried to add a constraint with variables not in the model")]
    NonExistentVariablesInConstraint,
    /// Error when trying to add an objective term which includes variables not in the model
    #[error("Tried adding an objective term with variables not in the model")]
    NonExistentVariablesInObjective,
    /// Error when trying to perform an update or drop on a variable that doesn't exist
    #[error("Tried to access a variable that doesn't exist")]
    NonExistentVariable,
    /// Error when trying to update a constraint that doesn't exist
    #[error("Tried to access a constraint that doesn't exist")]
    NonExistentConstraint,
    /// Error when the solver can't handle the problem type
    #[error("Solver does not support problems of type {0:?}")]
    UnsupportedProblemType(ProblemType),
    /// Error raised by the solver
    #[error("Solver error")]
    Solver(#[from] SolverError),
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn new_problem() {
        let max_problem = Problem::new_maximization();
        assert_eq!(max_problem.objective.sense, ObjectiveSense::Maximize);

        let min_problem = Problem::new_minimization();
        assert_eq!(min_problem.objective.sense, ObjectiveSense::Minimize);
    }

    #[test]
    fn update_objective_sense() {
        let mut problem = Problem::new(ObjectiveSense::Maximize);
        problem.update_objective_sense(ObjectiveSense::Minimize);
        assert_eq!(problem.objective.sense, ObjectiveSense::Minimize);
        problem.update_objective_sense(ObjectiveSense::Maximize);
        assert_eq!(problem.objective.sense, ObjectiveSense::Maximize);
    }

    #[test]
    fn add_variables() {
        let mut problem = Problem::new(ObjectiveSense::Maximize);

        // Add a single variable
        problem
            .add_new_variable("x", None, VariableType::Continuous, 64., 100.)
            .unwrap();
        let var = problem.variables.get("x").expect("Variable not added to model");
        assert_eq!(var.variable_type, VariableType::Continuous);
        assert_eq!(var.index, 0);
        assert!((var.lower_bound - 64.0).abs() < 1e-25);
        assert!((var.upper_bound - 100.0).abs() < 1e-25);
        assert_eq!(problem.problem_type, ProblemType::LinearContinuous);

        // Add another variable, this time a binary variable
        problem.add_new_binary_variable("y").unwrap();
        let var = problem.variables.get("y").expect("Variable not added to model");
        assert_eq!(var.variable_type, VariableType::Binary);
        assert_eq!(var.index, 1);
        // Check that the problem has updated its type
        assert_eq!(problem.problem_type, ProblemType::LinearMixedInteger);
    }

    #[test]
    fn add_bad_variable() {
        let mut problem = Problem::new(ObjectiveSense::Maximize);
        let res = problem.add_new_variable("x", None, VariableType::Continuous, 100., 64.);
        assert!(matches!(res, Err(ProblemError::InvalidVariableBounds)));
        problem
            .add_new_variable("x", None, VariableType::Continuous, 0., 64.)
            .unwrap();
        let res = problem.add_new_variable("x", None, VariableType::Continuous, 0., 64.);
        assert!(matches!(res, Err(ProblemError::VariableIdAlreadyExists)));
    }

    #[test]
    fn add_constraint() {
        let mut problem = Problem::new(ObjectiveSense::Maximize);
        problem
            .add_new_variable("x", None, VariableType::Continuous, 64., 100.)
            .unwrap();
        problem
            .add_new_variable("y", None, VariableType::Continuous, 64., 100.)
            .unwrap();

        problem
            .add_new_equality_constraint("test_equality", &["x", "y"], &[2., 3.], 200.)
            .unwrap();
        match problem.constraints.get("test_equality").unwrap() {
            Constraint::Equality { equals, .. } => assert!((equals - 200.).abs() < 1e-25),
            Constraint::Inequality { .. } => panic!("Incorrect constraint type added"),
        }

        problem
            .add_new_inequality_constraint("test_inequality", &["x", "y"], &[2., 3.], 100., 200.)
            .unwrap();
        match problem.constraints.get("test_inequality").unwrap() {
            Constraint::Inequality {
                lower_bound,
                upper_bound,
                ..
            } => {
                assert!((lower_bound - 100.).abs() < 1e-25);
                assert!((upper_bound - 200.).abs() < 1e-25);
            }
            Constraint::Equality { .. } => panic!("Incorrect constraint type added"),
        }
    }

    #[test]
    fn add_bad_constraint() {
        let mut problem = Problem::new(ObjectiveSense::Maximize);
        problem
            .add_new_variable("x", None, VariableType::Continuous, 64., 100.)
            .unwrap();
        problem
            .add_new_variable("y", None, VariableType::Continuous, 64., 100.)
            .unwrap();

        let res =
            problem.add_new_inequality_constraint("bad_constraint", &["x", "y"], &[2., 3.], 200., 100.);
        assert!(matches!(res, Err(ProblemError::InvalidConstraintBounds)));

        let res = problem.add_new_equality_constraint("missing_var", &["x", "z"], &[2., 3.], 1.);
        assert!(matches!(
            res,
            Err(ProblemError::NonExistentVariablesInConstraint)
        ));
    }

    #[test]
    fn update_bounds() {
        let mut problem = Problem::new_maximization();
        problem
            .add_new_variable("x", None, VariableType::Continuous, 0., 1.)
            .unwrap();
        problem
            .add_new_equality_constraint("c", &["x"], &[1.], 0.5)
            .unwrap();
        problem.update_variable_bounds("x", -1., 2.).unwrap();
        assert_eq!(problem.get_variable("x").unwrap().lower_bound, -1.);
        problem.update_constraint_bounds("c", 0., 1.).unwrap();
        assert_eq!(problem.get_constraint("c").unwrap().bounds(), (0., 1.));
        assert!(matches!(
            problem.update_constraint_bounds("c", 2., 1.),
            Err(ProblemError::InvalidConstraintBounds)
        ));
    }
}
