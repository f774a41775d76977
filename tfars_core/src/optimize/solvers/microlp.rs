//! Solver interface for the microlp simplex / branch-and-bound solver
use ::microlp::{ComparisonOp, LinearExpr, OptimizationDirection};
use indexmap::IndexMap;

use crate::optimize::objective::ObjectiveSense;
use crate::optimize::solvers::{Solver, SolverError};
use crate::optimize::{OptimizationStatus, ProblemSolution};

/// Pure rust MILP solver, supports continuous, integer and binary variables
///
/// microlp needs objective coefficients when a variable is created, so the problem is
/// buffered and only handed to microlp in [`Solver::solve`].
#[derive(Clone, Debug, Default)]
pub struct MicrolpSolver {
    variables: IndexMap<String, BufferedVariable>,
    constraints: Vec<BufferedConstraint>,
    objective: IndexMap<String, f64>,
    sense: Option<ObjectiveSense>,
}

#[derive(Clone, Debug)]
enum BufferedVariable {
    Continuous { lower_bound: f64, upper_bound: f64 },
    Integer { lower_bound: i32, upper_bound: i32 },
    Binary,
}

#[derive(Clone, Debug)]
struct BufferedConstraint {
    terms: Vec<(String, f64)>,
    lower_bound: f64,
    upper_bound: f64,
}

impl MicrolpSolver {
    /// Create a new, empty, solver
    pub fn new() -> Self {
        Self::default()
    }

    fn insert_variable(&mut self, id: &str, var: BufferedVariable) -> Result<(), SolverError> {
        if self.variables.contains_key(id) {
            return Err(SolverError::DuplicateId(id.to_string()));
        }
        self.variables.insert(id.to_string(), var);
        Ok(())
    }

    fn insert_constraint(
        &mut self,
        variables: Vec<&str>,
        coefficients: Vec<f64>,
        lower_bound: f64,
        upper_bound: f64,
    ) -> Result<(), SolverError> {
        // microlp rejects an expression naming the same variable twice
        let mut terms: IndexMap<String, f64> = IndexMap::with_capacity(variables.len());
        for (var, coef) in variables.into_iter().zip(coefficients) {
            if !self.variables.contains_key(var) {
                return Err(SolverError::UnknownVariable(var.to_string()));
            }
            *terms.entry(var.to_string()).or_insert(0.) += coef;
        }
        self.constraints.push(BufferedConstraint {
            terms: terms.into_iter().collect(),
            lower_bound,
            upper_bound,
        });
        Ok(())
    }

    fn to_integer_bound(id: &str, bound: f64) -> Result<i32, SolverError> {
        if !bound.is_finite() || bound.abs() > i32::MAX as f64 {
            return Err(SolverError::InvalidBounds(id.to_string()));
        }
        Ok(bound.round() as i32)
    }
}

impl Solver for MicrolpSolver {
    fn integer_variable_capable(&self) -> bool {
        true
    }

    fn binary_variable_capable(&self) -> bool {
        true
    }

    fn add_continuous_variable(
        &mut self,
        id: &str,
        lower_bound: f64,
        upper_bound: f64,
    ) -> Result<(), SolverError> {
        if lower_bound > upper_bound || lower_bound.is_nan() || upper_bound.is_nan() {
            return Err(SolverError::InvalidBounds(id.to_string()));
        }
        self.insert_variable(
            id,
            BufferedVariable::Continuous {
                lower_bound,
                upper_bound,
            },
        )
    }

    fn add_binary_variable(&mut self, id: &str) -> Result<(), SolverError> {
        self.insert_variable(id, BufferedVariable::Binary)
    }

    fn add_integer_variable(
        &mut self,
        id: &str,
        lower_bound: f64,
        upper_bound: f64,
    ) -> Result<(), SolverError> {
        let lower_bound = Self::to_integer_bound(id, lower_bound)?;
        let upper_bound = Self::to_integer_bound(id, upper_bound)?;
        self.insert_variable(
            id,
            BufferedVariable::Integer {
                lower_bound,
                upper_bound,
            },
        )
    }

    fn add_equality_constraint(
        &mut self,
        _id: &str,
        variables: Vec<&str>,
        coefficients: Vec<f64>,
        equals: f64,
    ) -> Result<(), SolverError> {
        self.insert_constraint(variables, coefficients, equals, equals)
    }

    fn add_inequality_constraint(
        &mut self,
        id: &str,
        variables: Vec<&str>,
        coefficients: Vec<f64>,
        lower_bound: f64,
        upper_bound: f64,
    ) -> Result<(), SolverError> {
        if lower_bound > upper_bound {
            return Err(SolverError::InvalidBounds(id.to_string()));
        }
        self.insert_constraint(variables, coefficients, lower_bound, upper_bound)
    }

    fn add_linear_objective_term(
        &mut self,
        variable_id: &str,
        coefficient: f64,
    ) -> Result<(), SolverError> {
        if !self.variables.contains_key(variable_id) {
            return Err(SolverError::UnknownVariable(variable_id.to_string()));
        }
        *self.objective.entry(variable_id.to_string()).or_insert(0.) += coefficient;
        Ok(())
    }

    fn set_objective_sense(&mut self, objective_sense: ObjectiveSense) -> Result<(), SolverError> {
        self.sense = Some(objective_sense);
        Ok(())
    }

    fn clear_objective(&mut self) -> Result<(), SolverError> {
        self.objective.clear();
        Ok(())
    }

    fn solve(&mut self) -> Result<ProblemSolution, SolverError> {
        let direction = match self.sense.unwrap_or(ObjectiveSense::Maximize) {
            ObjectiveSense::Minimize => OptimizationDirection::Minimize,
            ObjectiveSense::Maximize => OptimizationDirection::Maximize,
        };
        let mut problem = ::microlp::Problem::new(direction);

        let mut handles = IndexMap::with_capacity(self.variables.len());
        for (id, var) in &self.variables {
            let obj_coeff = self.objective.get(id).copied().unwrap_or(0.);
            let handle = match *var {
                BufferedVariable::Continuous {
                    lower_bound,
                    upper_bound,
                } => problem.add_var(obj_coeff, (lower_bound, upper_bound)),
                BufferedVariable::Integer {
                    lower_bound,
                    upper_bound,
                } => problem.add_integer_var(obj_coeff, (lower_bound, upper_bound)),
                BufferedVariable::Binary => problem.add_binary_var(obj_coeff),
            };
            handles.insert(id.as_str(), handle);
        }

        for cons in &self.constraints {
            let mut expr = LinearExpr::empty();
            for (var, coef) in &cons.terms {
                // Presence was checked when the constraint was added
                let handle = handles
                    .get(var.as_str())
                    .ok_or_else(|| SolverError::UnknownVariable(var.clone()))?;
                expr.add(*handle, *coef);
            }
            if cons.lower_bound == cons.upper_bound {
                problem.add_constraint(expr, ComparisonOp::Eq, cons.upper_bound);
                continue;
            }
            match (cons.lower_bound.is_finite(), cons.upper_bound.is_finite()) {
                (true, true) => {
                    problem.add_constraint(expr.clone(), ComparisonOp::Ge, cons.lower_bound);
                    problem.add_constraint(expr, ComparisonOp::Le, cons.upper_bound);
                }
                (true, false) => problem.add_constraint(expr, ComparisonOp::Ge, cons.lower_bound),
                (false, true) => problem.add_constraint(expr, ComparisonOp::Le, cons.upper_bound),
                // Free row, nothing to constrain
                (false, false) => {}
            }
        }

        match problem.solve() {
            Ok(solution) => {
                let variable_values = handles
                    .iter()
                    .map(|(id, handle)| {
                        let value = match self.variables.get(*id) {
                            Some(BufferedVariable::Continuous { .. }) | None => solution[*handle],
                            Some(_) => solution[*handle].round(),
                        };
                        (id.to_string(), value)
                    })
                    .collect();
                Ok(ProblemSolution {
                    status: OptimizationStatus::Optimal,
                    objective_value: Some(solution.objective()),
                    variable_values: Some(variable_values),
                    dual_values: None,
                })
            }
            Err(::microlp::Error::Infeasible) => {
                Ok(ProblemSolution::from_status(OptimizationStatus::Infeasible))
            }
            Err(::microlp::Error::Unbounded) => {
                Ok(ProblemSolution::from_status(OptimizationStatus::Unbounded))
            }
            Err(err) => Err(SolverError::Backend(format!("{:?}", err))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimize::problem::Problem;
    use crate::optimize::variable::VariableType;

    #[test]
    fn solve_lp() {
        // max x + y s.t. x + 2y <= 4, 0 <= x <= 3, 0 <= y
        let mut problem = Problem::new_maximization();
        problem
            .add_new_variable("x", None, VariableType::Continuous, 0., 3.)
            .unwrap();
        problem
            .add_new_variable("y", None, VariableType::Continuous, 0., f64::INFINITY)
            .unwrap();
        problem
            .add_new_inequality_constraint("c", &["x", "y"], &[1., 2.], f64::NEG_INFINITY, 4.)
            .unwrap();
        problem.add_new_linear_objective_term("x", 1.).unwrap();
        problem.add_new_linear_objective_term("y", 1.).unwrap();

        let solution = problem.optimize(&MicrolpSolver::new()).unwrap();
        assert_eq!(solution.status, OptimizationStatus::Optimal);
        assert!((solution.objective_value.unwrap() - 3.5).abs() < 1e-6);
        assert!((solution.variable_value("x").unwrap() - 3.).abs() < 1e-6);
        assert!((solution.variable_value("y").unwrap() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn solve_milp() {
        // max x s.t. x <= 2.5 b, b binary, x <= 10
        let mut problem = Problem::new_maximization();
        problem
            .add_new_variable("x", None, VariableType::Continuous, 0., 10.)
            .unwrap();
        problem.add_new_binary_variable("b").unwrap();
        problem
            .add_new_inequality_constraint("c", &["x", "b"], &[1., -2.5], f64::NEG_INFINITY, 0.)
            .unwrap();
        problem.add_new_linear_objective_term("x", 1.).unwrap();
        problem.add_new_linear_objective_term("b", -1.).unwrap();

        let solution = problem.optimize(&MicrolpSolver::new()).unwrap();
        assert_eq!(solution.status, OptimizationStatus::Optimal);
        assert!((solution.variable_value("b").unwrap() - 1.).abs() < 1e-6);
        assert!((solution.objective_value.unwrap() - 1.5).abs() < 1e-6);
    }

    #[test]
    fn infeasible_status() {
        let mut problem = Problem::new_maximization();
        problem
            .add_new_variable("x", None, VariableType::Continuous, 0., 1.)
            .unwrap();
        problem
            .add_new_equality_constraint("c", &["x"], &[1.], 2.)
            .unwrap();
        let solution = problem.optimize(&MicrolpSolver::new()).unwrap();
        assert_eq!(solution.status, OptimizationStatus::Infeasible);
        assert!(solution.variable_values.is_none());
    }

    #[test]
    fn unknown_variable() {
        let mut solver = MicrolpSolver::new();
        solver.add_continuous_variable("x", 0., 1.).unwrap();
        let res = solver.add_equality_constraint("c", vec!["x", "y"], vec![1., 1.], 1.);
        assert!(matches!(res, Err(SolverError::UnknownVariable(v)) if v == "y"));
        assert!(matches!(
            solver.add_continuous_variable("x", 0., 1.),
            Err(SolverError::DuplicateId(_))
        ));
    }
}
