//! Search for a minimal set of thermodynamic constraints to loosen in an infeasible problem
use crate::configuration::{RelaxationObjective, RelaxationTarget, ThermoConfiguration, CONFIGURATION};
use crate::optimize::objective::ObjectiveSense;
use crate::optimize::problem::{Problem, ProblemError};
use crate::optimize::solvers::Solver;
use crate::optimize::variable::VariableType;
use crate::optimize::{OptimizationStatus, ProblemSolution};
use crate::tfa::convert::{RelaxableConstraint, ThermoConstraintKind, ThermoProblem};
use crate::thermo::ThermoError;

/// Slack loosening the upper bound of a constraint
pub const SLACK_UP: &str = "SlackUp_";
/// Slack loosening the lower bound of a constraint
pub const SLACK_DOWN: &str = "SlackDown_";
/// Binary, the constraint is loosened
pub const RELAX: &str = "Relax_";
/// `SlackUp - M * Relax <= 0`
pub const RELAX_UP: &str = "RelaxUp_";
/// `SlackDown - M * Relax <= 0`
pub const RELAX_DOWN: &str = "RelaxDown_";
/// `lb <= LC - SlackUp + SlackDown <= ub`, stands in for the bounds of a log concentration
pub const LOG_CONCENTRATION_BOUND: &str = "LCBound_";

/// A constraint loosened by the relaxation
#[derive(Debug, Clone, PartialEq)]
pub struct RelaxedConstraint {
    pub id: String,
    pub kind: ThermoConstraintKind,
    pub reaction: String,
    /// Bounds before the relaxation
    pub previous_bounds: (f64, f64),
    /// Amount the lower bound was lowered by
    pub lower_change: f64,
    /// Amount the upper bound was raised by
    pub upper_change: f64,
    /// Bounds in the relaxed problem
    pub new_bounds: (f64, f64),
}

/// A log concentration variable whose bounds were widened by the relaxation
#[derive(Debug, Clone, PartialEq)]
pub struct RelaxedConcentration {
    pub metabolite: String,
    pub variable: String,
    pub previous_bounds: (f64, f64),
    pub lower_change: f64,
    pub upper_change: f64,
    pub new_bounds: (f64, f64),
}

impl RelaxedConcentration {
    /// Concentration range (M) allowed by the new bounds
    pub fn concentration_range(&self) -> (f64, f64) {
        (self.new_bounds.0.exp(), self.new_bounds.1.exp())
    }
}

/// Result of a consistency relaxation
#[derive(Debug, Clone)]
pub enum RelaxationOutcome {
    /// The problem is feasible as it is
    Feasible { solution: ProblemSolution },
    /// Loosening the listed constraints makes the problem feasible
    RelaxedFeasible {
        relaxed: Vec<RelaxedConstraint>,
        /// Log concentrations whose bounds were widened
        concentrations: Vec<RelaxedConcentration>,
        /// Objective value of the relaxation problem
        objective_value: f64,
        /// Problem with the loosened bounds
        problem: ThermoProblem,
    },
    /// Not even loosening every allowed constraint restores feasibility, the flux
    /// balance part of the problem is infeasible
    Infeasible,
}

impl RelaxationOutcome {
    pub fn is_feasible(&self) -> bool {
        !matches!(self, RelaxationOutcome::Infeasible)
    }

    /// Constraints loosened by the relaxation, empty unless relaxed
    pub fn relaxed(&self) -> &[RelaxedConstraint] {
        match self {
            RelaxationOutcome::RelaxedFeasible { relaxed, .. } => relaxed,
            _ => &[],
        }
    }

    /// Log concentrations widened by the relaxation, empty unless relaxed
    pub fn relaxed_concentrations(&self) -> &[RelaxedConcentration] {
        match self {
            RelaxationOutcome::RelaxedFeasible { concentrations, .. } => concentrations,
            _ => &[],
        }
    }
}

/// Free log concentration the relaxation may widen
#[derive(Debug, Clone, Copy)]
struct ConcentrationCandidate<'t> {
    metabolite: &'t str,
    variable: &'t str,
}

impl ConcentrationCandidate<'_> {
    fn bound_id(&self) -> String {
        format!("{}{}", LOG_CONCENTRATION_BOUND, self.variable)
    }
}

/// Finds the constraints to loosen so an infeasible thermodynamic problem becomes feasible
///
/// Every candidate constraint gets a bounded slack on each finite side, tied to a binary
/// indicator. The relaxation problem minimizes the number of indicators (or the summed
/// slack), so the reported set is minimal under that objective. Among equally small sets
/// the choice is left to the solver.
///
/// Slacks are capped at `relaxation_big_m`. A constraint that needs more than that can't
/// be loosened, and the relaxation then reports [`RelaxationOutcome::Infeasible`].
#[derive(Debug, Clone, Copy)]
pub struct ConsistencyRelaxer<'a> {
    config: &'a ThermoConfiguration,
}

impl<'a> ConsistencyRelaxer<'a> {
    pub fn new(config: &'a ThermoConfiguration) -> Self {
        ConsistencyRelaxer { config }
    }

    /// Families of constraints the relaxation may loosen
    pub fn target_kinds(&self) -> &'static [ThermoConstraintKind] {
        match self.config.relaxation_target {
            RelaxationTarget::EnergyBalance => &[ThermoConstraintKind::EnergyBalance],
            RelaxationTarget::Directionality => &[ThermoConstraintKind::Directionality],
            RelaxationTarget::LogConcentration => &[],
            RelaxationTarget::All => &[
                ThermoConstraintKind::EnergyBalance,
                ThermoConstraintKind::Directionality,
            ],
        }
    }

    /// Whether the bounds of log concentration variables may be widened
    pub fn relaxes_concentrations(&self) -> bool {
        matches!(
            self.config.relaxation_target,
            RelaxationTarget::LogConcentration | RelaxationTarget::All
        )
    }

    /// Solve the problem, relaxing it when it is infeasible
    ///
    /// # Errors
    /// [`ThermoError::RelaxationInconclusive`] when a solve ends with a status that is
    /// neither optimal nor a definite infeasibility, e.g. because of a solver time limit.
    /// A solver that fails outright is reported the same way, with
    /// [`OptimizationStatus::NumericalError`].
    pub fn relax<S: Solver + Clone>(
        &self,
        thermo_problem: &ThermoProblem,
        solver: &S,
    ) -> Result<RelaxationOutcome, ThermoError> {
        let solution = solve(&thermo_problem.problem, solver)?;
        match solution.status {
            OptimizationStatus::Optimal | OptimizationStatus::Unbounded => {
                log::info!("Problem is feasible, no relaxation needed");
                return Ok(RelaxationOutcome::Feasible { solution });
            }
            OptimizationStatus::Infeasible => {}
            status => return Err(ThermoError::RelaxationInconclusive { status }),
        }

        log::info!("Problem is infeasible, relaxation starting...");
        let candidates: Vec<&RelaxableConstraint> = thermo_problem
            .relaxable_of_kinds(self.target_kinds())
            .filter(|c| !self.config.relaxation_ignored_reactions.contains(&c.reaction))
            .collect();
        let concentrations = self.concentration_candidates(thermo_problem);
        let slack_problem =
            self.slack_problem(&thermo_problem.problem, &candidates, &concentrations)?;
        let slack_solution = solve(&slack_problem, solver)?;
        match slack_solution.status {
            OptimizationStatus::Optimal => {}
            OptimizationStatus::Infeasible => {
                log::warn!(
                    "Relaxing the thermodynamic constraints does not restore feasibility \
                    with slacks of at most {}",
                    self.config.relaxation_big_m
                );
                return Ok(RelaxationOutcome::Infeasible);
            }
            status => return Err(ThermoError::RelaxationInconclusive { status }),
        }

        let (relaxed, relaxed_concentrations, problem) =
            self.apply_relaxation(thermo_problem, &candidates, &concentrations, &slack_solution)?;
        let check = solve(&problem.problem, solver)?;
        match check.status {
            OptimizationStatus::Optimal | OptimizationStatus::Unbounded => {}
            status => return Err(ThermoError::RelaxationInconclusive { status }),
        }
        log::info!(
            "Relaxation done, {} constraints and {} log concentrations relaxed",
            relaxed.len(),
            relaxed_concentrations.len()
        );
        Ok(RelaxationOutcome::RelaxedFeasible {
            relaxed,
            concentrations: relaxed_concentrations,
            objective_value: slack_solution.objective_value.unwrap_or(0.),
            problem,
        })
    }

    /// Log concentrations with a non-degenerate range that are not ignored
    fn concentration_candidates<'t>(
        &self,
        thermo_problem: &'t ThermoProblem,
    ) -> Vec<ConcentrationCandidate<'t>> {
        if !self.relaxes_concentrations() {
            return Vec::new();
        }
        thermo_problem
            .log_concentrations
            .iter()
            .filter(|(metabolite, _)| {
                !self
                    .config
                    .relaxation_ignored_metabolites
                    .contains(metabolite.as_str())
            })
            .filter(|(_, variable)| {
                thermo_problem
                    .problem
                    .get_variable(variable)
                    .is_some_and(|v| v.lower_bound < v.upper_bound)
            })
            .map(|(metabolite, variable)| ConcentrationCandidate {
                metabolite,
                variable,
            })
            .collect()
    }

    /// Copy of the problem with slacks on every candidate, minimizing their use
    fn slack_problem(
        &self,
        problem: &Problem,
        candidates: &[&RelaxableConstraint],
        concentrations: &[ConcentrationCandidate],
    ) -> Result<Problem, ThermoError> {
        let mut slack_problem = problem.clone();
        slack_problem.remove_all_objective_terms();
        slack_problem.update_objective_sense(ObjectiveSense::Minimize);
        let big_m = self.config.relaxation_big_m;
        // Keeps the slack of the chosen constraints small without changing which are chosen
        let count = candidates.len() + concentrations.len();
        let slack_weight = 1. / (big_m * (2 * count + 1) as f64);

        for candidate in candidates {
            let bounds = slack_problem
                .get_constraint(&candidate.id)
                .map(|c| c.bounds())
                .ok_or(ProblemError::NonExistentConstraint)?;
            self.add_slacks(&mut slack_problem, &candidate.id, bounds, slack_weight)?;
        }

        // The variable bounds move into a ranged row, and the variable itself may roam
        // as far as the slacks allow
        for concentration in concentrations {
            let (lower_bound, upper_bound) = slack_problem
                .get_variable(concentration.variable)
                .map(|v| (v.lower_bound, v.upper_bound))
                .ok_or(ProblemError::NonExistentVariable)?;
            let bound_id = concentration.bound_id();
            slack_problem.update_variable_bounds(
                concentration.variable,
                lower_bound - big_m,
                upper_bound + big_m,
            )?;
            slack_problem.add_new_inequality_constraint(
                &bound_id,
                &[concentration.variable],
                &[1.],
                lower_bound,
                upper_bound,
            )?;
            self.add_slacks(
                &mut slack_problem,
                &bound_id,
                (lower_bound, upper_bound),
                slack_weight,
            )?;
        }
        Ok(slack_problem)
    }

    /// Add the indicator and the slacks of the finite sides of one constraint
    fn add_slacks(
        &self,
        slack_problem: &mut Problem,
        constraint: &str,
        (lower_bound, upper_bound): (f64, f64),
        slack_weight: f64,
    ) -> Result<(), ThermoError> {
        let big_m = self.config.relaxation_big_m;
        let relax = format!("{}{}", RELAX, constraint);
        slack_problem.add_new_binary_variable(&relax)?;
        if self.config.relaxation_objective == RelaxationObjective::ConstraintCount {
            slack_problem.add_new_linear_objective_term(&relax, 1.)?;
        }

        let sides = [
            (upper_bound, SLACK_UP, RELAX_UP, -1.),
            (lower_bound, SLACK_DOWN, RELAX_DOWN, 1.),
        ];
        for (bound, slack_prefix, link_prefix, coefficient) in sides {
            if !bound.is_finite() {
                continue;
            }
            let slack = format!("{}{}", slack_prefix, constraint);
            slack_problem.add_new_variable(&slack, None, VariableType::Continuous, 0., big_m)?;
            slack_problem.add_term_to_constraint(constraint, &slack, coefficient)?;
            slack_problem.add_new_inequality_constraint(
                &format!("{}{}", link_prefix, constraint),
                &[slack.as_str(), relax.as_str()],
                &[1., -big_m],
                f64::NEG_INFINITY,
                0.,
            )?;
            let weight = match self.config.relaxation_objective {
                RelaxationObjective::ConstraintCount => slack_weight,
                RelaxationObjective::TotalSlack => 1.,
            };
            slack_problem.add_new_linear_objective_term(&slack, weight)?;
        }
        Ok(())
    }

    /// Slack values of a constraint as (lower change, upper change), `None` when unused
    fn slack_changes(
        &self,
        slack_solution: &ProblemSolution,
        constraint: &str,
        tolerance: f64,
    ) -> Option<(f64, f64)> {
        let slack = |prefix: &str| {
            slack_solution
                .variable_value(&format!("{}{}", prefix, constraint))
                .unwrap_or(0.)
        };
        let lower_change = slack(SLACK_DOWN);
        let upper_change = slack(SLACK_UP);
        if upper_change <= tolerance && lower_change <= tolerance {
            return None;
        }
        if lower_change.max(upper_change) >= self.config.relaxation_big_m - tolerance {
            log::warn!(
                "Slack of {} reached the relaxation bound of {}",
                constraint,
                self.config.relaxation_big_m
            );
        }
        Some((lower_change, upper_change))
    }

    /// Widen the sides that moved by their slack plus epsilon
    fn widen(
        &self,
        (lower_bound, upper_bound): (f64, f64),
        (lower_change, upper_change): (f64, f64),
        tolerance: f64,
    ) -> (f64, f64) {
        let epsilon = self.config.epsilon;
        let new_lower = if lower_change > tolerance {
            lower_bound - lower_change - epsilon
        } else {
            lower_bound
        };
        let new_upper = if upper_change > tolerance {
            upper_bound + upper_change + epsilon
        } else {
            upper_bound
        };
        (new_lower, new_upper)
    }

    /// Loosen the bounds of every candidate with a non-zero slack
    fn apply_relaxation(
        &self,
        thermo_problem: &ThermoProblem,
        candidates: &[&RelaxableConstraint],
        concentrations: &[ConcentrationCandidate],
        slack_solution: &ProblemSolution,
    ) -> Result<(Vec<RelaxedConstraint>, Vec<RelaxedConcentration>, ThermoProblem), ThermoError>
    {
        let tolerance = CONFIGURATION
            .read()
            .map(|config| config.tolerance)
            .unwrap_or(1e-7);
        let mut relaxed_problem = thermo_problem.clone();
        let mut relaxed = Vec::new();

        for candidate in candidates {
            let Some((lower_change, upper_change)) =
                self.slack_changes(slack_solution, &candidate.id, tolerance)
            else {
                continue;
            };
            let previous_bounds = relaxed_problem
                .problem
                .get_constraint(&candidate.id)
                .map(|c| c.bounds())
                .ok_or(ProblemError::NonExistentConstraint)?;
            let new_bounds = self.widen(previous_bounds, (lower_change, upper_change), tolerance);
            relaxed_problem
                .problem
                .update_constraint_bounds(&candidate.id, new_bounds.0, new_bounds.1)?;
            log::warn!(
                "Relaxed {} of reaction {} from {:?} to {:?}",
                candidate.id,
                candidate.reaction,
                previous_bounds,
                new_bounds
            );
            relaxed.push(RelaxedConstraint {
                id: candidate.id.clone(),
                kind: candidate.kind,
                reaction: candidate.reaction.clone(),
                previous_bounds,
                lower_change,
                upper_change,
                new_bounds,
            });
        }

        let mut relaxed_concentrations = Vec::new();
        for concentration in concentrations {
            let Some((lower_change, upper_change)) =
                self.slack_changes(slack_solution, &concentration.bound_id(), tolerance)
            else {
                continue;
            };
            let previous_bounds = relaxed_problem
                .problem
                .get_variable(concentration.variable)
                .map(|v| (v.lower_bound, v.upper_bound))
                .ok_or(ProblemError::NonExistentVariable)?;
            let new_bounds = self.widen(previous_bounds, (lower_change, upper_change), tolerance);
            relaxed_problem.problem.update_variable_bounds(
                concentration.variable,
                new_bounds.0,
                new_bounds.1,
            )?;
            log::warn!(
                "Relaxed log concentration of {} from {:?} to {:?}",
                concentration.metabolite,
                previous_bounds,
                new_bounds
            );
            relaxed_concentrations.push(RelaxedConcentration {
                metabolite: concentration.metabolite.to_string(),
                variable: concentration.variable.to_string(),
                previous_bounds,
                lower_change,
                upper_change,
                new_bounds,
            });
        }
        Ok((relaxed, relaxed_concentrations, relaxed_problem))
    }
}

/// Solve a problem, turning a solver failure into an inconclusive relaxation
fn solve<S: Solver + Clone>(problem: &Problem, solver: &S) -> Result<ProblemSolution, ThermoError> {
    match problem.optimize(solver) {
        Ok(solution) => Ok(solution),
        Err(ProblemError::Solver(err)) => {
            log::error!("Solver failed during relaxation: {}", err);
            Err(ThermoError::RelaxationInconclusive {
                status: OptimizationStatus::NumericalError,
            })
        }
        Err(err) => Err(err.into()),
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    use indexmap::{IndexMap, IndexSet};

    use super::*;
    use crate::configuration::ThermoConfigurationBuilder;
    use crate::optimize::solvers::{DefaultSolver, SolverError};

    /// Solver replaying a fixed list of results, shared between its clones
    ///
    /// Once the list runs out every solve reports a halted search.
    #[derive(Clone, Debug, Default)]
    struct ScriptedSolver {
        results: Rc<RefCell<VecDeque<Result<OptimizationStatus, SolverError>>>>,
    }

    impl ScriptedSolver {
        fn new(results: Vec<Result<OptimizationStatus, SolverError>>) -> Self {
            ScriptedSolver {
                results: Rc::new(RefCell::new(results.into())),
            }
        }
    }

    impl Solver for ScriptedSolver {
        fn integer_variable_capable(&self) -> bool {
            true
        }
        fn binary_variable_capable(&self) -> bool {
            true
        }
        fn add_continuous_variable(&mut self, _: &str, _: f64, _: f64) -> Result<(), SolverError> {
            Ok(())
        }
        fn add_binary_variable(&mut self, _: &str) -> Result<(), SolverError> {
            Ok(())
        }
        fn add_integer_variable(&mut self, _: &str, _: f64, _: f64) -> Result<(), SolverError> {
            Ok(())
        }
        fn add_equality_constraint(
            &mut self,
            _: &str,
            _: Vec<&str>,
            _: Vec<f64>,
            _: f64,
        ) -> Result<(), SolverError> {
            Ok(())
        }
        fn add_inequality_constraint(
            &mut self,
            _: &str,
            _: Vec<&str>,
            _: Vec<f64>,
            _: f64,
            _: f64,
        ) -> Result<(), SolverError> {
            Ok(())
        }
        fn add_linear_objective_term(&mut self, _: &str, _: f64) -> Result<(), SolverError> {
            Ok(())
        }
        fn set_objective_sense(&mut self, _: ObjectiveSense) -> Result<(), SolverError> {
            Ok(())
        }
        fn clear_objective(&mut self) -> Result<(), SolverError> {
            Ok(())
        }
        fn solve(&mut self) -> Result<ProblemSolution, SolverError> {
            self.results
                .borrow_mut()
                .pop_front()
                .unwrap_or(Ok(OptimizationStatus::SolverHalted))
                .map(ProblemSolution::from_status)
        }
    }

    fn thermo_problem(problem: Problem) -> ThermoProblem {
        ThermoProblem {
            problem,
            log_concentrations: Default::default(),
            potentials: Default::default(),
            reactions: Default::default(),
            relaxable: vec![RelaxableConstraint {
                id: "cap".to_string(),
                kind: ThermoConstraintKind::Directionality,
                reaction: "R1".to_string(),
            }],
        }
    }

    /// x >= 2 together with x <= 1
    fn contradiction() -> Problem {
        let mut problem = Problem::new_maximization();
        problem
            .add_new_variable("x", None, VariableType::Continuous, 2., 10.)
            .unwrap();
        problem
            .add_new_inequality_constraint("cap", &["x"], &[1.], f64::NEG_INFINITY, 1.)
            .unwrap();
        problem.add_new_linear_objective_term("x", 1.).unwrap();
        problem
    }

    /// LC_a in [-2, -1] forced to be at least 0, with a fixed LC_w alongside
    fn concentration_conflict() -> ThermoProblem {
        let mut problem = Problem::new_maximization();
        problem
            .add_new_variable("LC_a", None, VariableType::Continuous, -2., -1.)
            .unwrap();
        problem
            .add_new_variable("LC_w", None, VariableType::Continuous, 0., 0.)
            .unwrap();
        problem
            .add_new_inequality_constraint(
                "need",
                &["LC_a", "LC_w"],
                &[1., 1.],
                0.,
                f64::INFINITY,
            )
            .unwrap();
        problem.add_new_linear_objective_term("LC_a", 1.).unwrap();
        let log_concentrations: IndexMap<String, String> = [("a", "LC_a"), ("w", "LC_w")]
            .into_iter()
            .map(|(m, v)| (m.to_string(), v.to_string()))
            .collect();
        ThermoProblem {
            problem,
            log_concentrations,
            potentials: Default::default(),
            reactions: Default::default(),
            relaxable: Vec::new(),
        }
    }

    fn relaxer_config(target: RelaxationTarget) -> ThermoConfiguration {
        ThermoConfigurationBuilder::default()
            .relaxation_target(target)
            .build()
            .unwrap()
    }

    #[test]
    fn slack_layout() {
        let config = relaxer_config(RelaxationTarget::Directionality);
        let relaxer = ConsistencyRelaxer::new(&config);
        let problem = thermo_problem(contradiction());
        let candidates: Vec<_> = problem.relaxable.iter().collect();
        let slack_problem = relaxer
            .slack_problem(&problem.problem, &candidates, &[])
            .unwrap();
        assert!(slack_problem.get_variable("SlackUp_cap").is_some());
        // The lower side is unbounded, so it gets no slack
        assert!(slack_problem.get_variable("SlackDown_cap").is_none());
        assert!(slack_problem.get_constraint("RelaxUp_cap").is_some());
        assert_eq!(slack_problem.objective().sense(), ObjectiveSense::Minimize);
        let cap = slack_problem.get_constraint("cap").unwrap();
        assert_eq!(cap.terms().len(), 2);
    }

    #[test]
    fn relax_single_constraint() {
        let _ = env_logger::builder().is_test(true).try_init();
        let config = relaxer_config(RelaxationTarget::Directionality);
        let relaxer = ConsistencyRelaxer::new(&config);
        let outcome = relaxer
            .relax(&thermo_problem(contradiction()), &DefaultSolver::default())
            .unwrap();
        match outcome {
            RelaxationOutcome::RelaxedFeasible {
                relaxed,
                concentrations,
                objective_value,
                problem,
            } => {
                assert_eq!(relaxed.len(), 1);
                assert_eq!(relaxed[0].id, "cap");
                assert!((relaxed[0].upper_change - 1.).abs() < 1e-6);
                assert!(relaxed[0].new_bounds.1 > 2.);
                assert!(concentrations.is_empty());
                assert!(objective_value >= 1.);
                let solution = problem.problem.optimize(&DefaultSolver::default()).unwrap();
                assert_eq!(solution.status, OptimizationStatus::Optimal);
            }
            other => panic!("Unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn outside_target_is_infeasible() {
        // The only conflicting constraint is not an energy balance
        let config = ThermoConfiguration::default();
        let relaxer = ConsistencyRelaxer::new(&config);
        let outcome = relaxer
            .relax(&thermo_problem(contradiction()), &DefaultSolver::default())
            .unwrap();
        assert!(matches!(outcome, RelaxationOutcome::Infeasible));
        assert!(!outcome.is_feasible());
    }

    #[test]
    fn ignored_reaction_is_not_relaxed() {
        let config = ThermoConfigurationBuilder::default()
            .relaxation_target(RelaxationTarget::Directionality)
            .relaxation_ignored_reactions(IndexSet::from(["R1".to_string()]))
            .build()
            .unwrap();
        let relaxer = ConsistencyRelaxer::new(&config);
        let outcome = relaxer
            .relax(&thermo_problem(contradiction()), &DefaultSolver::default())
            .unwrap();
        assert!(matches!(outcome, RelaxationOutcome::Infeasible));
    }

    #[test]
    fn slack_cap_limits_relaxation() {
        let _ = env_logger::builder().is_test(true).try_init();
        // The contradiction needs a slack of 1
        let config = ThermoConfigurationBuilder::default()
            .relaxation_target(RelaxationTarget::Directionality)
            .relaxation_big_m(0.5)
            .build()
            .unwrap();
        let relaxer = ConsistencyRelaxer::new(&config);
        let outcome = relaxer
            .relax(&thermo_problem(contradiction()), &DefaultSolver::default())
            .unwrap();
        assert!(matches!(outcome, RelaxationOutcome::Infeasible));
    }

    #[test]
    fn relax_log_concentration() {
        let _ = env_logger::builder().is_test(true).try_init();
        let config = relaxer_config(RelaxationTarget::LogConcentration);
        let relaxer = ConsistencyRelaxer::new(&config);
        let problem = concentration_conflict();

        let candidates = relaxer.concentration_candidates(&problem);
        // LC_w is fixed, so it is never widened
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].metabolite, "a");
        let slack_problem = relaxer
            .slack_problem(&problem.problem, &[], &candidates)
            .unwrap();
        assert_eq!(
            slack_problem.get_constraint("LCBound_LC_a").unwrap().bounds(),
            (-2., -1.)
        );
        assert!(slack_problem.get_variable("SlackUp_LCBound_LC_a").is_some());
        assert!(slack_problem.get_constraint("LCBound_LC_w").is_none());

        let outcome = relaxer.relax(&problem, &DefaultSolver::default()).unwrap();
        assert!(outcome.relaxed().is_empty());
        let concentrations = outcome.relaxed_concentrations();
        assert_eq!(concentrations.len(), 1);
        assert_eq!(concentrations[0].variable, "LC_a");
        assert_eq!(concentrations[0].previous_bounds, (-2., -1.));
        assert!((concentrations[0].upper_change - 1.).abs() < 1e-6);
        assert!(concentrations[0].lower_change < 1e-9);
        assert!(concentrations[0].new_bounds.1 >= 0.);
        assert!(concentrations[0].concentration_range().1 >= 1.);
        match outcome {
            RelaxationOutcome::RelaxedFeasible { problem, .. } => {
                let variable = problem.problem.get_variable("LC_a").unwrap();
                assert_eq!(variable.lower_bound, -2.);
                assert!(variable.upper_bound >= 0.);
            }
            other => panic!("Unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn ignored_metabolite_is_not_relaxed() {
        let config = ThermoConfigurationBuilder::default()
            .relaxation_target(RelaxationTarget::LogConcentration)
            .relaxation_ignored_metabolites(IndexSet::from(["a".to_string()]))
            .build()
            .unwrap();
        let relaxer = ConsistencyRelaxer::new(&config);
        let problem = concentration_conflict();
        assert!(relaxer.concentration_candidates(&problem).is_empty());
        let outcome = relaxer.relax(&problem, &DefaultSolver::default()).unwrap();
        assert!(matches!(outcome, RelaxationOutcome::Infeasible));
    }

    #[test]
    fn halted_solver_is_inconclusive() {
        let config = ThermoConfiguration::default();
        let relaxer = ConsistencyRelaxer::new(&config);
        let solver = ScriptedSolver::new(vec![Ok(OptimizationStatus::SolverHalted)]);
        match relaxer.relax(&thermo_problem(contradiction()), &solver) {
            Err(ThermoError::RelaxationInconclusive { status }) => {
                assert_eq!(status, OptimizationStatus::SolverHalted)
            }
            other => panic!("Unexpected result {:?}", other.map(|o| o.is_feasible())),
        }
    }

    #[test]
    fn solver_failure_is_inconclusive() {
        let _ = env_logger::builder().is_test(true).try_init();
        let config = relaxer_config(RelaxationTarget::Directionality);
        let relaxer = ConsistencyRelaxer::new(&config);
        // The first solve finds the infeasibility, the slack problem then fails
        let solver = ScriptedSolver::new(vec![
            Ok(OptimizationStatus::Infeasible),
            Err(SolverError::Backend("interrupted".to_string())),
        ]);
        match relaxer.relax(&thermo_problem(contradiction()), &solver) {
            Err(ThermoError::RelaxationInconclusive { status }) => {
                assert_eq!(status, OptimizationStatus::NumericalError)
            }
            other => panic!("Unexpected result {:?}", other.map(|o| o.is_feasible())),
        }
        assert!(solver.results.borrow().is_empty());
    }
}
