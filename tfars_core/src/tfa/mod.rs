//! Thermodynamics-based flux analysis of metabolic models
//!
//! [`ThermoModel`] ties the steps together: a model is first prepared (every metabolite
//! and reaction gets its thermodynamic values, see [`crate::thermo::annotate`]), then
//! converted into a mixed integer problem ([`convert`]), which can be optimized directly
//! or relaxed when it turns out to be infeasible ([`relax`]).
//!
//! # Examples
//! ```rust,no_run
//! use std::sync::Arc;
//! use tfars_core::configuration::ThermoConfiguration;
//! use tfars_core::metabolic_model::model::Model;
//! use tfars_core::optimize::solvers::DefaultSolver;
//! use tfars_core::tfa::ThermoModel;
//! use tfars_core::thermo::database::ThermoDatabase;
//!
//! let model = Model::read_json("model.json").unwrap();
//! let database = Arc::new(ThermoDatabase::read_json("thermo_data.json").unwrap());
//! let mut thermo_model = ThermoModel::new(model, database, ThermoConfiguration::default());
//! thermo_model.prepare().unwrap();
//! let problem = thermo_model.convert().unwrap();
//! let solution = thermo_model.optimize(&problem, &DefaultSolver::default()).unwrap();
//! println!("{:?}", solution.objective_value);
//! ```
pub mod convert;
pub mod relax;

use std::sync::Arc;

use crate::configuration::ThermoConfiguration;
use crate::metabolic_model::model::Model;
use crate::optimize::solvers::Solver;
use crate::optimize::ProblemSolution;
use crate::thermo::annotate::{ModelAnnotator, ThermoAnnotations};
use crate::thermo::database::ThermoDatabase;
use crate::thermo::ThermoError;
use convert::{TfaConverter, ThermoProblem};
use relax::{ConsistencyRelaxer, RelaxationOutcome};

/// A metabolic model paired with a thermodynamic database and a numeric regime
///
/// The database is shared, so many models can be prepared against the same data.
#[derive(Debug, Clone)]
pub struct ThermoModel {
    model: Model,
    database: Arc<ThermoDatabase>,
    config: ThermoConfiguration,
    annotations: Option<ThermoAnnotations>,
}

impl ThermoModel {
    pub fn new(model: Model, database: Arc<ThermoDatabase>, config: ThermoConfiguration) -> Self {
        ThermoModel {
            model,
            database,
            config,
            annotations: None,
        }
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn database(&self) -> &ThermoDatabase {
        &self.database
    }

    pub fn config(&self) -> &ThermoConfiguration {
        &self.config
    }

    /// Thermodynamic values of the last [`ThermoModel::prepare`], if any
    pub fn annotations(&self) -> Option<&ThermoAnnotations> {
        self.annotations.as_ref()
    }

    /// Compute the thermodynamic values of every metabolite and reaction
    ///
    /// Any earlier annotations are replaced, so preparing twice gives the same result.
    pub fn prepare(&mut self) -> Result<&ThermoAnnotations, ThermoError> {
        log::info!("Model preparation starting...");
        let annotations = ModelAnnotator::new(&self.database, &self.config).annotate(&self.model)?;
        log::info!("Model preparation done, {}", annotations.summary());
        Ok(self.annotations.insert(annotations))
    }

    /// Build the thermodynamics-based flux analysis problem
    ///
    /// # Errors
    /// [`ThermoError::NotPrepared`] if [`ThermoModel::prepare`] hasn't been called yet.
    pub fn convert(&self) -> Result<ThermoProblem, ThermoError> {
        let annotations = self.annotations.as_ref().ok_or(ThermoError::NotPrepared)?;
        TfaConverter::new(&self.config, self.database.units()).convert(&self.model, annotations)
    }

    /// Relax the problem if it is infeasible, see [`ConsistencyRelaxer`]
    pub fn relax<S: Solver + Clone>(
        &self,
        problem: &ThermoProblem,
        solver: &S,
    ) -> Result<RelaxationOutcome, ThermoError> {
        ConsistencyRelaxer::new(&self.config).relax(problem, solver)
    }

    /// Optimize the problem, infeasibility is reported in the solution status
    pub fn optimize<S: Solver + Clone>(
        &self,
        problem: &ThermoProblem,
        solver: &S,
    ) -> Result<ProblemSolution, ThermoError> {
        Ok(problem.problem.optimize(solver)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::{RelaxationTarget, ThermoConfigurationBuilder};
    use crate::metabolic_model::reaction::ReactionBuilder;
    use crate::optimize::objective::ObjectiveSense;
    use crate::optimize::solvers::DefaultSolver;
    use crate::optimize::OptimizationStatus;
    use crate::tfa::convert::ThermoConstraintKind;
    use indexmap::{IndexMap, IndexSet};
    use std::path::PathBuf;

    fn test_data(file: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("test_data")
            .join(file)
    }

    fn toy_model() -> Model {
        Model::read_json(test_data("toy_model.json")).unwrap()
    }

    fn thermo_model(model: Model, target: RelaxationTarget) -> ThermoModel {
        let database = Arc::new(ThermoDatabase::read_json(test_data("thermo_db.json")).unwrap());
        let config = ThermoConfigurationBuilder::default()
            .relaxation_target(target)
            .build()
            .unwrap();
        let mut thermo_model = ThermoModel::new(model, database, config);
        thermo_model.prepare().unwrap();
        thermo_model
    }

    /// Toy model with a second reaction forced to run B -> A, against its Gibbs energy
    fn forced_reverse_model() -> Model {
        let mut model = toy_model();
        model.add_reaction(
            ReactionBuilder::default()
                .id("R2")
                .metabolites(IndexMap::from([
                    ("b_c".to_string(), -1.),
                    ("a_c".to_string(), 1.),
                ]))
                .lower_bound(1.)
                .upper_bound(1000.)
                .build()
                .unwrap(),
        );
        model
    }

    fn value(solution: &ProblemSolution, variable: &str) -> f64 {
        solution.variable_value(variable).unwrap()
    }

    #[test]
    fn convert_requires_prepare() {
        let database = Arc::new(ThermoDatabase::read_json(test_data("thermo_db.json")).unwrap());
        let thermo_model = ThermoModel::new(toy_model(), database, ThermoConfiguration::default());
        assert!(thermo_model.annotations().is_none());
        assert!(matches!(
            thermo_model.convert(),
            Err(ThermoError::NotPrepared)
        ));
    }

    #[test]
    fn prepare_is_idempotent() {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut thermo_model = thermo_model(toy_model(), RelaxationTarget::EnergyBalance);
        let first = thermo_model.annotations().unwrap().clone();
        let second = thermo_model.prepare().unwrap().clone();
        assert_eq!(first, second);
        assert_eq!(second.reactions.len(), thermo_model.model().reactions.len());
    }

    #[test]
    fn thermodynamically_feasible_optimum() {
        let _ = env_logger::builder().is_test(true).try_init();
        let thermo_model = thermo_model(toy_model(), RelaxationTarget::EnergyBalance);
        let problem = thermo_model.convert().unwrap();
        let solver = DefaultSolver::default();
        let solution = thermo_model.optimize(&problem, &solver).unwrap();
        assert_eq!(solution.status, OptimizationStatus::Optimal);
        assert!((solution.objective_value.unwrap() - 10.).abs() < 1e-6);

        let epsilon = thermo_model.config().epsilon;
        for (reaction_id, variables) in &problem.reactions {
            let forward_use = value(&solution, &variables.forward_use);
            let backward_use = value(&solution, &variables.backward_use);
            assert!((forward_use + backward_use - 1.).abs() < 1e-6);
            let flux = thermo_model.model().reactions[reaction_id]
                .flux(&solution)
                .unwrap();
            let delta_g = value(&solution, &variables.delta_g);
            if forward_use > 0.5 {
                assert!(flux >= -1e-6);
                assert!(delta_g <= -epsilon + 1e-6);
            } else {
                assert!(flux <= 1e-6);
                assert!(delta_g >= epsilon - 1e-6);
            }
        }
    }

    #[test]
    fn gibbs_energy_blocks_reverse_flux() {
        let thermo_model = thermo_model(toy_model(), RelaxationTarget::EnergyBalance);
        let mut problem = thermo_model.convert().unwrap();
        problem.problem.update_objective_sense(ObjectiveSense::Minimize);
        let solution = thermo_model
            .optimize(&problem, &DefaultSolver::default())
            .unwrap();
        assert_eq!(solution.status, OptimizationStatus::Optimal);
        // Without thermodynamics R1 could run backwards at -10
        assert!(solution.objective_value.unwrap().abs() < 1e-6);
    }

    #[test]
    fn feasible_problem_needs_no_relaxation() {
        let thermo_model = thermo_model(toy_model(), RelaxationTarget::All);
        let problem = thermo_model.convert().unwrap();
        let outcome = thermo_model
            .relax(&problem, &DefaultSolver::default())
            .unwrap();
        assert!(matches!(outcome, RelaxationOutcome::Feasible { .. }));
        assert!(outcome.relaxed().is_empty());
    }

    #[test]
    fn relax_forced_directionality() {
        let _ = env_logger::builder().is_test(true).try_init();
        let thermo_model = thermo_model(forced_reverse_model(), RelaxationTarget::Directionality);
        let problem = thermo_model.convert().unwrap();
        let solver = DefaultSolver::default();
        let solution = thermo_model.optimize(&problem, &solver).unwrap();
        assert_eq!(solution.status, OptimizationStatus::Infeasible);

        match thermo_model.relax(&problem, &solver).unwrap() {
            RelaxationOutcome::RelaxedFeasible {
                relaxed,
                objective_value,
                problem: relaxed_problem,
                ..
            } => {
                assert_eq!(relaxed.len(), 1);
                assert_eq!(relaxed[0].id, "FDG_R2");
                assert_eq!(relaxed[0].kind, ThermoConstraintKind::Directionality);
                assert_eq!(relaxed[0].reaction, "R2");
                // DG of R2 is at least 9 - RT * ln(0.02 / 1e-5)
                assert!(relaxed[0].upper_change > 4.);
                assert_eq!(relaxed[0].lower_change, 0.);
                assert!(objective_value >= 1.);
                let check = thermo_model.optimize(&relaxed_problem, &solver).unwrap();
                assert_eq!(check.status, OptimizationStatus::Optimal);
            }
            other => panic!("Unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn relax_forced_energy_balance() {
        let thermo_model = thermo_model(forced_reverse_model(), RelaxationTarget::EnergyBalance);
        let problem = thermo_model.convert().unwrap();
        let solver = DefaultSolver::default();
        let outcome = thermo_model.relax(&problem, &solver).unwrap();
        let relaxed = outcome.relaxed();
        assert_eq!(relaxed.len(), 1);
        assert_eq!(relaxed[0].id, "G_R2");
        assert_eq!(relaxed[0].kind, ThermoConstraintKind::EnergyBalance);
        assert!(relaxed[0].new_bounds.1 > relaxed[0].previous_bounds.1);
        match outcome {
            RelaxationOutcome::RelaxedFeasible { problem, .. } => {
                let check = thermo_model.optimize(&problem, &solver).unwrap();
                assert_eq!(check.status, OptimizationStatus::Optimal);
            }
            other => panic!("Unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn structural_infeasibility() {
        let mut model = toy_model();
        // R1 has to run but nothing can supply A
        for exchange in ["EX_a", "EX_b"] {
            let reaction = model.reactions.get_mut(exchange).unwrap();
            reaction.lower_bound = 0.;
            reaction.upper_bound = 0.;
        }
        model.reactions.get_mut("R1").unwrap().lower_bound = 1.;
        let thermo_model = thermo_model(model, RelaxationTarget::All);
        let problem = thermo_model.convert().unwrap();
        let outcome = thermo_model
            .relax(&problem, &DefaultSolver::default())
            .unwrap();
        assert!(matches!(outcome, RelaxationOutcome::Infeasible));
    }

    #[test]
    fn default_configuration_is_feasible() {
        let _ = env_logger::builder().is_test(true).try_init();
        let database = Arc::new(ThermoDatabase::read_json(test_data("thermo_db.json")).unwrap());
        let mut thermo_model =
            ThermoModel::new(toy_model(), database, ThermoConfiguration::default());
        thermo_model.prepare().unwrap();
        let problem = thermo_model.convert().unwrap();
        let solver = DefaultSolver::default();
        let solution = thermo_model.optimize(&problem, &solver).unwrap();
        assert_eq!(solution.status, OptimizationStatus::Optimal);
        assert!((solution.objective_value.unwrap() - 10.).abs() < 1e-6);
        // Drains carry no thermodynamic variables
        assert!(!problem.is_constrained("EX_a"));
        assert!(matches!(
            thermo_model.relax(&problem, &solver).unwrap(),
            RelaxationOutcome::Feasible { .. }
        ));
    }

    #[test]
    fn equal_ph_proton_transport() {
        let _ = env_logger::builder().is_test(true).try_init();
        let model = Model::from_json_str(
            r#"{
              "id": "protons",
              "compartments": {
                "c": {"symbol": "c", "name": "cytosol", "c_min": 1e-05, "c_max": 0.02,
                      "pH": 7.0, "ionicStr": 0.25, "membranePot": {"c": 0.0, "p": 0.0}},
                "p": {"symbol": "p", "name": "periplasm", "c_min": 1e-05, "c_max": 0.02,
                      "pH": 7.0, "ionicStr": 0.25, "membranePot": {"c": 0.0, "p": 0.0}}
              },
              "metabolites": [
                {"id": "h_c", "compartment": "c", "charge": 1, "formula": "H",
                 "annotation": {"seed_id": "cpd00067"}},
                {"id": "h_p", "compartment": "p", "charge": 1, "formula": "H",
                 "annotation": {"seed_id": "cpd00067"}}
              ],
              "reactions": [
                {"id": "Htpp", "metabolites": {"h_p": -1.0, "h_c": 1.0},
                 "lower_bound": -1000.0, "upper_bound": 1000.0, "objective_coefficient": 1.0},
                {"id": "EX_h_c", "metabolites": {"h_c": -1.0},
                 "lower_bound": -10.0, "upper_bound": 10.0},
                {"id": "EX_h_p", "metabolites": {"h_p": -1.0},
                 "lower_bound": -10.0, "upper_bound": 10.0}
              ]
            }"#,
        )
        .unwrap();
        let database = Arc::new(ThermoDatabase::read_json(test_data("thermo_db.json")).unwrap());
        let mut thermo_model = ThermoModel::new(model, database, ThermoConfiguration::default());
        let annotations = thermo_model.prepare().unwrap();
        let transport = &annotations.reactions["Htpp"];
        assert!(transport.delta_gr.value().unwrap().abs() < 1e-9);
        assert!(transport.delta_gr.error().unwrap() > 0.);

        let problem = thermo_model.convert().unwrap();
        assert!(problem.is_constrained("Htpp"));
        let solution = thermo_model
            .optimize(&problem, &DefaultSolver::default())
            .unwrap();
        assert_eq!(solution.status, OptimizationStatus::Optimal);
        assert!((solution.objective_value.unwrap() - 10.).abs() < 1e-6);
    }

    #[test]
    fn relax_forced_log_concentrations() {
        let _ = env_logger::builder().is_test(true).try_init();
        let thermo_model =
            thermo_model(forced_reverse_model(), RelaxationTarget::LogConcentration);
        let problem = thermo_model.convert().unwrap();
        let solver = DefaultSolver::default();
        let outcome = thermo_model.relax(&problem, &solver).unwrap();
        assert!(outcome.relaxed().is_empty());
        let concentrations = outcome.relaxed_concentrations();
        assert!(!concentrations.is_empty());
        for concentration in concentrations {
            assert!(["a_c", "b_c"].contains(&concentration.metabolite.as_str()));
        }
        match outcome {
            RelaxationOutcome::RelaxedFeasible { problem, .. } => {
                let check = thermo_model.optimize(&problem, &solver).unwrap();
                assert_eq!(check.status, OptimizationStatus::Optimal);
            }
            other => panic!("Unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn ignored_reaction_blocks_relaxation() {
        let database = Arc::new(ThermoDatabase::read_json(test_data("thermo_db.json")).unwrap());
        let config = ThermoConfigurationBuilder::default()
            .relaxation_target(RelaxationTarget::Directionality)
            .relaxation_ignored_reactions(IndexSet::from(["R2".to_string()]))
            .build()
            .unwrap();
        let mut thermo_model = ThermoModel::new(forced_reverse_model(), database, config);
        thermo_model.prepare().unwrap();
        let problem = thermo_model.convert().unwrap();
        let outcome = thermo_model
            .relax(&problem, &DefaultSolver::default())
            .unwrap();
        assert!(matches!(outcome, RelaxationOutcome::Infeasible));
    }

    #[test]
    fn water_formation_energy_is_corrected() {
        let thermo_model = thermo_model(toy_model(), RelaxationTarget::EnergyBalance);
        let annotations = thermo_model.annotations().unwrap();
        let water = annotations.metabolites["h2o_c"].delta_gf.value().unwrap();
        assert!((water - -56.687).abs() > 1.);
        let again = thermo_model.clone().prepare().unwrap().metabolites["h2o_c"]
            .delta_gf
            .value()
            .unwrap();
        assert_eq!(water, again);
    }
}
