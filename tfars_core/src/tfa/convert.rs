//! Conversion of an annotated model into a thermodynamics-based flux analysis problem
use indexmap::IndexMap;

use crate::configuration::ThermoConfiguration;
use crate::metabolic_model::model::{Model, ModelError};
use crate::metabolic_model::reaction::Reaction;
use crate::optimize::problem::Problem;
use crate::optimize::variable::VariableType;
use crate::thermo::annotate::ThermoAnnotations;
use crate::thermo::database::EnergyUnit;
use crate::thermo::reaction::transported_species;
use crate::thermo::ThermoError;

// region Names
/// Log concentration of a metabolite
pub const LOG_CONCENTRATION: &str = "LC_";
/// Gibbs energy of a reaction
pub const DELTA_G: &str = "DG_";
/// Standard Gibbs energy of a reaction, bounded by its error
pub const DELTA_G_STD: &str = "DGo_";
/// Binary, the reaction may carry forward flux
pub const FORWARD_USE: &str = "FU_";
/// Binary, the reaction may carry reverse flux
pub const BACKWARD_USE: &str = "BU_";
/// Thermodynamic displacement `ln(Gamma)`
pub const LN_GAMMA: &str = "LnGamma_";
/// Chemical potential of a metabolite
pub const POTENTIAL: &str = "P_";

/// `DGo - DG + RT * sum(coef * LC) = 0`
pub const ENERGY_BALANCE: &str = "G_";
/// `DG + M * FU <= M - epsilon`
pub const FORWARD_DELTA_G_COUPLING: &str = "FDG_";
/// `-DG + M * BU <= M - epsilon`
pub const BACKWARD_DELTA_G_COUPLING: &str = "BDG_";
/// `FU + BU = 1`
pub const SIMULTANEOUS_USE: &str = "SU_";
/// `F - ub * FU <= 0`
pub const FORWARD_DIRECTION_COUPLING: &str = "UF_";
/// `R - ub * BU <= 0`
pub const BACKWARD_DIRECTION_COUPLING: &str = "UR_";
/// `LnGamma - DG / RT = 0`
pub const DISPLACEMENT_COUPLING: &str = "LG_";
/// `P - RT * LC = DGf`
pub const POTENTIAL_COUPLING: &str = "PC_";
// endregion Names

/// Family of a thermodynamic constraint that may be loosened by the relaxation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThermoConstraintKind {
    /// Energy balance of a reaction, `G_`
    EnergyBalance,
    /// Sign coupling between Gibbs energy and use variable, `FDG_` and `BDG_`
    Directionality,
}

/// Constraint registered for relaxation
#[derive(Debug, Clone, PartialEq)]
pub struct RelaxableConstraint {
    pub id: String,
    pub kind: ThermoConstraintKind,
    /// Reaction the constraint belongs to
    pub reaction: String,
}

/// Names of the problem variables created for a thermodynamically constrained reaction
#[derive(Debug, Clone, PartialEq)]
pub struct ReactionVariables {
    pub forward: String,
    pub reverse: String,
    pub delta_g: String,
    pub delta_g_std: String,
    pub forward_use: String,
    pub backward_use: String,
    pub ln_gamma: Option<String>,
}

/// Thermodynamics-based flux analysis problem, with a registry of what was added
#[derive(Debug, Clone)]
pub struct ThermoProblem {
    /// The augmented problem, ready to be handed to a solver
    pub problem: Problem,
    /// Log concentration variable of each computable metabolite
    pub log_concentrations: IndexMap<String, String>,
    /// Chemical potential variable of each metabolite with a free log concentration
    pub potentials: IndexMap<String, String>,
    /// Variables of each thermodynamically constrained reaction
    pub reactions: IndexMap<String, ReactionVariables>,
    /// Constraints the relaxation may loosen, in creation order
    pub relaxable: Vec<RelaxableConstraint>,
}

impl ThermoProblem {
    /// Registered constraints of the given families
    pub fn relaxable_of_kinds<'a>(
        &'a self,
        kinds: &'a [ThermoConstraintKind],
    ) -> impl Iterator<Item = &'a RelaxableConstraint> + 'a {
        self.relaxable.iter().filter(|c| kinds.contains(&c.kind))
    }

    /// Whether the reaction received thermodynamic variables
    pub fn is_constrained(&self, reaction_id: &str) -> bool {
        self.reactions.contains_key(reaction_id)
    }
}

/// Builds the mixed integer problem coupling flux directions to Gibbs energies
#[derive(Debug, Clone, Copy)]
pub struct TfaConverter<'a> {
    config: &'a ThermoConfiguration,
    unit: EnergyUnit,
}

impl<'a> TfaConverter<'a> {
    /// Create a converter working in the energy unit of the annotations
    pub fn new(config: &'a ThermoConfiguration, unit: EnergyUnit) -> Self {
        TfaConverter { config, unit }
    }

    /// Convert an annotated model
    ///
    /// The flux balance problem of the model is extended with log concentration variables
    /// for every computable metabolite, and with Gibbs energy variables, use binaries and
    /// their coupling constraints for every reaction with a computed Gibbs energy. All
    /// other reactions keep only their flux bounds. The solver is never invoked.
    pub fn convert(
        &self,
        model: &Model,
        annotations: &ThermoAnnotations,
    ) -> Result<ThermoProblem, ThermoError> {
        log::info!("Model conversion starting...");
        self.check_flux_bounds(model)?;
        let mut thermo_problem = ThermoProblem {
            problem: model.to_problem()?,
            log_concentrations: IndexMap::new(),
            potentials: IndexMap::new(),
            reactions: IndexMap::new(),
            relaxable: Vec::new(),
        };
        self.add_log_concentrations(&mut thermo_problem, annotations)?;
        for reaction in model.reactions.values() {
            self.convert_reaction(&mut thermo_problem, reaction, annotations)?;
        }
        log::info!(
            "Model conversion done, {} of {} reactions thermodynamically constrained.",
            thermo_problem.reactions.len(),
            model.reactions.len()
        );
        Ok(thermo_problem)
    }

    /// Flux bounds double as big-M coefficients of the use constraints, so they must be finite
    /// and within the big-M
    fn check_flux_bounds(&self, model: &Model) -> Result<(), ThermoError> {
        let big_m = self.config.big_m;
        let limit = big_m + self.config.epsilon;
        for reaction in model.reactions.values() {
            let (lower_bound, upper_bound) = (reaction.lower_bound, reaction.upper_bound);
            if !(lower_bound >= -limit && upper_bound <= limit) {
                return Err(ThermoError::FluxBoundsTooWide {
                    reaction: reaction.id.clone(),
                    lower_bound,
                    upper_bound,
                    big_m,
                });
            }
        }
        Ok(())
    }

    fn add_log_concentrations(
        &self,
        thermo_problem: &mut ThermoProblem,
        annotations: &ThermoAnnotations,
    ) -> Result<(), ThermoError> {
        for (met_id, thermo) in &annotations.metabolites {
            if !thermo.is_computable() {
                log::debug!("NOT generating thermo variables for {}", met_id);
                continue;
            }
            let conditions = annotations.compartments.get(&thermo.compartment).ok_or_else(|| {
                ThermoError::MissingCompartmentData {
                    compartment: thermo.compartment.clone(),
                    field: "c_min".to_string(),
                }
            })?;
            let (lower_bound, upper_bound) = match thermo.seed_id.as_deref() {
                Some(seed) if seed == self.config.water_seed_id => (0., 0.),
                Some(seed) if seed == self.config.proton_seed_id => {
                    let ln_h = 10f64.powf(-conditions.ph).ln();
                    (ln_h, ln_h)
                }
                _ => (conditions.c_min.ln(), conditions.c_max.ln()),
            };
            let id = format!("{}{}", LOG_CONCENTRATION, met_id);
            thermo_problem.problem.add_new_variable(
                &id,
                None,
                VariableType::Continuous,
                lower_bound,
                upper_bound,
            )?;
            if self.config.add_potentials && lower_bound < upper_bound {
                if let Some(delta_gf) = thermo.delta_gf.value() {
                    let potential = format!("{}{}", POTENTIAL, met_id);
                    let big_m = self.config.big_m;
                    thermo_problem.problem.add_new_variable(
                        &potential,
                        None,
                        VariableType::Continuous,
                        -big_m,
                        big_m,
                    )?;
                    thermo_problem.problem.add_new_equality_constraint(
                        &format!("{}{}", POTENTIAL_COUPLING, met_id),
                        &[potential.as_str(), id.as_str()],
                        &[1., -self.config.rt(self.unit)],
                        delta_gf,
                    )?;
                    thermo_problem.potentials.insert(met_id.clone(), potential);
                }
            }
            thermo_problem.log_concentrations.insert(met_id.clone(), id);
        }
        Ok(())
    }

    fn convert_reaction(
        &self,
        thermo_problem: &mut ThermoProblem,
        reaction: &Reaction,
        annotations: &ThermoAnnotations,
    ) -> Result<(), ThermoError> {
        let Some(thermo) = annotations.reactions.get(&reaction.id) else {
            return Ok(());
        };
        let (Some(delta_gr), Some(delta_gr_error)) =
            (thermo.delta_gr.value(), thermo.delta_gr.error())
        else {
            log::debug!("generating no thermo constraint for reaction {}", reaction.id);
            return Ok(());
        };

        let transported = transported_species(reaction, &annotations.metabolites);
        if thermo.is_transport
            && transported
                .keys()
                .all(|seed| *seed == self.config.water_seed_id)
        {
            log::debug!("{} is a water transport, no thermo constraint", reaction.id);
            return Ok(());
        }

        let rt = self.config.rt(self.unit);
        let big_m = self.config.big_m;
        let epsilon = self.config.epsilon;
        let rxn = &reaction.id;
        let vars = ReactionVariables {
            forward: reaction.get_forward_id(),
            reverse: reaction.get_reverse_id(),
            delta_g: format!("{}{}", DELTA_G, rxn),
            delta_g_std: format!("{}{}", DELTA_G_STD, rxn),
            forward_use: format!("{}{}", FORWARD_USE, rxn),
            backward_use: format!("{}{}", BACKWARD_USE, rxn),
            ln_gamma: self
                .config
                .add_displacement
                .then(|| format!("{}{}", LN_GAMMA, rxn)),
        };
        let problem = &mut thermo_problem.problem;

        problem.add_new_variable(&vars.delta_g, None, VariableType::Continuous, -big_m, big_m)?;
        problem.add_new_variable(
            &vars.delta_g_std,
            None,
            VariableType::Continuous,
            delta_gr - delta_gr_error,
            delta_gr + delta_gr_error,
        )?;

        // Energy balance, concentration terms of protons and water are part of DGo
        let mut terms: IndexMap<String, f64> = IndexMap::new();
        terms.insert(vars.delta_g_std.clone(), 1.);
        terms.insert(vars.delta_g.clone(), -1.);
        let mut add_lc_term = |met_id: &str, coefficient: f64| -> Result<(), ThermoError> {
            let lc = thermo_problem.log_concentrations.get(met_id).ok_or_else(|| {
                ThermoError::Model(ModelError::UnknownMetabolite {
                    reaction: rxn.clone(),
                    metabolite: met_id.to_string(),
                })
            })?;
            *terms.entry(lc.clone()).or_insert(0.) += coefficient;
            Ok(())
        };
        let is_proton_or_water = |met_id: &str| {
            annotations
                .metabolites
                .get(met_id)
                .and_then(|m| m.seed_id.as_deref())
                .is_some_and(|seed| {
                    seed == self.config.proton_seed_id || seed == self.config.water_seed_id
                })
        };
        if thermo.is_transport {
            let mut chemical = reaction.metabolites.clone();
            for (seed, species) in &transported {
                if *seed != self.config.proton_seed_id {
                    add_lc_term(&species.reactant, -rt * species.coefficient)?;
                    add_lc_term(&species.product, rt * species.coefficient)?;
                }
                if let Some(coef) = chemical.get_mut(&species.reactant) {
                    *coef += species.coefficient;
                }
                if let Some(coef) = chemical.get_mut(&species.product) {
                    *coef -= species.coefficient;
                }
            }
            for (met_id, coef) in &chemical {
                if *coef != 0. && !is_proton_or_water(met_id) {
                    add_lc_term(met_id, rt * coef)?;
                }
            }
        } else {
            for (met_id, coef) in &reaction.metabolites {
                if !is_proton_or_water(met_id) {
                    add_lc_term(met_id, rt * coef)?;
                }
            }
        }
        let balance_id = format!("{}{}", ENERGY_BALANCE, rxn);
        let (variables, coefficients): (Vec<&str>, Vec<f64>) =
            terms.iter().map(|(var, coef)| (var.as_str(), *coef)).unzip();
        problem.add_new_equality_constraint(&balance_id, &variables, &coefficients, 0.)?;

        if let Some(ln_gamma) = &vars.ln_gamma {
            problem.add_new_variable(
                ln_gamma,
                None,
                VariableType::Continuous,
                f64::NEG_INFINITY,
                f64::INFINITY,
            )?;
            problem.add_new_equality_constraint(
                &format!("{}{}", DISPLACEMENT_COUPLING, rxn),
                &[ln_gamma.as_str(), vars.delta_g.as_str()],
                &[1., -1. / rt],
                0.,
            )?;
        }

        problem.add_new_binary_variable(&vars.forward_use)?;
        problem.add_new_binary_variable(&vars.backward_use)?;
        let forward_coupling = format!("{}{}", FORWARD_DELTA_G_COUPLING, rxn);
        problem.add_new_inequality_constraint(
            &forward_coupling,
            &[vars.delta_g.as_str(), vars.forward_use.as_str()],
            &[1., big_m],
            f64::NEG_INFINITY,
            big_m - epsilon,
        )?;
        let backward_coupling = format!("{}{}", BACKWARD_DELTA_G_COUPLING, rxn);
        problem.add_new_inequality_constraint(
            &backward_coupling,
            &[vars.delta_g.as_str(), vars.backward_use.as_str()],
            &[-1., big_m],
            f64::NEG_INFINITY,
            big_m - epsilon,
        )?;
        problem.add_new_equality_constraint(
            &format!("{}{}", SIMULTANEOUS_USE, rxn),
            &[vars.forward_use.as_str(), vars.backward_use.as_str()],
            &[1., 1.],
            1.,
        )?;
        problem.add_new_inequality_constraint(
            &format!("{}{}", FORWARD_DIRECTION_COUPLING, rxn),
            &[vars.forward.as_str(), vars.forward_use.as_str()],
            &[1., -reaction.get_forward_upper_bound()],
            f64::NEG_INFINITY,
            0.,
        )?;
        problem.add_new_inequality_constraint(
            &format!("{}{}", BACKWARD_DIRECTION_COUPLING, rxn),
            &[vars.reverse.as_str(), vars.backward_use.as_str()],
            &[1., -reaction.get_reverse_upper_bound()],
            f64::NEG_INFINITY,
            0.,
        )?;

        for (id, kind) in [
            (balance_id, ThermoConstraintKind::EnergyBalance),
            (forward_coupling, ThermoConstraintKind::Directionality),
            (backward_coupling, ThermoConstraintKind::Directionality),
        ] {
            thermo_problem.relaxable.push(RelaxableConstraint {
                id,
                kind,
                reaction: rxn.clone(),
            });
        }
        log::debug!("generating thermo constraint for {}", rxn);
        thermo_problem.reactions.insert(rxn.clone(), vars);
        Ok(())
    }
}
