//! Global model defaults, and the explicit numeric regime used for thermodynamic conversion
use std::sync::{LazyLock, RwLock};

use derive_builder::Builder;
use indexmap::IndexSet;

use crate::thermo::database::EnergyUnit;
use crate::thermo::constants;

pub static CONFIGURATION: LazyLock<RwLock<Configuration>> =
    LazyLock::new(|| RwLock::new(Configuration::default()));

/// Defaults used when building metabolic models
pub struct Configuration {
    /// Default lower flux bound of new reactions
    pub lower_bound: f64,
    /// Default upper flux bound of new reactions
    pub upper_bound: f64,
    /// Tolerance used when interpreting solver values (e.g. binary variables)
    pub tolerance: f64,
}

impl Default for Configuration {
    fn default() -> Self {
        Configuration {
            lower_bound: -1000.,
            upper_bound: 1000.,
            tolerance: 1e-07,
        }
    }
}

/// Numeric regime for preparing, converting and relaxing a thermodynamic model
///
/// Every conversion receives its own copy, so models with different big-M or temperature
/// settings can be converted side by side.
///
/// # Examples
/// ```rust
/// use tfars_core::configuration::ThermoConfigurationBuilder;
/// let config = ThermoConfigurationBuilder::default()
///     .temperature(310.15)
///     .big_m(500.)
///     .build()
///     .unwrap();
/// assert_eq!(config.big_m, 500.);
/// ```
#[derive(Builder, Clone, Debug, PartialEq)]
pub struct ThermoConfiguration {
    /// Temperature (K)
    #[builder(default = "constants::TEMPERATURE_0")]
    pub temperature: f64,
    /// pKas at or below this pH are ignored
    #[builder(default = "constants::MIN_PH")]
    pub min_ph: f64,
    /// pKas at or above this pH are ignored
    #[builder(default = "constants::MAX_PH")]
    pub max_ph: f64,
    /// Debye-Hückel B parameter
    #[builder(default = "constants::DEBYE_HUCKEL_B_0")]
    pub debye_huckel_b: f64,
    /// Big-M of the Gibbs energy sign coupling, also the bound of the DG variables
    #[builder(default = "1000.")]
    pub big_m: f64,
    /// Minimal driving force required in the active direction
    #[builder(default = "1e-6")]
    pub epsilon: f64,
    /// Upper bound of every relaxation slack
    ///
    /// A constraint needing more slack than this can't be relaxed, and the relaxation
    /// reports the problem as infeasible.
    #[builder(default = "1000.")]
    pub relaxation_big_m: f64,
    /// Database key of the proton
    #[builder(default = "constants::CPD_PROTON.to_string()")]
    pub proton_seed_id: String,
    /// Database key of water
    #[builder(default = "constants::CPD_WATER.to_string()")]
    pub water_seed_id: String,
    /// What to do with database keys that can't be found
    #[builder(default = "ReferenceResolution::Lenient")]
    pub resolution: ReferenceResolution,
    /// Leave single-metabolite (drain) reactions thermodynamically unconstrained
    #[builder(default = "true")]
    pub exclude_drains: bool,
    /// Estimate formation energies from structural cues for entries without direct data
    #[builder(default = "false")]
    pub estimate_from_cues: bool,
    /// Add the thermodynamic displacement variable ln(Gamma) = DG/RT for each reaction
    #[builder(default = "false")]
    pub add_displacement: bool,
    /// Add a chemical potential variable `P = DGf + RT * LC` for each metabolite with a
    /// free log concentration
    #[builder(default = "false")]
    pub add_potentials: bool,
    /// Which constraints the relaxation may loosen
    #[builder(default = "RelaxationTarget::EnergyBalance")]
    pub relaxation_target: RelaxationTarget,
    /// What the relaxation minimizes
    #[builder(default = "RelaxationObjective::ConstraintCount")]
    pub relaxation_objective: RelaxationObjective,
    /// Reactions whose constraints are never relaxed
    #[builder(default = "IndexSet::new()")]
    pub relaxation_ignored_reactions: IndexSet<String>,
    /// Metabolites whose log concentration bounds are never relaxed
    #[builder(default = "IndexSet::new()")]
    pub relaxation_ignored_metabolites: IndexSet<String>,
}

impl Default for ThermoConfiguration {
    fn default() -> Self {
        ThermoConfigurationBuilder::default()
            .build()
            .expect("every field has a default")
    }
}

impl ThermoConfiguration {
    /// Gas constant times temperature, in the given energy unit
    pub fn rt(&self, unit: EnergyUnit) -> f64 {
        unit.gas_constant() * self.temperature
    }
}

/// Policy for database keys that are missing from both the metabolite and the cue tables
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReferenceResolution {
    /// Mark the metabolite as non-computable and continue
    Lenient,
    /// Fail with [`crate::thermo::ThermoError::UnresolvedReference`]
    Strict,
}

/// Constraint families the relaxation is allowed to loosen
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RelaxationTarget {
    /// Only the energy balance `DGo - DG + RT*sum(LC) = 0`
    EnergyBalance,
    /// Only the Gibbs energy sign coupling of the use variables
    Directionality,
    /// Only the bounds of the free log concentration variables
    LogConcentration,
    /// All of the above
    All,
}

/// Objective of the relaxation problem
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RelaxationObjective {
    /// Minimize the number of loosened constraints
    ConstraintCount,
    /// Minimize the summed slack
    TotalSlack,
}
