//! Thermodynamic data: the reference database, the value engine correcting formation
//! energies to compartment conditions, and the annotator attaching the results to a model
pub mod annotate;
pub mod constants;
pub mod database;
pub mod metabolite;
pub mod reaction;

use indexmap::IndexMap;
use thiserror::Error;

use crate::configuration::ThermoConfiguration;
use crate::metabolic_model::compartment::Compartment;
use crate::metabolic_model::model::ModelError;
use crate::optimize::problem::ProblemError;
use crate::optimize::OptimizationStatus;
use crate::thermo::database::{EnergyUnit, ThermoDatabase};

/// Result of a thermodynamic computation
#[derive(Debug, Clone, PartialEq)]
pub enum ThermoValue {
    /// Value with its (non-negative) error bound
    Computed { value: f64, error: f64 },
    /// No value could be derived
    NotComputable { reason: NotComputableReason },
}

impl ThermoValue {
    pub fn computed(value: f64, error: f64) -> Self {
        ThermoValue::Computed { value, error }
    }

    pub fn not_computable(reason: NotComputableReason) -> Self {
        ThermoValue::NotComputable { reason }
    }

    pub fn is_computed(&self) -> bool {
        matches!(self, ThermoValue::Computed { .. })
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            ThermoValue::Computed { value, .. } => Some(*value),
            ThermoValue::NotComputable { .. } => None,
        }
    }

    pub fn error(&self) -> Option<f64> {
        match self {
            ThermoValue::Computed { error, .. } => Some(*error),
            ThermoValue::NotComputable { .. } => None,
        }
    }

    /// Why the value is missing, None if it was computed
    pub fn reason(&self) -> Option<&NotComputableReason> {
        match self {
            ThermoValue::Computed { .. } => None,
            ThermoValue::NotComputable { reason } => Some(reason),
        }
    }
}

/// Why a metabolite or reaction has no thermodynamic value
#[derive(Debug, Clone, PartialEq)]
pub enum NotComputableReason {
    /// The metabolite carries no database key annotation
    NoSeedId,
    /// The database key is absent from the metabolite table
    NotInDatabase,
    /// The database entry is flagged with an error code
    DatabaseError(String),
    /// The standard formation energy is outside the plausible range
    EnergyOutOfRange,
    /// The reaction references a metabolite without a value
    UncomputableMetabolite(String),
    /// Single metabolite reaction excluded from thermodynamic constraints
    Drain,
    /// The reaction has no metabolites
    NoMetabolites,
}

/// Validated thermodynamic conditions of a compartment
#[derive(Debug, Clone, PartialEq)]
pub struct CompartmentConditions {
    /// Lowest concentration (M)
    pub c_min: f64,
    /// Highest concentration (M)
    pub c_max: f64,
    pub ph: f64,
    /// Ionic strength (M)
    pub ionic_strength: f64,
    /// Membrane potential (mV) towards other compartments, keyed by their id
    pub membrane_potential: IndexMap<String, f64>,
}

impl CompartmentConditions {
    /// Check that a compartment carries every field needed for thermodynamics
    pub fn from_compartment(compartment: &Compartment) -> Result<Self, ThermoError> {
        let require = |value: Option<f64>, field: &str| {
            value.ok_or_else(|| ThermoError::MissingCompartmentData {
                compartment: compartment.id.clone(),
                field: field.to_string(),
            })
        };
        let c_min = require(compartment.c_min, "c_min")?;
        let c_max = require(compartment.c_max, "c_max")?;
        let ph = require(compartment.ph, "pH")?;
        let ionic_strength = require(compartment.ionic_strength, "ionicStr")?;

        let invalid = |field: &str, value: f64| DataError::InvalidValue {
            entry: compartment.id.clone(),
            field: field.to_string(),
            value,
        };
        if !(c_min > 0.) || !c_min.is_finite() {
            return Err(invalid("c_min", c_min).into());
        }
        if !(c_max >= c_min) || !c_max.is_finite() {
            return Err(invalid("c_max", c_max).into());
        }
        if !ph.is_finite() {
            return Err(invalid("pH", ph).into());
        }
        if !(ionic_strength >= 0.) || !ionic_strength.is_finite() {
            return Err(invalid("ionicStr", ionic_strength).into());
        }
        Ok(CompartmentConditions {
            c_min,
            c_max,
            ph,
            ionic_strength,
            membrane_potential: compartment.membrane_potential.clone(),
        })
    }

    /// Membrane potential (mV) from this compartment into `other`
    pub fn potential_to(&self, from: &str, other: &str) -> Result<f64, DataError> {
        if from == other {
            return Ok(0.);
        }
        self.membrane_potential
            .get(other)
            .copied()
            .ok_or_else(|| DataError::MissingMembranePotential {
                from: from.to_string(),
                to: other.to_string(),
            })
    }
}

/// Computes corrected formation energies and reaction energies from the database
///
/// The engine only borrows the database and the configuration, so several engines with
/// different regimes can share a single database.
#[derive(Debug, Clone, Copy)]
pub struct ThermoValueEngine<'a> {
    database: &'a ThermoDatabase,
    config: &'a ThermoConfiguration,
}

impl<'a> ThermoValueEngine<'a> {
    pub fn new(database: &'a ThermoDatabase, config: &'a ThermoConfiguration) -> Self {
        ThermoValueEngine { database, config }
    }

    pub fn database(&self) -> &'a ThermoDatabase {
        self.database
    }

    pub fn config(&self) -> &'a ThermoConfiguration {
        self.config
    }

    /// Energy unit of every value produced
    pub fn unit(&self) -> EnergyUnit {
        self.database.units()
    }

    /// Gas constant times temperature in the database unit
    pub fn rt(&self) -> f64 {
        self.config.rt(self.unit())
    }
}

/// Malformed or missing data
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DataError {
    #[error("Unable to read thermodynamic data due to {0}")]
    UnableToRead(String),
    #[error("Unable to parse thermodynamic data due to {0}")]
    UnableToParse(String),
    #[error("Entry stored under {key} has id {id}")]
    KeyMismatch { key: String, id: String },
    #[error("Invalid value {value} for field {field} of {entry}")]
    InvalidValue {
        entry: String,
        field: String,
        value: f64,
    },
    #[error("Metabolite {metabolite} references unknown cue {cue}")]
    UnknownCue { metabolite: String, cue: String },
    #[error("Metabolite {0} has no compartment")]
    MissingCompartment(String),
    #[error("Metabolite {metabolite} is in compartment {compartment}, which is not in the model")]
    UnknownCompartment {
        metabolite: String,
        compartment: String,
    },
    #[error("No membrane potential defined from compartment {from} to {to}")]
    MissingMembranePotential { from: String, to: String },
}

/// Errors raised while preparing, converting or relaxing a thermodynamic model
#[derive(Error, Debug, Clone)]
pub enum ThermoError {
    #[error("Invalid data: {0}")]
    Data(#[from] DataError),
    #[error("Metabolite {metabolite} references {seed_id}, which is in neither the metabolite nor the cue table")]
    UnresolvedReference { metabolite: String, seed_id: String },
    #[error("Compartment {compartment} is missing {field}")]
    MissingCompartmentData { compartment: String, field: String },
    #[error("Model error: {0}")]
    Model(#[from] ModelError),
    #[error("Problem error: {0}")]
    Problem(#[from] ProblemError),
    #[error("Relaxation did not finish, solver status {status:?}")]
    RelaxationInconclusive { status: OptimizationStatus },
    #[error("Model has to be prepared before conversion")]
    NotPrepared,
    #[error("Flux bounds ({lower_bound}, {upper_bound}) of reaction {reaction} exceed the big-M of {big_m}")]
    FluxBoundsTooWide {
        reaction: String,
        lower_bound: f64,
        upper_bound: f64,
        big_m: f64,
    },
}
