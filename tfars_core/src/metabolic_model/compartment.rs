//! This module provides a struct for representing compartments and their physiological conditions
use derive_builder::Builder;
use indexmap::IndexMap;

/// Represents a compartment of the metabolic model
///
/// The physiological fields are only needed for thermodynamic modeling, a plain
/// constraint based model can leave them unset.
#[derive(Builder, Debug, Clone, PartialEq)]
#[builder(setter(into))]
pub struct Compartment {
    /// Short identifier, referenced by metabolites
    pub id: String,
    /// Human readable name of the compartment
    #[builder(default = "None")]
    pub name: Option<String>,
    /// Lowest allowed metabolite concentration (M)
    #[builder(default = "None")]
    pub c_min: Option<f64>,
    /// Highest allowed metabolite concentration (M)
    #[builder(default = "None")]
    pub c_max: Option<f64>,
    #[builder(default = "None")]
    pub ph: Option<f64>,
    /// Ionic strength (M)
    #[builder(default = "None")]
    pub ionic_strength: Option<f64>,
    /// Membrane potential (mV) towards other compartments, keyed by compartment id
    #[builder(default = "IndexMap::new()")]
    pub membrane_potential: IndexMap<String, f64>,
}

impl Compartment {
    /// Create a compartment carrying only an id and a name
    pub fn new_named(id: &str, name: Option<&str>) -> Self {
        Compartment {
            id: id.to_string(),
            name: name.map(|n| n.to_string()),
            c_min: None,
            c_max: None,
            ph: None,
            ionic_strength: None,
            membrane_potential: IndexMap::new(),
        }
    }

    /// Whether every field needed for thermodynamic modeling is set
    pub fn has_thermo_data(&self) -> bool {
        self.c_min.is_some()
            && self.c_max.is_some()
            && self.ph.is_some()
            && self.ionic_strength.is_some()
    }
}
