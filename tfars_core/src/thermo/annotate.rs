//! Attach thermodynamic values to the metabolites and reactions of a model
use std::fmt::{Display, Formatter};

use indexmap::IndexMap;

use crate::configuration::ThermoConfiguration;
use crate::metabolic_model::model::Model;
use crate::thermo::database::ThermoDatabase;
use crate::thermo::metabolite::MetaboliteThermo;
use crate::thermo::reaction::ReactionThermo;
use crate::thermo::{CompartmentConditions, DataError, ThermoError, ThermoValueEngine};

/// Thermodynamic side table of a model, keyed by metabolite, reaction and compartment id
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ThermoAnnotations {
    pub metabolites: IndexMap<String, MetaboliteThermo>,
    pub reactions: IndexMap<String, ReactionThermo>,
    /// Conditions of every compartment referenced by a metabolite
    pub compartments: IndexMap<String, CompartmentConditions>,
}

impl ThermoAnnotations {
    /// Coverage of the annotation
    pub fn summary(&self) -> ThermoSummary {
        ThermoSummary {
            metabolites: self.metabolites.len(),
            computable_metabolites: self
                .metabolites
                .values()
                .filter(|m| m.is_computable())
                .count(),
            reactions: self.reactions.len(),
            computed_reactions: self.reactions.values().filter(|r| r.is_computed()).count(),
            transport_reactions: self.reactions.values().filter(|r| r.is_transport).count(),
        }
    }
}

/// Counts of annotated entities
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThermoSummary {
    pub metabolites: usize,
    pub computable_metabolites: usize,
    pub reactions: usize,
    pub computed_reactions: usize,
    pub transport_reactions: usize,
}

impl ThermoSummary {
    /// Percentage of metabolites with a formation energy
    pub fn metabolite_coverage(&self) -> f64 {
        percentage(self.computable_metabolites, self.metabolites)
    }

    /// Percentage of reactions with a reaction energy
    pub fn reaction_coverage(&self) -> f64 {
        percentage(self.computed_reactions, self.reactions)
    }
}

fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.
    } else {
        100. * part as f64 / total as f64
    }
}

impl Display for ThermoSummary {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{} metabolites ({:.2}%) and {}/{} reactions ({:.2}%) have thermodynamics, {} transport reactions",
            self.computable_metabolites,
            self.metabolites,
            self.metabolite_coverage(),
            self.computed_reactions,
            self.reactions,
            self.reaction_coverage(),
            self.transport_reactions
        )
    }
}

/// Matches model entities to the thermodynamic database
///
/// # Examples
/// ```rust
/// use indexmap::IndexMap;
/// use tfars_core::configuration::ThermoConfiguration;
/// use tfars_core::metabolic_model::model::Model;
/// use tfars_core::thermo::annotate::ModelAnnotator;
/// use tfars_core::thermo::database::{EnergyUnit, ThermoDatabase};
///
/// let db = ThermoDatabase::new("empty", EnergyUnit::KcalPerMol, IndexMap::new(), IndexMap::new()).unwrap();
/// let config = ThermoConfiguration::default();
/// let annotations = ModelAnnotator::new(&db, &config).annotate(&Model::new_empty()).unwrap();
/// assert!(annotations.reactions.is_empty());
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ModelAnnotator<'a> {
    engine: ThermoValueEngine<'a>,
}

impl<'a> ModelAnnotator<'a> {
    pub fn new(database: &'a ThermoDatabase, config: &'a ThermoConfiguration) -> Self {
        ModelAnnotator {
            engine: ThermoValueEngine::new(database, config),
        }
    }

    /// Build the thermodynamic side table of a model
    ///
    /// The model itself is left untouched, calling this twice yields the same annotations.
    ///
    /// # Errors
    /// Fails when a referenced compartment lacks concentration bounds, pH or ionic
    /// strength, when a metabolite has no compartment, or when a database key cannot be
    /// resolved under strict resolution.
    pub fn annotate(&self, model: &Model) -> Result<ThermoAnnotations, ThermoError> {
        let mut annotations = ThermoAnnotations::default();

        for met in model.metabolites.values() {
            let compartment_id = met
                .compartment
                .as_deref()
                .ok_or_else(|| DataError::MissingCompartment(met.id.clone()))?;
            if !annotations.compartments.contains_key(compartment_id) {
                let compartment = model.compartments.get(compartment_id).ok_or_else(|| {
                    DataError::UnknownCompartment {
                        metabolite: met.id.clone(),
                        compartment: compartment_id.to_string(),
                    }
                })?;
                let conditions = CompartmentConditions::from_compartment(compartment)?;
                annotations
                    .compartments
                    .insert(compartment_id.to_string(), conditions);
            }
            let conditions = &annotations.compartments[compartment_id];
            let thermo = self
                .engine
                .metabolite_thermo(met, compartment_id, conditions)?;
            if thermo.estimated {
                log::warn!(
                    "Formation energy of {} was estimated from structural cues",
                    met.id
                );
            }
            annotations.metabolites.insert(met.id.clone(), thermo);
        }

        for reaction in model.reactions.values() {
            let thermo = self.engine.reaction_thermo(
                reaction,
                &annotations.metabolites,
                &annotations.compartments,
            )?;
            annotations.reactions.insert(reaction.id.clone(), thermo);
        }
        Ok(annotations)
    }
}
