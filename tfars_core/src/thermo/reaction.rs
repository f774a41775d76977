//! Gibbs energies of reaction, including the membrane transport contribution
use std::f64::consts::LN_10;

use indexmap::IndexMap;

use crate::metabolic_model::model::ModelError;
use crate::metabolic_model::reaction::Reaction;
use crate::thermo::constants::DEFAULT_REACTION_ERROR;
use crate::thermo::metabolite::MetaboliteThermo;
use crate::thermo::{
    CompartmentConditions, NotComputableReason, ThermoError, ThermoValue, ThermoValueEngine,
};

/// Thermodynamic annotation of a single reaction
#[derive(Debug, Clone, PartialEq)]
pub struct ReactionThermo {
    /// Concentration independent part of the reaction Gibbs energy, with its error bound
    pub delta_gr: ThermoValue,
    /// Chemical part of the Gibbs energy, excluding the transport terms
    pub delta_grxn: Option<f64>,
    /// Whether the same database species is both consumed and produced
    pub is_transport: bool,
}

impl ReactionThermo {
    pub fn is_computed(&self) -> bool {
        self.delta_gr.is_computed()
    }
}

/// A database species moved between compartments by a reaction
#[derive(Debug, Clone, PartialEq)]
pub struct TransportedSpecies {
    /// Consumed metabolite
    pub reactant: String,
    /// Produced metabolite
    pub product: String,
    /// Largest absolute stoichiometric coefficient of the pair
    pub coefficient: f64,
}

/// Species transported by a reaction, keyed by database key
///
/// A species counts as transported when a reactant and a product share a database key.
/// Metabolites without key or annotation are never transported.
pub fn transported_species(
    reaction: &Reaction,
    metabolites: &IndexMap<String, MetaboliteThermo>,
) -> IndexMap<String, TransportedSpecies> {
    let seed_of = |met_id: &str| {
        metabolites
            .get(met_id)
            .and_then(|thermo| thermo.seed_id.clone())
    };
    let reactants: IndexMap<String, (&str, f64)> = reaction
        .metabolites
        .iter()
        .filter(|(_, coef)| **coef < 0.)
        .filter_map(|(met, coef)| seed_of(met).map(|seed| (seed, (met.as_str(), *coef))))
        .collect();

    let mut transported = IndexMap::new();
    for (met, coef) in reaction.metabolites.iter().filter(|(_, coef)| **coef > 0.) {
        let Some(seed) = seed_of(met) else { continue };
        if let Some((reactant, reactant_coef)) = reactants.get(&seed) {
            transported.insert(
                seed,
                TransportedSpecies {
                    reactant: reactant.to_string(),
                    product: met.clone(),
                    coefficient: reactant_coef.abs().max(coef.abs()),
                },
            );
        }
    }
    transported
}

impl ThermoValueEngine<'_> {
    /// Compute the Gibbs energy of a reaction from the annotations of its metabolites
    ///
    /// Protons are left out of the sum, their contribution is fixed by the compartment pH.
    /// A reaction with any non-computable metabolite is itself not computable.
    ///
    /// # Errors
    /// A [`crate::thermo::DataError`] when a transport reaction crosses a membrane without
    /// a defined potential, or a [`ModelError`] when the reaction references a metabolite
    /// without annotation.
    pub fn reaction_thermo(
        &self,
        reaction: &Reaction,
        metabolites: &IndexMap<String, MetaboliteThermo>,
        compartments: &IndexMap<String, CompartmentConditions>,
    ) -> Result<ReactionThermo, ThermoError> {
        let transported = transported_species(reaction, metabolites);
        let mut thermo = ReactionThermo {
            delta_gr: ThermoValue::not_computable(NotComputableReason::NoMetabolites),
            delta_grxn: None,
            is_transport: !transported.is_empty(),
        };
        if reaction.metabolites.is_empty() {
            return Ok(thermo);
        }
        if self.config().exclude_drains && reaction.is_boundary() {
            log::debug!("{} : drain, thermo constraint NOT created", reaction.id);
            thermo.delta_gr = ThermoValue::not_computable(NotComputableReason::Drain);
            return Ok(thermo);
        }

        let mut energies = IndexMap::with_capacity(reaction.metabolites.len());
        for met_id in reaction.metabolites.keys() {
            let met = metabolites
                .get(met_id)
                .ok_or_else(|| ModelError::UnknownMetabolite {
                    reaction: reaction.id.clone(),
                    metabolite: met_id.clone(),
                })?;
            match met.delta_gf.value() {
                Some(value) => {
                    energies.insert(met_id.as_str(), (value, met.delta_gf.error().unwrap_or(0.)))
                }
                None => {
                    log::debug!(
                        "{} : metabolite {} has no formation energy, thermo constraint NOT created",
                        reaction.id,
                        met_id
                    );
                    thermo.delta_gr = ThermoValue::not_computable(
                        NotComputableReason::UncomputableMetabolite(met_id.clone()),
                    );
                    return Ok(thermo);
                }
            };
        }

        let proton = self.config().proton_seed_id.as_str();
        let is_proton = |met_id: &str| {
            metabolites
                .get(met_id)
                .and_then(|m| m.seed_id.as_deref())
                .is_some_and(|seed| seed == proton)
        };

        let mut error = 0.;
        let mut chemical = 0.;
        for (met_id, coef) in &reaction.metabolites {
            if is_proton(met_id) {
                continue;
            }
            let (value, met_error) = energies[met_id.as_str()];
            chemical += coef * value;
            error += coef.abs() * met_error;
        }

        let value = if thermo.is_transport {
            let (value, chemical) =
                self.transport_energy(reaction, &transported, metabolites, compartments)?;
            thermo.delta_grxn = Some(chemical);
            value
        } else {
            thermo.delta_grxn = Some(chemical);
            chemical
        };
        if error == 0. {
            // An exact zero error pins DGo and can leave no feasible flux direction
            error = DEFAULT_REACTION_ERROR;
        }
        log::debug!("{} : thermo constraint created", reaction.id);
        thermo.delta_gr = ThermoValue::computed(value, error);
        Ok(thermo)
    }

    /// Right hand side of a transport reaction's energy balance and its chemical part
    fn transport_energy(
        &self,
        reaction: &Reaction,
        transported: &IndexMap<String, TransportedSpecies>,
        metabolites: &IndexMap<String, MetaboliteThermo>,
        compartments: &IndexMap<String, CompartmentConditions>,
    ) -> Result<(f64, f64), ThermoError> {
        let rt = self.rt();
        let faraday = self.unit().faraday();
        let proton = self.config().proton_seed_id.as_str();
        let water = self.config().water_seed_id.as_str();
        let met = |met_id: &str| {
            metabolites
                .get(met_id)
                .ok_or_else(|| ModelError::UnknownMetabolite {
                    reaction: reaction.id.clone(),
                    metabolite: met_id.to_string(),
                })
        };
        let energy = |thermo: &MetaboliteThermo| thermo.delta_gf.value().unwrap_or(0.);

        let mut stoich_n_h = 0.;
        let mut transported_energy = 0.;
        let mut proton_concentration = 0.;
        let mut membrane = 0.;
        for (seed, species) in transported {
            let c = species.coefficient;
            for (met_id, sign) in [(&species.reactant, -1.), (&species.product, 1.)] {
                let thermo = met(met_id)?;
                let ln_h = -thermo.ph * LN_10;
                if seed != water {
                    stoich_n_h += sign * c * thermo.n_h as f64 * rt * ln_h;
                    transported_energy += sign * c * energy(thermo);
                }
                if seed == proton {
                    proton_concentration += sign * rt * c * ln_h;
                }
            }
            if seed != water {
                let reactant = met(&species.reactant)?;
                let product = met(&species.product)?;
                let outside = compartments.get(&reactant.compartment).ok_or_else(|| {
                    ThermoError::MissingCompartmentData {
                        compartment: reactant.compartment.clone(),
                        field: "membranePot".to_string(),
                    }
                })?;
                let potential = outside.potential_to(&reactant.compartment, &product.compartment)?;
                membrane += faraday * (potential / 1000.) * c * reactant.charge as f64;
            }
        }

        // What remains once the transported amounts are taken out is the chemical reaction
        let mut chemical_coefficients = reaction.metabolites.clone();
        for species in transported.values() {
            if let Some(coef) = chemical_coefficients.get_mut(&species.reactant) {
                *coef += species.coefficient;
            }
            if let Some(coef) = chemical_coefficients.get_mut(&species.product) {
                *coef -= species.coefficient;
            }
        }
        let mut chemical = 0.;
        for (met_id, coef) in &chemical_coefficients {
            let thermo = met(met_id)?;
            if *coef != 0. && thermo.seed_id.as_deref() != Some(proton) {
                chemical += coef * energy(thermo);
            }
        }

        let total =
            stoich_n_h + membrane + transported_energy + proton_concentration + chemical;
        Ok((total, chemical))
    }
}
