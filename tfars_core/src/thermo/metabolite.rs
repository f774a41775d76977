//! Formation energies of metabolites at compartment conditions
//!
//! Standard formation energies are transformed to the pH and ionic strength of the
//! metabolite's compartment following Alberty's treatment of biochemical species:
//! the species is first taken to its least protonated state, the pKas are shifted by
//! the ionic strength, and the binding polynomial accounts for the protonated forms
//! present at the compartment pH (Goldberg and Tewari, 1991).
use std::f64::consts::LN_10;

use crate::configuration::ReferenceResolution;
use crate::metabolic_model::metabolite::Metabolite;
use crate::thermo::constants::{DEBYE_HUCKEL_A, DEBYE_HUCKEL_IONIC_COEFFICIENT, MAX_FORMATION_ENERGY};
use crate::thermo::database::MetaboliteRecord;
use crate::thermo::{
    CompartmentConditions, NotComputableReason, ThermoError, ThermoValue, ThermoValueEngine,
};

/// Thermodynamic annotation of a single metabolite
#[derive(Debug, Clone, PartialEq)]
pub struct MetaboliteThermo {
    /// Database key used for the lookup
    pub seed_id: Option<String>,
    pub compartment: String,
    pub ph: f64,
    pub ionic_strength: f64,
    /// Transformed formation energy at the compartment conditions
    pub delta_gf: ThermoValue,
    /// Standard formation energy used as the starting point
    pub delta_gf_std: Option<f64>,
    /// Charge in the database's reference state
    pub charge: i32,
    /// Number of protons in the database's reference state
    pub n_h: i32,
    /// Whether the standard energy was estimated from structural cues
    pub estimated: bool,
}

impl MetaboliteThermo {
    pub fn is_computable(&self) -> bool {
        self.delta_gf.is_computed()
    }
}

/// Species data at the least protonated state
#[derive(Debug, Clone, Copy, PartialEq)]
struct Species {
    delta_gf: f64,
    charge: i32,
    n_h: i32,
}

impl ThermoValueEngine<'_> {
    /// Look up and correct the formation energy of a model metabolite
    ///
    /// # Errors
    /// [`ThermoError::UnresolvedReference`] when the metabolite's key is in neither database
    /// table and the configuration asks for strict resolution. Every other gap in coverage
    /// produces a non-computable value.
    pub fn metabolite_thermo(
        &self,
        metabolite: &Metabolite,
        compartment: &str,
        conditions: &CompartmentConditions,
    ) -> Result<MetaboliteThermo, ThermoError> {
        let seed_id = metabolite.seed_id().map(|s| s.to_string());
        let mut thermo = MetaboliteThermo {
            seed_id: seed_id.clone(),
            compartment: compartment.to_string(),
            ph: conditions.ph,
            ionic_strength: conditions.ionic_strength,
            delta_gf: ThermoValue::not_computable(NotComputableReason::NoSeedId),
            delta_gf_std: None,
            charge: metabolite.charge,
            n_h: 0,
            estimated: false,
        };
        let Some(seed_id) = seed_id else {
            log::debug!("Metabolite {} has no seed_id", metabolite.id);
            return Ok(thermo);
        };
        let Some(record) = self.database().metabolite(&seed_id) else {
            if self.config().resolution == ReferenceResolution::Strict
                && !self.database().contains_key(&seed_id)
            {
                return Err(ThermoError::UnresolvedReference {
                    metabolite: metabolite.id.clone(),
                    seed_id,
                });
            }
            log::debug!(
                "Metabolite {} ({}) not present in the thermodynamic database",
                metabolite.id,
                seed_id
            );
            thermo.delta_gf = ThermoValue::not_computable(NotComputableReason::NotInDatabase);
            return Ok(thermo);
        };

        let (delta_gf, estimated) =
            self.formation_energy(record, conditions.ph, conditions.ionic_strength);
        thermo.delta_gf = delta_gf;
        thermo.estimated = estimated;
        thermo.delta_gf_std = Some(record.delta_gf_std);
        thermo.charge = record.charge_std;
        thermo.n_h = record.n_h_std;
        Ok(thermo)
    }

    /// Transformed formation energy of a database record
    ///
    /// The second element is true when the standard energy had to be estimated from the
    /// structural cues of the record.
    pub fn formation_energy(
        &self,
        record: &MetaboliteRecord,
        ph: f64,
        ionic_strength: f64,
    ) -> (ThermoValue, bool) {
        if record.id == self.config().proton_seed_id {
            return (ThermoValue::computed(self.rt() * ph * LN_10, 0.), false);
        }
        let (delta_gf_std, error, estimated) = if record.has_no_error() {
            (record.delta_gf_std, record.delta_gf_err, false)
        } else if self.config().estimate_from_cues && !record.struct_cues.is_empty() {
            let (energy, error) = self.estimate_from_cues(record);
            log::debug!("Estimated formation energy of {} from cues", record.id);
            (energy, error, true)
        } else {
            return (
                ThermoValue::not_computable(NotComputableReason::DatabaseError(
                    record.error.clone(),
                )),
                false,
            );
        };
        if delta_gf_std.abs() > MAX_FORMATION_ENERGY {
            return (
                ThermoValue::not_computable(NotComputableReason::EnergyOutOfRange),
                estimated,
            );
        }
        let value = self.transformed_energy(
            delta_gf_std,
            record.charge_std,
            record.n_h_std,
            &record.pka,
            ph,
            ionic_strength,
        );
        (ThermoValue::computed(value, error), estimated)
    }

    /// Group contribution estimate of the standard formation energy and its error
    ///
    /// Cues flagged as small add their energy but no error.
    pub fn estimate_from_cues(&self, record: &MetaboliteRecord) -> (f64, f64) {
        let mut energy = 0.;
        let mut squared_error = 0.;
        for (cue, count) in &record.struct_cues {
            // Cue references are checked when the database is built
            let Some(cue) = self.database().cue(cue) else {
                continue;
            };
            energy += count * cue.energy;
            if !cue.small {
                squared_error += (count * cue.error).powi(2);
            }
        }
        (energy, squared_error.sqrt())
    }

    /// Transform a standard formation energy to the given pH and ionic strength
    pub fn transformed_energy(
        &self,
        delta_gf_std: f64,
        charge_std: i32,
        n_h_std: i32,
        pka: &[f64],
        ph: f64,
        ionic_strength: f64,
    ) -> f64 {
        let rt = self.rt();
        let species = self.least_protonated_species(delta_gf_std, charge_std, n_h_std, pka);
        let pka = self.ionic_strength_pkas(species.charge, pka, ionic_strength);
        let polynomial = self.binding_polynomial(&pka, ph);

        let sqrt_i = ionic_strength.sqrt();
        let proton_term = species.n_h as f64 * rt * -(ph * LN_10);
        let ionic_term = DEBYE_HUCKEL_IONIC_COEFFICIENT
            * ((species.charge * species.charge - species.n_h) as f64)
            * sqrt_i
            / (1. + self.config().debye_huckel_b * sqrt_i)
            / self.unit().debye_huckel_adjustment();
        let species_energy = species.delta_gf - (proton_term + ionic_term);
        species_energy - rt * polynomial.ln()
    }

    /// Energy, charge and proton count of the least protonated species within the pH window
    fn least_protonated_species(
        &self,
        delta_gf_std: f64,
        charge_std: i32,
        n_h_std: i32,
        pka: &[f64],
    ) -> Species {
        let config = self.config();
        let reference = Species {
            delta_gf: delta_gf_std,
            charge: charge_std,
            n_h: n_h_std,
        };
        if !pka.iter().any(|p| config.min_ph < *p && *p < config.max_ph) {
            return reference;
        }
        let below_max: Vec<f64> = pka.iter().copied().filter(|p| *p < config.max_ph).collect();
        let charge = -(below_max.len() as i32);
        if charge == charge_std {
            return reference;
        }
        let steps = charge_std - charge;
        let start = (below_max.len() as i32 - steps).max(0) as usize;
        let rt = self.rt();
        // Each dissociation crossed adds RT*ln(10)*pKa
        let delta_gf = below_max
            .iter()
            .skip(start)
            .fold(delta_gf_std, |acc, p| acc + rt * p * LN_10);
        Species {
            delta_gf,
            charge,
            n_h: n_h_std - steps,
        }
    }

    /// pKas inside the pH window, shifted by the ionic strength, in descending order
    fn ionic_strength_pkas(&self, charge: i32, pka: &[f64], ionic_strength: f64) -> Vec<f64> {
        let config = self.config();
        let mut window: Vec<f64> = pka
            .iter()
            .copied()
            .filter(|p| config.min_ph < *p && *p < config.max_ph)
            .collect();
        window.sort_by(|a, b| b.total_cmp(a));

        let sqrt_i = ionic_strength.sqrt();
        let shift = DEBYE_HUCKEL_A * sqrt_i / (1. + config.debye_huckel_b * sqrt_i);
        let mut corrected: Vec<f64> = match window.len() {
            0 => Vec::new(),
            1 => vec![window[0] + 2. * charge as f64 * shift],
            _ => window
                .iter()
                .enumerate()
                .map(|(i, p)| {
                    let z = (charge + i as i32) as f64;
                    let sigma_nu_sq = 1. + z * z - (z - 1.) * (z - 1.);
                    p + sigma_nu_sq * shift
                })
                .collect(),
        };
        corrected.sort_by(|a, b| b.total_cmp(a));
        corrected
    }

    /// Binding polynomial of the protonated forms at the given pH
    fn binding_polynomial(&self, pka: &[f64], ph: f64) -> f64 {
        let below_max = pka
            .iter()
            .copied()
            .reduce(f64::min)
            .is_some_and(|min| min <= self.config().max_ph);
        if !below_max {
            return 1.;
        }
        let mut polynomial = 1.;
        let mut denominator = 1.;
        for (i, p) in pka.iter().enumerate() {
            denominator *= 10f64.powf(-p);
            polynomial += 10f64.powf(-((i + 1) as f64) * ph) / denominator;
        }
        polynomial
    }
}
