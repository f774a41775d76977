//! Reference thermodynamic database of metabolites and structural cues
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::thermo::constants::NO_ERROR;
use crate::thermo::DataError;

/// Energy unit of a database, every value derived from it uses the same unit
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnergyUnit {
    #[serde(rename = "kcal/mol")]
    KcalPerMol,
    #[serde(rename = "kJ/mol")]
    KjPerMol,
}

impl EnergyUnit {
    /// Gas constant, per K per mol
    pub fn gas_constant(&self) -> f64 {
        match self {
            EnergyUnit::KjPerMol => 8.314472e-3,
            EnergyUnit::KcalPerMol => 1.9858775e-3,
        }
    }

    /// Faraday constant, per eV
    pub fn faraday(&self) -> f64 {
        match self {
            EnergyUnit::KjPerMol => 96.485,
            EnergyUnit::KcalPerMol => 23.061,
        }
    }

    /// Divisor bringing the (kJ based) Debye-Hückel term into this unit
    pub fn debye_huckel_adjustment(&self) -> f64 {
        match self {
            EnergyUnit::KjPerMol => 1.,
            EnergyUnit::KcalPerMol => 4.184,
        }
    }
}

/// Thermodynamic record of a metabolite under standard conditions
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MetaboliteRecord {
    pub id: String,
    pub charge_std: i32,
    #[serde(rename = "deltaGf_std")]
    pub delta_gf_std: f64,
    #[serde(rename = "deltaGf_err")]
    pub delta_gf_err: f64,
    #[serde(default)]
    pub mass_std: Option<f64>,
    #[serde(rename = "nH_std")]
    pub n_h_std: i32,
    /// Error code, [`NO_ERROR`] for usable entries
    pub error: String,
    #[serde(default)]
    pub formula: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub other_names: Vec<String>,
    #[serde(rename = "pKa", default)]
    pub pka: Vec<f64>,
    /// Number of occurrences of each structural cue
    #[serde(default)]
    pub struct_cues: IndexMap<String, f64>,
}

impl MetaboliteRecord {
    /// Whether the record carries directly usable values
    pub fn has_no_error(&self) -> bool {
        self.error == NO_ERROR
    }
}

/// Structural group used for group contribution estimates
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CueRecord {
    pub id: String,
    #[serde(default)]
    pub charge: i32,
    pub energy: f64,
    pub error: f64,
    #[serde(default)]
    pub formula: Option<String>,
    #[serde(default)]
    pub names: Vec<String>,
    /// Small cues contribute no error
    #[serde(default)]
    pub small: bool,
}

/// Read only store of standard thermodynamic data
///
/// Every record is validated on construction, so lookups never have to deal with
/// malformed entries.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ThermoDatabase {
    name: String,
    units: EnergyUnit,
    metabolites: IndexMap<String, MetaboliteRecord>,
    cues: IndexMap<String, CueRecord>,
}

impl ThermoDatabase {
    /// Create a database, validating every record
    pub fn new(
        name: &str,
        units: EnergyUnit,
        metabolites: IndexMap<String, MetaboliteRecord>,
        cues: IndexMap<String, CueRecord>,
    ) -> Result<Self, DataError> {
        for (key, cue) in &cues {
            validate_cue(key, cue)?;
        }
        for (key, met) in &metabolites {
            validate_metabolite(key, met, &cues)?;
        }
        log::debug!(
            "Loaded thermodynamic database {} with {} metabolites and {} cues",
            name,
            metabolites.len(),
            cues.len()
        );
        Ok(ThermoDatabase {
            name: name.to_string(),
            units,
            metabolites,
            cues,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn units(&self) -> EnergyUnit {
        self.units
    }

    pub fn metabolites(&self) -> &IndexMap<String, MetaboliteRecord> {
        &self.metabolites
    }

    pub fn cues(&self) -> &IndexMap<String, CueRecord> {
        &self.cues
    }

    /// Look up a metabolite record by database key
    pub fn metabolite(&self, seed_id: &str) -> Option<&MetaboliteRecord> {
        self.metabolites.get(seed_id)
    }

    /// Look up a cue by id
    pub fn cue(&self, cue_id: &str) -> Option<&CueRecord> {
        self.cues.get(cue_id)
    }

    /// Whether the key names a metabolite or a cue
    pub fn contains_key(&self, key: &str) -> bool {
        self.metabolites.contains_key(key) || self.cues.contains_key(key)
    }
}

fn invalid(entry: &str, field: &str, value: f64) -> DataError {
    DataError::InvalidValue {
        entry: entry.to_string(),
        field: field.to_string(),
        value,
    }
}

fn validate_cue(key: &str, cue: &CueRecord) -> Result<(), DataError> {
    if key != cue.id {
        return Err(DataError::KeyMismatch {
            key: key.to_string(),
            id: cue.id.clone(),
        });
    }
    if !cue.energy.is_finite() {
        return Err(invalid(key, "energy", cue.energy));
    }
    if !cue.error.is_finite() || cue.error < 0. {
        return Err(invalid(key, "error", cue.error));
    }
    Ok(())
}

fn validate_metabolite(
    key: &str,
    met: &MetaboliteRecord,
    cues: &IndexMap<String, CueRecord>,
) -> Result<(), DataError> {
    if key != met.id {
        return Err(DataError::KeyMismatch {
            key: key.to_string(),
            id: met.id.clone(),
        });
    }
    if !met.delta_gf_std.is_finite() {
        return Err(invalid(key, "deltaGf_std", met.delta_gf_std));
    }
    if !met.delta_gf_err.is_finite() || met.delta_gf_err < 0. {
        return Err(invalid(key, "deltaGf_err", met.delta_gf_err));
    }
    if let Some(pka) = met.pka.iter().find(|pka| !pka.is_finite()) {
        return Err(invalid(key, "pKa", *pka));
    }
    for (cue, count) in &met.struct_cues {
        if !cues.contains_key(cue) {
            return Err(DataError::UnknownCue {
                metabolite: key.to_string(),
                cue: cue.clone(),
            });
        }
        if !count.is_finite() {
            return Err(invalid(key, "struct_cues", *count));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, delta_gf_std: f64, error: &str) -> MetaboliteRecord {
        MetaboliteRecord {
            id: id.to_string(),
            charge_std: 0,
            delta_gf_std,
            delta_gf_err: 0.5,
            mass_std: None,
            n_h_std: 0,
            error: error.to_string(),
            formula: None,
            name: None,
            other_names: Vec::new(),
            pka: Vec::new(),
            struct_cues: IndexMap::new(),
        }
    }

    fn cue(id: &str) -> CueRecord {
        CueRecord {
            id: id.to_string(),
            charge: 0,
            energy: -5.,
            error: 0.3,
            formula: None,
            names: Vec::new(),
            small: false,
        }
    }

    #[test]
    fn unit_constants() {
        assert_eq!(EnergyUnit::KjPerMol.gas_constant(), 8.314472e-3);
        assert_eq!(EnergyUnit::KcalPerMol.faraday(), 23.061);
        assert_eq!(EnergyUnit::KcalPerMol.debye_huckel_adjustment(), 4.184);
        let unit: EnergyUnit = serde_json::from_str("\"kJ/mol\"").unwrap();
        assert_eq!(unit, EnergyUnit::KjPerMol);
        assert!(serde_json::from_str::<EnergyUnit>("\"eV\"").is_err());
    }

    #[test]
    fn valid_database() {
        let mut metabolites = IndexMap::new();
        metabolites.insert("cpd1".to_string(), record("cpd1", -10., "Nil"));
        let mut cues = IndexMap::new();
        cues.insert("OH".to_string(), cue("OH"));
        let db = ThermoDatabase::new("test", EnergyUnit::KcalPerMol, metabolites, cues).unwrap();
        assert_eq!(db.name(), "test");
        assert!(db.metabolite("cpd1").unwrap().has_no_error());
        assert!(db.contains_key("OH"));
        assert!(!db.contains_key("cpd2"));
    }

    #[test]
    fn reject_malformed_entries() {
        let mut metabolites = IndexMap::new();
        metabolites.insert("cpd1".to_string(), record("cpd2", -10., "Nil"));
        assert!(matches!(
            ThermoDatabase::new("test", EnergyUnit::KcalPerMol, metabolites, IndexMap::new()),
            Err(DataError::KeyMismatch { .. })
        ));

        let mut bad_error = record("cpd1", -10., "Nil");
        bad_error.delta_gf_err = -1.;
        let mut metabolites = IndexMap::new();
        metabolites.insert("cpd1".to_string(), bad_error);
        assert!(matches!(
            ThermoDatabase::new("test", EnergyUnit::KcalPerMol, metabolites, IndexMap::new()),
            Err(DataError::InvalidValue { .. })
        ));

        let mut missing_cue = record("cpd1", -10., "Nil");
        missing_cue.struct_cues.insert("COOH".to_string(), 1.);
        let mut metabolites = IndexMap::new();
        metabolites.insert("cpd1".to_string(), missing_cue);
        assert!(matches!(
            ThermoDatabase::new("test", EnergyUnit::KcalPerMol, metabolites, IndexMap::new()),
            Err(DataError::UnknownCue { .. })
        ));
    }
}
