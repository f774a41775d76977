//! Module providing JSON IO for Models and thermodynamic databases
use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::metabolic_model::compartment::Compartment;
use crate::metabolic_model::metabolite::Metabolite;
use crate::metabolic_model::model::Model;
use crate::metabolic_model::reaction::{Reaction, ReactionBuilder, ReactionBuilderError};
use crate::thermo::database::{CueRecord, EnergyUnit, MetaboliteRecord, ThermoDatabase};
use crate::thermo::DataError;

// region JSON Model
/// Represents a JSON serialized model, used for reading and writing models in json format
#[derive(Serialize, Deserialize)]
struct JsonModel {
    metabolites: Vec<JsonMetabolite>,
    reactions: Vec<JsonReaction>,
    /// Genes are kept out of the model, but COBRA tools expect the key
    #[serde(default)]
    genes: Vec<Value>,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    compartments: Option<IndexMap<String, JsonCompartment>>,
    #[serde(default)]
    version: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct JsonMetabolite {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    compartment: Option<String>,
    #[serde(default)]
    charge: Option<i32>,
    #[serde(default)]
    formula: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    notes: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    annotation: Option<Value>,
}

#[derive(Serialize, Deserialize)]
struct JsonReaction {
    id: String,
    #[serde(default)]
    name: Option<String>,
    metabolites: IndexMap<String, f64>,
    lower_bound: f64,
    upper_bound: f64,
    #[serde(default)]
    gene_reaction_rule: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    objective_coefficient: Option<f64>,
    #[serde(default)]
    subsystem: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    notes: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    annotation: Option<Value>,
}

/// A compartment is either just its name, or a record carrying its physiological conditions
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum JsonCompartment {
    Name(String),
    Record(JsonCompartmentRecord),
}

#[derive(Serialize, Deserialize)]
struct JsonCompartmentRecord {
    #[serde(default)]
    symbol: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    c_min: Option<f64>,
    #[serde(default)]
    c_max: Option<f64>,
    #[serde(rename = "pH", default)]
    ph: Option<f64>,
    #[serde(rename = "ionicStr", default)]
    ionic_strength: Option<f64>,
    #[serde(rename = "membranePot", default)]
    membrane_potential: IndexMap<String, f64>,
}
// endregion JSON Model

// region Conversions
/// Flatten an annotation object into a string map, lists are reduced to their first element
fn flatten_annotation(annotation: Option<Value>) -> IndexMap<String, String> {
    let Some(Value::Object(map)) = annotation else {
        return IndexMap::new();
    };
    map.into_iter()
        .filter_map(|(key, value)| {
            let flat = match value {
                Value::String(s) => Some(s),
                Value::Array(values) => values.into_iter().next().map(|v| match v {
                    Value::String(s) => s,
                    other => other.to_string(),
                }),
                Value::Null => None,
                other => Some(other.to_string()),
            };
            flat.map(|v| (key, v))
        })
        .collect()
}

fn annotation_to_value(annotation: &IndexMap<String, String>) -> Option<Value> {
    if annotation.is_empty() {
        return None;
    }
    Some(Value::Object(
        annotation
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect(),
    ))
}

fn notes_to_value(notes: &Option<String>) -> Option<Value> {
    notes
        .clone()
        .map(|n| serde_json::from_str(&n).unwrap_or(Value::String(n)))
}

impl From<JsonMetabolite> for Metabolite {
    fn from(m: JsonMetabolite) -> Self {
        Self {
            id: m.id,
            name: m.name,
            compartment: m.compartment,
            charge: m.charge.unwrap_or_default(),
            formula: m.formula,
            notes: m.notes.map(|v| v.to_string()),
            annotation: flatten_annotation(m.annotation),
        }
    }
}

impl From<&Metabolite> for JsonMetabolite {
    fn from(m: &Metabolite) -> Self {
        Self {
            id: m.id.clone(),
            name: m.name.clone(),
            compartment: m.compartment.clone(),
            charge: Some(m.charge),
            formula: m.formula.clone(),
            notes: notes_to_value(&m.notes),
            annotation: annotation_to_value(&m.annotation),
        }
    }
}

impl JsonCompartment {
    fn into_compartment(self, id: &str) -> Compartment {
        match self {
            JsonCompartment::Name(name) => Compartment::new_named(id, Some(&name)),
            JsonCompartment::Record(record) => Compartment {
                id: id.to_string(),
                name: record.name,
                c_min: record.c_min,
                c_max: record.c_max,
                ph: record.ph,
                ionic_strength: record.ionic_strength,
                membrane_potential: record.membrane_potential,
            },
        }
    }
}

impl From<&Compartment> for JsonCompartment {
    fn from(c: &Compartment) -> Self {
        let has_conditions = c.c_min.is_some()
            || c.c_max.is_some()
            || c.ph.is_some()
            || c.ionic_strength.is_some()
            || !c.membrane_potential.is_empty();
        if !has_conditions {
            return JsonCompartment::Name(c.name.clone().unwrap_or_else(|| c.id.clone()));
        }
        JsonCompartment::Record(JsonCompartmentRecord {
            symbol: Some(c.id.clone()),
            name: c.name.clone(),
            c_min: c.c_min,
            c_max: c.c_max,
            ph: c.ph,
            ionic_strength: c.ionic_strength,
            membrane_potential: c.membrane_potential.clone(),
        })
    }
}

impl Model {
    /// Read a model from a COBRA JSON file
    pub fn read_json<P: AsRef<Path>>(path: P) -> Result<Model, JsonError> {
        let model_str = match fs::read_to_string(path) {
            Ok(data) => data,
            Err(err) => return Err(JsonError::UnableToRead(format!("{:?}", err))),
        };
        Model::from_json_str(&model_str)
    }

    /// Read a model from a COBRA JSON string
    pub fn from_json_str(model_str: &str) -> Result<Model, JsonError> {
        let json_model = match serde_json::from_str::<JsonModel>(model_str) {
            Ok(model) => model,
            Err(err) => return Err(JsonError::UnableToParse(format!("{:?}", err))),
        };
        Model::from_json(json_model)
    }

    /// Write the model to a COBRA JSON file
    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<(), JsonError> {
        let json_model = self.to_json();
        let model_string = serde_json::to_string(&json_model)?;
        fs::write(path, model_string)?;
        Ok(())
    }

    fn from_json(json_model: JsonModel) -> Result<Self, JsonError> {
        let mut model = Model::new_empty();
        for (id, compartment) in json_model.compartments.unwrap_or_default() {
            model.add_compartment(compartment.into_compartment(&id));
        }
        json_model
            .metabolites
            .into_iter()
            .for_each(|m| model.add_metabolite(Metabolite::from(m)));
        for rxn in json_model.reactions {
            let new_reaction = ReactionBuilder::default()
                .id(rxn.id.clone())
                .metabolites(rxn.metabolites)
                .name(rxn.name)
                .lower_bound(rxn.lower_bound)
                .upper_bound(rxn.upper_bound)
                .subsystem(rxn.subsystem)
                .notes(rxn.notes.map(|v| v.to_string()))
                .annotation(flatten_annotation(rxn.annotation))
                .build()?;
            model.add_reaction(new_reaction);
            // Add the reaction to the objective function if desired
            if let Some(coef) = rxn.objective_coefficient.filter(|coef| *coef != 0.) {
                model.objective.insert(rxn.id, coef);
            }
        }
        model.id = json_model.id;
        model.name = json_model.name;
        model.version = json_model.version;
        Ok(model)
    }

    fn to_json(&self) -> JsonModel {
        let reactions = self
            .reactions
            .values()
            .map(|r: &Reaction| JsonReaction {
                id: r.id.clone(),
                name: r.name.clone(),
                metabolites: r.metabolites.clone(),
                lower_bound: r.lower_bound,
                upper_bound: r.upper_bound,
                gene_reaction_rule: String::new(),
                objective_coefficient: self.objective.get(&r.id).copied(),
                subsystem: r.subsystem.clone(),
                notes: notes_to_value(&r.notes),
                annotation: annotation_to_value(&r.annotation),
            })
            .collect();
        let compartments = if self.compartments.is_empty() {
            None
        } else {
            Some(
                self.compartments
                    .iter()
                    .map(|(id, c)| (id.clone(), JsonCompartment::from(c)))
                    .collect(),
            )
        };
        JsonModel {
            metabolites: self.metabolites.values().map(JsonMetabolite::from).collect(),
            reactions,
            genes: Vec::new(),
            id: self.id.clone(),
            name: self.name.clone(),
            compartments,
            version: self.version.clone(),
        }
    }
}

#[derive(Error, Debug)]
pub enum JsonError {
    #[error("Unable to read file due to {0}")]
    UnableToRead(String),
    #[error("Unable to parse json due to {0}")]
    UnableToParse(String),
    #[error("Unable to build reaction")]
    UnableToBuildReaction(#[from] ReactionBuilderError),
    #[error("Serde json parse error")]
    SerdeJsonParseError(#[from] serde_json::Error),
    #[error("Unable to write to file")]
    UnableToWrite(#[from] std::io::Error),
}
// endregion Conversions

// region JSON Thermodynamic Database
#[derive(Deserialize)]
struct JsonThermoDatabase {
    name: String,
    units: EnergyUnit,
    metabolites: IndexMap<String, MetaboliteRecord>,
    #[serde(default)]
    cues: IndexMap<String, CueRecord>,
}

impl ThermoDatabase {
    /// Read and validate a thermodynamic database from a JSON file
    pub fn read_json<P: AsRef<Path>>(path: P) -> Result<ThermoDatabase, DataError> {
        let data = fs::read_to_string(path).map_err(|err| DataError::UnableToRead(err.to_string()))?;
        ThermoDatabase::from_json_str(&data)
    }

    /// Read and validate a thermodynamic database from a JSON string
    pub fn from_json_str(data: &str) -> Result<ThermoDatabase, DataError> {
        let raw: JsonThermoDatabase =
            serde_json::from_str(data).map_err(|err| DataError::UnableToParse(err.to_string()))?;
        ThermoDatabase::new(&raw.name, raw.units, raw.metabolites, raw.cues)
    }

    /// Write the database to a JSON file
    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<(), JsonError> {
        fs::write(path, serde_json::to_string(self)?)?;
        Ok(())
    }
}
// endregion JSON Thermodynamic Database
