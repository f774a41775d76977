//! This module provides the metabolite struct representing a metabolite

use std::hash::Hash;

use derive_builder::Builder;
use indexmap::IndexMap;

/// Annotation keys holding the thermodynamic database key, in lookup order
const SEED_ANNOTATION_KEYS: [&str; 2] = ["seed_id", "seed.compound"];

/// Represents a metabolite
#[derive(Builder, Debug, Clone, PartialEq)]
#[builder(setter(into))]
pub struct Metabolite {
    /// Used to identify the metabolite (must be unique)
    pub id: String,
    /// Human Readable name of the metabolite
    #[builder(default = "None")]
    pub name: Option<String>,
    /// Which compartment the metabolite is in
    #[builder(default = "None")]
    pub compartment: Option<String>,
    /// Electrical charge of the Metabolite
    #[builder(default = "0")]
    pub charge: i32,
    /// Chemical Formula of the metabolite
    #[builder(default = "None")]
    pub formula: Option<String>,
    /// Notes about the metabolite
    #[builder(default = "None")]
    pub notes: Option<String>,
    /// Metabolite annotations, keyed by namespace
    #[builder(default = "IndexMap::new()")]
    pub annotation: IndexMap<String, String>,
}

impl Metabolite {
    /// Key of the metabolite in the thermodynamic database, if annotated
    pub fn seed_id(&self) -> Option<&str> {
        SEED_ANNOTATION_KEYS
            .iter()
            .find_map(|key| self.annotation.get(*key))
            .map(|s| s.as_str())
    }
}

impl Hash for Metabolite {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
        if let Some(ref compartment) = self.compartment {
            compartment.hash(state)
        };
    }
}
