//! This module provides a struct for representing reactions
use crate::configuration::CONFIGURATION;
use crate::optimize::ProblemSolution;
use crate::utils::hashing::hex_digest;
use derive_builder::Builder;
use indexmap::IndexMap;

/// Represents a reaction in the metabolic model
#[derive(Builder, Debug, Clone, PartialEq)]
#[builder(setter(into))]
pub struct Reaction {
    /// Used to identify the reaction
    pub id: String,
    /// Metabolite stoichiometry of the reaction
    #[builder(default = "IndexMap::new()")]
    pub metabolites: IndexMap<String, f64>,
    /// Human-readable reaction name
    #[builder(default = "None")]
    pub name: Option<String>,
    /// Lower flux bound
    #[builder(default = "default_lower_bound()")]
    pub lower_bound: f64,
    /// Upper flux bound
    #[builder(default = "default_upper_bound()")]
    pub upper_bound: f64,
    /// Reaction subsystem
    #[builder(default = "None")]
    pub subsystem: Option<String>,
    /// Notes about the reaction
    #[builder(default = "None")]
    pub notes: Option<String>,
    /// Reaction Annotations
    #[builder(default = "IndexMap::new()")]
    pub annotation: IndexMap<String, String>,
}

fn default_lower_bound() -> f64 {
    CONFIGURATION
        .read()
        .map(|config| config.lower_bound)
        .unwrap_or(-1000.)
}

fn default_upper_bound() -> f64 {
    CONFIGURATION
        .read()
        .map(|config| config.upper_bound)
        .unwrap_or(1000.)
}

impl Reaction {
    /// Determine the id to be associated with the forward reaction in the optimization problem
    ///
    /// # Note:
    /// The forward variable shares the reaction id
    pub fn get_forward_id(&self) -> String {
        self.id.clone()
    }

    /// Determine the id to be associated with the reverse reaction in the optimization problem
    ///
    /// # Note:
    /// The reverse id is "{reaction_id}_reverse_{hexidecimal hash of reaction_id}"
    pub fn get_reverse_id(&self) -> String {
        format!("{}_reverse_{}", &self.id, hex_digest(&self.id))
    }

    /// Determine the upper bound of the variable associated with the forward reaction
    pub(crate) fn get_forward_upper_bound(&self) -> f64 {
        self.upper_bound.max(0.)
    }

    /// Determine the lower bound of the variable associated with the forward reaction
    pub(crate) fn get_forward_lower_bound(&self) -> f64 {
        self.lower_bound.max(0.)
    }

    /// Determine the upper bound of the variable associated with the reverse reaction
    pub(crate) fn get_reverse_upper_bound(&self) -> f64 {
        (-self.lower_bound).max(0.)
    }

    /// Determine the lower bound of the variable associated with the reverse reaction
    pub(crate) fn get_reverse_lower_bound(&self) -> f64 {
        (-self.upper_bound).max(0.)
    }

    /// Whether the reaction involves a single metabolite (exchange, sink or demand)
    pub fn is_boundary(&self) -> bool {
        self.metabolites.len() == 1
    }

    /// Net flux (forward minus reverse) of the reaction in a solution
    pub fn flux(&self, solution: &ProblemSolution) -> Option<f64> {
        let forward = solution.variable_value(&self.get_forward_id())?;
        let reverse = solution.variable_value(&self.get_reverse_id())?;
        Some(forward - reverse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_bounds() {
        let reversible = ReactionBuilder::default()
            .id("R1")
            .lower_bound(-5.)
            .upper_bound(10.)
            .build()
            .unwrap();
        assert_eq!(reversible.get_forward_lower_bound(), 0.);
        assert_eq!(reversible.get_forward_upper_bound(), 10.);
        assert_eq!(reversible.get_reverse_lower_bound(), 0.);
        assert_eq!(reversible.get_reverse_upper_bound(), 5.);

        let forced = ReactionBuilder::default()
            .id("R2")
            .lower_bound(1.)
            .upper_bound(10.)
            .build()
            .unwrap();
        assert_eq!(forced.get_forward_lower_bound(), 1.);
        assert_eq!(forced.get_reverse_upper_bound(), 0.);

        let backwards = ReactionBuilder::default()
            .id("R3")
            .lower_bound(-10.)
            .upper_bound(-2.)
            .build()
            .unwrap();
        assert_eq!(backwards.get_forward_upper_bound(), 0.);
        assert_eq!(backwards.get_reverse_lower_bound(), 2.);
        assert_eq!(backwards.get_reverse_upper_bound(), 10.);
    }

    #[test]
    fn variable_ids() {
        let reaction = ReactionBuilder::default().id("PGI").build().unwrap();
        assert_eq!(reaction.get_forward_id(), "PGI");
        assert!(reaction.get_reverse_id().starts_with("PGI_reverse_"));
        assert_eq!(reaction.lower_bound, -1000.);
        assert_eq!(reaction.upper_bound, 1000.);
    }
}
