//! This module provides the Model struct for representing an entire metabolic model
use crate::metabolic_model::compartment::Compartment;
use crate::metabolic_model::metabolite::Metabolite;
use crate::metabolic_model::reaction::Reaction;
use crate::optimize::problem::{Problem, ProblemError};
use crate::optimize::solvers::Solver;
use crate::optimize::variable::VariableType;
use crate::optimize::ProblemSolution;

use indexmap::IndexMap;
use nalgebra_sparse::{CooMatrix, CsrMatrix};
use thiserror::Error;

/// Prefix of the mass balance constraint of each metabolite
pub const MASS_BALANCE_PREFIX: &str = "MB_";

/// Represents a Genome Scale Metabolic Model
#[derive(Clone, Debug, PartialEq)]
pub struct Model {
    /// Map of reaction ids to Reaction Objects
    pub reactions: IndexMap<String, Reaction>,
    /// Map of metabolite ids to Metabolite Objects
    pub metabolites: IndexMap<String, Metabolite>,
    /// Map of compartment ids to Compartment Objects
    pub compartments: IndexMap<String, Compartment>,
    /// Map of reaction ids to objective function coefficients
    pub objective: IndexMap<String, f64>,
    /// Id associated with the Model
    pub id: Option<String>,
    /// Human readable name of the Model
    pub name: Option<String>,
    /// A version identifier for the Model, stored as a string
    pub version: Option<String>,
}

impl Model {
    pub fn new_empty() -> Self {
        Model {
            reactions: IndexMap::new(),
            metabolites: IndexMap::new(),
            compartments: IndexMap::new(),
            objective: IndexMap::new(),
            id: None,
            name: None,
            version: None,
        }
    }

    /// Add a reaction to the model
    ///
    /// # Parameters
    /// - reaction: Reaction to add
    ///
    /// # Examples
    /// ```rust
    /// use tfars_core::metabolic_model::model::Model;
    /// use tfars_core::metabolic_model::reaction::{Reaction, ReactionBuilder};
    /// let mut model = Model::new_empty();
    /// let new_reaction = ReactionBuilder::default().id("new_reaction").build().unwrap();
    /// model.add_reaction(new_reaction);
    /// ```
    pub fn add_reaction(&mut self, reaction: Reaction) {
        let id = reaction.id.clone();
        self.reactions.insert(id, reaction);
    }

    /// Add a metabolite to the model
    pub fn add_metabolite(&mut self, metabolite: Metabolite) {
        let id = metabolite.id.clone();
        self.metabolites.insert(id, metabolite);
    }

    /// Add a compartment to the model
    pub fn add_compartment(&mut self, compartment: Compartment) {
        let id = compartment.id.clone();
        self.compartments.insert(id, compartment);
    }

    /// Stoichiometric matrix, with metabolites as rows and reactions as columns
    ///
    /// Rows and columns follow the insertion order of the metabolites and reactions.
    pub fn stoichiometric_matrix(&self) -> Result<CsrMatrix<f64>, ModelError> {
        let mut coo = CooMatrix::new(self.metabolites.len(), self.reactions.len());
        for (col, reaction) in self.reactions.values().enumerate() {
            for (met, coef) in &reaction.metabolites {
                let row = self.metabolites.get_index_of(met).ok_or_else(|| {
                    ModelError::UnknownMetabolite {
                        reaction: reaction.id.clone(),
                        metabolite: met.clone(),
                    }
                })?;
                coo.push(row, col, *coef);
            }
        }
        Ok(CsrMatrix::from(&coo))
    }

    /// Build the flux balance problem of the model
    ///
    /// Each reaction is split into a forward and a reverse variable, both non-negative, and
    /// each metabolite gets a steady state mass balance constraint `MB_{metabolite}`.
    pub fn to_problem(&self) -> Result<Problem, ModelError> {
        let mut problem = Problem::new_maximization();
        for reaction in self.reactions.values() {
            problem.add_new_variable(
                &reaction.get_forward_id(),
                reaction.name.as_deref(),
                VariableType::Continuous,
                reaction.get_forward_lower_bound(),
                reaction.get_forward_upper_bound(),
            )?;
            problem.add_new_variable(
                &reaction.get_reverse_id(),
                None,
                VariableType::Continuous,
                reaction.get_reverse_lower_bound(),
                reaction.get_reverse_upper_bound(),
            )?;
        }
        for met in self.metabolites.keys() {
            problem.add_new_equality_constraint(
                &format!("{}{}", MASS_BALANCE_PREFIX, met),
                &[],
                &[],
                0.,
            )?;
        }
        for reaction in self.reactions.values() {
            let forward = reaction.get_forward_id();
            let reverse = reaction.get_reverse_id();
            for (met, coef) in &reaction.metabolites {
                if !self.metabolites.contains_key(met) {
                    return Err(ModelError::UnknownMetabolite {
                        reaction: reaction.id.clone(),
                        metabolite: met.clone(),
                    });
                }
                let constraint = format!("{}{}", MASS_BALANCE_PREFIX, met);
                problem.add_term_to_constraint(&constraint, &forward, *coef)?;
                problem.add_term_to_constraint(&constraint, &reverse, -coef)?;
            }
        }
        for (rxn_id, coef) in &self.objective {
            let reaction = self
                .reactions
                .get(rxn_id)
                .ok_or_else(|| ModelError::UnknownReaction(rxn_id.clone()))?;
            problem.add_new_linear_objective_term(&reaction.get_forward_id(), *coef)?;
            problem.add_new_linear_objective_term(&reaction.get_reverse_id(), -coef)?;
        }
        Ok(problem)
    }

    /// Optimize the flux balance problem of the model
    pub fn optimize<S: Solver + Clone>(&self, solver: &S) -> Result<ProblemSolution, ModelError> {
        Ok(self.to_problem()?.optimize(solver)?)
    }
}

/// Errors associated with the Model
#[derive(Error, Debug, Clone)]
pub enum ModelError {
    #[error("Reaction {reaction} references metabolite {metabolite}, which is not in the model")]
    UnknownMetabolite { reaction: String, metabolite: String },
    #[error("Objective references reaction {0}, which is not in the model")]
    UnknownReaction(String),
    #[error("Problem error: {0}")]
    Problem(#[from] ProblemError),
}
