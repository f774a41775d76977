//! Thermodynamics-based flux analysis (TFA) of constraint based metabolic models.
//!
//! Standard formation energies from a thermodynamic database are corrected to the pH and
//! ionic strength of each compartment, aggregated into reaction Gibbs energies, and coupled
//! to flux directions in a mixed integer linear problem. When that problem is infeasible, a
//! relaxation search reports which thermodynamic constraints have to be loosened.
//!
//! The usual entry point is [`tfa::ThermoModel`].
pub mod configuration;
pub mod io;
pub mod metabolic_model;
pub mod optimize;
pub mod tfa;
pub mod thermo;
mod utils;
