//! Module for reading and writing Models and thermodynamic databases
pub mod json;
