//! Standard conditions and fixed physical constants
use std::f64::consts::LN_10;

/// Standard temperature (K)
pub const TEMPERATURE_0: f64 = 298.15;
/// pKas at or below this pH are not considered
pub const MIN_PH: f64 = 3.;
/// pKas at or above this pH are not considered
pub const MAX_PH: f64 = 9.;

/// Debye-Hückel B at standard temperature
pub const DEBYE_HUCKEL_B_0: f64 = 1.6;
/// Debye-Hückel A at standard temperature, in log10 form
pub const DEBYE_HUCKEL_A: f64 = 1.17582 / LN_10;
/// Extended Debye-Hückel coefficient of the ionic strength correction (kJ/mol)
pub const DEBYE_HUCKEL_IONIC_COEFFICIENT: f64 = 2.91482;

/// Database key of the proton
pub const CPD_PROTON: &str = "cpd00067";
/// Database key of water
pub const CPD_WATER: &str = "cpd00001";

/// Error code of database entries with usable values
pub const NO_ERROR: &str = "Nil";
/// Standard formation energies beyond this magnitude are placeholders
pub const MAX_FORMATION_ENERGY: f64 = 1e6;
/// Error bound given to reaction Gibbs energies whose metabolites carry no error
pub const DEFAULT_REACTION_ERROR: f64 = 2.;
