//! Shared schema of the tracked variables.
//!
//! Every component that touches tabular data references this single list,
//! so the producer and the analysis side can never drift apart.

/// Row label carrying the per-variable mean over all iterations.
pub const MEAN_LABEL: &str = "Mean";

/// Row label carrying the per-variable relative standard uncertainty.
pub const UNCERTAINTY_LABEL: &str = "Relative uncertainty";

/// The 12 tracked variables, in artifact column order, with units.
pub const TRACKED_VARIABLES: [&str; 12] = [
    "kVp (kV)",
    "th (deg)",
    "Air (mm)",
    "Al (mm)",
    "Cu (mm)",
    "HVL1 Al (mm)",
    "HVL2 Al (mm)",
    "HVL1 Cu (mm)",
    "HVL2 Cu (mm)",
    "Mean energy (keV)",
    "Air kerma (uGy)",
    "Mean conv. coeff. (Sv/Gy)",
];

pub fn column_names() -> Vec<String> {
    TRACKED_VARIABLES.iter().map(|name| name.to_string()).collect()
}
