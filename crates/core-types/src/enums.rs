use serde::{Deserialize, Serialize};

/// Which standard deviation estimator a rolling volatility uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Deviation {
    /// Divides by `n - 1` (ddof = 1).
    #[default]
    Sample,
    /// Divides by `n` (ddof = 0).
    Population,
}

impl Deviation {
    /// Delta degrees of freedom subtracted from the observation count.
    pub fn ddof(&self) -> usize {
        match self {
            Deviation::Sample => 1,
            Deviation::Population => 0,
        }
    }
}
