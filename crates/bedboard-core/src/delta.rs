use serde::{Deserialize, Serialize};

/// Signed unit change applied to a hospital's bed counters.
///
/// `Admit` consumes one available bed (-1), `Discharge` frees one (+1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BedDelta {
    Admit,
    Discharge,
}

impl BedDelta {
    /// The change applied to the available-bed counter.
    pub fn as_i64(&self) -> i64 {
        match self {
            BedDelta::Admit => -1,
            BedDelta::Discharge => 1,
        }
    }

    /// Human-readable action label used in operator notices.
    pub fn label(&self) -> &'static str {
        match self {
            BedDelta::Admit => "admission",
            BedDelta::Discharge => "discharge",
        }
    }
}

impl std::fmt::Display for BedDelta {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}
