use super::config::Thresholds;
use serde::{Deserialize, Serialize};

/// Three-way outcome of an evaluation, a pure function of the compliance
/// percentage and the configured thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Approved,
    ApprovedWithObservations,
    NotApproved,
}

impl Verdict {
    pub fn classify(percentage: f64, thresholds: &Thresholds) -> Self {
        if percentage >= thresholds.approve {
            Self::Approved
        } else if percentage >= thresholds.approve_with_observations {
            Self::ApprovedWithObservations
        } else {
            Self::NotApproved
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Approved => "Approved",
            Self::ApprovedWithObservations => "Approved with observations",
            Self::NotApproved => "Not approved",
        }
    }
}
