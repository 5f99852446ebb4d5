use serde::{Deserialize, Serialize};

use crate::models::{Grade, ImpactTier, KpiStatus};

/// Three-tier cutoffs shared by per-KPI status and the scorecard overall
/// band. A score at or above `meeting` meets target, at or above
/// `needs_improvement` needs improvement, anything lower is below target.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StatusBands {
    pub meeting: f64,
    pub needs_improvement: f64,
}

impl StatusBands {
    pub fn classify(&self, score: f64) -> KpiStatus {
        if score >= self.meeting {
            KpiStatus::MeetingTarget
        } else if score >= self.needs_improvement {
            KpiStatus::NeedsImprovement
        } else {
            KpiStatus::BelowTarget
        }
    }

    /// Residual business impact, inverse of the status band.
    pub fn impact(&self, score: f64) -> ImpactTier {
        match self.classify(score) {
            KpiStatus::MeetingTarget => ImpactTier::Low,
            KpiStatus::NeedsImprovement => ImpactTier::Medium,
            KpiStatus::BelowTarget => ImpactTier::High,
        }
    }
}

/// Four-tier cutoffs for key results and the objective roll-up.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GradeBands {
    pub excellent: f64,
    pub on_track: f64,
    pub at_risk: f64,
}

impl GradeBands {
    pub fn classify(&self, score: f64) -> Grade {
        if score >= self.excellent {
            Grade::Excellent
        } else if score >= self.on_track {
            Grade::OnTrack
        } else if score >= self.at_risk {
            Grade::AtRisk
        } else {
            Grade::Critical
        }
    }
}
