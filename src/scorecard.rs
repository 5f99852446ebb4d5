use std::collections::BTreeMap;

use crate::band::StatusBands;
use crate::models::{KpiResult, KpiStatus};

/// Weighted overall score across the evaluated KPIs.
///
/// `kpis` holds only enabled KPIs (disabled ones were never evaluated and
/// their weight was redistributed upstream), so the sum over `adherence ×
/// weight / 100` is the whole scorecard.
pub fn aggregate(
    kpis: &[KpiResult],
    weights: &BTreeMap<String, f64>,
    bands: &StatusBands,
) -> (f64, KpiStatus) {
    let overall: f64 = kpis
        .iter()
        .map(|kpi| {
            let weight = weights.get(&kpi.id).copied().unwrap_or(0.0);
            kpi.adherence * weight / 100.0
        })
        .sum();

    let status = bands.classify(overall);
    tracing::info!(score = overall, status = %status, "scorecard aggregated");
    (overall, status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ImpactTier;

    fn kpi(id: &str, adherence: f64) -> KpiResult {
        KpiResult {
            id: id.to_string(),
            name: id.to_string(),
            adherence,
            status: KpiStatus::MeetingTarget,
            impact: ImpactTier::Low,
            numerator: 0,
            denominator: 1,
            observed: adherence,
            sub_counts: Vec::new(),
            no_data: false,
        }
    }

    fn bands() -> StatusBands {
        StatusBands {
            meeting: 90.0,
            needs_improvement: 70.0,
        }
    }

    #[test]
    fn weighted_sum_matches_hand_calculation() {
        let kpis = vec![kpi("A", 100.0), kpi("B", 80.0), kpi("C", 60.0)];
        let weights: BTreeMap<String, f64> = [
            ("A".to_string(), 25.0),
            ("B".to_string(), 50.0),
            ("C".to_string(), 25.0),
        ]
        .into_iter()
        .collect();
        let (overall, status) = aggregate(&kpis, &weights, &bands());
        assert_eq!(overall, 80.0);
        assert_eq!(status, KpiStatus::NeedsImprovement);
    }

    #[test]
    fn overall_is_monotone_in_each_adherence() {
        let weights: BTreeMap<String, f64> = [
            ("A".to_string(), 25.0),
            ("B".to_string(), 50.0),
            ("C".to_string(), 25.0),
        ]
        .into_iter()
        .collect();
        let mut previous = f64::NEG_INFINITY;
        for adherence in [0.0, 20.0, 55.0, 80.0, 100.0] {
            let kpis = vec![kpi("A", 70.0), kpi("B", adherence), kpi("C", 40.0)];
            let (overall, _) = aggregate(&kpis, &weights, &bands());
            assert!(overall >= previous);
            previous = overall;
        }
    }

    #[test]
    fn unweighted_kpi_contributes_nothing() {
        let kpis = vec![kpi("A", 100.0), kpi("X", 100.0)];
        let weights: BTreeMap<String, f64> = [("A".to_string(), 100.0)].into_iter().collect();
        let (overall, _) = aggregate(&kpis, &weights, &bands());
        assert_eq!(overall, 100.0);
    }
}
