use std::collections::BTreeMap;

use crate::config::{check_weight_sum, ScorecardConfig};
use crate::error::ScorecardError;

/// Resolves the effective weight set for the enabled KPIs.
///
/// When every KPI in the nominal set is enabled the nominal set is used
/// unchanged. Otherwise the fallback authored for exactly that disabled
/// combination applies. An unanticipated combination is a configuration
/// error: renormalizing proportionally could contradict weights deliberately
/// authored for other combinations, so the engine refuses to guess.
pub fn resolve(config: &ScorecardConfig) -> Result<BTreeMap<String, f64>, ScorecardError> {
    let mut disabled: Vec<String> = config
        .kpis
        .iter()
        .filter(|kpi| !kpi.enabled && config.weights.nominal.contains_key(&kpi.id))
        .map(|kpi| kpi.id.clone())
        .collect();
    disabled.sort();

    let resolved = if disabled.is_empty() {
        config.weights.nominal.clone()
    } else {
        config
            .weights
            .fallbacks
            .iter()
            .find(|fallback| {
                let mut key = fallback.disabled.clone();
                key.sort();
                key == disabled
            })
            .map(|fallback| fallback.weights.clone())
            .ok_or_else(|| ScorecardError::NoFallbackWeights {
                disabled: disabled.clone(),
            })?
    };

    // Every resolved weight must belong to an enabled KPI, so the sum check
    // below covers exactly the KPIs that will be evaluated. A weight left in
    // for a disabled KPI would vanish from the scorecard sum silently.
    for id in resolved.keys() {
        match config.kpi(id) {
            None => return Err(ScorecardError::UnknownWeightedKpi(id.clone())),
            Some(kpi) if !kpi.enabled => {
                return Err(ScorecardError::FallbackWeighsDisabled {
                    disabled: disabled.clone(),
                    kpi: id.clone(),
                });
            }
            Some(_) => {}
        }
    }
    for kpi in &config.kpis {
        if kpi.enabled && !resolved.contains_key(&kpi.id) {
            return Err(ScorecardError::UnweightedKpi(kpi.id.clone()));
        }
    }
    check_weight_sum("resolved", resolved.values().copied())?;

    tracing::debug!(weights = ?resolved, "resolved weight set");
    Ok(resolved)
}
