use crate::actions;
use crate::band::GradeBands;
use crate::config::{check_weight_sum, KrDef, ObjectiveDef};
use crate::error::ScorecardError;
use crate::models::{KpiResult, KrResult, ObjectiveResult};

/// Scores one key result from its source KPI's observed value.
pub fn map_key_result(def: &KrDef, kpi: &KpiResult, default_bands: &GradeBands) -> KrResult {
    let bands = def.bands.as_ref().unwrap_or(default_bands);
    let current = kpi.observed;
    let score = def.method.score(current, def.target);

    KrResult {
        id: def.id.clone(),
        name: def.name.clone(),
        kpi_id: def.kpi.clone(),
        current,
        target: def.target,
        score,
        grade: bands.classify(score),
        gap: current - def.target,
        owner: def.owner.clone(),
        deadline: def.deadline,
    }
}

/// Rolls the key results up into the objective score, then derives the
/// ordered action list. A key result whose source KPI is missing from the
/// result set means the caller evaluated the wrong KPI set; that aborts the
/// run rather than scoring around the hole.
pub fn aggregate_objective(
    def: &ObjectiveDef,
    kpi_results: &[KpiResult],
    default_bands: &GradeBands,
) -> Result<ObjectiveResult, ScorecardError> {
    check_weight_sum("objective", def.key_results.iter().map(|kr| kr.weight))?;

    let mut key_results = Vec::with_capacity(def.key_results.len());
    for kr_def in &def.key_results {
        let kpi = kpi_results
            .iter()
            .find(|kpi| kpi.id == kr_def.kpi)
            .ok_or_else(|| ScorecardError::MissingKpiResult {
                kr: kr_def.id.clone(),
                kpi: kr_def.kpi.clone(),
            })?;
        key_results.push(map_key_result(kr_def, kpi, default_bands));
    }

    let score: f64 = key_results
        .iter()
        .zip(&def.key_results)
        .map(|(kr, kr_def)| kr.score * kr_def.weight / 100.0)
        .sum();
    let grade = default_bands.classify(score);

    let triggers = actions::derive(&def.key_results, &key_results);
    tracing::info!(
        objective = %def.id,
        score,
        grade = %grade,
        actions = triggers.len(),
        "objective aggregated"
    );

    Ok(ObjectiveResult {
        id: def.id.clone(),
        name: def.name.clone(),
        score,
        grade,
        key_results,
        actions: triggers,
    })
}
