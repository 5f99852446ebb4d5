use crate::config::{RecordSource, ScorecardConfig};
use crate::error::ScorecardError;
use crate::models::{FlaggedRecord, ScorecardRun};
use crate::{kpi, okr, scorecard, weights};

/// One snapshot of flagged records, split by domain.
#[derive(Debug, Default)]
pub struct RecordSet {
    pub incidents: Vec<FlaggedRecord>,
    pub requests: Vec<FlaggedRecord>,
}

/// Runs one complete scoring pass: resolve weights, evaluate every enabled
/// KPI in definition order, aggregate the scorecard, roll up the objective.
/// Pure and deterministic; any configuration or contract error aborts with
/// no partial result.
pub fn run(records: &RecordSet, config: &ScorecardConfig) -> Result<ScorecardRun, ScorecardError> {
    // Resolved once, immutable for the rest of the run. Evaluations below
    // are independent of each other and could run in parallel unchanged.
    let weights = weights::resolve(config)?;

    let mut kpis = Vec::new();
    for def in config.kpis.iter().filter(|def| def.enabled) {
        let collection = match def.source {
            RecordSource::Incidents => &records.incidents,
            RecordSource::Requests => &records.requests,
        };
        kpis.push(kpi::evaluate(collection, def, &config.bands.kpi)?);
    }

    let (overall_score, overall_status) =
        scorecard::aggregate(&kpis, &weights, &config.bands.scorecard);
    let objective = okr::aggregate_objective(&config.objective, &kpis, &config.bands.objective)?;

    Ok(ScorecardRun {
        kpis,
        weights,
        overall_score,
        overall_status,
        objective,
    })
}
