use thiserror::Error;

use crate::models::Flag;

/// Failures that abort a scoring run. Configuration errors mean the YAML
/// contradicts itself or the input data; contract violations mean the caller
/// wired the engine incorrectly. A partial weighted score is misleading, so
/// none of these produce a partial result.
#[derive(Debug, Error)]
pub enum ScorecardError {
    #[error("duplicate KPI id '{0}' in configuration")]
    DuplicateKpi(String),

    #[error("duplicate key result id '{0}' in configuration")]
    DuplicateKr(String),

    #[error("key result '{kr}' references unknown KPI '{kpi}'")]
    UnknownKrSource { kr: String, kpi: String },

    #[error("key result '{kr}' references disabled KPI '{kpi}'")]
    DisabledKrSource { kr: String, kpi: String },

    #[error("{scope} weights sum to {sum:.3}, expected 100")]
    WeightSum { scope: String, sum: f64 },

    #[error("no fallback weight set for disabled KPIs [{}]", disabled.join(", "))]
    NoFallbackWeights { disabled: Vec<String> },

    #[error(
        "fallback weight set for disabled KPIs [{}] still weights '{kpi}'",
        disabled.join(", ")
    )]
    FallbackWeighsDisabled { disabled: Vec<String>, kpi: String },

    #[error("negative weight {weight} for '{id}' in {scope} weights")]
    NegativeWeight {
        scope: String,
        id: String,
        weight: f64,
    },

    #[error("key result '{kr}' has non-positive target {target}")]
    NonPositiveKrTarget { kr: String, target: f64 },

    #[error("KPI '{kpi}' consumes flag '{flag}' absent from every input record")]
    FlagMissing { kpi: String, flag: Flag },

    #[error("weight set names KPI '{0}' which has no definition")]
    UnknownWeightedKpi(String),

    #[error("enabled KPI '{0}' has no weight in the resolved weight set")]
    UnweightedKpi(String),

    #[error("key result '{kr}' has no KPI result for '{kpi}'")]
    MissingKpiResult { kr: String, kpi: String },
}
