use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use anyhow::Context;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::band::{GradeBands, StatusBands};
use crate::error::ScorecardError;
use crate::models::Flag;

pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// The whole scorecard configuration, parsed once from YAML and treated as an
/// immutable value for the rest of the run.
#[derive(Debug, Clone, Deserialize)]
pub struct ScorecardConfig {
    pub metadata: Metadata,
    #[serde(default)]
    pub columns: ColumnConfig,
    pub thresholds: Thresholds,
    pub bands: BandConfig,
    pub kpis: Vec<KpiDef>,
    pub weights: WeightConfig,
    pub objective: ObjectiveDef,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Metadata {
    pub organization: String,
    pub version: String,
}

/// Logical field name to physical CSV header remaps, per record domain.
/// Unmapped fields fall back to the logical name itself.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ColumnConfig {
    #[serde(default)]
    pub incidents: BTreeMap<String, String>,
    #[serde(default)]
    pub requests: BTreeMap<String, String>,
}

impl ColumnConfig {
    pub fn incident_column<'a>(&'a self, field: &'a str) -> &'a str {
        self.incidents.get(field).map(String::as_str).unwrap_or(field)
    }

    pub fn request_column<'a>(&'a self, field: &'a str) -> &'a str {
        self.requests.get(field).map(String::as_str).unwrap_or(field)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Thresholds {
    pub aging: AgingThresholds,
    pub priority: PriorityThresholds,
    #[serde(default)]
    pub exclusions: Exclusions,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AgingThresholds {
    pub backlog_days: f64,
    pub request_aging_days: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PriorityThresholds {
    pub major_levels: Vec<i64>,
    #[serde(default = "default_priority_fallback")]
    pub fallback: i64,
}

fn default_priority_fallback() -> i64 {
    99
}

/// Contact types excluded from first-contact-resolution eligibility.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Exclusions {
    #[serde(default)]
    pub contact_types: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BandConfig {
    pub kpi: StatusBands,
    pub scorecard: StatusBands,
    pub objective: GradeBands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordSource {
    Incidents,
    Requests,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KpiDef {
    pub id: String,
    pub name: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub source: RecordSource,
    pub kind: KpiKind,
    /// Overrides the global KPI status cutoffs when present.
    #[serde(default)]
    pub bands: Option<StatusBands>,
}

fn default_enabled() -> bool {
    true
}

/// Evaluation shape of a KPI. The sense of a proportion is fixed in
/// configuration, never inferred from the data.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum KpiKind {
    /// Count records per category and compare each count to its own ceiling.
    CountAgainstTarget { categories: Vec<CountCategory> },
    /// Share of records carrying `flag`, over the whole collection or the
    /// `population`-flagged subset.
    Proportion {
        flag: Flag,
        sense: Sense,
        #[serde(default)]
        population: Option<Flag>,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct CountCategory {
    pub label: String,
    pub flag: Flag,
    pub max: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sense {
    /// Flag marks a bad state; adherence is 100 minus the flagged share.
    BadState,
    /// Flag marks a good state; adherence is the flagged share itself.
    GoodState,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WeightConfig {
    pub nominal: BTreeMap<String, f64>,
    #[serde(default)]
    pub fallbacks: Vec<FallbackWeights>,
}

/// Weight set authored for one specific combination of disabled KPIs.
#[derive(Debug, Clone, Deserialize)]
pub struct FallbackWeights {
    pub disabled: Vec<String>,
    pub weights: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObjectiveDef {
    pub id: String,
    pub name: String,
    pub key_results: Vec<KrDef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KrDef {
    pub id: String,
    pub name: String,
    /// KPI whose observed value this key result scores.
    pub kpi: String,
    pub target: f64,
    pub method: ScoringMethod,
    pub weight: f64,
    pub owner: String,
    pub deadline: NaiveDate,
    #[serde(default)]
    pub bands: Option<GradeBands>,
    #[serde(default)]
    pub triggers: TriggerSpecs,
}

/// Scoring transform for a key result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringMethod {
    /// Lower is better: 100 at zero, 0 at target, clamped both ways.
    Inverse,
    /// Higher is better: 0 at zero, 100 at target, clamped both ways.
    Direct,
}

impl ScoringMethod {
    pub fn score(self, current: f64, target: f64) -> f64 {
        let raw = match self {
            ScoringMethod::Inverse => 100.0 - (current / target * 100.0),
            ScoringMethod::Direct => current / target * 100.0,
        };
        raw.clamp(0.0, 100.0)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TriggerSpecs {
    #[serde(default)]
    pub critical: Option<ActionSpec>,
    #[serde(default)]
    pub warning: Option<ActionSpec>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ActionSpec {
    pub action: String,
    pub owner: String,
}

impl ScorecardConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: ScorecardConfig = serde_yaml::from_str(&raw)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        config.validate()?;
        tracing::info!(
            organization = %config.metadata.organization,
            version = %config.metadata.version,
            kpis = config.kpis.len(),
            "configuration loaded"
        );
        Ok(config)
    }

    pub fn kpi(&self, id: &str) -> Option<&KpiDef> {
        self.kpis.iter().find(|kpi| kpi.id == id)
    }

    /// Structural checks beyond what serde can express. Run once at load;
    /// the engine assumes a validated configuration afterwards.
    pub fn validate(&self) -> Result<(), ScorecardError> {
        let mut kpi_ids = BTreeSet::new();
        for kpi in &self.kpis {
            if !kpi_ids.insert(kpi.id.as_str()) {
                return Err(ScorecardError::DuplicateKpi(kpi.id.clone()));
            }
        }

        for (id, weight) in &self.weights.nominal {
            if !kpi_ids.contains(id.as_str()) {
                return Err(ScorecardError::UnknownWeightedKpi(id.clone()));
            }
            if *weight < 0.0 {
                return Err(ScorecardError::NegativeWeight {
                    scope: "nominal".to_string(),
                    id: id.clone(),
                    weight: *weight,
                });
            }
        }
        check_weight_sum("nominal", self.weights.nominal.values().copied())?;

        for fallback in &self.weights.fallbacks {
            for id in fallback.disabled.iter().chain(fallback.weights.keys()) {
                if !kpi_ids.contains(id.as_str()) {
                    return Err(ScorecardError::UnknownWeightedKpi(id.clone()));
                }
            }
            let scope = format!("fallback [{}]", fallback.disabled.join(", "));
            for (id, weight) in &fallback.weights {
                // A weight for a KPI the set itself disables would never be
                // evaluated, deflating the scorecard sum without an error.
                if fallback.disabled.contains(id) {
                    return Err(ScorecardError::FallbackWeighsDisabled {
                        disabled: fallback.disabled.clone(),
                        kpi: id.clone(),
                    });
                }
                if *weight < 0.0 {
                    return Err(ScorecardError::NegativeWeight {
                        scope: scope.clone(),
                        id: id.clone(),
                        weight: *weight,
                    });
                }
            }
            check_weight_sum(&scope, fallback.weights.values().copied())?;
        }

        let mut kr_ids = BTreeSet::new();
        for kr in &self.objective.key_results {
            if !kr_ids.insert(kr.id.as_str()) {
                return Err(ScorecardError::DuplicateKr(kr.id.clone()));
            }
            // Both scoring methods divide by the target; zero would put NaN
            // into the objective sum instead of failing.
            if kr.target <= 0.0 {
                return Err(ScorecardError::NonPositiveKrTarget {
                    kr: kr.id.clone(),
                    target: kr.target,
                });
            }
            if kr.weight < 0.0 {
                return Err(ScorecardError::NegativeWeight {
                    scope: "objective".to_string(),
                    id: kr.id.clone(),
                    weight: kr.weight,
                });
            }
            match self.kpi(&kr.kpi) {
                None => {
                    return Err(ScorecardError::UnknownKrSource {
                        kr: kr.id.clone(),
                        kpi: kr.kpi.clone(),
                    });
                }
                // A disabled KPI is never evaluated, so its key result could
                // never be scored.
                Some(kpi) if !kpi.enabled => {
                    return Err(ScorecardError::DisabledKrSource {
                        kr: kr.id.clone(),
                        kpi: kr.kpi.clone(),
                    });
                }
                Some(_) => {}
            }
        }
        check_weight_sum(
            "objective",
            self.objective.key_results.iter().map(|kr| kr.weight),
        )?;

        Ok(())
    }
}

pub fn check_weight_sum(
    scope: &str,
    weights: impl Iterator<Item = f64>,
) -> Result<(), ScorecardError> {
    let sum: f64 = weights.sum();
    if (sum - 100.0).abs() > WEIGHT_SUM_TOLERANCE {
        return Err(ScorecardError::WeightSum {
            scope: scope.to_string(),
            sum,
        });
    }
    Ok(())
}
