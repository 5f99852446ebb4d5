use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Per-record boolean flags the metric evaluator consumes. A closed enum so a
/// configuration naming a flag that does not exist fails at parse time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Flag {
    IsP1,
    IsP2,
    IsMajorIncident,
    IsBacklog,
    IsResolved,
    IsFirstTimeFix,
    IsFirstContactResolution,
    IsAged,
    IsClosed,
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Flag::IsP1 => "is_p1",
            Flag::IsP2 => "is_p2",
            Flag::IsMajorIncident => "is_major_incident",
            Flag::IsBacklog => "is_backlog",
            Flag::IsResolved => "is_resolved",
            Flag::IsFirstTimeFix => "is_first_time_fix",
            Flag::IsFirstContactResolution => "is_first_contact_resolution",
            Flag::IsAged => "is_aged",
            Flag::IsClosed => "is_closed",
        };
        f.write_str(name)
    }
}

/// A ticket after flag derivation. Immutable for the duration of a run.
/// Flags a record could not derive (e.g. first-contact-resolution when the
/// export carries no contact type) are absent from the map rather than false.
#[derive(Debug, Clone)]
pub struct FlaggedRecord {
    pub id: String,
    pub priority: i64,
    pub state: String,
    pub reassignment_count: u32,
    pub age_days: f64,
    pub flags: BTreeMap<Flag, bool>,
}

impl FlaggedRecord {
    pub fn flag(&self, flag: Flag) -> Option<bool> {
        self.flags.get(&flag).copied()
    }
}

/// Three-tier KPI status derived from adherence cutoffs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KpiStatus {
    MeetingTarget,
    NeedsImprovement,
    BelowTarget,
}

impl fmt::Display for KpiStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            KpiStatus::MeetingTarget => "Meeting Target",
            KpiStatus::NeedsImprovement => "Needs Improvement",
            KpiStatus::BelowTarget => "Below Target",
        };
        f.write_str(label)
    }
}

/// Business impact runs inverse to status: a KPI meeting target carries low
/// residual impact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImpactTier {
    Low,
    Medium,
    High,
}

impl fmt::Display for ImpactTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ImpactTier::Low => "Low",
            ImpactTier::Medium => "Medium",
            ImpactTier::High => "High",
        };
        f.write_str(label)
    }
}

/// Four-tier band used for key results and the objective roll-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Grade {
    Excellent,
    OnTrack,
    AtRisk,
    Critical,
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Grade::Excellent => "Excellent",
            Grade::OnTrack => "On Track",
            Grade::AtRisk => "At Risk",
            Grade::Critical => "Critical",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SubCount {
    pub label: String,
    pub count: u64,
    pub target: u64,
}

/// Outcome of evaluating one KPI. `observed` is the metric in its native
/// direction (backlog percentage, resolution rate, raw count) and feeds the
/// key-result mapper; `adherence` is always higher-is-better.
#[derive(Debug, Clone, Serialize)]
pub struct KpiResult {
    pub id: String,
    pub name: String,
    pub adherence: f64,
    pub status: KpiStatus,
    pub impact: ImpactTier,
    pub numerator: u64,
    pub denominator: u64,
    pub observed: f64,
    pub sub_counts: Vec<SubCount>,
    /// Set when the denominator was empty: the adherence of 100 is vacuous
    /// and renderers should say "no data" rather than "perfect".
    pub no_data: bool,
}

/// One key result scored against its target.
#[derive(Debug, Clone, Serialize)]
pub struct KrResult {
    pub id: String,
    pub name: String,
    pub kpi_id: String,
    pub current: f64,
    pub target: f64,
    pub score: f64,
    pub grade: Grade,
    /// current − target, signed. Whether a positive gap is good depends on
    /// the scoring method, so it is surfaced rather than absorbed.
    pub gap: f64,
    pub owner: String,
    pub deadline: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Severity {
    Critical,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Critical => "Critical",
            Severity::Warning => "Warning",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ActionTrigger {
    pub severity: Severity,
    pub kr_id: String,
    pub action: String,
    pub owner: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ObjectiveResult {
    pub id: String,
    pub name: String,
    pub score: f64,
    pub grade: Grade,
    pub key_results: Vec<KrResult>,
    pub actions: Vec<ActionTrigger>,
}

/// Full output of one scoring run, in KPI definition order. Plain data,
/// ready for console, markdown, or JSON rendering.
#[derive(Debug, Clone, Serialize)]
pub struct ScorecardRun {
    pub kpis: Vec<KpiResult>,
    pub weights: BTreeMap<String, f64>,
    pub overall_score: f64,
    pub overall_status: KpiStatus,
    pub objective: ObjectiveResult,
}
