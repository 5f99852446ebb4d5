use crate::band::StatusBands;
use crate::config::{KpiDef, KpiKind, Sense};
use crate::error::ScorecardError;
use crate::models::{Flag, FlaggedRecord, KpiResult, SubCount};

/// Evaluates one KPI over a record collection. Pure: reads only the records
/// and the definition, so evaluations are order-independent.
///
/// An empty collection is a data anomaly, not an error: adherence is a
/// vacuous 100 with the `no_data` marker set. A definition consuming a flag
/// no record carries is a configuration error and aborts the run.
pub fn evaluate(
    records: &[FlaggedRecord],
    def: &KpiDef,
    global_bands: &StatusBands,
) -> Result<KpiResult, ScorecardError> {
    let bands = def.bands.as_ref().unwrap_or(global_bands);

    let (adherence, observed, numerator, denominator, sub_counts, no_data) = match &def.kind {
        KpiKind::CountAgainstTarget { categories } => {
            for category in categories {
                require_flag(records, def, category.flag)?;
            }
            count_against_target(records, categories)
        }
        KpiKind::Proportion {
            flag,
            sense,
            population,
        } => {
            require_flag(records, def, *flag)?;
            if let Some(population) = population {
                require_flag(records, def, *population)?;
            }
            proportion(records, *flag, *sense, *population)
        }
    };

    let result = KpiResult {
        id: def.id.clone(),
        name: def.name.clone(),
        adherence,
        status: bands.classify(adherence),
        impact: bands.impact(adherence),
        numerator,
        denominator,
        observed,
        sub_counts,
        no_data,
    };
    tracing::debug!(
        kpi = %result.id,
        adherence = result.adherence,
        status = %result.status,
        no_data = result.no_data,
        "evaluated KPI"
    );
    Ok(result)
}

fn require_flag(
    records: &[FlaggedRecord],
    def: &KpiDef,
    flag: Flag,
) -> Result<(), ScorecardError> {
    // With no records at all the zero-denominator path applies instead.
    if !records.is_empty() && records.iter().all(|record| record.flag(flag).is_none()) {
        return Err(ScorecardError::FlagMissing {
            kpi: def.id.clone(),
            flag,
        });
    }
    Ok(())
}

/// Count each category and degrade adherence by the worst overage ratio:
/// adherence = 100 × (1 − max overage), floored at zero. A category with a
/// zero ceiling and any matching record is a full miss.
fn count_against_target(
    records: &[FlaggedRecord],
    categories: &[crate::config::CountCategory],
) -> (f64, f64, u64, u64, Vec<SubCount>, bool) {
    let denominator = records.len() as u64;
    let mut sub_counts = Vec::with_capacity(categories.len());
    let mut worst_overage = 0.0f64;
    let mut total = 0u64;

    for category in categories {
        let count = records
            .iter()
            .filter(|record| record.flag(category.flag) == Some(true))
            .count() as u64;
        total += count;

        let overage = if category.max == 0 {
            if count > 0 {
                1.0
            } else {
                0.0
            }
        } else {
            ((count as f64 - category.max as f64) / category.max as f64).max(0.0)
        };
        worst_overage = worst_overage.max(overage);

        sub_counts.push(SubCount {
            label: category.label.clone(),
            count,
            target: category.max,
        });
    }

    let no_data = denominator == 0;
    let adherence = if no_data {
        100.0
    } else {
        (100.0 * (1.0 - worst_overage)).max(0.0)
    };

    (adherence, total as f64, total, denominator, sub_counts, no_data)
}

fn proportion(
    records: &[FlaggedRecord],
    flag: Flag,
    sense: Sense,
    population: Option<Flag>,
) -> (f64, f64, u64, u64, Vec<SubCount>, bool) {
    let eligible: Vec<&FlaggedRecord> = match population {
        Some(population) => records
            .iter()
            .filter(|record| record.flag(population) == Some(true))
            .collect(),
        None => records.iter().collect(),
    };

    let denominator = eligible.len() as u64;
    let numerator = eligible
        .iter()
        .filter(|record| record.flag(flag) == Some(true))
        .count() as u64;

    if denominator == 0 {
        return (100.0, 0.0, numerator, denominator, Vec::new(), true);
    }

    let pct = numerator as f64 / denominator as f64 * 100.0;
    let adherence = match sense {
        Sense::BadState => 100.0 - pct,
        Sense::GoodState => pct,
    };

    (adherence, pct, numerator, denominator, Vec::new(), false)
}
