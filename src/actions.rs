use crate::config::KrDef;
use crate::models::{ActionTrigger, Grade, KrResult, Severity};

/// Derives the ordered action list from the scored key results.
///
/// A Critical grade fires the critical trigger, At Risk fires the warning
/// trigger, better grades fire nothing; a key result in a firing grade with
/// no configured trigger stays silent. All critical actions come before all
/// warnings, each group in key-result definition order.
pub fn derive(defs: &[KrDef], results: &[KrResult]) -> Vec<ActionTrigger> {
    let mut triggers = Vec::new();

    for (def, result) in defs.iter().zip(results) {
        if result.grade == Grade::Critical {
            if let Some(spec) = &def.triggers.critical {
                triggers.push(ActionTrigger {
                    severity: Severity::Critical,
                    kr_id: result.id.clone(),
                    action: spec.action.clone(),
                    owner: spec.owner.clone(),
                });
            }
        }
    }

    for (def, result) in defs.iter().zip(results) {
        if result.grade == Grade::AtRisk {
            if let Some(spec) = &def.triggers.warning {
                triggers.push(ActionTrigger {
                    severity: Severity::Warning,
                    kr_id: result.id.clone(),
                    action: spec.action.clone(),
                    owner: spec.owner.clone(),
                });
            }
        }
    }

    triggers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::sample_config;
    use chrono::NaiveDate;

    fn result(def: &KrDef, grade: Grade) -> KrResult {
        KrResult {
            id: def.id.clone(),
            name: def.name.clone(),
            kpi_id: def.kpi.clone(),
            current: 0.0,
            target: def.target,
            score: 0.0,
            grade,
            gap: 0.0,
            owner: def.owner.clone(),
            deadline: NaiveDate::from_ymd_opt(2026, 12, 31).expect("valid date"),
        }
    }

    #[test]
    fn healthy_grades_fire_nothing() {
        let config = sample_config();
        let defs = &config.objective.key_results;
        let results = vec![
            result(&defs[0], Grade::Excellent),
            result(&defs[1], Grade::OnTrack),
            result(&defs[2], Grade::Excellent),
        ];
        assert!(derive(defs, &results).is_empty());
    }

    #[test]
    fn critical_precedes_warning_in_definition_order() {
        let config = sample_config();
        let defs = &config.objective.key_results;
        // KR4 at risk, KR5 at risk, KR6 critical: the critical trigger must
        // come first even though KR6 is defined last.
        let results = vec![
            result(&defs[0], Grade::AtRisk),
            result(&defs[1], Grade::AtRisk),
            result(&defs[2], Grade::Critical),
        ];
        let triggers = derive(defs, &results);
        assert_eq!(triggers.len(), 3);
        assert_eq!(triggers[0].severity, Severity::Critical);
        assert_eq!(triggers[0].kr_id, "KR6");
        assert_eq!(triggers[1].severity, Severity::Warning);
        assert_eq!(triggers[1].kr_id, "KR4");
        assert_eq!(triggers[2].kr_id, "KR5");
    }

    #[test]
    fn missing_trigger_spec_stays_silent() {
        let config = sample_config();
        let defs = &config.objective.key_results;
        // KR5 has no critical trigger configured.
        let results = vec![
            result(&defs[0], Grade::OnTrack),
            result(&defs[1], Grade::Critical),
            result(&defs[2], Grade::OnTrack),
        ];
        assert!(derive(defs, &results).is_empty());
    }

    #[test]
    fn trigger_copies_action_text_and_owner() {
        let config = sample_config();
        let defs = &config.objective.key_results;
        let results = vec![
            result(&defs[0], Grade::Critical),
            result(&defs[1], Grade::OnTrack),
            result(&defs[2], Grade::OnTrack),
        ];
        let triggers = derive(defs, &results);
        assert_eq!(triggers.len(), 1);
        assert_eq!(triggers[0].owner, "Service Operations Lead");
        assert!(triggers[0].action.contains("backlog triage"));
    }
}
