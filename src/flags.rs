use std::collections::BTreeMap;

use chrono::NaiveDateTime;

use crate::config::ScorecardConfig;
use crate::ingest::{IncidentRow, RequestRow};
use crate::models::{Flag, FlaggedRecord};

const SECONDS_PER_DAY: f64 = 86_400.0;

fn days_between(from: NaiveDateTime, to: NaiveDateTime) -> f64 {
    (to - from).num_seconds() as f64 / SECONDS_PER_DAY
}

/// Derives the per-incident flags the metric evaluator consumes. Ages are
/// measured against an explicit `as_of` instant so runs are reproducible.
pub fn flag_incidents(
    rows: &[IncidentRow],
    config: &ScorecardConfig,
    as_of: NaiveDateTime,
) -> Vec<FlaggedRecord> {
    let backlog_days = config.thresholds.aging.backlog_days;
    let major_levels = &config.thresholds.priority.major_levels;
    let excluded_contacts = &config.thresholds.exclusions.contact_types;

    rows.iter()
        .map(|row| {
            let mut flags = BTreeMap::new();
            flags.insert(Flag::IsP1, row.priority == 1);
            flags.insert(Flag::IsP2, row.priority == 2);
            flags.insert(Flag::IsMajorIncident, major_levels.contains(&row.priority));
            flags.insert(Flag::IsResolved, row.resolved_at.is_some());

            let first_time_fix = row.reassignment_count == 0;
            flags.insert(Flag::IsFirstTimeFix, first_time_fix);

            // Tickets handed in through excluded channels do not count as
            // first-contact resolutions even with zero reassignments. An
            // export without contact types falls back to first-time-fix.
            let not_excluded = row
                .contact_type
                .as_deref()
                .map(|contact| !excluded_contacts.iter().any(|ex| ex == contact))
                .unwrap_or(true);
            flags.insert(Flag::IsFirstContactResolution, first_time_fix && not_excluded);

            let age_days = row
                .opened_at
                .map(|opened| days_between(opened, as_of))
                .unwrap_or(0.0);

            // Backlog means slow whichever way the ticket went: resolved but
            // over the threshold, or still open past it. Without an opened
            // timestamp the flag cannot be derived and stays absent.
            if let Some(opened) = row.opened_at {
                let is_backlog = match row.resolved_at {
                    Some(resolved) => days_between(opened, resolved) > backlog_days,
                    None => age_days > backlog_days,
                };
                flags.insert(Flag::IsBacklog, is_backlog);
            }

            FlaggedRecord {
                id: row.id.clone(),
                priority: row.priority,
                state: row.state.clone(),
                reassignment_count: row.reassignment_count,
                age_days,
                flags,
            }
        })
        .collect()
}

pub fn flag_requests(
    rows: &[RequestRow],
    config: &ScorecardConfig,
    as_of: NaiveDateTime,
) -> Vec<FlaggedRecord> {
    let aging_days = config.thresholds.aging.request_aging_days;
    let fallback_priority = config.thresholds.priority.fallback;

    rows.iter()
        .map(|row| {
            let mut flags = BTreeMap::new();
            flags.insert(Flag::IsClosed, row.closed_at.is_some());

            let age_days = row
                .opened_at
                .map(|opened| days_between(opened, as_of))
                .unwrap_or(0.0);
            if row.opened_at.is_some() {
                flags.insert(Flag::IsAged, age_days > aging_days);
            }

            FlaggedRecord {
                id: row.id.clone(),
                priority: fallback_priority,
                state: row.state.clone(),
                reassignment_count: 0,
                age_days,
                flags,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::sample_config;
    use chrono::NaiveDate;

    fn as_of() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 6, 1)
            .expect("valid date")
            .and_hms_opt(12, 0, 0)
            .expect("valid time")
    }

    fn ts(y: i32, m: u32, d: u32) -> Option<NaiveDateTime> {
        NaiveDate::from_ymd_opt(y, m, d).and_then(|date| date.and_hms_opt(12, 0, 0))
    }

    fn incident(priority: i64, opened: Option<NaiveDateTime>) -> IncidentRow {
        IncidentRow {
            id: "INC001".to_string(),
            priority,
            state: "In Progress".to_string(),
            opened_at: opened,
            resolved_at: None,
            reassignment_count: 0,
            contact_type: None,
        }
    }

    #[test]
    fn priority_flags_follow_major_levels() {
        let config = sample_config();
        let rows = vec![incident(1, ts(2026, 5, 30)), incident(2, ts(2026, 5, 30)), incident(3, ts(2026, 5, 30))];
        let flagged = flag_incidents(&rows, &config, as_of());
        assert_eq!(flagged[0].flag(Flag::IsP1), Some(true));
        assert_eq!(flagged[0].flag(Flag::IsMajorIncident), Some(true));
        assert_eq!(flagged[1].flag(Flag::IsP2), Some(true));
        assert_eq!(flagged[1].flag(Flag::IsMajorIncident), Some(true));
        assert_eq!(flagged[2].flag(Flag::IsMajorIncident), Some(false));
    }

    #[test]
    fn backlog_covers_slow_resolved_and_old_open() {
        let config = sample_config();
        let mut slow_resolved = incident(3, ts(2026, 5, 1));
        slow_resolved.resolved_at = ts(2026, 5, 20); // 19 days to resolve
        let mut quick_resolved = incident(3, ts(2026, 5, 1));
        quick_resolved.resolved_at = ts(2026, 5, 4);
        let old_open = incident(3, ts(2026, 5, 1)); // 31 days open at as_of
        let fresh_open = incident(3, ts(2026, 5, 30));

        let flagged = flag_incidents(
            &[slow_resolved, quick_resolved, old_open, fresh_open],
            &config,
            as_of(),
        );
        assert_eq!(flagged[0].flag(Flag::IsBacklog), Some(true));
        assert_eq!(flagged[1].flag(Flag::IsBacklog), Some(false));
        assert_eq!(flagged[2].flag(Flag::IsBacklog), Some(true));
        assert_eq!(flagged[3].flag(Flag::IsBacklog), Some(false));
    }

    #[test]
    fn backlog_flag_absent_without_opened_timestamp() {
        let config = sample_config();
        let flagged = flag_incidents(&[incident(3, None)], &config, as_of());
        assert_eq!(flagged[0].flag(Flag::IsBacklog), None);
        assert_eq!(flagged[0].age_days, 0.0);
    }

    #[test]
    fn excluded_contact_types_block_first_contact_resolution() {
        let config = sample_config();
        let mut phone = incident(3, ts(2026, 5, 30));
        phone.contact_type = Some("phone".to_string());
        let mut portal = incident(3, ts(2026, 5, 30));
        portal.contact_type = Some("self-service".to_string());
        let mut reassigned = incident(3, ts(2026, 5, 30));
        reassigned.contact_type = Some("phone".to_string());
        reassigned.reassignment_count = 2;
        let no_channel = incident(3, ts(2026, 5, 30));

        let flagged = flag_incidents(&[phone, portal, reassigned, no_channel], &config, as_of());
        assert_eq!(flagged[0].flag(Flag::IsFirstContactResolution), Some(true));
        assert_eq!(flagged[1].flag(Flag::IsFirstContactResolution), Some(false));
        assert_eq!(flagged[2].flag(Flag::IsFirstTimeFix), Some(false));
        assert_eq!(flagged[2].flag(Flag::IsFirstContactResolution), Some(false));
        assert_eq!(flagged[3].flag(Flag::IsFirstContactResolution), Some(true));
    }

    #[test]
    fn requests_age_against_threshold() {
        let config = sample_config();
        let old = RequestRow {
            id: "REQ001".to_string(),
            state: "Open".to_string(),
            opened_at: ts(2026, 4, 1), // 61 days at as_of
            closed_at: None,
        };
        let recent = RequestRow {
            id: "REQ002".to_string(),
            state: "Closed".to_string(),
            opened_at: ts(2026, 5, 20),
            closed_at: ts(2026, 5, 25),
        };
        let flagged = flag_requests(&[old, recent], &config, as_of());
        assert_eq!(flagged[0].flag(Flag::IsAged), Some(true));
        assert_eq!(flagged[0].flag(Flag::IsClosed), Some(false));
        assert_eq!(flagged[1].flag(Flag::IsAged), Some(false));
        assert_eq!(flagged[1].flag(Flag::IsClosed), Some(true));
    }
}
