use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use anyhow::{bail, Context};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::ScorecardConfig;

/// Raw incident row, column-remapped but not yet flagged.
#[derive(Debug, Clone)]
pub struct IncidentRow {
    pub id: String,
    pub priority: i64,
    pub state: String,
    pub opened_at: Option<NaiveDateTime>,
    pub resolved_at: Option<NaiveDateTime>,
    pub reassignment_count: u32,
    /// None when the export has no contact-type column at all.
    pub contact_type: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RequestRow {
    pub id: String,
    pub state: String,
    pub opened_at: Option<NaiveDateTime>,
    pub closed_at: Option<NaiveDateTime>,
}

static FIRST_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").expect("valid regex"));

/// Pulls the numeric level out of priority strings like "1 - Critical".
pub fn extract_priority(raw: &str, fallback: i64) -> i64 {
    FIRST_NUMBER
        .find(raw)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(fallback)
}

/// ServiceNow exports mix full timestamps and bare dates; anything else is
/// treated as absent, mirroring how the pipeline tolerates dirty cells.
fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .map(|date| date.and_time(NaiveTime::MIN))
        })
}

struct HeaderIndex {
    columns: HashMap<String, usize>,
}

impl HeaderIndex {
    fn new(headers: &csv::StringRecord) -> Self {
        let columns = headers
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.trim().to_string(), idx))
            .collect();
        Self { columns }
    }

    fn position(&self, column: &str) -> Option<usize> {
        self.columns.get(column).copied()
    }

    fn get<'a>(&self, record: &'a csv::StringRecord, column: &str) -> Option<&'a str> {
        self.position(column)
            .and_then(|idx| record.get(idx))
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }
}

pub fn load_incidents(path: &Path, config: &ScorecardConfig) -> anyhow::Result<Vec<IncidentRow>> {
    let reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open incidents file {}", path.display()))?;
    let rows = read_incidents(reader, config)
        .with_context(|| format!("failed to read incidents file {}", path.display()))?;
    tracing::info!(count = rows.len(), file = %path.display(), "loaded incidents");
    Ok(rows)
}

pub fn read_incidents<R: Read>(
    mut reader: csv::Reader<R>,
    config: &ScorecardConfig,
) -> anyhow::Result<Vec<IncidentRow>> {
    let columns = &config.columns;
    let headers = HeaderIndex::new(reader.headers()?);

    let id_col = columns.incident_column("number").to_string();
    let priority_col = columns.incident_column("priority").to_string();
    let opened_col = columns.incident_column("opened_at").to_string();
    let state_col = columns.incident_column("state").to_string();
    let resolved_col = columns.incident_column("resolved_at").to_string();
    let reassign_col = columns.incident_column("reassignment_count").to_string();
    let contact_col = columns.incident_column("contact_type").to_string();

    for required in [&id_col, &priority_col, &opened_col] {
        if headers.position(required).is_none() {
            bail!("incidents file is missing required column '{required}'");
        }
    }
    let has_contact_column = headers.position(&contact_col).is_some();

    let fallback_priority = config.thresholds.priority.fallback;
    let mut rows = Vec::new();
    let mut unparsed_dates = 0usize;

    for record in reader.records() {
        let record = record?;
        let opened_at = match headers.get(&record, &opened_col) {
            Some(raw) => {
                let parsed = parse_timestamp(raw);
                if parsed.is_none() {
                    unparsed_dates += 1;
                }
                parsed
            }
            None => None,
        };
        let resolved_at = headers.get(&record, &resolved_col).and_then(parse_timestamp);

        rows.push(IncidentRow {
            id: headers.get(&record, &id_col).unwrap_or_default().to_string(),
            priority: headers
                .get(&record, &priority_col)
                .map(|raw| extract_priority(raw, fallback_priority))
                .unwrap_or(fallback_priority),
            state: headers.get(&record, &state_col).unwrap_or_default().to_string(),
            opened_at,
            resolved_at,
            // Null reassignment counts mean the ticket never left its first
            // group, so they count as zero.
            reassignment_count: headers
                .get(&record, &reassign_col)
                .and_then(|raw| raw.parse().ok())
                .unwrap_or(0),
            contact_type: if has_contact_column {
                Some(headers.get(&record, &contact_col).unwrap_or_default().to_string())
            } else {
                None
            },
        });
    }

    if unparsed_dates > 0 {
        tracing::warn!(count = unparsed_dates, "incident rows with unparseable opened_at");
    }

    Ok(rows)
}

pub fn load_requests(path: &Path, config: &ScorecardConfig) -> anyhow::Result<Vec<RequestRow>> {
    let reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open requests file {}", path.display()))?;
    let rows = read_requests(reader, config)
        .with_context(|| format!("failed to read requests file {}", path.display()))?;
    tracing::info!(count = rows.len(), file = %path.display(), "loaded requests");
    Ok(rows)
}

pub fn read_requests<R: Read>(
    mut reader: csv::Reader<R>,
    config: &ScorecardConfig,
) -> anyhow::Result<Vec<RequestRow>> {
    let columns = &config.columns;
    let headers = HeaderIndex::new(reader.headers()?);

    let id_col = columns.request_column("number").to_string();
    let opened_col = columns.request_column("opened_at").to_string();
    let state_col = columns.request_column("state").to_string();
    let closed_col = columns.request_column("closed_at").to_string();

    for required in [&id_col, &opened_col] {
        if headers.position(required).is_none() {
            bail!("requests file is missing required column '{required}'");
        }
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(RequestRow {
            id: headers.get(&record, &id_col).unwrap_or_default().to_string(),
            state: headers.get(&record, &state_col).unwrap_or_default().to_string(),
            opened_at: headers.get(&record, &opened_col).and_then(parse_timestamp),
            closed_at: headers.get(&record, &closed_col).and_then(parse_timestamp),
        });
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::sample_config;
    use std::io::Cursor;

    fn incident_reader(data: &str) -> csv::Reader<Cursor<Vec<u8>>> {
        csv::Reader::from_reader(Cursor::new(data.as_bytes().to_vec()))
    }

    #[test]
    fn priority_extraction_takes_first_number() {
        assert_eq!(extract_priority("1 - Critical", 99), 1);
        assert_eq!(extract_priority("2 - High", 99), 2);
        assert_eq!(extract_priority("Priority 3", 99), 3);
        assert_eq!(extract_priority("unknown", 99), 99);
    }

    #[test]
    fn incidents_apply_column_remapping() {
        let config = sample_config();
        let data = "number,priority,opened_at,u_resolved,incident_state,reassignment_count,contact_type\n\
                    INC001,1 - Critical,2026-05-01 09:00:00,2026-05-02 10:00:00,Resolved,0,phone\n\
                    INC002,3 - Moderate,2026-05-03 11:30:00,,In Progress,2,self-service\n";
        let rows = read_incidents(incident_reader(data), &config).expect("rows parse");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, "INC001");
        assert_eq!(rows[0].priority, 1);
        assert!(rows[0].resolved_at.is_some());
        assert_eq!(rows[0].state, "Resolved");
        assert_eq!(rows[1].priority, 3);
        assert!(rows[1].resolved_at.is_none());
        assert_eq!(rows[1].reassignment_count, 2);
        assert_eq!(rows[1].contact_type.as_deref(), Some("self-service"));
    }

    #[test]
    fn missing_contact_column_yields_none() {
        let config = sample_config();
        let data = "number,priority,opened_at\nINC001,2 - High,2026-05-01 09:00:00\n";
        let rows = read_incidents(incident_reader(data), &config).expect("rows parse");
        assert_eq!(rows[0].contact_type, None);
        assert_eq!(rows[0].reassignment_count, 0);
    }

    #[test]
    fn unparseable_dates_become_absent() {
        let config = sample_config();
        let data = "number,priority,opened_at,u_resolved\n\
                    INC001,2 - High,not a date,garbage\n\
                    INC002,2 - High,2026-05-01,\n";
        let rows = read_incidents(incident_reader(data), &config).expect("rows parse");
        assert!(rows[0].opened_at.is_none());
        assert!(rows[0].resolved_at.is_none());
        // Bare dates parse at midnight.
        assert!(rows[1].opened_at.is_some());
    }

    #[test]
    fn missing_required_column_is_an_error() {
        let config = sample_config();
        let data = "number,opened_at\nINC001,2026-05-01 09:00:00\n";
        let err = read_incidents(incident_reader(data), &config).unwrap_err();
        assert!(err.to_string().contains("priority"));
    }

    #[test]
    fn requests_parse_with_defaults() {
        let config = sample_config();
        let data = "number,state,opened_at,closed_at\n\
                    REQ001,Open,2026-04-01 08:00:00,\n\
                    REQ002,Closed,2026-04-15 08:00:00,2026-04-20 17:00:00\n";
        let reader = csv::Reader::from_reader(Cursor::new(data.as_bytes().to_vec()));
        let rows = read_requests(reader, &config).expect("rows parse");
        assert_eq!(rows.len(), 2);
        assert!(rows[0].closed_at.is_none());
        assert!(rows[1].closed_at.is_some());
    }

    #[test]
    fn load_incidents_reads_from_disk() {
        let config = sample_config();
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("incidents.csv");
        std::fs::write(&path, "number,priority,opened_at\nINC001,1 - Critical,2026-05-01 09:00:00\n")
            .expect("write csv");
        let rows = load_incidents(&path, &config).expect("load");
        assert_eq!(rows.len(), 1);
    }
}
