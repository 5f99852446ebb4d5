use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Utc};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod actions;
mod band;
mod config;
mod error;
mod flags;
mod ingest;
mod kpi;
mod models;
mod okr;
mod pipeline;
mod report;
mod scorecard;
mod weights;

use config::{RecordSource, ScorecardConfig};
use models::{ScorecardRun, Severity};
use pipeline::RecordSet;

#[derive(Parser)]
#[command(name = "servicedesk-scorecard")]
#[command(about = "KPI/OKR scorecard for service desk ticket exports", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct InputArgs {
    #[arg(long, default_value = "config/scorecard.yaml")]
    config: PathBuf,
    #[arg(long)]
    incidents: PathBuf,
    /// Required when any enabled KPI scores the request domain.
    #[arg(long)]
    requests: Option<PathBuf>,
    /// Reference date for age calculations; defaults to now.
    #[arg(long)]
    as_of: Option<NaiveDate>,
}

#[derive(Subcommand)]
enum Commands {
    /// Score the exports and print the scorecard
    Score {
        #[command(flatten)]
        input: InputArgs,
        /// Also write the full result set as JSON
        #[arg(long)]
        json: Option<PathBuf>,
    },
    /// Generate a markdown report
    Report {
        #[command(flatten)]
        input: InputArgs,
        #[arg(long, default_value = "scorecard.md")]
        out: PathBuf,
    },
    /// Validate a configuration file without scoring anything
    CheckConfig {
        #[arg(long, default_value = "config/scorecard.yaml")]
        config: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Score { input, json } => {
            let (_config, _records, run, _) = score(&input)?;
            render_console(&run);
            if let Some(path) = json {
                let payload = serde_json::to_string_pretty(&run)?;
                std::fs::write(&path, payload)
                    .with_context(|| format!("failed to write {}", path.display()))?;
                println!("\nResults written to {}.", path.display());
            }
        }
        Commands::Report { input, out } => {
            let (config, records, run, as_of) = score(&input)?;
            let report = report::build_report(&run, &records, &config, as_of);
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
        Commands::CheckConfig { config } => {
            let config = ScorecardConfig::load(&config)?;
            println!(
                "Configuration ok: {} KPIs, {} key results.",
                config.kpis.len(),
                config.objective.key_results.len()
            );
        }
    }

    Ok(())
}

fn score(
    input: &InputArgs,
) -> anyhow::Result<(ScorecardConfig, RecordSet, ScorecardRun, NaiveDateTime)> {
    let config = ScorecardConfig::load(&input.config)?;
    let as_of = input
        .as_of
        .map(|date| date.and_time(NaiveTime::MIN))
        .unwrap_or_else(|| Utc::now().naive_utc());

    let records = load_records(&config, &input.incidents, input.requests.as_deref(), as_of)?;
    let run = pipeline::run(&records, &config).context("scoring run failed")?;
    Ok((config, records, run, as_of))
}

fn load_records(
    config: &ScorecardConfig,
    incidents_path: &Path,
    requests_path: Option<&Path>,
    as_of: NaiveDateTime,
) -> anyhow::Result<RecordSet> {
    let incidents = ingest::load_incidents(incidents_path, config)?;
    let incidents = flags::flag_incidents(&incidents, config, as_of);

    let needs_requests = config
        .kpis
        .iter()
        .any(|kpi| kpi.enabled && kpi.source == RecordSource::Requests);
    let requests = match (needs_requests, requests_path) {
        (true, Some(path)) => {
            let rows = ingest::load_requests(path, config)?;
            flags::flag_requests(&rows, config, as_of)
        }
        (true, None) => {
            bail!("an enabled KPI scores requests; pass --requests with the request export")
        }
        (false, _) => Vec::new(),
    };

    Ok(RecordSet {
        incidents,
        requests,
    })
}

fn render_console(run: &ScorecardRun) {
    println!(
        "Overall score: {:.1}/100 ({})",
        run.overall_score, run.overall_status
    );
    println!("\nKPIs:");
    for kpi in &run.kpis {
        let weight = run.weights.get(&kpi.id).copied().unwrap_or(0.0);
        if kpi.no_data {
            println!("- {} ({}): no data in window, weight {weight:.0}%", kpi.name, kpi.id);
        } else {
            println!(
                "- {} ({}): {:.1}% adherence ({}), weight {weight:.0}%",
                kpi.name, kpi.id, kpi.adherence, kpi.status
            );
        }
    }

    let objective = &run.objective;
    println!(
        "\nObjective {} ({}): {:.1}/100 ({})",
        objective.id, objective.name, objective.score, objective.grade
    );
    for kr in &objective.key_results {
        println!(
            "- {} ({}): score {:.1} ({}), current {:.1} vs target {:.1}",
            kr.name, kr.id, kr.score, kr.grade, kr.current, kr.target
        );
    }

    if objective.actions.is_empty() {
        println!("\nNo action triggers.");
    } else {
        println!("\nActions:");
        for action in &objective.actions {
            let marker = match action.severity {
                Severity::Critical => "CRITICAL",
                Severity::Warning => "warning",
            };
            println!(
                "- [{}] {}: {} (owner: {})",
                marker, action.kr_id, action.action, action.owner
            );
        }
    }
}
