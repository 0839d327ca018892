use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tabled::{settings::Style, Table, Tabled};
use tracing::{error, info, warn};

use injuryrs::error::ErrorSeverity;
use injuryrs::logging::init_logging;
use injuryrs::processor::to_entries;
use injuryrs::{
    AppConfig, BodyPartInjuryRisk, BodyPartSide, InjuryRiskError, InjuryRiskProcessor, InputBundle,
    OutputView, ReplaySummary, RiskEntry, StaticAnatomy,
};

/// injuryrs - Injury Risk Analysis CLI
///
/// Replays self-reported symptoms and training load day by day and reports
/// per body part risk classifications and tiers.
#[derive(Parser)]
#[command(name = "injuryrs")]
#[command(author = "injuryrs Contributors")]
#[command(version = "0.1.0")]
#[command(about = "Injury Risk Analysis CLI", long_about = None)]
struct Cli {
    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase verbosity of output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay an input bundle and report injury risk
    Process {
        /// Input bundle (JSON)
        #[arg(short, long)]
        input: PathBuf,

        /// First processing date (YYYY-MM-DD), defaults to the earliest input date
        #[arg(short, long)]
        from: Option<NaiveDate>,

        /// Last processing date (YYYY-MM-DD), defaults to the latest input date
        #[arg(short, long)]
        to: Option<NaiveDate>,

        /// Output view (muscle, group, viz)
        #[arg(long, default_value = "muscle")]
        view: OutputView,

        /// Output format
        #[arg(short = 'F', long, value_enum, default_value = "table")]
        format: OutputFormat,

        /// Write the report to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Configure application settings
    Config {
        /// Write a default configuration file
        #[arg(long)]
        init: bool,

        /// Print the effective configuration
        #[arg(long)]
        show: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Table,
}

#[derive(Serialize)]
struct RiskReport {
    view: OutputView,
    start: NaiveDate,
    end: NaiveDate,
    records: Vec<RiskEntry>,
}

#[derive(Tabled)]
struct RiskRow {
    #[tabled(rename = "Body part")]
    body_part: String,
    #[tabled(rename = "Side")]
    side: String,
    #[tabled(rename = "Sharp 0-10")]
    sharp: u32,
    #[tabled(rename = "Ache 0-20")]
    ache: u32,
    #[tabled(rename = "Last inflammation")]
    inflammation: String,
    #[tabled(rename = "Last spasm")]
    spasm: String,
    #[tabled(rename = "Last adhesions")]
    adhesions: String,
    #[tabled(rename = "Volume")]
    volume_tier: u8,
    #[tabled(rename = "Ecc volume")]
    eccentric_volume_tier: u8,
    #[tabled(rename = "Comp %")]
    compensation_tier: u8,
    #[tabled(rename = "Mobility")]
    mobility_tier: u8,
    #[tabled(rename = "Weak")]
    weak_tier: u8,
}

impl RiskRow {
    fn new(body_part: &BodyPartSide, record: &BodyPartInjuryRisk) -> Self {
        let date = |d: Option<NaiveDate>| d.map_or_else(|| "-".to_string(), |d| d.to_string());
        Self {
            body_part: body_part.body_part_location.to_string(),
            side: format!("{:?}", body_part.side).to_lowercase(),
            sharp: record.sharp_count_last_0_10_days,
            ache: record.ache_count_last_0_20_days,
            inflammation: date(record.last_inflammation_date),
            spasm: date(record.last_muscle_spasm_date),
            adhesions: date(record.last_adhesions_date),
            volume_tier: record.total_volume_tier,
            eccentric_volume_tier: record.eccentric_volume_tier,
            compensation_tier: record.total_compensation_percent_tier,
            mobility_tier: record.limited_mobility_tier,
            weak_tier: record.underactive_weak_tier,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load_or_default(cli.config.as_deref());
    config.logging.level = config.logging.level.raised_by(cli.verbose);
    init_logging(&config.logging)?;

    if cli.verbose > 0 {
        eprintln!("{}", format!("Log level: {}", config.logging.level.to_filter()).dimmed());
    }

    match cli.command {
        Commands::Process {
            input,
            from,
            to,
            view,
            format,
            output,
        } => run_process(&config, &input, from, to, view, format, output.as_deref()),

        Commands::Config { init, show } => run_config(config, cli.config.as_deref(), init, show),
    }
}

fn run_process(
    config: &AppConfig,
    input: &Path,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    view: OutputView,
    format: OutputFormat,
    output: Option<&Path>,
) -> Result<()> {
    let mut bundle = InputBundle::load_from_file(input)
        .with_context(|| format!("Failed to load input bundle: {}", input.display()))?;

    let Some((first, last)) = input_date_range(&bundle) else {
        warn!("Input bundle has no symptoms or sessions");
        println!("{}", "Nothing to process: the input has no dated records".yellow());
        return Ok(());
    };
    let start = from.unwrap_or(first);
    let end = to.unwrap_or(last);

    let anatomy = StaticAnatomy::new();
    let previous = bundle.take_previous_records();
    let mut processor = InjuryRiskProcessor::new(&anatomy, config.engine.clone())?
        .with_records(previous)
        .with_load_stats(bundle.load_stats.clone());
    processor.add_symptoms(&bundle.symptoms)?;
    processor.add_sessions(bundle.sessions);

    let summary = match processor.process(start, end) {
        Ok(summary) => summary,
        Err(err) => return Err(report_error(err)),
    };
    info!(%start, %end, %view, "Writing report");

    let records = processor.output(view);
    let rendered = match format {
        OutputFormat::Json => serde_json::to_string_pretty(&RiskReport {
            view,
            start,
            end,
            records: to_entries(&records),
        })?,
        OutputFormat::Table => render_table(&records),
    };

    match output {
        Some(path) => {
            fs::write(path, &rendered)
                .with_context(|| format!("Failed to write report: {}", path.display()))?;
            println!("{}", format!("✓ Report written to {}", path.display()).green());
        }
        None => println!("{}", rendered),
    }

    if format == OutputFormat::Table || output.is_some() {
        print_summary(&summary);
    }

    Ok(())
}

fn run_config(mut config: AppConfig, path: Option<&Path>, init: bool, show: bool) -> Result<()> {
    if init {
        let written = match path {
            Some(path) => {
                config.save_to_file(path)?;
                path.to_path_buf()
            }
            None => config.save_default()?,
        };
        println!("{}", format!("✓ Configuration written to {}", written.display()).green());
    }

    if show || !init {
        println!("{}", toml::to_string_pretty(&config)?);
    }

    Ok(())
}

/// Earliest and latest dates across symptoms and sessions
fn input_date_range(bundle: &InputBundle) -> Option<(NaiveDate, NaiveDate)> {
    let dates = bundle
        .symptoms
        .iter()
        .map(|event| event.event_date())
        .chain(bundle.sessions.iter().map(|session| session.event_date()));

    dates.fold(None, |range, date| match range {
        None => Some((date, date)),
        Some((first, last)) => Some((first.min(date), last.max(date))),
    })
}

fn render_table(records: &BTreeMap<BodyPartSide, BodyPartInjuryRisk>) -> String {
    let rows: Vec<RiskRow> = records
        .iter()
        .map(|(body_part, record)| RiskRow::new(body_part, record))
        .collect();

    let mut table = Table::new(rows);
    table.with(Style::rounded());
    table.to_string()
}

fn print_summary(summary: &ReplaySummary) {
    println!(
        "{}",
        format!("Processed {} to {} ({} days)", summary.start, summary.end, summary.days.len())
            .blue()
            .bold()
    );
    println!("  Body parts tracked: {}", summary.body_parts);
    println!("  Dysfunctions: {}", summary.total_dysfunctions());
    println!("  Imbalance promotions: {}", summary.total_promotions());
    if let Some(last) = summary.days.last() {
        println!("  Final relative load level: {}", last.relative_load_level);
    }
}

fn report_error(err: InjuryRiskError) -> anyhow::Error {
    if err.severity() == ErrorSeverity::Warning {
        warn!(error = %err, "Processing stopped");
    } else {
        error!(error = %err, "Processing stopped");
    }
    eprintln!("{}", err.user_message().red().bold());
    err.into()
}
