//! Timeledger CLI - command-line interface for the scoring engine
//!
//! Commands:
//! - run: Aggregate a day's usage, check goals, update the running score
//! - goals: Edit the persisted goal store (list/set/remove/clear)
//! - points: Inspect or edit the persisted running score
//! - validate: Validate raw usage records against usage.raw_record.v1
//! - doctor: Diagnose store files and configuration

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;

use chrono::NaiveDate;
use timeledger::pipeline::LedgerProcessor;
use timeledger::report::{render_text, ReportEncoder};
use timeledger::schema::{RawRecordAdapter, RawUsageRecord, SCHEMA_VERSION};
use timeledger::source::{apply_filter, NdjsonLogSource, QueryFilter};
use timeledger::store::{GoalEdit, GoalStore, ScoreEdit, ScoreStore};
use timeledger::types::{RunOutcome, RunWarning, WarningKind};
use timeledger::{EngineError, DEFAULT_RATE_PER_MINUTE, LEDGER_VERSION, PRODUCER_NAME};

/// Timeledger - aggregate screen time and score goal violations
#[derive(Parser)]
#[command(name = "timeledger")]
#[command(version = LEDGER_VERSION)]
#[command(about = "Aggregate usage records and score goal violations", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate usage, check goals, and update the running score
    Run {
        /// Input usage log path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Only keep records starting on this local date (YYYY-MM-DD)
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Drop web usage (url/domain) from every record
        #[arg(long)]
        apps_only: bool,

        /// Substring filter on the raw app identifier
        #[arg(long)]
        app_filter: Option<String>,

        /// Maximum number of records to process
        #[arg(long)]
        limit: Option<usize>,

        /// Goal store path
        #[arg(long, default_value = "goals.json")]
        goals: PathBuf,

        /// Score store path
        #[arg(long, default_value = "points.json")]
        points: PathBuf,

        /// Penalty rate in points per minute of overage
        #[arg(long, default_value_t = DEFAULT_RATE_PER_MINUTE)]
        rate: f64,

        /// Report output path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Report format
        #[arg(long, default_value = "text")]
        format: ReportFormat,
    },

    /// Edit the persisted goal store
    Goals {
        /// Goal store path
        #[arg(long, default_value = "goals.json")]
        file: PathBuf,

        #[command(subcommand)]
        action: GoalAction,
    },

    /// Inspect or edit the persisted running score
    Points {
        /// Score store path
        #[arg(long, default_value = "points.json")]
        file: PathBuf,

        #[command(subcommand)]
        action: PointsAction,
    },

    /// Validate raw usage records
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Diagnose store files and configuration
    Doctor {
        /// Goal store path to check
        #[arg(long)]
        goals: Option<PathBuf>,

        /// Score store path to check
        #[arg(long)]
        points: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum GoalAction {
    /// List all goals
    List,
    /// Add or update a goal
    Set {
        /// Canonical target name (app or domain key, e.g. "Youtube")
        target: String,
        /// Limit expression (e.g. "2 hours", "30 minutes", "45")
        limit: String,
    },
    /// Remove a goal
    Remove { target: String },
    /// Remove every goal
    Clear,
}

#[derive(Subcommand)]
enum PointsAction {
    /// Show the current running score
    Show,
    /// Set the running score to an exact value
    Reset { points: f64 },
    /// Shift the running score by a delta
    Adjust { delta: f64 },
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// Newline-delimited JSON (one record per line)
    Ndjson,
    /// JSON array of records
    Json,
}

#[derive(Clone, ValueEnum)]
enum ReportFormat {
    /// Human-readable text
    Text,
    /// Compact JSON
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), LedgerCliError> {
    match cli.command {
        Commands::Run {
            input,
            input_format,
            date,
            apps_only,
            app_filter,
            limit,
            goals,
            points,
            rate,
            output,
            format,
        } => cmd_run(
            &input,
            input_format,
            date,
            apps_only,
            app_filter,
            limit,
            &goals,
            &points,
            rate,
            &output,
            format,
        ),

        Commands::Goals { file, action } => cmd_goals(&file, action),

        Commands::Points { file, action } => cmd_points(&file, action),

        Commands::Validate {
            input,
            input_format,
            json,
        } => cmd_validate(&input, input_format, json),

        Commands::Doctor {
            goals,
            points,
            json,
        } => cmd_doctor(goals.as_deref(), points.as_deref(), json),
    }
}

#[allow(clippy::too_many_arguments)]
fn cmd_run(
    input: &PathBuf,
    input_format: InputFormat,
    date: Option<NaiveDate>,
    apps_only: bool,
    app_filter: Option<String>,
    limit: Option<usize>,
    goals_path: &PathBuf,
    points_path: &PathBuf,
    rate: f64,
    output: &PathBuf,
    format: ReportFormat,
) -> Result<(), LedgerCliError> {
    let goal_store = GoalStore::new(goals_path);
    let score_store = ScoreStore::new(points_path);

    let mut processor = LedgerProcessor::with_rate(rate);
    let store_warnings = processor.load_stores(&goal_store, &score_store);

    let filter = QueryFilter {
        limit,
        app_filter,
        date,
        include_web: !apps_only,
    };

    let is_stdin = input.to_string_lossy() == "-";
    let mut outcome = if !is_stdin && matches!(input_format, InputFormat::Ndjson) {
        // File-backed NDJSON goes through the source trait so a missing or
        // unreadable log degrades to an empty run
        let source = NdjsonLogSource::new(input);
        processor.process_source(&source, &filter)?
    } else {
        run_from_content(&mut processor, input, input_format, &filter)?
    };

    // Warnings from store loading come first in the report
    for warning in store_warnings.into_iter().rev() {
        outcome.warnings.insert(0, warning);
    }

    // Persist unconditionally, even on a clean run, so the store stays
    // present and current; this is the only run-level failure point
    score_store.save(&processor.score())?;

    let encoder = ReportEncoder::new();
    let rendered = match format {
        ReportFormat::Text => render_text(&encoder.encode(&outcome, date)),
        ReportFormat::Json => serde_json::to_string(&encoder.encode(&outcome, date))?,
        ReportFormat::JsonPretty => encoder.encode_to_json(&outcome, date)?,
    };

    if output.to_string_lossy() == "-" {
        print!("{}", rendered);
    } else {
        fs::write(output, rendered)?;
    }

    Ok(())
}

/// Run from stdin or a JSON-array file, with missing-file degrade semantics
fn run_from_content(
    processor: &mut LedgerProcessor,
    input: &PathBuf,
    input_format: InputFormat,
    filter: &QueryFilter,
) -> Result<RunOutcome, LedgerCliError> {
    let content = if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Some(buffer)
    } else {
        match fs::read_to_string(input) {
            Ok(content) => Some(content),
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied
                ) =>
            {
                None
            }
            Err(e) => return Err(e.into()),
        }
    };

    match content {
        Some(content) => {
            let raw = match input_format {
                InputFormat::Ndjson => RawRecordAdapter::parse_ndjson(&content)?,
                InputFormat::Json => RawRecordAdapter::parse_array(&content)?,
            };
            let records = apply_filter(RawRecordAdapter::to_usage(raw)?, filter);
            Ok(processor.process(&records))
        }
        None => {
            let mut outcome = processor.process(&[]);
            outcome.warnings.insert(
                0,
                RunWarning::new(
                    WarningKind::SourceUnavailable,
                    format!("{}: not readable", input.display()),
                ),
            );
            Ok(outcome)
        }
    }
}

fn cmd_goals(file: &PathBuf, action: GoalAction) -> Result<(), LedgerCliError> {
    let store = GoalStore::new(file);

    match action {
        GoalAction::List => {
            let (goals, _) = store.load();
            if goals.is_empty() {
                println!("No goals set");
            } else {
                for (target, limit) in &goals {
                    println!("{}: {}", target, limit);
                }
            }
        }
        GoalAction::Set { target, limit } => {
            store.apply(GoalEdit::Set {
                target: target.clone(),
                limit: limit.clone(),
            })?;
            println!("Goal set: {} -> {}", target, limit);
        }
        GoalAction::Remove { target } => {
            store.apply(GoalEdit::Remove {
                target: target.clone(),
            })?;
            println!("Goal removed: {}", target);
        }
        GoalAction::Clear => {
            store.apply(GoalEdit::Clear)?;
            println!("All goals removed");
        }
    }

    Ok(())
}

fn cmd_points(file: &PathBuf, action: PointsAction) -> Result<(), LedgerCliError> {
    let store = ScoreStore::new(file);

    match action {
        PointsAction::Show => {
            let (state, _) = store.load();
            println!("Points: {:.2}", state.points);
        }
        PointsAction::Reset { points } => {
            let state = store.apply(ScoreEdit::Reset { points })?;
            println!("Points reset to {:.2}", state.points);
        }
        PointsAction::Adjust { delta } => {
            let state = store.apply(ScoreEdit::Adjust { delta })?;
            println!("Points adjusted to {:.2}", state.points);
        }
    }

    Ok(())
}

fn cmd_validate(
    input: &PathBuf,
    input_format: InputFormat,
    json: bool,
) -> Result<(), LedgerCliError> {
    let content = if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        fs::read_to_string(input)?
    };

    let records: Vec<RawUsageRecord> = match input_format {
        InputFormat::Ndjson => RawRecordAdapter::parse_ndjson(&content)?,
        InputFormat::Json => RawRecordAdapter::parse_array(&content)?,
    };

    let issues = RawRecordAdapter::validate_records(&records);

    let report = ValidationReport {
        total_records: records.len(),
        valid_records: records.len() - issues.len(),
        invalid_records: issues.len(),
        errors: issues
            .iter()
            .map(|issue| ValidationErrorDetail {
                index: issue.index,
                app: issue.app.clone(),
                error: issue.error.to_string(),
            })
            .collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Total records:   {}", report.total_records);
        println!("Valid records:   {}", report.valid_records);
        println!("Invalid records: {}", report.invalid_records);

        if !report.errors.is_empty() {
            println!("\nErrors:");
            for err in &report.errors {
                println!("  - Record {} ({}): {}", err.index, err.app, err.error);
            }
        }
    }

    if report.invalid_records > 0 {
        Err(LedgerCliError::ValidationFailed(report.invalid_records))
    } else {
        Ok(())
    }
}

fn cmd_doctor(
    goals: Option<&std::path::Path>,
    points: Option<&std::path::Path>,
    json: bool,
) -> Result<(), LedgerCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "ledger_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Timeledger version {}", LEDGER_VERSION),
    });

    checks.push(DoctorCheck {
        name: "schema_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Input schema: {}", SCHEMA_VERSION),
    });

    if let Some(path) = goals {
        checks.push(check_store_file("goal_store", path, |content| {
            serde_json::from_str::<timeledger::GoalSet>(content)
                .map(|goals| format!("Goal store valid ({} goals)", goals.len()))
        }));
    }

    if let Some(path) = points {
        checks.push(check_store_file("score_store", path, |content| {
            serde_json::from_str::<timeledger::ScoreState>(content)
                .map(|state| format!("Score store valid ({:.2} points)", state.points))
        }));
    }

    let stdin_check = if atty::is(atty::Stream::Stdin) {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a TTY (interactive mode)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a pipe (streaming mode ready)".to_string(),
        }
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: LEDGER_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Timeledger Doctor Report");
        println!("========================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");

        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report
        .checks
        .iter()
        .any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(LedgerCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

fn check_store_file(
    name: &str,
    path: &std::path::Path,
    parse: impl Fn(&str) -> Result<String, serde_json::Error>,
) -> DoctorCheck {
    if !path.exists() {
        return DoctorCheck {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: format!("{} does not exist (first run starts empty)", path.display()),
        };
    }

    match fs::read_to_string(path) {
        Ok(content) => match parse(&content) {
            Ok(message) => DoctorCheck {
                name: name.to_string(),
                status: CheckStatus::Ok,
                message,
            },
            Err(e) => DoctorCheck {
                name: name.to_string(),
                status: CheckStatus::Error,
                message: format!("Invalid store JSON: {}", e),
            },
        },
        Err(e) => DoctorCheck {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: format!("Cannot read store file: {}", e),
        },
    }
}

// Error types

#[derive(Debug)]
enum LedgerCliError {
    Io(io::Error),
    Engine(EngineError),
    Json(serde_json::Error),
    Store(timeledger::store::StoreError),
    ValidationFailed(usize),
    DoctorFailed,
}

impl From<io::Error> for LedgerCliError {
    fn from(e: io::Error) -> Self {
        LedgerCliError::Io(e)
    }
}

impl From<EngineError> for LedgerCliError {
    fn from(e: EngineError) -> Self {
        LedgerCliError::Engine(e)
    }
}

impl From<serde_json::Error> for LedgerCliError {
    fn from(e: serde_json::Error) -> Self {
        LedgerCliError::Json(e)
    }
}

impl From<timeledger::store::StoreError> for LedgerCliError {
    fn from(e: timeledger::store::StoreError) -> Self {
        LedgerCliError::Store(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<LedgerCliError> for CliError {
    fn from(e: LedgerCliError) -> Self {
        match e {
            LedgerCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            LedgerCliError::Engine(e) => CliError {
                code: "ENGINE_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Ensure input matches usage.raw_record.v1".to_string()),
            },
            LedgerCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            LedgerCliError::Store(e) => CliError {
                code: "STORE_WRITE_FAILED".to_string(),
                message: e.to_string(),
                hint: Some("State from this run is not committed; rerun after fixing the store path".to_string()),
            },
            LedgerCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} records failed validation", count),
                hint: Some("Fix validation errors and retry".to_string()),
            },
            LedgerCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    total_records: usize,
    valid_records: usize,
    invalid_records: usize,
    errors: Vec<ValidationErrorDetail>,
}

#[derive(serde::Serialize)]
struct ValidationErrorDetail {
    index: usize,
    app: String,
    error: String,
}

#[derive(serde::Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(serde::Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
