// crates/conformance-cli/src/main.rs
// ============================================================================
// Module: Conformance CLI Entry Point
// Description: Command dispatcher for listing and running conformance suites.
// Purpose: Run a suite against a live target and report per-scenario results.
// Dependencies: clap, conformance-harness, serde_jcs, thiserror
// ============================================================================

//! ## Overview
//! `conformance list` prints every suite and its scenarios. `conformance run
//! <SUITE>` loads configuration from the environment, applies flag
//! overrides, optionally waits for the target, runs the suite and prints the
//! report. The exit code is zero only when no scenario failed; fatal setup
//! errors (configuration, provisioning, readiness) are printed to stderr and
//! exit non-zero.

// ============================================================================
// SECTION: Modules
// ============================================================================


// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use clap::ArgAction;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use conformance_harness::AuditSink;
use conformance_harness::FileAuditSink;
use conformance_harness::HarnessConfig;
use conformance_harness::HarnessSession;
use conformance_harness::NoopAuditSink;
use conformance_harness::RunReport;
use conformance_harness::StderrAuditSink;
use conformance_harness::Suite;
use conformance_harness::SuiteKind;
use conformance_harness::readiness::wait_for_target;
use conformance_harness::resolve_target;
use conformance_harness::run_suite;
use thiserror::Error;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "conformance", version, disable_help_subcommand = true)]
struct Cli {
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// List suites and their scenarios.
    List(ListCommand),
    /// Run a suite against a live target.
    Run(RunCommand),
}

/// Arguments for `list`.
#[derive(Args, Debug)]
struct ListCommand {
    /// Only list this suite (`tasktracker`, `dayserver` or `flask`).
    #[arg(value_name = "SUITE", value_parser = parse_suite)]
    suite: Option<SuiteKind>,
}

/// Arguments for `run`.
#[derive(Args, Debug)]
struct RunCommand {
    /// Suite to run (`tasktracker`, `dayserver` or `flask`).
    #[arg(value_name = "SUITE", value_parser = parse_suite)]
    suite: SuiteKind,
    /// Base address of the target, overriding the suite's environment variable.
    #[arg(long, value_name = "URL")]
    base_url: Option<String>,
    /// Default per-request timeout in seconds.
    #[arg(long, value_name = "SECONDS", value_parser = clap::value_parser!(u64).range(1..))]
    timeout_sec: Option<u64>,
    /// Also run opt-in extension scenarios.
    #[arg(long, action = ArgAction::SetTrue)]
    extended: bool,
    /// Directory receiving `summary.json` and `summary.md`.
    #[arg(long, value_name = "DIR")]
    report_dir: Option<PathBuf>,
    /// Audit log destination; defaults to `file` when an audit path is known.
    #[arg(long, value_enum, value_name = "SINK")]
    audit: Option<AuditArg>,
    /// Audit log path for `--audit file`.
    #[arg(long, value_name = "PATH")]
    audit_path: Option<PathBuf>,
    /// Wait up to this many seconds for the target to answer before running.
    #[arg(long, value_name = "SECONDS")]
    wait_sec: Option<u64>,
    /// Report format written to stdout.
    #[arg(long, value_enum, default_value_t = FormatArg::Text)]
    format: FormatArg,
}

/// Audit sink selection.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum AuditArg {
    /// Discard audit events.
    Off,
    /// JSON lines on stderr.
    Stderr,
    /// JSON lines appended to a file.
    File,
}

/// Report output format.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum FormatArg {
    /// One line per scenario.
    Text,
    /// Canonical JSON.
    Json,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper carrying a printable message.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    match cli.command {
        Commands::List(command) => command_list(&command),
        Commands::Run(command) => command_run(&command),
    }
}

// ============================================================================
// SECTION: Commands
// ============================================================================

/// Prints suites and scenarios.
fn command_list(command: &ListCommand) -> CliResult<ExitCode> {
    let kinds: Vec<SuiteKind> = command.suite.map_or_else(|| SuiteKind::ALL.to_vec(), |kind| vec![kind]);
    write_stdout(&render_catalog(&kinds))?;
    Ok(ExitCode::SUCCESS)
}

/// Runs one suite and reports the outcome.
fn command_run(command: &RunCommand) -> CliResult<ExitCode> {
    let loaded = HarnessConfig::load(command.suite)
        .map_err(|err| CliError::new(format!("configuration error: {err}")))?;
    let config = apply_overrides(loaded, command);
    let audit = build_audit_sink(command.audit, config.audit_log.as_deref())?;
    let report_dir = resolve_report_dir(command.report_dir.as_deref(), &config);
    let session = HarnessSession::new(config, audit).map_err(|err| CliError::new(err.to_string()))?;

    if let Some(seconds) = command.wait_sec {
        wait_for_target(&session.anonymous(), Duration::from_secs(seconds))
            .map_err(|err| CliError::new(err.to_string()))?;
    }

    let suite = Suite::for_kind(command.suite, session.config().include_extensions);
    let report = run_suite(&session, &suite).map_err(|err| CliError::new(err.to_string()))?;
    write_stdout(&render_report(&report, command.format)?)?;

    if let Some(dir) = report_dir {
        report.write_artifacts(&dir).map_err(|err| CliError::new(err.to_string()))?;
    }
    Ok(if report.is_success() { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Parses a suite label for clap.
fn parse_suite(raw: &str) -> Result<SuiteKind, String> {
    SuiteKind::parse(raw)
        .ok_or_else(|| format!("unknown suite `{raw}`; expected tasktracker, dayserver or flask"))
}

/// Applies command-line overrides on top of the environment configuration.
fn apply_overrides(mut config: HarnessConfig, command: &RunCommand) -> HarnessConfig {
    if command.base_url.is_some() {
        config.target = resolve_target(command.base_url.as_deref(), config.target.as_str());
    }
    if let Some(seconds) = command.timeout_sec {
        config.timeout = Duration::from_secs(seconds);
    }
    if command.extended {
        config.include_extensions = true;
    }
    if let Some(path) = &command.audit_path {
        config.audit_log = Some(path.clone());
    }
    config
}

/// Builds the audit sink for the selected destination.
fn build_audit_sink(choice: Option<AuditArg>, path: Option<&Path>) -> CliResult<Arc<dyn AuditSink>> {
    let choice = choice.unwrap_or(if path.is_some() { AuditArg::File } else { AuditArg::Off });
    match choice {
        AuditArg::Off => Ok(Arc::new(NoopAuditSink)),
        AuditArg::Stderr => Ok(Arc::new(StderrAuditSink)),
        AuditArg::File => {
            let path = path.ok_or_else(|| {
                CliError::new("--audit file requires --audit-path or CONFORMANCE_AUDIT_LOG")
            })?;
            let sink = FileAuditSink::new(path).map_err(|err| {
                CliError::new(format!("failed to open audit log {}: {err}", path.display()))
            })?;
            Ok(Arc::new(sink))
        }
    }
}

/// Picks the artifact directory: the flag, else a stamped run under the run root.
fn resolve_report_dir(flag: Option<&Path>, config: &HarnessConfig) -> Option<PathBuf> {
    if let Some(dir) = flag {
        return Some(dir.to_path_buf());
    }
    config.run_root.as_ref().map(|root| {
        let stamp = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
        root.join(format!("{}_{stamp}", config.suite))
    })
}

/// Renders the suite catalog.
fn render_catalog(kinds: &[SuiteKind]) -> String {
    let mut out = String::new();
    for kind in kinds {
        out.push_str(kind.as_str());
        out.push('\n');
        for scenario in Suite::catalog(*kind) {
            let marker = if scenario.extension { " [extension]" } else { "" };
            out.push_str(&format!(
                "  {}{marker}: {}\n",
                scenario.qualified_name(),
                scenario.description
            ));
        }
    }
    out
}

/// Renders the report in the requested format.
fn render_report(report: &RunReport, format: FormatArg) -> CliResult<String> {
    match format {
        FormatArg::Text => Ok(report.render_text()),
        FormatArg::Json => {
            let bytes = serde_jcs::to_vec(report)
                .map_err(|err| CliError::new(format!("failed to serialize report: {err}")))?;
            let mut text = String::from_utf8(bytes)
                .map_err(|err| CliError::new(format!("report is not UTF-8: {err}")))?;
            text.push('\n');
            Ok(text)
        }
    }
}

/// Writes text to stdout without adding a newline.
fn write_stdout(text: &str) -> CliResult<()> {
    let mut stdout = std::io::stdout();
    stdout
        .write_all(text.as_bytes())
        .map_err(|err| CliError::new(format!("failed to write to stdout: {err}")))
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
