//! Command-line interface for the nameprobe demo driver
//!
//! ## Commands
//!
//! - `run` - Build the bundled probe unit, rewrite it, and print its report
//! - `dump` - Print the probe body's tree before and after rewriting
//!
//! Both accept `--define NAME=VALUE` to declare extra enum constants before
//! parsing, and `--strict-defaults` to turn on the default-type validation.
//!
//! ## Design
//!
//! The CLI uses clap for argument parsing with derive macros.
//! Command functions return `CliResult<T>` instead of calling `process::exit`.
//! Only the top-level `run()` function handles errors and exits.

// Enforce explicit error handling - no panicking in production code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

use std::fmt;
use std::process;

use clap::{Args, Parser, Subcommand};

use crate::demo::{self, DemoReport};
use crate::plugin::RewriteOptions;

// ============================================================================
// CLI Error handling
// ============================================================================

/// Exit code for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(pub i32);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);
    pub const FAILURE: ExitCode = ExitCode(1);
}

/// Error type for CLI operations.
///
/// Contains a user-facing message and an exit code. The CLI entry point
/// catches these errors, prints the message, and exits with the code.
#[derive(Debug)]
pub struct CliError {
    /// User-facing error message (already formatted for display)
    pub message: String,
    /// Exit code to return to the shell
    pub exit_code: ExitCode,
}

impl CliError {
    /// Create a new CLI error with a message and exit code.
    pub fn new(message: impl Into<String>, exit_code: ExitCode) -> Self {
        Self {
            message: message.into(),
            exit_code,
        }
    }

    /// Create a failure error (exit code 1).
    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(message, ExitCode::FAILURE)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

const VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// Clap CLI definition
// ============================================================================

/// Compile-time name lookup with a fallback
#[derive(Parser, Debug)]
#[command(name = "nameprobe")]
#[command(version = VERSION)]
#[command(about = "Compile-time name lookup with a fallback", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build the bundled probe unit, rewrite it, and print its report
    Run(ProbeArgs),

    /// Print the probe body's tree before and after rewriting
    Dump(ProbeArgs),
}

#[derive(Args, Debug, Default)]
pub struct ProbeArgs {
    /// Declare an extra enum constant before parsing (repeatable)
    #[arg(long = "define", value_name = "NAME=VALUE")]
    pub defines: Vec<String>,

    /// Validate default-argument types before substituting (incomplete;
    /// rejects promoted defaults)
    #[arg(long = "strict-defaults")]
    pub strict_defaults: bool,
}

// ============================================================================
// CLI entry point
// ============================================================================

/// Main CLI entry point.
///
/// This is the only place where `process::exit` is called. All command
/// implementations return `CliResult` and errors are handled here.
pub fn run() {
    let cli = Cli::parse();

    match execute(cli) {
        Ok(exit_code) => {
            if exit_code.0 != 0 {
                process::exit(exit_code.0);
            }
        }
        Err(e) => {
            if !e.message.is_empty() {
                eprintln!("{}", e.message);
            }
            process::exit(e.exit_code.0);
        }
    }
}

/// Execute the CLI command and return result.
fn execute(cli: Cli) -> CliResult<ExitCode> {
    match cli.command {
        Some(Command::Run(args)) => cmd_run(args),
        Some(Command::Dump(args)) => cmd_dump(args),
        // Default action: run the probe report.
        None => cmd_run(ProbeArgs::default()),
    }
}

fn cmd_run(args: ProbeArgs) -> CliResult<ExitCode> {
    let report = probe_report(&args)?;

    for line in &report.lines {
        println!("{line}");
    }
    finish(report)
}

fn cmd_dump(args: ProbeArgs) -> CliResult<ExitCode> {
    let report = probe_report(&args)?;

    println!("=== before rewrite ===");
    print!("{}", report.dump_before);
    println!("=== after rewrite ===");
    print!("{}", report.dump_after);
    finish(report)
}

fn probe_report(args: &ProbeArgs) -> CliResult<DemoReport> {
    let defines = parse_defines(&args.defines)?;
    let options = RewriteOptions {
        strict_default_types: args.strict_defaults,
    };
    demo::run_demo(&defines, options).map_err(|e| CliError::failure(e.to_string()))
}

/// Print collected diagnostics, if any, and pick the exit code.
fn finish(report: DemoReport) -> CliResult<ExitCode> {
    if report.diagnostics.is_empty() {
        Ok(ExitCode::SUCCESS)
    } else {
        eprint!("{}", report.diagnostics);
        Ok(ExitCode::FAILURE)
    }
}

fn parse_defines(raw: &[String]) -> CliResult<Vec<(String, i64)>> {
    raw.iter().map(|d| parse_define(d)).collect()
}

/// Parse one `NAME=VALUE` definition.
fn parse_define(raw: &str) -> CliResult<(String, i64)> {
    let Some((name, value)) = raw.split_once('=') else {
        return Err(CliError::failure(format!(
            "invalid --define '{raw}': expected NAME=VALUE"
        )));
    };
    let name = name.trim();
    if name.is_empty() {
        return Err(CliError::failure(format!(
            "invalid --define '{raw}': empty name"
        )));
    }
    let value: i64 = value.trim().parse().map_err(|_| {
        CliError::failure(format!("invalid --define '{raw}': value must be an integer"))
    })?;
    Ok((name.to_string(), value))
}
