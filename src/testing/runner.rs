//! Suite execution and reporting
//!
//! Runs every unit of a collection one after another and prints a report
//! in the style of a text test runner. The aggregate result maps to the
//! process exit code.

use std::io::Write;
use std::time::{Duration, Instant};

use colored::Colorize;

use super::suite::{TestCollection, UnitStatus};
use crate::common::Result;

const SEPARATOR_HEAVY: &str =
    "======================================================================";
const SEPARATOR_LIGHT: &str =
    "----------------------------------------------------------------------";

/// A unit that did not pass
#[derive(Debug, Clone)]
pub struct Problem {
    pub id: String,
    pub detail: Option<String>,
}

/// Aggregate outcome of one suite run
#[derive(Debug, Clone, Default)]
pub struct RunResult {
    pub tests_run: usize,
    pub failures: Vec<Problem>,
    pub errors: Vec<Problem>,
    pub skipped: usize,
    pub elapsed: Duration,
}

impl RunResult {
    /// True when no unit failed or errored
    pub fn was_successful(&self) -> bool {
        self.failures.is_empty() && self.errors.is_empty()
    }

    /// 0 on success, 1 otherwise
    pub fn exit_code(&self) -> i32 {
        if self.was_successful() {
            0
        } else {
            1
        }
    }
}

/// Run `collection` and report to stdout
pub async fn run(collection: &TestCollection, verbosity: u8) -> Result<RunResult> {
    let mut out = std::io::stdout();
    run_with_output(collection, verbosity, &mut out).await
}

/// Run `collection` and report to `out`.
///
/// Verbosity 2 prints one line per test, 1 prints one character per test,
/// 0 prints no progress. Failure details and the summary are always printed.
pub async fn run_with_output<W: Write>(
    collection: &TestCollection,
    verbosity: u8,
    out: &mut W,
) -> Result<RunResult> {
    let started = Instant::now();
    let mut result = RunResult::default();

    for unit in collection.iter() {
        if verbosity >= 2 {
            write!(out, "{} ... ", unit.id())?;
            out.flush()?;
        }

        let outcome = unit.run().await;
        result.tests_run += 1;
        tracing::debug!(test = unit.id(), status = ?outcome.status, "finished");

        let problem = || Problem {
            id: unit.id().to_string(),
            detail: outcome.detail.clone(),
        };

        match outcome.status {
            UnitStatus::Passed => progress(out, verbosity, "ok".green(), ".".normal())?,
            UnitStatus::Failed => {
                result.failures.push(problem());
                progress(out, verbosity, "FAIL".red(), "F".red())?;
            }
            UnitStatus::Errored => {
                result.errors.push(problem());
                progress(out, verbosity, "ERROR".red(), "E".red())?;
            }
            UnitStatus::Skipped => {
                result.skipped += 1;
                let line = match &outcome.detail {
                    Some(reason) => format!("skipped {:?}", reason),
                    None => "skipped".to_string(),
                };
                progress(out, verbosity, line.yellow(), "s".yellow())?;
            }
        }
    }

    result.elapsed = started.elapsed();
    if verbosity == 1 {
        writeln!(out)?;
    }

    write_problems(out, "ERROR", &result.errors)?;
    write_problems(out, "FAIL", &result.failures)?;
    write_summary(out, &result)?;
    out.flush()?;

    Ok(result)
}

fn progress<W: Write>(
    out: &mut W,
    verbosity: u8,
    line: colored::ColoredString,
    dot: colored::ColoredString,
) -> Result<()> {
    match verbosity {
        0 => {}
        1 => {
            write!(out, "{}", dot)?;
            out.flush()?;
        }
        _ => writeln!(out, "{}", line)?,
    }
    Ok(())
}

fn write_problems<W: Write>(out: &mut W, flavour: &str, problems: &[Problem]) -> Result<()> {
    for problem in problems {
        writeln!(out, "{}", SEPARATOR_HEAVY)?;
        writeln!(out, "{}: {}", flavour.red().bold(), problem.id)?;
        writeln!(out, "{}", SEPARATOR_LIGHT)?;
        if let Some(detail) = &problem.detail {
            writeln!(out, "{}", detail.trim_end())?;
        }
        writeln!(out)?;
    }
    Ok(())
}

fn write_summary<W: Write>(out: &mut W, result: &RunResult) -> Result<()> {
    writeln!(out, "{}", SEPARATOR_LIGHT)?;
    writeln!(
        out,
        "Ran {} test{} in {:.3}s",
        result.tests_run,
        if result.tests_run == 1 { "" } else { "s" },
        result.elapsed.as_secs_f64()
    )?;
    writeln!(out)?;

    let mut notes = Vec::new();
    if !result.failures.is_empty() {
        notes.push(format!("failures={}", result.failures.len()));
    }
    if !result.errors.is_empty() {
        notes.push(format!("errors={}", result.errors.len()));
    }
    if result.skipped > 0 {
        notes.push(format!("skipped={}", result.skipped));
    }
    let notes = if notes.is_empty() {
        String::new()
    } else {
        format!(" ({})", notes.join(", "))
    };

    if result.was_successful() {
        writeln!(out, "{}", format!("OK{}", notes).green().bold())?;
    } else {
        writeln!(out, "{}", format!("FAILED{}", notes).red().bold())?;
    }
    Ok(())
}
