//! `helmwork run`: execute tasks and their predecessors.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use helmwork_command::{
    CommandError, Invocation, ProcessOutput, ProcessRunner, RecordingRunner, SystemRunner,
};
use helmwork_engine::{execute, ExecutionReport, TaskGraph, UnitState};

use super::load_project;

/// Arguments for `helmwork run`.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Tasks to run, e.g. `helmLintFooChart deployAll`.
    #[arg(required = true)]
    pub tasks: Vec<String>,

    /// Print every helm invocation instead of running it.
    #[arg(long)]
    pub dry_run: bool,

    /// Maximum number of tasks running at once (defaults to the CPU count).
    #[arg(long, short = 'j')]
    pub jobs: Option<usize>,

    /// Emit the execution report as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Prints each invocation and records it without spawning anything.
struct DryRunRunner {
    inner: RecordingRunner,
}

impl ProcessRunner for DryRunRunner {
    fn run(&self, invocation: &Invocation) -> Result<ProcessOutput, CommandError> {
        println!("[dry-run] {invocation}");
        self.inner.run(invocation)
    }
}

#[derive(Tabled)]
struct ReportRow {
    #[tabled(rename = "task")]
    task: String,
    #[tabled(rename = "state")]
    state: String,
    #[tabled(rename = "time")]
    time: String,
}

impl RunArgs {
    pub fn run(self, project_file: &Path) -> Result<()> {
        let project = load_project(project_file)?;
        let mut graph = TaskGraph::new(&project)?;
        let plan = graph
            .plan(self.tasks.as_slice())
            .with_context(|| format!("failed to plan {}", self.tasks.join(", ")))?;

        // Dry runs stay sequential so the printed invocations follow plan order.
        let (runner, jobs): (Arc<dyn ProcessRunner>, usize) = if self.dry_run {
            let runner = DryRunRunner {
                inner: RecordingRunner::new(),
            };
            (Arc::new(runner), 1)
        } else {
            let jobs = self.jobs.unwrap_or_else(|| {
                std::thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(1)
            });
            (Arc::new(SystemRunner), jobs)
        };

        let report = execute(&plan, runner, jobs)?;
        if self.json {
            println!("{}", report.to_json_pretty()?);
        } else {
            print_report(&report);
        }

        match report.into_error() {
            Some(err) => Err(err).context("run aborted"),
            None => Ok(()),
        }
    }
}

fn print_report(report: &ExecutionReport) {
    let rows: Vec<ReportRow> = report
        .units
        .iter()
        .map(|unit| ReportRow {
            task: unit.name.clone(),
            state: state_label(unit.state),
            time: format!("{}ms", unit.duration_ms),
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");

    let summary = format!(
        "{} succeeded, {} skipped, {} failed, {} not run in {}ms",
        report.count(UnitState::Succeeded),
        report.count(UnitState::Skipped),
        report.count(UnitState::Failed),
        report.count(UnitState::NotRun),
        report.duration_ms,
    );
    if report.succeeded() {
        println!("{} {summary}", "✓".green().bold());
    } else {
        println!("{} {summary}", "✗".red().bold());
        for unit in report.units.iter().filter(|u| u.error.is_some()) {
            if let Some(error) = &unit.error {
                println!("  {}: {error}", unit.name.bold());
            }
        }
    }
}

fn state_label(state: UnitState) -> String {
    match state {
        UnitState::Succeeded => "SUCCEEDED".green().to_string(),
        UnitState::Skipped => "SKIPPED".bright_black().to_string(),
        UnitState::Failed => "FAILED".red().bold().to_string(),
        UnitState::NotRun => "NOT RUN".yellow().to_string(),
    }
}
