//! `helmwork tasks`: every conventional task name the project supports.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use helmwork_rules::Dispatcher;

use super::load_project;

/// Arguments for `helmwork tasks`.
#[derive(Args, Debug)]
pub struct TasksArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize, Tabled)]
struct TaskRow {
    #[tabled(rename = "task")]
    task: String,
    #[tabled(rename = "kind")]
    kind: String,
    #[tabled(rename = "target", display_with = "display_target")]
    target: Option<String>,
    #[tabled(rename = "description")]
    description: String,
}

fn display_target(target: &Option<String>) -> String {
    target.clone().unwrap_or_else(|| "-".to_string())
}

impl TasksArgs {
    pub fn run(self, project_file: &Path) -> Result<()> {
        let project = load_project(project_file)?;
        let dispatcher = Dispatcher::for_project(&project).context("invalid task aliases")?;

        let mut pass = dispatcher.pass();
        let rows: Vec<TaskRow> = dispatcher
            .task_names(&project)
            .into_iter()
            .map(|task| TaskRow {
                description: pass
                    .resolve(&task.name, &project)
                    .map(|unit| unit.description)
                    .unwrap_or_default(),
                task: task.name,
                kind: task.rule.to_string(),
                target: task.entity,
            })
            .collect();

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&rows).context("failed to serialize task list")?
            );
            return Ok(());
        }

        println!(
            "{} | {} charts | {} releases | {} tasks",
            "helmwork".bold(),
            project.charts.len(),
            project.releases.len(),
            rows.len()
        );
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
        Ok(())
    }
}
