//! `helmwork plan`: ordered plan for a set of tasks.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use helmwork_engine::TaskGraph;

use super::load_project;

/// Arguments for `helmwork plan`.
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Tasks to plan, e.g. `helmInstallMyapp`.
    #[arg(required = true)]
    pub tasks: Vec<String>,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize, Tabled)]
struct PlanRow {
    #[tabled(rename = "#")]
    step: usize,
    #[tabled(rename = "task")]
    task: String,
    #[tabled(rename = "depends on", display_with = "display_list")]
    depends_on: Vec<String>,
    #[tabled(skip)]
    enabled: bool,
    #[tabled(rename = "description")]
    description: String,
}

fn display_list(items: &[String]) -> String {
    if items.is_empty() {
        "-".to_string()
    } else {
        items.join(", ")
    }
}

impl PlanArgs {
    pub fn run(self, project_file: &Path) -> Result<()> {
        let project = load_project(project_file)?;
        let mut graph = TaskGraph::new(&project)?;
        let plan = graph
            .plan(self.tasks.as_slice())
            .with_context(|| format!("failed to plan {}", self.tasks.join(", ")))?;

        let rows: Vec<PlanRow> = plan
            .units
            .iter()
            .enumerate()
            .map(|(i, unit)| PlanRow {
                step: i + 1,
                task: unit.name.clone(),
                depends_on: unit.depends_on.clone(),
                enabled: unit.enabled,
                description: if unit.enabled {
                    unit.description.clone()
                } else {
                    format!("{} (disabled)", unit.description)
                },
            })
            .collect();

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&rows).context("failed to serialize plan")?
            );
            return Ok(());
        }

        let disabled = rows.iter().filter(|r| !r.enabled).count();
        println!(
            "{} task(s) planned, {} disabled",
            rows.len().to_string().bold(),
            disabled
        );
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
        Ok(())
    }
}
