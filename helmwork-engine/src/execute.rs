//! Plan execution.
//!
//! A unit starts once every predecessor has succeeded or was skipped. Up to
//! `jobs` units run at the same time, each on tokio's blocking pool. The first
//! failure stops scheduling: units already running finish, units not yet
//! started are reported as [`UnitState::NotRun`]. A panicking unit counts as
//! failed like any other.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::task::JoinSet;

use helmwork_command::ProcessRunner;
use helmwork_rules::Unit;

use crate::error::EngineError;
use crate::graph::Plan;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitState {
    Succeeded,
    /// Disabled by configuration; dependents proceed.
    Skipped,
    Failed,
    NotRun,
}

#[derive(Debug, Clone, Serialize)]
pub struct UnitReport {
    pub name: String,
    pub state: UnitState,
    pub duration_ms: u128,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Outcome of one execution, in plan order.
#[derive(Debug, Serialize)]
pub struct ExecutionReport {
    pub units: Vec<UnitReport>,
    pub duration_ms: u128,
    #[serde(skip)]
    failure: Option<EngineError>,
}

impl ExecutionReport {
    pub fn succeeded(&self) -> bool {
        self.failure.is_none()
    }

    pub fn state(&self, name: &str) -> Option<UnitState> {
        self.units.iter().find(|u| u.name == name).map(|u| u.state)
    }

    pub fn count(&self, state: UnitState) -> usize {
        self.units.iter().filter(|u| u.state == state).count()
    }

    pub fn to_json_pretty(&self) -> Result<String, EngineError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// The first failure, usually [`EngineError::UnitFailed`], if any unit failed.
    pub fn into_error(self) -> Option<EngineError> {
        self.failure
    }
}

/// Run `plan` on a fresh multi-thread runtime and block until it finishes.
pub fn execute(
    plan: &Plan,
    runner: Arc<dyn ProcessRunner>,
    jobs: usize,
) -> Result<ExecutionReport, EngineError> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(jobs.clamp(1, 4))
        .max_blocking_threads(jobs.max(1))
        .enable_all()
        .build()
        .map_err(|e| EngineError::Runtime(format!("failed to start tokio runtime: {e}")))?;
    runtime.block_on(execute_async(plan, runner, jobs))
}

/// Run `plan` on the current tokio runtime.
pub async fn execute_async(
    plan: &Plan,
    runner: Arc<dyn ProcessRunner>,
    jobs: usize,
) -> Result<ExecutionReport, EngineError> {
    let jobs = jobs.max(1);
    let started_at = Instant::now();
    let index: HashMap<&str, usize> = plan
        .units
        .iter()
        .enumerate()
        .map(|(i, unit)| (unit.name.as_str(), i))
        .collect();

    let mut states: Vec<Option<UnitState>> = vec![None; plan.len()];
    let mut durations = vec![Duration::ZERO; plan.len()];
    let mut errors: Vec<Option<String>> = vec![None; plan.len()];
    let mut started = vec![false; plan.len()];
    let mut failure: Option<EngineError> = None;
    let mut in_flight: JoinSet<(usize, Result<(), EngineError>, Duration)> = JoinSet::new();

    loop {
        if failure.is_none() {
            // Plan order is topological, so one forward scan also admits units
            // whose predecessors were skipped earlier in the same scan.
            for (i, unit) in plan.units.iter().enumerate() {
                if started[i] || in_flight.len() >= jobs {
                    continue;
                }
                let ready = unit.depends_on.iter().all(|dep| {
                    index.get(dep.as_str()).map_or(true, |&j| {
                        matches!(states[j], Some(UnitState::Succeeded | UnitState::Skipped))
                    })
                });
                if !ready {
                    continue;
                }
                started[i] = true;
                if !unit.enabled {
                    tracing::info!("{}: disabled, skipping", unit.name);
                    states[i] = Some(UnitState::Skipped);
                    continue;
                }

                tracing::info!("{}: starting", unit.name);
                let unit = unit.clone();
                let runner = runner.clone();
                in_flight.spawn_blocking(move || {
                    let begin = Instant::now();
                    let result = run_unit(&unit, runner.as_ref());
                    (i, result, begin.elapsed())
                });
            }
        }

        let Some(joined) = in_flight.join_next().await else {
            break;
        };
        let (i, result, elapsed) = match joined {
            Ok(done) => done,
            Err(e) => {
                // Panics are caught inside the task, so this is cancellation.
                // The unit is marked failed once the set is drained.
                tracing::error!("task join failure: {e}");
                if failure.is_none() {
                    failure = Some(EngineError::Runtime(format!("task join failure: {e}")));
                }
                continue;
            }
        };
        durations[i] = elapsed;
        let name = &plan.units[i].name;
        match result {
            Ok(()) => {
                tracing::info!("{name}: done in {}ms", elapsed.as_millis());
                states[i] = Some(UnitState::Succeeded);
            }
            Err(err) => {
                tracing::warn!("{err}");
                states[i] = Some(UnitState::Failed);
                errors[i] = Some(match &err {
                    EngineError::UnitFailed { source, .. } => source.to_string(),
                    other => other.to_string(),
                });
                if failure.is_none() {
                    failure = Some(err);
                }
            }
        }
    }

    for i in 0..plan.len() {
        if started[i] && states[i].is_none() {
            states[i] = Some(UnitState::Failed);
            errors[i] = Some("task ended without reporting an outcome".to_string());
        }
    }

    let units = plan
        .units
        .iter()
        .enumerate()
        .map(|(i, unit)| UnitReport {
            name: unit.name.clone(),
            state: states[i].unwrap_or(UnitState::NotRun),
            duration_ms: durations[i].as_millis(),
            error: errors[i].take(),
        })
        .collect();

    Ok(ExecutionReport {
        units,
        duration_ms: started_at.elapsed().as_millis(),
        failure,
    })
}

fn run_unit(unit: &Unit, runner: &dyn ProcessRunner) -> Result<(), EngineError> {
    match panic::catch_unwind(AssertUnwindSafe(|| unit.run(runner))) {
        Ok(result) => result.map_err(|source| EngineError::UnitFailed {
            unit: unit.name.clone(),
            source,
        }),
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Err(EngineError::UnitPanicked {
                unit: unit.name.clone(),
                message,
            })
        }
    }
}
