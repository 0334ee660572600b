//! External process boundary.
//!
//! Exit code 0 is success. Anything else becomes
//! [`CommandError::ExternalProcess`] carrying the captured stderr verbatim.
//! Nothing is retried.

use std::process::Command;
use std::sync::Mutex;

use crate::error::CommandError;
use crate::invocation::Invocation;

/// Captured output of a successful run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Runs a built [`Invocation`]. Implementations must be shareable across the
/// engine's worker threads.
pub trait ProcessRunner: Send + Sync {
    fn run(&self, invocation: &Invocation) -> Result<ProcessOutput, CommandError>;
}

/// Runs invocations as real child processes and blocks until they exit.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl ProcessRunner for SystemRunner {
    fn run(&self, invocation: &Invocation) -> Result<ProcessOutput, CommandError> {
        let mut command = Command::new(&invocation.program);
        command.args(&invocation.args).envs(&invocation.env);
        if let Some(dir) = &invocation.working_dir {
            command.current_dir(dir);
        }

        tracing::debug!("exec: {invocation}");
        let output = command.output().map_err(|source| CommandError::Spawn {
            program: invocation.program.clone(),
            source,
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        if !output.status.success() {
            let status = match output.status.code() {
                Some(code) => format!("exit code {code}"),
                None => "terminated by signal".to_string(),
            };
            return Err(CommandError::ExternalProcess {
                command: invocation.to_string(),
                status,
                stderr: stderr.trim_end().to_string(),
            });
        }
        Ok(ProcessOutput { stdout, stderr })
    }
}

/// Records invocations instead of running them.
///
/// Backs dry runs and tests. Invocations whose subcommand starts with one of
/// the configured `failing` prefixes are recorded and then reported as failed.
#[derive(Debug, Default)]
pub struct RecordingRunner {
    calls: Mutex<Vec<Invocation>>,
    failing: Vec<String>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every invocation whose argument list starts with `subcommand`.
    pub fn failing_on(mut self, subcommand: &str) -> Self {
        self.failing.push(subcommand.to_string());
        self
    }

    /// Snapshot of every recorded invocation, in call order.
    pub fn calls(&self) -> Vec<Invocation> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }
}

impl ProcessRunner for RecordingRunner {
    fn run(&self, invocation: &Invocation) -> Result<ProcessOutput, CommandError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(invocation.clone());
        }
        let joined = invocation.args.join(" ");
        if self.failing.iter().any(|prefix| joined.starts_with(prefix.as_str())) {
            return Err(CommandError::ExternalProcess {
                command: invocation.to_string(),
                status: "exit code 1".to_string(),
                stderr: "simulated failure".to_string(),
            });
        }
        Ok(ProcessOutput::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invocation::InvocationBuilder;

    #[test]
    fn recording_runner_keeps_call_order() {
        let runner = RecordingRunner::new();
        let a = InvocationBuilder::new("helm", "lint").build().unwrap();
        let b = InvocationBuilder::new("helm", "package").build().unwrap();
        runner.run(&a).unwrap();
        runner.run(&b).unwrap();
        assert_eq!(runner.calls(), vec![a, b]);
    }

    #[test]
    fn recording_runner_simulates_failure() {
        let runner = RecordingRunner::new().failing_on("delete");
        let inv = InvocationBuilder::new("helm", "delete")
            .arg("release", Some("myapp"))
            .build()
            .unwrap();
        let err = runner.run(&inv).unwrap_err();
        assert!(matches!(err, CommandError::ExternalProcess { .. }));
        assert_eq!(runner.calls().len(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn system_runner_captures_stdout() {
        let inv = InvocationBuilder::new("sh", "-c")
            .arg("script", Some("echo hello"))
            .build()
            .unwrap();
        let out = SystemRunner.run(&inv).expect("run");
        assert_eq!(out.stdout.trim(), "hello");
    }

    #[cfg(unix)]
    #[test]
    fn system_runner_surfaces_stderr_on_failure() {
        let inv = InvocationBuilder::new("sh", "-c")
            .arg("script", Some("echo broken chart >&2; exit 3"))
            .build()
            .unwrap();
        let err = SystemRunner.run(&inv).unwrap_err();
        match err {
            CommandError::ExternalProcess { status, stderr, .. } => {
                assert_eq!(status, "exit code 3");
                assert_eq!(stderr, "broken chart");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_program_is_spawn_error() {
        let inv = InvocationBuilder::new("helmwork-definitely-not-installed", "version")
            .build()
            .unwrap();
        let err = SystemRunner.run(&inv).unwrap_err();
        assert!(matches!(err, CommandError::Spawn { .. }), "got: {err}");
    }
}
