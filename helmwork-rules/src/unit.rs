//! Synthesized units of work.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use helmwork_command::{marker, CommandError, ProcessRunner};

/// Bound action of a unit. Owns everything it needs, so it can run on any thread.
pub type Action = Arc<dyn Fn(&dyn ProcessRunner) -> Result<(), CommandError> + Send + Sync>;

/// A named, executable task with predecessors declared by name.
#[derive(Clone)]
pub struct Unit {
    pub name: String,
    pub description: String,
    /// Predecessor names, in declaration order, without duplicates.
    pub depends_on: Vec<String>,
    /// When `false` the engine skips the action; dependents still proceed.
    pub enabled: bool,
    /// Touched after the action succeeds.
    pub marker: Option<PathBuf>,
    action: Option<Action>,
}

impl fmt::Debug for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unit")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("depends_on", &self.depends_on)
            .field("enabled", &self.enabled)
            .field("marker", &self.marker)
            .field("has_action", &self.action.is_some())
            .finish()
    }
}

impl Unit {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            depends_on: vec![],
            enabled: true,
            marker: None,
            action: None,
        }
    }

    pub fn depends_on(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !self.depends_on.contains(&name) {
            self.depends_on.push(name);
        }
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn marker(mut self, path: impl Into<PathBuf>) -> Self {
        self.marker = Some(path.into());
        self
    }

    pub fn action<F>(mut self, action: F) -> Self
    where
        F: Fn(&dyn ProcessRunner) -> Result<(), CommandError> + Send + Sync + 'static,
    {
        self.action = Some(Arc::new(action));
        self
    }

    /// `false` for aggregate units that only order their predecessors.
    pub fn has_action(&self) -> bool {
        self.action.is_some()
    }

    /// Run the bound action, then touch the marker file.
    ///
    /// Does not consult `enabled`; skipping is the engine's decision.
    pub fn run(&self, runner: &dyn ProcessRunner) -> Result<(), CommandError> {
        if let Some(action) = &self.action {
            action(runner)?;
        }
        if let Some(path) = &self.marker {
            marker::touch(path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use helmwork_command::RecordingRunner;
    use tempfile::TempDir;

    #[test]
    fn depends_on_deduplicates_in_order() {
        let unit = Unit::new("a", "")
            .depends_on("b")
            .depends_on("c")
            .depends_on("b");
        assert_eq!(unit.depends_on, vec!["b".to_string(), "c".to_string()]);
    }

    #[test]
    fn marker_touched_only_after_success() {
        let tmp = TempDir::new().unwrap();
        let ok_marker = tmp.path().join("ok.marker");
        let bad_marker = tmp.path().join("bad.marker");

        let ok = Unit::new("ok", "").marker(&ok_marker).action(|_| Ok(()));
        let bad = Unit::new("bad", "").marker(&bad_marker).action(|_| {
            Err(CommandError::ExternalProcess {
                command: "helm lint".into(),
                status: "exit code 1".into(),
                stderr: "boom".into(),
            })
        });

        let runner = RecordingRunner::new();
        ok.run(&runner).expect("ok");
        assert!(bad.run(&runner).is_err());
        assert!(ok_marker.exists());
        assert!(!bad_marker.exists());
    }

    #[test]
    fn aggregate_unit_runs_nothing() {
        let unit = Unit::new("deployAll", "").depends_on("helmInstallMyapp");
        let runner = RecordingRunner::new();
        unit.run(&runner).expect("run");
        assert!(!unit.has_action());
        assert!(runner.calls().is_empty());
    }
}
