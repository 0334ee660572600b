//! Task graph: units stored by name, synthesized the first time they are
//! referenced, ordered by a depth-first walk that detects cycles.

use std::collections::{BTreeMap, HashMap};

use helmwork_core::Project;
use helmwork_rules::{Dispatcher, ResolutionPass, Unit};

use crate::error::EngineError;

/// Units in execution order. Every predecessor precedes its dependents.
#[derive(Debug, Clone, Default)]
pub struct Plan {
    pub units: Vec<Unit>,
}

impl Plan {
    pub fn names(&self) -> Vec<&str> {
        self.units.iter().map(|u| u.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

/// Arena of synthesized units keyed by name.
#[derive(Debug)]
pub struct TaskGraph<'p> {
    project: &'p Project,
    dispatcher: Dispatcher,
    units: BTreeMap<String, Unit>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

impl<'p> TaskGraph<'p> {
    /// Graph over `project`; fails if the project's aliases are invalid.
    pub fn new(project: &'p Project) -> Result<Self, EngineError> {
        Ok(Self {
            project,
            dispatcher: Dispatcher::for_project(project)?,
            units: BTreeMap::new(),
        })
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// The unit named `name`, synthesizing it on first reference.
    pub fn request_unit(&mut self, name: &str) -> Result<&Unit, EngineError> {
        let mut pass = self.dispatcher.pass();
        fetch(&mut self.units, &mut pass, self.project, name, None)?;
        self.units.get(name).ok_or_else(|| EngineError::UnknownUnit {
            name: name.to_string(),
            required_by: None,
        })
    }

    /// Number of units synthesized so far.
    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Transitive closure of `targets` in dependency order.
    ///
    /// Predecessors are visited in declaration order, then targets in the order
    /// given, so the same request always yields the same plan.
    pub fn plan<S: AsRef<str>>(&mut self, targets: &[S]) -> Result<Plan, EngineError> {
        let mut pass = self.dispatcher.pass();
        let mut walk = Walk {
            units: &mut self.units,
            pass: &mut pass,
            project: self.project,
            marks: HashMap::new(),
            stack: Vec::new(),
            order: Vec::new(),
        };
        for target in targets {
            walk.visit(target.as_ref(), None)?;
        }

        let order = walk.order;
        let units = order
            .iter()
            .filter_map(|name| self.units.get(name).cloned())
            .collect();
        tracing::debug!("planned {} task(s): {}", order.len(), order.join(", "));
        Ok(Plan { units })
    }
}

struct Walk<'a, 'r> {
    units: &'a mut BTreeMap<String, Unit>,
    pass: &'a mut ResolutionPass<'r>,
    project: &'a Project,
    marks: HashMap<String, Mark>,
    stack: Vec<String>,
    order: Vec<String>,
}

impl Walk<'_, '_> {
    fn visit(&mut self, name: &str, required_by: Option<&str>) -> Result<(), EngineError> {
        match self.marks.get(name) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::Visiting) => {
                let start = self.stack.iter().position(|n| n == name).unwrap_or(0);
                let mut path: Vec<&str> = self.stack[start..].iter().map(String::as_str).collect();
                path.push(name);
                return Err(EngineError::Cycle {
                    path: path.join(" -> "),
                });
            }
            None => {}
        }

        fetch(self.units, self.pass, self.project, name, required_by)?;
        let predecessors = self
            .units
            .get(name)
            .map(|unit| unit.depends_on.clone())
            .unwrap_or_default();

        self.marks.insert(name.to_string(), Mark::Visiting);
        self.stack.push(name.to_string());
        for predecessor in &predecessors {
            self.visit(predecessor, Some(name))?;
        }
        self.stack.pop();
        self.marks.insert(name.to_string(), Mark::Done);
        self.order.push(name.to_string());
        Ok(())
    }
}

fn fetch(
    units: &mut BTreeMap<String, Unit>,
    pass: &mut ResolutionPass<'_>,
    project: &Project,
    name: &str,
    required_by: Option<&str>,
) -> Result<(), EngineError> {
    if units.contains_key(name) {
        return Ok(());
    }
    let unit = pass
        .resolve(name, project)
        .ok_or_else(|| EngineError::UnknownUnit {
            name: name.to_string(),
            required_by: required_by.map(str::to_string),
        })?;
    units.insert(name.to_string(), unit);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use helmwork_core::ChartName;

    fn project() -> Project {
        let mut project = Project::new("/work");
        project.declare_chart("bar");
        project.declare_chart("foo");
        project.charts[1].dependencies.push(ChartName::from("bar"));
        project.declare_release("myapp", "foo");
        project
    }

    #[test]
    fn request_unit_is_memoized() {
        let project = project();
        let mut graph = TaskGraph::new(&project).unwrap();
        graph.request_unit("helmLintFooChart").unwrap();
        graph.request_unit("helmLintFooChart").unwrap();
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn unknown_dependency_names_its_dependent() {
        let mut project = project();
        project
            .aliases
            .insert("broken".into(), vec!["helmLintMissingChart".into()]);
        let mut graph = TaskGraph::new(&project).unwrap();
        let err = graph.plan(&["broken"]).unwrap_err();
        match err {
            EngineError::UnknownUnit { name, required_by } => {
                assert_eq!(name, "helmLintMissingChart");
                assert_eq!(required_by.as_deref(), Some("broken"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn alias_cycle_is_detected() {
        let mut project = project();
        project.aliases.insert("a".into(), vec!["b".into()]);
        project.aliases.insert("b".into(), vec!["a".into()]);
        let mut graph = TaskGraph::new(&project).unwrap();
        let err = graph.plan(&["a"]).unwrap_err();
        match err {
            EngineError::Cycle { path } => assert_eq!(path, "a -> b -> a"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn plan_puts_predecessors_first() {
        let project = project();
        let mut graph = TaskGraph::new(&project).unwrap();
        let plan = graph.plan(&["helmInstallMyapp"]).unwrap();
        assert_eq!(
            plan.names(),
            vec![
                "helmInitServer",
                "helmAddRepositories",
                "helmFilterFooChartSources",
                "helmFilterBarChartSources",
                "helmUpdateBarChartDependencies",
                "helmLintBarChart",
                "helmPackageBarChart",
                "helmUpdateFooChartDependencies",
                "helmLintFooChart",
                "helmPackageFooChart",
                "helmInstallMyapp",
            ]
        );
    }
}
