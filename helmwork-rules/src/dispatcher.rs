//! Rule dispatch: maps a requested task name to at most one synthesized unit.

use std::collections::{BTreeSet, HashSet};

use helmwork_core::{ConfigError, Project};

use crate::rule::Rule;
use crate::unit::Unit;

/// Ordered rule registry for one project.
///
/// Library rules come first in a fixed order; user aliases are appended last.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    rules: Vec<Rule>,
}

/// One conventional task name the project currently supports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskName {
    pub name: String,
    /// [`Rule::label`] of the rule that synthesizes it.
    pub rule: &'static str,
    /// Chart or release the task operates on; `None` for fixed and alias tasks.
    pub entity: Option<String>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::standard()
    }
}

impl Dispatcher {
    /// Library rules only.
    pub fn standard() -> Self {
        Self {
            rules: Rule::library(),
        }
    }

    /// Library rules plus the project's task aliases.
    ///
    /// An alias that is empty or would be claimed by a library rule is a
    /// configuration error, so every name stays claimable by one rule only.
    pub fn for_project(project: &Project) -> Result<Self, ConfigError> {
        let mut dispatcher = Self::standard();
        let mut aliases = BTreeSet::new();

        for (alias, targets) in &project.aliases {
            if alias.trim().is_empty() {
                return Err(ConfigError::AliasConflict {
                    alias: alias.clone(),
                    reason: "alias name is empty".to_string(),
                });
            }
            if let Some(rule) = dispatcher.rules.iter().find(|r| r.matches(alias)) {
                return Err(ConfigError::AliasConflict {
                    alias: alias.clone(),
                    reason: format!("it matches the {} pattern `{}`", rule.label(), rule.pattern()),
                });
            }
            if targets.iter().any(|t| t == alias) {
                return Err(ConfigError::AliasConflict {
                    alias: alias.clone(),
                    reason: "an alias cannot depend on itself".to_string(),
                });
            }
            aliases.insert(alias.clone());
        }

        if !aliases.is_empty() {
            dispatcher.rules.push(Rule::Alias(aliases));
        }
        Ok(dispatcher)
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Start a resolution pass. Misses are remembered until the pass is dropped.
    pub fn pass(&self) -> ResolutionPass<'_> {
        ResolutionPass {
            rules: &self.rules,
            misses: HashSet::new(),
        }
    }

    /// Every task name the project supports, grouped by rule in dispatch order.
    pub fn task_names(&self, project: &Project) -> Vec<TaskName> {
        let mut names = Vec::new();
        for rule in &self.rules {
            match rule {
                Rule::AddRepositories | Rule::InitServer => names.push(TaskName {
                    name: rule.name_for(""),
                    rule: rule.label(),
                    entity: None,
                }),
                Rule::FilterSources
                | Rule::UpdateDependencies
                | Rule::Lint
                | Rule::Unittest
                | Rule::Package => {
                    for chart in &project.charts {
                        names.push(TaskName {
                            name: rule.name_for(&chart.name.0),
                            rule: rule.label(),
                            entity: Some(chart.name.0.clone()),
                        });
                    }
                }
                Rule::Install | Rule::Delete => {
                    for release in &project.releases {
                        names.push(TaskName {
                            name: rule.name_for(&release.name.0),
                            rule: rule.label(),
                            entity: Some(release.name.0.clone()),
                        });
                    }
                }
                Rule::Alias(aliases) => {
                    for alias in aliases {
                        names.push(TaskName {
                            name: alias.clone(),
                            rule: rule.label(),
                            entity: None,
                        });
                    }
                }
            }
        }
        names
    }
}

/// One resolution pass over a dispatcher.
///
/// A name that no rule could synthesize is cached as a miss and answered with
/// `None` without consulting the rules again. A new pass starts empty, so
/// entities declared in between are picked up.
#[derive(Debug)]
pub struct ResolutionPass<'a> {
    rules: &'a [Rule],
    misses: HashSet<String>,
}

impl ResolutionPass<'_> {
    /// Synthesize the unit named `name`, or `None` if it is not a known task.
    ///
    /// Only the first matching rule is consulted; rule patterns never overlap.
    pub fn resolve(&mut self, name: &str, project: &Project) -> Option<Unit> {
        if self.misses.contains(name) {
            tracing::trace!("{name}: cached miss");
            return None;
        }
        let unit = self
            .rules
            .iter()
            .find(|rule| rule.matches(name))
            .and_then(|rule| rule.synthesize(name, project));
        if unit.is_none() {
            tracing::debug!("{name}: no rule can synthesize this task");
            self.misses.insert(name.to_string());
        }
        unit
    }

    pub fn misses(&self) -> usize {
        self.misses.len()
    }
}
