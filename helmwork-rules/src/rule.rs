//! Naming-convention rules.
//!
//! One variant per unit-of-work kind. Each rule can advertise the conventional
//! name for an entity ([`Rule::name_for`]), recognise a candidate name by
//! pattern alone ([`Rule::matches`]) and build the unit for it
//! ([`Rule::synthesize`]).
//!
//! | Rule                 | Pattern                             | helm command               |
//! |----------------------|-------------------------------------|----------------------------|
//! | `AddRepositories`    | `helmAddRepositories`               | `repo add` per repository  |
//! | `InitServer`         | `helmInitServer`                    | `init`                     |
//! | `FilterSources`      | `helmFilter<Chart>ChartSources`     | none, copies sources       |
//! | `UpdateDependencies` | `helmUpdate<Chart>ChartDependencies`| `dependency build/update`  |
//! | `Lint`               | `helmLint<Chart>Chart`              | `lint`                     |
//! | `Unittest`           | `helmUnittest<Chart>Chart`          | `unittest`                 |
//! | `Package`            | `helmPackage<Chart>Chart`           | `package`                  |
//! | `Install`            | `helmInstall<Release>`              | `upgrade --install`        |
//! | `Delete`             | `helmDelete<Release>`               | `delete`                   |
//! | `Alias`              | user-declared names                 | none, aggregate            |
//!
//! No prefix above is a prefix of another, so at most one rule matches any name.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use helmwork_command::{CommandError, InvocationBuilder, ProcessRunner, ValueSource};
use helmwork_core::naming::{capitalize, capitalize_words};
use helmwork_core::{Chart, ChartRef, Project, Release};

use crate::staging;
use crate::unit::Unit;

/// Registers every declared chart repository.
pub const ADD_REPOSITORIES: &str = "helmAddRepositories";
/// Initializes helm (client side, or server side when configured).
pub const INIT_SERVER: &str = "helmInitServer";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntityKind {
    Chart,
    Release,
}

/// A name pattern plus the synthesis procedure for one kind of unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rule {
    AddRepositories,
    InitServer,
    FilterSources,
    UpdateDependencies,
    Lint,
    Unittest,
    Package,
    Install,
    Delete,
    /// User task aliases; holds the declared alias names.
    Alias(BTreeSet<String>),
}

impl Rule {
    /// Library rules in dispatch order.
    pub fn library() -> Vec<Rule> {
        vec![
            Rule::AddRepositories,
            Rule::InitServer,
            Rule::FilterSources,
            Rule::UpdateDependencies,
            Rule::Lint,
            Rule::Unittest,
            Rule::Package,
            Rule::Install,
            Rule::Delete,
        ]
    }

    /// Short kind label, e.g. `"lint"`.
    pub fn label(&self) -> &'static str {
        match self {
            Rule::AddRepositories => "add-repositories",
            Rule::InitServer => "init-server",
            Rule::FilterSources => "filter-sources",
            Rule::UpdateDependencies => "update-dependencies",
            Rule::Lint => "lint",
            Rule::Unittest => "unittest",
            Rule::Package => "package",
            Rule::Install => "install",
            Rule::Delete => "delete",
            Rule::Alias(_) => "alias",
        }
    }

    /// Human-readable pattern, e.g. `helmLint<Chart>Chart`.
    pub fn pattern(&self) -> String {
        match (self.fixed_name(), self.affixes(), self.entity_kind()) {
            (Some(name), _, _) => name.to_string(),
            (_, Some((prefix, suffix)), Some(EntityKind::Chart)) => {
                format!("{prefix}<Chart>{suffix}")
            }
            (_, Some((prefix, suffix)), _) => format!("{prefix}<Release>{suffix}"),
            _ => "<alias>".to_string(),
        }
    }

    /// Conventional task name for the entity called `entity`.
    ///
    /// Fixed-name rules ignore `entity`; aliases are their own name.
    pub fn name_for(&self, entity: &str) -> String {
        if let Some(name) = self.fixed_name() {
            return name.to_string();
        }
        match (self.affixes(), self.entity_kind()) {
            (Some((prefix, suffix)), Some(EntityKind::Chart)) => {
                format!("{prefix}{}{suffix}", capitalize(entity))
            }
            (Some((prefix, suffix)), _) => {
                format!("{prefix}{}{suffix}", capitalize_words(entity))
            }
            _ => entity.to_string(),
        }
    }

    /// Pattern-only check; says nothing about whether the entity exists.
    pub fn matches(&self, candidate: &str) -> bool {
        if let Rule::Alias(names) = self {
            return names.contains(candidate);
        }
        if let Some(name) = self.fixed_name() {
            return candidate == name;
        }
        match self.affixes() {
            Some((prefix, suffix)) => candidate
                .strip_prefix(prefix)
                .and_then(|rest| rest.strip_suffix(suffix))
                .and_then(|segment| segment.chars().next())
                .is_some_and(|first| !first.is_lowercase()),
            None => false,
        }
    }

    /// Build the unit for `candidate`, or `None` when the name does not match
    /// or names an entity the project does not declare.
    pub fn synthesize(&self, candidate: &str, project: &Project) -> Option<Unit> {
        if !self.matches(candidate) {
            return None;
        }
        let helm = Helm::new(project);
        let unit = match self.entity_kind() {
            Some(EntityKind::Chart) => {
                let chart = project
                    .charts
                    .iter()
                    .find(|c| self.name_for(&c.name.0) == candidate)?;
                self.chart_unit(candidate, chart, project, helm)
            }
            Some(EntityKind::Release) => {
                let release = project
                    .releases
                    .iter()
                    .find(|r| self.name_for(&r.name.0) == candidate)?;
                self.release_unit(candidate, release, project, helm)
            }
            None => self.fixed_unit(candidate, project, helm)?,
        };
        tracing::debug!("synthesized {} via {} rule", unit.name, self.label());
        Some(unit)
    }

    // -----------------------------------------------------------------------
    // Pattern tables
    // -----------------------------------------------------------------------

    fn fixed_name(&self) -> Option<&'static str> {
        match self {
            Rule::AddRepositories => Some(ADD_REPOSITORIES),
            Rule::InitServer => Some(INIT_SERVER),
            _ => None,
        }
    }

    fn affixes(&self) -> Option<(&'static str, &'static str)> {
        match self {
            Rule::FilterSources => Some(("helmFilter", "ChartSources")),
            Rule::UpdateDependencies => Some(("helmUpdate", "ChartDependencies")),
            Rule::Lint => Some(("helmLint", "Chart")),
            Rule::Unittest => Some(("helmUnittest", "Chart")),
            Rule::Package => Some(("helmPackage", "Chart")),
            Rule::Install => Some(("helmInstall", "")),
            Rule::Delete => Some(("helmDelete", "")),
            _ => None,
        }
    }

    fn entity_kind(&self) -> Option<EntityKind> {
        match self {
            Rule::FilterSources
            | Rule::UpdateDependencies
            | Rule::Lint
            | Rule::Unittest
            | Rule::Package => Some(EntityKind::Chart),
            Rule::Install | Rule::Delete => Some(EntityKind::Release),
            _ => None,
        }
    }

    // -----------------------------------------------------------------------
    // Synthesis
    // -----------------------------------------------------------------------

    fn fixed_unit(&self, candidate: &str, project: &Project, helm: Helm) -> Option<Unit> {
        match self {
            Rule::AddRepositories => {
                let repositories = project.repositories.clone();
                Some(
                    Unit::new(candidate, "Registers the chart repositories of the project.")
                        .action(move |runner| {
                            for repo in &repositories {
                                let command = helm
                                    .command("repo add")
                                    .option("--username", repo.username.as_deref())
                                    .option("--password", repo.password.as_deref())
                                    .arg("name", Some(&repo.name))
                                    .arg("url", Some(&repo.url));
                                helm.exec(runner, command)?;
                            }
                            Ok(())
                        }),
                )
            }
            Rule::InitServer => {
                let install_server = project.settings.install_server;
                let service_account = project.settings.service_account.clone();
                Some(
                    Unit::new(candidate, "Initializes helm for the target cluster.").action(
                        move |runner| {
                            let command = if install_server {
                                helm.command("init")
                                    .flag("--upgrade", Some(true))
                                    .flag("--wait", Some(true))
                                    .option("--service-account", service_account.as_deref())
                            } else {
                                helm.command("init").flag("--client-only", Some(true))
                            };
                            helm.exec(runner, command)
                        },
                    ),
                )
            }
            Rule::Alias(_) => {
                let targets = project.aliases.get(candidate)?;
                let unit = Unit::new(candidate, format!("Runs {}.", targets.join(", ")));
                Some(
                    targets
                        .iter()
                        .fold(unit, |unit, target| unit.depends_on(target.as_str())),
                )
            }
            _ => None,
        }
    }

    fn chart_unit(&self, candidate: &str, chart: &Chart, project: &Project, helm: Helm) -> Unit {
        let name = chart.name.0.as_str();
        let dir = project.staged_chart_dir(&chart.name);

        match self {
            Rule::FilterSources => {
                let source = chart.dir.clone();
                Unit::new(candidate, format!("Stages the sources of the {name} chart."))
                    .action(move |_| staging::stage_chart(&source, &dir))
            }
            Rule::UpdateDependencies => {
                let unit = Unit::new(
                    candidate,
                    format!("Builds or updates the dependencies for the {name} chart."),
                )
                .depends_on(ADD_REPOSITORIES)
                .depends_on(Rule::FilterSources.name_for(name));
                chart
                    .dependencies
                    .iter()
                    .fold(unit, |unit, dep| unit.depends_on(Rule::Package.name_for(&dep.0)))
                    .action(move |runner| {
                        let subcommand = if has_lock_file(&dir) {
                            "dependency build"
                        } else {
                            "dependency update"
                        };
                        helm.exec(
                            runner,
                            helm.command(subcommand).arg("chart", Some(dir.display())),
                        )
                    })
            }
            Rule::Lint | Rule::Unittest => {
                let (subcommand, node, description) = if *self == Rule::Lint {
                    ("lint", &chart.lint, format!("Lints the {name} chart."))
                } else {
                    ("unittest", &chart.unittest, format!("Runs unit tests for the {name} chart."))
                };
                let checks = node.borrow().resolve();
                let strict = checks.strict;
                let source = ValueSource::new(checks.values, checks.value_files);
                let values_dir = project.values_dir();
                Unit::new(candidate, description)
                    .depends_on(Rule::UpdateDependencies.name_for(name))
                    .enabled(checks.enabled)
                    .marker(project.marker_file(candidate))
                    .action(move |runner| {
                        let command = helm
                            .command(subcommand)
                            .flag("--strict", strict)
                            .values(&source, &values_dir)
                            .arg("chart", Some(dir.display()));
                        helm.exec(runner, command)
                    })
            }
            Rule::Package => {
                let destination = project.packages_dir();
                let version = chart.version.clone();
                let app_version = chart.app_version.clone();
                Unit::new(candidate, format!("Packages the {name} chart."))
                    .depends_on(Rule::UpdateDependencies.name_for(name))
                    .depends_on(Rule::Lint.name_for(name))
                    .action(move |runner| {
                        std::fs::create_dir_all(&destination).map_err(|source| {
                            CommandError::Io {
                                path: destination.clone(),
                                source,
                            }
                        })?;
                        let command = helm
                            .command("package")
                            .option("--destination", Some(destination.display()))
                            .option("--version", version.as_deref())
                            .option("--app-version", app_version.as_deref())
                            .arg("chart", Some(dir.display()));
                        helm.exec(runner, command)
                    })
            }
            _ => unreachable!("{} is not a chart rule", self.label()),
        }
    }

    fn release_unit(
        &self,
        candidate: &str,
        release: &Release,
        project: &Project,
        helm: Helm,
    ) -> Unit {
        let options = release.options.borrow().resolve();
        let release_name = release.release_name.clone();

        match self {
            Rule::Install => {
                let (chart_arg, version, package_task) = match &release.chart {
                    ChartRef::Local(chart) => (
                        project.staged_chart_dir(chart).display().to_string(),
                        None,
                        Some(Rule::Package.name_for(&chart.0)),
                    ),
                    ChartRef::External(reference) => {
                        (reference.clone(), release.version.clone(), None)
                    }
                };
                let source = ValueSource::new(options.values, options.value_files);
                let values_dir = project.values_dir();
                let (dry_run, namespace, wait, timeout) =
                    (options.dry_run, options.namespace, options.wait, options.timeout);

                let unit = Unit::new(
                    candidate,
                    format!("Installs or upgrades the {} release.", release.name),
                )
                .depends_on(INIT_SERVER);
                package_task
                    .into_iter()
                    .fold(unit, |unit, task| unit.depends_on(task))
                    .action(move |runner| {
                        let command = helm
                            .command("upgrade --install")
                            .flag("--dry-run", dry_run)
                            .option("--namespace", namespace.as_deref())
                            .option("--version", version.as_deref())
                            .flag("--wait", wait)
                            .option("--timeout", timeout)
                            .values(&source, &values_dir)
                            .arg("release", Some(&release_name))
                            .arg("chart", Some(&chart_arg));
                        helm.exec(runner, command)
                    })
            }
            Rule::Delete => {
                let (purge, dry_run) = (options.purge, options.dry_run);
                Unit::new(candidate, format!("Deletes the {} release.", release.name))
                    .depends_on(INIT_SERVER)
                    .action(move |runner| {
                        let command = helm
                            .command("delete")
                            .flag("--purge", purge)
                            .flag("--dry-run", dry_run)
                            .arg("release", Some(&release_name));
                        helm.exec(runner, command)
                    })
            }
            _ => unreachable!("{} is not a release rule", self.label()),
        }
    }
}

/// Process settings captured from the project at synthesis time.
#[derive(Debug, Clone)]
struct Helm {
    program: String,
    extra_args: Vec<String>,
    env: BTreeMap<String, String>,
    working_dir: PathBuf,
}

impl Helm {
    fn new(project: &Project) -> Self {
        Self {
            program: project.settings.executable.clone(),
            extra_args: project.settings.extra_args.clone(),
            env: project.settings.env.clone(),
            working_dir: project.root.clone(),
        }
    }

    fn command(&self, subcommand: &str) -> InvocationBuilder {
        InvocationBuilder::new(self.program.as_str(), subcommand)
            .working_dir(self.working_dir.as_path())
            .env(&self.env)
            .raw(self.extra_args.iter().cloned())
    }

    fn exec(&self, runner: &dyn ProcessRunner, command: InvocationBuilder) -> Result<(), CommandError> {
        let invocation = command.build()?;
        runner.run(&invocation)?;
        tracing::info!("ran: {invocation}");
        Ok(())
    }
}

fn has_lock_file(chart_dir: &Path) -> bool {
    chart_dir.join("Chart.lock").exists() || chart_dir.join("requirements.lock").exists()
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chart_names_capitalize_first_letter() {
        assert_eq!(Rule::Lint.name_for("foo"), "helmLintFooChart");
        assert_eq!(Rule::Unittest.name_for("fooBar"), "helmUnittestFooBarChart");
        assert_eq!(
            Rule::UpdateDependencies.name_for("foo"),
            "helmUpdateFooChartDependencies"
        );
        assert_eq!(Rule::FilterSources.name_for("foo"), "helmFilterFooChartSources");
    }

    #[test]
    fn release_names_capitalize_words() {
        assert_eq!(Rule::Delete.name_for("my-app"), "helmDeleteMyApp");
        assert_eq!(Rule::Install.name_for("myapp"), "helmInstallMyapp");
    }

    #[test]
    fn fixed_rules_ignore_entity() {
        assert_eq!(Rule::AddRepositories.name_for("whatever"), ADD_REPOSITORIES);
        assert!(Rule::InitServer.matches(INIT_SERVER));
        assert!(!Rule::InitServer.matches("helmInitServerX"));
    }

    #[test]
    fn matches_requires_non_lowercase_segment() {
        assert!(Rule::Lint.matches("helmLintFooChart"));
        assert!(Rule::Lint.matches("helmLint1stChart"));
        assert!(!Rule::Lint.matches("helmLintfooChart"));
        assert!(!Rule::Lint.matches("helmLintChart"));
        assert!(!Rule::Delete.matches("helmDelete"));
    }

    #[test]
    fn patterns_render_placeholders() {
        assert_eq!(Rule::Lint.pattern(), "helmLint<Chart>Chart");
        assert_eq!(Rule::Delete.pattern(), "helmDelete<Release>");
        assert_eq!(Rule::InitServer.pattern(), INIT_SERVER);
    }
}
