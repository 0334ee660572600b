//! `helmwork.yaml`: project file loading and validation.
//!
//! # File layout
//!
//! ```yaml
//! helm:       { executable: helm, build_dir: build/helm, extra_args: [...], env: {...} }
//! repositories:
//!   - { name: stable, url: "https://charts.example.com" }
//! defaults:
//!   lint:     { strict: true }
//!   unittest: { value_files: [test-values.yaml] }
//!   release:  { namespace: apps }
//! charts:
//!   foo:      { dir: charts/foo, version: 1.0.0, dependencies: [bar] }
//! releases:
//!   myapp:    { chart: foo, purge: true }
//! tasks:
//!   deployAll: [helmInstallMyapp]
//! ```
//!
//! # API pattern
//!
//! - `load_at(path)`: explicit project file; used by the CLI and by tests with `TempDir`
//! - `from_yaml_str(yaml, root)`: in-memory YAML, relative paths against `root`

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_yaml::Value;

use crate::error::ConfigError;
use crate::hierarchy::{ListProp, MapProp, Scalar};
use crate::naming::{capitalize, capitalize_words};
use crate::options::{CheckOptions, ReleaseOptions};
use crate::types::{ChartName, HelmSettings, Project, Repository};

/// Default project file name.
pub const PROJECT_FILE: &str = "helmwork.yaml";

// ---------------------------------------------------------------------------
// 1. File schema
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ProjectFile {
    helm: HelmSettings,
    repositories: Vec<Repository>,
    defaults: DefaultsFile,
    charts: BTreeMap<String, ChartFile>,
    releases: BTreeMap<String, ReleaseFile>,
    tasks: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct DefaultsFile {
    lint: CheckOptions,
    unittest: CheckOptions,
    release: ReleaseOptions,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ChartFile {
    dir: Option<PathBuf>,
    version: Option<String>,
    app_version: Option<String>,
    dependencies: Vec<String>,
    lint: CheckOptions,
    unittest: CheckOptions,
}

// Release options are spelled out rather than flattened: serde cannot combine
// `flatten` with `deny_unknown_fields`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ReleaseFile {
    #[serde(default)]
    release_name: Option<String>,
    chart: String,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    dry_run: Scalar<bool>,
    #[serde(default)]
    purge: Scalar<bool>,
    #[serde(default)]
    namespace: Scalar<String>,
    #[serde(default)]
    wait: Scalar<bool>,
    #[serde(default)]
    timeout: Scalar<u64>,
    #[serde(default)]
    values: MapProp<Value>,
    #[serde(default)]
    value_files: ListProp<PathBuf>,
}

impl ReleaseFile {
    fn options(&self) -> ReleaseOptions {
        ReleaseOptions {
            dry_run: self.dry_run.clone(),
            purge: self.purge.clone(),
            namespace: self.namespace.clone(),
            wait: self.wait.clone(),
            timeout: self.timeout.clone(),
            values: self.values.clone(),
            value_files: self.value_files.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// 2. Load
// ---------------------------------------------------------------------------

/// Load and validate the project file at `path`.
///
/// Returns `ConfigError::ProjectNotFound` if absent,
/// `ConfigError::Parse` (with path + line context) if malformed YAML.
pub fn load_at(path: &Path) -> Result<Project, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::ProjectNotFound {
            path: path.to_path_buf(),
        });
    }
    let contents = std::fs::read_to_string(path)?;
    let file: ProjectFile = serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        source: e,
    })?;
    let root = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    build(file, root)
}

/// Parse project YAML held in memory; relative paths resolve against `root`.
pub fn from_yaml_str(yaml: &str, root: &Path) -> Result<Project, ConfigError> {
    let file: ProjectFile = serde_yaml::from_str(yaml).map_err(|e| ConfigError::Parse {
        path: root.join(PROJECT_FILE),
        source: e,
    })?;
    build(file, root.to_path_buf())
}

fn build(file: ProjectFile, root: PathBuf) -> Result<Project, ConfigError> {
    let mut project = Project::new(root.clone());
    project.settings = file.helm;
    project.repositories = file.repositories;
    project.aliases = file.tasks;

    let mut defaults = file.defaults;
    defaults.lint.absolutize(&root);
    defaults.unittest.absolutize(&root);
    defaults.release.absolutize(&root);
    *project.defaults.lint.borrow_mut().props_mut() = defaults.lint;
    *project.defaults.unittest.borrow_mut().props_mut() = defaults.unittest;
    *project.defaults.release.borrow_mut().props_mut() = defaults.release;

    // Charts first so releases can tell local charts from external references.
    for (name, mut entry) in file.charts {
        entry.lint.absolutize(&root);
        entry.unittest.absolutize(&root);
        let chart = project.declare_chart(name.as_str());
        if let Some(dir) = entry.dir {
            chart.dir = if dir.is_relative() { root.join(dir) } else { dir };
        }
        chart.version = entry.version;
        chart.app_version = entry.app_version;
        chart.dependencies = entry.dependencies.into_iter().map(ChartName::from).collect();
        *chart.lint.borrow_mut().props_mut() = entry.lint;
        *chart.unittest.borrow_mut().props_mut() = entry.unittest;
    }

    for (name, entry) in file.releases {
        let mut options = entry.options();
        options.absolutize(&root);
        let release = project.declare_release(name.as_str(), &entry.chart);
        if let Some(release_name) = entry.release_name {
            release.release_name = release_name;
        }
        release.version = entry.version;
        *release.options.borrow_mut().props_mut() = options;
    }

    validate(&project)?;
    Ok(project)
}

// ---------------------------------------------------------------------------
// 3. Validate
// ---------------------------------------------------------------------------

/// Check the invariants conventional task names rely on.
///
/// - every chart / release name yields a non-empty name segment that does not
///   start lowercase (otherwise the rule pattern could not recognise it)
/// - no two charts (or two releases) are declared twice or share a name segment
/// - chart dependencies name declared charts
pub fn validate(project: &Project) -> Result<(), ConfigError> {
    check_names(
        "chart",
        project.charts.iter().map(|c| c.name.0.as_str()),
        capitalize,
    )?;
    check_names(
        "release",
        project.releases.iter().map(|r| r.name.0.as_str()),
        capitalize_words,
    )?;

    for chart in &project.charts {
        for dep in &chart.dependencies {
            if project.chart(dep).is_none() {
                return Err(ConfigError::UnknownChart {
                    referenced_by: chart.name.0.clone(),
                    chart: dep.0.clone(),
                });
            }
        }
    }

    for release in &project.releases {
        if release.release_name.trim().is_empty() {
            return Err(ConfigError::InvalidName {
                kind: "release",
                name: release.release_name.clone(),
            });
        }
    }
    Ok(())
}

fn check_names<'a>(
    kind: &'static str,
    names: impl Iterator<Item = &'a str>,
    segment: fn(&str) -> String,
) -> Result<(), ConfigError> {
    let mut seen: HashMap<String, &'a str> = HashMap::new();
    for name in names {
        let key = segment(name);
        let starts_lowercase = key.chars().next().is_some_and(char::is_lowercase);
        if name.trim().is_empty()
            || key.is_empty()
            || starts_lowercase
            || key.chars().any(char::is_whitespace)
        {
            return Err(ConfigError::InvalidName {
                kind,
                name: name.to_string(),
            });
        }
        if let Some(first) = seen.insert(key, name) {
            if first == name {
                return Err(ConfigError::DuplicateName {
                    kind,
                    name: name.to_string(),
                });
            }
            return Err(ConfigError::NameCollision {
                kind,
                first: first.to_string(),
                second: name.to_string(),
            });
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
