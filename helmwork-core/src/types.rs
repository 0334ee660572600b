//! Domain types for a helmwork project.
//!
//! All path fields use `PathBuf`; never `&str` or `String` for filesystem paths.
//! Charts and releases carry [`NodeRef`]s whose parents are the project-wide
//! [`Defaults`] nodes.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::hierarchy::{ConfigNode, NodeRef};
use crate::options::{CheckOptions, ReleaseOptions};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A strongly-typed name for a chart declared in the project.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChartName(pub String);

impl fmt::Display for ChartName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for ChartName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ChartName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// A strongly-typed name for a release declared in the project.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ReleaseName(pub String);

impl fmt::Display for ReleaseName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for ReleaseName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ReleaseName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// The chart a release deploys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChartRef {
    /// A chart declared in this project; it is packaged before install.
    Local(ChartName),
    /// Anything helm resolves on its own (`stable/nginx`, a URL, a `.tgz`).
    External(String),
}

impl fmt::Display for ChartRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChartRef::Local(name) => write!(f, "{name}"),
            ChartRef::External(reference) => write!(f, "{reference}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Settings for invoking the helm executable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HelmSettings {
    pub executable: String,
    /// Output root for staged charts, packages, values files and markers.
    /// Relative paths are resolved against the project root.
    pub build_dir: PathBuf,
    /// Run `helm init` with server-side components instead of `--client-only`.
    pub install_server: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_account: Option<String>,
    /// Tokens inserted right after the subcommand of every invocation.
    pub extra_args: Vec<String>,
    pub env: BTreeMap<String, String>,
}

impl Default for HelmSettings {
    fn default() -> Self {
        Self {
            executable: "helm".to_string(),
            build_dir: PathBuf::from("build/helm"),
            install_server: false,
            service_account: None,
            extra_args: vec![],
            env: BTreeMap::new(),
        }
    }
}

/// A chart repository registered with `helm repo add`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Repository {
    pub name: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

// ---------------------------------------------------------------------------
// Domain structs
// ---------------------------------------------------------------------------

/// Global default scopes. Every chart/release node is parented to one of these.
#[derive(Debug)]
pub struct Defaults {
    pub lint: NodeRef<CheckOptions>,
    pub unittest: NodeRef<CheckOptions>,
    pub release: NodeRef<ReleaseOptions>,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            lint: ConfigNode::new(CheckOptions::default()),
            unittest: ConfigNode::new(CheckOptions::default()),
            release: ConfigNode::new(ReleaseOptions::default()),
        }
    }
}

/// A named, versioned chart source bundle.
#[derive(Debug)]
pub struct Chart {
    pub name: ChartName,
    /// Source directory (absolute once loaded).
    pub dir: PathBuf,
    pub version: Option<String>,
    pub app_version: Option<String>,
    /// Other charts of the same project this chart depends on.
    pub dependencies: Vec<ChartName>,
    pub lint: NodeRef<CheckOptions>,
    pub unittest: NodeRef<CheckOptions>,
}

/// A named deployment of a chart.
#[derive(Debug)]
pub struct Release {
    pub name: ReleaseName,
    /// Name passed to helm; defaults to `name`.
    pub release_name: String,
    pub chart: ChartRef,
    pub version: Option<String>,
    pub options: NodeRef<ReleaseOptions>,
}

/// Everything declared in one `helmwork.yaml`.
#[derive(Debug)]
pub struct Project {
    /// Directory containing the project file.
    pub root: PathBuf,
    pub settings: HelmSettings,
    pub repositories: Vec<Repository>,
    pub charts: Vec<Chart>,
    pub releases: Vec<Release>,
    /// User task aliases: alias name → task names it stands for.
    pub aliases: BTreeMap<String, Vec<String>>,
    pub defaults: Defaults,
}

impl Project {
    /// An empty project rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            settings: HelmSettings::default(),
            repositories: vec![],
            charts: vec![],
            releases: vec![],
            aliases: BTreeMap::new(),
            defaults: Defaults::default(),
        }
    }

    /// Declare a chart whose option nodes inherit from the project defaults.
    ///
    /// The source directory defaults to `<root>/charts/<name>`.
    pub fn declare_chart(&mut self, name: impl Into<ChartName>) -> &mut Chart {
        let name = name.into();
        let chart = Chart {
            dir: self.root.join("charts").join(&name.0),
            name,
            version: None,
            app_version: None,
            dependencies: vec![],
            lint: ConfigNode::with_parent(CheckOptions::default(), &self.defaults.lint),
            unittest: ConfigNode::with_parent(CheckOptions::default(), &self.defaults.unittest),
        };
        self.charts.push(chart);
        let last = self.charts.len() - 1;
        &mut self.charts[last]
    }

    /// Declare a release of `chart`. A chart that names a declared chart becomes
    /// [`ChartRef::Local`], anything else is passed to helm verbatim.
    pub fn declare_release(&mut self, name: impl Into<ReleaseName>, chart: &str) -> &mut Release {
        let name = name.into();
        let chart = if self.charts.iter().any(|c| c.name.0 == chart) {
            ChartRef::Local(ChartName::from(chart))
        } else {
            ChartRef::External(chart.to_string())
        };
        let release = Release {
            release_name: name.0.clone(),
            name,
            chart,
            version: None,
            options: ConfigNode::with_parent(ReleaseOptions::default(), &self.defaults.release),
        };
        self.releases.push(release);
        let last = self.releases.len() - 1;
        &mut self.releases[last]
    }

    pub fn chart(&self, name: &ChartName) -> Option<&Chart> {
        self.charts.iter().find(|c| &c.name == name)
    }

    pub fn release(&self, name: &ReleaseName) -> Option<&Release> {
        self.releases.iter().find(|r| &r.name == name)
    }

    /// Absolute build output root.
    pub fn build_dir(&self) -> PathBuf {
        if self.settings.build_dir.is_absolute() {
            self.settings.build_dir.clone()
        } else {
            self.root.join(&self.settings.build_dir)
        }
    }

    /// Where a chart's sources are staged before any helm command touches them.
    pub fn staged_chart_dir(&self, chart: &ChartName) -> PathBuf {
        self.build_dir().join("charts").join(&chart.0)
    }

    pub fn packages_dir(&self) -> PathBuf {
        self.build_dir().join("packages")
    }

    pub fn values_dir(&self) -> PathBuf {
        self.build_dir().join("values")
    }

    /// Marker file for a unit whose effects helm does not write to disk.
    pub fn marker_file(&self, unit_name: &str) -> PathBuf {
        self.build_dir()
            .join("markers")
            .join(format!("{unit_name}.marker"))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
