//! Property sets carried by config nodes, and their resolved snapshots.
//!
//! The property structs deserialize straight from `helmwork.yaml`; every field
//! is optional so an omitted key inherits from the defaults node.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_yaml::Value;

use crate::hierarchy::{ConfigNode, ListProp, MapProp, Scalar};
use crate::merge;

/// Options shared by `helm lint` and `helm unittest`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CheckOptions {
    /// Run the check at all. Resolves to `true` when unset everywhere.
    pub enabled: Scalar<bool>,
    /// Fail on warnings.
    pub strict: Scalar<bool>,
    pub values: MapProp<Value>,
    pub value_files: ListProp<PathBuf>,
}

/// Options applied to a deployed release.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReleaseOptions {
    /// Simulate install/delete.
    pub dry_run: Scalar<bool>,
    /// On delete, also free the release name for later use.
    pub purge: Scalar<bool>,
    pub namespace: Scalar<String>,
    /// Wait until all resources are ready before marking the install successful.
    pub wait: Scalar<bool>,
    /// Seconds to wait for individual Kubernetes operations.
    pub timeout: Scalar<u64>,
    pub values: MapProp<Value>,
    pub value_files: ListProp<PathBuf>,
}

/// [`CheckOptions`] with the parent chain folded in.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedChecks {
    pub enabled: bool,
    pub strict: Option<bool>,
    pub values: BTreeMap<String, Value>,
    pub value_files: Vec<PathBuf>,
}

/// [`ReleaseOptions`] with the parent chain folded in.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRelease {
    pub dry_run: Option<bool>,
    pub purge: Option<bool>,
    pub namespace: Option<String>,
    pub wait: Option<bool>,
    pub timeout: Option<u64>,
    pub values: BTreeMap<String, Value>,
    pub value_files: Vec<PathBuf>,
}

impl ConfigNode<CheckOptions> {
    pub fn resolve(&self) -> ResolvedChecks {
        ResolvedChecks {
            enabled: self.resolve_scalar(|o| &o.enabled).unwrap_or(true),
            strict: self.resolve_scalar(|o| &o.strict),
            values: merge::layer(self.map_layers(|o| &o.values)),
            value_files: self.resolve_list(|o| &o.value_files),
        }
    }
}

impl ConfigNode<ReleaseOptions> {
    pub fn resolve(&self) -> ResolvedRelease {
        ResolvedRelease {
            dry_run: self.resolve_scalar(|o| &o.dry_run),
            purge: self.resolve_scalar(|o| &o.purge),
            namespace: self.resolve_scalar(|o| &o.namespace),
            wait: self.resolve_scalar(|o| &o.wait),
            timeout: self.resolve_scalar(|o| &o.timeout),
            values: merge::layer(self.map_layers(|o| &o.values)),
            value_files: self.resolve_list(|o| &o.value_files),
        }
    }
}

impl CheckOptions {
    /// Resolve relative value-file paths against `root`.
    pub fn absolutize(&mut self, root: &Path) {
        absolutize_all(self.value_files.local_mut(), root);
    }
}

impl ReleaseOptions {
    /// Resolve relative value-file paths against `root`.
    pub fn absolutize(&mut self, root: &Path) {
        absolutize_all(self.value_files.local_mut(), root);
    }
}

fn absolutize_all(paths: &mut [PathBuf], root: &Path) {
    for path in paths.iter_mut() {
        if path.is_relative() {
            *path = root.join(&*path);
        }
    }
}
