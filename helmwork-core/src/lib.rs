//! helmwork core library: domain types, hierarchical configuration, project loading.
//!
//! - [`types`]: chart / release newtypes and domain structs
//! - [`hierarchy`]: config nodes with late-bound parents
//! - [`options`]: property sets carried by config nodes
//! - [`merge`]: deep merge of YAML value trees across scopes
//! - [`naming`]: capitalisation helpers behind conventional task names
//! - [`project`]: `helmwork.yaml` load / validate
//! - [`error`]: [`ConfigError`]

pub mod error;
pub mod hierarchy;
pub mod merge;
pub mod naming;
pub mod options;
pub mod project;
pub mod types;

pub use error::ConfigError;
pub use hierarchy::{ConfigNode, ListProp, MapProp, NodeRef, Scalar};
pub use options::{CheckOptions, ReleaseOptions, ResolvedChecks, ResolvedRelease};
pub use types::{
    Chart, ChartName, ChartRef, Defaults, HelmSettings, Project, Release, ReleaseName, Repository,
};
