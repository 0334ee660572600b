//! Value Source Resolver.
//!
//! Merge order: value files in declared order, then the inline map on top.
//! Merging is deep (see [`helmwork_core::merge`]): nested mappings merge key
//! by key, everything else is replaced wholesale by the later source.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde_yaml::{Mapping, Value};

use helmwork_core::merge::{deep_merge, expand_dotted};

use crate::error::CommandError;
use crate::write::{digest, write_atomic};

/// Inline values plus ordered value files.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValueSource {
    /// Final override layer. Dotted keys (`image.tag`) address nested paths.
    pub inline: BTreeMap<String, Value>,
    /// Base layers; a later file wins over an earlier one.
    pub files: Vec<PathBuf>,
}

impl ValueSource {
    pub fn new(inline: BTreeMap<String, Value>, files: Vec<PathBuf>) -> Self {
        Self { inline, files }
    }

    pub fn is_empty(&self) -> bool {
        self.inline.is_empty() && self.files.is_empty()
    }
}

/// Resolve `source` into a single merged mapping.
///
/// Fails with [`CommandError::SourceUnreadable`] on the first file that is
/// missing, malformed, or not a mapping at the top level.
pub fn resolve(source: &ValueSource) -> Result<Mapping, CommandError> {
    let mut merged = Mapping::new();
    for path in &source.files {
        deep_merge(&mut merged, read_values_file(path)?);
    }
    deep_merge(&mut merged, expand_dotted(&source.inline));
    Ok(merged)
}

fn read_values_file(path: &Path) -> Result<Mapping, CommandError> {
    let unreadable = |reason: String| CommandError::SourceUnreadable {
        path: path.to_path_buf(),
        reason,
    };
    let contents = std::fs::read_to_string(path).map_err(|e| unreadable(e.to_string()))?;
    match serde_yaml::from_str::<Value>(&contents).map_err(|e| unreadable(e.to_string()))? {
        Value::Mapping(mapping) => Ok(mapping),
        Value::Null => Ok(Mapping::new()),
        _ => Err(unreadable("top-level document is not a mapping".to_string())),
    }
}

// ---------------------------------------------------------------------------
// Serialization helpers
// ---------------------------------------------------------------------------

/// Flatten a merged mapping into `--set` style dotted paths.
///
/// Dots inside a key segment are escaped (`a\.b`). Non-empty mappings are
/// descended into; everything else is a leaf.
pub fn flatten(values: &Mapping) -> BTreeMap<String, Value> {
    let mut leaves = BTreeMap::new();
    flatten_into(values, "", &mut leaves);
    leaves
}

fn flatten_into(values: &Mapping, prefix: &str, leaves: &mut BTreeMap<String, Value>) {
    for (key, value) in values {
        let segment = key_string(key).replace('.', "\\.");
        let path = if prefix.is_empty() {
            segment
        } else {
            format!("{prefix}.{segment}")
        };
        match value {
            Value::Mapping(nested) if !nested.is_empty() => flatten_into(nested, &path, leaves),
            other => {
                leaves.insert(path, other.clone());
            }
        }
    }
}

/// Copy of `values` with every mapping's keys sorted, recursively.
pub fn canonical(values: &Mapping) -> Mapping {
    let mut entries: Vec<(&Value, &Value)> = values.iter().collect();
    entries.sort_by_key(|(key, _)| key_string(key));
    let mut sorted = Mapping::new();
    for (key, value) in entries {
        let value = match value {
            Value::Mapping(nested) => Value::Mapping(canonical(nested)),
            other => other.clone(),
        };
        sorted.insert(key.clone(), value);
    }
    sorted
}

/// Write `values` canonically into `dir` under a content-addressed name.
///
/// Identical content always lands at the same path, so repeated builds yield
/// identical `--values <path>` arguments.
pub fn materialize(values: &Mapping, dir: &Path) -> Result<PathBuf, CommandError> {
    let yaml = serde_yaml::to_string(&canonical(values))?;
    let hash = digest(yaml.as_bytes());
    let path = dir.join(format!("values-{}.yaml", &hash[..16]));
    write_atomic(&path, yaml.as_bytes())?;
    Ok(path)
}

/// Render a scalar YAML key or value the way helm's `--set` parser reads it.
pub fn key_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Null => "null".to_string(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
