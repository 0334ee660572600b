//! Invocation Builder: turns resolved configuration into a helm argument list.
//!
//! Tokens are emitted strictly in call order, so the argument list depends only
//! on the order of builder calls and the inputs, never on map iteration order.
//!
//! | Call       | Emits                                                        |
//! |------------|--------------------------------------------------------------|
//! | `flag`     | `--name` for `Some(true)`; nothing for `Some(false)` / `None` |
//! | `option`   | `--name value` when present and non-empty; nothing otherwise |
//! | `values`   | `--set`/`--set-string` pairs, or `--values <file>`           |
//! | `arg`      | `value`; missing or empty is an error                        |

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde_yaml::Value;

use crate::error::CommandError;
use crate::values::{self, ValueSource};

/// Largest number of scalar leaves passed as `--set` pairs; above this (or when
/// any value file is involved) the merged values go into a values file.
pub const INLINE_SET_LIMIT: usize = 8;

/// A fully built external process call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    /// Subcommand tokens first, then options and positionals in call order.
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    pub env: BTreeMap<String, String>,
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " '{arg}'")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

/// Builder for [`Invocation`]. The first error is kept and reported by [`build`].
///
/// [`build`]: InvocationBuilder::build
#[derive(Debug)]
pub struct InvocationBuilder {
    program: String,
    subcommand: String,
    args: Vec<String>,
    working_dir: Option<PathBuf>,
    env: BTreeMap<String, String>,
    error: Option<CommandError>,
}

impl InvocationBuilder {
    /// Start an invocation of `program`; `subcommand` may span several words
    /// (`"dependency update"`).
    pub fn new(program: impl Into<String>, subcommand: &str) -> Self {
        Self {
            program: program.into(),
            subcommand: subcommand.to_string(),
            args: subcommand.split_whitespace().map(str::to_string).collect(),
            working_dir: None,
            env: BTreeMap::new(),
            error: None,
        }
    }

    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn env(mut self, env: &BTreeMap<String, String>) -> Self {
        self.env
            .extend(env.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    /// Append tokens verbatim (global options such as `--kube-context dev`).
    pub fn raw<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(tokens.into_iter().map(Into::into));
        self
    }

    /// Boolean flag: one token iff `value == Some(true)`.
    pub fn flag(mut self, name: &str, value: Option<bool>) -> Self {
        if value == Some(true) {
            self.args.push(name.to_string());
        }
        self
    }

    /// Valued option: two tokens iff `value` is present and renders non-empty.
    pub fn option<V: ToString>(mut self, name: &str, value: Option<V>) -> Self {
        if let Some(value) = value.map(|v| v.to_string()).filter(|v| !v.is_empty()) {
            self.args.push(name.to_string());
            self.args.push(value);
        }
        self
    }

    /// Merged values: nothing when empty, `--set` pairs for a few scalars from
    /// inline values only, otherwise one canonical file under `values_dir`.
    pub fn values(mut self, source: &ValueSource, values_dir: &Path) -> Self {
        if self.error.is_some() || source.is_empty() {
            return self;
        }
        let resolved = match values::resolve(source) {
            Ok(resolved) => resolved,
            Err(e) => return self.fail(e),
        };
        if resolved.is_empty() {
            return self;
        }

        let leaves = values::flatten(&resolved);
        let inline_only = source.files.is_empty()
            && leaves.len() <= INLINE_SET_LIMIT
            && leaves.iter().all(|(key, value)| is_set_leaf(key, value));
        if inline_only {
            for (key, value) in leaves {
                match value {
                    Value::String(s) => {
                        self.args.push("--set-string".to_string());
                        self.args.push(format!("{key}={}", escape_set_value(&s)));
                    }
                    other => {
                        self.args.push("--set".to_string());
                        self.args.push(format!("{key}={}", values::key_string(&other)));
                    }
                }
            }
            return self;
        }

        match values::materialize(&resolved, values_dir) {
            Ok(path) => {
                self.args.push("--values".to_string());
                self.args.push(path.display().to_string());
                self
            }
            Err(e) => self.fail(e),
        }
    }

    /// Required positional argument.
    pub fn arg<V: ToString>(mut self, name: &str, value: Option<V>) -> Self {
        match value.map(|v| v.to_string()).filter(|v| !v.is_empty()) {
            Some(value) => self.args.push(value),
            None => {
                let err = CommandError::MissingRequiredArgument {
                    subcommand: self.subcommand.clone(),
                    argument: name.to_string(),
                };
                self = self.fail(err);
            }
        }
        self
    }

    pub fn build(self) -> Result<Invocation, CommandError> {
        if let Some(err) = self.error {
            return Err(err);
        }
        Ok(Invocation {
            program: self.program,
            args: self.args,
            working_dir: self.working_dir,
            env: self.env,
        })
    }

    fn fail(mut self, err: CommandError) -> Self {
        if self.error.is_none() {
            self.error = Some(err);
        }
        self
    }
}

/// A leaf helm's `--set` parser reads back unchanged: a plain path and a scalar.
///
/// `flatten` writes a literal dot in a segment as `\.`, so any backslash in
/// the key marks a segment that only a values file can carry.
fn is_set_leaf(key: &str, value: &Value) -> bool {
    !key.contains(['\\', ',', '=', '[', ']'])
        && matches!(value, Value::Bool(_) | Value::Number(_) | Value::String(_))
}

fn escape_set_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace(',', "\\,")
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
