//! # helmwork-rules
//!
//! On-demand task synthesis from naming conventions.
//!
//! Ask a [`Dispatcher`] pass for a task name such as `helmLintFooChart`; the
//! first [`Rule`] whose pattern matches looks up the chart or release, binds
//! its resolved configuration into an action, and returns a [`Unit`] with its
//! predecessors declared by name.

pub mod dispatcher;
pub mod rule;
mod staging;
pub mod unit;

pub use dispatcher::{Dispatcher, ResolutionPass, TaskName};
pub use rule::{Rule, ADD_REPOSITORIES, INIT_SERVER};
pub use unit::{Action, Unit};
