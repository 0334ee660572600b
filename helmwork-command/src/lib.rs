//! # helmwork-command
//!
//! Everything between resolved configuration and a running `helm` process:
//!
//! - [`values`]: merge inline values and value files into one document
//! - [`invocation`]: deterministic argument lists via [`InvocationBuilder`]
//! - [`process`]: the [`ProcessRunner`] boundary and its system implementation
//! - [`marker`] / [`write`]: marker files and hash-gated atomic writes

pub mod error;
pub mod invocation;
pub mod marker;
pub mod process;
pub mod values;
pub mod write;

pub use error::CommandError;
pub use invocation::{Invocation, InvocationBuilder, INLINE_SET_LIMIT};
pub use process::{ProcessOutput, ProcessRunner, RecordingRunner, SystemRunner};
pub use values::ValueSource;
