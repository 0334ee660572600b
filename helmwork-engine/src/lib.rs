//! Reference engine: builds the task graph on demand through the rule
//! dispatcher, plans it, and runs the plan on a tokio worker pool.

mod error;
pub mod execute;
pub mod graph;
pub mod logging;

pub use error::EngineError;
pub use execute::{execute, execute_async, ExecutionReport, UnitReport, UnitState};
pub use graph::{Plan, TaskGraph};
pub use logging::{init_tracing, LogFormat};
