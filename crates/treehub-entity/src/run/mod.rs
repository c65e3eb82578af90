//! Execution log entities.

pub mod model;
pub mod status;

pub use model::{CreateRunLogEntry, RunLogEntry};
pub use status::RunStatus;
