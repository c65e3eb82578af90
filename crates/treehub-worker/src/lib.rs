//! Derived-attribute propagation engine for TreeHub.
//!
//! This crate provides:
//! - A level reader and a bounded batch writer over a [`NodeStore`]
//! - The [`Foldmachine`], a level-synchronous driver for top-down and
//!   bottom-up attribute passes
//! - Job implementations for sync, warning flagging, reset, the four fold
//!   attributes and reference linking
//! - A job executor and a run orchestrator with run-log and notification
//!   sinks
//!
//! [`NodeStore`]: treehub_database::NodeStore

pub mod context;
pub mod error;
pub mod executor;
pub mod fold;
pub mod jobs;
pub mod notify;
pub mod reader;
pub mod runner;
pub mod writer;

pub use context::EngineContext;
pub use error::PassError;
pub use executor::{JobExecutor, JobHandler, JobKind};
pub use fold::{Direction, Foldmachine, LevelReport, PassSummary};
pub use runner::{RunOrchestrator, RunSummary};
pub use writer::BatchWriter;
