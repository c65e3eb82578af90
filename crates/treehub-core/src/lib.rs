//! # treehub-core
//!
//! Core crate for TreeHub. Contains configuration schemas, the shared
//! pagination and write-report types, and the unified error system.
//!
//! This crate has **no** internal dependencies on other TreeHub crates.

pub mod config;
pub mod error;
pub mod result;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
