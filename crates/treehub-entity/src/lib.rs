//! # treehub-entity
//!
//! Domain entity models for TreeHub. Every struct in this crate
//! represents a stored record or a domain value object. All entities
//! derive `Debug`, `Clone`, `Serialize`, `Deserialize`; reference and
//! run-log rows additionally derive `sqlx::FromRow`.

pub mod node;
pub mod reference;
pub mod run;

pub use node::{DbRef, DbRefType, Node, NodeType, normalize_ext};
