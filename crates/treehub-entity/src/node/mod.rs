//! Tree node entities.

pub mod db_ref;
pub mod kind;
pub mod model;

pub use db_ref::{DbRef, DbRefType};
pub use kind::NodeType;
pub use model::{Node, normalize_ext};
