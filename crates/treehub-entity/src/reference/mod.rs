//! External reference dataset entities (organization → field → well).

pub mod model;

pub use model::{Field, Organization, Well, pad_leading_number};
