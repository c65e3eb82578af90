//! Reference entity models.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Leading numeric token of a well name.
static LEADING_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{1,3}").expect("static regex"));

/// An organization matched against depth-0 node names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Organization {
    /// External organization identifier.
    pub id: String,
    /// Folder name the organization appears under.
    pub db_name: String,
}

/// A field matched against depth-1 node names inside its organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Field {
    /// External field identifier.
    pub id: String,
    /// Owning organization.
    pub organization_id: String,
    /// Folder name the field appears under.
    pub db_name: String,
}

/// A well matched against depth-3 node names inside its field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Well {
    /// External well identifier.
    pub id: String,
    /// Owning field.
    pub field_id: String,
    /// Well name as recorded in the reference dataset.
    pub db_name: String,
}

impl Well {
    /// The folder name this well is expected to appear under.
    pub fn folder_name(&self) -> String {
        pad_leading_number(&self.db_name)
    }
}

/// Left-pad a leading run of one to three digits to three digits.
///
/// `"7-bis"` → `"007-bis"`, `"42"` → `"042"`, `"1234"` and `"abc"` are
/// unchanged beyond their first three characters.
pub fn pad_leading_number(name: &str) -> String {
    LEADING_NUMBER
        .replace(name, |caps: &regex::Captures<'_>| format!("{:0>3}", &caps[0]))
        .into_owned()
}
