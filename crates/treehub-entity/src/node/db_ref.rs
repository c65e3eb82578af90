//! Cross-reference payload linking a node to an external entity.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of external entity a node is linked to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DbRefType {
    /// Top-level organization (tree depth 0).
    Organization,
    /// Field within an organization (tree depth 1).
    Field,
    /// Well within a field (tree depth 3).
    Well,
}

impl DbRefType {
    /// Return the type as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Organization => "organization",
            Self::Field => "field",
            Self::Well => "well",
        }
    }
}

impl fmt::Display for DbRefType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A pointer from a tree node to an entity in the reference dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbRef {
    /// What kind of entity `id` refers to.
    #[serde(rename = "dbType")]
    pub db_type: DbRefType,
    /// External identifier of the entity.
    pub id: String,
    /// Owning organization, for fields and wells.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_organization: Option<String>,
    /// Owning field, for wells.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_field: Option<String>,
}

impl DbRef {
    /// Link to an organization.
    pub fn organization(id: impl Into<String>) -> Self {
        Self {
            db_type: DbRefType::Organization,
            id: id.into(),
            id_organization: None,
            id_field: None,
        }
    }

    /// Link to a field of an organization.
    pub fn field(id: impl Into<String>, organization: impl Into<String>) -> Self {
        Self {
            db_type: DbRefType::Field,
            id: id.into(),
            id_organization: Some(organization.into()),
            id_field: None,
        }
    }

    /// Link to a well of a field.
    pub fn well(
        id: impl Into<String>,
        organization: Option<String>,
        field: impl Into<String>,
    ) -> Self {
        Self {
            db_type: DbRefType::Well,
            id: id.into(),
            id_organization: organization,
            id_field: Some(field.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialized_shape() {
        let r = DbRef::field("M1", "O1");
        let json = serde_json::to_value(&r).expect("serialize");
        assert_eq!(
            json,
            serde_json::json!({"dbType": "field", "id": "M1", "id_organization": "O1"})
        );
    }
}
