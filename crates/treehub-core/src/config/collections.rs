//! Collection (table) names.

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Names of the tables the engine reads and writes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionsConfig {
    /// Live node table.
    #[serde(default = "default_nodes")]
    pub nodes: String,
    /// Staging table filled by the importer.
    #[serde(default = "default_staging")]
    pub staging: String,
    /// Execution log table.
    #[serde(default = "default_run_log")]
    pub run_log: String,
    /// Reference organizations.
    #[serde(default = "default_organizations")]
    pub organizations: String,
    /// Reference fields.
    #[serde(default = "default_fields")]
    pub fields: String,
    /// Reference wells.
    #[serde(default = "default_wells")]
    pub wells: String,
}

impl CollectionsConfig {
    /// Check that every configured name is a plain SQL identifier.
    ///
    /// Table names are interpolated into statements, so anything other
    /// than `[A-Za-z_][A-Za-z0-9_]*` is rejected.
    pub fn validate(&self) -> Result<(), AppError> {
        for name in [
            &self.nodes,
            &self.staging,
            &self.run_log,
            &self.organizations,
            &self.fields,
            &self.wells,
        ] {
            validate_identifier(name)?;
        }
        Ok(())
    }
}

impl Default for CollectionsConfig {
    fn default() -> Self {
        Self {
            nodes: default_nodes(),
            staging: default_staging(),
            run_log: default_run_log(),
            organizations: default_organizations(),
            fields: default_fields(),
            wells: default_wells(),
        }
    }
}

/// Validate a table name used in dynamically built SQL.
pub fn validate_identifier(name: &str) -> Result<(), AppError> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };

    if valid && name.len() <= 63 {
        Ok(())
    } else {
        Err(AppError::configuration(format!(
            "Invalid collection name '{name}'"
        )))
    }
}

fn default_nodes() -> String {
    "files".to_string()
}

fn default_staging() -> String {
    "files_tmp".to_string()
}

fn default_run_log() -> String {
    "logs".to_string()
}

fn default_organizations() -> String {
    "organizations".to_string()
}

fn default_fields() -> String {
    "fields".to_string()
}

fn default_wells() -> String {
    "wells".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_validation() {
        assert!(validate_identifier("files").is_ok());
        assert!(validate_identifier("_files_tmp2").is_ok());
        assert!(validate_identifier("2files").is_err());
        assert!(validate_identifier("files; DROP TABLE x").is_err());
        assert!(validate_identifier("").is_err());
    }

    #[test]
    fn test_defaults_are_valid() {
        assert!(CollectionsConfig::default().validate().is_ok());
    }
}
