//! Node type enumeration.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use treehub_core::error::AppError;

/// Whether a node is a file or a folder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    /// A regular file (leaf).
    #[default]
    File,
    /// A folder that may contain other nodes.
    Folder,
}

impl NodeType {
    /// Return the type as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Folder => "folder",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for NodeType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "file" => Ok(Self::File),
            "folder" => Ok(Self::Folder),
            other => Err(AppError::malformed(format!("Unknown node type '{other}'"))),
        }
    }
}
