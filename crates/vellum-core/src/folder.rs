//! Resolved artifact folders

use serde::{Deserialize, Serialize};

/// Name of the editable table every results folder is expected to hold
pub const DEFAULT_EDITABLE_NAME: &str = "part4_nightsummary_sleep_cleaned.csv";

/// Names of the two read-only reports every results folder is expected to hold
pub const DEFAULT_DOCUMENT_NAMES: [&str; 2] = ["visualisation_sleep.pdf", "visualisation_data.pdf"];

/// The fixed triple of well-known artifact base names
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtifactNames {
    /// The editable table
    pub editable: String,
    /// The two read-only documents
    pub documents: [String; 2],
}

impl Default for ArtifactNames {
    fn default() -> Self {
        Self {
            editable: DEFAULT_EDITABLE_NAME.to_string(),
            documents: DEFAULT_DOCUMENT_NAMES.map(String::from),
        }
    }
}

impl ArtifactNames {
    /// Create a names triple
    pub fn new(editable: impl Into<String>, documents: [String; 2]) -> Self {
        Self {
            editable: editable.into(),
            documents,
        }
    }

    /// All three names, editable first
    pub fn all(&self) -> [&str; 3] {
        [&self.editable, &self.documents[0], &self.documents[1]]
    }
}

/// Physical location of one participant's results, with the names expected in it
///
/// Derived deterministically from `(category, participant_id)`; never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtifactFolder {
    category: String,
    participant_id: String,
    path: String,
    names: ArtifactNames,
}

impl ArtifactFolder {
    /// Build the canonical folder for an already validated pair
    ///
    /// Layout: `category/participant/output_participant/results/`.
    pub fn new(category: &str, participant_id: &str, names: ArtifactNames) -> Self {
        let path = format!("{category}/{participant_id}/output_{participant_id}/results/");
        Self {
            category: category.to_string(),
            participant_id: participant_id.to_string(),
            path,
            names,
        }
    }

    /// The folder path, always ending in `/`
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn participant_id(&self) -> &str {
        &self.participant_id
    }

    pub fn names(&self) -> &ArtifactNames {
        &self.names
    }

    /// Base name of the editable table
    pub fn editable_name(&self) -> &str {
        &self.names.editable
    }

    /// Base names of the two read-only documents
    pub fn document_names(&self) -> [&str; 2] {
        [&self.names.documents[0], &self.names.documents[1]]
    }
}
