use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A project owning a set of components and services
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    /// Unique identifier
    pub uuid: Uuid,

    /// Project name
    pub name: String,

    /// Project version
    #[serde(default)]
    pub version: Option<String>,

    /// Free-form description
    #[serde(default)]
    pub description: Option<String>,
}

impl Project {
    /// Create a new project with a random UUID
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            name: name.into(),
            version: None,
            description: None,
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}
