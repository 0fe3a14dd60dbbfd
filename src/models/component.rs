use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A software component as materialized from a BOM
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    /// Unique identifier
    pub uuid: Uuid,

    /// Component name
    pub name: String,

    /// Group / namespace (e.g. Maven groupId)
    #[serde(default)]
    pub group: Option<String>,

    /// Version string
    #[serde(default)]
    pub version: Option<String>,

    /// SHA-1 hash of the artifact
    #[serde(default)]
    pub sha1: Option<String>,

    /// Free-form description
    #[serde(default)]
    pub description: Option<String>,

    /// CPE 2.2 URI or CPE 2.3 formatted string
    #[serde(default)]
    pub cpe: Option<String>,

    /// Package URL (`pkg:type/namespace/name@version`)
    #[serde(default)]
    pub purl: Option<String>,
}

impl Component {
    /// Create a new component with a random UUID
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            name: name.into(),
            group: None,
            version: None,
            sha1: None,
            description: None,
            cpe: None,
            purl: None,
        }
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_sha1(mut self, sha1: impl Into<String>) -> Self {
        self.sha1 = Some(sha1.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_cpe(mut self, cpe: impl Into<String>) -> Self {
        self.cpe = Some(cpe.into());
        self
    }

    pub fn with_purl(mut self, purl: impl Into<String>) -> Self {
        self.purl = Some(purl.into());
        self
    }
}

/// An external or internal service a project depends on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceComponent {
    pub uuid: Uuid,

    pub name: String,

    #[serde(default)]
    pub group: Option<String>,

    #[serde(default)]
    pub version: Option<String>,

    /// Endpoint URL
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default)]
    pub description: Option<String>,
}

impl ServiceComponent {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            name: name.into(),
            group: None,
            version: None,
            url: None,
            description: None,
        }
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}
