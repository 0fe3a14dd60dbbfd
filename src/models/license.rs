use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A license, usually identified by its SPDX id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct License {
    pub uuid: Uuid,

    /// SPDX license identifier (e.g. `Apache-2.0`)
    #[serde(default)]
    pub license_id: Option<String>,

    /// Human-readable license name
    pub name: String,
}

impl License {
    pub fn new(license_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            license_id: Some(license_id.into()),
            name: name.into(),
        }
    }
}
