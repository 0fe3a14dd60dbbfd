use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An entry of the CPE dictionary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cpe {
    pub uuid: Uuid,

    #[serde(default)]
    pub cpe22: Option<String>,

    #[serde(default)]
    pub cpe23: Option<String>,

    #[serde(default)]
    pub vendor: Option<String>,

    #[serde(default)]
    pub product: Option<String>,

    #[serde(default)]
    pub version: Option<String>,
}

impl Cpe {
    pub fn new(cpe23: impl Into<String>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            cpe22: None,
            cpe23: Some(cpe23.into()),
            vendor: None,
            product: None,
            version: None,
        }
    }
}

/// A software identifier known to be affected by one or more vulnerabilities
///
/// Vendor, product and version normally mirror the corresponding CPE 2.3
/// components; the fuzzy matcher queries both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VulnerableSoftware {
    pub uuid: Uuid,

    #[serde(default)]
    pub cpe22: Option<String>,

    #[serde(default)]
    pub cpe23: Option<String>,

    #[serde(default)]
    pub vendor: Option<String>,

    #[serde(default)]
    pub product: Option<String>,

    #[serde(default)]
    pub version: Option<String>,
}

impl VulnerableSoftware {
    /// Create a record from a CPE 2.3 formatted string, filling vendor,
    /// product and version from its components when it parses.
    pub fn from_cpe23(cpe23: impl Into<String>) -> Self {
        let cpe23 = cpe23.into();
        let parsed = crate::cpe::CpeName::parse(&cpe23).ok();
        let component = |value: Option<&str>| {
            value
                .filter(|v| !crate::cpe::is_wildcard(v))
                .map(|v| v.to_string())
        };

        Self {
            uuid: Uuid::new_v4(),
            cpe22: parsed.as_ref().map(|c| c.to_cpe22_uri()),
            vendor: component(parsed.as_ref().map(|c| c.vendor.as_str())),
            product: component(parsed.as_ref().map(|c| c.product.as_str())),
            version: component(parsed.as_ref().map(|c| c.version.as_str())),
            cpe23: Some(cpe23),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cpe23_fills_components() {
        let vs = VulnerableSoftware::from_cpe23("cpe:2.3:a:libexpat_project:libexpat:2.4.1:*:*:*:*:*:*:*");
        assert_eq!(vs.vendor.as_deref(), Some("libexpat_project"));
        assert_eq!(vs.product.as_deref(), Some("libexpat"));
        assert_eq!(vs.version.as_deref(), Some("2.4.1"));
        assert_eq!(vs.cpe22.as_deref(), Some("cpe:/a:libexpat_project:libexpat:2.4.1"));
    }

    #[test]
    fn test_from_cpe23_wildcard_version() {
        let vs = VulnerableSoftware::from_cpe23("cpe:2.3:a:gnu:mc:*:*:*:*:*:*:*:*");
        assert_eq!(vs.version, None);
    }
}
