//! Package URL parsing (`pkg:type/namespace/name@version?qualifiers#subpath`).

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PurlError {
    #[error("package URL must start with 'pkg:': {0}")]
    MissingScheme(String),

    #[error("package URL has no type: {0}")]
    MissingType(String),

    #[error("package URL has no name: {0}")]
    MissingName(String),

    #[error("invalid percent-encoding in package URL: {0}")]
    InvalidEncoding(String),
}

/// A parsed package URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageUrl {
    /// Package type, lowercased (e.g. `maven`, `npm`, `golang`)
    pub package_type: String,
    /// Namespace segments joined with `/`
    pub namespace: Option<String>,
    pub name: String,
    pub version: Option<String>,
    pub qualifiers: BTreeMap<String, String>,
    pub subpath: Option<String>,
}

impl PackageUrl {
    pub fn parse(input: &str) -> Result<Self, PurlError> {
        let trimmed = input.trim();
        let rest = match trimmed.get(..4) {
            Some(scheme) if scheme.eq_ignore_ascii_case("pkg:") => &trimmed[4..],
            _ => return Err(PurlError::MissingScheme(input.to_string())),
        };
        let rest = rest.trim_start_matches('/');

        let (rest, subpath) = match rest.rsplit_once('#') {
            Some((head, sub)) => {
                let sub = sub.trim_matches('/');
                let sub = if sub.is_empty() {
                    None
                } else {
                    Some(decode(sub)?)
                };
                (head, sub)
            }
            None => (rest, None),
        };

        let (rest, qualifiers) = match rest.rsplit_once('?') {
            Some((head, query)) => (head, parse_qualifiers(query)?),
            None => (rest, BTreeMap::new()),
        };

        let (package_type, rest) = rest
            .split_once('/')
            .ok_or_else(|| PurlError::MissingType(input.to_string()))?;
        if package_type.is_empty() {
            return Err(PurlError::MissingType(input.to_string()));
        }
        let package_type = package_type.to_ascii_lowercase();
        let rest = rest.trim_matches('/');

        let (rest, version) = match rest.rsplit_once('@') {
            Some((head, version)) if !version.is_empty() => (head, Some(decode(version)?)),
            Some((head, _)) => (head, None),
            None => (rest, None),
        };

        let mut segments: Vec<&str> = rest.split('/').filter(|s| !s.is_empty()).collect();
        let name = match segments.pop() {
            Some(name) => decode(name)?,
            None => return Err(PurlError::MissingName(input.to_string())),
        };

        let namespace = if segments.is_empty() {
            None
        } else {
            let decoded: Result<Vec<String>, PurlError> =
                segments.into_iter().map(decode).collect();
            Some(decoded?.join("/"))
        };

        Ok(Self {
            package_type,
            namespace,
            name,
            version,
            qualifiers,
            subpath,
        })
    }

    /// Last namespace segment, used as the vendor for Go modules
    pub fn last_namespace_segment(&self) -> Option<&str> {
        self.namespace
            .as_deref()
            .and_then(|ns| ns.rsplit('/').next())
            .filter(|s| !s.is_empty())
    }
}

impl FromStr for PackageUrl {
    type Err = PurlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for PackageUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pkg:{}/", self.package_type)?;
        if let Some(ns) = &self.namespace {
            write!(f, "{}/", ns)?;
        }
        write!(f, "{}", self.name)?;
        if let Some(version) = &self.version {
            write!(f, "@{}", version)?;
        }
        if !self.qualifiers.is_empty() {
            let pairs: Vec<String> = self
                .qualifiers
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            write!(f, "?{}", pairs.join("&"))?;
        }
        if let Some(subpath) = &self.subpath {
            write!(f, "#{}", subpath)?;
        }
        Ok(())
    }
}

fn parse_qualifiers(query: &str) -> Result<BTreeMap<String, String>, PurlError> {
    let mut qualifiers = BTreeMap::new();
    for pair in query.split('&').filter(|p| !p.is_empty()) {
        if let Some((key, value)) = pair.split_once('=') {
            if !value.is_empty() {
                qualifiers.insert(key.to_ascii_lowercase(), decode(value)?);
            }
        }
    }
    Ok(qualifiers)
}

fn decode(segment: &str) -> Result<String, PurlError> {
    let bytes = segment.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = segment
                .get(i + 1..i + 3)
                .and_then(|h| u8::from_str_radix(h, 16).ok())
                .ok_or_else(|| PurlError::InvalidEncoding(segment.to_string()))?;
            out.push(hex);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).map_err(|_| PurlError::InvalidEncoding(segment.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_maven() {
        let purl = PackageUrl::parse("pkg:maven/org.apache.xmlgraphics/batik-anim@1.9.1?packaging=sources")
            .unwrap();
        assert_eq!(purl.package_type, "maven");
        assert_eq!(purl.namespace.as_deref(), Some("org.apache.xmlgraphics"));
        assert_eq!(purl.name, "batik-anim");
        assert_eq!(purl.version.as_deref(), Some("1.9.1"));
        assert_eq!(purl.qualifiers.get("packaging").map(String::as_str), Some("sources"));
    }

    #[test]
    fn test_parse_golang_namespace() {
        let purl = PackageUrl::parse("pkg:golang/github.com/gorilla/mux@v1.8.0").unwrap();
        assert_eq!(purl.package_type, "golang");
        assert_eq!(purl.namespace.as_deref(), Some("github.com/gorilla"));
        assert_eq!(purl.last_namespace_segment(), Some("gorilla"));
        assert_eq!(purl.name, "mux");
    }

    #[test]
    fn test_parse_npm_scoped() {
        let purl = PackageUrl::parse("pkg:npm/%40angular/core@12.0.0#lib").unwrap();
        assert_eq!(purl.namespace.as_deref(), Some("@angular"));
        assert_eq!(purl.name, "core");
        assert_eq!(purl.subpath.as_deref(), Some("lib"));
    }

    #[test]
    fn test_parse_rejects_invalid() {
        assert!(matches!(
            PackageUrl::parse("maven/foo/bar"),
            Err(PurlError::MissingScheme(_))
        ));
        assert!(matches!(
            PackageUrl::parse("pkg:deb"),
            Err(PurlError::MissingType(_))
        ));
        assert!(matches!(
            PackageUrl::parse("pkg:npm/%zz@1"),
            Err(PurlError::InvalidEncoding(_))
        ));
    }
}
