//! Common Platform Enumeration names.
//!
//! Supports the CPE 2.3 formatted string binding
//! (`cpe:2.3:part:vendor:product:version:update:edition:language:sw_edition:target_sw:target_hw:other`)
//! and the legacy CPE 2.2 URI binding (`cpe:/part:vendor:product:version:update:edition:language`).
//! Component values are held in the 2.3 quoted form, lowercased, with `*` for ANY.

mod pattern;

pub use pattern::{CpeField, CpePattern, CpePatternCompiler};

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub const CPE23_PREFIX: &str = "cpe:2.3:";
pub const CPE22_PREFIX: &str = "cpe:/";

/// Number of components following the `cpe:2.3:` prefix
pub const CPE23_COMPONENTS: usize = 11;

/// Number of components following the `cpe:/` prefix
pub const CPE22_COMPONENTS: usize = 7;

pub const ANY: &str = "*";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CpeError {
    #[error("not a CPE 2.2 URI or CPE 2.3 formatted string: {0}")]
    InvalidPrefix(String),

    #[error("CPE has {count} components, at most {max} allowed: {raw}")]
    TooManyComponents {
        raw: String,
        count: usize,
        max: usize,
    },

    #[error("invalid CPE part '{0}', expected one of a, o, h")]
    InvalidPart(String),

    #[error("CPE pattern does not compile: {0}")]
    Regex(String),
}

/// Binding a CPE name was parsed from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpeFormat {
    Uri22,
    Formatted23,
}

/// A parsed CPE name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CpeName {
    pub format: CpeFormat,
    pub part: String,
    pub vendor: String,
    pub product: String,
    pub version: String,
    pub update: String,
    pub edition: String,
    pub language: String,
    pub sw_edition: String,
    pub target_sw: String,
    pub target_hw: String,
    pub other: String,
}

/// True for the ANY value (`*`) or an empty component
pub fn is_wildcard(value: &str) -> bool {
    value.is_empty() || value == ANY
}

/// Turn free text into a CPE 2.3 component value.
///
/// Lowercases, replaces whitespace with `_` and backslash-quotes every
/// character that is not alphanumeric, `-`, `.` or `_`.
pub fn quote_component(text: &str) -> String {
    let mut quoted = String::with_capacity(text.len());
    for c in text.trim().chars().flat_map(char::to_lowercase) {
        if c.is_whitespace() {
            quoted.push('_');
        } else if c.is_alphanumeric() || matches!(c, '-' | '.' | '_') {
            quoted.push(c);
        } else {
            quoted.push('\\');
            quoted.push(c);
        }
    }
    quoted
}

/// Split a CPE 2.3 value list on `:` separators that are not backslash-quoted
pub(crate) fn split_unescaped(input: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut escaped = false;
    for (idx, c) in input.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            ':' => {
                parts.push(&input[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    parts.push(&input[start..]);
    parts
}

pub(crate) fn strip_prefix_ignore_case<'a>(input: &'a str, prefix: &str) -> Option<&'a str> {
    match input.get(..prefix.len()) {
        Some(head) if head.eq_ignore_ascii_case(prefix) => Some(&input[prefix.len()..]),
        _ => None,
    }
}

impl CpeName {
    /// Parse either binding, chosen by prefix
    pub fn parse(input: &str) -> Result<Self, CpeError> {
        let trimmed = input.trim();
        if let Some(rest) = strip_prefix_ignore_case(trimmed, CPE23_PREFIX) {
            Self::parse_formatted(input, rest)
        } else if let Some(rest) = strip_prefix_ignore_case(trimmed, CPE22_PREFIX) {
            Self::parse_uri(input, rest)
        } else {
            Err(CpeError::InvalidPrefix(input.to_string()))
        }
    }

    fn parse_formatted(raw: &str, rest: &str) -> Result<Self, CpeError> {
        let components = split_unescaped(rest);
        if components.len() > CPE23_COMPONENTS {
            return Err(CpeError::TooManyComponents {
                raw: raw.to_string(),
                count: components.len(),
                max: CPE23_COMPONENTS,
            });
        }

        let mut values: Vec<String> = components
            .iter()
            .map(|c| {
                if is_wildcard(c) {
                    ANY.to_string()
                } else {
                    c.to_lowercase()
                }
            })
            .collect();
        values.resize(CPE23_COMPONENTS, ANY.to_string());

        Self::from_values(CpeFormat::Formatted23, values)
    }

    fn parse_uri(raw: &str, rest: &str) -> Result<Self, CpeError> {
        let components: Vec<&str> = rest.split(':').collect();
        if components.len() > CPE22_COMPONENTS {
            return Err(CpeError::TooManyComponents {
                raw: raw.to_string(),
                count: components.len(),
                max: CPE22_COMPONENTS,
            });
        }

        let mut values: Vec<String> = components.iter().map(|c| uri_to_value(c)).collect();
        values.resize(CPE22_COMPONENTS, ANY.to_string());

        // edition may carry the packed form ~edition~sw_edition~target_sw~target_hw~other
        let mut extended = vec![ANY.to_string(); 4];
        if let Some(packed) = components.get(5).and_then(|e| e.strip_prefix('~')) {
            let fields: Vec<&str> = packed.split('~').collect();
            values[5] = fields.first().map(|v| uri_to_value(v)).unwrap_or_else(|| ANY.to_string());
            for (slot, value) in extended.iter_mut().zip(fields.iter().skip(1)) {
                *slot = uri_to_value(value);
            }
        }
        values.extend(extended);

        Self::from_values(CpeFormat::Uri22, values)
    }

    fn from_values(format: CpeFormat, values: Vec<String>) -> Result<Self, CpeError> {
        let mut iter = values.into_iter();
        let mut next = || iter.next().unwrap_or_else(|| ANY.to_string());

        let part = next();
        if !matches!(part.as_str(), "a" | "o" | "h" | ANY) {
            return Err(CpeError::InvalidPart(part));
        }

        Ok(Self {
            format,
            part,
            vendor: next(),
            product: next(),
            version: next(),
            update: next(),
            edition: next(),
            language: next(),
            sw_edition: next(),
            target_sw: next(),
            target_hw: next(),
            other: next(),
        })
    }

    fn components(&self) -> [&str; CPE23_COMPONENTS] {
        [
            &self.part,
            &self.vendor,
            &self.product,
            &self.version,
            &self.update,
            &self.edition,
            &self.language,
            &self.sw_edition,
            &self.target_sw,
            &self.target_hw,
            &self.other,
        ]
    }

    /// CPE 2.3 formatted string binding
    pub fn to_cpe23_fs(&self) -> String {
        format!("{}{}", CPE23_PREFIX, self.components().join(":"))
    }

    /// CPE 2.2 URI binding, trailing ANY components omitted
    pub fn to_cpe22_uri(&self) -> String {
        let c = self.components();
        let mut values: Vec<String> = c[..CPE22_COMPONENTS].iter().map(|v| value_to_uri(v)).collect();

        if c[7..].iter().any(|v| !is_wildcard(v)) {
            let packed: Vec<String> = std::iter::once(c[5])
                .chain(c[7..].iter().copied())
                .map(value_to_uri)
                .collect();
            values[5] = format!("~{}", packed.join("~"));
        }

        while values.last().is_some_and(|v| v.is_empty()) && values.len() > 1 {
            values.pop();
        }
        format!("{}{}", CPE22_PREFIX, values.join(":"))
    }
}

impl FromStr for CpeName {
    type Err = CpeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for CpeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_cpe23_fs())
    }
}

fn uri_to_value(component: &str) -> String {
    if is_wildcard(component) {
        return ANY.to_string();
    }
    if component == "-" {
        return component.to_string();
    }
    quote_component(&percent_decode(component))
}

fn value_to_uri(value: &str) -> String {
    if is_wildcard(value) {
        return String::new();
    }
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        let c = if c == '\\' {
            match chars.next() {
                Some(quoted) => quoted,
                None => break,
            }
        } else {
            c
        };
        if c.is_alphanumeric() || matches!(c, '-' | '.' | '_') {
            out.push(c);
        } else {
            let mut buf = [0u8; 4];
            for b in c.encode_utf8(&mut buf).bytes() {
                out.push_str(&format!("%{:02x}", b));
            }
        }
    }
    out
}

fn percent_decode(component: &str) -> String {
    let bytes = component.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let decoded = if bytes[i] == b'%' {
            component
                .get(i + 1..i + 3)
                .and_then(|h| u8::from_str_radix(h, 16).ok())
        } else {
            None
        };
        match decoded {
            Some(b) => {
                out.push(b);
                i += 3;
            }
            None => {
                out.push(bytes[i]);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}
