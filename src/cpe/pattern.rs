//! Compile CPE names into regular expressions over the raw `cpe22`/`cpe23` fields.

use super::{
    is_wildcard, split_unescaped, strip_prefix_ignore_case, CpeError, CPE22_COMPONENTS,
    CPE22_PREFIX, CPE23_COMPONENTS, CPE23_PREFIX,
};
use crate::search::SearchError;
use regex::Regex;
use std::fmt;

const ESCAPED_SEPARATOR: &str = r"\:";
const MATCH_ANY: &str = ".*";

/// Index field a pattern is matched against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpeField {
    Cpe22,
    Cpe23,
}

impl CpeField {
    pub fn as_str(&self) -> &'static str {
        match self {
            CpeField::Cpe22 => "cpe22",
            CpeField::Cpe23 => "cpe23",
        }
    }
}

impl fmt::Display for CpeField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A compiled CPE pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CpePattern {
    raw: String,
    field: CpeField,
    body: String,
    selective: bool,
}

impl CpePattern {
    /// The CPE string this pattern was compiled from
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn field(&self) -> CpeField {
        self.field
    }

    /// Regex body, without field qualifier or delimiters
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Field-qualified expression, e.g. `cpe23:/cpe\:2\.3\:a\:.*/`
    pub fn expression(&self) -> String {
        format!("{}:/{}/", self.field, self.body)
    }

    /// False when every component after `part` is a wildcard
    pub fn is_selective(&self) -> bool {
        self.selective
    }

    /// Reject patterns that would match every entry of the given part
    pub fn require_selective(self) -> Result<Self, SearchError> {
        if self.selective {
            Ok(self)
        } else {
            Err(SearchError::InvalidQuery(format!(
                "CPE pattern '{}' matches every {} entry and is too broad",
                self.raw, self.field
            )))
        }
    }

    /// Anchored regex for matching CPE strings outside the index
    pub fn to_regex(&self) -> Result<Regex, CpeError> {
        Regex::new(&format!("^(?:{})$", self.body)).map_err(|e| CpeError::Regex(e.to_string()))
    }

    pub fn matches(&self, cpe: &str) -> Result<bool, CpeError> {
        Ok(self.to_regex()?.is_match(&cpe.to_lowercase()))
    }
}

impl fmt::Display for CpePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.expression())
    }
}

/// Translates CPE 2.2 URIs and CPE 2.3 formatted strings into regex patterns
#[derive(Debug, Default, Clone, Copy)]
pub struct CpePatternCompiler;

impl CpePatternCompiler {
    pub fn compile(cpe: &str) -> Result<CpePattern, CpeError> {
        let trimmed = cpe.trim();
        if let Some(rest) = strip_prefix_ignore_case(trimmed, CPE23_PREFIX) {
            Self::compile_formatted(cpe, rest)
        } else if let Some(rest) = strip_prefix_ignore_case(trimmed, CPE22_PREFIX) {
            Self::compile_uri(cpe, rest)
        } else {
            Err(CpeError::InvalidPrefix(cpe.to_string()))
        }
    }

    /// Pattern matching every CPE 2.3 name of the given part (`a`, `o`, `h`)
    pub fn part_only(part: &str) -> Result<CpePattern, CpeError> {
        Self::compile(&format!("{}{}", CPE23_PREFIX, part))
    }

    fn compile_formatted(raw: &str, rest: &str) -> Result<CpePattern, CpeError> {
        let mut tokens = split_unescaped(rest);
        if tokens.len() > CPE23_COMPONENTS {
            return Err(CpeError::TooManyComponents {
                raw: raw.to_string(),
                count: tokens.len(),
                max: CPE23_COMPONENTS,
            });
        }
        tokens.resize(CPE23_COMPONENTS, "*");

        let selective = tokens.iter().skip(1).any(|t| !is_wildcard(t));
        let body = format!(
            "{}{}",
            escape_literal(CPE23_PREFIX),
            tokens
                .iter()
                .map(|t| formatted_token(t))
                .collect::<Vec<_>>()
                .join(ESCAPED_SEPARATOR)
        );

        Ok(CpePattern {
            raw: raw.to_string(),
            field: CpeField::Cpe23,
            body,
            selective,
        })
    }

    fn compile_uri(raw: &str, rest: &str) -> Result<CpePattern, CpeError> {
        let tokens: Vec<&str> = rest.split(':').collect();
        if tokens.len() > CPE22_COMPONENTS {
            return Err(CpeError::TooManyComponents {
                raw: raw.to_string(),
                count: tokens.len(),
                max: CPE22_COMPONENTS,
            });
        }

        // everything after the last concrete component is optional
        let concrete = tokens
            .iter()
            .rposition(|t| !is_wildcard(t))
            .map(|idx| idx + 1)
            .unwrap_or(0)
            .max(1);
        let selective = concrete > 1;

        let mut body = escape_literal(CPE22_PREFIX);
        body.push_str(
            &tokens[..concrete.min(tokens.len())]
                .iter()
                .map(|t| uri_token(t))
                .collect::<Vec<_>>()
                .join(ESCAPED_SEPARATOR),
        );
        if concrete < CPE22_COMPONENTS {
            body.push_str(r"(\:.*)?");
        }

        Ok(CpePattern {
            raw: raw.to_string(),
            field: CpeField::Cpe22,
            body,
            selective,
        })
    }
}

fn formatted_token(token: &str) -> String {
    if is_wildcard(token) {
        return MATCH_ANY.to_string();
    }

    let chars: Vec<char> = token.chars().collect();
    let last = chars.len() - 1;
    let mut out = String::new();
    let mut idx = 0;
    while idx < chars.len() {
        let c = chars[idx];
        match c {
            '\\' if idx < last => {
                out.push_str(r"\\");
                out.push_str(&escape_char(chars[idx + 1]));
                idx += 2;
                continue;
            }
            '*' if idx == 0 || idx == last => out.push_str(MATCH_ANY),
            '?' => out.push('.'),
            _ => out.push_str(&escape_char(c)),
        }
        idx += 1;
    }
    out
}

fn uri_token(token: &str) -> String {
    if is_wildcard(token) {
        MATCH_ANY.to_string()
    } else {
        escape_literal(token)
    }
}

fn escape_literal(text: &str) -> String {
    text.chars().map(escape_char).collect()
}

fn escape_char(c: char) -> String {
    let lower: String = c.to_lowercase().collect();
    match c {
        ':' | '/' => format!("\\{}", c),
        _ => regex::escape(&lower),
    }
}
