//! Dot/bracket path expressions over a parsed JSON document.
//!
//! Accepted forms: `$`, `$.a.b`, `$.items[0].value`, `$.data["my-key"]`,
//! `$['a b']`. The leading `$` is optional.

use std::fmt;
use std::str::FromStr;

use serde_json::Value;

use crate::error::{PipelineError, Result};
use crate::format::{ValueType, value_type};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Field(String),
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Field(name) => write!(f, "{name}"),
            PathSegment::Index(i) => write!(f, "[{i}]"),
        }
    }
}

/// A parsed path expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonPath {
    raw: String,
    segments: Vec<PathSegment>,
}

impl JsonPath {
    pub fn parse(path: &str) -> Result<Self> {
        let raw = path.trim();
        let segments = parse_segments(raw).map_err(|reason| PipelineError::InvalidPath {
            path: raw.to_string(),
            reason,
        })?;
        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    pub fn root() -> Self {
        Self {
            raw: "$".into(),
            segments: Vec::new(),
        }
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// The expression as written by the caller.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Descends `document` left to right.
    ///
    /// # Errors
    ///
    /// [`PipelineError::PathNotFound`] when a field is missing, an index is out
    /// of range, or a segment indexes into a scalar or null.
    pub fn resolve<'a>(&self, document: &'a Value) -> Result<&'a Value> {
        let mut current = document;
        for segment in &self.segments {
            current = step(current, segment).ok_or_else(|| PipelineError::PathNotFound {
                path: self.raw.clone(),
                segment: segment.to_string(),
            })?;
        }
        Ok(current)
    }
}

impl FromStr for JsonPath {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for JsonPath {
    /// Canonical form, which may differ from the caller's spelling.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&generate_path(&self.segments))
    }
}

fn step<'a>(node: &'a Value, segment: &PathSegment) -> Option<&'a Value> {
    match (node, segment) {
        (Value::Object(map), PathSegment::Field(name)) => map.get(name),
        (Value::Object(map), PathSegment::Index(i)) => map.get(&i.to_string()),
        (Value::Array(items), PathSegment::Index(i)) => items.get(*i),
        (Value::Array(items), PathSegment::Field(name)) => {
            name.parse::<usize>().ok().and_then(|i| items.get(i))
        }
        _ => None,
    }
}

fn parse_segments(raw: &str) -> std::result::Result<Vec<PathSegment>, String> {
    let rest = raw.strip_prefix('$').unwrap_or(raw);
    let chars: Vec<char> = rest.chars().collect();
    let mut segments = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '.' => {
                i += 1;
                let name = read_identifier(&chars, &mut i);
                if name.is_empty() {
                    return Err(format!("empty field name at offset {i}"));
                }
                segments.push(PathSegment::Field(name));
            }
            '[' => {
                i += 1;
                segments.push(read_bracket(&chars, &mut i)?);
            }
            _ if i == 0 => {
                // bare leading field, e.g. `price` or `$price`
                let name = read_identifier(&chars, &mut i);
                if name.is_empty() {
                    return Err(format!("unexpected '{}' at offset 0", chars[0]));
                }
                segments.push(PathSegment::Field(name));
            }
            c => return Err(format!("unexpected '{c}' at offset {i}")),
        }
    }

    Ok(segments)
}

fn read_identifier(chars: &[char], i: &mut usize) -> String {
    let start = *i;
    while *i < chars.len() && !matches!(chars[*i], '.' | '[' | ']') {
        *i += 1;
    }
    chars[start..*i].iter().collect()
}

fn read_bracket(chars: &[char], i: &mut usize) -> std::result::Result<PathSegment, String> {
    let quote = match chars.get(*i) {
        Some(&q @ ('"' | '\'')) => q,
        Some(_) => {
            let start = *i;
            while *i < chars.len() && chars[*i] != ']' {
                *i += 1;
            }
            if *i >= chars.len() {
                return Err("unclosed '['".into());
            }
            let inner: String = chars[start..*i].iter().collect();
            *i += 1;
            let inner = inner.trim();
            return match inner {
                "" => Err("empty brackets".into()),
                "*" => Err("wildcards do not resolve to a single value".into()),
                _ => Ok(inner
                    .parse::<usize>()
                    .map(PathSegment::Index)
                    .unwrap_or_else(|_| PathSegment::Field(inner.to_string()))),
            };
        }
        None => return Err("unclosed '['".into()),
    };

    *i += 1;
    let mut name = String::new();
    loop {
        match chars.get(*i) {
            None => return Err(format!("unterminated {quote}quoted{quote} key")),
            Some(&'\\') if chars.get(*i + 1).is_some() => {
                name.push(chars[*i + 1]);
                *i += 2;
            }
            Some(&c) if c == quote => {
                *i += 1;
                break;
            }
            Some(&c) => {
                name.push(c);
                *i += 1;
            }
        }
    }

    if chars.get(*i) != Some(&']') {
        return Err("expected ']' after quoted key".into());
    }
    *i += 1;
    Ok(PathSegment::Field(name))
}

/// Builds a path expression from a sequence of keys.
///
/// Identifier-like keys render as `.key`, indexes as `[i]`, anything else as
/// `["key"]`. An empty sequence is `$`.
pub fn generate_path(segments: &[PathSegment]) -> String {
    let mut path = String::from("$");
    for segment in segments {
        match segment {
            PathSegment::Index(i) => path.push_str(&format!("[{i}]")),
            PathSegment::Field(name) if is_identifier(name) => {
                path.push('.');
                path.push_str(name);
            }
            PathSegment::Field(name) => {
                let escaped = name.replace('\\', "\\\\").replace('"', "\\\"");
                path.push_str(&format!("[\"{escaped}\"]"));
            }
        }
    }
    path
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

/// One node of a document, as offered to someone picking an extraction path.
#[derive(Debug, Clone, PartialEq)]
pub struct PathEntry {
    pub path: String,
    pub value_type: ValueType,
    pub preview: String,
}

/// Lists every leaf (scalar, null, or empty container) of `document`, each
/// with the path that resolves to it. Object keys are visited in map order.
pub fn list_paths(document: &Value) -> Vec<PathEntry> {
    let mut entries = Vec::new();
    let mut trail = Vec::new();
    walk(document, &mut trail, &mut entries);
    entries
}

fn walk(node: &Value, trail: &mut Vec<PathSegment>, out: &mut Vec<PathEntry>) {
    match node {
        Value::Object(map) if !map.is_empty() => {
            for (key, child) in map {
                trail.push(PathSegment::Field(key.clone()));
                walk(child, trail, out);
                trail.pop();
            }
        }
        Value::Array(items) if !items.is_empty() => {
            for (i, child) in items.iter().enumerate() {
                trail.push(PathSegment::Index(i));
                walk(child, trail, out);
                trail.pop();
            }
        }
        leaf => out.push(PathEntry {
            path: generate_path(trail),
            value_type: value_type(leaf),
            preview: crate::format::format_value(leaf),
        }),
    }
}
