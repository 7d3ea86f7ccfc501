//! Rule parsing and path matching
//!
//! A rule is a `/`-separated list of static segments and placeholders:
//! `/add/<int:num1>/<int:num2>`. Placeholders without a converter use
//! `string`. Matching is exact on segment count, so a trailing slash the
//! rule does not have is a miss.

use std::collections::HashSet;
use std::fmt;

use super::converter::{Converter, ParamValue};
use super::{ParamError, PatternError};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Static(String),
    Param { name: String, converter: Converter },
}

/// Parsed route rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePattern {
    rule: String,
    segments: Vec<Segment>,
}

/// Converted path parameters, in rule order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams {
    values: Vec<(String, ParamValue)>,
}

impl RoutePattern {
    pub fn parse(rule: &str) -> Result<Self, PatternError> {
        let body = rule
            .strip_prefix('/')
            .ok_or(PatternError::MissingLeadingSlash)?;

        // "/" is the only rule with no segments
        if body.is_empty() {
            return Ok(Self {
                rule: rule.to_string(),
                segments: Vec::new(),
            });
        }

        let raw_segments: Vec<&str> = body.split('/').collect();
        let mut segments = Vec::with_capacity(raw_segments.len());
        let mut seen = HashSet::new();

        for (index, raw) in raw_segments.iter().enumerate() {
            let segment = parse_segment(raw)?;
            if let Segment::Param { name, converter } = &segment {
                if !seen.insert(name.clone()) {
                    return Err(PatternError::DuplicateParam(name.clone()));
                }
                if converter.is_greedy() && index + 1 != raw_segments.len() {
                    return Err(PatternError::GreedyNotLast(name.clone()));
                }
            }
            segments.push(segment);
        }

        Ok(Self {
            rule: rule.to_string(),
            segments,
        })
    }

    pub fn rule(&self) -> &str {
        &self.rule
    }

    /// Match a decoded request path, converting every placeholder
    pub fn matches(&self, path: &str) -> Option<PathParams> {
        let mut rest = path.strip_prefix('/')?;

        if self.segments.is_empty() {
            return rest.is_empty().then(PathParams::default);
        }

        let mut params = PathParams::default();
        let last = self.segments.len() - 1;

        for (index, segment) in self.segments.iter().enumerate() {
            let (piece, tail) = match segment {
                Segment::Param { converter, .. } if converter.is_greedy() => (rest, ""),
                _ => match (rest.split_once('/'), index == last) {
                    (Some(split), false) => split,
                    (None, true) => (rest, ""),
                    // Too many or too few segments for this rule
                    _ => return None,
                },
            };

            match segment {
                Segment::Static(text) => {
                    if piece != text {
                        return None;
                    }
                }
                Segment::Param { name, converter } => {
                    let value = converter.convert(piece)?;
                    params.values.push((name.clone(), value));
                }
            }

            rest = tail;
        }

        Some(params)
    }
}

impl fmt::Display for RoutePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.rule)
    }
}

fn parse_segment(raw: &str) -> Result<Segment, PatternError> {
    let Some(inner) = raw.strip_prefix('<').and_then(|s| s.strip_suffix('>')) else {
        if raw.contains('<') || raw.contains('>') {
            return Err(PatternError::MalformedPlaceholder(raw.to_string()));
        }
        return Ok(Segment::Static(raw.to_string()));
    };

    if inner.contains('<') || inner.contains('>') {
        return Err(PatternError::MalformedPlaceholder(raw.to_string()));
    }

    let (converter, name) = match inner.split_once(':') {
        Some((converter, name)) => (converter.parse::<Converter>()?, name),
        None => (Converter::String, inner),
    };

    if !is_identifier(name) {
        return Err(PatternError::InvalidParamName(name.to_string()));
    }

    Ok(Segment::Param {
        name: name.to_string(),
        converter,
    })
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

impl PathParams {
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    /// Read an `int` placeholder
    pub fn int(&self, name: &str) -> Result<i64, ParamError> {
        match self.get(name) {
            Some(ParamValue::Int(n)) => Ok(*n),
            Some(ParamValue::Str(_)) => Err(ParamError::WrongType {
                name: name.to_string(),
                expected: "an integer",
            }),
            None => Err(ParamError::Missing(name.to_string())),
        }
    }

    /// Read a `string` or `path` placeholder
    #[cfg(test)]
    pub fn str(&self, name: &str) -> Result<&str, ParamError> {
        match self.get(name) {
            Some(ParamValue::Str(s)) => Ok(s),
            Some(ParamValue::Int(_)) => Err(ParamError::WrongType {
                name: name.to_string(),
                expected: "a string",
            }),
            None => Err(ParamError::Missing(name.to_string())),
        }
    }
}
