//! Path parameter converters
//!
//! A converter decides whether a URL segment fits a placeholder and turns it
//! into a typed value. A segment the converter rejects makes the whole rule
//! miss, which the dispatcher reports as 404.

use std::fmt;
use std::str::FromStr;

use super::PatternError;

/// Placeholder converter kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Converter {
    /// One non-empty segment without `/` (the default)
    String,
    /// Unsigned decimal integer that fits in `i64`
    Int,
    /// Remainder of the path, slashes included
    Path,
}

/// Typed value produced by a converter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Int(i64),
    Str(String),
}

impl Converter {
    /// Whether this converter swallows every remaining segment
    pub const fn is_greedy(self) -> bool {
        matches!(self, Self::Path)
    }

    /// Convert a raw (already percent-decoded) segment
    pub fn convert(self, raw: &str) -> Option<ParamValue> {
        match self {
            Self::String => {
                if raw.is_empty() || raw.contains('/') {
                    None
                } else {
                    Some(ParamValue::Str(raw.to_string()))
                }
            }
            Self::Int => {
                // Digits only: no sign, no whitespace. Leading zeros are fine.
                if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                raw.parse::<i64>().ok().map(ParamValue::Int)
            }
            Self::Path => {
                if raw.is_empty() {
                    None
                } else {
                    Some(ParamValue::Str(raw.to_string()))
                }
            }
        }
    }
}

impl FromStr for Converter {
    type Err = PatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "string" | "default" => Ok(Self::String),
            "int" => Ok(Self::Int),
            "path" => Ok(Self::Path),
            other => Err(PatternError::UnknownConverter(other.to_string())),
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{n}"),
            Self::Str(s) => f.write_str(s),
        }
    }
}
