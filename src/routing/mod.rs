//! Routing module
//!
//! Maps request paths onto registered rules:
//! - Rule parsing with typed placeholders (`<int:num1>`)
//! - Segment converters (`string`, `int`, `path`)
//! - Method-aware resolution (404 / 405 / automatic OPTIONS)

mod converter;
mod decode;
mod pattern;
mod table;

use thiserror::Error;

pub use decode::percent_decode;
pub use pattern::{PathParams, RoutePattern};
pub use table::{allow_header, Resolution, RouteTable};

/// Errors raised while parsing a rule string
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PatternError {
    #[error("rule must start with '/'")]
    MissingLeadingSlash,
    #[error("malformed placeholder in segment '{0}'")]
    MalformedPlaceholder(String),
    #[error("unknown converter '{0}'")]
    UnknownConverter(String),
    #[error("invalid parameter name '{0}'")]
    InvalidParamName(String),
    #[error("parameter '{0}' appears more than once")]
    DuplicateParam(String),
    #[error("parameter '{0}' consumes the rest of the path and must be the last segment")]
    GreedyNotLast(String),
}

/// Errors raised while registering routes
#[derive(Debug, Error)]
pub enum RoutingError {
    #[error("invalid rule '{rule}': {source}")]
    InvalidRule {
        rule: String,
        #[source]
        source: PatternError,
    },
    #[error("endpoint '{0}' is already registered")]
    DuplicateEndpoint(String),
}

/// Errors raised when a view reads its path parameters
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParamError {
    #[error("path parameter '{0}' is missing")]
    Missing(String),
    #[error("path parameter '{name}' is not {expected}")]
    WrongType { name: String, expected: &'static str },
}
