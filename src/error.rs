//! Unified error types for Waypoint.
//!
//! The matching engine reports four families of failures:
//!
//! - [`PatternError`]: a route template is malformed (registration time).
//! - [`PolicyError`]: a parameter policy reference cannot be resolved
//!   (DFA build time).
//! - [`MatchError`]: a request could not be resolved to a single endpoint,
//!   most notably [`AmbiguousMatchError`] (request time).
//! - [`MatcherError`]: building or rebuilding a matcher failed.
//!
//! [`WaypointError`] wraps all of them for the CLI and server, together with
//! the config-loading failures, and [`ValidationError`] describes a single
//! config validation problem. A request that matches nothing is not an
//! error: the match context simply has no endpoint.

use std::fmt::Write as _;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub endpoint: String,
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "  endpoint {}: {} — {}",
            self.endpoint, self.field, self.message
        )?;
        if let Some(ref suggestion) = self.suggestion {
            write!(f, " ({suggestion})")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

fn format_errors(errors: &[ValidationError]) -> String {
    let mut buf = String::new();
    for (i, e) in errors.iter().enumerate() {
        if i > 0 {
            buf.push('\n');
        }
        // write! to String is infallible (only fails on OOM which is unrecoverable)
        let _ = write!(buf, "{e}");
    }
    buf
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid route template '{template}': {kind}")]
pub struct PatternError {
    pub template: String,
    pub kind: PatternErrorKind,
}

impl PatternError {
    #[must_use]
    pub fn new(template: &str, kind: PatternErrorKind) -> Self {
        Self {
            template: template.to_string(),
            kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum PatternErrorKind {
    #[error(
        "there is an incomplete parameter in the route template. Check that each '{{' \
         character has a matching '}}' character"
    )]
    IncompleteParameter,

    #[error("in a route parameter, '{{' and '}}' must be escaped with '{{{{' and '}}}}'")]
    UnescapedBrace,

    #[error(
        "the route parameter name '{0}' is invalid. Route parameter names must be non-empty \
         and cannot contain these characters: '{{', '}}', '/'. The '?' character marks a \
         parameter as optional, and can occur only at the end of the parameter. The '*' \
         character marks a parameter as catch-all, and can occur only at the start of the \
         parameter"
    )]
    InvalidParameterName(String),

    #[error("the route parameter name '{0}' appears more than one time in the route template")]
    RepeatedParameter(String),

    #[error("a catch-all parameter can only appear as the last segment of the route template")]
    CatchAllNotLast,

    #[error(
        "a path segment that contains more than one section, such as a literal section or a \
         parameter, cannot contain a catch-all parameter"
    )]
    CatchAllInComplexSegment,

    #[error("a catch-all parameter cannot be marked optional")]
    OptionalCatchAll,

    #[error("an optional parameter cannot have a default value (parameter '{0}')")]
    OptionalWithDefault(String),

    #[error(
        "a path segment cannot contain two consecutive parameters. They must be separated by \
         a '/' or by a literal string"
    )]
    ConsecutiveParameters,

    #[error(
        "the route template separator character '/' cannot appear consecutively. It must be \
         separated by either a parameter or a literal value"
    )]
    ConsecutiveSeparators,

    #[error(
        "the literal section '{0}' is invalid. Literal sections cannot contain the '?' character"
    )]
    InvalidLiteral(String),

    #[error("the route template cannot start with a '~' character unless followed by a '/'")]
    InvalidTilde,

    #[error(
        "the route parameter '{0}' has both an inline default value and an explicit default \
         value specified. A route parameter cannot contain an inline default value when a \
         default value is specified explicitly. Consider removing one of them"
    )]
    ConflictingDefault(String),

    #[error(
        "an optional parameter must be at the end of the segment. In the segment '{segment}', \
         optional parameter '{parameter}' is followed by '{following}'"
    )]
    OptionalNotLast {
        segment: String,
        parameter: String,
        following: String,
    },

    #[error(
        "in the segment '{segment}', the optional parameter '{parameter}' is preceded by an \
         invalid segment '{preceding}'. Only a period (.) can precede an optional parameter"
    )]
    OptionalNotAfterPeriod {
        segment: String,
        parameter: String,
        preceding: String,
    },

    #[error("the route parameter '{0}' has an empty constraint reference")]
    EmptyConstraint(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum PolicyError {
    #[error(
        "the constraint reference '{name}' on parameter '{parameter}' could not be resolved. \
         Register the constraint with the constraint map"
    )]
    UnknownName { name: String, parameter: String },

    #[error(
        "the constraint '{name}' on parameter '{parameter}' does not implement a match \
         capability and cannot be used as a route constraint"
    )]
    MissingCapability { name: String, parameter: String },

    #[error("invalid arguments for constraint '{name}': {reason}")]
    InvalidArguments { name: String, reason: String },
}

/// Raised when two or more equally specific, equally ordered endpoints are
/// valid for the same request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}", format_ambiguous(.endpoints))]
pub struct AmbiguousMatchError {
    /// One entry per tied endpoint, in candidate order.
    pub endpoints: Vec<String>,
}

impl AmbiguousMatchError {
    pub const PREFIX: &'static str = "The request matched multiple endpoints. Matches: ";

    #[must_use]
    pub fn message(&self) -> String {
        format_ambiguous(&self.endpoints)
    }
}

fn format_ambiguous(endpoints: &[String]) -> String {
    let mut buf = String::from(AmbiguousMatchError::PREFIX);
    buf.push('\n');
    for line in endpoints {
        buf.push('\n');
        buf.push_str(line);
    }
    buf
}

#[derive(Debug, Clone, thiserror::Error)]
#[non_exhaustive]
pub enum MatchError {
    #[error(transparent)]
    Ambiguous(#[from] AmbiguousMatchError),

    #[error("selector policy '{policy}' failed: {message}")]
    Policy {
        policy: &'static str,
        message: String,
    },
}

#[derive(Debug, Clone, thiserror::Error)]
#[non_exhaustive]
pub enum MatcherError {
    #[error("failed to build matcher for endpoint '{endpoint}': {source}")]
    Policy {
        endpoint: String,
        #[source]
        source: PolicyError,
    },

    #[error(transparent)]
    Pattern(#[from] PatternError),
}

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum WaypointError {
    #[error("No config source found.\n\n  {hint}")]
    NoConfigSource { hint: String },

    #[error("Config file not found: {}", path.display())]
    ConfigFileNotFound { path: PathBuf },

    #[error("Config parse error in {path}:\n  {source}")]
    ConfigParse {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Config validation failed:\n{}", format_errors(.errors))]
    ConfigValidation { errors: Vec<ValidationError> },

    #[error("Unsupported config format: '{0}'")]
    UnsupportedFormat(String),

    #[error("Invalid address: {0}")]
    AddressParse(#[from] std::net::AddrParseError),

    #[error("Invalid URI: {source}")]
    UriParse {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("HTTP request failed: {source}")]
    HttpRequest {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("File already exists: {}", path.display())]
    FileExists { path: PathBuf },

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("Health check failed with status {0}")]
    HealthCheckFailed(hyper::StatusCode),

    #[error("{0}")]
    Pattern(#[from] PatternError),

    #[error("{0}")]
    Matcher(#[from] MatcherError),

    #[error("{0}")]
    Match(#[from] MatchError),
}
