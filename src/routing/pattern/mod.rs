//! Parsed route templates.
//!
//! A [`RoutePattern`] is the immutable, structured form of a route template
//! such as `/api/{controller}/{id:int?}`. It is created once when an
//! endpoint is registered and owned by that endpoint afterwards. Parsing
//! lives in [`parser`]; the specificity scores used to order endpoints live
//! in [`precedence`].

pub mod parser;
pub mod precedence;

use std::fmt;
use std::sync::Arc;

use crate::error::PatternError;
use crate::routing::constraints::ParameterPolicy;
use crate::routing::values::RouteValueDictionary;

pub use precedence::Precedence;

#[derive(Debug, Clone)]
pub struct RoutePattern {
    raw_text: String,
    path_segments: Vec<PathSegment>,
    parameters: Vec<ParameterPart>,
    defaults: RouteValueDictionary,
    parameter_policies: Vec<(String, Vec<PolicyReference>)>,
    inbound_precedence: Precedence,
    outbound_precedence: Precedence,
}

impl RoutePattern {
    /// Parse a template with no out-of-line defaults or policies.
    pub fn parse(template: &str) -> Result<Self, PatternError> {
        parser::parse(template, &RouteValueDictionary::new(), Vec::new())
    }

    /// Parse a template and merge out-of-line defaults and parameter
    /// policies into it.
    ///
    /// Out-of-line defaults are copied onto the matching parameter; a
    /// parameter that already carries a different inline default, or one
    /// that is optional, is rejected. Out-of-line policies are appended to
    /// the parameter's inline policies. Entries whose key names no
    /// parameter are kept on the pattern and still take part in matching.
    pub fn parse_with(
        template: &str,
        defaults: &RouteValueDictionary,
        policies: impl IntoIterator<Item = (String, Vec<PolicyReference>)>,
    ) -> Result<Self, PatternError> {
        parser::parse(template, defaults, policies.into_iter().collect())
    }

    pub(crate) fn from_parts(
        raw_text: String,
        path_segments: Vec<PathSegment>,
        defaults: RouteValueDictionary,
        parameter_policies: Vec<(String, Vec<PolicyReference>)>,
    ) -> Self {
        let parameters = path_segments
            .iter()
            .flat_map(|s| s.parts.iter())
            .filter_map(PathSegmentPart::as_parameter)
            .cloned()
            .collect();
        let inbound_precedence = Precedence::inbound(&path_segments);
        let outbound_precedence = Precedence::outbound(&path_segments);
        Self {
            raw_text,
            path_segments,
            parameters,
            defaults,
            parameter_policies,
            inbound_precedence,
            outbound_precedence,
        }
    }

    #[must_use]
    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    #[must_use]
    pub fn path_segments(&self) -> &[PathSegment] {
        &self.path_segments
    }

    #[must_use]
    pub fn parameters(&self) -> &[ParameterPart] {
        &self.parameters
    }

    #[must_use]
    pub fn parameter(&self, name: &str) -> Option<&ParameterPart> {
        self.parameters
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    #[must_use]
    pub const fn defaults(&self) -> &RouteValueDictionary {
        &self.defaults
    }

    /// Every policy attached to the pattern, keyed by parameter (or default)
    /// name, inline references first.
    #[must_use]
    pub fn parameter_policies(&self) -> &[(String, Vec<PolicyReference>)] {
        &self.parameter_policies
    }

    #[must_use]
    pub const fn inbound_precedence(&self) -> &Precedence {
        &self.inbound_precedence
    }

    #[must_use]
    pub const fn outbound_precedence(&self) -> &Precedence {
        &self.outbound_precedence
    }

    /// `true` when the last segment is a lone catch-all parameter.
    #[must_use]
    pub fn ends_with_catch_all(&self) -> bool {
        self.path_segments
            .last()
            .is_some_and(PathSegment::is_catch_all)
    }
}

impl PartialEq for RoutePattern {
    fn eq(&self, other: &Self) -> bool {
        self.path_segments == other.path_segments
            && self.defaults == other.defaults
            && self.parameter_policies == other.parameter_policies
    }
}

/// Renders the canonical template text: no leading slash, escaped braces,
/// inline defaults and content policies.
impl fmt::Display for RoutePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.path_segments.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PathSegment {
    pub parts: Vec<PathSegmentPart>,
}

impl PathSegment {
    #[must_use]
    pub fn is_simple(&self) -> bool {
        self.parts.len() == 1
    }

    /// The literal text of a simple literal segment.
    #[must_use]
    pub fn as_literal(&self) -> Option<&str> {
        match self.parts.as_slice() {
            [PathSegmentPart::Literal(text)] => Some(text),
            _ => None,
        }
    }

    /// The parameter of a simple parameter segment.
    #[must_use]
    pub fn as_parameter(&self) -> Option<&ParameterPart> {
        match self.parts.as_slice() {
            [PathSegmentPart::Parameter(p)] => Some(p),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_catch_all(&self) -> bool {
        self.as_parameter().is_some_and(ParameterPart::is_catch_all)
    }

    /// A segment is required unless it is a lone optional, defaulted or
    /// catch-all parameter.
    #[must_use]
    pub fn is_required(&self, defaults: &RouteValueDictionary) -> bool {
        match self.as_parameter() {
            Some(p) => {
                !(p.is_optional()
                    || p.is_catch_all()
                    || p.default.is_some()
                    || defaults.contains_key(&p.name))
            }
            None => true,
        }
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for part in &self.parts {
            write!(f, "{part}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PathSegmentPart {
    Literal(String),
    Parameter(ParameterPart),
    /// A literal (always `.`) that is dropped when the optional parameter
    /// following it is absent, as in `{name}.{ext?}`.
    Separator(String),
}

impl PathSegmentPart {
    #[must_use]
    pub const fn as_parameter(&self) -> Option<&ParameterPart> {
        match self {
            Self::Parameter(p) => Some(p),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_parameter(&self) -> bool {
        matches!(self, Self::Parameter(_))
    }
}

impl fmt::Display for PathSegmentPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(text) | Self::Separator(text) => f.write_str(&escape_braces(text)),
            Self::Parameter(p) => write!(f, "{p}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterKind {
    Standard,
    Optional,
    CatchAll,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParameterPart {
    pub name: String,
    pub default: Option<String>,
    pub kind: ParameterKind,
    /// `false` for `{**name}`: the captured remainder keeps its slashes
    /// unencoded when the value is written back into a URL.
    pub encode_slashes: bool,
    pub policies: Vec<PolicyReference>,
}

impl ParameterPart {
    #[must_use]
    pub fn is_optional(&self) -> bool {
        self.kind == ParameterKind::Optional
    }

    #[must_use]
    pub fn is_catch_all(&self) -> bool {
        self.kind == ParameterKind::CatchAll
    }
}

impl fmt::Display for ParameterPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        if self.is_catch_all() {
            f.write_str(if self.encode_slashes { "*" } else { "**" })?;
        }
        f.write_str(&self.name)?;
        for policy in &self.policies {
            if let PolicyReference::Content(content) = policy {
                write!(f, ":{}", escape_braces(content))?;
            }
        }
        if let Some(ref default) = self.default {
            write!(f, "={}", escape_braces(default))?;
        }
        if self.is_optional() {
            f.write_str("?")?;
        }
        f.write_str("}")
    }
}

/// A reference to a parameter policy: either inline text resolved later by
/// the [`ParameterPolicyFactory`](crate::routing::constraints::ParameterPolicyFactory),
/// or an already constructed instance.
#[derive(Clone)]
pub enum PolicyReference {
    Content(String),
    Instance(Arc<dyn ParameterPolicy>),
}

impl PolicyReference {
    #[must_use]
    pub fn content(text: impl Into<String>) -> Self {
        Self::Content(text.into())
    }

    /// A regular-expression constraint, the meaning plain strings have when
    /// given as out-of-line constraints.
    #[must_use]
    pub fn regex(pattern: &str) -> Self {
        Self::Content(format!("regex({pattern})"))
    }

    #[must_use]
    pub fn instance(policy: impl ParameterPolicy + 'static) -> Self {
        Self::Instance(Arc::new(policy))
    }
}

impl fmt::Debug for PolicyReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Content(content) => f.debug_tuple("Content").field(content).finish(),
            Self::Instance(policy) => f.debug_tuple("Instance").field(policy).finish(),
        }
    }
}

impl PartialEq for PolicyReference {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Content(a), Self::Content(b)) => a == b,
            (Self::Instance(a), Self::Instance(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

fn escape_braces(text: &str) -> String {
    text.replace('{', "{{").replace('}', "}}")
}
