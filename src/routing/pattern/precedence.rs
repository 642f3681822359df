//! Specificity scores for route patterns.
//!
//! Each path segment contributes one digit; the digits of a pattern are
//! compared lexicographically, which orders patterns exactly like the
//! decimal fraction `0.d1d2d3...` would (digits are never zero, so a
//! shorter prefix always sorts first).
//!
//! Inbound digits (lower is more specific):
//!
//! | segment                 | digit |
//! |-------------------------|-------|
//! | literal                 | 1     |
//! | complex (`{a}-{b}`)     | 2     |
//! | constrained parameter   | 3     |
//! | parameter               | 4     |
//! | optional parameter      | 5     |
//! | catch-all               | 6     |
//!
//! Outbound digits (higher is more specific): literal 5, complex 4,
//! constrained parameter 3, parameter 2, catch-all 1.

use std::fmt;

use super::{PathSegment, PathSegmentPart};

#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Precedence(Box<[u8]>);

impl Precedence {
    #[must_use]
    pub fn inbound(segments: &[PathSegment]) -> Self {
        Self(segments.iter().map(inbound_digit).collect())
    }

    #[must_use]
    pub fn outbound(segments: &[PathSegment]) -> Self {
        Self(segments.iter().map(outbound_digit).collect())
    }

    #[must_use]
    pub fn digits(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Precedence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Precedence({self})")
    }
}

impl fmt::Display for Precedence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("0.")?;
        for d in self.0.iter() {
            write!(f, "{d}")?;
        }
        Ok(())
    }
}

fn inbound_digit(segment: &PathSegment) -> u8 {
    match segment.parts.as_slice() {
        [PathSegmentPart::Literal(_)] => 1,
        [PathSegmentPart::Parameter(p)] => {
            if p.is_catch_all() {
                6
            } else if p.is_optional() {
                5
            } else if p.policies.is_empty() {
                4
            } else {
                3
            }
        }
        _ => 2,
    }
}

fn outbound_digit(segment: &PathSegment) -> u8 {
    match segment.parts.as_slice() {
        [PathSegmentPart::Literal(_)] => 5,
        [PathSegmentPart::Parameter(p)] => {
            if p.is_catch_all() {
                1
            } else if p.policies.is_empty() {
                2
            } else {
                3
            }
        }
        _ => 4,
    }
}
