//! Built-in route constraints.
//!
//! Every constraint fails when the value is absent; wrap with
//! [`OptionalConstraint`](super::OptionalConstraint) to accept absence.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::{Regex, RegexBuilder};

use super::{RouteConstraint, RouteDirection};
use crate::constraint_policy;
use crate::routing::values::RouteValueDictionary;

/// Shared body of the constraints that only look at the value text.
macro_rules! value_constraint {
    ($ty:ty, |$self_:ident, $value:ident| $body:expr) => {
        impl RouteConstraint for $ty {
            fn matches(
                &self,
                parameter: &str,
                values: &RouteValueDictionary,
                _direction: RouteDirection,
            ) -> bool {
                let $self_ = self;
                values.get(parameter).is_some_and(|$value| $body)
            }
        }
        constraint_policy!($ty);
    };
}

#[derive(Debug, Clone, Copy, Default)]
pub struct IntConstraint;
value_constraint!(IntConstraint, |_s, v| v.parse::<i32>().is_ok());

#[derive(Debug, Clone, Copy, Default)]
pub struct LongConstraint;
value_constraint!(LongConstraint, |_s, v| v.parse::<i64>().is_ok());

#[derive(Debug, Clone, Copy, Default)]
pub struct BoolConstraint;
value_constraint!(BoolConstraint, |_s, v| v.eq_ignore_ascii_case("true")
    || v.eq_ignore_ascii_case("false"));

#[derive(Debug, Clone, Copy, Default)]
pub struct GuidConstraint;
value_constraint!(GuidConstraint, |_s, v| uuid::Uuid::parse_str(v).is_ok());

/// Plain decimal notation: optional sign, digits, at most one point.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecimalConstraint;
value_constraint!(DecimalConstraint, |_s, v| is_decimal(v));

#[derive(Debug, Clone, Copy, Default)]
pub struct DoubleConstraint;
value_constraint!(DoubleConstraint, |_s, v| v
    .parse::<f64>()
    .is_ok_and(f64::is_finite));

#[derive(Debug, Clone, Copy, Default)]
pub struct FloatConstraint;
value_constraint!(FloatConstraint, |_s, v| v
    .parse::<f32>()
    .is_ok_and(f32::is_finite));

/// Dates and date-times in RFC 3339 or the common invariant layouts.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateTimeConstraint;
value_constraint!(DateTimeConstraint, |_s, v| is_datetime(v));

/// ASCII letters only. An empty value matches.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlphaConstraint;
value_constraint!(AlphaConstraint, |_s, v| v
    .chars()
    .all(|c| c.is_ascii_alphabetic()));

#[derive(Debug, Clone, Copy)]
pub struct LengthConstraint {
    pub min: usize,
    pub max: usize,
}

impl LengthConstraint {
    #[must_use]
    pub const fn exact(length: usize) -> Self {
        Self {
            min: length,
            max: length,
        }
    }
}
value_constraint!(LengthConstraint, |s, v| {
    let len = v.chars().count();
    len >= s.min && len <= s.max
});

#[derive(Debug, Clone, Copy)]
pub struct MinLengthConstraint(pub usize);
value_constraint!(MinLengthConstraint, |s, v| v.chars().count() >= s.0);

#[derive(Debug, Clone, Copy)]
pub struct MaxLengthConstraint(pub usize);
value_constraint!(MaxLengthConstraint, |s, v| v.chars().count() <= s.0);

#[derive(Debug, Clone, Copy)]
pub struct MinConstraint(pub i64);
value_constraint!(MinConstraint, |s, v| v.parse::<i64>().is_ok_and(|n| n >= s.0));

#[derive(Debug, Clone, Copy)]
pub struct MaxConstraint(pub i64);
value_constraint!(MaxConstraint, |s, v| v.parse::<i64>().is_ok_and(|n| n <= s.0));

#[derive(Debug, Clone, Copy)]
pub struct RangeConstraint {
    pub min: i64,
    pub max: i64,
}
value_constraint!(RangeConstraint, |s, v| v
    .parse::<i64>()
    .is_ok_and(|n| n >= s.min && n <= s.max));

/// Case-insensitive regular expression. The expression is not anchored
/// implicitly; write `^...$` to match the whole value.
#[derive(Debug, Clone)]
pub struct RegexConstraint {
    regex: Regex,
}

impl RegexConstraint {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        let regex = RegexBuilder::new(pattern).case_insensitive(true).build()?;
        Ok(Self { regex })
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }
}
value_constraint!(RegexConstraint, |s, v| s.regex.is_match(v));

/// The value must be present and non-empty.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequiredConstraint;
value_constraint!(RequiredConstraint, |_s, v| !v.is_empty());

/// The last `/`-separated part of the value looks like a file name: it has a
/// `.` and does not end with one.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileNameConstraint;
value_constraint!(FileNameConstraint, |_s, v| is_file_name(v));

#[derive(Debug, Clone, Copy, Default)]
pub struct NonFileNameConstraint;
value_constraint!(NonFileNameConstraint, |_s, v| !is_file_name(v));

fn is_decimal(value: &str) -> bool {
    let digits = value.strip_prefix(['+', '-']).unwrap_or(value);
    let (int, frac) = digits.split_once('.').unwrap_or((digits, ""));
    !(int.is_empty() && frac.is_empty())
        && int.bytes().all(|b| b.is_ascii_digit())
        && frac.bytes().all(|b| b.is_ascii_digit())
}

const DATETIME_LAYOUTS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const DATE_LAYOUTS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];

fn is_datetime(value: &str) -> bool {
    DateTime::parse_from_rfc3339(value).is_ok()
        || DATETIME_LAYOUTS
            .iter()
            .any(|layout| NaiveDateTime::parse_from_str(value, layout).is_ok())
        || DATE_LAYOUTS
            .iter()
            .any(|layout| NaiveDate::parse_from_str(value, layout).is_ok())
}

fn is_file_name(value: &str) -> bool {
    let last = value.rsplit('/').next().unwrap_or(value);
    last.contains('.') && !last.ends_with('.')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(constraint: &dyn RouteConstraint, value: &str) -> bool {
        let values: RouteValueDictionary = [("p", value)].into_iter().collect();
        constraint.matches("p", &values, RouteDirection::IncomingRequest)
    }

    #[test]
    fn absent_values_never_match() {
        let empty = RouteValueDictionary::new();
        for constraint in [
            &IntConstraint as &dyn RouteConstraint,
            &AlphaConstraint,
            &RequiredConstraint,
            &NonFileNameConstraint,
        ] {
            assert!(!constraint.matches("p", &empty, RouteDirection::IncomingRequest));
        }
    }

    #[test]
    fn numeric_constraints() {
        assert!(check(&IntConstraint, "42"));
        assert!(check(&IntConstraint, "-42"));
        assert!(!check(&IntConstraint, "abc"));
        assert!(!check(&IntConstraint, "4294967296"));
        assert!(check(&LongConstraint, "4294967296"));
        assert!(check(&DecimalConstraint, "3.14"));
        assert!(check(&DecimalConstraint, "-.5"));
        assert!(!check(&DecimalConstraint, "1e5"));
        assert!(!check(&DecimalConstraint, "."));
        assert!(check(&DoubleConstraint, "1e5"));
        assert!(!check(&DoubleConstraint, "NaN"));
        assert!(check(&FloatConstraint, "2.5"));
    }

    #[test]
    fn bool_is_case_insensitive() {
        assert!(check(&BoolConstraint, "True"));
        assert!(check(&BoolConstraint, "false"));
        assert!(!check(&BoolConstraint, "yes"));
    }

    #[test]
    fn guid_accepts_common_forms() {
        assert!(check(&GuidConstraint, "12345678-1234-1234-1234-123456789012"));
        assert!(check(&GuidConstraint, "12345678123412341234123456789012"));
        assert!(!check(&GuidConstraint, "12345678-1234"));
    }

    #[test]
    fn datetime_layouts() {
        assert!(check(&DateTimeConstraint, "2024-02-29"));
        assert!(check(&DateTimeConstraint, "2024-02-29T10:30:00"));
        assert!(check(&DateTimeConstraint, "2024-02-29T10:30:00Z"));
        assert!(check(&DateTimeConstraint, "12/31/2023"));
        assert!(!check(&DateTimeConstraint, "2023-02-29"));
        assert!(!check(&DateTimeConstraint, "yesterday"));
    }

    #[test]
    fn length_and_range_constraints() {
        assert!(check(&LengthConstraint::exact(3), "abc"));
        assert!(!check(&LengthConstraint::exact(3), "abcd"));
        assert!(check(&LengthConstraint { min: 2, max: 4 }, "abcd"));
        assert!(check(&MinLengthConstraint(2), "ab"));
        assert!(!check(&MaxLengthConstraint(2), "abc"));
        assert!(check(&MinConstraint(1), "1"));
        assert!(!check(&MinConstraint(1), "0"));
        assert!(check(&MaxConstraint(10), "10"));
        assert!(check(&RangeConstraint { min: 1, max: 5 }, "3"));
        assert!(!check(&RangeConstraint { min: 1, max: 5 }, "6"));
        assert!(!check(&RangeConstraint { min: 1, max: 5 }, "x"));
    }

    #[test]
    fn alpha_and_required() {
        assert!(check(&AlphaConstraint, "Hello"));
        assert!(!check(&AlphaConstraint, "h3llo"));
        assert!(check(&RequiredConstraint, "x"));
        assert!(!check(&RequiredConstraint, ""));
    }

    #[test]
    fn regex_is_case_insensitive_and_not_anchored() {
        let constraint = RegexConstraint::new("^[a-z]+$").unwrap();
        assert!(check(&constraint, "ABC"));
        assert!(!check(&constraint, "abc1"));

        let unanchored = RegexConstraint::new("b").unwrap();
        assert!(check(&unanchored, "abc"));
    }

    #[test]
    fn file_name_detection() {
        assert!(check(&FileNameConstraint, "a/b/c.txt"));
        assert!(check(&FileNameConstraint, ".gitignore"));
        assert!(!check(&FileNameConstraint, "a.b/c"));
        assert!(!check(&FileNameConstraint, "c."));
        assert!(check(&NonFileNameConstraint, "a/b/c"));
    }
}
