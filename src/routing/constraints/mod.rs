//! Parameter policies and route constraints.
//!
//! A [`ParameterPolicy`] is anything attached to a route parameter, either
//! inline (`{id:int}`) or out of line. Policies that can accept or reject a
//! value also implement [`RouteConstraint`] and expose it through
//! [`ParameterPolicy::as_constraint`]; the matcher only evaluates those.
//! References are resolved by the [`ParameterPolicyFactory`] when a DFA is
//! built.

pub mod builtin;
pub mod factory;

use std::fmt;
use std::sync::Arc;

use crate::routing::values::RouteValueDictionary;

pub use factory::{ConstraintMap, ParameterPolicyFactory, PolicyConstructor};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDirection {
    IncomingRequest,
    UrlGeneration,
}

pub trait ParameterPolicy: fmt::Debug + Send + Sync {
    /// The match capability of this policy, if it has one.
    fn as_constraint(&self) -> Option<&dyn RouteConstraint> {
        None
    }
}

pub trait RouteConstraint: ParameterPolicy {
    /// `parameter` names the value in `values` being checked. The value may
    /// be absent.
    fn matches(
        &self,
        parameter: &str,
        values: &RouteValueDictionary,
        direction: RouteDirection,
    ) -> bool;
}

/// Implements [`ParameterPolicy`] for a type that is a [`RouteConstraint`].
#[macro_export]
macro_rules! constraint_policy {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::routing::constraints::ParameterPolicy for $ty {
                fn as_constraint(
                    &self,
                ) -> Option<&dyn $crate::routing::constraints::RouteConstraint> {
                    Some(self)
                }
            }
        )+
    };
}

/// Wraps the constraints of an optional parameter: an absent or empty value
/// always satisfies it.
#[derive(Debug, Clone)]
pub struct OptionalConstraint {
    inner: Arc<dyn ParameterPolicy>,
}

impl OptionalConstraint {
    #[must_use]
    pub fn new(inner: Arc<dyn ParameterPolicy>) -> Self {
        Self { inner }
    }

    #[must_use]
    pub fn inner(&self) -> &Arc<dyn ParameterPolicy> {
        &self.inner
    }
}

impl RouteConstraint for OptionalConstraint {
    fn matches(
        &self,
        parameter: &str,
        values: &RouteValueDictionary,
        direction: RouteDirection,
    ) -> bool {
        match values.get(parameter) {
            None | Some("") => true,
            Some(_) => self
                .inner
                .as_constraint()
                .map_or(true, |c| c.matches(parameter, values, direction)),
        }
    }
}

constraint_policy!(OptionalConstraint);

#[cfg(test)]
mod tests {
    use super::builtin::IntConstraint;
    use super::*;

    #[test]
    fn optional_accepts_absent_and_empty_values() {
        let constraint = OptionalConstraint::new(Arc::new(IntConstraint));
        let empty = RouteValueDictionary::new();
        assert!(constraint.matches("id", &empty, RouteDirection::IncomingRequest));

        let blank: RouteValueDictionary = [("id", "")].into_iter().collect();
        assert!(constraint.matches("id", &blank, RouteDirection::IncomingRequest));
    }

    #[test]
    fn optional_delegates_present_values() {
        let constraint = OptionalConstraint::new(Arc::new(IntConstraint));
        let good: RouteValueDictionary = [("id", "12")].into_iter().collect();
        let bad: RouteValueDictionary = [("id", "twelve")].into_iter().collect();
        assert!(constraint.matches("id", &good, RouteDirection::IncomingRequest));
        assert!(!constraint.matches("id", &bad, RouteDirection::IncomingRequest));
    }
}
