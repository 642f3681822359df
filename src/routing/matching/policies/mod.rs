//! Built-in selector policies.
//!
//! | policy                      | order  | rejection endpoint |
//! |-----------------------------|--------|--------------------|
//! | [`HttpMethodMatcherPolicy`] | -1000  | 405                |
//! | [`HostMatcherPolicy`]       | -100   | none               |
//! | [`AcceptsMatcherPolicy`]    | -50    | 415                |
//!
//! A rejection endpoint is a synthesized [`Endpoint`] with an empty pattern
//! and no target, set when every candidate was eliminated by that policy.
//! Its metadata ([`MethodNotAllowed`] or [`UnsupportedMediaType`]) tells
//! the caller how to answer.

pub mod accepts;
pub mod host;
pub mod http_method;

use std::any::Any;
use std::sync::Arc;

pub use accepts::AcceptsMatcherPolicy;
pub use host::HostMatcherPolicy;
pub use http_method::HttpMethodMatcherPolicy;

use super::policy::EndpointSelectorPolicy;
use crate::routing::endpoint::{Endpoint, EndpointBuilder};
use crate::routing::pattern::RoutePattern;
use crate::routing::values::RouteValueDictionary;

/// Metadata of the synthesized 405 endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodNotAllowed {
    /// Upper-case, sorted and de-duplicated.
    pub allowed_methods: Vec<String>,
}

/// Metadata of the synthesized 415 endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnsupportedMediaType;

/// The three built-in policies.
#[must_use]
pub fn builtin_policies() -> Vec<Arc<dyn EndpointSelectorPolicy>> {
    vec![
        Arc::new(HttpMethodMatcherPolicy),
        Arc::new(HostMatcherPolicy),
        Arc::new(AcceptsMatcherPolicy),
    ]
}

fn rejection_endpoint(display_name: &str, metadata: impl Any + Send + Sync) -> Arc<Endpoint> {
    let pattern = RoutePattern::from_parts(
        String::new(),
        Vec::new(),
        RouteValueDictionary::new(),
        Vec::new(),
    );
    Arc::new(
        EndpointBuilder::new(pattern)
            .display_name(display_name)
            .metadata(metadata)
            .build(),
    )
}
