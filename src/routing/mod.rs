//! The routing engine: templates, endpoints and the DFA matcher.

pub mod constraints;
pub mod data_source;
pub mod endpoint;
pub mod matching;
pub mod metadata;
pub mod pattern;
pub mod values;

pub use constraints::{
    ConstraintMap, ParameterPolicy, ParameterPolicyFactory, RouteConstraint, RouteDirection,
};
pub use data_source::{
    CompositeEndpointDataSource, DynamicEndpointDataSource, EndpointDataSource,
    StaticEndpointDataSource, Subscription,
};
pub use endpoint::{Endpoint, EndpointBuilder, EndpointMetadata};
pub use matching::{DataSourceMatcher, DfaMatcher, DfaMatcherBuilder, MatchContext};
pub use metadata::{AcceptsMetadata, HostMetadata, HttpMethodMetadata, SuppressMatchingMetadata};
pub use pattern::{PolicyReference, RoutePattern};
pub use values::RouteValueDictionary;
