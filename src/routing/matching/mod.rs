//! DFA-based endpoint matching.
//!
//! [`DfaMatcherBuilder`] compiles a set of endpoints into a [`DfaMatcher`];
//! [`DataSourceMatcher`] keeps one current for a changing
//! [`EndpointDataSource`](crate::routing::data_source::EndpointDataSource).

pub mod candidate;
pub mod candidate_set;
pub mod comparer;
pub mod data_source_matcher;
pub mod dfa;
pub mod jump_table;
pub mod matcher;
pub mod path;
pub mod policies;
pub mod policy;
pub mod selector;

pub use candidate::{match_complex_segment, Candidate};
pub use candidate_set::{CandidateSet, CandidateState};
pub use comparer::{EndpointComparer, EndpointComparerPolicy};
pub use data_source_matcher::DataSourceMatcher;
pub use dfa::{DfaMatcherBuilder, DfaNode, DfaTree};
pub use matcher::{DfaMatcher, MatchContext};
pub use policies::{
    builtin_policies, AcceptsMatcherPolicy, HostMatcherPolicy, HttpMethodMatcherPolicy,
    MethodNotAllowed, UnsupportedMediaType,
};
pub use policy::EndpointSelectorPolicy;
pub use selector::{DefaultEndpointSelector, EndpointSelector};
