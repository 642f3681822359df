//! Endpoint selector policies.
//!
//! Policies run in ascending [`order`](EndpointSelectorPolicy::order) after
//! route values have been extracted. Each one may invalidate candidates or
//! choose the endpoint outright by setting [`MatchContext::endpoint`], which
//! stops the chain.

use std::sync::Arc;

use async_trait::async_trait;

use super::candidate_set::CandidateSet;
use super::comparer::EndpointComparerPolicy;
use super::matcher::MatchContext;
use crate::error::MatchError;
use crate::routing::endpoint::Endpoint;

#[async_trait]
pub trait EndpointSelectorPolicy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Lower runs first. The built-in policies use negative values.
    fn order(&self) -> i32;

    /// Contribution to candidate ordering, if any.
    fn comparer(&self) -> Option<&dyn EndpointComparerPolicy> {
        None
    }

    /// Whether the policy needs to run for a DFA state holding `endpoints`.
    fn applies_to_endpoints(&self, endpoints: &[Arc<Endpoint>]) -> bool;

    async fn apply(
        &self,
        ctx: &mut MatchContext,
        candidates: &mut CandidateSet,
    ) -> Result<(), MatchError>;
}

/// Sort policies by order; ties keep registration order.
pub(crate) fn sort_policies(policies: &mut [Arc<dyn EndpointSelectorPolicy>]) {
    policies.sort_by_key(|p| p.order());
}
