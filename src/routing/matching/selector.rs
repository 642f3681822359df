use async_trait::async_trait;

use super::candidate_set::CandidateSet;
use super::matcher::MatchContext;
use crate::error::{AmbiguousMatchError, MatchError};

/// Picks the final endpoint among the candidates that survived matching
/// and every selector policy.
#[async_trait]
pub trait EndpointSelector: Send + Sync {
    async fn select(
        &self,
        ctx: &mut MatchContext,
        candidates: &mut CandidateSet,
    ) -> Result<(), MatchError>;
}

/// Chooses the single valid candidate with the lowest score. Two valid
/// candidates sharing that score are ambiguous.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultEndpointSelector;

#[async_trait]
impl EndpointSelector for DefaultEndpointSelector {
    async fn select(
        &self,
        ctx: &mut MatchContext,
        candidates: &mut CandidateSet,
    ) -> Result<(), MatchError> {
        select_candidate(ctx, candidates)
    }
}

pub(crate) fn select_candidate(
    ctx: &mut MatchContext,
    candidates: &CandidateSet,
) -> Result<(), MatchError> {
    let mut valid = candidates.valid();
    let Some((_, first)) = valid.next() else {
        return Ok(());
    };

    if let Some((_, second)) = valid.next() {
        if second.score == first.score {
            let endpoints: Vec<String> = candidates
                .valid()
                .filter(|(_, c)| c.score == first.score)
                .map(|(_, c)| c.endpoint.describe())
                .collect();
            tracing::error!(path = %ctx.path, endpoints = ?endpoints, "request matched multiple endpoints");
            return Err(AmbiguousMatchError { endpoints }.into());
        }
    }

    ctx.endpoint = Some(first.endpoint.clone());
    ctx.route_values = first.values.clone().unwrap_or_default();
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::routing::endpoint::{Endpoint, EndpointBuilder};
    use crate::routing::matching::candidate_set::CandidateState;
    use crate::routing::values::RouteValueDictionary;

    fn endpoint(template: &str) -> Arc<Endpoint> {
        Arc::new(EndpointBuilder::parse(template).unwrap().build())
    }

    #[tokio::test]
    async fn ambiguity_lists_lowest_valid_score_only() {
        let mut candidates = CandidateSet::from_endpoints([
            (endpoint("/test1"), 0),
            (endpoint("/test2"), 1),
            (endpoint("/test3"), 1),
            (endpoint("/test4"), 2),
        ]);
        candidates.set_validity(0, false);

        let mut ctx = MatchContext::new("/test");
        let err = DefaultEndpointSelector
            .select(&mut ctx, &mut candidates)
            .await
            .unwrap_err();
        let MatchError::Ambiguous(ambiguous) = err else {
            panic!("expected an ambiguity, got {err:?}");
        };
        assert_eq!(ambiguous.endpoints, ["/test2", "/test3"]);
        assert!(ctx.endpoint.is_none());
    }

    #[tokio::test]
    async fn single_best_candidate_wins() {
        let values: RouteValueDictionary = [("id", "7")].into_iter().collect();
        let mut candidates = CandidateSet::new(vec![
            CandidateState::new(endpoint("/a/{id}"), 0, Some(values)),
            CandidateState::new(endpoint("/{x}/{y}"), 1, None),
        ]);
        let mut ctx = MatchContext::new("/a/7");
        DefaultEndpointSelector
            .select(&mut ctx, &mut candidates)
            .await
            .unwrap();
        assert_eq!(ctx.endpoint.unwrap().display_name(), "/a/{id}");
        assert_eq!(ctx.route_values.get("id"), Some("7"));
    }

    #[tokio::test]
    async fn no_valid_candidate_leaves_endpoint_unset() {
        let mut candidates = CandidateSet::from_endpoints([(endpoint("/a"), 0)]);
        candidates.set_validity(0, false);
        let mut ctx = MatchContext::new("/a");
        DefaultEndpointSelector
            .select(&mut ctx, &mut candidates)
            .await
            .unwrap();
        assert!(ctx.endpoint.is_none());
    }
}
