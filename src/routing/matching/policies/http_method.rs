use std::cmp::Ordering;
use std::sync::Arc;

use async_trait::async_trait;

use super::{rejection_endpoint, MethodNotAllowed};
use crate::error::MatchError;
use crate::routing::endpoint::Endpoint;
use crate::routing::matching::candidate_set::CandidateSet;
use crate::routing::matching::comparer::{compare_presence, EndpointComparerPolicy};
use crate::routing::matching::matcher::MatchContext;
use crate::routing::matching::policy::EndpointSelectorPolicy;
use crate::routing::metadata::HttpMethodMetadata;
use crate::routing::values::RouteValueDictionary;

pub const HTTP_METHOD_NOT_SUPPORTED: &str = "405 HTTP Method Not Supported";

/// Rejects candidates whose [`HttpMethodMetadata`] excludes the request
/// method. When every method-restricted candidate was rejected and no
/// candidate accepts any method, the context receives a 405 endpoint.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpMethodMatcherPolicy;

/// Method metadata that actually restricts methods.
fn restricting(endpoint: &Endpoint) -> Option<&HttpMethodMetadata> {
    endpoint
        .metadata()
        .get_metadata::<HttpMethodMetadata>()
        .filter(|m| !m.accepts_any())
}

impl EndpointComparerPolicy for HttpMethodMatcherPolicy {
    fn compare(&self, x: &Endpoint, y: &Endpoint) -> Ordering {
        compare_presence(restricting(x).is_some(), restricting(y).is_some())
    }
}

#[async_trait]
impl EndpointSelectorPolicy for HttpMethodMatcherPolicy {
    fn name(&self) -> &'static str {
        "http-method"
    }

    fn order(&self) -> i32 {
        -1000
    }

    fn comparer(&self) -> Option<&dyn EndpointComparerPolicy> {
        Some(self)
    }

    fn applies_to_endpoints(&self, endpoints: &[Arc<Endpoint>]) -> bool {
        endpoints.iter().any(|e| restricting(e).is_some())
    }

    async fn apply(
        &self,
        ctx: &mut MatchContext,
        candidates: &mut CandidateSet,
    ) -> Result<(), MatchError> {
        let mut needs_rejection: Option<bool> = None;
        let mut allowed: Vec<String> = Vec::new();

        for i in 0..candidates.len() {
            // Candidates rejected earlier play no part in the 405 decision.
            if !candidates.is_valid_candidate(i) {
                continue;
            }
            let Some(state) = candidates.get(i) else {
                continue;
            };
            let endpoint = Arc::clone(&state.endpoint);

            let Some(metadata) = restricting(&endpoint) else {
                needs_rejection = Some(false);
                continue;
            };
            if needs_rejection.is_none() {
                needs_rejection = Some(true);
            }

            for method in metadata.methods() {
                if !allowed.contains(method) {
                    allowed.push(method.clone());
                }
            }
            if metadata.allows(&ctx.method) {
                needs_rejection = Some(false);
            } else {
                candidates.set_validity(i, false);
            }
        }

        if needs_rejection == Some(true) && !allowed.is_empty() {
            allowed.sort();
            tracing::debug!(method = %ctx.method, allowed = ?allowed, "no endpoint accepts the request method");
            ctx.endpoint = Some(rejection_endpoint(
                HTTP_METHOD_NOT_SUPPORTED,
                MethodNotAllowed {
                    allowed_methods: allowed,
                },
            ));
            ctx.route_values = RouteValueDictionary::new();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::endpoint::EndpointBuilder;

    fn endpoint(template: &str, methods: &[&str]) -> Arc<Endpoint> {
        let mut builder = EndpointBuilder::parse(template).unwrap();
        if !methods.is_empty() {
            builder = builder.metadata(HttpMethodMetadata::new(methods));
        }
        Arc::new(builder.build())
    }

    async fn run(method: &str, endpoints: Vec<Arc<Endpoint>>) -> (MatchContext, CandidateSet) {
        let mut ctx = MatchContext::new("/x").with_method(method);
        let mut candidates = CandidateSet::from_endpoints(endpoints.into_iter().map(|e| (e, 0)));
        HttpMethodMatcherPolicy
            .apply(&mut ctx, &mut candidates)
            .await
            .unwrap();
        (ctx, candidates)
    }

    #[tokio::test]
    async fn rejects_other_methods() {
        let (ctx, candidates) = run(
            "get",
            vec![endpoint("/x", &["GET"]), endpoint("/x", &["POST"])],
        )
        .await;
        assert!(ctx.endpoint.is_none());
        assert!(candidates.is_valid_candidate(0));
        assert!(!candidates.is_valid_candidate(1));
    }

    #[tokio::test]
    async fn all_rejected_yields_405_with_allowed_methods() {
        let (ctx, _) = run(
            "DELETE",
            vec![endpoint("/x", &["PUT", "GET"]), endpoint("/x", &["POST", "GET"])],
        )
        .await;
        let endpoint = ctx.endpoint.unwrap();
        assert_eq!(endpoint.display_name(), HTTP_METHOD_NOT_SUPPORTED);
        assert_eq!(
            endpoint
                .metadata()
                .get_metadata::<MethodNotAllowed>()
                .unwrap()
                .allowed_methods,
            ["GET", "POST", "PUT"]
        );
    }

    #[tokio::test]
    async fn unrestricted_candidate_prevents_405() {
        let (ctx, candidates) = run(
            "DELETE",
            vec![endpoint("/x", &["GET"]), endpoint("/x", &["*"])],
        )
        .await;
        assert!(ctx.endpoint.is_none());
        assert!(candidates.is_valid_candidate(1));
    }

    async fn run_with_invalid_first(
        method: &str,
        endpoints: Vec<Arc<Endpoint>>,
    ) -> (MatchContext, CandidateSet) {
        let mut ctx = MatchContext::new("/x").with_method(method);
        let mut candidates = CandidateSet::from_endpoints(endpoints.into_iter().map(|e| (e, 0)));
        candidates.set_validity(0, false);
        HttpMethodMatcherPolicy
            .apply(&mut ctx, &mut candidates)
            .await
            .unwrap();
        (ctx, candidates)
    }

    #[tokio::test]
    async fn already_invalid_candidates_do_not_affect_405() {
        // Unrestricted but already rejected: the GET endpoint alone decides.
        let (ctx, _) =
            run_with_invalid_first("POST", vec![endpoint("/x", &[]), endpoint("/x", &["GET"])]).await;
        assert_eq!(ctx.endpoint.unwrap().display_name(), HTTP_METHOD_NOT_SUPPORTED);

        // Restricted and already rejected, with no other candidate left.
        let (ctx, _) = run_with_invalid_first("POST", vec![endpoint("/x", &["PUT"])]).await;
        assert!(ctx.endpoint.is_none());
    }

    #[test]
    fn restricted_endpoints_sort_first() {
        let policy = HttpMethodMatcherPolicy;
        assert_eq!(
            policy.compare(&endpoint("/x", &["GET"]), &endpoint("/x", &[])),
            Ordering::Less
        );
        assert!(policy.applies_to_endpoints(&[endpoint("/x", &["GET"])]));
        assert!(!policy.applies_to_endpoints(&[endpoint("/x", &["*"])]));
    }
}
