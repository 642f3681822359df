use std::cmp::Ordering;
use std::sync::Arc;

use async_trait::async_trait;

use super::{rejection_endpoint, UnsupportedMediaType};
use crate::error::MatchError;
use crate::routing::endpoint::Endpoint;
use crate::routing::matching::candidate_set::CandidateSet;
use crate::routing::matching::comparer::{compare_presence, EndpointComparerPolicy};
use crate::routing::matching::matcher::MatchContext;
use crate::routing::matching::policy::EndpointSelectorPolicy;
use crate::routing::metadata::AcceptsMetadata;
use crate::routing::values::RouteValueDictionary;

pub const HTTP_UNSUPPORTED_MEDIA_TYPE: &str = "415 HTTP Unsupported Media Type";

/// Rejects candidates whose [`AcceptsMetadata`] does not cover the request
/// `Content-Type`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptsMatcherPolicy;

fn accepts(endpoint: &Endpoint) -> Option<&AcceptsMetadata> {
    endpoint
        .metadata()
        .get_metadata::<AcceptsMetadata>()
        .filter(|m| !m.content_types().is_empty())
}

/// `text/html; charset=utf-8` -> `text/html`
fn media_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase()
}

fn media_type_matches(accepted: &str, requested: &str) -> bool {
    if accepted == "*/*" || accepted == requested {
        return true;
    }
    match accepted.strip_suffix("/*") {
        Some(kind) => requested
            .split_once('/')
            .is_some_and(|(requested_kind, _)| requested_kind == kind),
        None => false,
    }
}

impl EndpointComparerPolicy for AcceptsMatcherPolicy {
    fn compare(&self, x: &Endpoint, y: &Endpoint) -> Ordering {
        compare_presence(accepts(x).is_some(), accepts(y).is_some())
    }
}

#[async_trait]
impl EndpointSelectorPolicy for AcceptsMatcherPolicy {
    fn name(&self) -> &'static str {
        "accepts"
    }

    fn order(&self) -> i32 {
        -50
    }

    fn comparer(&self) -> Option<&dyn EndpointComparerPolicy> {
        Some(self)
    }

    fn applies_to_endpoints(&self, endpoints: &[Arc<Endpoint>]) -> bool {
        endpoints.iter().any(|e| accepts(e).is_some())
    }

    async fn apply(
        &self,
        ctx: &mut MatchContext,
        candidates: &mut CandidateSet,
    ) -> Result<(), MatchError> {
        let requested = ctx
            .content_type
            .as_deref()
            .map(media_type)
            .filter(|m| !m.is_empty());

        let mut needs_rejection = false;
        let mut saw_valid = false;

        for i in 0..candidates.len() {
            if !candidates.is_valid_candidate(i) {
                continue;
            }
            let Some(state) = candidates.get(i) else {
                continue;
            };
            saw_valid = true;
            let endpoint = Arc::clone(&state.endpoint);

            let Some(metadata) = accepts(&endpoint) else {
                continue;
            };
            let matched = match &requested {
                None => metadata.is_optional(),
                Some(requested) => metadata
                    .content_types()
                    .iter()
                    .any(|accepted| media_type_matches(&media_type(accepted), requested)),
            };
            if !matched {
                candidates.set_validity(i, false);
                needs_rejection = true;
            }
        }

        if saw_valid && needs_rejection && candidates.valid().next().is_none() {
            tracing::debug!(content_type = ?ctx.content_type, "no endpoint accepts the request content type");
            ctx.endpoint = Some(rejection_endpoint(
                HTTP_UNSUPPORTED_MEDIA_TYPE,
                UnsupportedMediaType,
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

    fn endpoint(types: &[&str], is_optional: bool) -> Arc<Endpoint> {
        let mut builder = EndpointBuilder::parse("/upload").unwrap();
        if !types.is_empty() {
            builder = builder.metadata(AcceptsMetadata::new(types, is_optional));
        }
        Arc::new(builder.build())
    }

    async fn run(content_type: Option<&str>, endpoints: Vec<Arc<Endpoint>>) -> (MatchContext, CandidateSet) {
        let mut ctx = MatchContext::new("/upload");
        if let Some(content_type) = content_type {
            ctx = ctx.with_content_type(content_type);
        }
        let mut candidates = CandidateSet::from_endpoints(endpoints.into_iter().map(|e| (e, 0)));
        AcceptsMatcherPolicy
            .apply(&mut ctx, &mut candidates)
            .await
            .unwrap();
        (ctx, candidates)
    }

    #[test]
    fn wildcards() {
        assert!(media_type_matches("*/*", "text/plain"));
        assert!(media_type_matches("text/*", "text/plain"));
        assert!(!media_type_matches("text/*", "application/json"));
        assert!(media_type_matches("application/json", "application/json"));
        assert_eq!(media_type("Application/JSON; charset=utf-8"), "application/json");
    }

    #[tokio::test]
    async fn keeps_matching_content_type() {
        let (ctx, candidates) = run(
            Some("application/json; charset=utf-8"),
            vec![endpoint(&["application/json"], false), endpoint(&["text/*"], false)],
        )
        .await;
        assert!(ctx.endpoint.is_none());
        assert!(candidates.is_valid_candidate(0));
        assert!(!candidates.is_valid_candidate(1));
    }

    #[tokio::test]
    async fn all_rejected_yields_415() {
        let (ctx, _) = run(Some("image/png"), vec![endpoint(&["application/json"], false)]).await;
        let endpoint = ctx.endpoint.unwrap();
        assert_eq!(endpoint.display_name(), HTTP_UNSUPPORTED_MEDIA_TYPE);
        assert!(endpoint.metadata().contains::<UnsupportedMediaType>());
    }

    #[tokio::test]
    async fn optional_body_accepts_missing_content_type() {
        let (ctx, candidates) = run(
            None,
            vec![endpoint(&["application/json"], true), endpoint(&["application/json"], false)],
        )
        .await;
        assert!(ctx.endpoint.is_none());
        assert!(candidates.is_valid_candidate(0));
        assert!(!candidates.is_valid_candidate(1));
    }

    #[tokio::test]
    async fn candidate_without_metadata_prevents_415() {
        let (ctx, candidates) = run(
            Some("image/png"),
            vec![endpoint(&["application/json"], false), endpoint(&[], false)],
        )
        .await;
        assert!(ctx.endpoint.is_none());
        assert!(candidates.is_valid_candidate(1));
    }
}
