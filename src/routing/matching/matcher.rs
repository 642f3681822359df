//! The compiled DFA matcher.
//!
//! Matching a request walks one jump table per path segment, then turns
//! the candidates of the final state into a [`CandidateSet`], extracts
//! route values, runs the state's selector policies and finally the
//! [`EndpointSelector`].

use std::sync::Arc;

use super::candidate::Candidate;
use super::candidate_set::{CandidateSet, CandidateState};
use super::jump_table::JumpTable;
use super::path::tokenize;
use super::policy::EndpointSelectorPolicy;
use super::selector::EndpointSelector;
use crate::error::MatchError;
use crate::routing::endpoint::Endpoint;
use crate::routing::values::RouteValueDictionary;

/// Request data consumed by the matcher, and the match result.
///
/// A request that matches nothing leaves [`endpoint`](Self::endpoint) unset;
/// that is not an error.
#[derive(Debug, Clone)]
pub struct MatchContext {
    pub path: String,
    pub method: String,
    /// `Host` header value, `host[:port]`.
    pub host: Option<String>,
    pub content_type: Option<String>,
    pub endpoint: Option<Arc<Endpoint>>,
    pub route_values: RouteValueDictionary,
}

impl MatchContext {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method: "GET".to_string(),
            host: None,
            content_type: None,
            endpoint: None,
            route_values: RouteValueDictionary::new(),
        }
    }

    #[must_use]
    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

pub(crate) struct DfaState {
    pub(crate) candidates: Box<[Candidate]>,
    pub(crate) policies: Box<[Arc<dyn EndpointSelectorPolicy>]>,
    pub(crate) jump_table: JumpTable,
}

impl std::fmt::Debug for DfaState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DfaState")
            .field(
                "candidates",
                &self
                    .candidates
                    .iter()
                    .map(|c| c.endpoint.display_name())
                    .collect::<Vec<_>>(),
            )
            .field(
                "policies",
                &self.policies.iter().map(|p| p.name()).collect::<Vec<_>>(),
            )
            .field("jump_table", &self.jump_table)
            .finish()
    }
}

/// Immutable matcher produced by
/// [`DfaMatcherBuilder::build`](super::dfa::DfaMatcherBuilder::build).
/// Safe to share between any number of concurrent requests.
pub struct DfaMatcher {
    states: Box<[DfaState]>,
    selector: Arc<dyn EndpointSelector>,
    endpoint_count: usize,
}

impl DfaMatcher {
    pub(crate) fn new(
        states: Vec<DfaState>,
        selector: Arc<dyn EndpointSelector>,
        endpoint_count: usize,
    ) -> Self {
        Self {
            states: states.into_boxed_slice(),
            selector,
            endpoint_count,
        }
    }

    /// Number of states, including the sink state.
    #[must_use]
    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    /// Number of endpoints the matcher was built from.
    #[must_use]
    pub const fn endpoint_count(&self) -> usize {
        self.endpoint_count
    }

    /// Resolve `ctx.path` to an endpoint.
    ///
    /// On return `ctx.endpoint` holds the chosen endpoint (possibly a
    /// synthesized rejection endpoint) or `None`, and `ctx.route_values`
    /// the values extracted for it.
    ///
    /// # Errors
    ///
    /// Returns [`MatchError::Ambiguous`] when several equally ranked
    /// endpoints remain, and any error raised by a selector policy.
    pub async fn match_request(&self, ctx: &mut MatchContext) -> Result<(), MatchError> {
        ctx.endpoint = None;
        ctx.route_values = RouteValueDictionary::new();

        let path = ctx.path.clone();
        let segments = tokenize(&path);

        let sink = self.states.len().saturating_sub(1);
        let mut destination = 0;
        for span in &segments {
            let Some(state) = self.states.get(destination) else {
                return Ok(());
            };
            destination = state.jump_table.destination(span.text(&path));
            if destination == sink {
                break;
            }
        }

        let Some(state) = self.states.get(destination) else {
            return Ok(());
        };
        if state.candidates.is_empty() {
            return Ok(());
        }

        let mut rejected = Vec::new();
        let mut states = Vec::with_capacity(state.candidates.len());
        for (i, candidate) in state.candidates.iter().enumerate() {
            let endpoint = Arc::clone(&candidate.endpoint);
            if candidate.is_literal_only() {
                states.push(CandidateState::new(endpoint, candidate.score, None));
                continue;
            }
            let (values, is_valid) = candidate.process(&path, &segments);
            if !is_valid {
                tracing::trace!(path = %path, endpoint = %endpoint.display_name(), "candidate rejected by route values");
                rejected.push(i);
            }
            states.push(CandidateState::new(endpoint, candidate.score, Some(values)));
        }
        let mut candidates = CandidateSet::new(states);
        for i in rejected {
            candidates.set_validity(i, false);
        }

        for policy in state.policies.iter() {
            policy.apply(ctx, &mut candidates).await?;
            if ctx.endpoint.is_some() {
                return Ok(());
            }
        }

        self.selector.select(ctx, &mut candidates).await
    }
}

impl std::fmt::Debug for DfaMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DfaMatcher")
            .field("states", &self.states.len())
            .field("endpoints", &self.endpoint_count)
            .finish_non_exhaustive()
    }
}
