use std::cmp::Ordering;
use std::sync::Arc;

use crate::routing::endpoint::Endpoint;

use super::policy::EndpointSelectorPolicy;

/// Orders endpoints that tie on `order` and inbound precedence.
pub trait EndpointComparerPolicy: Send + Sync {
    fn compare(&self, x: &Endpoint, y: &Endpoint) -> Ordering;
}

/// Total order used to score candidates: `order`, then inbound precedence,
/// then each comparer policy in policy order.
#[derive(Clone, Default)]
pub struct EndpointComparer {
    policies: Vec<Arc<dyn EndpointSelectorPolicy>>,
}

impl EndpointComparer {
    /// `policies` must already be sorted by [`EndpointSelectorPolicy::order`].
    #[must_use]
    pub fn new(policies: &[Arc<dyn EndpointSelectorPolicy>]) -> Self {
        Self {
            policies: policies
                .iter()
                .filter(|p| p.comparer().is_some())
                .cloned()
                .collect(),
        }
    }

    #[must_use]
    pub fn compare(&self, x: &Endpoint, y: &Endpoint) -> Ordering {
        x.order()
            .cmp(&y.order())
            .then_with(|| {
                x.route_pattern()
                    .inbound_precedence()
                    .cmp(y.route_pattern().inbound_precedence())
            })
            .then_with(|| {
                self.policies
                    .iter()
                    .filter_map(|p| p.comparer())
                    .map(|c| c.compare(x, y))
                    .find(|o| o.is_ne())
                    .unwrap_or(Ordering::Equal)
            })
    }

    /// Sort `endpoints` and assign each one the index of its equality group.
    #[must_use]
    pub fn score(&self, mut endpoints: Vec<Arc<Endpoint>>) -> Vec<(Arc<Endpoint>, usize)> {
        endpoints.sort_by(|x, y| self.compare(x, y));
        let mut scored: Vec<(Arc<Endpoint>, usize)> = Vec::with_capacity(endpoints.len());
        let mut score = 0;
        for endpoint in endpoints {
            if let Some((previous, _)) = scored.last() {
                if self.compare(previous, &endpoint).is_ne() {
                    score += 1;
                }
            }
            scored.push((endpoint, score));
        }
        scored
    }
}

impl std::fmt::Debug for EndpointComparer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.policies.iter().map(|p| p.name()))
            .finish()
    }
}

/// Sorts an endpoint that has some metadata before one that does not.
pub(crate) fn compare_presence(x: bool, y: bool) -> Ordering {
    match (x, y) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}
