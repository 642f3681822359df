use std::cmp::Ordering;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::MatchError;
use crate::routing::endpoint::Endpoint;
use crate::routing::matching::candidate_set::CandidateSet;
use crate::routing::matching::comparer::EndpointComparerPolicy;
use crate::routing::matching::matcher::MatchContext;
use crate::routing::matching::policy::EndpointSelectorPolicy;
use crate::routing::metadata::HostMetadata;

/// Rejects candidates whose [`HostMetadata`] does not match the request
/// `Host`. A request without a port is treated as using port 80 or 443.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostMatcherPolicy;

fn hosts(endpoint: &Endpoint) -> Option<&[String]> {
    endpoint
        .metadata()
        .get_metadata::<HostMetadata>()
        .map(HostMetadata::hosts)
        .filter(|h| !h.is_empty())
}

/// Split `host[:port]`, keeping bracketed IPv6 addresses intact.
fn split_host_port(value: &str) -> (&str, Option<&str>) {
    if value.starts_with('[') {
        if let Some(end) = value.find(']') {
            let (host, rest) = value.split_at(end + 1);
            return (host, rest.strip_prefix(':'));
        }
    }
    match value.rsplit_once(':') {
        Some((host, port)) => (host, Some(port)),
        None => (value, None),
    }
}

fn is_any_host(pattern: &str) -> bool {
    split_host_port(pattern).0 == "*"
}

fn host_matches(pattern: &str, host: &str, port: Option<&str>) -> bool {
    let (pattern_host, pattern_port) = split_host_port(pattern);

    let port_ok = match (pattern_port, port) {
        (None | Some("*"), _) => true,
        (Some(expected), Some(actual)) => expected == actual,
        (Some(expected), None) => expected == "80" || expected == "443",
    };
    if !port_ok {
        return false;
    }

    if pattern_host == "*" {
        return true;
    }
    if let Some(suffix) = pattern_host.strip_prefix('*') {
        // "*.example.com" matches subdomains only.
        return host.len() > suffix.len()
            && host
                .get(host.len() - suffix.len()..)
                .is_some_and(|tail| tail.eq_ignore_ascii_case(suffix));
    }
    pattern_host.eq_ignore_ascii_case(host)
}

/// 0: a specific host, 1: only wildcard hosts, 2: no host metadata.
fn specificity(endpoint: &Endpoint) -> u8 {
    match hosts(endpoint) {
        None => 2,
        Some(hosts) if hosts.iter().all(|h| is_any_host(h)) => 1,
        Some(_) => 0,
    }
}

impl EndpointComparerPolicy for HostMatcherPolicy {
    fn compare(&self, x: &Endpoint, y: &Endpoint) -> Ordering {
        specificity(x).cmp(&specificity(y))
    }
}

#[async_trait]
impl EndpointSelectorPolicy for HostMatcherPolicy {
    fn name(&self) -> &'static str {
        "host"
    }

    fn order(&self) -> i32 {
        -100
    }

    fn comparer(&self) -> Option<&dyn EndpointComparerPolicy> {
        Some(self)
    }

    fn applies_to_endpoints(&self, endpoints: &[Arc<Endpoint>]) -> bool {
        endpoints.iter().any(|e| hosts(e).is_some())
    }

    async fn apply(
        &self,
        ctx: &mut MatchContext,
        candidates: &mut CandidateSet,
    ) -> Result<(), MatchError> {
        let (host, port) = ctx
            .host
            .as_deref()
            .map_or(("", None), split_host_port);

        for i in 0..candidates.len() {
            let Some(state) = candidates.get(i) else {
                continue;
            };
            if !state.is_valid() {
                continue;
            }
            let Some(patterns) = hosts(&state.endpoint) else {
                continue;
            };
            if !patterns.iter().any(|p| host_matches(p, host, port)) {
                candidates.set_validity(i, false);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::endpoint::EndpointBuilder;

    #[test]
    fn host_patterns() {
        assert!(host_matches("example.com", "EXAMPLE.com", None));
        assert!(!host_matches("example.com", "other.com", None));
        assert!(host_matches("*.example.com", "api.example.com", Some("8080")));
        assert!(!host_matches("*.example.com", "example.com", None));
        assert!(host_matches("example.com:8080", "example.com", Some("8080")));
        assert!(!host_matches("example.com:8080", "example.com", Some("9090")));
        assert!(host_matches("example.com:443", "example.com", None));
        assert!(host_matches("*:*", "anything", Some("1")));
        assert!(host_matches("*", "anything", None));
        assert!(host_matches("[::1]:5000", "[::1]", Some("5000")));
    }

    fn endpoint(hosts: &[&str]) -> Arc<Endpoint> {
        Arc::new(
            EndpointBuilder::parse("/")
                .unwrap()
                .metadata(HostMetadata::new(hosts))
                .build(),
        )
    }

    #[tokio::test]
    async fn invalidates_non_matching_hosts() {
        let mut ctx = MatchContext::new("/").with_host("api.example.com");
        let mut candidates = CandidateSet::from_endpoints([
            (endpoint(&["*.example.com"]), 0),
            (endpoint(&["other.org"]), 0),
            (endpoint(&[]), 0),
        ]);
        HostMatcherPolicy
            .apply(&mut ctx, &mut candidates)
            .await
            .unwrap();
        assert!(candidates.is_valid_candidate(0));
        assert!(!candidates.is_valid_candidate(1));
        assert!(candidates.is_valid_candidate(2));
    }

    #[test]
    fn specific_hosts_sort_before_wildcards() {
        let policy = HostMatcherPolicy;
        assert_eq!(
            policy.compare(&endpoint(&["a.com"]), &endpoint(&["*:*"])),
            Ordering::Less
        );
        assert_eq!(
            policy.compare(&endpoint(&["*"]), &endpoint(&[])),
            Ordering::Less
        );
    }
}
