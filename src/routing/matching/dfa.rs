//! DFA construction.
//!
//! [`DfaMatcherBuilder::build_dfa_tree`] walks the registered endpoints
//! breadth first, one path depth at a time, and produces a tree of
//! [`DfaNode`]s in which every node lists the endpoints that can match a
//! path ending there. [`DfaMatcherBuilder::build`] flattens that tree into
//! the states of a [`DfaMatcher`].
//!
//! Parameter and complex segments also traverse every literal sibling, so
//! `/a/{b}/c` reaches the node of `/a/b/c` as well as its own. Catch-alls
//! traverse literal and parameter siblings and get a node of their own that
//! loops on itself for any further segment.

use std::sync::Arc;

use super::candidate::Candidate;
use super::comparer::EndpointComparer;
use super::jump_table::JumpTableBuilder;
use super::matcher::{DfaMatcher, DfaState};
use super::path::eq_ignore_case;
use super::policies::builtin_policies;
use super::policy::{sort_policies, EndpointSelectorPolicy};
use super::selector::{DefaultEndpointSelector, EndpointSelector};
use crate::error::MatcherError;
use crate::routing::constraints::ParameterPolicyFactory;
use crate::routing::endpoint::Endpoint;
use crate::routing::metadata::SuppressMatchingMetadata;
use crate::routing::pattern::{PathSegment, Precedence};

/// One node of the intermediate tree. Child references are indices into
/// [`DfaTree`].
#[derive(Debug, Clone, Default)]
pub struct DfaNode {
    /// Path prefix leading to the node, such as `/a/{...}/{*...}/`.
    pub label: String,
    pub path_depth: usize,
    pub matches: Vec<Arc<Endpoint>>,
    /// Literal children keyed by the first spelling seen; lookups ignore
    /// case.
    pub literals: Vec<(String, usize)>,
    pub parameters: Option<usize>,
    pub catch_all: Option<usize>,
}

impl DfaNode {
    #[must_use]
    pub fn literal(&self, text: &str) -> Option<usize> {
        self.literals
            .iter()
            .find(|(literal, _)| eq_ignore_case(literal, text))
            .map(|(_, index)| *index)
    }

    /// Display names of the matching endpoints, for diagnostics and tests.
    #[must_use]
    pub fn match_names(&self) -> Vec<&str> {
        self.matches.iter().map(|e| e.display_name()).collect()
    }
}

#[derive(Debug, Clone)]
pub struct DfaTree {
    nodes: Vec<DfaNode>,
}

impl DfaTree {
    pub const ROOT: usize = 0;

    fn new() -> Self {
        Self {
            nodes: vec![DfaNode {
                label: "/".to_string(),
                ..DfaNode::default()
            }],
        }
    }

    #[must_use]
    pub fn root(&self) -> &DfaNode {
        &self.nodes[Self::ROOT]
    }

    /// # Panics
    ///
    /// Panics if `index` does not belong to this tree.
    #[must_use]
    pub fn node(&self, index: usize) -> &DfaNode {
        &self.nodes[index]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Follow literal, parameter (`{}`) and catch-all (`{*}`) edges from the
    /// root.
    #[must_use]
    pub fn walk(&self, steps: &[&str]) -> Option<&DfaNode> {
        let mut current = Self::ROOT;
        for step in steps {
            let node = &self.nodes[current];
            current = match *step {
                "{}" => node.parameters?,
                "{*}" => node.catch_all?,
                literal => node.literal(literal)?,
            };
        }
        Some(&self.nodes[current])
    }

    fn push(&mut self, node: DfaNode) -> usize {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    fn literal_child(&mut self, parent: usize, literal: &str) -> usize {
        if let Some(existing) = self.nodes[parent].literal(literal) {
            return existing;
        }
        let node = DfaNode {
            label: format!("{}{literal}/", self.nodes[parent].label),
            path_depth: self.nodes[parent].path_depth + 1,
            ..DfaNode::default()
        };
        let index = self.push(node);
        self.nodes[parent].literals.push((literal.to_string(), index));
        index
    }

    fn parameters_child(&mut self, parent: usize) -> usize {
        if let Some(existing) = self.nodes[parent].parameters {
            return existing;
        }
        let node = DfaNode {
            label: format!("{}{{...}}/", self.nodes[parent].label),
            path_depth: self.nodes[parent].path_depth + 1,
            ..DfaNode::default()
        };
        let index = self.push(node);
        self.nodes[parent].parameters = Some(index);
        index
    }

    fn catch_all_child(&mut self, parent: usize) -> usize {
        if let Some(existing) = self.nodes[parent].catch_all {
            return existing;
        }
        let node = DfaNode {
            label: format!("{}{{*...}}/", self.nodes[parent].label),
            path_depth: self.nodes[parent].path_depth + 1,
            ..DfaNode::default()
        };
        let index = self.push(node);
        // The catch-all node consumes any further segment, empty or not.
        self.nodes[index].parameters = Some(index);
        self.nodes[index].catch_all = Some(index);
        self.nodes[parent].catch_all = Some(index);
        index
    }

    /// Children reachable from `node` other than itself, literals first.
    fn children(&self, node: usize) -> Vec<usize> {
        let n = &self.nodes[node];
        let mut children: Vec<usize> = n.literals.iter().map(|(_, i)| *i).collect();
        for child in [n.parameters, n.catch_all].into_iter().flatten() {
            if child != node && !children.contains(&child) {
                children.push(child);
            }
        }
        children
    }

    /// Depth-first pre-order, root first.
    fn preorder(&self) -> Vec<usize> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![Self::ROOT];
        while let Some(node) = stack.pop() {
            order.push(node);
            stack.extend(self.children(node).into_iter().rev());
        }
        order
    }
}

pub struct DfaMatcherBuilder {
    factory: Arc<ParameterPolicyFactory>,
    policies: Vec<Arc<dyn EndpointSelectorPolicy>>,
    selector: Arc<dyn EndpointSelector>,
    comparer: EndpointComparer,
    endpoints: Vec<Arc<Endpoint>>,
}

impl DfaMatcherBuilder {
    /// `policies` may be given in any order; they run by ascending
    /// [`order`](EndpointSelectorPolicy::order).
    #[must_use]
    pub fn new(
        factory: Arc<ParameterPolicyFactory>,
        mut policies: Vec<Arc<dyn EndpointSelectorPolicy>>,
    ) -> Self {
        sort_policies(&mut policies);
        let comparer = EndpointComparer::new(&policies);
        Self {
            factory,
            policies,
            selector: Arc::new(DefaultEndpointSelector),
            comparer,
            endpoints: Vec::new(),
        }
    }

    /// Built-in constraints, the built-in policies and the default selector.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(Arc::new(ParameterPolicyFactory::default()), builtin_policies())
    }

    #[must_use]
    pub fn with_selector(mut self, selector: Arc<dyn EndpointSelector>) -> Self {
        self.selector = selector;
        self
    }

    /// Endpoints carrying [`SuppressMatchingMetadata`] are ignored.
    pub fn add_endpoint(&mut self, endpoint: Arc<Endpoint>) {
        if endpoint.metadata().contains::<SuppressMatchingMetadata>() {
            tracing::trace!(endpoint = %endpoint.display_name(), "endpoint suppressed from matching");
            return;
        }
        self.endpoints.push(endpoint);
    }

    pub fn add_endpoints(&mut self, endpoints: impl IntoIterator<Item = Arc<Endpoint>>) {
        for endpoint in endpoints {
            self.add_endpoint(endpoint);
        }
    }

    #[must_use]
    pub fn endpoint_count(&self) -> usize {
        self.endpoints.len()
    }

    #[must_use]
    pub fn build_dfa_tree(&self) -> DfaTree {
        let mut endpoints = self.endpoints.clone();
        endpoints.sort_by(|x, y| self.comparer.compare(x, y));

        let max_depth = endpoints
            .iter()
            .map(|e| e.route_pattern().path_segments().len())
            .max()
            .unwrap_or(0);

        let mut tree = DfaTree::new();
        let mut work: Vec<(Arc<Endpoint>, Vec<usize>)> = endpoints
            .into_iter()
            .map(|e| (e, vec![DfaTree::ROOT]))
            .collect();

        for depth in 0..=max_depth {
            // Literals, then parameters and complex segments, then
            // catch-alls, so that every wider edge sees the literal nodes it
            // has to traverse.
            work.sort_by_key(|(endpoint, _)| {
                current_segment(endpoint, depth).map_or(0, segment_rank)
            });

            let mut next_work = Vec::with_capacity(work.len());
            for (endpoint, parents) in work {
                if !has_additional_required_segments(&endpoint, depth) {
                    for &parent in &parents {
                        tree.nodes[parent].matches.push(Arc::clone(&endpoint));
                    }
                }

                let Some(segment) = current_segment(&endpoint, depth) else {
                    continue;
                };

                let mut next_parents = Vec::new();
                for &parent in &parents {
                    if let Some(literal) = segment.as_literal() {
                        next_parents.push(tree.literal_child(parent, literal));
                    } else if segment.is_catch_all() {
                        next_parents.extend(tree.nodes[parent].literals.iter().map(|(_, i)| *i));
                        next_parents.extend(tree.nodes[parent].parameters);
                        let catch_all = tree.catch_all_child(parent);
                        tree.nodes[catch_all].matches.push(Arc::clone(&endpoint));
                    } else {
                        // Complex segments are matched like parameters here
                        // and resolved per candidate at request time.
                        let parameters = tree.parameters_child(parent);
                        next_parents.extend(tree.nodes[parent].literals.iter().map(|(_, i)| *i));
                        next_parents.push(parameters);
                    }
                }

                if !next_parents.is_empty() {
                    next_work.push((endpoint, next_parents));
                }
            }
            work = next_work;
        }

        tree
    }

    /// Flatten the tree into a [`DfaMatcher`].
    ///
    /// # Errors
    ///
    /// Fails when a parameter policy of some endpoint cannot be resolved.
    pub fn build(self) -> Result<DfaMatcher, MatcherError> {
        let tree = self.build_dfa_tree();
        let order = tree.preorder();

        let mut state_of = vec![0usize; tree.len()];
        for (state, &node) in order.iter().enumerate() {
            state_of[node] = state;
        }
        let sink = order.len();

        let mut states = Vec::with_capacity(order.len() + 1);
        let mut max_depth = 0;
        for &index in &order {
            let node = tree.node(index);
            max_depth = max_depth.max(node.path_depth);

            let default = node
                .parameters
                .or(node.catch_all)
                .map_or(sink, |child| state_of[child]);
            let exit = node.catch_all.map_or(sink, |child| state_of[child]);
            let mut jump_table = JumpTableBuilder::new(default, exit);
            for (literal, child) in &node.literals {
                jump_table.add_entry(literal, state_of[*child]);
            }

            states.push(DfaState {
                candidates: self.candidates(&node.matches)?.into_boxed_slice(),
                policies: self.policies_for(&node.matches),
                jump_table: jump_table.build(),
            });
        }
        states.push(DfaState {
            candidates: Box::new([]),
            policies: Box::new([]),
            jump_table: JumpTableBuilder::new(sink, sink).build(),
        });

        tracing::debug!(
            endpoints = self.endpoints.len(),
            states = states.len(),
            max_depth,
            policies = ?self.policies.iter().map(|p| p.name()).collect::<Vec<_>>(),
            "built DFA matcher"
        );

        Ok(DfaMatcher::new(states, self.selector, self.endpoints.len()))
    }

    fn candidates(&self, matches: &[Arc<Endpoint>]) -> Result<Vec<Candidate>, MatcherError> {
        self.comparer
            .score(matches.to_vec())
            .into_iter()
            .map(|(endpoint, score)| {
                let name = endpoint.describe();
                Candidate::compile(endpoint, score, &self.factory)
                    .map_err(|source| MatcherError::Policy { endpoint: name, source })
            })
            .collect()
    }

    fn policies_for(&self, matches: &[Arc<Endpoint>]) -> Box<[Arc<dyn EndpointSelectorPolicy>]> {
        if matches.is_empty() {
            return Box::new([]);
        }
        self.policies
            .iter()
            .filter(|p| p.applies_to_endpoints(matches))
            .cloned()
            .collect()
    }
}

impl std::fmt::Debug for DfaMatcherBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DfaMatcherBuilder")
            .field("endpoints", &self.endpoints.len())
            .field("comparer", &self.comparer)
            .finish_non_exhaustive()
    }
}

/// The segment at `depth`, or the trailing catch-all for any deeper level.
fn current_segment(endpoint: &Endpoint, depth: usize) -> Option<&PathSegment> {
    let segments = endpoint.route_pattern().path_segments();
    match segments.get(depth) {
        Some(segment) => Some(segment),
        None => segments.last().filter(|s| s.is_catch_all()),
    }
}

fn segment_rank(segment: &PathSegment) -> u8 {
    Precedence::inbound(std::slice::from_ref(segment))
        .digits()
        .first()
        .copied()
        .unwrap_or(0)
}

fn has_additional_required_segments(endpoint: &Endpoint, depth: usize) -> bool {
    let pattern = endpoint.route_pattern();
    pattern
        .path_segments()
        .iter()
        .skip(depth)
        .any(|segment| segment.is_required(pattern.defaults()))
}
