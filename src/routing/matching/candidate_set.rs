//! Per-request candidate set.
//!
//! Built fresh for every request from the candidates of the final DFA state
//! and discarded once an endpoint has been chosen. Selector policies mutate
//! it through [`CandidateSet::set_validity`] and
//! [`CandidateSet::replace_endpoint`].

use std::sync::Arc;

use crate::routing::endpoint::Endpoint;
use crate::routing::values::RouteValueDictionary;

#[derive(Debug, Clone)]
pub struct CandidateState {
    pub endpoint: Arc<Endpoint>,
    pub score: usize,
    /// Route values extracted for this candidate, if any were produced.
    pub values: Option<RouteValueDictionary>,
    is_valid: bool,
}

impl CandidateState {
    #[must_use]
    pub fn new(endpoint: Arc<Endpoint>, score: usize, values: Option<RouteValueDictionary>) -> Self {
        Self {
            endpoint,
            score,
            values,
            is_valid: true,
        }
    }

    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.is_valid
    }
}

/// Up to four candidates are stored inline.
#[derive(Debug)]
enum Storage {
    Empty,
    One([CandidateState; 1]),
    Two([CandidateState; 2]),
    Three([CandidateState; 3]),
    Four([CandidateState; 4]),
    Many(Vec<CandidateState>),
}

#[derive(Debug)]
pub struct CandidateSet {
    storage: Storage,
}

impl CandidateSet {
    /// Build a set from candidates already ordered by score. Never fails; an
    /// empty list gives an empty set.
    #[must_use]
    pub fn new(candidates: Vec<CandidateState>) -> Self {
        let storage = match candidates.len() {
            0 => Storage::Empty,
            1 => inline(candidates, Storage::One),
            2 => inline(candidates, Storage::Two),
            3 => inline(candidates, Storage::Three),
            4 => inline(candidates, Storage::Four),
            _ => Storage::Many(candidates),
        };
        Self { storage }
    }

    /// Build a set of valid candidates without route values.
    pub fn from_endpoints(endpoints: impl IntoIterator<Item = (Arc<Endpoint>, usize)>) -> Self {
        Self::new(
            endpoints
                .into_iter()
                .map(|(endpoint, score)| CandidateState::new(endpoint, score, None))
                .collect(),
        )
    }

    fn as_slice(&self) -> &[CandidateState] {
        match &self.storage {
            Storage::Empty => &[],
            Storage::One(s) => s,
            Storage::Two(s) => s,
            Storage::Three(s) => s,
            Storage::Four(s) => s,
            Storage::Many(v) => v,
        }
    }

    fn as_mut_slice(&mut self) -> &mut [CandidateState] {
        match &mut self.storage {
            Storage::Empty => &mut [],
            Storage::One(s) => s,
            Storage::Two(s) => s,
            Storage::Three(s) => s,
            Storage::Four(s) => s,
            Storage::Many(v) => v,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&CandidateState> {
        self.as_slice().get(index)
    }

    /// `false` for an invalid candidate or an out-of-range index.
    #[must_use]
    pub fn is_valid_candidate(&self, index: usize) -> bool {
        self.get(index).is_some_and(CandidateState::is_valid)
    }

    /// # Panics
    ///
    /// Panics if `index` is out of range.
    pub fn set_validity(&mut self, index: usize, is_valid: bool) {
        self.as_mut_slice()[index].is_valid = is_valid;
    }

    /// Replace the endpoint and values of a candidate. A `None` endpoint
    /// invalidates it.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    pub fn replace_endpoint(
        &mut self,
        index: usize,
        endpoint: Option<Arc<Endpoint>>,
        values: Option<RouteValueDictionary>,
    ) {
        let state = &mut self.as_mut_slice()[index];
        state.values = values;
        match endpoint {
            Some(endpoint) => {
                state.endpoint = endpoint;
                state.is_valid = true;
            }
            None => state.is_valid = false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &CandidateState> {
        self.as_slice().iter()
    }

    pub fn valid(&self) -> impl Iterator<Item = (usize, &CandidateState)> {
        self.iter().enumerate().filter(|(_, c)| c.is_valid)
    }

    #[must_use]
    pub fn is_inline(&self) -> bool {
        !matches!(self.storage, Storage::Many(_))
    }
}

fn inline<const N: usize>(
    candidates: Vec<CandidateState>,
    wrap: fn([CandidateState; N]) -> Storage,
) -> Storage {
    match <[CandidateState; N]>::try_from(candidates) {
        Ok(array) => wrap(array),
        Err(candidates) => Storage::Many(candidates),
    }
}
