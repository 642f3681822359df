//! Compiled candidates.
//!
//! A [`Candidate`] is built once per DFA state for each endpoint reachable
//! in that state. It records where every route value comes from so that a
//! request only has to copy slices of the path.

use std::sync::Arc;

use super::path::{ends_with_ignore_case, rfind_ignore_case, SegmentSpan};
use crate::error::PolicyError;
use crate::routing::constraints::{ParameterPolicy, ParameterPolicyFactory, RouteDirection};
use crate::routing::endpoint::Endpoint;
use crate::routing::pattern::{PathSegment, PathSegmentPart};
use crate::routing::values::RouteValueDictionary;

#[derive(Debug, Clone)]
pub struct Candidate {
    pub endpoint: Arc<Endpoint>,
    /// Index of the equality group this candidate belongs to within its
    /// state; equal scores are tied.
    pub score: usize,
    pub(crate) defaults: RouteValueDictionary,
    /// `(parameter, segment index)`
    pub(crate) captures: Vec<(String, usize)>,
    pub(crate) catch_all: Option<(String, usize)>,
    pub(crate) complex_segments: Vec<(usize, PathSegment)>,
    /// Only policies with a match capability are kept.
    pub(crate) constraints: Vec<(String, Arc<dyn ParameterPolicy>)>,
}

impl Candidate {
    /// Compile `endpoint`, resolving every policy reference of its pattern.
    pub fn compile(
        endpoint: Arc<Endpoint>,
        score: usize,
        factory: &ParameterPolicyFactory,
    ) -> Result<Self, PolicyError> {
        let pattern = endpoint.route_pattern();

        let mut captures = Vec::new();
        let mut catch_all = None;
        let mut complex_segments = Vec::new();
        for (i, segment) in pattern.path_segments().iter().enumerate() {
            match segment.as_parameter() {
                Some(p) if p.is_catch_all() => catch_all = Some((p.name.clone(), i)),
                Some(p) => captures.push((p.name.clone(), i)),
                None if !segment.is_simple() => complex_segments.push((i, segment.clone())),
                None => {}
            }
        }

        let mut constraints = Vec::new();
        for (key, references) in pattern.parameter_policies() {
            let parameter = pattern.parameter(key);
            for reference in references {
                let policy = factory.create(key, parameter, reference)?;
                if policy.as_constraint().is_some() {
                    constraints.push((key.clone(), policy));
                }
            }
        }

        Ok(Self {
            defaults: pattern.defaults().clone(),
            endpoint,
            score,
            captures,
            catch_all,
            complex_segments,
            constraints,
        })
    }

    /// `true` when matching this candidate needs no route values at all.
    #[must_use]
    pub fn is_literal_only(&self) -> bool {
        self.defaults.is_empty()
            && self.captures.is_empty()
            && self.catch_all.is_none()
            && self.complex_segments.is_empty()
            && self.constraints.is_empty()
    }

    /// Extract the route values of `path` and evaluate the constraints.
    /// Returns the values and whether the candidate is still valid.
    pub(crate) fn process(
        &self,
        path: &str,
        segments: &[SegmentSpan],
    ) -> (RouteValueDictionary, bool) {
        let mut values = RouteValueDictionary::with_capacity(
            self.defaults.len() + self.captures.len() + usize::from(self.catch_all.is_some()),
        );
        values.extend_defaults(&self.defaults);

        for (name, index) in &self.captures {
            if let Some(span) = segments.get(*index) {
                let text = span.text(path);
                if !text.is_empty() {
                    values.insert(name.as_str(), text);
                }
            }
        }

        if let Some((ref name, index)) = self.catch_all {
            if let Some(span) = segments.get(index) {
                let remainder = path.get(span.start..).unwrap_or("");
                if !remainder.is_empty() {
                    values.insert(name.as_str(), remainder);
                }
            }
        }

        for (index, segment) in &self.complex_segments {
            let text = segments.get(*index).map_or("", |s| s.text(path));
            if !match_complex_segment(segment, text, &mut values) {
                return (values, false);
            }
        }

        let valid = self.constraints.iter().all(|(key, policy)| {
            policy
                .as_constraint()
                .map_or(true, |c| c.matches(key, &values, RouteDirection::IncomingRequest))
        });
        (values, valid)
    }
}

/// Match a complex segment such as `{name}.{ext?}` against `text`, right to
/// left, and add the captured values on success.
pub fn match_complex_segment(
    segment: &PathSegment,
    text: &str,
    values: &mut RouteValueDictionary,
) -> bool {
    let parts = &segment.parts;
    let last = parts.len() - 1;

    let optional_tail = parts[last].as_parameter().is_some_and(|p| p.is_optional())
        && last > 0
        && matches!(parts[last - 1], PathSegmentPart::Separator(_));

    if optional_tail {
        if match_complex_core(parts, text, values, last) {
            return true;
        }
        // Retry without the separator and optional parameter, unless the
        // text ends with the separator (an empty optional value).
        if let PathSegmentPart::Separator(ref separator) = parts[last - 1] {
            if ends_with_ignore_case(text, separator) || last < 2 {
                return false;
            }
        }
        match_complex_core(parts, text, values, last - 2)
    } else {
        match_complex_core(parts, text, values, last)
    }
}

fn match_complex_core(
    parts: &[PathSegmentPart],
    text: &str,
    values: &mut RouteValueDictionary,
    start_part: usize,
) -> bool {
    let mut captured: Vec<(&str, &str)> = Vec::new();
    let mut last_index = text.len();
    let mut pending: Option<&str> = None;
    // End of the literal matched most recently, while a value is pending.
    let mut last_literal: Option<usize> = None;

    for index in (0..=start_part).rev() {
        let part = &parts[index];
        let mut new_last_index = last_index;

        match part {
            PathSegmentPart::Parameter(p) => pending = Some(p.name.as_str()),
            PathSegmentPart::Literal(literal) | PathSegmentPart::Separator(literal) => {
                // A pending parameter needs at least one character.
                let search_end = if pending.is_some() {
                    text[..last_index].char_indices().next_back().map_or(0, |(i, _)| i)
                } else {
                    last_index
                };
                if search_end == 0 {
                    return false;
                }
                let Some((found, found_end)) = rfind_ignore_case(text, literal, search_end) else {
                    return false;
                };
                if index == parts.len() - 1 && found_end != text.len() {
                    return false;
                }
                last_literal = Some(found_end);
                new_last_index = found;
            }
        }

        if let Some(name) = pending {
            let take_now = (last_literal.is_some() && !part.is_parameter()) || index == 0;
            if take_now {
                let (start, end) = match last_literal {
                    Some(literal_end) if !(index == 0 && part.is_parameter()) => {
                        (literal_end, last_index)
                    }
                    _ => (0, last_index),
                };
                match text.get(start..end) {
                    Some(value) if !value.is_empty() => captured.push((name, value)),
                    _ => return false,
                }
                pending = None;
                last_literal = None;
            }
        }

        last_index = new_last_index;
    }

    if last_index == 0 || parts[0].is_parameter() {
        for (name, value) in captured {
            values.insert(name, value);
        }
        true
    } else {
        false
    }
}
