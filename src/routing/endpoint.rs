//! Routable endpoints.
//!
//! An [`Endpoint`] pairs a parsed [`RoutePattern`] with an explicit `order`,
//! a display name, typed metadata, and an opaque dispatch target. Endpoints
//! are immutable once built and shared as `Arc<Endpoint>`.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::error::PatternError;
use crate::routing::pattern::RoutePattern;

pub struct Endpoint {
    route_pattern: RoutePattern,
    order: i32,
    display_name: String,
    metadata: EndpointMetadata,
    target: Option<String>,
}

impl Endpoint {
    #[must_use]
    pub const fn route_pattern(&self) -> &RoutePattern {
        &self.route_pattern
    }

    /// Explicit tie-break; lower wins.
    #[must_use]
    pub const fn order(&self) -> i32 {
        self.order
    }

    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    #[must_use]
    pub const fn metadata(&self) -> &EndpointMetadata {
        &self.metadata
    }

    #[must_use]
    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    /// Display name, followed by the template in parentheses when the two
    /// differ.
    #[must_use]
    pub fn describe(&self) -> String {
        let template = self.route_pattern.raw_text();
        if self.display_name == template {
            self.display_name.clone()
        } else {
            format!("{} ({template})", self.display_name)
        }
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("display_name", &self.display_name)
            .field("template", &self.route_pattern.raw_text())
            .field("order", &self.order)
            .field("target", &self.target)
            .field("metadata", &self.metadata)
            .finish()
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_name)
    }
}

/// Builder for [`Endpoint`].
///
/// ```
/// use waypoint::routing::{EndpointBuilder, HttpMethodMetadata};
///
/// let endpoint = EndpointBuilder::parse("/api/users/{id:int}")
///     .unwrap()
///     .order(1)
///     .display_name("get user")
///     .metadata(HttpMethodMetadata::new(["GET"]))
///     .target("users-service")
///     .build();
/// assert_eq!(endpoint.display_name(), "get user");
/// ```
#[derive(Debug)]
pub struct EndpointBuilder {
    route_pattern: RoutePattern,
    order: i32,
    display_name: Option<String>,
    metadata: EndpointMetadata,
    target: Option<String>,
}

impl EndpointBuilder {
    #[must_use]
    pub fn new(route_pattern: RoutePattern) -> Self {
        Self {
            route_pattern,
            order: 0,
            display_name: None,
            metadata: EndpointMetadata::new(),
            target: None,
        }
    }

    /// Parse `template` and start a builder for it.
    pub fn parse(template: &str) -> Result<Self, PatternError> {
        RoutePattern::parse(template).map(Self::new)
    }

    #[must_use]
    pub const fn order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    #[must_use]
    pub fn display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn metadata<T: Any + Send + Sync>(mut self, item: T) -> Self {
        self.metadata.push(item);
        self
    }

    #[must_use]
    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    #[must_use]
    pub fn build(self) -> Endpoint {
        let display_name = self
            .display_name
            .unwrap_or_else(|| self.route_pattern.raw_text().to_string());
        Endpoint {
            route_pattern: self.route_pattern,
            order: self.order,
            display_name,
            metadata: self.metadata,
            target: self.target,
        }
    }
}

/// Typed heterogeneous metadata. Lookups scan linearly; collections hold a
/// handful of items.
#[derive(Clone, Default)]
pub struct EndpointMetadata {
    items: Vec<Arc<dyn Any + Send + Sync>>,
}

impl EndpointMetadata {
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn push<T: Any + Send + Sync>(&mut self, item: T) {
        self.items.push(Arc::new(item));
    }

    /// The last registered item of type `T`.
    #[must_use]
    pub fn get_metadata<T: Any>(&self) -> Option<&T> {
        self.items.iter().rev().find_map(|item| item.downcast_ref())
    }

    /// Every item of type `T`, in registration order.
    pub fn get_ordered_metadata<T: Any>(&self) -> impl Iterator<Item = &T> {
        self.items.iter().filter_map(|item| item.downcast_ref())
    }

    #[must_use]
    pub fn contains<T: Any>(&self) -> bool {
        self.get_metadata::<T>().is_some()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl fmt::Debug for EndpointMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EndpointMetadata({} items)", self.items.len())
    }
}
