//! A matcher that follows an [`EndpointDataSource`].
//!
//! The current [`DfaMatcher`] is published through an [`ArcSwap`]: requests
//! load it with one atomic read and keep it alive for as long as they need
//! it, while a change notification builds a replacement and swaps it in.

use std::sync::{Arc, Weak};

use arc_swap::ArcSwap;
use parking_lot::Mutex;

use super::dfa::DfaMatcherBuilder;
use super::matcher::{DfaMatcher, MatchContext};
use crate::error::{MatchError, MatcherError};
use crate::routing::data_source::{EndpointDataSource, Subscription};

type BuilderFactory = Box<dyn Fn() -> DfaMatcherBuilder + Send + Sync>;

pub struct DataSourceMatcher {
    source: Arc<dyn EndpointDataSource>,
    builder_factory: BuilderFactory,
    current: ArcSwap<DfaMatcher>,
    /// Source version of `current`. Held for the whole rebuild.
    built_version: Mutex<u64>,
    _subscription: Mutex<Option<Subscription>>,
}

impl DataSourceMatcher {
    /// Build the initial matcher and subscribe to `source`.
    ///
    /// `builder_factory` is called for every (re)build and decides which
    /// constraints, policies and selector are used.
    ///
    /// # Errors
    ///
    /// Returns the build error of the initial endpoint set.
    pub fn new<F>(source: Arc<dyn EndpointDataSource>, builder_factory: F) -> Result<Arc<Self>, MatcherError>
    where
        F: Fn() -> DfaMatcherBuilder + Send + Sync + 'static,
    {
        let version = source.version();
        let initial = build(&builder_factory, source.as_ref())?;

        let matcher = Arc::new(Self {
            source: Arc::clone(&source),
            builder_factory: Box::new(builder_factory),
            current: ArcSwap::from_pointee(initial),
            built_version: Mutex::new(version),
            _subscription: Mutex::new(None),
        });

        let weak: Weak<Self> = Arc::downgrade(&matcher);
        let subscription = source.subscribe(Arc::new(move || match weak.upgrade() {
            Some(matcher) => matcher.rebuild(),
            None => Ok(()),
        }));
        *matcher._subscription.lock() = Some(subscription);

        // Catch changes made between the initial build and the subscription.
        matcher.rebuild()?;
        Ok(matcher)
    }

    /// Rebuild from the source unless its version has already been built.
    /// On failure the previous matcher stays in place.
    ///
    /// # Errors
    ///
    /// Returns the build error.
    pub fn rebuild(&self) -> Result<(), MatcherError> {
        let mut built_version = self.built_version.lock();
        let version = self.source.version();
        if version == *built_version {
            return Ok(());
        }

        match build(&*self.builder_factory, self.source.as_ref()) {
            Ok(matcher) => {
                tracing::info!(
                    version,
                    previous = *built_version,
                    endpoints = matcher.endpoint_count(),
                    states = matcher.state_count(),
                    "matcher rebuilt"
                );
                self.current.store(Arc::new(matcher));
                *built_version = version;
                Ok(())
            }
            Err(e) => {
                tracing::error!(version, error = %e, "matcher rebuild failed, keeping previous matcher");
                Err(e)
            }
        }
    }

    /// Match against the matcher current at the time of the call.
    ///
    /// # Errors
    ///
    /// See [`DfaMatcher::match_request`].
    pub async fn match_request(&self, ctx: &mut MatchContext) -> Result<(), MatchError> {
        let matcher = self.current.load_full();
        matcher.match_request(ctx).await
    }

    /// Source version the current matcher was built from.
    #[must_use]
    pub fn version(&self) -> u64 {
        *self.built_version.lock()
    }

    #[must_use]
    pub fn endpoint_count(&self) -> usize {
        self.current.load().endpoint_count()
    }

    #[must_use]
    pub fn current(&self) -> Arc<DfaMatcher> {
        self.current.load_full()
    }
}

impl std::fmt::Debug for DataSourceMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataSourceMatcher")
            .field("version", &self.version())
            .field("endpoints", &self.endpoint_count())
            .finish_non_exhaustive()
    }
}

fn build(
    builder_factory: &(dyn Fn() -> DfaMatcherBuilder + Send + Sync),
    source: &dyn EndpointDataSource,
) -> Result<DfaMatcher, MatcherError> {
    let mut builder = builder_factory();
    builder.add_endpoints(source.endpoints().iter().cloned());
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::data_source::DynamicEndpointDataSource;
    use crate::routing::endpoint::{Endpoint, EndpointBuilder};

    fn endpoint(template: &str) -> Endpoint {
        EndpointBuilder::parse(template).unwrap().build()
    }

    async fn matched(matcher: &DataSourceMatcher, path: &str) -> Option<String> {
        let mut ctx = MatchContext::new(path);
        matcher.match_request(&mut ctx).await.unwrap();
        ctx.endpoint.map(|e| e.display_name().to_string())
    }

    #[tokio::test]
    async fn rebuilds_on_change() {
        let source = Arc::new(DynamicEndpointDataSource::new([endpoint("/a")]));
        let matcher =
            DataSourceMatcher::new(source.clone(), DfaMatcherBuilder::with_defaults).unwrap();
        assert_eq!(matched(&matcher, "/b").await, None);

        let before = matcher.current();
        source.add(endpoint("/b")).unwrap();
        assert_eq!(matched(&matcher, "/b").await.as_deref(), Some("/b"));
        assert_eq!(matcher.version(), 1);
        assert_eq!(matcher.endpoint_count(), 2);

        // The old matcher is still usable by whoever holds it.
        let mut ctx = MatchContext::new("/a");
        before.match_request(&mut ctx).await.unwrap();
        assert!(ctx.endpoint.is_some());
    }

    #[tokio::test]
    async fn failed_rebuild_keeps_previous_matcher() {
        let source = Arc::new(DynamicEndpointDataSource::new([endpoint("/a")]));
        let matcher =
            DataSourceMatcher::new(source.clone(), DfaMatcherBuilder::with_defaults).unwrap();

        let err = source.add(endpoint("/{id:bogus}")).unwrap_err();
        assert!(matches!(err, MatcherError::Policy { .. }));
        assert_eq!(matcher.version(), 0);
        assert_eq!(matched(&matcher, "/a").await.as_deref(), Some("/a"));
    }

    #[test]
    fn unchanged_version_is_not_rebuilt() {
        let source = Arc::new(DynamicEndpointDataSource::new([endpoint("/a")]));
        let matcher =
            DataSourceMatcher::new(source.clone(), DfaMatcherBuilder::with_defaults).unwrap();
        let before = matcher.current();
        matcher.rebuild().unwrap();
        assert!(Arc::ptr_eq(&before, &matcher.current()));
    }
}
