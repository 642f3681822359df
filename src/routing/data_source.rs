//! Endpoint data sources and change notification.
//!
//! A data source hands out an immutable snapshot of its endpoints and a
//! version number that grows on every change. Matchers subscribe to it and
//! rebuild when notified. Listeners run synchronously on the thread that
//! mutated the source, and the first listener error is returned to that
//! caller.

use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};

use crate::error::MatcherError;
use crate::routing::endpoint::Endpoint;

pub type ChangeListener = Arc<dyn Fn() -> Result<(), MatcherError> + Send + Sync>;

pub trait EndpointDataSource: Send + Sync {
    /// The current endpoints, in registration order.
    fn endpoints(&self) -> Arc<[Arc<Endpoint>]>;

    fn version(&self) -> u64;

    /// Register `listener` for change notifications until the returned
    /// [`Subscription`] is dropped.
    fn subscribe(&self, listener: ChangeListener) -> Subscription;
}

/// Keeps a listener registered. Dropping it unregisters the listener.
#[must_use = "dropping a Subscription unregisters the listener"]
pub struct Subscription {
    inner: SubscriptionInner,
}

enum SubscriptionInner {
    None,
    Listener { registry: Weak<Mutex<Registry>>, id: u64 },
    Group(Vec<Subscription>),
}

impl Subscription {
    /// A subscription to a source that never changes.
    pub const fn none() -> Self {
        Self {
            inner: SubscriptionInner::None,
        }
    }

    /// Bundle several subscriptions into one.
    pub fn group(subscriptions: Vec<Subscription>) -> Self {
        Self {
            inner: SubscriptionInner::Group(subscriptions),
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let SubscriptionInner::Listener { ref registry, id } = self.inner {
            if let Some(registry) = registry.upgrade() {
                registry.lock().listeners.retain(|(lid, _)| *lid != id);
            }
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.inner {
            SubscriptionInner::None => f.write_str("Subscription(none)"),
            SubscriptionInner::Listener { id, .. } => write!(f, "Subscription({id})"),
            SubscriptionInner::Group(ref group) => f.debug_list().entries(group).finish(),
        }
    }
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    listeners: Vec<(u64, ChangeListener)>,
}

/// Listener registry shared by the mutable data sources.
#[derive(Clone, Default)]
pub struct ChangeNotifier {
    registry: Arc<Mutex<Registry>>,
}

impl ChangeNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, listener: ChangeListener) -> Subscription {
        let mut registry = self.registry.lock();
        let id = registry.next_id;
        registry.next_id += 1;
        registry.listeners.push((id, listener));
        Subscription {
            inner: SubscriptionInner::Listener {
                registry: Arc::downgrade(&self.registry),
                id,
            },
        }
    }

    /// Invoke every listener outside the registry lock. All listeners run;
    /// the first error is returned.
    pub fn notify(&self) -> Result<(), MatcherError> {
        let listeners: Vec<ChangeListener> = self
            .registry
            .lock()
            .listeners
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();

        let mut first_error = None;
        for listener in listeners {
            if let Err(e) = listener() {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.registry.lock().listeners.len()
    }
}

/// A fixed list of endpoints.
#[derive(Debug)]
pub struct StaticEndpointDataSource {
    endpoints: Arc<[Arc<Endpoint>]>,
}

impl StaticEndpointDataSource {
    pub fn new(endpoints: impl IntoIterator<Item = Endpoint>) -> Self {
        Self {
            endpoints: endpoints.into_iter().map(Arc::new).collect(),
        }
    }
}

impl EndpointDataSource for StaticEndpointDataSource {
    fn endpoints(&self) -> Arc<[Arc<Endpoint>]> {
        Arc::clone(&self.endpoints)
    }

    fn version(&self) -> u64 {
        0
    }

    fn subscribe(&self, _listener: ChangeListener) -> Subscription {
        Subscription::none()
    }
}

struct Snapshot {
    endpoints: Arc<[Arc<Endpoint>]>,
    version: u64,
}

/// A mutable endpoint list. Every mutation bumps the version and notifies
/// subscribers before returning.
pub struct DynamicEndpointDataSource {
    snapshot: RwLock<Snapshot>,
    notifier: ChangeNotifier,
}

impl DynamicEndpointDataSource {
    pub fn new(endpoints: impl IntoIterator<Item = Endpoint>) -> Self {
        Self {
            snapshot: RwLock::new(Snapshot {
                endpoints: endpoints.into_iter().map(Arc::new).collect(),
                version: 0,
            }),
            notifier: ChangeNotifier::new(),
        }
    }

    pub fn add(&self, endpoint: Endpoint) -> Result<(), MatcherError> {
        self.update(|current| {
            let mut next = current.to_vec();
            next.push(Arc::new(endpoint));
            Some(next)
        })
    }

    /// Remove every endpoint with the given display name. Returns `false`
    /// (and does not notify) when nothing matched.
    pub fn remove_by_name(&self, display_name: &str) -> Result<bool, MatcherError> {
        let mut removed = false;
        self.update(|current| {
            let next: Vec<_> = current
                .iter()
                .filter(|e| e.display_name() != display_name)
                .cloned()
                .collect();
            removed = next.len() != current.len();
            removed.then_some(next)
        })?;
        Ok(removed)
    }

    pub fn replace_all(&self, endpoints: impl IntoIterator<Item = Endpoint>) -> Result<(), MatcherError> {
        let next: Vec<_> = endpoints.into_iter().map(Arc::new).collect();
        self.update(move |_| Some(next))
    }

    fn update<F>(&self, f: F) -> Result<(), MatcherError>
    where
        F: FnOnce(&[Arc<Endpoint>]) -> Option<Vec<Arc<Endpoint>>>,
    {
        {
            let mut snapshot = self.snapshot.write();
            let Some(next) = f(&snapshot.endpoints) else {
                return Ok(());
            };
            snapshot.endpoints = next.into();
            snapshot.version += 1;
        }
        self.notifier.notify()
    }
}

impl EndpointDataSource for DynamicEndpointDataSource {
    fn endpoints(&self) -> Arc<[Arc<Endpoint>]> {
        Arc::clone(&self.snapshot.read().endpoints)
    }

    fn version(&self) -> u64 {
        self.snapshot.read().version
    }

    fn subscribe(&self, listener: ChangeListener) -> Subscription {
        self.notifier.subscribe(listener)
    }
}

impl std::fmt::Debug for DynamicEndpointDataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let snapshot = self.snapshot.read();
        f.debug_struct("DynamicEndpointDataSource")
            .field("endpoints", &snapshot.endpoints.len())
            .field("version", &snapshot.version)
            .finish()
    }
}

/// Concatenates the endpoints of its children, in order.
pub struct CompositeEndpointDataSource {
    children: Vec<Arc<dyn EndpointDataSource>>,
}

impl CompositeEndpointDataSource {
    #[must_use]
    pub fn new(children: Vec<Arc<dyn EndpointDataSource>>) -> Self {
        Self { children }
    }
}

impl EndpointDataSource for CompositeEndpointDataSource {
    fn endpoints(&self) -> Arc<[Arc<Endpoint>]> {
        self.children
            .iter()
            .flat_map(|c| c.endpoints().iter().cloned().collect::<Vec<_>>())
            .collect()
    }

    /// Child versions only grow, so their sum does too.
    fn version(&self) -> u64 {
        self.children.iter().map(|c| c.version()).sum()
    }

    fn subscribe(&self, listener: ChangeListener) -> Subscription {
        Subscription::group(
            self.children
                .iter()
                .map(|c| c.subscribe(Arc::clone(&listener)))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::routing::endpoint::EndpointBuilder;

    fn endpoint(template: &str) -> Endpoint {
        EndpointBuilder::parse(template).unwrap().build()
    }

    fn counting_listener(counter: &Arc<AtomicUsize>) -> ChangeListener {
        let counter = Arc::clone(counter);
        Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }

    #[test]
    fn dynamic_source_bumps_version_and_notifies() {
        let source = DynamicEndpointDataSource::new([endpoint("/a")]);
        let calls = Arc::new(AtomicUsize::new(0));
        let _subscription = source.subscribe(counting_listener(&calls));

        source.add(endpoint("/b")).unwrap();
        assert_eq!(source.version(), 1);
        assert_eq!(source.endpoints().len(), 2);

        assert!(source.remove_by_name("/a").unwrap());
        assert!(!source.remove_by_name("/missing").unwrap());
        assert_eq!(source.version(), 2);

        source.replace_all([endpoint("/c"), endpoint("/d")]).unwrap();
        assert_eq!(source.version(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn dropping_subscription_unregisters() {
        let source = DynamicEndpointDataSource::new(Vec::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let subscription = source.subscribe(counting_listener(&calls));
        drop(subscription);
        source.add(endpoint("/a")).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(source.notifier.listener_count(), 0);
    }

    #[test]
    fn listener_errors_reach_the_mutating_caller() {
        let source = DynamicEndpointDataSource::new(Vec::new());
        let _subscription = source.subscribe(Arc::new(|| {
            Err(MatcherError::Policy {
                endpoint: "/x".into(),
                source: crate::error::PolicyError::UnknownName {
                    name: "nope".into(),
                    parameter: "x".into(),
                },
            })
        }));
        assert!(source.add(endpoint("/x")).is_err());
        assert_eq!(source.version(), 1);
    }

    #[test]
    fn composite_concatenates_and_forwards() {
        let first = Arc::new(DynamicEndpointDataSource::new([endpoint("/a")]));
        let second = Arc::new(StaticEndpointDataSource::new([endpoint("/b"), endpoint("/c")]));
        let composite = CompositeEndpointDataSource::new(vec![
            Arc::clone(&first) as Arc<dyn EndpointDataSource>,
            second,
        ]);
        let names: Vec<String> = composite
            .endpoints()
            .iter()
            .map(|e| e.display_name().to_string())
            .collect();
        assert_eq!(names, ["/a", "/b", "/c"]);

        let calls = Arc::new(AtomicUsize::new(0));
        let _subscription = composite.subscribe(counting_listener(&calls));
        first.add(endpoint("/d")).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(composite.version(), 1);
        assert_eq!(composite.endpoints().len(), 4);
    }
}
