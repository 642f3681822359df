//! Axum server setup, shared application state, and graceful shutdown.
//!
//! Contains [`AppState`] (the `Arc`-shared state holding the live matcher,
//! its endpoint source, the loaded endpoint file, stats, and uptime),
//! [`build_router`] for constructing the Axum router with middleware
//! layers, and [`shutdown_signal`] for SIGTERM / Ctrl+C handling.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use arc_swap::ArcSwap;
use axum::routing::get;
use axum::Router;
use tokio::sync::RwLock;
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::config::model::Config;
use crate::config::ConfigVersion;
use crate::dispatch::match_handler;
use crate::error::{MatcherError, WaypointError};
use crate::health::health_handler;
use crate::routing::constraints::ParameterPolicyFactory;
use crate::routing::data_source::DynamicEndpointDataSource;
use crate::routing::matching::{builtin_policies, DataSourceMatcher, DfaMatcherBuilder};

#[derive(Debug)]
pub struct LoadedConfig {
    pub config: Arc<Config>,
    pub version: ConfigVersion,
    pub source_name: String,
    pub loaded_at: Instant,
}

#[derive(Debug)]
pub struct Stats {
    pub matched: AtomicU64,
    pub not_found: AtomicU64,
    /// Answered by a synthesized 405 or 415 endpoint.
    pub rejected: AtomicU64,
    pub ambiguous: AtomicU64,
    pub failed: AtomicU64,
    pub reloads: AtomicU64,
}

impl Default for Stats {
    fn default() -> Self {
        Self::new()
    }
}

impl Stats {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            matched: AtomicU64::new(0),
            not_found: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            ambiguous: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            reloads: AtomicU64::new(0),
        }
    }
}

pub struct AppState {
    pub matcher: Arc<DataSourceMatcher>,
    pub endpoints: Arc<DynamicEndpointDataSource>,
    /// Constraint resolution of the loaded file, read by every rebuild.
    policy_factory: Arc<ArcSwap<ParameterPolicyFactory>>,
    pub config: RwLock<LoadedConfig>,
    pub start_time: Instant,
    pub stats: Stats,
}

impl AppState {
    /// Build the initial matcher from a loaded endpoint file.
    pub fn new(
        config: Config,
        version: ConfigVersion,
        source_name: impl Into<String>,
    ) -> Result<Self, WaypointError> {
        let factory = config.policy_factory().map_err(|e| MatcherError::Policy {
            endpoint: "(root)".into(),
            source: e,
        })?;
        let policy_factory = Arc::new(ArcSwap::from_pointee(factory));
        let endpoints = Arc::new(DynamicEndpointDataSource::new(config.to_endpoints()?));

        let builder_factory = Arc::clone(&policy_factory);
        let matcher = DataSourceMatcher::new(endpoints.clone(), move || {
            DfaMatcherBuilder::new(builder_factory.load_full(), builtin_policies())
        })?;

        Ok(Self {
            matcher,
            endpoints,
            policy_factory,
            config: RwLock::new(LoadedConfig {
                config: Arc::new(config),
                version,
                source_name: source_name.into(),
                loaded_at: Instant::now(),
            }),
            start_time: Instant::now(),
            stats: Stats::new(),
        })
    }

    /// Swap in a reloaded endpoint file.
    ///
    /// The endpoint source is replaced wholesale, which rebuilds the
    /// matcher. When the rebuild fails the previous matcher keeps serving
    /// and the previous constraint set is restored.
    pub async fn apply(&self, config: Config, version: ConfigVersion) -> Result<(), WaypointError> {
        let factory = config.policy_factory().map_err(|e| MatcherError::Policy {
            endpoint: "(root)".into(),
            source: e,
        })?;
        let endpoints = config.to_endpoints()?;

        let previous = self.policy_factory.swap(Arc::new(factory));
        if let Err(e) = self.endpoints.replace_all(endpoints) {
            self.policy_factory.store(previous);
            return Err(e.into());
        }

        let mut loaded = self.config.write().await;
        loaded.config = Arc::new(config);
        loaded.version = version;
        loaded.loaded_at = Instant::now();
        drop(loaded);

        self.stats.reloads.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

pub fn build_router(state: Arc<AppState>, max_body: usize) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .fallback(match_handler)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(RequestBodyLimitLayer::new(max_body)),
        )
        .with_state(state)
}

pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received Ctrl+C"),
        () = terminate => tracing::info!("received SIGTERM"),
    }
}
