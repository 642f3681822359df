//! `waypoint run` — start the matching server.
//!
//! Loads the endpoint file, builds the live matcher, starts the Axum HTTP
//! server with graceful shutdown, and spawns a background refresh loop
//! that hot-reloads the file when its content changes.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::cli::RunArgs;
use crate::config::sources::file_source_for;
use crate::config::{ConfigResolver, ConfigSource};
use crate::error::WaypointError;
use crate::logging;
use crate::server::{self, AppState};

const AUTO_DETECT: [&str; 4] = [
    "waypoint.yaml",
    "waypoint.yml",
    "waypoint.json",
    "waypoint.toml",
];

pub async fn execute(args: RunArgs) -> Result<(), WaypointError> {
    logging::init(&args.log_level, logging::resolve_format(args.pretty, args.json));

    let resolver = resolve_config_sources(&args).await?;
    let (config, version) = resolver.load_with_fallback().await?;
    let endpoint_count = config.endpoints.len();

    let state = Arc::new(AppState::new(config, version, resolver.primary_name())?);

    // Dropping shutdown_tx closes the channel and stops the refresh loop
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    let refresh_handle = (args.poll_interval > 0).then(|| {
        let refresh_state = state.clone();
        let poll_interval = Duration::from_secs(args.poll_interval);
        tokio::spawn(async move {
            config_refresh_loop(refresh_state, resolver, poll_interval, shutdown_rx).await;
        })
    });

    let matcher_states = state.matcher.current().state_count();
    let router = server::build_router(state, args.max_body);

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!(
        addr = %addr,
        endpoints = endpoint_count,
        states = matcher_states,
        "waypoint started"
    );

    let graceful_shutdown = async move {
        server::shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    };

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(graceful_shutdown)
    .await?;

    if let Some(handle) = refresh_handle {
        if let Err(e) = handle.await {
            tracing::error!(error = %e, "endpoint refresh task failed");
        }
    }

    tracing::info!("waypoint stopped");
    Ok(())
}

async fn resolve_config_sources(args: &RunArgs) -> Result<ConfigResolver, WaypointError> {
    let Some(primary) = resolve_file_source(args.config.as_deref()).await? else {
        return Err(WaypointError::NoConfigSource {
            hint: format!(
                "Provide --config <file> or create one of {}.\n  \
                 Run 'waypoint init' to create an endpoint file.",
                AUTO_DETECT.join(", ")
            ),
        });
    };

    let fallback = match args.fallback {
        Some(ref path) => Some(create_file_source(path)?),
        None => None,
    };

    Ok(ConfigResolver::new(primary, fallback))
}

async fn resolve_file_source(
    explicit: Option<&Path>,
) -> Result<Option<Box<dyn ConfigSource>>, WaypointError> {
    if let Some(path) = explicit {
        return create_file_source(path).map(Some);
    }

    for name in &AUTO_DETECT {
        let path = PathBuf::from(name);
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            tracing::info!(path = %path.display(), "auto-detected endpoint file");
            return create_file_source(&path).map(Some);
        }
    }

    Ok(None)
}

fn create_file_source(path: &Path) -> Result<Box<dyn ConfigSource>, WaypointError> {
    Ok(Box::new(file_source_for(path.to_path_buf())?))
}

async fn config_refresh_loop(
    state: Arc<AppState>,
    resolver: ConfigResolver,
    interval: Duration,
    mut shutdown: tokio::sync::watch::Receiver<bool>,
) {
    let mut interval = tokio::time::interval(interval);
    interval.tick().await; // Skip first immediate tick

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = shutdown.changed() => {
                tracing::debug!("endpoint refresh loop shutting down");
                return;
            }
        }

        let current_version = state.config.read().await.version.clone();

        match resolver.primary().has_changed(&current_version).await {
            Ok(true) => {}
            Ok(false) => continue,
            Err(e) => {
                tracing::warn!(error = %e, "endpoint file change check failed");
                continue;
            }
        }

        match resolver.load_with_fallback().await {
            // Still serving the fallback while the primary is broken.
            Ok((_, version)) if version == current_version => {}
            Ok((config, version)) => {
                let endpoint_count = config.endpoints.len();
                tracing::info!(version = %version, "endpoint file change detected, reloading");
                match state.apply(config, version).await {
                    Ok(()) => tracing::info!(endpoints = endpoint_count, "endpoints reloaded"),
                    Err(e) => {
                        tracing::error!(error = %e, "endpoint reload failed, keeping current matcher");
                    }
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "endpoint reload failed, keeping current matcher");
            }
        }
    }
}
