//! `GET /health` endpoint handler.
//!
//! Returns a [`HealthResponse`] JSON payload containing the server
//! version, uptime, endpoint file metadata, matcher statistics, and
//! cumulative request counters.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::server::AppState;

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub config: ConfigHealth,
    pub matcher: MatcherHealth,
    pub stats: StatsResponse,
}

#[derive(Serialize, Deserialize)]
pub struct ConfigHealth {
    pub source: String,
    pub version: String,
    pub loaded_ago_seconds: u64,
    pub endpoints: usize,
}

#[derive(Serialize, Deserialize)]
pub struct MatcherHealth {
    /// Endpoint source version the live matcher was built from.
    pub version: u64,
    /// Endpoints that take part in matching.
    pub endpoints: usize,
    pub states: usize,
}

#[derive(Serialize, Deserialize)]
pub struct StatsResponse {
    pub matched: u64,
    pub not_found: u64,
    pub rejected: u64,
    pub ambiguous: u64,
    pub failed: u64,
    pub reloads: u64,
}

pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let config = {
        let loaded = state.config.read().await;
        ConfigHealth {
            source: loaded.source_name.clone(),
            version: loaded.version.to_string(),
            loaded_ago_seconds: loaded.loaded_at.elapsed().as_secs(),
            endpoints: loaded.config.endpoints.len(),
        }
    };

    let current = state.matcher.current();
    let stats = &state.stats;

    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        config,
        matcher: MatcherHealth {
            version: state.matcher.version(),
            endpoints: current.endpoint_count(),
            states: current.state_count(),
        },
        stats: StatsResponse {
            matched: stats.matched.load(Ordering::Relaxed),
            not_found: stats.not_found.load(Ordering::Relaxed),
            rejected: stats.rejected.load(Ordering::Relaxed),
            ambiguous: stats.ambiguous.load(Ordering::Relaxed),
            failed: stats.failed.load(Ordering::Relaxed),
            reloads: stats.reloads.load(Ordering::Relaxed),
        },
    })
}
