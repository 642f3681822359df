//! Waypoint is a DFA-based HTTP endpoint matcher.
//!
//! Endpoints are described by route templates (`/products/{id:int}`,
//! `/files/{**path}`) plus metadata such as allowed methods, hosts and
//! content types. They are compiled into a deterministic finite automaton
//! with one jump table per state, so resolving a request path costs one
//! table lookup per path segment regardless of how many endpoints exist.
//! Route values are then extracted and checked against the constraints,
//! selector policies narrow the candidates, and the best ranked endpoint
//! wins. Two equally ranked survivors are reported as ambiguous.
//!
//! # Architecture
//!
//! - [`routing`] -- The matching engine: route templates, constraints,
//!   endpoints, endpoint data sources, and the DFA matcher itself.
//! - [`cli`] -- Command-line argument parsing with clap derive macros.
//! - [`cmd`] -- Subcommand dispatch and execution (run, init, validate,
//!   match, health).
//! - [`config`] -- Endpoint file loading, validation, and hot-reloading via
//!   the [`ConfigSource`](config::ConfigSource) trait.
//! - [`dispatch`] -- The HTTP fallback handler that answers with the match
//!   outcome.
//! - [`error`] -- Unified error types using `thiserror`.
//! - [`health`] -- `GET /health` endpoint handler returning runtime diagnostics.
//! - [`logging`] -- Structured tracing setup with JSON and pretty-print output.
//! - [`server`] -- Axum server setup, shared application state, and graceful
//!   shutdown.
//!
//! # Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `yaml` | YAML endpoint file support _(enabled by default)_ |
//! | `json` | JSON endpoint file support |
//! | `toml` | TOML endpoint file support |
//! | `file-backends` | All file formats |
//! | `full` | All features |

#![allow(clippy::missing_errors_doc)]

pub mod cli;
pub mod cmd;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod health;
pub mod logging;
pub mod routing;
pub mod server;
