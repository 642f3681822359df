//! Command-line interface definitions using clap derive macros.
//!
//! Contains the top-level [`Cli`] parser, the [`Commands`] enum for
//! subcommands (run, init, validate, match, health), and their associated
//! argument structs. Server flags have an environment variable equivalent
//! for container deployments.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(
    name = "waypoint",
    version,
    about = "DFA-based HTTP endpoint matcher",
    propagate_version = true,
    after_help = "\x1b[1mQuick start:\x1b[0m\n  \
        waypoint init                          Create a starter endpoint file\n  \
        waypoint match /products/42            Resolve a path against ./waypoint.yaml\n  \
        waypoint run                           Serve matches over HTTP\n  \
        waypoint run -c endpoints.yaml         Start with a specific endpoint file"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the matching server
    Run(Box<RunArgs>),

    /// Generate a starter endpoint file
    Init(InitArgs),

    /// Validate an endpoint file without starting
    Validate(ValidateArgs),

    /// Resolve a single request against an endpoint file
    Match(MatchArgs),

    /// Check health of a running instance
    Health(HealthArgs),
}

#[derive(Args)]
#[command(after_help = "\x1b[1mExamples:\x1b[0m\n  \
        waypoint run                                       Auto-detect endpoint file\n  \
        waypoint run -c endpoints.yaml                     Specific endpoint file\n  \
        waypoint run -c endpoints.yaml -p 8080 --pretty    Local dev mode\n  \
        waypoint run -c live.yaml --fallback last.yaml     Fall back when live.yaml is broken")]
pub struct RunArgs {
    /// Endpoint file path (.yaml, .json, .toml)
    #[arg(short, long, env = "WAYPOINT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Endpoint file used when the primary one cannot be loaded
    #[arg(long, env = "WAYPOINT_FALLBACK_CONFIG")]
    pub fallback: Option<PathBuf>,

    /// Listen port
    #[arg(short, long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// Listen address
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    // -- Logging --
    /// Log level
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: LogLevel,

    /// Force pretty (human-readable) log output
    #[arg(long)]
    pub pretty: bool,

    /// Force JSON log output (overrides TTY detection)
    #[arg(long, conflicts_with = "pretty")]
    pub json: bool,

    // -- Tuning --
    /// Max request body size in bytes
    #[arg(
        long,
        env = "MAX_BODY_SIZE",
        default_value_t = 1_048_576,
        help_heading = "Tuning"
    )]
    pub max_body: usize,

    /// Endpoint file refresh interval in seconds (0 disables reloading)
    #[arg(
        long,
        env = "POLL_INTERVAL_SECS",
        default_value_t = 5,
        help_heading = "Tuning"
    )]
    pub poll_interval: u64,
}

#[derive(Args)]
#[command(after_help = "\x1b[1mExamples:\x1b[0m\n  \
        waypoint init                             Minimal endpoint file (yaml)\n  \
        waypoint init --full                      Documented endpoint file\n  \
        waypoint init -f toml -o routes.toml      TOML format")]
pub struct InitArgs {
    /// Output format
    #[arg(short, long, default_value = "yaml")]
    pub format: ConfigFormat,

    /// Output file path
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Include full documentation as comments
    #[arg(long)]
    pub full: bool,
}

#[derive(Args)]
pub struct ValidateArgs {
    /// Endpoint file to validate
    #[arg(default_value = "waypoint.yaml")]
    pub config: PathBuf,

    /// Output format
    #[arg(long, default_value = "text")]
    pub format: ValidateFormat,
}

#[derive(Args)]
#[command(after_help = "\x1b[1mExamples:\x1b[0m\n  \
        waypoint match /products/42\n  \
        waypoint match /upload -X POST --content-type application/json\n  \
        waypoint match /api --host api.example.com:8080 --json")]
pub struct MatchArgs {
    /// Request path, e.g. /products/42
    pub path: String,

    /// Endpoint file
    #[arg(short, long, default_value = "waypoint.yaml")]
    pub config: PathBuf,

    /// Request method
    #[arg(short = 'X', long, default_value = "GET")]
    pub method: String,

    /// Request host, `host[:port]`
    #[arg(long)]
    pub host: Option<String>,

    /// Request content type
    #[arg(long)]
    pub content_type: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct HealthArgs {
    /// URL of the running instance
    #[arg(default_value = "http://localhost:3000")]
    pub url: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    #[must_use]
    pub const fn to_tracing_level(&self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

#[derive(Clone, Debug, ValueEnum)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

impl ConfigFormat {
    #[must_use]
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Yaml => "yaml",
            Self::Json => "json",
            Self::Toml => "toml",
        }
    }
}

#[derive(Clone, Debug, ValueEnum)]
pub enum ValidateFormat {
    Text,
    Json,
}
