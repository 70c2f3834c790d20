//! Configuration module for the demo server
//!
//! Configuration is loaded with the following priority (highest first):
//! 1. Command line arguments
//! 2. Environment variables (prefixed with MULTIBIN_)
//! 3. Configuration file (multibin.toml or multibin.yaml)
//! 4. Default values

use std::path::PathBuf;

use clap::Parser;
use config::{ConfigError, Environment, File};
use serde::Deserialize;

/// Default host to bind to
const DEFAULT_HOST: &str = "localhost";
/// Default port
const DEFAULT_PORT: u16 = 8080;
/// Default log level
const DEFAULT_LOG_LEVEL: &str = "info";

/// Command line arguments for the `server` binary
#[derive(Parser, Debug, Default)]
#[command(name = "server")]
#[command(about = "Example Server - Multi-binary demo")]
#[command(disable_version_flag = true)]
pub struct ServerArgs {
    /// Show version information
    #[arg(long)]
    pub version: bool,

    /// Server host
    #[arg(long, env = "MULTIBIN_HOST")]
    pub host: Option<String>,

    /// Server port
    #[arg(short, long, env = "MULTIBIN_PORT")]
    pub port: Option<u16>,

    /// Log level (debug, info, warn, error)
    #[arg(long, env = "MULTIBIN_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Path to configuration file
    #[arg(short, long, env = "MULTIBIN_CONFIG")]
    pub config: Option<PathBuf>,
}

/// File-based configuration (for TOML/YAML)
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct FileConfig {
    host: Option<String>,
    port: Option<u16>,
    log_level: Option<String>,
}

/// Configuration for the demo server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Host to bind the server to
    pub host: String,

    /// Port to bind the server to
    pub port: u16,

    /// Requested log level, parsed by [`crate::logging::init`]
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl ServerConfig {
    /// Create a new configuration with explicit host and port
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            host: host.to_string(),
            port,
            ..Self::default()
        }
    }

    /// Load configuration from already-parsed CLI args (CLI > env > file > defaults)
    pub fn load_from_args(args: ServerArgs) -> Result<Self, ConfigError> {
        let mut config = ServerConfig::default();

        let file_config = Self::load_file_config(&args.config)?;

        // File overrides defaults
        if let Some(h) = file_config.host {
            config.host = h;
        }
        if let Some(p) = file_config.port {
            config.port = p;
        }
        if let Some(level) = file_config.log_level {
            config.log_level = level;
        }

        // CLI overrides everything
        if let Some(h) = args.host {
            config.host = h;
        }
        if let Some(p) = args.port {
            config.port = p;
        }
        if let Some(level) = args.log_level {
            config.log_level = level;
        }

        Ok(config)
    }

    fn load_file_config(config_path: &Option<PathBuf>) -> Result<FileConfig, ConfigError> {
        let mut builder = config::Config::builder();

        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path.as_path()));
        } else {
            builder = builder.add_source(File::with_name("multibin").required(false));
        }

        builder = builder.add_source(Environment::with_prefix("MULTIBIN").try_parsing(true));

        let settings = builder.build()?;
        settings.try_deserialize()
    }

    /// Get the `host:port` address for binding
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
