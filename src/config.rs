//! Configuration module for hash-echo-check.
//!
//! Supports both command-line arguments and TOML configuration file.
//! CLI arguments take precedence over config file values, which take
//! precedence over the built-in defaults.

use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Payloads sent when neither the CLI nor the config file supplies any.
pub const DEFAULT_PAYLOADS: [&str; 3] = [
    r#"{"message": "Hello, World!", "timestamp": 1234567890}"#,
    r#"{"user": "test", "action": "login", "success": true}"#,
    r#"{"data": [1, 2, 3, 4, 5], "metadata": {"count": 5}}"#,
];

const DEFAULT_STREAM_TARGET: &str = "localhost:5555";
const DEFAULT_REQREP_TARGET: &str = "tcp://localhost:5555";

/// Largest reply buffer the stream transport will allocate.
pub const MAX_READ_BUFFER_SIZE: usize = 16 * 1024 * 1024; // 16MB

/// Command-line arguments for the checker
#[derive(Parser, Debug)]
#[command(name = "hash-echo-check")]
#[command(author = "hash-echo-check authors")]
#[command(version = "0.1.0")]
#[command(about = "Verify that a server echoes the MD5 of each payload", long_about = None)]
pub struct CliArgs {
    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Server to check (host:port for stream, endpoint URI for reqrep)
    #[arg(short, long)]
    pub target: Option<String>,

    /// Transport to use (stream, reqrep)
    #[arg(short = 'T', long)]
    pub transport: Option<TransportKind>,

    /// Payload to send; repeat to send several. Replaces the default list.
    #[arg(short, long = "payload")]
    pub payloads: Vec<String>,

    /// Per-operation timeout in milliseconds (0 = wait forever)
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Maximum reply size read by the stream transport
    #[arg(long)]
    pub read_buffer_size: Option<usize>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

/// How payloads reach the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum TransportKind {
    /// Plain TCP, one connection per payload.
    #[default]
    Stream,
    /// ZeroMQ REQ socket, reused for the whole run.
    ReqRep,
}

impl TransportKind {
    /// Target used when none is configured.
    pub fn default_target(self) -> &'static str {
        match self {
            TransportKind::Stream => DEFAULT_STREAM_TARGET,
            TransportKind::ReqRep => DEFAULT_REQREP_TARGET,
        }
    }
}

impl FromStr for TransportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "stream" | "tcp" => Ok(TransportKind::Stream),
            "reqrep" | "zmq" => Ok(TransportKind::ReqRep),
            other => Err(format!(
                "unknown transport '{other}' (expected 'stream' or 'reqrep')"
            )),
        }
    }
}

impl TryFrom<String> for TransportKind {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// TOML configuration file structure
#[derive(Debug, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub target: TargetConfig,
    #[serde(default)]
    pub check: CheckConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where and how to connect
#[derive(Debug, Deserialize, Default)]
pub struct TargetConfig {
    /// Address or endpoint URI of the server
    pub endpoint: Option<String>,
    /// Transport kind
    pub transport: Option<TransportKind>,
}

/// What to send and how long to wait
#[derive(Debug, Deserialize)]
pub struct CheckConfig {
    #[serde(default = "default_payloads")]
    pub payloads: Vec<String>,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_read_buffer_size")]
    pub read_buffer_size: usize,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            payloads: default_payloads(),
            timeout_ms: default_timeout_ms(),
            read_buffer_size: default_read_buffer_size(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_payloads() -> Vec<String> {
    DEFAULT_PAYLOADS.iter().map(|p| p.to_string()).collect()
}

fn default_timeout_ms() -> u64 {
    5000
}

fn default_read_buffer_size() -> usize {
    1024
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Final resolved configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub target: String,
    pub transport: TransportKind,
    pub payloads: Vec<String>,
    /// `None` blocks indefinitely.
    pub timeout: Option<Duration>,
    pub read_buffer_size: usize,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self::merge(
            CliArgs {
                config: None,
                target: None,
                transport: None,
                payloads: Vec::new(),
                timeout_ms: None,
                read_buffer_size: None,
                log_level: default_log_level(),
            },
            TomlConfig::default(),
        )
    }
}

impl Config {
    /// Load configuration from CLI args and optional TOML file.
    pub fn load() -> Result<Self, ConfigError> {
        let cli = CliArgs::parse();

        let toml_config = if let Some(ref config_path) = cli.config {
            let contents = std::fs::read_to_string(config_path)
                .map_err(|e| ConfigError::FileRead(config_path.clone(), e))?;
            toml::from_str(&contents)
                .map_err(|e| ConfigError::TomlParse(config_path.clone(), e))?
        } else {
            TomlConfig::default()
        };

        let config = Self::merge(cli, toml_config);
        config.validate()?;
        Ok(config)
    }

    /// Merge CLI args over TOML values (CLI takes precedence).
    fn merge(cli: CliArgs, toml_config: TomlConfig) -> Self {
        let transport = cli
            .transport
            .or(toml_config.target.transport)
            .unwrap_or_default();

        let timeout_ms = cli.timeout_ms.unwrap_or(toml_config.check.timeout_ms);

        Config {
            target: cli
                .target
                .or(toml_config.target.endpoint)
                .unwrap_or_else(|| transport.default_target().to_string()),
            transport,
            payloads: if cli.payloads.is_empty() {
                toml_config.check.payloads
            } else {
                cli.payloads
            },
            timeout: (timeout_ms > 0).then(|| Duration::from_millis(timeout_ms)),
            read_buffer_size: cli
                .read_buffer_size
                .unwrap_or(toml_config.check.read_buffer_size),
            log_level: if cli.log_level != "info" {
                cli.log_level
            } else {
                toml_config.logging.level
            },
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.read_buffer_size == 0 {
            return Err(ConfigError::Invalid(
                "read_buffer_size must be greater than zero".to_string(),
            ));
        }
        if self.read_buffer_size > MAX_READ_BUFFER_SIZE {
            return Err(ConfigError::Invalid(format!(
                "read_buffer_size {} exceeds the {MAX_READ_BUFFER_SIZE} byte limit",
                self.read_buffer_size
            )));
        }
        if self.payloads.is_empty() {
            return Err(ConfigError::Invalid("no payloads to send".to_string()));
        }
        Ok(())
    }
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{}': {1}", .0.display())]
    FileRead(PathBuf, #[source] std::io::Error),
    #[error("Failed to parse config file '{}': {1}", .0.display())]
    TomlParse(PathBuf, #[source] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
