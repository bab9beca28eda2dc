//! # queue-bridge CLI
//!
//! Operator tool over the queue-bridge library.
//!
//! This module provides CLI commands for:
//! - Sending a message, optionally with attributes
//! - Receiving messages and printing them as JSON lines
//! - Validating and printing the resolved configuration

use clap::{Parser, Subcommand};
use queue_bridge::{
    Attributes, ConfigurationError, MessageConsumer, MessageProducer, QueueClientFactory,
    QueueConfig, QueueError,
};
use serde_json::Value;
use std::io::Write;
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;

/// Default prefix for configuration environment variables
pub const DEFAULT_ENV_PREFIX: &str = "QUEUE_BRIDGE";

// ============================================================================
// CLI Structure
// ============================================================================

/// queue-bridge CLI - send and receive messages through any configured provider
#[derive(Parser, Debug)]
#[command(name = "queue-bridge")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Send and receive messages through SQS, SNS or an in-memory queue")]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "QUEUE_BRIDGE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Prefix of environment variables that override the file
    #[arg(long, default_value = DEFAULT_ENV_PREFIX)]
    pub env_prefix: String,

    /// Logging level, used when RUST_LOG is not set
    #[arg(short, long, default_value = "info")]
    pub log_level: String,

    /// Enable JSON logging
    #[arg(long)]
    pub json_logs: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Send a single message
    Send {
        /// Message body
        body: String,

        /// Message attribute as key=value; values are parsed as JSON scalars
        #[arg(short, long = "attr", value_parser = parse_attribute)]
        attributes: Vec<(String, Value)>,
    },

    /// Receive messages and print them as JSON lines
    Receive {
        /// Number of receive calls to make
        #[arg(short, long, default_value = "1")]
        batches: u32,

        /// Seconds to wait for messages on each call
        #[arg(short, long, default_value = "10")]
        wait: u32,

        /// Acknowledge every printed message
        #[arg(long)]
        ack: bool,
    },

    /// Validate configuration and print it
    Config {
        /// Output format for configuration
        #[arg(short, long, default_value = "yaml")]
        format: ConfigFormat,
    },
}

/// Configuration format options
#[derive(Clone, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum ConfigFormat {
    /// YAML format
    Yaml,
    /// JSON format
    Json,
}

// ============================================================================
// CLI Error Types
// ============================================================================

/// CLI-specific errors
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("Invalid argument: {arg} - {message}")]
    InvalidArgument { arg: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Output formatting failed: {message}")]
    Output { message: String },

    #[error("Logging setup failed: {message}")]
    Logging { message: String },
}

impl CliError {
    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Configuration(_) => 1,
            Self::Queue(_) => 2,
            Self::InvalidArgument { .. } => 3,
            Self::Io(_) => 4,
            Self::Output { .. } => 5,
            Self::Logging { .. } => 6,
        }
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::Output {
            message: e.to_string(),
        }
    }
}

impl From<serde_yaml::Error> for CliError {
    fn from(e: serde_yaml::Error) -> Self {
        Self::Output {
            message: e.to_string(),
        }
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

/// Main CLI entry point
pub async fn run_cli() -> Result<(), CliError> {
    let cli = Cli::parse();

    initialize_logging(&cli)?;

    let config = load_configuration(&cli)?;
    let factory = QueueClientFactory::new();
    let mut stdout = std::io::stdout();

    execute(cli.command, &config, &factory, &mut stdout).await
}

/// Install the tracing subscriber. Logs go to stderr so stdout stays parseable.
pub fn initialize_logging(cli: &Cli) -> Result<(), CliError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cli.log_level))
        .map_err(|e| CliError::InvalidArgument {
            arg: "log-level".to_string(),
            message: e.to_string(),
        })?;

    let registry = tracing_subscriber::registry().with(filter);
    let result = if cli.json_logs {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()
    };

    result.map_err(|e| CliError::Logging {
        message: e.to_string(),
    })
}

/// Load configuration from the optional file and the environment
pub fn load_configuration(cli: &Cli) -> Result<QueueConfig, CliError> {
    let config = QueueConfig::load(cli.config.as_deref(), &cli.env_prefix)?;
    debug!(provider = %config.provider(), "Configuration loaded");
    Ok(config)
}

/// Run a command against the given configuration, writing results to `out`
pub async fn execute<W: Write>(
    command: Commands,
    config: &QueueConfig,
    factory: &QueueClientFactory,
    out: &mut W,
) -> Result<(), CliError> {
    match command {
        Commands::Send { body, attributes } => {
            execute_send_command(body, attributes, config, factory).await
        }
        Commands::Receive { batches, wait, ack } => {
            execute_receive_command(batches, wait, ack, config, factory, out).await
        }
        Commands::Config { format } => execute_config_command(format, config, out),
    }
}

// ============================================================================
// Command Implementations
// ============================================================================

/// Parse a `key=value` attribute argument.
///
/// JSON scalars (`10`, `true`, `"quoted"`) keep their type; anything else,
/// including unquoted text, is sent as a string.
pub fn parse_attribute(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{}'", raw))?;

    let key = key.trim();
    if key.is_empty() {
        return Err(format!("attribute key is empty in '{}'", raw));
    }

    let value = match serde_json::from_str::<Value>(value) {
        Ok(parsed @ (Value::String(_) | Value::Number(_) | Value::Bool(_))) => parsed,
        _ => Value::String(value.to_string()),
    };

    Ok((key.to_string(), value))
}

async fn execute_send_command(
    body: String,
    attributes: Vec<(String, Value)>,
    config: &QueueConfig,
    factory: &QueueClientFactory,
) -> Result<(), CliError> {
    let producer = factory.create_producer(config).await?;
    let attributes: Attributes = attributes.into_iter().collect();

    let result = if attributes.is_empty() {
        producer.send(&body).await
    } else {
        producer.send_with_attributes(&body, &attributes).await
    };
    producer.close().await;
    result?;

    info!(
        provider = %config.provider(),
        attribute_count = attributes.len(),
        "Message sent"
    );
    Ok(())
}

async fn execute_receive_command<W: Write>(
    batches: u32,
    wait: u32,
    ack: bool,
    config: &QueueConfig,
    factory: &QueueClientFactory,
    out: &mut W,
) -> Result<(), CliError> {
    let consumer = factory.create_consumer(config).await?;

    let result = receive_batches(&consumer, batches, wait, ack, out).await;
    consumer.close().await;

    let received = result?;
    info!(
        provider = %config.provider(),
        count = received,
        acknowledged = ack,
        "Receive finished"
    );
    Ok(())
}

async fn receive_batches<C: MessageConsumer, W: Write>(
    consumer: &C,
    batches: u32,
    wait: u32,
    ack: bool,
    out: &mut W,
) -> Result<usize, CliError> {
    let mut received = 0;

    for _ in 0..batches {
        let messages = consumer.receive_with_timeout(wait).await?;
        for message in &messages {
            serde_json::to_writer(&mut *out, message)?;
            writeln!(out)?;

            if ack {
                consumer.acknowledge(message).await?;
            }
        }
        received += messages.len();
    }

    out.flush()?;
    Ok(received)
}

fn execute_config_command<W: Write>(
    format: ConfigFormat,
    config: &QueueConfig,
    out: &mut W,
) -> Result<(), CliError> {
    let rendered = match format {
        ConfigFormat::Yaml => serde_yaml::to_string(config)?,
        ConfigFormat::Json => serde_json::to_string_pretty(config)?,
    };

    writeln!(out, "{}", rendered.trim_end())?;
    Ok(())
}
