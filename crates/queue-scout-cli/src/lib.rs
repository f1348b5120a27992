//! # Queue Scout CLI
//!
//! Command-line interface for inspecting message queue hosts.
//!
//! This module provides CLI commands for:
//! - Connecting to hosts and listing the queues discovered on them
//! - Probing host connectivity without registering a connection
//! - Checking whether a queue address exists
//! - Deriving journal addresses and reading journal depths
//! - Peeking messages without consuming them
//! - Watching a host with periodic snapshot refreshes
//! - Inspecting and validating the merged configuration
//!
//! Configuration is merged from an optional `config/scout.yaml`, an explicit
//! `--config` file, and `QS_*` environment variables, in that order.

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use queue_scout_core::{
    classify, ConnectError, ConnectOptions, Connection, ConnectionEvent, ConnectionManager,
    ManagerConfig, QueueAddress, QueueDiscoveryService, RefreshOptions, RetryPolicy, RetryState,
};
use queue_transport::{
    create_transport, Credentials, ProviderAddress, QueueTransport, TransportConfig,
    TransportError,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

pub mod output;

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;

// ============================================================================
// CLI Structure
// ============================================================================

/// Queue Scout command line interface
#[derive(Debug, Parser)]
#[command(name = "queue-scout")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Inspect message queue hosts, their queues, and their journals")]
#[command(
    long_about = "Queue Scout connects to message queue hosts, discovers their queues, and \
                  reports message counts, journal depths, and access problems in plain language."
)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "QUEUE_SCOUT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Logging level used when RUST_LOG is not set
    #[arg(short, long, default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Connect to hosts and list the queues discovered on them
    Inspect {
        /// Hosts to inspect, by name or IP address
        #[arg(required = true)]
        hosts: Vec<String>,

        /// Include system queues in the listing
        #[arg(short, long)]
        include_system: bool,

        /// Account name for hosts that require credentials
        #[arg(short, long)]
        username: Option<String>,

        /// Secret for the account
        #[arg(long, env = "QUEUE_SCOUT_SECRET", hide_env_values = true)]
        secret: Option<String>,

        /// Per-host deadline in seconds
        #[arg(short, long)]
        deadline: Option<u64>,

        /// Output format, defaults to the configured one
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,
    },

    /// Probe a host's connectivity without registering a connection
    Probe {
        /// Host to probe, by name or IP address
        host: String,

        /// Account name for hosts that require credentials
        #[arg(short, long)]
        username: Option<String>,

        /// Secret for the account
        #[arg(long, env = "QUEUE_SCOUT_SECRET", hide_env_values = true)]
        secret: Option<String>,

        /// Deadline in seconds
        #[arg(short, long)]
        deadline: Option<u64>,

        /// Output format, defaults to the configured one
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,
    },

    /// Check whether a queue address exists
    Exists {
        /// Queue address in path, direct, or format-name syntax
        address: String,
    },

    /// Derive the journal address for a queue
    Journal {
        /// Queue address in path, direct, or format-name syntax
        address: String,

        /// Also read the journal's message count
        #[arg(short, long)]
        count: bool,
    },

    /// Peek messages without consuming them
    Peek {
        /// Queue address in path, direct, or format-name syntax
        address: String,

        /// Maximum number of messages to show
        #[arg(short, long, default_value = "10")]
        limit: u32,

        /// Output format, defaults to the configured one
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,
    },

    /// Watch a host, refreshing its snapshot periodically
    Watch {
        /// Host to watch, by name or IP address
        host: String,

        /// Account name for hosts that require credentials
        #[arg(short, long)]
        username: Option<String>,

        /// Secret for the account
        #[arg(long, env = "QUEUE_SCOUT_SECRET", hide_env_values = true)]
        secret: Option<String>,

        /// Seconds between refreshes
        #[arg(short, long, default_value = "5")]
        interval: u64,

        /// Stop after this many refreshes instead of running until interrupted
        #[arg(short = 'n', long)]
        iterations: Option<u32>,

        /// Include system queues in each snapshot
        #[arg(long)]
        include_system: bool,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Configuration subcommands
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Print the merged configuration
    Show {
        /// Output format, `json` or `yaml`
        #[arg(short, long, value_enum, default_value = "yaml")]
        format: OutputFormat,
    },

    /// Check the merged configuration and report problems
    Validate,
}

// ============================================================================
// Output Formats
// ============================================================================

/// Output format for command results
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable lines
    Text,
    /// Pretty-printed JSON
    Json,
    /// YAML document
    Yaml,
    /// Aligned columns
    Table,
}

// ============================================================================
// Error Types
// ============================================================================

/// CLI operational errors
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration could not be loaded or was invalid
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigLoadError),

    /// A connection operation settled as failed
    #[error("Connection error: {0}")]
    Connect(#[from] ConnectError),

    /// Command execution failed
    #[error("Command failed: {message}")]
    CommandFailed { message: String },

    /// Invalid command line arguments
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A transport operation failed, reported as remediation text
    #[error("{message}")]
    Remote { message: String },
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    /// The configuration sources could not be read or merged
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    /// The merged configuration failed validation
    #[error(transparent)]
    Invalid(#[from] queue_scout_core::ConfigError),
}

// ============================================================================
// Configuration
// ============================================================================

/// Resolved CLI configuration
///
/// Every section has defaults, so an empty file and no file at all are both
/// valid starting points.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoutConfig {
    /// Connection lifecycle settings.
    pub manager: ManagerConfig,

    /// Transport backend and, for the in-memory provider, its topology.
    pub transport: TransportConfig,

    /// Output preferences.
    pub output: OutputConfig,
}

impl ScoutConfig {
    /// Check settings with inter-field constraints
    pub fn validate(&self) -> Result<(), queue_scout_core::ConfigError> {
        self.manager.validate()
    }
}

/// Output preferences
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Format used when a command is run without `--format`.
    pub default_format: OutputFormat,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            default_format: OutputFormat::Table,
        }
    }
}

// ============================================================================
// CLI Implementation
// ============================================================================

/// Parse arguments, load configuration, and run the selected command
pub async fn run_cli() -> Result<(), CliError> {
    let cli = Cli::parse();

    initialize_logging(&cli)?;

    // Completions must work before any configuration exists.
    if let Commands::Completions { shell } = &cli.command {
        let mut command = Cli::command();
        clap_complete::generate(*shell, &mut command, "queue-scout", &mut std::io::stdout());
        return Ok(());
    }

    let config = load_configuration(cli.config.as_deref())?;

    match cli.command {
        Commands::Inspect {
            hosts,
            include_system,
            username,
            secret,
            deadline,
            format,
        } => {
            execute_inspect(
                &config,
                hosts,
                include_system,
                username,
                secret,
                deadline,
                format,
            )
            .await
        }
        Commands::Probe {
            host,
            username,
            secret,
            deadline,
            format,
        } => execute_probe(&config, host, username, secret, deadline, format).await,
        Commands::Exists { address } => execute_exists(&config, address).await,
        Commands::Journal { address, count } => execute_journal(&config, address, count).await,
        Commands::Peek {
            address,
            limit,
            format,
        } => execute_peek(&config, address, limit, format).await,
        Commands::Watch {
            host,
            username,
            secret,
            interval,
            iterations,
            include_system,
        } => {
            execute_watch(
                &config,
                host,
                username,
                secret,
                interval,
                iterations,
                include_system,
            )
            .await
        }
        Commands::Config { action } => execute_config(&config, action).await,
        // Handled before configuration loading
        Commands::Completions { .. } => Ok(()),
    }
}

// ============================================================================
// Command Execution
// ============================================================================

async fn execute_inspect(
    config: &ScoutConfig,
    hosts: Vec<String>,
    include_system: bool,
    username: Option<String>,
    secret: Option<String>,
    deadline: Option<u64>,
    format: Option<OutputFormat>,
) -> Result<(), CliError> {
    info!(hosts = hosts.len(), "Inspecting hosts");

    let credentials = build_credentials(username, secret)?;
    let manager = Arc::new(build_manager(config, include_system)?);
    let format = format.unwrap_or(config.output.default_format);

    let mut tasks = Vec::new();
    for host in hosts {
        let manager = Arc::clone(&manager);
        let options = ConnectOptions {
            credentials: credentials.clone(),
            deadline: deadline.map(Duration::from_secs),
            ..ConnectOptions::default()
        };
        tasks.push(tokio::spawn(async move {
            let outcome = manager.connect(&host, options).await;
            (host, outcome)
        }));
    }

    let mut connections = Vec::new();
    let mut failures = Vec::new();
    for task in tasks {
        let (host, outcome) = task.await.map_err(|error| CliError::CommandFailed {
            message: format!("inspection task failed: {error}"),
        })?;
        match outcome {
            Ok(connection) => connections.push(connection),
            Err(error) => failures.push((host, error)),
        }
    }

    println!("{}", output::render_connections(&connections, format)?);

    for connection in &connections {
        manager.disconnect(connection.id).await?;
    }

    for (host, error) in &failures {
        eprintln!("{host}: {error}");
    }
    match failures.into_iter().next() {
        Some((_, error)) => Err(error.into()),
        None => Ok(()),
    }
}

async fn execute_probe(
    config: &ScoutConfig,
    host: String,
    username: Option<String>,
    secret: Option<String>,
    deadline: Option<u64>,
    format: Option<OutputFormat>,
) -> Result<(), CliError> {
    info!(host = %host, "Probing host");

    let credentials = build_credentials(username, secret)?;
    let manager = build_manager(config, false)?;
    let format = format.unwrap_or(config.output.default_format);

    let started = Instant::now();
    let details = manager
        .probe(&host, credentials.as_ref(), deadline.map(Duration::from_secs))
        .await?;
    let elapsed = started.elapsed();

    let report = output::ProbeReport {
        host,
        machine_name: details.machine_name,
        service_version: details.service_version,
        elapsed_ms: elapsed.as_millis() as u64,
    };
    println!("{}", output::render_probe(&report, format)?);
    Ok(())
}

async fn execute_exists(config: &ScoutConfig, address: String) -> Result<(), CliError> {
    let parsed = parse_address(&address)?;
    info!(address = %parsed, "Checking queue existence");

    let discovery = QueueDiscoveryService::new(build_transport(config)?);
    if discovery.exists(&parsed).await.map_err(remote)? {
        println!("Queue exists: {parsed}");
    } else {
        println!("Queue does not exist: {parsed}");
    }
    Ok(())
}

async fn execute_journal(config: &ScoutConfig, address: String, count: bool) -> Result<(), CliError> {
    let parsed = parse_address(&address)?;
    if parsed.is_journal() {
        return Err(CliError::InvalidArgument {
            message: format!("'{address}' is already a journal address"),
        });
    }

    let journal = parsed.derive_journal_address();
    println!("{journal}");

    if count {
        let provider = provider_address(&journal)?;
        let transport = build_transport(config)?;
        let messages = transport.message_count(&provider).await.map_err(remote)?;
        println!("Journal messages: {messages}");
    }
    Ok(())
}

async fn execute_peek(
    config: &ScoutConfig,
    address: String,
    limit: u32,
    format: Option<OutputFormat>,
) -> Result<(), CliError> {
    let parsed = parse_address(&address)?;
    info!(address = %parsed, limit, "Peeking messages");

    let provider = provider_address(&parsed)?;
    let transport = build_transport(config)?;
    let format = format.unwrap_or(config.output.default_format);

    let messages = transport.peek_messages(&provider, limit).await.map_err(remote)?;
    println!("{}", output::render_messages(&messages, format)?);
    Ok(())
}

async fn execute_watch(
    config: &ScoutConfig,
    host: String,
    username: Option<String>,
    secret: Option<String>,
    interval: u64,
    iterations: Option<u32>,
    include_system: bool,
) -> Result<(), CliError> {
    info!(host = %host, interval, "Watching host");

    let credentials = build_credentials(username, secret)?;
    let manager = build_manager(config, include_system)?;
    let mut events = manager.subscribe();

    let options = ConnectOptions {
        credentials,
        ..ConnectOptions::default()
    };
    let connection =
        connect_with_retry(&manager, &host, options, &config.manager.retry_policy()).await?;
    println!("{}", output::render_watch_header(&connection));

    let refresh_options = RefreshOptions {
        include_system_queues: include_system || config.manager.include_system_queues,
        ..RefreshOptions::default()
    };
    let interval = Duration::from_secs(interval.max(1));
    let mut completed = 0u32;

    loop {
        tokio::select! {
            _ = tokio::time::sleep(interval) => {
                match manager.refresh(connection.id, refresh_options.clone()).await {
                    Ok(refreshed) => println!("{}", output::render_refresh(&refreshed)),
                    Err(error) => eprintln!("refresh failed: {error}"),
                }
                completed += 1;
                if let Some(limit) = iterations {
                    if completed >= limit {
                        break;
                    }
                }
            }
            event = events.recv() => {
                match event {
                    // The refresh branch already printed this snapshot.
                    Ok(ConnectionEvent::Refreshed { .. }) => {}
                    Ok(event) => println!("{}", output::render_event(&event)),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Event stream lagged, some updates were dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            signal = tokio::signal::ctrl_c() => {
                signal?;
                info!("Watch interrupted");
                break;
            }
        }
    }

    manager.disconnect(connection.id).await?;
    Ok(())
}

/// Dial a host, spacing reconnect attempts with the configured backoff
///
/// Only settled connect failures are retried; any other error, including the
/// manager refusing further attempts, ends the loop at once.
async fn connect_with_retry(
    manager: &ConnectionManager,
    host: &str,
    options: ConnectOptions,
    policy: &RetryPolicy,
) -> Result<Connection, ConnectError> {
    let mut state = RetryState::new();
    loop {
        let error = match manager.connect(host, options.clone()).await {
            Ok(connection) => return Ok(connection),
            Err(error @ ConnectError::Failed { .. }) => error,
            Err(error) => return Err(error),
        };

        // The initial failure consumed one slot of the shared budget, so the
        // manager admits one reconnect fewer than the policy ceiling.
        if !policy.should_retry(state.attempt + 1) {
            return Err(error);
        }

        let delay = state.delay(policy);
        warn!(
            host = %host,
            attempt = state.attempt + 1,
            delay_ms = delay.as_millis() as u64,
            error = %error,
            "Connect failed, retrying"
        );
        tokio::time::sleep(delay).await;
        state.next_attempt();
    }
}

async fn execute_config(config: &ScoutConfig, action: ConfigCommands) -> Result<(), CliError> {
    match action {
        ConfigCommands::Show { format } => {
            let rendered = match format {
                OutputFormat::Json => output::to_json(config)?,
                OutputFormat::Yaml => output::to_yaml(config)?,
                OutputFormat::Text | OutputFormat::Table => {
                    return Err(CliError::InvalidArgument {
                        message: "config show supports only 'json' and 'yaml' formats".to_string(),
                    })
                }
            };
            println!("{rendered}");
            Ok(())
        }
        ConfigCommands::Validate => {
            // Validation happens while loading, so reaching this point means
            // the merged configuration is sound.
            println!("Configuration is valid");
            Ok(())
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn initialize_logging(cli: &Cli) -> Result<(), CliError> {
    let directives = format!(
        "queue_scout={level},queue_scout_cli={level},queue_scout_core={level},queue_transport={level}",
        level = cli.log_level
    );
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives));

    // Logs go to stderr so piped output stays machine-readable.
    if cli.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init()
    }
    .map_err(|error| CliError::CommandFailed {
        message: format!("could not initialize logging: {error}"),
    })
}

/// Merge configuration from the default location, an explicit file, and the
/// environment
///
/// Later sources override earlier ones. The explicit file must exist when
/// given; the default location is optional.
fn load_configuration(explicit: Option<&Path>) -> Result<ScoutConfig, ConfigLoadError> {
    let mut builder = config::Config::builder().add_source(
        config::File::with_name("config/scout")
            .format(config::FileFormat::Yaml)
            .required(false),
    );

    if let Some(path) = explicit {
        builder = builder.add_source(config::File::with_name(&path.to_string_lossy()).required(true));
    }

    // Environment variables override file values, e.g.
    // QS_MANAGER__MAX_CONCURRENT_PROBES=8
    let merged = builder
        .add_source(
            config::Environment::with_prefix("QS")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let scout: ScoutConfig = merged.try_deserialize()?;
    scout.validate()?;
    Ok(scout)
}

fn build_transport(config: &ScoutConfig) -> Result<Arc<dyn QueueTransport>, CliError> {
    let transport = create_transport(config.transport.clone()).map_err(remote)?;
    Ok(Arc::from(transport))
}

fn build_manager(config: &ScoutConfig, include_system: bool) -> Result<ConnectionManager, CliError> {
    let mut manager_config = config.manager.clone();
    if include_system {
        manager_config.include_system_queues = true;
    }
    let transport = build_transport(config)?;
    Ok(ConnectionManager::new(transport, manager_config))
}

fn build_credentials(
    username: Option<String>,
    secret: Option<String>,
) -> Result<Option<Credentials>, CliError> {
    match username {
        Some(username) => {
            let credentials = Credentials::new(username, secret.unwrap_or_default()).map_err(
                |error| CliError::InvalidArgument {
                    message: error.to_string(),
                },
            )?;
            Ok(Some(credentials))
        }
        None if secret.is_some() => Err(CliError::InvalidArgument {
            message: "a secret requires a username".to_string(),
        }),
        None => Ok(None),
    }
}

fn parse_address(input: &str) -> Result<QueueAddress, CliError> {
    QueueAddress::parse(input).map_err(|error| CliError::InvalidArgument {
        message: error.to_string(),
    })
}

fn provider_address(address: &QueueAddress) -> Result<ProviderAddress, CliError> {
    address
        .to_provider_address()
        .map_err(|error| CliError::InvalidArgument {
            message: error.to_string(),
        })
}

fn remote(error: TransportError) -> CliError {
    CliError::Remote {
        message: classify(&error),
    }
}
