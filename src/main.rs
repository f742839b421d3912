//! toxirc - IRC side of the Tox <-> IRC bridge

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tokio::time::sleep;
use toxirc_core::{read_line, Backoff, LineReader, Session, Settings};
use tracing::{debug, error, info, warn};

/// Group number the default channel is bridged to
const DEFAULT_GROUP: u32 = 0;

/// toxirc - relays messages between Tox group chats and IRC channels
#[derive(Parser)]
#[command(name = "toxirc")]
#[command(about = "IRC side of a Tox <-> IRC bridge bot")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "toxirc.toml")]
    config: PathBuf,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Test configuration and exit
    #[arg(long)]
    test_config: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a default configuration file
    Config {
        /// Output file path
        #[arg(short, long, default_value = "toxirc.toml")]
        output: PathBuf,
    },
    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Some(command) = cli.command {
        match command {
            Commands::Config { output } => {
                generate_config(&output)?;
                return Ok(());
            }
            Commands::Version => {
                println!("toxirc {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
        }
    }

    let settings = if cli.config.exists() {
        Settings::from_file(&cli.config)?
    } else {
        Settings::default()
    };

    init_logging(&cli.log_level, settings.bot.verbose);

    if cli.config.exists() {
        info!("Loaded configuration from {:?}", cli.config);
    } else {
        info!("Configuration file not found, using defaults");
    }

    settings.validate()?;
    if cli.test_config {
        info!("Configuration is valid");
        return Ok(());
    }

    run(settings).await
}

/// Keep the session alive until interrupted
async fn run(settings: Settings) -> anyhow::Result<()> {
    let mut backoff = Backoff::new(
        settings.irc.reconnect_base_delay(),
        settings.irc.reconnect_max_delay(),
    );

    let mut session = Session::new(&settings);
    if !settings.bot.default_channel.is_empty() {
        // Recorded now, sent by the first successful connect below
        match session.join_channel(&settings.bot.default_channel, DEFAULT_GROUP).await {
            Ok(()) => {}
            Err(e) if e.is_connection_loss() => {
                debug!("Default channel queued until connected: {}", e)
            }
            Err(e) => error!("Could not add default channel: {}", e),
        }
    }

    loop {
        if !session.is_connected() {
            match session.reconnect().await {
                Ok(()) => backoff.reset(),
                Err(e) => {
                    let delay = backoff.next_delay();
                    if e.is_connection_loss() {
                        warn!("Connection failed: {}. Retrying in {:?}", e, delay);
                    } else {
                        error!("Could not connect: {}. Retrying in {:?}", e, delay);
                    }
                    tokio::select! {
                        _ = sleep(delay) => continue,
                        _ = tokio::signal::ctrl_c() => break,
                    }
                }
            }
        }

        let reader = match session.take_reader() {
            Some(reader) => reader,
            None => {
                warn!("No inbound stream for current connection, reconnecting");
                session.disconnect().await;
                continue;
            }
        };

        tokio::select! {
            result = watch(reader) => {
                match result {
                    Ok(()) => warn!("Connection to {} closed by server", settings.irc.server),
                    Err(e) if e.is_connection_loss() => {
                        warn!("Connection to {} lost: {}", settings.irc.server, e)
                    }
                    Err(e) => error!("Error reading from {}: {}", settings.irc.server, e),
                }
                session.disconnect().await;
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    info!("Shutting down");
    if let Err(e) = session.leave_all_channels().await {
        warn!("Could not leave channels cleanly: {}", e);
    }
    session.close().await;
    Ok(())
}

/// Read inbound lines until the server closes the connection
async fn watch(mut reader: LineReader) -> toxirc_core::Result<()> {
    while let Some(line) = read_line(&mut reader).await? {
        debug!("<- {}", line);
    }
    Ok(())
}

/// Initialize logging
fn init_logging(level: &str, verbose: bool) {
    let log_level = match level.to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "warn" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ if verbose => tracing::Level::DEBUG,
        _ => tracing::Level::INFO,
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(true)
        .init();
}

/// Generate default configuration file
fn generate_config(output: &Path) -> anyhow::Result<()> {
    Settings::default().to_file(output)?;
    println!("Generated default configuration file: {:?}", output);
    Ok(())
}
