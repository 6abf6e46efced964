//! tinycache - A Minimal In-Memory Cache Server
//!
//! This is the main entry point for the tinycache server.
//! It sets up logging, starts the server, and shuts it down gracefully when
//! the process is asked to stop.

use anyhow::Context;
use std::sync::Arc;
use tinycache::server::{Server, ServerConfig};
use tinycache::storage::Store;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Command-line configuration
struct Config {
    /// Host to bind to
    host: String,
    /// Port to listen on
    port: u16,
    /// Maximum request size in bytes
    buffer_size: usize,
    /// Default log filter when RUST_LOG is unset
    log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: tinycache::DEFAULT_HOST.to_string(),
            port: tinycache::DEFAULT_PORT,
            buffer_size: tinycache::protocol::DEFAULT_MAX_REQUEST_SIZE,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Parse configuration from command-line arguments
    fn from_args() -> Self {
        let mut config = Config::default();
        let args: Vec<String> = std::env::args().collect();

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--host" | "-h" => {
                    config.host = required_value(&args, i, "--host").to_string();
                    i += 2;
                }
                "--port" | "-p" => {
                    config.port = required_value(&args, i, "--port")
                        .parse::<u16>()
                        .unwrap_or_else(|_| {
                            eprintln!("Error: invalid port number");
                            std::process::exit(1);
                        });
                    i += 2;
                }
                "--buffer-size" | "-b" => {
                    config.buffer_size = required_value(&args, i, "--buffer-size")
                        .parse::<usize>()
                        .ok()
                        .filter(|size| *size > 0)
                        .unwrap_or_else(|| {
                            eprintln!("Error: invalid buffer size");
                            std::process::exit(1);
                        });
                    i += 2;
                }
                "--log-level" => {
                    config.log_level = required_value(&args, i, "--log-level").to_string();
                    i += 2;
                }
                "--help" => {
                    print_help();
                    std::process::exit(0);
                }
                "--version" | "-v" => {
                    println!("tinycache version {}", tinycache::VERSION);
                    std::process::exit(0);
                }
                _ => {
                    eprintln!("Unknown argument: {}", args[i]);
                    print_help();
                    std::process::exit(1);
                }
            }
        }

        config
    }

    /// Returns the bind address as a string
    fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    fn server_config(&self) -> ServerConfig {
        ServerConfig::default()
            .with_addr(self.bind_address())
            .with_read_buffer_size(self.buffer_size)
    }
}

/// Returns the value following the flag at `i`, or exits.
fn required_value<'a>(args: &'a [String], i: usize, flag: &str) -> &'a str {
    match args.get(i + 1) {
        Some(value) => value,
        None => {
            eprintln!("Error: {} requires a value", flag);
            std::process::exit(1);
        }
    }
}

fn print_help() {
    println!(
        r#"
tinycache - A Minimal In-Memory Cache Server

USAGE:
    tinycache [OPTIONS]

OPTIONS:
    -h, --host <HOST>          Host to bind to (default: localhost)
    -p, --port <PORT>          Port to listen on (default: 11211)
    -b, --buffer-size <BYTES>  Maximum request size (default: 1024)
        --log-level <LEVEL>    Log filter when RUST_LOG is unset (default: info)
    -v, --version              Print version information
        --help                 Print this help message

PROTOCOL:
    One request per connection, CRLF-terminated:
    $ printf 'SET foo foo value\r\n' | nc localhost 11211
    STORED
    $ printf 'GET foo\r\n' | nc localhost 11211
    foo value
    ENDS
"#
    );
}

/// Waits for SIGINT, SIGTERM or SIGHUP.
#[cfg(unix)]
async fn wait_for_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    let mut hangup = signal(SignalKind::hangup())?;

    tokio::select! {
        result = tokio::signal::ctrl_c() => result?,
        _ = terminate.recv() => {}
        _ = hangup.recv() => {}
    }
    Ok(())
}

/// Waits for Ctrl+C.
#[cfg(not(unix))]
async fn wait_for_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command-line arguments
    let config = Config::from_args();

    // Set up logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    info!(
        version = tinycache::VERSION,
        addr = %config.bind_address(),
        buffer_size = config.buffer_size,
        "Starting tinycache"
    );

    // The store lives as long as the process
    let storage = Arc::new(Store::new());

    let server = Server::start(config.server_config(), storage)
        .await
        .context("cannot start server")?;

    wait_for_signal()
        .await
        .context("cannot install signal handlers")?;
    info!("Shutdown signal received, stopping server...");

    server.shutdown().await;

    info!("Server shutdown complete");
    Ok(())
}
