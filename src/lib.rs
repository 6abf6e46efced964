//! # tinycache - A Minimal In-Memory Cache Server
//!
//! tinycache is an in-memory key-value cache that speaks a small
//! memcached-style text protocol over TCP. Each connection carries one
//! `GET` or `SET` request; the server answers and closes the connection.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                            tinycache                             │
//! │                                                                  │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐           │
//! │  │ Accept Loop │───>│ Connection  │───>│  Command    │           │
//! │  │  (Server)   │    │  Handler    │    │  Handler    │           │
//! │  └──────┬──────┘    └──────┬──────┘    └──────┬──────┘           │
//! │         │                  │                  │                  │
//! │         ▼                  ▼                  ▼                  │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐           │
//! │  │  Shutdown   │    │  Request    │    │   Store     │           │
//! │  │  Watcher    │    │  Parser     │    │             │           │
//! │  └─────────────┘    └─────────────┘    └─────────────┘           │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```no_run
//! use tinycache::server::{Server, ServerConfig};
//! use tinycache::storage::Store;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let server = Server::start(ServerConfig::default(), Arc::new(Store::new())).await?;
//!
//!     tokio::signal::ctrl_c().await?;
//!     server.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Protocol
//!
//! | Request                    | Response                               |
//! |----------------------------|----------------------------------------|
//! | `GET <key>\r\n`            | `<value>\r\nENDS\r\n` or `ENDS\r\n`    |
//! | `SET <key> <value...>\r\n` | `STORED\r\n`                           |
//! | invalid request            | `CLIENT_ERROR <message>\r\n`           |
//!
//! ## Module Overview
//!
//! - [`protocol`]: Request parser, request/response types
//! - [`storage`]: The in-memory store
//! - [`commands`]: GET/SET execution
//! - [`connection`]: Per-connection read/parse/execute/respond
//! - [`server`]: Listener, accept loop and graceful shutdown
//!
//! ## Design Highlights
//!
//! ### One Request at a Time
//!
//! The accept loop handles each connection to completion before accepting
//! the next one. The store therefore never sees concurrent writers. This is
//! also the main scalability limit of the design.
//!
//! ### Graceful Shutdown
//!
//! [`Server::shutdown`](server::Server::shutdown) closes the listener, waits
//! for the in-flight request to finish, and only returns once the server has
//! terminated.

pub mod commands;
pub mod connection;
pub mod protocol;
pub mod server;
pub mod storage;

// Re-export commonly used types for convenience
pub use commands::CommandHandler;
pub use connection::{handle_connection, ConnectionStats};
pub use protocol::{ParseError, Request, RequestParser, Response};
pub use server::{Server, ServerConfig, ServerError, ServerState};
pub use storage::Store;

/// The default port tinycache listens on (same as memcached)
pub const DEFAULT_PORT: u16 = 11211;

/// The default host tinycache binds to
pub const DEFAULT_HOST: &str = "localhost";

/// The default bind address
pub const DEFAULT_ADDR: &str = "localhost:11211";

/// Version of tinycache
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
