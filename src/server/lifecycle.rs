//! Listener and Lifecycle Manager
//!
//! Binds the socket, runs the accept loop and coordinates graceful shutdown.
//!
//! ## States
//!
//! ```text
//! Starting ──> Running ──> Draining ──> Terminated
//!    │            │            │             │
//!  bind,       accept,     listener      in-flight
//!  spawn      handle one    closed,       count is
//!  tasks      at a time    wait for        zero
//!                          in-flight
//! ```
//!
//! Two tasks run once the server is up:
//!
//! - the **accept loop** accepts a connection, counts it as in flight and
//!   handles it to completion before accepting the next one. It waits on
//!   "next connection OR shutdown fired", so it never spins on a closed
//!   listener.
//! - the **shutdown watcher** waits for the shutdown signal, then for the
//!   listener to be closed and the in-flight count to reach zero, and only
//!   then fires the termination signal.
//!
//! Requests are serialized by the accept loop, so the store only ever sees
//! one writer at a time.

use crate::commands::CommandHandler;
use crate::connection::{handle_connection, ConnectionStats};
use crate::protocol::DEFAULT_MAX_REQUEST_SIZE;
use crate::server::in_flight::InFlight;
use crate::server::signal::{Signal, SignalListener};
use crate::storage::Store;
use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{watch, Barrier};
use tracing::{debug, info, warn};

/// Server configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address to bind to
    pub addr: String,
    /// Maximum number of bytes read for a single request
    pub read_buffer_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: crate::DEFAULT_ADDR.to_string(),
            read_buffer_size: DEFAULT_MAX_REQUEST_SIZE,
        }
    }
}

impl ServerConfig {
    /// Sets the bind address.
    pub fn with_addr(mut self, addr: impl Into<String>) -> Self {
        self.addr = addr.into();
        self
    }

    /// Sets the read buffer size. Zero is raised to one byte.
    pub fn with_read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size.max(1);
        self
    }
}

/// Lifecycle state of a [`Server`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// Socket bound, tasks not yet confirmed running
    Starting,
    /// Accepting connections
    Running,
    /// Shutdown requested; no new connections, in-flight work finishing
    Draining,
    /// Listener closed and nothing in flight
    Terminated,
}

/// Errors that can occur while starting the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// The listening socket could not be bound
    #[error("cannot bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// The bound socket did not report its address
    #[error("cannot read local address: {0}")]
    LocalAddr(#[source] std::io::Error),
}

/// A running cache server.
///
/// # Example
///
/// ```no_run
/// use tinycache::server::{Server, ServerConfig};
/// use tinycache::storage::Store;
/// use std::sync::Arc;
///
/// # async fn run() -> Result<(), tinycache::server::ServerError> {
/// let server = Server::start(ServerConfig::default(), Arc::new(Store::new())).await?;
/// // ... serve until it is time to stop ...
/// server.shutdown().await;
/// # Ok(())
/// # }
/// ```
///
/// Dropping a `Server` without calling [`Server::shutdown`] also stops it,
/// but nobody waits for the drain to finish.
#[derive(Debug)]
pub struct Server {
    local_addr: SocketAddr,
    shutdown: Signal,
    terminated: SignalListener,
    state: Arc<watch::Sender<ServerState>>,
    in_flight: Arc<InFlight>,
    stats: Arc<ConnectionStats>,
    storage: Arc<Store>,
}

impl Server {
    /// Binds the listening socket and starts serving.
    ///
    /// Returns only once both the accept loop and the shutdown watcher are
    /// running, so a shutdown issued right after `start` can never race a
    /// loop that has not started yet.
    pub async fn start(config: ServerConfig, storage: Arc<Store>) -> Result<Self, ServerError> {
        let state = Arc::new(watch::Sender::new(ServerState::Starting));

        let listener = TcpListener::bind(&config.addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: config.addr.clone(),
                source,
            })?;
        let local_addr = listener.local_addr().map_err(ServerError::LocalAddr)?;

        let shutdown = Signal::new();
        let listener_closed = Signal::new();
        let termination = Signal::new();
        let terminated = termination.listener();
        let in_flight = Arc::new(InFlight::new());
        let stats = Arc::new(ConnectionStats::new());
        let barrier = Arc::new(Barrier::new(3));

        let watcher = ShutdownWatcher {
            shutdown: shutdown.listener(),
            listener_closed: listener_closed.listener(),
            termination,
            in_flight: Arc::clone(&in_flight),
            state: Arc::clone(&state),
            stats: Arc::clone(&stats),
            storage: Arc::clone(&storage),
        };
        let accept_loop = AcceptLoop {
            listener,
            command_handler: CommandHandler::new(Arc::clone(&storage)),
            shutdown: shutdown.listener(),
            listener_closed,
            in_flight: Arc::clone(&in_flight),
            stats: Arc::clone(&stats),
            max_request_size: config.read_buffer_size,
        };

        tokio::spawn(watcher.run(Arc::clone(&barrier)));
        tokio::spawn(accept_loop.run(Arc::clone(&barrier)));
        barrier.wait().await;

        state.send_replace(ServerState::Running);
        info!(addr = %local_addr, "Server running");

        Ok(Self {
            local_addr,
            shutdown,
            terminated,
            state,
            in_flight,
            stats,
            storage,
        })
    }

    /// Stops the server and waits until it has fully drained.
    ///
    /// When this returns the listener is closed and every request that was
    /// in flight when it was called has been answered. Calling it again is
    /// harmless and returns immediately.
    pub async fn shutdown(&self) {
        if self.shutdown.fire() {
            info!("Shutdown signal fired");
        }

        let mut terminated = self.terminated.clone();
        terminated.fired().await;
    }

    /// Returns the address the server is listening on.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Returns the current lifecycle state.
    pub fn state(&self) -> ServerState {
        *self.state.borrow()
    }

    /// Returns the number of requests currently being processed.
    pub fn in_flight(&self) -> usize {
        self.in_flight.current()
    }

    /// Returns the shared connection statistics.
    pub fn stats(&self) -> &Arc<ConnectionStats> {
        &self.stats
    }

    /// Returns the store the server executes against.
    pub fn storage(&self) -> &Arc<Store> {
        &self.storage
    }
}

/// Accepts connections and handles them one at a time.
struct AcceptLoop {
    listener: TcpListener,
    command_handler: CommandHandler,
    shutdown: SignalListener,
    listener_closed: Signal,
    in_flight: Arc<InFlight>,
    stats: Arc<ConnectionStats>,
    max_request_size: usize,
}

impl AcceptLoop {
    async fn run(self, barrier: Arc<Barrier>) {
        let AcceptLoop {
            listener,
            command_handler,
            mut shutdown,
            listener_closed,
            in_flight,
            stats,
            max_request_size,
        } = self;

        barrier.wait().await;
        debug!("Accept loop started");

        loop {
            let (stream, addr) = tokio::select! {
                biased;
                _ = shutdown.fired() => break,
                accepted = listener.accept() => match accepted {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!(error = %e, "Failed to accept connection");
                        continue;
                    }
                },
            };

            let _guard = in_flight.enter();
            let connection = handle_connection(
                stream,
                addr,
                command_handler.clone(),
                Arc::clone(&stats),
                max_request_size,
            );
            tokio::pin!(connection);

            tokio::select! {
                biased;
                _ = &mut connection => {}
                _ = shutdown.fired() => {
                    // Stop accepting now; the current request still finishes.
                    drop(listener);
                    listener_closed.fire();
                    info!(client = %addr, "Listener closed, finishing in-flight request");
                    connection.await;
                    return;
                }
            }
        }

        drop(listener);
        listener_closed.fire();
        info!("Listener closed");
    }
}

/// Turns a shutdown request into termination once the server has drained.
struct ShutdownWatcher {
    shutdown: SignalListener,
    listener_closed: SignalListener,
    termination: Signal,
    in_flight: Arc<InFlight>,
    state: Arc<watch::Sender<ServerState>>,
    stats: Arc<ConnectionStats>,
    storage: Arc<Store>,
}

impl ShutdownWatcher {
    async fn run(mut self, barrier: Arc<Barrier>) {
        barrier.wait().await;
        debug!("Shutdown watcher started");

        self.shutdown.fired().await;
        self.state.send_replace(ServerState::Draining);
        info!(
            in_flight = self.in_flight.current(),
            "Shutdown requested, draining"
        );

        self.listener_closed.fired().await;
        self.in_flight.drained().await;

        self.state.send_replace(ServerState::Terminated);
        let store = self.storage.stats();
        info!(
            connections = self.stats.connections_accepted.load(Ordering::Relaxed),
            requests = self.stats.requests_processed.load(Ordering::Relaxed),
            client_errors = self.stats.client_errors.load(Ordering::Relaxed),
            bytes_read = self.stats.bytes_read.load(Ordering::Relaxed),
            bytes_written = self.stats.bytes_written.load(Ordering::Relaxed),
            keys = store.keys,
            gets = store.gets,
            hits = store.hits,
            misses = store.misses,
            sets = store.sets,
            "Server terminated"
        );
        self.termination.fire();
    }
}
