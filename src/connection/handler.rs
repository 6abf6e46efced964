//! Connection Handler Module
//!
//! This module handles individual client connections to tinycache.
//! A connection carries exactly one request.
//!
//! ## Connection Lifecycle
//!
//! ```text
//! 1. Connection accepted by the server loop
//!        │
//!        ▼
//! 2. Single read (up to the request size cap)
//!        │
//!        ├── read error / 0 bytes ──> close, nothing written
//!        ▼
//! 3. Parse request
//!        │
//!        ├── parse error ──> write CLIENT_ERROR line
//!        ▼
//! 4. Execute against the store, write response
//!        │
//!        ▼
//! 5. Close the connection
//! ```
//!
//! There is no read loop and no reassembly of partial messages. A request
//! longer than the cap is truncated to the cap.

use crate::commands::CommandHandler;
use crate::protocol::{RequestParser, Response, DEFAULT_MAX_REQUEST_SIZE};
use bytes::{Bytes, BytesMut};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, trace, warn};

/// Statistics for connection handling
#[derive(Debug, Default)]
pub struct ConnectionStats {
    /// Total number of connections accepted
    pub connections_accepted: AtomicU64,
    /// Total requests answered, including client errors
    pub requests_processed: AtomicU64,
    /// Requests answered with `CLIENT_ERROR`
    pub client_errors: AtomicU64,
    /// Total bytes read
    pub bytes_read: AtomicU64,
    /// Total bytes written
    pub bytes_written: AtomicU64,
}

impl ConnectionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection_opened(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn request_processed(&self) {
        self.requests_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn client_error(&self) {
        self.client_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn bytes_read(&self, count: usize) {
        self.bytes_read.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn bytes_written(&self, count: usize) {
        self.bytes_written
            .fetch_add(count as u64, Ordering::Relaxed);
    }
}

/// Handles a single client connection.
///
/// The handler owns the stream for its whole life; dropping the handler
/// closes the connection on every exit path.
pub struct ConnectionHandler<S> {
    /// The stream for this connection
    stream: S,

    /// Client's address (for logging)
    addr: SocketAddr,

    /// The command handler (shares the store)
    command_handler: CommandHandler,

    /// Connection statistics (shared)
    stats: Arc<ConnectionStats>,

    /// Maximum number of bytes read for the request
    max_request_size: usize,
}

impl<S> ConnectionHandler<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Creates a new connection handler.
    ///
    /// # Arguments
    ///
    /// * `stream` - The stream for this connection
    /// * `addr` - The client's socket address
    /// * `command_handler` - The command handler for executing requests
    /// * `stats` - Shared connection statistics
    pub fn new(
        stream: S,
        addr: SocketAddr,
        command_handler: CommandHandler,
        stats: Arc<ConnectionStats>,
    ) -> Self {
        stats.connection_opened();

        Self {
            stream,
            addr,
            command_handler,
            stats,
            max_request_size: DEFAULT_MAX_REQUEST_SIZE,
        }
    }

    /// Sets the maximum number of bytes read for the request.
    pub fn with_max_request_size(mut self, size: usize) -> Self {
        self.max_request_size = size.max(1);
        self
    }

    /// Reads one request, answers it and closes the connection.
    pub async fn run(mut self) -> Result<(), ConnectionError> {
        debug!(client = %self.addr, "Client connected");

        let result = self.serve().await;

        if let Err(e) = self.stream.shutdown().await {
            trace!(client = %self.addr, error = %e, "Shutdown after response failed");
        }

        match &result {
            Ok(()) => debug!(client = %self.addr, "Connection closed"),
            Err(ConnectionError::ClientDisconnected) => {
                debug!(client = %self.addr, "Client disconnected before sending a request")
            }
            Err(e) => debug!(client = %self.addr, error = %e, "Connection abandoned"),
        }

        result
    }

    /// Read, parse, execute, respond.
    async fn serve(&mut self) -> Result<(), ConnectionError> {
        let buf = self.read_request().await?;

        let response = match RequestParser::parse(buf) {
            Ok(request) => self.command_handler.execute(request),
            Err(e) => {
                warn!(client = %self.addr, error = %e, "Client error");
                Response::ClientError(e)
            }
        };
        if response.is_client_error() {
            self.stats.client_error();
        }
        self.stats.request_processed();

        self.send_response(&response).await
    }

    /// Reads the request with a single read call.
    async fn read_request(&mut self) -> Result<Bytes, ConnectionError> {
        let mut buffer = BytesMut::zeroed(self.max_request_size);

        let n = self.stream.read(&mut buffer[..]).await?;
        if n == 0 {
            return Err(ConnectionError::ClientDisconnected);
        }

        buffer.truncate(n);
        self.stats.bytes_read(n);
        trace!(client = %self.addr, bytes = n, "Read request");

        Ok(buffer.freeze())
    }

    /// Sends a response to the client.
    async fn send_response(&mut self, response: &Response) -> Result<(), ConnectionError> {
        let bytes = response.serialize();
        self.stream.write_all(&bytes).await?;
        self.stream.flush().await?;
        self.stats.bytes_written(bytes.len());
        trace!(
            client = %self.addr,
            bytes = bytes.len(),
            response = %response,
            "Sent response"
        );
        Ok(())
    }
}

/// Errors that can occur while handling a connection.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// I/O error while reading the request or writing the response
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// The client closed the connection without sending anything
    #[error("Client disconnected")]
    ClientDisconnected,
}

/// Handles a client connection.
///
/// This is a convenience function that creates a ConnectionHandler and runs
/// it to completion. Connection errors are logged and dropped: the server
/// never answers a connection it failed to read from.
pub async fn handle_connection<S>(
    stream: S,
    addr: SocketAddr,
    command_handler: CommandHandler,
    stats: Arc<ConnectionStats>,
    max_request_size: usize,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let handler = ConnectionHandler::new(stream, addr, command_handler, stats)
        .with_max_request_size(max_request_size);
    if let Err(e) = handler.run().await {
        match e {
            ConnectionError::ClientDisconnected => {}
            ConnectionError::IoError(ref io_err)
                if io_err.kind() == std::io::ErrorKind::ConnectionReset => {}
            _ => {
                debug!(client = %addr, error = %e, "Connection ended with error");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Store;
    use std::io;
    use tokio::net::{TcpListener, TcpStream};
    use tokio_test::io::Builder;

    fn test_addr() -> SocketAddr {
        "127.0.0.1:40000".parse().unwrap()
    }

    fn create_handler() -> (CommandHandler, Arc<ConnectionStats>) {
        (
            CommandHandler::new(Arc::new(Store::new())),
            Arc::new(ConnectionStats::new()),
        )
    }

    #[tokio::test]
    async fn test_get_missing_key() {
        let (handler, stats) = create_handler();
        let stream = Builder::new().read(b"GET foo\r\n").write(b"ENDS\r\n").build();

        ConnectionHandler::new(stream, test_addr(), handler, Arc::clone(&stats))
            .run()
            .await
            .unwrap();

        assert_eq!(stats.requests_processed.load(Ordering::Relaxed), 1);
        assert_eq!(stats.bytes_read.load(Ordering::Relaxed), 9);
        assert_eq!(stats.bytes_written.load(Ordering::Relaxed), 6);
    }

    #[tokio::test]
    async fn test_set_writes_store() {
        let (handler, stats) = create_handler();
        let store = Arc::clone(handler.storage());
        let stream = Builder::new()
            .read(b"SET foo foo value\r\n")
            .write(b"STORED\r\n")
            .build();

        ConnectionHandler::new(stream, test_addr(), handler, Arc::clone(&stats))
            .run()
            .await
            .unwrap();

        assert_eq!(store.get(b"foo"), Some(Bytes::from("foo value")));
        assert_eq!(stats.client_errors.load(Ordering::Relaxed), 0);
        assert_eq!(stats.requests_processed.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_parse_error_is_answered() {
        let (handler, stats) = create_handler();
        let stream = Builder::new()
            .read(b"FOO\r\n")
            .write(b"CLIENT_ERROR unknown command\r\n")
            .build();

        ConnectionHandler::new(stream, test_addr(), handler, Arc::clone(&stats))
            .run()
            .await
            .unwrap();

        assert_eq!(stats.client_errors.load(Ordering::Relaxed), 1);
        assert_eq!(stats.requests_processed.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_single_read_only() {
        // The terminator would arrive in a second segment, which is never read.
        let (handler, stats) = create_handler();
        let stream = Builder::new()
            .read(b"GET foo")
            .write(b"CLIENT_ERROR malformed request\r\n")
            .build();

        ConnectionHandler::new(stream, test_addr(), handler, stats)
            .run()
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_oversized_request_is_truncated() {
        let (handler, stats) = create_handler();
        let store = Arc::clone(handler.storage());
        let (mut client, server) = tokio::io::duplex(64);

        client.write_all(b"SET key 0123456789\r\n").await.unwrap();

        ConnectionHandler::new(server, test_addr(), handler, Arc::clone(&stats))
            .with_max_request_size(16)
            .run()
            .await
            .unwrap();

        let mut response = Vec::new();
        client.read_to_end(&mut response).await.unwrap();
        assert_eq!(response, b"CLIENT_ERROR malformed request\r\n");
        assert_eq!(stats.bytes_read.load(Ordering::Relaxed), 16);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_empty_read_writes_nothing() {
        let (handler, stats) = create_handler();
        let stream = Builder::new().build();

        let result = ConnectionHandler::new(stream, test_addr(), handler, Arc::clone(&stats))
            .run()
            .await;

        assert!(matches!(result, Err(ConnectionError::ClientDisconnected)));
        assert_eq!(stats.connections_accepted.load(Ordering::Relaxed), 1);
        assert_eq!(stats.requests_processed.load(Ordering::Relaxed), 0);
        assert_eq!(stats.bytes_written.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn test_read_error_writes_nothing() {
        let (handler, stats) = create_handler();
        let stream = Builder::new()
            .read_error(io::Error::new(io::ErrorKind::ConnectionReset, "reset"))
            .build();

        let result = ConnectionHandler::new(stream, test_addr(), handler, Arc::clone(&stats))
            .run()
            .await;

        assert!(matches!(result, Err(ConnectionError::IoError(_))));
        assert_eq!(stats.bytes_written.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn test_server_closes_connection_over_tcp() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (handler, stats) = create_handler();

        let server = tokio::spawn(async move {
            let (stream, client_addr) = listener.accept().await.unwrap();
            handle_connection(stream, client_addr, handler, stats, DEFAULT_MAX_REQUEST_SIZE).await;
        });

        let mut client = TcpStream::connect(addr).await.unwrap();
        client.write_all(b"SET k v\r\n").await.unwrap();

        // read_to_end only returns once the server has closed its side.
        let mut response = Vec::new();
        client.read_to_end(&mut response).await.unwrap();
        assert_eq!(response, b"STORED\r\n");

        server.await.unwrap();
    }
}
