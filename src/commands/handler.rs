//! Command Handler Module
//!
//! Executes parsed requests against the store.
//!
//! ## Supported Commands
//!
//! - `GET key` - Returns `<value>\r\nENDS\r\n`, or just `ENDS\r\n` when the
//!   key is missing
//! - `SET key value...` - Stores the value and returns `STORED\r\n`
//!
//! Dispatch never fails once a request has parsed: a missing key is an
//! empty result set, and SET accepts any key and value.

use crate::protocol::{Request, Response};
use crate::storage::Store;
use bytes::Bytes;
use std::sync::Arc;
use tracing::trace;

/// Dispatches requests to the store.
#[derive(Debug, Clone)]
pub struct CommandHandler {
    /// The store
    storage: Arc<Store>,
}

impl CommandHandler {
    /// Creates a new command handler with the given store.
    pub fn new(storage: Arc<Store>) -> Self {
        Self { storage }
    }

    /// Returns the store this handler executes against.
    pub fn storage(&self) -> &Arc<Store> {
        &self.storage
    }

    /// Executes a request and returns the response.
    pub fn execute(&self, request: Request) -> Response {
        trace!(
            command = request.command_name(),
            key = ?request.key(),
            "Executing request"
        );

        match request {
            Request::Get { key } => self.cmd_get(&key),
            Request::Set { key, value } => self.cmd_set(key, value),
        }
    }

    /// GET key
    fn cmd_get(&self, key: &[u8]) -> Response {
        Response::Value(self.storage.get(key))
    }

    /// SET key value
    fn cmd_set(&self, key: Bytes, value: Bytes) -> Response {
        self.storage.set(key, value);
        Response::Stored
    }
}
