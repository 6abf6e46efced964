//! Storage Module
//!
//! This module provides the backing store for tinycache: an in-memory map
//! from key to value. Nothing is evicted, expired or persisted; the store
//! lives exactly as long as the server process.
//!
//! ## Example
//!
//! ```
//! use tinycache::storage::Store;
//! use bytes::Bytes;
//! use std::sync::Arc;
//!
//! let store = Arc::new(Store::new());
//! store.set(Bytes::from("name"), Bytes::from("tiny"));
//! assert_eq!(store.get(b"name"), Some(Bytes::from("tiny")));
//! ```

pub mod engine;

// Re-export commonly used types
pub use engine::{Store, StoreStats};
