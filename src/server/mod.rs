//! Server Module
//!
//! Listener startup, the single accept/process loop and graceful shutdown.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Server                              │
//! │                                                             │
//! │  ┌─────────────────┐          ┌──────────────────────────┐  │
//! │  │  Accept Loop    │          │   Shutdown Watcher       │  │
//! │  │                 │          │                          │  │
//! │  │ accept ─> count │          │ wait shutdown signal     │  │
//! │  │ ─> handle ─>    │          │ wait listener closed     │  │
//! │  │ uncount         │          │ wait in-flight == 0      │  │
//! │  └─────────────────┘          │ fire termination signal  │  │
//! │                               └──────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `lifecycle`: `Server`, `ServerConfig`, `ServerState`, `ServerError`
//! - `signal`: one-shot broadcast signals
//! - `in_flight`: in-flight request counter with drain wait

pub mod in_flight;
pub mod lifecycle;
pub mod signal;

// Re-export commonly used types
pub use in_flight::{InFlight, InFlightGuard};
pub use lifecycle::{Server, ServerConfig, ServerError, ServerState};
pub use signal::{Signal, SignalListener};
