//! Lifecycle-event observer interface.
//!
//! The server reports state changes (started/stopped, client connected and
//! disconnected, command executed) through a narrow callback trait instead of
//! an event bus. The consumer is entirely external: in the original
//! application these notifications drive a status display; the shipped binary
//! forwards them to [`tracing`] via [`TraceObserver`].
//!
//! All methods default to no-ops so observers implement only what they need.

use std::sync::Arc;

/// Receives server lifecycle notifications.
///
/// Callbacks are invoked synchronously from the server's event loop and must
/// not block.
pub trait ServerObserver: Send + Sync {
    /// The listening socket was bound on `port`.
    fn server_started(&self, port: u16) {
        let _ = port;
    }

    /// The server stopped and all connections were closed.
    fn server_stopped(&self) {}

    /// A client connected from `address` (`ip:port` form).
    fn client_connected(&self, address: &str) {
        let _ = address;
    }

    /// The client at `address` disconnected.
    fn client_disconnected(&self, address: &str) {
        let _ = address;
    }

    /// A command line finished executing with the given outcome.
    fn command_executed(&self, command: &str, success: bool) {
        let _ = (command, success);
    }
}

/// Observer that discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl ServerObserver for NullObserver {}

/// Observer that logs every lifecycle event through [`tracing`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TraceObserver;

impl ServerObserver for TraceObserver {
    fn server_started(&self, port: u16) {
        tracing::info!(port, "server started");
    }

    fn server_stopped(&self) {
        tracing::info!("server stopped");
    }

    fn client_connected(&self, address: &str) {
        tracing::info!(client = %address, "client connected");
    }

    fn client_disconnected(&self, address: &str) {
        tracing::info!(client = %address, "client disconnected");
    }

    fn command_executed(&self, command: &str, success: bool) {
        tracing::info!(command = %command, success, "command executed");
    }
}

/// Shared observer handle used throughout the server.
pub type SharedObserver = Arc<dyn ServerObserver>;
