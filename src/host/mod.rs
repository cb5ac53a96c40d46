//! Action Host capability interface.
//!
//! The Action Host owns the actual application state and performs the real
//! work behind "login", "test button" and "get state". The server core only
//! invokes these three capability operations and relays their outcomes; any
//! user-facing confirmation is the host's responsibility.
//!
//! Capability faults are expressed as [`HostError`] values rather than
//! panics, so the dispatch boundary can fold them into failure responses
//! without ever terminating a connection.

mod headless;

pub use headless::HeadlessHost;

use indexmap::IndexMap;
use serde_json::Value;
use thiserror::Error;

/// A fault raised by a capability operation.
#[derive(Error, Debug)]
pub enum HostError {
    /// The host is not available to service requests.
    #[error("host unavailable")]
    Unavailable,

    /// The host's internal logic failed with the given description.
    #[error("{0}")]
    Fault(String),
}

/// A snapshot of the host application's observable state.
///
/// `extra` carries host-defined fields and preserves their insertion order
/// on the wire.
#[derive(Debug, Clone)]
pub struct StateSnapshot {
    /// Title of the host's main window.
    pub window_title: String,
    /// Whether the main window is visible.
    pub visible: bool,
    /// Whether the main window accepts input.
    pub enabled: bool,
    /// Host application version.
    pub version: String,
    /// Additional host-defined state fields.
    pub extra: IndexMap<String, Value>,
}

/// The three capability operations the dispatcher may invoke.
///
/// Implementations are assumed synchronous and fast (UI-state mutations);
/// slow or asynchronous work must be handled inside the host.
pub trait ActionHost: Send {
    /// Attempts to log in with the given credentials.
    ///
    /// Returns `Ok(true)` on success, `Ok(false)` when the credentials are
    /// rejected by the host's business rules.
    ///
    /// # Errors
    ///
    /// Returns a [`HostError`] if the host cannot perform the operation.
    fn login(&mut self, account: &str, password: &str) -> Result<bool, HostError>;

    /// Clicks the application's test button.
    ///
    /// # Errors
    ///
    /// Returns a [`HostError`] if the host cannot perform the operation.
    fn click_test_button(&mut self) -> Result<bool, HostError>;

    /// Returns a snapshot of the application's observable state.
    ///
    /// # Errors
    ///
    /// Returns a [`HostError`] if the host cannot produce a snapshot.
    fn state(&self) -> Result<StateSnapshot, HostError>;
}
