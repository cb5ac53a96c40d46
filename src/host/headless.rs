//! In-process Action Host implementation.
//!
//! Stands in for the GUI application the original server drives: it tracks a
//! logged-in account and a test-button click counter so the binary is
//! runnable end to end without a window system.

use indexmap::IndexMap;
use serde_json::json;

use super::{ActionHost, HostError, StateSnapshot};

/// A minimal host with purely in-memory state.
#[derive(Debug, Clone)]
pub struct HeadlessHost {
    window_title: String,
    visible: bool,
    enabled: bool,
    logged_in: Option<String>,
    clicks: u64,
}

impl HeadlessHost {
    /// Creates a host in its initial state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            window_title: "remotectl".to_string(),
            visible: true,
            enabled: true,
            logged_in: None,
            clicks: 0,
        }
    }

    /// Returns the currently logged-in account, if any.
    #[must_use]
    pub fn logged_in(&self) -> Option<&str> {
        self.logged_in.as_deref()
    }

    /// Returns how many times the test button has been clicked.
    #[must_use]
    pub const fn click_count(&self) -> u64 {
        self.clicks
    }
}

impl Default for HeadlessHost {
    fn default() -> Self {
        Self::new()
    }
}

impl ActionHost for HeadlessHost {
    fn login(&mut self, account: &str, _password: &str) -> Result<bool, HostError> {
        // Credential format was already validated at the dispatch boundary;
        // this host has no account database and accepts any well-formed pair.
        self.logged_in = Some(account.to_string());
        Ok(true)
    }

    fn click_test_button(&mut self) -> Result<bool, HostError> {
        self.clicks += 1;
        Ok(true)
    }

    fn state(&self) -> Result<StateSnapshot, HostError> {
        let mut extra = IndexMap::new();
        extra.insert("isLoggedIn".to_string(), json!(self.logged_in.is_some()));
        extra.insert("clickCount".to_string(), json!(self.clicks));

        Ok(StateSnapshot {
            window_title: self.window_title.clone(),
            visible: self.visible,
            enabled: self.enabled,
            version: env!("CARGO_PKG_VERSION").to_string(),
            extra,
        })
    }
}
