//! Wire protocol and TCP server implementation.
//!
//! This module implements the request-handling pipeline: every complete line
//! a client sends flows through the parser, the dispatcher and the formatter,
//! and produces exactly one response line.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     Connection Manager                       │
//! │                                                              │
//! │  accept ──▶ per-connection buffer ──▶ complete line          │
//! │                                          │                   │
//! │        ┌─────────┐    ┌────────────┐    ┌┴──────────┐        │
//! │        │ Parser  │───▶│ Dispatcher │───▶│ Formatter │        │
//! │        └─────────┘    └────────────┘    └───────────┘        │
//! │                             │                 │              │
//! │                        ActionHost        response line ──▶   │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Wire Format
//!
//! Requests and responses are newline-delimited UTF-8 text. Requests are
//! either a plain-text command (`login:<account>:<password>`, `testbutton`,
//! `getstate`) or a JSON-RPC style object:
//!
//! ```text
//! {"id": "42", "method": "execute", "params": {"command": "testbutton"}}
//! ```
//!
//! Responses are always one compact JSON line:
//!
//! ```text
//! {"id": "42", "result": {"success": true, "message": "...", "data": {...}}}
//! {"id": "42", "error": {"code": -1, "message": "...", "data": {}}}
//! ```

pub mod dispatch;
pub mod parser;
pub mod response;
pub mod server;

pub use dispatch::{Dispatcher, ExecutionResult};
pub use parser::{parse_line, CommandKind, ParsedCommand};
pub use response::format_response;
pub use server::{ControlServer, ShutdownHandle};
