//! remotectl: TCP remote-control server for driving an application's observable state
//!
//! This library exposes a small remote-control surface over TCP. Clients send
//! newline-delimited requests in either a plain-text grammar
//! (`login:<account>:<password>`, `testbutton`, `getstate`) or a JSON-RPC style
//! envelope, and receive one compact JSON response line per request.
//!
//! # Architecture
//!
//! The request pipeline is strictly layered:
//!
//! - **Connection Manager** ([`rpc::server`]) — accepts connections, buffers
//!   partial reads into complete lines, writes responses back
//! - **Message Parser** ([`rpc::parser`]) — normalises one raw line into a
//!   [`rpc::ParsedCommand`]; pure, no I/O
//! - **Dispatcher** ([`rpc::dispatch`]) — routes a command to one of the
//!   [`host::ActionHost`] capability operations and contains any fault
//! - **Response Formatter** ([`rpc::response`]) — builds the wire envelope
//!
//! The application logic behind "login", "test button" and "get state" lives
//! behind the [`host::ActionHost`] trait; the server only relays outcomes.
//!
//! # Modules
//!
//! - [`config`] — Configuration loading and validation
//! - [`error`] — Error types
//! - [`events`] — Lifecycle-event observer interface
//! - [`host`] — Action Host capability interface
//! - [`rpc`] — Wire protocol and TCP server

pub mod config;
pub mod error;
pub mod events;
pub mod host;
pub mod rpc;
