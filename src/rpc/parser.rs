//! Message parser: turns one raw request line into a normalised command.
//!
//! Two input grammars are auto-detected by whether the (already trimmed)
//! line begins with `{`:
//!
//! - **JSON**: a JSON-RPC style request object. `method` must be `"execute"`
//!   and `params.command` carries the embedded plain-text command. A top-level
//!   `id` is copied into [`ParsedCommand::request_id`] verbatim.
//! - **Plain text**: the whole line is the command string, matched against
//!   fixed case-sensitive rules.
//!
//! Parsing never fails: anything unrecognised yields [`CommandKind::Unknown`]
//! and is turned into a failure response downstream. No I/O happens here.

use serde_json::Value;

/// The command named by a request line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CommandKind {
    /// Unrecognised input (including malformed JSON).
    #[default]
    Unknown,
    /// `login:<account>:<password>`
    Login,
    /// `testbutton`
    TestButton,
    /// `getstate`
    GetState,
}

/// Normalised in-memory representation of one inbound request line.
///
/// Created fresh per line, immutable after parsing, discarded after dispatch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedCommand {
    /// The command type, derived solely from the input text.
    pub kind: CommandKind,
    /// Ordered positional parameters; for `Login` this is `[account, password]`.
    pub params: Vec<String>,
    /// The raw input line, echoed in "unknown command" failures.
    pub original: String,
    /// Request id copied from JSON input; empty until the dispatcher
    /// backfills one.
    pub request_id: String,
}

/// Parses one raw line into a [`ParsedCommand`], auto-detecting the grammar.
#[must_use]
pub fn parse_line(raw: &str) -> ParsedCommand {
    if raw.starts_with('{') {
        parse_json(raw)
    } else {
        parse_text(raw)
    }
}

/// Parses a plain-text command string.
///
/// Matching is case-sensitive and exact; `login:` splits the remainder on
/// `:` and ignores fields beyond the password. Fewer than two fields leaves
/// `params` empty; the dispatcher rejects that as malformed.
#[must_use]
pub fn parse_text(command: &str) -> ParsedCommand {
    let mut cmd = ParsedCommand {
        original: command.to_string(),
        ..ParsedCommand::default()
    };

    if let Some(rest) = command.strip_prefix("login:") {
        cmd.kind = CommandKind::Login;
        let fields: Vec<&str> = rest.split(':').collect();
        if fields.len() >= 2 {
            cmd.params = vec![fields[0].to_string(), fields[1].to_string()];
        }
    } else if command == "testbutton" {
        cmd.kind = CommandKind::TestButton;
    } else if command == "getstate" {
        cmd.kind = CommandKind::GetState;
    } else {
        cmd.kind = CommandKind::Unknown;
        tracing::debug!(command = %command, "unknown command");
    }

    cmd
}

/// Parses a JSON-RPC style request.
///
/// Malformed JSON yields `Unknown` with an empty request id rather than an
/// error; a well-formed object with the wrong method keeps its id but stays
/// `Unknown`.
fn parse_json(raw: &str) -> ParsedCommand {
    let mut cmd = ParsedCommand {
        original: raw.to_string(),
        ..ParsedCommand::default()
    };

    let value: Value = match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(e) => {
            tracing::debug!(error = %e, "JSON parse error");
            return cmd;
        }
    };

    let Some(obj) = value.as_object() else {
        return cmd;
    };

    cmd.request_id = match obj.get("id") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    };

    if obj.get("method").and_then(Value::as_str) == Some("execute") {
        if let Some(command) = obj
            .get("params")
            .and_then(|p| p.get("command"))
            .and_then(Value::as_str)
        {
            let inner = parse_text(command);
            cmd.kind = inner.kind;
            cmd.params = inner.params;
        }
    }

    cmd
}
