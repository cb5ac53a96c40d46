//! Command dispatcher and capability executor.
//!
//! Maps a [`ParsedCommand`] to one of the Action Host's capability
//! operations, normalises the outcome into an [`ExecutionResult`] and
//! serialises it through the response formatter. This is the fault boundary:
//! host errors become failure responses here and never reach the connection
//! loop.
//!
//! Requests arriving without an id get one backfilled from a monotonically
//! increasing counter before execution, so every response carries an id even
//! for plain-text input.

use indexmap::IndexMap;
use serde_json::{json, Value};

use crate::events::SharedObserver;
use crate::host::ActionHost;
use crate::rpc::parser::{CommandKind, ParsedCommand};
use crate::rpc::response::format_response;

/// Minimum account length accepted by credential pre-validation.
pub const MIN_ACCOUNT_LEN: usize = 3;
/// Maximum account length accepted by credential pre-validation.
pub const MAX_ACCOUNT_LEN: usize = 50;
/// Minimum password length accepted by credential pre-validation.
pub const MIN_PASSWORD_LEN: usize = 3;
/// Maximum password length accepted by credential pre-validation.
pub const MAX_PASSWORD_LEN: usize = 100;

/// Normalised outcome of invoking a capability operation.
///
/// Created per invocation, consumed once by the formatter.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    /// Whether the operation succeeded.
    pub success: bool,
    /// Human-readable outcome message.
    pub message: String,
    /// Ordered structured payload; usually empty on failure.
    pub data: IndexMap<String, Value>,
}

impl ExecutionResult {
    /// Creates a successful outcome with the given payload.
    #[must_use]
    pub fn success(message: impl Into<String>, data: IndexMap<String, Value>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data,
        }
    }

    /// Creates a failure outcome with no payload.
    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: IndexMap::new(),
        }
    }
}

/// Routes parsed commands to the Action Host and formats the outcome.
pub struct Dispatcher<H: ActionHost> {
    host: H,
    observer: SharedObserver,
    next_request_id: u64,
}

impl<H: ActionHost> Dispatcher<H> {
    /// Creates a dispatcher around the given host.
    pub fn new(host: H, observer: SharedObserver) -> Self {
        Self {
            host,
            observer,
            next_request_id: 0,
        }
    }

    /// Executes one command and returns the serialised response line plus
    /// the success flag.
    ///
    /// Never fails: malformed parameters and host faults all come back as
    /// well-formed failure responses.
    pub fn dispatch(&mut self, cmd: &ParsedCommand) -> (String, bool) {
        let request_id = if cmd.request_id.is_empty() {
            self.next_request_id += 1;
            self.next_request_id.to_string()
        } else {
            cmd.request_id.clone()
        };

        let outcome = match cmd.kind {
            CommandKind::Login => self.execute_login(&cmd.params),
            CommandKind::TestButton => self.execute_test_button(),
            CommandKind::GetState => self.get_state(),
            CommandKind::Unknown => {
                ExecutionResult::failure(format!("unknown command: {}", cmd.original))
            }
        };

        let response =
            format_response(&request_id, outcome.success, &outcome.message, &outcome.data);
        self.observer.command_executed(&cmd.original, outcome.success);

        (response, outcome.success)
    }

    /// Executes the login capability.
    ///
    /// Credential format is validated before the host is involved; the host
    /// is never called for malformed input.
    fn execute_login(&mut self, params: &[String]) -> ExecutionResult {
        if params.len() < 2 {
            return ExecutionResult::failure("insufficient login parameters");
        }

        let (account, password) = (&params[0], &params[1]);
        if !valid_credentials(account, password) {
            return ExecutionResult::failure("invalid credential format");
        }

        match self.host.login(account, password) {
            Ok(true) => {
                let mut data = IndexMap::new();
                data.insert("account".to_string(), json!(account));
                data.insert("loginTime".to_string(), json!(timestamp()));
                ExecutionResult::success("登录成功", data)
            }
            Ok(false) => ExecutionResult::failure("登录失败"),
            Err(e) => ExecutionResult::failure(e.to_string()),
        }
    }

    fn execute_test_button(&mut self) -> ExecutionResult {
        match self.host.click_test_button() {
            Ok(true) => {
                let mut data = IndexMap::new();
                data.insert("buttonClicked".to_string(), json!(true));
                data.insert("clickTime".to_string(), json!(timestamp()));
                ExecutionResult::success("测试按钮执行成功", data)
            }
            Ok(false) => ExecutionResult::failure("测试按钮执行失败"),
            Err(e) => ExecutionResult::failure(e.to_string()),
        }
    }

    fn get_state(&mut self) -> ExecutionResult {
        match self.host.state() {
            Ok(snapshot) => {
                let mut data = IndexMap::new();
                data.insert("windowTitle".to_string(), json!(snapshot.window_title));
                data.insert("isVisible".to_string(), json!(snapshot.visible));
                data.insert("isEnabled".to_string(), json!(snapshot.enabled));
                data.insert("currentTime".to_string(), json!(timestamp()));
                data.insert("applicationVersion".to_string(), json!(snapshot.version));
                data.extend(snapshot.extra);
                ExecutionResult::success("状态获取成功", data)
            }
            Err(e) => ExecutionResult::failure(e.to_string()),
        }
    }
}

/// Validates credential format independently of the Action Host.
fn valid_credentials(account: &str, password: &str) -> bool {
    let account_len = account.chars().count();
    let password_len = password.chars().count();

    (MIN_ACCOUNT_LEN..=MAX_ACCOUNT_LEN).contains(&account_len)
        && (MIN_PASSWORD_LEN..=MAX_PASSWORD_LEN).contains(&password_len)
}

fn timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}
