//! Response formatter: builds the canonical wire envelope.
//!
//! Every response is one compact JSON line with no embedded newline. Success
//! responses carry `result` and omit `data` when it is empty; failure
//! responses carry `error` with a fixed sentinel code and `data` always
//! present. Line termination belongs to the connection manager, not here.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

/// The sentinel error code used for every failure kind.
pub const FAILURE_CODE: i32 = -1;

/// `{"id": ..., "result": {...}}`
#[derive(Debug, Serialize)]
struct SuccessEnvelope<'a> {
    id: &'a str,
    result: ResultBody<'a>,
}

#[derive(Debug, Serialize)]
struct ResultBody<'a> {
    success: bool,
    message: &'a str,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    data: IndexMap<String, Value>,
}

/// `{"id": ..., "error": {...}}`
#[derive(Debug, Serialize)]
struct ErrorEnvelope<'a> {
    id: &'a str,
    error: ErrorBody<'a>,
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    code: i32,
    message: &'a str,
    data: IndexMap<String, Value>,
}

/// Serialises an execution outcome into a single compact JSON line.
#[must_use]
pub fn format_response(
    request_id: &str,
    success: bool,
    message: &str,
    data: &IndexMap<String, Value>,
) -> String {
    let line = if success {
        serde_json::to_string(&SuccessEnvelope {
            id: request_id,
            result: ResultBody {
                success,
                message,
                data: data.clone(),
            },
        })
    } else {
        serde_json::to_string(&ErrorEnvelope {
            id: request_id,
            error: ErrorBody {
                code: FAILURE_CODE,
                message,
                data: data.clone(),
            },
        })
    };

    // The envelope holds only strings, bools and plain JSON values, so
    // serialisation cannot fail.
    line.expect("response envelope serialisation")
}
