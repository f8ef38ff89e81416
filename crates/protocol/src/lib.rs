//! Line protocol shared by the patchbay gateway and its clients.
//!
//! Messages are plain text, one per transport frame:
//! - inbound: `ROUTE` or `ROUTE:PAYLOAD`. Route names are `[A-Za-z0-9/]+`;
//!   the payload is the rest of the line after the first colon and is decoded
//!   as JSON when it parses, wrapped as `{"raw": payload}` when it does not.
//! - outbound: `HEADER:JSON` for a presented run, or the fixed
//!   [`NO_MESSAGE_REPLY`] line when a run fails or cannot be rendered.

use serde::Serialize;
use serde_json::{Map, Value};

// ── Constants ────────────────────────────────────────────────────────────────

/// Header of the fixed failure reply.
pub const ERROR_HEADER: &str = "error";

/// The exact line sent to the originating connection when a run fails or its
/// presentation cannot be rendered. Never broadcast.
pub const NO_MESSAGE_REPLY: &str = r#"error:{"error":"No message"}"#;

/// Key under which an undecodable payload is preserved in request data.
pub const RAW_KEY: &str = "raw";

// ── Inbound ──────────────────────────────────────────────────────────────────

/// A decoded inbound message: the route name plus its payload data.
///
/// Parsing is pure; the same raw text always yields an equal `Request`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Request {
    pub route: String,
    pub data: Value,
}

/// True if `route` is a well-formed route name (`[A-Za-z0-9/]+`).
pub fn is_valid_route(route: &str) -> bool {
    !route.is_empty()
        && route
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '/')
}

/// Decode one raw text frame into a [`Request`].
///
/// Returns `None` when the frame does not fit the single-line
/// `ROUTE[:PAYLOAD]` grammar: empty input, a route with characters outside
/// `[A-Za-z0-9/]`, a trailing colon with nothing after it, or a payload
/// spanning multiple lines. A payload that is not valid JSON is not a
/// grammar failure; it is preserved under [`RAW_KEY`].
pub fn parse_message(raw: &str) -> Option<Request> {
    let (route, payload) = match raw.split_once(':') {
        Some((_, "")) => return None,
        Some((route, payload)) => (route, Some(payload)),
        None => (raw, None),
    };

    if !is_valid_route(route) {
        return None;
    }
    if payload.is_some_and(|text| text.contains('\n')) {
        return None;
    }

    let data = match payload {
        Some(text) => serde_json::from_str(text).unwrap_or_else(|_| raw_payload(text)),
        None => Value::Object(Map::new()),
    };

    Some(Request {
        route: route.to_string(),
        data,
    })
}

fn raw_payload(text: &str) -> Value {
    let mut map = Map::new();
    map.insert(RAW_KEY.to_string(), Value::String(text.to_string()));
    Value::Object(map)
}

// ── Outbound ─────────────────────────────────────────────────────────────────

/// Compose an outbound line: `HEADER:VARS` with `vars` JSON-encoded.
pub fn compose(header: &str, vars: &Value) -> String {
    format!("{header}:{vars}")
}
