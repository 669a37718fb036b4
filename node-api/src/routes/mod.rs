//! Request handlers, grouped by concern.
//!
//! Clients send arbitrary JSON, so handlers parse the raw body into a
//! `serde_json::Value` and validate fields by hand: anything missing or
//! unparseable is a 400 with a `message`, never a framework-shaped
//! rejection. Response DTOs are typed per endpoint.

pub mod ballot;
pub mod chain;
pub mod elections;
pub mod nodes;
pub mod stats;
pub mod status;
pub mod votes;

use std::sync::Arc;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;

use ledger::Ledger;

use crate::state::AppState;

/// Uniform `{"message": ...}` body used by plain replies and errors.
#[derive(Serialize)]
pub struct Message {
    pub message: &'static str,
}

/// A status code plus a plain `message` body.
pub fn reply(status: StatusCode, message: &'static str) -> Response {
    (status, Json(Message { message })).into_response()
}

/// Parses a request body the way the endpoints expect: any JSON value, or
/// `None` for an empty/garbled body.
pub fn json_body(body: &str) -> Option<Value> {
    serde_json::from_str(body).ok()
}

/// Reads a required integer field.
pub fn field_u64(values: &Value, key: &str) -> Option<u64> {
    values.get(key).and_then(Value::as_u64)
}

/// Reads a required string field.
pub fn field_str<'a>(values: &'a Value, key: &str) -> Option<&'a str> {
    values.get(key).and_then(Value::as_str)
}

/// Fetches the ledger handle for an election, or the 400 that reports an
/// unknown id.
pub async fn lookup_election(
    state: &AppState,
    election: u64,
) -> Result<Arc<Mutex<Ledger>>, Response> {
    state
        .registry
        .read()
        .await
        .get(election)
        .ok_or_else(|| reply(StatusCode::BAD_REQUEST, "Election not found."))
}
