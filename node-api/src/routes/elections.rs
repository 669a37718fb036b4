//! Election lifecycle endpoints.

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use super::{field_str, field_u64, json_body, reply};
use crate::state::SharedState;

/// `POST /create-election`
///
/// Creates the election's ledger on this node, or re-syncs it from its
/// snapshot. Requires the node ballot to exist: the loaded public key
/// becomes the miner identity for this election.
pub async fn create_election(State(state): State<SharedState>, body: String) -> Response {
    let Some(values) = json_body(&body) else {
        return reply(StatusCode::BAD_REQUEST, "No data found.");
    };
    let (Some(id), Some(description)) = (
        field_u64(&values, "id"),
        field_str(&values, "description"),
    ) else {
        return reply(StatusCode::BAD_REQUEST, "Some data is missing.");
    };

    let miner_key = {
        let mut ballot = state.ballot.lock().await;
        if ballot.load_keys().is_err() {
            return reply(StatusCode::INTERNAL_SERVER_ERROR, "Loading the keys failed.");
        }
        ballot.public_key.clone()
    };

    state
        .registry
        .write()
        .await
        .open(id, description, miner_key);
    reply(StatusCode::CREATED, "Election synced successfully.")
}

/// Query parameters for `GET /election`.
#[derive(Deserialize)]
pub struct ElectionQuery {
    #[serde(default)]
    pub election: u64,
}

/// Flag payload for `GET /election`.
#[derive(Serialize)]
pub struct ElectionExistsResponse {
    pub election: u8,
}

/// `GET /election?election=<id>`
///
/// Reports whether this node hosts the election: `{"election": 0|1}`.
pub async fn election_exists(
    State(state): State<SharedState>,
    Query(query): Query<ElectionQuery>,
) -> Response {
    let known = state.registry.read().await.contains(query.election);
    (
        StatusCode::CREATED,
        Json(ElectionExistsResponse {
            election: known as u8,
        }),
    )
        .into_response()
}
