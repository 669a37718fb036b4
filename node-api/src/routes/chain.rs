//! Mining, block gossip, and conflict-resolution endpoints.

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use ledger::Block;

use super::{field_u64, json_body, lookup_election, reply};
use crate::state::SharedState;

/// Response body for `POST /mine`.
#[derive(Serialize)]
pub struct MineResponse {
    pub message: &'static str,
    pub block: Block,
}

/// `POST /mine`
///
/// Mines the mempool into a new block and broadcasts it. Refused with 409
/// while the resolve flag is up — mining onto a chain a peer already
/// out-ran would only deepen the fork. The broadcast runs after the ledger
/// lock is dropped; any peer 409 raises the resolve flag for later.
pub async fn mine(State(state): State<SharedState>, body: String) -> Response {
    let Some(values) = json_body(&body) else {
        return reply(StatusCode::BAD_REQUEST, "No data found.");
    };
    let Some(election) = field_u64(&values, "election") else {
        return reply(StatusCode::BAD_REQUEST, "Election ID Needed!");
    };

    let handle = match lookup_election(&state, election).await {
        Ok(handle) => handle,
        Err(response) => return response,
    };

    let (block, peers) = {
        let mut guard = handle.lock().await;
        if guard.needs_resolve() {
            return reply(
                StatusCode::CONFLICT,
                "Conflicts must be resolved before mining.",
            );
        }
        match guard.mine_block() {
            Ok(block) => (block, guard.peer_nodes()),
            Err(err) => {
                tracing::warn!(election, error = %err, "mining failed");
                return reply(StatusCode::INTERNAL_SERVER_ERROR, "Adding a block failed.");
            }
        }
    };

    let fanout = state.peers.fan_out_block(&peers, election, &block).await;
    if fanout.conflict {
        handle.lock().await.set_needs_resolve(true);
    }

    (
        StatusCode::CREATED,
        Json(MineResponse {
            message: "Block added successfully.",
            block,
        }),
    )
        .into_response()
}

/// `POST /broadcast-block`
///
/// Gossip ingestion for peer-mined blocks, arbitrated by index:
/// the exact successor is validated and appended; a block further ahead
/// flags this node to resolve; anything at or behind the local tip tells
/// the sender *their* chain is stale.
pub async fn broadcast_block(State(state): State<SharedState>, body: String) -> Response {
    let Some(values) = json_body(&body) else {
        return reply(StatusCode::BAD_REQUEST, "No data found.");
    };
    let (Some(election), Some(block_value)) =
        (field_u64(&values, "election"), values.get("block"))
    else {
        return reply(StatusCode::BAD_REQUEST, "Required data are missing.");
    };
    let Ok(block) = serde_json::from_value::<Block>(block_value.clone()) else {
        return reply(StatusCode::BAD_REQUEST, "Block data is malformed.");
    };

    let handle = match lookup_election(&state, election).await {
        Ok(handle) => handle,
        Err(response) => return response,
    };

    let mut guard = handle.lock().await;
    let local_index = guard.last_block().index;

    if block.index == local_index + 1 {
        match guard.add_block(block) {
            Ok(()) => reply(StatusCode::CREATED, "Block added"),
            Err(err) => {
                tracing::warn!(election, error = %err, "rejected a broadcast block");
                reply(StatusCode::CONFLICT, "Block seems invalid.")
            }
        }
    } else if block.index > local_index {
        guard.set_needs_resolve(true);
        reply(
            StatusCode::OK,
            "Blockchain seems to differ from local blockchain.",
        )
    } else {
        reply(
            StatusCode::CONFLICT,
            "Blockchain seems to be shorter, block not added",
        )
    }
}

/// Response body for `POST /resolve-conflicts`.
#[derive(Serialize)]
pub struct ResolveResponse {
    pub message: &'static str,
}

/// `POST /resolve-conflicts`
///
/// Polls every peer's chain and adopts the longest strictly-longer valid
/// one. Chains are fetched with no ledger lock held; the comparison and
/// replacement run under the lock afterwards.
pub async fn resolve_conflicts(State(state): State<SharedState>, body: String) -> Response {
    let Some(values) = json_body(&body) else {
        return reply(StatusCode::BAD_REQUEST, "No data found.");
    };
    let Some(election) = field_u64(&values, "election") else {
        return reply(StatusCode::BAD_REQUEST, "Election ID is needed!");
    };

    let handle = match lookup_election(&state, election).await {
        Ok(handle) => handle,
        Err(response) => return response,
    };

    let peers = handle.lock().await.peer_nodes();
    let chains = state.peers.fetch_chains(&peers, election).await;
    let replaced = handle.lock().await.apply_resolve(chains);

    let message = if replaced {
        "Chain was replaced!"
    } else {
        "Local chain kept!"
    };
    (StatusCode::OK, Json(ResolveResponse { message })).into_response()
}

/// Query parameters for `GET /chain`.
#[derive(Deserialize)]
pub struct ChainQuery {
    #[serde(default)]
    pub election: u64,
}

/// `GET /chain?election=<id>`
///
/// Returns the full chain as a bare JSON array of blocks.
pub async fn get_chain(
    State(state): State<SharedState>,
    Query(query): Query<ChainQuery>,
) -> Response {
    if query.election == 0 {
        return reply(StatusCode::BAD_REQUEST, "Election id is missing.");
    }

    let handle = match lookup_election(&state, query.election).await {
        Ok(handle) => handle,
        Err(response) => return response,
    };

    let chain = handle.lock().await.chain().to_vec();
    (StatusCode::OK, Json(chain)).into_response()
}
