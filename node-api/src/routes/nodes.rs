//! Peer set management endpoints.

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use super::{field_str, field_u64, json_body, lookup_election, reply};
use crate::state::SharedState;

/// Peer listing payload shared by the node endpoints.
#[derive(Serialize)]
pub struct PeerListResponse {
    pub message: &'static str,
    pub all_nodes: Vec<String>,
}

/// `POST /node`
///
/// Adds a peer base URL to the election's peer set.
pub async fn add_node(State(state): State<SharedState>, body: String) -> Response {
    let Some(values) = json_body(&body) else {
        return reply(StatusCode::BAD_REQUEST, "No data attached.");
    };
    let (Some(election), Some(node)) = (
        field_u64(&values, "election"),
        field_str(&values, "node"),
    ) else {
        return reply(StatusCode::BAD_REQUEST, "Required data are missing.");
    };

    let handle = match lookup_election(&state, election).await {
        Ok(handle) => handle,
        Err(response) => return response,
    };

    let mut guard = handle.lock().await;
    guard.add_peer_node(node);
    (
        StatusCode::CREATED,
        Json(PeerListResponse {
            message: "Node added successfully.",
            all_nodes: guard.peer_nodes(),
        }),
    )
        .into_response()
}

/// Query parameters for `DELETE /node`.
#[derive(Deserialize)]
pub struct RemoveNodeQuery {
    #[serde(default)]
    pub election: u64,
    pub node_url: Option<String>,
}

/// `DELETE /node?election=<id>&node_url=<url>`
///
/// Removes a peer base URL from the election's peer set.
pub async fn remove_node(
    State(state): State<SharedState>,
    Query(query): Query<RemoveNodeQuery>,
) -> Response {
    let (election, Some(node_url)) = (query.election, query.node_url) else {
        return reply(StatusCode::BAD_REQUEST, "Required data are missing.");
    };
    if election == 0 {
        return reply(StatusCode::BAD_REQUEST, "Required data are missing.");
    }
    if node_url.is_empty() {
        return reply(StatusCode::BAD_REQUEST, "No node found.");
    }

    let handle = match lookup_election(&state, election).await {
        Ok(handle) => handle,
        Err(response) => return response,
    };

    let mut guard = handle.lock().await;
    guard.remove_peer_node(&node_url);
    (
        StatusCode::OK,
        Json(PeerListResponse {
            message: "Node removed",
            all_nodes: guard.peer_nodes(),
        }),
    )
        .into_response()
}

/// Query parameters for `GET /nodes`.
#[derive(Deserialize)]
pub struct ListNodesQuery {
    #[serde(default)]
    pub election: u64,
}

/// Peer listing payload for `GET /nodes`.
#[derive(Serialize)]
pub struct AllNodesResponse {
    pub all_nodes: Vec<String>,
}

/// `GET /nodes?election=<id>`
///
/// Lists the election's peer set.
pub async fn list_nodes(
    State(state): State<SharedState>,
    Query(query): Query<ListNodesQuery>,
) -> Response {
    if query.election == 0 {
        return reply(StatusCode::BAD_REQUEST, "Election id is missing.");
    }

    let handle = match lookup_election(&state, query.election).await {
        Ok(handle) => handle,
        Err(response) => return response,
    };

    let all_nodes = handle.lock().await.peer_nodes();
    (StatusCode::CREATED, Json(AllNodesResponse { all_nodes })).into_response()
}
