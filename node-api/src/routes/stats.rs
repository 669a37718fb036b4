//! Balance and result reporting endpoints.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use super::{field_str, field_u64, json_body, lookup_election, reply};
use crate::state::SharedState;

/// Response body for `POST /balance`.
#[derive(Serialize)]
pub struct BalanceResponse {
    pub message: &'static str,
    pub funds: i64,
}

/// `POST /balance`
///
/// Net balance for a voter: confirmed income minus everything they have
/// spent, pending votes included.
pub async fn balance(State(state): State<SharedState>, body: String) -> Response {
    let Some(values) = json_body(&body) else {
        return reply(StatusCode::BAD_REQUEST, "No data found.");
    };
    let (Some(election), Some(voter)) = (
        field_u64(&values, "election"),
        field_str(&values, "voter"),
    ) else {
        return reply(StatusCode::BAD_REQUEST, "Required data are missing.");
    };

    let handle = match lookup_election(&state, election).await {
        Ok(handle) => handle,
        Err(response) => return response,
    };

    let funds = handle.lock().await.get_balance(voter);
    (
        StatusCode::OK,
        Json(BalanceResponse {
            message: "Fetched balance successfully.",
            funds,
        }),
    )
        .into_response()
}

/// Response body for `POST /totalmines`.
#[derive(Serialize)]
pub struct TotalMinesResponse {
    pub message: &'static str,
    pub amount_mined: u64,
}

/// Error body for `POST /totalmines` when the node has no keypair yet.
#[derive(Serialize)]
pub struct WalletMissingResponse {
    pub message: &'static str,
    pub wallet_set_up: bool,
}

/// `POST /totalmines`
///
/// Total mining rewards this node's own key has confirmed in the election.
pub async fn totalmines(State(state): State<SharedState>, body: String) -> Response {
    let Some(values) = json_body(&body) else {
        return reply(StatusCode::BAD_REQUEST, "No data found.");
    };
    let Some(election) = field_u64(&values, "election") else {
        return reply(StatusCode::BAD_REQUEST, "Election id is missing.");
    };

    let handle = match lookup_election(&state, election).await {
        Ok(handle) => handle,
        Err(response) => return response,
    };

    let guard = handle.lock().await;
    let Some(miner) = guard.public_key.clone() else {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(WalletMissingResponse {
                message: "Loading total mines failed.",
                wallet_set_up: false,
            }),
        )
            .into_response();
    };
    let amount_mined = guard.get_totalmines(&miner);
    (
        StatusCode::OK,
        Json(TotalMinesResponse {
            message: "Fetched total mines successfully.",
            amount_mined,
        }),
    )
        .into_response()
}

/// Response body for `POST /results`.
#[derive(Serialize)]
pub struct ResultsResponse {
    pub message: &'static str,
    #[serde(rename = "Votes")]
    pub votes: u64,
}

/// `POST /results`
///
/// Confirmed, non-coinbase vote weight for a candidate.
pub async fn results(State(state): State<SharedState>, body: String) -> Response {
    let Some(values) = json_body(&body) else {
        return reply(StatusCode::BAD_REQUEST, "No data found.");
    };
    let (Some(candidate), Some(election)) = (
        field_str(&values, "candidate"),
        field_u64(&values, "election"),
    ) else {
        return reply(StatusCode::BAD_REQUEST, "Required data is missing.");
    };

    let handle = match lookup_election(&state, election).await {
        Ok(handle) => handle,
        Err(response) => return response,
    };

    let votes = handle.lock().await.get_results(candidate);
    (
        StatusCode::OK,
        Json(ResultsResponse {
            message: "Fetched request successfully.",
            votes,
        }),
    )
        .into_response()
}

/// Response body for `POST /results-voters`.
#[derive(Serialize)]
pub struct ResultsVotersResponse {
    pub message: &'static str,
    #[serde(rename = "Voters")]
    pub voters: Vec<String>,
}

/// `POST /results-voters`
///
/// The voters behind a candidate's confirmed votes.
pub async fn results_voters(State(state): State<SharedState>, body: String) -> Response {
    let Some(values) = json_body(&body) else {
        return reply(StatusCode::BAD_REQUEST, "No data found.");
    };
    let (Some(candidate), Some(election)) = (
        field_str(&values, "candidate"),
        field_u64(&values, "election"),
    ) else {
        return reply(StatusCode::BAD_REQUEST, "Required data is missing.");
    };

    let handle = match lookup_election(&state, election).await {
        Ok(handle) => handle,
        Err(response) => return response,
    };

    let voters = handle.lock().await.get_results_voters(candidate);
    (
        StatusCode::OK,
        Json(ResultsVotersResponse {
            message: "Fetched request successfully.",
            voters,
        }),
    )
        .into_response()
}
